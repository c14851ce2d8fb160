//! SVG confirmation for the signature sniffer.
//!
//! A `<svg` substring near the start of the buffer only nominates SVG. The
//! buffer is then decoded with the charset it declares and read as XML up to
//! the end of its root element. The read is tolerant: entity references,
//! attribute syntax and anything after the root are not checked. Element
//! nesting is, and the root's local name must be `svg`.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8};
use quick_xml::Reader;
use quick_xml::events::Event;

/// How far into the buffer the `<svg` marker is searched for.
const SNIFF_WINDOW: usize = 1024;

const SVG_MARKER: &[u8] = b"<svg";

const SVG_ROOT: &[u8] = b"svg";

pub(crate) fn is_svg(data: &[u8]) -> bool {
    let head = &data[..data.len().min(SNIFF_WINDOW)];
    if !head.windows(SVG_MARKER.len()).any(|w| w == SVG_MARKER) {
        return false;
    }

    let Some(text) = decode_text(data) else {
        tracing::trace!(len = data.len(), "svg candidate is not valid text");
        return false;
    };

    root_is_svg(&text)
}

/// Read events until the root element closes.
fn root_is_svg(text: &str) -> bool {
    let mut reader = Reader::from_str(text);
    reader.config_mut().check_end_names = true;

    let mut depth = 0usize;
    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(err) => {
                tracing::trace!(%err, "svg candidate failed to parse");
                return false;
            }
        };
        match event {
            Event::Start(start) => {
                if depth == 0 && start.local_name().as_ref() != SVG_ROOT {
                    return false;
                }
                depth += 1;
            }
            Event::Empty(start) if depth == 0 => return start.local_name().as_ref() == SVG_ROOT,
            Event::End(_) if depth <= 1 => return depth == 1,
            Event::End(_) => depth -= 1,
            Event::Eof => {
                tracing::trace!(depth, "svg candidate ended inside its root");
                return false;
            }
            // Prolog, text, comments and references are not checked.
            _ => {}
        }
    }
}

/// Decode the buffer to text using its BOM, else its XML declaration, else UTF-8.
///
/// `None` for an unrecognized declared label or undecodable bytes.
fn decode_text(data: &[u8]) -> Option<Cow<'_, str>> {
    let encoding = match Encoding::for_bom(data) {
        Some((encoding, _)) => encoding,
        None => match declared_encoding(data) {
            Some(label) => Encoding::for_label(label)?,
            None => UTF_8,
        },
    };

    // `decode` strips a BOM and overrides `encoding` if one is present.
    let (text, _, had_errors) = encoding.decode(data);
    if had_errors { None } else { Some(text) }
}

/// The `encoding="…"` label from a leading `<?xml … ?>` declaration.
fn declared_encoding(data: &[u8]) -> Option<&[u8]> {
    let start = data.iter().position(|b| !b.is_ascii_whitespace())?;
    let data = &data[start..];
    if !data.starts_with(b"<?xml") {
        return None;
    }

    let end = find(data, b"?>")?;
    let decl = &data[..end];
    let after_key = &decl[find(decl, b"encoding")? + b"encoding".len()..];

    let after_eq = after_key.trim_ascii_start().strip_prefix(b"=")?.trim_ascii_start();
    let (&quote, rest) = after_eq.split_first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let close = rest.iter().position(|&b| b == quote)?;
    Some(&rest[..close])
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
