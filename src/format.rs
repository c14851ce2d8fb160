//! Image format tags and signature-based detection.

use core::fmt;

/// Container formats the engine can be asked to load.
///
/// `Unknown` is a regular detection outcome, not an error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    #[default]
    Unknown,
    Gif,
    Jpeg,
    /// Anything handed to the engine's ImageMagick delegate.
    Magick,
    Pdf,
    Png,
    Svg,
    Tiff,
    WebP,
    /// HEIF and AVIF share one tag (both ISO-BMFF).
    Heif,
    Bmp,
}

impl ImageFormat {
    /// Every known tag except `Unknown`.
    pub const ALL: [ImageFormat; 10] = [
        ImageFormat::Gif,
        ImageFormat::Jpeg,
        ImageFormat::Magick,
        ImageFormat::Pdf,
        ImageFormat::Png,
        ImageFormat::Svg,
        ImageFormat::Tiff,
        ImageFormat::WebP,
        ImageFormat::Heif,
        ImageFormat::Bmp,
    ];

    /// Classify a buffer by its leading signature.
    ///
    /// Buffers shorter than 12 bytes are always `Unknown`. Checks run in a
    /// fixed priority order and the first match wins: JPEG, PNG, GIF, TIFF,
    /// WebP, HEIF/AVIF, SVG, PDF, BMP.
    pub fn detect(data: &[u8]) -> Self {
        if data.len() < 12 {
            return ImageFormat::Unknown;
        }

        if is_jpeg(data) {
            ImageFormat::Jpeg
        } else if is_png(data) {
            ImageFormat::Png
        } else if is_gif(data) {
            ImageFormat::Gif
        } else if is_tiff(data) {
            ImageFormat::Tiff
        } else if is_webp(data) {
            ImageFormat::WebP
        } else if is_heif(data) {
            ImageFormat::Heif
        } else if crate::svg::is_svg(data) {
            ImageFormat::Svg
        } else if is_pdf(data) {
            ImageFormat::Pdf
        } else if is_bmp(data) {
            ImageFormat::Bmp
        } else {
            ImageFormat::Unknown
        }
    }

    /// Short lowercase name, as used in operation and log labels.
    pub fn name(self) -> &'static str {
        match self {
            ImageFormat::Unknown => "unknown",
            ImageFormat::Gif => "gif",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Magick => "magick",
            ImageFormat::Pdf => "pdf",
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
            ImageFormat::Tiff => "tiff",
            ImageFormat::WebP => "webp",
            ImageFormat::Heif => "heif",
            ImageFormat::Bmp => "bmp",
        }
    }

    /// Canonical file extension including the leading dot. Empty for `Unknown`.
    pub fn file_ext(self) -> &'static str {
        match self {
            ImageFormat::Unknown => "",
            ImageFormat::Gif => ".gif",
            ImageFormat::Jpeg => ".jpeg",
            ImageFormat::Magick => ".magick",
            ImageFormat::Pdf => ".pdf",
            ImageFormat::Png => ".png",
            ImageFormat::Svg => ".svg",
            ImageFormat::Tiff => ".tiff",
            ImageFormat::WebP => ".webp",
            ImageFormat::Heif => ".heic",
            ImageFormat::Bmp => ".bmp",
        }
    }

    /// Detect format from file extension (case-insensitive, dot optional).
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.strip_prefix('.').unwrap_or(ext);
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "jpe" | "jfif" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            "gif" => Some(ImageFormat::Gif),
            "tif" | "tiff" => Some(ImageFormat::Tiff),
            "webp" => Some(ImageFormat::WebP),
            "heic" | "heif" | "avif" => Some(ImageFormat::Heif),
            "svg" => Some(ImageFormat::Svg),
            "pdf" => Some(ImageFormat::Pdf),
            "bmp" => Some(ImageFormat::Bmp),
            "magick" => Some(ImageFormat::Magick),
            _ => None,
        }
    }

    /// MIME type string, where one exists.
    pub fn mime_type(self) -> Option<&'static str> {
        match self {
            ImageFormat::Gif => Some("image/gif"),
            ImageFormat::Jpeg => Some("image/jpeg"),
            ImageFormat::Pdf => Some("application/pdf"),
            ImageFormat::Png => Some("image/png"),
            ImageFormat::Svg => Some("image/svg+xml"),
            ImageFormat::Tiff => Some("image/tiff"),
            ImageFormat::WebP => Some("image/webp"),
            ImageFormat::Heif => Some("image/heif"),
            ImageFormat::Bmp => Some("image/bmp"),
            ImageFormat::Unknown | ImageFormat::Magick => None,
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Classify a buffer. Never fails; see [`ImageFormat::detect`].
pub fn classify(data: &[u8]) -> ImageFormat {
    ImageFormat::detect(data)
}

const JPEG: &[u8] = b"\xFF\xD8\xFF";
const PNG: &[u8] = b"\x89PNG";
const GIF: &[u8] = b"GIF";
const TIFF_II: &[u8] = b"II\x2A\x00";
const TIFF_MM: &[u8] = b"MM\x00\x2A";
const WEBP: &[u8] = b"WEBP";
const PDF: &[u8] = b"%PDF";
const BMP: &[u8] = b"BM";

// https://github.com/strukturag/libheif/blob/master/libheif/heif.cc
const FTYP: &[u8] = b"ftyp";
const HEIF_BRANDS: [&[u8]; 4] = [b"heic", b"avif", b"mif1", b"msf1"];

fn is_jpeg(data: &[u8]) -> bool {
    data.starts_with(JPEG)
}

fn is_png(data: &[u8]) -> bool {
    data.starts_with(PNG)
}

fn is_gif(data: &[u8]) -> bool {
    data.starts_with(GIF)
}

fn is_tiff(data: &[u8]) -> bool {
    data.starts_with(TIFF_II) || data.starts_with(TIFF_MM)
}

// Only the fourcc at 8..12 is checked; the RIFF prefix is not.
fn is_webp(data: &[u8]) -> bool {
    data.get(8..12) == Some(WEBP)
}

fn is_heif(data: &[u8]) -> bool {
    match (data.get(4..8), data.get(8..12)) {
        (Some(box_type), Some(brand)) => box_type == FTYP && HEIF_BRANDS.contains(&brand),
        _ => false,
    }
}

fn is_pdf(data: &[u8]) -> bool {
    data.starts_with(PDF)
}

fn is_bmp(data: &[u8]) -> bool {
    data.starts_with(BMP)
}
