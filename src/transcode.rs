//! BMP normalization.
//!
//! The engine has no BMP loader, so BMP input is decoded with the `image`
//! crate and re-encoded as PNG before dispatch.

use std::io::Cursor;

use alloc::vec::Vec;

use crate::CodecError;

/// Decode a BMP buffer and re-encode it as PNG.
///
/// Either step failing fails the whole conversion; no partial output is
/// returned.
pub fn bmp_to_png(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let decoded = image::load_from_memory_with_format(data, image::ImageFormat::Bmp)?;

    let mut png = Vec::new();
    decoded.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)?;

    tracing::debug!(
        bmp_len = data.len(),
        png_len = png.len(),
        width = decoded.width(),
        height = decoded.height(),
        "normalized bmp to png"
    );
    Ok(png)
}
