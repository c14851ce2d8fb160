//! The native engine seam.
//!
//! An [`Engine`] exposes one load primitive per loadable format and one save
//! primitive per output format, in the shape of the underlying C calls: a
//! status code (zero is success) plus out-parameters. Turning those into
//! results and owned memory is done by [`Foreign`](crate::Foreign), never by
//! the engine.

use core::ffi::c_int;

use crate::bridge::{LoadOut, SaveOut};
use crate::encode::{HeifSaveParams, JpegSaveParams, PngSaveParams, TiffSaveParams, WebpSaveParams};
use crate::registry::FormatSet;

/// Native status code. Zero is success.
pub type Status = c_int;

/// JPEG loader parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JpegLoad {
    pub shrink: i32,
    pub fail: bool,
    pub autorotate: bool,
}

/// WebP loader parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WebpLoad {
    pub shrink: i32,
}

/// TIFF loader parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TiffLoad {
    pub page: i32,
    pub frame_count: i32,
    pub autorotate: bool,
    pub subifd: i32,
}

/// GIF loader parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GifLoad {
    pub page: i32,
    pub frame_count: i32,
}

/// PDF loader parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PdfLoad {
    pub page: i32,
    pub frame_count: i32,
    pub dpi: f64,
    pub scale: f64,
}

/// SVG loader parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SvgLoad {
    pub dpi: f64,
    pub scale: f64,
    pub unlimited: bool,
}

/// HEIF/AVIF loader parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeifLoad {
    pub page: i32,
    pub frame_count: i32,
    pub thumbnail: bool,
}

/// ImageMagick delegate parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MagickLoad<'a> {
    pub page: i32,
    pub frame_count: i32,
    pub density: &'a str,
}

/// Decode/encode primitives of a native image engine.
///
/// Load primitives receive the input buffer borrowed for the duration of the
/// call only; an engine that keeps referencing input after returning must
/// copy it first. On a non-zero status an engine should attach a
/// diagnostic to `out.error`.
pub trait Engine {
    /// Native image handle. Released by dropping it.
    type Image;

    /// Formats this build of the engine can load. Queried once per
    /// [`Foreign`](crate::Foreign).
    fn supported_formats(&self) -> FormatSet;

    fn load_jpeg(&self, buf: &[u8], params: &JpegLoad, out: &mut LoadOut<Self::Image>) -> Status;
    fn load_png(&self, buf: &[u8], out: &mut LoadOut<Self::Image>) -> Status;
    fn load_webp(&self, buf: &[u8], params: &WebpLoad, out: &mut LoadOut<Self::Image>) -> Status;
    fn load_tiff(&self, buf: &[u8], params: &TiffLoad, out: &mut LoadOut<Self::Image>) -> Status;
    fn load_gif(&self, buf: &[u8], params: &GifLoad, out: &mut LoadOut<Self::Image>) -> Status;
    fn load_pdf(&self, buf: &[u8], params: &PdfLoad, out: &mut LoadOut<Self::Image>) -> Status;
    fn load_svg(&self, buf: &[u8], params: &SvgLoad, out: &mut LoadOut<Self::Image>) -> Status;
    fn load_heif(&self, buf: &[u8], params: &HeifLoad, out: &mut LoadOut<Self::Image>) -> Status;
    fn load_magick(
        &self,
        buf: &[u8],
        params: &MagickLoad<'_>,
        out: &mut LoadOut<Self::Image>,
    ) -> Status;

    fn save_png(&self, image: &Self::Image, params: &PngSaveParams, out: &mut SaveOut) -> Status;
    fn save_webp(&self, image: &Self::Image, params: &WebpSaveParams, out: &mut SaveOut) -> Status;
    fn save_tiff(&self, image: &Self::Image, params: &TiffSaveParams, out: &mut SaveOut) -> Status;
    fn save_heif(&self, image: &Self::Image, params: &HeifSaveParams, out: &mut SaveOut) -> Status;
    fn save_jpeg(&self, image: &Self::Image, params: &JpegSaveParams, out: &mut SaveOut) -> Status;
}
