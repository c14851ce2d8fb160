//! Image saving.

use alloc::vec::Vec;

use crate::bridge::SaveOut;
use crate::engine::{Engine, Status};
use crate::{CodecError, Foreign, ImageFormat, counter};

/// PNG save parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PngSaveParams {
    pub strip_metadata: bool,
    /// zlib compression level, 0-9.
    pub compression: i32,
    pub interlace: bool,
}

impl Default for PngSaveParams {
    fn default() -> Self {
        Self {
            strip_metadata: false,
            compression: 6,
            interlace: false,
        }
    }
}

impl PngSaveParams {
    pub fn with_strip_metadata(mut self, strip: bool) -> Self {
        self.strip_metadata = strip;
        self
    }

    pub fn with_compression(mut self, compression: i32) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_interlace(mut self, interlace: bool) -> Self {
        self.interlace = interlace;
        self
    }
}

/// WebP save parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WebpSaveParams {
    pub strip_metadata: bool,
    /// Quality, 0-100.
    pub quality: i32,
    pub lossless: bool,
    /// CPU effort, 0 (fastest) to 6 (slowest).
    pub effort: i32,
}

impl Default for WebpSaveParams {
    fn default() -> Self {
        Self {
            strip_metadata: false,
            quality: 75,
            lossless: false,
            effort: 4,
        }
    }
}

impl WebpSaveParams {
    pub fn with_strip_metadata(mut self, strip: bool) -> Self {
        self.strip_metadata = strip;
        self
    }

    pub fn with_quality(mut self, quality: i32) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_lossless(mut self, lossless: bool) -> Self {
        self.lossless = lossless;
        self
    }

    pub fn with_effort(mut self, effort: i32) -> Self {
        self.effort = effort;
        self
    }
}

/// TIFF save parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TiffSaveParams {
    pub strip_metadata: bool,
    pub quality: i32,
    pub lossless: bool,
}

impl Default for TiffSaveParams {
    fn default() -> Self {
        Self {
            strip_metadata: false,
            quality: 80,
            lossless: false,
        }
    }
}

impl TiffSaveParams {
    pub fn with_strip_metadata(mut self, strip: bool) -> Self {
        self.strip_metadata = strip;
        self
    }

    pub fn with_quality(mut self, quality: i32) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_lossless(mut self, lossless: bool) -> Self {
        self.lossless = lossless;
        self
    }
}

/// HEIF save parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeifSaveParams {
    pub quality: i32,
    pub lossless: bool,
}

impl Default for HeifSaveParams {
    fn default() -> Self {
        Self {
            quality: 80,
            lossless: false,
        }
    }
}

impl HeifSaveParams {
    pub fn with_quality(mut self, quality: i32) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_lossless(mut self, lossless: bool) -> Self {
        self.lossless = lossless;
        self
    }
}

/// JPEG save parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JpegSaveParams {
    pub strip_metadata: bool,
    pub quality: i32,
    /// Progressive (interlaced) output.
    pub interlace: bool,
}

impl Default for JpegSaveParams {
    fn default() -> Self {
        Self {
            strip_metadata: false,
            quality: 80,
            interlace: false,
        }
    }
}

impl JpegSaveParams {
    pub fn with_strip_metadata(mut self, strip: bool) -> Self {
        self.strip_metadata = strip;
        self
    }

    pub fn with_quality(mut self, quality: i32) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_interlace(mut self, interlace: bool) -> Self {
        self.interlace = interlace;
        self
    }
}

/// Parameters for any output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveParams {
    Png(PngSaveParams),
    Webp(WebpSaveParams),
    Tiff(TiffSaveParams),
    Heif(HeifSaveParams),
    Jpeg(JpegSaveParams),
}

impl SaveParams {
    /// Output format these parameters select.
    pub fn format(&self) -> ImageFormat {
        match self {
            SaveParams::Png(_) => ImageFormat::Png,
            SaveParams::Webp(_) => ImageFormat::WebP,
            SaveParams::Tiff(_) => ImageFormat::Tiff,
            SaveParams::Heif(_) => ImageFormat::Heif,
            SaveParams::Jpeg(_) => ImageFormat::Jpeg,
        }
    }
}

/// Encoded image output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodeOutput {
    /// Encoded image data, owned by the caller.
    pub data: Vec<u8>,
    pub format: ImageFormat,
}

impl<E: Engine> Foreign<E> {
    pub fn save_png(&self, image: &E::Image, params: &PngSaveParams) -> Result<Vec<u8>, CodecError> {
        self.save_with(ImageFormat::Png, |out| self.engine().save_png(image, params, out))
    }

    pub fn save_webp(
        &self,
        image: &E::Image,
        params: &WebpSaveParams,
    ) -> Result<Vec<u8>, CodecError> {
        self.save_with(ImageFormat::WebP, |out| self.engine().save_webp(image, params, out))
    }

    pub fn save_tiff(
        &self,
        image: &E::Image,
        params: &TiffSaveParams,
    ) -> Result<Vec<u8>, CodecError> {
        self.save_with(ImageFormat::Tiff, |out| self.engine().save_tiff(image, params, out))
    }

    pub fn save_heif(
        &self,
        image: &E::Image,
        params: &HeifSaveParams,
    ) -> Result<Vec<u8>, CodecError> {
        self.save_with(ImageFormat::Heif, |out| self.engine().save_heif(image, params, out))
    }

    pub fn save_jpeg(
        &self,
        image: &E::Image,
        params: &JpegSaveParams,
    ) -> Result<Vec<u8>, CodecError> {
        self.save_with(ImageFormat::Jpeg, |out| self.engine().save_jpeg(image, params, out))
    }

    /// Save to whichever format `params` selects.
    pub fn save(&self, image: &E::Image, params: &SaveParams) -> Result<EncodeOutput, CodecError> {
        let data = match params {
            SaveParams::Png(p) => self.save_png(image, p)?,
            SaveParams::Webp(p) => self.save_webp(image, p)?,
            SaveParams::Tiff(p) => self.save_tiff(image, p)?,
            SaveParams::Heif(p) => self.save_heif(image, p)?,
            SaveParams::Jpeg(p) => self.save_jpeg(image, p)?,
        };
        Ok(EncodeOutput {
            data,
            format: params.format(),
        })
    }

    fn save_with(
        &self,
        format: ImageFormat,
        call: impl FnOnce(&mut SaveOut) -> Status,
    ) -> Result<Vec<u8>, CodecError> {
        counter::record_save(format);
        let mut out = SaveOut::default();
        let status = call(&mut out);
        out.finish(status, format)
    }
}
