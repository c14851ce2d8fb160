//! Image loading.

use alloc::borrow::Cow;

use crate::bridge::LoadOut;
use crate::config::{LoadOption, LoadOptions, LoadParams, ResolvedLoad};
use crate::engine::{
    Engine, GifLoad, HeifLoad, JpegLoad, MagickLoad, PdfLoad, SvgLoad, TiffLoad, WebpLoad,
};
use crate::{CodecError, Foreign, ImageFormat, transcode};

/// A loaded image.
#[derive(Debug)]
pub struct DecodeOutput<I> {
    /// Native handle, owned by the caller.
    pub image: I,
    /// Format that was actually loaded. BMP input reports `Png`.
    pub format: ImageFormat,
}

impl<E: Engine> Foreign<E> {
    /// Load a buffer, applying `options` over the defaults in order.
    ///
    /// The format is sniffed from `data` unless an option overrides it.
    pub fn decode(
        &self,
        data: &[u8],
        options: &[LoadOption],
    ) -> Result<DecodeOutput<E::Image>, CodecError> {
        self.decode_with(data, LoadOptions::default().apply(options))
    }

    /// Load a buffer with an already-built option set.
    pub fn decode_with(
        &self,
        data: &[u8],
        options: LoadOptions,
    ) -> Result<DecodeOutput<E::Image>, CodecError> {
        let detected = ImageFormat::detect(data);
        let ResolvedLoad { mut format, params } = options.resolve(detected);

        // Borrowed input or the transcoded copy; either way it outlives the
        // native call below.
        let mut src = Cow::Borrowed(data);
        if format == ImageFormat::Bmp {
            src = Cow::Owned(transcode::bmp_to_png(data)?);
            format = ImageFormat::Png;
        }

        if !self.is_supported(format) {
            tracing::info!(size = src.len(), %format, "failed to understand image format");
            return Err(CodecError::UnsupportedFormat(format));
        }

        let image = self.load_format(&src, format, &params)?;
        Ok(DecodeOutput { image, format })
    }

    /// Dispatch to the format's loader.
    ///
    /// # Panics
    ///
    /// For a format without a loader (`Unknown`, `Bmp`). Callers must have
    /// passed the capability check and BMP normalization first.
    fn load_format(
        &self,
        buf: &[u8],
        format: ImageFormat,
        p: &LoadParams,
    ) -> Result<E::Image, CodecError> {
        let engine = self.engine();
        let mut out = LoadOut::default();

        let status = match format {
            ImageFormat::Jpeg => {
                let params = JpegLoad {
                    shrink: p.shrink,
                    fail: p.fail,
                    autorotate: p.autorotate,
                };
                engine.load_jpeg(buf, &params, &mut out)
            }
            ImageFormat::Png => engine.load_png(buf, &mut out),
            ImageFormat::WebP => engine.load_webp(buf, &WebpLoad { shrink: p.shrink }, &mut out),
            ImageFormat::Tiff => {
                let params = TiffLoad {
                    page: p.page,
                    frame_count: p.frame_count,
                    autorotate: p.autorotate,
                    subifd: p.subifd,
                };
                engine.load_tiff(buf, &params, &mut out)
            }
            ImageFormat::Gif => {
                let params = GifLoad {
                    page: p.page,
                    frame_count: p.frame_count,
                };
                engine.load_gif(buf, &params, &mut out)
            }
            ImageFormat::Pdf => {
                tracing::info!(
                    page = p.page,
                    n = p.frame_count,
                    dpi = p.dpi,
                    scale = p.scale,
                    "pdf options"
                );
                let params = PdfLoad {
                    page: p.page,
                    frame_count: p.frame_count,
                    dpi: p.dpi,
                    scale: p.scale,
                };
                engine.load_pdf(buf, &params, &mut out)
            }
            ImageFormat::Svg => {
                let params = SvgLoad {
                    dpi: p.dpi,
                    scale: p.scale,
                    unlimited: p.unlimited,
                };
                engine.load_svg(buf, &params, &mut out)
            }
            ImageFormat::Heif => {
                let params = HeifLoad {
                    page: p.page,
                    frame_count: p.frame_count,
                    thumbnail: p.thumbnail,
                };
                engine.load_heif(buf, &params, &mut out)
            }
            ImageFormat::Magick => {
                let params = MagickLoad {
                    page: p.page,
                    frame_count: p.frame_count,
                    density: &p.density,
                };
                engine.load_magick(buf, &params, &mut out)
            }
            ImageFormat::Unknown | ImageFormat::Bmp => {
                panic!("no loader for {format}: capability check was bypassed")
            }
        };

        out.finish(status, format)
    }
}
