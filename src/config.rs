//! Load configuration: defaults plus ordered override mutators.
//!
//! A decode call starts from [`LoadOptions::default`] and applies each
//! [`LoadOption`] in order. Mutators may touch any subset of fields; when two
//! set the same field, the one applied later wins.
//!
//! ```
//! use zenforeign::{ImageFormat, LoadOption, LoadOptions};
//!
//! let opts = LoadOptions::default().apply(&[
//!     LoadOption::page(2),
//!     LoadOption::dpi(300.0),
//!     LoadOption::page(3),
//! ]);
//! let resolved = opts.resolve(ImageFormat::Pdf);
//! assert_eq!(resolved.params.page, 3);
//! assert_eq!(resolved.params.dpi, 300.0);
//! ```

use alloc::string::String;
use alloc::sync::Arc;
use core::fmt;

use crate::ImageFormat;

/// Overridable load parameters.
///
/// Each engine loader only receives the fields meaningful to its format.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadOptionParams {
    /// JPEG/WebP shrink-on-load factor.
    pub shrink: i32,
    /// Fail on the first decoder warning instead of continuing.
    pub fail: bool,
    /// Rotate according to orientation metadata. `None` means the format
    /// default: on for HEIF, off otherwise.
    pub autorotate: Option<bool>,
    /// First page or frame to load.
    pub page: i32,
    /// Number of pages or frames to load.
    pub frame_count: i32,
    /// PDF/SVG render scale.
    pub scale: f64,
    /// TIFF sub-IFD index; -1 selects the main image.
    pub subifd: i32,
    /// PDF/SVG render resolution.
    pub dpi: f64,
    /// Lift the SVG loader's input size limit.
    pub unlimited: bool,
    /// Load the embedded HEIF thumbnail instead of the primary image.
    pub thumbnail: bool,
    /// ImageMagick density string, e.g. `"72x72"`.
    pub density: String,
}

impl Default for LoadOptionParams {
    fn default() -> Self {
        Self {
            shrink: 1,
            fail: false,
            autorotate: None,
            page: 0,
            frame_count: 1,
            scale: 1.0,
            subifd: -1,
            dpi: 72.0,
            unlimited: false,
            thumbnail: false,
            density: String::from("72x72"),
        }
    }
}

/// Caller-facing load configuration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoadOptions {
    /// Replaces the sniffed format when set.
    pub format: Option<ImageFormat>,
    pub params: LoadOptionParams,
}

impl LoadOptions {
    /// Apply mutators left to right.
    pub fn apply(mut self, options: &[LoadOption]) -> Self {
        for option in options {
            option.apply_to(&mut self);
        }
        self
    }

    /// Fix the format for the rest of the pipeline and fill in defaults that
    /// depend on it.
    ///
    /// An explicit, known format override replaces `detected`; an override to
    /// `Unknown` is ignored.
    pub fn resolve(self, detected: ImageFormat) -> ResolvedLoad {
        let format = match self.format {
            Some(format) if format != ImageFormat::Unknown => format,
            _ => detected,
        };
        let p = self.params;
        ResolvedLoad {
            format,
            params: LoadParams {
                shrink: p.shrink,
                fail: p.fail,
                autorotate: p.autorotate.unwrap_or(format == ImageFormat::Heif),
                page: p.page,
                frame_count: p.frame_count,
                scale: p.scale,
                subifd: p.subifd,
                dpi: p.dpi,
                unlimited: p.unlimited,
                thumbnail: p.thumbnail,
                density: p.density,
            },
        }
    }

    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_shrink(mut self, shrink: i32) -> Self {
        self.params.shrink = shrink;
        self
    }

    pub fn with_fail(mut self, fail: bool) -> Self {
        self.params.fail = fail;
        self
    }

    pub fn with_autorotate(mut self, autorotate: bool) -> Self {
        self.params.autorotate = Some(autorotate);
        self
    }

    pub fn with_page(mut self, page: i32) -> Self {
        self.params.page = page;
        self
    }

    pub fn with_frame_count(mut self, frame_count: i32) -> Self {
        self.params.frame_count = frame_count;
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.params.scale = scale;
        self
    }

    pub fn with_subifd(mut self, subifd: i32) -> Self {
        self.params.subifd = subifd;
        self
    }

    pub fn with_dpi(mut self, dpi: f64) -> Self {
        self.params.dpi = dpi;
        self
    }

    pub fn with_unlimited(mut self, unlimited: bool) -> Self {
        self.params.unlimited = unlimited;
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: bool) -> Self {
        self.params.thumbnail = thumbnail;
        self
    }

    pub fn with_density(mut self, density: impl Into<String>) -> Self {
        self.params.density = density.into();
        self
    }
}

/// Fully resolved parameters for one load call.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadParams {
    pub shrink: i32,
    pub fail: bool,
    pub autorotate: bool,
    pub page: i32,
    pub frame_count: i32,
    pub scale: f64,
    pub subifd: i32,
    pub dpi: f64,
    pub unlimited: bool,
    pub thumbnail: bool,
    pub density: String,
}

/// Result of option resolution: the format every later step sees, and its
/// parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedLoad {
    pub format: ImageFormat,
    pub params: LoadParams,
}

type Mutator = dyn Fn(&mut LoadOptions) + Send + Sync;

/// One override mutator.
///
/// Cheap to clone; the same option list can be reused across decode calls.
#[derive(Clone)]
pub struct LoadOption(Arc<Mutator>);

impl LoadOption {
    /// Wrap an arbitrary mutation.
    pub fn new(f: impl Fn(&mut LoadOptions) + Send + Sync + 'static) -> Self {
        LoadOption(Arc::new(f))
    }

    pub fn apply_to(&self, options: &mut LoadOptions) {
        (self.0)(options)
    }

    /// Override format detection.
    pub fn format(format: ImageFormat) -> Self {
        Self::new(move |o| o.format = Some(format))
    }

    pub fn shrink(shrink: i32) -> Self {
        Self::new(move |o| o.params.shrink = shrink)
    }

    pub fn fail(fail: bool) -> Self {
        Self::new(move |o| o.params.fail = fail)
    }

    pub fn autorotate(autorotate: bool) -> Self {
        Self::new(move |o| o.params.autorotate = Some(autorotate))
    }

    pub fn page(page: i32) -> Self {
        Self::new(move |o| o.params.page = page)
    }

    pub fn frame_count(frame_count: i32) -> Self {
        Self::new(move |o| o.params.frame_count = frame_count)
    }

    pub fn scale(scale: f64) -> Self {
        Self::new(move |o| o.params.scale = scale)
    }

    pub fn subifd(subifd: i32) -> Self {
        Self::new(move |o| o.params.subifd = subifd)
    }

    pub fn dpi(dpi: f64) -> Self {
        Self::new(move |o| o.params.dpi = dpi)
    }

    pub fn unlimited(unlimited: bool) -> Self {
        Self::new(move |o| o.params.unlimited = unlimited)
    }

    pub fn thumbnail(thumbnail: bool) -> Self {
        Self::new(move |o| o.params.thumbnail = thumbnail)
    }

    pub fn density(density: impl Into<String>) -> Self {
        let density = density.into();
        Self::new(move |o| o.params.density.clone_from(&density))
    }
}

impl fmt::Debug for LoadOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LoadOption(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_mutators() {
        let resolved = LoadOptions::default().apply(&[]).resolve(ImageFormat::Jpeg);
        assert_eq!(resolved.format, ImageFormat::Jpeg);
        assert_eq!(
            resolved.params,
            LoadParams {
                shrink: 1,
                fail: false,
                autorotate: false,
                page: 0,
                frame_count: 1,
                scale: 1.0,
                subifd: -1,
                dpi: 72.0,
                unlimited: false,
                thumbnail: false,
                density: "72x72".into(),
            }
        );
    }

    #[test]
    fn autorotate_defaults_on_only_for_heif() {
        for format in ImageFormat::ALL {
            let resolved = LoadOptions::default().resolve(format);
            assert_eq!(resolved.params.autorotate, format == ImageFormat::Heif, "{format}");
        }
        assert!(!LoadOptions::default().resolve(ImageFormat::Unknown).params.autorotate);
    }

    #[test]
    fn autorotate_follows_overridden_format() {
        let to_heif = LoadOptions::default()
            .apply(&[LoadOption::format(ImageFormat::Heif)])
            .resolve(ImageFormat::Jpeg);
        assert_eq!(to_heif.format, ImageFormat::Heif);
        assert!(to_heif.params.autorotate);

        let from_heif = LoadOptions::default()
            .apply(&[LoadOption::format(ImageFormat::Png)])
            .resolve(ImageFormat::Heif);
        assert!(!from_heif.params.autorotate);

        let explicit = LoadOptions::default()
            .apply(&[LoadOption::autorotate(false)])
            .resolve(ImageFormat::Heif);
        assert!(!explicit.params.autorotate);
    }

    #[test]
    fn later_mutator_wins() {
        let resolved = LoadOptions::default()
            .apply(&[
                LoadOption::shrink(2),
                LoadOption::density("300x300"),
                LoadOption::shrink(8),
                LoadOption::new(|o| o.params.density = "96x96".into()),
            ])
            .resolve(ImageFormat::Jpeg);
        assert_eq!(resolved.params.shrink, 8);
        assert_eq!(resolved.params.density, "96x96");
    }

    #[test]
    fn format_override_replaces_detected() {
        let resolved = LoadOptions::default()
            .apply(&[
                LoadOption::format(ImageFormat::Gif),
                LoadOption::format(ImageFormat::Tiff),
            ])
            .resolve(ImageFormat::Png);
        assert_eq!(resolved.format, ImageFormat::Tiff);
    }

    #[test]
    fn unknown_override_keeps_detected() {
        let resolved = LoadOptions::default()
            .with_format(ImageFormat::Unknown)
            .resolve(ImageFormat::Gif);
        assert_eq!(resolved.format, ImageFormat::Gif);
    }

    #[test]
    fn builder_setters_match_mutators() {
        let built = LoadOptions::default()
            .with_page(1)
            .with_frame_count(-1)
            .with_dpi(150.0)
            .with_scale(2.0)
            .with_thumbnail(true);
        let mutated = LoadOptions::default().apply(&[
            LoadOption::page(1),
            LoadOption::frame_count(-1),
            LoadOption::dpi(150.0),
            LoadOption::scale(2.0),
            LoadOption::thumbnail(true),
        ]);
        assert_eq!(built, mutated);
    }
}
