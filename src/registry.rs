//! Table of formats the native engine can load.

use crate::ImageFormat;

/// Set of image formats represented as bitflags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FormatSet(u16);

impl FormatSet {
    pub const EMPTY: Self = FormatSet(0);

    const fn bit(format: ImageFormat) -> u16 {
        match format {
            ImageFormat::Unknown => 0,
            ImageFormat::Gif => 1 << 0,
            ImageFormat::Jpeg => 1 << 1,
            ImageFormat::Magick => 1 << 2,
            ImageFormat::Pdf => 1 << 3,
            ImageFormat::Png => 1 << 4,
            ImageFormat::Svg => 1 << 5,
            ImageFormat::Tiff => 1 << 6,
            ImageFormat::WebP => 1 << 7,
            ImageFormat::Heif => 1 << 8,
            ImageFormat::Bmp => 1 << 9,
        }
    }

    /// Every known format. `Unknown` is never a member.
    pub fn all() -> Self {
        ImageFormat::ALL.into_iter().collect()
    }

    pub fn contains(self, format: ImageFormat) -> bool {
        let bit = Self::bit(format);
        bit != 0 && (self.0 & bit) != 0
    }

    pub fn insert(&mut self, format: ImageFormat) {
        self.0 |= Self::bit(format);
    }

    pub fn remove(&mut self, format: ImageFormat) {
        self.0 &= !Self::bit(format);
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = ImageFormat> {
        ImageFormat::ALL.into_iter().filter(move |&f| self.contains(f))
    }
}

impl FromIterator<ImageFormat> for FormatSet {
    fn from_iter<I: IntoIterator<Item = ImageFormat>>(iter: I) -> Self {
        let mut set = FormatSet::EMPTY;
        for format in iter {
            set.insert(format);
        }
        set
    }
}

/// Capability table.
///
/// Built once from what the engine reports (see
/// [`Foreign::registry`](crate::Foreign::registry)) and read-only afterwards.
/// A registry can also be assembled by hand to restrict an engine to a subset
/// of what it supports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodecRegistry {
    load_enabled: FormatSet,
}

impl CodecRegistry {
    /// Every format enabled.
    pub fn all() -> Self {
        Self {
            load_enabled: FormatSet::all(),
        }
    }

    /// Nothing enabled; formats must be opted in.
    pub fn none() -> Self {
        Self {
            load_enabled: FormatSet::EMPTY,
        }
    }

    pub fn from_set(set: FormatSet) -> Self {
        Self { load_enabled: set }
    }

    /// Enable or disable loading for a format.
    pub fn with_load(mut self, format: ImageFormat, enabled: bool) -> Self {
        if enabled {
            self.load_enabled.insert(format);
        } else {
            self.load_enabled.remove(format);
        }
        self
    }

    /// Is this format enabled for loading? Always false for `Unknown`.
    pub fn can_load(&self, format: ImageFormat) -> bool {
        self.load_enabled.contains(format)
    }

    /// Formats enabled for loading.
    pub fn loadable_formats(&self) -> impl Iterator<Item = ImageFormat> {
        self.load_enabled.iter()
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::all()
    }
}
