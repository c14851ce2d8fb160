//! Unified error types for load/save operations.

use alloc::string::String;

use crate::format::ImageFormat;

/// Unified error type for load/save operations.
///
/// A tag that reaches the load dispatcher without a loader is not represented
/// here: that is a broken invariant and panics.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CodecError {
    /// Format unrecognized, or not loadable by this engine build.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(ImageFormat),
    /// The engine failed to load the buffer.
    #[error("failed to load {format} image: {message}")]
    Decode {
        format: ImageFormat,
        message: String,
    },
    /// The engine failed to save the image.
    #[error("failed to save {format} image: {message}")]
    Encode {
        format: ImageFormat,
        message: String,
    },
    /// BMP → PNG normalization failed.
    #[error("failed to transcode bmp to png: {0}")]
    Transcode(#[from] image::ImageError),
    /// The engine could not be started.
    #[cfg(feature = "vips")]
    #[error("failed to start libvips: {0}")]
    Startup(String),
}

impl CodecError {
    /// The format involved, where there is one.
    pub fn format(&self) -> Option<ImageFormat> {
        match self {
            CodecError::UnsupportedFormat(format)
            | CodecError::Decode { format, .. }
            | CodecError::Encode { format, .. } => Some(*format),
            CodecError::Transcode(_) => Some(ImageFormat::Bmp),
            #[cfg(feature = "vips")]
            CodecError::Startup(_) => None,
        }
    }

    /// The engine's diagnostic text for native load/save failures.
    pub fn native_message(&self) -> Option<&str> {
        match self {
            CodecError::Decode { message, .. } | CodecError::Encode { message, .. } => {
                Some(message)
            }
            _ => None,
        }
    }
}
