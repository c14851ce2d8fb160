//! # zenforeign
//!
//! Format sniffing and buffer load/save dispatch for a native image engine.
//!
//! [`ImageFormat::detect`] classifies encoded bytes from their leading
//! signature. [`Foreign`] wraps an [`Engine`] (the native library seam),
//! builds its capability table once, and routes each buffer to the matching
//! format loader with per-format options. BMP input is transcoded to PNG
//! before it reaches the engine.
//!
//! The libvips engine lives behind the `vips` feature:
//!
//! ```toml
//! [dependencies]
//! zenforeign = { version = "0.1", features = ["vips"] }
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use zenforeign::{ImageFormat, LoadOption, PngSaveParams};
//!
//! let data: &[u8] = &[]; // your image bytes
//! let foreign = zenforeign::vips::foreign()?;
//!
//! let decoded = foreign.decode(data, &[LoadOption::page(0), LoadOption::fail(true)])?;
//! let png = foreign.save_png(&decoded.image, &PngSaveParams::default().with_compression(9))?;
//! assert_eq!(ImageFormat::detect(&png), ImageFormat::Png);
//! # Ok::<(), zenforeign::CodecError>(())
//! ```

#![deny(unsafe_op_in_unsafe_fn)]

extern crate alloc;

mod bridge;
pub mod config;
pub mod counter;
mod decode;
mod encode;
pub mod engine;
mod error;
mod foreign;
mod format;
mod registry;
mod svg;
pub mod transcode;

#[cfg(test)]
mod testing;

#[cfg(feature = "vips")]
pub mod vips;

pub use bridge::{
    FreeBuffer, FreeError, LoadOut, NativeBuffer, NativeError, SaveOut, UNKNOWN_NATIVE_ERROR,
};
pub use config::{LoadOption, LoadOptionParams, LoadOptions, LoadParams, ResolvedLoad};
pub use decode::DecodeOutput;
pub use encode::{
    EncodeOutput, HeifSaveParams, JpegSaveParams, PngSaveParams, SaveParams, TiffSaveParams,
    WebpSaveParams,
};
pub use engine::{Engine, Status};
pub use error::CodecError;
pub use foreign::Foreign;
pub use format::{ImageFormat, classify};
pub use registry::{CodecRegistry, FormatSet};
