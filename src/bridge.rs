//! Native memory and diagnostics.
//!
//! Engines hand back two kinds of native allocations: encoded output buffers
//! and error text. Both are wrapped in owning types that release them exactly
//! once on drop, so every exit path (success, failure, early return, panic)
//! frees them. Data leaves this layer only as copies in Rust-owned memory.

use alloc::borrow::ToOwned;
use alloc::ffi::CString;
use alloc::string::String;
use alloc::vec::Vec;
use core::ffi::{CStr, c_char, c_int};
use core::fmt;
use core::ptr::NonNull;

use crate::{CodecError, ImageFormat};

/// Message used when the engine fails without attaching a diagnostic.
pub const UNKNOWN_NATIVE_ERROR: &str = "unknown native error";

/// Releases a native output buffer.
pub type FreeBuffer = unsafe fn(ptr: *mut u8, len: usize);

/// Releases native error text.
pub type FreeError = unsafe fn(ptr: *mut c_char);

/// Output buffer allocated by the engine.
pub struct NativeBuffer {
    ptr: NonNull<u8>,
    len: usize,
    free: FreeBuffer,
}

// SAFETY: the buffer is uniquely owned and only read through `&self`.
unsafe impl Send for NativeBuffer {}

impl NativeBuffer {
    /// Take ownership of a native allocation.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads of `len` bytes, must not be mutated or
    /// released by anyone else, and `free(ptr, len)` must release it.
    pub unsafe fn from_raw(ptr: NonNull<u8>, len: usize, free: FreeBuffer) -> Self {
        Self { ptr, len, free }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: guaranteed by the constructor contract until drop.
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Copy into caller-owned memory, then release the native allocation.
    pub fn into_vec(self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl Drop for NativeBuffer {
    fn drop(&mut self) {
        // SAFETY: `free` matches the allocation and runs once.
        unsafe { (self.free)(self.ptr.as_ptr(), self.len) }
    }
}

impl fmt::Debug for NativeBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeBuffer").field("len", &self.len).finish()
    }
}

/// NUL-terminated diagnostic text owned by the engine.
pub struct NativeError {
    ptr: NonNull<c_char>,
    free: FreeError,
}

// SAFETY: uniquely owned, read once.
unsafe impl Send for NativeError {}

impl NativeError {
    /// Take ownership of native error text.
    ///
    /// # Safety
    ///
    /// `ptr` must point to a NUL-terminated string that stays valid until
    /// `free(ptr)` is called, and `free` must release it (or reset whatever
    /// state produced it).
    pub unsafe fn from_raw(ptr: NonNull<c_char>, free: FreeError) -> Self {
        Self { ptr, free }
    }

    /// Error text from a Rust string. Truncated at the first NUL.
    pub fn from_message(message: &str) -> Self {
        let bytes = message.as_bytes();
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        let text = CString::new(&bytes[..end]).unwrap_or_default();
        // SAFETY: `CString::into_raw` never returns null.
        let ptr = unsafe { NonNull::new_unchecked(text.into_raw()) };
        Self {
            ptr,
            free: free_cstring,
        }
    }

    /// Copy the text out, then release it.
    pub fn into_message(self) -> String {
        // SAFETY: NUL-terminated and live until drop.
        let text = unsafe { CStr::from_ptr(self.ptr.as_ptr()) };
        text.to_string_lossy().into_owned()
    }
}

impl Drop for NativeError {
    fn drop(&mut self) {
        // SAFETY: `free` matches the allocation and runs once.
        unsafe { (self.free)(self.ptr.as_ptr()) }
    }
}

impl fmt::Debug for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NativeError(..)")
    }
}

unsafe fn free_cstring(ptr: *mut c_char) {
    // SAFETY: produced by `NativeError::from_message`.
    drop(unsafe { CString::from_raw(ptr) });
}

fn take_message(error: Option<NativeError>) -> String {
    error
        .map(NativeError::into_message)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| UNKNOWN_NATIVE_ERROR.to_owned())
}

/// Out-parameters filled by an engine load primitive.
#[derive(Debug)]
pub struct LoadOut<I> {
    pub image: Option<I>,
    pub error: Option<NativeError>,
}

impl<I> Default for LoadOut<I> {
    fn default() -> Self {
        Self {
            image: None,
            error: None,
        }
    }
}

impl<I> LoadOut<I> {
    /// Turn a load status into a result. Any error text is released on
    /// every path; a partial image from a failed load is dropped.
    pub(crate) fn finish(self, status: c_int, format: ImageFormat) -> Result<I, CodecError> {
        let LoadOut { image, error } = self;
        if status != 0 {
            drop(image);
            return Err(CodecError::Decode {
                format,
                message: take_message(error),
            });
        }
        drop(error);
        image.ok_or_else(|| CodecError::Decode {
            format,
            message: "engine reported success without an image".to_owned(),
        })
    }
}

/// Out-parameters filled by an engine save primitive.
#[derive(Debug, Default)]
pub struct SaveOut {
    pub buffer: Option<NativeBuffer>,
    pub error: Option<NativeError>,
}

impl SaveOut {
    /// Turn a save status into owned bytes. The native buffer and error
    /// text are released on every path.
    pub(crate) fn finish(self, status: c_int, format: ImageFormat) -> Result<Vec<u8>, CodecError> {
        let SaveOut { buffer, error } = self;
        if status != 0 {
            drop(buffer);
            return Err(CodecError::Encode {
                format,
                message: take_message(error),
            });
        }
        drop(error);
        Ok(buffer.map(NativeBuffer::into_vec).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, released_buffers, released_errors};

    #[test]
    fn buffer_accessors() {
        let buffer = testing::native_buffer(&[1, 2, 3]);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.as_bytes(), &[1, 2, 3]);
        assert_eq!(buffer.into_vec(), vec![1, 2, 3]);

        let empty = testing::native_buffer(&[]);
        assert!(empty.is_empty());
        assert!(empty.into_vec().is_empty());
    }

    #[test]
    fn copy_survives_native_release() {
        let before = released_buffers();
        let buffer = testing::native_buffer(b"encoded");
        let copy = buffer.into_vec();
        // The release poisons the native bytes; the copy is untouched.
        assert_eq!(released_buffers(), before + 1);
        assert_eq!(copy, b"encoded");
    }

    #[test]
    fn error_message_truncates_at_nul() {
        let error = NativeError::from_message("bad\0tail");
        assert_eq!(error.into_message(), "bad");
    }

    #[test]
    fn failed_save_releases_everything_once() {
        let (buffers, errors) = (released_buffers(), released_errors());
        let out = SaveOut {
            buffer: Some(testing::native_buffer(b"partial")),
            error: Some(testing::native_error("VipsForeignSave: out of memory")),
        };
        let err = out.finish(-1, ImageFormat::Png).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Encode { format: ImageFormat::Png, ref message }
                if message == "VipsForeignSave: out of memory"
        ));
        assert_eq!(released_buffers(), buffers + 1);
        assert_eq!(released_errors(), errors + 1);
    }

    #[test]
    fn successful_save_releases_stray_error() {
        let (buffers, errors) = (released_buffers(), released_errors());
        let out = SaveOut {
            buffer: Some(testing::native_buffer(b"ok")),
            error: Some(testing::native_error("warning")),
        };
        assert_eq!(out.finish(0, ImageFormat::Jpeg).unwrap(), b"ok");
        assert_eq!(released_buffers(), buffers + 1);
        assert_eq!(released_errors(), errors + 1);
    }

    #[test]
    fn save_without_buffer_is_empty() {
        assert!(SaveOut::default().finish(0, ImageFormat::Tiff).unwrap().is_empty());
    }

    #[test]
    fn missing_or_empty_message_is_unknown() {
        let err = LoadOut::<()>::default().finish(1, ImageFormat::Gif).unwrap_err();
        assert_eq!(err.native_message(), Some(UNKNOWN_NATIVE_ERROR));

        let out = LoadOut::<()> {
            image: None,
            error: Some(NativeError::from_message("")),
        };
        let err = out.finish(1, ImageFormat::Gif).unwrap_err();
        assert_eq!(err.native_message(), Some(UNKNOWN_NATIVE_ERROR));
    }

    #[test]
    fn load_success_requires_image() {
        let out = LoadOut {
            image: Some(7u8),
            error: None,
        };
        assert_eq!(out.finish(0, ImageFormat::Png).unwrap(), 7);

        let err = LoadOut::<u8>::default().finish(0, ImageFormat::Png).unwrap_err();
        assert!(matches!(err, CodecError::Decode { .. }));
    }

    #[test]
    fn failed_load_drops_partial_image() {
        let errors = released_errors();
        let out = LoadOut {
            image: Some(String::from("partial")),
            error: Some(testing::native_error("VipsJpeg: Premature end of input file")),
        };
        let err = out.finish(-1, ImageFormat::Jpeg).unwrap_err();
        assert_eq!(
            err.native_message(),
            Some("VipsJpeg: Premature end of input file")
        );
        assert_eq!(released_errors(), errors + 1);
    }
}
