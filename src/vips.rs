//! libvips engine.
//!
//! Enabled with the `vips` feature; links `libvips`, `glib-2.0` and
//! `gobject-2.0`. Use [`foreign`] for the process-wide instance.

use core::ffi::{CStr, c_char, c_int, c_void};
use core::ptr::{self, NonNull};
use std::ffi::CString;
use std::sync::OnceLock;

use crate::bridge::{LoadOut, NativeBuffer, NativeError, SaveOut};
use crate::encode::{HeifSaveParams, JpegSaveParams, PngSaveParams, TiffSaveParams, WebpSaveParams};
use crate::engine::{
    Engine, GifLoad, HeifLoad, JpegLoad, MagickLoad, PdfLoad, Status, SvgLoad, TiffLoad, WebpLoad,
};
use crate::{CodecError, FormatSet, Foreign, ImageFormat};

mod ffi {
    use core::ffi::{c_char, c_int, c_void};

    #[repr(C)]
    pub struct VipsImage {
        _private: [u8; 0],
    }

    pub type GType = usize;

    // VipsForeignTiffCompression
    pub const TIFF_COMPRESSION_JPEG: c_int = 1;
    pub const TIFF_COMPRESSION_LZW: c_int = 5;

    #[link(name = "vips")]
    unsafe extern "C" {
        pub fn vips_init(argv0: *const c_char) -> c_int;
        pub fn vips_type_find(basename: *const c_char, nickname: *const c_char) -> GType;
        pub fn vips_error_buffer() -> *const c_char;
        pub fn vips_error_clear();
        pub fn vips_image_copy_memory(image: *mut VipsImage) -> *mut VipsImage;

        pub fn vips_jpegload_buffer(buf: *mut c_void, len: usize, out: *mut *mut VipsImage, ...) -> c_int;
        pub fn vips_pngload_buffer(buf: *mut c_void, len: usize, out: *mut *mut VipsImage, ...) -> c_int;
        pub fn vips_webpload_buffer(buf: *mut c_void, len: usize, out: *mut *mut VipsImage, ...) -> c_int;
        pub fn vips_tiffload_buffer(buf: *mut c_void, len: usize, out: *mut *mut VipsImage, ...) -> c_int;
        pub fn vips_gifload_buffer(buf: *mut c_void, len: usize, out: *mut *mut VipsImage, ...) -> c_int;
        pub fn vips_pdfload_buffer(buf: *mut c_void, len: usize, out: *mut *mut VipsImage, ...) -> c_int;
        pub fn vips_svgload_buffer(buf: *mut c_void, len: usize, out: *mut *mut VipsImage, ...) -> c_int;
        pub fn vips_heifload_buffer(buf: *mut c_void, len: usize, out: *mut *mut VipsImage, ...) -> c_int;
        pub fn vips_magickload_buffer(buf: *mut c_void, len: usize, out: *mut *mut VipsImage, ...) -> c_int;

        pub fn vips_pngsave_buffer(image: *mut VipsImage, buf: *mut *mut c_void, len: *mut usize, ...) -> c_int;
        pub fn vips_webpsave_buffer(image: *mut VipsImage, buf: *mut *mut c_void, len: *mut usize, ...) -> c_int;
        pub fn vips_tiffsave_buffer(image: *mut VipsImage, buf: *mut *mut c_void, len: *mut usize, ...) -> c_int;
        pub fn vips_heifsave_buffer(image: *mut VipsImage, buf: *mut *mut c_void, len: *mut usize, ...) -> c_int;
        pub fn vips_jpegsave_buffer(image: *mut VipsImage, buf: *mut *mut c_void, len: *mut usize, ...) -> c_int;
    }

    #[link(name = "glib-2.0")]
    unsafe extern "C" {
        pub fn g_free(mem: *mut c_void);
    }

    #[link(name = "gobject-2.0")]
    unsafe extern "C" {
        pub fn g_object_unref(object: *mut c_void);
    }
}

/// A libvips image reference. Unreferenced on drop.
pub struct VipsImage(NonNull<ffi::VipsImage>);

// SAFETY: libvips images are reference counted with atomic refcounts and
// immutable once loaded.
unsafe impl Send for VipsImage {}
unsafe impl Sync for VipsImage {}

impl VipsImage {
    fn as_ptr(&self) -> *mut ffi::VipsImage {
        self.0.as_ptr()
    }
}

impl Drop for VipsImage {
    fn drop(&mut self) {
        // SAFETY: we hold one reference.
        unsafe { ffi::g_object_unref(self.0.as_ptr().cast()) }
    }
}

impl core::fmt::Debug for VipsImage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("VipsImage").field(&self.0).finish()
    }
}

/// The libvips engine. Obtain the started instance through [`foreign`].
#[derive(Debug)]
pub struct Vips {
    _started: (),
}

static FOREIGN: OnceLock<Result<Foreign<Vips>, String>> = OnceLock::new();

/// Start libvips once per process and return the shared handle.
pub fn foreign() -> Result<&'static Foreign<Vips>, CodecError> {
    FOREIGN
        .get_or_init(|| {
            // SAFETY: guarded by the OnceLock; vips_init is called once.
            let status = unsafe { ffi::vips_init(c"zenforeign".as_ptr()) };
            if status != 0 {
                return Err(take_error().map_or_else(
                    || "vips_init failed".to_owned(),
                    NativeError::into_message,
                ));
            }
            tracing::debug!("libvips started");
            Ok(Foreign::new(Vips { _started: () }))
        })
        .as_ref()
        .map_err(|message| CodecError::Startup(message.clone()))
}

/// The current libvips error text, released with `vips_error_clear`.
fn take_error() -> Option<NativeError> {
    // SAFETY: returns libvips' static error buffer.
    let ptr = unsafe { ffi::vips_error_buffer() };
    let ptr = NonNull::new(ptr.cast_mut())?;
    // SAFETY: the buffer stays valid until `vips_error_clear`.
    Some(unsafe { NativeError::from_raw(ptr, clear_error) })
}

unsafe fn clear_error(_: *mut c_char) {
    // SAFETY: always safe to call after vips_init.
    unsafe { ffi::vips_error_clear() }
}

unsafe fn free_g_buffer(ptr: *mut u8, _len: usize) {
    // SAFETY: libvips save buffers are g_malloc'd.
    unsafe { ffi::g_free(ptr.cast()) }
}

fn flag(value: bool) -> c_int {
    c_int::from(value)
}

fn input(buf: &[u8]) -> (*mut c_void, usize) {
    // libvips takes `void *` but does not write to load buffers.
    (buf.as_ptr().cast_mut().cast(), buf.len())
}

/// Record the outcome of a loader call into `out`.
fn finish_load(status: c_int, raw: *mut ffi::VipsImage, out: &mut LoadOut<VipsImage>) -> Status {
    let loaded = NonNull::new(raw).map(VipsImage);
    if status != 0 {
        drop(loaded);
        out.error = take_error();
        return status;
    }
    let Some(loaded) = loaded else {
        out.error = take_error();
        return -1;
    };

    // Loads are lazy; detach the image from the caller's buffer before the
    // borrow ends.
    // SAFETY: `loaded` is a valid image.
    let copied = unsafe { ffi::vips_image_copy_memory(loaded.as_ptr()) };
    drop(loaded);
    match NonNull::new(copied) {
        Some(copied) => {
            out.image = Some(VipsImage(copied));
            0
        }
        None => {
            out.error = take_error();
            -1
        }
    }
}

/// Record the outcome of a saver call into `out`.
fn finish_save(status: c_int, buf: *mut c_void, len: usize, out: &mut SaveOut) -> Status {
    if let Some(ptr) = NonNull::new(buf.cast::<u8>()) {
        // SAFETY: libvips hands over a g_malloc'd buffer of `len` bytes.
        out.buffer = Some(unsafe { NativeBuffer::from_raw(ptr, len, free_g_buffer) });
    }
    if status != 0 {
        out.error = take_error();
    }
    status
}

const LOADERS: [(ImageFormat, &CStr); 9] = [
    (ImageFormat::Jpeg, c"jpegload_buffer"),
    (ImageFormat::Png, c"pngload_buffer"),
    (ImageFormat::WebP, c"webpload_buffer"),
    (ImageFormat::Tiff, c"tiffload_buffer"),
    (ImageFormat::Gif, c"gifload_buffer"),
    (ImageFormat::Pdf, c"pdfload_buffer"),
    (ImageFormat::Svg, c"svgload_buffer"),
    (ImageFormat::Heif, c"heifload_buffer"),
    (ImageFormat::Magick, c"magickload_buffer"),
];

const END: *const c_char = ptr::null();

// Every variadic call below passes (name, value) pairs terminated by NULL,
// with `c_int` for int/gboolean options and `f64` for double options.
impl Engine for Vips {
    type Image = VipsImage;

    fn supported_formats(&self) -> FormatSet {
        LOADERS
            .iter()
            .filter(|(_, nickname)| {
                // SAFETY: both arguments are NUL-terminated.
                let ty = unsafe { ffi::vips_type_find(c"VipsOperation".as_ptr(), nickname.as_ptr()) };
                ty != 0
            })
            .map(|&(format, _)| format)
            .collect()
    }

    fn load_jpeg(&self, buf: &[u8], p: &JpegLoad, out: &mut LoadOut<VipsImage>) -> Status {
        let (data, len) = input(buf);
        let mut raw = ptr::null_mut();
        // SAFETY: `buf` is live for the call.
        let status = unsafe {
            ffi::vips_jpegload_buffer(
                data,
                len,
                &mut raw,
                c"shrink".as_ptr(),
                p.shrink,
                c"fail".as_ptr(),
                flag(p.fail),
                c"autorotate".as_ptr(),
                flag(p.autorotate),
                END,
            )
        };
        finish_load(status, raw, out)
    }

    fn load_png(&self, buf: &[u8], out: &mut LoadOut<VipsImage>) -> Status {
        let (data, len) = input(buf);
        let mut raw = ptr::null_mut();
        // SAFETY: `buf` is live for the call.
        let status = unsafe { ffi::vips_pngload_buffer(data, len, &mut raw, END) };
        finish_load(status, raw, out)
    }

    fn load_webp(&self, buf: &[u8], p: &WebpLoad, out: &mut LoadOut<VipsImage>) -> Status {
        let (data, len) = input(buf);
        let mut raw = ptr::null_mut();
        // SAFETY: `buf` is live for the call.
        let status = unsafe {
            ffi::vips_webpload_buffer(data, len, &mut raw, c"shrink".as_ptr(), p.shrink, END)
        };
        finish_load(status, raw, out)
    }

    fn load_tiff(&self, buf: &[u8], p: &TiffLoad, out: &mut LoadOut<VipsImage>) -> Status {
        let (data, len) = input(buf);
        let mut raw = ptr::null_mut();
        // SAFETY: `buf` is live for the call.
        let status = unsafe {
            ffi::vips_tiffload_buffer(
                data,
                len,
                &mut raw,
                c"page".as_ptr(),
                p.page,
                c"n".as_ptr(),
                p.frame_count,
                c"autorotate".as_ptr(),
                flag(p.autorotate),
                c"subifd".as_ptr(),
                p.subifd,
                END,
            )
        };
        finish_load(status, raw, out)
    }

    fn load_gif(&self, buf: &[u8], p: &GifLoad, out: &mut LoadOut<VipsImage>) -> Status {
        let (data, len) = input(buf);
        let mut raw = ptr::null_mut();
        // SAFETY: `buf` is live for the call.
        let status = unsafe {
            ffi::vips_gifload_buffer(
                data,
                len,
                &mut raw,
                c"page".as_ptr(),
                p.page,
                c"n".as_ptr(),
                p.frame_count,
                END,
            )
        };
        finish_load(status, raw, out)
    }

    fn load_pdf(&self, buf: &[u8], p: &PdfLoad, out: &mut LoadOut<VipsImage>) -> Status {
        let (data, len) = input(buf);
        let mut raw = ptr::null_mut();
        // SAFETY: `buf` is live for the call.
        let status = unsafe {
            ffi::vips_pdfload_buffer(
                data,
                len,
                &mut raw,
                c"page".as_ptr(),
                p.page,
                c"n".as_ptr(),
                p.frame_count,
                c"dpi".as_ptr(),
                p.dpi,
                c"scale".as_ptr(),
                p.scale,
                END,
            )
        };
        finish_load(status, raw, out)
    }

    fn load_svg(&self, buf: &[u8], p: &SvgLoad, out: &mut LoadOut<VipsImage>) -> Status {
        let (data, len) = input(buf);
        let mut raw = ptr::null_mut();
        // SAFETY: `buf` is live for the call.
        let status = unsafe {
            ffi::vips_svgload_buffer(
                data,
                len,
                &mut raw,
                c"dpi".as_ptr(),
                p.dpi,
                c"scale".as_ptr(),
                p.scale,
                c"unlimited".as_ptr(),
                flag(p.unlimited),
                END,
            )
        };
        finish_load(status, raw, out)
    }

    fn load_heif(&self, buf: &[u8], p: &HeifLoad, out: &mut LoadOut<VipsImage>) -> Status {
        let (data, len) = input(buf);
        let mut raw = ptr::null_mut();
        // SAFETY: `buf` is live for the call.
        let status = unsafe {
            ffi::vips_heifload_buffer(
                data,
                len,
                &mut raw,
                c"page".as_ptr(),
                p.page,
                c"n".as_ptr(),
                p.frame_count,
                c"thumbnail".as_ptr(),
                flag(p.thumbnail),
                END,
            )
        };
        finish_load(status, raw, out)
    }

    fn load_magick(&self, buf: &[u8], p: &MagickLoad<'_>, out: &mut LoadOut<VipsImage>) -> Status {
        let Ok(density) = CString::new(p.density) else {
            out.error = Some(NativeError::from_message("magickload: density contains a NUL byte"));
            return -1;
        };
        let (data, len) = input(buf);
        let mut raw = ptr::null_mut();
        // SAFETY: `buf` and `density` are live for the call.
        let status = unsafe {
            ffi::vips_magickload_buffer(
                data,
                len,
                &mut raw,
                c"page".as_ptr(),
                p.page,
                c"n".as_ptr(),
                p.frame_count,
                c"density".as_ptr(),
                density.as_ptr(),
                END,
            )
        };
        finish_load(status, raw, out)
    }

    fn save_png(&self, image: &VipsImage, p: &PngSaveParams, out: &mut SaveOut) -> Status {
        let mut buf = ptr::null_mut();
        let mut len = 0;
        // SAFETY: `image` is a valid reference for the call.
        let status = unsafe {
            ffi::vips_pngsave_buffer(
                image.as_ptr(),
                &mut buf,
                &mut len,
                c"strip".as_ptr(),
                flag(p.strip_metadata),
                c"compression".as_ptr(),
                p.compression,
                c"interlace".as_ptr(),
                flag(p.interlace),
                END,
            )
        };
        finish_save(status, buf, len, out)
    }

    fn save_webp(&self, image: &VipsImage, p: &WebpSaveParams, out: &mut SaveOut) -> Status {
        let mut buf = ptr::null_mut();
        let mut len = 0;
        // SAFETY: `image` is a valid reference for the call.
        let status = unsafe {
            ffi::vips_webpsave_buffer(
                image.as_ptr(),
                &mut buf,
                &mut len,
                c"strip".as_ptr(),
                flag(p.strip_metadata),
                c"Q".as_ptr(),
                p.quality,
                c"lossless".as_ptr(),
                flag(p.lossless),
                c"effort".as_ptr(),
                p.effort,
                END,
            )
        };
        finish_save(status, buf, len, out)
    }

    fn save_tiff(&self, image: &VipsImage, p: &TiffSaveParams, out: &mut SaveOut) -> Status {
        let compression = if p.lossless {
            ffi::TIFF_COMPRESSION_LZW
        } else {
            ffi::TIFF_COMPRESSION_JPEG
        };
        let mut buf = ptr::null_mut();
        let mut len = 0;
        // SAFETY: `image` is a valid reference for the call.
        let status = unsafe {
            ffi::vips_tiffsave_buffer(
                image.as_ptr(),
                &mut buf,
                &mut len,
                c"strip".as_ptr(),
                flag(p.strip_metadata),
                c"Q".as_ptr(),
                p.quality,
                c"compression".as_ptr(),
                compression,
                END,
            )
        };
        finish_save(status, buf, len, out)
    }

    fn save_heif(&self, image: &VipsImage, p: &HeifSaveParams, out: &mut SaveOut) -> Status {
        let mut buf = ptr::null_mut();
        let mut len = 0;
        // SAFETY: `image` is a valid reference for the call.
        let status = unsafe {
            ffi::vips_heifsave_buffer(
                image.as_ptr(),
                &mut buf,
                &mut len,
                c"Q".as_ptr(),
                p.quality,
                c"lossless".as_ptr(),
                flag(p.lossless),
                END,
            )
        };
        finish_save(status, buf, len, out)
    }

    fn save_jpeg(&self, image: &VipsImage, p: &JpegSaveParams, out: &mut SaveOut) -> Status {
        let mut buf = ptr::null_mut();
        let mut len = 0;
        // SAFETY: `image` is a valid reference for the call.
        let status = unsafe {
            ffi::vips_jpegsave_buffer(
                image.as_ptr(),
                &mut buf,
                &mut len,
                c"strip".as_ptr(),
                flag(p.strip_metadata),
                c"Q".as_ptr(),
                p.quality,
                c"interlace".as_ptr(),
                flag(p.interlace),
                END,
            )
        };
        finish_save(status, buf, len, out)
    }
}
