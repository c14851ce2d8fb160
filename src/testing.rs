//! Test doubles: a recording engine and native-allocation helpers.

use core::cell::Cell;
use core::ffi::c_char;
use core::ptr::NonNull;
use std::ffi::CString;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::bridge::{LoadOut, NativeBuffer, NativeError, SaveOut};
use crate::encode::{HeifSaveParams, JpegSaveParams, PngSaveParams, TiffSaveParams, WebpSaveParams};
use crate::engine::{
    Engine, GifLoad, HeifLoad, JpegLoad, MagickLoad, PdfLoad, Status, SvgLoad, TiffLoad, WebpLoad,
};
use crate::{FormatSet, ImageFormat};

thread_local! {
    static RELEASED_BUFFERS: Cell<usize> = const { Cell::new(0) };
    static RELEASED_ERRORS: Cell<usize> = const { Cell::new(0) };
}

/// Native buffers released on this thread.
pub(crate) fn released_buffers() -> usize {
    RELEASED_BUFFERS.with(Cell::get)
}

/// Native error strings released on this thread.
pub(crate) fn released_errors() -> usize {
    RELEASED_ERRORS.with(Cell::get)
}

/// A "native" buffer that is poisoned before it is freed.
pub(crate) fn native_buffer(data: &[u8]) -> NativeBuffer {
    let boxed: Box<[u8]> = data.into();
    let len = boxed.len();
    let ptr = NonNull::from(Box::leak(boxed)).cast::<u8>();
    // SAFETY: leaked box of `len` bytes, released by `poison_and_free`.
    unsafe { NativeBuffer::from_raw(ptr, len, poison_and_free) }
}

unsafe fn poison_and_free(ptr: *mut u8, len: usize) {
    // SAFETY: allocated by `native_buffer` with the same length.
    let mut boxed = unsafe { Box::from_raw(core::ptr::slice_from_raw_parts_mut(ptr, len)) };
    boxed.fill(0xDD);
    drop(boxed);
    RELEASED_BUFFERS.with(|n| n.set(n.get() + 1));
}

/// "Native" error text that counts its release.
pub(crate) fn native_error(message: &str) -> NativeError {
    let text = CString::new(message).expect("test message has no NUL");
    let ptr = NonNull::new(text.into_raw()).expect("into_raw is non-null");
    // SAFETY: released by `count_and_free`.
    unsafe { NativeError::from_raw(ptr, count_and_free) }
}

unsafe fn count_and_free(ptr: *mut c_char) {
    // SAFETY: produced by `native_error`.
    drop(unsafe { CString::from_raw(ptr) });
    RELEASED_ERRORS.with(|n| n.set(n.get() + 1));
}

/// A 1×1 24-bit BMP with the given BGR pixel.
pub(crate) fn bmp_1x1(bgr: [u8; 3]) -> Vec<u8> {
    let mut data = Vec::with_capacity(58);
    // BITMAPFILEHEADER
    data.extend_from_slice(b"BM");
    data.extend_from_slice(&58u32.to_le_bytes());
    data.extend_from_slice(&[0; 4]);
    data.extend_from_slice(&54u32.to_le_bytes());
    // BITMAPINFOHEADER
    data.extend_from_slice(&40u32.to_le_bytes());
    data.extend_from_slice(&1i32.to_le_bytes());
    data.extend_from_slice(&1i32.to_le_bytes());
    data.extend_from_slice(&1u16.to_le_bytes());
    data.extend_from_slice(&24u16.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&4u32.to_le_bytes());
    data.extend_from_slice(&2835i32.to_le_bytes());
    data.extend_from_slice(&2835i32.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());
    // One row, padded to four bytes.
    data.extend_from_slice(&bgr);
    data.push(0);
    data
}

/// What the engine was asked to do.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Call {
    Jpeg(JpegLoad),
    Png,
    Webp(WebpLoad),
    Tiff(TiffLoad),
    Gif(GifLoad),
    Pdf(PdfLoad),
    Svg(SvgLoad),
    Heif(HeifLoad),
    Magick {
        page: i32,
        frame_count: i32,
        density: String,
    },
    SavePng(PngSaveParams),
    SaveWebp(WebpSaveParams),
    SaveTiff(TiffSaveParams),
    SaveHeif(HeifSaveParams),
    SaveJpeg(JpegSaveParams),
}

#[derive(Debug)]
pub(crate) struct MockImage {
    pub format: ImageFormat,
    pub data: Vec<u8>,
}

enum Failure {
    Never,
    WithMessage(&'static str),
    Silently,
}

/// Engine that records calls and echoes its input.
///
/// Loaded images hold a copy of the input. Saved output is
/// `"<format>:" + image data`, in a buffer that is poisoned on release.
pub(crate) struct MockEngine {
    supported: FormatSet,
    failure: Failure,
    probes: AtomicUsize,
    calls: Mutex<Vec<Call>>,
}

impl MockEngine {
    pub fn supporting(formats: &[ImageFormat]) -> Self {
        Self {
            supported: formats.iter().copied().collect(),
            failure: Failure::Never,
            probes: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Everything except BMP, like the real engine.
    pub fn supporting_all() -> Self {
        let mut set = FormatSet::all();
        set.remove(ImageFormat::Bmp);
        Self::supporting(&set.iter().collect::<Vec<_>>())
    }

    pub fn failing_with(mut self, message: &'static str) -> Self {
        self.failure = Failure::WithMessage(message);
        self
    }

    pub fn failing_silently(mut self) -> Self {
        self.failure = Failure::Silently;
        self
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn fail(&self, error: &mut Option<NativeError>) -> Option<Status> {
        match self.failure {
            Failure::Never => None,
            Failure::WithMessage(message) => {
                *error = Some(native_error(message));
                Some(1)
            }
            Failure::Silently => Some(1),
        }
    }

    fn load(
        &self,
        format: ImageFormat,
        buf: &[u8],
        call: Call,
        out: &mut LoadOut<MockImage>,
    ) -> Status {
        self.record(call);
        if let Some(status) = self.fail(&mut out.error) {
            return status;
        }
        out.image = Some(MockImage {
            format,
            data: buf.to_vec(),
        });
        0
    }

    fn save(&self, format: ImageFormat, image: &MockImage, call: Call, out: &mut SaveOut) -> Status {
        self.record(call);
        let mut encoded = format!("{format}:").into_bytes();
        encoded.extend_from_slice(&image.data);
        // Failed saves still leave a partial buffer to release.
        out.buffer = Some(native_buffer(&encoded));
        self.fail(&mut out.error).unwrap_or(0)
    }
}

impl Engine for MockEngine {
    type Image = MockImage;

    fn supported_formats(&self) -> FormatSet {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.supported
    }

    fn load_jpeg(&self, buf: &[u8], params: &JpegLoad, out: &mut LoadOut<MockImage>) -> Status {
        self.load(ImageFormat::Jpeg, buf, Call::Jpeg(*params), out)
    }

    fn load_png(&self, buf: &[u8], out: &mut LoadOut<MockImage>) -> Status {
        if !buf.starts_with(b"\x89PNG") {
            self.record(Call::Png);
            out.error = Some(native_error("pngload_buffer: not a png"));
            return -1;
        }
        self.load(ImageFormat::Png, buf, Call::Png, out)
    }

    fn load_webp(&self, buf: &[u8], params: &WebpLoad, out: &mut LoadOut<MockImage>) -> Status {
        self.load(ImageFormat::WebP, buf, Call::Webp(*params), out)
    }

    fn load_tiff(&self, buf: &[u8], params: &TiffLoad, out: &mut LoadOut<MockImage>) -> Status {
        self.load(ImageFormat::Tiff, buf, Call::Tiff(*params), out)
    }

    fn load_gif(&self, buf: &[u8], params: &GifLoad, out: &mut LoadOut<MockImage>) -> Status {
        self.load(ImageFormat::Gif, buf, Call::Gif(*params), out)
    }

    fn load_pdf(&self, buf: &[u8], params: &PdfLoad, out: &mut LoadOut<MockImage>) -> Status {
        self.load(ImageFormat::Pdf, buf, Call::Pdf(*params), out)
    }

    fn load_svg(&self, buf: &[u8], params: &SvgLoad, out: &mut LoadOut<MockImage>) -> Status {
        self.load(ImageFormat::Svg, buf, Call::Svg(*params), out)
    }

    fn load_heif(&self, buf: &[u8], params: &HeifLoad, out: &mut LoadOut<MockImage>) -> Status {
        self.load(ImageFormat::Heif, buf, Call::Heif(*params), out)
    }

    fn load_magick(
        &self,
        buf: &[u8],
        params: &MagickLoad<'_>,
        out: &mut LoadOut<MockImage>,
    ) -> Status {
        let call = Call::Magick {
            page: params.page,
            frame_count: params.frame_count,
            density: params.density.to_owned(),
        };
        self.load(ImageFormat::Magick, buf, call, out)
    }

    fn save_png(&self, image: &MockImage, params: &PngSaveParams, out: &mut SaveOut) -> Status {
        self.save(ImageFormat::Png, image, Call::SavePng(*params), out)
    }

    fn save_webp(&self, image: &MockImage, params: &WebpSaveParams, out: &mut SaveOut) -> Status {
        self.save(ImageFormat::WebP, image, Call::SaveWebp(*params), out)
    }

    fn save_tiff(&self, image: &MockImage, params: &TiffSaveParams, out: &mut SaveOut) -> Status {
        self.save(ImageFormat::Tiff, image, Call::SaveTiff(*params), out)
    }

    fn save_heif(&self, image: &MockImage, params: &HeifSaveParams, out: &mut SaveOut) -> Status {
        self.save(ImageFormat::Heif, image, Call::SaveHeif(*params), out)
    }

    fn save_jpeg(&self, image: &MockImage, params: &JpegSaveParams, out: &mut SaveOut) -> Status {
        self.save(ImageFormat::Jpeg, image, Call::SaveJpeg(*params), out)
    }
}
