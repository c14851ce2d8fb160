//! Process-wide save operation counters.
//!
//! Best effort and for observability only; nothing reads them on the hot path.

use core::sync::atomic::{AtomicU64, Ordering};

use crate::ImageFormat;

// Indexed by `ImageFormat` discriminant, `Unknown` included.
static SAVES: [AtomicU64; ImageFormat::ALL.len() + 1] =
    [const { AtomicU64::new(0) }; ImageFormat::ALL.len() + 1];

pub(crate) fn record_save(format: ImageFormat) {
    let count = SAVES[format as usize].fetch_add(1, Ordering::Relaxed) + 1;
    tracing::trace!(op = op_name(format), count, "save");
}

/// Number of save calls issued for `format` since process start.
pub fn save_count(format: ImageFormat) -> u64 {
    SAVES[format as usize].load(Ordering::Relaxed)
}

fn op_name(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "save_png_buffer",
        ImageFormat::WebP => "save_webp_buffer",
        ImageFormat::Tiff => "save_tiff_buffer",
        ImageFormat::Heif => "save_heif_buffer",
        ImageFormat::Jpeg => "save_jpeg_buffer",
        _ => "save_buffer",
    }
}
