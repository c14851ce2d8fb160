#![no_main]

use libfuzzer_sys::fuzz_target;
use zenforeign::ImageFormat;

fuzz_target!(|data: &[u8]| {
    let format = ImageFormat::detect(data);
    if data.len() < 12 {
        assert_eq!(format, ImageFormat::Unknown);
    }
    assert_ne!(format, ImageFormat::Magick);
    assert_eq!(zenforeign::classify(data), format);
});
