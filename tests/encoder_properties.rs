// Integration tests for the adaptive JPEG encoder
use std::io::Cursor;

use image::{ImageFormat, Rgb, RgbImage};
use proptest::prelude::*;

use love_journal::image_handler::{
    DEFAULT_SIZE_BUDGET_BYTES, Dimensions, EncodeOptions, EncodeProfile, ImageConfig, ImageError,
    ImageHandler, ImageInput, ImageServiceState, JPEG_MIME, Quality, fallback_dimensions,
    normalized_dimensions,
};

fn png_bytes(img: &RgbImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).expect("encode png fixture");
    buf.into_inner()
}

fn gradient(width: u32, height: u32) -> Vec<u8> {
    png_bytes(&RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }))
}

/// 伪随机噪点图，JPEG 几乎无法压缩。
fn noise(width: u32, height: u32) -> Vec<u8> {
    let mut state: u32 = 0x9E37_79B9;
    png_bytes(&RgbImage::from_fn(width, height, |_, _| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let [a, b, c, _] = state.to_le_bytes();
        Rgb([a, b, c])
    }))
}

fn handler() -> ImageHandler {
    ImageHandler::new(ImageConfig::default()).expect("handler")
}

#[test]
fn gradient_photo_fits_default_budget() {
    let artifact = handler()
        .encode(&gradient(1600, 1200), &EncodeOptions::default())
        .expect("encode");

    assert_eq!(artifact.dimensions(), Dimensions::new(800, 600));
    assert!(artifact.text_len() <= DEFAULT_SIZE_BUDGET_BYTES);
    assert!(artifact.text().starts_with("data:image/jpeg;base64,/9j/"));
    assert_eq!(artifact.mime(), JPEG_MIME);
    assert!(!artifact.fallback_applied());
}

#[test]
fn small_image_is_not_upscaled() {
    let artifact = handler()
        .encode(&gradient(320, 200), &EncodeOptions::default())
        .expect("encode");
    assert_eq!(artifact.dimensions(), Dimensions::new(320, 200));
    assert_eq!(artifact.quality().percent(), 70);
}

#[test]
fn noisy_image_under_tiny_budget_still_terminates() {
    let options = EncodeOptions::default().with_size_budget(8 * 1024);
    let artifact = handler().encode(&noise(1200, 900), &options).expect("encode");

    assert!(artifact.fallback_applied());
    assert_eq!(artifact.quality().percent(), 60);
    assert!(artifact.dimensions().width < 800);
}

#[test]
fn encoding_is_deterministic() {
    let bytes = gradient(900, 700);
    let first = handler().encode(&bytes, &EncodeOptions::default()).expect("first");
    let second = handler().encode(&bytes, &EncodeOptions::default()).expect("second");
    assert_eq!(first.text(), second.text());
}

#[test]
fn non_image_bytes_are_a_decode_error() {
    let result = handler().encode(b"definitely not an image", &EncodeOptions::default());
    assert!(matches!(result, Err(ImageError::Decode(_))));
}

#[tokio::test]
async fn bytes_and_input_paths_reject_the_same_formats() {
    // PNM 能被 image 解码，但没有可识别的签名
    let mut buf = Cursor::new(Vec::new());
    RgbImage::from_fn(16, 16, |x, y| Rgb([x as u8, y as u8, 0]))
        .write_to(&mut buf, ImageFormat::Pnm)
        .expect("encode pnm fixture");
    let pnm = buf.into_inner();

    let direct = handler().encode(&pnm, &EncodeOptions::default());
    assert!(matches!(direct, Err(ImageError::Decode(_))), "got {:?}", direct);

    let via_input = handler().encode_input(ImageInput::Bytes(pnm.clone()), &EncodeOptions::default());
    assert!(matches!(via_input, Err(ImageError::Decode(_))), "got {:?}", via_input);

    let service = ImageServiceState::new().expect("service");
    let via_service = service.encode_bytes(pnm, EncodeOptions::default()).await;
    assert!(matches!(via_service, Err(ImageError::Decode(_))), "got {:?}", via_service);

    let png = gradient(40, 30);
    let direct = handler().encode(&png, &EncodeOptions::default()).expect("direct png");
    let via_input = handler()
        .encode_input(ImageInput::Bytes(png), &EncodeOptions::default())
        .expect("input png");
    assert_eq!(direct.text(), via_input.text());
}

#[test]
fn zero_budget_is_rejected() {
    let options = EncodeOptions::default().with_size_budget(0);
    let result = handler().encode(&gradient(10, 10), &options);
    assert!(matches!(result, Err(ImageError::InvalidFormat(_))));
}

#[tokio::test]
async fn service_accepts_data_uri_input() {
    use base64::Engine;

    let encoded = base64::engine::general_purpose::STANDARD.encode(gradient(1000, 500));
    let service = ImageServiceState::new().expect("service");
    let artifact = service
        .encode_with_profile(
            ImageInput::Base64(format!("data:image/png;base64,{encoded}")),
            EncodeProfile::Feed,
        )
        .await
        .expect("encode");
    assert_eq!(artifact.dimensions(), Dimensions::new(800, 400));
}

proptest! {
    #[test]
    fn normalized_dimensions_never_upscale_and_keep_aspect(
        width in 1u32..6000,
        height in 1u32..6000,
        max_width in 1u32..2000,
    ) {
        let options = EncodeOptions::default().with_max_width(max_width);
        let out = normalized_dimensions(Dimensions::new(width, height), &options);

        prop_assert!(out.width <= width.max(1));
        prop_assert!(out.height <= height.max(1));
        prop_assert!(out.width <= max_width);
        prop_assert!(out.height >= 1);
        if width > max_width {
            prop_assert_eq!(out.width, max_width);
            let expected = (f64::from(height) * f64::from(max_width) / f64::from(width)).round().max(1.0);
            prop_assert_eq!(f64::from(out.height), expected);
        } else {
            prop_assert_eq!(out, Dimensions::new(width, height));
        }
    }

    #[test]
    fn fallback_dimensions_shrink_by_area_ratio(
        width in 1u32..4000,
        height in 1u32..4000,
        budget in 1usize..1_000_000,
        text_len in 1usize..4_000_000,
    ) {
        let out = fallback_dimensions(Dimensions::new(width, height), budget, text_len);
        prop_assert!(out.width >= 1 && out.height >= 1);
        prop_assert!(out.width <= width && out.height <= height);
    }

    #[test]
    fn quality_percent_roundtrips_through_fraction(percent in 1u8..=100) {
        let quality = Quality::from_percent(percent).expect("valid percent");
        let back = Quality::from_fraction(quality.as_fraction()).expect("valid fraction");
        prop_assert_eq!(back.percent(), percent);
    }
}
