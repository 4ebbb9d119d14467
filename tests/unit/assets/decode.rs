use std::io::Cursor;

use super::*;

fn png(w: u32, h: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba(rgba));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn decode_image_png_dimensions_and_premul() {
    let raster = decode_image(&png(1, 1, [100, 50, 200, 128])).unwrap();
    assert_eq!(raster.width, 1);
    assert_eq!(raster.height, 1);
    assert_eq!(
        raster.rgba8_premul.as_slice(),
        &[
            ((100u16 * 128 + 127) / 255) as u8,
            ((50u16 * 128 + 127) / 255) as u8,
            ((200u16 * 128 + 127) / 255) as u8,
            128u8
        ]
    );
}

#[test]
fn decode_garbage_is_decode_error() {
    let err = decode_image(b"definitely not a png").unwrap_err();
    assert!(matches!(err, OutfitError::Decode(_)));
}

#[test]
fn scaled_to_fills_every_size() {
    for size in OutfitSize::ALL {
        let raster = decode_image(&png(7, 3, [255, 0, 0, 255])).unwrap();
        let scaled = raster.scaled_to(size).unwrap();
        assert_eq!((scaled.width, scaled.height), (size.px(), size.px()));
        assert_eq!(scaled.pixel(0, 0), Some([255, 0, 0, 255]));
        assert_eq!(scaled.pixel(size.px() - 1, size.px() - 1), Some([255, 0, 0, 255]));
    }
}

#[test]
fn encode_png_round_trips_opaque_pixels() {
    let raster = decode_image(&png(2, 2, [10, 20, 30, 255])).unwrap();
    let bytes = raster.encode_png().unwrap();
    let back = decode_image(&bytes).unwrap();
    assert_eq!(back, raster);
}

#[test]
fn parse_svg_ok_and_err() {
    let ok = br#"<svg xmlns="http://www.w3.org/2000/svg" width="1" height="1"></svg>"#;
    parse_svg(ok).unwrap();
    assert!(matches!(parse_svg(b"<svg").unwrap_err(), OutfitError::Decode(_)));
}
