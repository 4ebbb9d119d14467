use std::io::Cursor;

use super::*;
use crate::animation::pool::PoolOpts;
use crate::assets::decode::decode_image;
use crate::assets::fetch::InMemoryFetcher;

const BG: &str = "https://impress-asset-images.openneo.net/biology/000/000/005/5/600x600.png";
const DOT: &str = "https://impress-asset-images.openneo.net/object/000/000/045/45/600x600.png";
const MISSING: &str = "https://impress-asset-images.openneo.net/object/000/000/404/404/600x600.png";

fn png(w: u32, h: u32, f: impl Fn(u32, u32) -> [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_fn(w, h, |x, y| image::Rgba(f(x, y)));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn raster(url: &str) -> LayerSource {
    LayerSource::StaticRaster {
        url: url.to_string(),
    }
}

fn compositor() -> Compositor {
    let fetcher = InMemoryFetcher::new()
        .with_asset(BG, png(600, 600, |_, _| [0, 0, 255, 255]))
        .with_asset(
            DOT,
            png(600, 600, |x, y| {
                if x < 300 && y < 300 {
                    [255, 0, 0, 255]
                } else {
                    [0, 0, 0, 0]
                }
            }),
        );
    let resolver = LayerResolver::new(Arc::new(fetcher), &PoolOpts::default());
    Compositor::new(Arc::new(resolver), &CompositorOpts::default()).unwrap()
}

#[test]
fn draws_in_listed_order() {
    let c = compositor();
    let out = c.composite(&[raster(BG), raster(DOT)], OutfitSize::Px600).unwrap();
    assert!(out.is_complete());
    let img = decode_image(&out.png).unwrap();
    assert_eq!((img.width, img.height), (600, 600));
    assert_eq!(img.pixel(10, 10), Some([255, 0, 0, 255]));
    assert_eq!(img.pixel(500, 500), Some([0, 0, 255, 255]));

    // Reversed order: the opaque background hides the dot entirely.
    let out = c.composite(&[raster(DOT), raster(BG)], OutfitSize::Px600).unwrap();
    let img = decode_image(&out.png).unwrap();
    assert_eq!(img.pixel(10, 10), Some([0, 0, 255, 255]));
}

#[test]
fn every_size_is_exact() {
    let c = compositor();
    for size in OutfitSize::ALL {
        let out = c.composite(&[raster(BG)], size).unwrap();
        let img = decode_image(&out.png).unwrap();
        assert_eq!((img.width, img.height), (size.px(), size.px()));
        assert_eq!(out.size, size);
    }
}

#[test]
fn partial_failure_still_renders() {
    let c = compositor();
    let out = c
        .composite(&[raster(BG), raster(MISSING)], OutfitSize::Px150)
        .unwrap();
    let RenderStatus::PartialFailure { failed } = &out.status else {
        panic!("expected partial failure, got {:?}", out.status);
    };
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].url, MISSING);
    let img = decode_image(&out.png).unwrap();
    assert_eq!(img.pixel(75, 75), Some([0, 0, 255, 255]));
}

#[test]
fn total_failure_is_an_error() {
    let c = compositor();
    let err = c
        .composite(&[raster(MISSING), raster(MISSING)], OutfitSize::Px150)
        .unwrap_err();
    let OutfitError::AllLayersFailed { urls } = err else {
        panic!("expected all-layers-failed, got {err:?}");
    };
    assert_eq!(urls, vec![MISSING.to_string(), MISSING.to_string()]);
}

#[test]
fn empty_layer_list_is_an_error() {
    let c = compositor();
    assert!(matches!(
        c.composite(&[], OutfitSize::Px150),
        Err(OutfitError::AllLayersFailed { ref urls }) if urls.is_empty()
    ));
}

#[test]
fn one_shot_render_matches_compositor() {
    let c = compositor();
    let layers = [raster(BG), raster(DOT)];
    let a = c.composite(&layers, OutfitSize::Px300).unwrap();
    let b = render_outfit_image(c.resolver(), &layers, OutfitSize::Px300).unwrap();
    assert_eq!(a, b);
}

#[test]
fn zero_fetch_threads_is_rejected() {
    let resolver = LayerResolver::new(Arc::new(InMemoryFetcher::new()), &PoolOpts::default());
    let opts = CompositorOpts {
        fetch_threads: Some(0),
    };
    assert!(matches!(
        Compositor::new(Arc::new(resolver), &opts),
        Err(OutfitError::Validation(_))
    ));
}
