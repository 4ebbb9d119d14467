use std::io::Cursor;

use super::*;
use crate::assets::fetch::InMemoryFetcher;

const BASE: &str = "https://images.neopets.com/cp/items/data/000/000/500/500_abc/";
const MANIFEST_URL: &str = "https://images.neopets.com/cp/items/data/000/000/500/500_abc/500.json";

fn png(w: u32, h: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba(rgba));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn assert_near(actual: Option<[u8; 4]>, expected: [u8; 4]) {
    let actual = actual.unwrap();
    for (a, e) in actual.iter().zip(expected) {
        assert!(a.abs_diff(e) <= 1, "{actual:?} vs {expected:?}");
    }
}

fn manifest(extra_placement: &str) -> String {
    format!(
        r#"{{
  "width": 10, "height": 10,
  "sprites": [
    {{ "id": "bg", "url": "bg.png" }},
    {{ "id": "dot", "url": "dot.png" }}
  ],
  "frames": [
    {{ "placements": [ {{ "sprite": "bg" }}, {extra_placement} ] }},
    {{ "placements": [] }}
  ]
}}"#
    )
}

fn fetcher(manifest_json: &str) -> InMemoryFetcher {
    InMemoryFetcher::new()
        .with_asset(MANIFEST_URL, manifest_json.as_bytes().to_vec())
        .with_asset(format!("{BASE}bg.png"), png(10, 10, [255, 0, 0, 255]))
        .with_asset(format!("{BASE}dot.png"), png(5, 5, [0, 0, 255, 255]))
}

#[test]
fn first_frame_draws_placements_in_order_at_every_size() {
    let f = fetcher(&manifest(r#"{ "sprite": "dot", "x": 5, "y": 5 }"#));
    for size in OutfitSize::ALL {
        let n = size.px();
        let out = render_manifest_url(&f, MANIFEST_URL, size).unwrap();
        assert_eq!((out.width, out.height), (n, n));
        assert_near(out.pixel(n / 10, n / 10), [255, 0, 0, 255]);
        assert_near(out.pixel(n - 1 - n / 10, n - 1 - n / 10), [0, 0, 255, 255]);
    }
}

#[test]
fn placement_alpha_blends_over_earlier_sprites() {
    let f = fetcher(&manifest(r#"{ "sprite": "dot", "x": 5, "y": 5, "alpha": 0.5 }"#));
    let out = render_manifest_url(&f, MANIFEST_URL, OutfitSize::Px150).unwrap();
    let [r, g, b, a] = out.pixel(140, 140).unwrap();
    assert!(a >= 254);
    assert!(g <= 1);
    assert!((120..=135).contains(&r), "r={r}");
    assert!((120..=135).contains(&b), "b={b}");
}

#[test]
fn scaled_placement_covers_stage() {
    let f = fetcher(&manifest(r#"{ "sprite": "dot", "scale_x": 2, "scale_y": 2 }"#));
    let out = render_manifest_url(&f, MANIFEST_URL, OutfitSize::Px300).unwrap();
    assert_near(out.pixel(10, 10), [0, 0, 255, 255]);
    assert_near(out.pixel(290, 290), [0, 0, 255, 255]);
}

#[test]
fn missing_sprite_asset_fails_the_layer() {
    let f = InMemoryFetcher::new()
        .with_asset(MANIFEST_URL, manifest(r#"{ "sprite": "dot" }"#).into_bytes())
        .with_asset(format!("{BASE}bg.png"), png(10, 10, [255, 0, 0, 255]));
    let err = render_manifest_url(&f, MANIFEST_URL, OutfitSize::Px150).unwrap_err();
    assert!(matches!(err, OutfitError::Fetch { ref url, .. } if url.ends_with("dot.png")));
}

#[test]
fn sprites_are_fetched_once_per_frame() {
    let f = fetcher(&manifest(r#"{ "sprite": "bg", "x": 3 }"#));
    render_manifest_url(&f, MANIFEST_URL, OutfitSize::Px150).unwrap();
    assert_eq!(f.fetch_count(&format!("{BASE}bg.png")), 1);
    assert_eq!(f.fetch_count(&format!("{BASE}dot.png")), 0);
}

#[test]
fn malformed_manifest_is_decode_error() {
    let f = InMemoryFetcher::new().with_asset(MANIFEST_URL, b"{ not json".to_vec());
    let err = render_manifest_url(&f, MANIFEST_URL, OutfitSize::Px150).unwrap_err();
    assert!(matches!(err, OutfitError::Decode(_)));
}

#[test]
fn many_sprites_load_on_a_bounded_set_of_threads() {
    let count = SPRITE_FETCH_THREADS * 2 + 3;
    let sprites: Vec<String> = (0..count)
        .map(|i| format!(r#"{{ "id": "s{i}", "url": "s{i}.png" }}"#))
        .collect();
    let placements: Vec<String> = (0..count)
        .map(|i| format!(r#"{{ "sprite": "s{i}" }}"#))
        .collect();
    let json = format!(
        r#"{{ "width": 10, "height": 10, "sprites": [{}], "frames": [ {{ "placements": [{}] }} ] }}"#,
        sprites.join(","),
        placements.join(",")
    );
    let mut f = InMemoryFetcher::new().with_asset(MANIFEST_URL, json.into_bytes());
    for i in 0..count {
        f = f.with_asset(format!("{BASE}s{i}.png"), png(10, 10, [0, 255, 0, 255]));
    }

    let raster = render_manifest_url(&f, MANIFEST_URL, OutfitSize::Px150).unwrap();
    assert_near(raster.pixel(75, 75), [0, 255, 0, 255]);
    for i in 0..count {
        assert_eq!(f.fetch_count(&format!("{BASE}s{i}.png")), 1);
    }
}

#[test]
fn off_origin_sprite_is_never_fetched() {
    let json = r#"{ "width": 10, "height": 10,
        "sprites": [ { "id": "x", "url": "http://169.254.169.254/latest/meta-data" } ],
        "frames": [ { "placements": [ { "sprite": "x" } ] } ] }"#;
    let f = InMemoryFetcher::new().with_asset(MANIFEST_URL, json.as_bytes().to_vec());
    let err = render_manifest_url(&f, MANIFEST_URL, OutfitSize::Px150).unwrap_err();
    assert!(matches!(err, OutfitError::Decode(_)));
    assert_eq!(f.total_fetches(), 1);
}
