use std::io::Cursor;

use super::*;
use crate::appearance::catalog::InMemoryCatalog;
use crate::assets::decode::decode_image;
use crate::assets::fetch::InMemoryFetcher;
use crate::service::http::CACHE_NO_STORE;

const BODY: &str = "https://impress-asset-images.openneo.net/biology/000/000/000/11/600x600.png?v2-1";
const BACKGROUND: &str =
    "https://impress-asset-images.openneo.net/object/000/000/000/21/600x600.png?v2-1";
const FOREGROUND: &str = "https://images.neopets.com/cp/items/data/000/000/022/22_abcdef1234/22.svg";
const MANIFEST: &str = "https://images.neopets.com/cp/items/data/000/000/500/500_abc/500.json";
const SPRITE: &str = "https://images.neopets.com/cp/items/data/000/000/500/500_abc/s.png";

fn png(rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(600, 600, image::Rgba(rgba));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn fetcher() -> InMemoryFetcher {
    let fg = br##"<svg xmlns="http://www.w3.org/2000/svg" width="600" height="600">
  <rect x="0" y="0" width="300" height="300" fill="#ff0000"/>
</svg>"##;
    let manifest = r#"{ "width": 10, "height": 10,
        "sprites": [ { "id": "s", "url": "s.png" } ],
        "frames": [ { "placements": [ { "sprite": "s" } ] } ] }"#;
    InMemoryFetcher::new()
        .with_asset(BODY, png([0, 255, 0, 255]))
        .with_asset(BACKGROUND, png([0, 0, 255, 255]))
        .with_asset(FOREGROUND, fg.to_vec())
        .with_asset(MANIFEST, manifest.as_bytes().to_vec())
        .with_asset(SPRITE, png([255, 255, 0, 255]))
}

fn service() -> RenderService {
    let catalog = InMemoryCatalog::from_path("tests/data/catalog.json").unwrap();
    RenderService::with_fetcher(
        &ServiceOpts::default(),
        Arc::new(catalog),
        Arc::new(fetcher()),
    )
    .unwrap()
}

fn cache_control(resp: &HttpResponse) -> Option<&str> {
    resp.header(header::CACHE_CONTROL)
}

#[test]
fn outfit_without_updated_at_redirects() {
    let resp = service().outfit_image_by_id(&Query::from_pairs([("id", "31856")]));
    assert_eq!(resp.status, StatusCode::FOUND);
    assert_eq!(
        resp.header(header::LOCATION),
        Some("/api/outfitImage?id=31856&size=600&updatedAt=1700000000000")
    );
    assert_eq!(cache_control(&resp), Some(CACHE_SHORT));
}

#[test]
fn redirect_keeps_requested_size() {
    let resp =
        service().outfit_image_by_id(&Query::from_pairs([("id", "31856"), ("size", "150")]));
    assert_eq!(
        resp.header(header::LOCATION),
        Some("/api/outfitImage?id=31856&size=150&updatedAt=1700000000000")
    );
}

#[test]
fn current_outfit_version_is_immutable() {
    let resp = service().outfit_image_by_id(&Query::from_pairs([
        ("id", "31856"),
        ("updatedAt", "1700000000000"),
        ("size", "300"),
    ]));
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(cache_control(&resp), Some(CACHE_IMMUTABLE));
    assert!(resp.header(header::ETAG).is_some());
    let img = decode_image(&resp.body).unwrap();
    assert_eq!((img.width, img.height), (300, 300));
}

#[test]
fn stale_outfit_version_gets_short_cache() {
    let resp = service().outfit_image_by_id(&Query::from_pairs([
        ("id", "31856"),
        ("updatedAt", "1"),
    ]));
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(cache_control(&resp), Some(CACHE_SHORT));
}

#[test]
fn unknown_outfit_is_404() {
    let resp = service().outfit_image_by_id(&Query::from_pairs([("id", "999")]));
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(cache_control(&resp), Some(CACHE_NO_STORE));
}

#[test]
fn invalid_parameters_are_400() {
    let svc = service();
    for resp in [
        svc.outfit_image_by_id(&Query::from_pairs([("id", "abc")])),
        svc.outfit_image_by_id(&Query::from_pairs([("id", "31856"), ("size", "512")])),
        svc.outfit_image_by_id(&Query::from_pairs([("id", "31856"), ("updatedAt", "soon")])),
        svc.outfit_image(&Query::from_pairs([("layerUrls", BODY)])),
        svc.outfit_image(&Query::from_pairs([("size", "600")])),
        svc.outfit_image(&Query::from_pairs([("size", "600"), ("layerUrls", " , ")])),
        svc.outfit_image(&Query::from_pairs([
            ("size", "600"),
            ("layerUrls", "https://example.com/x.png"),
        ])),
    ] {
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert_eq!(cache_control(&resp), Some(CACHE_NO_STORE));
    }
}

#[test]
fn stateless_render_is_cached_forever() {
    let svc = service();
    let urls = format!("{BACKGROUND},{FOREGROUND}");
    let query = Query::from_pairs([("layerUrls", urls.as_str()), ("size", "600")]);
    let first = svc.outfit_image(&query);
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(cache_control(&first), Some(CACHE_IMMUTABLE));

    let second = svc.outfit_image(&query);
    assert_eq!(second.body, first.body);
    assert_eq!(second.header(header::ETAG), first.header(header::ETAG));
    let st = svc.cache_stats();
    assert_eq!((st.misses, st.hits), (1, 1));
}

#[test]
fn partial_failure_is_500_with_image() {
    let missing = "https://impress-asset-images.openneo.net/object/000/000/000/99/600x600.png";
    let urls = format!("{BACKGROUND},{missing}");
    let resp = service().outfit_image(&Query::from_pairs([
        ("layerUrls", urls.as_str()),
        ("size", "150"),
    ]));
    assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.header(header::CONTENT_TYPE), Some("image/png"));
    assert_eq!(cache_control(&resp), Some(CACHE_PARTIAL));
    assert!(decode_image(&resp.body).is_ok());
}

#[test]
fn total_failure_is_500_without_image() {
    let missing = "https://impress-asset-images.openneo.net/object/000/000/000/99/600x600.png";
    let resp = service().outfit_image(&Query::from_pairs([
        ("layerUrls", missing),
        ("size", "150"),
    ]));
    assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        resp.header(header::CONTENT_TYPE),
        Some("text/plain; charset=utf-8")
    );
    assert_eq!(cache_control(&resp), Some(CACHE_NO_STORE));
}

#[test]
fn asset_image_renders_first_frame() {
    let resp = service().asset_image(&Query::from_pairs([
        ("libraryUrl", MANIFEST),
        ("size", "150"),
    ]));
    assert_eq!(resp.status, StatusCode::OK);
    let img = decode_image(&resp.body).unwrap();
    assert_eq!((img.width, img.height), (150, 150));
    assert_eq!(img.pixel(75, 75), Some([255, 255, 0, 255]));
}

#[test]
fn asset_image_validates_and_reports_failures() {
    let svc = service();
    let bad_host = svc.asset_image(&Query::from_pairs([("libraryUrl", "https://evil.example/a.json")]));
    assert_eq!(bad_host.status, StatusCode::BAD_REQUEST);

    let missing = svc.asset_image(&Query::from_pairs([(
        "libraryUrl",
        "https://images.neopets.com/cp/items/data/000/000/404/404_x/404.json",
    )]));
    assert_eq!(missing.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(cache_control(&missing), Some(CACHE_NO_STORE));
}

#[test]
fn endpoint_layer_shares_cache_with_asset_image() {
    let svc = service();
    let asset = svc.asset_image(&Query::from_pairs([("libraryUrl", MANIFEST), ("size", "300")]));
    assert_eq!(asset.status, StatusCode::OK);

    let source = LayerSource::FrameAnimation {
        manifest_url: MANIFEST.to_string(),
    };
    let endpoint_url = svc.allow_list.canonical_url(&source, OutfitSize::Px300);
    let resp = svc.outfit_image(&Query::from_pairs([
        ("layerUrls", endpoint_url.as_str()),
        ("size", "300"),
    ]));
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body, asset.body);
    assert_eq!(svc.cache_stats().hits, 1);
}

#[test]
fn visible_layers_follow_outfit_state() {
    let ids: Vec<u64> = service()
        .visible_layers(OutfitId(31856))
        .unwrap()
        .iter()
        .map(|l| l.layer.id)
        .collect();
    assert_eq!(ids, vec![21, 11, 22]);
}
