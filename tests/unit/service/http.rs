use super::*;

#[test]
fn query_decodes_and_keeps_first_value() {
    let q = Query::parse("?id=31856&size=300&size=150&layerUrls=a%2Cb&blank=%20");
    assert_eq!(q.get("id"), Some("31856"));
    assert_eq!(q.get("size"), Some("300"));
    assert_eq!(q.get("layerUrls"), Some("a,b"));
    assert_eq!(q.get("blank"), None);
    assert_eq!(q.get("missing"), None);
}

#[test]
fn require_names_the_parameter() {
    let err = Query::from_pairs([("a", "1")]).require("id").unwrap_err();
    assert!(matches!(err, OutfitError::Validation(ref m) if m.contains("'id'")));
}

#[test]
fn busy_errors_carry_retry_after() {
    let resp = HttpResponse::error(&OutfitError::busy("pool exhausted"));
    assert_eq!(resp.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(resp.header(header::RETRY_AFTER), Some("5"));
    assert_eq!(resp.header(header::CACHE_CONTROL), Some(CACHE_NO_STORE));
}

#[test]
fn validation_errors_are_400_without_retry() {
    let resp = HttpResponse::error(&OutfitError::validation("bad size"));
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.header(header::RETRY_AFTER), None);
    assert!(String::from_utf8(resp.body).unwrap().contains("bad size"));
}

#[test]
fn redirect_sets_location_and_short_cache() {
    let resp = HttpResponse::redirect("/api/outfitImage?id=1&size=600&updatedAt=2").unwrap();
    assert_eq!(resp.status, StatusCode::FOUND);
    assert_eq!(
        resp.header(header::LOCATION),
        Some("/api/outfitImage?id=1&size=600&updatedAt=2")
    );
    assert_eq!(resp.header(header::CACHE_CONTROL), Some(CACHE_SHORT));
}

#[test]
fn png_response_headers() {
    let resp = HttpResponse::png(StatusCode::OK, vec![1], CACHE_IMMUTABLE);
    assert_eq!(resp.header(header::CONTENT_TYPE), Some("image/png"));
    assert_eq!(resp.header(header::CACHE_CONTROL), Some(CACHE_IMMUTABLE));
}
