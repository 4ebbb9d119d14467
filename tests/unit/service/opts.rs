use super::*;

#[test]
fn empty_document_is_all_defaults() {
    let opts = ServiceOpts::from_reader("{}".as_bytes()).unwrap();
    assert_eq!(opts, ServiceOpts::default());
    assert_eq!(opts.outfit_image_path, "/api/outfitImage");
    assert_eq!(opts.pool.max_workers, 4);
    assert_eq!(opts.cache.max_entries, 256);
}

#[test]
fn nested_fields_override_individually() {
    let json = r#"{
        "pool": { "max_workers": 8 },
        "allow_list": { "content_host": "assets.local" },
        "zone_conflict_policy": "prefer_item"
    }"#;
    let opts = ServiceOpts::from_reader(json.as_bytes()).unwrap();
    assert_eq!(opts.pool.max_workers, 8);
    assert_eq!(opts.pool.acquire_timeout_ms, 5_000);
    assert_eq!(opts.allow_list.content_host, "assets.local");
    assert_eq!(opts.allow_list.legacy_host, "images.neopets.com");
    assert_eq!(opts.zone_conflict_policy, ZoneConflictPolicy::PreferItem);
}

#[test]
fn malformed_json_is_validation_error() {
    let err = ServiceOpts::from_reader("{ nope".as_bytes()).unwrap_err();
    assert!(matches!(err, OutfitError::Validation(_)));
}

#[test]
fn missing_file_is_validation_error() {
    let err = ServiceOpts::from_path("/definitely/not/here.json").unwrap_err();
    assert!(matches!(err, OutfitError::Validation(ref m) if m.contains("here.json")));
}
