
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use catalog_progress::{
    share_url, Catalog, CompactCodec, ItemId, ProgressRecord, Url, SHARE_PARAM,
};
use fixtures::{ids, movie_catalog, scattered_record};

#[test]
fn packed_codes_round_trip() {
    let catalog = movie_catalog(1_000);
    let codec = CompactCodec::new(&catalog);

    for seed in [1, 7, 42] {
        let mut record = scattered_record(&catalog, seed, 512);
        record.mark_seen(catalog.iter().next().unwrap().clone(), 100);

        let decoded = codec.decode(&codec.encode(&record)).unwrap();
        assert_eq!(decoded.current_index, record.current_index);
        assert_eq!(decoded.seen, record.seen_in_catalog_order(&catalog));
        assert_eq!(decoded.not_seen, record.not_seen_in_catalog_order(&catalog));
        assert!(decoded.history.is_empty());
    }
}

#[test]
fn decoding_is_idempotent() {
    let catalog = movie_catalog(64);
    let codec = CompactCodec::new(&catalog);
    let code = codec.encode(&scattered_record(&catalog, 3, 10));

    assert_eq!(codec.decode(&code), codec.decode(&code));
}

#[test]
fn reference_example_decodes() {
    let catalog: Catalog = ["A", "B", "C", "D"].into_iter().collect();
    let codec = CompactCodec::new(&catalog);
    let record = ProgressRecord {
        current_index: 2,
        seen: ids(&["B"]),
        not_seen: ids(&["D"]),
        ..ProgressRecord::default()
    };

    let decoded = codec.decode(&codec.encode(&record)).unwrap();
    assert_eq!(decoded.seen, ids(&["B"]));
    assert_eq!(decoded.not_seen, ids(&["D"]));
    assert_eq!(decoded.current_index, 2);
}

#[test]
fn codes_from_the_older_encoder_still_import() {
    let catalog: Catalog = (1u64..=5).map(ItemId::from).collect();
    let codec = CompactCodec::new(&catalog);
    let old_code = STANDARD.encode(r#"{"v":1,"s":[2,5],"n":[1],"i":3,"t":1690000000000}"#);

    let decoded = codec.decode(&old_code).unwrap();
    assert_eq!(decoded.seen, ids(&["2", "5"]));
    assert_eq!(decoded.not_seen, ids(&["1"]));
    assert_eq!(decoded.current_index, 3);
}

#[test]
fn catalog_growth_leaves_new_items_unclassified() {
    let old_catalog = movie_catalog(6);
    let record = ProgressRecord {
        current_index: 6,
        seen: old_catalog.iter().take(3).cloned().collect(),
        not_seen: old_catalog.iter().skip(3).cloned().collect(),
        ..ProgressRecord::default()
    };
    let code = CompactCodec::new(&old_catalog).encode(&record);

    let grown = movie_catalog(10);
    let decoded = CompactCodec::new(&grown).decode(&code).unwrap();
    assert_eq!(decoded.seen, record.seen);
    assert_eq!(decoded.not_seen, record.not_seen);
    assert_eq!(decoded.classified(), 6);
}

#[test]
fn catalog_shrink_ignores_trailing_states() {
    let catalog = movie_catalog(12);
    let record = scattered_record(&catalog, 11, 0);
    let code = CompactCodec::new(&catalog).encode(&record);

    let shrunk = movie_catalog(5);
    let decoded = CompactCodec::new(&shrunk).decode(&code).unwrap();
    let in_range = |list: &Vec<ItemId>| -> Vec<ItemId> {
        list.iter()
            .filter(|id| shrunk.iter().any(|known| known == *id))
            .cloned()
            .collect()
    };
    assert_eq!(decoded.seen, in_range(&record.seen));
    assert_eq!(decoded.not_seen, in_range(&record.not_seen));
}

#[test]
fn invalid_codes_yield_nothing() {
    let codec = CompactCodec::new(movie_catalog(4));
    assert!(codec.decode("not-a-valid-code").is_none());
    assert!(codec.decode("").is_none());
    assert!(codec.decode(&STANDARD.encode(r#"{"v":9}"#)).is_none());
    assert!(codec.decode(&STANDARD.encode("[1,2,3]")).is_none());
}

#[test]
fn packed_codes_are_much_shorter_than_legacy() {
    let catalog = movie_catalog(5_000);
    let codec = CompactCodec::new(&catalog);
    let record = scattered_record(&catalog, 99, 4_000);

    let packed = codec.encode(&record);
    let legacy = codec.encode_legacy(&record);
    assert!(packed.len() * 5 < legacy.len(), "{} vs {}", packed.len(), legacy.len());
}

#[test]
fn share_link_imports_once_and_cleans_the_address() {
    let catalog = movie_catalog(20);
    let codec = CompactCodec::new(&catalog);
    let record = scattered_record(&catalog, 5, 7);

    let base = Url::parse("https://movies.example/challenge/?theme=80s#card").unwrap();
    let mut location = codec.generate_share_url(&base, &record);
    assert!(location.query_pairs().any(|(key, _)| key == SHARE_PARAM));

    let imported = codec.check_url_for_progress(&mut location).unwrap();
    assert_eq!(imported.seen, record.seen);
    assert_eq!(imported.not_seen, record.not_seen);
    assert_eq!(location.as_str(), "https://movies.example/challenge/");

    assert!(codec.check_url_for_progress(&mut location).is_none());
}

#[test]
fn bad_share_link_leaves_the_address_alone() {
    let codec = CompactCodec::new(movie_catalog(4));
    let mut location = share_url(
        &Url::parse("https://movies.example/").unwrap(),
        "not-a-valid-code",
    );
    let before = location.clone();

    assert!(codec.check_url_for_progress(&mut location).is_none());
    assert_eq!(location, before);
}

trait CatalogOrder {
    fn seen_in_catalog_order(&self, catalog: &Catalog) -> Vec<ItemId>;
    fn not_seen_in_catalog_order(&self, catalog: &Catalog) -> Vec<ItemId>;
}

impl CatalogOrder for ProgressRecord {
    fn seen_in_catalog_order(&self, catalog: &Catalog) -> Vec<ItemId> {
        catalog.iter().filter(|id| self.is_seen(id)).cloned().collect()
    }

    fn not_seen_in_catalog_order(&self, catalog: &Catalog) -> Vec<ItemId> {
        catalog.iter().filter(|id| self.is_not_seen(id)).cloned().collect()
    }
}
