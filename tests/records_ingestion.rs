use columnar_ingest::IngestionError;
use columnar_ingest::ingestion::records::{ingest_records_from_path, ingest_records_from_str};
use columnar_ingest::ingestion::{IngestionOptions, RecordLayout, ingest};
use columnar_ingest::types::{RawSource, RawValue};

#[test]
fn two_records_flatten_to_prefixed_headings() {
    let input = r#"{"satdat": [{"id": 1, "result": {"temp": 20.5}}, {"id": 2, "result": {"temp": 21.0}}]}"#;
    let (headings, columns) = ingest_records_from_str(input, &RecordLayout::default()).unwrap();

    assert_eq!(headings, vec!["id", "result.temp"]);
    assert_eq!(columns[0], vec![RawValue::Number(1.0), RawValue::Number(2.0)]);
    assert_eq!(columns[1], vec![RawValue::Number(20.5), RawValue::Number(21.0)]);
}

#[test]
fn ingest_records_from_path_happy_path() {
    let ds = ingest(&RawSource::parse("tests/fixtures/observations.json"), &IngestionOptions::default()).unwrap();

    assert_eq!(
        ds.headings,
        vec!["id", "created", "satellite", "result.temp", "result.cloud"]
    );
    assert_eq!(ds.row_count(), 3);

    // String ids are categorical.
    assert_eq!(ds.columns[0], vec![0.0, 1.0, 2.0]);
    assert_eq!(ds.decoded(0, 2), Some("a-3"));

    assert_eq!(ds.column("created"), Some(&[10.0, 60.0, 120.0][..]));
    assert!(ds.decode_table("created").unwrap().is_empty());

    assert_eq!(ds.columns[2], vec![0.0, 1.0, 0.0]);

    // The third record has no nested object.
    let temp = ds.column("result.temp").unwrap();
    assert_eq!(&temp[..2], &[12.5, 13.0]);
    assert!(temp[2].is_nan());

    // Missing cells in a categorical column share the empty-string code.
    let cloud = ds.decode_table("result.cloud").unwrap();
    assert_eq!(cloud.iter().collect::<Vec<_>>(), vec!["low", "high", ""]);
}

#[test]
fn empty_collection_fails_with_malformed_source() {
    let err = ingest(
        &RawSource::parse("tests/fixtures/empty_collection.json"),
        &IngestionOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, IngestionError::MalformedSource { .. }));
    assert!(err.to_string().contains("malformed source"));
}

#[test]
fn empty_document_is_malformed_from_memory_and_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.json");
    std::fs::write(&path, "\n").unwrap();

    for source in [RawSource::memory("empty.json", ""), RawSource::Path(path)] {
        let err = ingest(&source, &IngestionOptions::default()).unwrap_err();
        assert!(matches!(err, IngestionError::MalformedSource { .. }), "{err:?}");
    }
}

#[test]
fn nested_object_missing_a_key_yields_one_missing_cell() {
    let input = r#"{"satdat": [
        {"id": 1, "result": {"a": 1, "b": 2}},
        {"id": 2, "result": {"a": 3}}
    ]}"#;
    let (_, columns) = ingest_records_from_str(input, &RecordLayout::default()).unwrap();
    assert_eq!(columns[2], vec![RawValue::Number(2.0), RawValue::Missing]);
}

#[test]
fn custom_layout_from_options() {
    let opts = IngestionOptions {
        records: RecordLayout {
            collection_key: "items".to_string(),
            nested_key: "props".to_string(),
        },
        ..Default::default()
    };
    let doc = r#"{"items": [{"name": "x", "props": {"w": 2}}]}"#;
    let ds = ingest(&RawSource::memory("items.json", doc), &opts).unwrap();
    assert_eq!(ds.headings, vec!["name", "props.w"]);
    assert_eq!(ds.columns[1], vec![2.0]);
}

#[test]
fn reads_fixture_without_interning() {
    let (headings, columns) =
        ingest_records_from_path("tests/fixtures/observations.json", &RecordLayout::default()).unwrap();
    assert_eq!(headings.len(), columns.len());
    assert_eq!(columns[1][0], RawValue::Text("1970-01-01T00:00:10Z".to_string()));
}
