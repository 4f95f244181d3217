use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use columnar_ingest::IngestionError;
use columnar_ingest::ingestion::delimited::DelimitedOptions;
use columnar_ingest::ingestion::{IngestionOptions, IngestionRequest, ingest};
use columnar_ingest::store::DatasetSlot;
use columnar_ingest::types::RawSource;

type Seen = Arc<Mutex<Vec<u8>>>;

fn recording_options(chunk_size: usize) -> (IngestionOptions, Seen) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let opts = IngestionOptions {
        delimited: DelimitedOptions {
            chunk_size,
            ..Default::default()
        },
        progress: Some(Arc::new(move |p: u8| sink.lock().unwrap().push(p))),
        ..Default::default()
    };
    (opts, seen)
}

fn numbered_csv(rows: usize) -> String {
    let mut s = String::from("id,label\n");
    for i in 0..rows {
        s.push_str(&format!("{i},row-{}\n", i % 7));
    }
    s
}

/// Serve `body` once over HTTP/1.1 on an ephemeral port; returns the URL.
fn serve_once(status: &'static str, body: String) -> String {
    let len = body.len();
    serve_with_length(status, len, body)
}

/// Like [`serve_once`], but announces `content_length` whatever the body's real size.
fn serve_with_length(status: &'static str, content_length: usize, body: String) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut line = String::new();
        while reader.read_line(&mut line).unwrap() > 0 {
            if line == "\r\n" {
                break;
            }
            line.clear();
        }
        // The client may hang up early on an error status.
        let _ = write!(
            stream,
            "HTTP/1.1 {status}\r\nContent-Type: text/csv\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            content_length
        );
        let _ = stream.flush();
    });
    format!("http://{addr}/data.csv")
}

#[test]
fn large_source_progress_is_non_decreasing_and_ends_at_100() {
    let input = numbered_csv(5_000);
    let (opts, seen) = recording_options(4_096);

    let ds = ingest(&RawSource::memory("big.csv", input), &opts).unwrap();
    assert_eq!(ds.row_count(), 5_000);

    let seen = seen.lock().unwrap().clone();
    assert!(seen.len() > 3, "expected per-chunk progress, got {seen:?}");
    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
    assert_eq!(seen.first(), Some(&0));
    assert_eq!(seen.last(), Some(&100));
}

#[test]
fn small_source_reports_rows_then_completion() {
    let input = numbered_csv(500);
    let (opts, seen) = recording_options(1 << 20);

    ingest(&RawSource::memory("small.csv", input), &opts).unwrap();

    let seen = seen.lock().unwrap().clone();
    // 0 at start (row 0 repeats it and is dropped), then every 5th row, then 100.
    assert_eq!(seen.len(), 101);
    assert_eq!(seen[1], 1);
    assert_eq!(seen.last(), Some(&100));
}

#[test]
fn local_file_uses_metadata_size() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.tsv");
    std::fs::write(&path, numbered_csv(2_000).replace(',', "\t")).unwrap();
    let (opts, seen) = recording_options(2_048);

    let ds = ingest(&RawSource::Path(path), &opts).unwrap();
    assert_eq!(ds.headings, vec!["id", "label"]);
    assert_eq!(ds.decode_tables[1].len(), 7);

    let seen = seen.lock().unwrap().clone();
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(seen.last(), Some(&100));
}

#[test]
fn remote_source_reports_only_start_and_end() {
    let url = serve_once("200 OK", numbered_csv(300));
    let (opts, seen) = recording_options(1 << 20);

    let ds = ingest(&RawSource::parse(&url), &opts).unwrap();
    assert_eq!(ds.row_count(), 300);
    assert_eq!(*seen.lock().unwrap(), vec![0, 100]);
}

#[test]
fn remote_error_status_is_transport_failure() {
    let url = serve_once("404 Not Found", "missing".to_string());
    let (opts, seen) = recording_options(1 << 20);

    let err = ingest(&RawSource::parse(&url), &opts).unwrap_err();
    assert!(matches!(err, IngestionError::Transport(_)));
    assert_eq!(*seen.lock().unwrap(), vec![0]);
}

#[test]
fn truncated_remote_body_is_transport_failure() {
    let url = serve_with_length("200 OK", 10_000, "a,b\n1,2\n3,4\n".to_string());
    let (opts, seen) = recording_options(1 << 20);

    let err = ingest(&RawSource::parse(&url), &opts).unwrap_err();
    assert!(matches!(err, IngestionError::Transport(_)), "{err:?}");
    assert_eq!(*seen.lock().unwrap(), vec![0]);
}

#[test]
fn unreachable_remote_is_transport_failure() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let opts = IngestionOptions {
        fetch_timeout: Duration::from_secs(5),
        ..Default::default()
    };
    let err = ingest(&RawSource::parse(&format!("http://127.0.0.1:{port}/x.csv")), &opts).unwrap_err();
    assert!(matches!(err, IngestionError::Transport(_)));
}

#[test]
fn request_installs_only_on_success() {
    let slot = DatasetSlot::new();

    let ok = IngestionRequest::new(RawSource::parse("tests/fixtures/points.csv"), IngestionOptions::default());
    let installed = ok.run_into(&slot).unwrap();
    assert_eq!(installed.row_count(), 4);

    let bad = IngestionRequest::new(
        RawSource::parse("tests/fixtures/empty_collection.json"),
        IngestionOptions::default(),
    );
    assert!(bad.run_into(&slot).is_err());

    let current = slot.current().unwrap();
    assert!(Arc::ptr_eq(&current, &installed));
    assert_eq!(slot.generation(), 1);
}
