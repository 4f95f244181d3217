use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use columnar_ingest::ingestion::{IngestionOptions, ingest, intern_column};
use columnar_ingest::types::{RawSource, RawValue};

fn synthetic_csv(rows: usize) -> String {
    let mut s = String::from("id,kind,value,created\n");
    for i in 0..rows {
        s.push_str(&format!(
            "{i},kind-{},{}.25,1970-01-01T00:00:{:02}Z\n",
            i % 13,
            i % 1000,
            i % 60
        ));
    }
    s
}

fn bench_delimited(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest_delimited");
    for rows in [10_000usize, 100_000] {
        let input = synthetic_csv(rows);
        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &input, |b, input| {
            b.iter(|| {
                let src = RawSource::memory("bench.csv", input.as_bytes());
                ingest(black_box(&src), &IngestionOptions::default()).unwrap()
            })
        });
    }
    group.finish();
}

fn bench_intern(c: &mut Criterion) {
    let column: Vec<RawValue> = (0..100_000)
        .map(|i| RawValue::Text(format!("category-{}", i % 250)))
        .collect();
    c.bench_function("intern_column_100k_250_categories", |b| {
        b.iter(|| intern_column(black_box(column.clone())))
    });
}

criterion_group!(benches, bench_delimited, bench_intern);
criterion_main!(benches);
