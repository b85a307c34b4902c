// SPDX-License-Identifier: MIT OR Apache-2.0
// Benchmarks: missing_docs - criterion_group! macro generates undocumentable code
#![allow(missing_docs)]
// Benchmarks: clippy lints relaxed for benchmark code (not production)
#![allow(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Throughput benchmark for the auto-selected minification path

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use oisin::MinifyConfig;
use std::hint::black_box;

/// Whitespace-heavy pretty-printed records: the content class the
/// performance targets are stated against
fn whitespace_heavy(records: usize) -> Vec<u8> {
    let mut doc = b"[\n".to_vec();
    for i in 0..records {
        if i > 0 {
            doc.extend_from_slice(b",\n");
        }
        doc.extend_from_slice(
            format!(
                "  {{\n    \"id\" : {i} ,\n    \"name\" : \"user {i}\" ,\n    \"active\" : {}\n  }}",
                i % 2 == 0
            )
            .as_bytes(),
        );
    }
    doc.extend_from_slice(b"\n]\n");
    doc
}

/// Already-dense JSON: the copy-dominated worst case
fn dense(records: usize) -> Vec<u8> {
    let mut doc = b"[".to_vec();
    for i in 0..records {
        if i > 0 {
            doc.push(b',');
        }
        doc.extend_from_slice(format!(r#"{{"id":{i},"name":"user {i}"}}"#).as_bytes());
    }
    doc.push(b']');
    doc
}

/// String-heavy content: long literals with internal whitespace
fn string_heavy(records: usize) -> Vec<u8> {
    let mut doc = b"[".to_vec();
    for i in 0..records {
        if i > 0 {
            doc.extend_from_slice(b" , ");
        }
        doc.extend_from_slice(
            format!(r#""record {i}:  lorem ipsum dolor sit amet,  consectetur  adipiscing""#)
                .as_bytes(),
        );
    }
    doc.push(b']');
    doc
}

fn bench_minify_throughput(c: &mut Criterion) {
    let config = MinifyConfig::new().without_validation();

    for (name, corpus) in [
        ("whitespace_heavy", whitespace_heavy(20_000)),
        ("dense", dense(20_000)),
        ("string_heavy", string_heavy(20_000)),
    ] {
        let mut group = c.benchmark_group(format!("minify_{name}"));
        group.throughput(Throughput::Bytes(corpus.len() as u64));
        group.bench_function("auto", |b| {
            b.iter(|| {
                let result = oisin::minify(black_box(&corpus), &config).unwrap();
                black_box(result.output);
            });
        });
        group.finish();
    }
}

fn bench_validation_overhead(c: &mut Criterion) {
    let corpus = whitespace_heavy(20_000);
    let mut group = c.benchmark_group("validation");
    group.throughput(Throughput::Bytes(corpus.len() as u64));
    group.bench_function("with_validation", |b| {
        let config = MinifyConfig::new();
        b.iter(|| black_box(oisin::minify(black_box(&corpus), &config).unwrap().output));
    });
    group.bench_function("without_validation", |b| {
        let config = MinifyConfig::new().without_validation();
        b.iter(|| black_box(oisin::minify(black_box(&corpus), &config).unwrap().output));
    });
    group.finish();
}

criterion_group!(
    minify_benches,
    bench_minify_throughput,
    bench_validation_overhead
);
criterion_main!(minify_benches);
