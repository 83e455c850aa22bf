//! Criterion benchmarks for the RestPose client.
//!
//! Covers the client-side work around a search:
//! - Building and combining query expressions
//! - Serializing search requests
//! - Parsing result pages
//! - Paging through results from an in-memory target

use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use serde_json::{Map, Value, json};

use restpose::error::Result;
use restpose::query::{
    OccurOptions, Query, QueryTarget, RawSearchResults, SearchRequest, SearchResults, TargetExt,
    field,
};

/// Generate raw result items for benchmarking.
fn generate_items(from: u64, count: u64) -> Vec<Map<String, Value>> {
    (from..from + count)
        .map(|n| {
            let Value::Object(item) = json!({
                "id": [n.to_string()],
                "type": ["blurb"],
                "text": [format!("document number {n} about searching")],
                "tag": ["alpha", "beta"],
            }) else {
                unreachable!()
            };
            item
        })
        .collect()
}

/// Answers every search from memory, as if `total` documents matched.
#[derive(Debug)]
struct MemoryTarget {
    total: u64,
}

impl QueryTarget for MemoryTarget {
    fn search(&self, request: &SearchRequest) -> Result<RawSearchResults> {
        let from = request.offset();
        let size = request.size.unwrap_or(10);
        let count = self.total.saturating_sub(from).min(size);
        Ok(RawSearchResults {
            total_docs: self.total,
            from,
            size_requested: size,
            check_at_least: request.check_at_least_or_default(),
            matches_lower_bound: self.total,
            matches_estimated: self.total,
            matches_upper_bound: self.total,
            items: generate_items(from, count),
            info: Vec::new(),
        })
    }
}

/// Benchmark query construction.
fn bench_query_building(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_building");

    group.bench_function("combine_fields", |b| {
        b.iter(|| {
            let tagged = field("tag").is_in(json!(["alpha", "beta"]));
            let text = field("text").text(black_box("searching documents"));
            let years = field("year").range(2000, 2010);
            let query = tagged
                .and(text)
                .and_then(|query| query.and_not(years))
                .and_then(|query| query.scale(2.0));
            black_box(query)
        })
    });

    let wide = Query::combine(
        restpose::query::CombineOp::Or,
        (0..100).map(|n| field("tag").equals(format!("tag{n}"))),
    )
    .unwrap();
    group.throughput(Throughput::Elements(100));
    group.bench_function("wire_form_100_terms", |b| {
        b.iter(|| black_box(wide.to_wire()))
    });

    group.finish();
}

/// Benchmark request serialization.
fn bench_request_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_serialization");

    let searchable = field("text")
        .text("hello world")
        .order_by("year", Some(false))
        .calc_facet_count("tag", Some(1000), Some(20))
        .calc_occur("tags", "", OccurOptions::new().result_limit(10))
        .slice(20..40)
        .unwrap();

    group.bench_function("search_request_to_json", |b| {
        b.iter(|| black_box(serde_json::to_string(&searchable.build_request()).unwrap()))
    });

    group.finish();
}

/// Benchmark parsing of result pages.
fn bench_result_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("result_parsing");

    let body = serde_json::to_string(&json!({
        "total_docs": 1000,
        "from": 0,
        "size_requested": 100,
        "check_at_least": 101,
        "matches_lower_bound": 1000,
        "matches_estimated": 1000,
        "matches_upper_bound": 1000,
        "items": generate_items(0, 100),
        "info": [],
    }))
    .unwrap();

    group.throughput(Throughput::Elements(100));
    group.bench_function("parse_page_of_100", |b| {
        b.iter(|| {
            let raw: RawSearchResults = serde_json::from_str(black_box(&body)).unwrap();
            black_box(SearchResults::new(raw, None))
        })
    });

    group.finish();
}

/// Benchmark paging through results.
fn bench_pagination(c: &mut Criterion) {
    let mut group = c.benchmark_group("pagination");
    group.sample_size(20);

    let target = Arc::new(MemoryTarget { total: 1000 });

    group.throughput(Throughput::Elements(1000));
    group.bench_function("iterate_1000_results", |b| {
        b.iter(|| {
            let searchable = target.all().searchable();
            let count = searchable.iter().filter(|result| result.is_ok()).count();
            black_box(count)
        })
    });

    group.bench_function("random_access", |b| {
        let searchable = target.all().searchable().with_page_size(50).unwrap();
        b.iter(|| {
            for index in [0, 499, 3, 998, 250] {
                let _ = black_box(searchable.get(index));
            }
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_query_building,
    bench_request_serialization,
    bench_result_parsing,
    bench_pagination
);

criterion_main!(benches);
