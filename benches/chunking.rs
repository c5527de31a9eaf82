use criterion::{Criterion, criterion_group, criterion_main};
use rag_bridge::chunker::{ChunkerConfig, chunk_text};
use std::hint::black_box;

pub fn criterion_benchmark(c: &mut Criterion) {
    let text = "This is a sentence of reasonable length for chunking benchmarks. ".repeat(2000);
    let config = ChunkerConfig::default();
    c.bench_function("chunking", |b| {
        b.iter(|| chunk_text(black_box(&text), black_box(&config)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
