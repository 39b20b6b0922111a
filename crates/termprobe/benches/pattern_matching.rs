//! Pattern matching benchmarks.
#![allow(missing_docs)]

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use termprobe::{Pattern, PatternBuffer, PatternSet};

fn bench_literal_pattern(c: &mut Criterion) {
    let pattern = Pattern::literal("needle");
    let haystack = "This is a long string that contains the word needle somewhere in the middle";

    c.bench_function("literal_pattern_match", |b| {
        b.iter(|| pattern.matches(black_box(haystack)));
    });
}

fn bench_regex_captures(c: &mut Criterion) {
    let patterns = PatternSet::from(Pattern::regex(r"(\S+\.c)\s").expect("regex"));
    let haystack = b"ls *.c\r\nalpha.c  beta.c  gamma.c\r\ntermprobe$ ";

    c.bench_function("regex_capture_match", |b| {
        b.iter(|| {
            let mut buffer = PatternBuffer::new();
            buffer.append(black_box(haystack));
            let found = buffer.search(&patterns).expect("match");
            buffer.consume_match(&found)
        });
    });
}

fn bench_pattern_set_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("pattern_set_size");

    for size in &[2, 5, 10, 20] {
        let mut set = PatternSet::new();
        for i in 0..*size {
            set.add(Pattern::literal(format!("pattern{i}")));
        }
        set.add(Pattern::literal("$ "));

        let haystack = b"user@host:~$ ";

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| set.find_match(black_box(haystack)));
        });
    }

    group.finish();
}

/// Output trickling in a small chunk at a time, searched after every chunk
/// the way the expect loop does.
fn bench_chunked_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunked_search");
    let patterns = PatternSet::from("termprobe$ ");

    for total in &[1024usize, 16 * 1024, 256 * 1024] {
        let mut output = "x".repeat(*total);
        output.push_str("termprobe$ ");
        group.throughput(Throughput::Bytes(output.len() as u64));

        group.bench_with_input(BenchmarkId::from_parameter(total), &output, |b, output| {
            b.iter(|| {
                let mut buffer = PatternBuffer::new();
                for chunk in output.as_bytes().chunks(64) {
                    buffer.append(chunk);
                    if let Some(found) = buffer.search(&patterns) {
                        return Some(found);
                    }
                }
                None
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_literal_pattern,
    bench_regex_captures,
    bench_pattern_set_sizes,
    bench_chunked_search,
);
criterion_main!(benches);
