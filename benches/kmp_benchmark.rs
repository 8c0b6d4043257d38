use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use imgserver::{
    filetype::{JPG_END, PNG_END, PNG_START},
    kmp::{self, Pattern},
    upload, FileTypeRegistry,
};

/// 构造一个以 PNG 结尾标记收尾的缓冲区，中间填充容易引起部分匹配的字节
fn png_payload(size: usize) -> Vec<u8> {
    let mut data = PNG_START.to_vec();
    let filler = [0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x00];
    while data.len() + PNG_END.len() < size {
        data.extend_from_slice(&filler);
    }
    data.extend_from_slice(&PNG_END);
    data
}

fn naive_find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn kmp_vs_naive_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_png_end");

    for size in [64 * 1024, 1024 * 1024, 4 * 1024 * 1024].iter() {
        let data = png_payload(*size);
        let pattern = Pattern::new(&PNG_END).unwrap();

        group.bench_with_input(BenchmarkId::new("kmp", size), &data, |b, data| {
            b.iter(|| pattern.find_in(black_box(data)));
        });
        group.bench_with_input(BenchmarkId::new("naive", size), &data, |b, data| {
            b.iter(|| naive_find(black_box(data), &PNG_END));
        });
    }

    group.finish();
}

fn pattern_build_benchmark(c: &mut Criterion) {
    c.bench_function("pattern_build_jpg_end", |b| {
        b.iter(|| Pattern::new(black_box(&JPG_END)).unwrap());
    });
    c.bench_function("find_not_present", |b| {
        let data = vec![0xAAu8; 1024 * 1024];
        b.iter(|| kmp::find(black_box(&data), &PNG_END).unwrap());
    });
}

fn extract_benchmark(c: &mut Criterion) {
    let registry = FileTypeRegistry::default();
    let mut body = b"Content-Disposition: form-data; filename=\"cat.png\"\r\n\r\n".to_vec();
    body.extend_from_slice(&png_payload(1024 * 1024));
    body.extend_from_slice(b"\r\n------boundary--\r\n");

    c.bench_function("extract_png_1mb", |b| {
        b.iter(|| upload::extract(black_box(&body), "cat.png", &registry).unwrap());
    });
}

criterion_group!(
    benches,
    kmp_vs_naive_benchmark,
    pattern_build_benchmark,
    extract_benchmark
);
criterion_main!(benches);
