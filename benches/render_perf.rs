//! Performance benchmarks for feedfold over synthetic collections.
//!
//! Run with: `cargo bench --bench render_perf`

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::collections::BTreeSet;
use std::time::Duration;

use feedfold::model::{Collection, Item, Ordinal};
use feedfold::render::{GalleryRenderer, RenderOptions};
use feedfold::scan::PostScanner;
use feedfold::{Storage, TagStore};

const SIZES: &[usize] = &[100, 1_000, 5_000];

fn collection(size: usize) -> Collection {
    let items = (0..size)
        .map(|i| {
            Item::new(
                format!("https://www.instagram.com/p/C{i:08}/"),
                format!("https://cdn.example.com/t/{i}.jpg"),
            )
        })
        .collect::<feedfold::Result<Vec<_>>>()
        .unwrap_or_default();
    Collection::from_items(items).unwrap_or_default()
}

fn feed_page(size: usize) -> String {
    let mut html = String::with_capacity(size * 120);
    html.push_str("<main>");
    for i in 0..size {
        html.push_str(&format!(
            "<div><a href=\"/p/C{i:08}/\" role=\"link\"><img alt=\"\" src=\"https://cdn.example.com/t/{i}.jpg\"></a></div>"
        ));
    }
    html.push_str("</main>");
    html
}

fn seed_tags(total: usize) -> TagStore {
    let mut tags = TagStore::new();
    let folders: BTreeSet<String> = ["fav", "travel", "food"]
        .iter()
        .map(ToString::to_string)
        .collect();
    for name in &folders {
        let _ = tags.create_folder(name);
    }
    let selection: BTreeSet<Ordinal> = (1..=total).step_by(7).collect();
    let _ = tags.toggle_membership(&folders, &selection);
    tags
}

// ============================================================================
// Render Benchmarks
// ============================================================================

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_gallery");
    group.measurement_time(Duration::from_secs(8));

    for &size in SIZES {
        let collection = collection(size);
        let renderer = GalleryRenderer::new(RenderOptions {
            seed: seed_tags(size),
            ..RenderOptions::default()
        });
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &collection, |b, c| {
            b.iter(|| black_box(renderer.render(black_box(c)).len()));
        });
    }

    group.finish();
}

// ============================================================================
// Scan Benchmarks
// ============================================================================

fn bench_scan(c: &mut Criterion) {
    let scanner = match reqwest::Url::parse("https://www.instagram.com/") {
        Ok(base) => PostScanner::with_base(base),
        Err(err) => {
            eprintln!("bench_scan setup failed: {err}");
            return;
        }
    };

    let mut group = c.benchmark_group("scan_page");
    for &size in SIZES {
        let html = feed_page(size);
        group.throughput(Throughput::Bytes(html.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &html, |b, html| {
            b.iter(|| black_box(scanner.scan(black_box(html)).len()));
        });
    }
    group.finish();
}

// ============================================================================
// Merge / Persist Benchmarks
// ============================================================================

fn bench_prepend(c: &mut Criterion) {
    let prior = collection(5_000);
    let fresh: Vec<Item> = (0..50)
        .filter_map(|i| Item::new(format!("https://www.instagram.com/reel/N{i}/"), "").ok())
        .collect();

    c.bench_function("prepend_50_onto_5000", |b| {
        b.iter(|| {
            let merged = prior.prepend(black_box(fresh.clone()));
            black_box(merged.map(|m| m.len()).unwrap_or_default());
        });
    });
}

fn bench_storage_round_trip(c: &mut Criterion) {
    let storage = match Storage::open_memory() {
        Ok(storage) => storage,
        Err(err) => {
            eprintln!("bench_storage_round_trip setup failed: {err}");
            return;
        }
    };
    let collection = collection(5_000);

    let mut group = c.benchmark_group("storage");
    group.sample_size(30);
    group.bench_function("save_5000", |b| {
        b.iter(|| {
            if storage.save_collection(black_box(&collection)).is_err() {
                eprintln!("bench_storage_round_trip save failed");
            }
        });
    });
    group.bench_function("load_5000", |b| {
        b.iter(|| black_box(storage.load_collection().map(|c| c.len()).unwrap_or_default()));
    });
    group.finish();
}

criterion_group!(
    name = render_benches;
    config = Criterion::default().significance_level(0.05);
    targets = bench_render, bench_scan
);

criterion_group!(
    name = store_benches;
    config = Criterion::default().significance_level(0.05);
    targets = bench_prepend, bench_storage_round_trip
);

criterion_main!(render_benches, store_benches);
