//! Benchmarks for ranking, row layout, and the per-keystroke widget path.
//!
//! Run with: cargo bench -p combo-widgets

use std::hint::black_box;
use std::time::Instant;

use combo_core::event::{Event, KeyCode};
use combo_widgets::fuzzy::{rank, rank_matches};
use combo_widgets::virtualized::{RowLayout, RowMetrics, RowShape};
use combo_widgets::{ComboBox, ComboBoxConfig, SelectOption};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

fn labels(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("service_{}_namespace_{i}", i % 97)).collect()
}

// ============================================================================
// Ranking
// ============================================================================

fn bench_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("fuzzy/rank");
    let haystack = labels(100_000);

    for needle in ["s", "names", "svc_ns_9", "水"] {
        group.bench_with_input(BenchmarkId::new("100k", needle), &needle, |b, needle| {
            b.iter(|| black_box(rank(&haystack, needle)))
        });
    }

    group.bench_function("100k_with_positions", |b| {
        b.iter(|| black_box(rank_matches(&haystack, "names")))
    });

    group.finish();
}

// ============================================================================
// Layout
// ============================================================================

fn shapes(n: usize) -> impl Iterator<Item = RowShape<'static>> {
    const GROUPS: [&str; 4] = ["alpha", "beta", "gamma", "delta"];
    (0..n).map(move |i| RowShape {
        has_description: i % 3 == 0,
        group: Some(GROUPS[(i / 250_000) % GROUPS.len()]),
    })
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("virtualized/layout");

    group.bench_function("build_1m", |b| {
        b.iter(|| black_box(RowLayout::build(shapes(1_000_000), RowMetrics::default())))
    });

    let layout = RowLayout::build(shapes(1_000_000), RowMetrics::default());
    let total = layout.total_height();
    for (name, top) in [("top", 0), ("middle", total / 2), ("bottom", total - 8)] {
        group.bench_with_input(BenchmarkId::new("visible_window", name), &top, |b, &top| {
            b.iter(|| black_box(layout.visible_window(top, 8, 4)))
        });
    }

    group.bench_function("row_at_offset", |b| {
        let mut offset = 0u32;
        b.iter(|| {
            offset = (offset + 7_919) % total;
            black_box(layout.row_at_offset(offset))
        })
    });

    group.finish();
}

// ============================================================================
// Widget
// ============================================================================

fn bench_keystroke(c: &mut Criterion) {
    let mut group = c.benchmark_group("widget/keystroke");
    group.sample_size(20);

    let options: Vec<_> = labels(100_000)
        .into_iter()
        .enumerate()
        .map(|(i, label)| SelectOption::labeled(label, i as u64))
        .collect();

    group.bench_function("type_and_view_100k", |b| {
        b.iter_batched(
            || ComboBox::new(options.clone(), ComboBoxConfig::default()),
            |mut combo| {
                let now = Instant::now();
                for c in "names".chars() {
                    combo.handle_event_at(&Event::key(KeyCode::Char(c)), now);
                }
                black_box(combo.view())
            },
            criterion::BatchSize::LargeInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_rank, bench_layout, bench_keystroke);
criterion_main!(benches);
