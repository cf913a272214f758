use std::fmt::Write as _;
use std::hint::black_box;

use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use rustc_hash::FxHashSet;
use tui_uidump::{
    Expansion, FilterCriteria, NodeId, RenderCache, RowKey, SearchQuery, VirtualWindow, filter,
    flatten, parse, search,
};

// Synthetic dump: `groups` layouts, each with `per_group` labelled buttons.
fn synthetic_dump(groups: usize, per_group: usize) -> String {
    let mut text = String::from("<hierarchy rotation=\"0\">");
    for group in 0..groups {
        let _ = write!(
            text,
            r#"<node class="android.widget.LinearLayout" package="com.bench" bounds="[0,{top}][1080,{bottom}]">"#,
            top = group * 10,
            bottom = group * 10 + 10,
        );
        for item in 0..per_group {
            let _ = write!(
                text,
                r#"<node class="android.widget.Button" text="Item {group}-{item}" resource-id="com.bench:id/item_{item}" clickable="{clickable}" bounds="[0,0][100,10]"/>"#,
                clickable = item % 3 == 0,
            );
        }
        text.push_str("</node>");
    }
    text.push_str("</hierarchy>");
    text
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for groups in [10, 100, 1_000] {
        let text = synthetic_dump(groups, 10);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(groups * 11), &text, |b, text| {
            b.iter(|| parse(black_box(text)));
        });
    }
    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let tree = parse(&synthetic_dump(1_000, 10)).expect("synthetic dump parses");
    let criteria = FilterCriteria::new()
        .clickable_only(true)
        .resource_contains("item_3");
    let query = SearchQuery::new("item 99");

    c.bench_function("flatten_all", |b| {
        b.iter(|| flatten(black_box(&tree), Expansion::All));
    });
    c.bench_function("flatten_first_level", |b| {
        let expanded: FxHashSet<NodeId> = std::iter::once(NodeId::ROOT).collect();
        b.iter(|| flatten(black_box(&tree), Expansion::Only(&expanded)));
    });
    c.bench_function("filter", |b| {
        b.iter(|| filter(black_box(&tree).iter(), &criteria));
    });
    c.bench_function("search", |b| {
        b.iter(|| search(black_box(&tree).iter(), &query));
    });
}

fn bench_window(c: &mut Criterion) {
    c.bench_function("window_scroll", |b| {
        let mut window = VirtualWindow::new(20.0, 4);
        let mut offset = 0.0;
        b.iter(|| {
            offset = (offset + 7.0) % 200_000.0;
            window.update(black_box(10_000), offset, 600.0)
        });
    });
    c.bench_function("render_cache_churn", |b| {
        let mut cache = RenderCache::new(256);
        let mut next = 0_usize;
        b.iter(|| {
            next = (next + 1) % 1_024;
            let key = RowKey::new(tree_id(next), next % 2 == 0, false);
            *cache.get_or_insert_with(key, || next)
        });
    });
}

fn tree_id(index: usize) -> NodeId {
    // Ids only exist inside a parsed tree; a flat dump hands them out in order.
    static IDS: std::sync::OnceLock<Vec<NodeId>> = std::sync::OnceLock::new();
    let ids = IDS.get_or_init(|| {
        let tree = parse(&synthetic_dump(1, 1_024)).expect("synthetic dump parses");
        tree.iter().map(tui_uidump::Node::id).collect()
    });
    ids[index % ids.len()]
}

criterion_group!(benches, bench_parse, bench_queries, bench_window);
criterion_main!(benches);
