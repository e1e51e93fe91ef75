use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::BTreeMap;
use std::hint::black_box;

use facet_query::condition::Condition;
use facet_query::facet::{wrap_like, Facet};
use facet_query::filter::{filter_for_selections, Filter, FilterCondition, FilterGroup};
use facet_query::manager::{default_priority, merge_fragments};
use facet_query::route::RouteState;
use facet_query::sql_compiler::SqlCompiler;
use facet_query::url_codec::{from_url, to_url};
use facet_query::{Pagination, QueryVariables, SearchSelections, Selection, Sorting};

fn facets() -> Vec<Facet> {
    vec![
        Facet::dropdown("Name", "name", "text").with_transform(wrap_like),
        Facet::dropdown("Status", "status", "select"),
        Facet::dropdown("Artist", "artist.name", "text"),
        Facet::flag("Visible", "isVisible", Condition::equal(true)),
    ]
}

/// `groups` OR-groups of four selections each
fn selections(groups: usize) -> SearchSelections {
    let group = vec![
        Selection::new("name", Condition::like("foo")),
        Selection::new("status", Condition::is_in(["open", "pending"])),
        Selection::new("artist.name", Condition::equal("bob")),
        Selection::new("isVisible", Condition::equal(false)),
    ];
    SearchSelections::new(vec![group; groups])
}

fn fragments() -> BTreeMap<String, Option<QueryVariables>> {
    let mut fragments = BTreeMap::new();
    fragments.insert(
        "default".to_string(),
        Some(QueryVariables {
            filter: None,
            pagination: Some(Pagination::new(0, 5)),
            sorting: Some(vec![Sorting::desc("name")]),
        }),
    );
    fragments.insert(
        "contextual".to_string(),
        Some(QueryVariables::with_filter(Filter::new(vec![
            FilterGroup::new(vec![FilterCondition::raw("a", true.into())]),
            FilterGroup::new(vec![FilterCondition::raw("b", true.into())]),
        ]))),
    );
    fragments.insert(
        "navigation".to_string(),
        Some(QueryVariables::with_filter(Filter::single(vec![FilterCondition::field(
            "parent",
            Condition::empty(),
        )]))),
    );
    fragments.insert(
        "search".to_string(),
        filter_for_selections(&facets(), &selections(3)).map(QueryVariables::with_filter),
    );
    fragments.insert(
        "persisted".to_string(),
        Some(QueryVariables::with_pagination(Pagination::new(2, 50))),
    );
    fragments
}

fn benchmark_translation(c: &mut Criterion) {
    let facets = facets();
    let mut group = c.benchmark_group("selection_translation");

    for groups in [1, 4, 16] {
        let input = selections(groups);
        group.bench_with_input(BenchmarkId::new("filter_for_selections", groups), &input, |b, input| {
            b.iter(|| black_box(filter_for_selections(&facets, black_box(input))))
        });
    }

    group.finish();
}

fn benchmark_url_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("url_codec");

    for groups in [1, 4, 16] {
        let input = selections(groups);
        let encoded = to_url(&input);
        group.bench_with_input(BenchmarkId::new("to_url", groups), &input, |b, input| {
            b.iter(|| black_box(to_url(black_box(input))))
        });
        group.bench_with_input(BenchmarkId::new("from_url", groups), &encoded, |b, encoded| {
            b.iter(|| black_box(from_url(black_box(encoded))))
        });
    }

    group.bench_function("route_parse", |b| {
        let route = format!("/my/home;cat=123/list-a;ns={};pa=x;so=y", to_url(&selections(2)));
        b.iter(|| black_box(RouteState::parse(black_box(&route))))
    });

    group.finish();
}

fn benchmark_merge(c: &mut Criterion) {
    let fragments = fragments();
    let priority = default_priority();

    c.bench_function("merge_fragments", |b| {
        b.iter(|| black_box(merge_fragments(black_box(&fragments), &priority)))
    });
}

fn benchmark_sql_compiler(c: &mut Criterion) {
    let compiler = SqlCompiler::new("items");
    let mut merged = merge_fragments(&fragments(), &default_priority());
    merged.pagination = Some(Pagination::new(1, 20));

    let mut group = c.benchmark_group("sql_compiler");
    group.bench_function("compile", |b| b.iter(|| black_box(compiler.compile(black_box(&merged)))));
    group.bench_function("compile_count", |b| {
        b.iter(|| black_box(compiler.compile_count(black_box(&merged))))
    });
    group.finish();
}

criterion_group!(
    benches,
    benchmark_translation,
    benchmark_url_codec,
    benchmark_merge,
    benchmark_sql_compiler
);
criterion_main!(benches);
