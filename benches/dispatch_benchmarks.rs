//! Dispatch Benchmarks
//!
//! Benchmarks for route resolution, request body decoding and the full
//! request pipeline over in-memory host channels.
//!
//! Run with: cargo bench --bench dispatch_benchmarks

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::sync::Arc;
use tether::body::{decode_body, parse_form, parse_query};
use tether::channel;
use tether::handler::SharedHandler;
use tether::prelude::*;
use tether::{BodyChunk, RouteTable, Scope};

fn noop() -> SharedHandler {
    Arc::new(from_fn(|_req: &mut Request| {
        Box::pin(async move { Ok::<_, Fault>(()) })
    }))
}

// ============================================================================
// Routing Benchmarks
// ============================================================================

fn bench_route_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("route_resolution");

    for size in [10usize, 50, 200] {
        let mut table = RouteTable::new();
        for i in 0..size {
            table.add(format!("/resource{}/(?P<id>\\d+)", i), &["GET"], noop());
        }
        let Ok(compiled) = table.compile() else {
            continue;
        };
        let last = format!("/resource{}/42", size - 1);

        group.bench_with_input(BenchmarkId::new("first", size), &size, |b, _| {
            b.iter(|| black_box(compiled.resolve("GET", black_box("/resource0/42"))))
        });

        group.bench_with_input(BenchmarkId::new("last", size), &size, |b, _| {
            b.iter(|| black_box(compiled.resolve("GET", black_box(&last))))
        });

        group.bench_with_input(BenchmarkId::new("miss", size), &size, |b, _| {
            b.iter(|| black_box(compiled.resolve("GET", black_box("/missing"))))
        });
    }

    group.finish();
}

fn bench_route_compile(c: &mut Criterion) {
    let mut table = RouteTable::new();
    for i in 0..50 {
        table.add(format!("/users/{}/(?P<name>\\w+)", i), &["GET", "POST"], noop());
    }

    c.bench_function("route_compile_50", |b| {
        b.iter(|| black_box(table.compile().map(|routes| routes.len())))
    });
}

// ============================================================================
// Body Decoding Benchmarks
// ============================================================================

fn bench_body_decoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("body_decoding");

    let query = b"tag=music&tag=rock&type=book&q=hello+world&page=2";
    group.throughput(Throughput::Bytes(query.len() as u64));
    group.bench_function("query", |b| {
        b.iter(|| black_box(parse_query(black_box(query))))
    });

    let form = b"name=john&age=27&city=New+York&note=a%26b";
    group.throughput(Throughput::Bytes(form.len() as u64));
    group.bench_function("form", |b| b.iter(|| black_box(parse_form(black_box(form)))));

    let json = br#"{"user": {"name": "john", "tags": ["a", "b", "c"], "age": 27}}"#;
    group.throughput(Throughput::Bytes(json.len() as u64));
    group.bench_function("json", |b| {
        b.iter(|| black_box(decode_body("application/json", black_box(json))))
    });

    group.finish();
}

// ============================================================================
// Pipeline Benchmarks
// ============================================================================

fn bench_pipeline(c: &mut Criterion) {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(_) => return,
    };

    let mut app = App::new();
    app.get(
        r"/hello/(?P<name>\w+)",
        from_fn(|req: &mut Request| {
            Box::pin(async move {
                Ok::<_, Fault>(format!("Hello, {}!", req.param("name").unwrap_or_default()))
            })
        }),
    )
    .get(
        "/blocking",
        blocking(|_req: &mut Request| Ok("from the blocking pool")),
    )
    .post(
        "/echo",
        from_fn(|req: &mut Request| Box::pin(async move { Ok::<_, Fault>(req.json.take()) })),
    )
    .after(after_fn(|_req: &mut Request, res: &mut Response| {
        Box::pin(async move {
            res.headers.insert("x-powered-by", "tether");
            Ok::<_, Fault>(())
        })
    }));
    let app = Arc::new(app);
    if rt.block_on(app.startup()).is_err() {
        return;
    }

    let mut group = c.benchmark_group("pipeline");

    let cases = [
        ("path_param", Scope::new("GET", "/hello/john"), ""),
        ("blocking_handler", Scope::new("GET", "/blocking"), ""),
        ("not_found", Scope::new("GET", "/nowhere"), ""),
        (
            "json_echo",
            Scope::new("POST", "/echo").with_header("content-type", "application/json"),
            r#"{"hello": "world", "n": [1, 2, 3]}"#,
        ),
    ];

    for (name, scope, body) in cases {
        let app = Arc::clone(&app);
        group.bench_function(name, |b| {
            b.to_async(&rt).iter(|| {
                let app = Arc::clone(&app);
                let scope = scope.clone();
                async move {
                    let (mut port, mut handle) = channel::request();
                    let _ = handle.send_chunk(BodyChunk::last(body));
                    let _ = app.handle(scope, &mut port).await;
                    black_box(handle.response().await.map(|r| r.status))
                }
            })
        });
    }

    group.finish();
}

criterion_group!(
    dispatch_benches,
    bench_route_resolution,
    bench_route_compile,
    bench_body_decoding,
    bench_pipeline,
);

criterion_main!(dispatch_benches);
