//! Framer throughput benchmarks
//!
//! Measures framing cost for large payloads under different chunkings, and a
//! full respond round trip over the scripted transport.
//!
//! Run with: cargo bench --bench framer_throughput

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use structclaude::testing::ScriptedTransport;
use structclaude::{AgentSession, JsonValue, LineFramer, SessionConfig};

fn result_line(payload_bytes: usize) -> Vec<u8> {
    let blob = "z".repeat(payload_bytes);
    format!(
        "{{\"type\":\"system\",\"subtype\":\"init\"}}\n\
         {{\"type\":\"assistant\",\"message\":{{\"content\":[]}}}}\n\
         {{\"type\":\"result\",\"subtype\":\"success\",\"structured_output\":{{\"blob\":\"{blob}\",\"n\":[1,2,3]}}}}\n"
    )
    .into_bytes()
}

fn bench_chunk_sizes(c: &mut Criterion) {
    let input = result_line(240 * 1024);
    let mut group = c.benchmark_group("framer_240k");
    group.throughput(Throughput::Bytes(input.len() as u64));

    for chunk_size in [512usize, 4 * 1024, 64 * 1024, input.len()] {
        group.bench_with_input(BenchmarkId::from_parameter(chunk_size), &chunk_size, |b, &size| {
            b.iter(|| {
                let mut framer = LineFramer::new();
                let mut result = None;
                for chunk in input.chunks(size) {
                    if let Some(payload) = framer.feed(black_box(chunk)).unwrap() {
                        result = Some(payload);
                    }
                }
                black_box(result)
            })
        });
    }
    group.finish();
}

fn bench_many_small_events(c: &mut Criterion) {
    let mut input = Vec::new();
    for i in 0..1000 {
        input.extend_from_slice(
            format!("{{\"type\":\"assistant\",\"message\":{{\"id\":{i},\"content\":[]}}}}\n").as_bytes(),
        );
    }
    input.extend_from_slice(&result_line(64));

    c.bench_function("framer_1000_events", |b| {
        b.iter(|| {
            let mut framer = LineFramer::new();
            black_box(framer.feed(black_box(&input)).unwrap())
        })
    });
}

fn bench_respond_round_trip(c: &mut Criterion) {
    let input = result_line(4096);
    let input = input.as_slice();
    let runtime = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("respond_scripted_4k", |b| {
        b.to_async(&runtime).iter(move || async move {
            let transport = ScriptedTransport::new().with_output_chunked(input, 1024);
            let session = AgentSession::with_transport(transport, SessionConfig::default())
                .await
                .unwrap();
            let value: JsonValue = session.respond("bench").await.unwrap();
            session.close().await.unwrap();
            black_box(value)
        })
    });
}

criterion_group!(
    benches,
    bench_chunk_sizes,
    bench_many_small_events,
    bench_respond_round_trip
);
criterion_main!(benches);
