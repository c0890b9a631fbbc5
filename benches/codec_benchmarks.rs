//! RowBinary Codec Benchmarks
//!
//! Per-value decode and encode cost through the [`Type`] tree, plus type
//! parsing and parameter formatting.
//!
//! ## Benchmarks:
//! - Type descriptor parsing (cold and cached)
//! - Encode and decode of 100K values for UInt64, String, Decimal and
//!   Array(Nullable(Int32))
//! - Query parameter formatting
//!
//! ## Run with:
//! `cargo bench --bench codec_benchmarks`

use bytes::BytesMut;
use clickhouse_type_codec::{
    ClickHouseDecimal,
    FormatMode,
    Type,
    TypeCache,
    Value,
};
use criterion::{
    black_box,
    criterion_group,
    criterion_main,
    BenchmarkId,
    Criterion,
    Throughput,
};

const ITEMS_100K: usize = 100_000;

/// Same spread of bit patterns as the column benchmarks.
#[inline]
fn generate_uint64(index: usize) -> u64 {
    let base = (index % 255) as u64;
    base << 56 | base << 40 | base << 24 | base << 8 | base
}

#[inline]
fn generate_string(index: usize) -> String {
    const TEMPLATE: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    const RESULT_SIZE: usize = 7;

    let start_pos = index % (TEMPLATE.len() - RESULT_SIZE);
    String::from_utf8_lossy(&TEMPLATE[start_pos..start_pos + RESULT_SIZE]).to_string()
}

fn generate_decimal(index: usize) -> Value {
    Value::Decimal(ClickHouseDecimal::new(index as i64 * 7919 - 500_000, 4))
}

fn generate_array(index: usize) -> Value {
    Value::Array(
        (0..(index % 8))
            .map(|i| if i % 3 == 0 { Value::Null } else { Value::Int32((index + i) as i32) })
            .collect(),
    )
}

fn cases() -> Vec<(&'static str, Type, Vec<Value>)> {
    vec![
        ("UInt64", Type::uint64(), (0..ITEMS_100K).map(|i| Value::UInt64(generate_uint64(i))).collect()),
        ("String", Type::string(), (0..ITEMS_100K).map(|i| Value::String(generate_string(i))).collect()),
        ("Decimal(18, 4)", Type::decimal(18, 4), (0..ITEMS_100K).map(generate_decimal).collect()),
        (
            "Array(Nullable(Int32))",
            Type::array(Type::nullable(Type::int32())),
            (0..ITEMS_100K).map(generate_array).collect(),
        ),
    ]
}

fn encode_all(ty: &Type, values: &[Value]) -> BytesMut {
    let mut buffer = BytesMut::new();
    for value in values {
        ty.encode(&mut buffer, value).expect("Failed to encode");
    }
    buffer
}

/// Benchmark: Parse type descriptors
fn type_parse(c: &mut Criterion) {
    const DESCRIPTOR: &str =
        "Map(LowCardinality(String), Tuple(a Array(Nullable(Decimal(18, 4))), b DateTime64(3, 'UTC')))";

    let mut group = c.benchmark_group("type_parse");

    group.bench_function(BenchmarkId::new("parse", "nested"), |b| {
        b.iter(|| black_box(Type::parse(black_box(DESCRIPTOR)).expect("Failed to parse")))
    });

    let cache = TypeCache::default();
    group.bench_function(BenchmarkId::new("cached", "nested"), |b| {
        b.iter(|| black_box(cache.get_or_parse(black_box(DESCRIPTOR)).expect("Failed to parse")))
    });

    group.finish();
}

/// Benchmark: Encode 100K values
fn value_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("value_encode");
    group.throughput(Throughput::Elements(ITEMS_100K as u64));

    for (name, ty, values) in cases() {
        group.bench_function(BenchmarkId::new(name, "100K_items"), |b| {
            b.iter(|| black_box(encode_all(&ty, black_box(&values)).len()))
        });
    }

    group.finish();
}

/// Benchmark: Decode 100K values
fn value_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("value_decode");

    for (name, ty, values) in cases() {
        let serialized = encode_all(&ty, &values).freeze();
        group.throughput(Throughput::Bytes(serialized.len() as u64));

        group.bench_function(BenchmarkId::new(name, "100K_items"), |b| {
            b.iter(|| {
                let mut data = &serialized[..];
                for _ in 0..ITEMS_100K {
                    black_box(ty.decode(&mut data).expect("Failed to decode"));
                }
                black_box(data.len())
            })
        });
    }

    group.finish();
}

/// Benchmark: Format 100K query parameters
fn parameter_format(c: &mut Criterion) {
    let mut group = c.benchmark_group("parameter_format");
    group.throughput(Throughput::Elements(ITEMS_100K as u64));

    for (name, ty, values) in cases() {
        for mode in [FormatMode::SqlLiteral, FormatMode::QueryParameter] {
            group.bench_function(BenchmarkId::new(name, format!("{:?}", mode)), |b| {
                b.iter(|| {
                    let mut total = 0;
                    for value in &values {
                        total += ty.format(value, mode).expect("Failed to format").len();
                    }
                    black_box(total)
                })
            });
        }
    }

    group.finish();
}

criterion_group!(benches, type_parse, value_encode, value_decode, parameter_format);
criterion_main!(benches);
