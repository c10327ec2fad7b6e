// Benchmarks for the broadcast kernel: same-shape, row/col/scalar broadcast,
// and scalar vs rayon backends on the largest tested input.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ewise::core::config::KernelConfig;
use ewise::dsl::execute_line;
use ewise::{subalpha_with, DType, EngineConfig, KernelBackend, Shape, Tensor, TensorDb, TensorId};

fn random(dims: &[usize], seed: u64) -> Tensor {
    Tensor::random(
        TensorId(seed),
        Shape::new(dims.to_vec()),
        DType::BFloat16,
        -100.0,
        100.0,
        seed,
    )
    .unwrap()
}

fn kernel_config(backend: KernelBackend) -> KernelConfig {
    KernelConfig {
        backend,
        parallel_threshold: 0,
        ..KernelConfig::default()
    }
}

fn broadcast_kinds_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("subalpha_broadcast");
    let cases: [(&str, &[usize], &[usize]); 4] = [
        ("none", &[1, 3, 320, 384], &[1, 3, 320, 384]),
        ("row_b", &[1, 3, 320, 384], &[1, 3, 1, 384]),
        ("col_b", &[1, 3, 320, 384], &[1, 3, 320, 1]),
        ("scalar_b", &[1, 3, 320, 384], &[1, 1, 1, 1]),
    ];
    let config = kernel_config(KernelBackend::Scalar);

    for (name, a_dims, b_dims) in cases {
        let a = random(a_dims, 0);
        let b = random(b_dims, 1);
        group.bench_function(name, |bench| {
            bench.iter(|| {
                subalpha_with(black_box(&a), black_box(&b), 5.0, TensorId(2), &config).unwrap()
            })
        });
    }
    group.finish();
}

fn backend_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("subalpha_backend");
    let a = random(&[1, 3, 320, 384], 0);
    let b = random(&[1, 1, 320, 1], 1);

    for backend in [KernelBackend::Scalar, KernelBackend::Parallel] {
        let config = kernel_config(backend);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{:?}", backend)),
            &config,
            |bench, config| {
                bench.iter(|| subalpha_with(&a, &b, 10.0, TensorId(2), config).unwrap())
            },
        );
    }
    group.finish();
}

// Full DSL path: parse, lookup, evaluate, store
fn dsl_subalpha_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsl_subalpha");

    for size in [32usize, 64, 320].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |bench, &size| {
            let mut db = TensorDb::with_config(EngineConfig::default());
            let def_a = format!(
                "DEFINE a AS TENSOR [1, 1, {}, {}] RANDOM [-100, 100] SEED 0",
                size, size
            );
            let def_b = format!("DEFINE b AS TENSOR [1, 1, 1, {}] RANDOM [-150, 150] SEED 1", size);
            execute_line(&mut db, &def_a, 1).unwrap();
            execute_line(&mut db, &def_b, 2).unwrap();

            bench.iter(|| execute_line(&mut db, black_box("LET c = SUBALPHA a b ALPHA 5"), 3).unwrap())
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    broadcast_kinds_benchmark,
    backend_benchmark,
    dsl_subalpha_benchmark
);
criterion_main!(benches);
