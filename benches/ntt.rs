use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{thread_rng, Rng};

use torus_fhe::{parameters::PN10QP27, Ntt, NttBackendU64, NttInit};

fn bench_ntt(c: &mut Criterion) {
    let mut group = c.benchmark_group("ntt");
    let params = PN10QP27;
    let n = params.rlwe_n().0;
    let nttop = NttBackendU64::new(params.rlwe_q(), n);

    let mut rng = thread_rng();
    let poly: Vec<u64> = (0..n).map(|_| rng.gen_range(0..132120577u64)).collect();

    group.bench_with_input(BenchmarkId::new("forward", n), &poly, |b, poly| {
        b.iter_batched(
            || poly.clone(),
            |mut p| {
                nttop.forward(black_box(&mut p));
                p
            },
            criterion::BatchSize::SmallInput,
        )
    });

    group.bench_with_input(BenchmarkId::new("backward", n), &poly, |b, poly| {
        b.iter_batched(
            || {
                let mut p = poly.clone();
                nttop.forward(&mut p);
                p
            },
            |mut p| {
                nttop.backward(black_box(&mut p));
                p
            },
            criterion::BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(ntt, bench_ntt);
criterion_main!(ntt);
