use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ndexpr::{assign, scalar, zip_map, Array, DynDims, Expression};

fn make_array(shape: &[usize]) -> Array<f64, DynDims> {
    let mut n = 0.0;
    Array::from_shape_fn(DynDims::from(shape), |_| {
        n += 0.5;
        n
    })
}

fn bench_elementwise_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("elementwise_add");
    for size in [100usize, 500, 1000] {
        let elements = size * size;
        group.throughput(Throughput::Elements(elements as u64));

        let a = make_array(&[size, size]);
        let b = make_array(&[size, size]);

        group.bench_with_input(BenchmarkId::new("expr", size), &size, |bench, _| {
            let mut out = Array::<f64, DynDims>::zeros([size, size]);
            bench.iter(|| {
                let sum = zip_map(&a, &b, |x, y| x + y).unwrap();
                assign(&mut out, &sum).unwrap();
            });
        });

        group.bench_with_input(BenchmarkId::new("slice", size), &size, |bench, _| {
            let mut out = vec![0.0f64; elements];
            bench.iter(|| {
                for ((o, x), y) in out.iter_mut().zip(a.as_slice()).zip(b.as_slice()) {
                    *o = x + y;
                }
            });
        });
    }
    group.finish();
}

fn bench_broadcast_row(c: &mut Criterion) {
    let mut group = c.benchmark_group("broadcast_row");
    for size in [100usize, 500, 1000] {
        group.throughput(Throughput::Elements((size * size) as u64));

        let a = make_array(&[size, size]);
        let row = make_array(&[size]);

        group.bench_with_input(BenchmarkId::new("expr", size), &size, |bench, _| {
            let mut out = Array::<f64, DynDims>::zeros([size, size]);
            bench.iter(|| {
                let sum = zip_map(&a, &row, |x, y| x + y).unwrap();
                assign(&mut out, &sum).unwrap();
            });
        });
    }
    group.finish();
}

fn bench_fused_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("fused_tree");
    for size in [100usize, 500] {
        group.throughput(Throughput::Elements((size * size) as u64));

        let a = make_array(&[size, size]);
        let b = make_array(&[size, size]);

        // One traversal for the whole tree versus one pass per operator.
        group.bench_with_input(BenchmarkId::new("single_pass", size), &size, |bench, _| {
            let mut out = Array::<f64, DynDims>::zeros([size, size]);
            bench.iter(|| {
                let tree = (a.expr() + b.expr()) * scalar(0.5) - b.expr();
                assign(&mut out, &tree).unwrap();
            });
        });

        group.bench_with_input(BenchmarkId::new("per_op", size), &size, |bench, _| {
            bench.iter(|| {
                let sum = (a.expr() + b.expr()).eval();
                let scaled = (sum.expr() * scalar(0.5)).eval();
                (scaled.expr() - b.expr()).eval()
            });
        });
    }
    group.finish();
}

fn bench_lazy_iteration(c: &mut Criterion) {
    let mut group = c.benchmark_group("lazy_iteration");
    let a = make_array(&[1000, 1000]);
    group.throughput(Throughput::Elements(1_000_000));

    group.bench_function("sum_values", |bench| {
        bench.iter(|| {
            let sq = zip_map(&a, &a, |x, y| x * y).unwrap();
            sq.values().sum::<f64>()
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_elementwise_add,
    bench_broadcast_row,
    bench_fused_tree,
    bench_lazy_iteration
);
criterion_main!(benches);
