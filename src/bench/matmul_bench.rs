//! Criterion benchmarks for the tiling kernels and the multiply graph.
//!
//! - Tiler on int16 and cint16 matrices in both layouts
//! - Graph with different SSR/cascade splits of the same multiply

use aie_gemm::blocked::Operand;
use aie_gemm::dtype::Cint16;
use aie_gemm::kernels::Tiler;
use aie_gemm::{LeadingDim, MatMultConfig, MatMultGraph, Matrix};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

fn bench_tiler(c: &mut Criterion) {
    let mut group = c.benchmark_group("Tiler");

    for leading in [LeadingDim::RowMajor, LeadingDim::ColMajor] {
        let (rows, cols) = (64, 64);
        group.throughput(Throughput::Elements((rows * cols) as u64));

        // int16 column-major only tiles with 2-wide tiles
        let int16_tile = if leading == LeadingDim::RowMajor { (4, 4) } else { (4, 2) };
        let tiler = Tiler::<i16>::new(rows, cols, int16_tile.0, int16_tile.1, leading)
            .unwrap();
        let input: Vec<i16> = (0..rows * cols).map(|i| (i % 251) as i16).collect();
        let mut output = vec![0i16; rows * cols];
        group.bench_with_input(BenchmarkId::new("int16", leading.name()), &leading, |bench, _| {
            bench.iter(|| tiler.tile(black_box(&input), &mut output));
        });

        let tiler = Tiler::<Cint16>::new(rows, cols, 4, 2, leading).unwrap();
        let input: Vec<Cint16> = (0..rows * cols)
            .map(|i| Cint16::new((i % 97) as i16, -((i % 89) as i16)))
            .collect();
        let mut output = vec![Cint16::default(); rows * cols];
        group.bench_with_input(BenchmarkId::new("cint16", leading.name()), &leading, |bench, _| {
            bench.iter(|| tiler.tile(black_box(&input), &mut output));
        });
    }

    group.finish();
}

fn bench_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("Graph_int16");
    group.sample_size(20);

    let n = 128;
    let a = Matrix::from_fn(n, n, LeadingDim::RowMajor, |r, col| {
        ((r * 3 + col) % 200) as i16 - 100
    });
    let b = Matrix::from_fn(n, n, LeadingDim::RowMajor, |r, col| {
        ((r + col * 5) % 200) as i16 - 100
    });
    group.throughput(Throughput::Elements((n * n * n) as u64));

    for (ssr, cascade_len) in [(1, 1), (2, 2), (4, 4)] {
        let config = MatMultConfig::new(n, n, n)
            .with_leading_b(LeadingDim::RowMajor)
            .with_shift(6)
            .with_ssr(ssr)
            .with_cascade_len(cascade_len);
        let graph = MatMultGraph::<i16, i16, i16>::new(config).unwrap();
        let id = format!("ssr{}_casc{}", ssr, cascade_len);
        group.bench_with_input(BenchmarkId::new(id, n), &n, |bench, _| {
            bench.iter(|| {
                black_box(graph.run(Operand::Linear(&a), Operand::Linear(&b)).unwrap())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_tiler, bench_graph);
criterion_main!(benches);
