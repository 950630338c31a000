//! Benchmark runner for the multiply graph.
//!
//! Set `RUST_LOG=aie_gemm=debug` to see the kernel layout each graph picks.

use aie_gemm::blocked::Operand;
use aie_gemm::matrix::naive::matmul_reference;
use aie_gemm::{
    GraphOutput, LeadingDim, MatMultConfig, MatMultGraph, Matrix, Result, RoundMode, SatMode,
};
use std::hint::black_box;
use std::time::Instant;
use tracing::warn;
use tracing_subscriber::EnvFilter;

const SHIFT: u32 = 8;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!("=== AIE Matrix Multiply Benchmark (int16 x int16 -> int16) ===\n");

    let sizes = [64, 128, 256];
    // (ssr lanes, cascade stages); every kernel buffer must fit a 32 KiB bank
    let splits = [(4, 4), (4, 8), (8, 8)];
    let iterations = 3;
    let mut all_results = Vec::new();

    for &size in &sizes {
        println!("Matrix: {}×{}", size, size);
        println!("{}", "-".repeat(60));

        let a = Matrix::from_fn(size, size, LeadingDim::RowMajor, |r, c| {
            ((r * 31 + c * 17) % 255) as i16 - 127
        });
        let b = Matrix::from_fn(size, size, LeadingDim::RowMajor, |r, c| {
            ((r * 7 + c * 13) % 255) as i16 - 127
        });

        let reference = || -> Matrix<i16> {
            matmul_reference(
                &a,
                &b,
                SHIFT,
                RoundMode::SymInf,
                SatMode::Saturate,
                LeadingDim::RowMajor,
            )
        };
        let expected = reference();
        let mut results = vec![(
            "Reference (i-k-j)".to_string(),
            bench(size, iterations, || {
                black_box(reference());
            }),
        )];

        for &(ssr, cascade_len) in &splits {
            let config = MatMultConfig::new(size, size, size)
                .with_leading_b(LeadingDim::RowMajor)
                .with_shift(SHIFT)
                .with_round(RoundMode::SymInf)
                .with_saturation(SatMode::Saturate)
                .with_ssr(ssr)
                .with_cascade_len(cascade_len);
            let graph = MatMultGraph::<i16, i16, i16>::new(config)?;

            let out = graph.run(Operand::Linear(&a), Operand::Linear(&b))?;
            if out != GraphOutput::Linear(expected.clone()) {
                warn!(
                    size,
                    ssr,
                    cascade_len,
                    "graph output differs from reference"
                );
            }

            results.push((
                format!("Graph {}×{}", ssr, cascade_len),
                bench(size, iterations, || {
                    black_box(graph.run(Operand::Linear(&a), Operand::Linear(&b)).ok());
                }),
            ));
        }

        let baseline_time = results[0].1.0;
        for (i, (name, (time_ms, gmacs))) in results.iter().enumerate() {
            println!(
                "{}. {:18} {:8.2} ms  {:6.3} GMAC/s  ({:.1}×)",
                i + 1,
                name,
                time_ms,
                gmacs,
                baseline_time / time_ms
            );
        }
        println!();

        all_results.push((size, results));
    }

    print_summary_table(&sizes, &all_results);
    Ok(())
}

/// Average wall time (ms) and throughput (GMAC/s) of `f` on a square multiply
fn bench<F: FnMut()>(size: usize, iterations: usize, mut f: F) -> (f64, f64) {
    // Warmup
    f();

    let mut total = 0.0;
    for _ in 0..iterations {
        let start = Instant::now();
        f();
        total += start.elapsed().as_secs_f64();
    }

    let avg = total / iterations as f64;
    let gmacs = (size * size * size) as f64 / avg / 1e9;
    (avg * 1000.0, gmacs)
}

#[allow(clippy::type_complexity)]
fn print_summary_table(sizes: &[usize], all_results: &[(usize, Vec<(String, (f64, f64))>)]) {
    println!("\n{}", "=".repeat(80));
    println!("SUMMARY");
    println!("{}", "=".repeat(80));

    print!("\n{:<20}", "Method");
    for size in sizes {
        print!(" {:>14}", format!("{}×{}", size, size));
    }
    println!(" {:>12}", "Speedup");
    println!("{}", "-".repeat(80));

    let num_methods = all_results[0].1.len();
    for method_idx in 0..num_methods {
        let method_name = &all_results[0].1[method_idx].0;
        print!("{:<20}", method_name);

        let mut speedups = Vec::new();
        for (_, results) in all_results {
            let (time_ms, gmacs) = results[method_idx].1;
            speedups.push(results[0].1.0 / time_ms);
            print!(" {:>9.3} GM/s", gmacs);
        }
        let avg_speedup: f64 = speedups.iter().sum::<f64>() / speedups.len() as f64;
        println!(" {:>11.1}×", avg_speedup);
    }

    println!("{}", "=".repeat(80));
    println!("\nGM/s = GMAC/s (billion multiply-accumulates per second)");
    println!("Speedup relative to the reference multiply. Higher is better.\n");
}
