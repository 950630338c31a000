//! The full multiply pipeline: SSR lanes of cascaded block multiplies.
//!
//! ```text
//!              lane 0                          lane 1
//!  A[0..m/2, k0]  A[0..m/2, k1]     A[m/2..m, k0]  A[m/2..m, k1]
//!   B[k0, ..]      B[k1, ..]         B[k0, ..]      B[k1, ..]
//!      |              |                  |              |
//!   (tiler)        (tiler)            (tiler)        (tiler)
//!      |              |                  |              |
//!   [First] -acc-> [Last]             [First] -acc-> [Last]
//!                     |                                 |
//!                 (untiler)                         (untiler)
//!                     |                                 |
//!                out[0..m/2]                       out[m/2..m]
//! ```
//!
//! Every kernel is built and checked in [`MatMultGraph::new`]. A run splits
//! the operands the way the data movers would, starts one scoped thread per
//! stage, and stitches the lane outputs back together.

use super::cascade_link::{CascadeReceiver, CascadeSender, cascade_link};
use crate::blocked::{
    BlockMatMul, CascadePosition, CascadeSink, CascadeSource, Operand, OutputTarget,
};
use crate::config::MatMultConfig;
use crate::dtype::{Element, TilingScheme};
use crate::error::{Error, Result};
use crate::kernels::{Tiler, Untiler};
use crate::matrix::{LeadingDim, Matrix, TiledBuffer};
use std::thread;
use tracing::{debug, trace, warn};

/// Graph result: linear unless detiling was switched off
#[derive(Clone, Debug, PartialEq)]
pub enum GraphOutput<T> {
    Linear(Matrix<T>),
    Tiled(TiledBuffer<T>),
}

impl<T: Copy + Default> GraphOutput<T> {
    /// The linear result, if detiling was on
    pub fn into_matrix(self) -> Option<Matrix<T>> {
        match self {
            GraphOutput::Linear(m) => Some(m),
            GraphOutput::Tiled(_) => None,
        }
    }

    pub fn into_tiled(self) -> Option<TiledBuffer<T>> {
        match self {
            GraphOutput::Tiled(t) => Some(t),
            GraphOutput::Linear(_) => None,
        }
    }
}

/// One stage's share of an operand, owned by the stage thread
#[derive(Clone, Debug)]
enum Slice<T> {
    Linear(Matrix<T>),
    Tiled(TiledBuffer<T>),
}

impl<T: Copy + Default> Slice<T> {
    fn cut(src: &Operand<'_, T>, rows: (usize, usize), cols: (usize, usize)) -> Self {
        match src {
            Operand::Linear(m) => Slice::Linear(m.sub_matrix(rows.0..rows.1, cols.0..cols.1)),
            Operand::Tiled(t) => {
                let (tr, tc) = (t.tile_rows(), t.tile_cols());
                Slice::Tiled(
                    t.sub_tiles(rows.0 / tr..rows.1 / tr, cols.0 / tc..cols.1 / tc),
                )
            }
        }
    }

    fn as_operand(&self) -> Operand<'_, T> {
        match self {
            Slice::Linear(m) => Operand::Linear(m),
            Slice::Tiled(t) => Operand::Tiled(t),
        }
    }
}

/// One cascade stage: a kernel plus the tilers feeding it
#[derive(Clone, Debug)]
struct Stage<A, B, O> {
    kernel: BlockMatMul<A, B, O>,
    tiler_a: Option<Tiler<A>>,
    tiler_b: Option<Tiler<B>>,
}

/// A validated multiply pipeline for `A x B -> O`.
///
/// Lanes are identical replicas; `lanes[l][s]` is stage `s` of lane `l`.
#[derive(Clone, Debug)]
pub struct MatMultGraph<A, B, O> {
    config: MatMultConfig,
    scheme: TilingScheme,
    lanes: Vec<Vec<Stage<A, B, O>>>,
    untiler: Option<Untiler<O>>,
}

impl<A: Element, B: Element, O: Element> MatMultGraph<A, B, O> {
    /// Build and check every kernel of the graph.
    ///
    /// Requested tilers (or the untiler) that turn out to be redundant are
    /// left out with a warning; the stages then read (or write) the linear
    /// layout directly.
    pub fn new(config: MatMultConfig) -> Result<Self> {
        config.validate()?;
        let dims = config.kernel_dims();
        let conversion = config.conversion();

        let mut stages = Vec::with_capacity(config.cascade_len);
        for s in 0..config.cascade_len {
            let position = CascadePosition::for_stage(s, config.cascade_len);
            let kernel = BlockMatMul::new(config.device, position, dims, conversion)?;
            let scheme = kernel.scheme();
            // every stage sees the same slice shapes, so warn only once
            let quiet = s > 0;
            let tiler_a = if config.add_tiling_a {
                let t = Tiler::new(
                    dims.dim_a,
                    dims.dim_ab,
                    scheme.a_tile,
                    scheme.ab_tile,
                    config.leading_a,
                )?;
                keep_unless_redundant(t.is_redundant(), "A", t, quiet)
            } else {
                None
            };
            let tiler_b = if config.add_tiling_b {
                let t = Tiler::new(
                    dims.dim_ab,
                    dims.dim_b,
                    scheme.ab_tile,
                    scheme.b_tile,
                    config.leading_b,
                )?;
                keep_unless_redundant(t.is_redundant(), "B", t, quiet)
            } else {
                None
            };
            stages.push(Stage {
                kernel,
                tiler_a,
                tiler_b,
            });
        }
        let lanes = vec![stages; config.ssr];

        let scheme = TilingScheme::select(config.device, A::DTYPE, B::DTYPE);
        let untiler = if config.add_detiling_out {
            let u = Untiler::new(
                dims.dim_a,
                dims.dim_b,
                scheme.a_tile,
                scheme.b_tile,
                config.leading_out,
            )?;
            keep_unless_redundant(u.is_redundant(), "out", u, false)
        } else {
            None
        };

        debug!(
            a = %A::DTYPE,
            b = %B::DTYPE,
            out = %O::DTYPE,
            ?scheme,
            ssr = config.ssr,
            cascade_len = config.cascade_len,
            tiler_a = lanes[0][0].tiler_a.is_some(),
            tiler_b = lanes[0][0].tiler_b.is_some(),
            untiler = untiler.is_some(),
            "matmult graph"
        );

        Ok(Self {
            config,
            scheme,
            lanes,
            untiler,
        })
    }

    pub fn config(&self) -> &MatMultConfig {
        &self.config
    }

    pub fn scheme(&self) -> TilingScheme {
        self.scheme
    }

    /// Kernel of stage `stage` in lane `lane`
    pub fn kernel(&self, lane: usize, stage: usize) -> &BlockMatMul<A, B, O> {
        &self.lanes[lane][stage].kernel
    }

    pub fn has_tiler_a(&self) -> bool {
        self.lanes[0][0].tiler_a.is_some()
    }

    pub fn has_tiler_b(&self) -> bool {
        self.lanes[0][0].tiler_b.is_some()
    }

    pub fn has_untiler(&self) -> bool {
        self.untiler.is_some()
    }

    /// Multiply `a` by `b`.
    ///
    /// Operands must be linear in the configured layout when tiling is
    /// requested for them, and tiled with the scheme's tile shape when it
    /// isn't.
    ///
    /// # Example
    ///
    /// ```
    /// use aie_gemm::blocked::Operand;
    /// use aie_gemm::config::MatMultConfig;
    /// use aie_gemm::matrix::{LeadingDim, Matrix};
    /// use aie_gemm::threaded::MatMultGraph;
    ///
    /// let cfg = MatMultConfig::new(8, 16, 8)
    ///     .with_leading_b(LeadingDim::RowMajor)
    ///     .with_cascade_len(2)
    ///     .with_ssr(2);
    /// let graph = MatMultGraph::<i16, i16, i32>::new(cfg).unwrap();
    ///
    /// let a = Matrix::from_fn(8, 16, LeadingDim::RowMajor, |r, c| (r + c) as i16);
    /// let b = Matrix::from_fn(16, 8, LeadingDim::RowMajor, |r, c| (r == c) as i16);
    /// let out = graph
    ///     .run(Operand::Linear(&a), Operand::Linear(&b))
    ///     .unwrap()
    ///     .into_matrix()
    ///     .unwrap();
    /// assert_eq!(out.get(3, 5), 8);
    /// ```
    pub fn run(&self, a: Operand<'_, A>, b: Operand<'_, B>) -> Result<GraphOutput<O>> {
        let cfg = &self.config;
        let dims = cfg.kernel_dims();
        let s = self.scheme;
        check_operand(
            &a,
            "A",
            cfg.add_tiling_a,
            cfg.leading_a,
            (cfg.dim_a, cfg.dim_ab),
            (s.a_tile, s.ab_tile),
        )?;
        check_operand(
            &b,
            "B",
            cfg.add_tiling_b,
            cfg.leading_b,
            (cfg.dim_ab, cfg.dim_b),
            (s.ab_tile, s.b_tile),
        )?;

        // B slices are shared read-only by every lane
        let b_slices: Vec<Slice<B>> = (0..cfg.cascade_len)
            .map(|st| {
                Slice::cut(
                    &b,
                    (st * dims.dim_ab, (st + 1) * dims.dim_ab),
                    (0, cfg.dim_b),
                )
            })
            .collect();
        let a_slices: Vec<Vec<Slice<A>>> = (0..cfg.ssr)
            .map(|lane| {
                (0..cfg.cascade_len)
                    .map(|st| {
                        Slice::cut(
                            &a,
                            (lane * dims.dim_a, (lane + 1) * dims.dim_a),
                            (st * dims.dim_ab, (st + 1) * dims.dim_ab),
                        )
                    })
                    .collect()
            })
            .collect();

        let lane_outputs = thread::scope(|scope| {
            let mut handles = Vec::new();
            for (lane, stages) in self.lanes.iter().enumerate() {
                let mut upstream: Option<CascadeReceiver> = None;
                for (st, stage) in stages.iter().enumerate() {
                    let (cascade_out, next) = if stage.kernel.position().has_cascade_out() {
                        let (tx, rx) = cascade_link(st, cfg.cascade_depth);
                        (Some(tx), Some(rx))
                    } else {
                        (None, None)
                    };
                    let cascade_in = upstream.take();
                    upstream = next;
                    let a_slice = &a_slices[lane][st];
                    let b_slice = &b_slices[st];
                    let handle = scope.spawn(move || {
                        trace!(lane, stage = st, "stage start");
                        self.run_stage(stage, a_slice, b_slice, cascade_in, cascade_out)
                    });
                    handles.push((lane, st, handle));
                }
            }

            let mut outputs: Vec<Option<GraphOutput<O>>> = vec![None; cfg.ssr];
            let mut failure: Option<Error> = None;
            for (lane, st, handle) in handles {
                let result = handle
                    .join()
                    .unwrap_or(Err(Error::StageFailed { lane, stage: st }));
                match result {
                    Ok(Some(out)) => outputs[lane] = Some(out),
                    Ok(None) => {}
                    Err(e) => {
                        // a panicked stage explains the disconnects around it
                        let replace = match (&failure, &e) {
                            (None, _) => true,
                            (Some(Error::StageFailed { .. }), _) => false,
                            (Some(_), Error::StageFailed { .. }) => true,
                            _ => false,
                        };
                        if replace {
                            failure = Some(e);
                        }
                    }
                }
            }
            match failure {
                Some(e) => Err(e),
                None => Ok(outputs),
            }
        })?;

        let mut linear = Vec::with_capacity(cfg.ssr);
        let mut tiled = Vec::with_capacity(cfg.ssr);
        for (lane, out) in lane_outputs.into_iter().enumerate() {
            match out {
                Some(GraphOutput::Linear(m)) => linear.push(m),
                Some(GraphOutput::Tiled(t)) => tiled.push(t),
                None => {
                    return Err(Error::StageFailed {
                        lane,
                        stage: cfg.cascade_len - 1,
                    });
                }
            }
        }

        if tiled.is_empty() {
            let mut full = Matrix::zeros(cfg.dim_a, cfg.dim_b, cfg.leading_out);
            for (lane, part) in linear.iter().enumerate() {
                full.write_block(lane * dims.dim_a, 0, part);
            }
            Ok(GraphOutput::Linear(full))
        } else {
            Ok(GraphOutput::Tiled(TiledBuffer::stack_rows(&tiled)))
        }
    }

    /// Body of one stage thread. Returns the lane output from the last stage.
    fn run_stage(
        &self,
        stage: &Stage<A, B, O>,
        a: &Slice<A>,
        b: &Slice<B>,
        mut cascade_in: Option<CascadeReceiver>,
        mut cascade_out: Option<CascadeSender>,
    ) -> Result<Option<GraphOutput<O>>> {
        let a_tiled = tile_if_needed(stage.tiler_a.as_ref(), a)?;
        let b_tiled = tile_if_needed(stage.tiler_b.as_ref(), b)?;
        let a_op = a_tiled
            .as_ref()
            .map_or_else(|| a.as_operand(), Operand::Tiled);
        let b_op = b_tiled
            .as_ref()
            .map_or_else(|| b.as_operand(), Operand::Tiled);

        let kernel = &stage.kernel;
        let cin = cascade_in.as_mut().map(|r| r as &mut dyn CascadeSource);
        let cout = cascade_out.as_mut().map(|t| t as &mut dyn CascadeSink);

        if kernel.position().has_cascade_out() {
            kernel.compute(a_op, b_op, cin, cout, None)?;
            return Ok(None);
        }

        let dims = kernel.dims();
        let s = kernel.scheme();
        let detile = self.config.add_detiling_out;
        if detile && self.untiler.is_none() {
            let mut out = Matrix::zeros(dims.dim_a, dims.dim_b, self.config.leading_out);
            kernel.compute(a_op, b_op, cin, cout, Some(OutputTarget::Linear(&mut out)))?;
            return Ok(Some(GraphOutput::Linear(out)));
        }

        let mut out = TiledBuffer::zeros(dims.dim_a, dims.dim_b, s.a_tile, s.b_tile);
        kernel.compute(a_op, b_op, cin, cout, Some(OutputTarget::Tiled(&mut out)))?;
        match &self.untiler {
            Some(untiler) if detile => Ok(Some(GraphOutput::Linear(untiler.untile_buffer(&out)?))),
            _ => Ok(Some(GraphOutput::Tiled(out))),
        }
    }
}

fn keep_unless_redundant<K>(
    redundant: bool,
    port: &'static str,
    kernel: K,
    quiet: bool,
) -> Option<K> {
    if redundant {
        if !quiet {
            warn!(%port, "redundant tiling skipped, reading the linear buffer directly");
        }
        None
    } else {
        Some(kernel)
    }
}

fn tile_if_needed<T: Element>(
    tiler: Option<&Tiler<T>>,
    slice: &Slice<T>,
) -> Result<Option<TiledBuffer<T>>> {
    match (tiler, slice) {
        (Some(t), Slice::Linear(m)) => Ok(Some(t.tile_matrix(m)?)),
        _ => Ok(None),
    }
}

fn check_operand<T: Copy + Default>(
    op: &Operand<'_, T>,
    port: &'static str,
    linear_expected: bool,
    leading: LeadingDim,
    shape: (usize, usize),
    tile: (usize, usize),
) -> Result<()> {
    if (op.rows(), op.cols()) != shape {
        return Err(Error::ShapeMismatch {
            port,
            expected_rows: shape.0,
            expected_cols: shape.1,
            rows: op.rows(),
            cols: op.cols(),
        });
    }
    match op {
        Operand::Linear(m) if linear_expected => {
            if m.leading() != leading {
                return Err(Error::OperandLayoutMismatch {
                    port,
                    expected: leading.name(),
                });
            }
        }
        Operand::Tiled(t) if !linear_expected => {
            if (t.tile_rows(), t.tile_cols()) != tile {
                return Err(Error::OperandLayoutMismatch {
                    port,
                    expected: "tiled with the scheme's tile shape",
                });
            }
        }
        Operand::Linear(_) => {
            return Err(Error::OperandLayoutMismatch {
                port,
                expected: "a tiled buffer",
            });
        }
        Operand::Tiled(_) => {
            return Err(Error::OperandLayoutMismatch {
                port,
                expected: "a linear matrix",
            });
        }
    }
    Ok(())
}
