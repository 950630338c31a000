//! Tiled block multiply and its cascade plumbing.
//!
//! These pieces run one kernel at a time. The threaded graph strings them
//! together into lanes and cascades:
//! - `block_matmul`: the kernel and its four cascade positions
//! - `operand`: tiled or linear tile sources and output targets
//! - `cascade`: the accumulator stream traits between stages

pub mod block_matmul;
pub mod cascade;
pub mod operand;

pub use block_matmul::{BlockDims, BlockMatMul, CascadePosition, OutputConversion};
pub use cascade::{CascadeSink, CascadeSource};
pub use operand::{Operand, OutputTarget};
