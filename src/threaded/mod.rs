//! Multi-threaded pipeline execution.
//!
//! Each cascade stage of each SSR lane runs on its own scoped thread.
//! Stages in a lane talk only through bounded cascade links; lanes don't
//! talk at all.
//!
//! - `cascade_link`: bounded in-order accumulator channel
//! - `graph`: `MatMultGraph`, construction and execution

pub mod cascade_link;
pub mod graph;

pub use cascade_link::{CascadeReceiver, CascadeSender, cascade_link};
pub use graph::{GraphOutput, MatMultGraph};
