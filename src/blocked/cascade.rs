//! Cascade ports.
//!
//! A cascade carries unrounded accumulators from one stage to the next, in
//! output-tile visitation order. Stages only see these two traits; the
//! threaded graph backs them with bounded channels, and a `VecDeque` works
//! for chaining stages on one thread.

use crate::error::{Error, Result};
use crate::numeric::Accumulator;
use std::collections::VecDeque;

/// Incoming side of a cascade link
pub trait CascadeSource {
    /// Block until the next accumulator arrives.
    fn read_acc(&mut self) -> Result<Accumulator>;
}

/// Outgoing side of a cascade link
pub trait CascadeSink {
    /// Block until the next stage has room, then hand over `acc`.
    fn write_acc(&mut self, acc: Accumulator) -> Result<()>;
}

impl CascadeSource for VecDeque<Accumulator> {
    /// Running dry means the producer wrote fewer tiles than we read.
    fn read_acc(&mut self) -> Result<Accumulator> {
        self.pop_front()
            .ok_or(Error::CascadeDisconnected { stage: 0 })
    }
}

impl CascadeSink for VecDeque<Accumulator> {
    fn write_acc(&mut self, acc: Accumulator) -> Result<()> {
        self.push_back(acc);
        Ok(())
    }
}
