//! Bounded accumulator channel between two cascade stages.
//!
//! One producer, one consumer, strictly in order. `depth` accumulators can
//! be in flight; past that the producer blocks until the consumer reads.

use crate::blocked::{CascadeSink, CascadeSource};
use crate::error::{Error, Result};
use crate::numeric::Accumulator;
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};

/// Producer end, owned by stage `stage`
#[derive(Debug)]
pub struct CascadeSender {
    stage: usize,
    tx: SyncSender<Accumulator>,
}

/// Consumer end, owned by stage `stage`
#[derive(Debug)]
pub struct CascadeReceiver {
    stage: usize,
    rx: Receiver<Accumulator>,
}

/// Link the output of stage `stage` to the input of stage `stage + 1`.
///
/// # Panics
///
/// Panics if `depth` is zero.
pub fn cascade_link(stage: usize, depth: usize) -> (CascadeSender, CascadeReceiver) {
    assert!(
        depth > 0,
        "cascade link needs room for at least one accumulator"
    );
    let (tx, rx) = sync_channel(depth);
    (
        CascadeSender { stage, tx },
        CascadeReceiver {
            stage: stage + 1,
            rx,
        },
    )
}

impl CascadeSink for CascadeSender {
    fn write_acc(&mut self, acc: Accumulator) -> Result<()> {
        self.tx
            .send(acc)
            .map_err(|_| Error::CascadeDisconnected { stage: self.stage })
    }
}

impl CascadeSource for CascadeReceiver {
    fn read_acc(&mut self) -> Result<Accumulator> {
        self.rx
            .recv()
            .map_err(|_| Error::CascadeDisconnected { stage: self.stage })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::AccKind;
    use crate::dtype::TilingScheme;
    use std::thread;

    fn tagged(value: i16) -> Accumulator {
        let mut acc = Accumulator::zeroed(AccKind::Acc48, 1);
        acc.mul(&[value], &[1i16], TilingScheme::new(1, 1, 1));
        acc
    }

    #[test]
    fn test_order_preserved_across_threads() {
        let (mut tx, mut rx) = cascade_link(0, 1);
        let producer = thread::spawn(move || {
            for v in 0..50 {
                tx.write_acc(tagged(v)).unwrap();
            }
        });
        for v in 0..50 {
            assert_eq!(rx.read_acc().unwrap(), tagged(v));
        }
        producer.join().unwrap();
    }

    #[test]
    fn test_dropped_peer_reports_stage() {
        let (tx, mut rx) = cascade_link(2, 1);
        drop(tx);
        assert_eq!(rx.read_acc(), Err(Error::CascadeDisconnected { stage: 3 }));

        let (mut tx, rx) = cascade_link(2, 1);
        drop(rx);
        assert_eq!(
            tx.write_acc(tagged(1)),
            Err(Error::CascadeDisconnected { stage: 2 })
        );
    }
}
