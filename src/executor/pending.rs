//! One-shot outcome slots for submitted invocations.

use crate::outcome::InvocationError;
use crossbeam_channel::{bounded, Receiver, Sender};

/// Sending half of a one-shot outcome slot.
pub(crate) type Completer<R> = Sender<Result<R, InvocationError>>;

/// Outcome of a submitted invocation that has not been collected yet.
#[derive(Debug)]
pub struct Pending<R> {
    index: usize,
    rx: Receiver<Result<R, InvocationError>>,
}

impl<R> Pending<R> {
    pub(crate) fn channel(index: usize) -> (Completer<R>, Self) {
        let (tx, rx) = bounded(1);
        (tx, Self { index, rx })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Blocks until the invocation finishes.
    pub fn wait(self) -> Result<R, InvocationError> {
        match self.rx.recv() {
            Ok(outcome) => outcome,
            Err(_) => Err(InvocationError::worker_lost(
                self.index,
                "worker dropped the invocation without reporting an outcome",
            )),
        }
    }
}
