//! Per-invocation failures and the aggregate dispatch result.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why an individual invocation produced no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// The merged arguments did not fit the function's argument record.
    InvalidArguments,
    /// The function returned an error.
    Failed,
    /// The function panicked.
    Panicked,
    /// A value could not cross the process boundary.
    Serialization,
    /// The worker process died or stopped speaking the frame protocol.
    WorkerLost,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::InvalidArguments => "invalid arguments",
            FailureKind::Failed => "failed",
            FailureKind::Panicked => "panicked",
            FailureKind::Serialization => "serialization",
            FailureKind::WorkerLost => "worker lost",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("invocation {index} {kind}: {message}")]
pub struct InvocationError {
    /// Position of the failed invocation in the submitted specs.
    pub index: usize,
    pub kind: FailureKind,
    pub message: String,
}

impl InvocationError {
    pub fn new<S: Into<String>>(index: usize, kind: FailureKind, message: S) -> Self {
        Self {
            index,
            kind,
            message: message.into(),
        }
    }

    pub fn failed<E: fmt::Display>(index: usize, error: E) -> Self {
        Self::new(index, FailureKind::Failed, error.to_string())
    }

    pub fn worker_lost<S: Into<String>>(index: usize, message: S) -> Self {
        Self::new(index, FailureKind::WorkerLost, message)
    }
}

/// Successful values and captured failures of one dispatch, in submission order.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorResults<R> {
    results: Vec<R>,
    exceptions: Vec<InvocationError>,
}

impl<R> ExecutorResults<R> {
    pub(crate) fn new(results: Vec<R>, exceptions: Vec<InvocationError>) -> Self {
        Self {
            results,
            exceptions,
        }
    }

    pub fn results(&self) -> &[R] {
        &self.results
    }

    pub fn exceptions(&self) -> &[InvocationError] {
        &self.exceptions
    }

    /// Number of invocations this result accounts for.
    pub fn len(&self) -> usize {
        self.results.len() + self.exceptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_failures(&self) -> bool {
        !self.exceptions.is_empty()
    }

    pub fn into_parts(self) -> (Vec<R>, Vec<InvocationError>) {
        (self.results, self.exceptions)
    }
}

impl<R: fmt::Debug> fmt::Display for ExecutorResults<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "results={:?} exceptions=[", self.results)?;
        for (i, error) in self.exceptions.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", error)?;
        }
        f.write_str("]")
    }
}
