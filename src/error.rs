pub type Result<T> = std::result::Result<T, Error>;

/// Failures that abort a whole dispatch.
///
/// Failures of individual invocations never show up here; they are
/// captured in [`ExecutorResults::exceptions`](crate::ExecutorResults::exceptions).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("executor error: {0}")]
    Executor(String),

    #[error("worker error: {0}")]
    Worker(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub fn executor<S: Into<String>>(msg: S) -> Self {
        Error::Executor(msg.into())
    }

    pub fn worker<S: Into<String>>(msg: S) -> Self {
        Error::Worker(msg.into())
    }

    /// True for the upfront validation failures raised before any work is submitted.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}
