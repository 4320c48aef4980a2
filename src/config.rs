use crate::error::{Error, Result};
use std::path::PathBuf;

/// Which kind of worker pool executes the invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concurrency {
    Thread,
    Process,
}

impl Concurrency {
    /// Worker count used when the config leaves `max_workers` unset.
    pub fn default_workers(self) -> usize {
        match self {
            Concurrency::Thread => 8,
            Concurrency::Process => 4,
        }
    }
}

impl std::fmt::Display for Concurrency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Concurrency::Thread => f.write_str("thread"),
            Concurrency::Process => f.write_str("process"),
        }
    }
}

/// Number of logical processors on the host, queried on every call.
pub fn available_processors() -> usize {
    num_cpus::get()
}

/// Rejects process worker counts that would oversubscribe the host.
pub fn check_worker_bound(max_workers: usize, available: usize) -> Result<()> {
    if max_workers > available {
        return Err(Error::config(format!(
            "max_workers must be less than or equal to {}",
            available
        )));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub max_workers: Option<usize>,
    pub progress_interval: Option<usize>,
    pub thread_name_prefix: String,
    pub stack_size: Option<usize>,

    // process backend only
    pub worker_program: Option<PathBuf>,
    pub worker_args: Vec<String>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_workers: None,
            progress_interval: None,
            thread_name_prefix: "fanmap-worker".to_string(),
            stack_size: Some(2 * 1024 * 1024),
            worker_program: None,
            worker_args: Vec::new(),
        }
    }
}

impl DispatchConfig {
    pub fn builder() -> DispatchConfigBuilder {
        DispatchConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(n) = self.max_workers {
            if n == 0 {
                return Err(Error::config("max_workers must be > 0"));
            }
        }

        if self.progress_interval == Some(0) {
            return Err(Error::config("progress_interval must be > 0"));
        }

        if self.thread_name_prefix.is_empty() {
            return Err(Error::config("thread_name_prefix must not be empty"));
        }

        Ok(())
    }

    pub fn workers_for(&self, concurrency: Concurrency) -> usize {
        self.max_workers
            .unwrap_or_else(|| concurrency.default_workers())
    }

    /// Program re-executed as a worker process; defaults to the running binary.
    pub fn worker_program(&self) -> Result<PathBuf> {
        match &self.worker_program {
            Some(path) => Ok(path.clone()),
            None => std::env::current_exe().map_err(|e| {
                Error::executor(format!("cannot locate current executable: {}", e))
            }),
        }
    }
}

#[derive(Debug, Default)]
pub struct DispatchConfigBuilder {
    config: DispatchConfig,
}

impl DispatchConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: DispatchConfig::default(),
        }
    }

    pub fn max_workers(mut self, n: usize) -> Self {
        self.config.max_workers = Some(n);
        self
    }

    pub fn progress_interval(mut self, every: usize) -> Self {
        self.config.progress_interval = Some(every);
        self
    }

    pub fn thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    pub fn worker_program<P: Into<PathBuf>>(mut self, program: P) -> Self {
        self.config.worker_program = Some(program.into());
        self
    }

    pub fn worker_arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.config.worker_args.push(arg.into());
        self
    }

    pub fn build(self) -> Result<DispatchConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
