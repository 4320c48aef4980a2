use crate::config::DispatchConfig;
use crate::error::{Error, Result};
use std::thread;

/// Sizing and naming shared by both pool kinds.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub workers: usize,
    pub thread_name_prefix: String,
    pub stack_size: Option<usize>,
}

impl PoolConfig {
    pub fn from_dispatch(config: &DispatchConfig, workers: usize) -> Self {
        Self {
            workers,
            thread_name_prefix: config.thread_name_prefix.clone(),
            stack_size: config.stack_size,
        }
    }

    pub(crate) fn thread_builder(&self, id: usize) -> thread::Builder {
        let mut builder =
            thread::Builder::new().name(format!("{}-{}", self.thread_name_prefix, id));
        if let Some(stack_size) = self.stack_size {
            builder = builder.stack_size(stack_size);
        }
        builder
    }
}

/// Builds a dedicated rayon pool with `workers` named threads.
///
/// The pool belongs to one dispatch; callers run their jobs inside
/// [`rayon::ThreadPool::in_place_scope`] so every job has finished before
/// the pool is dropped.
pub fn build_thread_pool(config: &PoolConfig) -> Result<rayon::ThreadPool> {
    if config.workers == 0 {
        return Err(Error::config("need at least 1 worker"));
    }

    let prefix = config.thread_name_prefix.clone();
    let mut builder = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .thread_name(move |i| format!("{}-{}", prefix, i));
    if let Some(stack_size) = config.stack_size {
        builder = builder.stack_size(stack_size);
    }

    let pool = builder
        .build()
        .map_err(|e| Error::executor(format!("failed to create thread pool: {}", e)))?;
    tracing::debug!(workers = config.workers, "thread pool started");
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn pool_config(workers: usize) -> PoolConfig {
        PoolConfig {
            workers,
            thread_name_prefix: "test-worker".to_string(),
            stack_size: None,
        }
    }

    #[test]
    fn test_scope_waits_for_every_job() {
        let counter = AtomicUsize::new(0);
        let pool = build_thread_pool(&pool_config(3)).unwrap();
        assert_eq!(pool.current_num_threads(), 3);

        pool.in_place_scope(|s| {
            for _ in 0..100 {
                s.spawn(|_| {
                    counter.fetch_add(1, Ordering::Relaxed);
                });
            }
        });
        assert_eq!(counter.load(Ordering::Relaxed), 100);
    }

    #[test]
    fn test_thread_names() {
        let pool = build_thread_pool(&pool_config(1)).unwrap();
        let name = pool.install(|| thread::current().name().map(str::to_string));
        assert_eq!(name.as_deref(), Some("test-worker-0"));
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(build_thread_pool(&pool_config(0)).is_err());
    }
}
