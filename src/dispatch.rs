//! Submit-then-collect dispatch over a worker pool.
//!
//! Every entry point follows the same pass: merge defaults into each spec,
//! submit all invocations at once, then wait on them in submission order
//! while partitioning outcomes into results and exceptions. The pool lives
//! only for the duration of the call.

use crate::config::{available_processors, check_worker_bound, Concurrency, DispatchConfig};
use crate::error::Result;
use crate::executor::{build_thread_pool, isolate, Pending, PoolConfig, ProcessPool, WorkerLauncher};
use crate::kwargs::{bind, merge, Kwargs};
use crate::observer::{DispatchObserver, TracingObserver};
use crate::outcome::{ExecutorResults, FailureKind, InvocationError};
use crate::worker::RemoteTask;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;

/// Runs one function over many keyword-argument sets.
pub struct Dispatcher {
    config: DispatchConfig,
    observer: Arc<dyn DispatchObserver>,
}

impl Dispatcher {
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            config,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer<O: DispatchObserver + 'static>(mut self, observer: O) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Runs `func` once per spec on a pool of threads.
    pub fn threaded<F, A, R, E>(
        &self,
        func: F,
        specs: &[Kwargs],
        defaults: Option<&Kwargs>,
    ) -> Result<ExecutorResults<R>>
    where
        F: Fn(A) -> std::result::Result<R, E> + Send + Sync + 'static,
        A: DeserializeOwned + 'static,
        R: Send + 'static,
        E: fmt::Display + 'static,
    {
        self.config.validate()?;
        let invocations = build_invocations(specs, defaults);
        if invocations.is_empty() {
            return Ok(ExecutorResults::new(Vec::new(), Vec::new()));
        }

        let workers = self.config.workers_for(Concurrency::Thread);
        let pool = build_thread_pool(&PoolConfig::from_dispatch(&self.config, workers))?;
        tracing::debug!(backend = %Concurrency::Thread, workers, total = invocations.len(), "dispatching");
        let func = &func;

        // the scope returns only after every spawned invocation has finished
        let results = pool.in_place_scope(|scope| {
            let pending: Vec<Pending<R>> = invocations
                .into_iter()
                .enumerate()
                .map(|(index, args)| {
                    let (reply, pending) = Pending::channel(index);
                    scope.spawn(move |_| {
                        let _ = reply.send(invoke_local(func, index, args));
                    });
                    pending
                })
                .collect();

            self.collect(pending, |_, value| Ok(value))
        });
        drop(pool);
        Ok(results)
    }

    /// Runs task `T` once per spec on worker processes, refusing to start
    /// more workers than the host has logical processors.
    pub fn process_checked<T: RemoteTask>(
        &self,
        specs: &[Kwargs],
        defaults: Option<&Kwargs>,
    ) -> Result<ExecutorResults<T::Output>> {
        self.config.validate()?;
        check_worker_bound(
            self.config.workers_for(Concurrency::Process),
            available_processors(),
        )?;
        self.process_unchecked::<T>(specs, defaults)
    }

    /// Like [`process_checked`](Self::process_checked) without the processor bound.
    ///
    /// Oversubscribing worker processes can make the host unresponsive.
    pub fn process_unchecked<T: RemoteTask>(
        &self,
        specs: &[Kwargs],
        defaults: Option<&Kwargs>,
    ) -> Result<ExecutorResults<T::Output>> {
        self.config.validate()?;
        let invocations = build_invocations(specs, defaults);
        if invocations.is_empty() {
            return Ok(ExecutorResults::new(Vec::new(), Vec::new()));
        }

        let workers = self.config.workers_for(Concurrency::Process);
        let launcher = WorkerLauncher::from_config(&self.config, T::NAME)?;
        let pool = ProcessPool::new(&PoolConfig::from_dispatch(&self.config, workers), launcher)?;
        tracing::debug!(backend = %Concurrency::Process, workers, total = invocations.len(), task = T::NAME, "dispatching");

        let pending: Vec<_> = invocations
            .into_iter()
            .enumerate()
            .map(|(index, args)| pool.submit(index, args))
            .collect();

        let results = self.collect(pending, |index, value| {
            serde_json::from_value::<T::Output>(value).map_err(|e| {
                InvocationError::new(index, FailureKind::Serialization, e.to_string())
            })
        });
        drop(pool);
        Ok(results)
    }

    // waits in submission order, so output order never depends on which worker finished first
    fn collect<P, R, M>(&self, pending: Vec<Pending<P>>, mut map: M) -> ExecutorResults<R>
    where
        M: FnMut(usize, P) -> std::result::Result<R, InvocationError>,
    {
        let total = pending.len();
        let progress_every = self.config.progress_interval;
        let mut results = Vec::with_capacity(total);
        let mut exceptions = Vec::new();

        for (i, pending) in pending.into_iter().enumerate() {
            let index = pending.index();
            match pending.wait().and_then(|value| map(index, value)) {
                Ok(value) => results.push(value),
                Err(error) => {
                    self.observer.invocation_failed(&error);
                    exceptions.push(error);
                }
            }

            let completed = i + 1;
            if let Some(every) = progress_every {
                if completed % every == 0 {
                    self.observer.progress(completed, total);
                }
            }
        }

        ExecutorResults::new(results, exceptions)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DispatchConfig::default())
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn build_invocations(specs: &[Kwargs], defaults: Option<&Kwargs>) -> Vec<Kwargs> {
    specs.iter().map(|spec| merge(defaults, spec)).collect()
}

fn invoke_local<F, A, R, E>(func: &F, index: usize, args: Kwargs) -> std::result::Result<R, InvocationError>
where
    F: Fn(A) -> std::result::Result<R, E>,
    A: DeserializeOwned,
    E: fmt::Display,
{
    let args: A = bind(index, args)?;
    match isolate(|| func(args)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(InvocationError::failed(index, e)),
        Err(panic) => Err(panic.into_invocation_error(index)),
    }
}

/// Runs `func` over `specs` on threads, logging through `tracing`.
pub fn dispatch_threaded<F, A, R, E>(
    func: F,
    specs: &[Kwargs],
    defaults: Option<&Kwargs>,
    config: &DispatchConfig,
) -> Result<ExecutorResults<R>>
where
    F: Fn(A) -> std::result::Result<R, E> + Send + Sync + 'static,
    A: DeserializeOwned + 'static,
    R: Send + 'static,
    E: fmt::Display + 'static,
{
    Dispatcher::new(config.clone()).threaded(func, specs, defaults)
}

/// Runs task `T` over `specs` in worker processes, bounded by the host's processors.
pub fn dispatch_process_checked<T: RemoteTask>(
    specs: &[Kwargs],
    defaults: Option<&Kwargs>,
    config: &DispatchConfig,
) -> Result<ExecutorResults<T::Output>> {
    Dispatcher::new(config.clone()).process_checked::<T>(specs, defaults)
}

/// Runs task `T` over `specs` in worker processes without the processor bound.
pub fn dispatch_process_unchecked<T: RemoteTask>(
    specs: &[Kwargs],
    defaults: Option<&Kwargs>,
    config: &DispatchConfig,
) -> Result<ExecutorResults<T::Output>> {
    Dispatcher::new(config.clone()).process_unchecked::<T>(specs, defaults)
}
