use super::pending::{Completer, Pending};
use super::thread_pool::PoolConfig;
use crate::config::DispatchConfig;
use crate::error::{Error, Result};
use crate::kwargs::Kwargs;
use crate::outcome::InvocationError;
use crate::worker::protocol::{read_frame, write_frame, Request, Response, WORKER_TASK_ENV};
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde_json::Value;
use std::ffi::OsString;
use std::io::BufReader;
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread::JoinHandle;

/// How to start one worker process serving a named task.
#[derive(Debug, Clone)]
pub struct WorkerLauncher {
    program: PathBuf,
    args: Vec<String>,
    task: String,
}

impl WorkerLauncher {
    pub fn new<P: Into<PathBuf>, S: Into<String>>(program: P, args: Vec<String>, task: S) -> Self {
        Self {
            program: program.into(),
            args,
            task: task.into(),
        }
    }

    /// Fails inside a worker process, whose program never reached
    /// `Registry::run_if_worker` and would otherwise keep spawning workers.
    pub fn from_config(config: &DispatchConfig, task: &str) -> Result<Self> {
        ensure_parent(std::env::var_os(WORKER_TASK_ENV))?;
        Ok(Self::new(
            config.worker_program()?,
            config.worker_args.clone(),
            task,
        ))
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub(crate) fn spawn(&self) -> Result<WorkerProcess> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env(WORKER_TASK_ENV, &self.task)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                Error::executor(format!(
                    "failed to start worker `{}`: {}",
                    self.program.display(),
                    e
                ))
            })?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        match (stdin, stdout) {
            (Some(stdin), Some(stdout)) => Ok(WorkerProcess {
                child,
                stdin: Some(stdin),
                stdout: BufReader::new(stdout),
            }),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                Err(Error::executor("worker started without piped stdio"))
            }
        }
    }
}

fn ensure_parent(worker_task: Option<OsString>) -> Result<()> {
    match worker_task {
        Some(_) => Err(Error::executor(
            "worker program did not call Registry::run_if_worker",
        )),
        None => Ok(()),
    }
}

/// A live child process plus its frame pipes.
///
/// Dropping it closes the child's stdin and reaps the child.
pub(crate) struct WorkerProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl WorkerProcess {
    fn call(&mut self, index: usize, args: Kwargs) -> Result<std::result::Result<Value, InvocationError>> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| Error::worker("worker stdin already closed"))?;
        write_frame(stdin, &Request { id: index, args })?;

        let response: Response = read_frame(&mut self.stdout)?
            .ok_or_else(|| Error::worker("worker process exited mid-invocation"))?;
        if response.id != index {
            return Err(Error::worker(format!(
                "expected response {} but got {}",
                index, response.id
            )));
        }
        Ok(response.outcome)
    }

    fn kill(mut self) -> Option<ExitStatus> {
        let _ = self.child.kill();
        self.stdin.take();
        self.child.wait().ok()
    }
}

impl Drop for WorkerProcess {
    fn drop(&mut self) {
        // EOF on stdin ends the worker's serve loop
        self.stdin.take();
        let _ = self.child.wait();
    }
}

struct ProcessJob {
    index: usize,
    args: Kwargs,
    reply: Completer<Value>,
}

/// Fixed set of worker processes fed from one shared queue.
///
/// Every child is started before the pool is returned, so a launch failure
/// surfaces before any job is queued.
pub struct ProcessPool {
    injector: Option<Sender<ProcessJob>>,
    drivers: Vec<JoinHandle<()>>,
}

impl ProcessPool {
    pub fn new(config: &PoolConfig, launcher: WorkerLauncher) -> Result<Self> {
        if config.workers == 0 {
            return Err(Error::config("need at least 1 worker"));
        }

        let mut processes = Vec::with_capacity(config.workers);
        for _ in 0..config.workers {
            // already-started children are reaped when `processes` drops
            processes.push(launcher.spawn()?);
        }

        let launcher = Arc::new(launcher);
        let (injector, queue) = unbounded::<ProcessJob>();
        let mut pool = Self {
            injector: Some(injector),
            drivers: Vec::with_capacity(config.workers),
        };

        for (id, process) in processes.into_iter().enumerate() {
            let queue = queue.clone();
            let launcher = launcher.clone();
            let handle = config
                .thread_builder(id)
                .spawn(move || drive(process, launcher, queue))
                .map_err(|e| Error::executor(format!("spawn failed: {}", e)))?;
            pool.drivers.push(handle);
        }

        tracing::debug!(
            workers = config.workers,
            task = launcher.task(),
            "process pool started"
        );
        Ok(pool)
    }

    pub fn num_workers(&self) -> usize {
        self.drivers.len()
    }

    pub fn submit(&self, index: usize, args: Kwargs) -> Pending<Value> {
        let (reply, pending) = Pending::channel(index);
        if let Some(injector) = &self.injector {
            let _ = injector.send(ProcessJob { index, args, reply });
        }
        pending
    }

    pub fn shutdown(&mut self) {
        self.injector.take();

        for handle in self.drivers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for ProcessPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for ProcessPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessPool")
            .field("workers", &self.drivers.len())
            .finish()
    }
}

// one driver thread per child process
fn drive(process: WorkerProcess, launcher: Arc<WorkerLauncher>, queue: Receiver<ProcessJob>) {
    let mut worker = Some(process);

    for job in queue.iter() {
        let index = job.index;
        let called = worker.as_mut().map(|process| process.call(index, job.args));

        let outcome = match called {
            Some(Ok(outcome)) => outcome,
            Some(Err(e)) => {
                tracing::warn!(index, error = %e, "worker process lost, restarting");
                let mut message = e.to_string();
                if let Some(status) = worker.take().and_then(WorkerProcess::kill) {
                    message = format!("{}; worker {}", message, status);
                }
                worker = match launcher.spawn() {
                    Ok(process) => Some(process),
                    Err(spawn_err) => {
                        tracing::error!(error = %spawn_err, "could not restart worker process");
                        None
                    }
                };
                Err(InvocationError::worker_lost(index, message))
            }
            None => Err(InvocationError::worker_lost(
                index,
                "worker process could not be restarted",
            )),
        };

        let _ = job.reply.send(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::FailureKind;

    fn pool_config(workers: usize) -> PoolConfig {
        PoolConfig {
            workers,
            thread_name_prefix: "test-driver".to_string(),
            stack_size: None,
        }
    }

    #[test]
    fn test_missing_program_fails_before_submission() {
        let launcher = WorkerLauncher::new("/nonexistent/fanmap-worker", Vec::new(), "add");
        let err = ProcessPool::new(&pool_config(2), launcher).unwrap_err();
        assert!(matches!(err, Error::Executor(_)), "{}", err);
    }

    #[cfg(unix)]
    #[test]
    fn test_silent_worker_is_reported_lost() {
        // `true` exits immediately without answering any frame
        let launcher = WorkerLauncher::new("true", Vec::new(), "add");
        let pool = ProcessPool::new(&pool_config(1), launcher).unwrap();

        let first = pool.submit(0, crate::kwargs! { "a" => 1 });
        let second = pool.submit(1, crate::kwargs! { "a" => 2 });

        let err = first.wait().unwrap_err();
        assert_eq!(err.index, 0);
        assert_eq!(err.kind, FailureKind::WorkerLost);
        assert_eq!(second.wait().unwrap_err().kind, FailureKind::WorkerLost);
    }

    #[cfg(unix)]
    #[test]
    fn test_lost_worker_reports_exit_status() {
        let launcher = WorkerLauncher::new(
            "sh",
            vec!["-c".to_string(), "exit 7".to_string()],
            "add",
        );
        let pool = ProcessPool::new(&pool_config(1), launcher).unwrap();

        let err = pool.submit(0, crate::kwargs! { "a" => 1 }).wait().unwrap_err();
        assert_eq!(err.kind, FailureKind::WorkerLost);
        assert!(err.message.contains("exit status: 7"), "{}", err.message);
    }

    #[test]
    fn test_launcher_refuses_to_start_inside_a_worker() {
        assert!(ensure_parent(None).is_ok());

        let err = ensure_parent(Some(OsString::from("add"))).unwrap_err();
        assert!(matches!(err, Error::Executor(_)), "{}", err);
        assert!(err.to_string().contains("run_if_worker"), "{}", err);
    }
}
