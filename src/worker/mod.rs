//! Child side of the process backend.
//!
//! A program that wants to run [`RemoteTask`]s in worker processes builds a
//! [`Registry`] at the top of `main` and calls [`Registry::run_if_worker`].
//! In the parent that call returns immediately; in a worker it serves
//! frames until the parent closes stdin and then exits the process.
//!
//! ```no_run
//! use fanmap::worker::{Registry, RemoteTask};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct AddArgs { a: i64, b: i64 }
//!
//! struct Add;
//!
//! impl RemoteTask for Add {
//!     const NAME: &'static str = "add";
//!     type Args = AddArgs;
//!     type Output = i64;
//!     type Error = std::convert::Infallible;
//!
//!     fn run(args: AddArgs) -> Result<i64, Self::Error> {
//!         Ok(args.a + args.b)
//!     }
//! }
//!
//! fn main() {
//!     Registry::new().register::<Add>().run_if_worker();
//!
//!     let specs = vec![fanmap::kwargs! { "a" => 1, "b" => 2 }];
//!     let config = fanmap::DispatchConfig::default();
//!     let out = fanmap::dispatch_process_checked::<Add>(&specs, None, &config).unwrap();
//!     assert_eq!(out.results(), &[3]);
//! }
//! ```

pub mod protocol;

use crate::error::{Error, Result};
use crate::executor::isolate;
use crate::kwargs::{bind, Kwargs};
use crate::outcome::{FailureKind, InvocationError};
use protocol::{read_frame, write_frame, Request, Response, WORKER_TASK_ENV};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::io::{BufRead, Write};

/// A function that can run on the far side of a process boundary.
///
/// Arguments arrive as JSON and the output leaves as JSON, so only
/// serializable types can appear here.
///
/// JSON has no NaN or infinity: a non-finite float in `Output` is sent as
/// `null` and comes back to the parent as a
/// [`FailureKind::Serialization`] failure.
pub trait RemoteTask: 'static {
    /// Registry key; must be unique within one worker program.
    const NAME: &'static str;

    type Args: DeserializeOwned;
    type Output: Serialize + DeserializeOwned + Send + 'static;
    type Error: fmt::Display;

    fn run(args: Self::Args) -> std::result::Result<Self::Output, Self::Error>;
}

type Handler = Box<dyn Fn(usize, Kwargs) -> std::result::Result<Value, InvocationError> + Send + Sync>;

/// Table of tasks a worker process can serve.
#[derive(Default)]
pub struct Registry {
    tasks: HashMap<&'static str, Handler>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: RemoteTask>(mut self) -> Self {
        self.tasks.insert(T::NAME, Box::new(invoke_remote::<T>));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Serves frames and exits if this process was started as a worker.
    pub fn run_if_worker(&self) {
        let Ok(task) = std::env::var(WORKER_TASK_ENV) else {
            return;
        };

        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        let code = match self.serve(&task, stdin.lock(), stdout.lock()) {
            Ok(()) => 0,
            Err(e) => {
                // workers usually run without a subscriber, stderr is inherited
                eprintln!("fanmap worker `{}` failed: {}", task, e);
                tracing::error!(task = %task, error = %e, "worker process failed");
                1
            }
        };
        std::process::exit(code);
    }

    /// Answers every request on `input` until it reaches end of stream.
    pub fn serve<R: BufRead, W: Write>(&self, task: &str, mut input: R, mut output: W) -> Result<()> {
        let handler = self
            .tasks
            .get(task)
            .ok_or_else(|| Error::worker(format!("unknown worker task `{}`", task)))?;

        while let Some(request) = read_frame::<_, Request>(&mut input)? {
            let outcome = handler(request.id, request.args);
            write_frame(&mut output, &Response { id: request.id, outcome })?;
        }
        Ok(())
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.tasks.keys().collect();
        names.sort();
        f.debug_struct("Registry").field("tasks", &names).finish()
    }
}

fn invoke_remote<T: RemoteTask>(index: usize, args: Kwargs) -> std::result::Result<Value, InvocationError> {
    let args: T::Args = bind(index, args)?;
    let output = match isolate(|| T::run(args)) {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Err(InvocationError::failed(index, e)),
        Err(panic) => return Err(panic.into_invocation_error(index)),
    };
    serde_json::to_value(output)
        .map_err(|e| InvocationError::new(index, FailureKind::Serialization, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Cursor;

    #[derive(Deserialize)]
    struct DivArgs {
        a: i64,
        b: i64,
    }

    struct Div;

    impl RemoteTask for Div {
        const NAME: &'static str = "div";
        type Args = DivArgs;
        type Output = i64;
        type Error = String;

        fn run(args: DivArgs) -> std::result::Result<i64, String> {
            if args.b == 0 {
                return Err("division by zero".to_string());
            }
            Ok(args.a / args.b)
        }
    }

    fn serve_lines(registry: &Registry, task: &str, requests: &[Request]) -> Result<Vec<Response>> {
        let mut input = Vec::new();
        for request in requests {
            write_frame(&mut input, request)?;
        }
        let mut output = Vec::new();
        registry.serve(task, Cursor::new(input), &mut output)?;

        let mut cursor = Cursor::new(output);
        let mut responses = Vec::new();
        while let Some(response) = read_frame(&mut cursor)? {
            responses.push(response);
        }
        Ok(responses)
    }

    #[test]
    fn test_serve_answers_in_order() {
        let registry = Registry::new().register::<Div>();
        let responses = serve_lines(
            &registry,
            "div",
            &[
                Request { id: 0, args: crate::kwargs! { "a" => 9, "b" => 3 } },
                Request { id: 1, args: crate::kwargs! { "a" => 1, "b" => 0 } },
                Request { id: 2, args: crate::kwargs! { "a" => 1, "b" => "x" } },
            ],
        )
        .unwrap();

        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0].outcome, Ok(serde_json::json!(3)));

        let failed = responses[1].outcome.clone().unwrap_err();
        assert_eq!(failed.index, 1);
        assert_eq!(failed.kind, FailureKind::Failed);
        assert_eq!(failed.message, "division by zero");

        let invalid = responses[2].outcome.clone().unwrap_err();
        assert_eq!(invalid.kind, FailureKind::InvalidArguments);
    }

    #[test]
    fn test_serve_unknown_task() {
        let registry = Registry::new().register::<Div>();
        assert!(registry.contains("div"));
        let err = serve_lines(&registry, "mul", &[]).unwrap_err();
        assert!(err.to_string().contains("unknown worker task `mul`"));
    }

    struct Ratio;

    impl RemoteTask for Ratio {
        const NAME: &'static str = "ratio";
        type Args = DivArgs;
        type Output = f64;
        type Error = std::convert::Infallible;

        fn run(args: DivArgs) -> std::result::Result<f64, Self::Error> {
            Ok(args.a as f64 / args.b as f64)
        }
    }

    #[test]
    fn test_non_finite_output_crosses_as_null() {
        let sent = invoke_remote::<Ratio>(0, crate::kwargs! { "a" => 1, "b" => 0 }).unwrap();
        assert_eq!(sent, Value::Null);
        assert!(serde_json::from_value::<f64>(sent).is_err());

        let sent = invoke_remote::<Ratio>(1, crate::kwargs! { "a" => 1, "b" => 4 }).unwrap();
        assert_eq!(serde_json::from_value::<f64>(sent).unwrap(), 0.25);
    }

    #[test]
    fn test_run_if_worker_returns_in_parent() {
        // the test process is not a worker, so this must be a no-op
        if std::env::var(WORKER_TASK_ENV).is_err() {
            Registry::new().register::<Div>().run_if_worker();
        }
    }
}
