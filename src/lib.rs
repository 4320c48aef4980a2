//! fanmap - fan one function out over many keyword-argument sets
//!
//! A thin parallel-map layer: each argument set becomes one invocation,
//! every invocation is submitted to a worker pool at once, and the
//! outcomes are collected in submission order into successful results and
//! captured failures. Individual failures never abort a dispatch.
//!
//! # Quick Start
//!
//! ```
//! use fanmap::prelude::*;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct AddArgs { a: i64, b: i64 }
//!
//! let specs = vec![kwargs! { "a" => 1 }, kwargs! { "a" => 3, "b" => 4 }];
//! let defaults = kwargs! { "b" => 2 };
//!
//! let out = dispatch_threaded(
//!     |args: AddArgs| Ok::<_, String>(args.a + args.b),
//!     &specs,
//!     Some(&defaults),
//!     &DispatchConfig::default(),
//! )
//! .unwrap();
//!
//! assert_eq!(out.results(), &[3, 7]);
//! assert_eq!(out.to_string(), "results=[3, 7] exceptions=[]");
//! ```
//!
//! # Backends
//!
//! - **Threads** ([`dispatch_threaded`]): any `Fn(A) -> Result<R, E>` closure,
//!   8 workers by default.
//! - **Processes** ([`dispatch_process_checked`], [`dispatch_process_unchecked`]):
//!   a [`RemoteTask`](worker::RemoteTask) run by re-executing the current
//!   binary, 4 workers by default. Arguments and outputs cross the process
//!   boundary as JSON, so non-serializable values cannot be used there.

#![warn(missing_debug_implementations)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod kwargs;
pub mod observer;
pub mod outcome;
pub mod prelude;
pub mod worker;

pub use config::{
    available_processors, check_worker_bound, Concurrency, DispatchConfig, DispatchConfigBuilder,
};
pub use dispatch::{
    dispatch_process_checked, dispatch_process_unchecked, dispatch_threaded, Dispatcher,
};
pub use error::{Error, Result};
pub use kwargs::{merge, Kwargs};
pub use observer::{DispatchObserver, SilentObserver, TracingObserver};
pub use outcome::{ExecutorResults, FailureKind, InvocationError};

#[doc(hidden)]
pub mod __private {
    pub use serde_json::json;
}
