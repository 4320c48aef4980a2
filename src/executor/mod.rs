//! Worker pools that run invocations.
//!
//! Threads come from a per-dispatch rayon pool built by
//! [`build_thread_pool`]; [`ProcessPool`] keeps a fixed set of child
//! processes, each driven by a local thread speaking line-delimited JSON
//! frames.

pub mod panic_handler;
pub mod pending;
pub mod process_pool;
pub mod thread_pool;

pub use panic_handler::{isolate, PanicInfo};
pub use pending::Pending;
pub use process_pool::{ProcessPool, WorkerLauncher};
pub use thread_pool::{build_thread_pool, PoolConfig};
