pub use crate::config::{Concurrency, DispatchConfig, DispatchConfigBuilder};
pub use crate::dispatch::{
    dispatch_process_checked, dispatch_process_unchecked, dispatch_threaded, Dispatcher,
};
pub use crate::error::{Error, Result};
pub use crate::kwargs;
pub use crate::kwargs::Kwargs;
pub use crate::observer::{DispatchObserver, TracingObserver};
pub use crate::outcome::{ExecutorResults, FailureKind, InvocationError};
pub use crate::worker::{Registry, RemoteTask};
