//! Side channel for failure and progress notifications.

use crate::outcome::InvocationError;
use std::sync::Arc;

/// Receives notifications while a dispatch collects its outcomes.
///
/// Both hooks run on the dispatching thread, in submission order.
pub trait DispatchObserver: Send + Sync {
    fn invocation_failed(&self, _error: &InvocationError) {}

    fn progress(&self, _completed: usize, _total: usize) {}
}

impl<O: DispatchObserver + ?Sized> DispatchObserver for Arc<O> {
    fn invocation_failed(&self, error: &InvocationError) {
        (**self).invocation_failed(error);
    }

    fn progress(&self, completed: usize, total: usize) {
        (**self).progress(completed, total);
    }
}

/// Default sink: forwards notifications to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl DispatchObserver for TracingObserver {
    fn invocation_failed(&self, error: &InvocationError) {
        tracing::error!(
            index = error.index,
            kind = %error.kind,
            message = %error.message,
            "invocation {} raised {}",
            error.index,
            error.kind
        );
    }

    fn progress(&self, completed: usize, total: usize) {
        tracing::info!(completed, total, "Progress: {}/{}", completed, total);
    }
}

/// Drops every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentObserver;

impl DispatchObserver for SilentObserver {}
