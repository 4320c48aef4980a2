use crate::outcome::{FailureKind, InvocationError};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

#[derive(Debug, Clone)]
pub struct PanicInfo {
    pub message: String,
}

impl PanicInfo {
    fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        Self { message }
    }

    pub fn into_invocation_error(self, index: usize) -> InvocationError {
        InvocationError::new(index, FailureKind::Panicked, self.message)
    }
}

/// Runs `f`, turning an unwinding panic into a [`PanicInfo`].
pub fn isolate<F, R>(f: F) -> Result<R, PanicInfo>
where
    F: FnOnce() -> R,
{
    catch_unwind(AssertUnwindSafe(f)).map_err(PanicInfo::from_payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolate_success() {
        assert_eq!(isolate(|| 42).unwrap(), 42);
    }

    #[test]
    fn test_isolate_str_panic() {
        let info = isolate(|| -> i32 { panic!("test panic") }).unwrap_err();
        assert_eq!(info.message, "test panic");
    }

    #[test]
    fn test_isolate_formatted_panic() {
        let n = 3;
        let info = isolate(|| -> i32 { panic!("bad value {}", n) }).unwrap_err();
        assert_eq!(info.message, "bad value 3");

        let error = info.into_invocation_error(5);
        assert_eq!(error.index, 5);
        assert_eq!(error.kind, FailureKind::Panicked);
    }
}
