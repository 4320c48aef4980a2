//! Keyword-argument sets and their binding into typed argument records.

use crate::outcome::{FailureKind, InvocationError};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// One invocation's named arguments.
pub type Kwargs = serde_json::Map<String, Value>;

/// Builds a [`Kwargs`] from `"name" => value` pairs.
///
/// ```
/// let args = fanmap::kwargs! { "a" => 1, "b" => None::<i64> };
/// assert_eq!(args.len(), 2);
/// assert!(args["b"].is_null());
/// ```
#[macro_export]
macro_rules! kwargs {
    () => {
        $crate::Kwargs::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::Kwargs::new();
        $(
            map.insert(::std::string::String::from($key), $crate::__private::json!($value));
        )+
        map
    }};
}

/// Layers `spec` over `defaults`; a key present in both takes the spec's value.
pub fn merge(defaults: Option<&Kwargs>, spec: &Kwargs) -> Kwargs {
    let mut merged = defaults.cloned().unwrap_or_default();
    for (key, value) in spec {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Deserializes a merged argument set into the function's argument record.
pub fn bind<A: DeserializeOwned>(index: usize, args: Kwargs) -> Result<A, InvocationError> {
    serde_json::from_value(Value::Object(args)).map_err(|e| {
        InvocationError::new(index, FailureKind::InvalidArguments, e.to_string())
    })
}
