//! Key Encoder Module
//!
//! Derives stable string keys from call arguments and flags identity-like
//! argument representations.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::error::Result;

// == Call Args ==
/// Ordered argument list for one memoized call.
///
/// Positional arguments keep their supplied order. Named arguments are
/// canonically sorted at encoding time, so the order they are added in
/// never affects the derived key.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    positional: Vec<Value>,
    named: Vec<(String, Value)>,
}

impl CallArgs {
    /// Creates an empty argument list.
    pub fn new() -> Self {
        Self::default()
    }

    // == Positional ==
    /// Appends a positional argument.
    ///
    /// Arguments are captured through their serialized form. Values that
    /// cannot be represented in the backing format are rejected here, at
    /// the boundary, rather than deep inside the store.
    pub fn arg<T: Serialize>(mut self, value: &T) -> Result<Self> {
        self.positional.push(serde_json::to_value(value)?);
        Ok(self)
    }

    // == Named ==
    /// Appends a named argument.
    pub fn named<T: Serialize>(mut self, name: &str, value: &T) -> Result<Self> {
        self.named.push((name.to_string(), serde_json::to_value(value)?));
        Ok(self)
    }

    /// Returns true when no arguments have been captured.
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }
}

// == Key Encoder ==
/// Turns an ordered argument list into a stable string key.
///
/// Two calls with value-equal arguments always produce the same key.
/// Arguments whose textual form looks identity-based (an angle-bracket
/// wrapper or a hexadecimal address run) are reported through the warning
/// observer; the key is produced either way and the call never fails.
#[derive(Clone)]
pub struct KeyEncoder {
    observer: Arc<dyn Fn(&str) + Send + Sync>,
}

impl fmt::Debug for KeyEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyEncoder").finish_non_exhaustive()
    }
}

impl Default for KeyEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyEncoder {
    // == Constructor ==
    /// Creates an encoder that reports advisory warnings through `tracing`.
    pub fn new() -> Self {
        Self {
            observer: Arc::new(|msg: &str| warn!("{}", msg)),
        }
    }

    /// Creates an encoder with a custom warning observer.
    pub fn with_observer<F>(observer: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        Self {
            observer: Arc::new(observer),
        }
    }

    // == Encode ==
    /// Produces a deterministic string key for the supplied arguments.
    ///
    /// Positional arguments are rendered in order; named arguments are
    /// sorted by name first. Each value is rendered as compact JSON.
    pub fn encode(&self, args: &CallArgs) -> String {
        let positional: Vec<String> = args.positional.iter().map(Value::to_string).collect();

        let mut named: Vec<(&str, String)> = args
            .named
            .iter()
            .map(|(name, value)| (name.as_str(), value.to_string()))
            .collect();
        named.sort_by(|a, b| a.0.cmp(b.0));

        for rendered in positional.iter().chain(named.iter().map(|(_, v)| v)) {
            self.warn_if_unstable(rendered);
        }

        let named_parts: Vec<String> = named
            .iter()
            .map(|(name, rendered)| format!("\"{}\": {}", name, rendered))
            .collect();

        format!("({}), {{{}}}", positional.join(", "), named_parts.join(", "))
    }

    // == Unstable Representation Check ==
    /// Reports a rendered argument that looks like an identity-based
    /// representation rather than a stable value. Advisory only.
    fn warn_if_unstable(&self, rendered: &str) {
        if looks_identity_like(rendered) {
            (self.observer)(&format!(
                "{} <-- argument looks like an identity-based representation; \
                 cache may not behave as expected",
                rendered
            ));
        }
    }
}

// == Helpers ==
/// Heuristic for identity-like textual forms such as `<Client 0x7f9a2c40>`.
fn looks_identity_like(rendered: &str) -> bool {
    if rendered.contains('<') && rendered.contains('>') {
        return true;
    }
    has_hex_address(rendered)
}

/// Scans for an `0x` prefix followed by a run of at least six hex digits.
fn has_hex_address(rendered: &str) -> bool {
    let bytes = rendered.as_bytes();
    for idx in 0..bytes.len().saturating_sub(1) {
        if bytes[idx] == b'0' && (bytes[idx + 1] == b'x' || bytes[idx + 1] == b'X') {
            let run = bytes[idx + 2..]
                .iter()
                .take_while(|b| b.is_ascii_hexdigit())
                .count();
            if run >= 6 {
                return true;
            }
        }
    }
    false
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Encoder that collects warnings instead of logging them.
    fn capturing_encoder() -> (KeyEncoder, Arc<Mutex<Vec<String>>>) {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&captured);
        let encoder = KeyEncoder::with_observer(move |msg| {
            sink.lock().unwrap().push(msg.to_string());
        });
        (encoder, captured)
    }

    #[test]
    fn test_encode_deterministic() {
        let encoder = KeyEncoder::new();
        let args = || {
            CallArgs::new()
                .arg(&"london")
                .unwrap()
                .arg(&5)
                .unwrap()
                .named("units", &"metric")
                .unwrap()
        };

        assert_eq!(encoder.encode(&args()), encoder.encode(&args()));
    }

    #[test]
    fn test_encode_named_order_independent() {
        let encoder = KeyEncoder::new();

        let first = CallArgs::new()
            .named("units", &"metric")
            .unwrap()
            .named("lang", &"en")
            .unwrap();
        let second = CallArgs::new()
            .named("lang", &"en")
            .unwrap()
            .named("units", &"metric")
            .unwrap();

        assert_eq!(encoder.encode(&first), encoder.encode(&second));
    }

    #[test]
    fn test_encode_positional_order_matters() {
        let encoder = KeyEncoder::new();

        let first = CallArgs::new().arg(&1).unwrap().arg(&2).unwrap();
        let second = CallArgs::new().arg(&2).unwrap().arg(&1).unwrap();

        assert_ne!(encoder.encode(&first), encoder.encode(&second));
    }

    #[test]
    fn test_encode_format() {
        let encoder = KeyEncoder::new();
        let args = CallArgs::new()
            .arg(&"london")
            .unwrap()
            .named("units", &"metric")
            .unwrap();

        assert_eq!(
            encoder.encode(&args),
            r#"("london"), {"units": "metric"}"#
        );
    }

    #[test]
    fn test_encode_empty_args() {
        let encoder = KeyEncoder::new();
        let args = CallArgs::new();

        assert!(args.is_empty());
        assert_eq!(encoder.encode(&args), "(), {}");
    }

    #[test]
    fn test_warns_on_angle_bracket_repr() {
        let (encoder, captured) = capturing_encoder();
        let args = CallArgs::new().arg(&"<Client instance>").unwrap();

        encoder.encode(&args);

        let warnings = captured.lock().unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("<Client instance>"));
    }

    #[test]
    fn test_warns_on_hex_address() {
        let (encoder, captured) = capturing_encoder();
        let args = CallArgs::new().arg(&"Client at 0x7f9a2c40d1e8").unwrap();

        encoder.encode(&args);

        assert_eq!(captured.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_no_warning_for_stable_values() {
        let (encoder, captured) = capturing_encoder();
        let args = CallArgs::new()
            .arg(&"london")
            .unwrap()
            .arg(&[1, 2, 3])
            .unwrap()
            .named("limit", &10)
            .unwrap();

        encoder.encode(&args);

        assert!(captured.lock().unwrap().is_empty());
    }

    #[test]
    fn test_warning_does_not_change_key() {
        let (capturing, _) = capturing_encoder();
        let silent = KeyEncoder::with_observer(|_| {});
        let args = CallArgs::new().arg(&"<Client instance>").unwrap();

        assert_eq!(capturing.encode(&args), silent.encode(&args));
    }

    #[test]
    fn test_short_hex_run_not_flagged() {
        let (encoder, captured) = capturing_encoder();
        let args = CallArgs::new().arg(&"0xCAFE").unwrap();

        encoder.encode(&args);

        assert!(captured.lock().unwrap().is_empty());
    }

    #[test]
    fn test_structured_argument_key_is_canonical() {
        let encoder = KeyEncoder::new();

        // Map-valued arguments render with sorted keys, so two maps built
        // in different orders still produce the same key.
        let first = CallArgs::new()
            .arg(&serde_json::json!({"a": 1, "b": 2}))
            .unwrap();
        let second = CallArgs::new()
            .arg(&serde_json::json!({"b": 2, "a": 1}))
            .unwrap();

        assert_eq!(encoder.encode(&first), encoder.encode(&second));
    }
}
