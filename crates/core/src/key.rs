//! Idempotency key derivation.
//!
//! A key is a fingerprint of a use case's logical input, used to spot
//! duplicate invocations. It is not a security boundary.
//!
//! # Determinism
//!
//! Every derivation function, built-in or custom, must be pure: the same
//! use case and the same logical input must produce the same key in every
//! process, on every host, for as long as records live. A derivation that
//! folds in a timestamp, a random value or a field that differs between
//! retries silently disables duplicate detection for that use case.
//!
//! The canonical form sorts object keys but writes numbers as serde_json
//! renders them, so `43` and `43.0` are different inputs. Callers that build
//! inputs from loosely typed JSON should normalise numeric encodings first.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::KeyError;

/// Signature of a caller-supplied derivation function.
pub type DeriveFn = dyn Fn(&str, &Value) -> Result<String, KeyError> + Send + Sync;

/// Turns (use case, input) into a stable key string.
///
/// The default derivation is [`fingerprint`]. A custom function can replace
/// it for every use case ([`KeyDeriver::custom`]) or for one named use case
/// ([`KeyDeriver::with_use_case`]), e.g. to hash only the fields that
/// identify a request and ignore a client-side timestamp.
#[derive(Clone, Default)]
pub struct KeyDeriver {
    fallback: Option<Arc<DeriveFn>>,
    per_use_case: HashMap<String, Arc<DeriveFn>>,
}

impl KeyDeriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `derive` for every use case without a dedicated override.
    pub fn custom<F>(derive: F) -> Self
    where
        F: Fn(&str, &Value) -> Result<String, KeyError> + Send + Sync + 'static,
    {
        Self {
            fallback: Some(Arc::new(derive)),
            per_use_case: HashMap::new(),
        }
    }

    /// Override derivation for a single use case.
    pub fn with_use_case<F>(mut self, use_case: impl Into<String>, derive: F) -> Self
    where
        F: Fn(&str, &Value) -> Result<String, KeyError> + Send + Sync + 'static,
    {
        self.per_use_case.insert(use_case.into(), Arc::new(derive));
        self
    }

    /// Derive the key for any serializable input.
    pub fn derive<I>(&self, use_case: &str, input: &I) -> Result<String, KeyError>
    where
        I: Serialize + ?Sized,
    {
        let value = serde_json::to_value(input)?;
        self.derive_value(use_case, &value)
    }

    /// Derive the key for an already-serialized input.
    pub fn derive_value(&self, use_case: &str, input: &Value) -> Result<String, KeyError> {
        let derive = self
            .per_use_case
            .get(use_case)
            .or(self.fallback.as_ref());
        let key = match derive {
            Some(f) => f(use_case, input)?,
            None => fingerprint(use_case, input),
        };
        if key.is_empty() {
            return Err(KeyError::EmptyKey {
                use_case: use_case.to_string(),
            });
        }
        Ok(key)
    }
}

impl fmt::Debug for KeyDeriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut overrides: Vec<&str> = self.per_use_case.keys().map(String::as_str).collect();
        overrides.sort_unstable();
        f.debug_struct("KeyDeriver")
            .field("custom_fallback", &self.fallback.is_some())
            .field("overrides", &overrides)
            .finish()
    }
}

/// The default fingerprint: SHA-256 over the use case name, a NUL separator
/// and the canonical JSON of `input`, as 64 lowercase hex characters.
///
/// Folding the use case in keeps fingerprints of different use cases apart
/// even though records are already namespaced by use case.
pub fn fingerprint(use_case: &str, input: &Value) -> String {
    let mut canonical = String::new();
    write_canonical(input, &mut canonical);

    let mut hasher = Sha256::new();
    hasher.update(use_case.as_bytes());
    hasher.update([0u8]);
    hasher.update(canonical.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Compact JSON with object members sorted by key at every depth.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (k, v)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(k.clone()).to_string());
                out.push(':');
                write_canonical(v, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
