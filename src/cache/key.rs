//! Cache Key Module
//!
//! Derives deterministic cache keys from a namespace and the arguments of a
//! cached call.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Number of digest bytes kept in a key (128 bits).
const DIGEST_BYTES: usize = 16;

// == Call Arguments ==
/// Positional and keyword arguments of a cached call.
///
/// Keyword names are unique; setting a name twice replaces the earlier value.
/// Insertion order is kept but does not influence the generated key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    positional: Vec<Value>,
    keyword: Vec<(String, Value)>,
}

impl CallArgs {
    /// Creates an empty argument set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Sets a keyword argument.
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.keyword.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.keyword.push((name, value)),
        }
        self
    }

    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    /// Looks up a keyword argument by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.keyword
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }

    // == Textual Forms ==
    fn positional_repr(&self) -> String {
        Value::Array(self.positional.clone()).to_string()
    }

    /// Keyword pairs sorted by name, rendered as `[["name",value],...]`.
    fn keyword_repr(&self) -> String {
        let mut sorted: Vec<&(String, Value)> = self.keyword.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));

        let pairs = sorted
            .into_iter()
            .map(|(k, v)| Value::Array(vec![Value::String(k.clone()), v.clone()]))
            .collect();
        Value::Array(pairs).to_string()
    }
}

// == Generate Key ==
/// Builds `{prefix}:{namespace}:{digest}` for a call.
///
/// The digest covers `namespace`, then the positional arguments (if any),
/// then the name-sorted keyword arguments (if any), joined by `:`.
pub fn generate_key(prefix: &str, namespace: &str, args: &CallArgs) -> String {
    let mut parts = vec![namespace.to_string()];

    if !args.positional.is_empty() {
        parts.push(args.positional_repr());
    }

    if !args.keyword.is_empty() {
        parts.push(args.keyword_repr());
    }

    let digest = Sha256::digest(parts.join(":").as_bytes());
    let hashed = hex::encode(&digest[..DIGEST_BYTES]);

    format!("{}:{}:{}", prefix, namespace, hashed)
}

/// Pattern matching every key stored under `namespace`.
pub fn namespace_pattern(prefix: &str, namespace: &str) -> String {
    format!("{}:{}:*", prefix, namespace)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    const PREFIX: &str = "yfinance_api";

    #[test]
    fn test_key_layout() {
        let key = generate_key(PREFIX, "ticker", &CallArgs::new().kwarg("ticker", "AAPL"));
        let parts: Vec<&str> = key.split(':').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], PREFIX);
        assert_eq!(parts[1], "ticker");
        assert_eq!(parts[2].len(), DIGEST_BYTES * 2);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_keyword_order_independent() {
        let a = CallArgs::new()
            .kwarg("ticker", "AAPL")
            .kwarg("period", "1mo")
            .kwarg("interval", "1d");
        let b = CallArgs::new()
            .kwarg("interval", "1d")
            .kwarg("ticker", "AAPL")
            .kwarg("period", "1mo");

        assert_eq!(generate_key(PREFIX, "history", &a), generate_key(PREFIX, "history", &b));
    }

    #[test]
    fn test_distinct_values_distinct_keys() {
        let aapl = generate_key(PREFIX, "info", &CallArgs::new().kwarg("ticker", "AAPL"));
        let msft = generate_key(PREFIX, "info", &CallArgs::new().kwarg("ticker", "MSFT"));
        assert_ne!(aapl, msft);
    }

    #[test]
    fn test_positional_order_matters() {
        let ab = generate_key(PREFIX, "ns", &CallArgs::new().arg("a").arg("b"));
        let ba = generate_key(PREFIX, "ns", &CallArgs::new().arg("b").arg("a"));
        assert_ne!(ab, ba);
    }

    #[test]
    fn test_positional_and_keyword_not_confused() {
        let positional = generate_key(PREFIX, "ns", &CallArgs::new().arg("AAPL"));
        let keyword = generate_key(PREFIX, "ns", &CallArgs::new().kwarg("ticker", "AAPL"));
        assert_ne!(positional, keyword);
    }

    #[test]
    fn test_namespace_changes_key() {
        let args = CallArgs::new().kwarg("ticker", "AAPL");
        assert_ne!(
            generate_key(PREFIX, "info", &args),
            generate_key(PREFIX, "news", &args)
        );
    }

    #[test]
    fn test_no_arguments() {
        let key = generate_key(PREFIX, "market_summary", &CallArgs::new());
        assert!(key.starts_with("yfinance_api:market_summary:"));
        assert_eq!(key, generate_key(PREFIX, "market_summary", &CallArgs::new()));
    }

    #[test]
    fn test_kwarg_replaces_existing() {
        let args = CallArgs::new().kwarg("ticker", "AAPL").kwarg("ticker", "MSFT");
        assert_eq!(args.get("ticker"), Some(&Value::from("MSFT")));
        assert_eq!(
            generate_key(PREFIX, "info", &args),
            generate_key(PREFIX, "info", &CallArgs::new().kwarg("ticker", "MSFT"))
        );
    }

    #[test]
    fn test_namespace_pattern() {
        assert_eq!(namespace_pattern(PREFIX, "ticker"), "yfinance_api:ticker:*");
    }
}
