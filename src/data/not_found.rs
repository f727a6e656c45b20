//! Not-Found Guard
//!
//! Empty data for an identified lookup (a ticker, a market, a search query)
//! usually means the identifier is wrong. The guard turns that case into
//! `ServiceError::NotFound` and every other empty result into `[]`.

use serde_json::Value;

use super::raw::RawValue;
use super::sanitizer::{sanitize, SanitizedValue};
use crate::cache::CallArgs;
use crate::error::{Result, ServiceError};

/// Keyword arguments checked, in order, for the lookup identifier.
pub const IDENTIFIER_KEYS: [&str; 5] = ["ticker", "market", "sector", "industry", "query"];

// == Identifier ==
/// Value of the first identifier keyword present in `args`, if it is truthy.
///
/// Only the first present name is considered: a falsy `ticker` hides a
/// truthy `market`. Positional arguments are never inspected.
pub fn extract_identifier(args: &CallArgs) -> Option<String> {
    let value = IDENTIFIER_KEYS.iter().find_map(|name| args.get(name))?;

    if !is_truthy(value) {
        return None;
    }

    Some(match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|x| x != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Null, `[]`, `{}` and `""` count as no data.
pub fn is_empty_result(value: &SanitizedValue) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

// == Guard ==
/// Passes non-empty values through; maps empty ones to not-found or `[]`.
pub fn guard(value: SanitizedValue, args: &CallArgs) -> Result<SanitizedValue> {
    if !is_empty_result(&value) {
        return Ok(value);
    }

    match extract_identifier(args) {
        Some(identifier) => Err(ServiceError::NotFound(identifier)),
        None => Ok(Value::Array(Vec::new())),
    }
}

/// Sanitizes provider output and applies the not-found guard.
pub fn sanitize_and_guard(value: &RawValue, args: &CallArgs) -> Result<SanitizedValue> {
    guard(sanitize(value), args)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataFrame;
    use serde_json::json;

    #[test]
    fn test_identifier_priority() {
        let args = CallArgs::new().kwarg("query", "apple").kwarg("market", "US");
        assert_eq!(extract_identifier(&args), Some("US".to_string()));

        let args = CallArgs::new().kwarg("ticker", "AAPL").kwarg("market", "US");
        assert_eq!(extract_identifier(&args), Some("AAPL".to_string()));
    }

    #[test]
    fn test_falsy_first_identifier_hides_later_ones() {
        let args = CallArgs::new().kwarg("ticker", "").kwarg("market", "US");
        assert_eq!(extract_identifier(&args), None);

        let args = CallArgs::new().kwarg("ticker", Value::Null);
        assert_eq!(extract_identifier(&args), None);
    }

    #[test]
    fn test_positional_identifier_is_ignored() {
        let args = CallArgs::new().arg("AAPL");
        assert_eq!(extract_identifier(&args), None);
    }

    #[test]
    fn test_non_string_identifier() {
        let args = CallArgs::new().kwarg("query", 42);
        assert_eq!(extract_identifier(&args), Some("42".to_string()));
    }

    #[test]
    fn test_empty_with_identifier_is_not_found() {
        let args = CallArgs::new().kwarg("ticker", "ZZZZINVALID");
        let err = sanitize_and_guard(&DataFrame::new(["Close"]).into(), &args).unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Ticker 'ZZZZINVALID' not found");
    }

    #[test]
    fn test_empty_without_identifier_is_empty_list() {
        let args = CallArgs::new().kwarg("period", "1mo");

        assert_eq!(sanitize_and_guard(&RawValue::None, &args).unwrap(), json!([]));
        assert_eq!(sanitize_and_guard(&RawValue::Map(vec![]), &args).unwrap(), json!([]));
        assert_eq!(sanitize_and_guard(&"".into(), &args).unwrap(), json!([]));
    }

    #[test]
    fn test_non_empty_passes_through() {
        let args = CallArgs::new().kwarg("ticker", "AAPL");
        let value = RawValue::map([("price", 189.5)]);

        assert_eq!(sanitize_and_guard(&value, &args).unwrap(), json!({"price": 189.5}));
        assert_eq!(guard(json!(0), &args).unwrap(), json!(0));
        assert_eq!(guard(json!(false), &args).unwrap(), json!(false));
    }

    #[test]
    fn test_list_of_nulls_is_not_empty() {
        let args = CallArgs::new().kwarg("ticker", "AAPL");
        let value = RawValue::list([f64::NAN]);
        assert_eq!(sanitize_and_guard(&value, &args).unwrap(), json!([null]));
    }
}
