//! Data Module
//!
//! Raw provider values, the sanitizer that makes them JSON-safe, and the
//! not-found guard for identified lookups.

mod not_found;
mod raw;
mod sanitizer;

pub use not_found::{extract_identifier, guard, is_empty_result, sanitize_and_guard, IDENTIFIER_KEYS};
pub use raw::{DataFrame, Index, NumericScalar, RawValue, Series};
pub use sanitizer::{key_string, sanitize, SanitizedValue};
