//! JSON subset matching.
//!
//! `expected` is contained in `actual` when every key of every expected object is
//! present in the corresponding actual object with a contained value. Arrays are
//! compared element by element; `actual` may carry extra trailing elements.

use assert_json_diff::{assert_json_matches_no_panic, CompareMode, Config};
use serde_json::Value;

pub fn json_contains(actual: &Value, expected: &Value) -> bool {
    json_mismatch(actual, expected).is_none()
}

/// Describe every place `actual` fails to contain `expected`, with JSON paths.
pub(crate) fn json_mismatch(actual: &Value, expected: &Value) -> Option<String> {
    assert_json_matches_no_panic(actual, expected, Config::new(CompareMode::Inclusive)).err()
}
