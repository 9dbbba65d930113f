//! Assertions on imposter responses and recorded requests.
//!
//! ```
//! use mbtest::matchers::{assert_that, is_response, json_matching, CapturedResponse};
//! use serde_json::json;
//!
//! let response = CapturedResponse {
//!     status: 200,
//!     headers: vec![],
//!     body: br#"{"a": "b", "c": "d"}"#.to_vec(),
//! };
//! assert_that(&response, &is_response().with_status_code(200).with_body(json_matching(json!({"a": "b"}))));
//! ```

mod json;
mod requests;
mod response;

pub use json::json_contains;
pub use requests::{had_request, RequestMatcher};
pub use response::{
    contains_string, is_response, json_matching, BodyMatcher, CapturedResponse, ResponseMatcher,
};

/// An expectation that can explain why a value does not meet it
pub trait Matcher<T: ?Sized> {
    /// `Err` carries a description of how `actual` differs.
    fn check(&self, actual: &T) -> Result<(), String>;

    fn describe(&self) -> String;
}

/// Panic with an expected/actual report unless `matcher` accepts `actual`.
#[track_caller]
pub fn assert_that<T, M>(actual: &T, matcher: &M)
where
    T: ?Sized,
    M: Matcher<T>,
{
    if let Err(mismatch) = matcher.check(actual) {
        panic!(
            "\nExpected: {}\n     but: {}\n",
            matcher.describe(),
            mismatch
        );
    }
}
