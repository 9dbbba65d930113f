//! Matching HTTP responses returned by imposters.

use super::json::json_mismatch;
use super::Matcher;
use crate::error::Result;
use std::borrow::Cow;

/// A fully read HTTP response, so it can be matched more than once
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedResponse {
    /// Read the whole response.
    pub async fn capture(response: reqwest::Response) -> Result<Self> {
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await?.to_vec();
        Ok(Self {
            status,
            headers,
            body,
        })
    }

    /// Header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Expectation on a response (or recorded request) body
#[derive(Debug, Clone, PartialEq)]
pub enum BodyMatcher {
    Equals(String),
    Contains(String),
    /// Body parses as JSON containing this value as a subset
    Json(serde_json::Value),
}

impl BodyMatcher {
    pub(crate) fn check_text(&self, body: &str) -> std::result::Result<(), String> {
        match self {
            BodyMatcher::Equals(expected) if body == expected => Ok(()),
            BodyMatcher::Equals(_) => Err(format!("body was {body:?}")),
            BodyMatcher::Contains(fragment) if body.contains(fragment.as_str()) => Ok(()),
            BodyMatcher::Contains(_) => Err(format!("body was {body:?}")),
            BodyMatcher::Json(expected) => {
                let actual: serde_json::Value = serde_json::from_str(body)
                    .map_err(|e| format!("body {body:?} is not JSON: {e}"))?;
                match json_mismatch(&actual, expected) {
                    None => Ok(()),
                    Some(mismatch) => Err(format!("body JSON mismatch: {mismatch}")),
                }
            }
        }
    }

    pub(crate) fn describe(&self) -> String {
        match self {
            BodyMatcher::Equals(expected) => format!("body {expected:?}"),
            BodyMatcher::Contains(fragment) => format!("body containing {fragment:?}"),
            BodyMatcher::Json(expected) => format!("JSON body matching {expected}"),
        }
    }
}

impl From<&str> for BodyMatcher {
    fn from(s: &str) -> Self {
        BodyMatcher::Equals(s.to_string())
    }
}

impl From<String> for BodyMatcher {
    fn from(s: String) -> Self {
        BodyMatcher::Equals(s)
    }
}

/// Body is JSON containing `expected`, e.g. `json_matching(json!({"a": "b"}))`.
pub fn json_matching(expected: serde_json::Value) -> BodyMatcher {
    BodyMatcher::Json(expected)
}

pub fn contains_string(fragment: impl Into<String>) -> BodyMatcher {
    BodyMatcher::Contains(fragment.into())
}

/// Expectations on status, headers and body of a [`CapturedResponse`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseMatcher {
    status_code: Option<u16>,
    headers: Vec<(String, String)>,
    body: Option<BodyMatcher>,
    content: Option<Vec<u8>>,
}

/// Start a response matcher: `is_response().with_status_code(204)`.
pub fn is_response() -> ResponseMatcher {
    ResponseMatcher::default()
}

impl ResponseMatcher {
    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// Header `name` (case-insensitive) has exactly `value`.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<BodyMatcher>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Raw body bytes are exactly `content`.
    pub fn with_content(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.content = Some(content.into());
        self
    }
}

impl Matcher<CapturedResponse> for ResponseMatcher {
    fn check(&self, actual: &CapturedResponse) -> std::result::Result<(), String> {
        let mut mismatches = Vec::new();

        if let Some(expected) = self.status_code {
            if actual.status != expected {
                mismatches.push(format!("status code was {}", actual.status));
            }
        }
        for (name, expected) in &self.headers {
            match actual.header(name) {
                Some(value) if value == expected => {}
                Some(value) => mismatches.push(format!("header {name} was {value:?}")),
                None => mismatches.push(format!("header {name} was missing")),
            }
        }
        if let Some(body) = &self.body {
            if let Err(mismatch) = body.check_text(&actual.text()) {
                mismatches.push(mismatch);
            }
        }
        if let Some(expected) = &self.content {
            if actual.body != *expected {
                mismatches.push(format!("content was {:?}", actual.body));
            }
        }

        if mismatches.is_empty() {
            Ok(())
        } else {
            Err(mismatches.join(", "))
        }
    }

    fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(status) = self.status_code {
            parts.push(format!("status code {status}"));
        }
        for (name, value) in &self.headers {
            parts.push(format!("header {name}: {value:?}"));
        }
        if let Some(body) = &self.body {
            parts.push(body.describe());
        }
        if let Some(content) = &self.content {
            parts.push(format!("content {content:?}"));
        }
        if parts.is_empty() {
            "any response".to_string()
        } else {
            format!("response with {}", parts.join(", "))
        }
    }
}
