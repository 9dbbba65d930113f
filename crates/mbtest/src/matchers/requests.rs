//! Matching requests recorded by an imposter.

use super::response::BodyMatcher;
use super::Matcher;
use crate::imposters::RecordedRequest;

/// Expectation that an imposter saw a request, built by [`had_request`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestMatcher {
    method: Option<String>,
    path: Option<String>,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Option<BodyMatcher>,
    times: Option<usize>,
}

/// Start a recorded-request matcher: `had_request().with_path("/test").times(1)`.
pub fn had_request() -> RequestMatcher {
    RequestMatcher::default()
}

impl RequestMatcher {
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<BodyMatcher>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Require exactly `n` matching requests instead of at least one.
    pub fn times(mut self, n: usize) -> Self {
        self.times = Some(n);
        self
    }

    fn matches(&self, request: &RecordedRequest) -> bool {
        if let Some(method) = &self.method {
            if !request.method.eq_ignore_ascii_case(method) {
                return false;
            }
        }
        if let Some(path) = &self.path {
            if request.path != *path {
                return false;
            }
        }
        let query_ok = self
            .query
            .iter()
            .all(|(k, v)| request.query.get(k) == Some(v));
        let headers_ok = self
            .headers
            .iter()
            .all(|(k, v)| request.header(k) == Some(v.as_str()));
        let body_ok = self.body.as_ref().map_or(true, |body| {
            body.check_text(request.body.as_deref().unwrap_or_default())
                .is_ok()
        });
        query_ok && headers_ok && body_ok
    }
}

impl Matcher<[RecordedRequest]> for RequestMatcher {
    fn check(&self, actual: &[RecordedRequest]) -> Result<(), String> {
        let count = actual.iter().filter(|r| self.matches(r)).count();
        let ok = match self.times {
            Some(n) => count == n,
            None => count > 0,
        };
        if ok {
            return Ok(());
        }

        let seen: Vec<String> = actual
            .iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect();
        Err(format!(
            "{count} matching request(s) among [{}]",
            seen.join(", ")
        ))
    }

    fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(method) = &self.method {
            parts.push(format!("method {method}"));
        }
        if let Some(path) = &self.path {
            parts.push(format!("path {path:?}"));
        }
        for (k, v) in &self.query {
            parts.push(format!("query {k}={v:?}"));
        }
        for (k, v) in &self.headers {
            parts.push(format!("header {k}: {v:?}"));
        }
        if let Some(body) = &self.body {
            parts.push(body.describe());
        }
        let what = if parts.is_empty() {
            "a request".to_string()
        } else {
            format!("a request with {}", parts.join(", "))
        };
        match self.times {
            Some(n) => format!("{what} exactly {n} time(s)"),
            None => format!("{what} at least once"),
        }
    }
}
