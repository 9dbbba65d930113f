//! Response definitions: canned `is` responses, injection responses, and proxies.

use super::wire::{default_status_code, deserialize_status_code, deserialize_string_map};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Response mode for body handling
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Body is UTF-8 text or structured JSON (default)
    #[default]
    Text,
    /// Body is base64-encoded binary data
    Binary,
}

pub(crate) fn is_text_mode(mode: &Mode) -> bool {
    *mode == Mode::Text
}

/// Response body as sent to Mountebank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Body {
    /// Plain text, or base64 text when the response is in [`Mode::Binary`]
    Text(String),
    /// Structured body, serialized by Mountebank as JSON
    Json(serde_json::Value),
}

impl From<&str> for Body {
    fn from(s: &str) -> Self {
        Body::Text(s.to_string())
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Text(s)
    }
}

impl From<serde_json::Value> for Body {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => Body::Text(s),
            other => Body::Json(other),
        }
    }
}

/// Wait behavior - add latency before response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Wait {
    /// Fixed delay in milliseconds
    Millis(u64),
    /// JavaScript function returning the delay
    Function(String),
}

/// Response behaviors (`_behaviors`)
///
/// `copy` and `lookup` are passed through untouched so that structures read back
/// from a server survive a round trip.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Behaviors {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait: Option<Wait>,
    /// Serve the response this many times before advancing to the next one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decorate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell_transform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup: Option<serde_json::Value>,
}

impl Behaviors {
    pub fn is_empty(&self) -> bool {
        *self == Behaviors::default()
    }
}

/// A canned response (`is` in Mountebank terms).
///
/// ```
/// use mbtest::imposters::{Mode, Response};
///
/// let ok = Response::new().body("sausages");
/// let empty = Response::new().status_code(204);
/// let binary = Response::new().mode(Mode::Binary).body("c2F1c2FnZXM=");
/// assert_eq!(binary.body_bytes().unwrap(), Some(b"sausages".to_vec()));
/// # let _ = (ok, empty);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub body: Option<Body>,
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub mode: Mode,
    pub behaviors: Behaviors,
    /// Other `is` fields, such as tcp `data`, passed through untouched
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            body: None,
            status_code: default_status_code(),
            headers: BTreeMap::new(),
            mode: Mode::Text,
            behaviors: Behaviors::default(),
            extra: serde_json::Map::new(),
        }
    }
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    /// A binary response carrying `bytes`, base64-encoded for the wire.
    pub fn binary(bytes: impl AsRef<[u8]>) -> Self {
        Self::new()
            .mode(Mode::Binary)
            .body(BASE64.encode(bytes.as_ref()))
    }

    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn status_code(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn headers<K, V>(mut self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Set an `is` field this type does not model, e.g. `data` for a tcp imposter.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    /// Delay the response by a fixed number of milliseconds.
    pub fn wait(mut self, millis: u64) -> Self {
        self.behaviors.wait = Some(Wait::Millis(millis));
        self
    }

    /// Delay the response by whatever the JavaScript function returns.
    pub fn wait_function(mut self, function: impl Into<String>) -> Self {
        self.behaviors.wait = Some(Wait::Function(function.into()));
        self
    }

    pub fn repeat(mut self, times: u32) -> Self {
        self.behaviors.repeat = Some(times);
        self
    }

    pub fn decorate(mut self, function: impl Into<String>) -> Self {
        self.behaviors.decorate = Some(function.into());
        self
    }

    pub fn shell_transform(mut self, command: impl Into<String>) -> Self {
        self.behaviors.shell_transform = Some(command.into());
        self
    }

    /// The bytes Mountebank will put on the wire for this body.
    ///
    /// Binary bodies are base64-decoded; structured bodies are rendered as JSON.
    pub fn body_bytes(&self) -> Result<Option<Vec<u8>>, base64::DecodeError> {
        let Some(body) = &self.body else {
            return Ok(None);
        };
        match (self.mode, body) {
            (Mode::Binary, Body::Text(encoded)) => BASE64.decode(encoded.trim()).map(Some),
            (_, Body::Text(text)) => Ok(Some(text.as_bytes().to_vec())),
            (_, Body::Json(value)) => Ok(Some(value.to_string().into_bytes())),
        }
    }

    pub(crate) fn to_fields(&self) -> IsFields {
        IsFields {
            status_code: self.status_code,
            headers: self.headers.clone(),
            body: self.body.clone(),
            mode: self.mode,
            extra: self.extra.clone(),
        }
    }

    pub(crate) fn from_fields(fields: IsFields, behaviors: Behaviors) -> Self {
        Self {
            body: fields.body,
            status_code: fields.status_code,
            headers: fields.headers,
            mode: fields.mode,
            behaviors,
            extra: fields.extra,
        }
    }
}

/// The contents of an `is` block, also used for an imposter's `defaultResponse`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IsFields {
    #[serde(
        default = "default_status_code",
        deserialize_with = "deserialize_status_code"
    )]
    pub status_code: u16,
    #[serde(
        default,
        deserialize_with = "deserialize_string_map",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Body>,
    #[serde(rename = "_mode", default, skip_serializing_if = "is_text_mode")]
    pub mode: Mode,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A response whose body is computed by Mountebank at request time.
///
/// `inject` is a JavaScript function receiving the request configuration, e.g.
/// `function (config) { return {body: config.request.headers['foo'].toUpperCase()}; }`.
/// Requires Mountebank 2.0 or later started with `--allowInjection`.
#[derive(Debug, Clone, PartialEq)]
pub struct InjectionResponse {
    pub inject: String,
    pub behaviors: Behaviors,
}

impl InjectionResponse {
    pub fn new(inject: impl Into<String>) -> Self {
        Self {
            inject: inject.into(),
            behaviors: Behaviors::default(),
        }
    }

    pub fn behaviors(mut self, behaviors: Behaviors) -> Self {
        self.behaviors = behaviors;
        self
    }
}

/// Proxy recording mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProxyMode {
    /// Record the first response and replay it afterwards
    #[default]
    ProxyOnce,
    /// Always forward, recording every response
    ProxyAlways,
    /// Always forward without recording
    ProxyTransparent,
}

/// Which request fields a proxy uses to build predicates for recorded stubs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredicateGenerator {
    pub matches: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_sensitive: Option<bool>,
}

/// A response forwarded to a real downstream service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proxy {
    pub to: String,
    #[serde(default)]
    pub mode: ProxyMode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub predicate_generators: Vec<PredicateGenerator>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub add_wait_behavior: bool,
    #[serde(
        default,
        deserialize_with = "deserialize_string_map",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub inject_headers: BTreeMap<String, String>,
    /// Sent alongside `proxy` as the response's `_behaviors`
    #[serde(skip)]
    pub behaviors: Behaviors,
}

impl Proxy {
    pub fn new(to: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            mode: ProxyMode::default(),
            predicate_generators: Vec::new(),
            add_wait_behavior: false,
            inject_headers: BTreeMap::new(),
            behaviors: Behaviors::default(),
        }
    }

    pub fn behaviors(mut self, behaviors: Behaviors) -> Self {
        self.behaviors = behaviors;
        self
    }

    pub fn mode(mut self, mode: ProxyMode) -> Self {
        self.mode = mode;
        self
    }

    /// Generate predicates from the named request fields, e.g. `["method", "path"]`.
    pub fn generate_predicates_on<'a>(mut self, fields: impl IntoIterator<Item = &'a str>) -> Self {
        let matches: serde_json::Map<String, serde_json::Value> = fields
            .into_iter()
            .map(|f| (f.to_string(), serde_json::Value::Bool(true)))
            .collect();
        self.predicate_generators.push(PredicateGenerator {
            matches: serde_json::Value::Object(matches),
            case_sensitive: None,
        });
        self
    }

    pub fn add_wait_behavior(mut self, enabled: bool) -> Self {
        self.add_wait_behavior = enabled;
        self
    }

    pub fn inject_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inject_headers.insert(name.into(), value.into());
        self
    }
}
