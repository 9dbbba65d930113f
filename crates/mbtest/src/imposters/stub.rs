//! Stubs: predicates plus an ordered list of responses.

use super::predicates::Predicate;
use super::responses::{Behaviors, InjectionResponse, IsFields, Proxy, Response};
use super::wire::normalize_behaviors;
use serde::{Deserialize, Serialize};

/// A single entry in a stub's `responses` list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StubResponseRaw", into = "StubResponseOut")]
pub enum StubResponse {
    Is(Response),
    Inject(InjectionResponse),
    Proxy(Proxy),
}

impl From<Response> for StubResponse {
    fn from(response: Response) -> Self {
        StubResponse::Is(response)
    }
}

impl From<InjectionResponse> for StubResponse {
    fn from(response: InjectionResponse) -> Self {
        StubResponse::Inject(response)
    }
}

impl From<Proxy> for StubResponse {
    fn from(proxy: Proxy) -> Self {
        StubResponse::Proxy(proxy)
    }
}

/// Raw deserialization type for stub responses
/// Supports:
/// - `is`, `proxy`, or `inject` fields
/// - `_behaviors` as an object or `behaviors` as an array
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StubResponseRaw {
    #[serde(default)]
    is: Option<IsFields>,
    #[serde(default)]
    proxy: Option<Proxy>,
    #[serde(default)]
    inject: Option<String>,
    #[serde(rename = "_behaviors", default)]
    underscore_behaviors: Option<serde_json::Value>,
    #[serde(default)]
    behaviors: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
struct StubResponseOut {
    #[serde(skip_serializing_if = "Option::is_none")]
    is: Option<IsFields>,
    #[serde(rename = "_behaviors", skip_serializing_if = "Option::is_none")]
    behaviors: Option<Behaviors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    proxy: Option<Proxy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inject: Option<String>,
}

impl TryFrom<StubResponseRaw> for StubResponse {
    type Error = String;

    fn try_from(raw: StubResponseRaw) -> Result<Self, Self::Error> {
        let behaviors = match raw
            .underscore_behaviors
            .or(raw.behaviors)
            .and_then(normalize_behaviors)
        {
            Some(value) => {
                serde_json::from_value(value).map_err(|e| format!("invalid behaviors: {e}"))?
            }
            None => Behaviors::default(),
        };

        // Priority: is > proxy > inject, matching how Mountebank resolves a response
        if let Some(is) = raw.is {
            Ok(StubResponse::Is(Response::from_fields(is, behaviors)))
        } else if let Some(proxy) = raw.proxy {
            Ok(StubResponse::Proxy(Proxy { behaviors, ..proxy }))
        } else if let Some(inject) = raw.inject {
            Ok(StubResponse::Inject(InjectionResponse { inject, behaviors }))
        } else {
            // An empty response object is Mountebank's default 200
            Ok(StubResponse::Is(Response::default()))
        }
    }
}

impl From<StubResponse> for StubResponseOut {
    fn from(response: StubResponse) -> Self {
        match response {
            StubResponse::Is(response) => StubResponseOut {
                is: Some(response.to_fields()),
                behaviors: non_empty(response.behaviors),
                proxy: None,
                inject: None,
            },
            StubResponse::Proxy(mut proxy) => StubResponseOut {
                is: None,
                behaviors: non_empty(std::mem::take(&mut proxy.behaviors)),
                proxy: Some(proxy),
                inject: None,
            },
            StubResponse::Inject(injection) => StubResponseOut {
                is: None,
                behaviors: non_empty(injection.behaviors),
                proxy: None,
                inject: Some(injection.inject),
            },
        }
    }
}

fn non_empty(behaviors: Behaviors) -> Option<Behaviors> {
    (!behaviors.is_empty()).then_some(behaviors)
}

/// A rule mapping matching requests to responses.
///
/// Responses are served round-robin in declared order across repeated matching
/// requests. An empty predicate list matches every request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stub {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub predicates: Vec<Predicate>,
    #[serde(default)]
    pub responses: Vec<StubResponse>,
}

impl Stub {
    pub fn new() -> Self {
        Self::default()
    }

    /// A stub answering every request with `response`.
    pub fn responding(response: impl Into<StubResponse>) -> Self {
        Self::new().response(response)
    }

    pub fn predicate(mut self, predicate: impl Into<Predicate>) -> Self {
        self.predicates.push(predicate.into());
        self
    }

    pub fn response(mut self, response: impl Into<StubResponse>) -> Self {
        self.responses.push(response.into());
        self
    }

    pub fn responses<R>(mut self, responses: impl IntoIterator<Item = R>) -> Self
    where
        R: Into<StubResponse>,
    {
        self.responses
            .extend(responses.into_iter().map(Into::into));
        self
    }
}
