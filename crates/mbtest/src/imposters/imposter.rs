//! Imposters: mock endpoints grouping stubs on one port.

use super::recorded::RecordedRequest;
use super::responses::Response;
use super::stub::Stub;
use crate::config::authority;
use crate::error::{MountebankError, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
    Tcp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
            Protocol::Tcp => "tcp",
        })
    }
}

/// A mock endpoint.
///
/// Built in memory, then handed to a
/// [`MountebankServer`](crate::server::MountebankServer), which attaches it: the
/// imposter learns the host it is served from and the port Mountebank assigned,
/// and [`url`](Imposter::url) becomes available.
///
/// ```
/// use mbtest::imposters::{Imposter, Response, Stub};
///
/// let imposter = Imposter::new(Stub::responding(Response::new().body("sausages")))
///     .name("sausage shop");
/// assert!(!imposter.is_attached());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Imposter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub record_requests: bool,
    #[serde(default)]
    pub stubs: Vec<Stub>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "default_response"
    )]
    pub default_response: Option<Response>,
    #[serde(skip)]
    host: Option<String>,
}

impl Imposter {
    pub fn new(stub: Stub) -> Self {
        Self::with_stubs([stub])
    }

    pub fn with_stubs(stubs: impl IntoIterator<Item = Stub>) -> Self {
        Self {
            stubs: stubs.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn stub(mut self, stub: Stub) -> Self {
        self.stubs.push(stub);
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn record_requests(mut self, record: bool) -> Self {
        self.record_requests = record;
        self
    }

    pub fn default_response(mut self, response: Response) -> Self {
        self.default_response = Some(response);
        self
    }

    /// Record where the imposter is being served from.
    pub fn attach(&mut self, host: impl Into<String>, port: u16) {
        self.host = Some(host.into());
        self.port = Some(port);
    }

    /// Forget the serving host, e.g. after the imposter was deleted.
    pub fn detach(&mut self) {
        self.host = None;
    }

    pub fn is_attached(&self) -> bool {
        self.host.is_some() && self.port.is_some()
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Base URL requests to this imposter go to, e.g. `http://localhost:4545/`.
    ///
    /// An imposter with a fixed port but not yet attached is assumed to be on `localhost`.
    pub fn url(&self) -> Result<Url> {
        let port = self.port.ok_or(MountebankError::NotAttached)?;
        let host = self.host.as_deref().unwrap_or("localhost");
        let raw = format!("{}://{}", self.protocol, authority(host, port));
        Url::parse(&raw).map_err(|e| MountebankError::InvalidUrl {
            url: raw,
            reason: e.to_string(),
        })
    }

    /// The JSON body Mountebank expects on `POST /imposters`.
    pub fn as_structure(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Rebuild an imposter from a structure such as `GET /imposters/{port}` returns.
    pub fn from_structure(structure: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(structure)?)
    }
}

/// An imposter as reported by the admin API, with its traffic
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImposterDetail {
    #[serde(flatten)]
    pub imposter: Imposter,
    #[serde(default)]
    pub number_of_requests: u64,
    #[serde(default)]
    pub requests: Vec<RecordedRequest>,
}

/// `defaultResponse` carries the contents of an `is` block, without behaviors
mod default_response {
    use super::super::responses::{Behaviors, IsFields, Response};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(response: &Option<Response>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        response
            .as_ref()
            .map(Response::to_fields)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Response>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<IsFields>::deserialize(deserializer)?
            .map(|fields| Response::from_fields(fields, Behaviors::default())))
    }
}
