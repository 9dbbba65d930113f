//! Shared fixtures for integration tests.
//!
//! `FakeMountebank` is a small in-process stand-in for the Mountebank admin API.
//! It serves `is` responses round-robin (text, JSON and binary bodies, headers,
//! status codes), `equals` predicates on method and path, default responses and
//! request recording. It rejects `inject` responses the way `mb` does when
//! started without `--allowInjection`.
//!
//! Set `MBTEST_EXECUTABLE` or `MBTEST_HOST` to run the same tests against a
//! real Mountebank instead (with `--test-threads=1`).

#![allow(dead_code)]

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use mbtest::{MbtestConfig, MountebankServer};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const FAKE_VERSION: &str = "2.9.1";

type HttpResponse = Response<Full<Bytes>>;

/// Accept connections on `listener` forever, answering each request with `handler`.
fn serve<F, Fut>(listener: TcpListener, handler: F) -> JoinHandle<()>
where
    F: Fn(Request<Incoming>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = HttpResponse> + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            let (stream, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => return,
            };
            let io = TokioIo::new(stream);
            let handler = handler.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let handler = handler.clone();
                    async move { Ok::<_, Infallible>(handler(req).await) }
                });
                let _ = http1::Builder::new().serve_connection(io, service).await;
            });
        }
    })
}

fn json_response(status: StatusCode, body: &Value) -> HttpResponse {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .expect("valid response")
}

fn mb_error(status: StatusCode, code: &str, message: &str) -> HttpResponse {
    json_response(
        status,
        &json!({"errors": [{"code": code, "message": message}]}),
    )
}

struct RunningImposter {
    structure: Value,
    requests: Arc<Mutex<Vec<Value>>>,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct AdminState {
    imposters: Mutex<HashMap<u16, RunningImposter>>,
}

impl Drop for AdminState {
    fn drop(&mut self) {
        if let Ok(imposters) = self.imposters.lock() {
            for imposter in imposters.values() {
                imposter.task.abort();
            }
        }
    }
}

pub struct FakeMountebank {
    addr: SocketAddr,
    state: Arc<AdminState>,
    task: JoinHandle<()>,
}

impl FakeMountebank {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind admin port");
        let addr = listener.local_addr().expect("admin address");
        let state = Arc::new(AdminState::default());

        let handler_state = Arc::clone(&state);
        let task = serve(listener, move |req| {
            let state = Arc::clone(&handler_state);
            async move { handle_admin(req, state).await }
        });

        Self { addr, state, task }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn imposter_ports(&self) -> Vec<u16> {
        let mut ports: Vec<u16> = self
            .state
            .imposters
            .lock()
            .expect("lock poisoned")
            .keys()
            .copied()
            .collect();
        ports.sort_unstable();
        ports
    }
}

impl Drop for FakeMountebank {
    fn drop(&mut self) {
        self.task.abort();
        if let Ok(mut imposters) = self.state.imposters.lock() {
            for (_, imposter) in imposters.drain() {
                imposter.task.abort();
            }
        }
    }
}

async fn handle_admin(req: Request<Incoming>, state: Arc<AdminState>) -> HttpResponse {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => Bytes::new(),
    };

    match (method, segments.as_slice()) {
        (Method::GET, [""]) => json_response(StatusCode::OK, &json!({"_links": {}})),
        (Method::GET, ["config"]) => json_response(
            StatusCode::OK,
            &json!({"version": FAKE_VERSION, "options": {"allowInjection": false}}),
        ),
        (Method::POST, ["imposters"]) => create_imposter(&body, &state).await,
        (Method::GET, ["imposters"]) => {
            let imposters = state.imposters.lock().expect("lock poisoned");
            let mut list: Vec<(&u16, &RunningImposter)> = imposters.iter().collect();
            list.sort_by_key(|(port, _)| **port);
            let structures: Vec<Value> = list.iter().map(|(_, i)| i.structure.clone()).collect();
            json_response(StatusCode::OK, &json!({"imposters": structures}))
        }
        (Method::DELETE, ["imposters"]) => {
            let mut imposters = state.imposters.lock().expect("lock poisoned");
            for (_, imposter) in imposters.drain() {
                imposter.task.abort();
            }
            json_response(StatusCode::OK, &json!({"imposters": []}))
        }
        (Method::GET, ["imposters", port]) => {
            let imposters = state.imposters.lock().expect("lock poisoned");
            match port.parse::<u16>().ok().and_then(|p| imposters.get(&p)) {
                Some(imposter) => {
                    let requests = imposter.requests.lock().expect("lock poisoned").clone();
                    let mut structure = imposter.structure.clone();
                    structure["numberOfRequests"] = json!(requests.len());
                    structure["requests"] = Value::Array(requests);
                    json_response(StatusCode::OK, &structure)
                }
                None => mb_error(
                    StatusCode::NOT_FOUND,
                    "no such resource",
                    &format!("Try POSTing to /imposters first? No imposter on port {port}"),
                ),
            }
        }
        (Method::DELETE, ["imposters", port]) => {
            let removed = port
                .parse::<u16>()
                .ok()
                .and_then(|p| state.imposters.lock().expect("lock poisoned").remove(&p));
            match removed {
                Some(imposter) => {
                    imposter.task.abort();
                    json_response(StatusCode::OK, &imposter.structure)
                }
                None => json_response(StatusCode::OK, &json!({})),
            }
        }
        (Method::DELETE, ["imposters", port, "savedRequests"]) => {
            let imposters = state.imposters.lock().expect("lock poisoned");
            if let Some(imposter) = port.parse::<u16>().ok().and_then(|p| imposters.get(&p)) {
                imposter.requests.lock().expect("lock poisoned").clear();
            }
            json_response(StatusCode::OK, &json!({}))
        }
        _ => mb_error(StatusCode::NOT_FOUND, "no such resource", "unknown admin route"),
    }
}

async fn create_imposter(body: &[u8], state: &Arc<AdminState>) -> HttpResponse {
    let mut structure: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => return mb_error(StatusCode::BAD_REQUEST, "invalid JSON", &e.to_string()),
    };

    let stubs = structure["stubs"].as_array().cloned().unwrap_or_default();
    let uses_injection = stubs.iter().any(|stub| {
        stub["responses"]
            .as_array()
            .is_some_and(|responses| responses.iter().any(|r| r.get("inject").is_some()))
    });
    if uses_injection {
        return mb_error(
            StatusCode::BAD_REQUEST,
            "invalid injection",
            "JavaScript injection is not allowed unless mb is run with the --allowInjection flag",
        );
    }

    let requested_port = structure["port"].as_u64().unwrap_or(0) as u16;
    let listener = match TcpListener::bind(("127.0.0.1", requested_port)).await {
        Ok(l) => l,
        Err(e) => {
            return mb_error(
                StatusCode::BAD_REQUEST,
                "resource conflict",
                &format!("port {requested_port} unavailable: {e}"),
            )
        }
    };
    let port = match listener.local_addr() {
        Ok(addr) => addr.port(),
        Err(e) => return mb_error(StatusCode::INTERNAL_SERVER_ERROR, "bind", &e.to_string()),
    };
    structure["port"] = json!(port);

    let requests = Arc::new(Mutex::new(Vec::new()));
    let behavior = Arc::new(ImposterBehavior {
        record: structure["recordRequests"].as_bool().unwrap_or(false),
        default_response: structure.get("defaultResponse").cloned(),
        cursors: stubs.iter().map(|_| AtomicUsize::new(0)).collect(),
        stubs,
        requests: Arc::clone(&requests),
    });
    let task = serve(listener, move |req| {
        let behavior = Arc::clone(&behavior);
        async move { behavior.respond(req).await }
    });

    state.imposters.lock().expect("lock poisoned").insert(
        port,
        RunningImposter {
            structure: structure.clone(),
            requests,
            task,
        },
    );
    json_response(StatusCode::CREATED, &structure)
}

struct ImposterBehavior {
    record: bool,
    stubs: Vec<Value>,
    cursors: Vec<AtomicUsize>,
    default_response: Option<Value>,
    requests: Arc<Mutex<Vec<Value>>>,
}

impl ImposterBehavior {
    async fn respond(&self, req: Request<Incoming>) -> HttpResponse {
        let method = req.method().as_str().to_string();
        let path = req.uri().path().to_string();
        let query: serde_json::Map<String, Value> = req
            .uri()
            .query()
            .unwrap_or_default()
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
                (k.to_string(), Value::String(v.to_string()))
            })
            .collect();
        let headers: serde_json::Map<String, Value> = req
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    Value::String(String::from_utf8_lossy(v.as_bytes()).into_owned()),
                )
            })
            .collect();
        let body = match req.into_body().collect().await {
            Ok(collected) => String::from_utf8_lossy(&collected.to_bytes()).into_owned(),
            Err(_) => String::new(),
        };

        if self.record {
            self.requests.lock().expect("lock poisoned").push(json!({
                "requestFrom": "127.0.0.1",
                "method": method,
                "path": path,
                "query": query,
                "headers": headers,
                "body": body,
                "timestamp": "1970-01-01T00:00:00.000Z"
            }));
        }

        let matched = self
            .stubs
            .iter()
            .position(|stub| stub_matches(stub, &method, &path));
        let response = match matched {
            Some(index) => {
                let responses = self.stubs[index]["responses"]
                    .as_array()
                    .cloned()
                    .unwrap_or_default();
                if responses.is_empty() {
                    self.default_is()
                } else {
                    let n = self.cursors[index].fetch_add(1, Ordering::SeqCst);
                    responses[n % responses.len()]["is"].clone()
                }
            }
            None => self.default_is(),
        };
        render_is(&response)
    }

    fn default_is(&self) -> Value {
        self.default_response.clone().unwrap_or_else(|| json!({}))
    }
}

/// Only `equals` on method and path is understood; other predicates never match.
fn stub_matches(stub: &Value, method: &str, path: &str) -> bool {
    let Some(predicates) = stub["predicates"].as_array() else {
        return true;
    };
    predicates.iter().all(|predicate| match predicate.get("equals") {
        Some(fields) => {
            fields["method"]
                .as_str()
                .map_or(true, |m| m.eq_ignore_ascii_case(method))
                && fields["path"].as_str().map_or(true, |p| p == path)
        }
        None => false,
    })
}

fn render_is(is: &Value) -> HttpResponse {
    let status = match &is["statusCode"] {
        Value::Number(n) => n.as_u64().unwrap_or(200) as u16,
        Value::String(s) => s.parse().unwrap_or(200),
        _ => 200,
    };
    let mut builder = Response::builder().status(status);
    let mut has_content_type = false;
    if let Some(headers) = is["headers"].as_object() {
        for (name, value) in headers {
            has_content_type |= name.eq_ignore_ascii_case("content-type");
            builder = builder.header(name.as_str(), value.as_str().unwrap_or_default());
        }
    }

    let body = match &is["body"] {
        Value::Null => Bytes::new(),
        Value::String(s) if is["_mode"] == "binary" => {
            Bytes::from(BASE64.decode(s.trim()).unwrap_or_default())
        }
        Value::String(s) => Bytes::from(s.clone()),
        other => {
            if !has_content_type {
                builder = builder.header("Content-Type", "application/json");
            }
            Bytes::from(other.to_string())
        }
    };
    builder.body(Full::new(body)).expect("valid response")
}

/// A Mountebank server for one test: the fake by default, a real one when configured.
pub struct TestServer {
    server: MountebankServer,
    fake: Option<FakeMountebank>,
}

impl TestServer {
    pub fn fake(&self) -> Option<&FakeMountebank> {
        self.fake.as_ref()
    }
}

impl Deref for TestServer {
    type Target = MountebankServer;

    fn deref(&self) -> &Self::Target {
        &self.server
    }
}

pub async fn mock_server() -> TestServer {
    let config = MbtestConfig::from_env().expect("valid MBTEST_* configuration");
    let real = config.executable.is_some() || std::env::var_os(mbtest::config::ENV_HOST).is_some();

    if real {
        let server = MountebankServer::from_config(&config)
            .await
            .expect("Mountebank server");
        return TestServer { server, fake: None };
    }

    let fake = FakeMountebank::start().await;
    let server = MountebankServer::existing("127.0.0.1", fake.port()).expect("admin client");
    TestServer {
        server,
        fake: Some(fake),
    }
}
