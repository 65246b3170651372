// tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use http::header::AUTHORIZATION;
use http::{Request, Response, StatusCode};
use tokio::sync::Notify;

use crate::cache::token::Token;
use crate::config::provider::ProviderConfig;
use crate::error::Error;
use crate::sources::FetchToken;
use crate::transport::executor::{HttpExecutor, TransportError};

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

/// Port on localhost with nothing listening.
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

pub fn provider_config(base_uri: &str) -> ProviderConfig {
    ProviderConfig {
        base_uri: base_uri.to_owned(),
        audience: "a".into(),
        client_id: "c".into(),
        client_secret: "s".into(),
    }
}

pub fn get(uri: &str) -> Request<Bytes> {
    Request::builder().uri(uri).body(Bytes::new()).unwrap()
}

pub fn status(code: u16) -> Result<Response<Bytes>, TransportError> {
    let mut response = Response::new(Bytes::from_static(b"downstream"));
    *response.status_mut() = StatusCode::from_u16(code).unwrap();
    Ok(response)
}

pub fn body_json(response: &Response<Bytes>) -> serde_json::Value {
    serde_json::from_slice(response.body()).unwrap()
}

/// Executor answering from a script; 200 once the script runs out.
#[derive(Default)]
pub struct ScriptedExecutor {
    script: Mutex<VecDeque<Result<Response<Bytes>, TransportError>>>,
    authorizations: Mutex<Vec<String>>,
    disposed: AtomicUsize,
}

impl ScriptedExecutor {
    pub fn new(script: Vec<Result<Response<Bytes>, TransportError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        }
    }

    /// `Authorization` header of every dispatched request, in order.
    pub fn authorizations(&self) -> Vec<String> {
        self.authorizations.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.authorizations.lock().unwrap().len()
    }

    pub fn disposed(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl HttpExecutor for ScriptedExecutor {
    async fn execute(&self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError> {
        let authorization = request
            .headers()
            .get(AUTHORIZATION)
            .map(|v| v.to_str().unwrap().to_owned())
            .unwrap_or_default();
        self.authorizations.lock().unwrap().push(authorization);

        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| status(200))
    }

    fn dispose(&self, response: Response<Bytes>) {
        self.disposed.fetch_add(1, Ordering::SeqCst);
        drop(response);
    }
}

/// Executor rejecting one token with 401, each rejection arriving `stagger`
/// later than the previous one; any other token gets 200.
pub struct StaleTokenExecutor {
    rejected: &'static str,
    stagger: Duration,
    rejections: AtomicUsize,
}

impl StaleTokenExecutor {
    pub fn new(rejected: &'static str, stagger: Duration) -> Self {
        Self {
            rejected,
            stagger,
            rejections: AtomicUsize::new(0),
        }
    }
}

impl HttpExecutor for StaleTokenExecutor {
    async fn execute(&self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError> {
        let stale = request
            .headers()
            .get(AUTHORIZATION)
            .is_some_and(|v| v.as_bytes() == self.rejected.as_bytes());
        if !stale {
            return status(200);
        }
        let n = self.rejections.fetch_add(1, Ordering::SeqCst) as u32;
        tokio::time::sleep(self.stagger * (n + 1)).await;
        status(401)
    }
}

/// Token source handing out `T1`, `T2`, ... and counting fetches.
///
/// Scripted failures replace the token of the fetch they are keyed on; a
/// gate, when set, holds every fetch until released.
#[derive(Default)]
pub struct CountingSource {
    calls: Arc<AtomicUsize>,
    failures: Mutex<HashMap<usize, Error>>,
    delay: Duration,
    gate: Option<Arc<Notify>>,
}

impl CountingSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// First fetches fail with `errors`, in order.
    pub fn failing_with(self, errors: Vec<Error>) -> Self {
        errors
            .into_iter()
            .enumerate()
            .fold(self, |source, (i, err)| source.failing_on(i + 1, err))
    }

    /// Fetch number `call` (1-based) fails with `err`.
    pub fn failing_on(self, call: usize, err: Error) -> Self {
        self.failures.lock().unwrap().insert(call, err);
        self
    }

    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl FetchToken for CountingSource {
    async fn fetch(&self) -> Result<Token, Error> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let failure = self.failures.lock().unwrap().remove(&n);
        match failure {
            Some(err) => Err(err),
            None => Ok(Token::new(format!("T{n}")).unwrap()),
        }
    }
}

/// Poll until `counter` reaches `expected`.
pub async fn wait_for_calls(counter: &AtomicUsize, expected: usize) {
    for _ in 0..200 {
        if counter.load(Ordering::SeqCst) >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("counter never reached {expected}");
}
