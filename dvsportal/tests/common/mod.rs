//! In-process mock of the DVSPortal API.
//!
//! Serves the portal endpoints on a random local port and records every
//! request so tests can inspect the payloads the client sent.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{Json, Router};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use dvsportal::portal::PortalConfig;
use serde_json::{Value, json};

pub const API_PREFIX: &str = "/DVSWebAPI/api";

/// A request as the mock received it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    /// Endpoint relative to the API prefix, e.g. `login/getbase`.
    pub endpoint: String,
    pub headers: HeaderMap,
    /// Decoded JSON body, `Value::Null` when empty.
    pub body: Value,
}

/// Mutable mock behaviour plus counters.
pub struct MockState {
    pub login_info: Mutex<Value>,
    pub login_response: Mutex<Value>,
    pub base_response: Mutex<Value>,
    pub login_delay: Mutex<Duration>,
    pub login_gets: AtomicUsize,
    pub login_posts: AtomicUsize,
    pub requests: Mutex<Vec<Recorded>>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            login_info: Mutex::new(json!({
                "PermitMediaTypes": [{"ID": 1, "Name": "Aanmeldcode kenteken"}],
                "LoginMethods": ["Pas"],
                "DefaultLoginMethod": 0
            })),
            login_response: Mutex::new(json!({"LoginStatus": 0, "Token": "test_token"})),
            base_response: Mutex::new(base_fixture()),
            login_delay: Mutex::new(Duration::ZERO),
            login_gets: AtomicUsize::new(0),
            login_posts: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl MockState {
    pub fn set_login_info(&self, value: Value) {
        *self.login_info.lock().unwrap() = value;
    }

    pub fn set_login_response(&self, value: Value) {
        *self.login_response.lock().unwrap() = value;
    }

    pub fn set_base_response(&self, value: Value) {
        *self.base_response.lock().unwrap() = value;
    }

    pub fn set_login_delay(&self, delay: Duration) {
        *self.login_delay.lock().unwrap() = delay;
    }

    pub fn login_posts(&self) -> usize {
        self.login_posts.load(Ordering::SeqCst)
    }

    pub fn login_gets(&self) -> usize {
        self.login_gets.load(Ordering::SeqCst)
    }

    /// The most recent request to `endpoint`.
    pub fn last(&self, endpoint: &str) -> Option<Recorded> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|r| r.endpoint == endpoint)
            .cloned()
    }

    pub fn count(&self, endpoint: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.endpoint == endpoint)
            .count()
    }
}

/// A running mock portal.
pub struct MockPortal {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
}

impl MockPortal {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new().fallback(handle).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}{API_PREFIX}", self.addr)
    }

    pub fn config(&self) -> PortalConfig {
        PortalConfig::new("portal.test", "test_user", "test_password")
            .with_base_url(self.base_url())
            .with_timeout(5)
    }
}

/// The `login/getbase` payload used across tests: one permit, one media,
/// one active reservation on ABC123 and one visible historic item on DEF456.
pub fn base_fixture() -> Value {
    json!({
        "Permits": [{
            "PermitMedias": [{
                "TypeID": 1,
                "Code": "ABC",
                "Balance": 100.0,
                "ActiveReservations": [{
                    "ReservationID": "res123",
                    "ValidFrom": "2025-01-01",
                    "ValidUntil": "2025-01-31",
                    "LicensePlate": {"Value": "ABC123"},
                    "Units": 1
                }],
                "LicensePlates": [{"Value": "ABC123", "Name": "Car"}],
                "History": {"Reservations": {"Items": [{
                    "LicensePlate": {"Value": "DEF456", "DisplayValue": "DEF456"},
                    "ReservationID": "res789",
                    "ValidFrom": "2024-01-01",
                    "ValidUntil": "2024-01-31",
                    "Units": 1
                }]}}
            }],
            "UnitPrice": 50.0
        }]
    })
}

async fn handle(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let endpoint = uri
        .path()
        .strip_prefix(API_PREFIX)
        .unwrap_or(uri.path())
        .trim_start_matches('/')
        .to_string();
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    state.requests.lock().unwrap().push(Recorded {
        method: method.clone(),
        endpoint: endpoint.clone(),
        headers: headers.clone(),
        body: body.clone(),
    });

    match (method.as_str(), endpoint.as_str()) {
        ("GET", "login") => {
            state.login_gets.fetch_add(1, Ordering::SeqCst);
            let info = state.login_info.lock().unwrap().clone();
            Json(info).into_response()
        }
        ("POST", "login") => {
            state.login_posts.fetch_add(1, Ordering::SeqCst);
            let delay = *state.login_delay.lock().unwrap();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let response = state.login_response.lock().unwrap().clone();
            Json(response).into_response()
        }
        ("POST", "login/getbase") => {
            let base = state.base_response.lock().unwrap().clone();
            Json(base).into_response()
        }
        (
            "POST",
            "reservation/create"
            | "reservation/end"
            | "permitmedialicenseplate/upsert"
            | "permitmedialicenseplate/remove",
        ) => Json(json!({"Success": true})).into_response(),
        (_, "echo") => {
            let user_agent = headers
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            Json(json!({
                "method": method.as_str(),
                "userAgent": user_agent,
                "body": body,
            }))
            .into_response()
        }
        (_, "maintenance") => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, "text/html")],
            "<html>maintenance</html>",
        )
            .into_response(),
        (_, "missing") => {
            (StatusCode::NOT_FOUND, Json(json!({"Message": "not found"}))).into_response()
        }
        (_, "embedded-error") => {
            Json(json!({"ErrorMessage": "Reservation overlaps"})).into_response()
        }
        (_, "slow") => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({})).into_response()
        }
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({"ErrorMessage": "unknown endpoint"})),
        )
            .into_response(),
    }
}
