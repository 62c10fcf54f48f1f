//! DVSPortal HTTP client.
//!
//! Every call goes through [`PortalClient::request`], which owns URL
//! construction, headers, the timeout and response classification.
//! Authentication is lazy and happens at most once per client.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Local;
use futures::future::BoxFuture;
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info, warn};

use crate::domain::{
    AccountSnapshot, HistoricReservation, NewReservation, PermitContext, PermitDefaults,
    PermitSelector, Reservation, format_portal_timestamp,
};

use super::config::PortalConfig;
use super::convert::{ConvertedAccount, convert_account};
use super::error::PortalError;
use super::types::{
    BaseResponse, CreateReservationRequest, EndReservationRequest, LOGIN_METHOD,
    LicensePlatePayload, LoginInfo, LoginRequest, LoginResponse, RemoveLicensePlateRequest,
    UpsertLicensePlateRequest,
};

const LOGIN: &str = "login";
const GET_BASE: &str = "login/getbase";
const RESERVATION_CREATE: &str = "reservation/create";
const RESERVATION_END: &str = "reservation/end";
const LICENSE_PLATE_UPSERT: &str = "permitmedialicenseplate/upsert";
const LICENSE_PLATE_REMOVE: &str = "permitmedialicenseplate/remove";

/// Scheme label in the `Authorization` header.
const AUTH_SCHEME: &str = "Token";

/// Async DVSPortal API client.
///
/// Holds the HTTP session, the login token and the account snapshot from
/// the last [`update`](Self::update). All operations take `&self`; login is
/// serialized so concurrent first calls share one login exchange.
///
/// A client that built its own session must be [`close`](Self::close)d, or
/// used through [`scoped`](Self::scoped).
pub struct PortalClient {
    http: Option<reqwest::Client>,
    owns_session: bool,
    host: String,
    base_url: String,
    identifier: String,
    password: String,
    timeout: Duration,
    user_agent: HeaderValue,
    token: OnceCell<String>,
    defaults: RwLock<PermitDefaults>,
    snapshot: RwLock<AccountSnapshot>,
}

impl PortalClient {
    /// Create a new client with the given configuration.
    ///
    /// If the config carries an HTTP client it is shared, not owned.
    pub fn new(config: PortalConfig) -> Result<Self, PortalError> {
        let user_agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|_| PortalError::InvalidHeader(config.user_agent.clone()))?;

        let (http, owns_session) = match config.http_client {
            Some(http) => (http, false),
            None => {
                let http = reqwest::Client::builder()
                    .build()
                    .map_err(|source| PortalError::Connection {
                        message: "failed to build HTTP client",
                        source,
                    })?;
                (http, true)
            }
        };

        Ok(Self {
            http: Some(http),
            owns_session,
            host: config.host,
            base_url: config.base_url,
            identifier: config.identifier,
            password: config.password,
            timeout: Duration::from_secs(config.timeout_secs),
            user_agent,
            token: OnceCell::new(),
            defaults: RwLock::new(PermitDefaults::default()),
            snapshot: RwLock::new(AccountSnapshot::default()),
        })
    }

    /// Build a client, run `f` against it, and close it whatever `f` returns.
    ///
    /// `f` gets the client mutably, so it may close it early; the final
    /// close is then a no-op.
    ///
    /// ```no_run
    /// # async fn demo() -> Result<(), dvsportal::portal::PortalError> {
    /// use dvsportal::portal::{PortalClient, PortalConfig};
    ///
    /// let config = PortalConfig::new("parkeren.example.nl", "user", "secret");
    /// let balance = PortalClient::scoped(config, |client| {
    ///     Box::pin(async move {
    ///         client.update().await?;
    ///         Ok(client.balance().await)
    ///     })
    /// })
    /// .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn scoped<T, F>(config: PortalConfig, f: F) -> Result<T, PortalError>
    where
        F: for<'c> FnOnce(&'c mut PortalClient) -> BoxFuture<'c, Result<T, PortalError>>,
    {
        let mut client = Self::new(config)?;
        let result = f(&mut client).await;
        client.close();
        result
    }

    /// Release the HTTP session. Idempotent.
    ///
    /// A shared session is only detached; its owner keeps using it.
    pub fn close(&mut self) {
        if self.http.take().is_some() {
            debug!(owned = self.owns_session, "closed portal session");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.http.is_none()
    }

    pub fn api_host(&self) -> &str {
        &self.host
    }

    /// Issue a request against the portal API and return the decoded body.
    ///
    /// Non-GET requests always carry a JSON body (`{}` when `body` is
    /// `None`). Caller headers override the defaults.
    pub async fn request(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<Value>,
        headers: HeaderMap,
    ) -> Result<Value, PortalError> {
        let http = self.http.as_ref().ok_or(PortalError::SessionClosed)?;
        let url = self.endpoint_url(endpoint);

        let mut merged = HeaderMap::new();
        merged.insert(USER_AGENT, self.user_agent.clone());
        merged.extend(headers);

        debug!(%method, %url, "portal request");

        let mut builder = http
            .request(method.clone(), &url)
            .headers(merged)
            .timeout(self.timeout);
        if method != Method::GET {
            builder = builder.json(&body.unwrap_or_else(|| json!({})));
        }

        let response = builder.send().await.map_err(connection_error)?;
        let status = response.status().as_u16();

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        if !is_json {
            let text = response.text().await.map_err(connection_error)?;
            return Err(PortalError::Api {
                status: Some(status),
                body: json!({ "message": text }),
            });
        }

        let bytes = response.bytes().await.map_err(connection_error)?;
        let body: Value = serde_json::from_slice(&bytes).map_err(|e| PortalError::Decode {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })?;

        classify_response(status, body)
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    async fn post<T: Serialize>(
        &self,
        endpoint: &str,
        payload: &T,
        headers: HeaderMap,
    ) -> Result<Value, PortalError> {
        let body = serde_json::to_value(payload).map_err(|e| PortalError::Encode {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })?;
        self.request(endpoint, Method::POST, Some(body), headers)
            .await
    }

    /// Look up the default permit-media type from the login metadata.
    pub async fn fetch_default_type_id(&self) -> Result<i64, PortalError> {
        let missing =
            || PortalError::api_message("Failed to fetch default type ID: missing key in response");

        let response = self
            .request(LOGIN, Method::GET, None, HeaderMap::new())
            .await?;
        let info: LoginInfo = serde_json::from_value(response).map_err(|_| missing())?;
        let type_id = info.permit_media_types.first().ok_or_else(missing)?.id;

        self.defaults.write().await.type_id = Some(type_id);
        debug!(type_id, "discovered default permit media type");
        Ok(type_id)
    }

    /// Return the session token, logging in on first use.
    pub async fn token(&self) -> Result<String, PortalError> {
        self.token.get_or_try_init(|| self.login()).await.cloned()
    }

    async fn login(&self) -> Result<String, PortalError> {
        let cached_type_id = self.defaults.read().await.type_id;
        let type_id = match cached_type_id {
            Some(type_id) => type_id,
            None => self.fetch_default_type_id().await?,
        };

        let payload = LoginRequest {
            identifier: &self.identifier,
            login_method: LOGIN_METHOD,
            password: &self.password,
            permit_media_type_id: type_id,
        };

        let response = match self.post(LOGIN, &payload, HeaderMap::new()).await {
            Ok(response) => response,
            // A rejected login also carries `ErrorMessage`, which the
            // request primitive reports as a plain API error.
            Err(PortalError::Api { status, body }) => {
                return Err(login_rejection(&body).unwrap_or(PortalError::Api { status, body }));
            }
            Err(e) => return Err(e),
        };

        if let Some(err) = login_rejection(&response) {
            return Err(err);
        }

        let login: LoginResponse = decode(LOGIN, response)?;
        let token = login.token_string().ok_or_else(|| PortalError::Decode {
            endpoint: LOGIN.to_string(),
            message: "missing field `Token`".to_string(),
        })?;

        info!(host = %self.host, identifier = %self.identifier, "logged in to portal");
        Ok(token)
    }

    /// Build the `Authorization` header from the (cached) token.
    pub async fn authorization_header(&self) -> Result<HeaderMap, PortalError> {
        let token = self.token().await?;
        let value = format!("{AUTH_SCHEME} {}", STANDARD.encode(token.as_bytes()));
        let value = HeaderValue::from_str(&value).map_err(|_| PortalError::InvalidHeader(value))?;

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }

    /// Fetch the account and replace the cached snapshot.
    ///
    /// On failure the previous snapshot and defaults are left as they were.
    pub async fn update(&self) -> Result<(), PortalError> {
        let headers = self.authorization_header().await?;
        let response = self.request(GET_BASE, Method::POST, None, headers).await?;
        let base: BaseResponse = decode(GET_BASE, response)?;

        let ConvertedAccount { defaults, snapshot } = convert_account(&base)?;

        info!(
            code = defaults.code.as_deref().unwrap_or_default(),
            balance = ?snapshot.balance,
            active = snapshot.active_reservations.len(),
            "updated portal account"
        );

        *self.defaults.write().await = defaults;
        *self.snapshot.write().await = snapshot;
        Ok(())
    }

    /// Ensure we are logged in, then resolve the target permit-media.
    async fn command_context(
        &self,
        permit: &PermitSelector,
    ) -> Result<(PermitContext, HeaderMap), PortalError> {
        let headers = self.authorization_header().await?;
        let defaults = self.defaults.read().await.clone();
        let context = PermitContext::resolve(permit, &defaults)?;
        Ok((context, headers))
    }

    /// End a running reservation.
    pub async fn end_reservation(
        &self,
        reservation_id: &str,
        permit: &PermitSelector,
    ) -> Result<Value, PortalError> {
        let (context, headers) = self.command_context(permit).await?;
        let payload = EndReservationRequest {
            reservation_id,
            permit_media_type_id: context.type_id,
            permit_media_code: &context.code,
        };
        self.post(RESERVATION_END, &payload, headers).await
    }

    /// Create a reservation. The start defaults to now (local time).
    pub async fn create_reservation(
        &self,
        reservation: &NewReservation,
        permit: &PermitSelector,
    ) -> Result<Value, PortalError> {
        let (context, headers) = self.command_context(permit).await?;
        let date_from = reservation
            .date_from
            .unwrap_or_else(|| Local::now().naive_local());

        let payload = CreateReservationRequest {
            date_from: format_portal_timestamp(&date_from),
            date_until: reservation.date_until.as_ref().map(format_portal_timestamp),
            license_plate: LicensePlatePayload {
                value: &reservation.license_plate_value,
                name: reservation.license_plate_name.as_deref(),
            },
            permit_media_type_id: context.type_id,
            permit_media_code: &context.code,
        };
        self.post(RESERVATION_CREATE, &payload, headers).await
    }

    /// Store (or rename) a license plate on the permit-media.
    pub async fn store_license_plate(
        &self,
        license_plate: &str,
        name: &str,
        permit: &PermitSelector,
    ) -> Result<Value, PortalError> {
        let (context, headers) = self.command_context(permit).await?;
        let payload = UpsertLicensePlateRequest {
            permit_media_type_id: context.type_id,
            permit_media_code: &context.code,
            license_plate: LicensePlatePayload {
                value: license_plate,
                name: Some(name),
            },
            update_license_plate: None,
        };
        self.post(LICENSE_PLATE_UPSERT, &payload, headers).await
    }

    pub async fn remove_license_plate(
        &self,
        license_plate: &str,
        name: &str,
        permit: &PermitSelector,
    ) -> Result<Value, PortalError> {
        let (context, headers) = self.command_context(permit).await?;
        let payload = RemoveLicensePlateRequest {
            permit_media_type_id: context.type_id,
            permit_media_code: &context.code,
            license_plate,
            name,
        };
        self.post(LICENSE_PLATE_REMOVE, &payload, headers).await
    }

    pub async fn snapshot(&self) -> AccountSnapshot {
        self.snapshot.read().await.clone()
    }

    pub async fn balance(&self) -> Option<f64> {
        self.snapshot.read().await.balance
    }

    pub async fn unit_price(&self) -> Option<f64> {
        self.snapshot.read().await.unit_price
    }

    pub async fn active_reservations(&self) -> HashMap<String, Reservation> {
        self.snapshot.read().await.active_reservations.clone()
    }

    pub async fn historic_reservations(&self) -> HashMap<String, HistoricReservation> {
        self.snapshot.read().await.historic_reservations.clone()
    }

    pub async fn known_license_plates(&self) -> HashMap<String, String> {
        self.snapshot.read().await.known_license_plates.clone()
    }

    pub async fn default_type_id(&self) -> Option<i64> {
        self.defaults.read().await.type_id
    }

    pub async fn default_code(&self) -> Option<String> {
        self.defaults.read().await.code.clone()
    }
}

impl Drop for PortalClient {
    fn drop(&mut self) {
        if self.owns_session && self.http.is_some() {
            warn!(
                host = %self.host,
                "PortalClient dropped without close(); call close() or use PortalClient::scoped"
            );
        }
    }
}

impl fmt::Debug for PortalClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortalClient")
            .field("host", &self.host)
            .field("base_url", &self.base_url)
            .field("identifier", &self.identifier)
            .field("timeout", &self.timeout)
            .field("owns_session", &self.owns_session)
            .field("closed", &self.is_closed())
            .field("authenticated", &self.token.initialized())
            .finish_non_exhaustive()
    }
}

/// Classify a decoded JSON response.
///
/// 4xx/5xx statuses and bodies carrying `ErrorMessage` are API errors, even
/// with a 2xx status. Everything else passes through unchanged.
pub fn classify_response(status: u16, body: Value) -> Result<Value, PortalError> {
    let error_status = matches!(status / 100, 4 | 5);
    if error_status || body.get("ErrorMessage").is_some() {
        return Err(PortalError::Api {
            status: Some(status),
            body,
        });
    }
    Ok(body)
}

fn connection_error(source: reqwest::Error) -> PortalError {
    let message = if source.is_timeout() {
        "timeout occurred while connecting to the portal API"
    } else {
        "error occurred while communicating with the portal"
    };
    PortalError::Connection { message, source }
}

/// Turn a login body with the rejection sentinel into an auth error.
fn login_rejection(body: &Value) -> Option<PortalError> {
    let login: LoginResponse = serde_json::from_value(body.clone()).ok()?;
    login.is_rejected().then(|| {
        PortalError::Auth(
            login
                .error_message
                .unwrap_or_else(|| "Unknown authentication error".to_string()),
        )
    })
}

fn decode<T: DeserializeOwned>(endpoint: &str, value: Value) -> Result<T, PortalError> {
    serde_json::from_value(value).map_err(|e| PortalError::Decode {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> PortalClient {
        PortalClient::new(PortalConfig::new("portal.test", "user", "pw").with_base_url(base_url))
            .unwrap()
    }

    #[test]
    fn endpoint_url_joins_cleanly() {
        let mut c = client("https://portal.test/DVSWebAPI/api/");
        assert_eq!(
            c.endpoint_url("login"),
            "https://portal.test/DVSWebAPI/api/login"
        );
        assert_eq!(
            c.endpoint_url("/login/getbase"),
            "https://portal.test/DVSWebAPI/api/login/getbase"
        );
        c.close();
    }

    #[test]
    fn classify_passes_clean_bodies() {
        let body = json!({"Success": true});
        assert_eq!(classify_response(200, body.clone()).unwrap(), body);
    }

    #[test]
    fn classify_error_message_with_ok_status() {
        let body = json!({"ErrorMessage": "Reservation overlaps"});
        let err = classify_response(200, body.clone()).unwrap_err();
        match err {
            PortalError::Api { status, body: got } => {
                assert_eq!(status, Some(200));
                assert_eq!(got, body);
            }
            other => panic!("expected API error, got {other:?}"),
        }
    }

    #[test]
    fn login_rejection_uses_fallback_message() {
        let err = login_rejection(&json!({"LoginStatus": 2})).unwrap();
        assert_eq!(
            err.to_string(),
            "authentication failed: Unknown authentication error"
        );
        assert!(login_rejection(&json!({"LoginStatus": 1, "Token": "t"})).is_none());
        assert!(login_rejection(&json!(["not", "an", "object"])).is_none());
    }

    #[test]
    fn close_is_idempotent() {
        let mut c = client("http://127.0.0.1:9");
        assert!(!c.is_closed());
        c.close();
        c.close();
        assert!(c.is_closed());
    }

    #[tokio::test]
    async fn request_after_close_fails() {
        let mut c = client("http://127.0.0.1:9");
        c.close();
        let err = c
            .request("login", Method::GET, None, HeaderMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::SessionClosed));
    }

    #[test]
    fn invalid_user_agent_rejected() {
        let config = PortalConfig::new("h", "u", "p").with_user_agent("bad\nagent");
        let err = PortalClient::new(config).unwrap_err();
        assert!(matches!(err, PortalError::InvalidHeader(_)));
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Run `f` under a subscriber that records warnings, and return them.
    fn warnings_during(f: impl FnOnce()) -> String {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = logs.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn dropping_unclosed_owned_client_warns() {
        let logs = warnings_during(|| drop(client("http://127.0.0.1:9")));
        assert!(logs.contains("WARN"), "got {logs:?}");
        assert!(logs.contains("dropped without close"), "got {logs:?}");
        assert!(logs.contains("portal.test"), "got {logs:?}");
    }

    #[test]
    fn dropping_closed_client_is_silent() {
        let logs = warnings_during(|| {
            let mut c = client("http://127.0.0.1:9");
            c.close();
            drop(c);
        });
        assert!(logs.is_empty(), "got {logs:?}");
    }

    #[test]
    fn dropping_shared_session_client_is_silent() {
        let logs = warnings_during(|| {
            let config = PortalConfig::new("portal.test", "user", "pw")
                .with_http_client(reqwest::Client::new());
            drop(PortalClient::new(config).unwrap());
        });
        assert!(logs.is_empty(), "got {logs:?}");
    }
}
