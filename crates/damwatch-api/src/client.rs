// Screen-data HTTP client
//
// Wraps `reqwest::Client` with backend-specific URL construction and error
// body parsing. Endpoint modules (auth, screen_data) are implemented as
// inherent methods in separate files to keep this module focused on
// transport mechanics.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// The backend reports failures as `{"error": "..."}` with a non-2xx status.
#[derive(serde::Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
}

/// Raw HTTP client for the screen-data backend.
///
/// Session auth is cookie-based: `login` stores a session cookie in the
/// shared jar and every subsequent request carries it automatically.
pub struct ScreenClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ScreenClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// If the config doesn't already include a cookie jar, one is created
    /// automatically (session auth requires cookies). The `base_url` should
    /// be the backend root, e.g. `http://treatment-plant:5100`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let config = if transport.cookie_jar.is_some() {
            transport.clone()
        } else {
            transport.clone().with_cookie_jar()
        };
        let http = config.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    ///
    /// Use this in tests or when a session cookie already lives in the
    /// client's jar.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The underlying HTTP client (for auth flows that need direct access).
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// The backend base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build a full URL for an API path: `{base}/api/{path}`.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/api/{path}")).map_err(Error::InvalidUrl)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and decode the JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);
        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;
        Self::parse_response(resp).await
    }

    /// Send a POST request with a JSON body and decode the JSON reply.
    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        debug!("POST {}", url);
        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;
        Self::parse_response(resp).await
    }

    /// Send a PUT request with a JSON body and decode the JSON reply.
    pub(crate) async fn put<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        debug!("PUT {}", url);
        let resp = self
            .http
            .put(url)
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;
        Self::parse_response(resp).await
    }

    /// Decode a response, mapping failures to `Error`.
    ///
    /// 401 means the session cookie is gone or stale. Other non-2xx
    /// statuses carry an `{"error": "..."}` body which is surfaced verbatim
    /// when present.
    pub(crate) async fn parse_response<T: DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::SessionExpired);
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| format!("HTTP {status}"));
            return Err(Error::Api {
                message,
                status: status.as_u16(),
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;
        serde_json::from_str(&body).map_err(|e| {
            let preview = &body[..body.len().min(200)];
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })
    }
}
