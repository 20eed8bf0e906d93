// Session authentication
//
// Cookie-based login/logout plus the session probe. The login endpoint sets
// a session cookie in the client's jar; subsequent requests use that cookie
// automatically.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::client::ScreenClient;
use crate::error::Error;
use crate::models::SessionUser;

/// Both `/api/auth/me` and login wrap the user as `{"user": {...}}`.
#[derive(Deserialize)]
struct UserEnvelope {
    user: SessionUser,
}

impl ScreenClient {
    /// Probe the current session.
    ///
    /// Returns `Ok(Some(user))` when a session cookie is live, `Ok(None)`
    /// on any non-2xx status. "No session" is an expected state on startup,
    /// never an error.
    pub async fn me(&self) -> Result<Option<SessionUser>, Error> {
        let url = self.api_url("auth/me")?;
        debug!("GET {}", url);

        let resp = self.http().get(url).send().await.map_err(Error::Transport)?;
        if !resp.status().is_success() {
            return Ok(None);
        }

        let envelope: UserEnvelope = Self::parse_response(resp).await?;
        Ok(Some(envelope.user))
    }

    /// Authenticate with username/password.
    ///
    /// On success the session cookie is stored in the client's cookie jar
    /// and the authenticated user is returned. Failure surfaces the
    /// backend's `error` message when it sends one.
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<SessionUser, Error> {
        let url = self.api_url("auth/login")?;
        debug!("logging in at {}", url);

        let body = json!({
            "username": username,
            "password": password.expose_secret(),
        });

        let resp = self
            .http()
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            #[derive(Deserialize)]
            struct ErrorBody {
                error: Option<String>,
            }
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| format!("login failed (HTTP {status})"));
            return Err(Error::Authentication { message });
        }

        let envelope: UserEnvelope = Self::parse_response(resp).await?;
        debug!("login successful for {}", envelope.user.username);
        Ok(envelope.user)
    }

    /// End the current session.
    ///
    /// The server reply is irrelevant: the caller clears local session
    /// state whether or not this call reaches the backend.
    pub async fn logout(&self) -> Result<(), Error> {
        let url = self.api_url("auth/logout")?;
        debug!("logging out at {}", url);

        let _resp = self
            .http()
            .post(url)
            .send()
            .await
            .map_err(Error::Transport)?;

        debug!("logout complete");
        Ok(())
    }
}
