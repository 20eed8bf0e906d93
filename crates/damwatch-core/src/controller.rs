// ── Controller abstraction ──
//
// Full lifecycle management for a screen-data backend connection.
// Handles session bootstrap/login/logout, the background snapshot poll,
// the two field editors, and the history operations, publishing state to
// consumers through watch channels.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use damwatch_api::transport::TransportConfig;
use damwatch_api::{
    HistoryDay, LiveSnapshot, ManualEntriesResult, ManualEntry, MissingHoursReport, ScreenClient,
    SessionUser,
};

use crate::config::ControllerConfig;
use crate::dosing::{self, DosingDraft};
use crate::error::CoreError;

/// The capability section gating dashboard edits.
pub const SCREEN_DATA_SECTION: &str = "screen-data";

// ── SessionState ─────────────────────────────────────────────────

/// Session state observable by consumers.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Bootstrap hasn't completed yet.
    Unknown,
    SignedOut,
    SignedIn(Arc<SessionUser>),
}

impl SessionState {
    pub fn user(&self) -> Option<&Arc<SessionUser>> {
        match self {
            Self::SignedIn(user) => Some(user),
            _ => None,
        }
    }
}

// ── Manual entry drafts ──────────────────────────────────────────

/// One row of the backfill form, still as typed by the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManualEntryDraft {
    pub slot_datetime: String,
    pub dam_level: String,
    pub turbidity: String,
}

/// Keep the drafts that carry at least one numeric value.
///
/// Blank and non-numeric fields are dropped per-field; a draft with
/// nothing numeric left is skipped entirely, mirroring what the backend
/// does server-side.
pub fn collect_valid_entries(drafts: &[ManualEntryDraft]) -> Vec<ManualEntry> {
    drafts
        .iter()
        .filter_map(|draft| {
            let dam_level = parse_field(&draft.dam_level);
            let turbidity = parse_field(&draft.turbidity);
            if dam_level.is_none() && turbidity.is_none() {
                return None;
            }
            Some(ManualEntry {
                slot_datetime: draft.slot_datetime.clone(),
                dam_level,
                turbidity,
            })
        })
        .collect()
}

fn parse_field(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse().ok()
}

// ── ScreenController ─────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Owns the session
/// lifecycle and the background snapshot poll; everything a screen
/// renders arrives through the watch channels.
#[derive(Clone)]
pub struct ScreenController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ControllerConfig,
    client: ScreenClient,
    session: watch::Sender<SessionState>,
    snapshot: watch::Sender<Option<Arc<LiveSnapshot>>>,
    last_error: watch::Sender<Option<String>>,
    cancel: CancellationToken,
    /// Child token for the current poll -- cancelled on sign-out,
    /// replaced on the next sign-in (avoids permanent cancellation).
    cancel_child: Mutex<CancellationToken>,
    poll_handle: Mutex<Option<JoinHandle<()>>>,
}

impl ScreenController {
    /// Create a controller from configuration. Does NOT touch the network --
    /// call [`bootstrap()`](Self::bootstrap) or [`login()`](Self::login).
    pub fn new(config: ControllerConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            timeout: config.timeout,
            cookie_jar: None,
        }
        .with_cookie_jar();
        let client = ScreenClient::new(config.url.clone(), &transport)?;
        Ok(Self::with_client(config, client))
    }

    /// Create a controller around a pre-built client (tests).
    pub fn with_client(config: ControllerConfig, client: ScreenClient) -> Self {
        let (session, _) = watch::channel(SessionState::Unknown);
        let (snapshot, _) = watch::channel(None);
        let (last_error, _) = watch::channel(None);
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();

        Self {
            inner: Arc::new(ControllerInner {
                config,
                client,
                session,
                snapshot,
                last_error,
                cancel,
                cancel_child: Mutex::new(cancel_child),
                poll_handle: Mutex::new(None),
            }),
        }
    }

    /// Access the controller configuration.
    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    // ── Watch subscriptions ──────────────────────────────────────

    pub fn subscribe_session(&self) -> watch::Receiver<SessionState> {
        self.inner.session.subscribe()
    }

    pub fn subscribe_snapshot(&self) -> watch::Receiver<Option<Arc<LiveSnapshot>>> {
        self.inner.snapshot.subscribe()
    }

    pub fn subscribe_error(&self) -> watch::Receiver<Option<String>> {
        self.inner.last_error.subscribe()
    }

    /// Current user, if signed in.
    pub fn current_user(&self) -> Option<Arc<SessionUser>> {
        self.inner.session.borrow().user().cloned()
    }

    /// Whether the signed-in user may use the dashboard editors.
    pub fn can_edit(&self) -> bool {
        self.current_user()
            .is_some_and(|user| user.can_edit(SCREEN_DATA_SECTION))
    }

    // ── Session lifecycle ────────────────────────────────────────

    /// Probe for an existing session cookie.
    ///
    /// Starts the poll when one is live. "No session" is a normal outcome
    /// (the login screen shows); only transport failures error.
    pub async fn bootstrap(&self) -> Result<bool, CoreError> {
        match self.inner.client.me().await? {
            Some(user) => {
                info!(username = %user.username, "existing session resumed");
                let _ = self.inner.session.send_replace(SessionState::SignedIn(Arc::new(user)));
                self.start_polling().await;
                Ok(true)
            }
            None => {
                debug!("no existing session");
                let _ = self.inner.session.send_replace(SessionState::SignedOut);
                Ok(false)
            }
        }
    }

    /// Sign in and start the snapshot poll.
    pub async fn login(
        &self,
        username: &str,
        password: &secrecy::SecretString,
    ) -> Result<Arc<SessionUser>, CoreError> {
        let user = match self.inner.client.login(username, password).await {
            Ok(user) => Arc::new(user),
            Err(e) => {
                let _ = self.inner.session.send_replace(SessionState::SignedOut);
                return Err(e.into());
            }
        };
        info!(username = %user.username, "signed in");
        let _ = self.inner.session.send_replace(SessionState::SignedIn(Arc::clone(&user)));
        self.start_polling().await;
        Ok(user)
    }

    /// Sign out.
    ///
    /// Stops the poll, posts the logout best-effort, and clears local
    /// state regardless of whether the backend was reachable.
    pub async fn logout(&self) {
        self.stop_polling().await;

        if let Err(e) = self.inner.client.logout().await {
            warn!(error = %e, "logout request failed (non-fatal)");
        }

        let _ = self.inner.session.send_replace(SessionState::SignedOut);
        let _ = self.inner.snapshot.send_replace(None);
        let _ = self.inner.last_error.send_replace(None);
        debug!("signed out");
    }

    /// Cancel all background work. The session cookie (if any) survives
    /// for the next run, like a closed browser tab.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        if let Some(handle) = self.inner.poll_handle.lock().await.take() {
            let _ = handle.await;
        }
    }

    // ── Live snapshot ────────────────────────────────────────────

    /// Fetch the snapshot once, outside the poll cadence (user retry,
    /// kiosk reload).
    pub async fn refresh_now(&self) {
        self.fetch_and_publish().await;
    }

    /// Fetch and publish one snapshot. Returns `false` when the session
    /// is gone and polling should stop.
    async fn fetch_and_publish(&self) -> bool {
        match self.inner.client.live().await {
            Ok(snap) => {
                let _ = self.inner.snapshot.send_replace(Some(Arc::new(snap)));
                let _ = self.inner.last_error.send_replace(None);
                true
            }
            Err(e) if e.is_auth_expired() => {
                warn!("session lost during poll");
                let _ = self.inner.last_error.send_replace(Some(CoreError::from(e).to_string()));
                let _ = self.inner.session.send_replace(SessionState::SignedOut);
                false
            }
            Err(e) => {
                // Stale data stays on screen; the banner carries the reason.
                let msg = CoreError::from(e).to_string();
                warn!(error = %msg, "snapshot fetch failed");
                let _ = self.inner.last_error.send_replace(Some(msg));
                true
            }
        }
    }

    async fn start_polling(&self) {
        self.stop_polling().await;

        let child = self.inner.cancel.child_token();
        *self.inner.cancel_child.lock().await = child.clone();

        let ctrl = self.clone();
        let period = self.inner.config.poll_interval;
        *self.inner.poll_handle.lock().await = Some(tokio::spawn(poll_task(ctrl, period, child)));
    }

    async fn stop_polling(&self) {
        self.inner.cancel_child.lock().await.cancel();
        if let Some(handle) = self.inner.poll_handle.lock().await.take() {
            let _ = handle.await;
        }
    }

    // ── Field editors ────────────────────────────────────────────

    /// Save the last chlorine tank change date. `None` clears it.
    ///
    /// The backend's echoed canonical date is merged into the published
    /// snapshot so the card updates without waiting for the next poll.
    pub async fn save_chlorine_date(&self, date: Option<&str>) -> Result<(), CoreError> {
        let echoed = self.inner.client.put_chlorine_date(date).await?;
        self.inner.snapshot.send_modify(|current| {
            if let Some(snap) = current {
                let mut updated = (**snap).clone();
                updated.reserved_metric = echoed;
                *snap = Arc::new(updated);
            }
        });
        Ok(())
    }

    /// Save the last active dosing draft, returning the canonical value.
    pub async fn save_last_active_dosing(
        &self,
        draft: &DosingDraft,
    ) -> Result<String, CoreError> {
        let value = dosing::build_value(draft);
        let echoed = self.inner.client.put_last_active_dosing(&value).await?;
        let merged = echoed.clone();
        self.inner.snapshot.send_modify(|current| {
            if let Some(snap) = current {
                let mut updated = (**snap).clone();
                updated.last_active_dosing = Some(merged);
                *snap = Arc::new(updated);
            }
        });
        Ok(echoed)
    }

    // ── History operations ───────────────────────────────────────

    /// Fetch history rows; `day` narrows to a single (inclusive) date.
    pub async fn history(&self, day: Option<&str>) -> Result<Vec<HistoryDay>, CoreError> {
        Ok(self.inner.client.history(day, day).await?)
    }

    /// Scan for hourly slots missing both readings.
    pub async fn missing_hours(&self) -> Result<MissingHoursReport, CoreError> {
        Ok(self.inner.client.missing_hours(None, None).await?)
    }

    /// Validate and upload backfill drafts.
    ///
    /// Rejects locally (no network call) when nothing numeric was entered.
    pub async fn submit_manual_entries(
        &self,
        drafts: &[ManualEntryDraft],
    ) -> Result<ManualEntriesResult, CoreError> {
        let entries = collect_valid_entries(drafts);
        if entries.is_empty() {
            return Err(CoreError::ValidationFailed {
                message: "Enter at least one numeric value before saving".into(),
            });
        }
        Ok(self.inner.client.post_manual_entries(&entries).await?)
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Snapshot poll: immediate fetch on session acquisition, then a fixed
/// cadence until cancelled or the session drops.
async fn poll_task(controller: ScreenController, period: Duration, cancel: CancellationToken) {
    if !controller.fetch_and_publish().await {
        return;
    }

    let mut interval = tokio::time::interval(period);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                debug!("snapshot poll tick");
                if !controller.fetch_and_publish().await {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn draft(slot: &str, dam: &str, turb: &str) -> ManualEntryDraft {
        ManualEntryDraft {
            slot_datetime: slot.into(),
            dam_level: dam.into(),
            turbidity: turb.into(),
        }
    }

    #[test]
    fn drafts_with_no_numeric_value_are_skipped() {
        let drafts = vec![
            draft("2024-03-06 03:00", "", ""),
            draft("2024-03-06 04:00", "12.1", ""),
            draft("2024-03-06 05:00", "not a number", "  "),
            draft("2024-03-06 06:00", "", "0.6"),
        ];

        let entries = collect_valid_entries(&drafts);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].slot_datetime, "2024-03-06 04:00");
        assert_eq!(entries[0].dam_level, Some(12.1));
        assert_eq!(entries[0].turbidity, None);
        assert_eq!(entries[1].slot_datetime, "2024-03-06 06:00");
        assert_eq!(entries[1].turbidity, Some(0.6));
    }

    #[test]
    fn non_numeric_field_dropped_but_entry_kept() {
        let drafts = vec![draft("2024-03-06 03:00", "abc", "0.5")];
        let entries = collect_valid_entries(&drafts);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].dam_level, None);
        assert_eq!(entries[0].turbidity, Some(0.5));
    }

    #[test]
    fn whitespace_tolerated() {
        let drafts = vec![draft("2024-03-06 03:00", " 12.5 ", "")];
        let entries = collect_valid_entries(&drafts);
        assert_eq!(entries[0].dam_level, Some(12.5));
    }

    #[test]
    fn empty_input_yields_no_entries() {
        assert!(collect_valid_entries(&[]).is_empty());
    }

    async fn mock_backend() -> wiremock::MockServer {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "user": {"username": "operator"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/screen-data/live"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "turbidity": 0.5
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/auth/logout"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": "Logged out"
            })))
            .mount(&server)
            .await;
        server
    }

    async fn live_fetches(server: &wiremock::MockServer) -> usize {
        server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == "/api/screen-data/live")
            .count()
    }

    #[tokio::test]
    async fn login_fetches_immediately_and_logout_stops_the_poll() {
        let server = mock_backend().await;
        let config = ControllerConfig {
            url: server.uri().parse().expect("mock server url"),
            poll_interval: Duration::from_millis(50),
            ..ControllerConfig::default()
        };
        let controller = ScreenController::new(config).expect("controller");
        let mut snapshots = controller.subscribe_snapshot();

        let secret: secrecy::SecretString = "hunter2".to_string().into();
        controller.login("operator", &secret).await.expect("login");

        // The first snapshot arrives on sign-in, before any poll tick.
        tokio::time::timeout(Duration::from_secs(2), async {
            while snapshots.borrow_and_update().is_none() {
                snapshots.changed().await.expect("snapshot channel open");
            }
        })
        .await
        .expect("snapshot published right after login");

        controller.logout().await;
        assert_eq!(
            *controller.subscribe_session().borrow(),
            SessionState::SignedOut
        );

        // logout() awaits the poll task, so the count below is settled.
        let settled = live_fetches(&server).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(live_fetches(&server).await, settled);
    }
}
