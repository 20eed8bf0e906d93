//! Data bridge — connects [`ScreenController`] watch channels to TUI actions.
//!
//! Runs as a background task: bootstraps the session (resuming a live
//! cookie, or signing in with configured credentials), then loops
//! forwarding every session, snapshot, and poll-error change as an
//! [`Action`] through the TUI's action channel.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use damwatch_core::{ScreenController, SessionState};

use crate::action::Action;

/// Spawn the data bridge connecting the controller's watch channels to the TUI.
pub async fn spawn_data_bridge(
    controller: ScreenController,
    action_tx: mpsc::UnboundedSender<Action>,
    cancel: CancellationToken,
) {
    let mut session = controller.subscribe_session();
    let mut snapshot = controller.subscribe_snapshot();
    let mut poll_error = controller.subscribe_error();

    // Probe for an existing session cookie; fall back to configured
    // credentials when there is none.
    match controller.bootstrap().await {
        Ok(true) => {}
        Ok(false) => {
            if let Some(creds) = controller.config().credentials.clone() {
                if let Err(e) = controller.login(&creds.username, &creds.password).await {
                    warn!(error = %e, "auto-login with configured credentials failed");
                    let _ = action_tx.send(Action::LoginFailed(e.to_string()));
                }
            }
        }
        Err(e) => {
            warn!(error = %e, "session bootstrap failed");
            let _ = action_tx.send(Action::SessionChanged(SessionState::SignedOut));
            let _ = action_tx.send(Action::PollError(Some(e.to_string())));
        }
    }

    // Push current state so screens render immediately.
    let _ = action_tx.send(Action::SessionChanged(session.borrow_and_update().clone()));
    if let Some(snap) = snapshot.borrow_and_update().clone() {
        let _ = action_tx.send(Action::SnapshotUpdated(snap));
    }

    // Forward every change until cancelled.
    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break,

            Ok(()) = session.changed() => {
                let state = session.borrow_and_update().clone();
                let _ = action_tx.send(Action::SessionChanged(state));
            }
            Ok(()) = snapshot.changed() => {
                if let Some(snap) = snapshot.borrow_and_update().clone() {
                    let _ = action_tx.send(Action::SnapshotUpdated(snap));
                }
            }
            Ok(()) = poll_error.changed() => {
                let msg = poll_error.borrow_and_update().clone();
                let _ = action_tx.send(Action::PollError(msg));
            }
        }
    }

    controller.shutdown().await;
    debug!("data bridge shut down");
}
