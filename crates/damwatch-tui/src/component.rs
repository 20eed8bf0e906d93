//! Component trait — the building block for every screen.

use color_eyre::eyre::Result;
use crossterm::event::KeyEvent;
use ratatui::{Frame, layout::Rect};
use tokio::sync::mpsc::UnboundedSender;

use crate::action::Action;

/// Every screen implements Component.
///
/// Lifecycle: `init` → (`handle_key_event` | `update` | `render`)*
pub trait Component: Send {
    /// Called once when the component is mounted.
    /// Receives the action sender for dispatching actions to the app loop.
    fn init(&mut self, _action_tx: UnboundedSender<Action>) -> Result<()> {
        Ok(())
    }

    /// Handle a keyboard event. Return an Action to dispatch, or None.
    fn handle_key_event(&mut self, _key: KeyEvent) -> Result<Option<Action>> {
        Ok(None)
    }

    /// Process a dispatched action. May return a follow-up action.
    fn update(&mut self, _action: &Action) -> Result<Option<Action>> {
        Ok(None)
    }

    /// Render into the provided frame area.
    fn render(&self, frame: &mut Frame, area: Rect);

    /// Whether this screen wants ALL key input right now (an open form or
    /// text field). Global keybindings are bypassed while true, except
    /// Ctrl+C.
    fn capturing(&self) -> bool {
        false
    }

    /// Set focus state.
    fn set_focused(&mut self, _focused: bool) {}

    /// Unique identifier for this component.
    #[allow(dead_code)]
    fn id(&self) -> &str;
}
