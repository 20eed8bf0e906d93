//! Application core — event loop, screen management, action dispatch.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Tabs},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use damwatch_core::{ScreenController, SessionState};

use crate::action::{Action, ConfirmAction, Notification, NotificationLevel};
use crate::component::Component;
use crate::event::{Event, EventReader};
use crate::screen::ScreenId;
use crate::screens::create_screens;
use crate::theme;
use crate::tui::Tui;

/// TV-mode kiosks reload themselves on this cadence, matching the wall
/// displays the dashboard replaces.
const TV_RELOAD_INTERVAL: Duration = Duration::from_secs(75 * 60);

/// How long a toast notification stays up.
const NOTIFICATION_TTL: Duration = Duration::from_secs(3);

/// Top-level application state and event loop.
#[allow(clippy::struct_excessive_bools)]
pub struct App {
    active_screen: ScreenId,
    /// Previous screen for GoBack.
    previous_screen: Option<ScreenId>,
    screens: HashMap<ScreenId, Box<dyn Component>>,
    running: bool,
    help_visible: bool,
    /// Kiosk mode: dashboard only, no chrome, periodic full reload.
    tv_mode: bool,
    /// When the next TV-mode reload fires.
    tv_deadline: Option<Instant>,
    /// Screen to restore when TV mode exits.
    tv_return: Option<ScreenId>,
    /// Force a terminal clear before the next draw (TV reload).
    force_repaint: bool,
    session: SessionState,
    controller: ScreenController,
    action_tx: mpsc::UnboundedSender<Action>,
    action_rx: mpsc::UnboundedReceiver<Action>,
    /// Cancellation token for the data bridge task.
    data_cancel: CancellationToken,
    pending_confirm: Option<ConfirmAction>,
    notification: Option<(Notification, Instant)>,
}

impl App {
    /// Create the app with all screens. `start_in_tv` arms kiosk mode as
    /// soon as a session exists.
    pub fn new(controller: ScreenController, start_in_tv: bool) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();

        let screens: HashMap<ScreenId, Box<dyn Component>> =
            create_screens(&controller).into_iter().collect();

        Self {
            // The data bridge resolves the real session state; until then
            // the login screen doubles as a splash.
            active_screen: ScreenId::Login,
            previous_screen: None,
            screens,
            running: true,
            help_visible: false,
            tv_mode: false,
            tv_deadline: None,
            tv_return: if start_in_tv {
                // Marker: enter TV mode on the first sign-in.
                Some(ScreenId::Dashboard)
            } else {
                None
            },
            force_repaint: false,
            session: SessionState::Unknown,
            controller,
            action_tx,
            action_rx,
            data_cancel: CancellationToken::new(),
            pending_confirm: None,
            notification: None,
        }
    }

    fn init_screens(&mut self) -> Result<()> {
        for screen in self.screens.values_mut() {
            screen.init(self.action_tx.clone())?;
        }
        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            screen.set_focused(true);
        }
        Ok(())
    }

    /// Run the main event loop.
    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::new()?;
        tui.enter()?;
        self.init_screens()?;

        // Spawn the data bridge: session bootstrap + watch forwarding.
        {
            let controller = self.controller.clone();
            let cancel = self.data_cancel.clone();
            let tx = self.action_tx.clone();
            tokio::spawn(async move {
                crate::data_bridge::spawn_data_bridge(controller, tx, cancel).await;
            });
        }

        let mut events = EventReader::new(
            Duration::from_millis(250), // 4 Hz tick
            Duration::from_millis(33),  // ~30 FPS render
        );

        info!("TUI event loop started");

        while self.running {
            let Some(event) = events.next().await else {
                break;
            };

            match event {
                Event::Key(key) => {
                    if let Some(action) = self.handle_key_event(key)? {
                        self.action_tx.send(action)?;
                    }
                }
                Event::Resize(w, h) => {
                    self.action_tx.send(Action::Resize(w, h))?;
                }
                Event::Tick => {
                    self.action_tx.send(Action::Tick)?;
                }
                Event::Render => {
                    self.action_tx.send(Action::Render)?;
                }
            }

            // Drain and process all queued actions
            while let Ok(action) = self.action_rx.try_recv() {
                self.process_action(&action)?;

                if let Action::Render = action {
                    if self.force_repaint {
                        tui.clear()?;
                        self.force_repaint = false;
                    }
                    tui.draw(|frame| self.render(frame))?;
                }
            }
        }

        self.data_cancel.cancel();
        events.stop();
        info!("TUI event loop ended");
        Ok(())
    }

    /// Map a key event to an action. Global keys are handled here;
    /// screen-specific keys are delegated to the active screen component.
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        // Ctrl+C quits from anywhere.
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
            return Ok(Some(Action::Quit));
        }

        // Confirmation dialog captures all input
        if self.pending_confirm.is_some() {
            return match key.code {
                KeyCode::Char('y' | 'Y') => Ok(Some(Action::ConfirmYes)),
                KeyCode::Char('n' | 'N') | KeyCode::Esc => Ok(Some(Action::ConfirmNo)),
                _ => Ok(None),
            };
        }

        // TV mode: Escape leaves, q quits, everything else is ignored.
        if self.tv_mode {
            return match key.code {
                KeyCode::Esc => Ok(Some(Action::ToggleTvMode)),
                KeyCode::Char('q') => Ok(Some(Action::Quit)),
                _ => Ok(None),
            };
        }

        // Screens with an open form (or the login screen) see every key.
        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            if screen.capturing() {
                return screen.handle_key_event(key);
            }
        }

        if self.help_visible {
            return match key.code {
                KeyCode::Esc | KeyCode::Char('?') => Ok(Some(Action::ToggleHelp)),
                _ => Ok(None),
            };
        }

        // Global keybindings
        match (key.modifiers, key.code) {
            (KeyModifiers::NONE, KeyCode::Char('q')) => return Ok(Some(Action::Quit)),
            (KeyModifiers::SHIFT, KeyCode::Char('?')) | (KeyModifiers::NONE, KeyCode::Char('?')) => {
                return Ok(Some(Action::ToggleHelp));
            }
            (KeyModifiers::NONE, KeyCode::Char('t')) => return Ok(Some(Action::ToggleTvMode)),
            (KeyModifiers::NONE, KeyCode::Char('r')) => return Ok(Some(Action::RefreshNow)),
            (KeyModifiers::NONE, KeyCode::Char('o')) => return Ok(Some(Action::Logout)),

            (KeyModifiers::NONE, KeyCode::Char(c @ '1'..='2')) => {
                let n = u8::try_from(u32::from(c) - u32::from('0')).unwrap_or(0);
                if let Some(screen) = ScreenId::from_number(n) {
                    return Ok(Some(Action::SwitchScreen(screen)));
                }
            }

            (KeyModifiers::NONE, KeyCode::Tab) => {
                return Ok(Some(Action::SwitchScreen(self.active_screen.next())));
            }
            (KeyModifiers::SHIFT, KeyCode::BackTab) => {
                return Ok(Some(Action::SwitchScreen(self.active_screen.prev())));
            }

            (KeyModifiers::NONE, KeyCode::Esc) => return Ok(Some(Action::GoBack)),

            _ => {}
        }

        // Delegate to active screen component
        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            return screen.handle_key_event(key);
        }

        Ok(None)
    }

    /// Process a single action — update app state and propagate to components.
    fn process_action(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::Quit => {
                self.running = false;
            }

            Action::Resize(..) | Action::Render => {}

            Action::SwitchScreen(target) => {
                self.switch_screen(*target);
            }

            Action::GoBack => {
                if let Some(prev) = self.previous_screen.take() {
                    self.action_tx.send(Action::SwitchScreen(prev))?;
                }
            }

            Action::ToggleHelp => {
                self.help_visible = !self.help_visible;
            }

            Action::ToggleTvMode => {
                if self.tv_mode {
                    self.exit_tv_mode();
                } else {
                    self.enter_tv_mode();
                }
            }

            Action::RefreshNow => {
                let controller = self.controller.clone();
                tokio::spawn(async move {
                    controller.refresh_now().await;
                });
            }

            Action::Logout => {
                let controller = self.controller.clone();
                tokio::spawn(async move {
                    controller.logout().await;
                });
            }

            Action::SessionChanged(state) => {
                let was_signed_in = matches!(self.session, SessionState::SignedIn(_));
                self.session = state.clone();

                match state {
                    SessionState::SignedIn(user) => {
                        if self.active_screen == ScreenId::Login {
                            if !was_signed_in {
                                self.action_tx.send(Action::Notify(Notification::success(
                                    format!("Signed in as {}", user.username),
                                )))?;
                            }
                            self.switch_screen(ScreenId::Dashboard);
                            // --tv: arm kiosk mode on the first sign-in.
                            if !self.tv_mode && self.tv_return.is_some() {
                                self.enter_tv_mode();
                            }
                        }
                    }
                    SessionState::SignedOut | SessionState::Unknown => {
                        if self.tv_mode {
                            self.exit_tv_mode();
                        }
                        self.pending_confirm = None;
                        if self.active_screen != ScreenId::Login {
                            self.switch_screen(ScreenId::Login);
                        }
                    }
                }
                self.broadcast(action)?;
            }

            // Data and result updates go to all screens; each ignores what
            // it doesn't handle.
            Action::SnapshotUpdated(_)
            | Action::PollError(_)
            | Action::LoginFailed(_)
            | Action::EditSaved(_)
            | Action::EditFailed(_)
            | Action::HistoryLoaded(_)
            | Action::HistoryLoadFailed(_)
            | Action::MissingHoursLoaded(_)
            | Action::BackfillConfirmed
            | Action::BackfillSaved(_)
            | Action::BackfillFailed(_) => {
                self.broadcast(action)?;
            }

            Action::ShowConfirm(confirm) => {
                self.pending_confirm = Some(confirm.clone());
            }

            Action::ConfirmYes => {
                if let Some(confirm) = self.pending_confirm.take() {
                    match confirm {
                        ConfirmAction::SubmitBackfill { .. } => {
                            self.action_tx.send(Action::BackfillConfirmed)?;
                        }
                    }
                }
            }

            Action::ConfirmNo => {
                self.pending_confirm = None;
            }

            Action::Notify(n) => {
                self.notification = Some((n.clone(), Instant::now()));
            }

            Action::DismissNotification => {
                self.notification = None;
            }

            Action::Tick => {
                // Auto-dismiss notifications
                if self
                    .notification
                    .as_ref()
                    .is_some_and(|(_, created)| created.elapsed() > NOTIFICATION_TTL)
                {
                    self.action_tx.send(Action::DismissNotification)?;
                }

                // TV-mode reload: re-fetch and repaint from scratch.
                if self.tv_mode {
                    if let Some(deadline) = self.tv_deadline {
                        if Instant::now() >= deadline {
                            debug!("TV-mode reload");
                            self.tv_deadline = Some(Instant::now() + TV_RELOAD_INTERVAL);
                            self.force_repaint = true;
                            self.action_tx.send(Action::RefreshNow)?;
                        }
                    }
                }

                // Screens animate throbbers on ticks.
                self.broadcast(action)?;
            }
        }

        Ok(())
    }

    /// Forward an action to every screen, dispatching any follow-ups.
    fn broadcast(&mut self, action: &Action) -> Result<()> {
        for screen in self.screens.values_mut() {
            if let Some(follow_up) = screen.update(action)? {
                self.action_tx.send(follow_up)?;
            }
        }
        Ok(())
    }

    fn switch_screen(&mut self, target: ScreenId) {
        if target == self.active_screen {
            return;
        }
        debug!("switching screen: {} → {}", self.active_screen, target);
        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            screen.set_focused(false);
        }
        // Login is a gate, not a history entry.
        self.previous_screen =
            (self.active_screen != ScreenId::Login).then_some(self.active_screen);
        self.active_screen = target;
        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            screen.set_focused(true);
        }
    }

    fn enter_tv_mode(&mut self) {
        if self.session.user().is_none() {
            return;
        }
        self.tv_return = Some(self.active_screen);
        if self.active_screen != ScreenId::Dashboard {
            self.switch_screen(ScreenId::Dashboard);
        }
        self.tv_mode = true;
        self.tv_deadline = Some(Instant::now() + TV_RELOAD_INTERVAL);
        self.help_visible = false;
        info!("entered TV mode");
    }

    fn exit_tv_mode(&mut self) {
        self.tv_mode = false;
        self.tv_deadline = None;
        if let Some(prev) = self.tv_return.take() {
            if prev != self.active_screen && prev != ScreenId::Login {
                self.switch_screen(prev);
            }
        }
        info!("left TV mode");
    }

    // ── Rendering ────────────────────────────────────────────────

    /// Render the full application frame.
    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        // Login gets the full frame — no tab bar or status bar
        if self.active_screen == ScreenId::Login {
            if let Some(screen) = self.screens.get(&ScreenId::Login) {
                screen.render(frame, area);
            }
            return;
        }

        // TV mode: dashboard only, no chrome, no overlays.
        if self.tv_mode {
            if let Some(screen) = self.screens.get(&ScreenId::Dashboard) {
                screen.render(frame, area);
            }
            return;
        }

        // Layout: [screen content] [tab bar] [status bar]
        let layout = Layout::vertical([
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

        if let Some(screen) = self.screens.get(&self.active_screen) {
            screen.render(frame, layout[0]);
        }

        self.render_tab_bar(frame, layout[1]);
        self.render_status_bar(frame, layout[2]);

        // Overlays on top (order matters: last = topmost)
        if let Some((ref notif, _)) = self.notification {
            self.render_notification(frame, area, notif);
        }

        if let Some(ref confirm) = self.pending_confirm {
            self.render_confirm_dialog(frame, area, confirm);
        }

        if self.help_visible {
            self.render_help_overlay(frame, area);
        }
    }

    fn render_tab_bar(&self, frame: &mut Frame, area: Rect) {
        let titles: Vec<Line> = ScreenId::ALL
            .iter()
            .map(|&id| {
                let style = if id == self.active_screen {
                    theme::tab_active()
                } else {
                    theme::tab_inactive()
                };
                Line::from(Span::styled(
                    format!(" {} {} ", id.number(), id.label()),
                    style,
                ))
            })
            .collect();

        let tabs = Tabs::new(titles)
            .divider(Span::styled(" ", theme::key_hint()))
            .select(
                ScreenId::ALL
                    .iter()
                    .position(|&s| s == self.active_screen)
                    .unwrap_or(0),
            );

        frame.render_widget(tabs, area);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let session_indicator = match &self.session {
            SessionState::SignedIn(user) => Span::styled(
                format!("● {}", user.username),
                Style::default().fg(theme::OK_GREEN),
            ),
            SessionState::SignedOut => {
                Span::styled("○ signed out", Style::default().fg(theme::ALERT_RED))
            }
            SessionState::Unknown => {
                Span::styled("◐ connecting", Style::default().fg(theme::WARN_AMBER))
            }
        };

        let hints = Span::styled(
            " │ ? help  t tv  r refresh  o sign out  q quit",
            theme::key_hint(),
        );

        let line = Line::from(vec![Span::raw(" "), session_indicator, hints]);
        frame.render_widget(Paragraph::new(line), area);
    }

    /// Render the help overlay centered on screen.
    #[allow(clippy::unused_self)]
    fn render_help_overlay(&self, frame: &mut Frame, area: Rect) {
        let help_width = 58u16.min(area.width.saturating_sub(4));
        let help_height = 19u16.min(area.height.saturating_sub(4));

        let x = (area.width.saturating_sub(help_width)) / 2;
        let y = (area.height.saturating_sub(help_height)) / 2;
        let help_area = Rect::new(area.x + x, area.y + y, help_width, help_height);

        frame.render_widget(
            Block::default().style(Style::default().bg(theme::BG_DARK)),
            help_area,
        );

        let block = Block::default()
            .title(" Keyboard Shortcuts ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused());

        let inner = block.inner(help_area);
        frame.render_widget(block, help_area);

        let section = |label: &str| {
            Line::from(Span::styled(
                format!("  {label}"),
                Style::default().fg(theme::SKY_CYAN),
            ))
        };
        let entry = |keys: &str, what: &str| {
            Line::from(vec![
                Span::styled(format!("  {keys:<10}"), theme::key_hint_key()),
                Span::styled(what.to_owned(), theme::key_hint()),
            ])
        };

        let help_text = vec![
            Line::from(""),
            section("Navigation"),
            entry("1-2", "Jump to screen"),
            entry("Tab", "Next screen"),
            entry("Esc", "Back / close"),
            Line::from(""),
            section("Dashboard"),
            entry("c", "Edit chlorine tank change date"),
            entry("d", "Edit last active dosing"),
            Line::from(""),
            section("History"),
            entry("f / a", "Filter by day / show all days"),
            entry("m / b", "Scan missing hours / backfill"),
            entry("j/k", "Scroll"),
            Line::from(""),
            section("Global"),
            entry("t", "TV mode (Esc exits)"),
            entry("r / o / q", "Refresh / sign out / quit"),
        ];

        frame.render_widget(Paragraph::new(help_text), inner);
    }

    /// Render a centered confirmation dialog.
    #[allow(clippy::unused_self)]
    fn render_confirm_dialog(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmAction) {
        let width = 50u16.min(area.width.saturating_sub(4));
        let height = 5u16;

        let x = (area.width.saturating_sub(width)) / 2;
        let y = (area.height.saturating_sub(height)) / 2;
        let dialog_area = Rect::new(area.x + x, area.y + y, width, height);

        frame.render_widget(
            Block::default().style(Style::default().bg(theme::BG_DARK)),
            dialog_area,
        );

        let block = Block::default()
            .title(" Confirm ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(theme::WARN_AMBER));

        let inner = block.inner(dialog_area);
        frame.render_widget(block, dialog_area);

        let text = vec![
            Line::from(Span::styled(
                format!("  {confirm}"),
                Style::default().fg(theme::DIM_WHITE),
            )),
            Line::from(""),
            Line::from(vec![
                Span::styled("  y ", theme::key_hint_key()),
                Span::styled("confirm    ", theme::key_hint()),
                Span::styled("n ", theme::key_hint_key()),
                Span::styled("cancel", theme::key_hint()),
            ]),
        ];
        frame.render_widget(Paragraph::new(text), inner);
    }

    /// Render a notification toast in the bottom-right corner.
    #[allow(clippy::unused_self)]
    fn render_notification(&self, frame: &mut Frame, area: Rect, notif: &Notification) {
        let msg_len = u16::try_from(notif.message.len()).unwrap_or(u16::MAX);
        let width = msg_len.saturating_add(6).clamp(20, 60);
        let height = 3u16;

        let x = area.width.saturating_sub(width + 1);
        let y = area.height.saturating_sub(height + 2); // above status bar
        let toast_area = Rect::new(area.x + x, area.y + y, width, height);

        let (border_color, icon) = match notif.level {
            NotificationLevel::Success => (theme::OK_GREEN, "✓"),
            NotificationLevel::Error => (theme::ALERT_RED, "✗"),
            NotificationLevel::Warning => (theme::WARN_AMBER, "!"),
            NotificationLevel::Info => (theme::SKY_CYAN, "·"),
        };

        frame.render_widget(
            Block::default().style(Style::default().bg(theme::BG_DARK)),
            toast_area,
        );

        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(border_color));

        let inner = block.inner(toast_area);
        frame.render_widget(block, toast_area);

        let line = Line::from(vec![
            Span::styled(format!(" {icon} "), Style::default().fg(border_color)),
            Span::styled(&notif.message, Style::default().fg(theme::DIM_WHITE)),
        ]);
        frame.render_widget(Paragraph::new(line), inner);
    }
}
