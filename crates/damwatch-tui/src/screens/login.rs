//! Sign-in form — shown whenever no backend session exists.
//!
//! Submits through [`ScreenController::login`]; a successful sign-in is
//! observed via the session watch channel (the data bridge forwards it as
//! `SessionChanged`), so this screen only has to surface failures.

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};
use secrecy::SecretString;
use tokio::sync::mpsc::UnboundedSender;
use tui_input::Input;
use tui_input::backend::crossterm::EventHandler;

use damwatch_core::{ScreenController, SessionState};

use crate::action::Action;
use crate::component::Component;
use crate::theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Username,
    Password,
}

pub struct LoginScreen {
    controller: ScreenController,
    action_tx: Option<UnboundedSender<Action>>,
    username: Input,
    password: Input,
    active_field: Field,
    show_password: bool,
    authenticating: bool,
    error: Option<String>,
    throbber_state: throbber_widgets_tui::ThrobberState,
}

impl LoginScreen {
    pub fn new(controller: ScreenController) -> Self {
        Self {
            controller,
            action_tx: None,
            username: Input::default(),
            password: Input::default(),
            active_field: Field::Username,
            show_password: false,
            authenticating: false,
            error: None,
            throbber_state: throbber_widgets_tui::ThrobberState::default(),
        }
    }

    fn next_field(&mut self) {
        self.active_field = match self.active_field {
            Field::Username => Field::Password,
            Field::Password => Field::Username,
        };
    }

    /// Validate and spawn the login request.
    fn submit(&mut self) {
        if self.authenticating {
            return;
        }
        let username = self.username.value().trim().to_owned();
        if username.is_empty() {
            self.error = Some("Username cannot be empty".into());
            return;
        }
        if self.password.value().is_empty() {
            self.error = Some("Password cannot be empty".into());
            return;
        }

        self.error = None;
        self.authenticating = true;

        let password = SecretString::from(self.password.value().to_owned());
        let controller = self.controller.clone();
        let Some(tx) = self.action_tx.clone() else {
            return;
        };
        tokio::spawn(async move {
            // Success surfaces through the session watch channel.
            if let Err(e) = controller.login(&username, &password).await {
                let _ = tx.send(Action::LoginFailed(e.to_string()));
            }
        });
    }

    fn render_input_field(
        &self,
        frame: &mut Frame,
        area: Rect,
        label: &str,
        value: &str,
        active: bool,
        masked: bool,
    ) {
        if area.height < 4 {
            return;
        }

        let label_style = if active {
            Style::default().fg(theme::SKY_CYAN)
        } else {
            Style::default().fg(theme::DIM_WHITE)
        };
        frame.render_widget(
            Paragraph::new(Span::styled(label, label_style)),
            Rect::new(area.x, area.y, area.width, 1),
        );

        let display = if masked && !value.is_empty() {
            "\u{25CF}".repeat(value.chars().count())
        } else {
            value.to_owned()
        };

        let border = if active {
            theme::border_focused()
        } else {
            theme::border_default()
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(border);

        let block_area = Rect::new(area.x, area.y + 1, area.width, 3);
        let inner = block.inner(block_area);
        frame.render_widget(block, block_area);

        let text = if active {
            format!("{display}\u{2588}")
        } else {
            display
        };
        frame.render_widget(
            Paragraph::new(Span::styled(text, Style::default().fg(theme::SKY_CYAN))),
            inner,
        );
    }
}

impl Component for LoginScreen {
    fn init(&mut self, action_tx: UnboundedSender<Action>) -> Result<()> {
        self.action_tx = Some(action_tx);
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if self.authenticating {
            // Only Esc cancels the wait for a verdict (the request itself
            // is left to finish; a late success still signs in).
            if key.code == KeyCode::Esc {
                self.authenticating = false;
            }
            return Ok(None);
        }

        match key.code {
            KeyCode::Enter => self.submit(),
            KeyCode::Tab | KeyCode::Down | KeyCode::Up => self.next_field(),
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.show_password = !self.show_password;
            }
            _ => {
                self.error = None;
                let input = match self.active_field {
                    Field::Username => &mut self.username,
                    Field::Password => &mut self.password,
                };
                input.handle_event(&crossterm::event::Event::Key(key));
            }
        }
        Ok(None)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::LoginFailed(msg) => {
                self.authenticating = false;
                self.error = Some(msg.clone());
            }
            Action::SessionChanged(SessionState::SignedIn(_)) => {
                self.authenticating = false;
                self.error = None;
                self.password.reset();
            }
            Action::Tick => {
                if self.authenticating {
                    self.throbber_state.calc_next();
                }
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        frame.render_widget(
            Block::default().style(Style::default().bg(theme::BG_DARK)),
            area,
        );

        let panel_w = 52u16.min(area.width.saturating_sub(4));
        let panel_h = 17u16.min(area.height.saturating_sub(2));
        let x = (area.width.saturating_sub(panel_w)) / 2;
        let y = (area.height.saturating_sub(panel_h)) / 2;
        let panel = Rect::new(area.x + x, area.y + y, panel_w, panel_h);

        let block = Block::default()
            .title(Line::from(vec![
                Span::raw(" "),
                Span::styled("Damwatch Sign In", theme::title_style()),
                Span::raw(" "),
            ]))
            .title_alignment(Alignment::Center)
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused());

        let inner = block.inner(panel);
        frame.render_widget(block, panel);

        let layout = Layout::vertical([
            Constraint::Length(1), // backend URL
            Constraint::Length(1), // spacer
            Constraint::Length(4), // username
            Constraint::Length(1), // spacer
            Constraint::Length(4), // password
            Constraint::Length(1), // error / throbber
            Constraint::Min(0),
            Constraint::Length(1), // hints
        ])
        .split(inner);

        frame.render_widget(
            Paragraph::new(Span::styled(
                format!("  {}", self.controller.config().url),
                Style::default().fg(theme::BORDER_SLATE),
            )),
            layout[0],
        );

        self.render_input_field(
            frame,
            layout[2],
            "  Username",
            self.username.value(),
            self.active_field == Field::Username,
            false,
        );
        self.render_input_field(
            frame,
            layout[4],
            "  Password",
            self.password.value(),
            self.active_field == Field::Password,
            !self.show_password,
        );

        if self.authenticating {
            let throbber = throbber_widgets_tui::Throbber::default()
                .label("  Signing in...")
                .style(Style::default().fg(theme::SKY_CYAN))
                .throbber_style(Style::default().fg(theme::DEEP_TEAL));
            frame.render_stateful_widget(throbber, layout[5], &mut self.throbber_state.clone());
        } else if let Some(ref err) = self.error {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    format!("  {err}"),
                    Style::default()
                        .fg(theme::ALERT_RED)
                        .add_modifier(Modifier::BOLD),
                )),
                layout[5],
            );
        }

        frame.render_widget(
            Paragraph::new(Span::styled(
                "Tab switch field  Enter sign in  Ctrl+U show password  Ctrl+C quit",
                theme::key_hint(),
            ))
            .alignment(Alignment::Center),
            layout[7],
        );
    }

    fn capturing(&self) -> bool {
        true
    }

    fn id(&self) -> &str {
        "login"
    }
}
