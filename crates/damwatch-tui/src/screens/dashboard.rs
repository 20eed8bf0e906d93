//! Live dashboard — the full metric card grid plus the two edit dialogs.
//!
//! Renders whatever the last poll published; a failed poll leaves the
//! stale cards up with a banner carrying the reason. Turbidity display
//! overrides are applied to a render copy only, so edits and uploads
//! always work on scraped values.

use std::sync::Arc;

use chrono::{Datelike, Local, NaiveDate};
use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};
use tokio::sync::mpsc::UnboundedSender;
use tui_input::Input;
use tui_input::backend::crossterm::EventHandler;

use damwatch_core::{
    ChlorineCycleStatus, DosingDraft, HourlyOverrides, LiveSnapshot, Meridiem, MetricField,
    ScreenController, chlorine, dosing, fmt,
};

use crate::action::{Action, Notification};
use crate::component::Component;
use crate::theme;

const GRID_COLUMNS: usize = 4;

/// Which part of the dosing dialog has focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DosingField {
    Date,
    Hour,
    Meridiem,
}

/// An open edit dialog.
enum Editor {
    Chlorine {
        input: Input,
        error: Option<String>,
        saving: bool,
    },
    Dosing {
        date_input: Input,
        hour: u32,
        meridiem: Meridiem,
        field: DosingField,
        error: Option<String>,
        saving: bool,
    },
}

pub struct DashboardScreen {
    controller: ScreenController,
    action_tx: Option<UnboundedSender<Action>>,
    snapshot: Option<Arc<LiveSnapshot>>,
    poll_error: Option<String>,
    overrides: HourlyOverrides,
    editor: Option<Editor>,
    throbber_state: throbber_widgets_tui::ThrobberState,
}

impl DashboardScreen {
    pub fn new(controller: ScreenController) -> Self {
        let overrides = controller.config().turbidity_overrides.clone();
        Self {
            controller,
            action_tx: None,
            snapshot: None,
            poll_error: None,
            overrides,
            editor: None,
            throbber_state: throbber_widgets_tui::ThrobberState::default(),
        }
    }

    /// Open the chlorine-date editor, drafting from the snapshot.
    fn open_chlorine_editor(&mut self) {
        // Draft is the ISO date prefix of the stored value; the rest (if
        // any) is backend formatting noise.
        let draft = self
            .snapshot
            .as_ref()
            .and_then(|s| s.reserved_metric.as_deref())
            .map(|v| v.chars().take(10).collect::<String>())
            .unwrap_or_default();
        self.editor = Some(Editor::Chlorine {
            input: Input::new(draft),
            error: None,
            saving: false,
        });
    }

    /// Open the dosing editor, drafting from the snapshot (or "now").
    fn open_dosing_editor(&mut self) {
        let year = Local::now().year();
        let draft = self
            .snapshot
            .as_ref()
            .and_then(|s| s.last_active_dosing.as_deref())
            .and_then(|v| dosing::parse_value(v, year))
            .unwrap_or_else(|| dosing::from_datetime(&Local::now().naive_local()));

        self.editor = Some(Editor::Dosing {
            date_input: Input::new(draft.date.format("%Y-%m-%d").to_string()),
            hour: draft.hour,
            meridiem: draft.meridiem,
            field: DosingField::Date,
            error: None,
            saving: false,
        });
    }

    fn save_chlorine(&mut self) {
        let Some(Editor::Chlorine {
            input,
            error,
            saving,
        }) = self.editor.as_mut()
        else {
            return;
        };
        if *saving {
            return;
        }

        let draft = input.value().trim().to_owned();
        if !draft.is_empty() && NaiveDate::parse_from_str(&draft, "%Y-%m-%d").is_err() {
            *error = Some("Enter a date as YYYY-MM-DD, or leave empty to clear".into());
            return;
        }
        *error = None;
        *saving = true;

        let controller = self.controller.clone();
        let Some(tx) = self.action_tx.clone() else {
            return;
        };
        tokio::spawn(async move {
            let date = (!draft.is_empty()).then_some(draft.as_str());
            match controller.save_chlorine_date(date).await {
                Ok(()) => {
                    let msg = if date.is_some() {
                        "Chlorine tank change date saved"
                    } else {
                        "Chlorine tank change date cleared"
                    };
                    let _ = tx.send(Action::EditSaved(msg.into()));
                }
                Err(e) => {
                    let _ = tx.send(Action::EditFailed(e.to_string()));
                }
            }
        });
    }

    fn save_dosing(&mut self) {
        let Some(Editor::Dosing {
            date_input,
            hour,
            meridiem,
            error,
            saving,
            ..
        }) = self.editor.as_mut()
        else {
            return;
        };
        if *saving {
            return;
        }

        let Ok(date) = NaiveDate::parse_from_str(date_input.value().trim(), "%Y-%m-%d") else {
            *error = Some("Enter a date as YYYY-MM-DD".into());
            return;
        };
        *error = None;
        *saving = true;

        let draft = DosingDraft {
            date,
            hour: *hour,
            meridiem: *meridiem,
        };
        let controller = self.controller.clone();
        let Some(tx) = self.action_tx.clone() else {
            return;
        };
        tokio::spawn(async move {
            match controller.save_last_active_dosing(&draft).await {
                Ok(value) => {
                    let _ = tx.send(Action::EditSaved(format!("Last active dosing: {value}")));
                }
                Err(e) => {
                    let _ = tx.send(Action::EditFailed(e.to_string()));
                }
            }
        });
    }

    fn handle_editor_key(&mut self, key: KeyEvent) {
        match self.editor.as_mut() {
            Some(Editor::Chlorine { input, saving, .. }) => match key.code {
                KeyCode::Esc => {
                    if !*saving {
                        self.editor = None;
                    }
                }
                KeyCode::Enter => self.save_chlorine(),
                _ => {
                    if !*saving {
                        input.handle_event(&crossterm::event::Event::Key(key));
                    }
                }
            },
            Some(Editor::Dosing {
                date_input,
                hour,
                meridiem,
                field,
                saving,
                ..
            }) => match key.code {
                KeyCode::Esc => {
                    if !*saving {
                        self.editor = None;
                    }
                }
                KeyCode::Enter => self.save_dosing(),
                KeyCode::Tab => {
                    *field = match field {
                        DosingField::Date => DosingField::Hour,
                        DosingField::Hour => DosingField::Meridiem,
                        DosingField::Meridiem => DosingField::Date,
                    };
                }
                KeyCode::Up | KeyCode::Down if !*saving => match field {
                    DosingField::Hour => {
                        // 1..=12, wrapping in either direction.
                        *hour = if key.code == KeyCode::Up {
                            *hour % 12 + 1
                        } else {
                            (*hour + 10) % 12 + 1
                        };
                    }
                    DosingField::Meridiem => {
                        *meridiem = match meridiem {
                            Meridiem::Am => Meridiem::Pm,
                            Meridiem::Pm => Meridiem::Am,
                        };
                    }
                    DosingField::Date => {}
                },
                _ => {
                    if !*saving && *field == DosingField::Date {
                        date_input.handle_event(&crossterm::event::Event::Key(key));
                    }
                }
            },
            None => {}
        }
    }

    // ── Render methods ──────────────────────────────────────────────

    fn render_header(&self, frame: &mut Frame, area: Rect, snapshot: Option<&LiveSnapshot>) {
        let updated = snapshot
            .and_then(|s| s.fetched_at.as_deref())
            .map_or_else(|| "never".to_owned(), fmt::format_fetched_at);
        let mut spans = vec![
            Span::styled(" Live Telemetry", theme::title_style()),
            Span::styled(format!("  updated {updated}"), theme::key_hint()),
        ];
        if self.controller.can_edit() {
            spans.push(Span::styled("  edit enabled", Style::default().fg(theme::OK_GREEN)));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_banner(&self, frame: &mut Frame, area: Rect, snapshot: Option<&LiveSnapshot>) {
        if let Some(ref err) = self.poll_error {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    format!(" ⚠ {err} — showing last known data"),
                    Style::default()
                        .fg(theme::ALERT_RED)
                        .add_modifier(Modifier::BOLD),
                )),
                area,
            );
        } else if let Some(scrape) = snapshot.and_then(|s| s.scrape_error.as_deref()) {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    format!(" ⚠ source: {scrape}"),
                    Style::default().fg(theme::WARN_AMBER),
                )),
                area,
            );
        }
    }

    fn render_cards(&self, frame: &mut Frame, area: Rect, snapshot: &LiveSnapshot) {
        let rows = MetricField::ALL.len().div_ceil(GRID_COLUMNS);
        let row_areas = Layout::vertical(vec![Constraint::Length(3); rows]).split(area);
        let today = Local::now().date_naive();

        for (i, field) in MetricField::ALL.iter().enumerate() {
            let row = i / GRID_COLUMNS;
            if row >= row_areas.len() || row_areas[row].height < 3 {
                break;
            }
            let cols = Layout::horizontal(vec![Constraint::Ratio(1, 4); GRID_COLUMNS])
                .split(row_areas[row]);
            let cell = cols[i % GRID_COLUMNS];

            let mut title = field.label();
            if field.is_editable() && self.controller.can_edit() {
                let hint = match field {
                    MetricField::LastChlorineChange => " (c)",
                    _ => " (d)",
                };
                title.push_str(hint);
            }

            // The chlorine card's border tracks the replacement cycle.
            let border_style = if *field == MetricField::LastChlorineChange {
                let status =
                    chlorine::cycle_status(snapshot.reserved_metric.as_deref(), today);
                if status == ChlorineCycleStatus::Unknown {
                    theme::border_default()
                } else {
                    Style::default().fg(theme::chlorine_tone(status))
                }
            } else {
                theme::border_default()
            };

            let block = Block::default()
                .title(Span::styled(title, theme::card_label()))
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(border_style);
            let inner = block.inner(cell);
            frame.render_widget(block, cell);
            frame.render_widget(
                Paragraph::new(Span::styled(field.value_text(snapshot), theme::card_value()))
                    .alignment(Alignment::Center),
                inner,
            );
        }
    }

    fn render_waiting(&self, frame: &mut Frame, area: Rect) {
        let y = area.y + area.height / 2;
        let line_area = Rect::new(area.x, y.min(area.bottom().saturating_sub(1)), area.width, 1);
        frame.render_widget(
            Paragraph::new(Span::styled(
                "Waiting for the first snapshot…",
                theme::key_hint(),
            ))
            .alignment(Alignment::Center),
            line_area,
        );
    }

    fn render_editor(&self, frame: &mut Frame, area: Rect) {
        let Some(editor) = &self.editor else {
            return;
        };

        let width = 54u16.min(area.width.saturating_sub(4));
        let height = 9u16.min(area.height.saturating_sub(2));
        let x = (area.width.saturating_sub(width)) / 2;
        let y = (area.height.saturating_sub(height)) / 2;
        let dialog = Rect::new(area.x + x, area.y + y, width, height);

        frame.render_widget(
            Block::default().style(Style::default().bg(theme::BG_DARK)),
            dialog,
        );

        let (title, saving, error) = match editor {
            Editor::Chlorine { saving, error, .. } => {
                (" Chlorine Tank Change ", *saving, error.as_deref())
            }
            Editor::Dosing { saving, error, .. } => {
                (" Last Active Dosing ", *saving, error.as_deref())
            }
        };

        let block = Block::default()
            .title(title)
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused());
        let inner = block.inner(dialog);
        frame.render_widget(block, dialog);

        let layout = Layout::vertical([
            Constraint::Length(1), // prompt
            Constraint::Length(1), // value line
            Constraint::Length(1), // spacer
            Constraint::Length(1), // error / throbber
            Constraint::Min(0),
            Constraint::Length(1), // hints
        ])
        .split(inner);

        match editor {
            Editor::Chlorine { input, .. } => {
                frame.render_widget(
                    Paragraph::new(Span::styled(
                        " Date (YYYY-MM-DD, empty clears):",
                        theme::card_label(),
                    )),
                    layout[0],
                );
                frame.render_widget(
                    Paragraph::new(Span::styled(
                        format!(" {}\u{2588}", input.value()),
                        Style::default().fg(theme::SKY_CYAN),
                    )),
                    layout[1],
                );
                frame.render_widget(
                    Paragraph::new(Span::styled(" Enter save  Esc cancel", theme::key_hint())),
                    layout[5],
                );
            }
            Editor::Dosing {
                date_input,
                hour,
                meridiem,
                field,
                ..
            } => {
                frame.render_widget(
                    Paragraph::new(Span::styled(
                        " Date (YYYY-MM-DD)          Hour    AM/PM",
                        theme::card_label(),
                    )),
                    layout[0],
                );

                let style_for = |f: DosingField| {
                    if *field == f {
                        Style::default()
                            .fg(theme::SKY_CYAN)
                            .add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(theme::DIM_WHITE)
                    }
                };
                let date_text = if *field == DosingField::Date {
                    format!(" {}\u{2588}", date_input.value())
                } else {
                    format!(" {}", date_input.value())
                };
                frame.render_widget(
                    Paragraph::new(Line::from(vec![
                        Span::styled(format!("{date_text:<28}"), style_for(DosingField::Date)),
                        Span::styled(format!("{hour:>2}    "), style_for(DosingField::Hour)),
                        Span::styled(meridiem.label(), style_for(DosingField::Meridiem)),
                    ])),
                    layout[1],
                );
                frame.render_widget(
                    Paragraph::new(Span::styled(
                        " Tab next field  ↑/↓ adjust  Enter save  Esc cancel",
                        theme::key_hint(),
                    )),
                    layout[5],
                );
            }
        }

        if saving {
            let throbber = throbber_widgets_tui::Throbber::default()
                .label(" Saving...")
                .style(Style::default().fg(theme::SKY_CYAN))
                .throbber_style(Style::default().fg(theme::DEEP_TEAL));
            frame.render_stateful_widget(throbber, layout[3], &mut self.throbber_state.clone());
        } else if let Some(err) = error {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    format!(" {err}"),
                    Style::default().fg(theme::ALERT_RED),
                )),
                layout[3],
            );
        }
    }
}

impl Component for DashboardScreen {
    fn init(&mut self, action_tx: UnboundedSender<Action>) -> Result<()> {
        self.action_tx = Some(action_tx);
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if self.editor.is_some() {
            self.handle_editor_key(key);
            return Ok(None);
        }

        match key.code {
            KeyCode::Char('c') => {
                if self.controller.can_edit() {
                    self.open_chlorine_editor();
                } else {
                    return Ok(Some(Action::Notify(Notification::warning(
                        "This account is read-only",
                    ))));
                }
            }
            KeyCode::Char('d') => {
                if self.controller.can_edit() {
                    self.open_dosing_editor();
                } else {
                    return Ok(Some(Action::Notify(Notification::warning(
                        "This account is read-only",
                    ))));
                }
            }
            _ => {}
        }
        Ok(None)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::SnapshotUpdated(snap) => {
                self.snapshot = Some(Arc::clone(snap));
            }
            Action::PollError(msg) => {
                self.poll_error = msg.clone();
            }
            Action::EditSaved(msg) => {
                self.editor = None;
                return Ok(Some(Action::Notify(Notification::success(msg.clone()))));
            }
            Action::EditFailed(msg) => match self.editor.as_mut() {
                Some(
                    Editor::Chlorine { error, saving, .. }
                    | Editor::Dosing { error, saving, .. },
                ) => {
                    *saving = false;
                    *error = Some(msg.clone());
                }
                None => {
                    return Ok(Some(Action::Notify(Notification::error(msg.clone()))));
                }
            },
            Action::SessionChanged(state) => {
                // A fresh sign-in starts from a clean slate.
                if state.user().is_none() {
                    self.snapshot = None;
                    self.poll_error = None;
                    self.editor = None;
                }
            }
            Action::Tick => {
                let saving = matches!(
                    self.editor,
                    Some(
                        Editor::Chlorine { saving: true, .. }
                            | Editor::Dosing { saving: true, .. }
                    )
                );
                if saving {
                    self.throbber_state.calc_next();
                }
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let layout = Layout::vertical([
            Constraint::Length(1), // header
            Constraint::Length(1), // banner
            Constraint::Min(3),    // cards
        ])
        .split(area);

        // Overrides patch a render copy only; the stored snapshot and every
        // upload keep the scraped values.
        let patched = self
            .snapshot
            .as_ref()
            .map(|snap| self.overrides.patched(snap));

        self.render_header(frame, layout[0], patched.as_ref());
        self.render_banner(frame, layout[1], patched.as_ref());

        match patched.as_ref() {
            Some(snap) => self.render_cards(frame, layout[2], snap),
            None => self.render_waiting(frame, layout[2]),
        }

        self.render_editor(frame, area);
    }

    fn capturing(&self) -> bool {
        self.editor.is_some()
    }

    fn id(&self) -> &str {
        "dashboard"
    }
}
