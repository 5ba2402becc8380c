//! Upload screen: stage a notes file, pick subject and chapter, generate.
//!
//! Fields are walked with ↑/↓. The file field takes a typed or pasted path;
//! the path is only validated once confirmed (the session stages it).

use std::path::PathBuf;

use ratatui::crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    session::UploadForm,
    theme::{
        style_muted, style_secondary, style_title, C_ACCENT, C_ERROR, C_MUTED,
        C_PANEL_BORDER, C_PANEL_BORDER_FOCUSED, C_PLAYING, C_PRIMARY, C_SELECTION_BG,
    },
    view::Screen,
    widgets::{
        pane_chrome::pane_chrome,
        text_input::{InputAction, TextInput},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    File,
    Subject,
    Chapter,
    Generate,
}

const FIELDS: [Field; 4] = [Field::File, Field::Subject, Field::Chapter, Field::Generate];

/// Turn what the user typed or pasted into a path: surrounding quotes and
/// `file://` are dropped and a leading `~` expands to the home directory.
pub fn resolve_path(raw: &str) -> Option<PathBuf> {
    let trimmed = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim_start_matches("file://");
    if trimmed.is_empty() {
        return None;
    }
    if let Some(rest) = trimmed.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return Some(home.join(rest));
        }
    }
    Some(PathBuf::from(trimmed))
}

pub struct UploadPanel {
    field: usize,
    file_input: TextInput,
    chapter_input: TextInput,
    field_rows: Vec<(u16, Field)>,
}

impl UploadPanel {
    pub fn new() -> Self {
        Self {
            field: 0,
            file_input: TextInput::new("path: ", "type or paste a path, Enter to stage"),
            chapter_input: TextInput::new("", "e.g., Newton's Laws"),
            field_rows: Vec::new(),
        }
    }

    fn current(&self) -> Field {
        FIELDS[self.field]
    }

    fn form<'a>(state: &'a AppState) -> Option<&'a UploadForm> {
        match state.screen {
            Screen::Upload { form } => Some(form),
            _ => None,
        }
    }

    fn activate(&mut self, state: &AppState) -> Vec<Action> {
        match self.current() {
            Field::File => {
                self.file_input.activate();
                vec![]
            }
            Field::Subject => vec![Action::CycleSubject(1)],
            Field::Chapter => {
                if let Some(form) = Self::form(state) {
                    self.chapter_input.set_value(&form.chapter);
                }
                self.chapter_input.activate();
                vec![]
            }
            Field::Generate => {
                if Self::form(state).is_some_and(UploadForm::can_submit) {
                    vec![Action::Submit]
                } else {
                    vec![]
                }
            }
        }
    }

    fn stage(path: &str) -> Vec<Action> {
        resolve_path(path)
            .map(|p| vec![Action::StageFile(p)])
            .unwrap_or_default()
    }
}

impl Component for UploadPanel {
    fn id(&self) -> ComponentId {
        ComponentId::Upload
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }

        if self.file_input.active {
            return match self.file_input.handle_key(key) {
                InputAction::Confirmed(path) => {
                    self.file_input.clear();
                    Self::stage(&path)
                }
                _ => vec![],
            };
        }
        if self.chapter_input.active {
            return match self.chapter_input.handle_key(key) {
                InputAction::Changed(text) | InputAction::Confirmed(text) => {
                    vec![Action::SetChapter(text)]
                }
                _ => vec![],
            };
        }

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.field = self.field.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                self.field = (self.field + 1).min(FIELDS.len() - 1)
            }
            KeyCode::Left | KeyCode::Char('h') if self.current() == Field::Subject => {
                return vec![Action::CycleSubject(-1)];
            }
            KeyCode::Right | KeyCode::Char('l') if self.current() == Field::Subject => {
                return vec![Action::CycleSubject(1)];
            }
            KeyCode::Enter => return self.activate(state),
            KeyCode::Char('x') => return vec![Action::ClearFile],
            KeyCode::Char('g') => {
                self.field = FIELDS.len() - 1;
                return self.activate(state);
            }
            _ => {}
        }
        vec![]
    }

    fn handle_mouse(&mut self, event: MouseEvent, _area: Rect, state: &AppState) -> Vec<Action> {
        if !matches!(event.kind, MouseEventKind::Down(MouseButton::Left)) {
            return vec![];
        }
        let hit = self
            .field_rows
            .iter()
            .find(|(row, _)| *row == event.row)
            .map(|(_, field)| *field);
        match hit {
            Some(field) => {
                self.file_input.deactivate();
                self.chapter_input.deactivate();
                self.field = FIELDS.iter().position(|f| *f == field).unwrap_or(0);
                self.activate(state)
            }
            None => vec![],
        }
    }

    fn handle_paste(&mut self, text: &str, _state: &AppState) -> Vec<Action> {
        if self.chapter_input.active {
            return match self.chapter_input.paste(text) {
                InputAction::Changed(value) => vec![Action::SetChapter(value)],
                _ => vec![],
            };
        }
        // A paste anywhere else is a dropped file.
        self.file_input.deactivate();
        self.file_input.clear();
        self.field = 0;
        Self::stage(text)
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let block = pane_chrome("new podcast", Some('2'), focused, None);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some(form) = Self::form(state) else {
            return;
        };
        if !self.chapter_input.active && self.chapter_input.text() != form.chapter {
            self.chapter_input.set_value(&form.chapter);
        }

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // heading
                Constraint::Length(6), // drop zone
                Constraint::Length(2), // subject
                Constraint::Length(2), // chapter
                Constraint::Length(2), // generate
                Constraint::Min(0),    // tips
            ])
            .split(inner);
        self.field_rows.clear();

        frame.render_widget(
            Paragraph::new(vec![
                Line::from(Span::styled(" Create New Podcast", style_title())),
                Line::from(Span::styled(
                    " Upload your notes and let AI do the magic ✨",
                    style_secondary(),
                )),
            ]),
            rows[0],
        );

        self.draw_drop_zone(frame, rows[1], focused, form);
        self.draw_subject(frame, rows[2], focused, form);
        self.draw_chapter(frame, rows[3], focused);
        self.draw_generate(frame, rows[4], focused, form);

        frame.render_widget(
            Paragraph::new(vec![
                Line::from(Span::styled(" Tips for best results", Style::default().fg(C_PLAYING))),
                Line::from(Span::styled(" • Clear, readable handwriting works best", style_muted())),
                Line::from(Span::styled(" • Include chapter headings and key formulas", style_muted())),
                Line::from(Span::styled(" • Max 10 pages for focused podcasts", style_muted())),
            ]),
            rows[5],
        );
    }

    fn captures_text(&self) -> bool {
        self.file_input.active || self.chapter_input.active
    }
}

impl UploadPanel {
    fn field_style(&self, field: Field, focused: bool) -> Style {
        if focused && self.current() == field {
            Style::default().fg(C_PRIMARY).bg(C_SELECTION_BG).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(C_PRIMARY)
        }
    }

    fn draw_drop_zone(&mut self, frame: &mut Frame, area: Rect, focused: bool, form: &UploadForm) {
        let selected = focused && self.current() == Field::File;
        let zone = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(if selected {
                C_PANEL_BORDER_FOCUSED
            } else {
                C_PANEL_BORDER
            }));
        let inner = zone.inner(area);
        frame.render_widget(zone, area);
        for row in area.y..area.y + area.height {
            self.field_rows.push((row, Field::File));
        }

        let mut lines = match &form.staged {
            Some(file) => vec![
                Line::from(vec![
                    Span::styled(if file.is_pdf() { " PDF  " } else { " IMG  " }, Style::default().fg(C_PLAYING)),
                    Span::styled(file.file_name.clone(), style_title()),
                ]),
                Line::from(Span::styled(format!("      {}", file.size_mb()), style_secondary())),
                Line::from(Span::styled("      x Remove", Style::default().fg(C_ERROR))),
            ],
            None => vec![
                Line::from(Span::styled(" Drop your notes here", style_title())),
                Line::from(Span::styled(" or paste a path, Enter to type one", style_secondary())),
                Line::from(Span::styled(" Supports: PDF, JPG, PNG (Max 20MB)", Style::default().fg(C_MUTED))),
            ],
        };
        if self.file_input.active {
            lines.truncate(inner.height.saturating_sub(1) as usize);
        }
        frame.render_widget(Paragraph::new(lines), inner);

        if self.file_input.active && inner.height > 0 {
            let input_area = Rect {
                y: inner.y + inner.height - 1,
                height: 1,
                ..inner
            };
            self.file_input.draw(frame, input_area);
        }
    }

    fn draw_subject(&mut self, frame: &mut Frame, area: Rect, focused: bool, form: &UploadForm) {
        self.field_rows.push((area.y, Field::Subject));
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(" Subject                    ", style_secondary()),
                Span::styled(
                    format!(" ‹ {} › ", form.subject_name()),
                    self.field_style(Field::Subject, focused),
                ),
            ])),
            area,
        );
    }

    fn draw_chapter(&mut self, frame: &mut Frame, area: Rect, focused: bool) {
        self.field_rows.push((area.y, Field::Chapter));
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(28), Constraint::Min(0)])
            .split(Rect { height: 1, ..area });
        frame.render_widget(
            Paragraph::new(Span::styled(
                " Chapter / Topic (Optional)",
                if focused && self.current() == Field::Chapter {
                    style_title()
                } else {
                    style_secondary()
                },
            )),
            cols[0],
        );
        self.chapter_input.draw(frame, cols[1]);
    }

    fn draw_generate(&mut self, frame: &mut Frame, area: Rect, focused: bool, form: &UploadForm) {
        self.field_rows.push((area.y, Field::Generate));
        let style = if !form.can_submit() {
            Style::default().fg(C_MUTED)
        } else if focused && self.current() == Field::Generate {
            Style::default().fg(C_ACCENT).bg(C_SELECTION_BG).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD)
        };
        frame.render_widget(
            Paragraph::new(Span::styled(" ✨ Generate Podcast ", style)),
            area,
        );
    }
}
