//! TextInput: wraps tui-input for single-line fields (file path, chapter,
//! library filter).

use ratatui::crossterm::event::{Event, KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tui_input::{backend::crossterm::EventHandler, Input};
use unicode_width::UnicodeWidthStr;

use crate::theme::{C_INPUT_BG, C_INPUT_FG, C_MUTED, C_SECONDARY};

#[derive(Debug, PartialEq)]
pub enum InputAction {
    Changed(String),
    Confirmed(String),
    Cancelled,
    None,
}

pub struct TextInput {
    input: Input,
    pub active: bool,
    prefix: &'static str,
    placeholder: String,
}

impl TextInput {
    pub fn new(prefix: &'static str, placeholder: impl Into<String>) -> Self {
        Self {
            input: Input::default(),
            active: false,
            prefix,
            placeholder: placeholder.into(),
        }
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn clear(&mut self) {
        self.input = Input::default();
    }

    pub fn set_value(&mut self, value: &str) {
        self.input = Input::new(value.to_string());
    }

    pub fn text(&self) -> &str {
        self.input.value()
    }

    pub fn is_empty(&self) -> bool {
        self.input.value().is_empty()
    }

    /// Esc clears the text first and deactivates on the second press.
    pub fn handle_key(&mut self, key: KeyEvent) -> InputAction {
        match key.code {
            KeyCode::Esc => {
                if !self.input.value().is_empty() {
                    self.input = Input::default();
                    InputAction::Changed(String::new())
                } else {
                    self.deactivate();
                    InputAction::Cancelled
                }
            }
            KeyCode::Enter => {
                self.deactivate();
                InputAction::Confirmed(self.input.value().to_string())
            }
            _ => {
                let before = self.input.value().to_string();
                self.input.handle_event(&Event::Key(key));
                if self.input.value() != before {
                    InputAction::Changed(self.input.value().to_string())
                } else {
                    InputAction::None
                }
            }
        }
    }

    /// Append pasted text, dropping a trailing newline.
    pub fn paste(&mut self, text: &str) -> InputAction {
        let mut value = self.input.value().to_string();
        value.push_str(text.trim_end_matches(['\r', '\n']));
        self.input = Input::new(value);
        InputAction::Changed(self.input.value().to_string())
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let prefix_w = self.prefix.width() as u16;
        let field_w = area.width.saturating_sub(prefix_w + 1) as usize;
        let scroll = self.input.visual_scroll(field_w);
        let value = self.input.value();

        let body = if value.is_empty() && !self.active {
            Span::styled(self.placeholder.clone(), Style::default().fg(C_MUTED))
        } else {
            let visible: String = value.chars().skip(scroll).collect();
            Span::styled(visible, Style::default().fg(C_INPUT_FG))
        };
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(self.prefix, Style::default().fg(C_SECONDARY)),
                body,
            ]))
            .style(Style::default().bg(C_INPUT_BG)),
            area,
        );

        if self.active {
            let cursor_x = area.x + prefix_w + (self.input.visual_cursor().saturating_sub(scroll)) as u16;
            frame.set_cursor_position((cursor_x.min(area.x + area.width - 1), area.y));
        }
    }
}
