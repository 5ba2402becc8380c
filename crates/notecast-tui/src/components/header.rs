//! Header: brand plus the navigation tab bar.
//!
//! Row 1: brand, one tab per enterable view (library count badge on
//! "Your Library"), polling indicator on the right.
//! Row 2: separator.
//!
//! Not focusable; number keys and clicks drive navigation.

use ratatui::crossterm::event::{MouseButton, MouseEvent, MouseEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::{
    action::Action,
    app_state::AppState,
    theme::{C_ACCENT, C_MUTED, C_NUMBER_HINT, C_PENDING, C_PRIMARY, C_SECONDARY},
    view::View,
    widgets::status_bar::draw_separator,
};

const BRAND: &str = " ♪ notecast ";

#[derive(Default)]
pub struct Header {
    /// Column ranges of the drawn tabs, for click hit-testing.
    tab_hits: Vec<(u16, u16, View)>,
    row: u16,
}

/// Tab caption, with the library size on the library tab.
pub fn tab_caption(view: View, library_len: usize) -> String {
    match view {
        View::Library if library_len > 0 => format!("{} ({})", view.label(), library_len),
        _ => view.label().to_string(),
    }
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_mouse(&self, event: MouseEvent) -> Vec<Action> {
        if !matches!(event.kind, MouseEventKind::Down(MouseButton::Left)) || event.row != self.row {
            return vec![];
        }
        self.tab_hits
            .iter()
            .find(|(start, end, _)| event.column >= *start && event.column < *end)
            .map(|(_, _, view)| vec![Action::Navigate(*view)])
            .unwrap_or_default()
    }

    pub fn draw(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
        if area.height == 0 {
            return;
        }
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(0)])
            .split(area);
        self.row = rows[0].y;
        self.tab_hits.clear();

        let mut spans = vec![Span::styled(
            BRAND,
            Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD),
        )];
        let mut x = rows[0].x + BRAND.width() as u16;
        let current = state.view();

        for (i, view) in View::TABS.iter().enumerate() {
            if !view.can_enter(state.nav) {
                continue;
            }
            let hint = format!(" {} ", i + 1);
            let caption = format!("{} ", tab_caption(*view, state.library.len()));
            let style = if *view == current {
                Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
            } else {
                Style::default().fg(C_SECONDARY)
            };
            let start = x;
            x += (hint.width() + caption.width()) as u16;
            self.tab_hits.push((start, x, *view));
            spans.push(Span::styled(hint, Style::default().fg(C_NUMBER_HINT)));
            spans.push(Span::styled(caption, style));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), rows[0]);

        let status = if state.polling {
            Span::styled("● processing ", Style::default().fg(C_PENDING))
        } else {
            Span::styled("Hinglish study podcasts ", Style::default().fg(C_MUTED))
        };
        frame.render_widget(Paragraph::new(Line::from(status).right_aligned()), rows[0]);

        if rows[1].height > 0 {
            draw_separator(frame, rows[1]);
        }
    }
}
