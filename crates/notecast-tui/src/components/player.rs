//! Player screen: the loaded podcast with its script.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, MouseEvent, MouseEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Wrap},
    Frame,
};

use notecast_proto::model::Podcast;

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{style_muted, style_secondary, style_title, C_PLAYING, CARD_COLORS},
    view::Screen,
    widgets::pane_chrome::pane_chrome,
};

/// Subject shown on the cover: the title up to the first `" - "`.
pub fn subject_of(title: &str) -> &str {
    match title.split(" - ").next() {
        Some(subject) if !subject.trim().is_empty() => subject,
        _ => "Study",
    }
}

pub struct PlayerPanel {
    scroll: u16,
    /// job_id the scroll position belongs to.
    scrolled_for: String,
}

impl PlayerPanel {
    pub fn new() -> Self {
        Self {
            scroll: 0,
            scrolled_for: String::new(),
        }
    }

    fn podcast<'a>(state: &'a AppState) -> Option<&'a Podcast> {
        match state.screen {
            Screen::Player { podcast } => Some(podcast),
            _ => None,
        }
    }
}

impl Component for PlayerPanel {
    fn id(&self) -> ComponentId {
        ComponentId::Player
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        let Some(podcast) = Self::podcast(state) else {
            return vec![];
        };
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => self.scroll = self.scroll.saturating_add(1),
            KeyCode::PageUp => self.scroll = self.scroll.saturating_sub(10),
            KeyCode::PageDown => self.scroll = self.scroll.saturating_add(10),
            KeyCode::Home | KeyCode::Char('g') => self.scroll = 0,
            KeyCode::Char('s') => return vec![Action::Download(podcast.job_id.clone())],
            KeyCode::Char('y') => return vec![Action::CopyLink(podcast.job_id.clone())],
            _ => {}
        }
        vec![]
    }

    fn handle_mouse(&mut self, event: MouseEvent, _area: Rect, _state: &AppState) -> Vec<Action> {
        match event.kind {
            MouseEventKind::ScrollUp => self.scroll = self.scroll.saturating_sub(1),
            MouseEventKind::ScrollDown => self.scroll = self.scroll.saturating_add(1),
            _ => {}
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let block = pane_chrome("now playing", Some('5'), focused, None);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some(podcast) = Self::podcast(state) else {
            return;
        };
        if self.scrolled_for != podcast.job_id {
            self.scrolled_for = podcast.job_id.clone();
            self.scroll = 0;
        }

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Length(3), Constraint::Min(0)])
            .split(inner);

        let color = CARD_COLORS[podcast.color_index(CARD_COLORS.len())];
        let cover_w = 24.min(rows[0].width);
        let cover = Rect {
            x: rows[0].x + (rows[0].width - cover_w) / 2,
            width: cover_w,
            ..rows[0]
        };
        frame.render_widget(
            Paragraph::new(vec![
                Line::from(Span::styled("🎧", Style::default().fg(color))),
                Line::from(Span::styled(subject_of(&podcast.title).to_string(), style_secondary())),
            ])
            .centered()
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(Style::default().fg(color)),
            ),
            cover,
        );

        frame.render_widget(
            Paragraph::new(vec![
                Line::from(Span::styled(podcast.title.clone(), style_title())),
                Line::from(Span::styled(
                    format!("{} min podcast", podcast.duration_minutes()),
                    style_secondary(),
                )),
            ])
            .centered(),
            rows[1],
        );

        let Some(script) = podcast.script.as_deref().filter(|s| !s.is_empty()) else {
            return;
        };
        let script_block = Block::default()
            .borders(Borders::TOP)
            .border_style(style_muted())
            .title(Span::styled(
                " Script Preview ",
                Style::default().fg(C_PLAYING).add_modifier(Modifier::BOLD),
            ));
        let script_area = script_block.inner(rows[2]);
        frame.render_widget(script_block, rows[2]);

        let lines: Vec<Line> = script
            .lines()
            .map(|l| Line::from(Span::styled(format!(" {}", l), style_secondary())))
            .collect();
        let max_scroll = (lines.len() as u16).saturating_sub(script_area.height);
        self.scroll = self.scroll.min(max_scroll);
        frame.render_widget(
            Paragraph::new(lines)
                .wrap(Wrap { trim: false })
                .scroll((self.scroll, 0)),
            script_area,
        );
    }
}
