//! Library screen: every podcast on the server, filterable, newest first as
//! the server orders them.

use std::time::Instant;

use ratatui::crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use notecast_proto::model::Podcast;

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{style_muted, style_secondary, style_selected, style_title, C_MUTED, C_PENDING, C_PLAYING, CARD_COLORS},
    view::{Screen, View},
    widgets::{
        pane_chrome::{pane_chrome, Badge},
        scrollable_list::ScrollableList,
        text_input::{InputAction, TextInput},
    },
};

/// `"{minutes} min • {date}"`; the date is omitted when it doesn't parse.
pub fn podcast_meta(podcast: &Podcast) -> String {
    match podcast.created_date() {
        Some(date) => format!("{} min • {}", podcast.duration_minutes(), date.format("%d/%m/%Y")),
        None => format!("{} min", podcast.duration_minutes()),
    }
}

pub struct LibraryPanel {
    list: ScrollableList<Podcast>,
    filter_input: TextInput,
    last_click: Option<(usize, Instant)>,
    list_area: Rect,
}

impl LibraryPanel {
    pub fn new() -> Self {
        Self {
            list: ScrollableList::new(|p: &Podcast, q: &str| {
                p.title.to_lowercase().contains(&q.to_lowercase())
            }),
            filter_input: TextInput::new("/ ", "filter by title"),
            last_click: None,
            list_area: Rect::default(),
        }
    }

    /// Pull the session's library into the list when it changed.
    fn sync(&mut self, state: &AppState) {
        let podcasts = match state.screen {
            Screen::Library { podcasts } => podcasts,
            _ => state.library,
        };
        if self.list.items.as_slice() != podcasts {
            self.list
                .set_items_keep(podcasts.to_vec(), |a, b| a.job_id == b.job_id);
        }
    }

    fn selected_id(&self) -> Option<String> {
        self.list.selected_item().map(|p| p.job_id.clone())
    }
}

impl Component for LibraryPanel {
    fn id(&self) -> ComponentId {
        ComponentId::Library
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        self.sync(state);

        if self.filter_input.active {
            match key.code {
                KeyCode::Up => {
                    self.list.select_up(1);
                    return vec![];
                }
                KeyCode::Down => {
                    self.list.select_down(1);
                    return vec![];
                }
                _ => {}
            }
            match self.filter_input.handle_key(key) {
                InputAction::Changed(q) => self.list.set_filter(&q),
                InputAction::Cancelled => self.list.set_filter(""),
                InputAction::Confirmed(_) | InputAction::None => {}
            }
            return vec![];
        }

        let step = if key.modifiers.contains(KeyModifiers::SHIFT) { 5 } else { 1 };
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.list.select_up(step),
            KeyCode::Down | KeyCode::Char('j') => self.list.select_down(step),
            KeyCode::PageUp => self.list.select_up(10),
            KeyCode::PageDown => self.list.select_down(10),
            KeyCode::Home | KeyCode::Char('g') => self.list.select_first(),
            KeyCode::End | KeyCode::Char('G') => self.list.select_last(),
            KeyCode::Enter => {
                if let Some(p) = self.list.selected_item() {
                    return vec![Action::PlayPodcast(p.clone())];
                }
            }
            KeyCode::Char('x') | KeyCode::Delete => {
                if let Some(id) = self.selected_id() {
                    return vec![Action::DeletePodcast(id)];
                }
            }
            KeyCode::Char('s') => {
                if let Some(id) = self.selected_id() {
                    return vec![Action::Download(id)];
                }
            }
            KeyCode::Char('y') => {
                if let Some(id) = self.selected_id() {
                    return vec![Action::CopyLink(id)];
                }
            }
            KeyCode::Char('/') => self.filter_input.activate(),
            KeyCode::Char('r') => return vec![Action::RefreshLibrary],
            KeyCode::Char('n') if self.list.total_len() == 0 => {
                return vec![Action::Navigate(View::Upload)];
            }
            _ => {}
        }
        vec![]
    }

    fn handle_mouse(&mut self, event: MouseEvent, _area: Rect, state: &AppState) -> Vec<Action> {
        self.sync(state);
        match event.kind {
            MouseEventKind::ScrollUp => self.list.select_up(1),
            MouseEventKind::ScrollDown => self.list.select_down(1),
            MouseEventKind::Down(MouseButton::Left) => {
                if event.row < self.list_area.y || event.row >= self.list_area.y + self.list_area.height {
                    return vec![];
                }
                let row = (event.row - self.list_area.y) as usize;
                let is_double = self
                    .last_click
                    .map(|(r, t)| r == row && t.elapsed().as_millis() < 400)
                    .unwrap_or(false);
                if self.list.handle_click(row) {
                    if is_double {
                        self.last_click = None;
                        if let Some(p) = self.list.selected_item() {
                            return vec![Action::PlayPodcast(p.clone())];
                        }
                    }
                    self.last_click = Some((row, Instant::now()));
                }
            }
            _ => {}
        }
        vec![]
    }

    fn handle_paste(&mut self, text: &str, _state: &AppState) -> Vec<Action> {
        if self.filter_input.active {
            if let InputAction::Changed(q) = self.filter_input.paste(text) {
                self.list.set_filter(&q);
            }
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        self.sync(state);
        let badge_text = format!("{} podcasts", self.list.total_len());
        let block = pane_chrome(
            "Your Library",
            Some('4'),
            focused,
            Some(Badge {
                text: &badge_text,
                color: C_MUTED,
            }),
        );
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if self.list.total_len() == 0 {
            self.list_area = Rect::default();
            frame.render_widget(
                Paragraph::new(vec![
                    Line::from(""),
                    Line::from(Span::styled("  No podcasts yet", style_title())),
                    Line::from(Span::styled(
                        "  Upload your first notes to create a podcast!",
                        style_secondary(),
                    )),
                    Line::from(""),
                    Line::from(Span::styled("  n  Create Podcast", style_muted())),
                ]),
                inner,
            );
            return;
        }

        let filter_h = u16::from(self.filter_input.active || !self.list.filter.is_empty());
        self.list_area = Rect {
            height: inner.height.saturating_sub(filter_h),
            ..inner
        };

        if self.list.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled("  no podcasts match filter", style_muted())),
                self.list_area,
            );
        } else {
            let height = self.list_area.height as usize;
            self.list.ensure_visible(height);
            let selected = self.list.selected_original_index();
            let lines: Vec<Line> = self
                .list
                .visible_items(height)
                .into_iter()
                .map(|(idx, podcast)| {
                    let color = CARD_COLORS[podcast.color_index(CARD_COLORS.len())];
                    let playing = state.current.is_some_and(|c| c.job_id == podcast.job_id);
                    let downloading = state.downloads.contains(&podcast.job_id);
                    let mut spans = vec![
                        Span::styled(if playing { " ▶ " } else { "   " }, Style::default().fg(C_PLAYING)),
                        Span::styled("■ ", Style::default().fg(color)),
                        Span::styled(podcast.title.clone(), Style::default().add_modifier(Modifier::BOLD)),
                        Span::styled(format!("  {}", podcast_meta(podcast)), style_secondary()),
                    ];
                    if downloading {
                        spans.push(Span::styled("  ↓ saving", Style::default().fg(C_PENDING)));
                    }
                    let line = Line::from(spans);
                    if Some(idx) == selected {
                        line.style(style_selected(focused))
                    } else {
                        line
                    }
                })
                .collect();
            frame.render_widget(Paragraph::new(lines), self.list_area);
        }

        if filter_h > 0 {
            let filter_area = Rect {
                y: inner.y + inner.height.saturating_sub(1),
                height: 1,
                ..inner
            };
            self.filter_input.draw(frame, filter_area);
        }
    }

    fn captures_text(&self) -> bool {
        self.filter_input.active
    }
}
