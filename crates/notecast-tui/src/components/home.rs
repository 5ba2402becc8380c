//! Home screen: hero banner, feature cards and the most recent podcasts.

use ratatui::crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use notecast_proto::model::Podcast;

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{
        style_muted, style_secondary, style_selected, style_title, C_ACCENT, C_MUTED,
        C_PANEL_BORDER, C_PLAYING, CARD_COLORS,
    },
    view::{Screen, View},
    widgets::pane_chrome::pane_chrome,
};

const FEATURES: [(&str, &str); 3] = [
    ("Upload Notes", "PDF, Image, Handwritten"),
    ("AI Magic", "Hinglish script generation"),
    ("Listen Anywhere", "Offline MP3 download"),
];

pub struct HomePanel {
    selected: usize,
    /// Inner rect of the recent list from the last draw.
    recent_area: Rect,
}

impl HomePanel {
    pub fn new() -> Self {
        Self {
            selected: 0,
            recent_area: Rect::default(),
        }
    }

    fn recent<'a>(state: &'a AppState) -> &'a [Podcast] {
        match state.screen {
            Screen::Home { recent } => recent,
            _ => &[],
        }
    }

    fn play_selected(&self, state: &AppState) -> Vec<Action> {
        Self::recent(state)
            .get(self.selected)
            .map(|p| vec![Action::PlayPodcast(p.clone())])
            .unwrap_or_default()
    }
}

impl Component for HomePanel {
    fn id(&self) -> ComponentId {
        ComponentId::Home
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        let count = Self::recent(state).len();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if count > 0 {
                    self.selected = (self.selected + 1).min(count - 1);
                }
            }
            KeyCode::Enter => return self.play_selected(state),
            KeyCode::Char('n') => return vec![Action::Navigate(View::Upload)],
            KeyCode::Char('a') => return vec![Action::Navigate(View::Library)],
            KeyCode::Char('d') => return vec![Action::TryDemo],
            _ => {}
        }
        vec![]
    }

    fn handle_mouse(&mut self, event: MouseEvent, _area: Rect, state: &AppState) -> Vec<Action> {
        let inside = event.column >= self.recent_area.x
            && event.column < self.recent_area.x + self.recent_area.width
            && event.row >= self.recent_area.y
            && event.row < self.recent_area.y + self.recent_area.height;
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) if inside => {
                let row = (event.row - self.recent_area.y) as usize;
                if row < Self::recent(state).len() {
                    self.selected = row;
                    return self.play_selected(state);
                }
            }
            MouseEventKind::ScrollUp => self.selected = self.selected.saturating_sub(1),
            MouseEventKind::ScrollDown => {
                let count = Self::recent(state).len();
                if count > 0 {
                    self.selected = (self.selected + 1).min(count - 1);
                }
            }
            _ => {}
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let recent = Self::recent(state);
        if self.selected >= recent.len() {
            self.selected = recent.len().saturating_sub(1);
        }

        let block = pane_chrome("home", Some('1'), focused, None);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(6),
                Constraint::Length(4),
                Constraint::Min(0),
            ])
            .split(inner);

        draw_hero(frame, rows[0]);
        draw_features(frame, rows[1]);

        if recent.is_empty() {
            self.recent_area = Rect::default();
            return;
        }

        let sections = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Min(0)])
            .split(rows[2]);
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(" Recent Podcasts", style_title()),
                Span::styled("   a  See all ›", style_muted()),
            ])),
            sections[0],
        );
        self.recent_area = sections[1];

        let lines: Vec<Line> = recent
            .iter()
            .enumerate()
            .take(sections[1].height as usize)
            .map(|(i, podcast)| {
                let color = CARD_COLORS[podcast.color_index(CARD_COLORS.len())];
                let is_current = state.current.is_some_and(|c| c.job_id == podcast.job_id);
                let marker = if is_current { "▶ " } else { "  " };
                let line = Line::from(vec![
                    Span::styled(marker, Style::default().fg(C_PLAYING)),
                    Span::styled("■ ", Style::default().fg(color)),
                    Span::styled(podcast.title.clone(), Style::default().add_modifier(Modifier::BOLD)),
                    Span::styled(
                        format!("  {} min podcast", podcast.duration_minutes()),
                        style_secondary(),
                    ),
                ]);
                if i == self.selected {
                    line.style(style_selected(focused))
                } else {
                    line
                }
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), sections[1]);
    }
}

fn draw_hero(frame: &mut Frame, area: Rect) {
    let lines = vec![
        Line::from(Span::styled(
            " 🎧 India's #1 Study App",
            Style::default().fg(C_PLAYING),
        )),
        Line::from(vec![
            Span::styled(" Turn Notes into", style_title()),
            Span::styled(
                " Hinglish Podcasts",
                Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(Span::styled(
            " Upload your JEE/NEET notes → Get AI-generated audio with Didi & Bhaiya explaining concepts.",
            style_secondary(),
        )),
        Line::from(Span::styled(
            " Study hands-free during your commute! 🚌",
            style_secondary(),
        )),
        Line::from(vec![
            Span::styled(" n ", Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD)),
            Span::styled("Create Your First Podcast", style_title()),
            Span::styled("   d ", Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD)),
            Span::styled("Try the demo", style_secondary()),
        ]),
    ];
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), area);
}

fn draw_features(frame: &mut Frame, area: Rect) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 3); 3])
        .split(area);
    for (i, (title, caption)) in FEATURES.iter().enumerate() {
        let card = Paragraph::new(vec![
            Line::from(Span::styled(
                *title,
                Style::default().fg(CARD_COLORS[i + 1]).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(*caption, Style::default().fg(C_MUTED))),
        ])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(C_PANEL_BORDER)),
        );
        frame.render_widget(card, cols[i]);
    }
}
