//! PlayerBar: bottom transport strip shown while a podcast is loaded.
//!
//! Row 1: separator. Row 2: state, title, hosts, volume slider.
//! Row 3: seek bar. Clicking the seek bar or the slider jumps there.

use ratatui::crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{style_muted, style_secondary, C_ACCENT, C_PANEL_BORDER_FOCUSED, C_PLAYING, C_PRIMARY, C_SEPARATOR},
    widgets::{
        progress_bar::{draw_seek_bar, fill_cells, fraction_at},
        status_bar::draw_separator,
    },
};

const VOLUME_STEP: f32 = 0.05;
const VOLUME_BAR_W: u16 = 10;

pub struct PlayerBar {
    seek_bar: Rect,
    volume_bar: Rect,
}

impl PlayerBar {
    pub fn new() -> Self {
        Self {
            seek_bar: Rect::default(),
            volume_bar: Rect::default(),
        }
    }
}

impl Component for PlayerBar {
    fn id(&self) -> ComponentId {
        ComponentId::PlayerBar
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release || state.current.is_none() {
            return vec![];
        }
        match key.code {
            KeyCode::Left | KeyCode::Char('h') => vec![Action::Skip(-state.skip_secs)],
            KeyCode::Right | KeyCode::Char('l') => vec![Action::Skip(state.skip_secs)],
            KeyCode::Up | KeyCode::Char('k') => {
                vec![Action::Volume(state.playback.volume + VOLUME_STEP)]
            }
            KeyCode::Down | KeyCode::Char('j') => {
                vec![Action::Volume(state.playback.volume - VOLUME_STEP)]
            }
            KeyCode::Enter => vec![Action::TogglePlay],
            KeyCode::Home | KeyCode::Char('0') => vec![Action::SeekTo(0.0)],
            _ => vec![],
        }
    }

    fn handle_mouse(&mut self, event: MouseEvent, _area: Rect, state: &AppState) -> Vec<Action> {
        if state.current.is_none() {
            return vec![];
        }
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) | MouseEventKind::Drag(MouseButton::Left) => {
                if event.row == self.seek_bar.y {
                    if let Some(f) = fraction_at(self.seek_bar, event.column) {
                        return vec![Action::SeekTo(f * state.playback.duration)];
                    }
                }
                if event.row == self.volume_bar.y {
                    if let Some(f) = fraction_at(self.volume_bar, event.column) {
                        return vec![Action::Volume(f as f32)];
                    }
                }
                vec![]
            }
            MouseEventKind::ScrollUp => vec![Action::Volume(state.playback.volume + VOLUME_STEP)],
            MouseEventKind::ScrollDown => vec![Action::Volume(state.playback.volume - VOLUME_STEP)],
            _ => vec![],
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let Some(podcast) = state.current else {
            self.seek_bar = Rect::default();
            self.volume_bar = Rect::default();
            return;
        };
        if area.height < 3 {
            return;
        }
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1), Constraint::Length(1)])
            .split(area);

        if focused {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    "━".repeat(rows[0].width as usize),
                    Style::default().fg(C_PANEL_BORDER_FOCUSED),
                )),
                rows[0],
            );
        } else {
            draw_separator(frame, rows[0]);
        }

        let playback = state.playback;
        let vol_label = if playback.muted {
            "🔇 ".to_string()
        } else {
            "🔊 ".to_string()
        };
        let pct = format!(" {:>3}%", (playback.effective_volume() * 100.0).round() as u32);
        let right_w = vol_label.chars().count() as u16 + 1 + VOLUME_BAR_W + pct.len() as u16 + 1;
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(right_w)])
            .split(rows[1]);

        let (icon, icon_color) = if playback.is_playing {
            (" ▶ ", C_PLAYING)
        } else {
            (" ⏸ ", C_ACCENT)
        };
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(icon, Style::default().fg(icon_color).add_modifier(Modifier::BOLD)),
                Span::styled(
                    podcast.title.clone(),
                    Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
                ),
                Span::styled("  Didi & Bhaiya", style_secondary()),
            ])),
            cols[0],
        );

        // "🔊 " renders two cells wide.
        let label_w = 3;
        self.volume_bar = Rect {
            x: cols[1].x + label_w + 1,
            y: cols[1].y,
            width: VOLUME_BAR_W.min(cols[1].width.saturating_sub(label_w + 1)),
            height: 1,
        };
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(vol_label, style_muted()),
                Span::raw("▕"),
                Span::styled(
                    fill_cells(playback.effective_volume() as f64, VOLUME_BAR_W as usize),
                    Style::default().fg(C_ACCENT).bg(C_SEPARATOR),
                ),
                Span::raw("▏"),
                Span::styled(pct, style_muted()),
            ])),
            cols[1],
        );

        let seek_area = Rect {
            x: rows[2].x + 1,
            width: rows[2].width.saturating_sub(2),
            ..rows[2]
        };
        self.seek_bar = draw_seek_bar(frame, seek_area, playback.current_time, playback.duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notecast_proto::model::Podcast;
    use ratatui::crossterm::event::KeyModifiers;

    use crate::transport::PlaybackState;
    use crate::view::{NavContext, Screen};

    fn click(column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[test]
    fn test_seek_click_and_keys() {
        let podcast = Podcast {
            job_id: "aaaa1111".into(),
            title: "Physics - Optics".into(),
            duration: 200.0,
            ..Default::default()
        };
        let library = vec![podcast.clone()];
        let mut playback = PlaybackState::new(0.5);
        playback.duration = 200.0;
        let downloads = Default::default();
        let state = AppState {
            screen: Screen::Player { podcast: &podcast },
            nav: NavContext::default(),
            library: &library,
            current: Some(&podcast),
            playback: &playback,
            downloads: &downloads,
            polling: false,
            tui_log_lines: &[],
            skip_secs: 10.0,
        };

        let mut bar = PlayerBar::new();
        bar.seek_bar = Rect::new(0, 2, 10, 1);

        let actions = bar.handle_mouse(click(4, 2), Rect::default(), &state);
        assert!(matches!(actions.as_slice(), [Action::SeekTo(s)] if (*s - 90.0).abs() < 1e-9));
        assert!(bar.handle_mouse(click(4, 1), Rect::default(), &state).is_empty());

        let key = |code| KeyEvent::new(code, KeyModifiers::NONE);
        assert!(matches!(
            bar.handle_key(key(KeyCode::Left), &state).as_slice(),
            [Action::Skip(d)] if *d == -10.0
        ));
        assert!(matches!(
            bar.handle_key(key(KeyCode::Up), &state).as_slice(),
            [Action::Volume(v)] if (*v - 0.55).abs() < 1e-6
        ));
        assert!(matches!(
            bar.handle_key(key(KeyCode::Home), &state).as_slice(),
            [Action::SeekTo(s)] if *s == 0.0
        ));
    }
}
