//! Processing screen: live job status while the server builds the podcast.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, MouseEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

use notecast_proto::model::{stage_index, JobStatus, ProcessingStatus, STAGES};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{style_muted, style_secondary, style_title, C_ERROR, C_MUTED, C_PENDING, C_PLAYING, C_PRIMARY},
    view::{Screen, View},
    widgets::{pane_chrome::pane_chrome, progress_bar::draw_percent_bar},
};

pub fn status_title(status: Option<&ProcessingStatus>) -> &'static str {
    match status.map(|s| s.status) {
        Some(JobStatus::Completed) => "Podcast Ready! 🎉",
        Some(JobStatus::Failed) => "Oops! Something went wrong",
        _ => "Creating Your Podcast...",
    }
}

pub fn status_message(status: Option<&ProcessingStatus>) -> &str {
    match status {
        Some(s) if !s.message.is_empty() => &s.message,
        _ => "Please wait...",
    }
}

/// Raw server percentage; values above 100 are shown as sent.
pub fn progress_label(progress: i64) -> String {
    format!("{}%", progress)
}

/// Marker for each displayed stage relative to the current one.
pub fn stage_marker(index: usize, current: usize) -> &'static str {
    if index < current {
        "✓"
    } else if index == current {
        "●"
    } else {
        "○"
    }
}

pub struct ProcessingPanel;

impl ProcessingPanel {
    pub fn new() -> Self {
        Self
    }

    fn status<'a>(state: &'a AppState) -> Option<&'a ProcessingStatus> {
        match state.screen {
            Screen::Processing { status } => status,
            _ => None,
        }
    }
}

impl Component for ProcessingPanel {
    fn id(&self) -> ComponentId {
        ComponentId::Processing
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        let failed = Self::status(state).is_some_and(|s| s.status == JobStatus::Failed);
        match key.code {
            KeyCode::Char('r') if failed => vec![Action::Navigate(View::Upload)],
            KeyCode::Char('h') => vec![Action::Navigate(View::Home)],
            _ => vec![],
        }
    }

    fn handle_mouse(&mut self, _event: MouseEvent, _area: Rect, _state: &AppState) -> Vec<Action> {
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let block = pane_chrome("processing", Some('3'), focused, None);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let status = Self::status(state);
        let job_status = status.map(|s| s.status).unwrap_or_default();
        let progress = status.map(|s| s.progress).unwrap_or(0);
        let current = stage_index(status.and_then(|s| s.stage));

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(STAGES.len() as u16),
                Constraint::Min(0),
            ])
            .split(inner);

        let title_color = match job_status {
            JobStatus::Completed => C_PLAYING,
            JobStatus::Failed => C_ERROR,
            _ => C_PRIMARY,
        };
        frame.render_widget(
            Paragraph::new(vec![
                Line::from(Span::styled(
                    format!(" {}", status_title(status)),
                    Style::default().fg(title_color).add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(format!(" {}", status_message(status)), style_secondary())),
            ]),
            rows[0],
        );

        let label = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(8)])
            .split(rows[1]);
        frame.render_widget(Paragraph::new(Span::styled(" Progress", style_secondary())), label[0]);
        frame.render_widget(
            Paragraph::new(Span::styled(
                progress_label(progress),
                Style::default().fg(C_PLAYING).add_modifier(Modifier::BOLD),
            ))
            .right_aligned(),
            label[1],
        );
        let bar = Rect {
            x: rows[2].x + 1,
            width: rows[2].width.saturating_sub(2),
            ..rows[2]
        };
        draw_percent_bar(frame, bar, progress, C_PLAYING);

        let processing = job_status == JobStatus::Processing;
        let stages: Vec<Line> = STAGES
            .iter()
            .enumerate()
            .map(|(i, (_, label))| {
                let reached = i <= current;
                let marker_style = if i < current {
                    Style::default().fg(C_PLAYING)
                } else if i == current {
                    Style::default().fg(C_PENDING)
                } else {
                    Style::default().fg(C_MUTED)
                };
                let mut spans = vec![
                    Span::styled(format!("  {} ", stage_marker(i, current)), marker_style),
                    Span::styled(*label, if reached { style_title() } else { style_muted() }),
                ];
                if i == current && processing {
                    spans.push(Span::styled("  …", Style::default().fg(C_PLAYING)));
                }
                Line::from(spans)
            })
            .collect();
        frame.render_widget(Paragraph::new(stages), rows[4]);

        let mut footer = Vec::new();
        if job_status == JobStatus::Failed {
            let error = status
                .and_then(|s| s.error.as_deref())
                .filter(|e| !e.is_empty())
                .unwrap_or("An unexpected error occurred");
            footer.push(Line::from(""));
            footer.push(Line::from(Span::styled(format!(" {}", error), Style::default().fg(C_ERROR))));
            footer.push(Line::from(Span::styled(" r  try again   h  home", style_muted())));
        } else if job_status == JobStatus::Completed {
            footer.push(Line::from(""));
            footer.push(Line::from(Span::styled(" Opening the player…", style_muted())));
        }
        frame.render_widget(Paragraph::new(footer).wrap(Wrap { trim: false }), rows[5]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_titles_follow_job_status() {
        assert_eq!(status_title(None), "Creating Your Podcast...");
        let mut status = ProcessingStatus {
            status: JobStatus::Completed,
            ..Default::default()
        };
        assert_eq!(status_title(Some(&status)), "Podcast Ready! 🎉");
        status.status = JobStatus::Failed;
        assert_eq!(status_title(Some(&status)), "Oops! Something went wrong");
        status.status = JobStatus::Uploaded;
        assert_eq!(status_title(Some(&status)), "Creating Your Podcast...");
    }

    #[test]
    fn test_message_falls_back_when_empty() {
        assert_eq!(status_message(None), "Please wait...");
        let status = ProcessingStatus {
            message: "Reading your handwriting".into(),
            ..Default::default()
        };
        assert_eq!(status_message(Some(&status)), "Reading your handwriting");
        assert_eq!(status_message(Some(&ProcessingStatus::default())), "Please wait...");
    }

    #[test]
    fn test_stage_markers() {
        let markers: Vec<_> = (0..5).map(|i| stage_marker(i, 2)).collect();
        assert_eq!(markers, vec!["✓", "✓", "●", "○", "○"]);
    }

    #[test]
    fn test_progress_label_is_not_clamped() {
        assert_eq!(progress_label(40), "40%");
        assert_eq!(progress_label(150), "150%");
    }
}
