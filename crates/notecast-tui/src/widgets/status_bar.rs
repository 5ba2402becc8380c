//! Status bar: bottom line with the input mode and the keybindings for the
//! current screen.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::theme::{C_INPUT_FG, C_MUTED, C_SECONDARY, C_SEPARATOR};
use crate::view::View;

pub fn draw_separator(frame: &mut Frame, area: Rect) {
    let line = Line::from(Span::styled(
        "─".repeat(area.width as usize),
        Style::default().fg(C_SEPARATOR),
    ));
    frame.render_widget(Paragraph::new(line), area);
}

fn keys_for(view: View) -> &'static str {
    match view {
        View::Home => "↑↓ select  Enter play  n new podcast  a see all  d demo",
        View::Upload => "↑↓ field  Enter edit/stage/generate  ←→ subject  x clear file",
        View::Processing => "r try again  h home",
        View::Library => "↑↓ select  Enter play  x delete  s save  y copy link  / filter  r refresh",
        View::Player => "↑↓ scroll script  s save  y copy link",
    }
}

pub fn draw_keys_bar(frame: &mut Frame, area: Rect, view: View, typing: bool) {
    let (label, color, keys) = if typing {
        ("INPUT", C_INPUT_FG, "type  Enter confirm  Esc clear/close  Tab next pane")
    } else {
        (
            "NORMAL",
            C_SECONDARY,
            keys_for(view),
        )
    };

    let mut spans = vec![Span::styled(
        format!(" {} ", label),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )];
    spans.push(Span::styled(format!(" {}", keys), Style::default().fg(C_MUTED)));
    if !typing {
        spans.push(Span::styled(
            "  space play  ,/. skip  -/+ vol  m mute  1-5 tabs  L logs  ? help  q quit",
            Style::default().fg(C_MUTED),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
