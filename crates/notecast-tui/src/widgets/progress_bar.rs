//! Smooth Unicode progress bars: the player's seek bar and the processing
//! screen's percentage bar.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::theme::{C_MUTED, C_PLAYING, C_SECONDARY, C_SEPARATOR};
use crate::transport::format_time;

const BLOCKS: [char; 9] = [' ', '▏', '▎', '▍', '▌', '▋', '▊', '▉', '█'];

/// `width` cells filled to `fraction` (clamped to 0..=1) in eighths.
pub fn fill_cells(fraction: f64, width: usize) -> String {
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let eighths = (fraction * width as f64 * 8.0) as usize;
    let full_blocks = eighths / 8;
    let partial = eighths % 8;

    let mut bar = String::with_capacity(width * 3);
    for _ in 0..full_blocks {
        bar.push('█');
    }
    if full_blocks < width {
        bar.push(BLOCKS[partial]);
        for _ in (full_blocks + 1)..width {
            bar.push(' ');
        }
    }
    bar
}

/// Render `elapsed ▕bar▏ total` and return the rect the bar occupies so
/// clicks can be mapped back to a position.
pub fn draw_seek_bar(frame: &mut Frame, area: Rect, current: f64, duration: f64) -> Rect {
    if area.width < 4 || area.height == 0 {
        return Rect::default();
    }
    let left = format!("{} ", format_time(current));
    let right = format!(" {}", format_time(duration));
    let label_w = (left.chars().count() + right.chars().count()) as u16;
    let bar_w = area.width.saturating_sub(label_w).max(1);

    let progress = if duration > 0.0 { current / duration } else { 0.0 };
    let line = Line::from(vec![
        Span::styled(left.clone(), Style::default().fg(C_SECONDARY)),
        Span::styled(
            fill_cells(progress, bar_w as usize),
            Style::default().fg(C_PLAYING).bg(C_SEPARATOR),
        ),
        Span::styled(right, Style::default().fg(C_MUTED)),
    ]);
    frame.render_widget(Paragraph::new(line), area);

    Rect {
        x: area.x + left.chars().count() as u16,
        y: area.y,
        width: bar_w.min(area.width),
        height: 1,
    }
}

/// Fraction of `bar` at terminal column `col`, or `None` outside it.
pub fn fraction_at(bar: Rect, col: u16) -> Option<f64> {
    if bar.width == 0 || col < bar.x || col >= bar.x + bar.width {
        return None;
    }
    let offset = (col - bar.x) as f64 + 0.5;
    Some((offset / bar.width as f64).clamp(0.0, 1.0))
}

/// Percentage bar for job progress. The fill saturates at 100 but the caller
/// prints the raw number, so out-of-range values from the server stay visible.
pub fn draw_percent_bar(frame: &mut Frame, area: Rect, percent: i64, color: Color) {
    if area.width == 0 || area.height == 0 {
        return;
    }
    let fraction = percent as f64 / 100.0;
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            fill_cells(fraction, area.width as usize),
            Style::default().fg(color).bg(C_SEPARATOR),
        ))),
        area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_cells_eighths() {
        assert_eq!(fill_cells(0.0, 4), "    ");
        assert_eq!(fill_cells(1.0, 4), "████");
        assert_eq!(fill_cells(0.5, 4), "██  ");
        assert_eq!(fill_cells(0.0625, 2), "▏ ");
    }

    #[test]
    fn test_fill_saturates_out_of_range() {
        assert_eq!(fill_cells(1.5, 3), "███");
        assert_eq!(fill_cells(-0.2, 3), "   ");
        assert_eq!(fill_cells(f64::NAN, 3), "   ");
    }

    #[test]
    fn test_fraction_at_maps_columns() {
        let bar = Rect::new(10, 0, 10, 1);
        assert_eq!(fraction_at(bar, 9), None);
        assert_eq!(fraction_at(bar, 20), None);
        assert_eq!(fraction_at(bar, 10), Some(0.05));
        assert_eq!(fraction_at(bar, 19), Some(0.95));
    }
}
