//! Component trait: the interface every UI panel implements.
//!
//! - Components own their widget state (selection, scroll, text inputs).
//! - Session data arrives read-only through `AppState`.
//! - Components produce `Vec<Action>`; the App applies them to the session.

use ratatui::crossterm::event::{KeyEvent, MouseEvent};
use ratatui::{layout::Rect, Frame};

use crate::action::{Action, ComponentId};
use crate::app_state::AppState;

pub trait Component {
    fn id(&self) -> ComponentId;

    /// Handle a key event. Only called when this component has focus.
    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action>;

    fn handle_mouse(&mut self, event: MouseEvent, area: Rect, state: &AppState) -> Vec<Action>;

    /// Bracketed paste, delivered to the focused component.
    fn handle_paste(&mut self, _text: &str, _state: &AppState) -> Vec<Action> {
        Vec::new()
    }

    /// Receive an action dispatched by the App, focused or not.
    fn on_action(&mut self, _action: &Action, _state: &AppState) -> Vec<Action> {
        Vec::new()
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState);

    /// True while the component is capturing text input, which disables the
    /// single-letter global keys.
    fn captures_text(&self) -> bool {
        false
    }
}
