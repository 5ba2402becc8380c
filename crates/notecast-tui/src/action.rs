//! Action enum: all user-initiated intents.

use std::path::PathBuf;

use notecast_proto::model::Podcast;

use crate::view::View;

/// Unique identifier for a focusable component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    Home,
    Upload,
    Processing,
    Library,
    Player,
    PlayerBar,
    LogPanel,
    HelpOverlay,
}

impl ComponentId {
    /// The main pane that renders `view`.
    pub fn for_view(view: View) -> Self {
        match view {
            View::Home => ComponentId::Home,
            View::Upload => ComponentId::Upload,
            View::Processing => ComponentId::Processing,
            View::Library => ComponentId::Library,
            View::Player => ComponentId::Player,
        }
    }
}

/// All actions that can flow through the system.
/// Components produce Actions; the App dispatches them.
#[derive(Debug, Clone)]
pub enum Action {
    // ── Navigation ───────────────────────────────────────────────────────────
    Navigate(View),
    FocusNext,
    FocusPrev,
    FocusPane(ComponentId),

    // ── Upload form ──────────────────────────────────────────────────────────
    StageFile(PathBuf),
    ClearFile,
    CycleSubject(isize),
    SetChapter(String),
    Submit,
    TryDemo,

    // ── Library ──────────────────────────────────────────────────────────────
    RefreshLibrary,
    PlayPodcast(Podcast),
    DeletePodcast(String),
    Download(String),
    CopyLink(String),

    // ── Playback ─────────────────────────────────────────────────────────────
    TogglePlay,
    Skip(f64),
    SeekTo(f64),
    Volume(f32),
    ToggleMute,

    // ── UI toggles ───────────────────────────────────────────────────────────
    ToggleLogs,
    ToggleHelp,

    // ── System ───────────────────────────────────────────────────────────────
    Quit,
}
