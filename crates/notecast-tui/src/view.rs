//! Screens and the navigation rules between them.

use notecast_proto::model::{Podcast, ProcessingStatus};

use crate::session::UploadForm;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Home,
    Upload,
    Processing,
    Library,
    Player,
}

/// What the session currently has, as far as navigation cares.
#[derive(Debug, Clone, Copy, Default)]
pub struct NavContext {
    pub has_podcast: bool,
    pub has_job: bool,
}

impl View {
    /// Tab order of the navigation bar.
    pub const TABS: [View; 5] = [
        View::Home,
        View::Upload,
        View::Processing,
        View::Library,
        View::Player,
    ];

    pub fn label(self) -> &'static str {
        match self {
            View::Home => "Home",
            View::Upload => "New Podcast",
            View::Processing => "Processing",
            View::Library => "Your Library",
            View::Player => "Now Playing",
        }
    }

    /// Whether the view may be entered at all. Processing needs a job (or its
    /// failure) to show; Player needs a loaded podcast.
    pub fn can_enter(self, ctx: NavContext) -> bool {
        match self {
            View::Home | View::Upload | View::Library => true,
            View::Processing => ctx.has_job,
            View::Player => ctx.has_podcast,
        }
    }

    /// Tabs shown in the navigation bar for this context.
    pub fn visible_tabs(ctx: NavContext) -> Vec<View> {
        Self::TABS
            .into_iter()
            .filter(|v| v.can_enter(ctx))
            .collect()
    }
}

/// The screen to render, borrowed from the session. The player variant holds
/// the podcast itself, so it only exists while one is loaded.
#[derive(Debug)]
pub enum Screen<'a> {
    Home { recent: &'a [Podcast] },
    Upload { form: &'a UploadForm },
    Processing { status: Option<&'a ProcessingStatus> },
    Library { podcasts: &'a [Podcast] },
    Player { podcast: &'a Podcast },
}

impl Screen<'_> {
    pub fn view(&self) -> View {
        match self {
            Screen::Home { .. } => View::Home,
            Screen::Upload { .. } => View::Upload,
            Screen::Processing { .. } => View::Processing,
            Screen::Library { .. } => View::Library,
            Screen::Player { .. } => View::Player,
        }
    }
}
