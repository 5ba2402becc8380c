//! AppState: read-only snapshot handed to components during event handling
//! and rendering. Borrowed from the session each time; never stored.

use std::collections::HashSet;

use notecast_proto::model::Podcast;

use crate::api::PodcastApi;
use crate::media::MediaElement;
use crate::session::Session;
use crate::transport::PlaybackState;
use crate::view::{NavContext, Screen, View};

pub struct AppState<'a> {
    pub screen: Screen<'a>,
    pub nav: NavContext,
    pub library: &'a [Podcast],
    pub current: Option<&'a Podcast>,
    pub playback: &'a PlaybackState,
    pub downloads: &'a HashSet<String>,
    pub polling: bool,
    pub tui_log_lines: &'a [String],
    pub skip_secs: f64,
}

impl<'a> AppState<'a> {
    pub fn new<A: PodcastApi, M: MediaElement>(
        session: &'a Session<A, M>,
        tui_log_lines: &'a [String],
        skip_secs: f64,
    ) -> Self {
        Self {
            screen: session.screen(),
            nav: session.nav_context(),
            library: session.library(),
            current: session.current(),
            playback: session.playback(),
            downloads: session.downloads(),
            polling: session.is_polling(),
            tui_log_lines,
            skip_secs,
        }
    }

    pub fn view(&self) -> View {
        self.screen.view()
    }
}
