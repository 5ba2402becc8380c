//! The seam between the playback transport and whatever actually plays audio.
//!
//! Commands flow out through [`MediaElement::command`]; the element reports
//! back asynchronously with [`MediaEvent`]s, which the event loop feeds to
//! `Transport::on_media_event`.

#[derive(Debug, Clone, PartialEq)]
pub enum MediaCommand {
    /// Replace the source. Always loads paused.
    Load {
        url: String,
        volume: f32,
        muted: bool,
    },
    SetPause(bool),
    SeekTo(f64),
    SetVolume(f32),
    SetMute(bool),
    Stop,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    TimeChanged(f64),
    DurationChanged(f64),
    PauseChanged(bool),
    Ended,
    /// The player could not be started or rejected the source.
    Failed(String),
}

pub trait MediaElement {
    fn command(&mut self, cmd: MediaCommand);
}
