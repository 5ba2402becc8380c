//! Playback transport for the loaded podcast.
//!
//! Holds the cached playback state and forwards user intents to the media
//! element. Every operation is a no-op while no source is bound.

use tracing::debug;

use crate::media::{MediaCommand, MediaElement, MediaEvent};

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub is_playing: bool,
    /// Seconds, kept within `0..=duration`.
    pub current_time: f64,
    pub duration: f64,
    /// 0.0..=1.0
    pub volume: f32,
    pub muted: bool,
}

impl PlaybackState {
    pub fn new(volume: f32) -> Self {
        Self {
            is_playing: false,
            current_time: 0.0,
            duration: 0.0,
            volume: volume.clamp(0.0, 1.0),
            muted: false,
        }
    }

    /// Fraction of the track played, 0.0 when the duration is unknown.
    pub fn progress(&self) -> f64 {
        if self.duration > 0.0 {
            (self.current_time / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Volume as shown on the slider: zero while muted.
    pub fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }

    fn reset_position(&mut self) {
        self.is_playing = false;
        self.current_time = 0.0;
        self.duration = 0.0;
    }
}

pub struct Transport<M: MediaElement> {
    element: M,
    source: Option<String>,
    /// The element reached end of file and unloaded it; the next play or
    /// seek has to load the source again.
    ended: bool,
    state: PlaybackState,
}

impl<M: MediaElement> Transport<M> {
    pub fn new(element: M, default_volume: f32) -> Self {
        Self {
            element,
            source: None,
            ended: false,
            state: PlaybackState::new(default_volume),
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn is_bound(&self) -> bool {
        self.source.is_some()
    }

    /// Load `url` paused at 0. Volume and mute carry over between podcasts.
    pub fn bind(&mut self, url: String) {
        debug!("transport: bind {}", url);
        self.state.reset_position();
        self.load(url.clone());
        self.source = Some(url);
    }

    fn load(&mut self, url: String) {
        self.ended = false;
        self.element.command(MediaCommand::Load {
            url,
            volume: self.state.volume,
            muted: self.state.muted,
        });
    }

    /// Reload the source after end of file, keeping the known duration.
    fn reload_if_ended(&mut self) {
        if !self.ended {
            return;
        }
        if let Some(url) = self.source.clone() {
            debug!("transport: reload after end of file");
            self.state.current_time = 0.0;
            self.load(url);
        }
    }

    /// The element could not play the source. Drop the binding without
    /// commanding the element, so later transport calls are no-ops.
    pub fn mark_failed(&mut self) {
        if self.source.take().is_some() {
            debug!("transport: source failed");
        }
        self.ended = false;
        self.state.reset_position();
    }

    pub fn unbind(&mut self) {
        if self.source.take().is_some() {
            debug!("transport: unbind");
            self.element.command(MediaCommand::Stop);
        }
        self.ended = false;
        self.state.reset_position();
    }

    pub fn toggle_play(&mut self) {
        if !self.is_bound() {
            return;
        }
        if !self.state.is_playing {
            self.reload_if_ended();
        }
        self.state.is_playing = !self.state.is_playing;
        self.element
            .command(MediaCommand::SetPause(!self.state.is_playing));
    }

    pub fn seek(&mut self, secs: f64) {
        if !self.is_bound() || !secs.is_finite() {
            return;
        }
        let target = secs.clamp(0.0, self.state.duration.max(0.0));
        self.reload_if_ended();
        self.state.current_time = target;
        self.element.command(MediaCommand::SeekTo(target));
    }

    pub fn skip(&mut self, delta: f64) {
        let target = self.state.current_time + delta;
        self.seek(target);
    }

    /// Set volume; reaching zero mutes, anything above unmutes.
    pub fn set_volume(&mut self, volume: f32) {
        if !self.is_bound() || !volume.is_finite() {
            return;
        }
        let volume = volume.clamp(0.0, 1.0);
        self.state.volume = volume;
        self.state.muted = volume == 0.0;
        self.element.command(MediaCommand::SetVolume(volume));
        self.element.command(MediaCommand::SetMute(self.state.muted));
    }

    pub fn toggle_mute(&mut self) {
        if !self.is_bound() {
            return;
        }
        self.state.muted = !self.state.muted;
        self.element.command(MediaCommand::SetMute(self.state.muted));
    }

    /// Refresh the cache from the element's own reports.
    pub fn on_media_event(&mut self, event: MediaEvent) {
        if !self.is_bound() {
            return;
        }
        match event {
            MediaEvent::TimeChanged(t) if t.is_finite() => {
                let upper = if self.state.duration > 0.0 {
                    self.state.duration
                } else {
                    f64::MAX
                };
                self.state.current_time = t.clamp(0.0, upper);
            }
            MediaEvent::DurationChanged(d) if d.is_finite() && d >= 0.0 => {
                self.state.duration = d;
                if self.state.current_time > d {
                    self.state.current_time = d;
                }
            }
            MediaEvent::PauseChanged(paused) => self.state.is_playing = !paused,
            MediaEvent::Ended => {
                self.state.is_playing = false;
                self.ended = true;
            }
            _ => {}
        }
    }
}

/// `m:ss` with unbounded minutes. Negative or non-finite input renders `0:00`.
pub fn format_time(secs: f64) -> String {
    if !secs.is_finite() || secs < 0.0 {
        return "0:00".to_string();
    }
    let total = secs.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
