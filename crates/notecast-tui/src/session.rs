//! Session: the single owner of all client state.
//!
//! Handlers are synchronous: anything that needs the network is spawned as a
//! task whose result comes back as a [`SessionEvent`] through the event loop
//! and is applied by [`Session::apply`]. Nothing else mutates session state.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notecast_proto::config::Config;
use notecast_proto::model::{JobStatus, Podcast, ProcessingStatus, StagedFile, SUBJECTS};
use notecast_proto::{ApiError, ApiResult};
use reqwest::StatusCode;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::PodcastApi;
use crate::media::{MediaElement, MediaEvent};
use crate::poll::PollSlot;
use crate::transport::{PlaybackState, Transport};
use crate::view::{NavContext, Screen, View};

/// Podcasts shown on the home screen.
pub const RECENT_COUNT: usize = 6;

#[derive(Debug)]
pub enum SessionEvent {
    LibraryLoaded(ApiResult<Vec<Podcast>>),
    UploadFinished { seq: u64, result: ApiResult<String> },
    DemoFinished { seq: u64, result: ApiResult<ProcessingStatus> },
    PollTick { generation: u64 },
    StatusFetched { job_id: String, result: ApiResult<ProcessingStatus> },
    ShowPlayer { seq: u64 },
    DeleteFinished { job_id: String, result: ApiResult<StatusCode> },
    DownloadFinished { job_id: String, result: ApiResult<PathBuf> },
    Media(MediaEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
}

/// A transient message for the user, drained by the UI into toasts.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub poll_interval: Duration,
    pub completion_delay: Duration,
    pub downloads_dir: PathBuf,
    pub default_volume: f32,
    pub default_subject: String,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            completion_delay: config.completion_delay(),
            downloads_dir: config.paths.downloads_dir.clone(),
            default_volume: config.player.default_volume,
            default_subject: config.upload.default_subject.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadForm {
    pub staged: Option<StagedFile>,
    /// Index into `SUBJECTS`.
    pub subject: usize,
    pub chapter: String,
}

impl UploadForm {
    pub fn subject_name(&self) -> &'static str {
        SUBJECTS[self.subject % SUBJECTS.len()]
    }

    pub fn can_submit(&self) -> bool {
        self.staged.is_some()
    }
}

pub struct Session<A: PodcastApi, M: MediaElement> {
    api: Arc<A>,
    events: mpsc::Sender<SessionEvent>,
    settings: SessionSettings,

    view: View,
    form: UploadForm,
    job_id: Option<String>,
    /// Set once the active job reached a terminal status.
    job_settled: bool,
    status: Option<ProcessingStatus>,
    /// Sequence number of the upload or demo request whose answer we await.
    pending_submit: Option<u64>,
    submit_seq: u64,
    current: Option<Podcast>,
    promotion_seq: u64,
    library: Vec<Podcast>,
    downloads: HashSet<String>,

    transport: Transport<M>,
    poll: PollSlot,
    notices: Vec<Notice>,
}

impl<A: PodcastApi, M: MediaElement> Session<A, M> {
    pub fn new(
        api: Arc<A>,
        media: M,
        settings: SessionSettings,
        events: mpsc::Sender<SessionEvent>,
    ) -> Self {
        let subject = SUBJECTS
            .iter()
            .position(|s| s.eq_ignore_ascii_case(&settings.default_subject))
            .unwrap_or(0);
        Self {
            api,
            events,
            transport: Transport::new(media, settings.default_volume),
            settings,
            view: View::Home,
            form: UploadForm {
                subject,
                ..Default::default()
            },
            job_id: None,
            job_settled: false,
            status: None,
            pending_submit: None,
            submit_seq: 0,
            current: None,
            promotion_seq: 0,
            library: Vec::new(),
            downloads: HashSet::new(),
            poll: PollSlot::new(),
            notices: Vec::new(),
        }
    }

    // ── Read access ───────────────────────────────────────────────────────────

    pub fn view(&self) -> View {
        self.view
    }

    pub fn form(&self) -> &UploadForm {
        &self.form
    }

    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    pub fn status(&self) -> Option<&ProcessingStatus> {
        self.status.as_ref()
    }

    pub fn current(&self) -> Option<&Podcast> {
        self.current.as_ref()
    }

    pub fn library(&self) -> &[Podcast] {
        &self.library
    }

    pub fn playback(&self) -> &PlaybackState {
        self.transport.state()
    }

    pub fn is_polling(&self) -> bool {
        self.poll.is_active()
    }

    pub fn downloads(&self) -> &HashSet<String> {
        &self.downloads
    }

    pub fn download_url(&self, job_id: &str) -> String {
        self.api.download_url(job_id)
    }

    pub fn nav_context(&self) -> NavContext {
        NavContext {
            has_podcast: self.current.is_some(),
            has_job: self.job_id.is_some() || self.status.is_some() || self.pending_submit.is_some(),
        }
    }

    /// The screen for the current view.
    pub fn screen(&self) -> Screen<'_> {
        match self.view {
            View::Home => Screen::Home {
                recent: &self.library[..self.library.len().min(RECENT_COUNT)],
            },
            View::Upload => Screen::Upload { form: &self.form },
            View::Processing => Screen::Processing {
                status: self.status.as_ref(),
            },
            View::Library => Screen::Library {
                podcasts: &self.library,
            },
            View::Player => match &self.current {
                Some(podcast) => Screen::Player { podcast },
                None => Screen::Home {
                    recent: &self.library[..self.library.len().min(RECENT_COUNT)],
                },
            },
        }
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push(Notice {
            level,
            message: message.into(),
        });
    }

    // ── Navigation ────────────────────────────────────────────────────────────

    /// Switch views if the transition is legal. Returns whether it happened.
    pub fn navigate(&mut self, view: View) -> bool {
        if !view.can_enter(self.nav_context()) {
            debug!("navigate: {:?} not available", view);
            return false;
        }
        self.view = view;
        self.sync_polling();
        true
    }

    /// Keep the poll ticker running exactly while a live job is on screen.
    fn sync_polling(&mut self) {
        let wanted = self.job_id.is_some() && self.view == View::Processing && !self.job_settled;
        if wanted && !self.poll.is_active() {
            self.poll.start(
                self.settings.poll_interval,
                self.events.clone(),
                |generation| SessionEvent::PollTick { generation },
            );
        } else if !wanted && self.poll.is_active() {
            self.poll.stop();
        }
    }

    // ── Upload form ───────────────────────────────────────────────────────────

    pub fn stage_file(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        match StagedFile::stage(path) {
            Ok(file) => {
                info!("staged {} ({})", file.file_name, file.size_mb());
                self.form.staged = Some(file);
            }
            Err(e) => {
                warn!("cannot stage {:?}: {}", path, e);
                self.notify(NoticeLevel::Warning, e.to_string());
            }
        }
    }

    pub fn clear_file(&mut self) {
        self.form.staged = None;
    }

    pub fn cycle_subject(&mut self, delta: isize) {
        let len = SUBJECTS.len() as isize;
        self.form.subject = (self.form.subject as isize + delta).rem_euclid(len) as usize;
    }

    pub fn set_chapter(&mut self, chapter: String) {
        self.form.chapter = chapter;
    }

    // ── Jobs ──────────────────────────────────────────────────────────────────

    fn begin_submit(&mut self) -> u64 {
        self.poll.stop();
        self.job_id = None;
        self.job_settled = false;
        self.status = None;
        self.submit_seq += 1;
        self.pending_submit = Some(self.submit_seq);
        self.view = View::Processing;
        self.submit_seq
    }

    /// Send the staged file. Does nothing without one.
    pub fn submit_upload(&mut self) {
        let Some(file) = self.form.staged.take() else {
            return;
        };
        let seq = self.begin_submit();
        let subject = self.form.subject_name().to_string();
        let chapter = self.form.chapter.clone();

        let api = Arc::clone(&self.api);
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = api.upload(&file, &subject, &chapter).await;
            let _ = tx.send(SessionEvent::UploadFinished { seq, result }).await;
        });
    }

    /// Ask the backend for its canned demo podcast.
    pub fn try_demo(&mut self) {
        let seq = self.begin_submit();
        let api = Arc::clone(&self.api);
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = api.demo().await;
            let _ = tx.send(SessionEvent::DemoFinished { seq, result }).await;
        });
    }

    fn poll_once(&mut self) {
        let Some(job_id) = self.job_id.clone() else {
            return;
        };
        let api = Arc::clone(&self.api);
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = api.status(&job_id).await;
            let _ = tx.send(SessionEvent::StatusFetched { job_id, result }).await;
        });
    }

    fn apply_status(&mut self, status: ProcessingStatus) {
        self.job_settled = status.status.is_terminal();
        match status.status {
            JobStatus::Completed => {
                info!("job {:?} completed", self.job_id);
                let podcast = status.completed_podcast();
                self.status = Some(status);
                if let Some(podcast) = podcast {
                    self.promote(podcast);
                }
            }
            JobStatus::Failed => {
                warn!(
                    "job {:?} failed: {}",
                    self.job_id,
                    status.error.as_deref().unwrap_or(&status.message)
                );
                self.status = Some(status);
            }
            _ => self.status = Some(status),
        }
        self.sync_polling();
    }

    /// Make a finished job's podcast current, refresh the library and open
    /// the player once the completion screen has been visible for a moment.
    fn promote(&mut self, podcast: Podcast) {
        self.bind_podcast(&podcast);
        self.current = Some(podcast);
        self.load_library();

        self.promotion_seq += 1;
        let seq = self.promotion_seq;
        let delay = self.settings.completion_delay;
        let tx = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(SessionEvent::ShowPlayer { seq }).await;
        });
    }

    fn bind_podcast(&mut self, podcast: &Podcast) {
        match self.api.audio_source(podcast) {
            Some(url) => self.transport.bind(url),
            None => {
                warn!("podcast {} has no audio source", podcast.job_id);
                self.transport.unbind();
                self.notify(NoticeLevel::Warning, "No audio available for this podcast");
            }
        }
    }

    // ── Library ───────────────────────────────────────────────────────────────

    pub fn load_library(&mut self) {
        let api = Arc::clone(&self.api);
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = api.library().await;
            let _ = tx.send(SessionEvent::LibraryLoaded(result)).await;
        });
    }

    pub fn play_podcast(&mut self, podcast: Podcast) {
        info!("play {} ({})", podcast.job_id, podcast.title);
        self.promotion_seq += 1;
        self.bind_podcast(&podcast);
        self.current = Some(podcast);
        self.view = View::Player;
        self.sync_polling();
    }

    /// Delete without confirmation.
    pub fn delete_podcast(&mut self, job_id: String) {
        let api = Arc::clone(&self.api);
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = api.delete(&job_id).await;
            let _ = tx.send(SessionEvent::DeleteFinished { job_id, result }).await;
        });
    }

    pub fn download_podcast(&mut self, job_id: String) {
        if !self.downloads.insert(job_id.clone()) {
            self.notify(NoticeLevel::Info, "Already downloading");
            return;
        }
        self.notify(NoticeLevel::Info, "Downloading…");
        let dir = self.settings.downloads_dir.clone();
        let api = Arc::clone(&self.api);
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = api.download_to(&job_id, &dir).await;
            let _ = tx
                .send(SessionEvent::DownloadFinished { job_id, result })
                .await;
        });
    }

    // ── Transport ─────────────────────────────────────────────────────────────

    pub fn toggle_play(&mut self) {
        self.transport.toggle_play();
    }

    pub fn skip(&mut self, delta: f64) {
        self.transport.skip(delta);
    }

    pub fn seek(&mut self, secs: f64) {
        self.transport.seek(secs);
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.transport.set_volume(volume);
    }

    pub fn toggle_mute(&mut self) {
        self.transport.toggle_mute();
    }

    // ── Event application ─────────────────────────────────────────────────────

    pub fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::LibraryLoaded(Ok(podcasts)) => {
                debug!("library refreshed: {} podcasts", podcasts.len());
                self.library = podcasts;
            }
            SessionEvent::LibraryLoaded(Err(e)) => {
                warn!("library fetch failed: {}", e);
                self.notify(NoticeLevel::Warning, "Couldn't load your library");
            }

            SessionEvent::UploadFinished { seq, result } => {
                if self.pending_submit != Some(seq) {
                    debug!("ignoring superseded upload #{}", seq);
                    return;
                }
                self.pending_submit = None;
                match result.and_then(|id| {
                    if id.is_empty() {
                        Err(ApiError::MissingJobId)
                    } else {
                        Ok(id)
                    }
                }) {
                    Ok(job_id) => {
                        info!("upload accepted as job {}", job_id);
                        self.job_id = Some(job_id);
                    }
                    Err(e) => {
                        warn!("upload failed: {}", e);
                        self.job_settled = true;
                        self.status = Some(ProcessingStatus::upload_failed());
                    }
                }
                self.sync_polling();
            }

            SessionEvent::DemoFinished { seq, result } => {
                if self.pending_submit != Some(seq) {
                    debug!("ignoring superseded demo #{}", seq);
                    return;
                }
                self.pending_submit = None;
                match result {
                    Ok(status) => {
                        let job_id = status
                            .metadata
                            .as_ref()
                            .map(|m| m.job_id.clone())
                            .filter(|id| !id.is_empty())
                            .unwrap_or_else(|| "demo".to_string());
                        self.job_id = Some(job_id);
                        self.apply_status(status);
                    }
                    Err(e) => {
                        warn!("demo request failed: {}", e);
                        self.job_settled = true;
                        self.status = Some(ProcessingStatus {
                            message: "Demo failed. Please try again.".to_string(),
                            ..ProcessingStatus::upload_failed()
                        });
                    }
                }
            }

            SessionEvent::PollTick { generation } => {
                if self.poll.accepts(generation) {
                    self.poll_once();
                } else {
                    debug!("dropping stale poll tick gen={}", generation);
                }
            }

            SessionEvent::StatusFetched { job_id, result } => {
                if self.job_id.as_deref() != Some(job_id.as_str()) {
                    debug!("ignoring status for superseded job {}", job_id);
                    return;
                }
                if self.job_settled {
                    debug!("ignoring late status for settled job {}", job_id);
                    return;
                }
                match result {
                    Ok(status) => self.apply_status(status),
                    Err(e) => warn!("status poll for {} failed: {}", job_id, e),
                }
            }

            SessionEvent::ShowPlayer { seq } => {
                if seq == self.promotion_seq && self.current.is_some() {
                    self.view = View::Player;
                    self.sync_polling();
                }
            }

            SessionEvent::DeleteFinished { job_id, result } => match result {
                Ok(code) => {
                    if !code.is_success() {
                        debug!("delete {} answered {}", job_id, code);
                    }
                    self.load_library();
                    if self.current.as_ref().map(|p| p.job_id.as_str()) == Some(job_id.as_str()) {
                        info!("deleted the loaded podcast {}", job_id);
                        self.current = None;
                        self.transport.unbind();
                        self.view = View::Home;
                        self.sync_polling();
                    }
                }
                Err(e) => {
                    warn!("delete {} failed: {}", job_id, e);
                    self.notify(NoticeLevel::Warning, "Delete failed");
                }
            },

            SessionEvent::DownloadFinished { job_id, result } => {
                self.downloads.remove(&job_id);
                match result {
                    Ok(path) => self.notify(
                        NoticeLevel::Success,
                        format!("Saved {}", path.display()),
                    ),
                    Err(e) => {
                        warn!("download {} failed: {}", job_id, e);
                        self.notify(NoticeLevel::Warning, "Download failed");
                    }
                }
            }

            SessionEvent::Media(MediaEvent::Failed(reason)) => {
                warn!("media: {}", reason);
                self.transport.mark_failed();
                self.notify(NoticeLevel::Warning, format!("Playback unavailable: {reason}"));
            }
            SessionEvent::Media(event) => self.transport.on_media_event(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::testing::RecordingMedia;
    use crate::media::MediaCommand;
    use notecast_proto::model::Stage;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn offline() -> ApiError {
        ApiError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "offline",
        ))
    }

    /// Scripted backend. Statuses are served front to back; an exhausted
    /// script keeps answering `processing`.
    #[derive(Default)]
    struct FakeApi {
        library: Mutex<Vec<Podcast>>,
        library_fails: AtomicBool,
        upload_fails: AtomicBool,
        upload_without_job: AtomicBool,
        statuses: Mutex<VecDeque<Option<ProcessingStatus>>>,
        delete_fails: AtomicBool,
        library_calls: AtomicUsize,
        status_calls: AtomicUsize,
        delete_calls: AtomicUsize,
    }

    impl FakeApi {
        fn script(&self, statuses: Vec<Option<ProcessingStatus>>) {
            *self.statuses.lock().unwrap() = statuses.into();
        }
    }

    impl PodcastApi for FakeApi {
        async fn library(&self) -> ApiResult<Vec<Podcast>> {
            self.library_calls.fetch_add(1, Ordering::SeqCst);
            if self.library_fails.load(Ordering::SeqCst) {
                return Err(offline());
            }
            Ok(self.library.lock().unwrap().clone())
        }

        async fn upload(&self, _file: &StagedFile, _subject: &str, _chapter: &str) -> ApiResult<String> {
            if self.upload_fails.load(Ordering::SeqCst) {
                return Err(offline());
            }
            if self.upload_without_job.load(Ordering::SeqCst) {
                return Ok(String::new());
            }
            Ok("job00001".to_string())
        }

        async fn status(&self, _job_id: &str) -> ApiResult<ProcessingStatus> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            let next = self.statuses.lock().unwrap().pop_front();
            match next {
                Some(Some(status)) => Ok(status),
                Some(None) => Err(offline()),
                None => Ok(processing(40)),
            }
        }

        async fn delete(&self, job_id: &str) -> ApiResult<StatusCode> {
            self.delete_calls.fetch_add(1, Ordering::SeqCst);
            if self.delete_fails.load(Ordering::SeqCst) {
                return Err(offline());
            }
            let mut library = self.library.lock().unwrap();
            let before = library.len();
            library.retain(|p| p.job_id != job_id);
            Ok(if library.len() < before {
                StatusCode::OK
            } else {
                StatusCode::NOT_FOUND
            })
        }

        async fn demo(&self) -> ApiResult<ProcessingStatus> {
            Ok(completed("demo0001"))
        }

        async fn download_to(&self, job_id: &str, dir: &Path) -> ApiResult<PathBuf> {
            Ok(dir.join(format!("notecast_{job_id}.mp3")))
        }

        fn download_url(&self, job_id: &str) -> String {
            format!("http://fake/api/download/{job_id}")
        }

        fn audio_source(&self, podcast: &Podcast) -> Option<String> {
            podcast
                .audio_url
                .as_ref()
                .map(|u| format!("http://fake{u}"))
                .or_else(|| {
                    podcast
                        .audio_file
                        .as_ref()
                        .map(|f| format!("http://fake/audio/{f}"))
                })
        }
    }

    fn podcast(job_id: &str) -> Podcast {
        Podcast {
            job_id: job_id.to_string(),
            title: format!("Physics - {job_id}"),
            duration: 180.0,
            audio_file: Some(format!("{job_id}_podcast.mp3")),
            created_at: "2024-03-01T10:15:00".to_string(),
            ..Default::default()
        }
    }

    fn processing(progress: i64) -> ProcessingStatus {
        ProcessingStatus {
            status: JobStatus::Processing,
            stage: Some(Stage::Script),
            progress,
            message: "Writing the script...".to_string(),
            ..Default::default()
        }
    }

    fn completed(job_id: &str) -> ProcessingStatus {
        ProcessingStatus {
            status: JobStatus::Completed,
            stage: Some(Stage::Done),
            progress: 100,
            message: "Your podcast is ready!".to_string(),
            metadata: Some(podcast(job_id)),
            audio_url: Some(format!("/audio/{job_id}_podcast.mp3")),
            ..Default::default()
        }
    }

    fn failed() -> ProcessingStatus {
        ProcessingStatus {
            status: JobStatus::Failed,
            stage: Some(Stage::Error),
            progress: 0,
            message: "Processing failed".to_string(),
            error: Some("OCR returned no text".to_string()),
            ..Default::default()
        }
    }

    struct Harness {
        session: Session<FakeApi, RecordingMedia>,
        rx: mpsc::Receiver<SessionEvent>,
        api: Arc<FakeApi>,
        media: RecordingMedia,
        dir: tempfile::TempDir,
    }

    impl Harness {
        fn new(api: FakeApi) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let api = Arc::new(api);
            let media = RecordingMedia::default();
            let (tx, rx) = mpsc::channel(64);
            let settings = SessionSettings {
                poll_interval: Duration::from_secs(2),
                completion_delay: Duration::from_secs(1),
                downloads_dir: dir.path().to_path_buf(),
                default_volume: 0.8,
                default_subject: "Physics".to_string(),
            };
            let session = Session::new(Arc::clone(&api), media.clone(), settings, tx);
            Self {
                session,
                rx,
                api,
                media,
                dir,
            }
        }

        /// Apply the next event; panics if none arrives within a minute of
        /// (paused) time.
        async fn step(&mut self) -> &'static str {
            let event = tokio::time::timeout(Duration::from_secs(60), self.rx.recv())
                .await
                .expect("session went quiet")
                .expect("channel closed");
            let name = match &event {
                SessionEvent::LibraryLoaded(_) => "library",
                SessionEvent::UploadFinished { .. } => "upload",
                SessionEvent::DemoFinished { .. } => "demo",
                SessionEvent::PollTick { .. } => "tick",
                SessionEvent::StatusFetched { .. } => "status",
                SessionEvent::ShowPlayer { .. } => "show-player",
                SessionEvent::DeleteFinished { .. } => "delete",
                SessionEvent::DownloadFinished { .. } => "download",
                SessionEvent::Media(_) => "media",
            };
            self.session.apply(event);
            name
        }

        /// True when no event arrives for `secs` seconds.
        async fn quiet_for(&mut self, secs: u64) -> bool {
            tokio::time::timeout(Duration::from_secs(secs), self.rx.recv())
                .await
                .is_err()
        }

        fn stage_pdf(&mut self) {
            let path = self.dir.path().join("optics.pdf");
            std::fs::write(&path, b"%PDF-1.4").unwrap();
            self.session.stage_file(&path);
        }

        /// Submit and apply the upload answer.
        async fn submit(&mut self) {
            self.stage_pdf();
            self.session.submit_upload();
            assert_eq!(self.step().await, "upload");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_enters_processing_and_polls_after_interval() {
        let mut h = Harness::new(FakeApi::default());
        h.stage_pdf();
        assert!(h.session.form().can_submit());
        h.session.submit_upload();
        assert_eq!(h.session.view(), View::Processing);
        assert!(h.session.status().is_none());
        assert!(h.session.form().staged.is_none());

        assert_eq!(h.step().await, "upload");
        assert_eq!(h.session.job_id(), Some("job00001"));
        assert!(h.session.is_polling());

        let started = tokio::time::Instant::now();
        assert_eq!(h.step().await, "tick");
        assert!(started.elapsed() >= Duration::from_secs(2));
        assert_eq!(h.step().await, "status");
        assert_eq!(h.session.status().map(|s| s.progress), Some(40));
        assert!(h.session.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_without_file_does_nothing() {
        let mut h = Harness::new(FakeApi::default());
        h.session.submit_upload();
        assert_eq!(h.session.view(), View::Home);
        assert!(h.quiet_for(5).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_promotes_podcast_then_opens_player() {
        let api = FakeApi::default();
        api.script(vec![Some(processing(55)), Some(completed("job00001"))]);
        *api.library.lock().unwrap() = vec![podcast("job00001")];
        let mut h = Harness::new(api);
        h.submit().await;

        assert_eq!(h.step().await, "tick");
        assert_eq!(h.step().await, "status");
        assert_eq!(h.step().await, "tick");
        assert_eq!(h.step().await, "status");

        assert!(!h.session.is_polling());
        assert_eq!(h.session.view(), View::Processing);
        let current = h.session.current().unwrap();
        assert_eq!(current.job_id, "job00001");
        assert_eq!(current.audio_url.as_deref(), Some("/audio/job00001_podcast.mp3"));
        assert_eq!(
            h.media.take(),
            vec![MediaCommand::Load {
                url: "http://fake/audio/job00001_podcast.mp3".to_string(),
                volume: 0.8,
                muted: false,
            }]
        );

        let promoted_at = tokio::time::Instant::now();
        assert_eq!(h.step().await, "library");
        assert_eq!(h.session.library().len(), 1);
        assert_eq!(h.session.view(), View::Processing);
        assert_eq!(h.step().await, "show-player");
        assert!(promoted_at.elapsed() >= Duration::from_secs(1));
        assert_eq!(h.session.view(), View::Player);
        assert!(matches!(h.session.screen(), Screen::Player { podcast } if podcast.job_id == "job00001"));
        assert!(!h.session.playback().is_playing);
        assert_eq!(h.api.status_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_stops_polling_and_keeps_status() {
        let api = FakeApi::default();
        api.script(vec![Some(failed())]);
        let mut h = Harness::new(api);
        h.submit().await;

        assert_eq!(h.step().await, "tick");
        assert_eq!(h.step().await, "status");
        assert!(!h.session.is_polling());
        let status = h.session.status().unwrap();
        assert_eq!(status.status, JobStatus::Failed);
        assert_eq!(status.error.as_deref(), Some("OCR returned no text"));

        assert!(h.quiet_for(10).await);
        assert_eq!(h.api.status_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.session.view(), View::Processing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_failure_synthesizes_failed_status() {
        let api = FakeApi::default();
        api.upload_fails.store(true, Ordering::SeqCst);
        let mut h = Harness::new(api);
        h.submit().await;

        assert!(h.session.job_id().is_none());
        assert!(!h.session.is_polling());
        assert_eq!(h.session.status(), Some(&ProcessingStatus::upload_failed()));
        assert!(h.quiet_for(10).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_without_job_id_never_polls() {
        let api = FakeApi::default();
        api.upload_without_job.store(true, Ordering::SeqCst);
        let mut h = Harness::new(api);
        h.submit().await;

        assert!(h.session.job_id().is_none());
        assert!(!h.session.is_polling());
        assert_eq!(h.session.status(), Some(&ProcessingStatus::upload_failed()));
        assert!(h.quiet_for(10).await);
        assert_eq!(h.api.status_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_keeps_polling() {
        let api = FakeApi::default();
        api.script(vec![None, Some(completed("job00001"))]);
        let mut h = Harness::new(api);
        h.submit().await;

        assert_eq!(h.step().await, "tick");
        assert_eq!(h.step().await, "status");
        assert!(h.session.is_polling());
        assert!(h.session.status().is_none());

        assert_eq!(h.step().await, "tick");
        assert_eq!(h.step().await, "status");
        assert_eq!(h.session.status().map(|s| s.status), Some(JobStatus::Completed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigating_away_stops_polling_and_return_restarts_once() {
        let mut h = Harness::new(FakeApi::default());
        h.submit().await;
        assert!(h.session.is_polling());

        assert!(h.session.navigate(View::Library));
        assert!(!h.session.is_polling());
        assert!(h.quiet_for(10).await);

        assert!(h.session.navigate(View::Processing));
        assert!(h.session.is_polling());
        // Re-entering while already polling must not add a second ticker.
        assert!(h.session.navigate(View::Processing));

        let calls_before = h.api.status_calls.load(Ordering::SeqCst);
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while let Ok(Some(event)) = tokio::time::timeout_at(deadline, h.rx.recv()).await {
            h.session.apply(event);
        }
        assert_eq!(h.api.status_calls.load(Ordering::SeqCst) - calls_before, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_for_superseded_job_is_ignored() {
        let mut h = Harness::new(FakeApi::default());
        h.submit().await;
        h.session.apply(SessionEvent::StatusFetched {
            job_id: "oldjob00".to_string(),
            result: Ok(completed("oldjob00")),
        });
        assert!(h.session.status().is_none());
        assert!(h.session.current().is_none());
        assert!(h.session.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resubmit_supersedes_pending_upload() {
        let mut h = Harness::new(FakeApi::default());
        h.stage_pdf();
        h.session.submit_upload();
        h.stage_pdf();
        h.session.submit_upload();

        assert_eq!(h.step().await, "upload");
        assert_eq!(h.step().await, "upload");
        assert_eq!(h.session.job_id(), Some("job00001"));
        assert!(h.session.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn test_player_requires_loaded_podcast() {
        let mut h = Harness::new(FakeApi::default());
        assert!(!h.session.navigate(View::Player));
        assert!(!h.session.navigate(View::Processing));
        assert_eq!(h.session.view(), View::Home);

        h.session.play_podcast(podcast("aaaa1111"));
        assert_eq!(h.session.view(), View::Player);
        assert!(h.session.navigate(View::Home));
        assert!(h.session.navigate(View::Player));
    }

    #[tokio::test(start_paused = true)]
    async fn test_player_failure_leaves_transport_inert() {
        let mut h = Harness::new(FakeApi::default());
        h.session.play_podcast(podcast("aaaa1111"));
        h.media.take();
        h.session.apply(SessionEvent::Media(MediaEvent::Failed(
            "mpv binary not found".to_string(),
        )));
        assert!(!h.session.drain_notices().is_empty());

        h.session.toggle_play();
        h.session.skip(10.0);
        assert!(!h.session.playback().is_playing);
        assert_eq!(h.session.playback().current_time, 0.0);
        assert!(h.media.take().is_empty());
        assert_eq!(h.session.current().map(|p| p.job_id.as_str()), Some("aaaa1111"));

        // Picking the podcast again retries playback.
        h.session.play_podcast(podcast("aaaa1111"));
        assert!(matches!(h.media.take().as_slice(), [MediaCommand::Load { .. }]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_podcast_loads_paused_at_zero() {
        let mut h = Harness::new(FakeApi::default());
        h.session.play_podcast(podcast("aaaa1111"));
        h.session.apply(SessionEvent::Media(MediaEvent::DurationChanged(180.0)));
        h.session.toggle_play();
        h.session.skip(30.0);
        assert_eq!(h.session.playback().current_time, 30.0);
        h.media.take();

        h.session.play_podcast(podcast("bbbb2222"));
        assert!(!h.session.playback().is_playing);
        assert_eq!(h.session.playback().current_time, 0.0);
        assert_eq!(
            h.media.take(),
            vec![MediaCommand::Load {
                url: "http://fake/audio/bbbb2222_podcast.mp3".to_string(),
                volume: 0.8,
                muted: false,
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_loaded_podcast_clears_playback() {
        let api = FakeApi::default();
        *api.library.lock().unwrap() = vec![podcast("aaaa1111"), podcast("bbbb2222")];
        let mut h = Harness::new(api);
        h.session.play_podcast(podcast("aaaa1111"));
        h.media.take();

        h.session.delete_podcast("aaaa1111".to_string());
        assert_eq!(h.step().await, "delete");
        assert!(h.session.current().is_none());
        assert_eq!(h.session.view(), View::Home);
        assert_eq!(h.media.take(), vec![MediaCommand::Stop]);
        assert_eq!(h.step().await, "library");
        assert_eq!(h.session.library().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_other_podcast_leaves_playback() {
        let api = FakeApi::default();
        *api.library.lock().unwrap() = vec![podcast("aaaa1111"), podcast("bbbb2222")];
        let mut h = Harness::new(api);
        h.session.play_podcast(podcast("aaaa1111"));
        h.media.take();

        h.session.delete_podcast("bbbb2222".to_string());
        assert_eq!(h.step().await, "delete");
        assert_eq!(h.step().await, "library");
        assert_eq!(h.session.current().map(|p| p.job_id.as_str()), Some("aaaa1111"));
        assert_eq!(h.session.view(), View::Player);
        assert!(h.media.take().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_not_found_still_refreshes() {
        let mut h = Harness::new(FakeApi::default());
        h.session.delete_podcast("zzzz9999".to_string());
        assert_eq!(h.step().await, "delete");
        assert_eq!(h.step().await, "library");
        assert_eq!(h.api.library_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_transport_failure_changes_nothing() {
        let api = FakeApi::default();
        api.delete_fails.store(true, Ordering::SeqCst);
        let mut h = Harness::new(api);
        h.session.play_podcast(podcast("aaaa1111"));

        h.session.delete_podcast("aaaa1111".to_string());
        assert_eq!(h.step().await, "delete");
        assert!(h.session.current().is_some());
        assert_eq!(h.session.view(), View::Player);
        assert_eq!(h.api.library_calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            h.session.drain_notices(),
            vec![Notice {
                level: NoticeLevel::Warning,
                message: "Delete failed".to_string()
            }]
        );
        assert!(h.quiet_for(5).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_library_failure_keeps_previous_list() {
        let api = FakeApi::default();
        *api.library.lock().unwrap() = vec![podcast("aaaa1111")];
        let mut h = Harness::new(api);
        h.session.load_library();
        assert_eq!(h.step().await, "library");
        assert_eq!(h.session.library().len(), 1);

        h.api.library_fails.store(true, Ordering::SeqCst);
        h.session.load_library();
        assert_eq!(h.step().await, "library");
        assert_eq!(h.session.library().len(), 1);
        assert_eq!(h.session.drain_notices().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_home_shows_six_most_recent() {
        let api = FakeApi::default();
        *api.library.lock().unwrap() = (0..9).map(|i| podcast(&format!("job{i:05}"))).collect();
        let mut h = Harness::new(api);
        h.session.load_library();
        h.step().await;
        match h.session.screen() {
            Screen::Home { recent } => {
                assert_eq!(recent.len(), RECENT_COUNT);
                assert_eq!(recent[0].job_id, "job00000");
            }
            other => panic!("unexpected screen {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_demo_promotes_like_completed_job() {
        let mut h = Harness::new(FakeApi::default());
        h.session.try_demo();
        assert_eq!(h.session.view(), View::Processing);
        assert_eq!(h.step().await, "demo");
        assert_eq!(h.session.job_id(), Some("demo0001"));
        assert_eq!(h.session.current().map(|p| p.job_id.as_str()), Some("demo0001"));
        assert!(!h.session.is_polling());

        assert_eq!(h.step().await, "library");
        assert_eq!(h.step().await, "show-player");
        assert_eq!(h.session.view(), View::Player);
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_reports_saved_path() {
        let mut h = Harness::new(FakeApi::default());
        h.session.download_podcast("aaaa1111".to_string());
        assert!(h.session.downloads().contains("aaaa1111"));
        h.session.download_podcast("aaaa1111".to_string());
        assert_eq!(h.step().await, "download");
        assert!(!h.session.downloads().contains("aaaa1111"));

        let notices = h.session.drain_notices();
        assert_eq!(notices[0].message, "Downloading…");
        assert_eq!(notices[1].message, "Already downloading");
        assert_eq!(notices[2].level, NoticeLevel::Success);
        assert!(notices[2].message.ends_with("notecast_aaaa1111.mp3"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stage_rejects_unsupported_file() {
        let mut h = Harness::new(FakeApi::default());
        let path = h.dir.path().join("notes.docx");
        std::fs::write(&path, b"x").unwrap();
        h.session.stage_file(&path);
        assert!(h.session.form().staged.is_none());
        assert_eq!(h.session.drain_notices()[0].level, NoticeLevel::Warning);
    }

    #[test]
    fn test_subject_cycles_and_wraps() {
        let mut form = UploadForm::default();
        assert_eq!(form.subject_name(), "Physics");
        form.subject = SUBJECTS.len() - 1;
        assert_eq!(form.subject_name(), "General");
    }
}
