//! Wire model for the podcast backend.
//!
//! Every field the server may omit carries `#[serde(default)]`: a response
//! with missing fields degrades to empty/zero values instead of failing to
//! decode.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};

/// Subjects offered by the upload form.
pub const SUBJECTS: [&str; 9] = [
    "Physics",
    "Chemistry",
    "Biology",
    "Mathematics",
    "English",
    "Hindi",
    "History",
    "Geography",
    "General",
];

/// Extensions the upload picker accepts.
pub const ACCEPTED_EXTENSIONS: [&str; 5] = ["pdf", "jpg", "jpeg", "png", "webp"];

/// Server job state. `uploaded` and anything unrecognised are non-terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Uploaded,
    Processing,
    Completed,
    Failed,
    #[default]
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Pipeline stage, used only for progress display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Upload,
    Ocr,
    Script,
    Tts,
    Done,
    Error,
    #[serde(other)]
    Unknown,
}

/// The five displayed stages, in pipeline order.
pub const STAGES: [(Stage, &str); 5] = [
    (Stage::Upload, "Uploading"),
    (Stage::Ocr, "Reading Notes"),
    (Stage::Script, "Writing Script"),
    (Stage::Tts, "Recording Audio"),
    (Stage::Done, "Complete!"),
];

/// Position of `stage` in [`STAGES`]; absent or unlisted stages map to 0.
pub fn stage_index(stage: Option<Stage>) -> usize {
    stage
        .and_then(|s| STAGES.iter().position(|(key, _)| *key == s))
        .unwrap_or(0)
}

/// A finished podcast as listed by the library or embedded in a completed status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Podcast {
    #[serde(default)]
    pub job_id: String,
    #[serde(default)]
    pub title: String,
    /// Seconds.
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub audio_file: Option<String>,
    #[serde(default)]
    pub original_file: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

impl Podcast {
    pub fn duration_minutes(&self) -> u64 {
        if self.duration.is_finite() && self.duration > 0.0 {
            (self.duration / 60.0).floor() as u64
        } else {
            0
        }
    }

    /// Creation date for display, `None` when the server timestamp doesn't parse.
    pub fn created_date(&self) -> Option<chrono::NaiveDate> {
        if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(&self.created_at) {
            return Some(dt.date_naive());
        }
        chrono::NaiveDateTime::parse_from_str(&self.created_at, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|dt| dt.date())
            .ok()
    }

    /// Stable palette slot derived from the first byte of the job id.
    pub fn color_index(&self, palette_len: usize) -> usize {
        if palette_len == 0 {
            return 0;
        }
        self.job_id
            .bytes()
            .next()
            .map(|b| b as usize % palette_len)
            .unwrap_or(0)
    }
}

/// Snapshot returned by `GET /status/{job_id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingStatus {
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub stage: Option<Stage>,
    /// Percentage as sent by the server; never clamped client-side.
    #[serde(default)]
    pub progress: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub metadata: Option<Podcast>,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
}

impl ProcessingStatus {
    /// Placeholder shown when the upload request itself never reached the server.
    pub fn upload_failed() -> Self {
        Self {
            status: JobStatus::Failed,
            progress: 0,
            message: "Upload failed. Please try again.".to_string(),
            ..Default::default()
        }
    }

    /// The podcast a completed status describes: its metadata with the
    /// status-level audio locator laid over it.
    pub fn completed_podcast(&self) -> Option<Podcast> {
        if self.status != JobStatus::Completed {
            return None;
        }
        let mut podcast = self.metadata.clone().unwrap_or_default();
        podcast.audio_url = self.audio_url.clone();
        Some(podcast)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibraryResponse {
    #[serde(default)]
    pub podcasts: Vec<Podcast>,
    #[serde(default)]
    pub total: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub job_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A local file picked for upload but not yet submitted.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedFile {
    pub path: PathBuf,
    pub file_name: String,
    pub size_bytes: u64,
}

impl StagedFile {
    /// Validate `path` the way the upload picker does: an existing regular
    /// file with one of [`ACCEPTED_EXTENSIONS`].
    pub fn stage(path: impl AsRef<Path>) -> ApiResult<Self> {
        let path = path.as_ref();
        let meta = std::fs::metadata(path)?;
        if !meta.is_file() {
            return Err(ApiError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a file", path.display()),
            )));
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if mime_for_path(path).is_none() {
            return Err(ApiError::UnsupportedFile(file_name));
        }
        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            size_bytes: meta.len(),
        })
    }

    pub fn size_mb(&self) -> String {
        format!("{:.2} MB", self.size_bytes as f64 / 1024.0 / 1024.0)
    }

    pub fn is_pdf(&self) -> bool {
        mime_for_path(&self.path) == Some("application/pdf")
    }

    pub fn mime(&self) -> &'static str {
        mime_for_path(&self.path).unwrap_or("application/octet-stream")
    }
}

/// MIME type sent with the multipart `file` part; `None` for unaccepted files.
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some("application/pdf"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Chapter used when the form field is left empty: the file name with its
/// last extension removed.
pub fn default_chapter(file_name: &str) -> String {
    match file_name.rfind('.') {
        Some(idx) if idx + 1 < file_name.len() && !file_name[idx + 1..].contains('/') => {
            file_name[..idx].to_string()
        }
        _ => file_name.to_string(),
    }
}
