use thiserror::Error;

/// Failures talking to the podcast backend.
///
/// `Transport` and `Status` are what the session treats as transport
/// failures; a job the server reports as `failed` is not an error here.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid URL '{url}': {reason}")]
    Url { url: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("upload accepted without a job id")]
    MissingJobId,

    #[error("unsupported file type '{0}' (use PDF or an image)")]
    UnsupportedFile(String),
}

pub type ApiResult<T> = Result<T, ApiError>;
