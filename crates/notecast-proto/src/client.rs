//! HTTP client for the podcast backend.
//!
//! One method per endpoint. Non-2xx responses become [`ApiError::Status`]
//! except for `DELETE`, where the caller only cares that the server answered.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::{multipart, Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::model::{
    default_chapter, LibraryResponse, Podcast, ProcessingStatus, StagedFile, UploadResponse,
};

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base: Url,
    base_str: String,
    audio_base: String,
}

impl ApiClient {
    pub fn new(api: &ApiConfig) -> ApiResult<Self> {
        let base_str = api.base_url.trim_end_matches('/').to_string();
        let base = Url::parse(&base_str).map_err(|e| ApiError::Url {
            url: api.base_url.clone(),
            reason: e.to_string(),
        })?;
        let http = Client::builder()
            .user_agent(concat!("notecast/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base,
            base_str,
            audio_base: api.audio_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_str
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_str, path)
    }

    pub async fn library(&self) -> ApiResult<Vec<Podcast>> {
        let resp = self.http.get(self.endpoint("library")).send().await?;
        let library: LibraryResponse = decode(check(resp).await?).await?;
        debug!("library: {} podcasts", library.podcasts.len());
        Ok(library.podcasts)
    }

    /// Submit a staged file. Returns the job id the server assigned.
    pub async fn upload(&self, file: &StagedFile, subject: &str, chapter: &str) -> ApiResult<String> {
        let bytes = tokio::fs::read(&file.path).await?;
        let chapter = if chapter.is_empty() {
            default_chapter(&file.file_name)
        } else {
            chapter.to_string()
        };
        let part = multipart::Part::bytes(bytes)
            .file_name(file.file_name.clone())
            .mime_str(file.mime())?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("subject", subject.to_string())
            .text("chapter", chapter.clone());

        info!(
            "uploading {} ({}, subject={}, chapter={})",
            file.file_name,
            file.size_mb(),
            subject,
            chapter
        );
        let resp = self
            .http
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await?;
        let upload: UploadResponse = decode(check(resp).await?).await?;
        if upload.job_id.is_empty() {
            return Err(ApiError::MissingJobId);
        }
        Ok(upload.job_id)
    }

    pub async fn status(&self, job_id: &str) -> ApiResult<ProcessingStatus> {
        let resp = self
            .http
            .get(self.endpoint(&format!("status/{job_id}")))
            .send()
            .await?;
        decode(check(resp).await?).await
    }

    /// Any HTTP answer counts as done; only transport failures are errors.
    pub async fn delete(&self, job_id: &str) -> ApiResult<StatusCode> {
        let resp = self
            .http
            .delete(self.endpoint(&format!("podcast/{job_id}")))
            .send()
            .await?;
        Ok(resp.status())
    }

    /// Generate the canned demo podcast. The server answers with a
    /// completed status.
    pub async fn demo(&self) -> ApiResult<ProcessingStatus> {
        let resp = self.http.post(self.endpoint("demo")).send().await?;
        decode(check(resp).await?).await
    }

    pub fn download_url(&self, job_id: &str) -> String {
        self.endpoint(&format!("download/{job_id}"))
    }

    /// Stream `GET /download/{id}` into `dir`, creating it if needed.
    pub async fn download_to(&self, job_id: &str, dir: &Path) -> ApiResult<PathBuf> {
        let resp = check(self.http.get(self.download_url(job_id)).send().await?).await?;
        let file_name = resp
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(filename_from_disposition)
            .unwrap_or_else(|| format!("notecast_{job_id}.mp3"));

        tokio::fs::create_dir_all(dir).await?;
        let target = free_target(dir, &file_name).await?;
        let part = part_path(&target);
        let written = match stream_to(resp, &part).await {
            Ok(n) => n,
            Err(e) => {
                let _ = tokio::fs::remove_file(&part).await;
                return Err(e);
            }
        };
        tokio::fs::rename(&part, &target).await?;
        info!("downloaded {} ({} bytes) to {:?}", job_id, written, target);
        Ok(target)
    }

    /// Playable URL for a podcast: its `audio_url` (absolute, or resolved
    /// against the API origin), else the audio file under the audio base.
    pub fn audio_source(&self, podcast: &Podcast) -> Option<String> {
        if let Some(url) = podcast.audio_url.as_deref().filter(|u| !u.is_empty()) {
            if let Ok(absolute) = Url::parse(url) {
                return Some(absolute.to_string());
            }
            return self.base.join(url).ok().map(|u| u.to_string());
        }
        podcast
            .audio_file
            .as_deref()
            .filter(|f| !f.is_empty())
            .map(|f| format!("{}/{}", self.audio_base, f))
    }
}

/// Body goes to `<name>.part` first and is renamed into place on success.
async fn stream_to(resp: Response, part: &Path) -> ApiResult<u64> {
    let mut out = tokio::fs::File::create(part).await?;
    let mut stream = resp.bytes_stream();
    let mut written: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        out.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    out.flush().await?;
    Ok(written)
}

fn part_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    target.with_file_name(name)
}

/// `dir/name`, or `dir/stem (n).ext` when that file already exists.
async fn free_target(dir: &Path, file_name: &str) -> ApiResult<PathBuf> {
    let candidate = dir.join(file_name);
    if !tokio::fs::try_exists(&candidate).await? {
        return Ok(candidate);
    }
    let path = Path::new(file_name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    let ext = path.extension().and_then(|e| e.to_str());
    let mut n = 1u32;
    loop {
        let name = match ext {
            Some(ext) => format!("{stem} ({n}).{ext}"),
            None => format!("{stem} ({n})"),
        };
        let candidate = dir.join(name);
        if !tokio::fs::try_exists(&candidate).await? {
            return Ok(candidate);
        }
        n += 1;
    }
}

async fn check(resp: Response) -> ApiResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ApiError::Status { status, body })
}

async fn decode<T: DeserializeOwned>(resp: Response) -> ApiResult<T> {
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Bare file name from a `Content-Disposition` header, path components dropped.
pub fn filename_from_disposition(header: &str) -> Option<String> {
    let raw = header.split(';').map(str::trim).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("filename")
            .then(|| value.trim().trim_matches('"').to_string())
    })?;
    let name = Path::new(&raw).file_name()?.to_string_lossy().into_owned();
    (!name.is_empty()).then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ApiClient {
        ApiClient::new(&ApiConfig {
            base_url: "https://notes.example.com/api/".to_string(),
            audio_base: "https://notes.example.com/audio".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        let err = ApiClient::new(&ApiConfig {
            base_url: "not a url".to_string(),
            audio_base: String::new(),
        })
        .unwrap_err();
        assert!(matches!(err, ApiError::Url { .. }));
    }

    #[test]
    fn test_endpoints_join_without_double_slash() {
        let c = client();
        assert_eq!(c.base_url(), "https://notes.example.com/api");
        assert_eq!(
            c.download_url("ab12"),
            "https://notes.example.com/api/download/ab12"
        );
    }

    #[test]
    fn test_audio_source_relative_url_resolves_against_origin() {
        let podcast = Podcast {
            audio_url: Some("/audio/ab12_podcast.mp3".to_string()),
            audio_file: Some("ignored.mp3".to_string()),
            ..Default::default()
        };
        assert_eq!(
            client().audio_source(&podcast).as_deref(),
            Some("https://notes.example.com/audio/ab12_podcast.mp3")
        );
    }

    #[test]
    fn test_audio_source_absolute_url_is_kept() {
        let podcast = Podcast {
            audio_url: Some("https://cdn.example.net/x.mp3".to_string()),
            ..Default::default()
        };
        assert_eq!(
            client().audio_source(&podcast).as_deref(),
            Some("https://cdn.example.net/x.mp3")
        );
    }

    #[test]
    fn test_audio_source_falls_back_to_audio_file() {
        let podcast = Podcast {
            audio_file: Some("cd34_podcast.mp3".to_string()),
            ..Default::default()
        };
        assert_eq!(
            client().audio_source(&podcast).as_deref(),
            Some("https://notes.example.com/audio/cd34_podcast.mp3")
        );
        assert_eq!(client().audio_source(&Podcast::default()), None);
    }

    #[test]
    fn test_filename_from_disposition() {
        assert_eq!(
            filename_from_disposition(r#"attachment; filename="commute_learn_Physics_Optics.mp3""#)
                .as_deref(),
            Some("commute_learn_Physics_Optics.mp3")
        );
        assert_eq!(
            filename_from_disposition("attachment; filename=plain.mp3").as_deref(),
            Some("plain.mp3")
        );
        assert_eq!(
            filename_from_disposition(r#"attachment; filename="../../etc/passwd""#).as_deref(),
            Some("passwd")
        );
        assert_eq!(filename_from_disposition("inline"), None);
    }
}
