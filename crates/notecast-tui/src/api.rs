//! Backend seam used by the session. `ApiClient` is the real implementation;
//! tests script their own.

use std::future::Future;
use std::path::{Path, PathBuf};

use notecast_proto::model::{Podcast, ProcessingStatus, StagedFile};
use notecast_proto::{ApiClient, ApiResult};
use reqwest::StatusCode;

pub trait PodcastApi: Send + Sync + 'static {
    fn library(&self) -> impl Future<Output = ApiResult<Vec<Podcast>>> + Send;

    fn upload(
        &self,
        file: &StagedFile,
        subject: &str,
        chapter: &str,
    ) -> impl Future<Output = ApiResult<String>> + Send;

    fn status(&self, job_id: &str) -> impl Future<Output = ApiResult<ProcessingStatus>> + Send;

    fn delete(&self, job_id: &str) -> impl Future<Output = ApiResult<StatusCode>> + Send;

    fn demo(&self) -> impl Future<Output = ApiResult<ProcessingStatus>> + Send;

    fn download_to(
        &self,
        job_id: &str,
        dir: &Path,
    ) -> impl Future<Output = ApiResult<PathBuf>> + Send;

    fn download_url(&self, job_id: &str) -> String;

    fn audio_source(&self, podcast: &Podcast) -> Option<String>;
}

impl PodcastApi for ApiClient {
    fn library(&self) -> impl Future<Output = ApiResult<Vec<Podcast>>> + Send {
        ApiClient::library(self)
    }

    fn upload(
        &self,
        file: &StagedFile,
        subject: &str,
        chapter: &str,
    ) -> impl Future<Output = ApiResult<String>> + Send {
        ApiClient::upload(self, file, subject, chapter)
    }

    fn status(&self, job_id: &str) -> impl Future<Output = ApiResult<ProcessingStatus>> + Send {
        ApiClient::status(self, job_id)
    }

    fn delete(&self, job_id: &str) -> impl Future<Output = ApiResult<StatusCode>> + Send {
        ApiClient::delete(self, job_id)
    }

    fn demo(&self) -> impl Future<Output = ApiResult<ProcessingStatus>> + Send {
        ApiClient::demo(self)
    }

    fn download_to(
        &self,
        job_id: &str,
        dir: &Path,
    ) -> impl Future<Output = ApiResult<PathBuf>> + Send {
        ApiClient::download_to(self, job_id, dir)
    }

    fn download_url(&self, job_id: &str) -> String {
        ApiClient::download_url(self, job_id)
    }

    fn audio_source(&self, podcast: &Podcast) -> Option<String> {
        ApiClient::audio_source(self, podcast)
    }
}
