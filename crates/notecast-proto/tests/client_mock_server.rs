mod common;

use common::{spawn_mock_backend, AUDIO_BYTES};
use notecast_proto::model::{JobStatus, Stage, StagedFile};
use notecast_proto::ApiError;

#[tokio::test]
async fn library_preserves_server_order() {
    let server = spawn_mock_backend().await;
    let podcasts = server.client().library().await.unwrap();
    let ids: Vec<_> = podcasts.iter().map(|p| p.job_id.as_str()).collect();
    assert_eq!(ids, vec!["bbbb2222", "aaaa1111"]);
    assert_eq!(podcasts[1].title, "Physics - Optics");
    assert_eq!(podcasts[1].duration_minutes(), 4);
}

#[tokio::test]
async fn upload_sends_multipart_fields_with_mime_from_extension() {
    let server = spawn_mock_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("optics-notes.pdf");
    std::fs::write(&path, b"%PDF-1.4 fake").unwrap();
    let staged = StagedFile::stage(&path).unwrap();

    let job_id = server
        .client()
        .upload(&staged, "Physics", "Optics")
        .await
        .unwrap();
    assert_eq!(job_id, "job00001");

    let uploads = server.backend.uploads.lock().unwrap().clone();
    assert_eq!(uploads.len(), 1);
    let record = &uploads[0];
    assert_eq!(record.file_name.as_deref(), Some("optics-notes.pdf"));
    assert_eq!(record.content_type.as_deref(), Some("application/pdf"));
    assert_eq!(record.size, 13);
    assert_eq!(record.subject.as_deref(), Some("Physics"));
    assert_eq!(record.chapter.as_deref(), Some("Optics"));
}

#[tokio::test]
async fn upload_with_empty_chapter_uses_file_stem() {
    let server = spawn_mock_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chapter.3.png");
    std::fs::write(&path, [0u8; 32]).unwrap();
    let staged = StagedFile::stage(&path).unwrap();

    server.client().upload(&staged, "Biology", "").await.unwrap();

    let uploads = server.backend.uploads.lock().unwrap().clone();
    assert_eq!(uploads[0].chapter.as_deref(), Some("chapter.3"));
    assert_eq!(uploads[0].content_type.as_deref(), Some("image/png"));
}

#[tokio::test]
async fn status_completed_carries_metadata_and_audio_url() {
    let server = spawn_mock_backend().await;
    let client = server.client();
    let status = client.status("job00001").await.unwrap();
    assert_eq!(status.status, JobStatus::Completed);
    assert_eq!(status.stage, Some(Stage::Done));

    let podcast = status.completed_podcast().unwrap();
    assert_eq!(podcast.job_id, "job00001");
    let source = client.audio_source(&podcast).unwrap();
    assert_eq!(
        source,
        format!("http://{}/audio/job00001_podcast.mp3", server.addr)
    );
}

#[tokio::test]
async fn status_in_progress_and_unknown_job() {
    let server = spawn_mock_backend().await;
    let client = server.client();

    let status = client.status("slowjob1").await.unwrap();
    assert_eq!(status.status, JobStatus::Processing);
    assert_eq!(status.progress, 55);

    let err = client.status("nope").await.unwrap_err();
    match err {
        ApiError::Status { status, .. } => assert_eq!(status.as_u16(), 404),
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn delete_reports_any_http_answer() {
    let server = spawn_mock_backend().await;
    let client = server.client();
    assert_eq!(client.delete("aaaa1111").await.unwrap().as_u16(), 200);
    assert_eq!(client.delete("missing1").await.unwrap().as_u16(), 404);
    assert_eq!(
        server.backend.deleted.lock().unwrap().as_slice(),
        ["aaaa1111".to_string()]
    );
}

#[tokio::test]
async fn delete_transport_failure_is_an_error() {
    let server = spawn_mock_backend().await;
    let mut config = server.api_config();
    // Nothing listens on port 9 of localhost in the test environment.
    config.base_url = "http://127.0.0.1:9/api".to_string();
    let client = notecast_proto::ApiClient::new(&config).unwrap();
    assert!(matches!(
        client.delete("aaaa1111").await,
        Err(ApiError::Transport(_))
    ));
}

#[tokio::test]
async fn download_uses_content_disposition_name() {
    let server = spawn_mock_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let target_dir = dir.path().join("downloads");

    let path = server
        .client()
        .download_to("aaaa1111", &target_dir)
        .await
        .unwrap();
    assert_eq!(
        path.file_name().unwrap().to_str(),
        Some("commute_learn_Physics_Optics.mp3")
    );
    assert_eq!(std::fs::read(&path).unwrap(), AUDIO_BYTES);
}

#[tokio::test]
async fn download_without_disposition_falls_back_to_job_name() {
    let server = spawn_mock_backend().await;
    let dir = tempfile::tempdir().unwrap();

    let path = server
        .client()
        .download_to("bbbb2222", dir.path())
        .await
        .unwrap();
    assert_eq!(
        path.file_name().unwrap().to_str(),
        Some("notecast_bbbb2222.mp3")
    );
}

#[tokio::test]
async fn download_missing_podcast_writes_nothing() {
    let server = spawn_mock_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let result = server.client().download_to("zzzz9999", dir.path()).await;
    assert!(matches!(result, Err(ApiError::Status { .. })));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn download_never_overwrites_an_existing_file() {
    let server = spawn_mock_backend().await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("notecast_bbbb2222.mp3"), b"keep me").unwrap();

    let path = server
        .client()
        .download_to("bbbb2222", dir.path())
        .await
        .unwrap();
    assert_eq!(
        path.file_name().unwrap().to_str(),
        Some("notecast_bbbb2222 (1).mp3")
    );
    assert_eq!(
        std::fs::read(dir.path().join("notecast_bbbb2222.mp3")).unwrap(),
        b"keep me"
    );
    assert_eq!(std::fs::read(&path).unwrap(), AUDIO_BYTES);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
}

#[tokio::test]
async fn download_cut_off_midway_leaves_no_file() {
    let server = spawn_mock_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let result = server.client().download_to("cccc3333", dir.path()).await;
    assert!(result.is_err());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn upload_answer_without_job_id_is_an_error() {
    let server = spawn_mock_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.pdf");
    std::fs::write(&path, b"%PDF-1.4").unwrap();
    let staged = StagedFile::stage(&path).unwrap();

    let result = server.client().upload(&staged, "NoJob", "Optics").await;
    assert!(matches!(result, Err(ApiError::MissingJobId)));
}

#[tokio::test]
async fn demo_returns_completed_status() {
    let server = spawn_mock_backend().await;
    let status = server.client().demo().await.unwrap();
    assert_eq!(status.status, JobStatus::Completed);
    let podcast = status.completed_podcast().unwrap();
    assert_eq!(podcast.job_id, "demo0001");
    assert!(podcast.script.is_some());
}
