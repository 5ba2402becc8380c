#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{delete, get, post};
use axum::Router;
use notecast_proto::config::ApiConfig;
use notecast_proto::ApiClient;
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub const AUDIO_BYTES: &[u8] = b"ID3\x03\x00fake-mp3-payload";

#[derive(Debug, Clone, Default)]
pub struct UploadRecord {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub size: usize,
    pub subject: Option<String>,
    pub chapter: Option<String>,
}

#[derive(Clone, Default)]
pub struct MockBackend {
    pub uploads: Arc<Mutex<Vec<UploadRecord>>>,
    pub deleted: Arc<Mutex<Vec<String>>>,
}

pub struct Running {
    pub addr: SocketAddr,
    pub backend: MockBackend,
}

impl Running {
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: format!("http://{}/api", self.addr),
            audio_base: format!("http://{}/audio", self.addr),
        }
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(&self.api_config()).expect("mock base url is valid")
    }
}

pub fn podcast_json(job_id: &str, title: &str, created_at: &str) -> Value {
    json!({
        "job_id": job_id,
        "title": title,
        "duration": 245,
        "created_at": created_at,
        "audio_file": format!("{job_id}_podcast.mp3"),
        "original_file": "notes.pdf",
        "script": "DIDI: Namaste!\nBHAIYA: Chalo shuru karte hain."
    })
}

fn completed_status(job_id: &str) -> Value {
    json!({
        "status": "completed",
        "stage": "done",
        "progress": 100,
        "message": "Your podcast is ready!",
        "audio_url": format!("/audio/{job_id}_podcast.mp3"),
        "metadata": podcast_json(job_id, "Physics - Optics", "2024-03-01T10:15:00.123456"),
    })
}

async fn library() -> Json<Value> {
    Json(json!({
        "podcasts": [
            podcast_json("bbbb2222", "Chemistry - Bonds", "2024-03-02T09:00:00"),
            podcast_json("aaaa1111", "Physics - Optics", "2024-03-01T10:15:00"),
        ],
        "total": 2
    }))
}

async fn upload(State(backend): State<MockBackend>, mut multipart: Multipart) -> Response {
    let mut record = UploadRecord::default();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                record.file_name = field.file_name().map(str::to_string);
                record.content_type = field.content_type().map(str::to_string);
                record.size = field.bytes().await.map(|b| b.len()).unwrap_or(0);
            }
            "subject" => record.subject = field.text().await.ok(),
            "chapter" => record.chapter = field.text().await.ok(),
            _ => {}
        }
    }

    let allowed = ["application/pdf", "image/jpeg", "image/png", "image/webp"];
    let accepted = record
        .content_type
        .as_deref()
        .map(|ct| allowed.contains(&ct))
        .unwrap_or(false);
    backend.uploads.lock().unwrap().push(record);
    if !accepted {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "Invalid file type"})),
        )
            .into_response();
    }
    if record_subject_is(&backend, "NoJob") {
        return Json(json!({"status": "uploaded"})).into_response();
    }
    Json(json!({
        "job_id": "job00001",
        "status": "uploaded",
        "message": "File uploaded. Processing started."
    }))
    .into_response()
}

fn record_subject_is(backend: &MockBackend, subject: &str) -> bool {
    backend
        .uploads
        .lock()
        .unwrap()
        .last()
        .and_then(|r| r.subject.as_deref())
        == Some(subject)
}

async fn status(Path(job_id): Path<String>) -> Response {
    match job_id.as_str() {
        "job00001" => Json(completed_status(&job_id)).into_response(),
        "slowjob1" => Json(json!({
            "status": "processing",
            "stage": "script",
            "progress": 55,
            "message": "Writing the script..."
        }))
        .into_response(),
        _ => (StatusCode::NOT_FOUND, Json(json!({"detail": "Job not found"}))).into_response(),
    }
}

async fn remove(State(backend): State<MockBackend>, Path(job_id): Path<String>) -> Response {
    if job_id == "aaaa1111" {
        backend.deleted.lock().unwrap().push(job_id);
        Json(json!({"message": "Deleted"})).into_response()
    } else {
        (StatusCode::NOT_FOUND, Json(json!({"detail": "Podcast not found"}))).into_response()
    }
}

async fn download(Path(job_id): Path<String>) -> Response {
    match job_id.as_str() {
        "aaaa1111" => (
            [
                (header::CONTENT_TYPE, "audio/mpeg"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"commute_learn_Physics_Optics.mp3\"",
                ),
            ],
            AUDIO_BYTES.to_vec(),
        )
            .into_response(),
        "bbbb2222" => ([(header::CONTENT_TYPE, "audio/mpeg")], AUDIO_BYTES.to_vec()).into_response(),
        // Body breaks off after the first chunk.
        "cccc3333" => {
            let chunks: Vec<Result<Vec<u8>, std::io::Error>> = vec![
                Ok(AUDIO_BYTES.to_vec()),
                Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "cut")),
            ];
            (
                [(header::CONTENT_TYPE, "audio/mpeg")],
                Body::from_stream(futures_util::stream::iter(chunks)),
            )
                .into_response()
        }
        _ => (StatusCode::NOT_FOUND, "missing").into_response(),
    }
}

async fn demo() -> Json<Value> {
    Json(completed_status("demo0001"))
}

/// Bind the mock backend on an ephemeral port and serve it in the background.
pub async fn spawn_mock_backend() -> Running {
    let backend = MockBackend::default();
    let app = Router::new()
        .route("/api/library", get(library))
        .route("/api/upload", post(upload))
        .route("/api/status/:job_id", get(status))
        .route("/api/podcast/:job_id", delete(remove))
        .route("/api/download/:job_id", get(download))
        .route("/api/demo", post(demo))
        .with_state(backend.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock backend");
    let addr = listener.local_addr().expect("mock backend addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Running { addr, backend }
}
