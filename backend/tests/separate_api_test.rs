//! Integration tests for the HTTP surface
//!
//! These tests drive the full router with `tower::ServiceExt::oneshot` and a
//! small shell script standing in for the Demucs CLI. The script follows the
//! tool's argument and output conventions:
//! `--two-stems=vocals -n <model> -o <root> [--mp3|--flac] <input>`.

#![cfg(unix)]

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use vocal_separator_backend::api;
use vocal_separator_backend::config::Config;
use vocal_separator_backend::services::staging::StagingService;
use vocal_separator_backend::state::AppState;

const BOUNDARY: &str = "separator-test-boundary";

/// Mimics Demucs: parses its flags and writes both stems
const FAKE_DEMUCS: &str = r#"
model=""; out=""; input=""; ext="wav"
while [ $# -gt 0 ]; do
  case "$1" in
    -n) model="$2"; shift 2 ;;
    -o) out="$2"; shift 2 ;;
    --mp3) ext="mp3"; shift ;;
    --flac) ext="flac"; shift ;;
    --*) shift ;;
    *) input="$1"; shift ;;
  esac
done
[ -f "$input" ] || { echo "input missing: $input" >&2; exit 2; }
track=$(basename "$input"); track="${track%.*}"
mkdir -p "$out/$model/$track"
printf 'vocals of %s' "$track" > "$out/$model/$track/vocals.$ext"
printf 'accompaniment of %s' "$track" > "$out/$model/$track/no_vocals.$ext"
"#;

const FAILING_DEMUCS: &str = r#"
echo "RuntimeError: Could not load file, it might be corrupted" >&2
exit 1
"#;

const SILENT_DEMUCS: &str = "exit 0\n";

const SLOW_DEMUCS: &str = "sleep 10\n";

struct TestApp {
    router: Router,
    base: TempDir,
}

impl TestApp {
    async fn new(script: &str, configure: impl FnOnce(&mut Config)) -> Self {
        let base = tempdir().expect("Failed to create temp dir");
        let script_path = base.path().join("fake_demucs.sh");
        std::fs::write(&script_path, script).expect("Failed to write fake tool");

        let mut config = Config::default();
        config.storage.base_dir = base.path().join("srv");
        config.separation.program = "sh".to_string();
        config.separation.program_args = vec![script_path.to_string_lossy().into_owned()];
        configure(&mut config);

        StagingService::ensure_directories(&config.storage)
            .await
            .expect("Failed to create directories");

        let router = api::router(AppState::new(config, CancellationToken::new()));
        Self { router, base }
    }

    fn srv(&self) -> PathBuf {
        self.base.path().join("srv")
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router should not fail");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        (status, body.to_vec())
    }

    async fn send_json(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, body) = self.send(request).await;
        let json = serde_json::from_slice(&body).expect("Body should be JSON");
        (status, json)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Vec<u8>) {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }
}

fn legacy_layout(config: &mut Config) {
    config.storage.isolate_jobs = false;
}

fn upload_request(field: &str, filename: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: audio/mpeg\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::post("/separate")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn detail(json: &Value) -> &str {
    json["detail"].as_str().expect("Error body should carry detail")
}

#[tokio::test]
async fn test_root_status_is_fixed() {
    let app = TestApp::new(FAILING_DEMUCS, |_| {}).await;

    let (status, json) = app
        .send_json(Request::get("/").body(Body::empty()).unwrap())
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Vocal Separator API is running");
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::new(FAKE_DEMUCS, |_| {}).await;

    let (status, json) = app
        .send_json(Request::get("/api/health").body(Body::empty()).unwrap())
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
}

/// upload `song.mp3` → `temp/song.mp3` → `outputs/htdemucs/song/{vocals,no_vocals}.wav`
#[tokio::test]
async fn test_end_to_end_legacy_layout() {
    let app = TestApp::new(FAKE_DEMUCS, legacy_layout).await;

    let (status, json) = app
        .send_json(upload_request("file", "song.mp3", b"ID3 fake mp3 bytes"))
        .await;

    assert_eq!(status, StatusCode::OK, "unexpected body: {}", json);
    assert_eq!(json["message"], "Separation complete");
    assert_eq!(json["vocals"], "/outputs/htdemucs/song/vocals.wav");
    assert_eq!(json["accompaniment"], "/outputs/htdemucs/song/no_vocals.wav");

    let staged = app.srv().join("temp").join("song.mp3");
    assert_eq!(std::fs::read(staged).unwrap(), b"ID3 fake mp3 bytes");

    for key in ["vocals", "accompaniment"] {
        let (status, bytes) = app.get(json[key].as_str().unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!bytes.is_empty());
    }

    let (_, vocals) = app.get("/outputs/htdemucs/song/vocals.wav").await;
    assert_eq!(vocals, b"vocals of song");
}

#[tokio::test]
async fn test_isolated_jobs_get_distinct_urls() {
    let app = TestApp::new(FAKE_DEMUCS, |_| {}).await;

    let (status, first) = app
        .send_json(upload_request("file", "song.mp3", b"first"))
        .await;
    assert_eq!(status, StatusCode::OK, "unexpected body: {}", first);
    let (_, second) = app
        .send_json(upload_request("file", "song.mp3", b"second"))
        .await;

    let job_id = first["job_id"].as_str().unwrap();
    assert_eq!(
        first["vocals"],
        format!("/outputs/{}/htdemucs/song/vocals.wav", job_id)
    );
    assert_ne!(first["vocals"], second["vocals"]);

    let staged = app.srv().join("temp").join(job_id).join("song.mp3");
    assert_eq!(std::fs::read(staged).unwrap(), b"first");

    let (status, _) = app.get(first["accompaniment"].as_str().unwrap()).await;
    assert_eq!(status, StatusCode::OK);
}

/// Known race in the legacy layout: identical filenames share staging and output paths
#[tokio::test]
async fn test_legacy_reupload_overwrites_staged_file() {
    let app = TestApp::new(FAKE_DEMUCS, legacy_layout).await;

    let (_, first) = app
        .send_json(upload_request("file", "song.mp3", b"take one"))
        .await;
    let (_, second) = app
        .send_json(upload_request("file", "song.mp3", b"take two"))
        .await;

    assert_eq!(first["vocals"], second["vocals"]);
    assert_eq!(first["accompaniment"], second["accompaniment"]);
    let staged = app.srv().join("temp").join("song.mp3");
    assert_eq!(std::fs::read(staged).unwrap(), b"take two");
}

#[tokio::test]
async fn test_output_format_changes_extension() {
    let app = TestApp::new(FAKE_DEMUCS, |config| {
        legacy_layout(config);
        config.separation.output_format = "mp3".parse().unwrap();
    })
    .await;

    let (status, json) = app
        .send_json(upload_request("file", "track.flac", b"fLaC"))
        .await;

    assert_eq!(status, StatusCode::OK, "unexpected body: {}", json);
    assert_eq!(json["vocals"], "/outputs/htdemucs/track/vocals.mp3");
}

#[tokio::test]
async fn test_tool_failure_surfaces_stderr() {
    let app = TestApp::new(FAILING_DEMUCS, |_| {}).await;

    let (status, json) = app
        .send_json(upload_request("file", "broken.mp3", b"garbage"))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(detail(&json).contains("RuntimeError: Could not load file, it might be corrupted"));
}

#[tokio::test]
async fn test_missing_outputs_are_reported() {
    let app = TestApp::new(SILENT_DEMUCS, |_| {}).await;

    let (status, json) = app
        .send_json(upload_request("file", "song.mp3", b"audio"))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(detail(&json).contains("not found"));
}

#[tokio::test]
async fn test_missing_tool_is_server_error() {
    let app = TestApp::new(FAKE_DEMUCS, |config| {
        config.separation.program = "demucs-not-installed-12345".to_string();
        config.separation.program_args.clear();
    })
    .await;

    let (status, json) = app
        .send_json(upload_request("file", "song.mp3", b"audio"))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(detail(&json).contains("demucs-not-installed-12345"));
}

#[tokio::test]
async fn test_job_timeout() {
    let app = TestApp::new(SLOW_DEMUCS, |config| {
        config.execution.job_timeout_secs = 1;
    })
    .await;

    let start = std::time::Instant::now();
    let (status, json) = app
        .send_json(upload_request("file", "song.mp3", b"audio"))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(detail(&json).contains("timed out"));
    assert!(start.elapsed() < std::time::Duration::from_secs(5));
}

#[tokio::test]
async fn test_wrong_field_name_is_rejected() {
    let app = TestApp::new(FAKE_DEMUCS, |_| {}).await;

    let (status, json) = app
        .send_json(upload_request("audio", "song.mp3", b"audio"))
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(detail(&json).contains("file"));
}

#[tokio::test]
async fn test_non_multipart_body_is_rejected() {
    let app = TestApp::new(FAKE_DEMUCS, |_| {}).await;

    let request = Request::post("/separate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let (status, json) = app.send_json(request).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(!detail(&json).is_empty());
}

#[tokio::test]
async fn test_traversal_filename_stays_in_staging() {
    let app = TestApp::new(FAKE_DEMUCS, legacy_layout).await;

    let (status, json) = app
        .send_json(upload_request("file", "../../escape.mp3", b"audio"))
        .await;

    assert_eq!(status, StatusCode::OK, "unexpected body: {}", json);
    assert!(app.srv().join("temp").join("escape.mp3").is_file());
    assert!(!app.base.path().join("escape.mp3").exists());
    assert_eq!(json["vocals"], "/outputs/htdemucs/escape/vocals.wav");
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let app = TestApp::new(FAKE_DEMUCS, |_| {}).await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::get("/")
                .header(header::ORIGIN, "http://localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}

#[tokio::test]
async fn test_unknown_output_is_not_found() {
    let app = TestApp::new(FAKE_DEMUCS, |_| {}).await;

    let (status, _) = app.get("/outputs/htdemucs/nothing/vocals.wav").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
