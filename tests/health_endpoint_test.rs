use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use healthchecker::handlers::health_router;
use healthchecker::health::HealthResponseBody;
use healthchecker::{probe_fn, HealthConfig, Healthchecker, ProbeOutcome};
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// Fake procfs tree for the current process
fn fake_proc(state: char, available_kb: u64) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let pid = std::process::id();
    let pid_dir = dir.path().join(pid.to_string());
    fs::create_dir_all(&pid_dir).unwrap();
    fs::write(
        pid_dir.join("stat"),
        format!("{} (health test) {} 1 1 1 0 -1", pid, state),
    )
    .unwrap();
    fs::write(
        dir.path().join("meminfo"),
        format!(
            "MemTotal: 2048 kB\nMemFree: 512 kB\nMemAvailable: {} kB\n",
            available_kb
        ),
    )
    .unwrap();
    dir
}

fn checker(proc_root: &TempDir, status_ko: u16) -> Healthchecker {
    HealthConfig {
        status_ko,
        ip_probe_target: "127.0.0.1:9".to_string(),
        runtime_version: Some("it-build".to_string()),
        proc_root: proc_root.path().to_path_buf(),
        ..Default::default()
    }
    .healthchecker()
    .unwrap()
}

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

#[tokio::test]
async fn test_failing_probe_returns_status_ko() {
    let proc_root = fake_proc('S', 1024);
    let calls = Arc::new(AtomicUsize::new(0));

    let mut h = checker(&proc_root, 500);
    let counter = calls.clone();
    h.add(
        probe_fn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            ProbeOutcome::ok(200)
        }),
        Some("health1"),
    );
    let counter = calls.clone();
    h.add(
        probe_fn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            ProbeOutcome::failed(500, "oh my god")
        }),
        Some("health2"),
    );

    let app = health_router(Arc::new(h), "/healthtest");
    let (status, body) = get(app, "/healthtest").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let body: HealthResponseBody = serde_json::from_slice(&body).unwrap();
    assert_eq!(body.code, 500);
    assert_eq!(body.info.len(), 1);
    assert_eq!(body.info[0].service, "health2");
    assert_eq!(body.info[0].message, "oh my god");
    assert_eq!(body.info[0].code, 500);
}

#[tokio::test]
async fn test_all_probes_pass() {
    let proc_root = fake_proc('R', 1024);

    let mut h = checker(&proc_root, 500);
    h.add(probe_fn(|| ProbeOutcome::ok(200)), Some("health1"));
    h.add(probe_fn(|| ProbeOutcome::ok(200)), None);

    let app = health_router(Arc::new(h), "/healthtest2");
    let (status, body) = get(app, "/healthtest2").await;

    assert_eq!(status, StatusCode::OK);

    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(value.get("info").is_none());
    assert_eq!(value["code"], 200);

    let system = &value["systemInformation"];
    assert_eq!(system["processStatus"], "R");
    assert_eq!(system["processActive"], true);
    assert_eq!(system["pid"], std::process::id());
    assert_eq!(system["memory"]["available"], 1024 * 1024);
    assert_eq!(system["ipAddress"], "127.0.0.1");
    assert_eq!(system["runtimeVersion"], "it-build");
    assert_eq!(system["canAcceptWork"], true);
    assert!(system["startTime"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_route_without_leading_slash() {
    let proc_root = fake_proc('S', 1);
    let h = checker(&proc_root, 500);

    let app = health_router(Arc::new(h), "healths");
    let (status, _) = get(app, "/healths").await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unnamed_failing_probe_still_returns_body() {
    let proc_root = fake_proc('S', 1);

    let mut h = checker(&proc_root, 400);
    h.add(probe_fn(|| ProbeOutcome::failed(500, "something happened")), None);

    let app = health_router(Arc::new(h), "health");
    let (status, body) = get(app, "/health").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);

    let body: HealthResponseBody = serde_json::from_slice(&body).unwrap();
    assert_eq!(body.code, 400);
    assert_eq!(body.info[0].service, "");
    assert_eq!(body.info[0].code, 500);
}

#[tokio::test]
async fn test_zombie_process_cannot_accept_work() {
    let proc_root = fake_proc('Z', 1024);
    let h = checker(&proc_root, 500);

    let app = health_router(Arc::new(h), "/health");
    let (status, body) = get(app, "/health").await;

    assert_eq!(status, StatusCode::OK);

    let body: HealthResponseBody = serde_json::from_slice(&body).unwrap();
    assert!(!body.system_information.process_active);
    assert!(!body.system_information.can_accept_work);
}

#[tokio::test]
async fn test_missing_procfs_reports_system_failure() {
    let proc_root = tempfile::tempdir().unwrap();
    let h = checker(&proc_root, 503);

    let app = health_router(Arc::new(h), "/health");
    let (status, body) = get(app, "/health").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let body: HealthResponseBody = serde_json::from_slice(&body).unwrap();
    assert_eq!(body.info.len(), 1);
    assert_eq!(body.info[0].service, "system");
    assert_eq!(body.system_information.process_status, "");
}

#[tokio::test]
async fn test_post_is_not_allowed() {
    let proc_root = fake_proc('S', 1);
    let app = health_router(Arc::new(checker(&proc_root, 500)), "/health");

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_sequential_queries_rerun_probes() {
    let proc_root = fake_proc('S', 1);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let mut h = checker(&proc_root, 500);
    h.add(
        probe_fn(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                ProbeOutcome::failed(503, "warming up")
            } else {
                ProbeOutcome::ok(200)
            }
        }),
        Some("warmup"),
    );

    let app = health_router(Arc::new(h), "/health");

    let (first, _) = get(app.clone(), "/health").await;
    let (second, _) = get(app, "/health").await;

    assert_eq!(first, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(second, StatusCode::OK);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
