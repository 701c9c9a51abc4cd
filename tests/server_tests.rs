use image::{GrayImage, Luma};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use shot_align::config::{ExtractorBackend, RemoteExtractorConfig};
use shot_align::server::protocol::{HealthResponse, LandmarkResponse};
use shot_align::server::DetectionServer;
use shot_align::{AlignmentAnalyzer, AlignmentVerdict, AnalysisResult, Config, ImageHandle, Tip};
use std::path::Path;
use tempfile::TempDir;
use tokio::net::TcpListener;

fn create_subject_image(width: u32, height: u32, cx: u32, cy: u32, size: u32) -> GrayImage {
    let half = size / 2;
    GrayImage::from_fn(width, height, |x, y| {
        let inside = x + half >= cx && x < cx + half && y + half >= cy && y < cy + half;
        Luma([if inside { 230 } else { 20 }])
    })
}

fn save(dir: &Path, name: &str, image: &GrayImage) -> ImageHandle {
    let path = dir.join(name);
    image.save(&path).unwrap();
    ImageHandle::from(path)
}

fn png_part(dir: &Path, name: &str, image: &GrayImage) -> Part {
    let handle = save(dir, name, image);
    let bytes = std::fs::read(handle.as_str()).unwrap();
    Part::bytes(bytes).file_name(name.to_string())
}

async fn spawn_service() -> String {
    spawn_service_with(&Config::default()).await
}

async fn spawn_service_with(config: &Config) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let server = DetectionServer::new(config).unwrap();
    tokio::spawn(server.serve(listener));
    format!("http://{address}")
}

fn remote_config(endpoint: &str) -> Config {
    let mut config = Config::default();
    config.extractor.backend = ExtractorBackend::Remote;
    config.extractor.remote = RemoteExtractorConfig {
        endpoint: endpoint.to_string(),
        request_timeout_ms: 2000,
    };
    config
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_health_endpoint() {
    let endpoint = spawn_service().await;
    let health: HealthResponse = reqwest::get(format!("{endpoint}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.extractor, "saliency");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_landmark_endpoint() {
    let dir = TempDir::new().unwrap();
    let endpoint = spawn_service().await;
    let client = reqwest::Client::new();

    let form = Form::new().part(
        "image",
        png_part(dir.path(), "subject.png", &create_subject_image(200, 200, 140, 100, 40)),
    );
    let response = client
        .post(format!("{endpoint}/landmark"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: LandmarkResponse = response.json().await.unwrap();
    let landmark = body.landmark.unwrap();
    assert!((landmark.x - 0.7).abs() < 0.03);

    let form = Form::new().part("image", Part::bytes(b"not an image".to_vec()).file_name("x.jpg"));
    let response = client
        .post(format!("{endpoint}/landmark"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let form = Form::new().text("note", "no file here");
    let response = client
        .post(format!("{endpoint}/landmark"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_analyze_endpoint() {
    let dir = TempDir::new().unwrap();
    let endpoint = spawn_service().await;
    let client = reqwest::Client::new();

    let form = Form::new()
        .part(
            "userImage",
            png_part(dir.path(), "user.png", &create_subject_image(200, 200, 60, 100, 40)),
        )
        .part(
            "referenceImage",
            png_part(dir.path(), "reference.png", &create_subject_image(200, 200, 100, 100, 40)),
        );
    let response = client
        .post(format!("{endpoint}/analyze"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let result: AnalysisResult = response.json().await.unwrap();
    assert_eq!(result.alignment, AlignmentVerdict::Right);
    assert_eq!(result.tip, Tip::MoveRight);

    let form = Form::new().part(
        "userImage",
        png_part(dir.path(), "alone.png", &create_subject_image(100, 100, 50, 50, 20)),
    );
    let response = client
        .post(format!("{endpoint}/analyze"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let form = Form::new()
        .part("userImage", Part::bytes(b"garbage".to_vec()).file_name("user.jpg"))
        .part(
            "referenceImage",
            png_part(dir.path(), "reference2.png", &create_subject_image(100, 100, 50, 50, 20)),
        );
    let result: AnalysisResult = client
        .post(format!("{endpoint}/analyze"))
        .multipart(form)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(result.alignment, AlignmentVerdict::Unknown);
    assert_eq!(result.tip, Tip::DecodeFailed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_analyze_endpoint_honours_time_budget() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.analyzer.timeout_ms = 1;
    let endpoint = spawn_service_with(&config).await;

    let large = create_subject_image(3000, 3000, 2000, 1500, 300);
    let form = Form::new()
        .part("userImage", png_part(dir.path(), "user.png", &large))
        .part("referenceImage", png_part(dir.path(), "reference.png", &large));

    let started = std::time::Instant::now();
    let response = reqwest::Client::new()
        .post(format!("{endpoint}/analyze"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let result: AnalysisResult = response.json().await.unwrap();

    assert!(started.elapsed() < std::time::Duration::from_secs(2));
    assert_eq!(result.alignment, AlignmentVerdict::Unknown);
    assert_eq!(result.confidence, 0.0);
    assert_eq!(result.tip, Tip::TimedOut);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_remote_backend_against_service() {
    let dir = TempDir::new().unwrap();
    let endpoint = spawn_service().await;
    let captured = save(dir.path(), "captured.png", &create_subject_image(200, 200, 140, 100, 40));
    let reference = save(dir.path(), "reference.png", &create_subject_image(200, 200, 100, 100, 40));

    let analyzer = AlignmentAnalyzer::from_config(&remote_config(&endpoint)).unwrap();
    assert_eq!(analyzer.detector().backend(), "remote");

    let result = analyzer.analyze(&captured, &reference).await.unwrap();
    assert_eq!(result.alignment, AlignmentVerdict::Left);
    assert!(analyzer.detector().is_initialized());

    let corrupt_path = dir.path().join("corrupt.jpg");
    std::fs::write(&corrupt_path, b"corrupt bytes").unwrap();
    let result = analyzer
        .analyze(&ImageHandle::from(corrupt_path), &reference)
        .await
        .unwrap();
    assert_eq!(result.tip, Tip::DecodeFailed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unreachable_remote_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let captured = save(dir.path(), "captured.png", &create_subject_image(100, 100, 50, 50, 20));

    let analyzer = AlignmentAnalyzer::from_config(&remote_config("http://127.0.0.1:1")).unwrap();
    let result = analyzer.analyze(&captured, &captured).await.unwrap();
    assert_eq!(result.alignment, AlignmentVerdict::Unknown);
    assert_eq!(result.tip, Tip::DetectorUnavailable);
    assert!(!analyzer.detector().is_initialized());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_metrics_endpoint_reports_service_calls() {
    let dir = TempDir::new().unwrap();
    let endpoint = spawn_service().await;
    let client = reqwest::Client::new();

    let form = Form::new().part(
        "image",
        png_part(dir.path(), "subject.png", &create_subject_image(100, 100, 30, 30, 20)),
    );
    client
        .post(format!("{endpoint}/landmark"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    let summary: serde_json::Value = client
        .get(format!("{endpoint}/metrics"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary["service_extract"]["count"], 1);
}
