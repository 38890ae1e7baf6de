//! In-process HTTP tests for the docforge router

use std::fs;
use std::path::Path;
use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use docforge_engine::{DOCUMENT_PART, package_with_document, read_entry, sample_document};
use docforge_server::{
    AppState, CandidateRoot, CandidateRoots, ServerConfig, ServiceError, TemplateRegistry,
    TemplateResolver, build_router, compose::DOCX_CONTENT_TYPE,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

fn docx(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|text| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", text))
        .collect();
    let xml = format!(
        r#"<w:document xmlns:w="{}"><w:body>{}</w:body></w:document>"#,
        W_NS, body
    );
    package_with_document(&xml).unwrap()
}

fn install(dir: &Path, file_name: &str, bytes: &[u8]) {
    fs::write(dir.join(file_name), bytes).unwrap();
}

fn router_with(dirs: &[&Path], config: ServerConfig) -> Router {
    let roots = dirs
        .iter()
        .enumerate()
        .map(|(i, dir)| CandidateRoot::new(format!("test-{}", i), *dir))
        .collect();
    let resolver = TemplateResolver::new(TemplateRegistry::builtin(), CandidateRoots::new(roots));
    build_router(Arc::new(AppState::with_resolver(config, resolver))).unwrap()
}

fn router(dirs: &[&Path]) -> Router {
    router_with(dirs, ServerConfig::default())
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn document_xml(archive: &[u8]) -> String {
    String::from_utf8(read_entry(archive, DOCUMENT_PART).unwrap().unwrap()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let config = ServerConfig {
        environment: "production".to_string(),
        ..ServerConfig::default()
    };
    let response = router_with(&[], config).oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["environment"], "production");
    assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_generates_named_document() {
    let dir = TempDir::new().unwrap();
    install(dir.path(), "default-resume.docx", &docx(&["{name}", "{email}"]));

    let response = router(&[dir.path()])
        .oneshot(post_json("/", r#"{"userData": {"name": "A/B*C"}}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers().clone();
    assert_eq!(headers[header::CONTENT_TYPE], DOCX_CONTENT_TYPE);
    assert_eq!(headers[header::CACHE_CONTROL], "no-cache");

    let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.starts_with("attachment; filename=\"resume-ABC-"));
    assert!(disposition.ends_with(".docx\""));
    let filename = disposition.trim_start_matches("attachment; filename=\"");
    assert!(!filename.contains('/'));
    assert!(!filename.contains('*'));

    let bytes = body_bytes(response).await;
    assert_eq!(
        headers[header::CONTENT_LENGTH].to_str().unwrap(),
        bytes.len().to_string()
    );
    let xml = document_xml(&bytes);
    assert!(xml.contains(">A/B*C</w:t>"));
}

#[tokio::test]
async fn test_named_template_is_used() {
    let dir = TempDir::new().unwrap();
    install(dir.path(), "default-resume.docx", &docx(&["default {name}"]));
    install(dir.path(), "academic-resume.docx", &docx(&["academic {name}"]));

    let response = router(&[dir.path()])
        .oneshot(post_json(
            "/",
            r#"{"templateId": "academic", "userData": {"name": "Ada"}}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(document_xml(&body_bytes(response).await).contains("academic Ada"));
}

#[tokio::test]
async fn test_unknown_template_id_uses_default() {
    let dir = TempDir::new().unwrap();
    install(dir.path(), "default-resume.docx", &docx(&["default {name}"]));

    let response = router(&[dir.path()])
        .oneshot(post_json(
            "/",
            r#"{"templateId": "sparkly", "userData": {"name": "Ada"}}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(document_xml(&body_bytes(response).await).contains("default Ada"));
}

#[tokio::test]
async fn test_missing_user_data_is_bad_request() {
    let response = router(&[])
        .oneshot(post_json("/", r#"{"templateId": "default"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Missing userData");
    assert_eq!(body["message"], "Missing userData in request body");
}

#[tokio::test]
async fn test_invalid_bodies_are_bad_requests() {
    for body in [
        r#"{"userData": null}"#,
        r#"{"userData": "Ada"}"#,
        r#"{"userData": [1, 2]}"#,
        r#"{"userData": "#,
        "",
    ] {
        let response = router(&[]).oneshot(post_json("/", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {:?}", body);
        assert!(body_json(response).await["error"].is_string());
    }
}

#[tokio::test]
async fn test_missing_template_is_not_found() {
    let empty = TempDir::new().unwrap();

    let response = router(&[empty.path()])
        .oneshot(post_json("/", r#"{"templateId": "creative", "userData": {}}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Template not found");
    assert_eq!(body["message"], "Template not found: creative-resume.docx");
}

#[tokio::test]
async fn test_tag_errors_are_reported_together() {
    let dir = TempDir::new().unwrap();
    install(dir.path(), "default-resume.docx", &docx(&["{name", "{#items}"]));

    let response = router(&[dir.path()])
        .oneshot(post_json("/", r#"{"userData": {"name": "Ada"}}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    let message = body["message"].as_str().unwrap();
    assert!(message.starts_with("Template processing error: "));
    assert!(message.contains("(tag: {name)"), "{}", message);
    assert!(message.contains("(tag: items)"), "{}", message);

    let tags: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["tag"].as_str().unwrap())
        .collect();
    assert_eq!(tags, vec!["{name", "items"]);
}

#[tokio::test]
async fn test_corrupt_template_is_server_error() {
    let dir = TempDir::new().unwrap();
    install(dir.path(), "default-resume.docx", b"this is not a zip archive");

    let response = router(&[dir.path()])
        .oneshot(post_json("/", r#"{"userData": {}}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "Error generating resume");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    for request in [get("/nope"), post_json("/nope/deeper", "{}"), get("/")] {
        let response = router(&[]).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({
                "error": "Not Found",
                "message": "The requested endpoint does not exist"
            })
        );
    }
}

#[tokio::test]
async fn test_test_document_falls_back_to_sample() {
    let empty = TempDir::new().unwrap();

    let response = router(&[empty.path()]).oneshot(get("/test-doc")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"test-resume.docx\""
    );
    assert_eq!(body_bytes(response).await, sample_document().unwrap());
}

#[tokio::test]
async fn test_test_document_prefers_installed_template() {
    let dir = TempDir::new().unwrap();
    let template = docx(&["installed test template"]);
    install(dir.path(), "test-resume.docx", &template);

    let response = router(&[dir.path()]).oneshot(get("/test-docx")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, template);
}

#[tokio::test]
async fn test_routes_are_mounted_under_prefixes() {
    let dir = TempDir::new().unwrap();
    install(dir.path(), "default-resume.docx", &docx(&["{name}"]));
    let config = ServerConfig {
        route_prefixes: vec!["/api/generate-resume".to_string()],
        ..ServerConfig::default()
    };
    let app = router_with(&[dir.path()], config);

    let response = app
        .clone()
        .oneshot(post_json("/api/generate-resume", r#"{"userData": {"name": "Ada"}}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(post_json("/api/generate-resume/", r#"{"userData": {"name": "Ada"}}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/api/generate-resume/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[test]
fn test_conflicting_prefixes_are_rejected() {
    for prefixes in [vec!["/health"], vec!["/debug/templates"], vec!["/api", "/api"]] {
        let config = ServerConfig {
            route_prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
            ..ServerConfig::default()
        };
        let resolver = TemplateResolver::new(TemplateRegistry::builtin(), CandidateRoots::default());
        let result = build_router(Arc::new(AppState::with_resolver(config, resolver)));
        assert!(
            matches!(result, Err(ServiceError::Config(_))),
            "prefixes {:?} were accepted",
            prefixes
        );
    }
}

#[tokio::test]
async fn test_long_values_are_merged_in_full() {
    let dir = TempDir::new().unwrap();
    install(dir.path(), "default-resume.docx", &docx(&["{summary}"]));
    let summary = "x".repeat(150);

    let response = router(&[dir.path()])
        .oneshot(post_json(
            "/",
            &json!({"userData": {"summary": summary}}).to_string(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let xml = document_xml(&body_bytes(response).await);
    assert!(xml.contains(&format!(">{}</w:t>", summary)));
    assert!(!xml.contains("..."));
}

#[tokio::test]
async fn test_cors_preflight() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/")
        .header(header::ORIGIN, "https://resume.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();

    let response = router(&[]).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn test_debug_templates_reports_roots() {
    let dir = TempDir::new().unwrap();
    install(dir.path(), "default-resume.docx", b"x");
    let missing = dir.path().join("missing");

    let response = router(&[dir.path(), missing.as_path()])
        .oneshot(get("/debug/templates"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let paths = body["templatePaths"].as_array().unwrap();
    assert_eq!(paths.len(), 2);
    assert_eq!(paths[0]["exists"], true);
    assert_eq!(paths[0]["files"], json!(["default-resume.docx"]));
    assert_eq!(paths[1]["exists"], false);
    assert_eq!(body["templates"]["professional"], "professional-resume.docx");
}
