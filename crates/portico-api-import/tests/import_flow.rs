//! End-to-end tests for the import API.
//!
//! Each test drives the real router with multipart requests against a
//! wiremock identity platform: the token endpoint and `accounts:batchCreate`
//! are both mocked, credential and upload directories are tempdirs, and the
//! session registry signs real RS256 assertions with a test key.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http_body_util::BodyExt;
use portico_api_import::{api_router, ImportApiState};
use portico_identity::{CredentialStore, PasswordHashConfig, SessionRegistry};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TEST_KEY_PEM: &str = include_str!("data/test_key.pem");
const BOUNDARY: &str = "portico-test-boundary";

// =============================================================================
// Test harness
// =============================================================================

struct TestApp {
    app: Router,
    server: MockServer,
    credentials_dir: tempfile::TempDir,
    uploads_dir: tempfile::TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let server = MockServer::start().await;
        let credentials_dir = tempfile::tempdir().unwrap();
        let uploads_dir = tempfile::tempdir().unwrap();

        // Token endpoint is always available.
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "test-token",
                "expires_in": 3600,
                "token_type": "Bearer"
            })))
            .mount(&server)
            .await;

        let registry = Arc::new(SessionRegistry::new(
            CredentialStore::new(credentials_dir.path()),
            server.uri(),
        ));
        let state = ImportApiState::new(
            registry,
            uploads_dir.path(),
            PasswordHashConfig {
                algorithm: "HMAC_SHA256".to_string(),
                signer_key: b"default-signer".to_vec(),
                rounds: None,
            },
        );

        Self {
            app: api_router(state),
            server,
            credentials_dir,
            uploads_dir,
        }
    }

    fn credential_doc(&self, project: &str) -> Vec<u8> {
        serde_json::json!({
            "type": "service_account",
            "project_id": project,
            "private_key": TEST_KEY_PEM,
            "client_email": format!("importer@{project}.iam.gserviceaccount.com"),
            "token_uri": format!("{}/token", self.server.uri()),
        })
        .to_string()
        .into_bytes()
    }

    async fn request(&self, uri: &str, body: Vec<u8>) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    async fn store_credentials(&self, project: &str) {
        let body = MultipartBody::new()
            .file(
                "credentials_file",
                "service-account.json",
                "application/json",
                &self.credential_doc(project),
            )
            .text("project_id", project)
            .finish();
        let (status, json) = self.request("/api/store-service-account", body).await;
        assert_eq!(status, StatusCode::OK, "credential upload failed: {json}");
    }

    async fn import_csv(&self, project: &str, csv: &[u8]) -> (StatusCode, serde_json::Value) {
        let body = MultipartBody::new()
            .file("csv_file", "users.csv", "text/csv", csv)
            .text("target_project_id", project)
            .finish();
        self.request("/api/import-users", body).await
    }

    /// Bodies of all `accounts:batchCreate` calls received, in order.
    async fn batch_requests(&self) -> Vec<serde_json::Value> {
        self.server
            .received_requests()
            .await
            .unwrap()
            .into_iter()
            .filter(|r| r.url.path().ends_with(":batchCreate"))
            .map(|r| serde_json::from_slice(&r.body).unwrap())
            .collect()
    }

    fn staged_upload_count(&self) -> usize {
        std::fs::read_dir(self.uploads_dir.path()).unwrap().count()
    }
}

/// Minimal multipart/form-data body builder.
struct MultipartBody {
    buf: Vec<u8>,
}

impl MultipartBody {
    fn new() -> Self {
        Self { buf: Vec::new() }
    }

    fn text(mut self, name: &str, value: &str) -> Self {
        self.buf.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    fn file(mut self, name: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.buf.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; \
                 filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.buf.extend_from_slice(data);
        self.buf.extend_from_slice(b"\r\n");
        self
    }

    fn finish(mut self) -> Vec<u8> {
        self.buf
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        self.buf
    }
}

fn csv_with_rows(n: usize) -> Vec<u8> {
    let mut csv = String::from("uid,email,email_verified,password_hash,password_salt\n");
    for i in 0..n {
        csv.push_str(&format!(
            "user-{i},user{i}@example.com,{},{},{}\n",
            if i % 2 == 0 { "true" } else { "false" },
            STANDARD.encode(format!("hash-{i}")),
            STANDARD.encode(format!("salt-{i}")),
        ));
    }
    csv.into_bytes()
}

fn mock_batch_success() -> Mock {
    Mock::given(method("POST"))
        .and(path("/v1/projects/acme/accounts:batchCreate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
}

// =============================================================================
// Credential upload
// =============================================================================

#[tokio::test]
async fn test_store_credentials_writes_file() {
    let app = TestApp::new().await;
    let doc = app.credential_doc("acme");

    let body = MultipartBody::new()
        .file("credentials_file", "sa.json", "application/json", &doc)
        .text("project_id", "acme")
        .finish();
    let (status, json) = app.request("/api/store-service-account", body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["body"]["projectId"], "acme");

    let stored = std::fs::read(app.credentials_dir.path().join("acme.json")).unwrap();
    assert_eq!(stored, doc);
}

#[tokio::test]
async fn test_second_upload_overwrites_first() {
    let app = TestApp::new().await;

    let body = MultipartBody::new()
        .file("credentials_file", "sa.json", "application/json", br#"{"v":1}"#)
        .text("project_id", "acme")
        .finish();
    app.request("/api/store-service-account", body).await;

    let body = MultipartBody::new()
        .file("credentials_file", "sa.json", "application/json", br#"{"v":2}"#)
        .text("project_id", "acme")
        .finish();
    app.request("/api/store-service-account", body).await;

    let stored = std::fs::read(app.credentials_dir.path().join("acme.json")).unwrap();
    assert_eq!(stored, br#"{"v":2}"#);
}

#[tokio::test]
async fn test_store_without_project_id_is_400_and_writes_nothing() {
    let app = TestApp::new().await;

    let body = MultipartBody::new()
        .file("credentials_file", "sa.json", "application/json", br#"{}"#)
        .finish();
    let (status, json) = app.request("/api/store-service-account", body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("project_id"));
    assert_eq!(
        std::fs::read_dir(app.credentials_dir.path())
            .map(|d| d.count())
            .unwrap_or(0),
        0
    );
}

#[tokio::test]
async fn test_store_without_file_is_400() {
    let app = TestApp::new().await;

    let body = MultipartBody::new().text("project_id", "acme").finish();
    let (status, json) = app.request("/api/store-service-account", body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("credentials_file"));
}

#[tokio::test]
async fn test_store_with_wrong_content_type_is_400() {
    let app = TestApp::new().await;

    let body = MultipartBody::new()
        .file("credentials_file", "sa.json", "text/plain", br#"{}"#)
        .text("project_id", "acme")
        .finish();
    let (status, _) = app.request("/api/store-service-account", body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Bulk import
// =============================================================================

#[tokio::test]
async fn test_import_without_credentials_is_404() {
    let app = TestApp::new().await;

    let (status, json) = app.import_csv("acme", &csv_with_rows(3)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("acme"));
    assert!(app.batch_requests().await.is_empty());
}

#[tokio::test]
async fn test_import_without_target_project_id_is_400() {
    let app = TestApp::new().await;

    let body = MultipartBody::new()
        .file("csv_file", "users.csv", "text/csv", &csv_with_rows(1))
        .finish();
    let (status, json) = app.request("/api/import-users", body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("target_project_id"));
}

#[tokio::test]
async fn test_import_with_non_csv_extension_is_400() {
    let app = TestApp::new().await;

    let body = MultipartBody::new()
        .file("csv_file", "users.txt", "text/csv", &csv_with_rows(1))
        .text("target_project_id", "acme")
        .finish();
    let (status, _) = app.request("/api/import-users", body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_three_row_import_is_one_batch_and_cleans_up() {
    let app = TestApp::new().await;
    app.store_credentials("acme").await;
    mock_batch_success().mount(&app.server).await;

    let (status, json) = app.import_csv("acme", &csv_with_rows(3)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["totalImported"], 3);
    assert_eq!(json["report"].as_array().unwrap().len(), 1);
    assert_eq!(json["report"][0]["batch"], 1);
    assert_eq!(json["report"][0]["status"], "submitted");
    let success = json["report"][0]["success"].as_u64().unwrap();
    let failed = json["report"][0]["failed"].as_u64().unwrap();
    assert_eq!(success + failed, 3);

    // Staged upload removed after processing
    assert_eq!(app.staged_upload_count(), 0);

    // Wire shape: bearer token and decoded fields made it through
    let batches = app.batch_requests().await;
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0]["users"].as_array().unwrap().len(), 3);
    assert_eq!(batches[0]["users"][0]["localId"], "user-0");
    assert_eq!(batches[0]["users"][0]["emailVerified"], true);
    assert_eq!(batches[0]["users"][1]["emailVerified"], false);
    assert_eq!(batches[0]["hashAlgorithm"], "HMAC_SHA256");
}

#[tokio::test]
async fn test_1000_rows_is_exactly_one_batch() {
    let app = TestApp::new().await;
    app.store_credentials("acme").await;
    mock_batch_success().mount(&app.server).await;

    let (status, json) = app.import_csv("acme", &csv_with_rows(1000)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["report"].as_array().unwrap().len(), 1);
    assert_eq!(app.batch_requests().await[0]["users"].as_array().unwrap().len(), 1000);
}

#[tokio::test]
async fn test_2500_rows_is_three_ordered_batches() {
    let app = TestApp::new().await;
    app.store_credentials("acme").await;
    mock_batch_success().mount(&app.server).await;

    let (status, json) = app.import_csv("acme", &csv_with_rows(2500)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["totalImported"], 2500);

    let report = json["report"].as_array().unwrap();
    let indices: Vec<u64> = report.iter().map(|e| e["batch"].as_u64().unwrap()).collect();
    assert_eq!(indices, vec![1, 2, 3]);

    let batches = app.batch_requests().await;
    let sizes: Vec<usize> = batches
        .iter()
        .map(|b| b["users"].as_array().unwrap().len())
        .collect();
    assert_eq!(sizes, vec![1000, 1000, 500]);
    // Strict submission order
    assert_eq!(batches[0]["users"][0]["localId"], "user-0");
    assert_eq!(batches[1]["users"][0]["localId"], "user-1000");
    assert_eq!(batches[2]["users"][0]["localId"], "user-2000");
}

#[tokio::test]
async fn test_batch_failure_marks_remaining_not_attempted() {
    let app = TestApp::new().await;
    app.store_credentials("acme").await;

    // First batch succeeds, every later one is rejected.
    mock_batch_success().up_to_n_times(1).mount(&app.server).await;
    Mock::given(method("POST"))
        .and(path("/v1/projects/acme/accounts:batchCreate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend exploded"))
        .mount(&app.server)
        .await;

    let (status, json) = app.import_csv("acme", &csv_with_rows(2500)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], false);

    let report = json["report"].as_array().unwrap();
    assert_eq!(report.len(), 3);
    assert_eq!(report[0]["status"], "submitted");
    assert_eq!(report[0]["success"], 1000);
    assert_eq!(report[1]["status"], "failed");
    assert!(report[1]["error"].as_str().unwrap().contains("500"));
    assert_eq!(report[2]["status"], "not_attempted");

    // Batch 3 was never sent
    assert_eq!(app.batch_requests().await.len(), 2);
    // Staged upload removed on the failure path too
    assert_eq!(app.staged_upload_count(), 0);
}

#[tokio::test]
async fn test_per_row_rejections_are_reported() {
    let app = TestApp::new().await;
    app.store_credentials("acme").await;

    Mock::given(method("POST"))
        .and(path("/v1/projects/acme/accounts:batchCreate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "error": [{"index": 2, "message": "email already exists"}]
        })))
        .mount(&app.server)
        .await;

    let (status, json) = app.import_csv("acme", &csv_with_rows(3)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["report"][0]["success"], 2);
    assert_eq!(json["report"][0]["failed"], 1);
    assert_eq!(json["report"][0]["errors"][0]["index"], 2);
}

#[tokio::test]
async fn test_malformed_csv_is_500_and_cleans_up() {
    let app = TestApp::new().await;
    app.store_credentials("acme").await;

    let csv = b"uid,email,email_verified,password_hash,password_salt\nu1,a@example.com,true,@@bad@@,\n";
    let (status, json) = app.import_csv("acme", csv).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["error"].as_str().unwrap().contains("base64"));
    assert!(app.batch_requests().await.is_empty());
    assert_eq!(app.staged_upload_count(), 0);
}

#[tokio::test]
async fn test_hash_overrides_apply_per_request() {
    let app = TestApp::new().await;
    app.store_credentials("acme").await;
    mock_batch_success().mount(&app.server).await;

    let body = MultipartBody::new()
        .file("csv_file", "users.csv", "text/csv", &csv_with_rows(1))
        .text("target_project_id", "acme")
        .text("hash_algorithm", "SCRYPT")
        .text("signer_key", &STANDARD.encode(b"per-request-key"))
        .finish();
    let (status, _) = app.request("/api/import-users", body).await;
    assert_eq!(status, StatusCode::OK);

    let batches = app.batch_requests().await;
    assert_eq!(batches[0]["hashAlgorithm"], "SCRYPT");

    // Defaults restored for the next request
    let (status, _) = app.import_csv("acme", &csv_with_rows(1)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.batch_requests().await[1]["hashAlgorithm"], "HMAC_SHA256");
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::new().await;

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
