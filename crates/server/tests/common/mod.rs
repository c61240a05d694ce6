//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with a mock gateway injected, so the whole incident lifecycle can be
//! driven over HTTP without the external services.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use rescue_core::{
    config::{DatabaseConfig, ServerConfig, ServicesConfig},
    create_audit_system, AuditStore, Config, IncidentRuntime, IncidentSaga, InstanceStore,
    RuleSession, RuntimeConfig, SqliteAuditStore, SqliteInstanceStore,
    testing::MockGateway,
};

/// Re-export fixtures for test convenience
pub use rescue_core::testing::fixtures;

/// Test fixture for API testing with mock services.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_start() {
///     let fixture = TestFixture::new().await;
///     fixture.mock.rules.always_assign("R1").await;
///
///     let response = fixture.start_incident("X").await;
///     assert_eq!(response.status, 201);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock collaborators - configure decisions and inspect publications
    pub mock: MockGateway,
    /// Runtime behind the router, for driving timers directly
    pub runtime: Arc<IncidentRuntime>,
    /// Audit store, for inspecting persisted events
    pub audit_store: Arc<dyn AuditStore>,
    /// Temporary directory for test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            runtime: RuntimeConfig::default(),
            rules: RuleSession::default(),
            services: ServicesConfig {
                responders_url: "http://responders.test".to_string(),
                priority_url: "http://priority.test".to_string(),
                rules_url: "http://rules.test".to_string(),
                messages_url: "http://messages.test".to_string(),
                auth_token: Some("secret-token".to_string()),
                timeout_secs: 5,
            },
        };

        let audit_store: Arc<dyn AuditStore> = Arc::new(
            SqliteAuditStore::new(&db_path).expect("Failed to create audit store"),
        );
        let instance_store: Arc<dyn InstanceStore> = Arc::new(
            SqliteInstanceStore::new(&db_path).expect("Failed to create instance store"),
        );

        let (audit_handle, audit_writer) = create_audit_system(Arc::clone(&audit_store), 100);
        tokio::spawn(audit_writer.run());

        let mock = MockGateway::new();
        let saga = IncidentSaga::new(mock.gateway(), config.rules.clone())
            .with_audit(audit_handle.clone());
        let runtime = Arc::new(IncidentRuntime::new(
            config.runtime.clone(),
            saga,
            instance_store,
            Some(audit_handle),
        ));

        let state = Arc::new(rescue_server::state::AppState::new(
            config,
            Arc::clone(&runtime),
            Arc::clone(&audit_store),
        ));

        let router = rescue_server::api::create_router(state);

        Self {
            router,
            mock,
            runtime,
            audit_store,
            temp_dir,
        }
    }

    /// Start an instance for a fixture incident.
    pub async fn start_incident(&self, id: &str) -> TestResponse {
        self.post(
            "/api/v1/incidents",
            json!({
                "incident": fixtures::incident(id),
                "destinations": fixtures::destinations(),
                "assignmentDelay": "PT60S",
            }),
        )
        .await
    }

    /// Deliver a signal, optionally with a JSON payload.
    pub async fn signal(&self, id: &str, name: &str, payload: Option<Value>) -> TestResponse {
        let path = format!("/api/v1/incidents/{}/signals/{}", id, name);
        match payload {
            Some(payload) => self.post(&path, payload).await,
            None => self.request("POST", &path, None).await,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Fetch the raw text of a non-JSON endpoint.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder().uri(path).body(Body::empty()).unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).to_string())
    }

    /// Poll the audit store until `event_type` appears for `incident_id`.
    ///
    /// The audit writer persists events asynchronously.
    pub async fn wait_for_audit(&self, incident_id: &str, event_type: &str) -> bool {
        let filter = rescue_core::AuditFilter::new()
            .with_incident_id(incident_id)
            .with_event_type(event_type);
        for _ in 0..50 {
            if self.audit_store.count(&filter).unwrap_or(0) > 0 {
                return true;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        false
    }

    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
