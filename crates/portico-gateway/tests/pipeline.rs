//! End-to-end pipeline tests against an in-memory store and a stub executor.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use http::{header, HeaderValue, Method, StatusCode};
use portico_gateway::types::{RequestDetails, ResponseDetails, ResponseSource};
use portico_gateway::{GatewayConfig, GatewayError, GatewayPipeline, TargetExecutor};
use portico_store::MemoryStore;

/// Executor stub that records dispatched requests and replays a canned
/// response.
struct StubExecutor {
    response: Mutex<Option<ResponseDetails>>,
    requests: Mutex<Vec<RequestDetails>>,
    calls: AtomicUsize,
}

impl StubExecutor {
    fn returning(response: ResponseDetails) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Some(response)),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }

    fn ok_with(body: &'static [u8]) -> Arc<Self> {
        Self::returning(ResponseDetails::new(StatusCode::OK, body))
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_request(&self) -> Option<RequestDetails> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TargetExecutor for StubExecutor {
    async fn execute(&self, request: RequestDetails) -> Result<ResponseDetails, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let path = request.path.clone();
        self.requests.lock().unwrap().push(request);

        match self.response.lock().unwrap().take() {
            Some(response) => Ok(response.with_request_path(path)),
            None => Ok(ResponseDetails::new(StatusCode::OK, &b""[..]).with_request_path(path)),
        }
    }
}

async fn store_with_transform(source: &str) -> (MemoryStore, String) {
    let store = MemoryStore::new();
    let id = store.insert(source.as_bytes().to_vec()).await;
    (store, id)
}

fn pipeline(store: &MemoryStore, executor: &Arc<StubExecutor>) -> GatewayPipeline {
    GatewayPipeline::new(Arc::new(store.clone()), executor.clone())
}

#[tokio::test]
async fn direct_response_skips_dispatch() {
    let (store, id) = store_with_transform(
        r#"
        fn transform_request(req, ctx) {
            #{ output: "<h1>hi</h1>", status_code: 200 }
        }
        "#,
    )
    .await;
    let executor = StubExecutor::ok_with(b"unused");

    let config = GatewayConfig::new("docs").with_request_transform(&id);
    let response = pipeline(&store, &executor)
        .handle(&config, RequestDetails::new("/docs"))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text(), "<h1>hi</h1>");
    assert_eq!(response.content_type(), Some("text/html"));
    assert_eq!(response.source, ResponseSource::DirectResponse);
    assert!(response.is_direct_response());
    assert_eq!(executor.calls(), 0);
}

#[tokio::test]
async fn target_outcome_dispatches_with_overrides() {
    let (store, id) = store_with_transform(
        r#"
        fn transform_request(req, ctx) {
            #{
                mode: "internal",
                url: "/internal/orders",
                method: "POST",
                headers: #{ "x-gateway": ctx.gateway },
            }
        }
        "#,
    )
    .await;
    let executor = StubExecutor::ok_with(b"dispatched");

    let config = GatewayConfig::new("orders").with_request_transform(&id);
    let inbound = RequestDetails::new("/orders")
        .with_header(header::COOKIE, HeaderValue::from_static("session=abc"))
        .with_header(header::ACCEPT, HeaderValue::from_static("*/*"));

    let response = pipeline(&store, &executor).handle(&config, inbound).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text(), "dispatched");
    assert_eq!(executor.calls(), 1);

    let dispatched = executor.last_request().unwrap();
    assert_eq!(dispatched.path, "/internal/orders");
    assert_eq!(dispatched.method, Method::POST);
    assert_eq!(dispatched.headers.get("x-gateway").unwrap(), "orders");
    assert!(dispatched.headers.get(header::COOKIE).is_none());
    assert!(dispatched.headers.get(header::ACCEPT).is_some());
}

#[tokio::test]
async fn missing_request_transform_dispatches_to_default_target() {
    let store = MemoryStore::new();
    let executor = StubExecutor::ok_with(b"raw");

    let config = GatewayConfig::new("reports");
    let response = pipeline(&store, &executor)
        .handle(&config, RequestDetails::new("/reports"))
        .await;

    assert_eq!(response.text(), "raw");
    assert_eq!(executor.last_request().unwrap().path, "/reports");
}

#[tokio::test]
async fn invalid_target_is_a_configuration_error() {
    let (store, id) = store_with_transform(
        r#"
        fn transform_request(req, ctx) {
            #{ mode: "external", url: "http://attacker.example" }
        }
        "#,
    )
    .await;
    let executor = StubExecutor::ok_with(b"unused");

    let config = GatewayConfig::new("docs").with_request_transform(&id);
    let response = pipeline(&store, &executor)
        .handle(&config, RequestDetails::new("/docs"))
        .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.text().contains("ConfigurationError"));
    assert_eq!(executor.calls(), 0);
}

#[tokio::test]
async fn unresolvable_transform_is_a_configuration_error() {
    let store = MemoryStore::new();
    let executor = StubExecutor::ok_with(b"unused");

    let config = GatewayConfig::new("docs").with_request_transform("does-not-exist");
    let response = pipeline(&store, &executor)
        .handle(&config, RequestDetails::new("/docs"))
        .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.text().contains("could not resolve request transform"));
}

#[tokio::test]
async fn missing_entry_function_names_it() {
    let (store, id) = store_with_transform(
        r#"
        fn transform_response(resp, ctx) {
            #{ output: resp.text }
        }
        "#,
    )
    .await;
    let executor = StubExecutor::ok_with(b"unused");

    let config = GatewayConfig::new("docs").with_request_transform(&id);
    let response = pipeline(&store, &executor)
        .handle(&config, RequestDetails::new("/docs"))
        .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response
        .text()
        .contains("missing required function: transform_request"));
}

#[tokio::test]
async fn script_error_survives_as_diagnostic_response() {
    let (store, id) = store_with_transform(
        r#"
        fn transform_request(req, ctx) {
            throw "transform exploded";
        }
        "#,
    )
    .await;
    let executor = StubExecutor::ok_with(b"unused");

    let config = GatewayConfig::new("docs").with_request_transform(&id);
    let inbound = RequestDetails::new("/docs").with_header(
        header::AUTHORIZATION,
        HeaderValue::from_static("Bearer secret-token"),
    );

    let response = pipeline(&store, &executor).handle(&config, inbound).await;

    assert!(!response.status.is_success());
    let body = response.text();
    assert!(body.contains("ExecutionError"));
    assert!(body.contains("transform exploded"));
    // The diagnostic carries a request preview; the credential must not.
    assert!(body.contains("authorization"));
    assert!(!body.contains("Bearer secret-token"));
}

#[tokio::test]
async fn redirect_to_content_is_resolved() {
    let (store, id) = store_with_transform(
        r#"
        fn transform_request(req, ctx) {
            #{ url: "/docs" }
        }
        "#,
    )
    .await;
    store.insert_named("abc123", &br#"{"a":1}"#[..]).await.unwrap();

    let redirect = ResponseDetails::new(StatusCode::FOUND, &b""[..])
        .with_header(header::LOCATION, HeaderValue::from_static("/abc123.json"));
    let executor = StubExecutor::returning(redirect);

    let config = GatewayConfig::new("docs").with_request_transform(&id);
    let response = pipeline(&store, &executor)
        .handle(&config, RequestDetails::new("/docs"))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_type(), Some("application/json"));
    assert_eq!(response.text(), r#"{"a":1}"#);
    assert_eq!(response.source, ResponseSource::SynthesizedFromRedirect);
}

#[tokio::test]
async fn unresolved_redirect_passes_through() {
    let store = MemoryStore::new();
    let redirect = ResponseDetails::new(StatusCode::FOUND, &b""[..])
        .with_header(header::LOCATION, HeaderValue::from_static("/nested/path"));
    let executor = StubExecutor::returning(redirect);

    let config = GatewayConfig::new("docs");
    let response = pipeline(&store, &executor)
        .handle(&config, RequestDetails::new("/docs"))
        .await;

    // Soft give-up: the caller sees the redirect, headers intact.
    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(
        response.headers.get(header::LOCATION).unwrap(),
        "/nested/path"
    );
}

#[tokio::test]
async fn response_transform_shapes_the_output() {
    let store = MemoryStore::new();
    let request_id = store
        .insert(&br#"fn transform_request(req, ctx) { #{ url: "/docs" } }"#[..])
        .await;
    let response_id = store
        .insert(
            &br#"
            fn transform_response(resp, ctx) {
                #{ output: resp.text.to_upper(), content_type: "text/plain", status_code: 200 }
            }
            "#[..],
        )
        .await;

    let executor = StubExecutor::ok_with(b"quiet body");
    let config = GatewayConfig::new("docs")
        .with_request_transform(&request_id)
        .with_response_transform(&response_id);

    let response = pipeline(&store, &executor)
        .handle(&config, RequestDetails::new("/docs"))
        .await;

    assert_eq!(response.text(), "QUIET BODY");
    assert_eq!(response.content_type(), Some("text/plain"));
}

#[tokio::test]
async fn response_transform_is_skipped_without_configuration() {
    let store = MemoryStore::new();
    let executor = StubExecutor::ok_with(b"raw passthrough");

    let config = GatewayConfig::new("docs");
    let response = pipeline(&store, &executor)
        .handle(&config, RequestDetails::new("/docs"))
        .await;

    assert_eq!(response.text(), "raw passthrough");
    assert_eq!(response.source, ResponseSource::InternalTarget);
}

#[tokio::test]
async fn direct_responses_skip_the_response_transform_by_default() {
    let store = MemoryStore::new();
    let request_id = store
        .insert(&br#"fn transform_request(req, ctx) { #{ output: "final" } }"#[..])
        .await;
    let response_id = store
        .insert(&br#"fn transform_response(resp, ctx) { #{ output: "rewritten" } }"#[..])
        .await;
    let executor = StubExecutor::ok_with(b"unused");

    let config = GatewayConfig::new("docs")
        .with_request_transform(&request_id)
        .with_response_transform(&response_id);
    let response = pipeline(&store, &executor)
        .handle(&config, RequestDetails::new("/docs"))
        .await;

    assert_eq!(response.text(), "final");

    // With the explicit opt-in the response transform runs on the direct
    // response too.
    let config = config.with_transform_direct_responses(true);
    let response = pipeline(&store, &executor)
        .handle(&config, RequestDetails::new("/docs"))
        .await;

    assert_eq!(response.text(), "rewritten");
}

#[tokio::test]
async fn custom_error_template_becomes_the_error_body() {
    let store = MemoryStore::new();
    store
        .insert_named("oops", &b"<h1>Something broke</h1>"[..])
        .await
        .unwrap();

    let executor = StubExecutor::ok_with(b"unused");
    let config = GatewayConfig::new("docs")
        .with_request_transform("does-not-exist")
        .with_error_template("oops");

    let response = pipeline(&store, &executor)
        .handle(&config, RequestDetails::new("/docs"))
        .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.text(), "<h1>Something broke</h1>");
    assert_eq!(response.content_type(), Some("text/html"));
}
