//! The gateway pipeline orchestrator.
//!
//! One call per request: load the request transform, run it, interpret the
//! outcome, dispatch to the internal target, resolve redirects, run the
//! response transform. Nothing is shared between invocations and every
//! failure leaves through the diagnostic formatter as a non-2xx response.

use std::sync::Arc;

use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue};
use portico_store::ContentStore;
use rhai::Dynamic;
use serde_json::Value;

use crate::config::GatewayConfig;
use crate::diagnostics::{request_preview, DiagnosticReport};
use crate::error::GatewayError;
use crate::executor::TargetExecutor;
use crate::redirect::{follow_redirects, DEFAULT_MAX_HOPS};
use crate::transform::{
    self, parse_transform_result, TargetRequest, TransformLoader, TransformOutcome, TransformRole,
};
use crate::types::{
    DirectResponse, RequestDetails, ResponseDetails, ResponseSource, TransformResult,
};

/// End-to-end gateway pipeline.
pub struct GatewayPipeline {
    store: Arc<dyn ContentStore>,
    executor: Arc<dyn TargetExecutor>,
    loader: TransformLoader,
    max_redirect_hops: usize,
}

impl GatewayPipeline {
    pub fn new(store: Arc<dyn ContentStore>, executor: Arc<dyn TargetExecutor>) -> Self {
        let loader = TransformLoader::new(store.clone());
        Self {
            store,
            executor,
            loader,
            max_redirect_hops: DEFAULT_MAX_HOPS,
        }
    }

    pub const fn with_max_redirect_hops(mut self, max_hops: usize) -> Self {
        self.max_redirect_hops = max_hops;
        self
    }

    /// Run the pipeline for one request.
    ///
    /// Never fails outward: every error is formatted into a diagnostic
    /// response at this boundary.
    pub async fn handle(&self, config: &GatewayConfig, request: RequestDetails) -> ResponseDetails {
        let preview = request_preview(&request);
        match self.run(config, request).await {
            Ok(response) => response,
            Err(error) => self.error_response(config, &error, &preview).await,
        }
    }

    async fn run(
        &self,
        config: &GatewayConfig,
        request: RequestDetails,
    ) -> Result<ResponseDetails, GatewayError> {
        let context = build_context(config);

        let outcome = match &config.request_transform {
            Some(id) => self.run_request_transform(id, &request, &context).await?,
            None => TransformOutcome::Dispatch(TargetRequest::new(crate::types::Target::internal(
                config.effective_target_url(),
            ))),
        };

        match outcome {
            TransformOutcome::Direct(direct) => {
                let response = direct_to_response(direct, &request);
                if config.transform_direct_responses && config.response_transform.is_some() {
                    self.run_response_transform(config, response, &context).await
                } else {
                    Ok(response)
                }
            }
            TransformOutcome::Dispatch(target_request) => {
                target_request.target.validate()?;

                let outbound = build_outbound(&request, &target_request);
                tracing::debug!(
                    target = %target_request.target.url,
                    method = %outbound.method,
                    "Dispatching to internal target"
                );

                let response = self.executor.execute(outbound).await?;
                let response =
                    follow_redirects(response, self.store.as_ref(), self.max_redirect_hops).await;

                if config.response_transform.is_some() {
                    self.run_response_transform(config, response, &context).await
                } else {
                    Ok(response)
                }
            }
        }
    }

    async fn run_request_transform(
        &self,
        id: &str,
        request: &RequestDetails,
        context: &Dynamic,
    ) -> Result<TransformOutcome, GatewayError> {
        let transform = self
            .load_transform(id, TransformRole::Request)
            .await?;
        let raw = transform.invoke(transform::request_to_dynamic(request), context.clone())?;
        TransformOutcome::from_request_output(raw)
    }

    async fn run_response_transform(
        &self,
        config: &GatewayConfig,
        response: ResponseDetails,
        context: &Dynamic,
    ) -> Result<ResponseDetails, GatewayError> {
        let Some(id) = &config.response_transform else {
            return Ok(response);
        };

        let transform = self
            .load_transform(id, TransformRole::Response)
            .await?;
        let raw = transform.invoke(transform::response_to_dynamic(&response), context.clone())?;
        let result = parse_transform_result(raw)?;
        Ok(result_to_response(result, &response))
    }

    /// Resolve, validate, and compile one transform.
    ///
    /// Validation warnings are logged and never block; the first validation
    /// error wins.
    async fn load_transform(
        &self,
        id: &str,
        role: TransformRole,
    ) -> Result<transform::Transform, GatewayError> {
        let source = self.loader.resolve_source(id).await.ok_or_else(|| {
            GatewayError::Configuration(format!(
                "could not resolve {} transform: {id}",
                role_name(role)
            ))
        })?;

        let report = transform::validate_source(&source, role);
        for warning in &report.warnings {
            tracing::warn!(transform = id, warning = %warning, "Transform validation warning");
        }
        if let Some(error) = report.errors.first() {
            return Err(GatewayError::Validation(error.clone()));
        }

        self.loader.compile(&source, role).ok_or_else(|| {
            GatewayError::Configuration(format!(
                "could not compile {} transform: {id}",
                role_name(role)
            ))
        })
    }

    async fn error_response(
        &self,
        config: &GatewayConfig,
        error: &GatewayError,
        preview: &Value,
    ) -> ResponseDetails {
        let report = DiagnosticReport::from_error(error).with_context(preview);
        tracing::warn!(
            gateway = %config.name,
            error_type = error.error_type(),
            summary = %report.summary,
            "Gateway pipeline failed"
        );

        let status = error.status_code();

        if let Some(template_id) = &config.error_template {
            match self.store.resolve(template_id, true).await {
                Ok(Some(content)) => {
                    return ResponseDetails::new(status, content.into_bytes()).with_header(
                        header::CONTENT_TYPE,
                        HeaderValue::from_static("text/html"),
                    );
                }
                _ => {
                    tracing::warn!(template = %template_id, "Custom error template not resolvable");
                }
            }
        }

        ResponseDetails::new(status, report.detail.into_bytes())
            .with_header(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"))
    }
}

impl std::fmt::Debug for GatewayPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayPipeline")
            .field("max_redirect_hops", &self.max_redirect_hops)
            .finish()
    }
}

const fn role_name(role: TransformRole) -> &'static str {
    match role {
        TransformRole::Request => "request",
        TransformRole::Response => "response",
    }
}

/// Context map passed to every transform invocation.
fn build_context(config: &GatewayConfig) -> Dynamic {
    let mut templates = rhai::Map::new();
    for (name, id) in &config.templates {
        templates.insert(name.as_str().into(), id.clone().into());
    }

    let mut map = rhai::Map::new();
    map.insert("gateway".into(), config.name.clone().into());
    map.insert("templates".into(), Dynamic::from_map(templates));
    map.insert(
        "request_id".into(),
        uuid::Uuid::new_v4().to_string().into(),
    );
    Dynamic::from_map(map)
}

/// Build the outbound request for dispatch: the target path plus any
/// overrides the transform requested, over the inbound request's fields.
fn build_outbound(request: &RequestDetails, target_request: &TargetRequest) -> RequestDetails {
    let mut headers = request.forward_headers();
    for (name, value) in &target_request.headers {
        headers.insert(name.clone(), value.clone());
    }
    // Transforms cannot reintroduce the cookie header either.
    headers.remove(header::COOKIE);

    RequestDetails {
        path: target_request.target.url.clone(),
        method: target_request
            .method
            .clone()
            .unwrap_or_else(|| request.method.clone()),
        query_string: target_request
            .query_string
            .clone()
            .or_else(|| request.query_string.clone()),
        headers,
        json: target_request.json.clone().or_else(|| request.json.clone()),
        data: target_request
            .data
            .clone()
            .map(Bytes::from)
            .or_else(|| request.data.clone()),
        url: request.url.clone(),
    }
}

fn direct_to_response(direct: DirectResponse, request: &RequestDetails) -> ResponseDetails {
    let DirectResponse {
        output,
        content_type,
        status,
        headers: extra_headers,
    } = direct;

    ResponseDetails {
        status,
        headers: merge_content_type(extra_headers, &content_type, "text/html"),
        content: output.into_bytes(),
        request_path: request.path.clone(),
        source: ResponseSource::DirectResponse,
    }
}

fn result_to_response(result: TransformResult, original: &ResponseDetails) -> ResponseDetails {
    let TransformResult {
        output,
        content_type,
        status,
        headers: extra_headers,
    } = result;

    ResponseDetails {
        status,
        headers: merge_content_type(extra_headers, &content_type, "text/plain"),
        content: output.into_bytes(),
        request_path: original.request_path.clone(),
        source: original.source,
    }
}

fn merge_content_type(
    mut headers: HeaderMap,
    content_type: &str,
    fallback: &'static str,
) -> HeaderMap {
    let value = HeaderValue::from_str(content_type)
        .unwrap_or_else(|_| HeaderValue::from_static(fallback));
    headers.insert(header::CONTENT_TYPE, value);
    headers
}
