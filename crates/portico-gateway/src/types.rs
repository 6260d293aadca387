//! Request and response descriptions flowing through the pipeline.

use bytes::Bytes;
use http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde_json::Value;

use crate::error::GatewayError;

/// Description of a request entering or leaving the pipeline.
///
/// Built from an HTTP adapter, from direct parameters, or from batch input;
/// the pipeline never assumes one origin. Created fresh per invocation and
/// discarded when the pipeline completes.
#[derive(Debug, Clone)]
pub struct RequestDetails {
    pub path: String,
    pub method: Method,
    pub query_string: Option<String>,
    pub headers: HeaderMap,
    pub json: Option<Value>,
    pub data: Option<Bytes>,
    pub url: Option<String>,
}

impl RequestDetails {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: Method::GET,
            query_string: None,
            headers: HeaderMap::new(),
            json: None,
            data: None,
            url: None,
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_query_string(mut self, query_string: impl Into<String>) -> Self {
        self.query_string = Some(query_string.into());
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_json(mut self, json: Value) -> Self {
        self.json = Some(json);
        self
    }

    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Headers eligible for forwarding. The cookie header never leaves this
    /// core, on any path.
    pub fn forward_headers(&self) -> HeaderMap {
        let mut headers = self.headers.clone();
        headers.remove(header::COOKIE);
        headers
    }
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    InternalTarget,
    DirectResponse,
    SynthesizedFromRedirect,
}

impl ResponseSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InternalTarget => "internal-target",
            Self::DirectResponse => "direct-response",
            Self::SynthesizedFromRedirect => "synthesized-from-redirect",
        }
    }
}

/// Description of a response moving through the pipeline.
#[derive(Debug, Clone)]
pub struct ResponseDetails {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub content: Bytes,
    pub request_path: String,
    pub source: ResponseSource,
}

impl ResponseDetails {
    pub fn new(status: StatusCode, content: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            content: content.into(),
            request_path: String::new(),
            source: ResponseSource::InternalTarget,
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_request_path(mut self, request_path: impl Into<String>) -> Self {
        self.request_path = request_path.into();
        self
    }

    pub const fn with_source(mut self, source: ResponseSource) -> Self {
        self.source = source;
        self
    }

    /// Best-effort UTF-8 decode of the body.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }

    /// Best-effort JSON parse of the body.
    pub fn json(&self) -> Option<Value> {
        serde_json::from_slice(&self.content).ok()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    pub const fn is_direct_response(&self) -> bool {
        matches!(self.source, ResponseSource::DirectResponse)
    }
}

/// Transform output body: a string or bytes, nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputBody {
    Text(String),
    Binary(Vec<u8>),
}

impl OutputBody {
    pub fn into_bytes(self) -> Bytes {
        match self {
            OutputBody::Text(text) => Bytes::from(text.into_bytes()),
            OutputBody::Binary(bytes) => Bytes::from(bytes),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            OutputBody::Text(text) => text.len(),
            OutputBody::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Final output produced by a response transform.
#[derive(Debug, Clone)]
pub struct TransformResult {
    pub output: OutputBody,
    pub content_type: String,
    pub status: StatusCode,
    pub headers: HeaderMap,
}

impl TransformResult {
    pub const DEFAULT_CONTENT_TYPE: &'static str = "text/plain";

    pub fn new(output: OutputBody) -> Self {
        Self {
            output,
            content_type: Self::DEFAULT_CONTENT_TYPE.to_owned(),
            status: StatusCode::OK,
            headers: HeaderMap::new(),
        }
    }
}

/// Response produced entirely by a request transform, bypassing dispatch.
#[derive(Debug, Clone)]
pub struct DirectResponse {
    pub output: OutputBody,
    pub content_type: String,
    pub status: StatusCode,
    pub headers: HeaderMap,
}

impl DirectResponse {
    pub const DEFAULT_CONTENT_TYPE: &'static str = "text/html";

    pub fn new(output: OutputBody) -> Self {
        Self {
            output,
            content_type: Self::DEFAULT_CONTENT_TYPE.to_owned(),
            status: StatusCode::OK,
            headers: HeaderMap::new(),
        }
    }
}

/// Dispatch target described by a request transform.
///
/// The pipeline only ever dispatches to internal paths; validation fails
/// fast on anything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub mode: String,
    pub url: String,
}

impl Target {
    /// The only mode this pipeline dispatches.
    pub const INTERNAL: &'static str = "internal";

    pub fn new(mode: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            mode: mode.into(),
            url: url.into(),
        }
    }

    pub fn internal(url: impl Into<String>) -> Self {
        Self::new(Self::INTERNAL, url)
    }

    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.mode != Self::INTERNAL {
            return Err(GatewayError::Configuration(format!(
                "target mode must be \"{}\", got \"{}\"",
                Self::INTERNAL,
                self.mode
            )));
        }

        if !self.url.starts_with('/') {
            return Err(GatewayError::Configuration(format!(
                "target url must start with '/', got \"{}\"",
                self.url
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_headers_strips_cookie() {
        let request = RequestDetails::new("/docs")
            .with_header(header::COOKIE, HeaderValue::from_static("session=abc"))
            .with_header(header::ACCEPT, HeaderValue::from_static("text/html"));

        let forwarded = request.forward_headers();
        assert!(forwarded.get(header::COOKIE).is_none());
        assert!(forwarded.get(header::ACCEPT).is_some());
    }

    #[test]
    fn response_text_and_json() {
        let response = ResponseDetails::new(StatusCode::OK, &br#"{"a":1}"#[..]);
        assert_eq!(response.text(), r#"{"a":1}"#);
        assert_eq!(response.json(), Some(serde_json::json!({"a": 1})));

        let plain = ResponseDetails::new(StatusCode::OK, &b"not json"[..]);
        assert!(plain.json().is_none());
    }

    #[test]
    fn target_validation() {
        assert!(Target::new("external", "http://x").validate().is_err());
        assert!(Target::new("internal", "http://x").validate().is_err());
        assert!(Target::new("internal", "/x").validate().is_ok());
    }

    #[test]
    fn direct_response_defaults() {
        let direct = DirectResponse::new(OutputBody::Text("hi".into()));
        assert_eq!(direct.content_type, "text/html");
        assert_eq!(direct.status, StatusCode::OK);
    }

    #[test]
    fn transform_result_defaults() {
        let result = TransformResult::new(OutputBody::Text("hi".into()));
        assert_eq!(result.content_type, "text/plain");
        assert_eq!(result.status, StatusCode::OK);
    }
}
