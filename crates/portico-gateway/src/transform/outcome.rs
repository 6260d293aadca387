//! Interpretation of raw transform output.
//!
//! The shape of a script's return value is decided exactly once, here; the
//! rest of the pipeline only ever matches [`TransformOutcome`].

use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use rhai::{Dynamic, Map};
use serde_json::Value;

use super::validator::validate_direct_response;
use crate::error::GatewayError;
use crate::types::{DirectResponse, OutputBody, Target, TransformResult};

/// A transformed request bound for an internal target.
///
/// Carries the target plus any outbound overrides the transform requested;
/// absent fields fall back to the inbound request.
#[derive(Debug, Clone)]
pub struct TargetRequest {
    pub target: Target,
    pub method: Option<Method>,
    pub query_string: Option<String>,
    pub headers: HeaderMap,
    pub json: Option<Value>,
    pub data: Option<Vec<u8>>,
}

impl TargetRequest {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            method: None,
            query_string: None,
            headers: HeaderMap::new(),
            json: None,
            data: None,
        }
    }
}

/// What a request transform produced.
#[derive(Debug, Clone)]
pub enum TransformOutcome {
    /// The transform produced the final response itself; dispatch is skipped.
    Direct(DirectResponse),
    /// The transform produced a request bound for an internal target.
    Dispatch(TargetRequest),
}

impl TransformOutcome {
    /// Interpret the raw value returned by a request transform.
    ///
    /// A map carrying an `output` key is a direct response; anything else
    /// must describe a target.
    pub fn from_request_output(raw: Dynamic) -> Result<Self, GatewayError> {
        let Some(map) = raw.clone().try_cast::<Map>() else {
            return Err(GatewayError::Validation(format!(
                "request transform must return a map, got {}",
                raw.type_name()
            )));
        };

        if map.contains_key("output") {
            validate_direct_response(&raw).map_err(GatewayError::Validation)?;
            return Ok(Self::Direct(parse_direct_response(&map)?));
        }

        Ok(Self::Dispatch(parse_target_request(&map)?))
    }
}

/// Interpret the raw value returned by a response transform.
pub fn parse_transform_result(raw: Dynamic) -> Result<TransformResult, GatewayError> {
    validate_direct_response(&raw).map_err(GatewayError::Validation)?;

    // Shape already checked; the map and output key are present.
    let map = raw
        .try_cast::<Map>()
        .ok_or_else(|| GatewayError::Validation("response transform must return a map".into()))?;
    let output = extract_output(&map)
        .ok_or_else(|| GatewayError::Validation("response transform output is missing".into()))?;

    let mut result = TransformResult::new(output);
    if let Some(content_type) = extract_string(&map, "content_type") {
        result.content_type = content_type;
    }
    if let Some(status) = extract_status(&map)? {
        result.status = status;
    }
    result.headers = extract_headers(&map)?;
    Ok(result)
}

fn parse_direct_response(map: &Map) -> Result<DirectResponse, GatewayError> {
    let output = extract_output(map)
        .ok_or_else(|| GatewayError::Validation("direct response output is missing".into()))?;

    let mut direct = DirectResponse::new(output);
    if let Some(content_type) = extract_string(map, "content_type") {
        direct.content_type = content_type;
    }
    if let Some(status) = extract_status(map)? {
        direct.status = status;
    }
    direct.headers = extract_headers(map)?;
    Ok(direct)
}

fn parse_target_request(map: &Map) -> Result<TargetRequest, GatewayError> {
    let url = extract_string(map, "url").ok_or_else(|| {
        GatewayError::Configuration(
            "request transform result carries neither an output nor a target url".into(),
        )
    })?;
    let mode = extract_string(map, "mode").unwrap_or_else(|| Target::INTERNAL.to_owned());

    let mut target_request = TargetRequest::new(Target::new(mode, url));

    if let Some(method) = extract_string(map, "method") {
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| GatewayError::Validation(format!("invalid request method: {method}")))?;
        target_request.method = Some(method);
    }
    target_request.query_string = extract_string(map, "query_string");
    target_request.headers = extract_headers(map)?;
    target_request.json = map
        .get("json")
        .filter(|value| !value.is_unit())
        .and_then(|value| rhai::serde::from_dynamic::<Value>(value).ok());
    target_request.data = map
        .get("data")
        .and_then(|value| value.clone().try_cast::<rhai::Blob>());

    Ok(target_request)
}

fn extract_output(map: &Map) -> Option<OutputBody> {
    let output = map.get("output")?;
    if output.is_string() {
        return output.clone().into_string().ok().map(OutputBody::Text);
    }
    output.clone().try_cast::<rhai::Blob>().map(OutputBody::Binary)
}

fn extract_string(map: &Map, key: &str) -> Option<String> {
    map.get(key)?.clone().into_string().ok()
}

fn extract_status(map: &Map) -> Result<Option<StatusCode>, GatewayError> {
    let Some(raw) = map.get("status_code") else {
        return Ok(None);
    };
    let code = raw.as_int().map_err(|type_name| {
        GatewayError::Validation(format!("status_code must be an integer, got {type_name}"))
    })?;
    let status = u16::try_from(code)
        .ok()
        .and_then(|code| StatusCode::from_u16(code).ok())
        .ok_or_else(|| {
            GatewayError::Validation(format!("status_code is not a valid HTTP status: {code}"))
        })?;
    Ok(Some(status))
}

fn extract_headers(map: &Map) -> Result<HeaderMap, GatewayError> {
    let Some(raw) = map.get("headers") else {
        return Ok(HeaderMap::new());
    };
    let Some(entries) = raw.clone().try_cast::<Map>() else {
        return Err(GatewayError::Validation(format!(
            "headers must be a map, got {}",
            raw.type_name()
        )));
    };

    let mut headers = HeaderMap::new();
    for (name, value) in &entries {
        let value = value.clone().into_string().map_err(|type_name| {
            GatewayError::Validation(format!("header {name} must be a string, got {type_name}"))
        })?;
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| GatewayError::Validation(format!("invalid header name: {name}")))?;
        let header_value = HeaderValue::from_str(&value)
            .map_err(|_| GatewayError::Validation(format!("invalid value for header {name}")))?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}
