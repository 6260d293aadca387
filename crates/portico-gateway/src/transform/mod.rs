//! Dynamically loaded transform code.
//!
//! User-supplied source is compiled behind the narrow [`Transform`]
//! capability: one `invoke` operation, a fresh scope per call, no state
//! shared between calls. Scripts run with the engine's standard
//! capabilities and no sandbox; the operator controls who may register
//! transforms.

mod loader;
mod outcome;
mod validator;

pub use loader::TransformLoader;
pub use outcome::{parse_transform_result, TargetRequest, TransformOutcome};
pub use validator::{validate_direct_response, validate_source, SourceReport};

use http::header;
use rhai::{Dynamic, Engine, Map, Scope, AST};

use crate::error::GatewayError;
use crate::types::{RequestDetails, ResponseDetails};

/// Role a transform plays in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformRole {
    Request,
    Response,
}

impl TransformRole {
    /// Name of the entry function the source must define for this role.
    pub const fn entry_point(self) -> &'static str {
        match self {
            Self::Request => "transform_request",
            Self::Response => "transform_response",
        }
    }
}

/// A compiled transform.
///
/// Owns its own engine and syntax tree, so concurrent pipeline executions
/// never share interpreter state.
pub struct Transform {
    engine: Engine,
    ast: AST,
    entry_point: &'static str,
}

impl Transform {
    pub(crate) fn new(engine: Engine, ast: AST, role: TransformRole) -> Self {
        Self {
            engine,
            ast,
            entry_point: role.entry_point(),
        }
    }

    pub const fn entry_point(&self) -> &'static str {
        self.entry_point
    }

    /// Run the transform with a request or response description and a
    /// context map.
    pub fn invoke(&self, input: Dynamic, context: Dynamic) -> Result<Dynamic, GatewayError> {
        let mut scope = Scope::new();
        self.engine
            .call_fn::<Dynamic>(&mut scope, &self.ast, self.entry_point, vec![input, context])
            .map_err(|e| GatewayError::Execution(e.to_string()))
    }
}

impl std::fmt::Debug for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transform")
            .field("entry_point", &self.entry_point)
            .finish()
    }
}

/// Request description as the script sees it.
///
/// Header names are lowercased; the cookie header is never exposed.
pub(crate) fn request_to_dynamic(details: &RequestDetails) -> Dynamic {
    let mut map = Map::new();
    map.insert("path".into(), details.path.clone().into());
    map.insert("method".into(), details.method.as_str().into());
    map.insert(
        "query_string".into(),
        match &details.query_string {
            Some(query_string) => query_string.clone().into(),
            None => Dynamic::UNIT,
        },
    );
    map.insert("headers".into(), headers_to_dynamic(details));
    map.insert("json".into(), json_to_dynamic(details.json.as_ref()));
    map.insert(
        "data".into(),
        match &details.data {
            Some(data) => Dynamic::from_blob(data.to_vec()),
            None => Dynamic::UNIT,
        },
    );
    map.insert(
        "url".into(),
        match &details.url {
            Some(url) => url.clone().into(),
            None => Dynamic::UNIT,
        },
    );
    Dynamic::from_map(map)
}

/// Response description as the script sees it.
pub(crate) fn response_to_dynamic(details: &ResponseDetails) -> Dynamic {
    let mut headers = Map::new();
    for (name, value) in &details.headers {
        if let Ok(value) = value.to_str() {
            headers.insert(name.as_str().into(), value.into());
        }
    }

    let mut map = Map::new();
    map.insert(
        "status_code".into(),
        Dynamic::from(i64::from(details.status.as_u16())),
    );
    map.insert("headers".into(), Dynamic::from_map(headers));
    map.insert("content".into(), Dynamic::from_blob(details.content.to_vec()));
    map.insert("text".into(), details.text().into());
    map.insert("json".into(), json_to_dynamic(details.json().as_ref()));
    map.insert("request_path".into(), details.request_path.clone().into());
    map.insert("source".into(), details.source.as_str().into());
    map.insert(
        "is_direct_response".into(),
        Dynamic::from(details.is_direct_response()),
    );
    Dynamic::from_map(map)
}

fn headers_to_dynamic(details: &RequestDetails) -> Dynamic {
    let mut headers = Map::new();
    for (name, value) in &details.headers {
        if name == &header::COOKIE {
            continue;
        }
        if let Ok(value) = value.to_str() {
            headers.insert(name.as_str().into(), value.into());
        }
    }
    Dynamic::from_map(headers)
}

fn json_to_dynamic(json: Option<&serde_json::Value>) -> Dynamic {
    match json {
        Some(value) => rhai::serde::to_dynamic(value).unwrap_or(Dynamic::UNIT),
        None => Dynamic::UNIT,
    }
}
