//! Gateway configuration records.

use serde::Deserialize;
use std::collections::HashMap;

/// Configuration for one gateway.
///
/// Records are owned by external storage and only read here; the pipeline
/// never creates or persists them.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub name: String,

    /// Content identifier (or local file override) of the request transform.
    #[serde(default)]
    pub request_transform: Option<String>,

    /// Content identifier (or local file override) of the response transform.
    #[serde(default)]
    pub response_transform: Option<String>,

    /// Template name to content identifier, exposed to transforms as context.
    #[serde(default)]
    pub templates: HashMap<String, String>,

    /// Dispatch target; defaults to `/{name}` when absent.
    #[serde(default)]
    pub target_url: Option<String>,

    /// Content identifier of a custom error page body.
    #[serde(default)]
    pub error_template: Option<String>,

    /// Run the response transform on direct responses too.
    ///
    /// Off by default: a gateway must explicitly declare that its response
    /// transform accepts already-final output.
    #[serde(default)]
    pub transform_direct_responses: bool,
}

impl GatewayConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            request_transform: None,
            response_transform: None,
            templates: HashMap::new(),
            target_url: None,
            error_template: None,
            transform_direct_responses: false,
        }
    }

    pub fn with_request_transform(mut self, id: impl Into<String>) -> Self {
        self.request_transform = Some(id.into());
        self
    }

    pub fn with_response_transform(mut self, id: impl Into<String>) -> Self {
        self.response_transform = Some(id.into());
        self
    }

    pub fn with_template(mut self, name: impl Into<String>, id: impl Into<String>) -> Self {
        self.templates.insert(name.into(), id.into());
        self
    }

    pub fn with_target_url(mut self, url: impl Into<String>) -> Self {
        self.target_url = Some(url.into());
        self
    }

    pub fn with_error_template(mut self, id: impl Into<String>) -> Self {
        self.error_template = Some(id.into());
        self
    }

    pub const fn with_transform_direct_responses(mut self, enabled: bool) -> Self {
        self.transform_direct_responses = enabled;
        self
    }

    /// Dispatch target url, defaulting to `/{name}`.
    pub fn effective_target_url(&self) -> String {
        self.target_url
            .clone()
            .unwrap_or_else(|| format!("/{}", self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_url_defaults_to_name() {
        let config = GatewayConfig::new("orders");
        assert_eq!(config.effective_target_url(), "/orders");

        let config = GatewayConfig::new("orders").with_target_url("/internal/orders");
        assert_eq!(config.effective_target_url(), "/internal/orders");
    }

    #[test]
    fn deserialize_with_defaults() {
        let config: GatewayConfig = serde_json::from_str(r#"{"name": "docs"}"#).unwrap();
        assert_eq!(config.name, "docs");
        assert!(config.request_transform.is_none());
        assert!(config.templates.is_empty());
        assert!(!config.transform_direct_responses);
    }
}
