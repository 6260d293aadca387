//! Structured failure summaries for display and logging.
//!
//! Everything leaving this module has passed header redaction: a preview or
//! diagnostic never carries authorization or cookie values.

use serde_json::Value;

use crate::error::GatewayError;
use crate::types::RequestDetails;

/// Placeholder replacing redacted header values.
pub const REDACTED_PLACEHOLDER: &str = "[redacted]";

/// Headers stripped from every diagnostic and preview path.
const SENSITIVE_HEADERS: [&str; 2] = ["authorization", "cookie"];

/// Markers delimiting the exception block an internal failure page embeds.
const SUMMARY_MARKER: &str = r#"<div class="error-summary">"#;
const FRAME_MARKER: &str = r#"<div class="error-frame">"#;
const MARKER_END: &str = "</div>";

/// One-line summary plus full detail for a pipeline failure.
#[derive(Debug, Clone)]
pub struct DiagnosticReport {
    pub summary: String,
    pub detail: String,
}

impl DiagnosticReport {
    /// Summarise as `<ErrorKind>: <message>`, or the bare kind when the
    /// message is empty.
    pub fn new(kind: &str, message: &str) -> Self {
        let summary = if message.is_empty() {
            kind.to_owned()
        } else {
            format!("{kind}: {message}")
        };
        let detail = summary.clone();
        Self { summary, detail }
    }

    pub fn from_error(error: &GatewayError) -> Self {
        Self::new(error.kind(), &error.message())
    }

    /// Append a trace block to the detail.
    pub fn with_trace(mut self, trace: &str) -> Self {
        if !trace.is_empty() {
            self.detail.push_str("\n\n");
            self.detail.push_str(trace);
        }
        self
    }

    /// Append structured debug context to the detail, redacted.
    pub fn with_context(mut self, context: &Value) -> Self {
        let redacted = redact_preview(context.clone());
        self.detail.push_str("\n\ncontext:\n");
        self.detail
            .push_str(&serde_json::to_string_pretty(&redacted).unwrap_or_default());
        self
    }
}

/// Exception details extracted from an internal error page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPageSummary {
    pub summary: String,
    /// Stack frames in page order, outermost first.
    pub frames: Vec<String>,
}

/// Extract the embedded exception summary and stack frames from an internal
/// failure page.
pub fn parse_error_page(html: &str) -> Option<ErrorPageSummary> {
    let summary = extract_after(html, SUMMARY_MARKER)?.to_owned();

    let mut frames = Vec::new();
    let mut rest = html;
    while let Some(index) = rest.find(FRAME_MARKER) {
        rest = &rest[index + FRAME_MARKER.len()..];
        let Some(end) = rest.find(MARKER_END) else {
            break;
        };
        frames.push(rest[..end].trim().to_owned());
        rest = &rest[end + MARKER_END.len()..];
    }

    Some(ErrorPageSummary { summary, frames })
}

fn extract_after<'a>(html: &'a str, marker: &str) -> Option<&'a str> {
    let start = html.find(marker)? + marker.len();
    let rest = &html[start..];
    let end = rest.find(MARKER_END)?;
    Some(rest[..end].trim())
}

/// Build a redacted preview of a request for diagnostics and logs.
pub fn request_preview(details: &RequestDetails) -> Value {
    let mut headers = serde_json::Map::new();
    for (name, value) in &details.headers {
        headers.insert(
            name.as_str().to_owned(),
            Value::String(String::from_utf8_lossy(value.as_bytes()).into_owned()),
        );
    }

    let preview = serde_json::json!({
        "path": details.path,
        "method": details.method.as_str(),
        "query_string": details.query_string,
        "headers": Value::Object(headers),
        "url": details.url,
    });

    redact_preview(preview)
}

/// Strip sensitive headers from a preview value.
///
/// Mandatory on every diagnostic and preview path: authorization and cookie
/// values are replaced, case-insensitively, wherever a `headers` mapping
/// appears.
pub fn redact_preview(mut value: Value) -> Value {
    redact_in_place(&mut value);
    value
}

fn redact_in_place(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, entry) in map.iter_mut() {
                if key.eq_ignore_ascii_case("headers") {
                    if let Value::Object(headers) = entry {
                        for (name, header_value) in headers.iter_mut() {
                            if SENSITIVE_HEADERS
                                .iter()
                                .any(|sensitive| name.eq_ignore_ascii_case(sensitive))
                            {
                                *header_value = Value::String(REDACTED_PLACEHOLDER.to_owned());
                            }
                        }
                    }
                } else {
                    redact_in_place(entry);
                }
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                redact_in_place(item);
            }
        }
        _ => {}
    }
}
