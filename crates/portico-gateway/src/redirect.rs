//! Resolution of internal redirect chains to content-addressed bytes.

use http::{header, HeaderMap, HeaderValue, StatusCode};
use portico_store::ContentStore;

use crate::types::{ResponseDetails, ResponseSource};

/// Default redirect hop budget.
pub const DEFAULT_MAX_HOPS: usize = 3;

/// Statuses the follower treats as redirects.
const REDIRECT_STATUSES: [StatusCode; 5] = [
    StatusCode::MOVED_PERMANENTLY,
    StatusCode::FOUND,
    StatusCode::SEE_OTHER,
    StatusCode::TEMPORARY_REDIRECT,
    StatusCode::PERMANENT_REDIRECT,
];

/// Content type for a resolved redirect body, by extension.
fn content_type_for(extension: Option<&str>) -> &'static str {
    match extension {
        Some("txt") => "text/plain",
        Some("json") => "application/json",
        Some("md") => "text/markdown",
        // html, missing, and unrecognised extensions all render as html
        _ => "text/html",
    }
}

/// Follow a bounded chain of internal redirects, resolving single-segment
/// locations as content identifiers.
///
/// Exhausting the hop budget while the response still redirects is a soft
/// give-up, not an error: the last response is returned as-is, redirect
/// headers intact, and the caller decides what a still-redirecting response
/// means.
pub async fn follow_redirects(
    initial: ResponseDetails,
    store: &dyn ContentStore,
    max_hops: usize,
) -> ResponseDetails {
    let mut current = initial;

    for _ in 0..max_hops {
        if !REDIRECT_STATUSES.contains(&current.status) {
            return current;
        }

        let Some(location) = current
            .headers
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
        else {
            return current;
        };

        // Query components never address content.
        let path = location.split('?').next().unwrap_or(location);
        let path = path.strip_prefix('/').unwrap_or(path);

        // Only a single path segment can be a content reference; nested
        // internal redirects stay unresolved.
        if path.is_empty() || path.contains('/') {
            return current;
        }

        let (id, extension) = match path.split_once('.') {
            Some((id, extension)) => (id, Some(extension)),
            None => (path, None),
        };

        let content = match store.resolve(id, true).await {
            Ok(Some(content)) => content,
            Ok(None) => {
                tracing::debug!(id, "Redirect target not present in store");
                return current;
            }
            Err(error) => {
                tracing::debug!(id, error = %error, "Redirect target not resolvable");
                return current;
            }
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(content_type_for(extension)),
        );

        // A synthesized 200 never matches the redirect set, so the next
        // iteration returns it.
        current = ResponseDetails {
            status: StatusCode::OK,
            headers,
            content: content.into_bytes(),
            request_path: current.request_path.clone(),
            source: ResponseSource::SynthesizedFromRedirect,
        };
    }

    current
}
