//! Internal target dispatch abstraction.

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::types::{RequestDetails, ResponseDetails};

/// Dispatches transformed requests to internal targets.
///
/// Implementations only ever see internal (`/`-prefixed) paths, since the
/// pipeline validates targets before calling, and own their timeout policy.
#[async_trait]
pub trait TargetExecutor: Send + Sync {
    async fn execute(&self, request: RequestDetails) -> Result<ResponseDetails, GatewayError>;
}
