//! Gateway transform pipeline.
//!
//! Gateways pair user-supplied request and response transforms with an
//! internal-only dispatch target. The pipeline loads transform source from a
//! content-addressed store (or a local file override), validates and runs
//! it, dispatches to the internal target, resolves bounded chains of
//! content-addressed redirects, and shapes the final response. Every
//! failure is converted into a redacted diagnostic rather than crashing.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod executor;
pub mod pipeline;
pub mod redirect;
pub mod transform;
pub mod types;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use executor::TargetExecutor;
pub use pipeline::GatewayPipeline;
