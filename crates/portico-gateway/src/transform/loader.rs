//! Transform source resolution and compilation.

use std::path::Path;
use std::sync::Arc;

use portico_store::ContentStore;
use rhai::Engine;

use super::{Transform, TransformRole};

/// Loads transform source and compiles it into an invocable unit.
///
/// Resolution checks a local file override before the content store.
/// Nothing is cached: every load re-reads and recompiles, so an edit to a
/// transform is live on the very next call.
#[derive(Clone)]
pub struct TransformLoader {
    store: Arc<dyn ContentStore>,
}

impl TransformLoader {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Resolve transform source text from a file override or the store.
    ///
    /// Failures resolve to `None` with a logged diagnostic; this layer never
    /// raises.
    pub async fn resolve_source(&self, id: &str) -> Option<String> {
        let path = Path::new(id);
        if path.is_file() {
            match std::fs::read_to_string(path) {
                Ok(source) => return Some(source),
                Err(error) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %error,
                        "Failed to read transform file override"
                    );
                    return None;
                }
            }
        }

        match self.store.resolve(id, false).await {
            Ok(Some(content)) => match content.into_text() {
                Some(source) => Some(source),
                None => {
                    tracing::warn!(id, "Transform content is not text");
                    None
                }
            },
            Ok(None) => {
                tracing::warn!(id, "Transform source not found");
                None
            }
            Err(error) => {
                tracing::warn!(id, error = %error, "Failed to resolve transform source");
                None
            }
        }
    }

    /// Compile source in a fresh engine and select the entry function for
    /// the role.
    ///
    /// Returns `None` when the source fails to compile or does not define
    /// the role's entry function.
    pub fn compile(&self, source: &str, role: TransformRole) -> Option<Transform> {
        let engine = Engine::new();
        let ast = match engine.compile(source) {
            Ok(ast) => ast,
            Err(error) => {
                tracing::warn!(error = %error, "Transform compilation failed");
                return None;
            }
        };

        let defines_entry = ast
            .iter_functions()
            .any(|function| function.name == role.entry_point());
        if !defines_entry {
            tracing::warn!(
                entry_point = role.entry_point(),
                "Transform source does not define the requested entry function"
            );
            return None;
        }

        Some(Transform::new(engine, ast, role))
    }

    /// Resolve and compile in one step.
    pub async fn load(&self, id: &str, role: TransformRole) -> Option<Transform> {
        let source = self.resolve_source(id).await?;
        self.compile(&source, role)
    }
}

impl std::fmt::Debug for TransformLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformLoader").finish()
    }
}
