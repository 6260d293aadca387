//! Static validation of transform source and payload shapes.

use rhai::{Dynamic, Engine, Map};

use super::TransformRole;

/// Positional parameters a transform entry function is expected to take:
/// the request or response details, and the invocation context.
const EXPECTED_ENTRY_PARAMS: usize = 2;

/// Outcome of static source validation.
///
/// Warnings never block validation success.
#[derive(Debug, Clone, Default)]
pub struct SourceReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl SourceReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Statically check transform source for the given role.
///
/// Parses without executing anything. A syntax error is reported with its
/// position; a missing entry function is an error; an entry function with
/// fewer than two parameters is only a warning.
pub fn validate_source(source: &str, role: TransformRole) -> SourceReport {
    let mut report = SourceReport::default();

    let engine = Engine::new();
    let ast = match engine.compile(source) {
        Ok(ast) => ast,
        Err(error) => {
            let line = error.1.line().unwrap_or(0);
            let column = error.1.position().unwrap_or(0);
            report
                .errors
                .push(format!("syntax error at line {line}, column {column}: {}", error.0));
            return report;
        }
    };

    match ast.iter_functions().find(|f| f.name == role.entry_point()) {
        None => report
            .errors
            .push(format!("missing required function: {}", role.entry_point())),
        Some(entry) if entry.params.len() < EXPECTED_ENTRY_PARAMS => {
            report.warnings.push(format!(
                "{} takes {} parameter(s); expected at least {EXPECTED_ENTRY_PARAMS} (details, context)",
                role.entry_point(),
                entry.params.len()
            ));
        }
        Some(_) => {}
    }

    report
}

/// Validate the shape of a direct-response payload.
///
/// The first violated rule wins; nothing past the first failure is checked.
pub fn validate_direct_response(value: &Dynamic) -> Result<(), String> {
    let Some(map) = value.clone().try_cast::<Map>() else {
        return Err(format!(
            "direct response must be a map, got {}",
            value.type_name()
        ));
    };

    let Some(output) = map.get("output") else {
        return Err("direct response is missing required key: output".to_owned());
    };

    if !output.is_string() && !output.is_blob() {
        return Err(format!(
            "output must be a string or bytes, got {}",
            output.type_name()
        ));
    }

    if let Some(content_type) = map.get("content_type") {
        if !content_type.is_string() {
            return Err(format!(
                "content_type must be a string, got {}",
                content_type.type_name()
            ));
        }
    }

    if let Some(status_code) = map.get("status_code") {
        if !status_code.is_int() {
            return Err(format!(
                "status_code must be an integer, got {}",
                status_code.type_name()
            ));
        }
    }

    Ok(())
}
