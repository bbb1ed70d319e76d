//! Template request/result types and error definitions

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Template-specific error type
///
/// `Argument` is raised before any I/O when a request is malformed. Every
/// other variant is a pipeline stage failure and aborts the whole render.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Invalid render arguments: {0}")]
    Argument(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Sass compilation failed: {0}")]
    Sass(String),

    #[error("CSS prefixing failed: {0}")]
    Prefix(String),

    #[error("Template rendering failed: {0}")]
    Engine(#[from] minijinja::Error),

    #[error("CSS inlining failed: {0}")]
    Inline(String),

    #[error("HTML minification failed: {0}")]
    Minify(String),

    #[error("Render task failed: {0}")]
    Task(String),
}

impl TemplateError {
    /// True when the caller misused the request contract, as opposed to a
    /// failure inside the pipeline.
    pub fn is_argument_error(&self) -> bool {
        matches!(self, TemplateError::Argument(_))
    }

    /// Short stage label, used for metrics and logs
    pub fn stage(&self) -> &'static str {
        match self {
            TemplateError::Argument(_) => "arguments",
            TemplateError::Io { .. } => "read",
            TemplateError::Sass(_) => "sass",
            TemplateError::Prefix(_) => "prefix",
            TemplateError::Engine(_) => "template",
            TemplateError::Inline(_) => "inline",
            TemplateError::Minify(_) => "minify",
            TemplateError::Task(_) => "task",
        }
    }
}

/// Result type for template operations
pub type TemplateResult<T> = Result<T, TemplateError>;

/// A request to render one template into HTML and text.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    /// Template directory name; `None` selects the configured default
    pub template_name: Option<String>,

    /// Substitution values for the HTML template
    pub html_locals: Value,

    /// Substitution values for the text template
    pub text_locals: Value,
}

impl RenderRequest {
    /// Build a request from a locals bag shaped `{html: {...}, text: {...}}`.
    ///
    /// Fails with [`TemplateError::Argument`] when the name is empty or not a
    /// plain directory name, when `locals` is not an object, or when either
    /// channel is absent.
    pub fn new(template_name: Option<String>, locals: Value) -> TemplateResult<Self> {
        if let Some(name) = &template_name {
            validate_template_name(name)?;
        }

        let mut locals = match locals {
            Value::Object(map) => map,
            _ => {
                return Err(TemplateError::Argument(
                    "requires local parameters".to_string(),
                ))
            }
        };

        let html_locals = locals.remove("html").ok_or_else(|| {
            TemplateError::Argument("requires local parameters for HTML".to_string())
        })?;
        let text_locals = locals.remove("text").ok_or_else(|| {
            TemplateError::Argument("requires local parameters for text".to_string())
        })?;

        Ok(Self {
            template_name,
            html_locals,
            text_locals,
        })
    }

    /// Request for the default template with explicit channel locals
    pub fn with_locals(html_locals: Value, text_locals: Value) -> Self {
        Self {
            template_name: None,
            html_locals,
            text_locals,
        }
    }

    /// Select a named template
    pub fn template(mut self, name: impl Into<String>) -> Self {
        self.template_name = Some(name.into());
        self
    }
}

/// Rendered mail content: minified HTML with inlined CSS, and plain text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedContent {
    pub html: String,
    pub text: String,
}

/// Template names select a directory under the templates root, never a path.
pub(crate) fn validate_template_name(name: &str) -> TemplateResult<()> {
    if name.is_empty() {
        return Err(TemplateError::Argument(
            "requires a template name".to_string(),
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(TemplateError::Argument(format!(
            "template name must contain only alphanumeric, dash, or underscore: {}",
            name
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_from_locals() {
        let request = RenderRequest::new(
            Some("welcome".to_string()),
            json!({"html": {"x": 1}, "text": {"x": 2}}),
        )
        .unwrap();

        assert_eq!(request.template_name.as_deref(), Some("welcome"));
        assert_eq!(request.html_locals, json!({"x": 1}));
        assert_eq!(request.text_locals, json!({"x": 2}));
    }

    #[test]
    fn test_request_without_name_uses_default() {
        let request = RenderRequest::new(None, json!({"html": {}, "text": {}})).unwrap();
        assert!(request.template_name.is_none());
    }

    #[test]
    fn test_request_requires_object_locals() {
        let err = RenderRequest::new(None, json!("bogus-locals")).unwrap_err();
        assert!(err.is_argument_error());
        assert!(err.to_string().contains("requires local parameters"));

        let err = RenderRequest::new(None, Value::Null).unwrap_err();
        assert!(err.is_argument_error());
    }

    #[test]
    fn test_request_requires_html_locals() {
        let err = RenderRequest::new(None, json!({"text": {}})).unwrap_err();
        assert!(err.to_string().contains("for HTML"));
    }

    #[test]
    fn test_request_requires_text_locals() {
        let err = RenderRequest::new(None, json!({"html": {}})).unwrap_err();
        assert!(err.to_string().contains("for text"));
    }

    #[test]
    fn test_request_rejects_empty_name() {
        let err = RenderRequest::new(Some(String::new()), json!({"html": {}, "text": {}}))
            .unwrap_err();
        assert!(err.to_string().contains("requires a template name"));
    }

    #[test]
    fn test_request_rejects_path_names() {
        for name in ["../secrets", "a/b", "with space"] {
            let result = RenderRequest::new(Some(name.to_string()), json!({"html": {}, "text": {}}));
            assert!(matches!(result, Err(TemplateError::Argument(_))), "{}", name);
        }
    }

    #[test]
    fn test_error_stage_labels() {
        assert_eq!(TemplateError::Sass("x".into()).stage(), "sass");
        assert_eq!(TemplateError::Argument("x".into()).stage(), "arguments");
        assert!(!TemplateError::Minify("x".into()).is_argument_error());
    }
}
