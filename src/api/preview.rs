//! Template preview endpoints.
//!
//! `GET` renders a template with built-in sample locals and shows the HTML
//! followed by the text version. `POST` renders caller-supplied locals and
//! returns both versions as JSON.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use minijinja::{context, Environment, Value as TemplateValue};
use serde_json::{json, Value};

use crate::error::Result;
use crate::server::AppState;
use crate::template::{ContentRenderer, RenderRequest, RenderedContent, TemplateError};

const PREVIEW_PAGE: &str = r#"{{ html }}
<pre style="background: #fff; box-sizing: border-box; color: #000; font: normal 14px/150% Monaco, monospace; padding: 1em; white-space: pre-line; width: 100%;">{{ text }}</pre>"#;

/// Sample `{html, text}` locals used by the preview page
pub fn sample_locals() -> Value {
    json!({
        "html": {
            "greeting": "Lorem Ipsum Dolor",
            "messageBody": "<p>Etiam tempus aliquam purus, sit amet tempor nibh faucibus ut. Nulla facilisi. Morbi nec eros pharetra, semper sapien in, varius magna.</p><p>Sed vitae facilisis sem, varius tempor orci. Aliquam erat volutpat. Donec cursus a nulla ac rhoncus.</p><p>Nunc pellentesque neque dui, id ornare lacus ornare eu.</p>"
        },
        "text": {
            "greeting": "Lorem Ipsum Dolor",
            "messageBody": "Etiam tempus aliquam purus, sit amet tempor nibh faucibus ut. Nulla facilisi. Morbi nec eros pharetra, semper sapien in, varius magna.\n\nSed vitae facilisis sem, varius tempor orci. Aliquam erat volutpat. Donec cursus a nulla ac rhoncus.\n\nNunc pellentesque neque dui, id ornare lacus ornare eu."
        }
    })
}

/// GET /preview - default template with sample locals
pub async fn preview_default(State(state): State<AppState>) -> Response {
    preview(&state, None).await
}

/// GET /preview/{template} - named template with sample locals
pub async fn preview_template(
    State(state): State<AppState>,
    Path(template): Path<String>,
) -> Response {
    preview(&state, Some(template)).await
}

/// POST /preview/{template} - render caller-supplied `{html, text}` locals
pub async fn render_template(
    State(state): State<AppState>,
    Path(template): Path<String>,
    Json(locals): Json<Value>,
) -> Result<Json<RenderedContent>> {
    let content = state.renderer.render_content(Some(template), locals).await?;
    Ok(Json(content))
}

async fn preview(state: &AppState, template: Option<String>) -> Response {
    let result = match RenderRequest::new(template, sample_locals()) {
        Ok(request) => state.renderer.render(request).await,
        Err(e) => Err(e),
    };

    match result.and_then(|content| preview_page(&content)) {
        Ok(page) => Html(page).into_response(),
        Err(e) => {
            let status = if e.is_argument_error() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            tracing::warn!(error = %e, "Preview render failed");
            (status, e.to_string()).into_response()
        }
    }
}

/// Rendered HTML followed by the escaped text version
fn preview_page(content: &RenderedContent) -> std::result::Result<String, TemplateError> {
    let mut env = Environment::new();
    env.add_template("preview.html", PREVIEW_PAGE)?;
    let page = env.get_template("preview.html")?.render(context! {
        html => TemplateValue::from_safe_string(content.html.clone()),
        text => &content.text,
    })?;
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_locals_have_both_channels() {
        let locals = sample_locals();
        assert!(locals["html"]["messageBody"].is_string());
        assert!(locals["text"]["greeting"].is_string());
    }

    #[test]
    fn test_preview_page_escapes_text_only() {
        let content = RenderedContent {
            html: "<h1>Hi</h1>".to_string(),
            text: "a < b".to_string(),
        };

        let page = preview_page(&content).unwrap();
        assert!(page.starts_with("<h1>Hi</h1>"));
        assert!(page.contains("a &lt; b</pre>"));
    }
}
