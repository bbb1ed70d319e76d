//! Template renderer: drives the style pipeline and the template engine

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::config::TemplateConfig;
use crate::metrics::{RENDERS_TOTAL, RENDER_DURATION_SECONDS};

use super::engine::TwigEngine;
use super::styles::{autoprefix_css, inline_css, minify_html, sass_to_css};
use super::types::{
    validate_template_name, RenderRequest, RenderedContent, TemplateError, TemplateResult,
};

/// Anything that turns a template name and a locals bag into mail content.
///
/// `template_name` is `None` when the caller did not name a template; the
/// implementation decides what that means. Mail composition depends on this
/// trait rather than on [`TemplateRenderer`] directly.
#[async_trait]
pub trait ContentRenderer: Send + Sync {
    async fn render_content(
        &self,
        template_name: Option<String>,
        locals: Value,
    ) -> TemplateResult<RenderedContent>;
}

/// Renders a template directory into minified, CSS-inlined HTML and text.
///
/// Cloning is cheap; clones share configuration.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    config: Arc<TemplateConfig>,
    engine: TwigEngine,
}

impl TemplateRenderer {
    pub fn new(config: TemplateConfig) -> Self {
        let engine = TwigEngine::new(config.dir.clone());
        Self {
            config: Arc::new(config),
            engine,
        }
    }

    pub fn config(&self) -> &TemplateConfig {
        &self.config
    }

    /// Directory holding the files of the requested template.
    pub fn resolve_template_dir(&self, request: &RenderRequest) -> TemplateResult<PathBuf> {
        let name = self.resolve_template_name(request)?;
        Ok(self.config.dir.join(name))
    }

    fn resolve_template_name<'a>(&'a self, request: &'a RenderRequest) -> TemplateResult<&'a str> {
        let name = request
            .template_name
            .as_deref()
            .unwrap_or(&self.config.default_template);
        validate_template_name(name)?;
        Ok(name)
    }

    /// Render a template.
    ///
    /// The HTML track (styles and HTML template concurrently, then inline and
    /// minify) and the text track run concurrently. The first failure in any
    /// stage aborts the render.
    #[tracing::instrument(name = "template.render", skip_all, fields(template = ?request.template_name))]
    pub async fn render(&self, request: RenderRequest) -> TemplateResult<RenderedContent> {
        let started = Instant::now();
        let result = self.run_pipeline(request).await;
        RENDER_DURATION_SECONDS.observe(started.elapsed().as_secs_f64());

        match &result {
            Ok(_) => {
                RENDERS_TOTAL.with_label_values(&["success"]).inc();
                tracing::debug!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Template rendered"
                );
            }
            Err(e) => {
                RENDERS_TOTAL.with_label_values(&[e.stage()]).inc();
                tracing::warn!(stage = e.stage(), error = %e, "Template render failed");
            }
        }

        result
    }

    /// Callback form of [`render`](Self::render).
    ///
    /// Spawns the render on the current runtime and hands the result to
    /// `callback` once it completes.
    pub fn render_with_callback<F>(&self, request: RenderRequest, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(TemplateResult<RenderedContent>) + Send + 'static,
    {
        let renderer = self.clone();
        tokio::spawn(async move {
            callback(renderer.render(request).await);
        })
    }

    async fn run_pipeline(&self, request: RenderRequest) -> TemplateResult<RenderedContent> {
        let name = self.resolve_template_name(&request)?.to_string();
        let template_dir = self.config.dir.join(&name);
        let RenderRequest {
            html_locals,
            text_locals,
            ..
        } = request;

        let (html, text) = tokio::try_join!(
            self.render_html(&name, &template_dir, html_locals),
            self.render_file(&name, &self.config.text_filename, text_locals),
        )?;

        Ok(RenderedContent { html, text })
    }

    async fn render_html(
        &self,
        name: &str,
        template_dir: &Path,
        locals: Value,
    ) -> TemplateResult<String> {
        let (css, html) = tokio::try_join!(
            self.compile_styles(template_dir),
            self.render_file(name, &self.config.html_filename, locals),
        )?;

        let template_dir = template_dir.to_path_buf();
        run_blocking(move || {
            let html = match css {
                Some(css) => inline_css(&html, &css, &template_dir)?,
                None => html,
            };
            minify_html(&html)
        })
        .await
    }

    /// Read → compile → prefix. `None` when the template has no styles.
    async fn compile_styles(&self, template_dir: &Path) -> TemplateResult<Option<String>> {
        let path = template_dir.join(&self.config.sass_filename);
        let source = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| TemplateError::Io {
                path: path.clone(),
                source,
            })?;

        if source.is_empty() {
            tracing::debug!(path = %path.display(), "Empty stylesheet, skipping CSS");
            return Ok(None);
        }

        let load_path = template_dir.to_path_buf();
        let browsers = self.config.browsers.clone();
        run_blocking(move || match sass_to_css(&source, &load_path)? {
            Some(css) => autoprefix_css(&css, &browsers).map(Some),
            None => Ok(None),
        })
        .await
    }

    async fn render_file(&self, name: &str, filename: &str, locals: Value) -> TemplateResult<String> {
        let engine = self.engine.clone();
        let path = format!("{}/{}", name, filename);
        run_blocking(move || engine.render(&path, &locals)).await
    }
}

#[async_trait]
impl ContentRenderer for TemplateRenderer {
    async fn render_content(
        &self,
        template_name: Option<String>,
        locals: Value,
    ) -> TemplateResult<RenderedContent> {
        let request = RenderRequest::new(template_name, locals)?;
        self.render(request).await
    }
}

async fn run_blocking<T, F>(f: F) -> TemplateResult<T>
where
    F: FnOnce() -> TemplateResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| TemplateError::Task(e.to_string()))?
}
