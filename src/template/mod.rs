//! Mail template rendering.
//!
//! This module provides:
//! - Request types naming a template directory and per-channel locals
//! - The style pipeline (Sass → CSS → vendor prefixes → inlined into HTML → minified)
//! - A Twig-style template engine adapter over MiniJinja
//! - `TemplateRenderer`, which runs the HTML and text tracks concurrently
//!
//! # Example
//!
//! ```ignore
//! let renderer = TemplateRenderer::new(TemplateConfig::default());
//!
//! let request = RenderRequest::with_locals(
//!     json!({ "messageBody": "<p>Insert this html</p>" }),
//!     json!({ "messageBody": "Alternative text version" }),
//! );
//!
//! let content = renderer.render(request).await?;
//! println!("HTML: {}", content.html);
//! println!("Text: {}", content.text);
//! ```

mod engine;
mod renderer;
mod styles;
mod types;

pub use engine::TwigEngine;
pub use renderer::{ContentRenderer, TemplateRenderer};
pub use styles::{autoprefix_css, inline_css, minify_html, sass_to_css};
pub use types::{RenderRequest, RenderedContent, TemplateError, TemplateResult};
