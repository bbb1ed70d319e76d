//! Twig-style template engine adapter.
//!
//! Templates are files under the templates root addressed as
//! `<template>/<filename>`. A fresh MiniJinja environment is built per render
//! so edits on disk are picked up immediately by long-running callers.

use std::path::{Path, PathBuf};

use minijinja::{AutoEscape, Environment, Value};
use serde::Serialize;

use super::types::TemplateResult;

/// Renders template files from a root directory.
#[derive(Debug, Clone)]
pub struct TwigEngine {
    root: PathBuf,
}

impl TwigEngine {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Render `name` (a `/`-separated path relative to the root) with `locals`.
    pub fn render<S: Serialize>(&self, name: &str, locals: &S) -> TemplateResult<String> {
        let env = self.environment();
        let template = env.get_template(name)?;
        Ok(template.render(locals)?)
    }

    fn environment(&self) -> Environment<'static> {
        let mut env = Environment::new();
        env.set_loader(minijinja::path_loader(&self.root));
        // Locals carry pre-built HTML fragments
        env.set_auto_escape_callback(|_| AutoEscape::None);
        // Twig spelling of `safe`
        env.add_filter("raw", |value: Value| value);
        env
    }
}
