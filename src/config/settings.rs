use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub templates: TemplateConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Where templates live and how a template directory is laid out.
///
/// Each template is a directory under `dir` holding a Sass stylesheet, an
/// HTML template and a text template. A renderer owns its own copy, so tests
/// can point one renderer at a fixture directory without touching others.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateConfig {
    /// Templates root directory
    #[serde(default = "default_templates_dir")]
    pub dir: PathBuf,
    /// Template used when a request names none
    #[serde(default = "default_template_name")]
    pub default_template: String,
    #[serde(default = "default_sass_filename")]
    pub sass_filename: String,
    #[serde(default = "default_html_filename")]
    pub html_filename: String,
    #[serde(default = "default_text_filename")]
    pub text_filename: String,
    /// Browserslist query used for vendor prefixing
    #[serde(default = "default_browsers")]
    pub browsers: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Mail record backend: "memory" or "postgres"
    #[serde(default = "default_database_backend")]
    pub backend: String,
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u32,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u32,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_templates_dir() -> PathBuf {
    PathBuf::from("templates")
}

fn default_template_name() -> String {
    "default".to_string()
}

fn default_sass_filename() -> String {
    "styles.scss".to_string()
}

fn default_html_filename() -> String {
    "html.twig".to_string()
}

fn default_text_filename() -> String {
    "text.twig".to_string()
}

fn default_browsers() -> String {
    "last 2 versions".to_string()
}

fn default_database_backend() -> String {
    "memory".to_string()
}

fn default_database_url() -> String {
    "postgres://localhost:5432/coins".to_string()
}

fn default_pool_size() -> u32 {
    5
}

fn default_connect_timeout() -> u32 {
    10
}

fn default_idle_timeout() -> u32 {
    300 // 5 minutes
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("templates.dir", "templates")?
            .set_default("templates.default_template", "default")?
            .set_default("database.backend", "memory")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // SERVER_PORT, TEMPLATES_DIR, DATABASE_URL, DATABASE_BACKEND, etc.
            .add_source(
                Environment::default()
                    .separator("_")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            dir: default_templates_dir(),
            default_template: default_template_name(),
            sass_filename: default_sass_filename(),
            html_filename: default_html_filename(),
            text_filename: default_text_filename(),
            browsers: default_browsers(),
        }
    }
}

impl TemplateConfig {
    /// Config rooted at `dir` with the stock filenames.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Default::default()
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: default_database_backend(),
            url: default_database_url(),
            pool_size: default_pool_size(),
            connect_timeout_seconds: default_connect_timeout(),
            idle_timeout_seconds: default_idle_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let server = ServerConfig::default();
        assert_eq!(server.host, "0.0.0.0");
        assert_eq!(server.port, 3000);
    }

    #[test]
    fn test_template_defaults() {
        let templates = TemplateConfig::default();
        assert_eq!(templates.dir, PathBuf::from("templates"));
        assert_eq!(templates.default_template, "default");
        assert_eq!(templates.sass_filename, "styles.scss");
        assert_eq!(templates.html_filename, "html.twig");
        assert_eq!(templates.text_filename, "text.twig");
        assert_eq!(templates.browsers, "last 2 versions");
    }

    #[test]
    fn test_with_dir_keeps_filenames() {
        let templates = TemplateConfig::with_dir("fixtures");
        assert_eq!(templates.dir, PathBuf::from("fixtures"));
        assert_eq!(templates.html_filename, "html.twig");
    }

    #[test]
    fn test_database_defaults_to_memory() {
        assert_eq!(DatabaseConfig::default().backend, "memory");
    }
}
