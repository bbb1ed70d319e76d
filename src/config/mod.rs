mod settings;

pub use settings::{DatabaseConfig, ServerConfig, Settings, TemplateConfig};
