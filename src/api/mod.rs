//! API layer - HTTP endpoint handlers.

mod health;
mod mails;
mod metrics;
mod preview;
mod routes;

pub use health::health;
pub use mails::create_mails;
pub use metrics::prometheus_metrics;
pub use preview::{preview_default, preview_template, render_template, sample_locals};
pub use routes::api_routes;
