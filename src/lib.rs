//! Transactional mail composition.
//!
//! [`template`] renders a template directory (Sass styles plus HTML and text
//! templates) into minified, CSS-inlined HTML and plain text. [`mail`]
//! validates mail options, renders them and persists `mrs_mail` records for
//! the sending daemon.

// Infrastructure (shared components)
pub mod config;
pub mod error;
pub mod metrics;
pub mod postgres;
pub mod telemetry;

// Domain
pub mod mail;
pub mod template;

// Preview server
pub mod api;
pub mod server;
