//! Mail composition.
//!
//! Validates caller-supplied mail options, renders their content through a
//! [`ContentRenderer`](crate::template::ContentRenderer), maps the result onto
//! the `mrs_mail` columns and persists it through a [`MailRepository`].
//!
//! # Example
//!
//! ```ignore
//! let composer = MailComposer::new(renderer, repository);
//! let record = composer
//!     .create_mail(
//!         MailOptions::new("App", "a@example.com", "a@example.com", "Hi")
//!             .locals(json!({"html": {}, "text": {}})),
//!     )
//!     .await?;
//! ```

mod composer;
mod factory;
mod memory_repository;
mod options;
mod postgres_repository;
mod record;
mod repository;
mod validation;

pub use composer::{CreatedMail, MailComposer, MailError, MailInput};
pub use factory::create_mail_repository;
pub use memory_repository::MemoryMailRepository;
pub use options::{MailOptions, Recipients};
pub use postgres_repository::PostgresMailRepository;
pub use record::{option_to_attributes, MailAttributes, MailRecord, RecipientList};
pub use repository::{MailRepository, PendingMail, RepositoryError};
pub use validation::{validate, validate_all, ValidatedMail, ValidationError, SEND_TIME_TOLERANCE_MS};
