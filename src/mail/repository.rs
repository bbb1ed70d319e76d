//! Repository trait for mail record storage.
//!
//! Mirrors the construct-then-save lifecycle of an ORM model: `create` builds
//! an unsaved record from column values, `save` persists it and returns the
//! stored row. Batch saves run concurrently and keep input order.

use async_trait::async_trait;
use futures::future::try_join_all;
use thiserror::Error;

use super::record::{MailAttributes, MailRecord};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// PostgreSQL operation failed
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Repository cannot accept records (e.g., pool closed)
    #[error("Repository unavailable: {0}")]
    Unavailable(String),
}

/// A constructed, not yet persisted mail record
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMail {
    attributes: MailAttributes,
}

impl PendingMail {
    pub fn new(attributes: MailAttributes) -> Self {
        Self { attributes }
    }

    pub fn attributes(&self) -> &MailAttributes {
        &self.attributes
    }

    pub fn into_attributes(self) -> MailAttributes {
        self.attributes
    }
}

/// Storage for mail records.
///
/// Implementations must be `Send + Sync`; one repository is shared by every
/// concurrent save of a batch.
#[async_trait]
pub trait MailRepository: Send + Sync {
    /// Backend type identifier
    fn backend_name(&self) -> &'static str;

    /// Check that the repository can construct and save records.
    fn ensure_available(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    /// Construct an unsaved record
    fn create(&self, attributes: MailAttributes) -> PendingMail {
        PendingMail::new(attributes)
    }

    /// Construct a collection of unsaved records
    fn create_all(&self, attributes: Vec<MailAttributes>) -> Vec<PendingMail> {
        attributes
            .into_iter()
            .map(|attributes| self.create(attributes))
            .collect()
    }

    /// Persist one record
    async fn save(&self, mail: PendingMail) -> Result<MailRecord, RepositoryError>;

    /// Persist all records concurrently.
    ///
    /// Results are in input order. The first failure is returned; saves
    /// already issued are not rolled back.
    async fn save_all(&self, mails: Vec<PendingMail>) -> Result<Vec<MailRecord>, RepositoryError> {
        try_join_all(mails.into_iter().map(|mail| self.save(mail))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::mail::RecipientList;

    fn attributes() -> MailAttributes {
        MailAttributes {
            mail_id: None,
            study_id: None,
            use_coins_template: true,
            from_label: "App".to_string(),
            recipients: RecipientList {
                email: vec!["a@example.com".to_string()],
            },
            reply_to_address: "a@example.com".to_string(),
            subject: "Hi".to_string(),
            text_body: String::new(),
            html_body: String::new(),
            disclaimer_text: None,
            menu_link_key: None,
            send_time: Utc::now(),
            sent: None,
        }
    }

    #[test]
    fn test_pending_mail_keeps_attributes() {
        let pending = PendingMail::new(attributes());
        assert_eq!(pending.attributes().from_label, "App");
        assert_eq!(pending.into_attributes().subject, "Hi");
    }

    #[test]
    fn test_error_display() {
        let err = RepositoryError::Unavailable("pool closed".to_string());
        assert!(err.to_string().contains("pool closed"));
    }
}
