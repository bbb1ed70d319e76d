//! Mail composition: validate, render, map, persist.

use std::sync::Arc;

use chrono::Utc;
use futures::future::try_join_all;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::metrics::{MAILS_CREATED_TOTAL, VALIDATION_FAILURES_TOTAL};
use crate::template::{ContentRenderer, RenderedContent, TemplateError};

use super::options::MailOptions;
use super::record::{option_to_attributes, MailAttributes, MailRecord};
use super::repository::{MailRepository, RepositoryError};
use super::validation::{validate, validate_all, ValidatedMail, ValidationError};

/// Mail composition errors
#[derive(Debug, Error)]
pub enum MailError {
    /// The repository cannot construct and save records
    #[error("{0}")]
    Collaborator(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Render failed: {0}")]
    Render(#[from] TemplateError),

    #[error("Persistence failed: {0}")]
    Persistence(#[from] RepositoryError),
}

/// One set of options or a batch
#[derive(Debug, Clone, PartialEq)]
pub enum MailInput {
    Single(MailOptions),
    Batch(Vec<MailOptions>),
}

impl From<MailOptions> for MailInput {
    fn from(options: MailOptions) -> Self {
        MailInput::Single(options)
    }
}

impl From<Vec<MailOptions>> for MailInput {
    fn from(options: Vec<MailOptions>) -> Self {
        MailInput::Batch(options)
    }
}

/// Result shape follows the input shape
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CreatedMail {
    One(MailRecord),
    Many(Vec<MailRecord>),
}

impl CreatedMail {
    /// All records, in input order
    pub fn records(&self) -> &[MailRecord] {
        match self {
            CreatedMail::One(record) => std::slice::from_ref(record),
            CreatedMail::Many(records) => records,
        }
    }
}

/// Turns mail options into persisted mail records.
#[derive(Clone)]
pub struct MailComposer {
    renderer: Arc<dyn ContentRenderer>,
    repository: Arc<dyn MailRepository>,
}

impl MailComposer {
    pub fn new(renderer: Arc<dyn ContentRenderer>, repository: Arc<dyn MailRepository>) -> Self {
        Self {
            renderer,
            repository,
        }
    }

    pub fn repository(&self) -> &Arc<dyn MailRepository> {
        &self.repository
    }

    /// Create one mail record.
    pub async fn create_mail(&self, options: MailOptions) -> Result<MailRecord, MailError> {
        self.check_repository()?;
        let mail = validate(options, Utc::now()).inspect_err(record_rejection)?;

        let content = self.render(&mail).await?;
        let pending = self.repository.create(option_to_attributes(&mail, &content));
        let record = self.repository.save(pending).await?;

        MAILS_CREATED_TOTAL.inc();
        tracing::info!(
            mail_id = record.mail_id,
            recipients = record.recipients.email.len(),
            send_time = %record.send_time,
            "Mail created"
        );

        Ok(record)
    }

    /// Create a batch of mail records.
    ///
    /// Every option is validated before anything is rendered. Renders run
    /// concurrently, then saves run concurrently; records come back in input
    /// order. Any failure rejects the whole batch.
    pub async fn create_mails(&self, options: Vec<MailOptions>) -> Result<Vec<MailRecord>, MailError> {
        self.check_repository()?;
        let mails = validate_all(options, Utc::now()).inspect_err(record_rejection)?;

        if mails.is_empty() {
            return Ok(Vec::new());
        }

        let contents = try_join_all(mails.iter().map(|mail| self.render(mail))).await?;
        let attributes: Vec<MailAttributes> = mails
            .iter()
            .zip(contents.iter())
            .map(|(mail, content)| option_to_attributes(mail, content))
            .collect();

        let pending = self.repository.create_all(attributes);
        let records = self.repository.save_all(pending).await?;

        MAILS_CREATED_TOTAL.inc_by(records.len() as u64);
        tracing::info!(count = records.len(), "Mail batch created");

        Ok(records)
    }

    /// Create one record or a batch, matching the input shape.
    pub async fn create(&self, input: impl Into<MailInput>) -> Result<CreatedMail, MailError> {
        match input.into() {
            MailInput::Single(options) => self.create_mail(options).await.map(CreatedMail::One),
            MailInput::Batch(options) => self.create_mails(options).await.map(CreatedMail::Many),
        }
    }

    /// Create from untyped JSON: an options object or an array of them.
    pub async fn create_from_json(&self, value: Value) -> Result<CreatedMail, MailError> {
        self.check_repository()?;

        let input = match &value {
            Value::Array(items) => MailInput::Batch(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| MailOptions::from_value(item).map_err(|e| e.at(i)))
                    .collect::<Result<Vec<_>, _>>()
                    .inspect_err(record_rejection)?,
            ),
            _ => MailInput::Single(MailOptions::from_value(&value).inspect_err(record_rejection)?),
        };

        self.create(input).await
    }

    fn check_repository(&self) -> Result<(), MailError> {
        self.repository.ensure_available().map_err(|e| {
            MailError::Collaborator(format!("expected a mail record factory: {}", e))
        })
    }

    async fn render(&self, mail: &ValidatedMail) -> Result<RenderedContent, TemplateError> {
        self.renderer
            .render_content(mail.template_name.clone(), mail.template_locals.clone())
            .await
    }
}

fn record_rejection(err: &ValidationError) {
    VALIDATION_FAILURES_TOTAL
        .with_label_values(&[err.field.as_str()])
        .inc();
    tracing::debug!(field = %err.field, index = ?err.index, error = %err, "Mail options rejected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    use crate::mail::MemoryMailRepository;
    use crate::template::TemplateResult;

    struct EchoRenderer;

    #[async_trait]
    impl ContentRenderer for EchoRenderer {
        async fn render_content(
            &self,
            template_name: Option<String>,
            _locals: Value,
        ) -> TemplateResult<RenderedContent> {
            let name = template_name.unwrap_or_else(|| "<none>".to_string());
            Ok(RenderedContent {
                html: format!("<p>{}</p>", name),
                text: name,
            })
        }
    }

    fn composer() -> (MailComposer, Arc<MemoryMailRepository>) {
        let repository = Arc::new(MemoryMailRepository::new());
        let composer = MailComposer::new(Arc::new(EchoRenderer), repository.clone());
        (composer, repository)
    }

    fn options() -> MailOptions {
        MailOptions::new("App", "a@example.com", "a@example.com", "Hi").locals(json!({}))
    }

    #[tokio::test]
    async fn test_create_mail_persists_rendered_content() {
        let (composer, repository) = composer();

        let record = composer.create_mail(options().template("welcome")).await.unwrap();

        assert_eq!(record.html_body, "<p>welcome</p>");
        assert_eq!(record.text_body, "welcome");
        assert_eq!(repository.count(), 1);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let (composer, repository) = composer();

        let records = composer.create_mails(vec![]).await.unwrap();
        assert!(records.is_empty());
        assert_eq!(repository.count(), 0);
    }

    #[tokio::test]
    async fn test_validation_failure_saves_nothing() {
        let (composer, repository) = composer();
        let mut bad = options();
        bad.subject = String::new();

        let err = composer.create_mails(vec![options(), bad]).await.unwrap_err();
        assert!(matches!(err, MailError::Validation(ref e) if e.field == "subject"));
        assert_eq!(repository.count(), 0);
    }

    #[tokio::test]
    async fn test_closed_repository_is_collaborator_error() {
        let (composer, repository) = composer();
        repository.close();

        let mut bad = options();
        bad.subject = String::new();
        let err = composer.create_mail(bad).await.unwrap_err();

        assert!(matches!(err, MailError::Collaborator(_)));
        assert!(err.to_string().contains("expected a mail record factory"));
    }

    #[tokio::test]
    async fn test_create_from_json_routes_by_shape() {
        let (composer, _) = composer();
        let one = json!({
            "fromLabel": "App",
            "recipients": "a@example.com",
            "replyTo": "a@example.com",
            "subject": "Hi",
            "templateLocals": {}
        });

        let single = composer.create_from_json(one.clone()).await.unwrap();
        assert!(matches!(single, CreatedMail::One(_)));

        let batch = composer
            .create_from_json(json!([one.clone(), one]))
            .await
            .unwrap();
        assert_eq!(batch.records().len(), 2);
    }

    #[tokio::test]
    async fn test_create_from_json_reports_batch_position() {
        let (composer, _) = composer();
        let err = composer
            .create_from_json(json!([{"fromLabel": "App"}]))
            .await
            .unwrap_err();

        match err {
            MailError::Validation(e) => {
                assert_eq!(e.field, "recipients");
                assert_eq!(e.index, Some(0));
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
