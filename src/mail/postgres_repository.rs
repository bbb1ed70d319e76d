//! PostgreSQL-based mail repository.
//!
//! Inserts into the `mrs_mail` table (see `migrations/`). `mail_id` is a
//! serial column; the stored row is read back with `RETURNING`.

use async_trait::async_trait;
use sqlx::PgPool;

use super::record::MailRecord;
use super::repository::{MailRepository, PendingMail, RepositoryError};

const INSERT_MAIL: &str = r#"
    INSERT INTO mrs_mail (
        study_id, use_coins_template, from_label, recipients, reply_to_address,
        subject, text_body, html_body, disclaimer_text, menu_link_key, send_time, sent
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
    RETURNING
        mail_id, study_id, use_coins_template, from_label, recipients, reply_to_address,
        subject, text_body, html_body, disclaimer_text, menu_link_key, send_time, sent
"#;

/// PostgreSQL-backed mail repository
pub struct PostgresMailRepository {
    pool: PgPool,
}

impl PostgresMailRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MailRepository for PostgresMailRepository {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    fn ensure_available(&self) -> Result<(), RepositoryError> {
        if self.pool.is_closed() {
            return Err(RepositoryError::Unavailable(
                "PostgreSQL pool is closed".to_string(),
            ));
        }
        Ok(())
    }

    async fn save(&self, mail: PendingMail) -> Result<MailRecord, RepositoryError> {
        let attributes = mail.into_attributes();
        let recipients = serde_json::to_value(&attributes.recipients)?;

        let record: MailRecord = sqlx::query_as(INSERT_MAIL)
            .bind(attributes.study_id)
            .bind(attributes.use_coins_template)
            .bind(&attributes.from_label)
            .bind(recipients)
            .bind(&attributes.reply_to_address)
            .bind(&attributes.subject)
            .bind(&attributes.text_body)
            .bind(&attributes.html_body)
            .bind(&attributes.disclaimer_text)
            .bind(&attributes.menu_link_key)
            .bind(attributes.send_time)
            .bind(attributes.sent)
            .fetch_one(&self.pool)
            .await?;

        tracing::trace!(
            mail_id = record.mail_id,
            send_time = %record.send_time,
            "Mail record inserted into PostgreSQL"
        );

        Ok(record)
    }
}
