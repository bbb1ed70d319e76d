//! Mail record shape and the option → column mapping.
//!
//! Columns of `mrs_mail`:
//!
//! | column | notes |
//! |---|---|
//! | `mail_id` | serial, assigned by storage |
//! | `study_id` | unused, always null |
//! | `use_coins_template` | always `true` |
//! | `from_label` | origin label, not used in templates |
//! | `recipients` | JSON `{"email": [...]}` |
//! | `reply_to_address` | single address |
//! | `subject`, `text_body`, `html_body` | content |
//! | `disclaimer_text`, `menu_link_key` | no longer used, always null |
//! | `send_time` | when the daemon should send |
//! | `sent` | set only by the sending daemon |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::template::RenderedContent;

use super::validation::ValidatedMail;

/// JSON body of the `recipients` column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientList {
    pub email: Vec<String>,
}

/// Column values for a mail record that has not been saved yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MailAttributes {
    pub mail_id: Option<i32>,
    pub study_id: Option<i32>,
    pub use_coins_template: bool,
    pub from_label: String,
    pub recipients: RecipientList,
    pub reply_to_address: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
    pub disclaimer_text: Option<String>,
    pub menu_link_key: Option<String>,
    pub send_time: DateTime<Utc>,
    pub sent: Option<DateTime<Utc>>,
}

/// A persisted mail record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MailRecord {
    pub mail_id: i32,
    pub study_id: Option<i32>,
    pub use_coins_template: bool,
    pub from_label: String,
    #[sqlx(json)]
    pub recipients: RecipientList,
    pub reply_to_address: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
    pub disclaimer_text: Option<String>,
    pub menu_link_key: Option<String>,
    pub send_time: DateTime<Utc>,
    pub sent: Option<DateTime<Utc>>,
}

impl MailRecord {
    /// Record for `attributes` stored under `mail_id`
    pub fn from_attributes(mail_id: i32, attributes: MailAttributes) -> Self {
        Self {
            mail_id,
            study_id: attributes.study_id,
            use_coins_template: attributes.use_coins_template,
            from_label: attributes.from_label,
            recipients: attributes.recipients,
            reply_to_address: attributes.reply_to_address,
            subject: attributes.subject,
            text_body: attributes.text_body,
            html_body: attributes.html_body,
            disclaimer_text: attributes.disclaimer_text,
            menu_link_key: attributes.menu_link_key,
            send_time: attributes.send_time,
            sent: attributes.sent,
        }
    }
}

/// Map validated options and their rendered content to column values.
pub fn option_to_attributes(mail: &ValidatedMail, content: &RenderedContent) -> MailAttributes {
    MailAttributes {
        mail_id: None,
        study_id: None,
        use_coins_template: true,
        from_label: mail.from_label.clone(),
        recipients: RecipientList {
            email: mail.recipients.clone(),
        },
        reply_to_address: mail.reply_to.clone(),
        subject: mail.subject.clone(),
        text_body: content.text.clone(),
        html_body: content.html.clone(),
        disclaimer_text: None,
        menu_link_key: None,
        send_time: mail.send_time,
        sent: None,
    }
}
