//! Field validators for mail options.
//!
//! Validators run left to right in a fixed field order and stop at the first
//! failure, so the reported field is deterministic.

use chrono::{DateTime, Duration, Utc};
use lettre::Address;
use serde_json::Value;
use std::fmt;

use super::options::{MailOptions, Recipients};

/// Clock skew allowed between the caller's "now" and ours, in milliseconds
pub const SEND_TIME_TOLERANCE_MS: i64 = 100;

/// A mail option that failed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Offending field, in the caller-facing (camelCase) spelling
    pub field: String,

    /// Human-readable reason
    pub message: String,

    /// Position in a batch, when the options came from one
    pub index: Option<usize>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            index: None,
        }
    }

    /// Attach the batch position of the failing options
    pub fn at(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(i) => write!(f, "\"[{}].{}\" {}", i, self.field, self.message),
            None => write!(f, "\"{}\" {}", self.field, self.message),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Options that passed validation, with defaults applied
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedMail {
    pub from_label: String,
    pub recipients: Vec<String>,
    pub reply_to: String,
    pub subject: String,
    pub send_time: DateTime<Utc>,
    /// Still optional: omission and an explicit name render differently
    pub template_name: Option<String>,
    pub template_locals: Value,
}

type FieldValidator = fn(&MailOptions, DateTime<Utc>) -> Result<(), ValidationError>;

const VALIDATORS: [FieldValidator; 7] = [
    check_from_label,
    check_recipients,
    check_reply_to,
    check_send_time,
    check_subject,
    check_template_locals,
    check_template_name,
];

/// Validate one set of options against `now`.
pub fn validate(options: MailOptions, now: DateTime<Utc>) -> Result<ValidatedMail, ValidationError> {
    VALIDATORS
        .iter()
        .try_for_each(|validator| validator(&options, now))?;

    let recipients = options.recipients.to_vec();
    Ok(ValidatedMail {
        from_label: options.from_label,
        recipients,
        reply_to: options.reply_to,
        subject: options.subject,
        send_time: options.send_time.unwrap_or(now),
        template_name: options.template_name,
        template_locals: options.template_locals.unwrap_or(Value::Null),
    })
}

/// Validate a batch. The first failure rejects the whole batch.
pub fn validate_all(
    options: Vec<MailOptions>,
    now: DateTime<Utc>,
) -> Result<Vec<ValidatedMail>, ValidationError> {
    options
        .into_iter()
        .enumerate()
        .map(|(i, options)| validate(options, now).map_err(|e| e.at(i)))
        .collect()
}

fn non_empty(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        Err(ValidationError::new(field, "is not allowed to be empty"))
    } else {
        Ok(())
    }
}

fn is_email(value: &str) -> bool {
    value.parse::<Address>().is_ok()
}

fn check_from_label(options: &MailOptions, _now: DateTime<Utc>) -> Result<(), ValidationError> {
    non_empty("fromLabel", &options.from_label)
}

fn check_recipients(options: &MailOptions, _now: DateTime<Utc>) -> Result<(), ValidationError> {
    let addresses: Vec<&String> = options.recipients.iter().collect();
    if addresses.is_empty() {
        return Err(ValidationError::new(
            "recipients",
            "must contain at least one address",
        ));
    }

    for (i, address) in addresses.iter().enumerate() {
        if address.is_empty() {
            return Err(ValidationError::new("recipients", "is not allowed to be empty"));
        }
        if !is_email(address) {
            let message = match options.recipients {
                Recipients::One(_) => "must be a valid email".to_string(),
                Recipients::Many(_) => format!("[{}] must be a valid email", i),
            };
            return Err(ValidationError::new("recipients", message));
        }
    }

    Ok(())
}

fn check_reply_to(options: &MailOptions, _now: DateTime<Utc>) -> Result<(), ValidationError> {
    non_empty("replyTo", &options.reply_to)?;
    if !is_email(&options.reply_to) {
        return Err(ValidationError::new("replyTo", "must be a valid email"));
    }
    Ok(())
}

fn check_send_time(options: &MailOptions, now: DateTime<Utc>) -> Result<(), ValidationError> {
    let Some(send_time) = options.send_time else {
        return Ok(());
    };

    let earliest = now - Duration::milliseconds(SEND_TIME_TOLERANCE_MS);
    if send_time < earliest {
        return Err(ValidationError::new(
            "sendTime",
            format!("must be greater than or equal to {}", earliest.to_rfc3339()),
        ));
    }
    Ok(())
}

fn check_subject(options: &MailOptions, _now: DateTime<Utc>) -> Result<(), ValidationError> {
    non_empty("subject", &options.subject)
}

fn check_template_locals(options: &MailOptions, _now: DateTime<Utc>) -> Result<(), ValidationError> {
    match &options.template_locals {
        Some(Value::Object(_)) => Ok(()),
        Some(_) => Err(ValidationError::new("templateLocals", "must be an object")),
        None => Err(ValidationError::new("templateLocals", "is required")),
    }
}

fn check_template_name(options: &MailOptions, _now: DateTime<Utc>) -> Result<(), ValidationError> {
    match &options.template_name {
        Some(name) => non_empty("templateName", name),
        None => Ok(()),
    }
}
