//! Caller-supplied mail options

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::validation::ValidationError;

/// Keys accepted in an options object, in validation order
pub(crate) const OPTION_FIELDS: [&str; 7] = [
    "fromLabel",
    "recipients",
    "replyTo",
    "sendTime",
    "subject",
    "templateLocals",
    "templateName",
];

/// One address or a list of addresses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Recipients {
    One(String),
    Many(Vec<String>),
}

impl Recipients {
    /// Normalize to a list, preserving order
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Recipients::One(address) => vec![address.clone()],
            Recipients::Many(addresses) => addresses.clone(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        match self {
            Recipients::One(address) => std::slice::from_ref(address).iter(),
            Recipients::Many(addresses) => addresses.iter(),
        }
    }
}

impl From<&str> for Recipients {
    fn from(address: &str) -> Self {
        Recipients::One(address.to_string())
    }
}

impl From<String> for Recipients {
    fn from(address: String) -> Self {
        Recipients::One(address)
    }
}

impl From<Vec<String>> for Recipients {
    fn from(addresses: Vec<String>) -> Self {
        Recipients::Many(addresses)
    }
}

impl From<Vec<&str>> for Recipients {
    fn from(addresses: Vec<&str>) -> Self {
        Recipients::Many(addresses.into_iter().map(String::from).collect())
    }
}

/// Options for one mail.
///
/// `send_time` defaults to now and `template_name` to the renderer's default
/// template. Whether `template_name` was given is preserved: it decides
/// whether the renderer is called with or without a name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MailOptions {
    /// Place of mail origin (e.g. "Participant Portal"), not used in templates
    pub from_label: String,

    pub recipients: Recipients,

    pub reply_to: String,

    pub subject: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>,

    /// Locals handed to the renderer as-is, usually `{html: {...}, text: {...}}`
    #[serde(default)]
    pub template_locals: Option<Value>,
}

impl MailOptions {
    pub fn new(
        from_label: impl Into<String>,
        recipients: impl Into<Recipients>,
        reply_to: impl Into<String>,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            from_label: from_label.into(),
            recipients: recipients.into(),
            reply_to: reply_to.into(),
            subject: subject.into(),
            send_time: None,
            template_name: None,
            template_locals: None,
        }
    }

    pub fn send_time(mut self, send_time: DateTime<Utc>) -> Self {
        self.send_time = Some(send_time);
        self
    }

    pub fn template(mut self, name: impl Into<String>) -> Self {
        self.template_name = Some(name.into());
        self
    }

    pub fn locals(mut self, locals: Value) -> Self {
        self.template_locals = Some(locals);
        self
    }

    /// Read options from untyped JSON, reporting the first offending field.
    ///
    /// Only shape is checked here (presence, types, unknown keys); values are
    /// checked by [`validate`](super::validate). `sendTime` accepts an
    /// RFC 3339 string or epoch milliseconds.
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        let map = match value {
            Value::Object(map) => map,
            _ => return Err(ValidationError::new("value", "must be an object")),
        };

        let from_label = required_string(map, "fromLabel")?;
        let recipients = required_recipients(map)?;
        let reply_to = required_string(map, "replyTo")?;
        let send_time = optional_send_time(map)?;
        let subject = required_string(map, "subject")?;
        let template_locals = match map.get("templateLocals") {
            Some(locals) => Some(locals.clone()),
            None => return Err(ValidationError::new("templateLocals", "is required")),
        };
        let template_name = match map.get("templateName") {
            None => None,
            Some(Value::String(name)) => Some(name.clone()),
            Some(_) => return Err(ValidationError::new("templateName", "must be a string")),
        };

        if let Some(unknown) = map.keys().find(|key| !OPTION_FIELDS.contains(&key.as_str())) {
            return Err(ValidationError::new(unknown, "is not allowed"));
        }

        Ok(Self {
            from_label,
            recipients,
            reply_to,
            subject,
            send_time,
            template_name,
            template_locals,
        })
    }
}

fn required_string(map: &Map<String, Value>, field: &str) -> Result<String, ValidationError> {
    match map.get(field) {
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(ValidationError::new(field, "must be a string")),
        None => Err(ValidationError::new(field, "is required")),
    }
}

fn required_recipients(map: &Map<String, Value>) -> Result<Recipients, ValidationError> {
    match map.get("recipients") {
        Some(Value::String(address)) => Ok(Recipients::One(address.clone())),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::String(address) => Ok(address.clone()),
                _ => Err(ValidationError::new(
                    "recipients",
                    format!("[{}] must be a string", i),
                )),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Recipients::Many),
        Some(_) => Err(ValidationError::new(
            "recipients",
            "must be a string or an array of strings",
        )),
        None => Err(ValidationError::new("recipients", "is required")),
    }
}

fn optional_send_time(map: &Map<String, Value>) -> Result<Option<DateTime<Utc>>, ValidationError> {
    let invalid = || ValidationError::new("sendTime", "must be a valid date");

    match map.get("sendTime") {
        None => Ok(None),
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|_| invalid()),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .map(Some)
            .ok_or_else(invalid),
        Some(_) => Err(invalid()),
    }
}
