use std::collections::HashMap;

use chrono::NaiveDate;
use serde_json::{Map, Value};
use thiserror::Error;

/// A login event as read from the queue: string keys to string values, no schema enforced.
pub type RawRecord = HashMap<String, String>;

/// Every key a `RawRecord` must carry before it is transformed.
pub const REQUIRED_FIELDS: [&str; 6] = [
    "user_id",
    "device_type",
    "ip",
    "device_id",
    "locale",
    "app_version",
];

/// Build a `RawRecord` from a message body. The body must be a JSON object; entries whose value
/// is not a string are left out, so a required field holding a number is later reported missing.
pub fn raw_record_from_json(body: Value) -> Result<RawRecord, serde_json::Error> {
    let object: Map<String, Value> = serde_json::from_value(body)?;

    Ok(object
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::String(value) => Some((key, value)),
            _ => None,
        })
        .collect())
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("record is missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
}

/// Check that every required field is present. Values are not inspected, an empty string counts
/// as present.
pub fn validate(record: &RawRecord) -> Result<(), ValidationError> {
    let missing: Vec<&'static str> = REQUIRED_FIELDS
        .iter()
        .filter(|field| !record.contains_key(**field))
        .copied()
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingFields(missing))
    }
}

/// A fully transformed login, one-to-one with a row of `user_logins`.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct NormalizedRecord {
    pub user_id: String,
    pub device_type: String,
    pub masked_ip: String,
    pub masked_device_id: String,
    pub locale: String,
    pub app_version: i32,
    pub create_date: NaiveDate,
}
