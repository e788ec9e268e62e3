use chrono::{NaiveDate, Utc};
use thiserror::Error;

use crate::pseudonymize::{pseudonymize, Salt};
use crate::record::{NormalizedRecord, RawRecord};
use crate::version;

/// Enumeration of errors that abort the transformation of a single record.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TransformError {
    #[error("{0:?} is not a dotted numeric version")]
    InvalidVersion(String),
    #[error("{0:?} does not fit in an integer once encoded")]
    VersionOutOfRange(String),
    #[error("record has no {0} field")]
    MissingField(&'static str),
}

pub trait DateSource {
    // Date stamped on records as create_date
    fn current_date(&self) -> NaiveDate;
}

#[derive(Clone)]
pub struct SystemDate {}

impl DateSource for SystemDate {
    fn current_date(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

#[derive(Clone)]
pub struct FixedDate(pub NaiveDate);

impl DateSource for FixedDate {
    fn current_date(&self) -> NaiveDate {
        self.0
    }
}

/// Turns validated `RawRecord`s into `NormalizedRecord`s. Every step runs before the output
/// is assembled, so a failure never leaves a half-normalized record behind.
pub struct RecordTransformer {
    salt_ip: Salt,
    salt_device_id: Salt,
    dates: Box<dyn DateSource + Send + Sync>,
}

impl RecordTransformer {
    pub fn new(salt_ip: Salt, salt_device_id: Salt) -> Self {
        Self::with_date_source(salt_ip, salt_device_id, SystemDate {})
    }

    pub fn with_date_source<D>(salt_ip: Salt, salt_device_id: Salt, dates: D) -> Self
    where
        D: DateSource + Send + Sync + 'static,
    {
        Self {
            salt_ip,
            salt_device_id,
            dates: Box::new(dates),
        }
    }

    pub fn transform(&self, record: &RawRecord) -> Result<NormalizedRecord, TransformError> {
        let app_version = version::encode(field(record, "app_version")?)?;
        let masked_ip = pseudonymize(field(record, "ip")?, &self.salt_ip);
        let masked_device_id = pseudonymize(field(record, "device_id")?, &self.salt_device_id);

        Ok(NormalizedRecord {
            user_id: field(record, "user_id")?.to_owned(),
            device_type: field(record, "device_type")?.to_owned(),
            masked_ip,
            masked_device_id,
            locale: field(record, "locale")?.to_owned(),
            app_version,
            create_date: self.dates.current_date(),
        })
    }
}

fn field<'r>(record: &'r RawRecord, name: &'static str) -> Result<&'r str, TransformError> {
    record
        .get(name)
        .map(String::as_str)
        .ok_or(TransformError::MissingField(name))
}
