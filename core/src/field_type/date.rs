//! `date` fields: `YYYY-MM-DD`, or a timestamp whose date part is used.

use chrono::{DateTime, NaiveDate};

use crate::error::ClientError;

/// Parse an optional date value. Missing values stay missing.
pub fn parse(value: Option<&str>) -> Result<Option<NaiveDate>, ClientError> {
    let Some(raw) = value else {
        return Ok(None);
    };
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(Some(date));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| Some(ts.date_naive()))
        .map_err(|e| ClientError::Deserialization(format!("invalid date `{raw}`: {e}")))
}
