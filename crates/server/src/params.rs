use bson::oid::ObjectId;
use chrono::{DateTime, NaiveDate, TimeZone as _, Utc};

use crate::error::{invalid_input, ApiError};

pub fn parse_oid(raw: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw).map_err(|_| invalid_input(format!("invalid id: {raw}")))
}

fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| invalid_input(format!("invalid date: {raw}, expected YYYY-MM-DD")))
}

/// `[start, end]` where the end is inclusive at 23:59:59.999999.
pub fn date_range(start: &str, end: &str) -> Result<(DateTime<Utc>, DateTime<Utc>), ApiError> {
    let start = parse_date(start)?;
    let end = parse_date(end)?;
    let start = Utc.from_utc_datetime(
        &start
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| invalid_input("invalid date"))?,
    );
    let end = Utc.from_utc_datetime(
        &end.and_hms_micro_opt(23, 59, 59, 999_999)
            .ok_or_else(|| invalid_input("invalid date"))?,
    );
    if start > end {
        return Err(invalid_input("start date cannot be after end date"));
    }
    Ok((start, end))
}

pub fn parse_event_date(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    let date = parse_date(raw)?;
    Ok(Utc.from_utc_datetime(
        &date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| invalid_input("invalid date"))?,
    ))
}
