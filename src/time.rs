use chrono::{DateTime, Local, NaiveDate, Utc};

/// Calendar format used for due dates, deadlines and habit history keys.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Today's date in the local time zone.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date_key(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

/// RFC 3339 timestamp in any offset, or a bare calendar date taken as UTC
/// midnight.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .ok()
        .or_else(|| parse_date_key(raw)?.and_hms_opt(0, 0, 0).map(|at| at.and_utc()))
}
