use chrono::{DateTime, Local, TimeZone};

/// `TIME:` stamp used in diagnostic dumps (`19/10/2026 14:05`).
pub fn diagnostic_timestamp<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("%d/%m/%Y %H:%M").to_string()
}

pub fn now_local() -> DateTime<Local> {
    Local::now()
}

/// True for RFC 3339 timestamps with an explicit offset.
pub fn is_rfc3339(input: &str) -> bool {
    DateTime::parse_from_rfc3339(input).is_ok()
}
