//! Date helper functions

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, TimeZone};

/// Abbreviated month names in Brazilian Portuguese
const PT_BR_MONTHS: [&str; 12] = [
    "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
];

/// Parse a repository timestamp.
///
/// The repository emits `2021-03-25T19:25:28+0000` (no colon in the offset),
/// RFC 3339 and bare dates are accepted as well. Bare dates are UTC midnight.
pub fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();

    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return Some(date);
    }

    for format in ["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%dT%H:%M:%S%.f%z"] {
        if let Ok(date) = DateTime::parse_from_str(value, format) {
            return Some(date);
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
}

/// Format a timestamp as `d MMM yyyy` with pt-BR month names
///
/// # Examples
/// ```ignore
/// format_pt_br_date(Some("2021-03-25T19:25:28+0000"), &Utc) // -> "25 mar 2021"
/// format_pt_br_date(None, &Utc) // -> ""
/// ```
pub fn format_pt_br_date<Tz: TimeZone>(value: Option<&str>, tz: &Tz) -> String {
    let value = match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => return String::new(),
    };

    match parse_timestamp(value) {
        Some(date) => {
            let local = date.with_timezone(tz);
            format!(
                "{} {} {}",
                local.day(),
                PT_BR_MONTHS[local.month0() as usize],
                local.year()
            )
        }
        None => {
            tracing::warn!("Unparseable publication date: {:?}", value);
            String::new()
        }
    }
}
