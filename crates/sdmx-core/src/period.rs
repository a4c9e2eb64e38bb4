//! Parsing of SDMX reporting periods.
//!
//! SDMX periods come in several shapes depending on the frequency of the
//! series: `2020`, `2020-S2`, `2020-Q3`, `2020-05`, `2020-W07`, `2020-05-17`
//! or a full date-time. Every shape is mapped to the start of the period.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

/// Parses a reporting period into the instant the period starts.
///
/// Returns `None` for text that is not a recognized period; decoders keep
/// such observations with a missing period rather than failing.
#[must_use]
pub fn parse_period(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M") {
        return Some(dt);
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(start_of(date));
    }

    let (year, rest) = match text.split_once('-') {
        Some((year, rest)) => (parse_year(year)?, rest),
        None => return NaiveDate::from_ymd_opt(parse_year(text)?, 1, 1).map(start_of),
    };

    let date = match rest.as_bytes().first()? {
        b'A' => NaiveDate::from_ymd_opt(year, 1, 1),
        b'S' => sub_period(year, &rest[1..], 2, 6),
        b'Q' => sub_period(year, &rest[1..], 4, 3),
        b'T' => sub_period(year, &rest[1..], 3, 4),
        b'M' => sub_period(year, &rest[1..], 12, 1),
        b'W' => {
            let week: u32 = rest[1..].parse().ok()?;
            NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)
        }
        _ => {
            let month: u32 = rest.parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, 1)
        }
    }?;
    Some(start_of(date))
}

fn parse_year(text: &str) -> Option<i32> {
    if text.len() != 4 {
        return None;
    }
    text.parse().ok()
}

fn sub_period(year: i32, index: &str, count: u32, months: u32) -> Option<NaiveDate> {
    let index: u32 = index.parse().ok()?;
    if index == 0 || index > count {
        return None;
    }
    NaiveDate::from_ymd_opt(year, 1 + (index - 1) * months, 1)
}

fn start_of(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Formats a period start back to an ISO-8601 date or date-time.
#[must_use]
pub fn format_period(period: &NaiveDateTime) -> String {
    if period.time() == NaiveTime::MIN {
        format!(
            "{:04}-{:02}-{:02}",
            period.year(),
            period.month(),
            period.day()
        )
    } else {
        period.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_time(NaiveTime::MIN)
    }

    #[test]
    fn test_parse_period_shapes() {
        assert_eq!(parse_period("2020"), Some(ymd(2020, 1, 1)));
        assert_eq!(parse_period("2020-A1"), Some(ymd(2020, 1, 1)));
        assert_eq!(parse_period("2020-S2"), Some(ymd(2020, 7, 1)));
        assert_eq!(parse_period("2020-Q3"), Some(ymd(2020, 7, 1)));
        assert_eq!(parse_period("2020-M11"), Some(ymd(2020, 11, 1)));
        assert_eq!(parse_period("2020-05"), Some(ymd(2020, 5, 1)));
        assert_eq!(parse_period("2020-05-17"), Some(ymd(2020, 5, 17)));
        assert_eq!(parse_period("2020-W01"), Some(ymd(2019, 12, 30)));
        assert_eq!(
            parse_period("2020-05-17T10:30:00"),
            NaiveDate::from_ymd_opt(2020, 5, 17)
                .unwrap()
                .and_hms_opt(10, 30, 0)
        );
    }

    #[test]
    fn test_parse_period_rejects_garbage() {
        assert_eq!(parse_period(""), None);
        assert_eq!(parse_period("20"), None);
        assert_eq!(parse_period("2020-Q5"), None);
        assert_eq!(parse_period("2020-13"), None);
        assert_eq!(parse_period("hello"), None);
    }

    #[test]
    fn test_format_period() {
        assert_eq!(format_period(&ymd(2020, 7, 1)), "2020-07-01");
        let dt = NaiveDate::from_ymd_opt(2020, 5, 17)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        assert_eq!(format_period(&dt), "2020-05-17T10:30:00");
    }
}
