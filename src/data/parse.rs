//! Lenient cell parsers. None of these fail: unparseable input yields
//! `None` (or the documented default) and is imputed downstream.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use super::model::Value;

static FIRST_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(\.\d+)?)").expect("valid number regex"));

static DAYS_PHRASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+) days?").expect("valid days regex"));

static NEW_LOW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)new historical low|all-time low").expect("valid note regex")
});

const DATE_FORMATS: [&str; 10] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b, %Y",
    "%d %B, %Y",
    "%b %d %Y",
    "%d %b %Y",
    "%d %B %Y",
];

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// First number in the text form of a price after removing `$` and `,`.
/// Missing or number-free cells (`"Free"`) are `0.0`.
pub fn extract_price(value: &Value) -> f64 {
    let Some(text) = value.text() else {
        return 0.0;
    };
    let cleaned: String = text.chars().filter(|c| !matches!(c, '$' | ',')).collect();
    FIRST_NUMBER
        .captures(&cleaned)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Remove every character in `strip` and parse what is left as a float.
pub fn parse_stripped(value: &Value, strip: &[char]) -> Option<f64> {
    let text = value.text()?;
    let cleaned: String = text.chars().filter(|c| !strip.contains(c)).collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// The `N` of the first "N day(s)" phrase.
pub fn extract_days(value: &Value) -> Option<f64> {
    let text = value.text()?;
    DAYS_PHRASE
        .captures(&text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

pub fn mentions_new_low(value: &Value) -> bool {
    value.text().is_some_and(|text| NEW_LOW.is_match(&text))
}

/// Parse a release date in any of the layouts the catalogs use.
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Date(d) => Some(*d),
        Value::Integer(year) => year_start(*year),
        Value::Null | Value::Bool(_) | Value::Float(_) => None,
        Value::String(s) => parse_date_str(s.trim()),
    }
}

fn parse_date_str(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }
    // "%b %d %Y" happily reads "Oct 2008" as day 20 of year 8.
    let parsed = DATE_FORMATS
        .iter()
        .filter_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .chain(
            DATETIME_FORMATS
                .iter()
                .filter_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date()),
        )
        .chain(DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
        .find(|d| plausible_year(d.year()));
    if parsed.is_some() {
        return parsed;
    }
    // Month and year only, e.g. "Oct 2008".
    let with_day = format!("1 {s}");
    for fmt in ["%d %b %Y", "%d %B %Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(&with_day, fmt) {
            if plausible_year(d.year()) {
                return Some(d);
            }
        }
    }
    if s.len() == 4 && s.chars().all(|c| c.is_ascii_digit()) {
        return s.parse::<i64>().ok().and_then(year_start);
    }
    None
}

fn plausible_year(year: i32) -> bool {
    (1000..=9999).contains(&year)
}

fn year_start(year: i64) -> Option<NaiveDate> {
    let year = i32::try_from(year).ok().filter(|y| plausible_year(*y))?;
    NaiveDate::from_ymd_opt(year, 1, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &str) -> Value {
        Value::String(text.to_string())
    }

    #[test]
    fn price_takes_first_number_and_defaults_to_zero() {
        assert_eq!(extract_price(&s("$19.99")), 19.99);
        assert_eq!(extract_price(&s("$1,299.00")), 1299.0);
        assert_eq!(extract_price(&Value::Float(4.99)), 4.99);
        assert_eq!(extract_price(&s("Free")), 0.0);
        assert_eq!(extract_price(&s("")), 0.0);
        assert_eq!(extract_price(&Value::Null), 0.0);
    }

    #[test]
    fn discount_strips_sign_and_percent() {
        assert_eq!(parse_stripped(&s("-25%"), &['%', '-']), Some(25.0));
        assert_eq!(parse_stripped(&s(""), &['%', '-']), None);
        assert_eq!(parse_stripped(&s("92%"), &['%']), Some(92.0));
        assert_eq!(parse_stripped(&s("$1,059.50"), &['$', ',']), Some(1059.5));
        assert_eq!(parse_stripped(&s("Free"), &['$', ',']), None);
    }

    #[test]
    fn days_phrases() {
        assert_eq!(extract_days(&s("Ends in 3 days")), Some(3.0));
        assert_eq!(extract_days(&s("started 1 day ago")), Some(1.0));
        assert_eq!(extract_days(&s("in 5 hours")), None);
        assert_eq!(extract_days(&Value::Null), None);
    }

    #[test]
    fn new_low_is_case_insensitive() {
        assert!(mentions_new_low(&s("New historical low!")));
        assert!(mentions_new_low(&s("matches ALL-TIME LOW")));
        assert!(!mentions_new_low(&s("Regular price")));
        assert!(!mentions_new_low(&Value::Null));
    }

    #[test]
    fn release_dates_in_catalog_layouts() {
        let expected = NaiveDate::from_ymd_opt(2008, 10, 21);
        assert_eq!(parse_date(&s("2008-10-21")), expected);
        assert_eq!(parse_date(&s("Oct 21, 2008")), expected);
        assert_eq!(parse_date(&s("21 Oct, 2008")), expected);
        assert_eq!(parse_date(&s("2008-10-21T10:00:00")), expected);
        assert_eq!(parse_date(&s("Oct 2008")), NaiveDate::from_ymd_opt(2008, 10, 1));
        assert_eq!(parse_date(&s("October 2008")), NaiveDate::from_ymd_opt(2008, 10, 1));
        assert_eq!(parse_date(&s("Nov 2019")), NaiveDate::from_ymd_opt(2019, 11, 1));
        assert_eq!(parse_date(&s("Oct 21 2008")), expected);
        assert_eq!(parse_date(&s("21 Oct 2008")), expected);
        assert_eq!(parse_date(&Value::Integer(2015)), NaiveDate::from_ymd_opt(2015, 1, 1));
        assert_eq!(parse_date(&s("coming soon")), None);
        assert_eq!(parse_date(&Value::Null), None);
    }
}
