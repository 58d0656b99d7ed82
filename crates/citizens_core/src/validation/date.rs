//! Calendar validation for `DD.MM.YYYY` dates.

use super::ValidationError;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]{2})\.([0-9]{2})\.([0-9]{4})$").expect("valid date regex"));

/// Parses `text` as `DD.MM.YYYY` and checks that it is a real Gregorian date.
///
/// # Errors
/// - `ValidationError::InvalidDate` when the shape is wrong, the month is
///   outside 1..=12, the day overflows its month (including Feb 29 on
///   non-leap years), or the year is 0.
pub fn validate_date(text: &str) -> Result<NaiveDate, ValidationError> {
    let captures = DATE_RE
        .captures(text)
        .ok_or_else(|| invalid(text, "expected DD.MM.YYYY"))?;

    // Regex admits ASCII digits only, so parsing cannot overflow.
    let day: u32 = captures[1].parse().map_err(|_| invalid(text, "bad day"))?;
    let month: u32 = captures[2].parse().map_err(|_| invalid(text, "bad month"))?;
    let year: i32 = captures[3].parse().map_err(|_| invalid(text, "bad year"))?;

    if year < 1 {
        return Err(invalid(text, "year is out of range"));
    }
    if !(1..=12).contains(&month) {
        return Err(invalid(text, "month must be in 1..12"));
    }

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| invalid(text, "day is out of range for month"))
}

fn invalid(text: &str, reason: &str) -> ValidationError {
    ValidationError::InvalidDate {
        value: text.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::validate_date;
    use crate::validation::ValidationError;
    use chrono::NaiveDate;

    #[test]
    fn accepts_leap_day_on_leap_year() {
        assert_eq!(
            validate_date("29.02.2020").unwrap(),
            NaiveDate::from_ymd_opt(2020, 2, 29).unwrap()
        );
        assert!(validate_date("29.02.2000").is_ok());
    }

    #[test]
    fn rejects_leap_day_on_common_year() {
        assert!(validate_date("29.02.2021").is_err());
        assert!(validate_date("29.02.1900").is_err());
    }

    #[test]
    fn rejects_day_overflow_for_month() {
        assert!(validate_date("31.04.2021").is_err());
        assert!(validate_date("32.01.2021").is_err());
        assert!(validate_date("00.01.2021").is_err());
        assert!(validate_date("30.04.2021").is_ok());
    }

    #[test]
    fn rejects_month_outside_range() {
        let err = validate_date("15.13.2021").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidDate { ref reason, .. } if reason.contains("month")));
        assert!(validate_date("15.00.2021").is_err());
    }

    #[test]
    fn rejects_malformed_text() {
        for value in ["", "1.1.2000", "01-01-2000", "01.01.20", "aa.bb.cccc", "01.01.2000 "] {
            assert!(validate_date(value).is_err(), "`{value}` should be rejected");
        }
    }

    #[test]
    fn rejects_year_zero() {
        assert!(validate_date("01.01.0000").is_err());
        assert!(validate_date("01.01.0001").is_ok());
    }
}
