//! Format rules: named checks applied to string values beyond their type.
//!
//! A schema node selects a rule with its `format` keyword. Rules are looked up
//! by name in a [`FormatRegistry`](../registry/struct.FormatRegistry.html);
//! this module provides the rule trait and the built-in `date` and `email`
//! rules.

use chrono::format::{self, Parsed, StrftimeItems};
use failure::Fail;
use regex::Regex;

/// Why a format rule rejected a value.
#[derive(Debug, Fail, PartialEq, Clone, Eq, Hash)]
pub enum FormatError {
    /// The value did not parse against any of the accepted date patterns.
    #[fail(
        display = "Invalid date format. Expected format(s): {}",
        _0
    )]
    InvalidDate(String),

    #[fail(display = "Invalid email format: Missing \"@\"")]
    MissingAt,

    #[fail(display = "Invalid email format")]
    InvalidEmail,

    /// Format rules only apply to strings.
    #[fail(display = "Expected a string value")]
    NotAString,

    /// A rejection from a caller-supplied rule.
    #[fail(display = "{}", message)]
    Custom { message: String },
}

impl FormatError {
    pub fn custom<S: Into<String>>(message: S) -> FormatError {
        FormatError::Custom {
            message: message.into(),
        }
    }
}

/// A named, pluggable check on string values.
pub trait FormatRule: Send + Sync {
    /// Check a value, returning why it is malformed if it is.
    fn check(&self, value: &str) -> Result<(), FormatError>;
}

impl<F> FormatRule for F
where
    F: Fn(&str) -> Result<(), FormatError> + Send + Sync,
{
    fn check(&self, value: &str) -> Result<(), FormatError> {
        self(value)
    }
}

/// Accepts a value that parses against any one of a list of strftime-style
/// patterns.
///
/// A pattern may describe a date and time, a date, or a time of day. Fields
/// a pattern leaves out take strptime's defaults: year 1900, January, the
/// first of the month, and midnight. So `%Y-%m` accepts `2024-01`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRule {
    patterns: Vec<String>,
}

impl DateRule {
    pub fn new<I, S>(patterns: I) -> DateRule
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DateRule {
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Parse `value` with the first pattern that accepts it, and render the
    /// result as ISO 8601 (`2024-01-15`, `2024-01-15T09:30:00` or
    /// `09:30:00`, depending on what the pattern describes).
    pub fn normalize(&self, value: &str) -> Result<String, FormatError> {
        self.patterns
            .iter()
            .find_map(|pattern| parse(value, pattern))
            .ok_or_else(|| FormatError::InvalidDate(self.patterns.join(", ")))
    }
}

impl Default for DateRule {
    fn default() -> Self {
        DateRule::new(vec!["%Y-%m-%d"])
    }
}

impl FormatRule for DateRule {
    fn check(&self, value: &str) -> Result<(), FormatError> {
        self.normalize(value).map(|_| ())
    }
}

fn parse(value: &str, pattern: &str) -> Option<String> {
    let mut parsed = Parsed::new();
    format::parse(&mut parsed, value, StrftimeItems::new(pattern)).ok()?;

    let has_date = describes_date(&parsed);
    let has_time = describes_time(&parsed);
    fill_defaults(&mut parsed).ok()?;

    match (has_date, has_time) {
        (true, false) => parsed
            .to_naive_date()
            .ok()
            .map(|date| date.format("%Y-%m-%d").to_string()),
        (false, true) => parsed
            .to_naive_time()
            .ok()
            .map(|time| time.format("%H:%M:%S").to_string()),
        _ => parsed
            .to_naive_datetime_with_offset(0)
            .ok()
            .map(|datetime| datetime.format("%Y-%m-%dT%H:%M:%S").to_string()),
    }
}

fn describes_date(parsed: &Parsed) -> bool {
    parsed.timestamp().is_some()
        || has_year(parsed)
        || has_month_or_week(parsed)
        || parsed.day().is_some()
        || parsed.weekday().is_some()
}

fn describes_time(parsed: &Parsed) -> bool {
    parsed.hour_div_12().is_some()
        || parsed.hour_mod_12().is_some()
        || parsed.minute().is_some()
        || parsed.second().is_some()
        || parsed.nanosecond().is_some()
}

fn has_year(parsed: &Parsed) -> bool {
    parsed.year().is_some()
        || parsed.year_div_100().is_some()
        || parsed.year_mod_100().is_some()
        || parsed.isoyear().is_some()
        || parsed.isoyear_div_100().is_some()
        || parsed.isoyear_mod_100().is_some()
}

fn has_month_or_week(parsed: &Parsed) -> bool {
    parsed.month().is_some()
        || parsed.ordinal().is_some()
        || parsed.week_from_sun().is_some()
        || parsed.week_from_mon().is_some()
        || parsed.isoweek().is_some()
}

/// Set every field the pattern did not, the way strptime does.
fn fill_defaults(parsed: &mut Parsed) -> format::ParseResult<()> {
    if parsed.timestamp().is_some() {
        return Ok(());
    }

    if !has_year(parsed) {
        parsed.set_year(1900)?;
    }
    if !has_month_or_week(parsed) {
        parsed.set_month(1)?;
        if parsed.day().is_none() {
            parsed.set_day(1)?;
        }
    } else if parsed.month().is_some() && parsed.day().is_none() {
        parsed.set_day(1)?;
    }

    match (parsed.hour_div_12(), parsed.hour_mod_12()) {
        (None, None) => parsed.set_hour(0)?,
        // `%I` without `%p` reads as morning.
        (None, Some(_)) => parsed.set_ampm(false)?,
        (Some(_), None) => parsed.set_hour12(12)?,
        (Some(_), Some(_)) => {}
    }
    if parsed.minute().is_none() {
        parsed.set_minute(0)?;
    }

    Ok(())
}

const EMAIL_SHAPE: &str = r"^[^@]+@[^@]+\.[^@]+";

/// Accepts `local@domain.tld`-shaped strings.
#[derive(Debug, Clone)]
pub struct EmailRule {
    shape: Regex,
}

impl EmailRule {
    pub fn new() -> EmailRule {
        EmailRule {
            shape: Regex::new(EMAIL_SHAPE).expect("invalid email pattern"),
        }
    }
}

impl Default for EmailRule {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatRule for EmailRule {
    fn check(&self, value: &str) -> Result<(), FormatError> {
        if !value.contains('@') {
            return Err(FormatError::MissingAt);
        }

        if !self.shape.is_match(value) {
            return Err(FormatError::InvalidEmail);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn date_accepts_any_pattern() {
        let rule = DateRule::new(vec!["%d/%m/%Y", "%Y-%m-%d"]);
        assert_eq!(rule.check("15/01/2024"), Ok(()));
        assert_eq!(rule.check("2024-01-15"), Ok(()));
    }

    #[test]
    fn date_lists_every_pattern() {
        let rule = DateRule::new(vec!["%d/%m/%Y", "%Y-%m-%d"]);
        let err = rule.check("2024-13-40").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid date format. Expected format(s): %d/%m/%Y, %Y-%m-%d"
        );
    }

    #[test]
    fn date_rejects_trailing_input() {
        let rule = DateRule::default();
        assert!(rule.check("2024-01-15 extra").is_err());
        assert!(rule.check("").is_err());
    }

    #[test]
    fn normalize_renders_iso() {
        let rule = DateRule::new(vec!["%d/%m/%Y %H:%M", "%d.%m.%Y", "%H:%M"]);
        assert_eq!(rule.normalize("15/01/2024 09:30").unwrap(), "2024-01-15T09:30:00");
        assert_eq!(rule.normalize("15.01.2024").unwrap(), "2024-01-15");
        assert_eq!(rule.normalize("09:30").unwrap(), "09:30:00");
        assert!(rule.normalize("January").is_err());
    }

    #[test]
    fn date_partial_patterns() {
        assert_eq!(DateRule::new(vec!["%Y-%m"]).check("2024-01"), Ok(()));
        assert_eq!(DateRule::new(vec!["%Y"]).check("2024"), Ok(()));
        assert_eq!(DateRule::new(vec!["%d/%m"]).check("15/01"), Ok(()));
        assert_eq!(DateRule::new(vec!["%H"]).check("09"), Ok(()));

        assert!(DateRule::new(vec!["%Y-%m"]).check("2024-13").is_err());
        assert!(DateRule::new(vec!["%Y-%m"]).check("2024-01-15").is_err());
        // The default year, 1900, is not a leap year.
        assert!(DateRule::new(vec!["%d/%m"]).check("29/02").is_err());
    }

    #[test]
    fn normalize_fills_missing_fields() {
        assert_eq!(
            DateRule::new(vec!["%Y-%m"]).normalize("2024-01").unwrap(),
            "2024-01-01"
        );
        assert_eq!(
            DateRule::new(vec!["%d/%m"]).normalize("15/01").unwrap(),
            "1900-01-15"
        );
        assert_eq!(DateRule::new(vec!["%H"]).normalize("09").unwrap(), "09:00:00");
        assert_eq!(
            DateRule::new(vec!["%I:%M %p"]).normalize("09:30 PM").unwrap(),
            "21:30:00"
        );
        assert_eq!(
            DateRule::new(vec!["%Y-%m-%d %H"]).normalize("2024-01-15 09").unwrap(),
            "2024-01-15T09:00:00"
        );
    }

    #[test]
    fn email_shapes() {
        let rule = EmailRule::new();
        assert_eq!(rule.check("a@b.com"), Ok(()));
        assert_eq!(rule.check("first.last@mail.example.org"), Ok(()));
        assert_eq!(rule.check("not-an-email"), Err(FormatError::MissingAt));
        assert_eq!(rule.check("a@b"), Err(FormatError::InvalidEmail));
        assert_eq!(rule.check("@b.com"), Err(FormatError::InvalidEmail));
    }

    #[test]
    fn email_messages() {
        assert_eq!(
            FormatError::MissingAt.to_string(),
            "Invalid email format: Missing \"@\""
        );
        assert_eq!(FormatError::InvalidEmail.to_string(), "Invalid email format");
    }

    #[test]
    fn closures_are_rules() {
        let upper = |value: &str| {
            if value.chars().all(char::is_uppercase) {
                Ok(())
            } else {
                Err(FormatError::custom("Expected upper case"))
            }
        };

        assert_eq!(upper.check("ABC"), Ok(()));
        assert_eq!(
            upper.check("abc").unwrap_err().to_string(),
            "Expected upper case"
        );
    }
}
