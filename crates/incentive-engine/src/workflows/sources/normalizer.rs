use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Zero-padded width of a numeric employee number.
pub const EMPLOYEE_ID_WIDTH: usize = 9;

const DATE_FORMATS: &[&str] = &[
    "%Y.%m.%d", "%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%m/%d/%Y", "%d-%m-%Y", "%d.%m.%Y",
];

/// Canonical employee identifier. Every join and comparison goes through this type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmployeeId(String);

impl TryFrom<String> for EmployeeId {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw).ok_or_else(|| format!("'{raw}' is not an employee id"))
    }
}

impl From<EmployeeId> for String {
    fn from(id: EmployeeId) -> Self {
        id.0
    }
}

impl EmployeeId {
    /// Canonicalizes a raw cell. Returns `None` for blanks.
    pub fn parse(raw: &str) -> Option<Self> {
        let canonical = canonical_employee_id(raw);
        (!canonical.is_empty()).then_some(Self(canonical))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Strips separators and float artifacts, then left-pads numeric ids.
pub fn canonical_employee_id(raw: &str) -> String {
    let mut cleaned: String = raw
        .replace(['\u{feff}', '\u{200b}'], "")
        .chars()
        .filter(|ch| !ch.is_whitespace() && *ch != '-' && *ch != ',')
        .collect();

    if let Some(stripped) = cleaned.strip_suffix(".0") {
        cleaned = stripped.to_string();
    }

    if cleaned.eq_ignore_ascii_case("nan") || cleaned.eq_ignore_ascii_case("none") {
        return String::new();
    }

    if !cleaned.is_empty() && cleaned.chars().all(|ch| ch.is_ascii_digit()) {
        format!("{cleaned:0>width$}", width = EMPLOYEE_ID_WIDTH)
    } else {
        cleaned.to_ascii_uppercase()
    }
}

/// Case- and whitespace-insensitive form used for names and position text.
pub fn normalize_name(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.to_ascii_uppercase()
}

/// Lowercase alphanumeric projection used for fuzzy header matching.
pub fn normalize_header(value: &str) -> String {
    value
        .chars()
        .filter(|ch| ch.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Parses the date layouts seen across exports. Unparseable input is "no date".
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Spreadsheet exports append a midnight time component.
    let date_part = trimmed
        .split(|ch: char| ch == ' ' || ch == 'T')
        .next()
        .unwrap_or(trimmed);

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date_part, format).ok())
}

/// Parses counts and quantities, tolerating thousands separators and `%` suffixes.
pub fn parse_number(value: &str) -> Option<f64> {
    let cleaned: String = value
        .trim()
        .trim_end_matches('%')
        .chars()
        .filter(|ch| *ch != ',' && !ch.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|number| number.is_finite())
}
