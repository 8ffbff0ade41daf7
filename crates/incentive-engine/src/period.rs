use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MONTH_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Calendar month a calculation run evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EvaluationMonth {
    year: i32,
    month: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a month (expected YYYY-MM or '<month name> YYYY')")]
pub struct MonthParseError(pub String);

impl EvaluationMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) && NaiveDate::from_ymd_opt(year, month, 1).is_some() {
            Some(Self { year, month })
        } else {
            None
        }
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub const fn year(self) -> i32 {
        self.year
    }

    pub const fn month(self) -> u32 {
        self.month
    }

    pub fn previous(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(self) -> NaiveDate {
        let (year, month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// Lowercase English month name used in file names.
    pub fn month_name(self) -> &'static str {
        MONTH_NAMES[(self.month - 1) as usize]
    }

    /// The `window` most recent months ending with (and including) this one, oldest first.
    pub fn trailing(self, window: usize) -> Vec<Self> {
        let mut months = Vec::with_capacity(window);
        let mut cursor = self;
        for _ in 0..window {
            months.push(cursor);
            cursor = cursor.previous();
        }
        months.reverse();
        months
    }
}

impl fmt::Display for EvaluationMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for EvaluationMonth {
    type Err = MonthParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let error = || MonthParseError(raw.to_string());

        if let Some((year, month)) = trimmed.split_once(['-', '/', '.']) {
            if let (Ok(year), Ok(month)) = (year.parse::<i32>(), month.parse::<u32>()) {
                return Self::new(year, month).ok_or_else(error);
            }
        }

        let lowered = trimmed.to_ascii_lowercase();
        let mut parts = lowered.split_whitespace();
        let (Some(name), Some(year), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(error());
        };
        let month = MONTH_NAMES
            .iter()
            .position(|candidate| *candidate == name || candidate[..3] == *name)
            .ok_or_else(error)?;
        let year = year.parse::<i32>().map_err(|_| error())?;
        Self::new(year, month as u32 + 1).ok_or_else(error)
    }
}

impl TryFrom<String> for EvaluationMonth {
    type Error = MonthParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EvaluationMonth> for String {
    fn from(value: EvaluationMonth) -> Self {
        value.to_string()
    }
}
