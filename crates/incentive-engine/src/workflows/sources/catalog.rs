use crate::period::EvaluationMonth;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// The four independently exported monthly tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Roster,
    Attendance,
    Aql,
    Audit,
}

impl SourceKind {
    pub const fn ordered() -> [SourceKind; 4] {
        [
            SourceKind::Roster,
            SourceKind::Attendance,
            SourceKind::Aql,
            SourceKind::Audit,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            SourceKind::Roster => "roster",
            SourceKind::Attendance => "attendance",
            SourceKind::Aql => "AQL inspections",
            SourceKind::Audit => "5PRS audits",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// File name templates. `{month}` is the lowercase English month name, `{mm}` the two-digit
/// month and `{year}` the four-digit year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePatterns {
    pub roster: String,
    pub attendance: String,
    pub aql: String,
    pub audit: String,
    pub result: String,
}

impl Default for FilePatterns {
    fn default() -> Self {
        Self {
            roster: "basic_manpower_data_{month}_{year}.csv".to_string(),
            attendance: "attendance_data_{month}_{year}.csv".to_string(),
            aql: "aql_report_{month}_{year}.csv".to_string(),
            audit: "5prs_data_{month}_{year}.csv".to_string(),
            result: "incentive_result_{month}_{year}.csv".to_string(),
        }
    }
}

impl FilePatterns {
    pub fn pattern(&self, kind: SourceKind) -> &str {
        match kind {
            SourceKind::Roster => &self.roster,
            SourceKind::Attendance => &self.attendance,
            SourceKind::Aql => &self.aql,
            SourceKind::Audit => &self.audit,
        }
    }

    pub fn result_file_name(&self, month: EvaluationMonth) -> String {
        render(&self.result, month)
    }
}

pub(crate) fn render(pattern: &str, month: EvaluationMonth) -> String {
    pattern
        .replace("{month}", month.month_name())
        .replace("{mm}", &format!("{:02}", month.month()))
        .replace("{year}", &format!("{:04}", month.year()))
}

/// Checks that a file name carries the period it claims to cover.
pub fn period_marker_matches(file_name: &str, month: EvaluationMonth) -> bool {
    let lowered = file_name.to_ascii_lowercase();
    let year = format!("{:04}", month.year());
    if !lowered.contains(&year) {
        return false;
    }
    let numeric = [
        format!("{year}-{:02}", month.month()),
        format!("{year}{:02}", month.month()),
        format!("{:02}.{year}", month.month()),
        format!("{:02}_{year}", month.month()),
    ];
    lowered.contains(month.month_name()) || numeric.iter().any(|marker| lowered.contains(marker))
}

/// Resolves where each month's source tables live.
#[derive(Debug, Clone)]
pub struct SourceCatalog {
    data_dir: PathBuf,
    patterns: FilePatterns,
}

impl SourceCatalog {
    pub fn new(data_dir: impl Into<PathBuf>, patterns: FilePatterns) -> Self {
        Self {
            data_dir: data_dir.into(),
            patterns,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn path_for(&self, kind: SourceKind, month: EvaluationMonth) -> PathBuf {
        self.data_dir
            .join(render(self.patterns.pattern(kind), month))
    }

    /// Source kinds whose file is absent for `month`.
    pub fn missing(&self, month: EvaluationMonth) -> Vec<SourceKind> {
        SourceKind::ordered()
            .into_iter()
            .filter(|kind| !self.path_for(*kind, month).is_file())
            .collect()
    }
}
