//! Monthly source tables: file catalog, CSV parsing, column discovery and normalization.

mod catalog;
pub mod columns;
mod normalizer;
mod parser;
mod tables;

pub use catalog::{period_marker_matches, FilePatterns, SourceCatalog, SourceKind};
pub use normalizer::{
    canonical_employee_id, normalize_header, normalize_name, parse_date, parse_number,
    EmployeeId, EMPLOYEE_ID_WIDTH,
};
pub use parser::RawTable;
pub(crate) use parser::cell;
pub use tables::{
    AqlInspection, AttendanceCodes, AttendanceSummary, AuditTally, RosterEntry,
};

use crate::period::EvaluationMonth;
use crate::workflows::audit::{AuditKind, AuditTrail};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("missing {kind} source for {month}: {}", path.display())]
    MissingSource {
        month: EvaluationMonth,
        kind: SourceKind,
        path: PathBuf,
    },
    #[error("{kind} table {} has no employee id column", path.display())]
    MissingKeyColumn { kind: SourceKind, path: PathBuf },
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid CSV data in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

fn read_table(path: &Path) -> Result<RawTable, SourceError> {
    let file = File::open(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    RawTable::from_reader(file).map_err(|source| SourceError::Csv {
        path: path.to_path_buf(),
        source,
    })
}

fn require(
    catalog: &SourceCatalog,
    kind: SourceKind,
    month: EvaluationMonth,
) -> Result<(PathBuf, RawTable), SourceError> {
    let path = catalog.path_for(kind, month);
    if !path.is_file() {
        return Err(SourceError::MissingSource { month, kind, path });
    }
    let table = read_table(&path)?;
    debug!(source = kind.label(), rows = table.rows.len(), path = %path.display(), "loaded source table");
    Ok((path, table))
}

/// The four current-month tables after normalization.
#[derive(Debug, Clone, Default)]
pub struct MonthlySources {
    pub roster: Vec<RosterEntry>,
    pub attendance: BTreeMap<EmployeeId, AttendanceSummary>,
    pub aql: Vec<AqlInspection>,
    pub audits: BTreeMap<EmployeeId, AuditTally>,
}

impl MonthlySources {
    /// Loads every required table for `month`. Any absent file is fatal.
    pub fn load(
        catalog: &SourceCatalog,
        month: EvaluationMonth,
        codes: &AttendanceCodes,
        audit: &mut AuditTrail,
    ) -> Result<Self, SourceError> {
        let (roster_path, roster_table) = require(catalog, SourceKind::Roster, month)?;
        let (_, attendance_table) = require(catalog, SourceKind::Attendance, month)?;
        let (_, aql_table) = require(catalog, SourceKind::Aql, month)?;
        let (_, audit_table) = require(catalog, SourceKind::Audit, month)?;

        let sources = Self {
            roster: tables::load_roster(&roster_table, &roster_path, audit)?,
            attendance: tables::load_attendance(&attendance_table, month, codes, audit),
            aql: tables::load_aql(&aql_table, month, audit),
            audits: tables::load_audit(&audit_table, audit),
        };

        info!(
            %month,
            employees = sources.roster.len(),
            attendance_rows = sources.attendance.len(),
            aql_inspections = sources.aql.len(),
            audited = sources.audits.len(),
            "source tables loaded"
        );
        Ok(sources)
    }
}

/// Number of months scanned for a continuous AQL failure.
pub const AQL_HISTORY_WINDOW: usize = 3;

/// Per-employee AQL failure counts for each month of the trailing window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AqlHistory {
    months: Vec<(EvaluationMonth, Option<BTreeMap<EmployeeId, u32>>)>,
}

pub fn failure_counts(inspections: &[AqlInspection]) -> BTreeMap<EmployeeId, u32> {
    let mut counts = BTreeMap::new();
    for inspection in inspections.iter().filter(|inspection| inspection.failed) {
        if let Some(employee_id) = &inspection.employee_id {
            *counts.entry(employee_id.clone()).or_insert(0) += 1;
        }
    }
    counts
}

impl AqlHistory {
    /// Builds the window ending at `month`, reusing the already-loaded current inspections.
    /// Earlier months come from the catalog and must pass period validation; a month whose
    /// file is absent or mismatched stays unavailable.
    pub fn load(
        catalog: &SourceCatalog,
        month: EvaluationMonth,
        current: &[AqlInspection],
        audit: &mut AuditTrail,
    ) -> Self {
        let mut months = Vec::with_capacity(AQL_HISTORY_WINDOW);
        for period in month.trailing(AQL_HISTORY_WINDOW) {
            if period == month {
                months.push((period, Some(failure_counts(current))));
                continue;
            }
            months.push((period, load_history_month(catalog, period, audit)));
        }
        Self { months }
    }

    pub fn is_complete(&self) -> bool {
        self.months.len() == AQL_HISTORY_WINDOW && self.months.iter().all(|(_, counts)| counts.is_some())
    }

    /// True iff the employee failed at least once in every month of a complete window.
    pub fn continuous_failure(&self, employee_id: &EmployeeId) -> bool {
        self.is_complete()
            && self.months.iter().all(|(_, counts)| {
                counts
                    .as_ref()
                    .and_then(|counts| counts.get(employee_id))
                    .is_some_and(|failures| *failures > 0)
            })
    }
}

fn load_history_month(
    catalog: &SourceCatalog,
    period: EvaluationMonth,
    audit: &mut AuditTrail,
) -> Option<BTreeMap<EmployeeId, u32>> {
    let path = catalog.path_for(SourceKind::Aql, period);
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    if !path.is_file() {
        audit.record(
            AuditKind::MissingHistory,
            period.to_string(),
            format!("AQL report {file_name} not found; continuous failure cannot be established"),
        );
        return None;
    }
    if !period_marker_matches(&file_name, period) {
        audit.record(
            AuditKind::MissingHistory,
            period.to_string(),
            format!("AQL report {file_name} does not carry the {period} period marker"),
        );
        return None;
    }

    let table = match read_table(&path) {
        Ok(table) => table,
        Err(err) => {
            audit.record(AuditKind::MissingHistory, period.to_string(), err.to_string());
            return None;
        }
    };
    let inspections = tables::load_aql(&table, period, audit);
    if inspections.is_empty() && !table.rows.is_empty() {
        audit.record(
            AuditKind::MissingHistory,
            period.to_string(),
            format!("AQL report {file_name} holds no inspections dated in {period}"),
        );
        return None;
    }
    Some(failure_counts(&inspections))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month(year: i32, month: u32) -> EvaluationMonth {
        EvaluationMonth::new(year, month).expect("valid month")
    }

    fn id(raw: &str) -> EmployeeId {
        EmployeeId::parse(raw).expect("valid id")
    }

    fn failing(raw: &str) -> AqlInspection {
        AqlInspection {
            employee_id: Some(id(raw)),
            failed: true,
            area: None,
        }
    }

    fn write(catalog: &SourceCatalog, kind: SourceKind, period: EvaluationMonth, body: &str) {
        std::fs::write(catalog.path_for(kind, period), body).expect("write source");
    }

    #[test]
    fn load_reports_the_missing_table() {
        let dir = tempfile::tempdir().expect("temp dir");
        let catalog = SourceCatalog::new(dir.path(), FilePatterns::default());
        let september = month(2025, 9);
        write(&catalog, SourceKind::Roster, september, "Employee No\n1\n");
        write(&catalog, SourceKind::Attendance, september, "ID No,Actual Working Days\n1,20\n");

        let error = MonthlySources::load(
            &catalog,
            september,
            &AttendanceCodes::default(),
            &mut AuditTrail::new(),
        )
        .expect_err("AQL file is missing");
        match error {
            SourceError::MissingSource { kind, month: missing, .. } => {
                assert_eq!(kind, SourceKind::Aql);
                assert_eq!(missing, september);
            }
            other => panic!("expected missing source, got {other:?}"),
        }
    }

    #[test]
    fn continuous_failure_needs_every_month() {
        let dir = tempfile::tempdir().expect("temp dir");
        let catalog = SourceCatalog::new(dir.path(), FilePatterns::default());
        let september = month(2025, 9);
        write(&catalog, SourceKind::Aql, month(2025, 7), "EMPLOYEE NO,RESULT\n1,FAIL\n2,FAIL\n");
        write(&catalog, SourceKind::Aql, month(2025, 8), "EMPLOYEE NO,RESULT\n1,FAIL\n2,PASS\n");

        let mut audit = AuditTrail::new();
        let history = AqlHistory::load(&catalog, september, &[failing("1"), failing("2")], &mut audit);

        assert!(history.is_complete());
        assert!(history.continuous_failure(&id("1")));
        assert!(!history.continuous_failure(&id("2")));
        assert_eq!(audit.count(AuditKind::MissingHistory), 0);
    }

    #[test]
    fn incomplete_window_never_flags_continuous_failure() {
        let dir = tempfile::tempdir().expect("temp dir");
        let catalog = SourceCatalog::new(dir.path(), FilePatterns::default());
        let september = month(2025, 9);
        write(&catalog, SourceKind::Aql, month(2025, 8), "EMPLOYEE NO,RESULT\n1,FAIL\n");

        let mut audit = AuditTrail::new();
        let history = AqlHistory::load(&catalog, september, &[failing("1")], &mut audit);

        assert!(!history.is_complete());
        assert!(!history.continuous_failure(&id("1")));
        assert_eq!(audit.count(AuditKind::MissingHistory), 1);
    }

    #[test]
    fn history_month_with_foreign_dates_is_rejected() {
        let dir = tempfile::tempdir().expect("temp dir");
        let catalog = SourceCatalog::new(dir.path(), FilePatterns::default());
        let september = month(2025, 9);
        write(
            &catalog,
            SourceKind::Aql,
            month(2025, 7),
            "EMPLOYEE NO,RESULT,Inspection Date\n1,FAIL,2025-06-03\n",
        );
        write(&catalog, SourceKind::Aql, month(2025, 8), "EMPLOYEE NO,RESULT\n1,FAIL\n");

        let mut audit = AuditTrail::new();
        let history = AqlHistory::load(&catalog, september, &[failing("1")], &mut audit);

        assert!(!history.continuous_failure(&id("1")));
        assert_eq!(audit.count(AuditKind::MissingHistory), 1);
    }
}
