use super::catalog::SourceKind;
use super::columns::{aql, attendance, audit as prs, roster};
use super::normalizer::{normalize_name, parse_date, parse_number, EmployeeId};
use super::parser::{cell, RawTable};
use super::SourceError;
use crate::period::EvaluationMonth;
use crate::workflows::audit::{AuditKind, AuditTrail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// One roster row after normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    pub employee_id: EmployeeId,
    pub name: String,
    pub role_type: String,
    pub position_name: String,
    /// Raw manager reference; may be an id or a name.
    pub manager_ref: Option<String>,
    pub entrance_date: Option<NaiveDate>,
    pub termination_date: Option<NaiveDate>,
}

/// Working-day facts for one employee.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AttendanceSummary {
    pub total_working_days: f64,
    pub actual_working_days: f64,
    pub unapproved_absence_days: f64,
    pub absence_rate_percent: f64,
}

impl AttendanceSummary {
    pub fn from_days(total: f64, actual: f64, unapproved: f64) -> Self {
        let actual = if total > 0.0 { actual.min(total) } else { actual };
        let absence_rate_percent = if total > 0.0 {
            (total - actual) / total * 100.0
        } else {
            0.0
        };
        Self {
            total_working_days: total,
            actual_working_days: actual,
            unapproved_absence_days: unapproved,
            absence_rate_percent,
        }
    }
}

/// Codes used when the attendance export has one row per employee per day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttendanceCodes {
    pub present: Vec<String>,
    pub unapproved_reasons: Vec<String>,
}

impl Default for AttendanceCodes {
    fn default() -> Self {
        Self {
            present: vec![
                "Đi làm".to_string(),
                "Present".to_string(),
                "Work".to_string(),
                "P".to_string(),
            ],
            unapproved_reasons: vec![
                "AR1".to_string(),
                "Unapproved".to_string(),
                "Không phép".to_string(),
            ],
        }
    }
}

fn fold(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// A single AQL inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AqlInspection {
    pub employee_id: Option<EmployeeId>,
    pub failed: bool,
    pub area: Option<String>,
}

/// Aggregated 5PRS results for the inspected party.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AuditTally {
    pub validation_qty: f64,
    pub pass_qty: f64,
}

impl AuditTally {
    pub fn pass_rate_percent(&self) -> f64 {
        if self.validation_qty > 0.0 {
            self.pass_qty / self.validation_qty * 100.0
        } else {
            0.0
        }
    }
}

fn missing_column(audit: &mut AuditTrail, kind: SourceKind, field: &str, fallback: &str) {
    audit.record(
        AuditKind::MissingColumn,
        kind.label(),
        format!("no '{field}' column; {fallback}"),
    );
}

fn parse_optional_date(
    raw: &str,
    field: &str,
    subject: &EmployeeId,
    audit: &mut AuditTrail,
) -> Option<NaiveDate> {
    if raw.trim().is_empty() {
        return None;
    }
    let parsed = parse_date(raw);
    if parsed.is_none() {
        audit.record(
            AuditKind::AmbiguousDate,
            subject.as_str(),
            format!("{field} '{raw}' treated as no date"),
        );
    }
    parsed
}

pub fn load_roster(
    table: &RawTable,
    path: &Path,
    audit: &mut AuditTrail,
) -> Result<Vec<RosterEntry>, SourceError> {
    let Some(id_column) = table.column(&roster::EMPLOYEE_ID) else {
        return Err(SourceError::MissingKeyColumn {
            kind: SourceKind::Roster,
            path: path.to_path_buf(),
        });
    };

    let name = table.column(&roster::NAME);
    let role_type = table.column(&roster::ROLE_TYPE);
    let position = table.column(&roster::POSITION);
    let manager = table.column(&roster::MANAGER);
    let entrance = table.column(&roster::ENTRANCE_DATE);
    let termination = table.column(&roster::TERMINATION_DATE);

    for (index, spec, fallback) in [
        (name, &roster::NAME, "names left blank"),
        (role_type, &roster::ROLE_TYPE, "every employee treated as unmapped"),
        (position, &roster::POSITION, "positions left blank"),
        (manager, &roster::MANAGER, "hierarchy left flat"),
        (entrance, &roster::ENTRANCE_DATE, "no entrance dates"),
        (termination, &roster::TERMINATION_DATE, "no termination dates"),
    ] {
        if index.is_none() {
            missing_column(audit, SourceKind::Roster, spec.field, fallback);
        }
    }

    let mut seen = BTreeSet::new();
    let mut entries = Vec::new();
    for row in &table.rows {
        let Some(employee_id) = EmployeeId::parse(cell(row, Some(id_column))) else {
            continue;
        };
        if !seen.insert(employee_id.clone()) {
            audit.record(
                AuditKind::MissingRecord,
                employee_id.as_str(),
                "duplicate roster row ignored",
            );
            continue;
        }

        let manager_ref = Some(cell(row, manager).trim())
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        let entrance_date = parse_optional_date(cell(row, entrance), "entrance date", &employee_id, audit);
        let termination_date =
            parse_optional_date(cell(row, termination), "termination date", &employee_id, audit);

        entries.push(RosterEntry {
            name: cell(row, name).trim().to_string(),
            role_type: cell(row, role_type).trim().to_string(),
            position_name: normalize_name(cell(row, position)),
            manager_ref,
            entrance_date,
            termination_date,
            employee_id,
        });
    }

    Ok(entries)
}

pub fn load_attendance(
    table: &RawTable,
    month: EvaluationMonth,
    codes: &AttendanceCodes,
    audit: &mut AuditTrail,
) -> BTreeMap<EmployeeId, AttendanceSummary> {
    let Some(id_column) = table.column(&attendance::EMPLOYEE_ID) else {
        missing_column(
            audit,
            SourceKind::Attendance,
            attendance::EMPLOYEE_ID.field,
            "no attendance facts for anyone",
        );
        return BTreeMap::new();
    };

    if let Some(actual) = table.column(&attendance::ACTUAL_DAYS) {
        return load_aggregated_attendance(table, id_column, actual, audit);
    }

    match (
        table.column(&attendance::WORK_DATE),
        table.column(&attendance::STATUS),
    ) {
        (Some(date), Some(status)) => {
            load_daily_attendance(table, id_column, date, status, month, codes, audit)
        }
        _ => {
            missing_column(
                audit,
                SourceKind::Attendance,
                attendance::ACTUAL_DAYS.field,
                "neither aggregated nor daily columns found",
            );
            BTreeMap::new()
        }
    }
}

fn load_aggregated_attendance(
    table: &RawTable,
    id_column: usize,
    actual_column: usize,
    audit: &mut AuditTrail,
) -> BTreeMap<EmployeeId, AttendanceSummary> {
    let total_column = table.column(&attendance::TOTAL_DAYS);
    let unapproved_column = table.column(&attendance::UNAPPROVED_DAYS);
    let rate_column = table.column(&attendance::ABSENCE_RATE);

    if total_column.is_none() {
        missing_column(audit, SourceKind::Attendance, attendance::TOTAL_DAYS.field, "treated as 0");
    }
    if unapproved_column.is_none() {
        missing_column(
            audit,
            SourceKind::Attendance,
            attendance::UNAPPROVED_DAYS.field,
            "treated as 0",
        );
    }

    let mut summaries = BTreeMap::new();
    for row in &table.rows {
        let Some(employee_id) = EmployeeId::parse(cell(row, Some(id_column))) else {
            continue;
        };
        let total = parse_number(cell(row, total_column)).unwrap_or(0.0);
        let actual = parse_number(cell(row, Some(actual_column))).unwrap_or(0.0);
        let unapproved = parse_number(cell(row, unapproved_column)).unwrap_or(0.0);

        let mut summary = AttendanceSummary::from_days(total, actual, unapproved);
        if let Some(rate) = parse_number(cell(row, rate_column)) {
            summary.absence_rate_percent = rate;
        }
        summaries.insert(employee_id, summary);
    }
    summaries
}

fn load_daily_attendance(
    table: &RawTable,
    id_column: usize,
    date_column: usize,
    status_column: usize,
    month: EvaluationMonth,
    codes: &AttendanceCodes,
    audit: &mut AuditTrail,
) -> BTreeMap<EmployeeId, AttendanceSummary> {
    let reason_column = table.column(&attendance::REASON);
    let present: Vec<String> = codes.present.iter().map(|code| fold(code)).collect();
    let unapproved: Vec<String> = codes
        .unapproved_reasons
        .iter()
        .map(|code| fold(code))
        .collect();

    let mut working_dates = BTreeSet::new();
    let mut present_dates: BTreeMap<EmployeeId, BTreeSet<NaiveDate>> = BTreeMap::new();
    let mut unapproved_dates: BTreeMap<EmployeeId, BTreeSet<NaiveDate>> = BTreeMap::new();
    let mut outside = 0usize;

    for row in &table.rows {
        let Some(employee_id) = EmployeeId::parse(cell(row, Some(id_column))) else {
            continue;
        };
        let Some(date) = parse_date(cell(row, Some(date_column))) else {
            audit.record(
                AuditKind::AmbiguousDate,
                employee_id.as_str(),
                format!("attendance date '{}' skipped", cell(row, Some(date_column))),
            );
            continue;
        };
        if !month.contains(date) {
            outside += 1;
            continue;
        }

        working_dates.insert(date);
        let status = fold(cell(row, Some(status_column)));
        let entry = present_dates.entry(employee_id.clone()).or_default();
        if present.contains(&status) {
            entry.insert(date);
            continue;
        }

        let reason = fold(cell(row, reason_column));
        if unapproved.iter().any(|code| reason.contains(code.as_str())) {
            unapproved_dates.entry(employee_id).or_default().insert(date);
        }
    }

    if outside > 0 {
        audit.record(
            AuditKind::OutOfPeriodRows,
            SourceKind::Attendance.label(),
            format!("{outside} daily row(s) outside {month} ignored"),
        );
    }

    let total = working_dates.len() as f64;
    present_dates
        .into_iter()
        .map(|(employee_id, dates)| {
            let unapproved = unapproved_dates
                .get(&employee_id)
                .map(|dates| dates.len())
                .unwrap_or(0) as f64;
            let summary = AttendanceSummary::from_days(total, dates.len() as f64, unapproved);
            (employee_id, summary)
        })
        .collect()
}

const FAIL_MARKERS: &[&str] = &["FAIL", "REJECT", "NG", "F", "NOT PASS"];

fn is_failed_result(raw: &str) -> bool {
    let folded = fold(raw);
    FAIL_MARKERS
        .iter()
        .any(|marker| folded == *marker || (marker.len() > 2 && folded.contains(marker)))
}

/// Loads AQL inspections, dropping rows dated outside `month`.
pub fn load_aql(table: &RawTable, month: EvaluationMonth, audit: &mut AuditTrail) -> Vec<AqlInspection> {
    let id_column = table.column(&aql::EMPLOYEE_ID);
    let result_column = table.column(&aql::RESULT);
    let area_column = table.column(&aql::AREA);
    let date_column = table.column(&aql::DATE);

    if id_column.is_none() {
        missing_column(audit, SourceKind::Aql, aql::EMPLOYEE_ID.field, "failures not attributed");
    }
    if result_column.is_none() {
        missing_column(audit, SourceKind::Aql, aql::RESULT.field, "every inspection treated as passed");
    }
    if area_column.is_none() {
        missing_column(audit, SourceKind::Aql, aql::AREA.field, "only facility-wide rates available");
    }

    let mut outside = 0usize;
    let mut inspections = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        if let Some(date) = parse_date(cell(row, date_column)) {
            if !month.contains(date) {
                outside += 1;
                continue;
            }
        }

        let area = Some(normalize_name(cell(row, area_column))).filter(|area| !area.is_empty());
        inspections.push(AqlInspection {
            employee_id: EmployeeId::parse(cell(row, id_column)),
            failed: is_failed_result(cell(row, result_column)),
            area,
        });
    }

    if outside > 0 {
        audit.record(
            AuditKind::OutOfPeriodRows,
            SourceKind::Aql.label(),
            format!("{outside} inspection(s) dated outside {month} ignored"),
        );
    }

    inspections
}

pub fn load_audit(table: &RawTable, audit: &mut AuditTrail) -> BTreeMap<EmployeeId, AuditTally> {
    let Some(target_column) = table.column(&prs::TARGET_ID) else {
        missing_column(
            audit,
            SourceKind::Audit,
            prs::TARGET_ID.field,
            "no 5PRS results for anyone",
        );
        return BTreeMap::new();
    };
    let validation_column = table.column(&prs::VALIDATION_QTY);
    let pass_column = table.column(&prs::PASS_QTY);
    if validation_column.is_none() {
        missing_column(audit, SourceKind::Audit, prs::VALIDATION_QTY.field, "treated as 0");
    }
    if pass_column.is_none() {
        missing_column(audit, SourceKind::Audit, prs::PASS_QTY.field, "treated as 0");
    }

    let mut tallies: BTreeMap<EmployeeId, AuditTally> = BTreeMap::new();
    for row in &table.rows {
        let Some(target) = EmployeeId::parse(cell(row, Some(target_column))) else {
            continue;
        };
        let tally = tallies.entry(target).or_default();
        tally.validation_qty += parse_number(cell(row, validation_column)).unwrap_or(0.0);
        tally.pass_qty += parse_number(cell(row, pass_column)).unwrap_or(0.0);
    }
    tallies
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn table(csv: &str) -> RawTable {
        RawTable::from_reader(Cursor::new(csv.to_string())).expect("parse table")
    }

    fn september() -> EvaluationMonth {
        EvaluationMonth::new(2025, 9).expect("valid month")
    }

    fn id(raw: &str) -> EmployeeId {
        EmployeeId::parse(raw).expect("valid id")
    }

    #[test]
    fn roster_requires_an_id_column() {
        let mut audit = AuditTrail::new();
        let error = load_roster(&table("Name\nAn\n"), Path::new("roster.csv"), &mut audit)
            .expect_err("roster without ids fails");
        assert!(matches!(error, SourceError::MissingKeyColumn { kind: SourceKind::Roster, .. }));
    }

    #[test]
    fn roster_normalizes_rows_and_records_bad_dates() {
        let mut audit = AuditTrail::new();
        let entries = load_roster(
            &table(
                "Employee No,Full Name,ROLE TYPE STD,QIP POSITION 1ST NAME,MST direct boss name,Entrance Date,Stop working Date\n\
                 6191.0,An,TYPE-1,  assembly   inspector ,Binh,2024.01.05,\n\
                 6191,An again,TYPE-1,assembly inspector,,,\n\
                 6200,Binh,TYPE-1,line leader,,someday,31/08/2025\n",
            ),
            Path::new("roster.csv"),
            &mut audit,
        )
        .expect("roster loads");

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].employee_id, id("000006191"));
        assert_eq!(entries[0].position_name, "ASSEMBLY INSPECTOR");
        assert_eq!(entries[0].manager_ref.as_deref(), Some("Binh"));
        assert_eq!(entries[0].entrance_date, NaiveDate::from_ymd_opt(2024, 1, 5));
        assert_eq!(entries[1].entrance_date, None);
        assert_eq!(entries[1].termination_date, NaiveDate::from_ymd_opt(2025, 8, 31));
        assert_eq!(audit.count(AuditKind::AmbiguousDate), 1);
        assert_eq!(audit.count(AuditKind::MissingRecord), 1);
    }

    #[test]
    fn aggregated_attendance_derives_missing_rate() {
        let mut audit = AuditTrail::new();
        let summaries = load_attendance(
            &table("ID No,Total Working Days,Actual Working Days,Unapproved Absence Days\n1,22,20,0\n2,22,25,1\n"),
            september(),
            &AttendanceCodes::default(),
            &mut audit,
        );
        let first = summaries[&id("1")];
        assert_eq!(first.actual_working_days, 20.0);
        assert!((first.absence_rate_percent - 9.0909).abs() < 0.001);
        let second = summaries[&id("2")];
        assert_eq!(second.actual_working_days, 22.0, "actual days never exceed total");
        assert_eq!(second.unapproved_absence_days, 1.0);
    }

    #[test]
    fn daily_attendance_is_aggregated_per_employee() {
        let mut audit = AuditTrail::new();
        let summaries = load_attendance(
            &table(
                "ID No,Work Date,compAdd,Reason Description\n\
                 1,2025.09.01,Đi làm,\n\
                 1,2025.09.02,Vắng mặt,AR1 - Vắng không phép\n\
                 1,2025.09.03,Đi làm,\n\
                 2,2025.09.01,Đi làm,\n\
                 2,2025.09.02,Đi làm,\n\
                 2,2025.09.03,Vắng mặt,Phép năm\n\
                 2,2025.08.29,Đi làm,\n",
            ),
            september(),
            &AttendanceCodes::default(),
            &mut audit,
        );

        let first = summaries[&id("1")];
        assert_eq!(first.total_working_days, 3.0);
        assert_eq!(first.actual_working_days, 2.0);
        assert_eq!(first.unapproved_absence_days, 1.0);
        let second = summaries[&id("2")];
        assert_eq!(second.actual_working_days, 2.0);
        assert_eq!(second.unapproved_absence_days, 0.0);
        assert_eq!(audit.count(AuditKind::OutOfPeriodRows), 1);
    }

    #[test]
    fn attendance_without_usable_columns_is_empty() {
        let mut audit = AuditTrail::new();
        let summaries = load_attendance(
            &table("ID No,Something\n1,2\n"),
            september(),
            &AttendanceCodes::default(),
            &mut audit,
        );
        assert!(summaries.is_empty());
        assert_eq!(audit.count(AuditKind::MissingColumn), 1);
    }

    #[test]
    fn aql_rows_classify_failures_and_drop_other_months() {
        let mut audit = AuditTrail::new();
        let inspections = load_aql(
            &table(
                "EMPLOYEE NO,RESULT,BUILDING,Inspection Date\n\
                 1,PASS,b,2025-09-02\n\
                 1,Fail,b,2025-09-03\n\
                 2,NG,c,2025-09-03\n\
                 2,FAIL,c,2025-08-30\n",
            ),
            september(),
            &mut audit,
        );
        assert_eq!(inspections.len(), 3);
        assert!(!inspections[0].failed);
        assert!(inspections[1].failed);
        assert!(inspections[2].failed);
        assert_eq!(inspections[0].area.as_deref(), Some("B"));
        assert_eq!(audit.count(AuditKind::OutOfPeriodRows), 1);
    }

    #[test]
    fn audit_rows_accumulate_by_target() {
        let mut audit = AuditTrail::new();
        let tallies = load_audit(
            &table("Inspector ID,Inspection Target ID,Valiation_Qty,Pass_Qty\n9,1,60,58\n9,1,60,59\n"),
            &mut audit,
        );
        let tally = tallies[&id("1")];
        assert_eq!(tally.validation_qty, 120.0);
        assert!((tally.pass_rate_percent() - 97.5).abs() < 1e-9);
        assert!(audit.is_empty());
    }
}
