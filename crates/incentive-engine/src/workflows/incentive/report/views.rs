use super::super::domain::{Archetype, PayoutReason, RoleType};
use super::super::store::ResultRow;
use crate::period::EvaluationMonth;
use crate::workflows::audit::AuditKind;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchetypeEntry {
    pub archetype: Archetype,
    pub archetype_label: &'static str,
    pub headcount: usize,
    pub paid: usize,
    pub total_amount: u64,
    pub average_paid_amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReasonEntry {
    pub reason: PayoutReason,
    pub summary: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteCountEntry {
    pub kind: AuditKind,
    pub label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReportSummary {
    pub month: EvaluationMonth,
    pub headcount: usize,
    pub paid: usize,
    pub total_amount: u64,
    pub archetypes: Vec<ArchetypeEntry>,
    pub unpaid_reasons: Vec<ReasonEntry>,
    pub audit_notes: Vec<NoteCountEntry>,
}

/// Per-employee breakdown of one materialized row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeExplanation {
    pub month: EvaluationMonth,
    pub employee_id: String,
    pub name: String,
    pub role_type: RoleType,
    pub position_name: String,
    pub archetype: Archetype,
    pub archetype_label: &'static str,
    pub incentive_amount: u64,
    pub reason: PayoutReason,
    pub reason_summary: &'static str,
    pub attendance_passed: bool,
    pub actual_working_days: f64,
    pub total_working_days: f64,
    pub unapproved_absence_days: f64,
    pub absence_rate_percent: f64,
    pub aql_failures: u32,
    pub continuous_aql_fail: bool,
    pub audit_volume: f64,
    pub audit_pass_rate_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_reject_rate_percent: Option<f64>,
    pub previous_incentive_amount: u64,
    pub continuous_qualifying_months: u32,
    pub parts: [u64; 3],
}

impl EmployeeExplanation {
    pub fn from_row(month: EvaluationMonth, row: &ResultRow) -> Self {
        Self {
            month,
            employee_id: row.employee_id.clone(),
            name: row.name.clone(),
            role_type: row.role_type,
            position_name: row.position_name.clone(),
            archetype: row.archetype,
            archetype_label: row.archetype.label(),
            incentive_amount: row.incentive_amount,
            reason: row.reason,
            reason_summary: row.reason.summary(),
            attendance_passed: row.attendance_passed,
            actual_working_days: row.actual_working_days,
            total_working_days: row.total_working_days,
            unapproved_absence_days: row.unapproved_absence_days,
            absence_rate_percent: row.absence_rate_percent,
            aql_failures: row.aql_failures,
            continuous_aql_fail: row.continuous_aql_fail,
            audit_volume: row.audit_volume,
            audit_pass_rate_percent: row.audit_pass_rate_percent,
            area_reject_rate_percent: row.area_reject_rate_percent,
            previous_incentive_amount: row.previous_incentive_amount,
            continuous_qualifying_months: row.continuous_qualifying_months,
            parts: [row.part1_amount, row.part2_amount, row.part3_amount],
        }
    }
}
