use std::path::Path;

use crate::config::ChainConfig;
use crate::period::EvaluationMonth;
use crate::workflows::audit::AuditTrail;
use crate::workflows::incentive::domain::{AttendanceFacts, EmployeeRecord, MonthlyTable, QualityFacts, RoleType};
use crate::workflows::incentive::overrides::ManualAmountProvider;
use crate::workflows::incentive::{
    conditions, continuity, roles, IncentiveEngine, IncentivePolicy, OrgTree, PriorResult,
};
use crate::workflows::sources::{AqlInspection, EmployeeId, FilePatterns, SourceCatalog, SourceKind};

pub(super) fn month(year: i32, month: u32) -> EvaluationMonth {
    EvaluationMonth::new(year, month).expect("valid month")
}

pub(super) fn september() -> EvaluationMonth {
    month(2025, 9)
}

pub(super) fn august() -> EvaluationMonth {
    month(2025, 8)
}

pub(super) fn id(raw: &str) -> EmployeeId {
    EmployeeId::parse(raw).expect("valid id")
}

/// Type-1 style employee who passes attendance and 5PRS with no AQL failures.
pub(super) fn employee(raw_id: &str, role_type: RoleType, position: &str) -> EmployeeRecord {
    let mut record = EmployeeRecord::new(id(raw_id), role_type, position);
    record.name = format!("Employee {raw_id}");
    record.attendance = AttendanceFacts {
        total_working_days: 22.0,
        actual_working_days: 20.0,
        unapproved_absence_days: 0.0,
        absence_rate_percent: 2.0 / 22.0 * 100.0,
        missing: false,
        terminated: false,
    };
    record.quality = QualityFacts {
        aql_failures_current_month: 0,
        continuous_aql_fail: false,
        audit_volume: 120.0,
        audit_pass_rate_percent: 97.0,
    };
    record
}

pub(super) fn inspector(raw_id: &str) -> EmployeeRecord {
    employee(raw_id, RoleType::Type1, "ASSEMBLY INSPECTOR")
}

pub(super) fn reporting_to(mut record: EmployeeRecord, manager: &str) -> EmployeeRecord {
    record.manager_id = Some(id(manager));
    record
}

pub(super) fn with_prior(mut record: EmployeeRecord, amount: u64) -> EmployeeRecord {
    record.previous = PriorResult {
        incentive_amount: amount,
        ..PriorResult::default()
    };
    record
}

pub(super) fn absent(mut record: EmployeeRecord) -> EmployeeRecord {
    record.attendance.actual_working_days = 8.0;
    record.attendance.absence_rate_percent = 14.0 / 22.0 * 100.0;
    record
}

/// Runs every stage after the merge on hand-built records.
pub(super) fn resolve_with(
    records: Vec<EmployeeRecord>,
    policy: IncentivePolicy,
    inspections: &[AqlInspection],
    manual: &dyn ManualAmountProvider,
) -> MonthlyTable {
    let mut audit = AuditTrail::new();
    let mut table = MonthlyTable::new(september(), records);
    let tree = OrgTree::build(&table, &mut audit);
    conditions::evaluate(&mut table, &tree, inspections, &policy);
    continuity::apply(&mut table, &policy.escalation);
    roles::assign(&mut table, &policy, &mut audit);
    IncentiveEngine::new(policy)
        .resolve(&mut table, &tree, manual)
        .expect("engine resolves");
    table
}

pub(super) fn resolve(records: Vec<EmployeeRecord>) -> MonthlyTable {
    resolve_with(
        records,
        IncentivePolicy::default(),
        &[],
        &crate::workflows::incentive::NoManualAmounts,
    )
}

pub(super) fn amount(table: &MonthlyTable, raw_id: &str) -> u64 {
    table
        .get(&id(raw_id))
        .map(EmployeeRecord::incentive_amount)
        .expect("employee in table")
}

pub(super) fn chain_from(floor: EvaluationMonth) -> ChainConfig {
    ChainConfig {
        max_depth: 12,
        history_floor: Some(floor),
    }
}

pub(super) fn catalog(dir: &Path) -> SourceCatalog {
    SourceCatalog::new(dir, FilePatterns::default())
}

/// Writes a small plant: two inspectors under a line leader under a manager, plus a
/// Type-3 employee. Inspector 2 leaves on 2025-08-20.
pub(super) fn write_plant(catalog: &SourceCatalog, period: EvaluationMonth) {
    let roster = "Employee No,Full Name,ROLE TYPE STD,QIP POSITION 1ST NAME,MST direct boss name,Entrance Date,Stop working Date\n\
        1,An,TYPE-1,ASSEMBLY INSPECTOR,Chi,2024.01.05,\n\
        2,Binh,TYPE-1,ASSEMBLY INSPECTOR,3,2024.01.05,2025.08.20\n\
        3,Chi,TYPE-1,LINE LEADER,4,2023.03.01,\n\
        4,Dung,TYPE-1,MANAGER,,2020.06.01,\n\
        5,Em,TYPE-3,CLEANER,4,2022.02.01,\n";
    let attendance = "ID No,Total Working Days,Actual Working Days,Unapproved Absence Days\n\
        1,22,20,0\n2,22,20,0\n3,22,21,0\n4,22,22,0\n5,22,22,0\n";
    let aql = format!(
        "EMPLOYEE NO,RESULT,BUILDING,Inspection Date\n1,PASS,A,{year}-{month:02}-05\n2,PASS,A,{year}-{month:02}-06\n",
        year = period.year(),
        month = period.month()
    );
    let prs = "Inspection Target ID,Valiation_Qty,Pass_Qty\n1,120,117\n2,120,117\n";

    for (kind, body) in [
        (SourceKind::Roster, roster.to_string()),
        (SourceKind::Attendance, attendance.to_string()),
        (SourceKind::Aql, aql),
        (SourceKind::Audit, prs.to_string()),
    ] {
        std::fs::write(catalog.path_for(kind, period), body).expect("write source table");
    }
}
