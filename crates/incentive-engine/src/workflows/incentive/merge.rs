use super::domain::{AttendanceFacts, EmployeeRecord, MonthlyTable, QualityFacts, RoleType};
use super::store::PriorResults;
use crate::period::EvaluationMonth;
use crate::workflows::audit::{AuditKind, AuditTrail};
use crate::workflows::sources::{
    failure_counts, normalize_name, AqlHistory, EmployeeId, MonthlySources, RosterEntry,
};
use std::collections::{BTreeMap, BTreeSet};

/// Joins the month's tables into one record per roster employee.
///
/// Employees missing from a table receive zero values rather than being dropped, and
/// every such substitution is recorded on the audit trail.
pub fn assemble(
    month: EvaluationMonth,
    sources: &MonthlySources,
    history: &AqlHistory,
    prior: &PriorResults,
    audit: &mut AuditTrail,
) -> MonthlyTable {
    let failures = failure_counts(&sources.aql);
    let managers = ManagerDirectory::new(&sources.roster);

    let records = sources
        .roster
        .iter()
        .map(|entry| {
            let mut record = EmployeeRecord::new(
                entry.employee_id.clone(),
                RoleType::parse(&entry.role_type),
                entry.position_name.clone(),
            );
            record.name = entry.name.clone();
            record.entrance_date = entry.entrance_date;
            record.termination_date = entry.termination_date;
            record.manager_id = managers.resolve(entry, audit);
            record.attendance = attendance_facts(entry, month, sources, audit);

            let tally = sources.audits.get(&entry.employee_id).copied().unwrap_or_default();
            record.quality = QualityFacts {
                aql_failures_current_month: failures.get(&entry.employee_id).copied().unwrap_or(0),
                continuous_aql_fail: history.continuous_failure(&entry.employee_id),
                audit_volume: tally.validation_qty,
                audit_pass_rate_percent: tally.pass_rate_percent(),
            };
            record.previous = prior.get(&entry.employee_id);
            record
        })
        .collect();

    MonthlyTable::new(month, records)
}

fn attendance_facts(
    entry: &RosterEntry,
    month: EvaluationMonth,
    sources: &MonthlySources,
    audit: &mut AuditTrail,
) -> AttendanceFacts {
    let terminated = entry
        .termination_date
        .is_some_and(|date| date < month.first_day());

    let Some(summary) = sources.attendance.get(&entry.employee_id) else {
        if !terminated {
            audit.record(
                AuditKind::MissingRecord,
                entry.employee_id.as_str(),
                "no attendance row; working days treated as 0",
            );
        }
        return AttendanceFacts {
            missing: true,
            terminated,
            ..AttendanceFacts::default()
        };
    };

    if terminated {
        return AttendanceFacts {
            absence_rate_percent: 100.0,
            terminated,
            ..AttendanceFacts::default()
        };
    }

    AttendanceFacts {
        total_working_days: summary.total_working_days,
        actual_working_days: summary.actual_working_days.min(summary.total_working_days.max(0.0)),
        unapproved_absence_days: summary.unapproved_absence_days,
        absence_rate_percent: summary.absence_rate_percent,
        missing: false,
        terminated,
    }
}

/// Resolves raw manager references: an exact employee id first, then a unique name.
struct ManagerDirectory {
    ids: BTreeSet<EmployeeId>,
    names: BTreeMap<String, Vec<EmployeeId>>,
}

impl ManagerDirectory {
    fn new(roster: &[RosterEntry]) -> Self {
        let mut names: BTreeMap<String, Vec<EmployeeId>> = BTreeMap::new();
        for entry in roster {
            let name = normalize_name(&entry.name);
            if !name.is_empty() {
                names.entry(name).or_default().push(entry.employee_id.clone());
            }
        }
        Self {
            ids: roster.iter().map(|entry| entry.employee_id.clone()).collect(),
            names,
        }
    }

    fn resolve(&self, entry: &RosterEntry, audit: &mut AuditTrail) -> Option<EmployeeId> {
        let raw = entry.manager_ref.as_deref()?;

        let resolved = EmployeeId::parse(raw)
            .filter(|id| self.ids.contains(id))
            .or_else(|| match self.names.get(&normalize_name(raw)) {
                Some(matches) if matches.len() == 1 => matches.first().cloned(),
                _ => None,
            });

        match resolved {
            Some(manager) if manager == entry.employee_id => None,
            Some(manager) => Some(manager),
            None => {
                audit.record(
                    AuditKind::UnresolvedManager,
                    entry.employee_id.as_str(),
                    format!("manager '{raw}' matches no unique roster employee"),
                );
                None
            }
        }
    }
}
