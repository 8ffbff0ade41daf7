use super::domain::{AttendanceCheck, AttendanceFacts, ConditionFlags, MonthlyTable, QualityFacts};
use super::hierarchy::OrgTree;
use super::policy::{AreaAssignment, AttendanceThresholds, IncentivePolicy, PrsThresholds};
use crate::workflows::sources::AqlInspection;
use std::collections::BTreeMap;

/// Inspection counts behind a reject rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RejectTally {
    pub inspections: u32,
    pub rejects: u32,
}

impl RejectTally {
    /// Percentage of rejected inspections. No inspections reads as 0%.
    pub fn rate_percent(&self) -> f64 {
        if self.inspections == 0 {
            0.0
        } else {
            f64::from(self.rejects) / f64::from(self.inspections) * 100.0
        }
    }
}

/// Reject rates per building and for the whole facility.
#[derive(Debug, Clone, Default)]
pub struct RejectRates {
    facility: RejectTally,
    areas: BTreeMap<String, RejectTally>,
}

impl RejectRates {
    pub fn from_inspections(inspections: &[AqlInspection]) -> Self {
        let mut rates = Self::default();
        for inspection in inspections {
            let reject = u32::from(inspection.failed);
            rates.facility.inspections += 1;
            rates.facility.rejects += reject;
            if let Some(area) = &inspection.area {
                let tally = rates.areas.entry(area.clone()).or_default();
                tally.inspections += 1;
                tally.rejects += reject;
            }
        }
        rates
    }

    pub fn facility(&self) -> RejectTally {
        self.facility
    }

    pub fn area(&self, area: &str) -> RejectTally {
        self.areas.get(area).copied().unwrap_or_default()
    }

    pub fn for_assignment(&self, assignment: &AreaAssignment) -> RejectTally {
        match assignment {
            AreaAssignment::Facility => self.facility,
            AreaAssignment::Building(area) => self.area(area),
        }
    }
}

pub fn attendance_check(facts: &AttendanceFacts, limits: &AttendanceThresholds) -> AttendanceCheck {
    if facts.terminated {
        return AttendanceCheck::default();
    }
    AttendanceCheck {
        has_presence: facts.actual_working_days > 0.0,
        unapproved_within_limit: facts.unapproved_absence_days <= limits.max_unapproved_absence_days,
        absence_rate_within_limit: facts.absence_rate_percent <= limits.max_absence_rate_percent,
        minimum_days_met: facts.actual_working_days >= limits.min_actual_working_days,
    }
}

fn prs_flags(quality: &QualityFacts, limits: &PrsThresholds) -> (bool, bool) {
    (
        quality.audit_volume >= limits.min_volume,
        quality.audit_pass_rate_percent >= limits.min_pass_rate_percent,
    )
}

/// Derives every named condition for every record.
pub fn evaluate(
    table: &mut MonthlyTable,
    tree: &OrgTree,
    inspections: &[AqlInspection],
    policy: &IncentivePolicy,
) {
    let rates = RejectRates::from_inspections(inspections);
    let facility_rate = rates.facility().rate_percent();
    let reject_limit = policy.max_area_reject_rate_percent;

    let continuous: Vec<bool> = table
        .records()
        .iter()
        .map(|record| record.quality.continuous_aql_fail)
        .collect();

    for (position, record) in table.records_mut().iter_mut().enumerate() {
        let (prs_volume_met, prs_pass_rate_met) = prs_flags(&record.quality, &policy.prs);
        let assigned_area_reject_rate = policy
            .area_assignment(&record.employee_id)
            .map(|assignment| rates.for_assignment(assignment).rate_percent());

        record.conditions = ConditionFlags {
            attendance: attendance_check(&record.attendance, &policy.attendance),
            aql_current_clear: record.quality.aql_failures_current_month == 0,
            aql_no_continuous_fail: !record.quality.continuous_aql_fail,
            prs_volume_met,
            prs_pass_rate_met,
            assigned_area_reject_rate,
            facility_reject_rate: facility_rate,
            assigned_area_clear: assigned_area_reject_rate.map(|rate| rate < reject_limit),
            facility_clear: facility_rate < reject_limit,
            subordinate_continuous_fail: tree
                .subtree(position)
                .into_iter()
                .any(|subordinate| continuous[subordinate]),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inspection(area: Option<&str>, failed: bool) -> AqlInspection {
        AqlInspection {
            employee_id: None,
            failed,
            area: area.map(str::to_string),
        }
    }

    #[test]
    fn attendance_thresholds_are_inclusive() {
        let limits = AttendanceThresholds::default();
        let facts = AttendanceFacts {
            total_working_days: 22.0,
            actual_working_days: 12.0,
            unapproved_absence_days: 2.0,
            absence_rate_percent: 12.0,
            ..AttendanceFacts::default()
        };
        assert!(attendance_check(&facts, &limits).passed());

        let short = AttendanceFacts {
            actual_working_days: 11.5,
            ..facts
        };
        let check = attendance_check(&short, &limits);
        assert!(!check.minimum_days_met);
        assert!(!check.passed());

        let absent = AttendanceFacts {
            unapproved_absence_days: 3.0,
            ..facts
        };
        assert!(!attendance_check(&absent, &limits).unapproved_within_limit);
    }

    #[test]
    fn terminated_employees_fail_every_attendance_check() {
        let facts = AttendanceFacts {
            total_working_days: 22.0,
            actual_working_days: 22.0,
            terminated: true,
            ..AttendanceFacts::default()
        };
        assert_eq!(
            attendance_check(&facts, &AttendanceThresholds::default()),
            AttendanceCheck::default()
        );
    }

    #[test]
    fn reject_rates_by_area_and_facility() {
        let rates = RejectRates::from_inspections(&[
            inspection(Some("B"), true),
            inspection(Some("B"), false),
            inspection(Some("C"), false),
            inspection(None, false),
        ]);
        assert!((rates.area("B").rate_percent() - 50.0).abs() < 1e-9);
        assert_eq!(rates.area("D").rate_percent(), 0.0);
        assert!((rates.facility().rate_percent() - 25.0).abs() < 1e-9);
        assert_eq!(
            rates.for_assignment(&AreaAssignment::Facility),
            rates.facility()
        );
    }
}
