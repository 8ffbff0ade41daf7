use std::cell::Cell;

use super::common::*;
use crate::workflows::incentive::domain::{Archetype, PayoutReason, RoleType};
use crate::workflows::incentive::overrides::{
    FixedManualAmounts, ManualAmountProvider, ManualAmountRequest, ManualInputError,
};
use crate::workflows::incentive::policy::AreaAssignment;
use crate::workflows::incentive::{IncentivePolicy, NoManualAmounts, PriorResult};
use crate::workflows::sources::AqlInspection;

#[test]
fn assembly_inspector_advances_one_tier() {
    let table = resolve(vec![with_prior(inspector("1"), 250_000)]);

    let record = table.get(&id("1")).expect("record");
    assert_eq!(record.continuous_qualifying_months(), 3);
    assert_eq!(record.incentive_amount(), 300_000);
    assert_eq!(record.payout.reason, PayoutReason::Paid);
}

#[test]
fn low_audit_volume_blocks_assembly_inspector() {
    let mut record = with_prior(inspector("1"), 250_000);
    record.quality.audit_volume = 80.0;

    let table = resolve(vec![record]);

    let record = table.get(&id("1")).expect("record");
    assert_eq!(record.incentive_amount(), 0);
    assert_eq!(record.payout.reason, PayoutReason::PrsNotMet);
}

#[test]
fn current_and_continuous_aql_failures_block_inspectors() {
    let mut failed_now = inspector("1");
    failed_now.quality.aql_failures_current_month = 1;
    let mut failing_streak = inspector("2");
    failing_streak.quality.continuous_aql_fail = true;

    let table = resolve(vec![failed_now, failing_streak]);

    assert_eq!(
        table.get(&id("1")).map(|record| record.payout.reason),
        Some(PayoutReason::AqlCurrentFailure)
    );
    assert_eq!(
        table.get(&id("2")).map(|record| record.payout.reason),
        Some(PayoutReason::AqlContinuousFailure)
    );
}

#[test]
fn line_leader_scales_by_receiving_ratio() {
    let table = resolve(vec![
        reporting_to(with_prior(inspector("1"), 250_000), "9"),
        reporting_to(absent(inspector("2")), "9"),
        reporting_to(with_prior(inspector("3"), 350_000), "9"),
        employee("9", RoleType::Type1, "LINE LEADER"),
    ]);

    assert_eq!(amount(&table, "1"), 300_000);
    assert_eq!(amount(&table, "2"), 0);
    assert_eq!(amount(&table, "3"), 400_000);
    assert_eq!(amount(&table, "9"), 32_667);
}

#[test]
fn line_leader_counts_transitive_type1_subordinates_only() {
    let table = resolve(vec![
        employee("9", RoleType::Type1, "LINE LEADER"),
        reporting_to(employee("8", RoleType::Type2, "LINE LEADER"), "9"),
        reporting_to(with_prior(inspector("1"), 250_000), "8"),
    ]);

    assert_eq!(amount(&table, "9"), 21_000);
}

#[test]
fn any_continuous_failure_in_subtree_vetoes_line_leader() {
    let mut streak = reporting_to(inspector("2"), "1");
    streak.quality.continuous_aql_fail = true;
    let table = resolve(vec![
        reporting_to(with_prior(inspector("1"), 250_000), "9"),
        streak,
        employee("9", RoleType::Type1, "LINE LEADER"),
    ]);

    let leader = table.get(&id("9")).expect("leader");
    assert_eq!(leader.incentive_amount(), 0);
    assert_eq!(leader.payout.reason, PayoutReason::SubordinateContinuousFailure);
    assert_eq!(amount(&table, "1"), 300_000);
}

fn two_team_plant() -> Vec<crate::workflows::incentive::EmployeeRecord> {
    vec![
        reporting_to(with_prior(inspector("1"), 250_000), "11"),
        reporting_to(with_prior(inspector("2"), 350_000), "12"),
        reporting_to(employee("11", RoleType::Type1, "LINE LEADER"), "20"),
        reporting_to(employee("12", RoleType::Type1, "LINE LEADER"), "20"),
        reporting_to(employee("20", RoleType::Type1, "GROUP LEADER"), "30"),
        reporting_to(employee("30", RoleType::Type1, "MANAGER"), "40"),
        reporting_to(employee("40", RoleType::Type1, "SENIOR MANAGER"), "50"),
        employee("50", RoleType::Type1, "(V) SUPERVISOR"),
    ]
}

#[test]
fn management_averages_paid_line_leaders() {
    let table = resolve(two_team_plant());

    assert_eq!(amount(&table, "11"), 21_000);
    assert_eq!(amount(&table, "12"), 28_000);
    assert_eq!(amount(&table, "20"), 49_000);
    assert_eq!(amount(&table, "30"), 85_750);
    assert_eq!(amount(&table, "40"), 98_000);
    assert_eq!(amount(&table, "50"), 61_250);
}

#[test]
fn manager_never_exceeds_multiplier_times_best_line_leader() {
    let table = resolve(two_team_plant());
    let best_leader = amount(&table, "11").max(amount(&table, "12"));
    let policy = IncentivePolicy::default();
    assert!(amount(&table, "30") as f64 <= policy.multipliers.manager * best_leader as f64);
}

#[test]
fn managers_without_paid_line_leaders_get_nothing() {
    let table = resolve(vec![
        reporting_to(absent(inspector("1")), "11"),
        reporting_to(employee("11", RoleType::Type1, "LINE LEADER"), "30"),
        employee("30", RoleType::Type1, "MANAGER"),
    ]);

    let manager = table.get(&id("30")).expect("manager");
    assert_eq!(manager.incentive_amount(), 0);
    assert_eq!(manager.payout.reason, PayoutReason::NoQualifyingLineLeaders);
}

#[test]
fn type2_positions_follow_paid_type1_peers() {
    let table = resolve(vec![
        reporting_to(with_prior(inspector("1"), 250_000), "11"),
        reporting_to(with_prior(inspector("2"), 350_000), "12"),
        employee("11", RoleType::Type1, "LINE LEADER"),
        employee("12", RoleType::Type1, "LINE LEADER"),
        employee("13", RoleType::Type1, "LINE LEADER"),
        employee("60", RoleType::Type2, "LINE LEADER"),
        employee("61", RoleType::Type2, "CUTTING TEAM"),
    ]);

    assert_eq!(amount(&table, "13"), 0);
    assert_eq!(amount(&table, "60"), 24_500);
    let unmapped = table.get(&id("61")).expect("type-2 without mapping");
    assert_eq!(unmapped.incentive_amount(), 0);
    assert_eq!(unmapped.payout.reason, PayoutReason::NoPositionMapping);
}

#[test]
fn type3_is_always_zero() {
    let table = resolve(vec![with_prior(employee("5", RoleType::Type3, "ASSEMBLY INSPECTOR"), 250_000)]);

    let record = table.get(&id("5")).expect("record");
    assert_eq!(record.archetype, Archetype::Excluded);
    assert_eq!(record.incentive_amount(), 0);
}

#[test]
fn attendance_veto_holds_for_every_archetype() {
    let positions = [
        "ASSEMBLY INSPECTOR",
        "AQL INSPECTOR",
        "AUDIT & TRAINING TEAM",
        "MODEL MASTER",
        "LINE LEADER",
        "GROUP LEADER",
        "SUPERVISOR",
        "A.MANAGER",
        "MANAGER",
        "SENIOR MANAGER",
        "SPECIAL QIP",
    ];
    let mut records: Vec<_> = positions
        .iter()
        .enumerate()
        .map(|(index, position)| {
            reporting_to(
                absent(with_prior(employee(&(index + 1).to_string(), RoleType::Type1, position), 250_000)),
                "99",
            )
        })
        .collect();
    records.push(absent(employee("60", RoleType::Type2, "LINE LEADER")));
    records.push(with_prior(inspector("99"), 250_000));

    let policy = IncentivePolicy {
        manual_positions: vec!["SPECIAL QIP".to_string()],
        area_assignments: [(id("3"), AreaAssignment::Facility)].into_iter().collect(),
        ..IncentivePolicy::default()
    };
    let manual = FixedManualAmounts::new().with(id("11"), 500_000);
    let table = resolve_with(records, policy, &[], &manual);

    for record in table.records().iter().filter(|record| record.employee_id != id("99")) {
        assert!(!record.conditions.attendance.passed());
        assert_eq!(
            record.incentive_amount(),
            0,
            "{} ({:?}) paid despite failing attendance",
            record.employee_id,
            record.archetype
        );
        assert_eq!(record.payout.reason, PayoutReason::AttendanceGate);
    }
}

#[test]
fn aql_inspector_sums_three_parts() {
    let mut record = employee("7", RoleType::Type1, "AQL INSPECTOR");
    record.quality.audit_volume = 0.0;
    record.previous = PriorResult {
        incentive_amount: 450_000,
        part1_amount: Some(150_000),
        claim_free_months: 3,
    };
    let policy = IncentivePolicy {
        certification_bonus: 200_000,
        certified_aql_inspectors: [id("7")].into_iter().collect(),
        ..IncentivePolicy::default()
    };

    let table = resolve_with(vec![record], policy, &[], &NoManualAmounts);

    let payout = table.get(&id("7")).expect("record").payout;
    assert_eq!(payout.part1, 250_000);
    assert_eq!(payout.part2, 200_000);
    assert_eq!(payout.claim_free_months, 4);
    assert_eq!(payout.part3, 300_000);
    assert_eq!(payout.amount, 750_000);
}

#[test]
fn aql_failure_resets_claim_free_counter() {
    let mut record = employee("7", RoleType::Type1, "AQL INSPECTOR");
    record.quality.aql_failures_current_month = 2;
    record.previous.claim_free_months = 9;

    let table = resolve(vec![record]);

    let payout = table.get(&id("7")).expect("record").payout;
    assert_eq!(payout.amount, 0);
    assert_eq!(payout.claim_free_months, 0);
}

fn inspection(area: &str, failed: bool) -> AqlInspection {
    AqlInspection {
        employee_id: None,
        failed,
        area: Some(area.to_string()),
    }
}

#[test]
fn auditors_are_gated_by_their_area() {
    let records = vec![
        employee("1", RoleType::Type1, "AUDIT & TRAINING TEAM"),
        employee("2", RoleType::Type1, "AUDIT & TRAINING TEAM"),
        employee("3", RoleType::Type1, "AUDIT & TRAINING TEAM"),
        employee("4", RoleType::Type1, "MODEL MASTER"),
    ];
    let policy = IncentivePolicy {
        area_assignments: [
            (id("1"), AreaAssignment::Building("A".to_string())),
            (id("2"), AreaAssignment::Building("B".to_string())),
        ]
        .into_iter()
        .collect(),
        ..IncentivePolicy::default()
    };
    let mut inspections: Vec<_> = (0..40).map(|_| inspection("A", false)).collect();
    inspections.extend((0..10).map(|index| inspection("B", index == 0)));

    let table = resolve_with(records, policy, &inspections, &NoManualAmounts);

    assert_eq!(amount(&table, "1"), 150_000);
    let high_reject = table.get(&id("2")).expect("auditor 2");
    assert_eq!(high_reject.payout.reason, PayoutReason::AreaRejectRate);
    let unassigned = table.get(&id("3")).expect("auditor 3");
    assert_eq!(unassigned.payout.reason, PayoutReason::NoAreaAssignment);
    // 1 reject in 50 inspections is 2%.
    assert_eq!(amount(&table, "4"), 150_000);
}

#[test]
fn auditor_is_blocked_by_subordinate_streak() {
    let mut streak = reporting_to(inspector("2"), "1");
    streak.quality.continuous_aql_fail = true;
    let policy = IncentivePolicy {
        area_assignments: [(id("1"), AreaAssignment::Facility)].into_iter().collect(),
        ..IncentivePolicy::default()
    };

    let table = resolve_with(
        vec![employee("1", RoleType::Type1, "AUDIT & TRAINING TEAM"), streak],
        policy,
        &[],
        &NoManualAmounts,
    );

    assert_eq!(
        table.get(&id("1")).map(|record| record.payout.reason),
        Some(PayoutReason::SubordinateContinuousFailure)
    );
}

struct CountingProvider {
    calls: Cell<usize>,
}

impl ManualAmountProvider for CountingProvider {
    fn amount_for(&self, request: &ManualAmountRequest<'_>) -> Result<Option<u64>, ManualInputError> {
        self.calls.set(self.calls.get() + 1);
        assert_eq!(request.position_name, "SPECIAL QIP");
        Ok(Some(420_000))
    }
}

#[test]
fn manual_positions_ask_the_provider_only_when_attendance_passes() {
    let provider = CountingProvider { calls: Cell::new(0) };
    let policy = IncentivePolicy {
        manual_positions: vec!["special qip".to_string()],
        ..IncentivePolicy::default()
    };

    let table = resolve_with(
        vec![
            employee("1", RoleType::Type1, "SPECIAL QIP"),
            absent(employee("2", RoleType::Type1, "SPECIAL QIP")),
        ],
        policy,
        &[],
        &provider,
    );

    assert_eq!(provider.calls.get(), 1);
    assert_eq!(amount(&table, "1"), 420_000);
    assert_eq!(
        table.get(&id("1")).map(|record| record.payout.reason),
        Some(PayoutReason::ManualAmount)
    );
    assert_eq!(amount(&table, "2"), 0);
}

#[test]
fn unmapped_positions_pay_nothing() {
    let table = resolve(vec![employee("1", RoleType::Type1, "CUTTING OPERATOR")]);

    let record = table.get(&id("1")).expect("record");
    assert_eq!(record.archetype, Archetype::Unmapped);
    assert_eq!(record.payout.reason, PayoutReason::Unmapped);
}
