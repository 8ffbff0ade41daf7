use super::domain::{ConditionFlags, EmployeeRecord, Payout, PayoutReason};
use super::policy::IncentivePolicy;

fn attendance_veto(record: &EmployeeRecord) -> Option<Payout> {
    (!record.conditions.attendance.passed()).then(|| Payout::zero(PayoutReason::AttendanceGate))
}

fn aql_block(conditions: &ConditionFlags) -> Option<PayoutReason> {
    if conditions.aql_passed() {
        return None;
    }
    Some(if conditions.aql_current_clear {
        PayoutReason::AqlContinuousFailure
    } else {
        PayoutReason::AqlCurrentFailure
    })
}

fn escalated(record: &EmployeeRecord, policy: &IncentivePolicy) -> Payout {
    let amount = policy.escalation.amount_for(record.continuity.qualifying_months);
    Payout {
        part1: amount,
        ..Payout::paid(amount)
    }
}

fn rounded(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}

fn mean_of_positive(amounts: &[u64]) -> Option<f64> {
    let paid: Vec<u64> = amounts.iter().copied().filter(|amount| *amount > 0).collect();
    if paid.is_empty() {
        return None;
    }
    Some(paid.iter().sum::<u64>() as f64 / paid.len() as f64)
}

pub(crate) fn assembly_inspector(record: &EmployeeRecord, policy: &IncentivePolicy) -> Payout {
    if let Some(vetoed) = attendance_veto(record) {
        return vetoed;
    }
    if let Some(reason) = aql_block(&record.conditions) {
        return Payout::zero(reason);
    }
    if !record.conditions.prs_passed() {
        return Payout::zero(PayoutReason::PrsNotMet);
    }
    escalated(record, policy)
}

/// Escalation part, certification bonus and claim-free bonus, each decided on its own.
pub(crate) fn aql_inspector(record: &EmployeeRecord, policy: &IncentivePolicy) -> Payout {
    if let Some(vetoed) = attendance_veto(record) {
        return vetoed;
    }
    if let Some(reason) = aql_block(&record.conditions) {
        return Payout::zero(reason);
    }

    let claim_free_months = record.previous.claim_free_months.saturating_add(1);
    let part1 = policy.escalation.amount_for(record.continuity.qualifying_months);
    let part2 = if policy.is_certified(&record.employee_id) {
        policy.certification_bonus
    } else {
        0
    };
    let part3 = policy.claim_free_bands.amount_for(claim_free_months);

    Payout {
        amount: part1 + part2 + part3,
        part1,
        part2,
        part3,
        claim_free_months,
        reason: PayoutReason::Paid,
    }
}

fn area_gated(record: &EmployeeRecord, policy: &IncentivePolicy, area_clear: Option<bool>) -> Payout {
    if let Some(vetoed) = attendance_veto(record) {
        return vetoed;
    }
    if let Some(reason) = aql_block(&record.conditions) {
        return Payout::zero(reason);
    }
    match area_clear {
        None => return Payout::zero(PayoutReason::NoAreaAssignment),
        Some(false) => return Payout::zero(PayoutReason::AreaRejectRate),
        Some(true) => {}
    }
    if record.conditions.subordinate_continuous_fail {
        return Payout::zero(PayoutReason::SubordinateContinuousFailure);
    }
    escalated(record, policy)
}

pub(crate) fn auditor_trainer(record: &EmployeeRecord, policy: &IncentivePolicy) -> Payout {
    area_gated(record, policy, record.conditions.assigned_area_clear)
}

pub(crate) fn model_master(record: &EmployeeRecord, policy: &IncentivePolicy) -> Payout {
    area_gated(record, policy, Some(record.conditions.facility_clear))
}

/// `rate × sum × (paid subordinates / all subordinates)`.
pub(crate) fn line_leader(
    record: &EmployeeRecord,
    policy: &IncentivePolicy,
    subordinate_amounts: &[u64],
) -> Payout {
    if let Some(vetoed) = attendance_veto(record) {
        return vetoed;
    }
    if record.conditions.subordinate_continuous_fail {
        return Payout::zero(PayoutReason::SubordinateContinuousFailure);
    }

    let total = subordinate_amounts.len();
    let receiving = subordinate_amounts.iter().filter(|amount| **amount > 0).count();
    if receiving == 0 {
        return Payout::zero(PayoutReason::NoSubordinates);
    }
    let sum: u64 = subordinate_amounts.iter().sum();
    let amount = rounded(policy.line_leader_rate * sum as f64 * receiving as f64 / total as f64);
    if amount == 0 {
        return Payout::zero(PayoutReason::NoSubordinates);
    }
    Payout::paid(amount)
}

/// Multiplier applied to the mean of paid Line Leader amounts in the subtree.
pub(crate) fn hierarchy_average(
    record: &EmployeeRecord,
    multiplier: f64,
    line_leader_amounts: &[u64],
) -> Payout {
    if let Some(vetoed) = attendance_veto(record) {
        return vetoed;
    }
    match mean_of_positive(line_leader_amounts) {
        Some(mean) => match rounded(multiplier * mean) {
            0 => Payout::zero(PayoutReason::NoQualifyingLineLeaders),
            amount => Payout::paid(amount),
        },
        None => Payout::zero(PayoutReason::NoQualifyingLineLeaders),
    }
}

/// `peer_amounts` is `None` when the position has no configured equivalent.
pub(crate) fn type2_mapped(record: &EmployeeRecord, peer_amounts: Option<&[u64]>) -> Payout {
    if let Some(vetoed) = attendance_veto(record) {
        return vetoed;
    }
    let Some(peer_amounts) = peer_amounts else {
        return Payout::zero(PayoutReason::NoPositionMapping);
    };
    match mean_of_positive(peer_amounts) {
        Some(mean) => Payout::paid(rounded(mean)),
        None => Payout::zero(PayoutReason::NoMappedPeers),
    }
}

pub(crate) fn manual_input(record: &EmployeeRecord, supplied: Option<u64>) -> Payout {
    if let Some(vetoed) = attendance_veto(record) {
        return vetoed;
    }
    match supplied {
        Some(amount) => Payout {
            amount,
            reason: PayoutReason::ManualAmount,
            ..Payout::default()
        },
        None => Payout::zero(PayoutReason::NoManualAmount),
    }
}

pub(crate) fn needs_manual_amount(record: &EmployeeRecord) -> bool {
    record.conditions.attendance.passed()
}
