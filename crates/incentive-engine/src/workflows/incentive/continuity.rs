use super::domain::{Continuity, MonthlyTable, PriorResult};
use super::policy::EscalationTable;

/// Consecutive qualifying months implied by last month's payout.
///
/// The escalation component is preferred when the prior table recorded one, so
/// components added on top (certification, claim-free bonus) do not break the lookup.
/// Zero or an amount matching no tier means the chain was broken.
pub fn prior_months(previous: &PriorResult, table: &EscalationTable) -> u32 {
    let amount = previous.part1_amount.unwrap_or(previous.incentive_amount);
    table.months_for(amount).unwrap_or(0)
}

pub fn continuity_for(previous: &PriorResult, table: &EscalationTable) -> Continuity {
    let prior = prior_months(previous, table);
    Continuity {
        prior_months: prior,
        qualifying_months: (prior + 1).min(table.max_months()),
    }
}

/// Sets the continuity counters on every record from its prior result.
pub fn apply(table: &mut MonthlyTable, escalation: &EscalationTable) {
    for record in table.records_mut() {
        record.continuity = continuity_for(&record.previous, escalation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn previous(amount: u64) -> PriorResult {
        PriorResult {
            incentive_amount: amount,
            ..PriorResult::default()
        }
    }

    #[test]
    fn exact_tier_match_advances_one_month() {
        let table = EscalationTable::default();
        let continuity = continuity_for(&previous(250_000), &table);
        assert_eq!(continuity.prior_months, 2);
        assert_eq!(continuity.qualifying_months, 3);
        assert_eq!(table.amount_for(continuity.qualifying_months), 300_000);
    }

    #[test]
    fn broken_chains_restart_at_one() {
        let table = EscalationTable::default();
        for amount in [0, 260_000, 32_667] {
            assert_eq!(continuity_for(&previous(amount), &table).qualifying_months, 1);
        }
    }

    #[test]
    fn top_tier_is_capped() {
        let table = EscalationTable::default();
        let continuity = continuity_for(&previous(1_000_000), &table);
        assert_eq!(continuity.prior_months, 12);
        assert_eq!(continuity.qualifying_months, 12);
    }

    #[test]
    fn escalation_component_wins_over_total() {
        let table = EscalationTable::default();
        let previous = PriorResult {
            incentive_amount: 750_000,
            part1_amount: Some(450_000),
            claim_free_months: 4,
        };
        assert_eq!(prior_months(&previous, &table), 6);
    }
}
