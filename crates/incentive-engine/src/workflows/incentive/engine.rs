use super::domain::{Archetype, EvaluationStage, MonthlyTable, Payout, PayoutReason, RoleType};
use super::hierarchy::OrgTree;
use super::overrides::{ManualAmountProvider, ManualAmountRequest, ManualInputError};
use super::policy::IncentivePolicy;
use super::rules;
use std::collections::BTreeMap;
use tracing::debug;

/// Resolves payouts stage by stage: individual contributors, Line Leaders, management
/// and finally Type-2 positions. Each stage only reads amounts fixed by earlier ones.
pub struct IncentiveEngine {
    policy: IncentivePolicy,
}

impl IncentiveEngine {
    pub fn new(policy: IncentivePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &IncentivePolicy {
        &self.policy
    }

    pub fn resolve(
        &self,
        table: &mut MonthlyTable,
        tree: &OrgTree,
        manual: &dyn ManualAmountProvider,
    ) -> Result<(), ManualInputError> {
        self.resolve_individual_contributors(table, manual)?;
        self.resolve_line_leaders(table, tree);
        self.resolve_management(table, tree);
        self.resolve_type2(table);
        Ok(())
    }

    fn positions(table: &MonthlyTable, stage: EvaluationStage) -> Vec<usize> {
        table
            .records()
            .iter()
            .enumerate()
            .filter(|(_, record)| record.archetype.stage() == stage)
            .map(|(position, _)| position)
            .collect()
    }

    fn resolve_individual_contributors(
        &self,
        table: &mut MonthlyTable,
        manual: &dyn ManualAmountProvider,
    ) -> Result<(), ManualInputError> {
        let month = table.month();
        for record in table.records_mut() {
            if record.archetype.stage() != EvaluationStage::IndividualContributor {
                continue;
            }
            record.payout = match record.archetype {
                Archetype::AssemblyInspector => rules::assembly_inspector(record, &self.policy),
                Archetype::AqlInspector => rules::aql_inspector(record, &self.policy),
                Archetype::AuditorTrainer => rules::auditor_trainer(record, &self.policy),
                Archetype::ModelMaster => rules::model_master(record, &self.policy),
                Archetype::ManualInput => {
                    let supplied = if rules::needs_manual_amount(record) {
                        manual.amount_for(&ManualAmountRequest {
                            month,
                            employee_id: &record.employee_id,
                            name: &record.name,
                            position_name: &record.position_name,
                        })?
                    } else {
                        None
                    };
                    rules::manual_input(record, supplied)
                }
                Archetype::Excluded => Payout::zero(PayoutReason::Excluded),
                _ => Payout::zero(PayoutReason::Unmapped),
            };
        }
        debug!(%month, "individual contributor amounts resolved");
        Ok(())
    }

    fn resolve_line_leaders(&self, table: &mut MonthlyTable, tree: &OrgTree) {
        for position in Self::positions(table, EvaluationStage::LineLead) {
            let records = table.records();
            let amounts: Vec<u64> = tree
                .subtree(position)
                .into_iter()
                .map(|subordinate| &records[subordinate])
                .filter(|subordinate| {
                    subordinate.role_type == RoleType::Type1
                        && subordinate.archetype.stage() == EvaluationStage::IndividualContributor
                })
                .map(|subordinate| subordinate.payout.amount)
                .collect();
            let payout = rules::line_leader(&records[position], &self.policy, &amounts);
            table.records_mut()[position].payout = payout;
        }
        debug!(month = %table.month(), "line leader amounts resolved");
    }

    fn resolve_management(&self, table: &mut MonthlyTable, tree: &OrgTree) {
        for position in Self::positions(table, EvaluationStage::Management) {
            let records = table.records();
            let record = &records[position];
            let Some(multiplier) = self.policy.multipliers.for_archetype(record.archetype) else {
                continue;
            };
            let amounts: Vec<u64> = tree
                .subtree(position)
                .into_iter()
                .map(|subordinate| &records[subordinate])
                .filter(|subordinate| subordinate.archetype == Archetype::LineLeader)
                .map(|subordinate| subordinate.payout.amount)
                .collect();
            let payout = rules::hierarchy_average(record, multiplier, &amounts);
            table.records_mut()[position].payout = payout;
        }
        debug!(month = %table.month(), "management amounts resolved");
    }

    fn resolve_type2(&self, table: &mut MonthlyTable) {
        let mut type1_by_position: BTreeMap<&str, Vec<u64>> = BTreeMap::new();
        for record in table.records() {
            if record.role_type == RoleType::Type1 {
                type1_by_position
                    .entry(record.position_name.as_str())
                    .or_default()
                    .push(record.payout.amount);
            }
        }

        let payouts: Vec<(usize, Payout)> = Self::positions(table, EvaluationStage::Mapped)
            .into_iter()
            .map(|position| {
                let record = &table.records()[position];
                let payout = match self.policy.type2_equivalent(&record.position_name) {
                    Some(equivalent) => {
                        let peers = type1_by_position
                            .get(equivalent.as_str())
                            .map(Vec::as_slice)
                            .unwrap_or(&[]);
                        rules::type2_mapped(record, Some(peers))
                    }
                    None => rules::type2_mapped(record, None),
                };
                (position, payout)
            })
            .collect();

        for (position, payout) in payouts {
            table.records_mut()[position].payout = payout;
        }
        debug!(month = %table.month(), "type-2 amounts resolved");
    }
}
