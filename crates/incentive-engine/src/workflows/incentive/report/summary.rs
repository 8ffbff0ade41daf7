use super::super::domain::{Archetype, PayoutReason};
use super::super::store::ResultRow;
use super::views::{ArchetypeEntry, NoteCountEntry, ReasonEntry, RunReportSummary};
use crate::period::EvaluationMonth;
use crate::workflows::audit::{AuditKind, AuditNote};
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct ArchetypeTotals {
    pub headcount: usize,
    pub paid: usize,
    pub total_amount: u64,
}

/// Aggregates of one materialized month.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub month: EvaluationMonth,
    pub archetypes: HashMap<Archetype, ArchetypeTotals>,
    pub unpaid_reasons: HashMap<PayoutReason, usize>,
    pub notes: HashMap<AuditKind, usize>,
}

impl RunReport {
    pub fn from_rows(month: EvaluationMonth, rows: &[ResultRow]) -> Self {
        let mut archetypes: HashMap<Archetype, ArchetypeTotals> = HashMap::new();
        let mut unpaid_reasons = HashMap::new();
        for row in rows {
            let totals = archetypes.entry(row.archetype).or_default();
            totals.headcount += 1;
            if row.incentive_amount > 0 {
                totals.paid += 1;
                totals.total_amount += row.incentive_amount;
            } else {
                *unpaid_reasons.entry(row.reason).or_insert(0) += 1;
            }
        }
        Self {
            month,
            archetypes,
            unpaid_reasons,
            notes: HashMap::new(),
        }
    }

    pub fn with_notes(mut self, notes: &[AuditNote]) -> Self {
        for note in notes {
            *self.notes.entry(note.kind).or_insert(0) += 1;
        }
        self
    }

    pub fn summary(&self) -> RunReportSummary {
        let archetypes: Vec<ArchetypeEntry> = Archetype::ordered()
            .into_iter()
            .filter_map(|archetype| {
                self.archetypes.get(&archetype).map(|totals| ArchetypeEntry {
                    archetype,
                    archetype_label: archetype.label(),
                    headcount: totals.headcount,
                    paid: totals.paid,
                    total_amount: totals.total_amount,
                    average_paid_amount: if totals.paid > 0 {
                        (totals.total_amount as f64 / totals.paid as f64).round() as u64
                    } else {
                        0
                    },
                })
            })
            .collect();

        let mut unpaid_reasons: Vec<ReasonEntry> = self
            .unpaid_reasons
            .iter()
            .map(|(reason, count)| ReasonEntry {
                reason: *reason,
                summary: reason.summary(),
                count: *count,
            })
            .collect();
        unpaid_reasons.sort_by(|left, right| {
            right
                .count
                .cmp(&left.count)
                .then_with(|| left.summary.cmp(right.summary))
        });

        let mut audit_notes: Vec<NoteCountEntry> = self
            .notes
            .iter()
            .map(|(kind, count)| NoteCountEntry {
                kind: *kind,
                label: kind.label(),
                count: *count,
            })
            .collect();
        audit_notes.sort_by_key(|entry| entry.kind);

        RunReportSummary {
            month: self.month,
            headcount: archetypes.iter().map(|entry| entry.headcount).sum(),
            paid: archetypes.iter().map(|entry| entry.paid).sum(),
            total_amount: archetypes.iter().map(|entry| entry.total_amount).sum(),
            archetypes,
            unpaid_reasons,
            audit_notes,
        }
    }
}

impl RunReportSummary {
    /// Plain-text rendering for terminals and logs.
    pub fn render_text(&self) -> String {
        let mut lines = vec![format!(
            "{}: {} employees, {} paid, total {} VND",
            self.month, self.headcount, self.paid, self.total_amount
        )];
        for entry in &self.archetypes {
            lines.push(format!(
                "  {:<20} {:>5} employees {:>5} paid {:>14} VND (avg {})",
                entry.archetype_label,
                entry.headcount,
                entry.paid,
                entry.total_amount,
                entry.average_paid_amount
            ));
        }
        if !self.unpaid_reasons.is_empty() {
            lines.push("unpaid:".to_string());
            for entry in &self.unpaid_reasons {
                lines.push(format!("  {:>5}  {}", entry.count, entry.summary));
            }
        }
        if !self.audit_notes.is_empty() {
            lines.push("audit notes:".to_string());
            for entry in &self.audit_notes {
                lines.push(format!("  {:>5}  {}", entry.count, entry.label));
            }
        }
        lines.join("\n")
    }
}
