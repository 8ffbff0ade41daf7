use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Recoverable conditions absorbed during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    MissingColumn,
    MissingRecord,
    AmbiguousDate,
    OutOfPeriodRows,
    MissingHistory,
    UnresolvedManager,
    HierarchyCycle,
    UnmappedArchetype,
}

impl AuditKind {
    pub const fn label(self) -> &'static str {
        match self {
            AuditKind::MissingColumn => "missing column",
            AuditKind::MissingRecord => "missing record",
            AuditKind::AmbiguousDate => "unparseable date",
            AuditKind::OutOfPeriodRows => "rows outside period",
            AuditKind::MissingHistory => "missing history",
            AuditKind::UnresolvedManager => "unresolved manager",
            AuditKind::HierarchyCycle => "hierarchy cycle",
            AuditKind::UnmappedArchetype => "unmapped archetype",
        }
    }

    const fn informational(self) -> bool {
        matches!(self, AuditKind::UnmappedArchetype | AuditKind::UnresolvedManager)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditNote {
    pub kind: AuditKind,
    pub subject: String,
    pub detail: String,
}

/// Ordered record of every substitution made while building a month's table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTrail {
    notes: Vec<AuditNote>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, kind: AuditKind, subject: impl Into<String>, detail: impl Into<String>) {
        let note = AuditNote {
            kind,
            subject: subject.into(),
            detail: detail.into(),
        };
        if kind.informational() {
            info!(kind = kind.label(), subject = %note.subject, "{}", note.detail);
        } else {
            warn!(kind = kind.label(), subject = %note.subject, "{}", note.detail);
        }
        self.notes.push(note);
    }

    pub fn notes(&self) -> &[AuditNote] {
        &self.notes
    }

    pub fn count(&self, kind: AuditKind) -> usize {
        self.notes.iter().filter(|note| note.kind == kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}
