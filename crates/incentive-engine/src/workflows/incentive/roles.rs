use super::domain::{Archetype, EmployeeRecord, MonthlyTable, RoleType};
use super::policy::IncentivePolicy;
use crate::workflows::audit::{AuditKind, AuditTrail};

/// Classifies one record by role type, then manual positions, then ordered position rules.
pub fn classify(record: &EmployeeRecord, policy: &IncentivePolicy) -> Archetype {
    match record.role_type {
        RoleType::Type3 => Archetype::Excluded,
        RoleType::Type2 => Archetype::Type2Mapped,
        RoleType::Unknown => Archetype::Unmapped,
        RoleType::Type1 if policy.is_manual_position(&record.position_name) => Archetype::ManualInput,
        RoleType::Type1 => policy
            .archetype_for_position(&record.position_name)
            .unwrap_or(Archetype::Unmapped),
    }
}

pub fn assign(table: &mut MonthlyTable, policy: &IncentivePolicy, audit: &mut AuditTrail) {
    for record in table.records_mut() {
        record.archetype = classify(record, policy);
        if record.archetype == Archetype::Unmapped {
            audit.record(
                AuditKind::UnmappedArchetype,
                record.employee_id.as_str(),
                format!(
                    "{} position '{}' matches no payout archetype",
                    record.role_type.label(),
                    record.position_name
                ),
            );
        }
    }
}
