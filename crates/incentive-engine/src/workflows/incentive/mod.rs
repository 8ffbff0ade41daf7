//! Monthly incentive resolution.
//!
//! A run merges the month's source tables into one [`EmployeeRecord`] per roster employee,
//! derives condition flags, reads continuity from last month's materialized results,
//! classifies archetypes and resolves payouts bottom-up over the reporting tree. The
//! finished table is materialized through a [`ResultStore`] and seeds the following month.

pub mod conditions;
pub mod continuity;
pub mod domain;
mod engine;
pub mod hierarchy;
pub mod merge;
pub mod overrides;
mod pipeline;
pub mod policy;
pub mod report;
pub mod roles;
mod rules;
pub mod store;

#[cfg(test)]
mod tests;

pub use domain::{
    Archetype, AttendanceCheck, AttendanceFacts, ConditionFlags, Continuity, EmployeeRecord,
    EvaluationStage, MonthlyTable, Payout, PayoutReason, PriorResult, QualityFacts, RoleType,
};
pub use engine::IncentiveEngine;
pub use hierarchy::OrgTree;
pub use overrides::{
    FixedManualAmounts, ManualAmountProvider, ManualAmountRequest, ManualInputError,
    NoManualAmounts,
};
pub use pipeline::{MonthOutcome, MonthlyRun, PipelineError, RunOutcome};
pub use policy::{
    AreaAssignment, AttendanceThresholds, ClaimFreeBand, ClaimFreeBands, EscalationTable,
    HierarchyMultipliers, IncentivePolicy, PolicyError, PositionRule, PrsThresholds,
};
pub use report::{EmployeeExplanation, RunReport, RunReportSummary};
pub use store::{
    CsvResultStore, InMemoryResultStore, PriorResults, ResultRow, ResultStore, ResultStoreError,
};
