use crate::period::EvaluationMonth;
use crate::workflows::sources::EmployeeId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Declared payroll classification from the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RoleType {
    #[serde(rename = "TYPE-1")]
    Type1,
    #[serde(rename = "TYPE-2")]
    Type2,
    #[serde(rename = "TYPE-3")]
    Type3,
    #[default]
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl RoleType {
    pub fn parse(raw: &str) -> Self {
        let compact: String = raw
            .chars()
            .filter(|ch| ch.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_uppercase();
        match compact.trim_start_matches("TYPE") {
            "1" => RoleType::Type1,
            "2" => RoleType::Type2,
            "3" => RoleType::Type3,
            _ => RoleType::Unknown,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            RoleType::Type1 => "TYPE-1",
            RoleType::Type2 => "TYPE-2",
            RoleType::Type3 => "TYPE-3",
            RoleType::Unknown => "UNKNOWN",
        }
    }
}

/// Order in which archetypes are resolved. Later stages read amounts of earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EvaluationStage {
    IndividualContributor,
    LineLead,
    Management,
    Mapped,
}

/// Payout archetype an employee is classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    AssemblyInspector,
    AqlInspector,
    AuditorTrainer,
    ModelMaster,
    LineLeader,
    GroupLeader,
    Supervisor,
    AssistantManager,
    Manager,
    SeniorManager,
    ManualInput,
    Type2Mapped,
    Excluded,
    #[default]
    Unmapped,
}

impl Archetype {
    pub const fn ordered() -> [Archetype; 14] {
        [
            Archetype::AssemblyInspector,
            Archetype::AqlInspector,
            Archetype::AuditorTrainer,
            Archetype::ModelMaster,
            Archetype::LineLeader,
            Archetype::GroupLeader,
            Archetype::Supervisor,
            Archetype::AssistantManager,
            Archetype::Manager,
            Archetype::SeniorManager,
            Archetype::ManualInput,
            Archetype::Type2Mapped,
            Archetype::Excluded,
            Archetype::Unmapped,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Archetype::AssemblyInspector => "Assembly Inspector",
            Archetype::AqlInspector => "AQL Inspector",
            Archetype::AuditorTrainer => "Auditor/Trainer",
            Archetype::ModelMaster => "Model Master",
            Archetype::LineLeader => "Line Leader",
            Archetype::GroupLeader => "Head/Group Leader",
            Archetype::Supervisor => "(Vice) Supervisor",
            Archetype::AssistantManager => "Assistant Manager",
            Archetype::Manager => "Manager",
            Archetype::SeniorManager => "Senior Manager",
            Archetype::ManualInput => "Manual Input",
            Archetype::Type2Mapped => "Type-2 Mapped",
            Archetype::Excluded => "Type-3 Excluded",
            Archetype::Unmapped => "Unmapped",
        }
    }

    pub const fn stage(self) -> EvaluationStage {
        match self {
            Archetype::LineLeader => EvaluationStage::LineLead,
            Archetype::GroupLeader
            | Archetype::Supervisor
            | Archetype::AssistantManager
            | Archetype::Manager
            | Archetype::SeniorManager => EvaluationStage::Management,
            Archetype::Type2Mapped => EvaluationStage::Mapped,
            Archetype::AssemblyInspector
            | Archetype::AqlInspector
            | Archetype::AuditorTrainer
            | Archetype::ModelMaster
            | Archetype::ManualInput
            | Archetype::Excluded
            | Archetype::Unmapped => EvaluationStage::IndividualContributor,
        }
    }
}

/// Working-day facts after termination handling.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AttendanceFacts {
    pub total_working_days: f64,
    pub actual_working_days: f64,
    pub unapproved_absence_days: f64,
    pub absence_rate_percent: f64,
    /// No attendance row was found; all values are the "no data" sentinel.
    pub missing: bool,
    /// Terminated before the evaluation month began.
    pub terminated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct QualityFacts {
    pub aql_failures_current_month: u32,
    pub continuous_aql_fail: bool,
    pub audit_volume: f64,
    pub audit_pass_rate_percent: f64,
}

/// Last month's materialized values for this employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PriorResult {
    pub incentive_amount: u64,
    /// Escalation-table component, when the prior table recorded one.
    pub part1_amount: Option<u64>,
    pub claim_free_months: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttendanceCheck {
    pub has_presence: bool,
    pub unapproved_within_limit: bool,
    pub absence_rate_within_limit: bool,
    pub minimum_days_met: bool,
}

impl AttendanceCheck {
    pub const fn passed(&self) -> bool {
        self.has_presence
            && self.unapproved_within_limit
            && self.absence_rate_within_limit
            && self.minimum_days_met
    }
}

/// Named conditions derived for every employee.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConditionFlags {
    pub attendance: AttendanceCheck,
    pub aql_current_clear: bool,
    pub aql_no_continuous_fail: bool,
    pub prs_volume_met: bool,
    pub prs_pass_rate_met: bool,
    /// Reject rate of the configured inspection area; `None` without an assignment.
    pub assigned_area_reject_rate: Option<f64>,
    pub facility_reject_rate: f64,
    pub assigned_area_clear: Option<bool>,
    pub facility_clear: bool,
    pub subordinate_continuous_fail: bool,
}

impl ConditionFlags {
    pub const fn aql_passed(&self) -> bool {
        self.aql_current_clear && self.aql_no_continuous_fail
    }

    pub const fn prs_passed(&self) -> bool {
        self.prs_volume_met && self.prs_pass_rate_met
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Continuity {
    /// Months of qualification carried from last month's amount.
    pub prior_months: u32,
    /// Months used to pick this month's tier.
    pub qualifying_months: u32,
}

/// Why an employee received (or did not receive) an amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutReason {
    #[default]
    Pending,
    Paid,
    ManualAmount,
    AttendanceGate,
    AqlCurrentFailure,
    AqlContinuousFailure,
    PrsNotMet,
    AreaRejectRate,
    NoAreaAssignment,
    SubordinateContinuousFailure,
    NoSubordinates,
    NoQualifyingLineLeaders,
    NoPositionMapping,
    NoMappedPeers,
    NoManualAmount,
    Excluded,
    Unmapped,
}

impl PayoutReason {
    pub fn summary(self) -> &'static str {
        match self {
            PayoutReason::Pending => "not evaluated",
            PayoutReason::Paid => "all conditions met",
            PayoutReason::ManualAmount => "operator supplied amount",
            PayoutReason::AttendanceGate => "attendance conditions not met",
            PayoutReason::AqlCurrentFailure => "AQL failure this month",
            PayoutReason::AqlContinuousFailure => "AQL failures in three consecutive months",
            PayoutReason::PrsNotMet => "5PRS volume or pass rate below threshold",
            PayoutReason::AreaRejectRate => "area reject rate at or above limit",
            PayoutReason::NoAreaAssignment => "no inspection area assigned",
            PayoutReason::SubordinateContinuousFailure => {
                "a subordinate has three consecutive months of AQL failures"
            }
            PayoutReason::NoSubordinates => "no Type-1 subordinate received an amount",
            PayoutReason::NoQualifyingLineLeaders => "no line leader in subtree received an amount",
            PayoutReason::NoPositionMapping => "no equivalent Type-1 position configured",
            PayoutReason::NoMappedPeers => "no paid Type-1 employee in the equivalent position",
            PayoutReason::NoManualAmount => "no operator amount supplied",
            PayoutReason::Excluded => "Type-3 roles receive no incentive",
            PayoutReason::Unmapped => "position does not match a payout archetype",
        }
    }
}

/// Computed payout and its components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Payout {
    pub amount: u64,
    pub part1: u64,
    pub part2: u64,
    pub part3: u64,
    pub claim_free_months: u32,
    pub reason: PayoutReason,
}

impl Payout {
    pub fn zero(reason: PayoutReason) -> Self {
        Self {
            reason,
            ..Self::default()
        }
    }

    pub fn paid(amount: u64) -> Self {
        Self {
            amount,
            reason: PayoutReason::Paid,
            ..Self::default()
        }
    }
}

/// One employee's evaluation record for one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeRecord {
    pub employee_id: EmployeeId,
    pub name: String,
    pub role_type: RoleType,
    pub position_name: String,
    /// Back-reference only; the table owns every record.
    pub manager_id: Option<EmployeeId>,
    pub entrance_date: Option<NaiveDate>,
    pub termination_date: Option<NaiveDate>,
    pub attendance: AttendanceFacts,
    pub quality: QualityFacts,
    pub previous: PriorResult,
    pub conditions: ConditionFlags,
    pub continuity: Continuity,
    pub archetype: Archetype,
    pub payout: Payout,
}

impl EmployeeRecord {
    pub fn new(employee_id: EmployeeId, role_type: RoleType, position_name: impl Into<String>) -> Self {
        Self {
            employee_id,
            name: String::new(),
            role_type,
            position_name: position_name.into(),
            manager_id: None,
            entrance_date: None,
            termination_date: None,
            attendance: AttendanceFacts::default(),
            quality: QualityFacts::default(),
            previous: PriorResult::default(),
            conditions: ConditionFlags::default(),
            continuity: Continuity::default(),
            archetype: Archetype::Unmapped,
            payout: Payout::default(),
        }
    }

    pub fn incentive_amount(&self) -> u64 {
        self.payout.amount
    }

    pub fn previous_month_incentive_amount(&self) -> u64 {
        self.previous.incentive_amount
    }

    pub fn continuous_qualifying_months(&self) -> u32 {
        self.continuity.qualifying_months
    }
}

/// The month's evaluation context, threaded mutably through every stage.
#[derive(Debug, Clone)]
pub struct MonthlyTable {
    month: EvaluationMonth,
    records: Vec<EmployeeRecord>,
    index: HashMap<EmployeeId, usize>,
}

impl MonthlyTable {
    /// Sorts by employee id so every downstream pass is deterministic.
    pub fn new(month: EvaluationMonth, mut records: Vec<EmployeeRecord>) -> Self {
        records.sort_by(|left, right| left.employee_id.cmp(&right.employee_id));
        records.dedup_by(|later, earlier| later.employee_id == earlier.employee_id);
        let index = records
            .iter()
            .enumerate()
            .map(|(position, record)| (record.employee_id.clone(), position))
            .collect();
        Self {
            month,
            records,
            index,
        }
    }

    pub fn month(&self) -> EvaluationMonth {
        self.month
    }

    pub fn records(&self) -> &[EmployeeRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [EmployeeRecord] {
        &mut self.records
    }

    pub fn position(&self, employee_id: &EmployeeId) -> Option<usize> {
        self.index.get(employee_id).copied()
    }

    pub fn get(&self, employee_id: &EmployeeId) -> Option<&EmployeeRecord> {
        self.position(employee_id).map(|position| &self.records[position])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
