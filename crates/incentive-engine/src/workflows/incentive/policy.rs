use super::domain::Archetype;
use crate::workflows::sources::{normalize_name, AttendanceCodes, EmployeeId, FilePatterns};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// Attendance limits shared by every archetype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttendanceThresholds {
    pub max_unapproved_absence_days: f64,
    pub max_absence_rate_percent: f64,
    pub min_actual_working_days: f64,
}

impl Default for AttendanceThresholds {
    fn default() -> Self {
        Self {
            max_unapproved_absence_days: 2.0,
            max_absence_rate_percent: 12.0,
            min_actual_working_days: 12.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrsThresholds {
    pub min_volume: f64,
    pub min_pass_rate_percent: f64,
}

impl Default for PrsThresholds {
    fn default() -> Self {
        Self {
            min_volume: 100.0,
            min_pass_rate_percent: 95.0,
        }
    }
}

/// Monotonically non-decreasing amounts indexed by consecutive qualifying months.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EscalationTable {
    tiers: Vec<u64>,
}

impl Default for EscalationTable {
    fn default() -> Self {
        Self {
            tiers: vec![
                150_000, 250_000, 300_000, 350_000, 400_000, 450_000, 500_000, 650_000, 750_000,
                850_000, 950_000, 1_000_000,
            ],
        }
    }
}

impl EscalationTable {
    pub fn new(tiers: Vec<u64>) -> Self {
        Self { tiers }
    }

    pub fn tiers(&self) -> &[u64] {
        &self.tiers
    }

    /// Highest count the table distinguishes.
    pub fn max_months(&self) -> u32 {
        self.tiers.len() as u32
    }

    /// Amount for `months` consecutive qualifying months. Zero months pays nothing.
    pub fn amount_for(&self, months: u32) -> u64 {
        if months == 0 {
            return 0;
        }
        let index = (months.min(self.max_months()) as usize).saturating_sub(1);
        self.tiers.get(index).copied().unwrap_or(0)
    }

    /// Reverse lookup of an amount paid last month. Amounts at or above the top tier
    /// map to the top; amounts that match no tier yield `None`.
    pub fn months_for(&self, amount: u64) -> Option<u32> {
        let top = *self.tiers.last()?;
        if amount == 0 {
            return None;
        }
        if amount >= top {
            return Some(self.max_months());
        }
        self.tiers
            .iter()
            .position(|tier| *tier == amount)
            .map(|index| index as u32 + 1)
    }

    fn is_monotonic(&self) -> bool {
        self.tiers.windows(2).all(|pair| pair[0] <= pair[1])
    }
}

/// Amount for a run of claim-free months, taken from the highest band reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimFreeBand {
    pub from_months: u32,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimFreeBands {
    bands: Vec<ClaimFreeBand>,
}

impl Default for ClaimFreeBands {
    fn default() -> Self {
        Self {
            bands: [(1, 0), (4, 300_000), (7, 500_000), (10, 700_000), (13, 900_000)]
                .into_iter()
                .map(|(from_months, amount)| ClaimFreeBand {
                    from_months,
                    amount,
                })
                .collect(),
        }
    }
}

impl ClaimFreeBands {
    pub fn new(bands: Vec<ClaimFreeBand>) -> Self {
        Self { bands }
    }

    pub fn amount_for(&self, months: u32) -> u64 {
        if months == 0 {
            return 0;
        }
        self.bands
            .iter()
            .filter(|band| band.from_months <= months)
            .max_by_key(|band| band.from_months)
            .map(|band| band.amount)
            .unwrap_or(0)
    }
}

/// Ratios applied to the mean Line Leader amount of a subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchyMultipliers {
    pub group_leader: f64,
    pub supervisor: f64,
    pub assistant_manager: f64,
    pub manager: f64,
    pub senior_manager: f64,
}

impl Default for HierarchyMultipliers {
    fn default() -> Self {
        Self {
            group_leader: 2.0,
            supervisor: 2.5,
            assistant_manager: 3.0,
            manager: 3.5,
            senior_manager: 4.0,
        }
    }
}

impl HierarchyMultipliers {
    pub fn for_archetype(&self, archetype: Archetype) -> Option<f64> {
        match archetype {
            Archetype::GroupLeader => Some(self.group_leader),
            Archetype::Supervisor => Some(self.supervisor),
            Archetype::AssistantManager => Some(self.assistant_manager),
            Archetype::Manager => Some(self.manager),
            Archetype::SeniorManager => Some(self.senior_manager),
            _ => None,
        }
    }
}

/// Maps a position-name fragment to an archetype. Rules are tried in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRule {
    pub contains: String,
    pub archetype: Archetype,
}

impl PositionRule {
    pub fn new(contains: &str, archetype: Archetype) -> Self {
        Self {
            contains: contains.to_string(),
            archetype,
        }
    }

    pub fn matches(&self, position_name: &str) -> bool {
        let needle = normalize_name(&self.contains);
        !needle.is_empty() && normalize_name(position_name).contains(&needle)
    }
}

fn default_position_rules() -> Vec<PositionRule> {
    vec![
        PositionRule::new("MODEL MASTER", Archetype::ModelMaster),
        PositionRule::new("AUDIT", Archetype::AuditorTrainer),
        PositionRule::new("TRAINER", Archetype::AuditorTrainer),
        PositionRule::new("AQL", Archetype::AqlInspector),
        PositionRule::new("SENIOR MANAGER", Archetype::SeniorManager),
        PositionRule::new("S.MANAGER", Archetype::SeniorManager),
        PositionRule::new("ASSISTANT MANAGER", Archetype::AssistantManager),
        PositionRule::new("A.MANAGER", Archetype::AssistantManager),
        PositionRule::new("SUPERVISOR", Archetype::Supervisor),
        PositionRule::new("MANAGER", Archetype::Manager),
        PositionRule::new("GROUP LEADER", Archetype::GroupLeader),
        PositionRule::new("HEAD LEADER", Archetype::GroupLeader),
        PositionRule::new("LINE LEADER", Archetype::LineLeader),
        PositionRule::new("INSPECTOR", Archetype::AssemblyInspector),
    ]
}

fn default_type2_equivalents() -> BTreeMap<String, String> {
    [
        ("LINE LEADER", "LINE LEADER"),
        ("GROUP LEADER", "GROUP LEADER"),
        ("SUPERVISOR", "SUPERVISOR"),
        ("(V) SUPERVISOR", "(V) SUPERVISOR"),
        ("A.MANAGER", "A.MANAGER"),
        ("MANAGER", "MANAGER"),
        ("ASSEMBLY INSPECTOR", "ASSEMBLY INSPECTOR"),
        ("STITCHING INSPECTOR", "ASSEMBLY INSPECTOR"),
    ]
    .into_iter()
    .map(|(from, to)| (from.to_string(), to.to_string()))
    .collect()
}

/// Where an auditor/trainer's reject rate is measured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AreaAssignment {
    Facility,
    Building(String),
}

impl From<String> for AreaAssignment {
    fn from(raw: String) -> Self {
        let normalized = normalize_name(&raw);
        if normalized == "ALL" {
            AreaAssignment::Facility
        } else {
            AreaAssignment::Building(normalized)
        }
    }
}

impl From<AreaAssignment> for String {
    fn from(assignment: AreaAssignment) -> Self {
        match assignment {
            AreaAssignment::Facility => "ALL".to_string(),
            AreaAssignment::Building(name) => name,
        }
    }
}

impl fmt::Display for AreaAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AreaAssignment::Facility => f.write_str("ALL"),
            AreaAssignment::Building(name) => f.write_str(name),
        }
    }
}

/// Every business rule that varies between sites or months.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncentivePolicy {
    pub attendance: AttendanceThresholds,
    pub attendance_codes: AttendanceCodes,
    pub prs: PrsThresholds,
    pub max_area_reject_rate_percent: f64,
    pub escalation: EscalationTable,
    pub claim_free_bands: ClaimFreeBands,
    pub certification_bonus: u64,
    pub certified_aql_inspectors: BTreeSet<EmployeeId>,
    pub line_leader_rate: f64,
    pub multipliers: HierarchyMultipliers,
    pub position_rules: Vec<PositionRule>,
    pub manual_positions: Vec<String>,
    pub type2_equivalents: BTreeMap<String, String>,
    pub area_assignments: BTreeMap<EmployeeId, AreaAssignment>,
    pub files: FilePatterns,
}

impl Default for IncentivePolicy {
    fn default() -> Self {
        Self {
            attendance: AttendanceThresholds::default(),
            attendance_codes: AttendanceCodes::default(),
            prs: PrsThresholds::default(),
            max_area_reject_rate_percent: 3.0,
            escalation: EscalationTable::default(),
            claim_free_bands: ClaimFreeBands::default(),
            certification_bonus: 0,
            certified_aql_inspectors: BTreeSet::new(),
            line_leader_rate: 0.07,
            multipliers: HierarchyMultipliers::default(),
            position_rules: default_position_rules(),
            manual_positions: Vec::new(),
            type2_equivalents: default_type2_equivalents(),
            area_assignments: BTreeMap::new(),
            files: FilePatterns::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("failed to read rules file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid rules file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid rules: {0}")]
    Invalid(String),
}

impl IncentivePolicy {
    /// Reads a JSON rules file. Fields left out keep their defaults.
    pub fn from_path(path: &Path) -> Result<Self, PolicyError> {
        let raw = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let policy: Self = serde_json::from_str(&raw).map_err(|source| PolicyError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        policy.validate()?;
        Ok(policy)
    }

    /// Defaults unless a rules file is given.
    pub fn load(path: Option<&Path>) -> Result<Self, PolicyError> {
        match path {
            Some(path) => Self::from_path(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.escalation.tiers().is_empty() {
            return Err(PolicyError::Invalid("escalation table is empty".to_string()));
        }
        if !self.escalation.is_monotonic() {
            return Err(PolicyError::Invalid(
                "escalation table must be non-decreasing".to_string(),
            ));
        }
        let rates = [
            ("line_leader_rate", self.line_leader_rate),
            ("max_area_reject_rate_percent", self.max_area_reject_rate_percent),
            ("multipliers.group_leader", self.multipliers.group_leader),
            ("multipliers.supervisor", self.multipliers.supervisor),
            ("multipliers.assistant_manager", self.multipliers.assistant_manager),
            ("multipliers.manager", self.multipliers.manager),
            ("multipliers.senior_manager", self.multipliers.senior_manager),
        ];
        if let Some((name, _)) = rates.iter().find(|(_, value)| !value.is_finite() || *value < 0.0) {
            return Err(PolicyError::Invalid(format!("{name} must be a non-negative number")));
        }
        Ok(())
    }

    /// First position rule matching `position_name`.
    pub fn archetype_for_position(&self, position_name: &str) -> Option<Archetype> {
        self.position_rules
            .iter()
            .find(|rule| rule.matches(position_name))
            .map(|rule| rule.archetype)
    }

    pub fn is_manual_position(&self, position_name: &str) -> bool {
        let position = normalize_name(position_name);
        self.manual_positions
            .iter()
            .any(|manual| normalize_name(manual) == position)
    }

    /// Type-1 position a Type-2 position is benchmarked against.
    pub fn type2_equivalent(&self, position_name: &str) -> Option<String> {
        let position = normalize_name(position_name);
        self.type2_equivalents
            .iter()
            .find(|(from, _)| normalize_name(from) == position)
            .map(|(_, to)| normalize_name(to))
    }

    pub fn area_assignment(&self, employee_id: &EmployeeId) -> Option<&AreaAssignment> {
        self.area_assignments.get(employee_id)
    }

    pub fn is_certified(&self, employee_id: &EmployeeId) -> bool {
        self.certified_aql_inspectors.contains(employee_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escalation_lookup_saturates_at_the_top_tier() {
        let table = EscalationTable::default();
        assert_eq!(table.amount_for(0), 0);
        assert_eq!(table.amount_for(1), 150_000);
        assert_eq!(table.amount_for(3), 300_000);
        assert_eq!(table.amount_for(12), 1_000_000);
        assert_eq!(table.amount_for(40), 1_000_000);
    }

    #[test]
    fn escalation_reverse_lookup() {
        let table = EscalationTable::default();
        assert_eq!(table.months_for(250_000), Some(2));
        assert_eq!(table.months_for(1_000_000), Some(12));
        assert_eq!(table.months_for(1_200_000), Some(12));
        assert_eq!(table.months_for(260_000), None);
        assert_eq!(table.months_for(0), None);
    }

    #[test]
    fn claim_free_bands_pick_the_highest_reached() {
        let bands = ClaimFreeBands::default();
        assert_eq!(bands.amount_for(0), 0);
        assert_eq!(bands.amount_for(3), 0);
        assert_eq!(bands.amount_for(4), 300_000);
        assert_eq!(bands.amount_for(12), 700_000);
        assert_eq!(bands.amount_for(20), 900_000);
    }

    #[test]
    fn position_rules_are_ordered() {
        let policy = IncentivePolicy::default();
        assert_eq!(
            policy.archetype_for_position("AQL INSPECTOR"),
            Some(Archetype::AqlInspector)
        );
        assert_eq!(
            policy.archetype_for_position("audit & training team"),
            Some(Archetype::AuditorTrainer)
        );
        assert_eq!(
            policy.archetype_for_position("(V) SUPERVISOR"),
            Some(Archetype::Supervisor)
        );
        assert_eq!(
            policy.archetype_for_position("A.MANAGER"),
            Some(Archetype::AssistantManager)
        );
        assert_eq!(
            policy.archetype_for_position("ASSEMBLY LINE LEADER"),
            Some(Archetype::LineLeader)
        );
        assert_eq!(policy.archetype_for_position("CUTTING OPERATOR"), None);
    }

    #[test]
    fn partial_rules_file_keeps_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("rules.json");
        std::fs::write(
            &path,
            r#"{
                "line_leader_rate": 0.08,
                "area_assignments": { "000000042": "all", "000000043": "building b" },
                "manual_positions": ["new qip member"]
            }"#,
        )
        .expect("write rules");

        let policy = IncentivePolicy::from_path(&path).expect("policy loads");
        assert!((policy.line_leader_rate - 0.08).abs() < f64::EPSILON);
        assert_eq!(policy.escalation, EscalationTable::default());
        let id = |raw: &str| EmployeeId::parse(raw).expect("valid id");
        assert_eq!(policy.area_assignment(&id("42")), Some(&AreaAssignment::Facility));
        assert_eq!(
            policy.area_assignment(&id("43")),
            Some(&AreaAssignment::Building("BUILDING B".to_string()))
        );
        assert!(policy.is_manual_position("NEW QIP MEMBER"));
    }

    #[test]
    fn decreasing_escalation_is_rejected() {
        let policy = IncentivePolicy {
            escalation: EscalationTable::new(vec![200_000, 100_000]),
            ..IncentivePolicy::default()
        };
        match policy.validate() {
            Err(PolicyError::Invalid(message)) => assert!(message.contains("non-decreasing")),
            other => panic!("expected invalid policy, got {other:?}"),
        }
    }
}
