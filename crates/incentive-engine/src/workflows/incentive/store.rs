use super::domain::{Archetype, EmployeeRecord, MonthlyTable, PayoutReason, PriorResult, RoleType};
use crate::period::EvaluationMonth;
use crate::workflows::sources::columns::results;
use crate::workflows::sources::{cell, parse_number, EmployeeId, FilePatterns, RawTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// One materialized output row. Column order is the file's column order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultRow {
    pub employee_id: String,
    pub name: String,
    pub role_type: RoleType,
    pub position_name: String,
    pub archetype: Archetype,
    pub manager_id: String,
    pub total_working_days: f64,
    pub actual_working_days: f64,
    pub unapproved_absence_days: f64,
    pub absence_rate_percent: f64,
    pub attendance_passed: bool,
    pub aql_failures: u32,
    pub continuous_aql_fail: bool,
    pub audit_volume: f64,
    pub audit_pass_rate_percent: f64,
    pub area_reject_rate_percent: Option<f64>,
    pub subordinate_continuous_fail: bool,
    pub previous_incentive_amount: u64,
    pub continuous_qualifying_months: u32,
    pub part1_amount: u64,
    pub part2_amount: u64,
    pub part3_amount: u64,
    pub claim_free_months: u32,
    pub incentive_amount: u64,
    pub reason: PayoutReason,
}

fn two_decimals(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl ResultRow {
    pub fn from_record(record: &EmployeeRecord) -> Self {
        let conditions = &record.conditions;
        let area_rate = conditions
            .assigned_area_reject_rate
            .or(matches!(record.archetype, Archetype::ModelMaster).then_some(conditions.facility_reject_rate));
        Self {
            employee_id: record.employee_id.to_string(),
            name: record.name.clone(),
            role_type: record.role_type,
            position_name: record.position_name.clone(),
            archetype: record.archetype,
            manager_id: record
                .manager_id
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            total_working_days: two_decimals(record.attendance.total_working_days),
            actual_working_days: two_decimals(record.attendance.actual_working_days),
            unapproved_absence_days: two_decimals(record.attendance.unapproved_absence_days),
            absence_rate_percent: two_decimals(record.attendance.absence_rate_percent),
            attendance_passed: conditions.attendance.passed(),
            aql_failures: record.quality.aql_failures_current_month,
            continuous_aql_fail: record.quality.continuous_aql_fail,
            audit_volume: two_decimals(record.quality.audit_volume),
            audit_pass_rate_percent: two_decimals(record.quality.audit_pass_rate_percent),
            area_reject_rate_percent: area_rate.map(two_decimals),
            subordinate_continuous_fail: conditions.subordinate_continuous_fail,
            previous_incentive_amount: record.previous.incentive_amount,
            continuous_qualifying_months: record.continuity.qualifying_months,
            part1_amount: record.payout.part1,
            part2_amount: record.payout.part2,
            part3_amount: record.payout.part3,
            claim_free_months: record.payout.claim_free_months,
            incentive_amount: record.payout.amount,
            reason: record.payout.reason,
        }
    }

    pub fn from_table(table: &MonthlyTable) -> Vec<Self> {
        table.records().iter().map(Self::from_record).collect()
    }
}

/// Last month's amounts keyed by employee. Absent employees read as zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorResults {
    month: EvaluationMonth,
    entries: BTreeMap<EmployeeId, PriorResult>,
}

impl PriorResults {
    pub fn empty(month: EvaluationMonth) -> Self {
        Self {
            month,
            entries: BTreeMap::new(),
        }
    }

    pub fn from_entries(month: EvaluationMonth, entries: BTreeMap<EmployeeId, PriorResult>) -> Self {
        Self { month, entries }
    }

    pub fn from_table(table: &MonthlyTable) -> Self {
        let entries = table
            .records()
            .iter()
            .map(|record| {
                (
                    record.employee_id.clone(),
                    PriorResult {
                        incentive_amount: record.payout.amount,
                        part1_amount: Some(record.payout.part1),
                        claim_free_months: record.payout.claim_free_months,
                    },
                )
            })
            .collect();
        Self::from_entries(table.month(), entries)
    }

    /// Reads a materialized table. Only the id and amount columns are required, so
    /// hand-maintained result sheets also seed continuity.
    pub fn from_raw(month: EvaluationMonth, table: &RawTable) -> Self {
        let mut entries = BTreeMap::new();
        let (Some(id_column), Some(amount_column)) =
            (table.column(&results::EMPLOYEE_ID), table.column(&results::AMOUNT))
        else {
            return Self::empty(month);
        };
        let part1_column = table.column(&results::PART1_AMOUNT);
        let claim_free_column = table.column(&results::CLAIM_FREE_MONTHS);

        for row in &table.rows {
            let Some(employee_id) = EmployeeId::parse(cell(row, Some(id_column))) else {
                continue;
            };
            let amount = |column| {
                parse_number(cell(row, column))
                    .filter(|value| *value > 0.0)
                    .map(|value| value.round() as u64)
            };
            let part1_amount = match part1_column {
                Some(_) => Some(amount(part1_column).unwrap_or(0)),
                None => None,
            };
            entries.insert(
                employee_id,
                PriorResult {
                    incentive_amount: amount(Some(amount_column)).unwrap_or(0),
                    part1_amount,
                    claim_free_months: amount(claim_free_column).unwrap_or(0) as u32,
                },
            );
        }
        Self::from_entries(month, entries)
    }

    pub fn month(&self) -> EvaluationMonth {
        self.month
    }

    pub fn get(&self, employee_id: &EmployeeId) -> PriorResult {
        self.entries.get(employee_id).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResultStoreError {
    #[error("failed to access {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid result table {location}: {source}")]
    Csv {
        location: String,
        #[source]
        source: csv::Error,
    },
    #[error("result store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence seam for materialized monthly results.
///
/// Implementations move encoded CSV bytes; the provided methods own the format so every
/// store reads and writes identical tables.
pub trait ResultStore {
    fn location(&self, month: EvaluationMonth) -> String;
    fn read(&self, month: EvaluationMonth) -> Result<Option<Vec<u8>>, ResultStoreError>;
    fn write(&self, month: EvaluationMonth, contents: &[u8]) -> Result<(), ResultStoreError>;

    fn save(&self, month: EvaluationMonth, rows: &[ResultRow]) -> Result<(), ResultStoreError> {
        let location = self.location(month);
        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in rows {
            writer.serialize(row).map_err(|source| ResultStoreError::Csv {
                location: location.clone(),
                source,
            })?;
        }
        let contents = writer.into_inner().map_err(|err| ResultStoreError::Io {
            location: location.clone(),
            source: err.into_error(),
        })?;
        self.write(month, &contents)?;
        debug!(%month, rows = rows.len(), %location, "materialized results");
        Ok(())
    }

    fn load_rows(&self, month: EvaluationMonth) -> Result<Option<Vec<ResultRow>>, ResultStoreError> {
        let Some(contents) = self.read(month)? else {
            return Ok(None);
        };
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(contents.as_slice());
        let rows = reader
            .deserialize()
            .collect::<Result<Vec<ResultRow>, _>>()
            .map_err(|source| ResultStoreError::Csv {
                location: self.location(month),
                source,
            })?;
        Ok(Some(rows))
    }

    fn load_prior(&self, month: EvaluationMonth) -> Result<Option<PriorResults>, ResultStoreError> {
        let Some(contents) = self.read(month)? else {
            return Ok(None);
        };
        let table = RawTable::from_reader(contents.as_slice()).map_err(|source| ResultStoreError::Csv {
            location: self.location(month),
            source,
        })?;
        Ok(Some(PriorResults::from_raw(month, &table)))
    }
}

/// Result tables as CSV files in an output directory.
#[derive(Debug, Clone)]
pub struct CsvResultStore {
    output_dir: PathBuf,
    patterns: FilePatterns,
}

impl CsvResultStore {
    pub fn new(output_dir: impl Into<PathBuf>, patterns: FilePatterns) -> Self {
        Self {
            output_dir: output_dir.into(),
            patterns,
        }
    }

    pub fn path_for(&self, month: EvaluationMonth) -> PathBuf {
        self.output_dir.join(self.patterns.result_file_name(month))
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl ResultStore for CsvResultStore {
    fn location(&self, month: EvaluationMonth) -> String {
        self.path_for(month).display().to_string()
    }

    fn read(&self, month: EvaluationMonth) -> Result<Option<Vec<u8>>, ResultStoreError> {
        let path = self.path_for(month);
        match fs::read(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ResultStoreError::Io {
                location: path.display().to_string(),
                source,
            }),
        }
    }

    /// Writes beside the target and renames it into place.
    fn write(&self, month: EvaluationMonth, contents: &[u8]) -> Result<(), ResultStoreError> {
        let path = self.path_for(month);
        let io_error = |source| ResultStoreError::Io {
            location: path.display().to_string(),
            source,
        };
        fs::create_dir_all(&self.output_dir).map_err(io_error)?;
        let staging = path.with_extension("csv.partial");
        fs::write(&staging, contents).map_err(io_error)?;
        fs::rename(&staging, &path).map_err(io_error)
    }
}

/// Keeps result tables in memory; used by tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemoryResultStore {
    tables: Mutex<BTreeMap<EvaluationMonth, Vec<u8>>>,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn months(&self) -> Vec<EvaluationMonth> {
        self.tables
            .lock()
            .map(|tables| tables.keys().copied().collect())
            .unwrap_or_default()
    }
}

impl ResultStore for InMemoryResultStore {
    fn location(&self, month: EvaluationMonth) -> String {
        format!("memory:{month}")
    }

    fn read(&self, month: EvaluationMonth) -> Result<Option<Vec<u8>>, ResultStoreError> {
        let tables = self
            .tables
            .lock()
            .map_err(|_| ResultStoreError::Unavailable("result store lock poisoned".to_string()))?;
        Ok(tables.get(&month).cloned())
    }

    fn write(&self, month: EvaluationMonth, contents: &[u8]) -> Result<(), ResultStoreError> {
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| ResultStoreError::Unavailable("result store lock poisoned".to_string()))?;
        tables.insert(month, contents.to_vec());
        Ok(())
    }
}
