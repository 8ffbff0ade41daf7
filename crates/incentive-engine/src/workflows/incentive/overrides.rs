use crate::period::EvaluationMonth;
use crate::workflows::sources::EmployeeId;
use std::collections::BTreeMap;

/// Identity handed to a provider when a position is paid by operator decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualAmountRequest<'a> {
    pub month: EvaluationMonth,
    pub employee_id: &'a EmployeeId,
    pub name: &'a str,
    pub position_name: &'a str,
}

#[derive(Debug, thiserror::Error)]
pub enum ManualInputError {
    #[error("manual input unavailable: {0}")]
    Unavailable(String),
    #[error("invalid manual amount '{value}' for employee {employee_id}")]
    InvalidAmount { employee_id: EmployeeId, value: String },
}

/// Supplies amounts for manual-input positions. `Ok(None)` means no amount was given.
pub trait ManualAmountProvider {
    fn amount_for(&self, request: &ManualAmountRequest<'_>) -> Result<Option<u64>, ManualInputError>;
}

/// Leaves every manual position unpaid.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoManualAmounts;

impl ManualAmountProvider for NoManualAmounts {
    fn amount_for(&self, _request: &ManualAmountRequest<'_>) -> Result<Option<u64>, ManualInputError> {
        Ok(None)
    }
}

/// Amounts fixed ahead of the run, keyed by employee.
#[derive(Debug, Clone, Default)]
pub struct FixedManualAmounts {
    amounts: BTreeMap<EmployeeId, u64>,
}

impl FixedManualAmounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, employee_id: EmployeeId, amount: u64) -> Self {
        self.amounts.insert(employee_id, amount);
        self
    }
}

impl FromIterator<(EmployeeId, u64)> for FixedManualAmounts {
    fn from_iter<I: IntoIterator<Item = (EmployeeId, u64)>>(iter: I) -> Self {
        Self {
            amounts: iter.into_iter().collect(),
        }
    }
}

impl ManualAmountProvider for FixedManualAmounts {
    fn amount_for(&self, request: &ManualAmountRequest<'_>) -> Result<Option<u64>, ManualInputError> {
        Ok(self.amounts.get(request.employee_id).copied())
    }
}
