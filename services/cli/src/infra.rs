use crate::cli::StorageArgs;
use incentive_engine::config::AppConfig;
use incentive_engine::error::AppError;
use incentive_engine::period::EvaluationMonth;
use incentive_engine::telemetry;
use incentive_engine::workflows::incentive::{
    CsvResultStore, IncentivePolicy, ManualAmountProvider, ManualAmountRequest, ManualInputError,
};
use incentive_engine::workflows::sources::{EmployeeId, SourceCatalog};
use std::io::{self, BufRead, Write};
use tracing::info;

pub(crate) fn parse_month(value: &str) -> Result<EvaluationMonth, String> {
    value.parse::<EvaluationMonth>().map_err(|err| err.to_string())
}

/// Everything a command needs once configuration, overrides and the rules file are resolved.
pub(crate) struct RunContext {
    pub(crate) config: AppConfig,
    pub(crate) policy: IncentivePolicy,
    pub(crate) catalog: SourceCatalog,
    pub(crate) store: CsvResultStore,
}

impl RunContext {
    pub(crate) fn load(storage: StorageArgs) -> Result<Self, AppError> {
        let mut config = AppConfig::load()?;
        telemetry::init(&config.telemetry)?;

        if let Some(data_dir) = storage.data_dir {
            config.storage.data_dir = data_dir;
        }
        if let Some(output_dir) = storage.output_dir {
            config.storage.output_dir = output_dir;
        }
        if storage.rules.is_some() {
            config.storage.rules_path = storage.rules;
        }

        let policy = IncentivePolicy::load(config.storage.rules_path.as_deref())?;
        let catalog = SourceCatalog::new(config.storage.data_dir.clone(), policy.files.clone());
        let store = CsvResultStore::new(config.storage.output_dir.clone(), policy.files.clone());
        info!(
            ?config.environment,
            data_dir = %config.storage.data_dir.display(),
            output_dir = %config.storage.output_dir.display(),
            rules = ?config.storage.rules_path,
            "loaded run context"
        );

        Ok(Self {
            config,
            policy,
            catalog,
            store,
        })
    }
}

/// Asks the operator on the terminal for each manual-input position's amount.
pub(crate) struct TerminalManualAmounts;

impl ManualAmountProvider for TerminalManualAmounts {
    fn amount_for(&self, request: &ManualAmountRequest<'_>) -> Result<Option<u64>, ManualInputError> {
        let unavailable = |err: io::Error| ManualInputError::Unavailable(err.to_string());

        let mut stderr = io::stderr().lock();
        write!(
            stderr,
            "{} amount for {} {} ({}), blank to skip: ",
            request.month, request.employee_id, request.name, request.position_name
        )
        .map_err(unavailable)?;
        stderr.flush().map_err(unavailable)?;

        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line).map_err(unavailable)?;
        if read == 0 {
            return Ok(None);
        }
        parse_manual_amount(request.employee_id, &line)
    }
}

/// Accepts plain or comma-separated whole VND amounts. Blank input means no amount.
pub(crate) fn parse_manual_amount(
    employee_id: &EmployeeId,
    raw: &str,
) -> Result<Option<u64>, ManualInputError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let digits: String = trimmed
        .chars()
        .filter(|ch| !matches!(ch, ',' | '_' | ' '))
        .collect();
    // Whole VND only; a decimal point is never read as a separator.
    digits
        .parse::<u64>()
        .map(Some)
        .map_err(|_| ManualInputError::InvalidAmount {
            employee_id: employee_id.clone(),
            value: trimmed.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employee() -> EmployeeId {
        EmployeeId::parse("6191").expect("valid id")
    }

    #[test]
    fn blank_manual_amount_is_skipped() {
        assert_eq!(parse_manual_amount(&employee(), "  \n").expect("blank"), None);
    }

    #[test]
    fn manual_amount_accepts_separators() {
        assert_eq!(
            parse_manual_amount(&employee(), "1,250,000\n").expect("amount"),
            Some(1_250_000)
        );
    }

    #[test]
    fn manual_amount_rejects_fractions() {
        match parse_manual_amount(&employee(), "150000.5") {
            Err(ManualInputError::InvalidAmount { value, .. }) => assert_eq!(value, "150000.5"),
            other => panic!("expected invalid amount, got {other:?}"),
        }
    }

    #[test]
    fn manual_amount_rejects_text() {
        match parse_manual_amount(&employee(), "abc") {
            Err(ManualInputError::InvalidAmount { value, .. }) => assert_eq!(value, "abc"),
            other => panic!("expected invalid amount, got {other:?}"),
        }
    }

    #[test]
    fn month_argument_uses_calendar_format() {
        assert_eq!(parse_month("2025-09").expect("month").to_string(), "2025-09");
        assert!(parse_month("September").is_err());
    }
}
