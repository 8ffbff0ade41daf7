use super::domain::MonthlyTable;
use super::engine::IncentiveEngine;
use super::hierarchy::OrgTree;
use super::overrides::{ManualAmountProvider, ManualInputError};
use super::store::{PriorResults, ResultRow, ResultStore, ResultStoreError};
use super::{conditions, continuity, merge, roles};
use crate::config::ChainConfig;
use crate::period::EvaluationMonth;
use crate::workflows::audit::AuditTrail;
use crate::workflows::sources::{AqlHistory, MonthlySources, SourceCatalog, SourceError, SourceKind};
use std::path::PathBuf;
use tracing::{info, warn};

fn describe_missing(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn kinds(missing: &[SourceKind]) -> String {
    missing
        .iter()
        .map(|kind| kind.label())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("cannot evaluate {month}: missing source file(s) {}", describe_missing(paths))]
    MissingCurrentMonthSource {
        month: EvaluationMonth,
        missing: Vec<SourceKind>,
        paths: Vec<PathBuf>,
    },
    #[error(
        "prior month {month} has no result table and cannot be computed: missing {}",
        kinds(missing)
    )]
    UnresolvablePriorMonth {
        month: EvaluationMonth,
        missing: Vec<SourceKind>,
    },
    #[error("prior month chain reached {month} after {depth} recursive month(s); set a history floor")]
    ChainDepthExceeded { month: EvaluationMonth, depth: usize },
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Store(#[from] ResultStoreError),
    #[error(transparent)]
    Manual(#[from] ManualInputError),
}

/// Result of evaluating one month.
#[derive(Debug, Clone)]
pub struct MonthOutcome {
    pub table: MonthlyTable,
    pub audit: AuditTrail,
}

/// The requested month plus any prior months materialized along the way, oldest first.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub month: MonthOutcome,
    pub prior_months: Vec<MonthOutcome>,
}

impl RunOutcome {
    pub fn materialized_prior_months(&self) -> Vec<EvaluationMonth> {
        self.prior_months
            .iter()
            .map(|outcome| outcome.table.month())
            .collect()
    }
}

/// One calculation run over a source catalog and a result store.
pub struct MonthlyRun<'a, S: ResultStore + ?Sized> {
    catalog: &'a SourceCatalog,
    store: &'a S,
    engine: &'a IncentiveEngine,
    manual: &'a dyn ManualAmountProvider,
    chain: ChainConfig,
}

impl<'a, S: ResultStore + ?Sized> MonthlyRun<'a, S> {
    pub fn new(
        catalog: &'a SourceCatalog,
        store: &'a S,
        engine: &'a IncentiveEngine,
        manual: &'a dyn ManualAmountProvider,
        chain: ChainConfig,
    ) -> Self {
        Self {
            catalog,
            store,
            engine,
            manual,
            chain,
        }
    }

    /// Evaluates `month` and overwrites its materialized table.
    pub fn run(&self, month: EvaluationMonth) -> Result<RunOutcome, PipelineError> {
        let missing = self.catalog.missing(month);
        if !missing.is_empty() {
            let paths = missing
                .iter()
                .map(|kind| self.catalog.path_for(*kind, month))
                .collect();
            return Err(PipelineError::MissingCurrentMonthSource {
                month,
                missing,
                paths,
            });
        }

        let mut materialized = Vec::new();
        let prior = self.prior_results(month, 0, &mut materialized)?;
        let outcome = self.evaluate(month, &prior)?;
        info!(
            %month,
            employees = outcome.table.len(),
            notes = outcome.audit.notes().len(),
            prior_months_computed = materialized.len(),
            "incentive run complete"
        );
        Ok(RunOutcome {
            month: outcome,
            prior_months: materialized,
        })
    }

    /// Loads last month's results, computing and saving them first when absent.
    ///
    /// Recursion stops at the history floor, at a materialized table, or with a fatal
    /// error when a month's sources are missing or the depth bound is reached.
    fn prior_results(
        &self,
        month: EvaluationMonth,
        depth: usize,
        materialized: &mut Vec<MonthOutcome>,
    ) -> Result<PriorResults, PipelineError> {
        let prior_month = month.previous();
        if let Some(prior) = self.store.load_prior(prior_month)? {
            return Ok(prior);
        }
        if self
            .chain
            .history_floor
            .is_some_and(|floor| prior_month < floor)
        {
            info!(%prior_month, "before history floor; starting continuity from zero");
            return Ok(PriorResults::empty(prior_month));
        }
        if depth >= self.chain.max_depth {
            return Err(PipelineError::ChainDepthExceeded {
                month: prior_month,
                depth,
            });
        }
        let missing = self.catalog.missing(prior_month);
        if !missing.is_empty() {
            return Err(PipelineError::UnresolvablePriorMonth {
                month: prior_month,
                missing,
            });
        }

        warn!(%month, %prior_month, "prior month results missing; computing them first");
        let grand_prior = self.prior_results(prior_month, depth + 1, materialized)?;
        let outcome = self.evaluate(prior_month, &grand_prior)?;
        let prior = PriorResults::from_table(&outcome.table);
        materialized.push(outcome);
        Ok(prior)
    }

    fn evaluate(&self, month: EvaluationMonth, prior: &PriorResults) -> Result<MonthOutcome, PipelineError> {
        let policy = self.engine.policy();
        let mut audit = AuditTrail::new();

        let sources = MonthlySources::load(self.catalog, month, &policy.attendance_codes, &mut audit)?;
        let history = AqlHistory::load(self.catalog, month, &sources.aql, &mut audit);
        let mut table = merge::assemble(month, &sources, &history, prior, &mut audit);
        let tree = OrgTree::build(&table, &mut audit);

        conditions::evaluate(&mut table, &tree, &sources.aql, policy);
        continuity::apply(&mut table, &policy.escalation);
        roles::assign(&mut table, policy, &mut audit);
        self.engine.resolve(&mut table, &tree, self.manual)?;

        self.store.save(month, &ResultRow::from_table(&table))?;
        info!(%month, location = %self.store.location(month), "results materialized");
        Ok(MonthOutcome { table, audit })
    }
}
