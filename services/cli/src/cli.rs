use crate::commands::{run_calculate, run_explain, run_summary};
use clap::{Args, Parser, Subcommand};
use incentive_engine::error::AppError;
use incentive_engine::period::EvaluationMonth;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "incentive-cli",
    about = "Calculate and inspect monthly quality incentives",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Calculate a month, materializing any missing prior months first
    Calculate(CalculateArgs),
    /// Summarize a materialized month by archetype and unpaid reason
    Summary(SummaryArgs),
    /// Explain one employee's payout for a materialized month
    Explain(ExplainArgs),
}

/// Location overrides shared by every command. Unset values fall back to the environment.
#[derive(Args, Debug, Default)]
pub(crate) struct StorageArgs {
    /// Directory holding the monthly source tables
    #[arg(long)]
    pub(crate) data_dir: Option<PathBuf>,
    /// Directory holding materialized result tables
    #[arg(long)]
    pub(crate) output_dir: Option<PathBuf>,
    /// JSON rules file overriding the built-in policy
    #[arg(long)]
    pub(crate) rules: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct CalculateArgs {
    /// Month to calculate (YYYY-MM)
    #[arg(long, value_parser = crate::infra::parse_month)]
    pub(crate) month: EvaluationMonth,
    #[command(flatten)]
    pub(crate) storage: StorageArgs,
    /// First month of the chain; the month before it starts from an empty history
    #[arg(long, value_parser = crate::infra::parse_month)]
    pub(crate) history_floor: Option<EvaluationMonth>,
    /// Maximum number of prior months to compute in one run
    #[arg(long)]
    pub(crate) max_depth: Option<usize>,
    /// Skip manual-input positions instead of prompting for their amounts
    #[arg(long)]
    pub(crate) no_prompt: bool,
    /// Print the run summary as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct SummaryArgs {
    /// Month to summarize (YYYY-MM)
    #[arg(long, value_parser = crate::infra::parse_month)]
    pub(crate) month: EvaluationMonth,
    #[command(flatten)]
    pub(crate) storage: StorageArgs,
    /// Print the summary as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ExplainArgs {
    /// Month to inspect (YYYY-MM)
    #[arg(long, value_parser = crate::infra::parse_month)]
    pub(crate) month: EvaluationMonth,
    /// Employee number as it appears in the roster
    #[arg(long)]
    pub(crate) employee: String,
    #[command(flatten)]
    pub(crate) storage: StorageArgs,
    /// Print the explanation as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run() -> Result<(), AppError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Calculate(args) => run_calculate(args),
        Command::Summary(args) => run_summary(args),
        Command::Explain(args) => run_explain(args),
    }
}
