mod cli;
mod commands;
mod infra;

use incentive_engine::error::AppError;

pub fn run() -> Result<(), AppError> {
    cli::run()
}
