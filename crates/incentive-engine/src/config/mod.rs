use crate::period::EvaluationMonth;
use std::env;
use std::fmt;
use std::path::PathBuf;

/// Distinguishes runtime behavior for different stages of the batch job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for a calculation run.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub storage: StorageConfig,
    pub chain: ChainConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("INCENTIVE_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let data_dir = env::var("INCENTIVE_DATA_DIR").unwrap_or_else(|_| "./input_files".to_string());
        let output_dir =
            env::var("INCENTIVE_OUTPUT_DIR").unwrap_or_else(|_| "./output_files".to_string());
        let rules_path = env::var("INCENTIVE_RULES_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let max_depth = env::var("INCENTIVE_MAX_CHAIN_DEPTH")
            .unwrap_or_else(|_| "12".to_string())
            .trim()
            .parse::<usize>()
            .map_err(|_| ConfigError::InvalidChainDepth)?;

        let history_floor = match env::var("INCENTIVE_HISTORY_FLOOR") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                raw.parse::<EvaluationMonth>()
                    .map_err(|_| ConfigError::InvalidHistoryFloor { value: raw })?,
            ),
            _ => None,
        };

        let log_level = env::var("INCENTIVE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            storage: StorageConfig {
                data_dir: PathBuf::from(data_dir),
                output_dir: PathBuf::from(output_dir),
                rules_path,
            },
            chain: ChainConfig {
                max_depth,
                history_floor,
            },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

/// Locations of monthly source tables, materialized results and the rules file.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub rules_path: Option<PathBuf>,
}

/// Bounds for the prior-month recursion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainConfig {
    pub max_depth: usize,
    /// First month of the chain. The month before it has an empty prior result.
    pub history_floor: Option<EvaluationMonth>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            max_depth: 12,
            history_floor: None,
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidChainDepth,
    InvalidHistoryFloor { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidChainDepth => {
                write!(f, "INCENTIVE_MAX_CHAIN_DEPTH must be a non-negative integer")
            }
            ConfigError::InvalidHistoryFloor { value } => {
                write!(f, "INCENTIVE_HISTORY_FLOOR '{value}' must use the YYYY-MM form")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
