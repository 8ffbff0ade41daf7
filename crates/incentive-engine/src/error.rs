use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::incentive::{PipelineError, PolicyError, ResultStoreError};
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Policy(PolicyError),
    Pipeline(PipelineError),
    Store(ResultStoreError),
    NotFound(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Policy(err) => write!(f, "rules error: {}", err),
            AppError::Pipeline(err) => write!(f, "calculation failed: {}", err),
            AppError::Store(err) => write!(f, "result store error: {}", err),
            AppError::NotFound(what) => write!(f, "not found: {}", what),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Policy(err) => Some(err),
            AppError::Pipeline(err) => Some(err),
            AppError::Store(err) => Some(err),
            AppError::NotFound(_) => None,
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<PolicyError> for AppError {
    fn from(value: PolicyError) -> Self {
        Self::Policy(value)
    }
}

impl From<PipelineError> for AppError {
    fn from(value: PipelineError) -> Self {
        Self::Pipeline(value)
    }
}

impl From<ResultStoreError> for AppError {
    fn from(value: ResultStoreError) -> Self {
        Self::Store(value)
    }
}
