use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Dictionary error: {0}")]
    Dictionary(String),

    #[error("Machine error: {0}")]
    Machine(String),

    #[error("Component failed health check: {component}")]
    HealthCheckFailed { component: String },

    #[error("Shutdown requested")]
    ShutdownRequested,

    #[error("Fatal error, cannot recover: {0}")]
    Fatal(String),

    #[error("Transient error, will retry: {0}")]
    Transient(String),
}

#[derive(Debug, Clone)]
pub enum RecoveryStrategy {
    Retry { max_attempts: u32, delay: Duration },
    Restart,
    Ignore,
    Fatal,
}

impl AppError {
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            AppError::Machine(_) => RecoveryStrategy::Retry {
                max_attempts: 5,
                delay: Duration::from_secs(2),
            },
            AppError::Transient(_) => RecoveryStrategy::Restart,
            AppError::Dictionary(_) | AppError::HealthCheckFailed { .. } => {
                RecoveryStrategy::Ignore
            }
            AppError::Config(_) | AppError::Fatal(_) | AppError::ShutdownRequested => {
                RecoveryStrategy::Fatal
            }
        }
    }
}
