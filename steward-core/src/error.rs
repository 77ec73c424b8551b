// steward-core/src/error.rs

use crate::domain::error::DomainError;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::engine::EngineError;
use crate::ports::notifier::NotificationError;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum StewardError {
    // --- DOMAIN ERRORS (identifiers, rule configuration) ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Domain(#[from] DomainError),

    // --- INFRASTRUCTURE ERRORS (IO, parsing, HTTP) ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Infrastructure(#[from] InfrastructureError),

    // --- QUERY ENGINE (transport, timeout, job errors) ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Engine(#[from] EngineError),

    // --- NOTIFICATIONS ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Notification(#[from] NotificationError),

    // --- GENERIC / APPLICATION ERRORS ---
    #[error("Internal Error: {0}")]
    InternalError(String),
}

// Manual implementation to avoid duplicate enum variant but keep ergonomics
impl From<std::io::Error> for StewardError {
    fn from(err: std::io::Error) -> Self {
        StewardError::Infrastructure(InfrastructureError::Io(err))
    }
}
