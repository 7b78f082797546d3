use thiserror::Error;

use crate::domain::FitFailure;

/// Application-level error carrying the process exit code.
///
/// Exit codes:
/// - 2: invalid input or configuration
/// - 3: insufficient data
/// - 4: fit failure / internal error
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Errors raised by the scoring core.
#[derive(Debug, Clone, Error)]
pub enum ScoreError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient data: {valid} valid observation/prediction pairs, at least {required} required")]
    InsufficientData { valid: usize, required: usize },

    #[error("No error model could be fitted")]
    AllCandidatesFailed(Vec<FitFailure>),
}

impl From<ScoreError> for AppError {
    fn from(err: ScoreError) -> Self {
        let code = match &err {
            ScoreError::InvalidInput(_) => 2,
            ScoreError::InsufficientData { .. } => 3,
            ScoreError::AllCandidatesFailed(_) => 4,
        };
        AppError::new(code, err.to_string())
    }
}
