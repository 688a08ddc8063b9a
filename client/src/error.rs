use thiserror::Error;

use crate::types::Identity;

/// Errors surfaced by the survey protocol.
///
/// The type is `Clone` so that every waiter on an idempotent decryption
/// observes the same outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurveyError {
    #[error("Answer field {position} has value {value}, expected 1..=4")]
    InvalidField { position: usize, value: i64 },

    #[error("Answer is incomplete: field {position} is not set")]
    IncompleteAnswer { position: usize },

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Validity proof rejected for {identity}")]
    InvalidProof { identity: Identity },

    #[error("Submission already exists for {identity}")]
    DuplicateSubmission { identity: Identity },

    #[error("No submission found for {identity}")]
    NoSubmission { identity: Identity },

    #[error("Scope mismatch: {0}")]
    ScopeMismatch(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Decryption oracle did not answer within {timeout_ms}ms")]
    OracleTimeout { timeout_ms: u64 },

    #[error("Decryption oracle failure: {0}")]
    OracleFailure(String),

    #[error("Store write failed: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SurveyError {
    /// Whether the caller may try again with a fresh attempt.
    ///
    /// Proof and duplicate rejections are final for the attempt (and, for
    /// duplicates, for the identity).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SurveyError::EncryptionFailed(_)
                | SurveyError::ScopeMismatch(_)
                | SurveyError::Unauthorized(_)
                | SurveyError::OracleTimeout { .. }
                | SurveyError::OracleFailure(_)
                | SurveyError::Storage(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SurveyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_rejections_are_final() {
        let identity = Identity::new([7u8; 32]);
        assert!(!SurveyError::InvalidProof { identity }.is_retryable());
        assert!(!SurveyError::DuplicateSubmission { identity }.is_retryable());
        assert!(SurveyError::OracleTimeout { timeout_ms: 10 }.is_retryable());
        assert!(SurveyError::EncryptionFailed("no proof".into()).is_retryable());
    }

    #[test]
    fn duplicate_message_is_stable() {
        let identity = Identity::new([0xab; 32]);
        let msg = SurveyError::DuplicateSubmission { identity }.to_string();
        assert!(msg.starts_with("Submission already exists for "));
    }
}
