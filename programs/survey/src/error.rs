use anchor_lang::prelude::*;

#[error_code]
pub enum ErrorCode {
    #[msg("Cluster not set")]
    ClusterNotSet,
    #[msg("Submission already exists")]
    DuplicateSubmission,
    #[msg("Encrypted answer failed validation")]
    InvalidProof,
    #[msg("Caller may not decrypt this submission")]
    Unauthorized,
    #[msg("No submission for this identity")]
    NoSubmission,
    #[msg("Submission account does not belong to this program")]
    ScopeMismatch,
}
