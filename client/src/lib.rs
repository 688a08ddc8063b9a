//! Off-chain side of the confidential survey.
//!
//! A participant's five graded answers are packed into one index
//! ([`codec`]), encrypted by an external service bound to the store's scope
//! and the participant's identity ([`crypto`]), written once per identity
//! ([`guard`], [`store`]) and later decrypted only for that participant
//! through a signed, scoped request ([`auth`], [`broker`]).
//! [`orchestrator`] sequences the whole flow.

pub mod auth;
pub mod broker;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod guard;
pub mod local;
pub mod orchestrator;
pub mod store;
pub mod telemetry;
pub mod types;

pub use auth::{DecryptionSignature, SignatureCache, SigningContext};
pub use broker::{
    DecryptionBatch, DecryptionBroker, DecryptionRequest, DecryptionStatus, DecryptionTarget,
    PendingDecryption,
};
pub use codec::{decode, describe, encode, AnswerIndex, AnswerVector, Description};
pub use config::SurveyConfig;
pub use crypto::{DecryptionOracle, EncryptedFieldType, EncryptedInput, Encryptor, ProofVerifier};
pub use error::{Result, SurveyError};
pub use guard::SubmissionGuard;
pub use local::LocalFhe;
pub use orchestrator::{
    AnswerDraft, DecryptionState, RevealedAnswer, SubmissionOrchestrator, SubmissionState,
};
pub use store::{MemoryStore, SubmissionStore};
pub use types::{Ack, CiphertextHandle, Identity, StorageScope, SubmissionRecord, ValidityProof};
