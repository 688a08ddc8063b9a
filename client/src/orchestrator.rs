//! Submission orchestrator.
//!
//! One orchestrator drives one identity through two independent paths:
//!
//! - submission: `Idle -> Encoding -> Encrypting -> Submitting -> Confirmed`
//! - decryption: `Idle -> RequestingDecryption -> AwaitingOracle -> Decoded`
//!
//! Either path may end in `Failed(reason)`. State and a status line are
//! published on watch channels for the presentation layer.
//!
//! Once a submission reaches `Submitting` the write runs on its own task:
//! dropping the caller's future does not cancel it, and the terminal state
//! is still published. The decryption path never writes to the store, so
//! abandoning it is harmless.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tracing::{info, warn};

use crate::auth::SigningContext;
use crate::broker::{DecryptionBroker, DecryptionTarget};
use crate::codec::{self, AnswerIndex, AnswerVector, Description, ANSWER_FIELD_TYPE, FIELD_COUNT};
use crate::crypto::Encryptor;
use crate::error::{Result, SurveyError};
use crate::guard::SubmissionGuard;
use crate::types::{Ack, Identity};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Encoding,
    Encrypting,
    Submitting,
    Confirmed(Ack),
    Failed(SurveyError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecryptionState {
    Idle,
    RequestingDecryption,
    AwaitingOracle,
    Decoded(RevealedAnswer),
    Failed(SurveyError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealedAnswer {
    pub index: AnswerIndex,
    pub answer: AnswerVector,
    pub description: Description,
}

/// Answer fields as the participant fills them in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnswerDraft {
    fields: [Option<u8>; FIELD_COUNT],
}

impl AnswerDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: [u8; FIELD_COUNT]) -> Self {
        Self {
            fields: fields.map(Some),
        }
    }

    /// Set field `position` (0-based) to `value`, which must be 1..=4.
    pub fn set(&mut self, position: usize, value: u8) -> Result<()> {
        let slot = self.fields.get_mut(position).ok_or(SurveyError::InvalidField {
            position,
            value: value as i64,
        })?;
        if !(1..=codec::OPTIONS_PER_FIELD).contains(&value) {
            return Err(SurveyError::InvalidField {
                position,
                value: value as i64,
            });
        }
        *slot = Some(value);
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.fields.iter().all(Option::is_some)
    }

    pub fn to_vector(&self) -> Result<AnswerVector> {
        let mut fields = [0u8; FIELD_COUNT];
        for (position, (out, value)) in fields.iter_mut().zip(self.fields).enumerate() {
            *out = value.ok_or(SurveyError::IncompleteAnswer { position })?;
        }
        AnswerVector::new(fields)
    }
}

pub struct SubmissionOrchestrator {
    signer: Arc<SigningContext>,
    guard: Arc<SubmissionGuard>,
    encryptor: Arc<dyn Encryptor>,
    broker: Arc<DecryptionBroker>,
    submission: Arc<watch::Sender<SubmissionState>>,
    decryption: watch::Sender<DecryptionState>,
    status: Arc<watch::Sender<String>>,
    serial: Mutex<()>,
}

impl SubmissionOrchestrator {
    pub fn new(
        signer: Arc<SigningContext>,
        guard: Arc<SubmissionGuard>,
        encryptor: Arc<dyn Encryptor>,
        broker: Arc<DecryptionBroker>,
    ) -> Self {
        Self {
            signer,
            guard,
            encryptor,
            broker,
            submission: Arc::new(watch::channel(SubmissionState::Idle).0),
            decryption: watch::channel(DecryptionState::Idle).0,
            status: Arc::new(watch::channel(String::new()).0),
            serial: Mutex::new(()),
        }
    }

    pub fn identity(&self) -> Identity {
        self.signer.identity()
    }

    pub fn has_submitted(&self) -> bool {
        self.guard.has_submitted(&self.identity())
    }

    pub fn submission_state(&self) -> SubmissionState {
        self.submission.borrow().clone()
    }

    pub fn decryption_state(&self) -> DecryptionState {
        self.decryption.borrow().clone()
    }

    pub fn status_message(&self) -> String {
        self.status.borrow().clone()
    }

    pub fn watch_submission(&self) -> watch::Receiver<SubmissionState> {
        self.submission.subscribe()
    }

    pub fn watch_decryption(&self) -> watch::Receiver<DecryptionState> {
        self.decryption.subscribe()
    }

    /// Encode, encrypt and submit `draft`.
    ///
    /// An incomplete or malformed draft is refused without leaving `Idle`.
    /// Submissions from one orchestrator are serialized.
    pub async fn submit(&self, draft: &AnswerDraft) -> Result<Ack> {
        let answer = draft.to_vector()?;
        let _serial = self.serial.lock().await;
        let identity = self.identity();

        self.enter_submission(SubmissionState::Encoding, "Encoding your answer...");
        let index = codec::encode(&answer);

        self.enter_submission(SubmissionState::Encrypting, "Encrypting your survey answer...");
        let encrypted = self
            .encryptor
            .encrypt(
                ANSWER_FIELD_TYPE,
                index.value() as u64,
                self.guard.scope(),
                identity,
            )
            .await
            .and_then(|input| input.into_single());
        let (handle, proof) = match encrypted {
            Ok(pair) => pair,
            Err(err) => return Err(self.fail_submission(err)),
        };

        self.enter_submission(SubmissionState::Submitting, "Submitting encrypted answer...");
        let guard = self.guard.clone();
        let submission = self.submission.clone();
        let status = self.status.clone();
        let write = tokio::spawn(async move {
            let outcome = guard.submit(&identity, handle, proof).await;
            let (state, message) = match &outcome {
                Ok(ack) => (SubmissionState::Confirmed(ack.clone()), "Survey submitted".to_string()),
                Err(err) => (SubmissionState::Failed(err.clone()), err.to_string()),
            };
            submission.send_replace(state);
            status.send_replace(message);
            outcome
        });

        match write.await {
            Ok(outcome) => outcome,
            Err(join) => Err(self.fail_submission(SurveyError::Storage(join.to_string()))),
        }
    }

    /// Fetch this identity's ciphertext, decrypt it through the broker and
    /// decode it. Safe to call repeatedly; concurrent calls share one oracle
    /// request.
    pub async fn reveal(&self) -> Result<RevealedAnswer> {
        let identity = self.identity();
        self.enter_decryption(DecryptionState::RequestingDecryption, "Requesting decryption...");

        let handle = self.guard.get_encrypted_data(&identity);
        if handle.is_absent() {
            return Err(self.fail_decryption(SurveyError::NoSubmission { identity }));
        }
        let target = DecryptionTarget {
            handle,
            scope: self.guard.scope(),
        };

        let batch = match self.broker.request_decryption(&[target], identity, &self.signer) {
            Ok(batch) => batch,
            Err(err) => return Err(self.fail_decryption(err)),
        };

        self.enter_decryption(DecryptionState::AwaitingOracle, "Decrypting...");
        let value = match batch.resolve().await {
            Ok(results) => results.get(&handle).copied(),
            Err(err) => return Err(self.fail_decryption(err)),
        };

        let index = match value.and_then(AnswerIndex::new) {
            Some(index) => index,
            None => {
                return Err(self.fail_decryption(SurveyError::OracleFailure(format!(
                    "decrypted value {value:?} is not an answer index"
                ))))
            }
        };
        let revealed = RevealedAnswer {
            index,
            answer: codec::decode(index),
            description: codec::describe(index.value() as i64),
        };

        info!(%identity, index = index.value(), "Answer decrypted");
        self.decryption
            .send_replace(DecryptionState::Decoded(revealed.clone()));
        self.status.send_replace("Decryption complete".to_string());
        Ok(revealed)
    }

    fn enter_submission(&self, state: SubmissionState, message: &str) {
        info!(identity = %self.identity(), ?state, "Submission transition");
        self.submission.send_replace(state);
        self.status.send_replace(message.to_string());
    }

    fn fail_submission(&self, err: SurveyError) -> SurveyError {
        warn!(identity = %self.identity(), error = %err, "Submission failed");
        self.submission.send_replace(SubmissionState::Failed(err.clone()));
        self.status.send_replace(err.to_string());
        err
    }

    fn enter_decryption(&self, state: DecryptionState, message: &str) {
        info!(identity = %self.identity(), ?state, "Decryption transition");
        self.decryption.send_replace(state);
        self.status.send_replace(message.to_string());
    }

    fn fail_decryption(&self, err: SurveyError) -> SurveyError {
        warn!(identity = %self.identity(), error = %err, "Decryption failed");
        self.decryption.send_replace(DecryptionState::Failed(err.clone()));
        self.status.send_replace(err.to_string());
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_draft_is_incomplete() {
        let draft = AnswerDraft::new();
        assert!(!draft.is_complete());
        assert_eq!(
            draft.to_vector(),
            Err(SurveyError::IncompleteAnswer { position: 0 })
        );
    }

    #[test]
    fn draft_reports_first_missing_field() {
        let mut draft = AnswerDraft::new();
        draft.set(0, 2).unwrap();
        draft.set(1, 3).unwrap();
        draft.set(3, 1).unwrap();
        draft.set(4, 4).unwrap();
        assert_eq!(
            draft.to_vector(),
            Err(SurveyError::IncompleteAnswer { position: 2 })
        );
        draft.set(2, 1).unwrap();
        assert_eq!(draft.to_vector().unwrap().fields(), [2, 3, 1, 1, 4]);
    }

    #[test]
    fn draft_rejects_bad_values() {
        let mut draft = AnswerDraft::new();
        assert!(matches!(draft.set(0, 0), Err(SurveyError::InvalidField { .. })));
        assert!(matches!(draft.set(0, 5), Err(SurveyError::InvalidField { .. })));
        assert!(matches!(draft.set(5, 1), Err(SurveyError::InvalidField { .. })));
        assert_eq!(draft, AnswerDraft::new());
    }
}
