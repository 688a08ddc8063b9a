use std::sync::Arc;

use tracing::{info, warn};

use crate::crypto::ProofVerifier;
use crate::error::{Result, SurveyError};
use crate::store::SubmissionStore;
use crate::types::{Ack, CiphertextHandle, Identity, StorageScope, ValidityProof};

/// Entry point for submissions. Nothing reaches the store without passing
/// the duplicate check and the proof check first.
pub struct SubmissionGuard {
    store: Arc<dyn SubmissionStore>,
    verifier: Arc<dyn ProofVerifier>,
}

impl SubmissionGuard {
    pub fn new(store: Arc<dyn SubmissionStore>, verifier: Arc<dyn ProofVerifier>) -> Self {
        Self { store, verifier }
    }

    pub fn scope(&self) -> StorageScope {
        self.store.scope()
    }

    /// Record `handle` for `caller`, the authenticated sender.
    pub async fn submit(
        &self,
        caller: &Identity,
        handle: CiphertextHandle,
        proof: ValidityProof,
    ) -> Result<Ack> {
        let scope = self.store.scope();

        if self.store.has_submitted(caller) {
            warn!(identity = %caller, "Rejected duplicate submission");
            return Err(SurveyError::DuplicateSubmission { identity: *caller });
        }

        if handle.is_absent() || !self.verifier.verify(&handle, &proof, &scope, caller) {
            warn!(identity = %caller, %handle, "Rejected invalid proof");
            return Err(SurveyError::InvalidProof { identity: *caller });
        }

        // A concurrent submit may have landed since the check above; the
        // store re-checks atomically.
        let record = self.store.insert_once(*caller, handle).await?;

        info!(identity = %caller, handle = %record.handle, "Survey submitted");
        Ok(Ack {
            identity: record.identity,
            handle: record.handle,
            scope,
        })
    }

    pub fn has_submitted(&self, identity: &Identity) -> bool {
        self.store.has_submitted(identity)
    }

    /// The stored handle or the absent sentinel.
    pub fn get_encrypted_data(&self, identity: &Identity) -> CiphertextHandle {
        self.store.get_ciphertext(identity)
    }
}
