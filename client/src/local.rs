//! In-process stand-in for the encryption service and decryption oracle.
//!
//! Handles are random 32-byte values; the plaintext never appears in them.
//! The service keeps its own handle table (like a mock FHE coprocessor),
//! records the scope and owner every handle was produced for, and only
//! releases a plaintext to that owner under that scope. Fault switches
//! let tests exercise the failure paths.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::broker::DecryptionRequest;
use crate::crypto::{DecryptionOracle, EncryptedFieldType, EncryptedInput, Encryptor, ProofVerifier};
use crate::error::{Result, SurveyError};
use crate::types::{CiphertextHandle, Identity, StorageScope, ValidityProof};

struct LocalCiphertext {
    plaintext: u64,
    field: EncryptedFieldType,
    scope: StorageScope,
    owner: Identity,
}

pub struct LocalFhe {
    secret: [u8; 32],
    ciphertexts: DashMap<CiphertextHandle, LocalCiphertext>,
    oracle_delay: Duration,
    drop_proof: AtomicBool,
    stall_oracle: AtomicBool,
    fail_oracle: AtomicBool,
    oracle_calls: AtomicUsize,
}

impl Default for LocalFhe {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalFhe {
    pub fn new() -> Self {
        Self {
            secret: rand::random(),
            ciphertexts: DashMap::new(),
            oracle_delay: Duration::ZERO,
            drop_proof: AtomicBool::new(false),
            stall_oracle: AtomicBool::new(false),
            fail_oracle: AtomicBool::new(false),
            oracle_calls: AtomicUsize::new(0),
        }
    }

    /// Every oracle answer takes at least `delay`.
    pub fn with_oracle_delay(mut self, delay: Duration) -> Self {
        self.oracle_delay = delay;
        self
    }

    /// Return handles without an input proof.
    pub fn set_drop_proof(&self, on: bool) {
        self.drop_proof.store(on, Ordering::SeqCst);
    }

    /// Never answer decryption requests.
    pub fn set_stall_oracle(&self, on: bool) {
        self.stall_oracle.store(on, Ordering::SeqCst);
    }

    /// Answer decryption requests with a failure.
    pub fn set_fail_oracle(&self, on: bool) {
        self.fail_oracle.store(on, Ordering::SeqCst);
    }

    pub fn oracle_calls(&self) -> usize {
        self.oracle_calls.load(Ordering::SeqCst)
    }

    fn proof_tag(
        &self,
        handle: &CiphertextHandle,
        scope: &StorageScope,
        submitter: &Identity,
    ) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(b"local-fhe/input-proof");
        hasher.update(self.secret);
        hasher.update(handle.as_bytes());
        hasher.update(scope.as_bytes());
        hasher.update(submitter.as_bytes());
        hasher.finalize().to_vec()
    }
}

#[async_trait]
impl Encryptor for LocalFhe {
    async fn encrypt(
        &self,
        field: EncryptedFieldType,
        plaintext: u64,
        scope: StorageScope,
        submitter: Identity,
    ) -> Result<EncryptedInput> {
        if !field.fits(plaintext) {
            return Err(SurveyError::EncryptionFailed(format!(
                "{plaintext} does not fit in {} bits",
                field.bits()
            )));
        }

        let mut bytes: [u8; 32] = rand::random();
        // Zero is reserved for "absent".
        bytes[0] |= 1;
        let handle = CiphertextHandle::new(bytes);

        self.ciphertexts.insert(
            handle,
            LocalCiphertext {
                plaintext,
                field,
                scope,
                owner: submitter,
            },
        );
        debug!(%handle, ?field, "Encrypted input");

        let input_proof = if self.drop_proof.load(Ordering::SeqCst) {
            None
        } else {
            Some(ValidityProof::new(self.proof_tag(&handle, &scope, &submitter)))
        };
        Ok(EncryptedInput {
            handles: vec![handle],
            input_proof,
        })
    }
}

impl ProofVerifier for LocalFhe {
    fn verify(
        &self,
        handle: &CiphertextHandle,
        proof: &ValidityProof,
        scope: &StorageScope,
        submitter: &Identity,
    ) -> bool {
        let bound = self
            .ciphertexts
            .get(handle)
            .map(|c| c.scope == *scope && c.owner == *submitter)
            .unwrap_or(false);
        bound && proof.as_bytes() == self.proof_tag(handle, scope, submitter).as_slice()
    }
}

#[async_trait]
impl DecryptionOracle for LocalFhe {
    async fn decrypt(&self, request: &DecryptionRequest) -> Result<u64> {
        self.oracle_calls.fetch_add(1, Ordering::SeqCst);

        if !self.oracle_delay.is_zero() {
            tokio::time::sleep(self.oracle_delay).await;
        }
        if self.stall_oracle.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_oracle.load(Ordering::SeqCst) {
            return Err(SurveyError::OracleFailure("relayer unavailable".into()));
        }

        let entry = self
            .ciphertexts
            .get(&request.handle)
            .ok_or_else(|| SurveyError::OracleFailure(format!("unknown handle {}", request.handle)))?;
        if entry.scope != request.scope {
            return Err(SurveyError::ScopeMismatch(format!(
                "handle {} was not issued for scope {}",
                request.handle, request.scope
            )));
        }
        if entry.owner != request.requester {
            return Err(SurveyError::Unauthorized(format!(
                "{} may not decrypt {}",
                request.requester, request.handle
            )));
        }
        debug_assert!(entry.field.fits(entry.plaintext));
        Ok(entry.plaintext)
    }
}
