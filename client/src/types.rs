//! Value types shared by every component.
//!
//! Handles, proofs, scopes and identities are immutable byte values with
//! value equality. Nothing hands out a mutable view of their bytes.

use std::fmt;

use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A participant. The raw bytes are the participant's ed25519 public key,
/// the same way a Solana address is.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity([u8; 32]);

impl Identity {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        Self(key.to_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({}..)", hex::encode(&self.0[..4]))
    }
}

/// Address of the store a ciphertext (or decryption request) is bound to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StorageScope([u8; 32]);

impl StorageScope {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Deterministic scope for a named store deployment.
    pub fn derive(label: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"confidential-survey/scope");
        hasher.update(label.as_bytes());
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for StorageScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for StorageScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorageScope({}..)", hex::encode(&self.0[..4]))
    }
}

/// Opaque reference to an encrypted value.
///
/// Real handles are never all-zero, so [`CiphertextHandle::ABSENT`] is a
/// safe sentinel for "no record". Presence itself is tracked separately in
/// [`SubmissionRecord::present`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CiphertextHandle([u8; 32]);

impl CiphertextHandle {
    pub const ABSENT: Self = Self([0u8; 32]);

    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn is_absent(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CiphertextHandle(0x{}..)", hex::encode(&self.0[..4]))
    }
}

/// Attestation that a ciphertext was formed for a given scope and submitter.
/// Consumed by the guard, never stored.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityProof(Vec<u8>);

impl ValidityProof {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ValidityProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValidityProof({} bytes)", self.0.len())
    }
}

/// One entry per identity, written at most once.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub identity: Identity,
    pub handle: CiphertextHandle,
    pub present: bool,
}

impl SubmissionRecord {
    pub fn absent(identity: Identity) -> Self {
        Self {
            identity,
            handle: CiphertextHandle::ABSENT,
            present: false,
        }
    }
}

/// Acknowledgement of a durable write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ack {
    pub identity: Identity,
    pub handle: CiphertextHandle,
    pub scope: StorageScope,
}
