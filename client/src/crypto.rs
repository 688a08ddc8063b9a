//! Contracts for the external cryptographic collaborators.
//!
//! Encryption, proof checking and decryption happen outside this crate; the
//! traits here are the only surface the protocol depends on.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::broker::DecryptionRequest;
use crate::error::{Result, SurveyError};
use crate::types::{CiphertextHandle, Identity, StorageScope, ValidityProof};

/// Supported encrypted scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncryptedFieldType {
    U8,
    U16,
    U32,
    U64,
}

impl EncryptedFieldType {
    /// Narrowest type able to hold `max`.
    pub const fn for_max_value(max: u64) -> Self {
        if max <= u8::MAX as u64 {
            Self::U8
        } else if max <= u16::MAX as u64 {
            Self::U16
        } else if max <= u32::MAX as u64 {
            Self::U32
        } else {
            Self::U64
        }
    }

    pub const fn bits(self) -> u32 {
        match self {
            Self::U8 => 8,
            Self::U16 => 16,
            Self::U32 => 32,
            Self::U64 => 64,
        }
    }

    pub const fn max_value(self) -> u64 {
        match self {
            Self::U8 => u8::MAX as u64,
            Self::U16 => u16::MAX as u64,
            Self::U32 => u32::MAX as u64,
            Self::U64 => u64::MAX,
        }
    }

    pub const fn fits(self, value: u64) -> bool {
        value <= self.max_value()
    }
}

/// What the encryption collaborator hands back: handles plus one proof
/// covering all of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedInput {
    pub handles: Vec<CiphertextHandle>,
    pub input_proof: Option<ValidityProof>,
}

impl EncryptedInput {
    /// The (handle, proof) pair for a single-value input. Anything else is
    /// an unusable encryption result.
    pub fn into_single(self) -> Result<(CiphertextHandle, ValidityProof)> {
        let proof = match self.input_proof {
            Some(proof) if !proof.is_empty() => proof,
            _ => return Err(SurveyError::EncryptionFailed("missing input proof".into())),
        };
        match self.handles.as_slice() {
            [handle] if !handle.is_absent() => Ok((*handle, proof)),
            [] => Err(SurveyError::EncryptionFailed("missing ciphertext handle".into())),
            [_] => Err(SurveyError::EncryptionFailed("zero ciphertext handle".into())),
            many => Err(SurveyError::EncryptionFailed(format!(
                "expected one handle, got {}",
                many.len()
            ))),
        }
    }
}

#[async_trait]
pub trait Encryptor: Send + Sync {
    async fn encrypt(
        &self,
        field: EncryptedFieldType,
        plaintext: u64,
        scope: StorageScope,
        submitter: Identity,
    ) -> Result<EncryptedInput>;
}

pub trait ProofVerifier: Send + Sync {
    fn verify(
        &self,
        handle: &CiphertextHandle,
        proof: &ValidityProof,
        scope: &StorageScope,
        submitter: &Identity,
    ) -> bool;
}

/// Off-path service turning an authorized request into a plaintext.
/// May be slow; callers bound it with a timeout.
#[async_trait]
pub trait DecryptionOracle: Send + Sync {
    async fn decrypt(&self, request: &DecryptionRequest) -> Result<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrowest_type() {
        assert_eq!(EncryptedFieldType::for_max_value(4), EncryptedFieldType::U8);
        assert_eq!(EncryptedFieldType::for_max_value(1024), EncryptedFieldType::U16);
        assert_eq!(EncryptedFieldType::for_max_value(1 << 20), EncryptedFieldType::U32);
        assert_eq!(EncryptedFieldType::for_max_value(u64::MAX), EncryptedFieldType::U64);
        assert!(!EncryptedFieldType::U8.fits(256));
    }

    #[test]
    fn handle_without_proof_is_unusable() {
        let input = EncryptedInput {
            handles: vec![CiphertextHandle::new([1u8; 32])],
            input_proof: None,
        };
        assert!(matches!(input.into_single(), Err(SurveyError::EncryptionFailed(_))));
    }

    #[test]
    fn proof_without_handle_is_unusable() {
        let input = EncryptedInput {
            handles: vec![],
            input_proof: Some(ValidityProof::new(vec![9u8; 32])),
        };
        assert!(matches!(input.into_single(), Err(SurveyError::EncryptionFailed(_))));
    }

    #[test]
    fn single_pair_is_accepted() {
        let handle = CiphertextHandle::new([1u8; 32]);
        let proof = ValidityProof::new(vec![2u8; 32]);
        let input = EncryptedInput {
            handles: vec![handle],
            input_proof: Some(proof.clone()),
        };
        assert_eq!(input.into_single().unwrap(), (handle, proof));
    }
}
