//! Decryption authorization.
//!
//! A requester proves it may decrypt by signing the set of storage scopes it
//! wants to read from, bound to a chain id and a validity window. Signatures
//! are cached per (requester, scope set) so one signature covers every
//! request inside its window.

use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SurveyError};
use crate::types::{Identity, StorageScope};

const SIGNATURE_DOMAIN: &[u8] = b"confidential-survey/user-decrypt/v1";
const SECONDS_PER_DAY: u64 = 86_400;

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn normalize(scopes: &[StorageScope]) -> Vec<StorageScope> {
    let mut scopes = scopes.to_vec();
    scopes.sort();
    scopes.dedup();
    scopes
}

fn signing_payload(
    scopes: &[StorageScope],
    chain_id: u64,
    start_timestamp: u64,
    duration_days: u64,
) -> Vec<u8> {
    let mut payload = Vec::with_capacity(SIGNATURE_DOMAIN.len() + 24 + 32 * scopes.len() + 4);
    payload.extend_from_slice(SIGNATURE_DOMAIN);
    payload.extend_from_slice(&chain_id.to_le_bytes());
    payload.extend_from_slice(&start_timestamp.to_le_bytes());
    payload.extend_from_slice(&duration_days.to_le_bytes());
    payload.extend_from_slice(&(scopes.len() as u32).to_le_bytes());
    for scope in scopes {
        payload.extend_from_slice(scope.as_bytes());
    }
    payload
}

/// A requester's signed permission to decrypt handles bound to `scopes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionSignature {
    pub public_key: [u8; 32],
    /// Sorted and deduplicated
    pub scopes: Vec<StorageScope>,
    pub chain_id: u64,
    pub start_timestamp: u64,
    pub duration_days: u64,
    pub signature: Vec<u8>,
}

impl DecryptionSignature {
    pub fn requester(&self) -> Identity {
        Identity::new(self.public_key)
    }

    pub fn expires_at(&self) -> u64 {
        self.start_timestamp
            .saturating_add(self.duration_days.saturating_mul(SECONDS_PER_DAY))
    }

    pub fn is_valid_at(&self, now: u64) -> bool {
        now >= self.start_timestamp && now < self.expires_at()
    }

    pub fn covers(&self, scope: &StorageScope) -> bool {
        self.scopes.binary_search(scope).is_ok()
    }

    /// Check the signature is genuine, belongs to `requester`, targets
    /// `chain_id` and is inside its window at `now`.
    pub fn verify(&self, requester: &Identity, chain_id: u64, now: u64) -> Result<()> {
        if self.requester() != *requester {
            return Err(SurveyError::Unauthorized(format!(
                "signature belongs to {}, not {}",
                self.requester(),
                requester
            )));
        }
        if self.chain_id != chain_id {
            return Err(SurveyError::Unauthorized(format!(
                "signature is for chain {}, expected {}",
                self.chain_id, chain_id
            )));
        }
        if !self.is_valid_at(now) {
            return Err(SurveyError::Unauthorized("signature expired or not yet valid".into()));
        }
        if normalize(&self.scopes) != self.scopes {
            return Err(SurveyError::Unauthorized("scope list is not canonical".into()));
        }

        let key = VerifyingKey::from_bytes(&self.public_key)
            .map_err(|_| SurveyError::Unauthorized("malformed public key".into()))?;
        let signature = Signature::from_slice(&self.signature)
            .map_err(|_| SurveyError::Unauthorized("malformed signature".into()))?;
        let payload =
            signing_payload(&self.scopes, self.chain_id, self.start_timestamp, self.duration_days);
        key.verify(&payload, &signature)
            .map_err(|_| SurveyError::Unauthorized("signature does not verify".into()))
    }
}

/// The requester's key plus the chain it signs for.
pub struct SigningContext {
    key: SigningKey,
    chain_id: u64,
}

impl SigningContext {
    pub fn new(key: SigningKey, chain_id: u64) -> Self {
        Self { key, chain_id }
    }

    pub fn generate(chain_id: u64) -> Self {
        Self::new(SigningKey::from_bytes(&rand::random::<[u8; 32]>()), chain_id)
    }

    pub fn identity(&self) -> Identity {
        Identity::from_verifying_key(&self.key.verifying_key())
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn sign(
        &self,
        scopes: &[StorageScope],
        start_timestamp: u64,
        duration_days: u64,
    ) -> DecryptionSignature {
        let scopes = normalize(scopes);
        let payload = signing_payload(&scopes, self.chain_id, start_timestamp, duration_days);
        let signature = self.key.sign(&payload);
        DecryptionSignature {
            public_key: self.key.verifying_key().to_bytes(),
            scopes,
            chain_id: self.chain_id,
            start_timestamp,
            duration_days,
            signature: signature.to_bytes().to_vec(),
        }
    }
}

/// Keeps the latest signature per (requester, scope set).
#[derive(Default)]
pub struct SignatureCache {
    entries: DashMap<(Identity, Vec<StorageScope>), DecryptionSignature>,
}

impl SignatureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuse a cached signature still valid at `now` and for the signer's
    /// chain, otherwise sign a fresh one starting at `now`.
    pub fn get_or_sign(
        &self,
        signer: &SigningContext,
        scopes: &[StorageScope],
        now: u64,
        duration_days: u64,
    ) -> DecryptionSignature {
        let key = (signer.identity(), normalize(scopes));
        if let Some(cached) = self.entries.get(&key) {
            if cached.is_valid_at(now) && cached.chain_id == signer.chain_id() {
                return cached.clone();
            }
        }

        debug!(requester = %key.0, scopes = key.1.len(), "Signing decryption permission");
        let fresh = signer.sign(&key.1, now, duration_days);
        self.entries.insert(key, fresh.clone());
        fresh
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAIN: u64 = 31337;

    fn scope(label: &str) -> StorageScope {
        StorageScope::derive(label)
    }

    #[test]
    fn fresh_signature_verifies() {
        let ctx = SigningContext::generate(CHAIN);
        let sig = ctx.sign(&[scope("a")], 1_000, 1);
        assert!(sig.verify(&ctx.identity(), CHAIN, 1_000).is_ok());
        assert!(sig.covers(&scope("a")));
        assert!(!sig.covers(&scope("b")));
    }

    #[test]
    fn window_is_half_open() {
        let ctx = SigningContext::generate(CHAIN);
        let sig = ctx.sign(&[scope("a")], 1_000, 1);
        assert!(sig.verify(&ctx.identity(), CHAIN, 999).is_err());
        assert!(sig.verify(&ctx.identity(), CHAIN, 1_000 + SECONDS_PER_DAY - 1).is_ok());
        assert!(sig.verify(&ctx.identity(), CHAIN, 1_000 + SECONDS_PER_DAY).is_err());
    }

    #[test]
    fn other_requester_is_unauthorized() {
        let alice = SigningContext::generate(CHAIN);
        let mallory = SigningContext::generate(CHAIN);
        let sig = alice.sign(&[scope("a")], 1_000, 1);
        let err = sig.verify(&mallory.identity(), CHAIN, 1_000).unwrap_err();
        assert!(matches!(err, SurveyError::Unauthorized(_)));
    }

    #[test]
    fn chain_is_bound() {
        let ctx = SigningContext::generate(CHAIN);
        let sig = ctx.sign(&[scope("a")], 1_000, 1);
        assert!(sig.verify(&ctx.identity(), 1, 1_000).is_err());
    }

    #[test]
    fn widened_scope_list_breaks_signature() {
        let ctx = SigningContext::generate(CHAIN);
        let mut sig = ctx.sign(&[scope("a")], 1_000, 1);
        sig.scopes = normalize(&[scope("a"), scope("b")]);
        assert!(sig.verify(&ctx.identity(), CHAIN, 1_000).is_err());
    }

    #[test]
    fn cache_reuses_until_expiry() {
        let ctx = SigningContext::generate(CHAIN);
        let cache = SignatureCache::new();
        let first = cache.get_or_sign(&ctx, &[scope("a")], 1_000, 1);
        let again = cache.get_or_sign(&ctx, &[scope("a")], 2_000, 1);
        assert_eq!(first, again);
        assert_eq!(cache.len(), 1);

        let renewed = cache.get_or_sign(&ctx, &[scope("a")], 1_000 + SECONDS_PER_DAY, 1);
        assert_ne!(first, renewed);
        assert_eq!(renewed.start_timestamp, 1_000 + SECONDS_PER_DAY);
    }
}
