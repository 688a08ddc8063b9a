//! Write-once submission storage.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use crate::error::{Result, SurveyError};
use crate::types::{CiphertextHandle, Identity, StorageScope, SubmissionRecord};

/// Durable identity -> ciphertext mapping.
///
/// `insert_once` is the only mutation and must be an atomic check-and-set
/// per identity: of two concurrent inserts for one identity exactly one
/// succeeds.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Address ciphertexts must be bound to.
    fn scope(&self) -> StorageScope;

    async fn insert_once(
        &self,
        identity: Identity,
        handle: CiphertextHandle,
    ) -> Result<SubmissionRecord>;

    fn record(&self, identity: &Identity) -> SubmissionRecord;

    fn has_submitted(&self, identity: &Identity) -> bool {
        self.record(identity).present
    }

    /// Stored handle, or [`CiphertextHandle::ABSENT`].
    fn get_ciphertext(&self, identity: &Identity) -> CiphertextHandle {
        self.record(identity).handle
    }

    /// Identity whose record holds `handle`, if this store issued it.
    fn owner_of(&self, handle: &CiphertextHandle) -> Option<Identity>;

    fn submission_count(&self) -> usize;
}

/// In-process store with the same semantics as the on-chain program.
/// Each identity lives in its own map slot, so identities never contend.
pub struct MemoryStore {
    scope: StorageScope,
    records: DashMap<Identity, SubmissionRecord>,
    owners: DashMap<CiphertextHandle, Identity>,
}

impl MemoryStore {
    pub fn new(scope: StorageScope) -> Self {
        Self {
            scope,
            records: DashMap::new(),
            owners: DashMap::new(),
        }
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    fn scope(&self) -> StorageScope {
        self.scope
    }

    async fn insert_once(
        &self,
        identity: Identity,
        handle: CiphertextHandle,
    ) -> Result<SubmissionRecord> {
        match self.records.entry(identity) {
            Entry::Occupied(_) => Err(SurveyError::DuplicateSubmission { identity }),
            Entry::Vacant(slot) => {
                let record = SubmissionRecord {
                    identity,
                    handle,
                    present: true,
                };
                // Indexed while the identity slot is still held.
                self.owners.insert(handle, identity);
                slot.insert(record.clone());
                debug!(%identity, %handle, "Submission recorded");
                Ok(record)
            }
        }
    }

    fn record(&self, identity: &Identity) -> SubmissionRecord {
        self.records
            .get(identity)
            .map(|r| r.value().clone())
            .unwrap_or_else(|| SubmissionRecord::absent(*identity))
    }

    fn owner_of(&self, handle: &CiphertextHandle) -> Option<Identity> {
        self.owners.get(handle).map(|owner| *owner)
    }

    fn submission_count(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        MemoryStore::new(StorageScope::derive("store-tests"))
    }

    #[tokio::test]
    async fn unknown_identity_is_absent() {
        let store = store();
        let alice = Identity::new([1u8; 32]);
        assert!(!store.has_submitted(&alice));
        assert!(store.get_ciphertext(&alice).is_absent());
        assert_eq!(store.submission_count(), 0);
    }

    #[tokio::test]
    async fn second_insert_leaves_first_record() {
        let store = store();
        let alice = Identity::new([1u8; 32]);
        let first = CiphertextHandle::new([5u8; 32]);

        store.insert_once(alice, first).await.unwrap();
        let err = store
            .insert_once(alice, CiphertextHandle::new([6u8; 32]))
            .await
            .unwrap_err();

        assert_eq!(err, SurveyError::DuplicateSubmission { identity: alice });
        assert_eq!(store.get_ciphertext(&alice), first);
        assert_eq!(store.submission_count(), 1);
        assert_eq!(store.owner_of(&first), Some(alice));
        assert_eq!(store.owner_of(&CiphertextHandle::new([6u8; 32])), None);
    }

    #[tokio::test]
    async fn identities_are_independent() {
        let store = store();
        let alice = Identity::new([1u8; 32]);
        let bob = Identity::new([2u8; 32]);
        store.insert_once(alice, CiphertextHandle::new([5u8; 32])).await.unwrap();
        store.insert_once(bob, CiphertextHandle::new([6u8; 32])).await.unwrap();
        assert!(store.has_submitted(&alice));
        assert!(store.has_submitted(&bob));
        assert_eq!(store.submission_count(), 2);
    }
}
