//! Decryption authorization broker.
//!
//! Turns (handle, scope) targets into signed, scoped oracle requests and
//! tracks each one as pending / resolved / failed. A request already pending
//! or resolved for the same (handle, scope, requester) is shared, never sent
//! to the oracle twice. Oracle calls run on their own task under a timeout,
//! so a caller walking away leaves nothing pending forever. Settled outcomes
//! are forgotten once `settled_ttl` has passed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::auth::{unix_now, DecryptionSignature, SignatureCache, SigningContext};
use crate::config::SurveyConfig;
use crate::crypto::DecryptionOracle;
use crate::error::{Result, SurveyError};
use crate::store::SubmissionStore;
use crate::types::{CiphertextHandle, Identity, StorageScope};

/// A handle and the store that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecryptionTarget {
    pub handle: CiphertextHandle,
    pub scope: StorageScope,
}

/// What the oracle receives. Lives only for one attempt.
#[derive(Debug, Clone)]
pub struct DecryptionRequest {
    pub handle: CiphertextHandle,
    pub scope: StorageScope,
    pub requester: Identity,
    pub signature: DecryptionSignature,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecryptionStatus {
    Pending,
    Resolved(u64),
    Failed(SurveyError),
}

impl DecryptionStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, DecryptionStatus::Pending)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, DecryptionStatus::Failed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RequestKey {
    handle: CiphertextHandle,
    scope: StorageScope,
    requester: Identity,
}

struct Tracked {
    generation: u64,
    rx: watch::Receiver<DecryptionStatus>,
}

/// Caller's view of one in-flight decryption.
pub struct PendingDecryption {
    handle: CiphertextHandle,
    rx: watch::Receiver<DecryptionStatus>,
}

impl PendingDecryption {
    pub fn handle(&self) -> CiphertextHandle {
        self.handle
    }

    pub fn status(&self) -> DecryptionStatus {
        self.rx.borrow().clone()
    }

    pub async fn wait(mut self) -> Result<u64> {
        loop {
            match &*self.rx.borrow_and_update() {
                DecryptionStatus::Resolved(value) => return Ok(*value),
                DecryptionStatus::Failed(err) => return Err(err.clone()),
                DecryptionStatus::Pending => {}
            }
            if self.rx.changed().await.is_err() {
                return Err(SurveyError::OracleFailure("decryption task vanished".into()));
            }
        }
    }
}

/// All targets of one `request_decryption` call.
pub struct DecryptionBatch {
    pending: Vec<PendingDecryption>,
}

impl DecryptionBatch {
    pub fn handles(&self) -> Vec<CiphertextHandle> {
        self.pending.iter().map(PendingDecryption::handle).collect()
    }

    pub fn statuses(&self) -> Vec<DecryptionStatus> {
        self.pending.iter().map(PendingDecryption::status).collect()
    }

    /// One plaintext per handle, or the first failure.
    pub async fn resolve(self) -> Result<HashMap<CiphertextHandle, u64>> {
        let mut results = HashMap::with_capacity(self.pending.len());
        for pending in self.pending {
            let handle = pending.handle();
            results.insert(handle, pending.wait().await?);
        }
        Ok(results)
    }
}

pub struct DecryptionBroker {
    oracle: Arc<dyn DecryptionOracle>,
    stores: HashMap<StorageScope, Arc<dyn SubmissionStore>>,
    chain_id: u64,
    timeout: Duration,
    settled_ttl: Duration,
    signature_validity_days: u64,
    signatures: SignatureCache,
    generation: AtomicU64,
    inflight: Arc<DashMap<RequestKey, Tracked>>,
}

impl DecryptionBroker {
    pub fn new(oracle: Arc<dyn DecryptionOracle>, config: &SurveyConfig) -> Self {
        Self {
            oracle,
            stores: HashMap::new(),
            chain_id: config.chain_id,
            timeout: config.oracle_timeout(),
            settled_ttl: config.settled_ttl(),
            signature_validity_days: config.signature_validity_days,
            signatures: SignatureCache::new(),
            generation: AtomicU64::new(0),
            inflight: Arc::new(DashMap::new()),
        }
    }

    /// Accept handles issued by `store`, under the store's scope.
    pub fn with_store(mut self, store: Arc<dyn SubmissionStore>) -> Self {
        self.stores.insert(store.scope(), store);
        self
    }

    /// Sign (or reuse a cached signature) for the targets' scopes with
    /// `signer`, then request as [`Self::request_decryption_signed`].
    /// Must be called inside a tokio runtime.
    pub fn request_decryption(
        &self,
        targets: &[DecryptionTarget],
        requester: Identity,
        signer: &SigningContext,
    ) -> Result<DecryptionBatch> {
        let scopes: Vec<StorageScope> = targets.iter().map(|t| t.scope).collect();
        let signature =
            self.signatures
                .get_or_sign(signer, &scopes, unix_now(), self.signature_validity_days);
        self.request_decryption_signed(targets, requester, &signature)
    }

    /// Validate scope and authorization for every target, then start (or
    /// join) one oracle call per target. Nothing is started unless every
    /// target passes.
    ///
    /// A target must name a store this broker serves, that store must hold
    /// the handle, and the handle's record must belong to `requester`.
    pub fn request_decryption_signed(
        &self,
        targets: &[DecryptionTarget],
        requester: Identity,
        signature: &DecryptionSignature,
    ) -> Result<DecryptionBatch> {
        let mut stores = Vec::with_capacity(targets.len());
        for target in targets {
            match self.stores.get(&target.scope) {
                Some(store) => stores.push(store),
                None => {
                    warn!(%requester, scope = %target.scope, "Decryption refused: unknown scope");
                    return Err(SurveyError::ScopeMismatch(format!(
                        "handle {} is not bound to a known store",
                        target.handle
                    )));
                }
            }
        }

        if let Err(err) = signature.verify(&requester, self.chain_id, unix_now()) {
            warn!(%requester, error = %err, "Decryption refused");
            return Err(err);
        }
        if let Some(target) = targets.iter().find(|t| !signature.covers(&t.scope)) {
            warn!(%requester, scope = %target.scope, "Decryption refused: scope not signed");
            return Err(SurveyError::Unauthorized(format!(
                "signature does not cover scope {}",
                target.scope
            )));
        }

        for (target, store) in targets.iter().zip(stores) {
            match store.owner_of(&target.handle) {
                None => {
                    warn!(
                        %requester,
                        handle = %target.handle,
                        scope = %target.scope,
                        "Decryption refused: handle not issued by store"
                    );
                    return Err(SurveyError::ScopeMismatch(format!(
                        "handle {} was not issued by store {}",
                        target.handle, target.scope
                    )));
                }
                Some(owner) if owner != requester => {
                    warn!(%requester, handle = %target.handle, "Decryption refused: not the owner");
                    return Err(SurveyError::Unauthorized(format!(
                        "{} may not decrypt {}",
                        requester, target.handle
                    )));
                }
                Some(_) => {}
            }
        }

        let pending = targets
            .iter()
            .map(|target| self.track(*target, requester, signature))
            .collect();
        Ok(DecryptionBatch { pending })
    }

    pub fn status(
        &self,
        handle: CiphertextHandle,
        scope: StorageScope,
        requester: Identity,
    ) -> Option<DecryptionStatus> {
        let key = RequestKey {
            handle,
            scope,
            requester,
        };
        self.inflight
            .get(&key)
            .map(|tracked| tracked.rx.borrow().clone())
    }

    pub fn pending_count(&self) -> usize {
        self.inflight
            .iter()
            .filter(|entry| entry.value().rx.borrow().is_pending())
            .count()
    }

    /// Drop settled outcomes now instead of waiting for their TTL; pending
    /// requests are kept.
    pub fn clear_settled(&self) {
        self.inflight
            .retain(|_, tracked| tracked.rx.borrow().is_pending());
    }

    fn track(
        &self,
        target: DecryptionTarget,
        requester: Identity,
        signature: &DecryptionSignature,
    ) -> PendingDecryption {
        let key = RequestKey {
            handle: target.handle,
            scope: target.scope,
            requester,
        };

        // The entry is in place before its task starts, so the task's
        // eviction can never run ahead of the insert.
        let (rx, start) = match self.inflight.entry(key) {
            Entry::Occupied(mut slot) => {
                if slot.get().rx.borrow().is_failed() {
                    let (tracked, tx) = self.fresh();
                    let rx = tracked.rx.clone();
                    let generation = tracked.generation;
                    slot.insert(tracked);
                    (rx, Some((tx, generation)))
                } else {
                    debug!(handle = %key.handle, %requester, "Joining existing decryption");
                    (slot.get().rx.clone(), None)
                }
            }
            Entry::Vacant(slot) => {
                let (tracked, tx) = self.fresh();
                let rx = tracked.rx.clone();
                let generation = tracked.generation;
                slot.insert(tracked);
                (rx, Some((tx, generation)))
            }
        };

        if let Some((tx, generation)) = start {
            self.spawn(key, signature, tx, generation);
        }

        PendingDecryption {
            handle: target.handle,
            rx,
        }
    }

    fn fresh(&self) -> (Tracked, watch::Sender<DecryptionStatus>) {
        let (tx, rx) = watch::channel(DecryptionStatus::Pending);
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        (Tracked { generation, rx }, tx)
    }

    fn spawn(
        &self,
        key: RequestKey,
        signature: &DecryptionSignature,
        tx: watch::Sender<DecryptionStatus>,
        generation: u64,
    ) {
        let request = DecryptionRequest {
            handle: key.handle,
            scope: key.scope,
            requester: key.requester,
            signature: signature.clone(),
        };
        let oracle = self.oracle.clone();
        let timeout = self.timeout;
        let settled_ttl = self.settled_ttl;
        let inflight = self.inflight.clone();

        info!(handle = %key.handle, requester = %key.requester, "Decryption requested");
        tokio::spawn(async move {
            let status = match tokio::time::timeout(timeout, oracle.decrypt(&request)).await {
                Ok(Ok(value)) => DecryptionStatus::Resolved(value),
                Ok(Err(err)) => DecryptionStatus::Failed(err),
                Err(_) => DecryptionStatus::Failed(SurveyError::OracleTimeout {
                    timeout_ms: timeout.as_millis() as u64,
                }),
            };
            match &status {
                DecryptionStatus::Failed(err) => {
                    warn!(handle = %request.handle, error = %err, "Decryption failed")
                }
                _ => debug!(handle = %request.handle, "Decryption resolved"),
            }
            // Waiters that already hold a receiver still see the outcome.
            tx.send_replace(status);
            drop(request);

            tokio::time::sleep(settled_ttl).await;
            // A retry may have replaced the entry with a newer generation.
            inflight.remove_if(&key, |_, tracked| tracked.generation == generation);
        });
    }
}
