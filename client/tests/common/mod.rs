#![allow(dead_code)]

use std::sync::Arc;

use survey_client::{
    telemetry, DecryptionBroker, LocalFhe, MemoryStore, SigningContext, StorageScope,
    SubmissionGuard, SubmissionOrchestrator, SurveyConfig,
};

pub struct Harness {
    pub config: SurveyConfig,
    pub fhe: Arc<LocalFhe>,
    pub store: Arc<MemoryStore>,
    pub guard: Arc<SubmissionGuard>,
    pub broker: Arc<DecryptionBroker>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(LocalFhe::new(), SurveyConfig::default())
    }

    pub fn with(fhe: LocalFhe, config: SurveyConfig) -> Self {
        telemetry::init_tracing(&config.log_filter);

        let fhe = Arc::new(fhe);
        let store = Arc::new(MemoryStore::new(StorageScope::derive("private-health")));
        let guard = Arc::new(SubmissionGuard::new(store.clone(), fhe.clone()));
        let broker = Arc::new(DecryptionBroker::new(fhe.clone(), &config).with_store(store.clone()));

        Self {
            config,
            fhe,
            store,
            guard,
            broker,
        }
    }

    pub fn signer(&self) -> Arc<SigningContext> {
        Arc::new(SigningContext::generate(self.config.chain_id))
    }

    pub fn orchestrator(&self, signer: Arc<SigningContext>) -> SubmissionOrchestrator {
        SubmissionOrchestrator::new(signer, self.guard.clone(), self.fhe.clone(), self.broker.clone())
    }

    pub fn participant(&self) -> SubmissionOrchestrator {
        self.orchestrator(self.signer())
    }
}
