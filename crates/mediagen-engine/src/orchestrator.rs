use std::path::PathBuf;

use anyhow::Result;
use mediagen_contracts::error::GenerateError;
use mediagen_contracts::request::GenerationRequest;
use mediagen_contracts::result::{GenerationResult, History};

use crate::providers::ProviderRegistry;
use crate::store::FileStore;

/// Sequences one submission: adapter call, persistence, history record.
/// Owns the session history; callers inject it by owning the orchestrator,
/// nothing here is global. One attempt per submit, no retry.
pub struct Orchestrator {
    registry: ProviderRegistry,
    store: FileStore,
    history: History,
}

impl Orchestrator {
    pub fn new(registry: ProviderRegistry, store: FileStore) -> Self {
        Self {
            registry,
            store,
            history: History::new(),
        }
    }

    /// Run a generation to its terminal state and record it. Every call
    /// appends exactly one history record; adapter and store failures
    /// land there as Failed, they do not bubble out.
    pub fn submit(&mut self, request: GenerationRequest) -> Result<&GenerationResult> {
        let mut result = GenerationResult::pending(request);
        match self.attempt(&result.request) {
            Ok(media_path) => result.mark_succeeded(media_path)?,
            Err(err) => {
                log::warn!("generation {} failed: {err}", result.id);
                result.mark_failed(err.user_message())?;
            }
        }
        self.history.push(result);
        Ok(self.history.last().expect("record just appended"))
    }

    fn attempt(&self, request: &GenerationRequest) -> Result<PathBuf, GenerateError> {
        let provider = self.registry.get(&request.provider).ok_or_else(|| {
            GenerateError::InvalidParameter(format!("unknown provider '{}'", request.provider))
        })?;
        if provider.kind() != request.kind {
            return Err(GenerateError::InvalidParameter(format!(
                "provider '{}' generates {}, not {}",
                request.provider,
                provider.kind().as_str(),
                request.kind.as_str()
            )));
        }
        let media = provider.generate(request)?;
        self.store.save(&media, request.kind)
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.registry.names()
    }
}
