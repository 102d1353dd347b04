use anyhow::Result;
use providers::{BackendRouter, ChatBackend, OllamaClient};
use shared::agent_api::{BackendStatus, ConversationTurn, PersonaConfig};
use shared::settings::DispatchSettings;
use shared::{DispatchError, DispatchResult};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

use crate::fallback::FallbackGenerator;
use crate::personas::PersonaRegistry;

/// Per-call overrides of the dispatch settings
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    pub timeout: Option<Duration>,
    /// Overrides `DispatchSettings::fallback_enabled`
    pub fallback: Option<bool>,
    /// Abandon the call when cancelled. Cancellation never triggers fallback.
    pub cancel: Option<CancellationToken>,
}

impl ChatOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_fallback(mut self, enabled: bool) -> Self {
        self.fallback = Some(enabled);
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Routes chat requests: persona lookup, one backend attempt, fallback on failure.
pub struct Dispatcher {
    registry: PersonaRegistry,
    backend: Arc<dyn ChatBackend>,
    local: Option<OllamaClient>,
    fallback: FallbackGenerator,
    settings: DispatchSettings,
}

impl Dispatcher {
    /// Dispatcher over the built-in personas and a router built from `settings`.
    pub fn new(settings: DispatchSettings) -> Result<Self> {
        let router = BackendRouter::new(&settings)?;
        Ok(Self::with_router(router, settings))
    }

    pub fn with_router(router: BackendRouter, settings: DispatchSettings) -> Self {
        let local = Some(router.local().clone());
        let mut dispatcher = Self::with_backend(Arc::new(router), settings);
        dispatcher.local = local;
        dispatcher
    }

    /// Dispatcher over any backend, e.g. a test double.
    pub fn with_backend(backend: Arc<dyn ChatBackend>, settings: DispatchSettings) -> Self {
        let fallback =
            FallbackGenerator::new().with_default_persona(settings.default_persona.clone());
        Self {
            registry: PersonaRegistry::builtin().clone(),
            backend,
            local: None,
            fallback,
            settings,
        }
    }

    pub fn with_registry(mut self, registry: PersonaRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_fallback_generator(mut self, fallback: FallbackGenerator) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    pub fn list_personas(&self) -> &[PersonaConfig] {
        self.registry.list()
    }

    pub fn persona(&self, id: &str) -> Result<&PersonaConfig, DispatchError> {
        self.registry.get(id)
    }

    /// Send `conversation` as `persona_id`.
    ///
    /// Unknown personas and cancellation always propagate. Backend failures
    /// turn into a simulated answer when fallback is enabled.
    pub async fn chat(
        &self,
        conversation: &[ConversationTurn],
        persona_id: &str,
        options: ChatOptions,
    ) -> Result<DispatchResult, DispatchError> {
        let persona = self.registry.get(persona_id)?;
        let timeout = options.timeout.unwrap_or_else(|| self.settings.timeout());
        let fallback_enabled = options.fallback.unwrap_or(self.settings.fallback_enabled);
        let span = info_span!("dispatch", request_id = %Uuid::new_v4(), persona = %persona.id);

        async move {
            let started = Instant::now();
            let send = self.backend.send(conversation, persona, timeout);
            let outcome = match &options.cancel {
                Some(token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        debug!("chat cancelled by caller");
                        return Err(DispatchError::Cancelled);
                    }
                    outcome = send => outcome,
                },
                None => send.await,
            };

            match outcome {
                Ok(reply) => {
                    let latency_ms = started.elapsed().as_millis() as u64;
                    debug!(latency_ms, backend = %reply.backend, "live reply");
                    Ok(DispatchResult::live(persona, reply, latency_ms))
                }
                Err(e) if fallback_enabled => {
                    warn!(error = %e, "backend unavailable, using simulated response");
                    Ok(self
                        .fallback
                        .generate(conversation, persona)
                        .with_error(e.to_string()))
                }
                Err(e) => Err(e.into()),
            }
        }
        .instrument(span)
        .await
    }

    /// Single-prompt shorthand for [`Dispatcher::chat`]
    pub async fn generate(
        &self,
        prompt: &str,
        persona_id: &str,
    ) -> Result<DispatchResult, DispatchError> {
        self.chat(&[ConversationTurn::user(prompt)], persona_id, ChatOptions::default())
            .await
    }

    /// Availability of the local server, with its installed models
    pub async fn backend_status(&self) -> BackendStatus {
        match &self.local {
            Some(local) => local.status().await,
            None => BackendStatus::unavailable("", "No local backend configured"),
        }
    }
}
