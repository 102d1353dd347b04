use crate::backend::ChatBackend;
use crate::ollama::OllamaClient;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::agent_api::{BackendKind, BackendReply, BackendStatus, ConversationTurn, PersonaConfig};
use shared::settings::{BackendPreference, DispatchSettings};
use shared::BackendError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Picks the backend strategy that answers chat requests.
///
/// `Auto` probes the local server once and sticks with the outcome for the
/// lifetime of the router.
pub struct BackendRouter {
    preference: BackendPreference,
    local: OllamaClient,
    bridge: Option<Arc<dyn ChatBackend>>,
    detected: OnceCell<BackendKind>,
}

impl BackendRouter {
    pub fn new(settings: &DispatchSettings) -> Result<Self> {
        Ok(Self {
            preference: settings.backend,
            local: OllamaClient::new(&settings.ollama_base_url)?,
            bridge: None,
            detected: OnceCell::new(),
        })
    }

    /// Install a hosted bridge (usually a [`crate::bridge::HostedBridge`]).
    pub fn with_bridge(mut self, bridge: Arc<dyn ChatBackend>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    pub fn local(&self) -> &OllamaClient {
        &self.local
    }

    /// Returns which backend will handle the next send.
    pub async fn active_backend(&self) -> BackendKind {
        match self.preference {
            BackendPreference::Local => BackendKind::Local,
            BackendPreference::Bridge => BackendKind::Bridge,
            BackendPreference::Auto => *self
                .detected
                .get_or_init(|| async {
                    let kind = if self.local.status().await.available {
                        BackendKind::Local
                    } else if self.bridge.is_some() {
                        BackendKind::Bridge
                    } else {
                        BackendKind::Local
                    };
                    info!(backend = %kind, "auto-detected chat backend");
                    kind
                })
                .await,
        }
    }

    /// Availability of the local server
    pub async fn status(&self) -> BackendStatus {
        self.local.status().await
    }
}

#[async_trait]
impl ChatBackend for BackendRouter {
    async fn send(
        &self,
        conversation: &[ConversationTurn],
        persona: &PersonaConfig,
        timeout: Duration,
    ) -> Result<BackendReply, BackendError> {
        let started = Instant::now();
        let kind = tokio::time::timeout(timeout, self.active_backend())
            .await
            .map_err(|_| {
                BackendError::new(
                    BackendKind::Local,
                    anyhow!("no reply within {}ms", timeout.as_millis()),
                )
            })?;
        let remaining = timeout.saturating_sub(started.elapsed());
        debug!(backend = %kind, persona = %persona.id, "routing chat");

        match kind {
            BackendKind::Local => self.local.send(conversation, persona, remaining).await,
            BackendKind::Bridge => match &self.bridge {
                Some(bridge) => bridge.send(conversation, persona, remaining).await,
                None => Err(BackendError::new(
                    BackendKind::Bridge,
                    anyhow!("No hosted bridge configured"),
                )),
            },
        }
    }
}
