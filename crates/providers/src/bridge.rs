//! Hosted AI bridge backend.
//!
//! The bridge is reached through a client object supplied by the hosting
//! environment. This module only depends on the narrow [`BridgeClient`]
//! capability set, and owns the sign-in session for one adapter instance.

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use shared::agent_api::{BackendKind, BackendReply, ConversationTurn, PersonaConfig, Role};
use shared::BackendError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::backend::{with_system_prompt, within_timeout, ChatBackend, SamplingHints};

/// Capabilities a hosted bridge integration must provide
#[async_trait]
pub trait BridgeClient: Send + Sync {
    async fn is_signed_in(&self) -> Result<bool>;

    async fn sign_in(&self) -> Result<()>;

    /// Name of the signed-in user
    async fn whoami(&self) -> Result<String>;

    async fn sign_out(&self) -> Result<()>;

    /// Generate a reply for a flattened prompt
    async fn chat(&self, prompt: &str, hints: &SamplingHints) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    SignedOut,
    SigningIn,
    SignedIn,
}

/// Resets the session to `SignedOut` unless the sign-in completed, so an
/// abandoned sign-in never leaves the session stuck in `SigningIn`.
struct SigningIn<'a> {
    state: &'a Mutex<SessionState>,
    completed: bool,
}

impl<'a> SigningIn<'a> {
    fn begin(state: &'a Mutex<SessionState>) -> Self {
        *state.lock() = SessionState::SigningIn;
        Self {
            state,
            completed: false,
        }
    }

    fn complete(mut self) {
        *self.state.lock() = SessionState::SignedIn;
        self.completed = true;
    }
}

impl Drop for SigningIn<'_> {
    fn drop(&mut self) {
        if !self.completed {
            *self.state.lock() = SessionState::SignedOut;
        }
    }
}

pub struct HostedBridge {
    client: Arc<dyn BridgeClient>,
    state: Mutex<SessionState>,
    /// Serializes sign-in so concurrent sends share one attempt
    sign_in_gate: tokio::sync::Mutex<()>,
}

impl HostedBridge {
    pub fn new(client: Arc<dyn BridgeClient>) -> Self {
        Self {
            client,
            state: Mutex::new(SessionState::SignedOut),
            sign_in_gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn session_state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Sign in unless already signed in. Blocks until sign-in completes or fails.
    pub async fn sign_in(&self) -> Result<()> {
        if self.session_state() == SessionState::SignedIn {
            return Ok(());
        }
        let _gate = self.sign_in_gate.lock().await;
        // Another caller may have finished signing in while we waited
        if self.session_state() == SessionState::SignedIn {
            return Ok(());
        }

        let attempt = SigningIn::begin(&self.state);
        if !self.client.is_signed_in().await? {
            debug!("signing in to hosted bridge");
            self.client.sign_in().await.map_err(|e| {
                warn!(error = %e, "hosted bridge sign-in failed");
                e.context("hosted bridge sign-in failed")
            })?;
        }
        attempt.complete();
        info!("signed in to hosted bridge");
        Ok(())
    }

    pub async fn sign_out(&self) -> Result<()> {
        let _gate = self.sign_in_gate.lock().await;
        self.client.sign_out().await?;
        *self.state.lock() = SessionState::SignedOut;
        Ok(())
    }

    pub async fn whoami(&self) -> Result<String> {
        self.client.whoami().await
    }

    async fn signed_in_chat(&self, prompt: String, hints: SamplingHints) -> Result<String> {
        self.sign_in().await?;
        self.client.chat(&prompt, &hints).await
    }
}

/// Flatten a conversation into one role-labelled prompt string.
pub fn flatten_prompt(turns: &[ConversationTurn]) -> String {
    turns
        .iter()
        .map(|turn| {
            let label = match turn.role {
                Role::System => "System",
                Role::User => "User",
                Role::Assistant => "Assistant",
            };
            match turn.attached_image {
                Some(_) => format!("{}: {}\n[image attached]", label, turn.content),
                None => format!("{}: {}", label, turn.content),
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl ChatBackend for HostedBridge {
    async fn send(
        &self,
        conversation: &[ConversationTurn],
        persona: &PersonaConfig,
        timeout: Duration,
    ) -> Result<BackendReply, BackendError> {
        let prompt = flatten_prompt(&with_system_prompt(conversation, persona));
        let content = within_timeout(
            BackendKind::Bridge,
            timeout,
            self.signed_in_chat(prompt, SamplingHints::from(persona)),
        )
        .await?;

        Ok(BackendReply {
            content,
            backend: BackendKind::Bridge,
            model: persona.backend_model.clone(),
        })
    }
}
