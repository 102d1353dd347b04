//! The contract every chat backend satisfies.

use anyhow::anyhow;
use async_trait::async_trait;
use shared::agent_api::{BackendKind, BackendReply, ConversationTurn, PersonaConfig};
use shared::BackendError;
use std::future::Future;
use std::time::Duration;

/// Sampling hints forwarded to a backend. Interpretation is backend-specific.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingHints {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl From<&PersonaConfig> for SamplingHints {
    fn from(persona: &PersonaConfig) -> Self {
        Self {
            temperature: persona.temperature,
            max_tokens: persona.max_tokens,
        }
    }
}

/// One round trip to a text-generation backend.
///
/// Note: Uses async_trait for object safety
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send `conversation` on behalf of `persona`, waiting at most `timeout`.
    ///
    /// Implementations prepend the persona's system prompt and leave the
    /// caller's turns untouched. An empty reply is a valid success.
    async fn send(
        &self,
        conversation: &[ConversationTurn],
        persona: &PersonaConfig,
        timeout: Duration,
    ) -> Result<BackendReply, BackendError>;
}

/// Copy of `conversation` with the persona's system prompt as the first turn.
pub fn with_system_prompt(
    conversation: &[ConversationTurn],
    persona: &PersonaConfig,
) -> Vec<ConversationTurn> {
    let mut turns = Vec::with_capacity(conversation.len() + 1);
    turns.push(ConversationTurn::system(persona.system_prompt.clone()));
    turns.extend(conversation.iter().cloned());
    turns
}

/// Run `fut`, mapping both its error and an elapsed deadline to [`BackendError`].
pub async fn within_timeout<T, F>(
    backend: BackendKind,
    timeout: Duration,
    fut: F,
) -> Result<T, BackendError>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(BackendError::new(backend, e)),
        Err(_) => Err(BackendError::new(
            backend,
            anyhow!("no reply within {}ms", timeout.as_millis()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn persona() -> PersonaConfig {
        PersonaConfig {
            id: "grd27".into(),
            display_name: "GRD2.7 (Deep Logic)".into(),
            backend_model: "deepseek-r1:latest".into(),
            system_prompt: "You are GRD2.7.".into(),
            temperature: 0.5,
            max_tokens: 4096,
            description: String::new(),
        }
    }

    #[test]
    fn test_system_prompt_goes_first() {
        let conversation = vec![
            ConversationTurn::system("caller system turn"),
            ConversationTurn::user("hi"),
        ];
        let turns = with_system_prompt(&conversation, &persona());

        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0], ConversationTurn::system("You are GRD2.7."));
        assert_eq!(&turns[1..], conversation.as_slice());
        // caller's conversation is left alone
        assert_eq!(conversation.len(), 2);
    }

    #[test]
    fn test_hints_from_persona() {
        let hints = SamplingHints::from(&persona());
        assert_eq!(hints.max_tokens, 4096);
        assert!((hints.temperature - 0.5).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_elapsed_deadline_is_backend_error() {
        let result: Result<(), _> = within_timeout(
            BackendKind::Local,
            Duration::from_millis(1),
            std::future::pending::<anyhow::Result<()>>(),
        )
        .await;
        let err = result.unwrap_err();
        assert_eq!(err.backend, BackendKind::Local);
        assert!(err.to_string().contains("no reply within 1ms"));
    }
}
