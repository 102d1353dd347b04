//! Normalized output of one dispatch.
//!
//! Live and fallback answers share this shape so callers can render them the
//! same way and only look at `source` to add an attribution note.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent_api::{BackendKind, BackendReply, PersonaConfig};

/// Where the content of a result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    /// Generated by a live backend
    Live,
    /// Canned response substituted for a failed backend
    Fallback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchResult {
    pub success: bool,
    pub content: String,
    /// Model the persona is configured for (or that answered)
    pub backend_model: String,
    pub source: ResultSource,
    pub persona_id: String,
    pub persona_display_name: String,
    /// Concrete backend that answered; absent for fallback results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    /// Failure that caused a fallback, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl DispatchResult {
    /// Result for a reply produced by a live backend
    pub fn live(persona: &PersonaConfig, reply: BackendReply, latency_ms: u64) -> Self {
        Self {
            success: true,
            content: reply.content,
            backend_model: reply.model,
            source: ResultSource::Live,
            persona_id: persona.id.clone(),
            persona_display_name: persona.display_name.clone(),
            backend: Some(reply.backend),
            latency_ms: Some(latency_ms),
            error: None,
            note: None,
            created_at: Utc::now(),
        }
    }

    /// Result for a canned response
    pub fn fallback(
        persona: &PersonaConfig,
        content: impl Into<String>,
        note: impl Into<String>,
    ) -> Self {
        Self {
            success: true,
            content: content.into(),
            backend_model: persona.backend_model.clone(),
            source: ResultSource::Fallback,
            persona_id: persona.id.clone(),
            persona_display_name: persona.display_name.clone(),
            backend: None,
            latency_ms: None,
            error: None,
            note: Some(note.into()),
            created_at: Utc::now(),
        }
    }

    /// Record the failure that led to this result
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn is_live(&self) -> bool {
        self.source == ResultSource::Live
    }

    /// Attribution line for display, e.g. "GRD1.7 (Primary Core) via llama3.3:latest"
    pub fn attribution(&self) -> String {
        match self.source {
            ResultSource::Live => match self.latency_ms {
                Some(ms) => format!(
                    "{} via {} ({}ms)",
                    self.persona_display_name, self.backend_model, ms
                ),
                None => format!("{} via {}", self.persona_display_name, self.backend_model),
            },
            ResultSource::Fallback => format!("{} (simulated)", self.persona_display_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn persona() -> PersonaConfig {
        PersonaConfig {
            id: "ale".into(),
            display_name: "ALE (Swift Response)".into(),
            backend_model: "llama3.3:latest".into(),
            system_prompt: "You are ALE.".into(),
            temperature: 0.5,
            max_tokens: 1024,
            description: String::new(),
        }
    }

    #[test]
    fn test_live_result() {
        let reply = BackendReply {
            content: "hello".into(),
            backend: BackendKind::Local,
            model: "llama3.3:latest".into(),
        };
        let result = DispatchResult::live(&persona(), reply, 42);
        assert!(result.success);
        assert!(result.is_live());
        assert_eq!(result.backend, Some(BackendKind::Local));
        assert_eq!(result.attribution(), "ALE (Swift Response) via llama3.3:latest (42ms)");
    }

    #[test]
    fn test_fallback_result_serializes_source() {
        let result = DispatchResult::fallback(&persona(), "canned", "not live")
            .with_error("connection refused");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["source"], "fallback");
        assert_eq!(json["success"], true);
        assert_eq!(json["error"], "connection refused");
        assert!(json.get("latency_ms").is_none());
        assert_eq!(result.attribution(), "ALE (Swift Response) (simulated)");
    }
}
