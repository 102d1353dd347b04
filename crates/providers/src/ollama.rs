use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::agent_api::{
    BackendKind, BackendReply, BackendStatus, ConversationTurn, PersonaConfig,
};
use shared::BackendError;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::backend::{with_system_prompt, within_timeout, ChatBackend, SamplingHints};

const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

static SHARED_HTTP: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .pool_max_idle_per_host(2)
        .build()
        .expect("failed to build HTTP client")
});

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
    /// Bare base64 images, only for vision models
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    #[serde(default)]
    models: Vec<OllamaModelTag>,
}

#[derive(Debug, Deserialize)]
struct OllamaModelTag {
    name: String,
}

impl From<ConversationTurn> for OllamaMessage {
    fn from(turn: ConversationTurn) -> Self {
        Self {
            role: turn.role.as_str().to_string(),
            images: turn
                .attached_image
                .map(|image| vec![image.to_base64()])
                .unwrap_or_default(),
            content: turn.content,
        }
    }
}

/// Client for a local Ollama server
#[derive(Clone)]
pub struct OllamaClient {
    http: Client,
    base: String,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base = base_url.trim().trim_end_matches('/').to_string();
        Url::parse(&base).with_context(|| format!("invalid Ollama URL: {}", base_url))?;
        Ok(Self {
            http: SHARED_HTTP.clone(),
            base,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    async fn post_chat(
        &self,
        messages: Vec<OllamaMessage>,
        model: &str,
        hints: SamplingHints,
    ) -> Result<String> {
        let url = format!("{}/api/chat", self.base);
        let req = OllamaChatRequest {
            model,
            messages,
            stream: false,
            options: OllamaOptions {
                temperature: hints.temperature,
                num_predict: hints.max_tokens,
            },
        };
        let resp = self.http.post(url).json(&req).send().await?;
        if !resp.status().is_success() {
            return Err(anyhow!("ollama error: {}", resp.status()));
        }
        let body: OllamaChatResponse = resp
            .json()
            .await
            .context("unexpected Ollama reply shape")?;
        Ok(body.message.content)
    }

    /// Probe `GET /api/tags`. Never fails; an unreachable server is reported
    /// as unavailable.
    pub async fn status(&self) -> BackendStatus {
        let url = format!("{}/api/tags", self.base);
        let probe = async {
            let resp = self.http.get(url).timeout(STATUS_TIMEOUT).send().await?;
            if !resp.status().is_success() {
                return Err(anyhow!("ollama error: {}", resp.status()));
            }
            let tags: OllamaTagsResponse = resp.json().await?;
            Ok::<_, anyhow::Error>(tags.models.into_iter().map(|m| m.name).collect::<Vec<_>>())
        };

        match probe.await {
            Ok(models) => BackendStatus {
                available: true,
                url: self.base.clone(),
                models,
                error: None,
            },
            Err(e) => {
                debug!(url = %self.base, error = %e, "ollama status probe failed");
                BackendStatus::unavailable(
                    self.base.clone(),
                    "Ollama not running. Install from https://ollama.com",
                )
            }
        }
    }
}

#[async_trait]
impl ChatBackend for OllamaClient {
    async fn send(
        &self,
        conversation: &[ConversationTurn],
        persona: &PersonaConfig,
        timeout: Duration,
    ) -> Result<BackendReply, BackendError> {
        let messages: Vec<OllamaMessage> = with_system_prompt(conversation, persona)
            .into_iter()
            .map(OllamaMessage::from)
            .collect();
        debug!(
            model = %persona.backend_model,
            turns = messages.len(),
            "sending chat to ollama"
        );

        let content = within_timeout(
            BackendKind::Local,
            timeout,
            self.post_chat(messages, &persona.backend_model, SamplingHints::from(persona)),
        )
        .await?;

        Ok(BackendReply {
            content,
            backend: BackendKind::Local,
            model: persona.backend_model.clone(),
        })
    }
}
