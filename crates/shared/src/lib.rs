pub mod error;
pub mod result;

pub use error::{BackendError, DispatchError};
pub use result::{DispatchResult, ResultSource};

pub mod settings {
    use serde::{Deserialize, Serialize};
    use std::env;
    use std::time::Duration;

    pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
    pub const DEFAULT_PERSONA: &str = "grd17";

    fn default_true() -> bool {
        true
    }

    fn default_timeout_ms() -> u64 {
        120_000
    }

    fn default_ollama_url() -> String {
        DEFAULT_OLLAMA_URL.to_string()
    }

    fn default_persona() -> String {
        DEFAULT_PERSONA.to_string()
    }

    /// Which backend strategy answers chat requests
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
    #[serde(rename_all = "lowercase")]
    pub enum BackendPreference {
        /// Always use the local Ollama server
        Local,
        /// Always use the hosted bridge (requires sign-in)
        Bridge,
        /// Use local when it answers a status probe, otherwise the bridge
        #[default]
        Auto,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct DispatchSettings {
        #[serde(default)]
        pub backend: BackendPreference,
        #[serde(default = "default_ollama_url")]
        pub ollama_base_url: String,
        #[serde(default = "default_timeout_ms")]
        pub timeout_ms: u64,
        /// Substitute canned responses when the backend fails
        #[serde(default = "default_true")]
        pub fallback_enabled: bool,
        #[serde(default = "default_persona")]
        pub default_persona: String,
    }

    impl DispatchSettings {
        /// Apply environment overrides (`OLLAMA_URL`).
        pub fn with_env_overrides(mut self) -> Self {
            if let Ok(url) = env::var("OLLAMA_URL") {
                if !url.trim().is_empty() {
                    self.ollama_base_url = url.trim().to_string();
                }
            }
            self
        }

        pub fn timeout(&self) -> Duration {
            Duration::from_millis(self.timeout_ms)
        }
    }

    impl Default for DispatchSettings {
        fn default() -> Self {
            Self {
                backend: BackendPreference::default(),
                ollama_base_url: default_ollama_url(),
                timeout_ms: default_timeout_ms(),
                fallback_enabled: true,
                default_persona: default_persona(),
            }
        }
    }
}

pub mod agent_api {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use serde::{Deserialize, Serialize};
    use std::fmt;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Role {
        System,
        User,
        Assistant,
    }

    impl Role {
        pub fn as_str(&self) -> &'static str {
            match self {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
            }
        }
    }

    impl fmt::Display for Role {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.as_str())
        }
    }

    /// Image attached to a turn, either raw bytes or an encoded string
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ImageAttachment {
        Bytes(Vec<u8>),
        /// `data:image/png;base64,...` or bare base64
        DataUri(String),
    }

    impl ImageAttachment {
        /// Bare base64 payload, without any `data:` prefix.
        pub fn to_base64(&self) -> String {
            match self {
                ImageAttachment::Bytes(bytes) => BASE64.encode(bytes),
                ImageAttachment::DataUri(uri) => match uri.split_once(";base64,") {
                    Some((_, payload)) if uri.starts_with("data:") => payload.to_string(),
                    _ => uri.clone(),
                },
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct ConversationTurn {
        pub role: Role,
        pub content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub attached_image: Option<ImageAttachment>,
    }

    impl ConversationTurn {
        pub fn new(role: Role, content: impl Into<String>) -> Self {
            Self {
                role,
                content: content.into(),
                attached_image: None,
            }
        }

        pub fn system(content: impl Into<String>) -> Self {
            Self::new(Role::System, content)
        }

        pub fn user(content: impl Into<String>) -> Self {
            Self::new(Role::User, content)
        }

        pub fn assistant(content: impl Into<String>) -> Self {
            Self::new(Role::Assistant, content)
        }

        pub fn with_image(mut self, image: ImageAttachment) -> Self {
            self.attached_image = Some(image);
            self
        }
    }

    /// Static configuration of one chat assistant identity
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct PersonaConfig {
        pub id: String,
        pub display_name: String,
        pub backend_model: String,
        pub system_prompt: String,
        pub temperature: f32, // 0.0..=1.0
        pub max_tokens: u32,
        #[serde(default)]
        pub description: String,
    }

    /// Which concrete backend produced a reply
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum BackendKind {
        Local,
        Bridge,
    }

    impl fmt::Display for BackendKind {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                BackendKind::Local => f.write_str("local"),
                BackendKind::Bridge => f.write_str("bridge"),
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct BackendReply {
        pub content: String,
        pub backend: BackendKind,
        pub model: String,
    }

    /// Result of probing a backend for availability
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct BackendStatus {
        pub available: bool,
        pub url: String,
        #[serde(default)]
        pub models: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub error: Option<String>,
    }

    impl BackendStatus {
        pub fn unavailable(url: impl Into<String>, error: impl Into<String>) -> Self {
            Self {
                available: false,
                url: url.into(),
                models: Vec::new(),
                error: Some(error.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::agent_api::*;
    use super::settings::*;

    #[test]
    fn test_settings_defaults() {
        let settings = DispatchSettings::default();
        assert_eq!(settings.ollama_base_url, "http://localhost:11434");
        assert!(settings.fallback_enabled);
        assert_eq!(settings.backend, BackendPreference::Auto);
        assert_eq!(settings.timeout().as_secs(), 120);
    }

    #[test]
    fn test_settings_partial_json_uses_defaults() {
        let settings: DispatchSettings =
            serde_json::from_str(r#"{"fallback_enabled": false, "backend": "local"}"#).unwrap();
        assert!(!settings.fallback_enabled);
        assert_eq!(settings.backend, BackendPreference::Local);
        assert_eq!(settings.default_persona, "grd17");
        assert_eq!(settings.timeout_ms, 120_000);
    }

    #[test]
    fn test_ollama_url_env_override() {
        std::env::set_var("OLLAMA_URL", "http://gpu-box:11434");
        let settings = DispatchSettings::default().with_env_overrides();
        std::env::remove_var("OLLAMA_URL");
        assert_eq!(settings.ollama_base_url, "http://gpu-box:11434");
    }

    #[test]
    fn test_data_uri_is_stripped_to_payload() {
        let image = ImageAttachment::DataUri("data:image/png;base64,aGVsbG8=".into());
        assert_eq!(image.to_base64(), "aGVsbG8=");

        let bare = ImageAttachment::DataUri("aGVsbG8=".into());
        assert_eq!(bare.to_base64(), "aGVsbG8=");
    }

    #[test]
    fn test_image_bytes_are_encoded() {
        let image = ImageAttachment::Bytes(b"hello".to_vec());
        assert_eq!(image.to_base64(), "aGVsbG8=");
    }

    #[test]
    fn test_turn_roles_serialize_lowercase() {
        let turn = ConversationTurn::assistant("hi");
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["role"], "assistant");
        assert!(json.get("attached_image").is_none());
    }
}
