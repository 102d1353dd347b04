//! Chat backends: a local Ollama server and a hosted AI bridge.

pub mod backend;
pub mod bridge;
pub mod ollama;
pub mod router;

pub use backend::{ChatBackend, SamplingHints};
pub use bridge::{BridgeClient, HostedBridge, SessionState};
pub use ollama::OllamaClient;
pub use router::BackendRouter;
