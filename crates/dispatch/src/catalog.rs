//! Hosted model names mapped to the open models that stand in for them locally.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelAlias {
    /// Hosted model name a user may ask for
    pub alias: &'static str,
    /// Local model tag that replaces it
    pub local_model: &'static str,
    pub description: &'static str,
}

pub const MODEL_ALIASES: &[ModelAlias] = &[
    ModelAlias {
        alias: "gpt-4o-mini",
        local_model: "llama3.3:latest",
        description: "Fast, efficient local LLM",
    },
    ModelAlias {
        alias: "claude-3-5-sonnet",
        local_model: "deepseek-r1:latest",
        description: "Advanced reasoning model",
    },
    ModelAlias {
        alias: "deepseek-reasoner",
        local_model: "deepseek-r1:8b",
        description: "Lightweight reasoning model",
    },
    ModelAlias {
        alias: "grok-beta",
        local_model: "qwen2.5:14b",
        description: "Creative problem solving",
    },
    ModelAlias {
        alias: "gemini-2-flash",
        local_model: "llava:latest",
        description: "Multimodal vision model",
    },
    ModelAlias {
        alias: "o3-mini",
        local_model: "mistral:latest",
        description: "Fast general purpose model",
    },
    ModelAlias {
        alias: "mistral-large",
        local_model: "mixtral:latest",
        description: "Powerful mixture of experts",
    },
    ModelAlias {
        alias: "llama-3-1-70b",
        local_model: "llama3.1:latest",
        description: "Efficient local Llama",
    },
];

/// Local replacement for a hosted model name, if one is known.
pub fn resolve_alias(name: &str) -> Option<&'static ModelAlias> {
    MODEL_ALIASES
        .iter()
        .find(|a| a.alias.eq_ignore_ascii_case(name.trim()))
}

/// Models in `wanted` that are not installed, sorted and deduplicated.
pub fn missing_models<'a>(
    wanted: impl IntoIterator<Item = &'a str>,
    installed: &[String],
) -> Vec<&'a str> {
    let mut missing: Vec<&str> = wanted
        .into_iter()
        .filter(|model| !installed.iter().any(|i| i.as_str() == *model))
        .collect();
    missing.sort_unstable();
    missing.dedup();
    missing
}
