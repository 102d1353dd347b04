//! Built-in persona registry.
//!
//! The registry is fixed at compile time. Changing a persona means shipping a
//! new build; there are no mutation operations.

use shared::agent_api::PersonaConfig;
use shared::DispatchError;
use std::collections::HashMap;
use std::sync::LazyLock;

struct PersonaDef {
    id: &'static str,
    name: &'static str,
    model: &'static str,
    system_prompt: &'static str,
    temperature: f32,
    max_tokens: u32,
    description: &'static str,
}

const BUILTIN: &[PersonaDef] = &[
    PersonaDef {
        id: "grd17",
        name: "GRD1.7 (Primary Core)",
        model: "llama3.3:latest",
        system_prompt: "You are GRD1.7, the primary coordinator focused on system efficiency and user experience optimization.",
        temperature: 0.7,
        max_tokens: 2048,
        description: "Primary coordinator",
    },
    PersonaDef {
        id: "grd27",
        name: "GRD2.7 (Deep Logic)",
        model: "deepseek-r1:latest",
        system_prompt: "You are GRD2.7, an analytical thinker focused on complex reasoning and root cause analysis.",
        temperature: 0.5,
        max_tokens: 4096,
        description: "Complex reasoning and root cause analysis",
    },
    PersonaDef {
        id: "aleofthought",
        name: "ALEofThought (Reasoning)",
        model: "deepseek-r1:8b",
        system_prompt: "You are ALEofThought, focused on ethical reasoning and user welfare.",
        temperature: 0.6,
        max_tokens: 2048,
        description: "Ethical reasoning and user welfare",
    },
    PersonaDef {
        id: "dangrd",
        name: "DANGRD (Chaos Engine)",
        model: "qwen2.5:14b",
        system_prompt: "You are DANGRD, a creative disruptor finding unconventional solutions.",
        temperature: 0.9,
        max_tokens: 2048,
        description: "Creative, unconventional solutions",
    },
    PersonaDef {
        id: "grdviz",
        name: "GRDVIZ (Vision Core)",
        model: "llava:latest",
        system_prompt: "You are GRDVIZ, specialized in visual processing and multimodal analysis.",
        temperature: 0.7,
        max_tokens: 2048,
        description: "Visual processing and multimodal analysis",
    },
    PersonaDef {
        id: "norightanswergrd",
        name: "NoRightAnswerGRD (Paradox)",
        model: "mistral:latest",
        system_prompt: "You are NoRightAnswerGRD, resolving paradoxes and finding alternative solutions.",
        temperature: 0.8,
        max_tokens: 2048,
        description: "Paradoxes and alternative solutions",
    },
    PersonaDef {
        id: "ale",
        name: "ALE (Swift Response)",
        model: "llama3.3:latest",
        system_prompt: "You are ALE, providing rapid responses and immediate solutions.",
        temperature: 0.5,
        max_tokens: 1024,
        description: "Rapid responses",
    },
    PersonaDef {
        id: "grdsprint",
        name: "GRDSPRINT (Speed Demon)",
        model: "mixtral:latest",
        system_prompt: "You are GRDSPRINT, optimized for high-speed processing and bulk operations.",
        temperature: 0.6,
        max_tokens: 2048,
        description: "High-speed and bulk processing",
    },
];

static BUILTIN_REGISTRY: LazyLock<PersonaRegistry> = LazyLock::new(|| {
    PersonaRegistry::from_configs(BUILTIN.iter().map(|def| PersonaConfig {
        id: def.id.to_string(),
        display_name: def.name.to_string(),
        backend_model: def.model.to_string(),
        system_prompt: def.system_prompt.to_string(),
        temperature: def.temperature,
        max_tokens: def.max_tokens,
        description: def.description.to_string(),
    }))
});

/// Ordered, read-only set of personas
#[derive(Debug, Clone)]
pub struct PersonaRegistry {
    personas: Vec<PersonaConfig>,
    index: HashMap<String, usize>,
}

impl PersonaRegistry {
    /// The eight built-in personas, in display order
    pub fn builtin() -> &'static PersonaRegistry {
        &BUILTIN_REGISTRY
    }

    /// Build a registry from configs. Later duplicates of an id are dropped.
    pub fn from_configs(configs: impl IntoIterator<Item = PersonaConfig>) -> Self {
        let mut personas = Vec::new();
        let mut index = HashMap::new();
        for config in configs {
            if index.contains_key(&config.id) {
                continue;
            }
            index.insert(config.id.clone(), personas.len());
            personas.push(config);
        }
        Self { personas, index }
    }

    pub fn get(&self, id: &str) -> Result<&PersonaConfig, DispatchError> {
        self.index
            .get(id)
            .map(|&i| &self.personas[i])
            .ok_or_else(|| DispatchError::unknown_persona(id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn list(&self) -> &[PersonaConfig] {
        &self.personas
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_has_eight_unique_personas() {
        let registry = PersonaRegistry::builtin();
        assert_eq!(registry.len(), 8);
        for persona in registry.list() {
            let count = registry.list().iter().filter(|p| p.id == persona.id).count();
            assert_eq!(count, 1, "{} listed more than once", persona.id);
        }
    }

    #[test]
    fn test_fixed_order() {
        let ids: Vec<&str> = PersonaRegistry::builtin()
            .list()
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(
            ids,
            [
                "grd17",
                "grd27",
                "aleofthought",
                "dangrd",
                "grdviz",
                "norightanswergrd",
                "ale",
                "grdsprint"
            ]
        );
    }

    #[test]
    fn test_parameters_in_range() {
        for persona in PersonaRegistry::builtin().list() {
            assert!((0.0..=1.0).contains(&persona.temperature));
            assert!(persona.max_tokens > 0);
            assert!(!persona.system_prompt.is_empty());
        }
    }

    #[test]
    fn test_lookup() {
        let registry = PersonaRegistry::builtin();
        let grd27 = registry.get("grd27").unwrap();
        assert_eq!(grd27.backend_model, "deepseek-r1:latest");
        assert_eq!(grd27.max_tokens, 4096);

        let err = registry.get("grd99").unwrap_err();
        assert!(matches!(err, DispatchError::UnknownPersona { ref id } if id == "grd99"));
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let mut first = PersonaRegistry::builtin().get("ale").unwrap().clone();
        let mut second = first.clone();
        first.display_name = "first".into();
        second.display_name = "second".into();

        let registry = PersonaRegistry::from_configs([first, second]);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("ale").unwrap().display_name, "first");
    }
}
