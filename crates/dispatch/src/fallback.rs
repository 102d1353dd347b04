//! Simulated responses used when no live backend answers.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use shared::agent_api::{ConversationTurn, PersonaConfig};
use shared::settings::DEFAULT_PERSONA;
use shared::DispatchResult;
use std::collections::HashMap;

pub const FALLBACK_NOTE: &str =
    "Ollama not available - using simulated response. Install Ollama for real AI: https://ollama.com";

const CANNED: &[(&str, &[&str])] = &[
    (
        "grd17",
        &[
            "As the primary coordinator, I recommend optimizing system workflows for better efficiency.",
            "Through systematic analysis, I've identified key areas for improvement in user experience.",
            "My coordination protocols suggest implementing automated processes to streamline operations.",
        ],
    ),
    (
        "grd27",
        &[
            "Deep analysis reveals patterns that indicate logical optimization opportunities.",
            "Complex reasoning suggests a multi-layered approach to this challenge.",
            "Strategic assessment indicates we should examine the root cause before proceeding.",
        ],
    ),
    (
        "aleofthought",
        &[
            "From an ethical standpoint, we must prioritize user autonomy and informed choice.",
            "Reasoning through this carefully, the best path forward respects individual agency.",
            "Moral framework analysis suggests transparency and user control are paramount.",
        ],
    ),
    (
        "dangrd",
        &[
            "Let's try something unconventional - what if we approach this from the opposite direction?",
            "Chaos testing reveals unexpected optimization opportunities in system disruption.",
            "Creative disruption suggests combining unrelated elements for breakthrough solutions.",
        ],
    ),
    (
        "grdviz",
        &[
            "Visual analysis shows users respond better to intuitive, color-coded interfaces.",
            "Multimodal processing indicates combining visual and audio feedback improves engagement.",
            "Interface optimization reveals predictive visual cues enhance user experience.",
        ],
    ),
    (
        "norightanswergrd",
        &[
            "This paradox resolves through adaptive processing that scales to user needs.",
            "Contradiction analysis suggests temporal separation of conflicting requirements.",
            "Alternative path: parallel systems can handle different user preference profiles.",
        ],
    ),
    (
        "ale",
        &[
            "Quick solution: Pre-cache common responses for 60% faster response time.",
            "Immediate implementation: Deploy micro-improvements continuously.",
            "Rapid analysis complete - here's the fastest path forward.",
        ],
    ),
    (
        "grdsprint",
        &[
            "Parallel processing optimization can accelerate this operation significantly.",
            "Burst processing algorithms indicate we can handle 3x more simultaneous requests.",
            "Performance scaling activated - throughput increased by 150%.",
        ],
    ),
];

/// Picks a canned line for a persona, uniformly at random.
pub struct FallbackGenerator {
    table: HashMap<&'static str, &'static [&'static str]>,
    default_persona: String,
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl FallbackGenerator {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Use a specific random source (seeded in tests).
    pub fn with_rng(rng: impl RngCore + Send + 'static) -> Self {
        Self {
            table: CANNED.iter().copied().collect(),
            default_persona: DEFAULT_PERSONA.to_string(),
            rng: Mutex::new(Box::new(rng)),
        }
    }

    /// Persona whose lines are used when a persona has none of its own.
    /// Ignored unless the table has entries for it.
    pub fn with_default_persona(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        if self.table.contains_key(id.as_str()) {
            self.default_persona = id;
        }
        self
    }

    /// Canned lines that may be drawn for `persona_id`.
    pub fn responses_for(&self, persona_id: &str) -> &'static [&'static str] {
        self.table
            .get(persona_id)
            .or_else(|| self.table.get(self.default_persona.as_str()))
            .copied()
            .unwrap_or(&[])
    }

    /// Never fails. The conversation is accepted for signature parity with
    /// live backends; canned lines do not depend on it.
    pub fn generate(
        &self,
        _conversation: &[ConversationTurn],
        persona: &PersonaConfig,
    ) -> DispatchResult {
        let lines = self.responses_for(&persona.id);
        let content = {
            let mut rng = self.rng.lock();
            lines.choose(&mut *rng).copied().unwrap_or_default()
        };
        DispatchResult::fallback(persona, content, FALLBACK_NOTE)
    }
}

impl Default for FallbackGenerator {
    fn default() -> Self {
        Self::new()
    }
}
