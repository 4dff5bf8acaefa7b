//! Static model capability and pricing table.
//!
//! Text models are priced per 1K tokens (blended input/output). Image, video
//! and speech models are priced per unit: one image, one second of video, or
//! 1K characters of synthesized speech.

use adaptcore::Provider;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Image,
    Video,
    Speech,
    Multimodal,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Text => "text",
            Modality::Image => "image",
            Modality::Video => "video",
            Modality::Speech => "speech",
            Modality::Multimodal => "multimodal",
        }
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Modality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Modality::Text),
            "image" => Ok(Modality::Image),
            "video" => Ok(Modality::Video),
            "speech" => Ok(Modality::Speech),
            "multimodal" => Ok(Modality::Multimodal),
            other => Err(format!("unknown modality: {}", other)),
        }
    }
}

/// Price/quality band inside one modality
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    Fast,
    Balanced,
    Premium,
}

impl ModelTier {
    /// <30 fast, <60 balanced, otherwise premium
    pub fn for_score(score: u32) -> Self {
        if score < 30 {
            ModelTier::Fast
        } else if score < 60 {
            ModelTier::Balanced
        } else {
            ModelTier::Premium
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelTier::Fast => "fast",
            ModelTier::Balanced => "balanced",
            ModelTier::Premium => "premium",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelCapability {
    pub provider: Provider,
    pub model_id: String,
    pub display_name: String,
    pub modality: Modality,
    pub tier: ModelTier,
    /// USD per 1K tokens; zero for models billed per unit
    pub cost_per_1k: f64,
    /// USD per image / video second / 1K speech characters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_per_unit: Option<f64>,
    pub average_latency_ms: f64,
    /// Quality scores on a 0-10 scale
    pub reasoning_capability: f64,
    pub accuracy: f64,
    pub creativity: f64,
    pub speed: f64,
    pub max_concurrency: u32,
    #[serde(default)]
    pub features: Vec<String>,
}

impl ModelCapability {
    /// History key, `provider:modelId`
    pub fn key(&self) -> String {
        format!("{}:{}", self.provider, self.model_id)
    }

    /// Per-1K token price when set, otherwise the unit price
    pub fn effective_cost(&self) -> f64 {
        if self.cost_per_1k > 0.0 {
            self.cost_per_1k
        } else {
            self.cost_per_unit.unwrap_or(0.0)
        }
    }

    pub fn quality(&self) -> f64 {
        (self.reasoning_capability + self.accuracy + self.creativity) / 3.0
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }
}

#[derive(Debug, Clone)]
pub struct ModelCatalog {
    models: Vec<ModelCapability>,
}

impl ModelCatalog {
    /// History and Q-values are keyed by `provider:model_id`, so a key
    /// keeps its first entry and later duplicates are dropped.
    pub fn new(models: Vec<ModelCapability>) -> Self {
        let mut seen = std::collections::HashSet::new();
        let models = models
            .into_iter()
            .filter(|m| {
                let key = m.key();
                if seen.insert(key.clone()) {
                    true
                } else {
                    tracing::warn!(model = %key, modality = %m.modality, "Dropping duplicate catalog entry");
                    false
                }
            })
            .collect();
        Self { models }
    }

    /// Bedrock and Ollama models known to the engine
    pub fn builtin() -> Self {
        use Modality::*;
        use ModelTier::*;
        use Provider::*;

        let models = vec![
            entry(Ollama, "llama3.2", "Llama 3.2 (local)", Text, Fast)
                .priced(0.0, None)
                .latency(1500.0)
                .scores(5.0, 5.5, 5.5, 6.0)
                .concurrency(2)
                .features(&["local", "streaming"]),
            entry(Bedrock, "amazon.nova-micro-v1:0", "Amazon Nova Micro", Text, Fast)
                .priced(0.000_1, None)
                .latency(400.0)
                .scores(5.0, 6.0, 5.0, 9.5)
                .concurrency(50)
                .features(&["streaming"]),
            entry(Bedrock, "anthropic.claude-haiku-4-5-20251001-v1:0", "Claude Haiku 4.5", Text, Balanced)
                .priced(0.003, None)
                .latency(900.0)
                .scores(7.5, 8.0, 7.0, 8.5)
                .concurrency(20)
                .features(&["streaming", "tool_use"]),
            entry(Bedrock, "anthropic.claude-sonnet-4-5-20250929-v1:0", "Claude Sonnet 4.5", Text, Premium)
                .priced(0.009, None)
                .latency(2200.0)
                .scores(9.5, 9.0, 9.0, 6.0)
                .concurrency(10)
                .features(&["streaming", "tool_use", "extended_thinking"]),
            entry(Bedrock, "amazon.titan-image-generator-v2:0", "Titan Image Generator v2", Image, Fast)
                .priced(0.0, Some(0.008))
                .latency(6000.0)
                .scores(4.0, 6.0, 6.0, 8.0)
                .concurrency(5)
                .features(&["inpainting"]),
            entry(Bedrock, "amazon.nova-canvas-v1:0", "Amazon Nova Canvas", Image, Balanced)
                .priced(0.0, Some(0.04))
                .latency(8000.0)
                .scores(5.0, 7.5, 8.0, 7.0)
                .concurrency(5)
                .features(&["inpainting", "outpainting"]),
            entry(Bedrock, "stability.sd3-5-large-v1:0", "Stable Diffusion 3.5 Large", Image, Premium)
                .priced(0.0, Some(0.08))
                .latency(12000.0)
                .scores(5.5, 8.5, 9.5, 5.0)
                .concurrency(3)
                .features(&["photorealism"]),
            entry(Bedrock, "amazon.nova-reel-v1:1", "Amazon Nova Reel", Video, Balanced)
                .priced(0.0, Some(0.08))
                .latency(90000.0)
                .scores(5.0, 7.0, 8.0, 3.0)
                .concurrency(1)
                .features(&["async_invoke"]),
            entry(Bedrock, "amazon.nova-sonic-v1:0", "Amazon Nova Sonic", Speech, Balanced)
                .priced(0.0, Some(0.0034))
                .latency(700.0)
                .scores(6.5, 7.5, 7.0, 9.0)
                .concurrency(10)
                .features(&["bidirectional_streaming"]),
            entry(Bedrock, "amazon.nova-lite-v1:0", "Amazon Nova Lite", Multimodal, Fast)
                .priced(0.000_35, Some(0.001))
                .latency(600.0)
                .scores(6.0, 6.5, 6.0, 9.0)
                .concurrency(30)
                .features(&["vision", "video_understanding"]),
            entry(Bedrock, "amazon.nova-pro-v1:0", "Amazon Nova Pro", Multimodal, Balanced)
                .priced(0.004_5, Some(0.002))
                .latency(1400.0)
                .scores(8.0, 8.0, 7.5, 7.0)
                .concurrency(15)
                .features(&["vision", "video_understanding", "tool_use"]),
            entry(Bedrock, "anthropic.claude-opus-4-1-20250805-v1:0", "Claude Opus 4.1", Multimodal, Premium)
                .priced(0.045, Some(0.024))
                .latency(3200.0)
                .scores(9.8, 9.5, 9.0, 5.0)
                .concurrency(10)
                .features(&["vision", "tool_use"]),
        ];

        Self::new(models)
    }

    pub fn models(&self) -> &[ModelCapability] {
        &self.models
    }

    pub fn candidates(&self, modality: Modality) -> Vec<ModelCapability> {
        self.models
            .iter()
            .filter(|m| m.modality == modality)
            .cloned()
            .collect()
    }

    pub fn find(&self, provider: Provider, model_id: &str) -> Option<&ModelCapability> {
        self.models
            .iter()
            .find(|m| m.provider == provider && m.model_id == model_id)
    }

    /// Model for `tier`, or the nearest stand-in by price when the modality
    /// has no model in that band.
    pub fn tier_model(&self, modality: Modality, tier: ModelTier) -> Option<ModelCapability> {
        let mut candidates = self.candidates(modality);
        if let Some(exact) = candidates.iter().find(|m| m.tier == tier) {
            return Some(exact.clone());
        }
        if candidates.is_empty() {
            return None;
        }
        candidates.sort_by(|a, b| a.effective_cost().total_cmp(&b.effective_cost()));
        let index = match tier {
            ModelTier::Fast => 0,
            ModelTier::Balanced => candidates.len() / 2,
            ModelTier::Premium => candidates.len() - 1,
        };
        Some(candidates.swap_remove(index))
    }

    /// Cheapest model of a modality; first in catalog order on ties
    pub fn cheapest(&self, modality: Modality) -> Option<ModelCapability> {
        self.models
            .iter()
            .filter(|m| m.modality == modality)
            .fold(None::<&ModelCapability>, |best, m| match best {
                Some(b) if b.effective_cost() <= m.effective_cost() => Some(b),
                _ => Some(m),
            })
            .cloned()
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn entry(
    provider: Provider,
    model_id: &str,
    display_name: &str,
    modality: Modality,
    tier: ModelTier,
) -> ModelCapability {
    ModelCapability {
        provider,
        model_id: model_id.to_string(),
        display_name: display_name.to_string(),
        modality,
        tier,
        cost_per_1k: 0.0,
        cost_per_unit: None,
        average_latency_ms: 1000.0,
        reasoning_capability: 5.0,
        accuracy: 5.0,
        creativity: 5.0,
        speed: 5.0,
        max_concurrency: 1,
        features: Vec::new(),
    }
}

impl ModelCapability {
    fn priced(mut self, cost_per_1k: f64, cost_per_unit: Option<f64>) -> Self {
        self.cost_per_1k = cost_per_1k;
        self.cost_per_unit = cost_per_unit;
        self
    }

    fn latency(mut self, ms: f64) -> Self {
        self.average_latency_ms = ms;
        self
    }

    fn scores(mut self, reasoning: f64, accuracy: f64, creativity: f64, speed: f64) -> Self {
        self.reasoning_capability = reasoning;
        self.accuracy = accuracy;
        self.creativity = creativity;
        self.speed = speed;
        self
    }

    fn concurrency(mut self, max: u32) -> Self {
        self.max_concurrency = max;
        self
    }

    fn features(mut self, features: &[&str]) -> Self {
        self.features = features.iter().map(|f| f.to_string()).collect();
        self
    }
}
