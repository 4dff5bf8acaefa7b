//! One-shot model decision for a single message: modality, complexity, tier,
//! model, estimated cost and a human-readable justification.

use crate::catalog::{Modality, ModelCapability, ModelCatalog, ModelTier};
use crate::complexity::{score_complexity, ComplexityFactors, ScoreComponent};
use crate::error::SelectionError;
use crate::history::HistoryMap;
use crate::modality::ModalitySignals;
use crate::qlearning::QTable;
use crate::strategy::{select_model, SelectionContext, SelectionStrategy};
use adaptcore::{ChatMessage, UserTier};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Seconds of video assumed when a request does not say
pub const DEFAULT_VIDEO_SECONDS: f64 = 6.0;

/// Output tokens assumed for a zero-complexity text request
const BASE_OUTPUT_TOKENS: f64 = 256.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionOptions {
    #[serde(default)]
    pub user_tier: UserTier,
    #[serde(default)]
    pub prior_failures: u32,
    #[serde(default)]
    pub prefer_high_quality: bool,
    /// Replaces the tier table for non-freemium users
    #[serde(default)]
    pub strategy: Option<SelectionStrategy>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_history: Vec<ChatMessage>,
    #[serde(default)]
    pub modality_override: Option<Modality>,
    #[serde(default)]
    pub selection_options: SelectionOptions,
}

impl UnifiedRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            conversation_history: Vec::new(),
            modality_override: None,
            selection_options: SelectionOptions::default(),
        }
    }

    fn total_chars(&self) -> usize {
        self.message.chars().count()
            + self
                .conversation_history
                .iter()
                .map(|m| m.text.chars().count())
                .sum::<usize>()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionSignals {
    pub modality: ModalitySignals,
    pub complexity: Vec<ScoreComponent>,
    pub tier: ModelTier,
    pub algorithm: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedModelDecision {
    pub modality: Modality,
    pub selected_model: ModelCapability,
    pub complexity_score: u32,
    pub reasoning: String,
    pub estimated_cost: f64,
    pub signals: DecisionSignals,
}

pub fn decide_unified_model_switch<R: Rng + ?Sized>(
    request: &UnifiedRequest,
    catalog: &ModelCatalog,
    history: &HistoryMap,
    q_table: &QTable,
    rng: &mut R,
) -> Result<UnifiedModelDecision, SelectionError> {
    let modality_signals = ModalitySignals::detect(&request.message);
    let modality = request
        .modality_override
        .unwrap_or_else(|| modality_signals.modality());

    let candidates = catalog.candidates(modality);
    if candidates.is_empty() {
        return Err(SelectionError::NoCandidates(modality));
    }

    let options = &request.selection_options;
    let factors = ComplexityFactors::from_message(
        &request.message,
        request.conversation_history.len(),
        options.prior_failures,
        options.prefer_high_quality,
    );
    let complexity = score_complexity(modality, &factors);

    let freemium = options.user_tier == UserTier::Freemium;
    let tier = if freemium {
        ModelTier::Fast
    } else {
        ModelTier::for_score(complexity.score)
    };

    let (selected, algorithm) = match (&options.strategy, freemium) {
        (_, true) => (catalog.cheapest(modality), "cheapest".to_string()),
        (Some(strategy), false) => {
            let ctx = SelectionContext {
                history,
                q_table,
                complexity_score: complexity.score,
            };
            (
                select_model(strategy, &candidates, ctx, rng).cloned(),
                strategy.name().to_string(),
            )
        }
        (None, false) => (catalog.tier_model(modality, tier), "tier-table".to_string()),
    };
    let selected = selected.ok_or(SelectionError::NoCandidates(modality))?;

    let estimated_cost = estimate_cost(&selected, modality, request, complexity.score);
    let reasoning = justify(
        &selected,
        modality,
        complexity.score,
        tier,
        &algorithm,
        options.user_tier,
        estimated_cost,
    );

    tracing::info!(
        model = %selected.key(),
        %modality,
        complexity = complexity.score,
        algorithm = %algorithm,
        "unified model decision"
    );

    Ok(UnifiedModelDecision {
        modality,
        selected_model: selected,
        complexity_score: complexity.score,
        reasoning,
        estimated_cost,
        signals: DecisionSignals {
            modality: modality_signals,
            complexity: complexity.components,
            tier,
            algorithm,
        },
    })
}

/// Rough USD cost of one call using the modality's billing unit
pub fn estimate_cost(
    model: &ModelCapability,
    modality: Modality,
    request: &UnifiedRequest,
    complexity_score: u32,
) -> f64 {
    let unit = model.cost_per_unit.unwrap_or(0.0);
    match modality {
        Modality::Text | Modality::Multimodal => {
            let input_tokens = request.total_chars() as f64 / 4.0;
            let output_tokens = BASE_OUTPUT_TOKENS + complexity_score as f64 * 8.0;
            let tokens = (input_tokens + output_tokens) / 1000.0 * model.cost_per_1k;
            if modality == Modality::Multimodal {
                tokens + unit
            } else {
                tokens
            }
        }
        Modality::Image => unit,
        Modality::Video => unit * DEFAULT_VIDEO_SECONDS,
        Modality::Speech => {
            let thousands = (request.message.chars().count() as f64 / 1000.0).ceil().max(1.0);
            unit * thousands
        }
    }
}

fn justify(
    model: &ModelCapability,
    modality: Modality,
    score: u32,
    tier: ModelTier,
    algorithm: &str,
    user_tier: UserTier,
    estimated_cost: f64,
) -> String {
    let band = match score {
        s if s < 30 => "simple",
        s if s < 60 => "moderate",
        _ => "complex",
    };
    let how = match algorithm {
        "cheapest" => format!("{} plan is limited to the cheapest {} model", user_tier.as_str(), modality),
        "tier-table" => format!("{} tier matches the {} request", tier.as_str(), band),
        other => format!("chosen by {} over {} candidates", other, modality),
    };
    format!(
        "Selected {} ({}) for a {} {} request (complexity {}/100): {}. Estimated cost ${:.4}.",
        model.display_name,
        model.key(),
        band,
        modality,
        score,
        how,
        estimated_cost
    )
}
