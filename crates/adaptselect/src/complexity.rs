//! Deterministic request complexity scoring.
//!
//! Points are accumulated from message shape, conversation state and a few
//! modality-specific task signals, then clamped to `0..=100`.

use crate::catalog::Modality;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

pub const MAX_SCORE: u32 = 100;

static TECHNICAL_TERMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(algorithm|architecture|database|api|kubernetes|microservices?|concurren\w*|async|compiler|regex|optimi[sz]\w*|latency|schema|protocol|encryption|neural|gradient|distributed|refactor\w*|deploy\w*|infrastructure)\b",
    )
    .unwrap()
});

static DEEP_REASONING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(prove|proof|reasoning|analy[sz]e|step[- ]by[- ]step|explain why|trade-?offs?|derive|evaluate|compare)\b",
    )
    .unwrap()
});

static CODE_GENERATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(write|implement|generate|create|build)\b.{0,40}\b(code|function|class|script|program|module)\b",
    )
    .unwrap()
});

static LONG_OUTPUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(detailed|comprehensive|in[- ]depth|essay|report|long[- ]form|thorough)\b")
        .unwrap()
});

static MULTI_STEP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(first|then|finally|steps|plan|workflow|pipeline)\b").unwrap()
});

static HIGH_RESOLUTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(4k|8k|hd|high[- ]res(olution)?|1080p|ultra[- ]detailed)\b").unwrap()
});

static PHOTOREALISTIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(photo-?realistic|realistic|lifelike|cinematic)\b").unwrap()
});

static MULTIPLE_SUBJECTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(group|crowd|several|multiple|many)\b").unwrap()
});

static LONG_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\b\d{2,}\s*(seconds|secs)\b|\bminutes?\b|\blong\b)").unwrap()
});

static COMPLEX_MOTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(running|dancing|flying|chase|action|camera (pan|movement)|tracking shot|slow[- ]motion)\b",
    )
    .unwrap()
});

static MULTIPLE_SPEAKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(dialogue|conversation|podcast|interview|speakers|voices)\b").unwrap()
});

static EXPRESSIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(emotion\w*|expressive|excited|whisper\w*|dramatic)\b").unwrap()
});

static CROSS_MODAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(describe|caption|compare|analy[sz]e|explain)\b.{0,40}\b(image|photo|picture|video|chart|diagram)\b",
    )
    .unwrap()
});

static HIGH_QUALITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(best|highest|high|top|premium) quality\b|\bmost accurate\b").unwrap()
});

/// Task-level booleans; each modality scores at most four of them
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSignals {
    pub requests_deep_reasoning: bool,
    pub requires_code_generation: bool,
    pub requires_long_output: bool,
    pub requires_multi_step: bool,
    pub high_resolution: bool,
    pub photorealistic: bool,
    pub multiple_subjects: bool,
    pub long_duration: bool,
    pub complex_motion: bool,
    pub multiple_speakers: bool,
    pub expressive_delivery: bool,
    pub cross_modal_reasoning: bool,
}

impl TaskSignals {
    pub fn detect(message: &str) -> Self {
        Self {
            requests_deep_reasoning: DEEP_REASONING.is_match(message),
            requires_code_generation: CODE_GENERATION.is_match(message),
            requires_long_output: LONG_OUTPUT.is_match(message),
            requires_multi_step: MULTI_STEP.is_match(message),
            high_resolution: HIGH_RESOLUTION.is_match(message),
            photorealistic: PHOTOREALISTIC.is_match(message),
            multiple_subjects: MULTIPLE_SUBJECTS.is_match(message),
            long_duration: LONG_DURATION.is_match(message),
            complex_motion: COMPLEX_MOTION.is_match(message),
            multiple_speakers: MULTIPLE_SPEAKERS.is_match(message),
            expressive_delivery: EXPRESSIVE.is_match(message),
            cross_modal_reasoning: CROSS_MODAL.is_match(message),
        }
    }

    /// (factor name, present, points) for the signals `modality` cares about
    fn weighted(&self, modality: Modality) -> Vec<(&'static str, bool, u32)> {
        match modality {
            Modality::Text => vec![
                ("deep_reasoning", self.requests_deep_reasoning, 20),
                ("code_generation", self.requires_code_generation, 15),
                ("long_output", self.requires_long_output, 10),
                ("multi_step", self.requires_multi_step, 10),
            ],
            Modality::Image => vec![
                ("high_resolution", self.high_resolution, 10),
                ("photorealistic", self.photorealistic, 10),
                ("multiple_subjects", self.multiple_subjects, 5),
            ],
            Modality::Video => vec![
                ("long_duration", self.long_duration, 20),
                ("complex_motion", self.complex_motion, 15),
                ("high_resolution", self.high_resolution, 10),
                ("photorealistic", self.photorealistic, 5),
            ],
            Modality::Speech => vec![
                ("long_form", self.requires_long_output, 10),
                ("multiple_speakers", self.multiple_speakers, 10),
                ("expressive_delivery", self.expressive_delivery, 5),
            ],
            Modality::Multimodal => vec![
                ("cross_modal_reasoning", self.cross_modal_reasoning, 20),
                ("deep_reasoning", self.requests_deep_reasoning, 15),
                ("multi_step", self.requires_multi_step, 10),
                ("high_resolution", self.high_resolution, 5),
            ],
        }
    }
}

/// Everything the scorer looks at
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityFactors {
    pub message_length: usize,
    pub has_code_block: bool,
    pub question_count: usize,
    pub has_technical_terms: bool,
    pub conversation_length: usize,
    pub has_prior_failures: bool,
    pub tasks: TaskSignals,
    pub requests_high_quality: bool,
}

impl ComplexityFactors {
    pub fn from_message(
        message: &str,
        conversation_length: usize,
        prior_failures: u32,
        prefer_high_quality: bool,
    ) -> Self {
        Self {
            message_length: message.chars().count(),
            has_code_block: message.contains("```"),
            question_count: message.matches('?').count(),
            has_technical_terms: TECHNICAL_TERMS.is_match(message),
            conversation_length,
            has_prior_failures: prior_failures > 0,
            tasks: TaskSignals::detect(message),
            requests_high_quality: prefer_high_quality || HIGH_QUALITY.is_match(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub factor: String,
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityScore {
    pub score: u32,
    pub components: Vec<ScoreComponent>,
}

pub fn score_complexity(modality: Modality, factors: &ComplexityFactors) -> ComplexityScore {
    let mut components = Vec::new();
    let mut add = |factor: &str, points: u32| {
        if points > 0 {
            components.push(ScoreComponent {
                factor: factor.to_string(),
                points,
            });
        }
    };

    add(
        "message_length",
        match factors.message_length {
            n if n > 2000 => 20,
            n if n > 500 => 10,
            n if n > 100 => 5,
            _ => 0,
        },
    );
    if factors.has_code_block {
        add("code_block", 5);
    }
    if factors.question_count > 1 {
        add("multiple_questions", 5);
    }
    if factors.has_technical_terms {
        add("technical_terms", 10);
    }
    add(
        "conversation_length",
        match factors.conversation_length {
            n if n > 10 => 10,
            n if n > 5 => 5,
            _ => 0,
        },
    );
    if factors.has_prior_failures {
        add("prior_failures", 10);
    }
    for (factor, present, points) in factors.tasks.weighted(modality) {
        if present {
            add(factor, points);
        }
    }
    if factors.requests_high_quality {
        add("high_quality_requested", 20);
    }

    let total: u32 = components.iter().map(|c| c.points).sum();
    ComplexityScore {
        score: total.min(MAX_SCORE),
        components,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_plain_message_scores_zero() {
        let factors = ComplexityFactors::from_message("hi there", 0, 0, false);
        assert_eq!(score_complexity(Modality::Text, &factors).score, 0);
    }

    #[test]
    fn signals_outside_the_modality_are_ignored() {
        let factors = ComplexityFactors {
            tasks: TaskSignals {
                complex_motion: true,
                ..TaskSignals::default()
            },
            ..ComplexityFactors::default()
        };
        assert_eq!(score_complexity(Modality::Text, &factors).score, 0);
        assert_eq!(score_complexity(Modality::Video, &factors).score, 15);
    }

    #[test]
    fn explicit_quality_request_is_detected() {
        let factors = ComplexityFactors::from_message("Give me the highest quality answer", 0, 0, false);
        assert!(factors.requests_high_quality);
    }
}
