use adaptcore::{ChatMessage, Provider, UserTier};
use adaptselect::bandit::{select_thompson, select_ucb};
use adaptselect::pareto::{select_frontier, select_pareto};
use adaptselect::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn model(id: &str, cost: f64, reasoning: f64) -> ModelCapability {
    ModelCapability {
        provider: Provider::Bedrock,
        model_id: id.to_string(),
        display_name: id.to_string(),
        modality: Modality::Text,
        tier: ModelTier::Balanced,
        cost_per_1k: cost,
        cost_per_unit: None,
        average_latency_ms: 1000.0,
        reasoning_capability: reasoning,
        accuracy: 7.0,
        creativity: 7.0,
        speed: 7.0,
        max_concurrency: 10,
        features: Vec::new(),
    }
}

fn history_of(entries: &[(&ModelCapability, u64, u64)]) -> HistoryMap {
    entries
        .iter()
        .map(|(m, s, f)| (m.key(), PerformanceHistory::with_outcomes(m.key(), *s, *f)))
        .collect()
}

#[test]
fn ucb_returns_untried_candidate_first() {
    let a = model("a", 0.001, 5.0);
    let b = model("b", 0.002, 6.0);
    let c = model("c", 0.003, 7.0);
    let history = history_of(&[(&a, 90, 10), (&b, 95, 5)]);
    let candidates = vec![a, b, c];

    let chosen = select_ucb(&candidates, &history).unwrap();
    assert_eq!(chosen.model_id, "c");
}

#[test]
fn ucb_prefers_higher_bound_once_all_are_tried() {
    let a = model("a", 0.001, 5.0);
    let b = model("b", 0.002, 6.0);
    let history = history_of(&[(&a, 10, 90), (&b, 90, 10)]);
    let candidates = vec![a, b];

    assert_eq!(select_ucb(&candidates, &history).unwrap().model_id, "b");
}

#[test]
fn thompson_favors_the_proven_model() {
    let good = model("good", 0.001, 5.0);
    let bad = model("bad", 0.001, 5.0);
    let history = history_of(&[(&good, 100, 0), (&bad, 0, 100)]);
    let candidates = vec![bad, good];
    let mut rng = StdRng::seed_from_u64(42);

    let wins = (0..1000)
        .filter(|_| select_thompson(&candidates, &history, &mut rng).unwrap().model_id == "good")
        .count();
    assert!(wins >= 950, "good model won only {} of 1000 draws", wins);
}

#[test]
fn pareto_ignores_weight_scale() {
    let catalog = ModelCatalog::builtin();
    let candidates = catalog.candidates(Modality::Text);

    let small = select_pareto(&candidates, &ParetoWeights::new(1.0, 2.0, 3.0)).unwrap();
    let large = select_pareto(&candidates, &ParetoWeights::new(10.0, 20.0, 30.0)).unwrap();
    assert_eq!(small.key(), large.key());
}

#[test]
fn pareto_cost_weight_picks_the_free_model() {
    let catalog = ModelCatalog::builtin();
    let candidates = catalog.candidates(Modality::Text);

    let chosen = select_pareto(&candidates, &ParetoWeights::new(1.0, 0.0, 0.0)).unwrap();
    assert_eq!(chosen.effective_cost(), 0.0);
}

#[test]
fn frontier_falls_back_to_strongest_reasoner() {
    let candidates = vec![
        model("cheap", 0.001, 4.0),
        model("smart", 0.010, 9.0),
        model("mid", 0.005, 7.0),
    ];
    let impossible = FrontierConstraints {
        min_accuracy: Some(999.0),
        ..FrontierConstraints::default()
    };

    assert_eq!(select_frontier(&candidates, &impossible).unwrap().model_id, "smart");
}

#[test]
fn frontier_picks_cheapest_eligible() {
    let candidates = vec![
        model("cheap", 0.001, 4.0),
        model("smart", 0.010, 9.0),
        model("mid", 0.005, 7.0),
    ];
    let constraints = FrontierConstraints {
        min_reasoning: Some(6.0),
        ..FrontierConstraints::default()
    };

    assert_eq!(select_frontier(&candidates, &constraints).unwrap().model_id, "mid");
}

#[test]
fn q_learning_exploits_learned_values() {
    let candidates = vec![model("a", 0.001, 5.0), model("b", 0.002, 6.0)];
    let mut q_table = QTable::new();
    for _ in 0..5 {
        q_table.update(ComplexityState::Simple, &candidates[1].key(), 1.0, 0.5);
    }
    let history = HistoryMap::new();
    let ctx = SelectionContext {
        history: &history,
        q_table: &q_table,
        complexity_score: 10,
    };
    let mut rng = StdRng::seed_from_u64(3);

    let chosen = select_model(
        &SelectionStrategy::QLearning { epsilon: 0.0 },
        &candidates,
        ctx,
        &mut rng,
    )
    .unwrap();
    assert_eq!(chosen.model_id, "b");
}

#[test]
fn complexity_grows_with_length_and_reasoning_signals() {
    let baseline = score_complexity(
        Modality::Text,
        &ComplexityFactors::from_message("hello", 0, 0, false),
    );
    let mut message = String::from("Analyze the database architecture and explain why it scales. ");
    while message.chars().count() < 1000 {
        message.push_str("The api latency matters. ");
    }
    let heavy = score_complexity(
        Modality::Text,
        &ComplexityFactors::from_message(&message, 0, 0, false),
    );

    assert!(heavy.score > baseline.score);
    assert!(heavy.score <= 100);
    assert!(heavy.components.iter().any(|c| c.factor == "technical_terms"));
    assert!(heavy.components.iter().any(|c| c.factor == "deep_reasoning"));
}

#[test]
fn complexity_is_clamped() {
    let factors = ComplexityFactors {
        message_length: 5000,
        has_code_block: true,
        question_count: 4,
        has_technical_terms: true,
        conversation_length: 20,
        has_prior_failures: true,
        tasks: TaskSignals {
            requests_deep_reasoning: true,
            requires_code_generation: true,
            requires_long_output: true,
            requires_multi_step: true,
            ..TaskSignals::default()
        },
        requests_high_quality: true,
    };

    assert_eq!(score_complexity(Modality::Text, &factors).score, 100);
}

#[test]
fn freemium_always_gets_the_cheapest_model() {
    let catalog = ModelCatalog::builtin();
    let mut request = UnifiedRequest::new("Please analyze this distributed database architecture in depth");
    request.selection_options.prefer_high_quality = true;
    let mut rng = StdRng::seed_from_u64(1);

    let decision =
        decide_unified_model_switch(&request, &catalog, &HistoryMap::new(), &QTable::new(), &mut rng)
            .unwrap();

    let cheapest = catalog.cheapest(Modality::Text).unwrap();
    assert_eq!(decision.selected_model.key(), cheapest.key());
    assert_eq!(decision.signals.algorithm, "cheapest");
}

#[test]
fn paid_tier_follows_complexity_tiers() {
    let catalog = ModelCatalog::builtin();
    let mut rng = StdRng::seed_from_u64(1);

    let mut simple = UnifiedRequest::new("hi");
    simple.selection_options.user_tier = UserTier::Pro;
    let decision =
        decide_unified_model_switch(&simple, &catalog, &HistoryMap::new(), &QTable::new(), &mut rng)
            .unwrap();
    assert_eq!(decision.signals.tier, ModelTier::Fast);
    assert_eq!(decision.selected_model.tier, ModelTier::Fast);

    let mut hard = UnifiedRequest::new(
        "Please analyze the distributed database architecture and explain the trade-offs. ".repeat(8),
    );
    hard.selection_options.user_tier = UserTier::Pro;
    hard.selection_options.prefer_high_quality = true;
    let decision =
        decide_unified_model_switch(&hard, &catalog, &HistoryMap::new(), &QTable::new(), &mut rng)
            .unwrap();
    assert!(decision.complexity_score >= 60);
    assert_eq!(decision.selected_model.tier, ModelTier::Premium);
    assert!(decision.reasoning.contains(&decision.selected_model.display_name));
}

#[test]
fn strategy_overrides_tier_table_for_paid_users() {
    let catalog = ModelCatalog::builtin();
    let mut request = UnifiedRequest::new("hi");
    request.selection_options.user_tier = UserTier::Enterprise;
    request.selection_options.strategy = Some(SelectionStrategy::Frontier {
        constraints: FrontierConstraints {
            min_accuracy: Some(999.0),
            ..FrontierConstraints::default()
        },
    });
    let mut rng = StdRng::seed_from_u64(1);

    let decision =
        decide_unified_model_switch(&request, &catalog, &HistoryMap::new(), &QTable::new(), &mut rng)
            .unwrap();
    assert_eq!(decision.signals.algorithm, "frontier");
    assert_eq!(decision.selected_model.reasoning_capability, 9.5);
}

#[test]
fn video_cost_uses_per_second_pricing() {
    let catalog = ModelCatalog::builtin();
    let request = UnifiedRequest::new("Make a short video of waves");
    let mut rng = StdRng::seed_from_u64(1);

    let decision =
        decide_unified_model_switch(&request, &catalog, &HistoryMap::new(), &QTable::new(), &mut rng)
            .unwrap();
    assert_eq!(decision.modality, Modality::Video);
    let unit = decision.selected_model.cost_per_unit.unwrap();
    assert!((decision.estimated_cost - unit * 6.0).abs() < 1e-9);
}

#[test]
fn modality_override_wins_over_detection() {
    let catalog = ModelCatalog::builtin();
    let mut request = UnifiedRequest::new("Draw a logo");
    request.modality_override = Some(Modality::Text);
    request.conversation_history = vec![ChatMessage::user("earlier")];
    let mut rng = StdRng::seed_from_u64(1);

    let decision =
        decide_unified_model_switch(&request, &catalog, &HistoryMap::new(), &QTable::new(), &mut rng)
            .unwrap();
    assert_eq!(decision.modality, Modality::Text);
    assert!(decision.signals.modality.image);
}

#[test]
fn empty_catalog_reports_no_candidates() {
    let catalog = ModelCatalog::new(Vec::new());
    let request = UnifiedRequest::new("hi");
    let mut rng = StdRng::seed_from_u64(1);

    let err =
        decide_unified_model_switch(&request, &catalog, &HistoryMap::new(), &QTable::new(), &mut rng)
            .unwrap_err();
    assert_eq!(err, SelectionError::NoCandidates(Modality::Text));
}
