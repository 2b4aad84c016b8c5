//! End-to-end resolution against the nine05 demo story.

use std::sync::Arc;

use ifact_core::{
    ActionBuckets, ActionValidityResolver, CandidateAction, GameInterpreter, KeyKind, ResolverConfig,
    Session, SessionConfig, SessionPhase, Strategy, VerbFrequencyOracle, canonical_actions,
};
use ifact_story::{StoryMachine, nine05_rom, nine05_title, verb_counts};
use proptest::prelude::*;

const STRATEGIES: [Strategy; 3] = [Strategy::Sequential, Strategy::Batch, Strategy::Parallel];

const CANDIDATES: &[&str] = &[
    "open wallet",
    "take keys",
    "north",
    "unzip wallet",
    "take wallet",
    "take all",
    "get leather wallet",
    "press button",
    "push red button",
    "examine phone",
    "take phone",
    "read wallet",
    "wait",
    "xyzzy",
    "east",
    "down",
    "south",
    "close wallet",
];

fn oracle() -> Arc<dyn VerbFrequencyOracle + Send + Sync> {
    Arc::new(verb_counts().unwrap())
}

fn candidates(texts: &[&str]) -> Vec<CandidateAction> {
    texts.iter().map(|t| CandidateAction::from(*t)).collect()
}

fn machine() -> StoryMachine {
    StoryMachine::load(&nine05_rom(), Some(42)).unwrap()
}

fn resolver(strategy: Strategy, key_kind: KeyKind) -> ActionValidityResolver<StoryMachine> {
    let config = ResolverConfig {
        strategy,
        workers: 3,
        key_kind,
        ..ResolverConfig::default()
    };
    ActionValidityResolver::new(config, nine05_rom(), Some(42))
}

fn canonical(buckets: &ActionBuckets) -> Vec<String> {
    let mut texts: Vec<String> = canonical_actions(buckets, oracle().as_ref())
        .iter()
        .map(|a| a.text().to_string())
        .collect();
    texts.sort();
    texts
}

fn session(strategy: Strategy) -> Session<StoryMachine> {
    let oracle = oracle();
    let title = Arc::new(nine05_title(oracle.as_ref()).unwrap());
    let config = SessionConfig {
        resolver: ResolverConfig {
            strategy,
            workers: 2,
            ..ResolverConfig::default()
        },
        ..SessionConfig::default()
    };
    Session::new(title, oracle, config).unwrap()
}

// ============================================================================
// Scenario
// ============================================================================

#[test]
fn test_closed_wallet_and_blocked_door() {
    for strategy in STRATEGIES {
        let mut resolver = resolver(strategy, KeyKind::Delta);
        let mut interp = machine();
        let start = interp.get_state();
        let wanted = candidates(&["open wallet", "take keys", "north"]);

        let buckets = resolver.resolve(&mut interp, &start, &wanted).unwrap();
        assert!(buckets.contains_action("open wallet"), "{strategy}");
        assert!(!buckets.contains_action("take keys"), "{strategy}");
        assert!(!buckets.contains_action("north"), "{strategy}");

        interp.step("open wallet").unwrap();
        let opened = interp.get_state();
        let buckets = resolver.resolve(&mut interp, &opened, &wanted).unwrap();
        assert!(buckets.contains_action("take keys"), "{strategy}");
        assert!(!buckets.contains_action("north"), "{strategy}");
        assert!(buckets.iter().all(|(_, actions)| !actions.is_empty()));
    }
}

#[test]
fn test_synonyms_share_a_bucket() {
    let mut resolver = resolver(Strategy::Sequential, KeyKind::Delta);
    let mut interp = machine();
    let start = interp.get_state();
    let buckets = resolver.resolve(&mut interp, &start, &candidates(CANDIDATES)).unwrap();

    let same = |a: &str, b: &str| buckets.bucket_of(a).is_some() && buckets.bucket_of(a) == buckets.bucket_of(b);
    assert!(same("open wallet", "unzip wallet"));
    assert!(same("take wallet", "take all"));
    assert!(same("take wallet", "get leather wallet"));
    assert!(same("press button", "push red button"));
    assert!(!same("open wallet", "take wallet"));
}

// ============================================================================
// Strategy agreement
// ============================================================================

#[test]
fn test_strategies_agree() {
    let expected = vec!["down", "east", "open wallet", "push red button", "take wallet"];
    for key_kind in [KeyKind::Digest, KeyKind::Delta] {
        for strategy in STRATEGIES {
            let mut resolver = resolver(strategy, key_kind);
            let mut interp = machine();
            let start = interp.get_state();
            let buckets = resolver.resolve(&mut interp, &start, &candidates(CANDIDATES)).unwrap();
            assert_eq!(canonical(&buckets), expected, "{strategy} / {key_kind}");
        }
    }
}

#[test]
fn test_delta_partition_refines_digest_partition() {
    let mut interp = machine();
    interp.step("open wallet").unwrap();
    let reference = interp.get_state();
    let all = candidates(CANDIDATES);

    let digest = resolver(Strategy::Sequential, KeyKind::Digest)
        .resolve(&mut interp, &reference, &all)
        .unwrap();
    let delta = resolver(Strategy::Sequential, KeyKind::Delta)
        .resolve(&mut interp, &reference, &all)
        .unwrap();

    assert_eq!(digest.action_count(), delta.action_count());
    for (_, actions) in delta.iter() {
        let first = digest.bucket_of(actions[0].text());
        assert!(first.is_some());
        for action in actions {
            assert_eq!(digest.bucket_of(action.text()), first, "{}", action.text());
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_sequential_and_batch_agree(picks in proptest::collection::vec(0..CANDIDATES.len(), 1..12)) {
        let texts: Vec<&str> = picks.iter().map(|i| CANDIDATES[*i]).collect();
        let wanted = candidates(&texts);
        let mut interp = machine();
        let start = interp.get_state();
        let sequential = resolver(Strategy::Sequential, KeyKind::Digest)
            .resolve(&mut interp, &start, &wanted)
            .unwrap();
        let batch = resolver(Strategy::Batch, KeyKind::Digest)
            .resolve(&mut interp, &start, &wanted)
            .unwrap();
        prop_assert_eq!(canonical(&sequential), canonical(&batch));
        prop_assert_eq!(sequential.len(), batch.len());
    }
}

// ============================================================================
// State isolation
// ============================================================================

#[test]
fn test_reference_is_restored() {
    for strategy in STRATEGIES {
        let mut resolver = resolver(strategy, KeyKind::Delta);
        let mut interp = machine();
        interp.step("east").unwrap();
        let reference = interp.get_state();
        resolver.resolve(&mut interp, &reference, &candidates(CANDIDATES)).unwrap();
        assert_eq!(interp.get_state(), reference, "{strategy}");
        assert_eq!(resolver.phase(), SessionPhase::Idle);
    }
}

#[test]
fn test_halting_candidate_is_skipped() {
    for strategy in STRATEGIES {
        let mut resolver = resolver(strategy, KeyKind::Delta);
        let mut interp = machine();
        let start = interp.get_state();
        let buckets = resolver
            .resolve(&mut interp, &start, &candidates(&["xyzzy", "open wallet", "xyzzy", "east"]))
            .unwrap();
        assert!(!buckets.contains_action("xyzzy"), "{strategy}");
        assert!(buckets.contains_action("open wallet"), "{strategy}");
        assert!(buckets.contains_action("east"), "{strategy}");
        assert!(!interp.halted());
    }
}

#[test]
fn test_terminal_reference_resolves_nothing() {
    let mut resolver = resolver(Strategy::Parallel, KeyKind::Delta);
    let mut interp = machine();
    interp.step("down").unwrap();
    let dead = interp.get_state();
    let buckets = resolver.resolve(&mut interp, &dead, &candidates(CANDIDATES)).unwrap();
    assert!(buckets.is_empty());
    assert_eq!(resolver.phase(), SessionPhase::Done);
    assert!(!resolver.has_pool());
}

#[test]
fn test_implicit_pickup_is_suppressed() {
    for strategy in STRATEGIES {
        let mut resolver = resolver(strategy, KeyKind::Delta);
        let mut interp = machine();
        interp.step("east").unwrap();
        let study = interp.get_state();
        let wanted = candidates(&["read note", "take note", "wear hat"]);
        let buckets = resolver.resolve(&mut interp, &study, &wanted).unwrap();
        assert!(!buckets.contains_action("read note"), "{strategy}");
        assert!(!buckets.contains_action("wear hat"), "{strategy}");
        assert!(buckets.contains_action("take note"), "{strategy}");
    }

    let config = ResolverConfig {
        strategy: Strategy::Sequential,
        pickup_marker: String::new(),
        ..ResolverConfig::default()
    };
    let mut unmarked = ActionValidityResolver::<StoryMachine>::new(config, nine05_rom(), Some(42));
    let mut interp = machine();
    interp.step("east").unwrap();
    let study = interp.get_state();
    let buckets = unmarked
        .resolve(&mut interp, &study, &candidates(&["read note", "take note"]))
        .unwrap();
    assert!(buckets.contains_action("read note"));
    assert_eq!(buckets.bucket_of("read note"), buckets.bucket_of("take note"));
}

#[test]
fn test_worker_pool_is_lazy_and_reused() {
    let mut resolver = resolver(Strategy::Parallel, KeyKind::Delta);
    assert!(!resolver.has_pool());
    let mut interp = machine();
    let start = interp.get_state();
    let first = resolver.resolve(&mut interp, &start, &candidates(CANDIDATES)).unwrap();
    assert!(resolver.has_pool());
    let second = resolver.resolve(&mut interp, &start, &candidates(CANDIDATES)).unwrap();
    assert_eq!(canonical(&first), canonical(&second));
    resolver.shutdown();
    assert!(!resolver.has_pool());
}

// ============================================================================
// Sessions
// ============================================================================

#[test]
fn test_session_valid_actions() {
    for strategy in STRATEGIES {
        let mut session = session(strategy);
        let before = session.get_state();
        let mut actions = session.get_valid_actions().unwrap();
        actions.sort();
        assert_eq!(
            actions,
            vec!["down", "east", "open wallet", "push button", "take wallet"],
            "{strategy}"
        );
        assert_eq!(session.get_state(), before);
    }
}

#[test]
fn test_session_valid_actions_after_opening() {
    let mut session = session(Strategy::Sequential);
    session.step("open wallet").unwrap();
    let actions = session.get_valid_actions().unwrap();
    assert!(actions.contains(&"take keys".to_string()));
    assert!(actions.contains(&"close wallet".to_string()));
    assert!(!actions.contains(&"open wallet".to_string()));
}

#[test]
fn test_identification_is_idempotent() {
    let mut session = session(Strategy::Sequential);
    let before = session.get_state();
    let first = session.identify_interactive_objects(None).unwrap();
    let second = session.identify_interactive_objects(None).unwrap();
    assert_eq!(first, second);
    assert_eq!(session.get_state(), before);
    assert!(first.contains_name("wallet"));
    assert!(first.contains_name("keys"));
    assert!(first.contains_name("button"));
    assert!(!first.contains_name("mouse"));
    assert!(first.get("all").is_some());
}

#[test]
fn test_walkthrough_wins() {
    let mut session = session(Strategy::Sequential);
    let walkthrough = session.walkthrough();
    assert_eq!(walkthrough, vec!["open wallet", "take keys", "east", "north"]);
    let mut last = None;
    for action in &walkthrough {
        last = Some(session.step(action).unwrap());
    }
    assert!(last.is_some_and(|outcome| outcome.done));
    assert!(session.interpreter().victory());
    assert_eq!(session.interpreter().score(), 5);
    assert!(session.get_valid_actions().unwrap().is_empty());
}

#[test]
fn test_copy_is_independent() {
    let mut original = session(Strategy::Parallel);
    original.step("open wallet").unwrap();
    let mut branch = original.copy().unwrap();
    assert_eq!(branch.get_state(), original.get_state());

    branch.step("take keys").unwrap();
    assert_eq!(branch.interpreter().score(), 5);
    assert_eq!(original.interpreter().score(), 0);
    let actions = original.get_valid_actions().unwrap();
    assert!(actions.contains(&"take keys".to_string()));
}
