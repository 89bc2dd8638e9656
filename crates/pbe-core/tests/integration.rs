//! Integration tests exercising full sessions:
//! parse → match → generalize → apply, through the public API only.

use pbe_core::{
    Arena, ClassKind, EngineConfig, EngineError, NodeKind, RunOutcome, Session, generalize,
    parse_sequence, render_sequence, search, step,
};
use proptest::prelude::*;

fn session(before: &str, after: &str, input: &str) -> Session {
    Session::new(
        parse_sequence(before),
        parse_sequence(after),
        parse_sequence(input),
    )
    .unwrap()
}

fn converged(outcome: &RunOutcome) -> bool {
    matches!(outcome, RunOutcome::Converged { .. })
}

/// Test 1: the one-step shift learns a single move rule with delta -1.
#[test]
fn shift_right_by_one() {
    let mut s = session("[a_]", "[_a]", "[]");
    let outcome = s.run_until_done(100, true, false).unwrap();
    assert!(converged(&outcome), "{outcome:?}");

    let rules = s.rules().unwrap();
    assert_eq!(rules.len(), 1, "both positions agree on one rule");
    assert_eq!(rules[0].value, "a");
    assert_eq!(rules[0].output.kind, ClassKind::Move);
    assert_eq!(rules[0].output.delta, -1);
}

/// Test 2: a two-step shift, with the empty positions learned as stay.
#[test]
fn shift_right_by_two() {
    let mut s = session("[a__]", "[__a]", "[]");
    let outcome = s.run_until_done(100, true, false).unwrap();
    assert!(converged(&outcome), "{outcome:?}");

    let rules = s.rules().unwrap();
    let a = rules.iter().find(|r| r.value == "a").unwrap();
    assert_eq!((a.output.kind, a.output.delta), (ClassKind::Move, -2));
    let empty = rules.iter().find(|r| r.value.is_empty()).unwrap();
    assert_eq!(empty.output.kind, ClassKind::Stay);
}

/// Test 3: learn on one position, replay on another.
#[test]
fn end_to_end_shift_applies_to_new_input() {
    let mut s = session("[a_]", "[_a]", "[_a_]");
    let outcome = s.run().unwrap();
    assert!(converged(&outcome), "{outcome:?}");
    assert_eq!(render_sequence(&s.output_sequence().unwrap()), "[__a]");
}

#[test]
fn unchanged_position_is_stay() {
    let mut s = session("[ab]", "[ab]", "[]");
    s.run_until_done(100, false, false).unwrap();
    for c in s.classifications().unwrap() {
        assert_eq!((c.kind, c.delta), (ClassKind::Stay, 0), "{c:?}");
    }
}

#[test]
fn moved_value_reports_position_difference() {
    let mut s = session("[_a__]", "[___a]", "[]");
    s.run_until_done(100, false, false).unwrap();
    let moved = s
        .classifications()
        .unwrap()
        .into_iter()
        .find(|c| c.value == "a")
        .unwrap();
    assert_eq!((moved.kind, moved.delta), (ClassKind::Move, 1 - 3));
}

#[test]
fn removed_value_is_gone_and_applies_as_blank() {
    let mut s = session("[a]", "[_]", "[a]");
    let outcome = s.run().unwrap();
    assert!(converged(&outcome), "{outcome:?}");
    let classes = s.classifications().unwrap();
    assert_eq!(classes[0].kind, ClassKind::Gone);
    assert_eq!(s.output_sequence().unwrap(), vec![String::new()]);
}

#[test]
fn new_value_is_appear() {
    let mut s = session("[_]", "[a]", "[]");
    s.run_until_done(100, false, false).unwrap();
    let classes = s.classifications().unwrap();
    assert_eq!(classes[0].kind, ClassKind::Appear);
    assert_eq!(classes[0].value, "a");
}

#[test]
fn appear_cannot_be_generalized() {
    let mut s = session("[_]", "[a]", "[]");
    let err = s.run_until_done(100, true, false).unwrap_err();
    assert!(matches!(err, EngineError::Unsupported(_)), "{err:?}");
}

#[test]
fn isomorphic_input_reproduces_example_output() {
    let mut s = session("[a_b_]", "[_a_b]", "[a_b_]");
    let outcome = s.run().unwrap();
    assert!(converged(&outcome), "{outcome:?}");
    assert_eq!(s.output_sequence().unwrap(), parse_sequence("[_a_b]"));
}

#[test]
fn word_tokens_work_like_characters() {
    let mut s = session("red _ _", "_ _ red", "red _ _");
    s.run().unwrap();
    assert_eq!(render_sequence(&s.output_sequence().unwrap()), "_ _ red");
}

#[test]
fn conflicting_examples_halt_generalization() {
    let mut s = session("[aa]", "[a_]", "[a]");
    let outcome = s.run().unwrap();
    let RunOutcome::Conflicted { conflict, .. } = outcome else {
        panic!("expected a conflict, got {outcome:?}");
    };
    assert_eq!(conflict.value, "a");
    assert_ne!(conflict.existing.kind, conflict.incoming.kind);
    assert_eq!(s.conflict().unwrap(), Some(&conflict));
}

#[test]
fn missing_rule_for_input_value_is_fatal() {
    let mut s = session("[a_]", "[_a]", "[z_]");
    let err = s.run().unwrap_err();
    assert_eq!(err, EngineError::NoRuleFound("z".to_string()));
}

#[test]
fn move_past_input_end_is_fatal() {
    let mut s = session("[a_]", "[_a]", "[_a]");
    let err = s.run().unwrap_err();
    assert!(matches!(err, EngineError::ChainExhausted { pos: 1, .. }), "{err:?}");
}

#[test]
fn small_energy_leaves_far_moves_unfound() {
    let config = EngineConfig {
        energy_units: 1,
        ..EngineConfig::default()
    };
    let mut s = Session::with_config(
        parse_sequence("[a___]"),
        parse_sequence("[___a]"),
        Vec::new(),
        config,
    )
    .unwrap();
    s.run_until_done(100, false, false).unwrap();
    let first = &s.classifications().unwrap()[0];
    assert_eq!(first.kind, ClassKind::Gone, "target is out of probe range");
}

#[test]
fn dump_covers_matchers_and_searches() {
    let mut s = session("[a_]", "[_a]", "[]");
    s.run_until_done(100, false, false).unwrap();
    let dump = s.dump();
    assert!(dump.nodes.iter().any(|n| n.label.starts_with("SearchNode(a)")));
    assert!(dump.nodes.iter().any(|n| n.label.starts_with("ObjectNode move")));
    let json: serde_json::Value = serde_json::from_str(&dump.to_json().unwrap()).unwrap();
    assert_eq!(json["edges"].as_array().unwrap().len(), dump.edges.len());
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

fn token() -> impl Strategy<Value = String> {
    prop_oneof![Just(String::new()), "[abc]".prop_map(String::from)]
}

proptest! {
    /// A search for a value that is not in the chain settles with score 0
    /// within energy + 2 steps, never more than 2 × energy + 2.
    #[test]
    fn prop_search_exhausts_on_absent_target(
        tokens in prop::collection::vec(token(), 1..12),
        start in 0usize..12,
        energy in 0u32..12,
    ) {
        let start = start % tokens.len();
        let mut arena = Arena::new();
        let chain = arena.install_chain(&tokens, "In").unwrap();
        let id = search::install(&mut arena, "z", chain[start], energy);

        let mut steps = 0u32;
        while !arena.node(id).unwrap().done {
            step::tick(&mut arena).unwrap();
            steps += 1;
            prop_assert!(steps <= 2 * energy + 2);
        }
        prop_assert!(steps <= energy + 2);
        prop_assert_eq!(arena.node(id).unwrap().score, 0.0);
    }

    /// A value present in the chain is found whenever it is within reach.
    #[test]
    fn prop_search_finds_reachable_target(
        len in 1usize..8,
        start in 0usize..8,
        at in 0usize..8,
    ) {
        let start = start % len;
        let at = at % len;
        let mut tokens = vec![String::new(); len];
        tokens[at] = "x".to_string();
        let mut arena = Arena::new();
        let chain = arena.install_chain(&tokens, "In").unwrap();
        let id = search::install(&mut arena, "x", chain[start], 2 * len as u32);

        while !arena.node(id).unwrap().done {
            step::tick(&mut arena).unwrap();
        }
        prop_assert_eq!(arena.node(id).unwrap().score, 1.0);
        prop_assert_eq!(arena.only_child(id).unwrap(), chain[at]);
    }

    /// Folding the same classifications a second time, with a fresh
    /// generalizer, learns the same rules and reaches the same conflict.
    #[test]
    fn prop_generalization_is_idempotent(
        before in prop::collection::vec(token(), 1..6),
        shift in 0usize..6,
    ) {
        let mut after = before.clone();
        let shift = shift % after.len();
        after.rotate_right(shift);
        let mut s = Session::new(before, after, Vec::new()).unwrap();
        let outcome = s.run_until_done(200, true, false).unwrap();
        prop_assert!(outcome.steps().is_some(), "{:?}", outcome);

        let rules = s.rules().unwrap();
        let conflict = s.conflict().unwrap().cloned();

        let mut arena = s.arena().clone();
        let again = generalize::install(&mut arena);
        let mut ticks = 0;
        while !step::tick(&mut arena).unwrap() {
            ticks += 1;
            prop_assert!(ticks < 200, "second generalizer did not settle");
        }
        prop_assert_eq!(generalize::rules(&arena, again).unwrap(), rules.clone());
        let NodeKind::Generalize(g) = &arena.node(again).unwrap().kind else {
            panic!("not a generalizer");
        };
        prop_assert_eq!(g.conflict.clone(), conflict);

        let mut values: Vec<_> = rules.iter().map(|r| r.value.clone()).collect();
        values.sort();
        values.dedup();
        prop_assert_eq!(values.len(), rules.len(), "one rule per value");
    }
}
