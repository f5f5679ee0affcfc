// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn ctx() -> AgentContext {
    AgentContext::new(AgentId::new(), "do the thing", Priority::Normal, 1_000, "agent-x.db")
}

#[test]
fn happy_path_transitions_in_order() {
    let mut c = ctx();
    assert!(c.transition(AgentState::Generating, 1_001));
    assert!(c.transition(AgentState::Executing, 1_002));
    assert!(c.transition(AgentState::Submitting, 1_003));
    assert!(c.transition(AgentState::Reviewing, 1_004));
    assert!(c.transition(AgentState::Accepted, 1_005));
    assert_eq!(c.state, AgentState::Accepted);
    assert_eq!(c.state_changed_at_ms, 1_005);
}

#[test]
fn terminal_states_reject_further_transitions() {
    let mut c = ctx();
    c.transition(AgentState::Generating, 2);
    c.transition(AgentState::Executing, 3);
    c.transition(AgentState::Submitting, 4);
    c.transition(AgentState::Reviewing, 5);
    assert!(c.transition(AgentState::Rejected, 6));
    assert!(!c.transition(AgentState::Accepted, 7));
    assert_eq!(c.state, AgentState::Rejected);
    assert_eq!(c.state_changed_at_ms, 6);
}

#[test]
fn errored_reachable_from_any_non_terminal_pre_review_state() {
    for start in [AgentState::Queued, AgentState::Generating, AgentState::Executing, AgentState::Submitting] {
        assert!(start.can_transition_to(AgentState::Errored), "{start} should reach Errored");
    }
    assert!(!AgentState::Reviewing.can_transition_to(AgentState::Errored));
}

#[test]
fn reject_allowed_from_queued_and_reviewing_only() {
    assert!(AgentState::Queued.can_transition_to(AgentState::Rejected));
    assert!(AgentState::Reviewing.can_transition_to(AgentState::Rejected));
    assert!(!AgentState::Generating.can_transition_to(AgentState::Rejected));
    assert!(!AgentState::Executing.can_transition_to(AgentState::Rejected));
}

#[test]
fn mark_errored_captures_state_at_failure() {
    let mut c = ctx();
    c.transition(AgentState::Generating, 10);
    let ok = c.mark_errored(
        AgentError { kind: "provider_error".into(), message: "boom".into(), state_at_failure: AgentState::Queued },
        11,
    );
    assert!(ok);
    let err = c.error.expect("error set");
    assert_eq!(err.state_at_failure, AgentState::Generating);
    assert_eq!(c.state, AgentState::Errored);
}

#[test]
fn mark_errored_is_noop_from_terminal_state() {
    let mut c = ctx();
    c.state = AgentState::Accepted;
    let ok = c.mark_errored(
        AgentError { kind: "x".into(), message: "y".into(), state_at_failure: AgentState::Queued },
        99,
    );
    assert!(!ok);
    assert!(c.error.is_none());
}
