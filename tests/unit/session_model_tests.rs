//! Unit tests for `SessionPhase` lifecycle transitions.

use lsp_recorder::models::SessionPhase;

const ALL: [SessionPhase; 4] = [
    SessionPhase::Starting,
    SessionPhase::Running,
    SessionPhase::Draining,
    SessionPhase::Stopped,
];

#[test]
fn normal_lifecycle_is_allowed() {
    assert!(SessionPhase::Starting.can_transition_to(SessionPhase::Running));
    assert!(SessionPhase::Running.can_transition_to(SessionPhase::Draining));
    assert!(SessionPhase::Draining.can_transition_to(SessionPhase::Stopped));
}

#[test]
fn failed_setup_skips_running() {
    assert!(SessionPhase::Starting.can_transition_to(SessionPhase::Draining));
}

#[test]
fn backwards_and_skipping_transitions_are_rejected() {
    assert!(!SessionPhase::Running.can_transition_to(SessionPhase::Starting));
    assert!(!SessionPhase::Draining.can_transition_to(SessionPhase::Running));
    assert!(!SessionPhase::Starting.can_transition_to(SessionPhase::Stopped));
    assert!(!SessionPhase::Running.can_transition_to(SessionPhase::Stopped));
}

#[test]
fn stopped_is_terminal() {
    for next in ALL {
        assert!(
            !SessionPhase::Stopped.can_transition_to(next),
            "Stopped -> {next:?} must be rejected"
        );
    }
    assert!(SessionPhase::Stopped.is_terminal());
    assert!(!SessionPhase::Draining.is_terminal());
}

#[test]
fn self_transitions_are_rejected() {
    for phase in ALL {
        assert!(!phase.can_transition_to(phase), "{phase:?} -> itself");
    }
}
