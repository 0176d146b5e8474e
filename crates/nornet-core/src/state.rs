//! Dispatch state machine

use std::fmt;

/// Stages one dispatch call moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    ResolvingDriver,
    ResolvingMethod,
    Executing,
    Succeeded,
    Failed,
}

impl DispatchState {
    /// Whether moving to `next` is a legal transition
    #[must_use]
    pub fn can_transition_to(self, next: DispatchState) -> bool {
        use DispatchState::{Executing, Failed, ResolvingDriver, ResolvingMethod, Succeeded};

        matches!(
            (self, next),
            (ResolvingDriver, ResolvingMethod | Failed)
                | (ResolvingMethod, Executing | Failed)
                | (Executing, Succeeded | Failed)
        )
    }

    /// Whether the dispatch has finished
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, DispatchState::Succeeded | DispatchState::Failed)
    }
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DispatchState::ResolvingDriver => "resolving_driver",
            DispatchState::ResolvingMethod => "resolving_method",
            DispatchState::Executing => "executing",
            DispatchState::Succeeded => "succeeded",
            DispatchState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        assert!(DispatchState::ResolvingDriver.can_transition_to(DispatchState::ResolvingMethod));
        assert!(DispatchState::ResolvingMethod.can_transition_to(DispatchState::Executing));
        assert!(DispatchState::Executing.can_transition_to(DispatchState::Succeeded));
    }

    #[test]
    fn test_every_stage_can_fail() {
        for state in [
            DispatchState::ResolvingDriver,
            DispatchState::ResolvingMethod,
            DispatchState::Executing,
        ] {
            assert!(state.can_transition_to(DispatchState::Failed));
            assert!(!state.is_terminal());
        }
    }

    #[test]
    fn test_no_skipping_or_leaving_terminal() {
        assert!(!DispatchState::ResolvingDriver.can_transition_to(DispatchState::Executing));
        assert!(!DispatchState::Succeeded.can_transition_to(DispatchState::Failed));
        assert!(!DispatchState::Failed.can_transition_to(DispatchState::ResolvingDriver));
        assert_eq!(DispatchState::Executing.to_string(), "executing");
    }
}
