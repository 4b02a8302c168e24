//! Lifecycle state machine (spec §4.11).
//!
//! Applied by the explicit state-transition API, never by the
//! enrichment pipeline.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Planning,
    Active,
    Paused,
    Blocked,
    Completed,
    Cancelled,
    Superseded,
    Archived,
}

impl LifecycleState {
    /// Valid starting states for a brand-new memory (the `∅ →` row).
    pub fn is_valid_initial(self) -> bool {
        matches!(self, LifecycleState::Planning | LifecycleState::Superseded)
    }

    /// Whether `self -> next` is an allowed transition per spec §4.11.
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Planning, Active)
                | (Planning, Cancelled)
                | (Active, Paused)
                | (Active, Blocked)
                | (Active, Completed)
                | (Active, Cancelled)
                | (Active, Superseded)
                | (Paused, Active)
                | (Paused, Cancelled)
                | (Paused, Superseded)
                | (Blocked, Active)
                | (Blocked, Cancelled)
                | (Blocked, Superseded)
                | (Completed, Archived)
                | (Completed, Superseded)
                | (Cancelled, Archived)
                | (Cancelled, Superseded)
                | (Superseded, Archived)
        )
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LifecycleState::Planning => "planning",
            LifecycleState::Active => "active",
            LifecycleState::Paused => "paused",
            LifecycleState::Blocked => "blocked",
            LifecycleState::Completed => "completed",
            LifecycleState::Cancelled => "cancelled",
            LifecycleState::Superseded => "superseded",
            LifecycleState::Archived => "archived",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for LifecycleState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "planning" => Ok(Self::Planning),
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            "blocked" => Ok(Self::Blocked),
            "completed" => Ok(Self::Completed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            "superseded" => Ok(Self::Superseded),
            "archived" => Ok(Self::Archived),
            other => Err(format!("unknown lifecycle state: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LifecycleState::*;

    #[test]
    fn archived_is_terminal() {
        for state in [Planning, Active, Paused, Blocked, Completed, Cancelled, Superseded, Archived] {
            assert!(!Archived.can_transition_to(state));
        }
    }

    #[test]
    fn active_has_five_outgoing_transitions() {
        let targets = [Planning, Active, Paused, Blocked, Completed, Cancelled, Superseded, Archived];
        let count = targets.iter().filter(|&&t| Active.can_transition_to(t)).count();
        assert_eq!(count, 5);
    }

    #[test]
    fn planning_cannot_jump_to_completed() {
        assert!(!Planning.can_transition_to(Completed));
    }

    #[test]
    fn disallowed_transition_examples() {
        assert!(!Completed.can_transition_to(Active));
        assert!(!Cancelled.can_transition_to(Planning));
        assert!(!Superseded.can_transition_to(Active));
    }

    #[test]
    fn display_roundtrips_through_from_str() {
        for state in [Planning, Active, Paused, Blocked, Completed, Cancelled, Superseded, Archived] {
            let parsed: LifecycleState = state.to_string().parse().unwrap();
            assert_eq!(parsed, state);
        }
    }
}
