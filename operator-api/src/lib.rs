pub mod consts;

use std::cmp::Ordering;
use std::fmt;

/// A stage of the zero-downtime upgrade state machine, totally ordered.
///
/// The ordinals below are load-bearing: `TryAdvance` rejects any transition whose
/// ordinal difference is not exactly `0` or `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(i64)]
pub enum Stage {
    UpdateInitiated = 0,
    ReplicaCreated = 1,
    ReplicaStarting = 2,
    ReplicaReady = 3,
    MainShuttingDown = 4,
    MainReady = 5,
    UpdateFinished = 6,
}

/// All stages in ascending order, used by tests and by `Stage::parse`'s fallback search.
pub const ALL_STAGES: [Stage; 7] = [
    Stage::UpdateInitiated,
    Stage::ReplicaCreated,
    Stage::ReplicaStarting,
    Stage::ReplicaReady,
    Stage::MainShuttingDown,
    Stage::MainReady,
    Stage::UpdateFinished,
];

impl Stage {
    /// Parses the wire representation written into the checkpoint `ConfigMap`.
    ///
    /// Unlike the source this is grounded on, an unrecognized tag is a parse failure rather
    /// than silently defaulting to `UpdateInitiated` -- the spec requires rejecting unknown tags.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "update-initiated" => Self::UpdateInitiated,
            "replica-created" => Self::ReplicaCreated,
            "replica-starting" => Self::ReplicaStarting,
            "replica-ready" => Self::ReplicaReady,
            "main-shutting-down" => Self::MainShuttingDown,
            "main-ready" => Self::MainReady,
            "update-finished" => Self::UpdateFinished,
            _ => return None,
        })
    }

    /// The next stage in sequence, or `None` if already terminal.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        ALL_STAGES.get(self as usize + 1).copied()
    }

    /// Checks invariant (6): a stage transition is legal iff `0 <= desired - current <= 1`.
    #[must_use]
    pub fn can_advance_to(self, desired: Self) -> bool {
        let diff = desired as i64 - self as i64;
        (0..=1).contains(&diff)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UpdateInitiated => "update-initiated",
            Self::ReplicaCreated => "replica-created",
            Self::ReplicaStarting => "replica-starting",
            Self::ReplicaReady => "replica-ready",
            Self::MainShuttingDown => "main-shutting-down",
            Self::MainReady => "main-ready",
            Self::UpdateFinished => "update-finished",
        })
    }
}

/// Ordering helper kept for symmetry with `Stage`'s derive; `Stage` already implements `Ord`
/// via its declaration order, this just documents the numeric comparison explicitly.
#[must_use]
pub fn compare_stages(a: Stage, b: Stage) -> Ordering {
    (a as i64).cmp(&(b as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_round_trips_through_display_and_parse() {
        for stage in ALL_STAGES {
            assert_eq!(Stage::parse(&stage.to_string()), Some(stage));
        }
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert_eq!(Stage::parse("bogus"), None);
    }

    #[test]
    fn advance_allows_only_hold_or_single_step() {
        assert!(Stage::ReplicaCreated.can_advance_to(Stage::ReplicaCreated));
        assert!(Stage::ReplicaCreated.can_advance_to(Stage::ReplicaStarting));
        assert!(!Stage::ReplicaCreated.can_advance_to(Stage::ReplicaReady));
        assert!(!Stage::ReplicaStarting.can_advance_to(Stage::ReplicaCreated));
    }

    #[test]
    fn next_is_none_at_terminal_stage() {
        assert_eq!(Stage::UpdateFinished.next(), None);
        assert_eq!(Stage::UpdateInitiated.next(), Some(Stage::ReplicaCreated));
    }
}
