use crate::command::ValidationError;
use deadline_core::{Permission, RoomId, Severity};
use deadline_meta::PurchaseError;
use deadline_world::{MoveDenied, ObjectiveError};
use std::time::Duration;
use thiserror::Error;

/// Legal verb whose precondition does not hold. The ambient noise cost has
/// already been paid; nothing else changes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    #[error("{0}")]
    Move(MoveDenied),
    #[error("{0}")]
    Objective(ObjectiveError),
    #[error("nothing to repair here")]
    NothingToRepair,
    #[error("permission denied ({0} or higher required)")]
    NeedPermission(Permission),
    #[error("not enough power (need {need}, have {have})")]
    InsufficientPower { need: u8, have: u8 },
    #[error("scan offline: power outage in progress")]
    ScanOffline,
    #[error("{verb} only works in the {}", .room.label())]
    WrongRoom { verb: &'static str, room: RoomId },
    #[error("already logged in as {0}")]
    AlreadyElevated(Permission),
    #[error("admin cannot be obtained with login; try su in the Security Office")]
    LoginAdmin,
    #[error("the door is already locked")]
    DoorAlreadyLocked,
    #[error("the door is already unlocked")]
    DoorAlreadyUnlocked,
    #[error("{} is not locked", .0.label())]
    RoomNotLocked(RoomId),
    #[error("escape systems not ready (objectives {done}/{required})")]
    EscapeNotReady { done: usize, required: usize },
    #[error("no emergency O2 canister")]
    NoEmergencyO2,
    #[error("{0}")]
    Purchase(PurchaseError),
}

impl PreconditionError {
    /// "Already in the desired state" reasons are warnings; the rest errors.
    pub fn severity(&self) -> Severity {
        match self {
            PreconditionError::NothingToRepair
            | PreconditionError::AlreadyElevated(_)
            | PreconditionError::DoorAlreadyLocked
            | PreconditionError::DoorAlreadyUnlocked
            | PreconditionError::RoomNotLocked(_)
            | PreconditionError::Objective(ObjectiveError::AlreadyCompleted(_))
            | PreconditionError::Purchase(PurchaseError::AlreadyOwned(_)) => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// Challenge outcome that is not a success.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeFailure {
    #[error("typo! noise rises, try again ({:.1}s left)", .remaining.as_secs_f32())]
    WrongInput { remaining: Duration },
    #[error("challenge failed: time is up")]
    TimedOut,
}

/// Every way a submitted line can fail.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Precondition(#[from] PreconditionError),
    #[error(transparent)]
    Challenge(#[from] ChallengeFailure),
    #[error("[GLITCH] system glitch: command lost")]
    Glitched,
    #[error("the run is over (shop, buy, stats, achievements and inventory still work)")]
    RunEnded,
}

impl CommandError {
    pub fn severity(&self) -> Severity {
        match self {
            CommandError::Precondition(e) => e.severity(),
            CommandError::RunEnded => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Whether the host should play the failure cue.
    pub fn cues_error(&self) -> bool {
        match self {
            CommandError::Validation(ValidationError::Empty) | CommandError::RunEnded => false,
            _ => self.severity() == Severity::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_strings_are_user_facing() {
        assert_eq!(
            CommandError::from(PreconditionError::WrongRoom {
                verb: "login",
                room: RoomId::Security
            })
            .to_string(),
            "login only works in the Security Office"
        );
        assert_eq!(
            PreconditionError::NeedPermission(Permission::Engineer).to_string(),
            "permission denied (engineer or higher required)"
        );
        assert_eq!(
            CommandError::from(ValidationError::UnknownVerb("xyzzy".into())).to_string(),
            "command not found: xyzzy (type help)"
        );
    }

    #[test]
    fn wrong_input_keeps_sub_second_precision() {
        let e = ChallengeFailure::WrongInput {
            remaining: Duration::from_millis(900),
        };
        assert_eq!(e.to_string(), "typo! noise rises, try again (0.9s left)");
    }

    #[test]
    fn objective_refusal_is_reported() {
        let e = CommandError::from(PreconditionError::Objective(
            ObjectiveError::AlreadyCompleted(deadline_world::ObjectiveId::Reactor),
        ));
        assert_eq!(e.to_string(), "already completed: Reactor Repair");
        assert_eq!(e.severity(), Severity::Warning);
    }

    #[test]
    fn warnings_do_not_cue() {
        let e = CommandError::from(PreconditionError::DoorAlreadyLocked);
        assert_eq!(e.severity(), Severity::Warning);
        assert!(!e.cues_error());
        assert!(CommandError::Glitched.cues_error());
    }
}
