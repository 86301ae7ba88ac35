use deadline_core::{Permission, RoomId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The fixed repair objectives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveId {
    Reactor,
    Security,
    Airlock,
}

impl ObjectiveId {
    pub const ALL: [ObjectiveId; 3] = [
        ObjectiveId::Reactor,
        ObjectiveId::Security,
        ObjectiveId::Airlock,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ObjectiveId::Reactor => "Reactor Repair",
            ObjectiveId::Security => "Security Override",
            ObjectiveId::Airlock => "Airlock Preparation",
        }
    }

    pub fn room(self) -> RoomId {
        match self {
            ObjectiveId::Reactor => RoomId::Reactor,
            ObjectiveId::Security => RoomId::Security,
            ObjectiveId::Airlock => RoomId::Airlock,
        }
    }

    pub fn required_permission(self) -> Permission {
        match self {
            ObjectiveId::Reactor | ObjectiveId::Security => Permission::Engineer,
            ObjectiveId::Airlock => Permission::Guest,
        }
    }
}

/// An objective and its completion flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objective {
    pub id: ObjectiveId,
    pub room: RoomId,
    pub required_permission: Permission,
    pub completed: bool,
}

/// Why an objective could not be completed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveError {
    #[error("unknown objective")]
    Unknown,
    #[error("already completed: {}", .0.name())]
    AlreadyCompleted(ObjectiveId),
    #[error("{} can only be done in {}", .0.name(), .0.room().label())]
    WrongRoom(ObjectiveId),
    #[error("permission denied ({} or higher required)", .0.required_permission())]
    InsufficientPermission(ObjectiveId),
}

/// Tracks objective completion and the escape gate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectiveTracker {
    objectives: Vec<Objective>,
    required: usize,
}

impl ObjectiveTracker {
    /// The standard objective set, none completed, with `required`
    /// completions needed to escape.
    pub fn new(required: usize) -> Self {
        let objectives = ObjectiveId::ALL
            .into_iter()
            .map(|id| Objective {
                id,
                room: id.room(),
                required_permission: id.required_permission(),
                completed: false,
            })
            .collect();
        Self {
            objectives,
            required,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Objective> {
        self.objectives.iter()
    }

    pub fn get(&self, id: ObjectiveId) -> Option<&Objective> {
        self.objectives.iter().find(|o| o.id == id)
    }

    /// First incomplete objective bound to `room`.
    pub fn objective_for(&self, room: RoomId) -> Option<&Objective> {
        self.objectives
            .iter()
            .find(|o| o.room == room && !o.completed)
    }

    /// Marks `id` completed after checking location and permission. Only
    /// flips the flag; rewards and messages are up to the caller.
    pub fn complete(
        &mut self,
        id: ObjectiveId,
        location: RoomId,
        permission: Permission,
    ) -> Result<(), ObjectiveError> {
        let objective = self
            .objectives
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(ObjectiveError::Unknown)?;
        if objective.completed {
            return Err(ObjectiveError::AlreadyCompleted(id));
        }
        if location != objective.room {
            return Err(ObjectiveError::WrongRoom(id));
        }
        if permission < objective.required_permission {
            return Err(ObjectiveError::InsufficientPermission(id));
        }
        objective.completed = true;
        Ok(())
    }

    pub fn completed_count(&self) -> usize {
        self.objectives.iter().filter(|o| o.completed).count()
    }

    pub fn required_count(&self) -> usize {
        self.required
    }

    pub fn total(&self) -> usize {
        self.objectives.len()
    }

    /// True when enough objectives are done and `location` is the exit.
    pub fn can_escape(&self, location: RoomId) -> bool {
        self.completed_count() >= self.required && location == RoomId::EXIT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn objective_for_skips_completed() {
        let mut t = ObjectiveTracker::new(2);
        assert_eq!(
            t.objective_for(RoomId::Airlock).map(|o| o.id),
            Some(ObjectiveId::Airlock)
        );
        t.complete(ObjectiveId::Airlock, RoomId::Airlock, Permission::Guest)
            .unwrap();
        assert!(t.objective_for(RoomId::Airlock).is_none());
        assert!(t.objective_for(RoomId::Hub).is_none());
    }

    #[test]
    fn complete_checks_each_precondition() {
        let mut t = ObjectiveTracker::new(2);
        assert_eq!(
            t.complete(ObjectiveId::Reactor, RoomId::Hub, Permission::Admin),
            Err(ObjectiveError::WrongRoom(ObjectiveId::Reactor))
        );
        assert_eq!(
            t.complete(ObjectiveId::Reactor, RoomId::Reactor, Permission::Guest),
            Err(ObjectiveError::InsufficientPermission(ObjectiveId::Reactor))
        );
        assert_eq!(t.completed_count(), 0);
        t.complete(ObjectiveId::Reactor, RoomId::Reactor, Permission::Engineer)
            .unwrap();
        assert_eq!(
            t.complete(ObjectiveId::Reactor, RoomId::Reactor, Permission::Engineer),
            Err(ObjectiveError::AlreadyCompleted(ObjectiveId::Reactor))
        );
        assert_eq!(t.completed_count(), 1);
    }

    #[test]
    fn escape_gate_needs_count_and_exit() {
        let mut t = ObjectiveTracker::new(2);
        t.complete(ObjectiveId::Airlock, RoomId::Airlock, Permission::Guest)
            .unwrap();
        assert!(!t.can_escape(RoomId::Airlock));
        t.complete(ObjectiveId::Security, RoomId::Security, Permission::Admin)
            .unwrap();
        assert!(!t.can_escape(RoomId::Security));
        assert!(t.can_escape(RoomId::Airlock));
    }

    #[test]
    fn zero_threshold_only_needs_exit() {
        let t = ObjectiveTracker::new(0);
        assert!(t.can_escape(RoomId::Airlock));
        assert!(!t.can_escape(RoomId::Hub));
        assert_eq!(t.total(), 3);
    }

    #[test]
    fn error_messages_name_the_requirement() {
        assert_eq!(
            ObjectiveError::InsufficientPermission(ObjectiveId::Reactor).to_string(),
            "permission denied (engineer or higher required)"
        );
        assert_eq!(
            ObjectiveError::WrongRoom(ObjectiveId::Security).to_string(),
            "Security Override can only be done in Security Office"
        );
    }
}
