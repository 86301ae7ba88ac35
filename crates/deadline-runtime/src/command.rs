//! Command-line parsing.

use deadline_core::{Permission, RoomId, UnknownName};
use thiserror::Error;

/// Malformed command. Never mutates state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("empty command")]
    Empty,
    #[error("command not found: {0} (type help)")]
    UnknownVerb(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("{0}")]
    UnknownRoom(UnknownName),
    #[error("{0}")]
    UnknownLevel(UnknownName),
    #[error("not a valid item number: {0}")]
    InvalidNumber(String),
    #[error("unknown item: {0} (available: o2)")]
    UnknownItem(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pace {
    Walk,
    Run,
}

/// Consumable usable with `use`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Item {
    EmergencyO2,
}

/// A parsed command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    Status,
    Scan,
    Move { to: RoomId, pace: Pace },
    Ls,
    Map,
    Objectives,
    Hide,
    Repair,
    Login { level: Permission },
    Su,
    LockDoor,
    UnlockDoor,
    UnlockRoom(RoomId),
    Escape,
    Shop,
    Buy(usize),
    Use(Item),
    Inventory,
    Stats,
    Achievements,
}

fn room(arg: Option<&str>, usage: &'static str) -> Result<RoomId, ValidationError> {
    arg.ok_or(ValidationError::Usage(usage))?
        .parse()
        .map_err(ValidationError::UnknownRoom)
}

impl Command {
    /// Parses one line: lower-cased, whitespace-tokenised, verb first.
    pub fn parse(line: &str) -> Result<Self, ValidationError> {
        let lowered = line.trim().to_lowercase();
        let mut words = lowered.split_whitespace();
        let verb = words.next().ok_or(ValidationError::Empty)?;
        let arg = words.next();
        let command = match verb {
            "help" => Command::Help,
            "status" => Command::Status,
            "scan" => Command::Scan,
            "cd" => Command::Move {
                to: room(arg, "cd <room>")?,
                pace: Pace::Walk,
            },
            "run" => Command::Move {
                to: room(arg, "run <room>")?,
                pace: Pace::Run,
            },
            "ls" => Command::Ls,
            "map" => Command::Map,
            "objectives" | "obj" => Command::Objectives,
            "hide" => Command::Hide,
            "repair" => Command::Repair,
            "login" => {
                let level = match arg {
                    None | Some("user") => Permission::Engineer,
                    Some(name) => name.parse().map_err(ValidationError::UnknownLevel)?,
                };
                Command::Login { level }
            }
            "su" => Command::Su,
            "lock" => match arg {
                Some("door") => Command::LockDoor,
                _ => return Err(ValidationError::Usage("lock door")),
            },
            "unlock" => match arg {
                Some("door") => Command::UnlockDoor,
                Some(_) => Command::UnlockRoom(room(arg, "unlock <door|room>")?),
                None => return Err(ValidationError::Usage("unlock <door|room>")),
            },
            "escape" => Command::Escape,
            "shop" => Command::Shop,
            "buy" => {
                let raw = arg.ok_or(ValidationError::Usage("buy <number>"))?;
                let index = raw
                    .parse()
                    .map_err(|_| ValidationError::InvalidNumber(raw.to_string()))?;
                Command::Buy(index)
            }
            "use" => match arg {
                Some("o2") => Command::Use(Item::EmergencyO2),
                Some(other) => return Err(ValidationError::UnknownItem(other.to_string())),
                None => return Err(ValidationError::Usage("use <item>")),
            },
            "inventory" | "inv" => Command::Inventory,
            "stats" => Command::Stats,
            "achievements" => Command::Achievements,
            other => return Err(ValidationError::UnknownVerb(other.to_string())),
        };
        Ok(command)
    }

    /// Bookkeeping verbs: no ambient noise cost.
    pub fn is_meta(&self) -> bool {
        matches!(
            self,
            Command::Shop
                | Command::Buy(_)
                | Command::Stats
                | Command::Inventory
                | Command::Achievements
        )
    }

    /// Verbs still accepted once the run has ended.
    pub fn allowed_after_run(&self) -> bool {
        self.is_meta() || matches!(self, Command::Help)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_movement_case_insensitively() {
        assert_eq!(
            Command::parse("  CD Reactor "),
            Ok(Command::Move {
                to: RoomId::Reactor,
                pace: Pace::Walk
            })
        );
        assert_eq!(
            Command::parse("run airlock"),
            Ok(Command::Move {
                to: RoomId::Airlock,
                pace: Pace::Run
            })
        );
    }

    #[test]
    fn missing_and_bad_arguments() {
        assert_eq!(Command::parse("cd"), Err(ValidationError::Usage("cd <room>")));
        assert_eq!(
            Command::parse("cd bridge").unwrap_err().to_string(),
            "unknown room: bridge"
        );
        assert_eq!(
            Command::parse("buy two"),
            Err(ValidationError::InvalidNumber("two".into()))
        );
        assert_eq!(Command::parse("lock"), Err(ValidationError::Usage("lock door")));
        assert_eq!(Command::parse("   "), Err(ValidationError::Empty));
        assert_eq!(
            Command::parse("dance"),
            Err(ValidationError::UnknownVerb("dance".into()))
        );
    }

    #[test]
    fn unlock_targets() {
        assert_eq!(Command::parse("unlock door"), Ok(Command::UnlockDoor));
        assert_eq!(
            Command::parse("unlock storage"),
            Ok(Command::UnlockRoom(RoomId::Storage))
        );
    }

    #[test]
    fn login_levels() {
        assert_eq!(
            Command::parse("login"),
            Ok(Command::Login {
                level: Permission::Engineer
            })
        );
        assert_eq!(
            Command::parse("login admin"),
            Ok(Command::Login {
                level: Permission::Admin
            })
        );
        assert!(matches!(
            Command::parse("login root"),
            Err(ValidationError::UnknownLevel(_))
        ));
    }

    #[test]
    fn meta_verbs_are_noise_free() {
        for line in ["shop", "buy 1", "stats", "inventory", "achievements"] {
            assert!(Command::parse(line).unwrap().is_meta(), "{line}");
        }
        for line in ["help", "status", "scan", "hide", "map"] {
            assert!(!Command::parse(line).unwrap().is_meta(), "{line}");
        }
        assert!(Command::Help.allowed_after_run());
        assert!(!Command::Scan.allowed_after_run());
    }
}
