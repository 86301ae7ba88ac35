//! Gameplay constants, loadable from YAML, with validation.
//!
//! Every table is `#[serde(default)]` so a tuning file only needs the keys
//! it overrides.

use crate::{Gauge, RoomId, ThreatDistance};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for tuning tables.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// Interval or cadence that must be strictly positive.
    #[error("{0} must be > 0")]
    Zero(&'static str),
    /// Probability outside [0, 1] or not finite.
    #[error("{field} must be a probability in [0,1], got {value}")]
    Probability { field: &'static str, value: f64 },
    /// Range with min above max.
    #[error("{0}: min must not exceed max")]
    InvertedRange(&'static str),
    /// Starting value outside the clamped range of its field.
    #[error("start value {field} = {value} exceeds {max}")]
    StartOutOfRange {
        field: &'static str,
        value: u8,
        max: u8,
    },
    /// Leak event with no room it can fire in.
    #[error("gas leak needs at least one room")]
    NoLeakRooms,
}

/// Top-level tuning table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Wall-clock length of one tick in milliseconds.
    pub tick_ms: u64,
    pub start: StartTuning,
    pub noise: NoiseTuning,
    pub oxygen: OxygenTuning,
    pub power: PowerTuning,
    pub hide: HideTuning,
    pub graph: GraphTuning,
    pub objectives: ObjectiveTuning,
    pub challenge: ChallengeTuning,
    pub events: EventTuning,
    pub rewards: RewardTuning,
    /// `escape` also demands admin outside training runs.
    pub escape_requires_admin: bool,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            tick_ms: 1000,
            start: StartTuning::default(),
            noise: NoiseTuning::default(),
            oxygen: OxygenTuning::default(),
            power: PowerTuning::default(),
            hide: HideTuning::default(),
            graph: GraphTuning::default(),
            objectives: ObjectiveTuning::default(),
            challenge: ChallengeTuning::default(),
            events: EventTuning::default(),
            rewards: RewardTuning::default(),
            escape_requires_admin: true,
        }
    }
}

impl Tuning {
    /// Same table with every random element switched off: no locks, no
    /// shortcut, no events. Useful for scripted runs.
    pub fn calm() -> Self {
        let mut t = Self::default();
        t.graph.shortcut_chance = 0.0;
        t.graph.shortcut_boost = 0.0;
        t.graph.two_locks_chance = 0.0;
        t.graph.one_lock_chance = 0.0;
        for table in [
            &mut t.events.outage,
            &mut t.events.leak,
            &mut t.events.pursuit,
            &mut t.events.glitch,
            &mut t.events.surge,
        ] {
            table.chance = 0.0;
        }
        t
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartTuning {
    pub hp: u8,
    pub o2: u8,
    pub power: u8,
    pub noise: u8,
    pub threat: u8,
}

impl Default for StartTuning {
    fn default() -> Self {
        Self {
            hp: 100,
            o2: 100,
            power: 50,
            noise: 0,
            threat: 5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseTuning {
    /// Ambient cost of any non-meta command.
    pub command: u8,
    pub walk: u8,
    pub run: u8,
    /// The pursuer closes in only while noise is strictly above this.
    pub chase_threshold: u8,
    pub chase_every_ticks: u32,
    pub challenge_miss: u8,
    pub challenge_timeout: u8,
    pub glitch: u8,
}

impl Default for NoiseTuning {
    fn default() -> Self {
        Self {
            command: 2,
            walk: 1,
            run: 3,
            chase_threshold: 30,
            chase_every_ticks: 3,
            challenge_miss: 5,
            challenge_timeout: 10,
            glitch: 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OxygenTuning {
    pub drain_per_tick: u8,
    /// Seconds of no drain granted by the early-relief unlock.
    pub relief_window_secs: u32,
    pub emergency_refill: u8,
}

impl Default for OxygenTuning {
    fn default() -> Self {
        Self {
            drain_per_tick: 1,
            relief_window_secs: 30,
            emergency_refill: 30,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerTuning {
    pub repair_cost: u8,
    pub lock_cost: u8,
}

impl Default for PowerTuning {
    fn default() -> Self {
        Self {
            repair_cost: 10,
            lock_cost: 5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HideTuning {
    pub threat_gain: u8,
    pub time_cost_secs: u32,
}

impl Default for HideTuning {
    fn default() -> Self {
        Self {
            threat_gain: 2,
            time_cost_secs: 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphTuning {
    /// Chance of the hub-airlock shortcut.
    pub shortcut_chance: f64,
    /// Added to `shortcut_chance` by the shortcut unlock.
    pub shortcut_boost: f64,
    pub two_locks_chance: f64,
    /// Rolled only when two locks were not chosen.
    pub one_lock_chance: f64,
}

impl Default for GraphTuning {
    fn default() -> Self {
        Self {
            shortcut_chance: 0.1,
            shortcut_boost: 0.2,
            two_locks_chance: 0.3,
            one_lock_chance: 0.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectiveTuning {
    pub required: usize,
    pub training_required: usize,
}

impl Default for ObjectiveTuning {
    fn default() -> Self {
        Self {
            required: 2,
            training_required: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeTuning {
    pub timeout_ms: u64,
}

impl Default for ChallengeTuning {
    fn default() -> Self {
        Self { timeout_ms: 10_000 }
    }
}

/// Trigger chance and duration shared by every event kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventTable {
    /// Per-tick trigger probability.
    pub chance: f64,
    /// Ticks the event stays active.
    pub duration: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventTuning {
    /// Events triggered per run never exceed this.
    pub max_per_run: u32,
    /// No new event before this many elapsed seconds.
    pub grace_secs: u32,
    pub outage: EventTable,
    pub outage_power_hit: u8,
    pub outage_power_drain: u8,
    pub leak: EventTable,
    pub leak_o2_drain: u8,
    pub leak_rooms: Vec<RoomId>,
    pub pursuit: EventTable,
    pub pursuit_noise_threshold: u8,
    pub pursuit_close_every_ticks: u32,
    pub glitch: EventTable,
    pub glitch_reject_chance: f64,
    pub surge: EventTable,
    pub surge_gain: (u8, u8),
    pub surge_loss: (u8, u8),
    pub surge_noise: u8,
}

impl Default for EventTuning {
    fn default() -> Self {
        Self {
            max_per_run: 4,
            grace_secs: 30,
            outage: EventTable {
                chance: 0.08,
                duration: 5,
            },
            outage_power_hit: 15,
            outage_power_drain: 1,
            leak: EventTable {
                chance: 0.06,
                duration: 8,
            },
            leak_o2_drain: 2,
            leak_rooms: vec![RoomId::Reactor, RoomId::Storage, RoomId::Airlock],
            pursuit: EventTable {
                chance: 0.05,
                duration: 6,
            },
            pursuit_noise_threshold: 50,
            pursuit_close_every_ticks: 2,
            glitch: EventTable {
                chance: 0.04,
                duration: 4,
            },
            glitch_reject_chance: 0.3,
            surge: EventTable {
                chance: 0.05,
                duration: 1,
            },
            surge_gain: (10, 19),
            surge_loss: (5, 14),
            surge_noise: 10,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardTuning {
    pub per_objective: u32,
    pub escape_bonus: u32,
    pub per_danger_escape: u32,
    /// Danger escapes counted per run.
    pub danger_escape_cap: u32,
}

impl Default for RewardTuning {
    fn default() -> Self {
        Self {
            per_objective: 15,
            escape_bonus: 30,
            per_danger_escape: 5,
            danger_escape_cap: 3,
        }
    }
}

fn check_probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::Probability { field, value });
    }
    Ok(())
}

fn check_start(field: &'static str, value: u8, max: u8) -> Result<(), ConfigError> {
    if value > max {
        return Err(ConfigError::StartOutOfRange { field, value, max });
    }
    Ok(())
}

/// Validate the start table against the clamped ranges.
pub fn validate_start(s: &StartTuning) -> Result<(), ConfigError> {
    check_start("hp", s.hp, Gauge::MAX)?;
    check_start("o2", s.o2, Gauge::MAX)?;
    check_start("power", s.power, Gauge::MAX)?;
    check_start("noise", s.noise, Gauge::MAX)?;
    check_start("threat", s.threat, ThreatDistance::MAX)?;
    Ok(())
}

/// Validate the event tables.
pub fn validate_events(e: &EventTuning) -> Result<(), ConfigError> {
    for (name, table) in [
        ("events.outage.chance", &e.outage),
        ("events.leak.chance", &e.leak),
        ("events.pursuit.chance", &e.pursuit),
        ("events.glitch.chance", &e.glitch),
        ("events.surge.chance", &e.surge),
    ] {
        check_probability(name, table.chance)?;
        if table.duration == 0 {
            return Err(ConfigError::Zero("event duration"));
        }
    }
    check_probability("events.glitch_reject_chance", e.glitch_reject_chance)?;
    if e.pursuit_close_every_ticks == 0 {
        return Err(ConfigError::Zero("events.pursuit_close_every_ticks"));
    }
    if e.surge_gain.0 > e.surge_gain.1 {
        return Err(ConfigError::InvertedRange("events.surge_gain"));
    }
    if e.surge_loss.0 > e.surge_loss.1 {
        return Err(ConfigError::InvertedRange("events.surge_loss"));
    }
    if e.leak_rooms.is_empty() {
        return Err(ConfigError::NoLeakRooms);
    }
    Ok(())
}

/// Validate a whole tuning table.
pub fn validate_tuning(t: &Tuning) -> Result<(), ConfigError> {
    if t.tick_ms == 0 {
        return Err(ConfigError::Zero("tick_ms"));
    }
    if t.challenge.timeout_ms == 0 {
        return Err(ConfigError::Zero("challenge.timeout_ms"));
    }
    if t.noise.chase_every_ticks == 0 {
        return Err(ConfigError::Zero("noise.chase_every_ticks"));
    }
    validate_start(&t.start)?;
    check_probability("graph.shortcut_chance", t.graph.shortcut_chance)?;
    check_probability("graph.shortcut_boost", t.graph.shortcut_boost)?;
    check_probability("graph.two_locks_chance", t.graph.two_locks_chance)?;
    check_probability("graph.one_lock_chance", t.graph.one_lock_chance)?;
    validate_events(&t.events)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        validate_tuning(&Tuning::default()).unwrap();
        validate_tuning(&Tuning::calm()).unwrap();
    }

    #[test]
    fn partial_yaml_overrides_defaults() {
        let text = "tick_ms: 500\nevents:\n  max_per_run: 2\n  leak_rooms: [medbay]\n";
        let t: Tuning = serde_yaml::from_str(text).unwrap();
        assert_eq!(t.tick_ms, 500);
        assert_eq!(t.events.max_per_run, 2);
        assert_eq!(t.events.leak_rooms, vec![RoomId::Medbay]);
        assert_eq!(t.events.outage.duration, 5);
        assert_eq!(t.noise.command, 2);
        validate_tuning(&t).unwrap();
    }

    #[test]
    fn rejects_bad_probability() {
        let mut t = Tuning::default();
        t.events.glitch.chance = 1.5;
        assert_eq!(
            validate_tuning(&t),
            Err(ConfigError::Probability {
                field: "events.glitch.chance",
                value: 1.5
            })
        );
        t.events.glitch.chance = f64::NAN;
        assert!(validate_tuning(&t).is_err());
    }

    #[test]
    fn rejects_zero_interval_and_bad_start() {
        let mut t = Tuning::default();
        t.tick_ms = 0;
        assert_eq!(validate_tuning(&t), Err(ConfigError::Zero("tick_ms")));

        let mut t = Tuning::default();
        t.start.threat = 9;
        assert!(matches!(
            validate_tuning(&t),
            Err(ConfigError::StartOutOfRange { field: "threat", .. })
        ));
    }

    #[test]
    fn rejects_inverted_surge_range() {
        let mut t = Tuning::default();
        t.events.surge_loss = (9, 3);
        assert_eq!(
            validate_tuning(&t),
            Err(ConfigError::InvertedRange("events.surge_loss"))
        );
    }
}
