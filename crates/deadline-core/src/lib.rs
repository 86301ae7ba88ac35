#![deny(warnings)]

//! Core domain models and invariants for Deadline Shell.
//!
//! This crate defines the run state shared by every other crate, the
//! feedback stream handed to hosts, the persisted meta-progression record
//! and the tuning table with its validation helpers. Bounded quantities are
//! newtypes that clamp on every mutation, so the `[0, 100]` resource range
//! and the `[0, 5]` threat range cannot be left by construction.

mod feedback;
mod tuning;

pub use feedback::*;
pub use tuning::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Name lookup failure for rooms, permission tiers and similar keywords.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {name}")]
pub struct UnknownName {
    /// What was being looked up, e.g. "room".
    pub kind: &'static str,
    /// The rejected input.
    pub name: String,
}

/// A location on the station.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomId {
    Hub,
    Reactor,
    Medbay,
    Storage,
    Security,
    Airlock,
}

impl RoomId {
    /// Every room, in map order.
    pub const ALL: [RoomId; 6] = [
        RoomId::Hub,
        RoomId::Reactor,
        RoomId::Medbay,
        RoomId::Storage,
        RoomId::Security,
        RoomId::Airlock,
    ];
    /// Where every run starts; also the shortcut's hub end.
    pub const ENTRY: RoomId = RoomId::Hub;
    /// The only room `escape` works in.
    pub const EXIT: RoomId = RoomId::Airlock;
    /// Where `login` and `su` are accepted.
    pub const SECURE: RoomId = RoomId::Security;

    /// Command keyword, e.g. `reactor`.
    pub fn as_str(self) -> &'static str {
        match self {
            RoomId::Hub => "hub",
            RoomId::Reactor => "reactor",
            RoomId::Medbay => "medbay",
            RoomId::Storage => "storage",
            RoomId::Security => "security",
            RoomId::Airlock => "airlock",
        }
    }

    /// Human-readable room name.
    pub fn label(self) -> &'static str {
        match self {
            RoomId::Hub => "Central Hub",
            RoomId::Reactor => "Reactor Room",
            RoomId::Medbay => "Medical Bay",
            RoomId::Storage => "Storage",
            RoomId::Security => "Security Office",
            RoomId::Airlock => "Airlock",
        }
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoomId {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RoomId::ALL
            .into_iter()
            .find(|room| room.as_str() == s)
            .ok_or_else(|| UnknownName {
                kind: "room",
                name: s.to_string(),
            })
    }
}

/// Privilege tier. Ordering is `Guest < Engineer < Admin`.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    #[default]
    Guest,
    Engineer,
    Admin,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::Guest => "guest",
            Permission::Engineer => "engineer",
            Permission::Admin => "admin",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "guest" => Ok(Permission::Guest),
            "engineer" => Ok(Permission::Engineer),
            "admin" => Ok(Permission::Admin),
            other => Err(UnknownName {
                kind: "permission level",
                name: other.to_string(),
            }),
        }
    }
}

macro_rules! clamped_scalar {
    ($(#[$meta:meta])* $name:ident, $max:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(from = "i64", into = "i64")]
        pub struct $name(u8);

        impl $name {
            /// Inclusive upper bound.
            pub const MAX: u8 = $max;

            /// Builds a value, clamping into `[0, MAX]`.
            pub fn new(value: i64) -> Self {
                Self(value.clamp(0, i64::from(Self::MAX)) as u8)
            }

            pub fn get(self) -> u8 {
                self.0
            }

            /// Adds `delta` with clamping; returns the change actually applied.
            pub fn add(&mut self, delta: i64) -> i64 {
                let before = i64::from(self.0);
                *self = Self::new(before + delta);
                i64::from(self.0) - before
            }

            pub fn set(&mut self, value: i64) {
                *self = Self::new(value);
            }

            pub fn is_zero(self) -> bool {
                self.0 == 0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self::new(value)
            }
        }

        impl From<$name> for i64 {
            fn from(value: $name) -> Self {
                i64::from(value.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

clamped_scalar!(
    /// A resource level in `[0, 100]`.
    Gauge,
    100
);

clamped_scalar!(
    /// Pursuer distance in `[0, 5]`; zero means caught.
    ThreatDistance,
    5
);

impl ThreatDistance {
    /// Scan report tier for the current distance.
    pub fn tier(self) -> ThreatTier {
        match self.0 {
            5.. => ThreatTier::Far,
            3..=4 => ThreatTier::Approaching,
            1..=2 => ThreatTier::Near,
            0 => ThreatTier::Critical,
        }
    }
}

/// Coarse pursuer proximity as reported by `scan`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThreatTier {
    Far,
    Approaching,
    Near,
    Critical,
}

impl ThreatTier {
    pub fn as_str(self) -> &'static str {
        match self {
            ThreatTier::Far => "far",
            ThreatTier::Approaching => "approaching",
            ThreatTier::Near => "near",
            ThreatTier::Critical => "critical",
        }
    }
}

/// Depleting survival resources.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    pub hp: Gauge,
    pub o2: Gauge,
    pub power: Gauge,
    pub noise: Gauge,
}

/// One-shot capabilities granted at run start by permanent unlocks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grants {
    /// `use o2` refills oxygen once.
    pub emergency_o2: bool,
    /// `su` succeeds immediately once.
    pub elevation_token: bool,
    /// Opens one locked room on entry.
    pub access_card: bool,
    /// No O2 drain during the opening window.
    pub early_drain_relief: bool,
}

/// Why a run was lost.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossCause {
    Oxygen,
    Health,
    Caught,
}

impl LossCause {
    pub fn as_str(self) -> &'static str {
        match self {
            LossCause::Oxygen => "o2",
            LossCause::Health => "hp",
            LossCause::Caught => "caught",
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            LossCause::Oxygen => "You suffocated as the oxygen ran out.",
            LossCause::Health => "Your body gave out.",
            LossCause::Caught => "The pursuer found you.",
        }
    }
}

/// Random hazard kinds, in the fixed order they are rolled each tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PowerOutage,
    GasLeak,
    PursuitSurge,
    SystemGlitch,
    PowerSurge,
}

impl EventKind {
    pub const ORDER: [EventKind; 5] = [
        EventKind::PowerOutage,
        EventKind::GasLeak,
        EventKind::PursuitSurge,
        EventKind::SystemGlitch,
        EventKind::PowerSurge,
    ];

    pub fn label(self) -> &'static str {
        match self {
            EventKind::PowerOutage => "POWER OUTAGE",
            EventKind::GasLeak => "O2 LEAK",
            EventKind::PursuitSurge => "NOISE SPIKE",
            EventKind::SystemGlitch => "SYS GLITCH",
            EventKind::PowerSurge => "POWER SURGE",
        }
    }
}

/// The single mutable root of a run.
///
/// `permission` is private: it only moves upward through [`State::elevate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct State {
    pub running: bool,
    pub paused: bool,
    permission: Permission,
    pub location: RoomId,
    pub resources: Resources,
    /// Elapsed seconds; one per tick plus explicit time costs.
    pub time: u32,
    pub threat: ThreatDistance,
    pub door_locked: bool,
    pub grants: Grants,
    /// Tutorial run: no locks, no events, relaxed escape gate.
    pub training: bool,
}

impl State {
    /// Fresh state for a new run, positioned at the entry room.
    pub fn new(start: &StartTuning, training: bool) -> Self {
        Self {
            running: true,
            paused: false,
            permission: Permission::Guest,
            location: RoomId::ENTRY,
            resources: Resources {
                hp: Gauge::new(i64::from(start.hp)),
                o2: Gauge::new(i64::from(start.o2)),
                power: Gauge::new(i64::from(start.power)),
                noise: Gauge::new(i64::from(start.noise)),
            },
            time: 0,
            threat: ThreatDistance::new(i64::from(start.threat)),
            door_locked: false,
            grants: Grants::default(),
            training,
        }
    }

    pub fn permission(&self) -> Permission {
        self.permission
    }

    /// Raises the permission tier. Returns false when `to` is not above the
    /// current tier; permission never decreases.
    pub fn elevate(&mut self, to: Permission) -> bool {
        if to > self.permission {
            self.permission = to;
            true
        } else {
            false
        }
    }

    /// The loss condition currently met, checked in O2, HP, pursuer order.
    pub fn loss_cause(&self) -> Option<LossCause> {
        if self.resources.o2.is_zero() {
            Some(LossCause::Oxygen)
        } else if self.resources.hp.is_zero() {
            Some(LossCause::Health)
        } else if self.threat.is_zero() {
            Some(LossCause::Caught)
        } else {
            None
        }
    }
}

/// Permanent unlock purchasable in the shop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockId {
    EngineerStart,
    TempSuToken,
    EngineerKeycard,
    EmergencyO2,
    EarlyDrainRelief,
    ShortcutChance,
}

/// Cumulative statistics across runs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaStats {
    pub total_runs: u32,
    pub total_escapes: u32,
    pub total_deaths: u32,
    pub fastest_escape_seconds: Option<u32>,
    #[serde(default)]
    pub total_currency_earned: u32,
    #[serde(default)]
    pub danger_escapes: u32,
    #[serde(default)]
    pub hides: u32,
}

/// The record persisted between runs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaRecord {
    pub currency: u32,
    pub unlocks: BTreeSet<UnlockId>,
    pub stats: MetaStats,
    #[serde(default)]
    pub tutorial_completed: bool,
    /// Ids of unlocked achievements.
    #[serde(default)]
    pub achievements: BTreeSet<String>,
}

/// Single logical time source for ticks and challenge deadlines.
///
/// Hosts feed it wall-clock deltas; tests feed it exact steps. It never
/// moves backwards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LogicalClock {
    now: Duration,
}

impl LogicalClock {
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn advance(&mut self, dt: Duration) {
        self.now = self.now.saturating_add(dt);
    }

    pub fn advance_to(&mut self, at: Duration) {
        if at > self.now {
            self.now = at;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn room_names_roundtrip() {
        for room in RoomId::ALL {
            assert_eq!(room.as_str().parse::<RoomId>().unwrap(), room);
        }
        let err = "bridge".parse::<RoomId>().unwrap_err();
        assert_eq!(err.to_string(), "unknown room: bridge");
    }

    #[test]
    fn permission_is_ordered_and_monotonic() {
        assert!(Permission::Guest < Permission::Engineer);
        assert!(Permission::Engineer < Permission::Admin);
        let mut state = State::new(&StartTuning::default(), false);
        assert!(state.elevate(Permission::Admin));
        assert!(!state.elevate(Permission::Engineer));
        assert_eq!(state.permission(), Permission::Admin);
    }

    #[test]
    fn fresh_state_matches_start_table() {
        let state = State::new(&StartTuning::default(), false);
        assert_eq!(state.location, RoomId::Hub);
        assert_eq!(state.permission(), Permission::Guest);
        assert_eq!(state.resources.hp.get(), 100);
        assert_eq!(state.resources.o2.get(), 100);
        assert_eq!(state.resources.power.get(), 50);
        assert_eq!(state.resources.noise.get(), 0);
        assert_eq!(state.threat.get(), 5);
        assert!(state.running && !state.paused);
    }

    #[test]
    fn loss_cause_priority() {
        let mut state = State::new(&StartTuning::default(), false);
        assert_eq!(state.loss_cause(), None);
        state.threat.set(0);
        assert_eq!(state.loss_cause(), Some(LossCause::Caught));
        state.resources.o2.set(0);
        assert_eq!(state.loss_cause(), Some(LossCause::Oxygen));
    }

    #[test]
    fn threat_tiers() {
        assert_eq!(ThreatDistance::new(5).tier(), ThreatTier::Far);
        assert_eq!(ThreatDistance::new(3).tier(), ThreatTier::Approaching);
        assert_eq!(ThreatDistance::new(1).tier(), ThreatTier::Near);
        assert_eq!(ThreatDistance::new(0).tier(), ThreatTier::Critical);
    }

    #[test]
    fn meta_record_uses_camel_case_and_tolerates_old_saves() {
        let mut record = MetaRecord::default();
        record.unlocks.insert(UnlockId::EmergencyO2);
        record.stats.fastest_escape_seconds = Some(120);
        let text = serde_json::to_string(&record).unwrap();
        assert!(text.contains("\"fastestEscapeSeconds\":120"));
        assert!(text.contains("\"emergency_o2\""));

        let old = r#"{"currency":7,"unlocks":[],"stats":{"totalRuns":1,"totalEscapes":0,"totalDeaths":1,"fastestEscapeSeconds":null}}"#;
        let back: MetaRecord = serde_json::from_str(old).unwrap();
        assert_eq!(back.currency, 7);
        assert!(!back.tutorial_completed);
        assert_eq!(back.stats.total_deaths, 1);
    }

    #[test]
    fn out_of_range_gauge_is_clamped_on_load() {
        let g: Gauge = serde_json::from_str("250").unwrap();
        assert_eq!(g.get(), 100);
        let d: ThreatDistance = serde_json::from_str("-3").unwrap();
        assert_eq!(d.get(), 0);
    }

    #[test]
    fn clock_is_monotonic() {
        let mut clock = LogicalClock::default();
        clock.advance(Duration::from_millis(1500));
        clock.advance_to(Duration::from_millis(1000));
        assert_eq!(clock.now(), Duration::from_millis(1500));
    }

    proptest! {
        #[test]
        fn gauge_stays_in_range(start in -500i64..500, deltas in proptest::collection::vec(-300i64..300, 0..40)) {
            let mut g = Gauge::new(start);
            for d in deltas {
                let before = i64::from(g.get());
                let applied = g.add(d);
                prop_assert!(g.get() <= Gauge::MAX);
                prop_assert_eq!(i64::from(g.get()), before + applied);
            }
        }

        #[test]
        fn threat_stays_in_range(deltas in proptest::collection::vec(-10i64..10, 0..40)) {
            let mut t = ThreatDistance::new(5);
            for d in deltas {
                t.add(d);
                prop_assert!(t.get() <= ThreatDistance::MAX);
            }
        }
    }
}
