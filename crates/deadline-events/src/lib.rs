#![deny(warnings)]

//! Random hazards that fire during a run and expire after a fixed number of
//! ticks.
//!
//! Behaviour is data-driven: each [`EventKind`] maps to pure effect
//! functions ([`apply_trigger`], [`apply_tick`], [`end_feedback`]) that the
//! [`EventScheduler`] calls in a fixed order every tick.

use deadline_core::{
    EventKind, EventSummary, EventTable, EventTuning, Feedback, OutputSink, RoomId, Severity,
    State,
};
use rand::Rng;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// A hazard currently in effect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveEvent {
    pub kind: EventKind,
    /// Ticks left; the event ends when this reaches zero.
    pub remaining: u32,
    pub total: u32,
    /// Room bound at trigger time (gas leak only).
    pub leak_room: Option<RoomId>,
}

fn table(kind: EventKind, tuning: &EventTuning) -> &EventTable {
    match kind {
        EventKind::PowerOutage => &tuning.outage,
        EventKind::GasLeak => &tuning.leak,
        EventKind::PursuitSurge => &tuning.pursuit,
        EventKind::SystemGlitch => &tuning.glitch,
        EventKind::PowerSurge => &tuning.surge,
    }
}

/// Whether `kind` may be rolled at all given the current state.
pub fn eligible(kind: EventKind, state: &State, tuning: &EventTuning) -> bool {
    match kind {
        EventKind::GasLeak => tuning.leak_rooms.contains(&state.location),
        EventKind::PursuitSurge => {
            state.resources.noise.get() >= tuning.pursuit_noise_threshold
        }
        EventKind::PowerOutage | EventKind::SystemGlitch | EventKind::PowerSurge => true,
    }
}

/// Immediate effect of a freshly triggered event. Returns the active record
/// and the notification lines.
pub fn apply_trigger<R: Rng + ?Sized>(
    kind: EventKind,
    state: &mut State,
    tuning: &EventTuning,
    rng: &mut R,
) -> (ActiveEvent, Vec<Feedback>) {
    let duration = table(kind, tuning).duration;
    let mut event = ActiveEvent {
        kind,
        remaining: duration,
        total: duration,
        leak_room: None,
    };
    let lines = match kind {
        EventKind::PowerOutage => {
            state.resources.power.add(-i64::from(tuning.outage_power_hit));
            vec![
                Feedback::new(Severity::Error, "[WARNING] Power outage!"),
                Feedback::new(
                    Severity::Warning,
                    format!(
                        "Power drops by {}. scan is offline until power returns.",
                        tuning.outage_power_hit
                    ),
                ),
            ]
        }
        EventKind::GasLeak => {
            event.leak_room = Some(state.location);
            vec![
                Feedback::new(Severity::Error, "[WARNING] Oxygen leak detected!"),
                Feedback::new(
                    Severity::Warning,
                    format!(
                        "O2 is venting fast in {}. Move to another room.",
                        state.location.label()
                    ),
                ),
            ]
        }
        EventKind::PursuitSurge => {
            state.threat.add(-1);
            vec![
                Feedback::new(Severity::Error, "[WARNING] Noise spike detected!"),
                Feedback::new(Severity::Warning, "The pursuer is closing in faster!"),
            ]
        }
        EventKind::SystemGlitch => vec![
            Feedback::new(Severity::Error, "[WARNING] System glitch!"),
            Feedback::new(Severity::Warning, "Your next command may fail."),
        ],
        EventKind::PowerSurge => {
            if rng.gen_bool(0.5) {
                let (lo, hi) = tuning.surge_gain;
                let gain = rng.gen_range(lo..=hi);
                state.resources.power.add(i64::from(gain));
                vec![
                    Feedback::new(Severity::Warning, "[EVENT] Power surge!"),
                    Feedback::new(Severity::Success, format!("Power recharged by +{gain}.")),
                ]
            } else {
                let (lo, hi) = tuning.surge_loss;
                let loss = rng.gen_range(lo..=hi);
                state.resources.power.add(-i64::from(loss));
                state.resources.noise.add(i64::from(tuning.surge_noise));
                vec![
                    Feedback::new(Severity::Warning, "[EVENT] Power surge!"),
                    Feedback::new(
                        Severity::Error,
                        format!("Overload: power -{loss}, noise +{}.", tuning.surge_noise),
                    ),
                ]
            }
        }
    };
    (event, lines)
}

/// Continuous effect applied once per tick while `event` is active. Runs
/// after `state.time` has advanced for the tick.
pub fn apply_tick(event: &ActiveEvent, state: &mut State, tuning: &EventTuning) {
    match event.kind {
        EventKind::PowerOutage => {
            state
                .resources
                .power
                .add(-i64::from(tuning.outage_power_drain));
        }
        EventKind::GasLeak => {
            if event.leak_room == Some(state.location) {
                state.resources.o2.add(-i64::from(tuning.leak_o2_drain));
            }
        }
        EventKind::PursuitSurge => {
            if state.time % tuning.pursuit_close_every_ticks == 0 {
                state.threat.add(-1);
            }
        }
        EventKind::SystemGlitch | EventKind::PowerSurge => {}
    }
}

/// Notification emitted when `kind` expires, if any.
pub fn end_feedback(kind: EventKind) -> Option<Feedback> {
    let text = match kind {
        EventKind::PowerOutage => "[SYSTEM] Power restored.",
        EventKind::GasLeak => "[SYSTEM] Oxygen leak sealed automatically.",
        EventKind::PursuitSurge => "[SYSTEM] Pursuer speed back to normal.",
        EventKind::SystemGlitch => "[SYSTEM] Systems stabilised.",
        EventKind::PowerSurge => return None,
    };
    Some(Feedback::new(Severity::Success, text))
}

/// Per-run hazard scheduler.
#[derive(Clone, Debug, Default)]
pub struct EventScheduler {
    active: Vec<ActiveEvent>,
    triggered: u32,
    fired: BTreeSet<EventKind>,
    glitch_pending: bool,
    disabled: bool,
}

impl EventScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// A scheduler that never rolls new events (training runs).
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            ..Self::default()
        }
    }

    /// One scheduler step: age active events, then maybe trigger one new
    /// event. Returns the kind triggered this tick.
    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        state: &mut State,
        tuning: &EventTuning,
        rng: &mut R,
        out: &mut dyn OutputSink,
    ) -> Option<EventKind> {
        let mut ended = Vec::new();
        for event in &mut self.active {
            event.remaining = event.remaining.saturating_sub(1);
            apply_tick(event, state, tuning);
            if event.remaining == 0 {
                ended.push(event.kind);
            }
        }
        self.active.retain(|e| e.remaining > 0);
        for kind in ended {
            if kind == EventKind::SystemGlitch {
                self.glitch_pending = false;
            }
            debug!(?kind, "event ended");
            if let Some(line) = end_feedback(kind) {
                out.emit(line);
            }
        }

        if self.disabled || self.triggered >= tuning.max_per_run || state.time < tuning.grace_secs
        {
            return None;
        }
        let candidate = EventKind::ORDER.into_iter().find(|&kind| {
            !self.is_active(kind)
                && eligible(kind, state, tuning)
                && rng.gen_bool(table(kind, tuning).chance.clamp(0.0, 1.0))
        })?;
        self.trigger(candidate, state, tuning, rng, out);
        Some(candidate)
    }

    /// Starts `kind` unconditionally, bypassing probability, cap and grace
    /// checks. Does nothing if the kind is already active.
    pub fn trigger<R: Rng + ?Sized>(
        &mut self,
        kind: EventKind,
        state: &mut State,
        tuning: &EventTuning,
        rng: &mut R,
        out: &mut dyn OutputSink,
    ) -> bool {
        if self.is_active(kind) {
            return false;
        }
        self.triggered += 1;
        self.fired.insert(kind);
        let (event, lines) = apply_trigger(kind, state, tuning, rng);
        if kind == EventKind::SystemGlitch {
            self.glitch_pending = true;
        }
        info!(?kind, count = self.triggered, time = state.time, "event triggered");
        self.active.push(event);
        out.error_cue();
        for line in lines {
            out.emit(line);
        }
        true
    }

    pub fn is_active(&self, kind: EventKind) -> bool {
        self.active.iter().any(|e| e.kind == kind)
    }

    pub fn active(&self) -> &[ActiveEvent] {
        &self.active
    }

    /// `scan` is unavailable during a power outage.
    pub fn scan_disabled(&self) -> bool {
        self.is_active(EventKind::PowerOutage)
    }

    /// Room currently leaking O2, if a leak is active.
    pub fn leak_room(&self) -> Option<RoomId> {
        self.active
            .iter()
            .find(|e| e.kind == EventKind::GasLeak)
            .and_then(|e| e.leak_room)
    }

    pub fn glitch_pending(&self) -> bool {
        self.glitch_pending
    }

    /// Consumes the pending glitch flag. Returns true when the command that
    /// triggered this check must be rejected.
    pub fn take_glitch<R: Rng + ?Sized>(&mut self, tuning: &EventTuning, rng: &mut R) -> bool {
        if !std::mem::take(&mut self.glitch_pending) {
            return false;
        }
        rng.gen_bool(tuning.glitch_reject_chance.clamp(0.0, 1.0))
    }

    /// Events triggered so far this run.
    pub fn triggered_count(&self) -> u32 {
        self.triggered
    }

    /// Whether `kind` fired at any point this run.
    pub fn has_fired(&self, kind: EventKind) -> bool {
        self.fired.contains(&kind)
    }

    pub fn summaries(&self) -> Vec<EventSummary> {
        self.active
            .iter()
            .map(|e| EventSummary {
                kind: e.kind,
                label: e.kind.label().to_string(),
                remaining_ticks: e.remaining,
                total_ticks: e.total,
                detail: e.leak_room.map(|room| format!("leaking in {}", room.label())),
            })
            .collect()
    }
}
