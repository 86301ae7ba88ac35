//! Feedback stream and the output port hosts implement.

use crate::{EventKind, LossCause, Permission, RoomId, State};
use serde::{Deserialize, Serialize};

/// How a feedback line should be rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// One line of terminal output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub text: String,
    pub severity: Severity,
}

impl Feedback {
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            severity,
        }
    }
}

/// Status-panel view of an active hazard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    pub kind: EventKind,
    pub label: String,
    pub remaining_ticks: u32,
    pub total_ticks: u32,
    pub detail: Option<String>,
}

/// Display-relevant fields of [`State`] after a mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HudSnapshot {
    pub hp: u8,
    pub o2: u8,
    pub power: u8,
    pub noise: u8,
    pub location: RoomId,
    pub permission: Permission,
    pub elapsed_seconds: u32,
    pub threat_distance: u8,
    pub door_locked: bool,
    pub paused: bool,
    pub events: Vec<EventSummary>,
}

impl HudSnapshot {
    pub fn capture(state: &State, events: Vec<EventSummary>) -> Self {
        Self {
            hp: state.resources.hp.get(),
            o2: state.resources.o2.get(),
            power: state.resources.power.get(),
            noise: state.resources.noise.get(),
            location: state.location,
            permission: state.permission(),
            elapsed_seconds: state.time,
            threat_distance: state.threat.get(),
            door_locked: state.door_locked,
            paused: state.paused,
            events,
        }
    }
}

/// Currency awarded at the end of a run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReward {
    pub amount: u32,
    pub breakdown: Vec<String>,
}

/// How a run ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalEvent {
    Victory {
        elapsed_seconds: u32,
        objectives_completed: usize,
        reward: RunReward,
    },
    Loss {
        cause: LossCause,
        elapsed_seconds: u32,
        reward: RunReward,
    },
}

/// Toast payload for a freshly unlocked achievement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementNotice {
    pub name: String,
    pub description: String,
    pub reward: u32,
}

/// Output port for the command and tick layers.
///
/// Only [`OutputSink::emit`] is required; the other hooks default to no-ops
/// so a plain line printer is a valid sink.
pub trait OutputSink {
    fn emit(&mut self, feedback: Feedback);

    fn snapshot(&mut self, _hud: &HudSnapshot) {}

    fn terminal(&mut self, _event: &TerminalEvent) {}

    fn achievement(&mut self, _notice: &AchievementNotice) {}

    /// Visual/audio failure cue (screen shake, glitch).
    fn error_cue(&mut self) {}

    fn info(&mut self, text: &str) {
        self.emit(Feedback::new(Severity::Info, text));
    }

    fn success(&mut self, text: &str) {
        self.emit(Feedback::new(Severity::Success, text));
    }

    fn warning(&mut self, text: &str) {
        self.emit(Feedback::new(Severity::Warning, text));
    }

    fn error(&mut self, text: &str) {
        self.emit(Feedback::new(Severity::Error, text));
    }
}

/// Buffering sink that records everything it receives.
#[derive(Clone, Debug, Default)]
pub struct Transcript {
    pub lines: Vec<Feedback>,
    pub last_hud: Option<HudSnapshot>,
    pub snapshots: usize,
    pub terminals: Vec<TerminalEvent>,
    pub achievements: Vec<AchievementNotice>,
    pub error_cues: usize,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when any recorded line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.text.contains(needle))
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.lines.iter().filter(|l| l.severity == severity).count()
    }

    /// Takes the buffered lines, leaving the other counters intact.
    pub fn drain_lines(&mut self) -> Vec<Feedback> {
        std::mem::take(&mut self.lines)
    }
}

impl OutputSink for Transcript {
    fn emit(&mut self, feedback: Feedback) {
        self.lines.push(feedback);
    }

    fn snapshot(&mut self, hud: &HudSnapshot) {
        self.snapshots += 1;
        self.last_hud = Some(hud.clone());
    }

    fn terminal(&mut self, event: &TerminalEvent) {
        self.terminals.push(event.clone());
    }

    fn achievement(&mut self, notice: &AchievementNotice) {
        self.achievements.push(notice.clone());
    }

    fn error_cue(&mut self) {
        self.error_cues += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StartTuning;

    #[test]
    fn transcript_collects_lines_and_hooks() {
        let mut t = Transcript::new();
        t.info("scanning");
        t.error("denied");
        t.error_cue();
        let state = State::new(&StartTuning::default(), false);
        t.snapshot(&HudSnapshot::capture(&state, vec![]));
        assert!(t.contains("scan"));
        assert_eq!(t.count(Severity::Error), 1);
        assert_eq!(t.error_cues, 1);
        assert_eq!(t.snapshots, 1);
        assert_eq!(t.last_hud.as_ref().map(|h| h.power), Some(50));
        assert_eq!(t.drain_lines().len(), 2);
        assert!(t.lines.is_empty());
    }
}
