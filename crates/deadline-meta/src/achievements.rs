//! Achievement rules.
//!
//! Rules are evaluated as a pure observer of gameplay [`Signal`]s; this
//! module never mutates anything. Granting, rewards and persistence are done
//! by [`crate::MetaProgression::observe`].

use deadline_core::{AchievementNotice, EventKind, LossCause, MetaRecord, MetaStats, Permission};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Achievement {
    FirstStatus,
    FirstScan,
    FirstMove,
    TutorialComplete,
    FirstEscape,
    SpeedEscape,
    PerfectEscape,
    LowO2Escape,
    BecomeEngineer,
    BecomeAdmin,
    DangerEscape1,
    DangerEscape5,
    HideMaster,
    FirstRepair,
    RepairAll,
    SurviveBlackout,
    SurviveO2Leak,
    FirstPurchase,
    DataCollector,
    Runs10,
    Runs50,
    FirstDeath,
    DeathByO2,
    DeathByEnemy,
}

/// Escape within this many seconds for [`Achievement::SpeedEscape`].
pub const SPEED_ESCAPE_SECS: u32 = 300;
/// O2 at or below this on escape for [`Achievement::LowO2Escape`].
pub const LOW_O2_ESCAPE: u8 = 10;
pub const DATA_COLLECTOR_TOTAL: u32 = 500;
const DANGER_ESCAPE_VETERAN: u32 = 5;
const HIDE_MASTER_COUNT: u32 = 10;

impl Achievement {
    pub const ALL: [Achievement; 24] = [
        Achievement::FirstStatus,
        Achievement::FirstScan,
        Achievement::FirstMove,
        Achievement::TutorialComplete,
        Achievement::FirstEscape,
        Achievement::SpeedEscape,
        Achievement::PerfectEscape,
        Achievement::LowO2Escape,
        Achievement::BecomeEngineer,
        Achievement::BecomeAdmin,
        Achievement::DangerEscape1,
        Achievement::DangerEscape5,
        Achievement::HideMaster,
        Achievement::FirstRepair,
        Achievement::RepairAll,
        Achievement::SurviveBlackout,
        Achievement::SurviveO2Leak,
        Achievement::FirstPurchase,
        Achievement::DataCollector,
        Achievement::Runs10,
        Achievement::Runs50,
        Achievement::FirstDeath,
        Achievement::DeathByO2,
        Achievement::DeathByEnemy,
    ];

    /// Stable id stored in the meta record.
    pub fn id(self) -> &'static str {
        match self {
            Achievement::FirstStatus => "first_status",
            Achievement::FirstScan => "first_scan",
            Achievement::FirstMove => "first_move",
            Achievement::TutorialComplete => "tutorial_complete",
            Achievement::FirstEscape => "first_escape",
            Achievement::SpeedEscape => "speed_escape",
            Achievement::PerfectEscape => "perfect_escape",
            Achievement::LowO2Escape => "low_o2_escape",
            Achievement::BecomeEngineer => "become_engineer",
            Achievement::BecomeAdmin => "become_admin",
            Achievement::DangerEscape1 => "danger_escape_1",
            Achievement::DangerEscape5 => "danger_escape_5",
            Achievement::HideMaster => "hide_master",
            Achievement::FirstRepair => "first_repair",
            Achievement::RepairAll => "repair_all",
            Achievement::SurviveBlackout => "survive_blackout",
            Achievement::SurviveO2Leak => "survive_o2leak",
            Achievement::FirstPurchase => "first_purchase",
            Achievement::DataCollector => "data_collector",
            Achievement::Runs10 => "runs_10",
            Achievement::Runs50 => "runs_50",
            Achievement::FirstDeath => "first_death",
            Achievement::DeathByO2 => "death_by_o2",
            Achievement::DeathByEnemy => "death_by_enemy",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.id() == id)
    }

    pub fn name(self) -> &'static str {
        match self {
            Achievement::FirstStatus => "System Check",
            Achievement::FirstScan => "Radar Online",
            Achievement::FirstMove => "First Steps",
            Achievement::TutorialComplete => "Training Complete",
            Achievement::FirstEscape => "Survivor",
            Achievement::SpeedEscape => "Speedrunner",
            Achievement::PerfectEscape => "Flawless Exit",
            Achievement::LowO2Escape => "Holding My Breath",
            Achievement::BecomeEngineer => "Engineer",
            Achievement::BecomeAdmin => "Administrator",
            Achievement::DangerEscape1 => "Close Call",
            Achievement::DangerEscape5 => "Death Dancer",
            Achievement::HideMaster => "Master of Shadows",
            Achievement::FirstRepair => "Handyman",
            Achievement::RepairAll => "Master Mechanic",
            Achievement::SurviveBlackout => "In the Dark",
            Achievement::SurviveO2Leak => "Breath Control",
            Achievement::FirstPurchase => "Retail Therapy",
            Achievement::DataCollector => "Data Hoarder",
            Achievement::Runs10 => "Stubborn",
            Achievement::Runs50 => "Veteran",
            Achievement::FirstDeath => "Learning Experience",
            Achievement::DeathByO2 => "Suffocated",
            Achievement::DeathByEnemy => "Hunted",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Achievement::FirstStatus => "Use status for the first time",
            Achievement::FirstScan => "Use scan for the first time",
            Achievement::FirstMove => "Move to another room for the first time",
            Achievement::TutorialComplete => "Finish the training run",
            Achievement::FirstEscape => "Escape for the first time",
            Achievement::SpeedEscape => "Escape within 5 minutes",
            Achievement::PerfectEscape => "Escape with every objective complete",
            Achievement::LowO2Escape => "Escape with O2 at 10 or less",
            Achievement::BecomeEngineer => "Obtain engineer permission",
            Achievement::BecomeAdmin => "Obtain admin permission",
            Achievement::DangerEscape1 => "Survive with the pursuer at distance 1",
            Achievement::DangerEscape5 => "Survive at distance 1 five times (cumulative)",
            Achievement::HideMaster => "Use hide 10 times (cumulative)",
            Achievement::FirstRepair => "Complete a repair objective",
            Achievement::RepairAll => "Complete every objective in one run",
            Achievement::SurviveBlackout => "Escape after a power outage",
            Achievement::SurviveO2Leak => "Escape after an oxygen leak",
            Achievement::FirstPurchase => "Buy something in the shop",
            Achievement::DataCollector => "Earn 500 DATA in total",
            Achievement::Runs10 => "Play 10 runs",
            Achievement::Runs50 => "Play 50 runs",
            Achievement::FirstDeath => "Die for the first time",
            Achievement::DeathByO2 => "Run out of oxygen",
            Achievement::DeathByEnemy => "Get caught by the pursuer",
        }
    }

    /// DATA granted on unlock.
    pub fn reward(self) -> u32 {
        match self {
            Achievement::FirstStatus
            | Achievement::FirstScan
            | Achievement::FirstMove
            | Achievement::FirstDeath
            | Achievement::DeathByO2
            | Achievement::DeathByEnemy => 5,
            Achievement::BecomeEngineer | Achievement::FirstPurchase => 10,
            Achievement::DangerEscape1 | Achievement::FirstRepair => 15,
            Achievement::TutorialComplete
            | Achievement::SurviveBlackout
            | Achievement::SurviveO2Leak => 20,
            Achievement::BecomeAdmin | Achievement::HideMaster | Achievement::Runs10 => 30,
            Achievement::RepairAll => 40,
            Achievement::FirstEscape | Achievement::DangerEscape5 => 50,
            Achievement::LowO2Escape => 60,
            Achievement::PerfectEscape => 80,
            Achievement::SpeedEscape | Achievement::DataCollector | Achievement::Runs50 => 100,
        }
    }

    /// Hidden achievements are masked in listings until unlocked.
    pub fn hidden(self) -> bool {
        matches!(
            self,
            Achievement::DangerEscape5
                | Achievement::HideMaster
                | Achievement::SurviveBlackout
                | Achievement::SurviveO2Leak
                | Achievement::Runs50
                | Achievement::DeathByO2
                | Achievement::DeathByEnemy
        )
    }

    pub fn notice(self) -> AchievementNotice {
        AchievementNotice {
            name: self.name().to_string(),
            description: self.description().to_string(),
            reward: self.reward(),
        }
    }
}

/// Something that happened during play that achievements may react to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    StatusChecked,
    Scanned,
    Moved,
    Hid,
    PermissionRaised(Permission),
    Repaired { completed: usize, total: usize },
    EventFired(EventKind),
    DangerEscape,
    Purchased,
    TutorialCompleted,
    Escaped {
        elapsed_seconds: u32,
        objectives_completed: usize,
        objectives_total: usize,
        o2: u8,
    },
    Died(LossCause),
    RunSettled,
}

/// Per-run facts that escape rules look back on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunFlags {
    pub had_outage: bool,
    pub had_leak: bool,
}

impl RunFlags {
    pub fn note(&mut self, signal: &Signal) {
        match signal {
            Signal::EventFired(EventKind::PowerOutage) => self.had_outage = true,
            Signal::EventFired(EventKind::GasLeak) => self.had_leak = true,
            _ => {}
        }
    }
}

/// Rules satisfied by `signal`. `stats` must already count the signal.
pub fn triggered(signal: &Signal, stats: &MetaStats, run: &RunFlags) -> Vec<Achievement> {
    let mut out = Vec::new();
    match *signal {
        Signal::StatusChecked => out.push(Achievement::FirstStatus),
        Signal::Scanned => out.push(Achievement::FirstScan),
        Signal::Moved => out.push(Achievement::FirstMove),
        Signal::Hid => {
            if stats.hides >= HIDE_MASTER_COUNT {
                out.push(Achievement::HideMaster);
            }
        }
        Signal::PermissionRaised(Permission::Engineer) => out.push(Achievement::BecomeEngineer),
        Signal::PermissionRaised(Permission::Admin) => out.push(Achievement::BecomeAdmin),
        Signal::PermissionRaised(Permission::Guest) => {}
        Signal::Repaired { completed, total } => {
            out.push(Achievement::FirstRepair);
            if completed >= total {
                out.push(Achievement::RepairAll);
            }
        }
        Signal::EventFired(_) => {}
        Signal::DangerEscape => {
            out.push(Achievement::DangerEscape1);
            if stats.danger_escapes >= DANGER_ESCAPE_VETERAN {
                out.push(Achievement::DangerEscape5);
            }
        }
        Signal::Purchased => out.push(Achievement::FirstPurchase),
        Signal::TutorialCompleted => out.push(Achievement::TutorialComplete),
        Signal::Escaped {
            elapsed_seconds,
            objectives_completed,
            objectives_total,
            o2,
        } => {
            out.push(Achievement::FirstEscape);
            if elapsed_seconds <= SPEED_ESCAPE_SECS {
                out.push(Achievement::SpeedEscape);
            }
            if objectives_completed >= objectives_total {
                out.push(Achievement::PerfectEscape);
            }
            if o2 <= LOW_O2_ESCAPE {
                out.push(Achievement::LowO2Escape);
            }
            if run.had_outage {
                out.push(Achievement::SurviveBlackout);
            }
            if run.had_leak {
                out.push(Achievement::SurviveO2Leak);
            }
        }
        Signal::Died(cause) => {
            out.push(Achievement::FirstDeath);
            match cause {
                LossCause::Oxygen => out.push(Achievement::DeathByO2),
                LossCause::Caught => out.push(Achievement::DeathByEnemy),
                LossCause::Health => {}
            }
        }
        Signal::RunSettled => {}
    }
    out
}

/// Threshold rules on cumulative totals, checked after every signal.
pub fn standing(record: &MetaRecord) -> Vec<Achievement> {
    let stats = &record.stats;
    let mut out = Vec::new();
    if stats.total_runs >= 10 {
        out.push(Achievement::Runs10);
    }
    if stats.total_runs >= 50 {
        out.push(Achievement::Runs50);
    }
    if stats.total_currency_earned >= DATA_COLLECTOR_TOTAL {
        out.push(Achievement::DataCollector);
    }
    out
}

/// `achievements` listing: unlocked ones, visible locked ones, and a count
/// of hidden ones still locked.
pub fn render(record: &MetaRecord) -> Vec<String> {
    let unlocked = |a: &Achievement| record.achievements.contains(a.id());
    let done: Vec<_> = Achievement::ALL.into_iter().filter(unlocked).collect();
    let open: Vec<_> = Achievement::ALL
        .into_iter()
        .filter(|a| !unlocked(a) && !a.hidden())
        .collect();
    let hidden = Achievement::ALL
        .into_iter()
        .filter(|a| !unlocked(a) && a.hidden())
        .count();

    let mut lines = vec![
        "=== ACHIEVEMENTS ===".to_string(),
        format!("Unlocked: {}/{}", done.len(), Achievement::ALL.len()),
    ];
    if !done.is_empty() {
        lines.push("[unlocked]".to_string());
        lines.extend(
            done.iter()
                .map(|a| format!("  * {} - {}", a.name(), a.description())),
        );
    }
    if !open.is_empty() {
        lines.push("[locked]".to_string());
        lines.extend(open.iter().map(|a| {
            format!("  o {} - {} (+{} DATA)", a.name(), a.description(), a.reward())
        }));
    }
    if hidden > 0 {
        lines.push(format!("[hidden: {hidden}]"));
    }
    lines
}
