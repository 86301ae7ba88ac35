#![deny(warnings)]

//! Meta-progression: DATA currency, permanent unlocks and cumulative stats
//! that outlive a single run.
//!
//! Provides:
//! - start-of-run grants derived from owned unlocks
//! - run-end reward computation and stat bookkeeping
//! - the unlock shop
//! - achievement evaluation (see [`achievements`])
//!
//! Storage goes through the [`MetaStore`] port. Storage failures are logged
//! and otherwise ignored; gameplay never waits on or fails because of them.

pub mod achievements;

pub use achievements::{Achievement, RunFlags, Signal};

use deadline_core::{
    AchievementNotice, MetaRecord, Permission, RewardTuning, RunReward, State, UnlockId,
};
use persistence::{MemoryStore, MetaStore};
use thiserror::Error;
use tracing::{info, warn};

/// A permanent unlock as offered in the shop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShopItem {
    pub id: UnlockId,
    pub name: &'static str,
    pub description: &'static str,
    pub cost: u32,
}

/// Shop listing, in `buy <n>` order (1-based).
pub const CATALOG: [ShopItem; 6] = [
    ShopItem {
        id: UnlockId::EngineerStart,
        name: "Engineer Start",
        description: "Start every run with engineer permission",
        cost: 80,
    },
    ShopItem {
        id: UnlockId::TempSuToken,
        name: "Temporary SU Token",
        description: "Start with a one-use token that makes su succeed instantly",
        cost: 40,
    },
    ShopItem {
        id: UnlockId::EngineerKeycard,
        name: "Engineer Keycard",
        description: "Start with a card that opens one locked room",
        cost: 30,
    },
    ShopItem {
        id: UnlockId::EmergencyO2,
        name: "Emergency O2 Canister",
        description: "Start with a canister: use o2 for +30 O2",
        cost: 25,
    },
    ShopItem {
        id: UnlockId::EarlyDrainRelief,
        name: "Early Drain Relief",
        description: "No O2 drain for the first 30 seconds",
        cost: 50,
    },
    ShopItem {
        id: UnlockId::ShortcutChance,
        name: "Shortcut Chance",
        description: "+20% chance of a direct hub-airlock route",
        cost: 60,
    },
];

pub fn shop_item(id: UnlockId) -> Option<&'static ShopItem> {
    CATALOG.iter().find(|item| item.id == id)
}

/// Why a purchase was refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PurchaseError {
    #[error("invalid item number: {0}")]
    InvalidIndex(usize),
    #[error("{0} is already unlocked")]
    AlreadyOwned(&'static str),
    #[error("not enough DATA (need {cost}, have {balance})")]
    InsufficientCurrency { cost: u32, balance: u32 },
}

/// How a run ended, as far as rewards care.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunOutcome {
    pub escaped: bool,
    pub elapsed_seconds: u32,
}

/// Per-run counts that earn DATA.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunTally {
    pub objectives_completed: usize,
    pub danger_escapes: u32,
}

/// Pure reward formula. A loss keeps the total minus half of it, rounded
/// down, so the escaped amount is always strictly larger for the same tally.
pub fn reward_for(tuning: &RewardTuning, outcome: RunOutcome, tally: RunTally) -> RunReward {
    let mut amount = 0u32;
    let mut breakdown = Vec::new();

    let objectives = u32::try_from(tally.objectives_completed).unwrap_or(u32::MAX);
    let from_objectives = objectives.saturating_mul(tuning.per_objective);
    if from_objectives > 0 {
        amount = amount.saturating_add(from_objectives);
        breakdown.push(format!(
            "Objectives completed ({objectives}): +{from_objectives}"
        ));
    }
    if outcome.escaped {
        amount = amount.saturating_add(tuning.escape_bonus);
        breakdown.push(format!("Escaped: +{}", tuning.escape_bonus));
    }
    let dangers = tally.danger_escapes.min(tuning.danger_escape_cap);
    let from_danger = dangers.saturating_mul(tuning.per_danger_escape);
    if from_danger > 0 {
        amount = amount.saturating_add(from_danger);
        breakdown.push(format!("Close calls ({dangers}): +{from_danger}"));
    }
    if !outcome.escaped {
        let penalty = amount / 2;
        amount -= penalty;
        if penalty > 0 {
            breakdown.push(format!("Death penalty (-50%): -{penalty}"));
        }
    }
    RunReward { amount, breakdown }
}

/// Cross-run progression bound to a storage backend.
pub struct MetaProgression {
    record: MetaRecord,
    store: Box<dyn MetaStore>,
    run: RunFlags,
}

impl MetaProgression {
    /// Loads the record from `store`. A missing or unreadable save starts
    /// from the default record.
    pub fn load(store: Box<dyn MetaStore>) -> Self {
        let record = match store.load() {
            Ok(Some(record)) => record,
            Ok(None) => MetaRecord::default(),
            Err(e) => {
                warn!(error = %format!("{e:#}"), "meta load failed; starting fresh");
                MetaRecord::default()
            }
        };
        Self {
            record,
            store,
            run: RunFlags::default(),
        }
    }

    /// Progression backed by a throwaway in-memory store.
    pub fn in_memory(record: MetaRecord) -> Self {
        Self::load(Box::new(MemoryStore::with_record(record)))
    }

    pub fn record(&self) -> &MetaRecord {
        &self.record
    }

    pub fn currency(&self) -> u32 {
        self.record.currency
    }

    pub fn owns(&self, id: UnlockId) -> bool {
        self.record.unlocks.contains(&id)
    }

    pub fn tutorial_completed(&self) -> bool {
        self.record.tutorial_completed
    }

    /// Whether the graph generator should add the shortcut boost.
    pub fn shortcut_unlocked(&self) -> bool {
        self.owns(UnlockId::ShortcutChance)
    }

    fn persist(&mut self) {
        if let Err(e) = self.store.save(&self.record) {
            warn!(error = %format!("{e:#}"), "meta save failed; progress kept in memory");
        }
    }

    /// Resets per-run observer flags. Call once per new run.
    pub fn begin_run(&mut self) {
        self.run = RunFlags::default();
    }

    /// Applies owned unlocks to a fresh state and returns a description of
    /// each grant.
    pub fn apply_start_grants(&self, state: &mut State) -> Vec<String> {
        let mut applied = Vec::new();
        for id in &self.record.unlocks {
            let line = match id {
                UnlockId::EngineerStart => {
                    state.elevate(Permission::Engineer);
                    "Starting with engineer permission"
                }
                UnlockId::TempSuToken => {
                    state.grants.elevation_token = true;
                    "Holding a temporary SU token"
                }
                UnlockId::EngineerKeycard => {
                    state.grants.access_card = true;
                    "Holding an engineer keycard"
                }
                UnlockId::EmergencyO2 => {
                    state.grants.emergency_o2 = true;
                    "Holding an emergency O2 canister"
                }
                UnlockId::EarlyDrainRelief => {
                    state.grants.early_drain_relief = true;
                    "No O2 drain for the first 30 seconds"
                }
                UnlockId::ShortcutChance => "Shortcut chance boosted",
            };
            applied.push(line.to_string());
        }
        applied
    }

    /// Computes the run reward, folds it into stats and currency, and saves.
    pub fn compute_run_reward(
        &mut self,
        tuning: &RewardTuning,
        outcome: RunOutcome,
        tally: RunTally,
    ) -> RunReward {
        let mut reward = reward_for(tuning, outcome, tally);
        let stats = &mut self.record.stats;
        stats.total_runs += 1;
        if outcome.escaped {
            stats.total_escapes += 1;
            let faster = stats
                .fastest_escape_seconds
                .map_or(true, |best| outcome.elapsed_seconds < best);
            if faster {
                stats.fastest_escape_seconds = Some(outcome.elapsed_seconds);
                reward.breakdown.push("New fastest escape!".to_string());
            }
        } else {
            stats.total_deaths += 1;
        }
        stats.total_currency_earned = stats.total_currency_earned.saturating_add(reward.amount);
        self.record.currency = self.record.currency.saturating_add(reward.amount);
        info!(
            escaped = outcome.escaped,
            elapsed = outcome.elapsed_seconds,
            amount = reward.amount,
            balance = self.record.currency,
            "run reward applied"
        );
        self.persist();
        reward
    }

    /// Buys catalog item `index` (1-based).
    pub fn purchase(&mut self, index: usize) -> Result<&'static ShopItem, PurchaseError> {
        let item = index
            .checked_sub(1)
            .and_then(|i| CATALOG.get(i))
            .ok_or(PurchaseError::InvalidIndex(index))?;
        if self.owns(item.id) {
            return Err(PurchaseError::AlreadyOwned(item.name));
        }
        if self.record.currency < item.cost {
            return Err(PurchaseError::InsufficientCurrency {
                cost: item.cost,
                balance: self.record.currency,
            });
        }
        self.record.currency -= item.cost;
        self.record.unlocks.insert(item.id);
        info!(item = ?item.id, cost = item.cost, balance = self.record.currency, "unlock purchased");
        self.persist();
        Ok(item)
    }

    pub fn mark_tutorial_completed(&mut self) {
        if !self.record.tutorial_completed {
            self.record.tutorial_completed = true;
            self.persist();
        }
    }

    /// Feeds one gameplay signal to the achievement rules. Newly unlocked
    /// achievements pay out immediately and are returned for display.
    pub fn observe(&mut self, signal: Signal) -> Vec<AchievementNotice> {
        self.run.note(&signal);
        let mut dirty = false;
        match signal {
            Signal::Hid => {
                self.record.stats.hides += 1;
                dirty = true;
            }
            Signal::DangerEscape => {
                self.record.stats.danger_escapes += 1;
                dirty = true;
            }
            _ => {}
        }

        let mut notices = Vec::new();
        let mut candidates = achievements::triggered(&signal, &self.record.stats, &self.run);
        // Rewards can push cumulative totals over a threshold, so re-check
        // until nothing new unlocks.
        loop {
            candidates.extend(achievements::standing(&self.record));
            let mut unlocked_any = false;
            for a in candidates.drain(..) {
                if self.record.achievements.insert(a.id().to_string()) {
                    let reward = a.reward();
                    self.record.currency = self.record.currency.saturating_add(reward);
                    self.record.stats.total_currency_earned =
                        self.record.stats.total_currency_earned.saturating_add(reward);
                    info!(achievement = a.id(), reward, "achievement unlocked");
                    notices.push(a.notice());
                    unlocked_any = true;
                }
            }
            if !unlocked_any {
                break;
            }
            dirty = true;
        }
        if dirty {
            self.persist();
        }
        notices
    }

    pub fn shop_lines(&self) -> Vec<String> {
        let mut lines = vec![
            "=== SHOP ===".to_string(),
            format!("DATA: {}", self.record.currency),
        ];
        for (i, item) in CATALOG.iter().enumerate() {
            let status = if self.owns(item.id) {
                "[OWNED]".to_string()
            } else {
                format!("[{} DATA]", item.cost)
            };
            lines.push(format!("{}. {} {status}", i + 1, item.name));
            lines.push(format!("   {}", item.description));
        }
        lines.push("buy <number> to purchase".to_string());
        lines
    }

    pub fn stats_lines(&self) -> Vec<String> {
        let s = &self.record.stats;
        let mut lines = vec![
            "=== STATS ===".to_string(),
            format!("DATA: {}", self.record.currency),
            format!("Total DATA earned: {}", s.total_currency_earned),
            format!("Runs: {}", s.total_runs),
            format!("Escapes: {}", s.total_escapes),
            format!("Deaths: {}", s.total_deaths),
            format!("Close calls: {}", s.danger_escapes),
        ];
        if let Some(best) = s.fastest_escape_seconds {
            lines.push(format!("Fastest escape: {}m {}s", best / 60, best % 60));
        }
        lines
    }

    pub fn achievement_lines(&self) -> Vec<String> {
        achievements::render(&self.record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deadline_core::{LossCause, StartTuning};
    use proptest::prelude::*;

    fn rewards() -> RewardTuning {
        RewardTuning::default()
    }

    #[test]
    fn escape_reward_breakdown() {
        let r = reward_for(
            &rewards(),
            RunOutcome {
                escaped: true,
                elapsed_seconds: 200,
            },
            RunTally {
                objectives_completed: 2,
                danger_escapes: 5,
            },
        );
        // 2*15 + 30 + min(5,3)*5
        assert_eq!(r.amount, 75);
        assert_eq!(r.breakdown.len(), 3);
    }

    #[test]
    fn loss_keeps_the_larger_half() {
        let r = reward_for(
            &rewards(),
            RunOutcome {
                escaped: false,
                elapsed_seconds: 50,
            },
            RunTally {
                objectives_completed: 1,
                danger_escapes: 0,
            },
        );
        assert_eq!(r.amount, 8);
        assert!(r.breakdown.iter().any(|l| l.contains("-7")));
    }

    #[test]
    fn run_reward_updates_stats_and_persists() {
        let handle = MemoryStore::new();
        let mut meta = MetaProgression::load(Box::new(handle.clone()));
        let escaped = RunOutcome {
            escaped: true,
            elapsed_seconds: 240,
        };
        let tally = RunTally {
            objectives_completed: 2,
            danger_escapes: 0,
        };
        meta.compute_run_reward(&rewards(), escaped, tally);
        let slower = meta.compute_run_reward(
            &rewards(),
            RunOutcome {
                elapsed_seconds: 400,
                ..escaped
            },
            tally,
        );
        assert!(!slower.breakdown.iter().any(|l| l.contains("fastest")));
        meta.compute_run_reward(
            &rewards(),
            RunOutcome {
                escaped: false,
                elapsed_seconds: 10,
            },
            RunTally::default(),
        );

        let saved = handle.snapshot().unwrap();
        assert_eq!(saved.stats.total_runs, 3);
        assert_eq!(saved.stats.total_escapes, 2);
        assert_eq!(saved.stats.total_deaths, 1);
        assert_eq!(saved.stats.fastest_escape_seconds, Some(240));
        assert_eq!(saved.currency, 120);
        assert_eq!(saved.stats.total_currency_earned, 120);
    }

    #[test]
    fn purchase_checks_index_ownership_and_balance() {
        let mut meta = MetaProgression::in_memory(MetaRecord {
            currency: 50,
            ..MetaRecord::default()
        });
        assert_eq!(meta.purchase(0), Err(PurchaseError::InvalidIndex(0)));
        assert_eq!(meta.purchase(7), Err(PurchaseError::InvalidIndex(7)));
        assert_eq!(
            meta.purchase(1),
            Err(PurchaseError::InsufficientCurrency {
                cost: 80,
                balance: 50
            })
        );
        let item = meta.purchase(2).unwrap();
        assert_eq!(item.id, UnlockId::TempSuToken);
        assert_eq!(meta.currency(), 10);
        assert_eq!(
            meta.purchase(2),
            Err(PurchaseError::AlreadyOwned("Temporary SU Token"))
        );
        assert!(meta.shop_lines().iter().any(|l| l.contains("[OWNED]")));
    }

    #[test]
    fn start_grants_follow_unlocks() {
        let mut record = MetaRecord::default();
        record.unlocks.extend([
            UnlockId::EngineerStart,
            UnlockId::EmergencyO2,
            UnlockId::ShortcutChance,
        ]);
        let meta = MetaProgression::in_memory(record);
        let mut state = State::new(&StartTuning::default(), false);
        let lines = meta.apply_start_grants(&mut state);
        assert_eq!(lines.len(), 3);
        assert_eq!(state.permission(), Permission::Engineer);
        assert!(state.grants.emergency_o2);
        assert!(!state.grants.access_card);
        assert!(meta.shortcut_unlocked());
    }

    #[test]
    fn load_failure_degrades_to_default() {
        struct Broken;
        impl MetaStore for Broken {
            fn load(&self) -> persistence::Result<Option<MetaRecord>> {
                Err(persistence::Error::msg("disk on fire"))
            }
            fn save(&mut self, _: &MetaRecord) -> persistence::Result<()> {
                Err(persistence::Error::msg("read-only"))
            }
            fn clear(&mut self) -> persistence::Result<()> {
                Ok(())
            }
        }
        let mut meta = MetaProgression::load(Box::new(Broken));
        assert_eq!(meta.record(), &MetaRecord::default());
        meta.compute_run_reward(
            &rewards(),
            RunOutcome {
                escaped: true,
                elapsed_seconds: 1,
            },
            RunTally::default(),
        );
        assert_eq!(meta.currency(), 30);
    }

    #[test]
    fn achievements_unlock_once_and_pay_out() {
        let mut meta = MetaProgression::in_memory(MetaRecord::default());
        let first = meta.observe(Signal::Scanned);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].name, "Radar Online");
        assert_eq!(meta.currency(), 5);
        assert!(meta.observe(Signal::Scanned).is_empty());
        assert_eq!(meta.currency(), 5);

        let died = meta.observe(Signal::Died(LossCause::Caught));
        let names: Vec<_> = died.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["Learning Experience", "Hunted"]);
    }

    #[test]
    fn survive_flags_reset_per_run() {
        let mut meta = MetaProgression::in_memory(MetaRecord::default());
        let escape = Signal::Escaped {
            elapsed_seconds: 999,
            objectives_completed: 2,
            objectives_total: 3,
            o2: 50,
        };
        meta.observe(Signal::EventFired(deadline_core::EventKind::PowerOutage));
        meta.begin_run();
        let notices = meta.observe(escape);
        assert!(!notices.iter().any(|n| n.name == "In the Dark"));
    }

    #[test]
    fn achievement_rewards_can_cross_the_earned_threshold() {
        let mut record = MetaRecord::default();
        record.stats.total_currency_earned = 495;
        let mut meta = MetaProgression::in_memory(record);
        let notices = meta.observe(Signal::StatusChecked);
        let names: Vec<_> = notices.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["System Check", "Data Hoarder"]);
        assert_eq!(meta.currency(), 105);
    }

    proptest! {
        #[test]
        fn escaping_always_pays_more(objectives in 0usize..4, dangers in 0u32..10, t in 0u32..2000) {
            prop_assume!(objectives > 0 || dangers > 0);
            let tally = RunTally { objectives_completed: objectives, danger_escapes: dangers };
            let win = reward_for(&rewards(), RunOutcome { escaped: true, elapsed_seconds: t }, tally);
            let loss = reward_for(&rewards(), RunOutcome { escaped: false, elapsed_seconds: t }, tally);
            prop_assert!(loss.amount < win.amount);
            prop_assert!(loss.amount * 2 >= win.amount - RewardTuning::default().escape_bonus);
        }
    }
}
