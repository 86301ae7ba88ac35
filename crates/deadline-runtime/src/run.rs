//! A single run: the tick loop and the command resolver over one `State`.

use crate::challenge::{Challenge, ChallengePurpose, PhrasePool, Submission};
use crate::command::{Command, Item, Pace};
use crate::error::{ChallengeFailure, CommandError, PreconditionError};
use crate::render;
use deadline_core::{
    validate_tuning, ConfigError, Feedback, HudSnapshot, LogicalClock, LossCause, OutputSink,
    Permission, RoomId, Severity, State, TerminalEvent, ThreatTier, Tuning,
};
use deadline_events::EventScheduler;
use deadline_meta::{MetaProgression, RunOutcome, RunTally, Signal};
use deadline_world::{MoveCheck, ObjectiveId, ObjectiveTracker, RoomGraph, UNLOCK_PERMISSION};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Per-run input.
#[derive(Clone, Debug, PartialEq)]
pub struct RunConfig {
    /// Seeds every random roll of the run.
    pub seed: u64,
    /// Tutorial run: no locks, no shortcut, no events, relaxed escape gate.
    pub training: bool,
    pub tuning: Tuning,
}

impl RunConfig {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            training: false,
            tuning: Tuning::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_tuning(&self.tuning)
    }
}

/// Successful resolution of a submitted line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Moved {
        to: RoomId,
        /// Incomplete objective available in the destination.
        objective: Option<ObjectiveId>,
        /// The destination is the active gas-leak room.
        leak: bool,
    },
    ChallengeStarted {
        phrase: &'static str,
    },
    ChallengeSolved(ChallengePurpose),
    Victory,
}

pub type CommandResult = Result<Outcome, CommandError>;

pub struct Run {
    tuning: Tuning,
    pub(crate) state: State,
    pub(crate) graph: RoomGraph,
    pub(crate) objectives: ObjectiveTracker,
    pub(crate) events: EventScheduler,
    pub(crate) challenge: Challenge,
    meta: MetaProgression,
    rng: ChaCha8Rng,
    clock: LogicalClock,
    next_tick: Duration,
    danger_escapes: u32,
    ending: Option<TerminalEvent>,
}

impl Run {
    /// Builds a fresh run: new state, start grants, generated graph. The
    /// tuning is validated first; a rejected table starts nothing.
    pub fn start(
        config: RunConfig,
        mut meta: MetaProgression,
        out: &mut dyn OutputSink,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let RunConfig {
            seed,
            training,
            tuning,
        } = config;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        meta.begin_run();

        let mut state = State::new(&tuning.start, training);
        let grants = meta.apply_start_grants(&mut state);
        let (graph, events, required) = if training {
            (
                RoomGraph::base(),
                EventScheduler::disabled(),
                tuning.objectives.training_required,
            )
        } else {
            (
                RoomGraph::generate(&mut rng, &tuning.graph, meta.shortcut_unlocked()),
                EventScheduler::new(),
                tuning.objectives.required,
            )
        };
        info!(
            seed,
            training,
            grants = grants.len(),
            locked = ?graph.locked_rooms().collect::<Vec<_>>(),
            shortcut = graph.has_shortcut(),
            "run started"
        );

        let next_tick = Duration::from_millis(tuning.tick_ms);
        let run = Self {
            tuning,
            state,
            graph,
            objectives: ObjectiveTracker::new(required),
            events,
            challenge: Challenge::new(),
            meta,
            rng,
            clock: LogicalClock::default(),
            next_tick,
            danger_escapes: 0,
            ending: None,
        };

        out.warning("=== DEADLINE SHELL ===");
        if training {
            out.info("Training run: no locked rooms, no hazards, escape whenever you reach the airlock.");
        }
        out.info("Something is hunting you. Repair systems and reach the airlock. Type help.");
        for line in grants {
            out.success(&format!("[unlock] {line}"));
        }
        let locked: Vec<_> = run.graph.locked_rooms().map(|r| r.as_str()).collect();
        if !locked.is_empty() {
            out.warning(&format!("Locked rooms: {}", locked.join(", ")));
        }
        if run.graph.has_shortcut() {
            out.success("A direct route links the hub and the airlock this time.");
        }
        run.snapshot(out);
        Ok(run)
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn graph(&self) -> &RoomGraph {
        &self.graph
    }

    pub fn objectives(&self) -> &ObjectiveTracker {
        &self.objectives
    }

    pub fn events(&self) -> &EventScheduler {
        &self.events
    }

    pub fn challenge(&self) -> &Challenge {
        &self.challenge
    }

    pub fn meta(&self) -> &MetaProgression {
        &self.meta
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    /// Hands the progression back for the next run.
    pub fn into_meta(self) -> MetaProgression {
        self.meta
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    pub fn danger_escapes(&self) -> u32 {
        self.danger_escapes
    }

    /// The terminal event, once the run has ended.
    pub fn ending(&self) -> Option<&TerminalEvent> {
        self.ending.as_ref()
    }

    pub fn is_over(&self) -> bool {
        !self.state.running
    }

    /// Suspends the clock. Returns false if already paused.
    pub fn pause(&mut self, out: &mut dyn OutputSink) -> bool {
        if self.state.paused || self.is_over() {
            return false;
        }
        self.state.paused = true;
        debug!(time = self.state.time, "paused");
        self.snapshot(out);
        true
    }

    /// Restarts the clock. Returns false if not paused.
    pub fn resume(&mut self, out: &mut dyn OutputSink) -> bool {
        if !self.state.paused {
            return false;
        }
        self.state.paused = false;
        debug!(time = self.state.time, "resumed");
        self.snapshot(out);
        true
    }

    fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tuning.tick_ms)
    }

    /// Moves the logical clock forward by `dt`, firing every tick and
    /// challenge deadline that falls inside the window in time order. Does
    /// nothing while paused or after the run has ended.
    pub fn advance(&mut self, dt: Duration, out: &mut dyn OutputSink) {
        if self.state.paused || self.is_over() {
            return;
        }
        let target = self.clock.now().saturating_add(dt);
        loop {
            let deadline = self
                .challenge
                .deadline()
                .filter(|&d| d <= self.next_tick);
            let due = deadline.unwrap_or(self.next_tick);
            if due > target {
                break;
            }
            self.clock.advance_to(due);
            if deadline.is_some() {
                self.expire_challenge(out);
            } else {
                self.tick(out);
                self.next_tick = self.next_tick.saturating_add(self.tick_interval());
            }
            if self.is_over() {
                return;
            }
        }
        self.clock.advance_to(target);
    }

    /// Advances exactly to the next tick boundary.
    pub fn step(&mut self, out: &mut dyn OutputSink) {
        let dt = self.next_tick.saturating_sub(self.clock.now());
        self.advance(dt, out);
    }

    fn tick(&mut self, out: &mut dyn OutputSink) {
        let t = &self.tuning;
        let s = &mut self.state;

        let relief = s.grants.early_drain_relief && s.time < t.oxygen.relief_window_secs;
        if !relief {
            s.resources.o2.add(-i64::from(t.oxygen.drain_per_tick));
        }
        s.resources.noise.add(-1);
        s.time += 1;
        if s.time % t.noise.chase_every_ticks == 0 && s.resources.noise.get() > t.noise.chase_threshold
        {
            s.threat.add(-1);
        }
        let near_miss =
            s.threat.get() == 1 && self.danger_escapes < t.rewards.danger_escape_cap;

        let fired = self.events.tick(s, &t.events, &mut self.rng, out);

        if near_miss {
            self.danger_escapes += 1;
            out.warning("[!] It brushed right past you...");
            self.notify(Signal::DangerEscape, out);
        }
        if let Some(kind) = fired {
            self.notify(Signal::EventFired(kind), out);
        }
        self.snapshot(out);
        self.check_terminal(out);
    }

    fn check_terminal(&mut self, out: &mut dyn OutputSink) {
        if self.is_over() {
            return;
        }
        if let Some(cause) = self.state.loss_cause() {
            self.finish(Err(cause), out);
        }
    }

    /// Ends the run, applies the reward once and reports the terminal event.
    fn finish(&mut self, result: Result<(), LossCause>, out: &mut dyn OutputSink) {
        self.state.running = false;
        if let Some(purpose) = self.challenge.abandon() {
            debug!(?purpose, "challenge abandoned at run end");
        }
        let escaped = result.is_ok();
        let elapsed_seconds = self.state.time;
        let objectives_completed = self.objectives.completed_count();
        let reward = self.meta.compute_run_reward(
            &self.tuning.rewards,
            RunOutcome {
                escaped,
                elapsed_seconds,
            },
            RunTally {
                objectives_completed,
                danger_escapes: self.danger_escapes,
            },
        );

        let event = match result {
            Ok(()) => {
                out.success("=== ESCAPED ===");
                out.success(&format!(
                    "You made it out in {elapsed_seconds}s with {objectives_completed} objectives complete."
                ));
                TerminalEvent::Victory {
                    elapsed_seconds,
                    objectives_completed,
                    reward: reward.clone(),
                }
            }
            Err(cause) => {
                out.error("=== SIGNAL LOST ===");
                out.error(cause.describe());
                TerminalEvent::Loss {
                    cause,
                    elapsed_seconds,
                    reward: reward.clone(),
                }
            }
        };
        for line in &reward.breakdown {
            out.info(line);
        }
        out.success(&format!(
            "DATA +{} (total {})",
            reward.amount,
            self.meta.currency()
        ));
        info!(escaped, elapsed = elapsed_seconds, amount = reward.amount, "run ended");
        out.terminal(&event);
        self.ending = Some(event);

        match result {
            Ok(()) => {
                self.notify(
                    Signal::Escaped {
                        elapsed_seconds,
                        objectives_completed,
                        objectives_total: self.objectives.total(),
                        o2: self.state.resources.o2.get(),
                    },
                    out,
                );
                if self.state.training {
                    self.meta.mark_tutorial_completed();
                    out.success("Training complete. Locks and hazards are live from now on.");
                    self.notify(Signal::TutorialCompleted, out);
                }
            }
            Err(cause) => self.notify(Signal::Died(cause), out),
        }
        self.notify(Signal::RunSettled, out);
        self.snapshot(out);
    }

    fn snapshot(&self, out: &mut dyn OutputSink) {
        out.snapshot(&HudSnapshot::capture(&self.state, self.events.summaries()));
    }

    fn notify(&mut self, signal: Signal, out: &mut dyn OutputSink) {
        for notice in self.meta.observe(signal) {
            out.success(&format!(
                "[ACHIEVEMENT] {} - {} (+{} DATA)",
                notice.name, notice.description, notice.reward
            ));
            out.achievement(&notice);
        }
    }

    fn add_noise(&mut self, amount: u8) {
        self.state.resources.noise.add(i64::from(amount));
    }

    /// Resolves one submitted line. Failures are also written to `out`, so
    /// a host may ignore the return value.
    pub fn submit(&mut self, line: &str, out: &mut dyn OutputSink) -> CommandResult {
        let result = self.resolve(line, out);
        if let Err(e) = &result {
            out.emit(Feedback::new(e.severity(), e.to_string()));
            if e.cues_error() {
                out.error_cue();
            }
            debug!(line, error = %e, "command rejected");
        }
        self.snapshot(out);
        self.check_terminal(out);
        result
    }

    fn resolve(&mut self, line: &str, out: &mut dyn OutputSink) -> CommandResult {
        if self.is_over() {
            let command = Command::parse(line)?;
            if !command.allowed_after_run() {
                return Err(CommandError::RunEnded);
            }
            return self.dispatch(command, out);
        }
        if self.challenge.is_active() {
            return self.answer_challenge(line, out);
        }
        if self.events.take_glitch(&self.tuning.events, &mut self.rng) {
            self.add_noise(self.tuning.noise.glitch);
            return Err(CommandError::Glitched);
        }
        let command = Command::parse(line)?;
        if !command.is_meta() {
            self.add_noise(self.tuning.noise.command);
        }
        self.dispatch(command, out)
    }

    fn answer_challenge(&mut self, line: &str, out: &mut dyn OutputSink) -> CommandResult {
        match self.challenge.submit(line, self.clock.now()) {
            Submission::Solved { purpose, took } => {
                info!(?purpose, took_ms = took.as_millis() as u64, "challenge solved");
                out.success(&format!("Done! ({:.1}s)", took.as_secs_f64()));
                self.complete_challenge(purpose, out)?;
                Ok(Outcome::ChallengeSolved(purpose))
            }
            Submission::Missed { remaining } => {
                self.add_noise(self.tuning.noise.challenge_miss);
                Err(ChallengeFailure::WrongInput { remaining }.into())
            }
            Submission::Idle => Ok(Outcome::Done),
        }
    }

    fn complete_challenge(
        &mut self,
        purpose: ChallengePurpose,
        out: &mut dyn OutputSink,
    ) -> Result<(), PreconditionError> {
        match purpose {
            ChallengePurpose::Repair(id) => {
                self.objectives
                    .complete(id, self.state.location, self.state.permission())
                    .map_err(|e| {
                        warn!(?id, error = %e, "objective completion refused after challenge");
                        PreconditionError::Objective(e)
                    })?;
                self.state
                    .resources
                    .power
                    .add(-i64::from(self.tuning.power.repair_cost));
                out.success(&format!(
                    "Repair complete: {} (power -{})",
                    id.name(),
                    self.tuning.power.repair_cost
                ));
                self.notify(
                    Signal::Repaired {
                        completed: self.objectives.completed_count(),
                        total: self.objectives.total(),
                    },
                    out,
                );
                if self.objectives.completed_count() == self.objectives.required_count() {
                    out.success("Escape systems ready. Get to the airlock and type escape.");
                }
            }
            ChallengePurpose::Elevate => {
                self.state.elevate(Permission::Admin);
                out.success("Root access granted. Permission: admin");
                self.notify(Signal::PermissionRaised(Permission::Admin), out);
            }
        }
        Ok(())
    }

    fn expire_challenge(&mut self, out: &mut dyn OutputSink) {
        let Some(purpose) = self.challenge.expire(self.clock.now()) else {
            return;
        };
        info!(?purpose, "challenge timed out");
        self.add_noise(self.tuning.noise.challenge_timeout);
        out.error(&ChallengeFailure::TimedOut.to_string());
        match purpose {
            ChallengePurpose::Repair(id) => out.warning(&format!("{} aborted.", id.name())),
            ChallengePurpose::Elevate => out.warning("su aborted. Permission unchanged."),
        }
        out.error_cue();
        self.snapshot(out);
    }

    fn start_challenge(
        &mut self,
        purpose: ChallengePurpose,
        pool: PhrasePool,
        out: &mut dyn OutputSink,
    ) -> CommandResult {
        let timeout = Duration::from_millis(self.tuning.challenge.timeout_ms);
        let Some(phrase) =
            self.challenge
                .start(purpose, pool, self.clock.now(), timeout, &mut self.rng)
        else {
            return Ok(Outcome::Done);
        };
        info!(?purpose, phrase, "challenge started");
        out.warning("=== TYPING CHALLENGE ===");
        out.info("Type the following exactly:");
        out.success(&format!("  {phrase}"));
        out.info(&format!("Time limit: {}s", timeout.as_secs()));
        Ok(Outcome::ChallengeStarted { phrase })
    }

    fn print(out: &mut dyn OutputSink, lines: Vec<String>) {
        for line in lines {
            out.info(&line);
        }
    }

    fn dispatch(&mut self, command: Command, out: &mut dyn OutputSink) -> CommandResult {
        match command {
            Command::Help => Self::print(out, render::help()),
            Command::Status => {
                let lines = render::status(
                    &self.state,
                    &self.objectives,
                    &self.events.summaries(),
                    self.meta.currency(),
                );
                Self::print(out, lines);
                self.notify(Signal::StatusChecked, out);
            }
            Command::Scan => self.scan(out)?,
            Command::Move { to, pace } => return self.move_to(to, pace, out),
            Command::Ls => Self::print(
                out,
                render::room_contents(self.state.location, &self.objectives),
            ),
            Command::Map => Self::print(out, self.graph.render(self.state.location)),
            Command::Objectives => Self::print(out, render::objectives(&self.objectives)),
            Command::Hide => {
                let s = &mut self.state;
                s.resources.noise.set(0);
                s.threat.add(i64::from(self.tuning.hide.threat_gain));
                s.time += self.tuning.hide.time_cost_secs;
                out.success(&format!(
                    "You hold still in the dark. Noise 0, it drifts away. (+{}s)",
                    self.tuning.hide.time_cost_secs
                ));
                self.notify(Signal::Hid, out);
            }
            Command::Repair => return self.repair(out),
            Command::Login { level } => self.login(level, out)?,
            Command::Su => return self.su(out),
            Command::LockDoor => {
                if self.state.door_locked {
                    return Err(PreconditionError::DoorAlreadyLocked.into());
                }
                self.spend_power(self.tuning.power.lock_cost)?;
                self.state.door_locked = true;
                out.success(&format!(
                    "Door locked. (power -{})",
                    self.tuning.power.lock_cost
                ));
            }
            Command::UnlockDoor => {
                if !self.state.door_locked {
                    return Err(PreconditionError::DoorAlreadyUnlocked.into());
                }
                self.state.door_locked = false;
                out.success("Door unlocked.");
            }
            Command::UnlockRoom(room) => {
                if !self.graph.is_locked(room) {
                    return Err(PreconditionError::RoomNotLocked(room).into());
                }
                if !self.graph.unlock(room, self.state.permission()) {
                    return Err(PreconditionError::NeedPermission(UNLOCK_PERMISSION).into());
                }
                out.success(&format!("{} unlocked.", room.label()));
            }
            Command::Escape => return self.escape(out),
            Command::Shop => Self::print(out, self.meta.shop_lines()),
            Command::Buy(index) => {
                let item = self
                    .meta
                    .purchase(index)
                    .map_err(PreconditionError::Purchase)?;
                out.success(&format!("{} unlocked! Active from the next run.", item.name));
                out.info(&format!("DATA left: {}", self.meta.currency()));
                self.notify(Signal::Purchased, out);
            }
            Command::Use(Item::EmergencyO2) => {
                if !self.state.grants.emergency_o2 {
                    return Err(PreconditionError::NoEmergencyO2.into());
                }
                self.state.grants.emergency_o2 = false;
                let gained = self
                    .state
                    .resources
                    .o2
                    .add(i64::from(self.tuning.oxygen.emergency_refill));
                out.success(&format!("Emergency O2 used. O2 +{gained}"));
            }
            Command::Inventory => Self::print(out, render::inventory(&self.state.grants)),
            Command::Stats => Self::print(out, self.meta.stats_lines()),
            Command::Achievements => Self::print(out, self.meta.achievement_lines()),
        }
        Ok(Outcome::Done)
    }

    fn spend_power(&mut self, cost: u8) -> Result<(), PreconditionError> {
        let have = self.state.resources.power.get();
        if have < cost {
            return Err(PreconditionError::InsufficientPower { need: cost, have });
        }
        self.state.resources.power.add(-i64::from(cost));
        Ok(())
    }

    fn scan(&mut self, out: &mut dyn OutputSink) -> Result<(), PreconditionError> {
        if self.events.scan_disabled() {
            return Err(PreconditionError::ScanOffline);
        }
        let distance = self.state.threat;
        let (severity, text) = match distance.tier() {
            ThreatTier::Far => (Severity::Success, "No movement detected nearby."),
            ThreatTier::Approaching => (Severity::Warning, "Something is moving in the vents..."),
            ThreatTier::Near => (Severity::Error, "It is close. Very close."),
            ThreatTier::Critical => (Severity::Error, "It is right behind you!"),
        };
        out.info("Scanning...");
        out.emit(Feedback::new(severity, text));
        out.info(&format!(
            "(distance: {distance}, {})",
            distance.tier().as_str()
        ));
        if let Some(room) = self.events.leak_room() {
            out.warning(&format!("O2 leak detected in {}", room.label()));
        }
        self.notify(Signal::Scanned, out);
        Ok(())
    }

    fn move_to(&mut self, to: RoomId, pace: Pace, out: &mut dyn OutputSink) -> CommandResult {
        let from = self.state.location;
        let consumes_card = match self.graph.can_move(from, to, self.state.grants.access_card) {
            MoveCheck::Allowed {
                consumes_access_card,
            } => consumes_access_card,
            MoveCheck::Denied(reason) => return Err(PreconditionError::Move(reason).into()),
        };
        if consumes_card {
            self.state.grants.access_card = false;
            self.graph.open_with_card(to);
            out.success(&format!("Keycard accepted: {} unlocked.", to.label()));
        }
        self.state.location = to;
        let cost = match pace {
            Pace::Walk => self.tuning.noise.walk,
            Pace::Run => self.tuning.noise.run,
        };
        self.add_noise(cost);
        match pace {
            Pace::Walk => out.success(&format!("Moved to {} ({to}).", to.label())),
            Pace::Run => out.success(&format!("Ran to {}! (noise +{cost})", to.label())),
        }

        let objective = self.objectives.objective_for(to).map(|o| o.id);
        if let Some(id) = objective {
            out.info(&format!("Objective available: {} (repair)", id.name()));
        }
        let leak = self.events.leak_room() == Some(to);
        if leak {
            out.error("Warning: oxygen is leaking in this room!");
        }
        debug!(?from, ?to, ?pace, "moved");
        self.notify(Signal::Moved, out);
        Ok(Outcome::Moved {
            to,
            objective,
            leak,
        })
    }

    fn repair(&mut self, out: &mut dyn OutputSink) -> CommandResult {
        let Some(objective) = self.objectives.objective_for(self.state.location).copied() else {
            return Err(PreconditionError::NothingToRepair.into());
        };
        let needed = objective.required_permission.max(Permission::Engineer);
        if self.state.permission() < needed {
            return Err(PreconditionError::NeedPermission(needed).into());
        }
        let have = self.state.resources.power.get();
        let need = self.tuning.power.repair_cost;
        if have < need {
            return Err(PreconditionError::InsufficientPower { need, have }.into());
        }
        self.start_challenge(
            ChallengePurpose::Repair(objective.id),
            PhrasePool::for_objective(objective.id),
            out,
        )
    }

    fn login(&mut self, level: Permission, out: &mut dyn OutputSink) -> Result<(), PreconditionError> {
        match level {
            Permission::Admin => return Err(PreconditionError::LoginAdmin),
            Permission::Guest => {
                return Err(PreconditionError::AlreadyElevated(self.state.permission()))
            }
            Permission::Engineer => {}
        }
        if self.state.location != RoomId::SECURE {
            return Err(PreconditionError::WrongRoom {
                verb: "login",
                room: RoomId::SECURE,
            });
        }
        if self.state.permission() != Permission::Guest {
            return Err(PreconditionError::AlreadyElevated(self.state.permission()));
        }
        self.state.elevate(Permission::Engineer);
        out.success("Logged in. Permission: engineer");
        self.notify(Signal::PermissionRaised(Permission::Engineer), out);
        Ok(())
    }

    fn su(&mut self, out: &mut dyn OutputSink) -> CommandResult {
        if self.state.permission() == Permission::Admin {
            return Err(PreconditionError::AlreadyElevated(Permission::Admin).into());
        }
        if self.state.grants.elevation_token {
            self.state.grants.elevation_token = false;
            self.state.elevate(Permission::Admin);
            out.success("Temporary SU token used. Permission: admin");
            self.notify(Signal::PermissionRaised(Permission::Admin), out);
            return Ok(Outcome::Done);
        }
        if self.state.permission() < Permission::Engineer {
            return Err(PreconditionError::NeedPermission(Permission::Engineer).into());
        }
        if self.state.location != RoomId::SECURE {
            return Err(PreconditionError::WrongRoom {
                verb: "su",
                room: RoomId::SECURE,
            }
            .into());
        }
        self.start_challenge(ChallengePurpose::Elevate, PhrasePool::Generic, out)
    }

    fn escape(&mut self, out: &mut dyn OutputSink) -> CommandResult {
        if self.state.location != RoomId::EXIT {
            return Err(PreconditionError::WrongRoom {
                verb: "escape",
                room: RoomId::EXIT,
            }
            .into());
        }
        if !self.objectives.can_escape(self.state.location) {
            return Err(PreconditionError::EscapeNotReady {
                done: self.objectives.completed_count(),
                required: self.objectives.required_count(),
            }
            .into());
        }
        let needs_admin = self.tuning.escape_requires_admin && !self.state.training;
        if needs_admin && self.state.permission() < Permission::Admin {
            return Err(PreconditionError::NeedPermission(Permission::Admin).into());
        }
        self.finish(Ok(()), out);
        Ok(Outcome::Victory)
    }
}
