//! Timed exact-match typing gate.
//!
//! Deadlines are expressed on the run's logical clock, so the challenge
//! cannot observe wall time and pausing the clock pauses the deadline.

use deadline_world::ObjectiveId;
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;

/// Phrase pool a challenge draws its target from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhrasePool {
    Reactor,
    Security,
    Airlock,
    Generic,
}

impl PhrasePool {
    pub fn phrases(self) -> &'static [&'static str] {
        match self {
            PhrasePool::Reactor => &[
                "systemctl restart reactor-core",
                "sudo repair --target=coolant",
                "init 3 && sync reactor",
            ],
            PhrasePool::Security => &[
                "override --auth=bypass",
                "chmod 777 /security/lock",
                "sudo disable firewall",
            ],
            PhrasePool::Airlock => &[
                "pressurize --chamber=main",
                "seal-check --all",
                "hatch open --confirm",
            ],
            PhrasePool::Generic => &[
                "sudo systemctl restart",
                "repair --force",
                "diagnose -v --fix",
            ],
        }
    }

    pub fn for_objective(id: ObjectiveId) -> Self {
        match id {
            ObjectiveId::Reactor => PhrasePool::Reactor,
            ObjectiveId::Security => PhrasePool::Security,
            ObjectiveId::Airlock => PhrasePool::Airlock,
        }
    }
}

/// What a challenge unlocks when solved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChallengePurpose {
    Repair(ObjectiveId),
    Elevate,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Active {
    purpose: ChallengePurpose,
    phrase: &'static str,
    started: Duration,
    deadline: Duration,
    misses: u32,
}

/// Result of feeding one line to the challenge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Submission {
    /// No challenge was active.
    Idle,
    Solved {
        purpose: ChallengePurpose,
        took: Duration,
    },
    /// Wrong text; the challenge stays active until its deadline.
    Missed { remaining: Duration },
}

/// Single-flight typing challenge: `Idle -> Active -> Idle`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Challenge {
    active: Option<Active>,
}

impl Challenge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a challenge and returns its target phrase, or `None` when one
    /// is already active.
    pub fn start<R: Rng + ?Sized>(
        &mut self,
        purpose: ChallengePurpose,
        pool: PhrasePool,
        now: Duration,
        timeout: Duration,
        rng: &mut R,
    ) -> Option<&'static str> {
        if self.active.is_some() {
            return None;
        }
        let phrase = pool.phrases().choose(rng).copied()?;
        self.active = Some(Active {
            purpose,
            phrase,
            started: now,
            deadline: now.saturating_add(timeout),
            misses: 0,
        });
        Some(phrase)
    }

    /// Checks `text` (trimmed, case-sensitive) against the target. Does not
    /// look at the deadline; expiry is handled by [`Challenge::expire`].
    pub fn submit(&mut self, text: &str, now: Duration) -> Submission {
        let Some(active) = self.active.as_mut() else {
            return Submission::Idle;
        };
        if text.trim() == active.phrase {
            let took = now.saturating_sub(active.started);
            let purpose = active.purpose;
            self.active = None;
            Submission::Solved { purpose, took }
        } else {
            active.misses += 1;
            Submission::Missed {
                remaining: active.deadline.saturating_sub(now),
            }
        }
    }

    /// Fails the active challenge if its deadline is at or before `now`.
    /// Returns the purpose that just failed.
    pub fn expire(&mut self, now: Duration) -> Option<ChallengePurpose> {
        match &self.active {
            Some(active) if active.deadline <= now => self.active.take().map(|a| a.purpose),
            _ => None,
        }
    }

    /// Drops the active challenge without resolving it (run ended).
    pub fn abandon(&mut self) -> Option<ChallengePurpose> {
        self.active.take().map(|a| a.purpose)
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn phrase(&self) -> Option<&'static str> {
        self.active.as_ref().map(|a| a.phrase)
    }

    pub fn purpose(&self) -> Option<ChallengePurpose> {
        self.active.as_ref().map(|a| a.purpose)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.active.as_ref().map(|a| a.deadline)
    }

    pub fn misses(&self) -> u32 {
        self.active.as_ref().map_or(0, |a| a.misses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const TEN: Duration = Duration::from_secs(10);

    fn started() -> (Challenge, &'static str) {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut c = Challenge::new();
        let phrase = c
            .start(
                ChallengePurpose::Elevate,
                PhrasePool::Generic,
                Duration::ZERO,
                TEN,
                &mut rng,
            )
            .unwrap();
        (c, phrase)
    }

    #[test]
    fn phrase_comes_from_pool() {
        let (c, phrase) = started();
        assert!(PhrasePool::Generic.phrases().contains(&phrase));
        assert_eq!(c.deadline(), Some(TEN));
    }

    #[test]
    fn second_start_is_rejected() {
        let (mut c, phrase) = started();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let again = c.start(
            ChallengePurpose::Repair(ObjectiveId::Reactor),
            PhrasePool::Reactor,
            Duration::from_secs(1),
            TEN,
            &mut rng,
        );
        assert_eq!(again, None);
        assert_eq!(c.phrase(), Some(phrase));
        assert_eq!(c.purpose(), Some(ChallengePurpose::Elevate));
    }

    #[test]
    fn wrong_input_keeps_challenge_alive() {
        let (mut c, phrase) = started();
        assert_eq!(
            c.submit("nope", Duration::from_secs(3)),
            Submission::Missed {
                remaining: Duration::from_secs(7)
            }
        );
        // Case matters.
        c.submit(&phrase.to_uppercase(), Duration::from_secs(4));
        assert_eq!(c.misses(), 2);
        assert!(c.is_active());
        let padded = format!("  {phrase} ");
        assert_eq!(
            c.submit(&padded, Duration::from_secs(5)),
            Submission::Solved {
                purpose: ChallengePurpose::Elevate,
                took: Duration::from_secs(5)
            }
        );
        assert!(!c.is_active());
        assert_eq!(c.submit(phrase, Duration::from_secs(6)), Submission::Idle);
    }

    #[test]
    fn expiry_fires_once_at_deadline() {
        let (mut c, _) = started();
        assert_eq!(c.expire(Duration::from_millis(9_999)), None);
        assert_eq!(c.expire(TEN), Some(ChallengePurpose::Elevate));
        assert_eq!(c.expire(Duration::from_secs(11)), None);
        assert!(!c.is_active());
    }
}
