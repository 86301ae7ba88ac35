use deadline_core::{GraphTuning, Permission, RoomId};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::debug;

/// Base adjacency shared by every run.
const BASE_CONNECTIONS: [(RoomId, &[RoomId]); 6] = [
    (
        RoomId::Hub,
        &[RoomId::Reactor, RoomId::Medbay, RoomId::Storage],
    ),
    (RoomId::Reactor, &[RoomId::Hub]),
    (RoomId::Medbay, &[RoomId::Hub]),
    (RoomId::Storage, &[RoomId::Hub, RoomId::Security]),
    (RoomId::Security, &[RoomId::Storage, RoomId::Airlock]),
    (RoomId::Airlock, &[RoomId::Security]),
];

/// Rooms that may be locked at run start (everything but hub and airlock).
pub const LOCKABLE_ROOMS: [RoomId; 4] = [
    RoomId::Reactor,
    RoomId::Medbay,
    RoomId::Storage,
    RoomId::Security,
];

/// Lowest tier allowed to unlock a room.
pub const UNLOCK_PERMISSION: Permission = Permission::Engineer;

/// Why a move was refused.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MoveDenied {
    #[error("{} cannot be reached from here (not connected)", .0.label())]
    NotConnected(RoomId),
    #[error("{} is locked: unlock {} first", .0.label(), .0)]
    Locked(RoomId),
}

/// Result of a movement legality query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveCheck {
    /// The move is legal. When `consumes_access_card` is set the target is
    /// locked and the caller must spend the card and unlock the room.
    Allowed { consumes_access_card: bool },
    Denied(MoveDenied),
}

impl MoveCheck {
    pub fn is_allowed(&self) -> bool {
        matches!(self, MoveCheck::Allowed { .. })
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, MoveCheck::Denied(MoveDenied::Locked(_)))
    }
}

/// Per-run room graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoomGraph {
    connections: BTreeMap<RoomId, Vec<RoomId>>,
    locked: BTreeSet<RoomId>,
    shortcut: bool,
}

impl RoomGraph {
    /// The base layout with no locks and no shortcut.
    pub fn base() -> Self {
        let connections = BASE_CONNECTIONS
            .iter()
            .map(|(room, links)| (*room, links.to_vec()))
            .collect();
        Self {
            connections,
            locked: BTreeSet::new(),
            shortcut: false,
        }
    }

    /// Run-start generation: maybe add the hub-airlock shortcut, then lock
    /// zero, one or two of the lockable rooms.
    pub fn generate<R: Rng + ?Sized>(
        rng: &mut R,
        tuning: &GraphTuning,
        shortcut_unlocked: bool,
    ) -> Self {
        let mut graph = Self::base();

        let mut shortcut_chance = tuning.shortcut_chance;
        if shortcut_unlocked {
            shortcut_chance += tuning.shortcut_boost;
        }
        if rng.gen_bool(shortcut_chance.clamp(0.0, 1.0)) {
            graph.add_shortcut();
        }

        let count = if rng.gen_bool(tuning.two_locks_chance.clamp(0.0, 1.0)) {
            2
        } else if rng.gen_bool(tuning.one_lock_chance.clamp(0.0, 1.0)) {
            1
        } else {
            0
        };
        let mut pool = LOCKABLE_ROOMS.to_vec();
        pool.shuffle(rng);
        graph.locked.extend(pool.into_iter().take(count));

        debug!(shortcut = graph.shortcut, locked = ?graph.locked, "room graph generated");
        graph
    }

    fn add_shortcut(&mut self) {
        if self.shortcut {
            return;
        }
        self.shortcut = true;
        self.connections
            .entry(RoomId::ENTRY)
            .or_default()
            .push(RoomId::EXIT);
        self.connections
            .entry(RoomId::EXIT)
            .or_default()
            .push(RoomId::ENTRY);
    }

    pub fn neighbours(&self, room: RoomId) -> &[RoomId] {
        self.connections
            .get(&room)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_adjacent(&self, from: RoomId, to: RoomId) -> bool {
        self.neighbours(from).contains(&to)
    }

    pub fn is_locked(&self, room: RoomId) -> bool {
        self.locked.contains(&room)
    }

    pub fn locked_rooms(&self) -> impl Iterator<Item = RoomId> + '_ {
        self.locked.iter().copied()
    }

    pub fn has_shortcut(&self) -> bool {
        self.shortcut
    }

    /// Movement legality. `has_access_card` lets the player through one
    /// locked room; the caller spends it via [`RoomGraph::open_with_card`].
    pub fn can_move(&self, from: RoomId, to: RoomId, has_access_card: bool) -> MoveCheck {
        if !self.is_adjacent(from, to) {
            return MoveCheck::Denied(MoveDenied::NotConnected(to));
        }
        if self.is_locked(to) {
            if has_access_card {
                return MoveCheck::Allowed {
                    consumes_access_card: true,
                };
            }
            return MoveCheck::Denied(MoveDenied::Locked(to));
        }
        MoveCheck::Allowed {
            consumes_access_card: false,
        }
    }

    /// Removes `room` from the locked set when `permission` is at least
    /// [`UNLOCK_PERMISSION`]. Returns false if the room was not locked or
    /// the permission is too low.
    pub fn unlock(&mut self, room: RoomId, permission: Permission) -> bool {
        if !self.is_locked(room) || permission < UNLOCK_PERMISSION {
            return false;
        }
        self.locked.remove(&room)
    }

    /// Permanently opens a locked room with an access card.
    pub fn open_with_card(&mut self, room: RoomId) -> bool {
        self.locked.remove(&room)
    }

    /// Marks a lockable room as locked. Hub and airlock never lock.
    pub fn lock(&mut self, room: RoomId) -> bool {
        if !LOCKABLE_ROOMS.contains(&room) {
            return false;
        }
        self.locked.insert(room)
    }

    /// ASCII map with `*` on the current room and `#` on locked rooms.
    pub fn render(&self, current: RoomId) -> Vec<String> {
        let tag = |room: RoomId| {
            let lock = if self.is_locked(room) { "#" } else { "" };
            let here = if room == current { "*" } else { "" };
            format!("[{room}{lock}{here}]")
        };
        let mut lines = vec![
            format!("{}---{}---{}", tag(RoomId::Reactor), tag(RoomId::Hub), tag(RoomId::Medbay)),
            "              |".to_string(),
            format!("          {}", tag(RoomId::Storage)),
            "              |".to_string(),
            format!("          {}", tag(RoomId::Security)),
            "              |".to_string(),
            format!("          {}", tag(RoomId::Airlock)),
        ];
        if self.shortcut {
            lines.push(format!(
                "shortcut: {} <==> {}",
                tag(RoomId::ENTRY),
                tag(RoomId::EXIT)
            ));
        }
        lines.push("legend: * you are here, # locked".to_string());
        lines
    }
}

impl Default for RoomGraph {
    fn default() -> Self {
        Self::base()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn base_layout_is_symmetric() {
        let g = RoomGraph::base();
        for room in RoomId::ALL {
            for &n in g.neighbours(room) {
                assert!(g.is_adjacent(n, room), "{room} -> {n} not mirrored");
            }
        }
        assert!(g.is_adjacent(RoomId::Hub, RoomId::Reactor));
        assert!(!g.is_adjacent(RoomId::Hub, RoomId::Airlock));
    }

    #[test]
    fn not_connected_is_denied() {
        let g = RoomGraph::base();
        assert_eq!(
            g.can_move(RoomId::Hub, RoomId::Security, true),
            MoveCheck::Denied(MoveDenied::NotConnected(RoomId::Security))
        );
    }

    #[test]
    fn locked_room_needs_card_or_unlock() {
        let mut g = RoomGraph::base();
        assert!(g.lock(RoomId::Reactor));
        let check = g.can_move(RoomId::Hub, RoomId::Reactor, false);
        assert!(check.is_locked());
        assert_eq!(
            g.can_move(RoomId::Hub, RoomId::Reactor, true),
            MoveCheck::Allowed {
                consumes_access_card: true
            }
        );
        assert!(g.open_with_card(RoomId::Reactor));
        assert_eq!(
            g.can_move(RoomId::Hub, RoomId::Reactor, false),
            MoveCheck::Allowed {
                consumes_access_card: false
            }
        );
    }

    #[test]
    fn unlock_requires_engineer_and_a_lock() {
        let mut g = RoomGraph::base();
        assert!(!g.unlock(RoomId::Medbay, Permission::Admin));
        g.lock(RoomId::Medbay);
        assert!(!g.unlock(RoomId::Medbay, Permission::Guest));
        assert!(g.is_locked(RoomId::Medbay));
        assert!(g.unlock(RoomId::Medbay, Permission::Engineer));
        assert!(!g.is_locked(RoomId::Medbay));
    }

    #[test]
    fn hub_and_airlock_never_lock() {
        let mut g = RoomGraph::base();
        assert!(!g.lock(RoomId::Hub));
        assert!(!g.lock(RoomId::Airlock));
    }

    #[test]
    fn certain_shortcut_links_hub_and_airlock() {
        let tuning = GraphTuning {
            shortcut_chance: 1.0,
            shortcut_boost: 0.0,
            two_locks_chance: 0.0,
            one_lock_chance: 0.0,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let g = RoomGraph::generate(&mut rng, &tuning, false);
        assert!(g.has_shortcut());
        assert!(g.is_adjacent(RoomId::Hub, RoomId::Airlock));
        assert!(g.is_adjacent(RoomId::Airlock, RoomId::Hub));
        assert_eq!(g.locked_rooms().count(), 0);
        assert!(g.render(RoomId::Hub).iter().any(|l| l.starts_with("shortcut")));
    }

    #[test]
    fn boost_enables_shortcut() {
        let tuning = GraphTuning {
            shortcut_chance: 0.0,
            shortcut_boost: 1.0,
            two_locks_chance: 0.0,
            one_lock_chance: 0.0,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(!RoomGraph::generate(&mut rng, &tuning, false).has_shortcut());
        assert!(RoomGraph::generate(&mut rng, &tuning, true).has_shortcut());
    }

    #[test]
    fn render_marks_current_and_locked() {
        let mut g = RoomGraph::base();
        g.lock(RoomId::Storage);
        let text = g.render(RoomId::Hub).join("\n");
        assert!(text.contains("[hub*]"));
        assert!(text.contains("[storage#]"));
    }

    proptest! {
        #[test]
        fn generation_respects_lock_rules(seed in any::<u64>()) {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let g = RoomGraph::generate(&mut rng, &GraphTuning::default(), true);
            let locked: Vec<_> = g.locked_rooms().collect();
            prop_assert!(locked.len() <= 2);
            prop_assert!(!g.is_locked(RoomId::Hub));
            prop_assert!(!g.is_locked(RoomId::Airlock));
        }

        #[test]
        fn movement_legality_matches_table(seed in any::<u64>(), from in 0usize..6, to in 0usize..6, card in any::<bool>()) {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let g = RoomGraph::generate(&mut rng, &GraphTuning::default(), false);
            let (from, to) = (RoomId::ALL[from], RoomId::ALL[to]);
            let expected = g.is_adjacent(from, to) && (!g.is_locked(to) || card);
            prop_assert_eq!(g.can_move(from, to, card).is_allowed(), expected);
        }
    }
}
