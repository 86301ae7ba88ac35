//! Text blocks for the informational verbs.

use deadline_core::{EventSummary, Grants, RoomId, State};
use deadline_world::ObjectiveTracker;

const HELP: [(&str, &str); 21] = [
    ("help", "show this help"),
    ("status", "show location, permission and resources"),
    ("scan", "check how close the pursuer is"),
    ("cd <room>", "move to an adjacent room (noise +1)"),
    ("run <room>", "move quickly to an adjacent room (noise +3)"),
    ("ls", "list what is in this room"),
    ("map", "show the station map"),
    ("objectives", "show repair objectives"),
    ("hide", "hide: noise reset, pursuer pushed back, costs time"),
    ("repair", "repair this room's system (engineer or higher)"),
    ("login", "log in as engineer (Security Office)"),
    ("su", "escalate to admin (engineer, Security Office)"),
    ("lock door", "lock the door (power -5)"),
    ("unlock door", "unlock the door"),
    ("unlock <room>", "unlock a locked room (engineer or higher)"),
    ("escape", "leave the station (Airlock)"),
    ("use o2", "use an emergency O2 canister"),
    ("inventory", "list one-shot items you hold"),
    ("shop / buy <n>", "browse and buy permanent unlocks"),
    ("stats", "show lifetime statistics"),
    ("achievements", "list achievements"),
];

pub fn help() -> Vec<String> {
    let mut lines = vec!["=== COMMANDS ===".to_string()];
    lines.extend(HELP.iter().map(|(cmd, desc)| format!("  {cmd:<16} - {desc}")));
    lines
}

fn room_items(room: RoomId) -> &'static [&'static str] {
    match room {
        RoomId::Hub => &["terminal", "emergency map"],
        RoomId::Reactor => &["control panel", "cooling system", "toolbox"],
        RoomId::Medbay => &["medkit", "O2 canister", "diagnostics"],
        RoomId::Storage => &["parts crate", "battery", "spare parts"],
        RoomId::Security => &["console", "keycard reader", "monitors"],
        RoomId::Airlock => &["escape hatch", "spacesuit", "emergency button"],
    }
}

pub fn room_contents(room: RoomId, objectives: &ObjectiveTracker) -> Vec<String> {
    let mut lines = vec![
        "=== ROOM ===".to_string(),
        format!("Location: {} ({room})", room.label()),
        "Items:".to_string(),
    ];
    lines.extend(room_items(room).iter().map(|item| format!("  - {item}")));
    if let Some(obj) = objectives.objective_for(room) {
        lines.push(format!("[objective] {} - use repair", obj.id.name()));
    }
    lines
}

pub fn objectives(tracker: &ObjectiveTracker) -> Vec<String> {
    let mut lines = vec![format!(
        "=== OBJECTIVES ({}/{} required) ===",
        tracker.completed_count(),
        tracker.required_count()
    )];
    for obj in tracker.iter() {
        let mark = if obj.completed { "x" } else { " " };
        lines.push(format!(
            "[{mark}] {} @ {} ({}+)",
            obj.id.name(),
            obj.room,
            obj.required_permission
        ));
    }
    lines.push(format!("Escape: reach {} and type escape", RoomId::EXIT));
    lines
}

pub fn status(
    state: &State,
    tracker: &ObjectiveTracker,
    events: &[EventSummary],
    currency: u32,
) -> Vec<String> {
    let r = &state.resources;
    let mut lines = vec![
        "=== SYSTEM STATUS ===".to_string(),
        format!("Location: {} ({})", state.location.label(), state.location),
        format!("Permission: {}", state.permission()),
        format!("HP: {}  O2: {}%", r.hp, r.o2),
        format!("Power: {}  Noise: {}", r.power, r.noise),
        format!(
            "Door: {}",
            if state.door_locked { "locked" } else { "unlocked" }
        ),
        format!(
            "Objectives: {}/{}",
            tracker.completed_count(),
            tracker.required_count()
        ),
        format!("Time: {}s", state.time),
        format!("DATA: {currency}"),
    ];
    if state.training {
        lines.push("[training run]".to_string());
    }
    for event in events {
        let detail = event
            .detail
            .as_deref()
            .map(|d| format!(" - {d}"))
            .unwrap_or_default();
        lines.push(format!(
            "[!] {} ({}/{} ticks){detail}",
            event.label, event.remaining_ticks, event.total_ticks
        ));
    }
    lines
}

pub fn inventory(grants: &Grants) -> Vec<String> {
    let held: Vec<&str> = [
        (grants.emergency_o2, "emergency O2 canister (use o2)"),
        (grants.elevation_token, "temporary SU token (su)"),
        (grants.access_card, "engineer keycard (opens one locked room)"),
    ]
    .into_iter()
    .filter_map(|(has, name)| has.then_some(name))
    .collect();
    if held.is_empty() {
        return vec!["Inventory is empty.".to_string()];
    }
    let mut lines = vec!["=== INVENTORY ===".to_string()];
    lines.extend(held.into_iter().map(|name| format!("  - {name}")));
    lines
}
