#![deny(warnings)]

//! Station layout and escape objectives.
//!
//! - [`RoomGraph`]: base adjacency, per-run locks and shortcut, movement
//!   legality and unlocking.
//! - [`ObjectiveTracker`]: the repair objectives and the escape gate.

mod graph;
mod objectives;

pub use graph::*;
pub use objectives::*;
