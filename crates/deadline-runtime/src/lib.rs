#![deny(warnings)]

//! Run simulation for Deadline Shell.
//!
//! [`Run`] owns one run's state and drives it from two inputs: logical time
//! handed to [`Run::advance`] and command lines handed to [`Run::submit`].
//! Both are resolved synchronously against the same state, so a host can
//! interleave them freely. Everything the player should see is written to an
//! [`deadline_core::OutputSink`].

mod challenge;
mod command;
mod error;
mod render;
mod run;

pub use challenge::{Challenge, ChallengePurpose, PhrasePool, Submission};
pub use command::{Command, Item, Pace, ValidationError};
pub use error::{ChallengeFailure, CommandError, PreconditionError};
pub use run::{CommandResult, Outcome, Run, RunConfig};
