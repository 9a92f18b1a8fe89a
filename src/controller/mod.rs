//! Tick-driven controller engines.
//!
//! Everything here is single-threaded and cooperatively scheduled: one
//! `tick` call advances every component's state exactly once, and the only
//! suspension points are polls of the external engine's busy/done signals.
//! All state is owned by the controller object and passed by exclusive
//! reference into each tick — there is no ambient mutable state.

pub mod alarm;
pub mod autoinit;
pub mod basic;
pub mod echo;
pub mod reset;
mod sequencer;

pub use alarm::AlarmMonitor;
pub use autoinit::{AutoDacController, InitPhase};
pub use basic::DacController;
pub use echo::EchoVerifier;
pub use reset::ResetPulse;
