#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
#![doc = include_str!("../README.md")]

//! # ltc266x-ctrl
//!
//! Command sequencing and echo-verification engine for LTC2666-class
//! multi-channel DACs.
//!
//! This crate provides a `no_std` controller that expands logical DAC
//! commands into serial frames, drives an external transfer engine one
//! transfer at a time, and verifies transport integrity through the
//! device's previous-word echo.
//!
//! ## Features
//!
//! - 24/32-bit frame encoding for the full LTC2666 command set
//! - Per-channel, broadcast and single-channel command expansion
//! - Sticky echo-mismatch latching with trailing flush transfers
//! - Reset-pulse and alarm-edge side-channel handling
//! - Auto-initialization with bounded or unbounded retry
//! - Run-time output-range guard
//!
//! ## Example
//!
//! ```rust,no_run
//! use ltc266x_ctrl::{chmask, Command, ControllerConfig, DacController, MockEngine};
//!
//! # fn main() -> Result<(), ltc266x_ctrl::DacError> {
//! let mut engine = MockEngine::new();
//! let mut ctrl = DacController::new(ControllerConfig::default())?;
//!
//! ctrl.submit(Command::write_code(chmask!(0, 2), 0x8000))?;
//! loop {
//!     engine.tick();
//!     ctrl.tick(&mut engine, true);
//!     if ctrl.done() { break; }
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod protocol;
pub mod xfer;

// Macro modules (must be declared before use)
#[macro_use]
pub mod macros;
#[macro_use]
pub mod logging;

// Re-export commonly used types
#[doc(inline)]
pub use config::{ControllerConfig, FrameWidth};
#[doc(inline)]
pub use controller::{AutoDacController, DacController, InitPhase};
#[doc(inline)]
pub use error::{DacError, Result};
#[doc(inline)]
pub use protocol::command::{Channel, ChannelMask, Command, Expansion};
#[doc(inline)]
pub use protocol::constants::{CommandCode, SpanCode};
#[doc(inline)]
pub use protocol::frame::Frame;
#[doc(inline)]
pub use xfer::{MockEngine, TransferEngine};
