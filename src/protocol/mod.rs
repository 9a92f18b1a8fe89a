//! Frame-level protocol for LTC2666-class DACs.
//!
//! This module contains the pure, stateless half of the controller: the
//! command set and its constants, the frame record with its serialization
//! to a transfer word, and the command classifier that derives how a
//! logical command expands into physical frames.

pub mod command;
pub mod constants;
pub mod frame;

pub use command::{Channel, ChannelMask, Command, Expansion};
pub use constants::{CommandCode, SpanCode};
pub use frame::Frame;
