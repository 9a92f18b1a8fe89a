//! Logical commands, channel masks, and the expansion classifier.
//!
//! A [`Command`] is what a command source hands the controller: a command
//! kind, a channel mask, and a 16-bit payload whose meaning depends on the
//! kind. The classifier derives how each kind expands into physical frames.

use crate::error::{DacError, Result};
use crate::protocol::constants::{
    CommandCode, SpanCode, CONFIG_PAYLOAD_MASK, GLOBAL_TOGGLE_PAYLOAD_MASK, LAST_CHANNEL,
    MUX_PAYLOAD_MASK, TOGGLE_PAYLOAD_MASK,
};
use crate::protocol::frame::Frame;

/// A validated DAC channel index (0-7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Channel(u8);

impl Channel {
    /// Create a channel index.
    ///
    /// # Errors
    ///
    /// Returns error if `index` is greater than 7.
    pub const fn new(index: u8) -> Result<Self> {
        if index > LAST_CHANNEL {
            return Err(DacError::channel_out_of_range());
        }
        Ok(Self(index))
    }

    /// The raw channel index
    pub const fn index(self) -> u8 {
        self.0
    }
}

/// An 8-bit channel set, one bit per channel.
///
/// Bit order is also iteration order: per-channel expansion walks set bits
/// from channel 0 upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelMask(u8);

impl ChannelMask {
    /// The empty mask
    pub const EMPTY: Self = Self(0);

    /// All eight channels
    pub const ALL: Self = Self(0xFF);

    /// Create a mask from raw bits. Every bit pattern is a legal mask;
    /// whether it is legal for a given command is the classifier's call.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Mask selecting exactly one channel
    pub const fn single(ch: Channel) -> Self {
        Self(1 << ch.index())
    }

    /// The raw mask bits
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether no channel is selected
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of selected channels
    pub const fn popcount(self) -> u32 {
        self.0.count_ones()
    }

    /// Whether the given channel index is selected
    pub const fn contains(self, index: u8) -> bool {
        index <= LAST_CHANNEL && (self.0 >> index) & 1 != 0
    }

    /// The lowest selected channel at or above `from`, if any
    pub const fn next_set(self, from: u8) -> Option<u8> {
        let mut i = from;
        while i <= LAST_CHANNEL {
            if (self.0 >> i) & 1 != 0 {
                return Some(i);
            }
            i += 1;
        }
        None
    }

    /// The single selected channel, if exactly one bit is set
    pub const fn single_channel(self) -> Option<u8> {
        if self.popcount() == 1 {
            Some(self.0.trailing_zeros() as u8)
        } else {
            None
        }
    }
}

/// How a command expands into physical frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Expansion {
    /// One frame per set mask bit, in increasing channel order
    PerChannel,
    /// One frame, address 0, applies to all channels
    Broadcast,
    /// One frame addressed to the single set mask bit; any other popcount
    /// is an illegal command
    SingleFromMask,
    /// One frame, no mask semantics
    Singleton,
}

/// A logical DAC command: kind, channel mask, payload.
///
/// Exactly one command is in flight at a time; the sequencer accepts a new
/// one only while idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Command {
    /// Command kind (also the wire nibble)
    pub code: CommandCode,
    /// Channel mask; meaning depends on the kind
    pub mask: ChannelMask,
    /// 16-bit payload; meaning depends on the kind
    pub payload: u16,
}

impl Command {
    /// Create a command from raw parts. Typed constructors below mask the
    /// payload to its meaningful bits; this one does not.
    pub const fn new(code: CommandCode, mask: ChannelMask, payload: u16) -> Self {
        Self {
            code,
            mask,
            payload,
        }
    }

    /// Write an input code to every channel in `mask`
    pub const fn write_code(mask: ChannelMask, code: u16) -> Self {
        Self::new(CommandCode::WriteCodeN, mask, code)
    }

    /// Write a code to every channel in `mask` and update each
    pub const fn write_code_update(mask: ChannelMask, code: u16) -> Self {
        Self::new(CommandCode::WriteCodeNUpdateN, mask, code)
    }

    /// Write a code to the single channel in `mask`, then update all
    pub const fn write_code_update_all(mask: ChannelMask, code: u16) -> Self {
        Self::new(CommandCode::WriteCodeNUpdateAll, mask, code)
    }

    /// Update (power up) every channel in `mask`
    pub const fn update(mask: ChannelMask) -> Self {
        Self::new(CommandCode::UpdateN, mask, 0)
    }

    /// Program the soft-span of every channel in `mask`
    pub const fn write_span(mask: ChannelMask, span: SpanCode) -> Self {
        Self::new(CommandCode::WriteSpanN, mask, span.bits())
    }

    /// Power down every channel in `mask`
    pub const fn power_down(mask: ChannelMask) -> Self {
        Self::new(CommandCode::PowerDownN, mask, 0)
    }

    /// Write a code to all channels (broadcast)
    pub const fn write_code_all(code: u16) -> Self {
        Self::new(CommandCode::WriteCodeAll, ChannelMask::EMPTY, code)
    }

    /// Update all channels (broadcast)
    pub const fn update_all() -> Self {
        Self::new(CommandCode::UpdateAll, ChannelMask::EMPTY, 0)
    }

    /// Write a code to all channels and update all (broadcast)
    pub const fn write_code_all_update_all(code: u16) -> Self {
        Self::new(CommandCode::WriteCodeAllUpdateAll, ChannelMask::EMPTY, code)
    }

    /// Write the configuration register (low 2 payload bits)
    pub const fn config(bits: u16) -> Self {
        Self::new(
            CommandCode::Config,
            ChannelMask::EMPTY,
            bits & CONFIG_PAYLOAD_MASK,
        )
    }

    /// Drive the monitor multiplexer (low 5 payload bits)
    pub const fn monitor_mux(sel: u16) -> Self {
        Self::new(
            CommandCode::MonitorMux,
            ChannelMask::EMPTY,
            sel & MUX_PAYLOAD_MASK,
        )
    }

    /// Write the toggle-select register (low 8 payload bits)
    pub const fn toggle_select(channels: u16) -> Self {
        Self::new(
            CommandCode::ToggleSelect,
            ChannelMask::EMPTY,
            channels & TOGGLE_PAYLOAD_MASK,
        )
    }

    /// Set or clear the global toggle bit
    pub const fn global_toggle(tgb: bool) -> Self {
        Self::new(
            CommandCode::GlobalToggle,
            ChannelMask::EMPTY,
            (tgb as u16) & GLOBAL_TOGGLE_PAYLOAD_MASK,
        )
    }

    /// Power down the whole chip
    pub const fn power_down_chip() -> Self {
        Self::new(CommandCode::PowerDownChip, ChannelMask::EMPTY, 0)
    }

    /// No operation
    pub const fn no_op() -> Self {
        Self::new(CommandCode::NoOp, ChannelMask::EMPTY, 0)
    }

    /// Classify this command's expansion policy.
    ///
    /// `Err` here is the one mask-legality rule of the command set:
    /// `WRITE_CODE_N_UPD_ALL` requires exactly one set mask bit. The
    /// sequencer still accepts such a command — it performs zero transfers
    /// and pulses the illegal flag — so the source interface stays
    /// synchronous.
    pub const fn classify(&self) -> Result<Expansion> {
        Ok(match self.code {
            CommandCode::WriteCodeN
            | CommandCode::UpdateN
            | CommandCode::WriteSpanN
            | CommandCode::WriteCodeNUpdateN
            | CommandCode::PowerDownN => Expansion::PerChannel,
            CommandCode::WriteCodeAll
            | CommandCode::UpdateAll
            | CommandCode::WriteCodeAllUpdateAll => Expansion::Broadcast,
            CommandCode::WriteCodeNUpdateAll => {
                if self.mask.popcount() != 1 {
                    return Err(DacError::mask_not_single());
                }
                Expansion::SingleFromMask
            }
            CommandCode::Config
            | CommandCode::MonitorMux
            | CommandCode::ToggleSelect
            | CommandCode::GlobalToggle
            | CommandCode::PowerDownChip
            | CommandCode::NoOp => Expansion::Singleton,
        })
    }

    /// Build the frame for this command addressed to `address`.
    pub(crate) const fn frame_for(&self, address: u8) -> Frame {
        Frame::new(self.code, address, self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_validation() {
        assert!(Channel::new(0).is_ok());
        assert!(Channel::new(7).is_ok());
        assert!(Channel::new(8).is_err());
    }

    #[test]
    fn test_mask_iteration_order() {
        let mask = ChannelMask::from_bits(0b0000_0101);
        assert_eq!(mask.next_set(0), Some(0));
        assert_eq!(mask.next_set(1), Some(2));
        assert_eq!(mask.next_set(3), None);
    }

    #[test]
    fn test_mask_single_channel() {
        assert_eq!(ChannelMask::from_bits(0b0100_0000).single_channel(), Some(6));
        assert_eq!(ChannelMask::from_bits(0b0100_0001).single_channel(), None);
        assert_eq!(ChannelMask::EMPTY.single_channel(), None);
    }

    #[test]
    fn test_classify_per_channel() {
        let cmd = Command::write_code(ChannelMask::ALL, 0x1234);
        assert_eq!(cmd.classify().unwrap(), Expansion::PerChannel);
    }

    #[test]
    fn test_classify_broadcast() {
        assert_eq!(
            Command::update_all().classify().unwrap(),
            Expansion::Broadcast
        );
    }

    #[test]
    fn test_classify_singleton() {
        assert_eq!(
            Command::config(0).classify().unwrap(),
            Expansion::Singleton
        );
        assert_eq!(Command::no_op().classify().unwrap(), Expansion::Singleton);
    }

    #[test]
    fn test_classify_single_from_mask() {
        let ok = Command::write_code_update_all(ChannelMask::from_bits(0b0001_0000), 1);
        assert_eq!(ok.classify().unwrap(), Expansion::SingleFromMask);

        let none = Command::write_code_update_all(ChannelMask::EMPTY, 1);
        assert!(none.classify().is_err());

        let two = Command::write_code_update_all(ChannelMask::from_bits(0b0000_0011), 1);
        assert!(two.classify().is_err());
    }

    #[test]
    fn test_payload_masking() {
        assert_eq!(Command::config(0xFFFF).payload, 0x0003);
        assert_eq!(Command::monitor_mux(0xFFFF).payload, 0x001F);
        assert_eq!(Command::toggle_select(0xFFFF).payload, 0x00FF);
        assert_eq!(Command::global_toggle(true).payload, 0x0001);
    }
}
