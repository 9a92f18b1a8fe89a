//! Convenience macros for working with channel masks.
//!
//! This module provides declarative macros that simplify common controller
//! operations and make code more readable and concise.

/// Creates a [`ChannelMask`](crate::protocol::command::ChannelMask) from a
/// list of channel indices.
///
/// # Syntax
///
/// ```text
/// chmask!(ch, ch, ...)
/// ```
///
/// Where each `ch` is a channel index 0-7.
///
/// # Examples
///
/// ```
/// use ltc266x_ctrl::{chmask, Command};
///
/// // Channels 0 and 2
/// let mask = chmask!(0, 2);
/// assert_eq!(mask.bits(), 0b0000_0101);
///
/// // Use in command construction
/// let cmd = Command::write_code(chmask!(0, 2, 7), 0x8000);
/// ```
///
/// # Compile-Time Validation
///
/// The macro validates channel indices at compile time:
///
/// ```compile_fail
/// use ltc266x_ctrl::chmask;
///
/// // This will fail to compile: channel > 7
/// let mask = chmask!(8);
/// ```
#[macro_export]
macro_rules! chmask {
    ($($ch:literal),+ $(,)?) => {{
        // Compile-time validation
        const _: () = {
            $(
                if $ch > 7 {
                    panic!("Channel index must be 0-7");
                }
            )+
        };
        $crate::protocol::command::ChannelMask::from_bits(0u8 $(| (1u8 << $ch))+)
    }};
}
