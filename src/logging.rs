//! Unified Logging Macros
//!
//! This module provides a unified logging interface that automatically
//! selects between `log::` and `defmt::` based on the active feature flags,
//! and compiles to nothing when neither backend is enabled.
//!
//! # Usage
//!
//! ```rust
//! use ltc266x_ctrl::ctrl_log;
//!
//! let word = 0x00F0_0000u32;
//! ctrl_log!(info, "Initialization complete");
//! ctrl_log!(debug, "Issued frame {:#08x}", word);
//! ctrl_log!(warn, "Echo mismatch latched");
//! ```
//!
//! # Feature Flags
//!
//! - `log` - Uses the `log::` crate (host-side debugging)
//! - `defmt` - Uses `defmt::` (more efficient for embedded targets)
//! - Neither - Format arguments are type-checked but nothing is emitted

/// Unified logging macro - selects log:: or defmt:: based on features
#[macro_export]
#[cfg(feature = "log")]
macro_rules! ctrl_log {
    (info, $($arg:tt)*) => { log::info!($($arg)*) };
    (debug, $($arg:tt)*) => { log::debug!($($arg)*) };
    (warn, $($arg:tt)*) => { log::warn!($($arg)*) };
    (error, $($arg:tt)*) => { log::error!($($arg)*) };
    (trace, $($arg:tt)*) => { log::trace!($($arg)*) };
}

#[macro_export]
#[cfg(all(feature = "defmt", not(feature = "log")))]
macro_rules! ctrl_log {
    (info, $($arg:tt)*) => { defmt::info!($($arg)*) };
    (debug, $($arg:tt)*) => { defmt::debug!($($arg)*) };
    (warn, $($arg:tt)*) => { defmt::warn!($($arg)*) };
    (error, $($arg:tt)*) => { defmt::error!($($arg)*) };
    (trace, $($arg:tt)*) => { defmt::trace!($($arg)*) };
}

#[macro_export]
#[cfg(not(any(feature = "defmt", feature = "log")))]
macro_rules! ctrl_log {
    ($level:ident, $($arg:tt)*) => {{
        let _ = core::format_args!($($arg)*);
    }};
}
