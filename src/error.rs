//! Error types for controller operations.
//!
//! This module provides structured error types with backtraces (when std is
//! enabled) and helper methods for error information.
//!
//! Errors cover the synchronous API surface only: malformed constructor
//! arguments, submitting while busy, invalid configuration. Device-side
//! faults (echo mismatch, range violations, alarm, failed initialization)
//! are sticky status flags on the controllers, not `Err` values — the
//! engine degrades by flagging, never by stalling.

use core::fmt;

#[cfg(feature = "std")]
use std::backtrace::Backtrace;

/// Result type alias for controller operations.
pub type Result<T> = core::result::Result<T, DacError>;

// =============================================================================
// Error Kind Enums (Internal)
// =============================================================================

/// Command error variants (internal)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum CommandErrorKind {
    ChannelOutOfRange,
    MaskNotSingle,
    ControllerBusy,
}

/// Configuration error variants (internal)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum ConfigErrorKind {
    ZeroSpanRange,
    AllowedRangeTooWide,
    ReferenceCodesInverted,
}

// =============================================================================
// Main Error Type
// =============================================================================

/// Controller error types.
///
/// This is the main error type returned by the synchronous API.
/// It contains a backtrace (when the std feature is enabled) and detailed
/// error information through helper methods.
// Backtrace has no defmt::Format impl, so the derive is limited to no-std builds
#[derive(Debug)]
#[cfg_attr(all(feature = "defmt", not(feature = "std")), derive(defmt::Format))]
pub enum DacError {
    /// Command construction or submission errors
    Command(CommandError),
    /// Configuration validation errors
    Config(ConfigError),
}

// =============================================================================
// Structured Error Types
// =============================================================================

/// Command error with optional backtrace
#[derive(Debug)]
#[cfg_attr(all(feature = "defmt", not(feature = "std")), derive(defmt::Format))]
pub struct CommandError {
    kind: CommandErrorKind,
    #[cfg(feature = "std")]
    backtrace: Backtrace,
}

impl CommandError {
    pub(crate) fn new(kind: CommandErrorKind) -> Self {
        Self {
            kind,
            #[cfg(feature = "std")]
            backtrace: Backtrace::capture(),
        }
    }

    /// Check if a channel index was outside 0..=7
    pub fn is_channel_out_of_range(&self) -> bool {
        matches!(self.kind, CommandErrorKind::ChannelOutOfRange)
    }

    /// Check if a mask that must select exactly one channel did not
    pub fn is_mask_not_single(&self) -> bool {
        matches!(self.kind, CommandErrorKind::MaskNotSingle)
    }

    /// Check if the controller refused a submission because it was busy
    pub fn is_controller_busy(&self) -> bool {
        matches!(self.kind, CommandErrorKind::ControllerBusy)
    }
}

/// Configuration error with optional backtrace
#[derive(Debug)]
#[cfg_attr(all(feature = "defmt", not(feature = "std")), derive(defmt::Format))]
pub struct ConfigError {
    kind: ConfigErrorKind,
    #[cfg(feature = "std")]
    backtrace: Backtrace,
}

impl ConfigError {
    pub(crate) fn new(kind: ConfigErrorKind) -> Self {
        Self {
            kind,
            #[cfg(feature = "std")]
            backtrace: Backtrace::capture(),
        }
    }

    /// Check if the configured span range was zero
    pub fn is_zero_span_range(&self) -> bool {
        matches!(self.kind, ConfigErrorKind::ZeroSpanRange)
    }

    /// Check if the allowed range exceeded the span range
    pub fn is_allowed_range_too_wide(&self) -> bool {
        matches!(self.kind, ConfigErrorKind::AllowedRangeTooWide)
    }

    /// Check if the reference codes were not ordered negFS < zero < posFS
    pub fn is_reference_codes_inverted(&self) -> bool {
        matches!(self.kind, ConfigErrorKind::ReferenceCodesInverted)
    }
}

// =============================================================================
// Convenience Constructors for DacError
// =============================================================================

impl DacError {
    // Command errors (const: usable from const constructors and classify)
    #[inline]
    pub(crate) const fn channel_out_of_range() -> Self {
        Self::Command(CommandError { kind: CommandErrorKind::ChannelOutOfRange, #[cfg(feature = "std")] backtrace: Backtrace::disabled() })
    }

    #[inline]
    pub(crate) const fn mask_not_single() -> Self {
        Self::Command(CommandError { kind: CommandErrorKind::MaskNotSingle, #[cfg(feature = "std")] backtrace: Backtrace::disabled() })
    }

    pub(crate) fn controller_busy() -> Self {
        Self::Command(CommandError::new(CommandErrorKind::ControllerBusy))
    }

    // Configuration errors
    pub(crate) fn zero_span_range() -> Self {
        Self::Config(ConfigError::new(ConfigErrorKind::ZeroSpanRange))
    }

    pub(crate) fn allowed_range_too_wide() -> Self {
        Self::Config(ConfigError::new(ConfigErrorKind::AllowedRangeTooWide))
    }

    pub(crate) fn reference_codes_inverted() -> Self {
        Self::Config(ConfigError::new(ConfigErrorKind::ReferenceCodesInverted))
    }
}

// =============================================================================
// Display Implementation
// =============================================================================

impl fmt::Display for DacError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DacError::Command(e) => write!(f, "Command error: {:?}", e.kind),
            DacError::Config(e) => write!(f, "Configuration error: {:?}", e.kind),
        }
    }
}

// Implement std::error::Error for std-based applications
#[cfg(feature = "std")]
impl std::error::Error for DacError {}
