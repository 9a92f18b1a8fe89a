//! Integrated controller with automatic post-reset initialization.
//!
//! After every reset the device loses its configuration and span settings,
//! so this controller walks a fixed bring-up sequence before admitting
//! run-time traffic: one configuration frame (internal reference on,
//! thermal shutdown on), one soft-span frame per channel, and one flush
//! no-op whose completion exposes the last span frame's echo. If any echo
//! mismatched during the attempt, the sequence restarts — forever when the
//! retry budget is 0, otherwise until the budget runs out, after which the
//! controller flags init-failed but keeps accepting run-time writes.
//!
//! Run-time writes pass through a single-entry pending slot and an
//! output-range guard; out-of-range codes are dropped and latch a sticky
//! flag. Run mode appends no flush transfers — a write's echo is checked
//! against whatever the next transfer returns.

use crate::config::ControllerConfig;
use crate::controller::alarm::AlarmMonitor;
use crate::controller::echo::EchoVerifier;
use crate::controller::reset::ResetPulse;
use crate::controller::sequencer::{SeqOptions, TransferSequencer};
use crate::ctrl_log;
use crate::error::Result;
use crate::protocol::command::{Channel, ChannelMask, Command};
use crate::protocol::constants::{CommandCode, INIT_CONFIG_WORD, LAST_CHANNEL};
use crate::xfer::engine::TransferEngine;

/// Initialization phases.
///
/// Which step just finished is decided from the command nibble of the
/// previously transmitted frame, not from a separate step counter; the
/// phase tracks what to issue next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitPhase {
    /// Entry point: wait out the reset pulse and any in-flight transfer
    Reset,
    /// Issue the configuration frame
    SendConfig,
    /// Wait for the configuration frame to complete
    AwaitConfig,
    /// Issue the soft-span frame for the cursor channel
    SendSpan,
    /// Wait for the span frame to complete
    AwaitSpan,
    /// Advance the channel cursor or move on to the flush
    NextOrFlush,
    /// Issue the trailing flush no-op
    FlushNoop,
    /// Wait for the flush to complete, then judge the attempt
    AwaitFlush,
    /// Initialization settled (ok or failed); run-time traffic flows
    RunIdle,
}

/// Single-entry buffer for run-time writes. A write attempt while the
/// slot is occupied drops the new write, not the old one.
#[derive(Debug, Default)]
struct PendingSlot {
    valid: bool,
    channel: u8,
    code: u16,
}

/// Integrated controller: auto-initialization, retry, and range-guarded
/// run-time writes on top of the shared transfer sequencer.
#[derive(Debug)]
pub struct AutoDacController {
    cfg: ControllerConfig,
    seq: TransferSequencer,
    echo: EchoVerifier,
    reset: ResetPulse,
    alarm: AlarmMonitor,
    phase: InitPhase,
    cursor: u8,
    retries_left: u8,
    init_ok: bool,
    init_failed: bool,
    configured: bool,
    range_error: bool,
    pending: PendingSlot,
}

impl AutoDacController {
    /// Create a controller from a validated configuration. Starts in the
    /// `Reset` phase and initializes the device as soon as it is ticked.
    pub fn new(cfg: ControllerConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            seq: TransferSequencer::new(SeqOptions::integrated(&cfg)),
            echo: EchoVerifier::new(),
            reset: ResetPulse::new(cfg.reset_pulse_ticks),
            alarm: AlarmMonitor::new(),
            phase: InitPhase::Reset,
            cursor: 0,
            retries_left: cfg.init_retry_max,
            init_ok: false,
            init_failed: false,
            configured: false,
            range_error: false,
            pending: PendingSlot::default(),
            cfg,
        })
    }

    /// The configuration this controller was built with. Wiring code uses
    /// it to set up the external engine (frame width in particular).
    pub fn config(&self) -> &ControllerConfig {
        &self.cfg
    }

    /// Offer a run-time write. Returns whether the pending slot took it;
    /// a write while the slot is occupied is dropped.
    pub fn write_channel(&mut self, channel: Channel, code: u16) -> bool {
        if self.pending.valid {
            return false;
        }
        self.pending = PendingSlot {
            valid: true,
            channel: channel.index(),
            code,
        };
        true
    }

    /// Request a reset pulse and restart initialization. Any pending
    /// run-time write is abandoned; a transfer already in flight still
    /// completes through the sequencer.
    pub fn request_reset_pulse(&mut self) {
        self.reset.trigger();
        self.pending.valid = false;
        self.enter_reset(true);
    }

    /// Restart initialization without pulsing the reset line.
    pub fn request_reinit(&mut self) {
        self.pending.valid = false;
        self.enter_reset(true);
    }

    /// Clear every sticky fault flag (echo mismatch, alarm latch, range
    /// error, init-failed). Idempotent.
    pub fn clear_errors(&mut self) {
        self.echo.clear_sticky();
        self.alarm.clear_sticky();
        self.range_error = false;
        self.init_failed = false;
    }

    /// Advance every component one tick. `alarm_in` is the sampled level
    /// of the active-low alarm line.
    pub fn tick<E: TransferEngine>(&mut self, engine: &mut E, alarm_in: bool) {
        self.reset.tick();
        self.alarm.sample(alarm_in);
        // The phase machine reads the sequencer pulses of the previous
        // tick and may hand it a command for this one.
        let request = self.step();
        self.seq.tick(engine, &mut self.echo, request);
    }

    fn step(&mut self) -> Option<Command> {
        match self.phase {
            InitPhase::Reset => {
                if !self.reset.active() && !self.seq.busy() {
                    // An abandoned transfer that completed while waiting
                    // must not seed the verification chain across the
                    // device reset.
                    self.echo.reset_chain();
                    self.phase = InitPhase::SendConfig;
                }
                None
            }
            InitPhase::SendConfig => {
                self.phase = InitPhase::AwaitConfig;
                Some(Command::config(INIT_CONFIG_WORD))
            }
            InitPhase::AwaitConfig => {
                if self.seq.done() && self.last_command() == Some(CommandCode::Config) {
                    self.cursor = 0;
                    self.phase = InitPhase::SendSpan;
                }
                None
            }
            InitPhase::SendSpan => {
                self.phase = InitPhase::AwaitSpan;
                Some(Command::write_span(
                    ChannelMask::from_bits(1 << self.cursor),
                    self.cfg.soft_span,
                ))
            }
            InitPhase::AwaitSpan => {
                if self.seq.done() && self.last_command() == Some(CommandCode::WriteSpanN) {
                    self.phase = InitPhase::NextOrFlush;
                }
                None
            }
            InitPhase::NextOrFlush => {
                if self.cursor < LAST_CHANNEL {
                    self.cursor += 1;
                    self.phase = InitPhase::SendSpan;
                } else {
                    self.phase = InitPhase::FlushNoop;
                }
                None
            }
            InitPhase::FlushNoop => {
                self.phase = InitPhase::AwaitFlush;
                Some(Command::no_op())
            }
            InitPhase::AwaitFlush => {
                if self.seq.done() && self.last_command() == Some(CommandCode::NoOp) {
                    self.judge_attempt();
                }
                None
            }
            InitPhase::RunIdle => self.forward_pending(),
        }
    }

    /// The flush completed: pass or retry this attempt.
    fn judge_attempt(&mut self) {
        if !self.echo.mismatch() {
            ctrl_log!(info, "initialization verified");
            self.init_ok = true;
            self.configured = true;
            self.phase = InitPhase::RunIdle;
        } else if self.cfg.init_retry_max == 0 {
            ctrl_log!(warn, "initialization mismatch, retrying");
            self.enter_reset(false);
        } else if self.retries_left > 0 {
            self.retries_left -= 1;
            ctrl_log!(
                warn,
                "initialization mismatch, retrying ({} left)",
                self.retries_left
            );
            self.enter_reset(false);
        } else {
            ctrl_log!(error, "initialization failed, retries exhausted");
            self.init_failed = true;
            self.phase = InitPhase::RunIdle;
        }
    }

    /// Forward the pending write through the range guard once the shared
    /// sequencer is free.
    fn forward_pending(&mut self) -> Option<Command> {
        if !self.pending.valid || self.seq.busy() {
            return None;
        }
        self.pending.valid = false;
        let (channel, code) = (self.pending.channel, self.pending.code);
        if !self.code_in_range(code) {
            ctrl_log!(warn, "code {:#06x} outside allowed range, dropped", code);
            self.range_error = true;
            return None;
        }
        Some(Command::write_code_update(
            ChannelMask::from_bits(1 << channel),
            code,
        ))
    }

    /// Whether a run-time code lies within the configured window around
    /// mid-scale.
    fn code_in_range(&self, code: u16) -> bool {
        let delta = self.cfg.allowed_delta_code();
        let zero = u32::from(self.cfg.code_zero);
        let code = u32::from(code);
        code >= zero.saturating_sub(delta) && code <= zero + delta
    }

    /// Restart the initialization sequence. Retry loop-backs keep the
    /// remaining budget; external entries (power-up, reset pulse, re-init
    /// request) reload it from configuration.
    fn enter_reset(&mut self, reload_budget: bool) {
        self.phase = InitPhase::Reset;
        self.cursor = 0;
        self.init_ok = false;
        self.init_failed = false;
        self.configured = false;
        self.echo.clear_sticky();
        self.echo.reset_chain();
        if reload_budget {
            self.retries_left = self.cfg.init_retry_max;
        }
    }

    /// Command nibble of the most recently transmitted frame.
    fn last_command(&self) -> Option<CommandCode> {
        CommandCode::from_bits(((self.seq.last_tx() >> 20) & 0x0F) as u8)
    }

    /// Current initialization phase
    pub fn init_phase(&self) -> InitPhase {
        self.phase
    }

    /// Initialization completed with every echo verified
    pub fn init_ok(&self) -> bool {
        self.init_ok
    }

    /// Sticky: the retry budget ran out without a verified attempt
    pub fn init_failed(&self) -> bool {
        self.init_failed
    }

    /// The device configuration and spans are known good
    pub fn configured(&self) -> bool {
        self.configured
    }

    /// Sticky: a run-time code was dropped by the range guard
    pub fn range_error(&self) -> bool {
        self.range_error
    }

    /// A transfer or pending write is outstanding
    pub fn busy(&self) -> bool {
        self.seq.busy() || self.pending.valid
    }

    /// One-tick pulse: a command completed through the sequencer this tick
    pub fn command_done(&self) -> bool {
        self.seq.done()
    }

    /// Sticky echo-mismatch flag
    pub fn echo_mismatch(&self) -> bool {
        self.echo.mismatch()
    }

    /// Expected word latched at the most recent verified completion
    pub fn last_expected(&self) -> u32 {
        self.echo.last_expected()
    }

    /// Received word latched at the most recent verified completion
    pub fn last_received(&self) -> u32 {
        self.echo.last_received()
    }

    /// Word of the most recently completed transfer (debug)
    pub fn last_tx(&self) -> u32 {
        self.seq.last_tx()
    }

    /// Word received during the most recently completed transfer (debug)
    pub fn last_rx(&self) -> u32 {
        self.seq.last_rx()
    }

    /// One-tick pulse: the alarm line fell this tick
    pub fn alarm_event(&self) -> bool {
        self.alarm.event()
    }

    /// Sticky alarm latch
    pub fn alarm_sticky(&self) -> bool {
        self.alarm.sticky()
    }

    /// Whether the reset pulse is counting this tick
    pub fn reset_active(&self) -> bool {
        self.reset.active()
    }

    /// Level of the physical active-low reset line
    pub fn reset_n(&self) -> bool {
        self.reset.line_n()
    }
}
