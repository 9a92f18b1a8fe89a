//! Standalone DAC controller.
//!
//! Owns the transfer sequencer, echo verifier, reset-pulse generator and
//! alarm monitor, and exposes the command/status surface a command source
//! drives. One `tick` call advances every component exactly once; the
//! caller clocks the external engine alongside.

use crate::config::ControllerConfig;
use crate::controller::alarm::AlarmMonitor;
use crate::controller::echo::EchoVerifier;
use crate::controller::reset::ResetPulse;
use crate::controller::sequencer::{SeqOptions, TransferSequencer};
use crate::error::{DacError, Result};
use crate::protocol::command::Command;
use crate::xfer::engine::TransferEngine;

/// Standalone command sequencing and verification engine.
///
/// Accepts one logical command at a time, expands it into transfers,
/// verifies echoes, and manages the reset/alarm side-channels. For
/// automatic post-reset initialization use
/// [`AutoDacController`](crate::controller::autoinit::AutoDacController).
#[derive(Debug)]
pub struct DacController {
    cfg: ControllerConfig,
    seq: TransferSequencer,
    echo: EchoVerifier,
    reset: ResetPulse,
    alarm: AlarmMonitor,
    request: Option<Command>,
}

impl DacController {
    /// Create a controller from a validated configuration.
    pub fn new(cfg: ControllerConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            seq: TransferSequencer::new(SeqOptions::standalone(&cfg)),
            echo: EchoVerifier::new(),
            reset: ResetPulse::new(cfg.reset_pulse_ticks),
            alarm: AlarmMonitor::new(),
            request: None,
            cfg,
        })
    }

    /// The configuration this controller was built with. Wiring code uses
    /// it to set up the external engine (frame width in particular).
    pub fn config(&self) -> &ControllerConfig {
        &self.cfg
    }

    /// Submit a command for expansion on the next tick.
    ///
    /// # Errors
    ///
    /// Returns error if a command is already pending or being expanded; a
    /// new command is accepted strictly after the previous one completes.
    pub fn submit(&mut self, cmd: Command) -> Result<()> {
        if self.busy() {
            return Err(DacError::controller_busy());
        }
        self.request = Some(cmd);
        Ok(())
    }

    /// Request a reset pulse. Restarts the countdown if one is active.
    pub fn request_reset_pulse(&mut self) {
        self.reset.trigger();
    }

    /// Clear the sticky fault flags (echo mismatch and alarm latch).
    /// Idempotent.
    pub fn clear_errors(&mut self) {
        self.echo.clear_sticky();
        self.alarm.clear_sticky();
    }

    /// Advance every component one tick. `alarm_in` is the sampled level
    /// of the active-low alarm line.
    pub fn tick<E: TransferEngine>(&mut self, engine: &mut E, alarm_in: bool) {
        self.reset.tick();
        self.alarm.sample(alarm_in);
        let request = self.request.take();
        self.seq.tick(engine, &mut self.echo, request);
    }

    /// A command is pending or being expanded
    pub fn busy(&self) -> bool {
        self.seq.busy() || self.request.is_some()
    }

    /// One-tick pulse: a command completed this tick
    pub fn done(&self) -> bool {
        self.seq.done()
    }

    /// One-tick pulse: an illegal command completed with zero transfers
    pub fn illegal_command(&self) -> bool {
        self.seq.illegal()
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chmask;
    use crate::xfer::mock::MockEngine;

    fn controller() -> DacController {
        DacController::new(ControllerConfig::default()).unwrap()
    }

    fn run_to_done(ctrl: &mut DacController, engine: &mut MockEngine) {
        for _ in 0..200 {
            engine.tick();
            ctrl.tick(engine, true);
            if ctrl.done() {
                return;
            }
        }
        panic!("controller did not complete");
    }

    #[test]
    fn test_submit_while_busy_rejected() {
        let mut ctrl = controller();
        ctrl.submit(Command::update_all()).unwrap();
        assert!(ctrl.submit(Command::update_all()).is_err());
    }

    #[test]
    fn test_command_roundtrip() {
        let mut ctrl = controller();
        let mut engine = MockEngine::new();

        ctrl.submit(Command::write_code(chmask!(1), 0x4242)).unwrap();
        run_to_done(&mut ctrl, &mut engine);

        assert!(!ctrl.busy());
        // one real frame plus the flush no-op
        assert_eq!(engine.completed(), 2);
        assert!(!ctrl.echo_mismatch());

        // Accepts the next command after completion
        assert!(ctrl.submit(Command::update_all()).is_ok());
    }

    #[test]
    fn test_clear_errors_idempotent() {
        let mut ctrl = controller();
        ctrl.clear_errors();
        ctrl.clear_errors();
        assert!(!ctrl.echo_mismatch());
        assert!(!ctrl.alarm_sticky());
    }
}
