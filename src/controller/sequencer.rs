//! Per-message transfer sequencer.
//!
//! The sequencer turns one accepted [`Command`] into the ordered list of
//! physical transfers its expansion policy calls for, driving the external
//! engine one transfer at a time.
//!
//! ## State Machine
//!
//! ```text
//! Idle → Loading → Issuing → Awaiting → Deciding ─┬→ Loading (next frame)
//!   ↑                                             │
//!   └────────────── (completed) ←─────────────────┘
//! ```
//!
//! Each state is polled once per tick; the only waits are "engine not
//! busy" before issuing and "engine done" after. Completion collapses into
//! the tick that decides it: the done pulse rises and busy drops in the
//! same tick, which also lets an illegal command complete in the cycle it
//! is accepted.
//!
//! ## Flush transfers
//!
//! The echo of the last real frame can only be observed by sending one
//! more transfer, so a no-op flush frame may be appended per command. The
//! decision is taken on two distinct paths with different guards:
//!
//! - when a per-channel mask scan exhausts with no further set bit, the
//!   flush requires echo verification enabled *and* a prior transfer;
//! - after the last channel of a non-empty per-channel command, or after
//!   any non-per-channel command, the flush requires neither.
//!
//! The second path therefore appends a flush in orderings the first one
//! would not (observable with echo verification disabled). The
//! `flush_only_after_tx` option adds the prior-transfer requirement to the
//! second path as well; the default keeps the legacy asymmetry.

use crate::config::ControllerConfig;
use crate::controller::echo::EchoVerifier;
use crate::ctrl_log;
use crate::protocol::command::{Command, Expansion};
use crate::protocol::constants::LAST_CHANNEL;
use crate::protocol::frame::Frame;
use crate::xfer::engine::TransferEngine;

/// Sequencer behavior knobs, frozen at construction.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SeqOptions {
    /// Feed completions to the echo verifier
    pub echo_verify: bool,
    /// Append a trailing flush no-op per command
    pub append_flush: bool,
    /// Require a prior transfer on the post-last-channel flush path too
    pub flush_only_after_tx: bool,
    /// Forget the echo chain at the start of every command (standalone
    /// controller); the integrated controller runs the chain continuously
    pub reset_echo_per_command: bool,
}

impl SeqOptions {
    /// Options for the standalone controller variant.
    pub(crate) fn standalone(cfg: &ControllerConfig) -> Self {
        Self {
            echo_verify: cfg.echo_verify,
            append_flush: cfg.append_flush,
            flush_only_after_tx: cfg.flush_only_after_tx,
            reset_echo_per_command: true,
        }
    }

    /// Options for the integrated controller variant: the init sequencer
    /// issues its single flush explicitly, and run-time echoes are checked
    /// against whatever the next transfer returns.
    pub(crate) fn integrated(cfg: &ControllerConfig) -> Self {
        Self {
            echo_verify: cfg.echo_verify,
            append_flush: false,
            flush_only_after_tx: cfg.flush_only_after_tx,
            reset_echo_per_command: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Loading,
    Issuing,
    Awaiting,
    Deciding,
}

/// Drives the external transfer engine one transfer at a time, expanding a
/// single accepted command into its ordered frame list.
#[derive(Debug)]
pub(crate) struct TransferSequencer {
    opts: SeqOptions,
    phase: Phase,
    cmd: Command,
    expansion: Expansion,
    /// Per-channel scan cursor
    cursor: u8,
    /// One-shot expansions have built their frame
    one_shot_sent: bool,
    /// A flush no-op was appended for this command
    flushed: bool,
    /// Deciding owes Loading a flush frame
    flush_pending: bool,
    /// Frame to issue next (valid in Issuing)
    pending: Frame,
    /// Word of the transfer in flight (valid in Awaiting)
    in_flight: u32,
    busy: bool,
    done: bool,
    illegal: bool,
    last_tx: u32,
    last_rx: u32,
}

impl TransferSequencer {
    pub(crate) fn new(opts: SeqOptions) -> Self {
        Self {
            opts,
            phase: Phase::Idle,
            cmd: Command::no_op(),
            expansion: Expansion::Singleton,
            cursor: 0,
            one_shot_sent: false,
            flushed: false,
            flush_pending: false,
            pending: Frame::no_op(),
            in_flight: 0,
            busy: false,
            done: false,
            illegal: false,
            last_tx: 0,
            last_rx: 0,
        }
    }

    /// Advance one tick. `request` is sampled only in the idle state.
    pub(crate) fn tick<E: TransferEngine>(
        &mut self,
        engine: &mut E,
        echo: &mut EchoVerifier,
        request: Option<Command>,
    ) {
        self.done = false;
        self.illegal = false;

        match self.phase {
            Phase::Idle => {
                if let Some(cmd) = request {
                    self.accept(cmd, echo);
                }
            }
            Phase::Loading => self.load(echo),
            Phase::Issuing => {
                if !engine.busy() {
                    let word = self.pending.word();
                    engine.start(word);
                    self.in_flight = word;
                    self.phase = Phase::Awaiting;
                }
            }
            Phase::Awaiting => {
                if let Some(rx) = engine.take_done() {
                    self.last_tx = self.in_flight;
                    self.last_rx = rx;
                    if self.opts.echo_verify {
                        echo.on_completion(self.in_flight, rx);
                    }
                    self.phase = Phase::Deciding;
                }
            }
            Phase::Deciding => self.decide(echo),
        }
    }

    fn accept(&mut self, cmd: Command, echo: &mut EchoVerifier) {
        match cmd.classify() {
            Err(_) => {
                // Accepted to keep the source interface synchronous, but
                // no transfer is performed: completion and the illegal
                // flag rise in the same cycle.
                ctrl_log!(warn, "illegal command: mask must select one channel");
                self.illegal = true;
                self.done = true;
            }
            Ok(expansion) => {
                ctrl_log!(trace, "command accepted, mask {:#04x}", cmd.mask.bits());
                self.cmd = cmd;
                self.expansion = expansion;
                self.cursor = 0;
                self.one_shot_sent = false;
                self.flushed = false;
                self.flush_pending = false;
                self.busy = true;
                if self.opts.reset_echo_per_command {
                    echo.reset_chain();
                }
                self.phase = Phase::Loading;
            }
        }
    }

    /// Produce the next frame to send, per expansion policy.
    fn load(&mut self, echo: &EchoVerifier) {
        if self.flush_pending {
            self.flush_pending = false;
            self.emit_flush();
            return;
        }
        match self.expansion {
            Expansion::PerChannel => match self.cmd.mask.next_set(self.cursor) {
                Some(ch) => {
                    self.cursor = ch;
                    self.pending = self.cmd.frame_for(ch);
                    self.phase = Phase::Issuing;
                }
                None => {
                    // Exhausted scan: flush only if a transfer actually
                    // preceded it in this command.
                    if self.opts.echo_verify
                        && self.opts.append_flush
                        && echo.have_previous()
                        && !self.flushed
                    {
                        self.emit_flush();
                    } else {
                        self.finish();
                    }
                }
            },
            Expansion::Broadcast | Expansion::Singleton => {
                if self.one_shot_sent {
                    self.finish();
                } else {
                    self.one_shot_sent = true;
                    self.pending = self.cmd.frame_for(0);
                    self.phase = Phase::Issuing;
                }
            }
            Expansion::SingleFromMask => {
                if self.one_shot_sent {
                    self.finish();
                } else {
                    // classify() guaranteed exactly one set bit
                    let ch = self.cmd.mask.single_channel().unwrap_or(0);
                    self.one_shot_sent = true;
                    self.pending = self.cmd.frame_for(ch);
                    self.phase = Phase::Issuing;
                }
            }
        }
    }

    /// Decide what follows a completed transfer.
    fn decide(&mut self, echo: &EchoVerifier) {
        if self.expansion == Expansion::PerChannel && self.cursor < LAST_CHANNEL {
            self.cursor += 1;
            self.phase = Phase::Loading;
            return;
        }
        // Post-last-channel / one-shot path: no prior-transfer requirement
        // unless configured strict.
        let owed = self.opts.append_flush
            && !self.flushed
            && (!self.opts.flush_only_after_tx || echo.have_previous());
        if owed {
            self.flush_pending = true;
            self.phase = Phase::Loading;
        } else {
            self.finish();
        }
    }

    fn emit_flush(&mut self) {
        self.flushed = true;
        self.pending = Frame::no_op();
        self.phase = Phase::Issuing;
    }

    fn finish(&mut self) {
        self.busy = false;
        self.done = true;
        self.phase = Phase::Idle;
    }

    /// A command is being expanded or transferred
    pub(crate) fn busy(&self) -> bool {
        self.busy
    }

    /// One-tick pulse: the current command completed this tick
    pub(crate) fn done(&self) -> bool {
        self.done
    }

    /// One-tick pulse: an illegal command was accepted and completed with
    /// zero transfers this tick
    pub(crate) fn illegal(&self) -> bool {
        self.illegal
    }

    /// Word of the most recently completed transfer
    pub(crate) fn last_tx(&self) -> u32 {
        self.last_tx
    }

    /// Word received during the most recently completed transfer
    pub(crate) fn last_rx(&self) -> u32 {
        self.last_rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chmask;
    use crate::protocol::command::ChannelMask;
    use crate::xfer::mock::MockEngine;

    fn seq(opts: SeqOptions) -> (TransferSequencer, EchoVerifier, MockEngine) {
        (
            TransferSequencer::new(opts),
            EchoVerifier::new(),
            MockEngine::new(),
        )
    }

    fn run_to_done(
        seq: &mut TransferSequencer,
        echo: &mut EchoVerifier,
        engine: &mut MockEngine,
        cmd: Command,
    ) {
        let mut request = Some(cmd);
        for _ in 0..200 {
            engine.tick();
            seq.tick(engine, echo, request.take());
            if seq.done() {
                return;
            }
        }
        panic!("sequencer did not complete");
    }

    fn opts_no_flush() -> SeqOptions {
        SeqOptions {
            echo_verify: true,
            append_flush: false,
            flush_only_after_tx: false,
            reset_echo_per_command: true,
        }
    }

    fn opts_flush() -> SeqOptions {
        SeqOptions {
            append_flush: true,
            ..opts_no_flush()
        }
    }

    #[test]
    fn test_per_channel_order() {
        let (mut s, mut e, mut m) = seq(opts_no_flush());
        run_to_done(&mut s, &mut e, &mut m, Command::write_code(chmask!(0, 2), 0x1234));

        assert_eq!(m.sent(), &[0x0000_1234, 0x0002_1234]);
    }

    #[test]
    fn test_per_channel_full_mask() {
        let (mut s, mut e, mut m) = seq(opts_no_flush());
        run_to_done(&mut s, &mut e, &mut m, Command::update(ChannelMask::ALL));
        assert_eq!(m.completed(), 8);
        for (ch, word) in m.sent().iter().enumerate() {
            assert_eq!((word >> 16) & 0x0F, ch as u32);
        }
    }

    #[test]
    fn test_empty_mask_zero_transfers() {
        let (mut s, mut e, mut m) = seq(opts_flush());
        run_to_done(&mut s, &mut e, &mut m, Command::write_code(ChannelMask::EMPTY, 1));
        assert_eq!(m.completed(), 0);
        assert!(!s.illegal());
    }

    #[test]
    fn test_illegal_command_same_tick() {
        let (mut s, mut e, mut m) = seq(opts_flush());
        let bad = Command::write_code_update_all(chmask!(0, 1), 0);
        s.tick(&mut m, &mut e, Some(bad));
        assert!(s.done());
        assert!(s.illegal());
        assert!(!s.busy());
        assert_eq!(m.completed(), 0);
    }

    #[test]
    fn test_flush_appended_after_per_channel() {
        let (mut s, mut e, mut m) = seq(opts_flush());
        run_to_done(&mut s, &mut e, &mut m, Command::write_code(chmask!(0, 2), 0xAB));
        // two real frames plus the trailing no-op
        assert_eq!(m.completed(), 3);
        assert_eq!(*m.sent().last().unwrap(), Frame::no_op().word());
    }

    #[test]
    fn test_flush_appended_after_broadcast() {
        let (mut s, mut e, mut m) = seq(opts_flush());
        run_to_done(&mut s, &mut e, &mut m, Command::update_all());
        assert_eq!(m.completed(), 2);
        assert_eq!(*m.sent().last().unwrap(), Frame::no_op().word());
    }

    #[test]
    fn test_single_from_mask_addresses_set_bit() {
        let (mut s, mut e, mut m) = seq(opts_no_flush());
        run_to_done(
            &mut s,
            &mut e,
            &mut m,
            Command::write_code_update_all(chmask!(5), 0xCAFE),
        );
        assert_eq!(m.sent(), &[0x00E5_CAFE]);
    }

    #[test]
    fn test_dual_guard_asymmetry_echo_disabled() {
        // Echo verification off, flush on: the exhausted-scan path
        // suppresses the flush, the post-last-channel path does not.
        let opts = SeqOptions {
            echo_verify: false,
            ..opts_flush()
        };

        // Highest set bit below channel 7: scan exhausts, no flush.
        let (mut s, mut e, mut m) = seq(opts);
        run_to_done(&mut s, &mut e, &mut m, Command::write_code(chmask!(0), 1));
        assert_eq!(m.completed(), 1);

        // Bit 7 set: completion decides at the last channel, flush added.
        let (mut s, mut e, mut m) = seq(opts);
        run_to_done(&mut s, &mut e, &mut m, Command::write_code(chmask!(7), 1));
        assert_eq!(m.completed(), 2);
        assert_eq!(*m.sent().last().unwrap(), Frame::no_op().word());
    }

    #[test]
    fn test_strict_flush_guard_unifies_paths() {
        let opts = SeqOptions {
            echo_verify: false,
            flush_only_after_tx: true,
            ..opts_flush()
        };
        let (mut s, mut e, mut m) = seq(opts);
        run_to_done(&mut s, &mut e, &mut m, Command::write_code(chmask!(7), 1));
        // With the strict guard no flush is appended when echo never
        // recorded a transfer.
        assert_eq!(m.completed(), 1);
    }

    #[test]
    fn test_echo_chain_verified_through_flush() {
        let (mut s, mut e, mut m) = seq(opts_flush());
        run_to_done(&mut s, &mut e, &mut m, Command::write_code(chmask!(0, 1), 7));
        assert!(!e.mismatch());

        // Corrupt the echo of the last real frame of the next command;
        // the flush transfer exposes it.
        m.corrupt_rx_of(5); // transfers 3,4,5: frames ch0, ch1, flush
        run_to_done(&mut s, &mut e, &mut m, Command::write_code(chmask!(0, 1), 9));
        assert!(e.mismatch());
    }
}
