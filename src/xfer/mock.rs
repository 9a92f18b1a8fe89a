//! Mock transfer engine for testing.
//!
//! This module provides a mock implementation of [`TransferEngine`] that
//! reproduces the device's serial behavior without hardware: while frame
//! *k* is shifted out, the word shifted back in is frame *k−1* — the
//! shift-register echo the verification chain is built around.
//!
//! ## Example
//!
//! ```rust
//! use ltc266x_ctrl::{MockEngine, TransferEngine};
//!
//! let mut engine = MockEngine::new();
//! engine.corrupt_rx_of(1); // flip a bit in the rx word of transfer 1
//!
//! engine.start(0x0030_0000);
//! engine.tick();
//! assert_eq!(engine.take_done(), Some(0)); // power-on residue
//!
//! engine.start(0x00F0_0000);
//! engine.tick();
//! // Echo of the previous word, corrupted per the script
//! assert_eq!(engine.take_done(), Some(0x0030_0000 ^ 1));
//!
//! assert_eq!(engine.sent(), &[0x0030_0000, 0x00F0_0000]);
//! ```

use heapless::Vec;

use crate::xfer::engine::TransferEngine;

/// Capacity of the transmitted-word log
const SENT_LOG_CAPACITY: usize = 128;

/// Capacity of the corruption script
const CORRUPT_CAPACITY: usize = 16;

/// Bit flipped in a corrupted rx word
const CORRUPT_FLIP: u32 = 1;

/// Mock transfer engine with shift-register echo semantics.
///
/// Behavior per transfer:
/// - `start(word)` latches the word and raises busy for the configured
///   latency (in ticks).
/// - On completion the rx word is the *previous* transfer's tx word
///   (power-on residue for the very first transfer), with a bit flipped
///   when the transfer index is in the corruption script.
///
/// All transmitted words are logged for inspection.
#[derive(Debug, Default)]
pub struct MockEngine {
    latency: u8,
    countdown: u8,
    busy: bool,
    done: Option<u32>,
    /// Echo register: tx word of the previous transfer
    shift: u32,
    current_tx: u32,
    completed: u32,
    sent: Vec<u32, SENT_LOG_CAPACITY>,
    corrupt: Vec<u32, CORRUPT_CAPACITY>,
}

impl MockEngine {
    /// Create a mock engine with zero extra latency (a transfer completes
    /// on the first tick after its start pulse).
    pub fn new() -> Self {
        Self::default()
    }

    /// Extra ticks a transfer stays busy before completing.
    pub fn set_latency(&mut self, ticks: u8) {
        self.latency = ticks;
    }

    /// Flip a bit in the rx word of the transfer with the given 0-based
    /// index. The rx word of transfer *k* is the echo of transfer *k−1*,
    /// so corrupting index `k` breaks the verification of frame `k−1`.
    pub fn corrupt_rx_of(&mut self, transfer_index: u32) {
        self.corrupt
            .push(transfer_index)
            .expect("corruption script full");
    }

    /// Advance the engine by one tick.
    pub fn tick(&mut self) {
        if !self.busy {
            return;
        }
        if self.countdown > 0 {
            self.countdown -= 1;
            return;
        }
        let mut rx = self.shift;
        if self.corrupt.contains(&self.completed) {
            rx ^= CORRUPT_FLIP;
        }
        self.shift = self.current_tx;
        self.completed += 1;
        self.done = Some(rx);
        self.busy = false;
    }

    /// All words transmitted so far, in order.
    pub fn sent(&self) -> &[u32] {
        &self.sent
    }

    /// Number of completed transfers.
    pub fn completed(&self) -> u32 {
        self.completed
    }
}

impl TransferEngine for MockEngine {
    fn busy(&self) -> bool {
        self.busy
    }

    fn start(&mut self, word: u32) {
        debug_assert!(!self.busy, "start pulse while busy");
        self.busy = true;
        self.countdown = self.latency;
        self.current_tx = word;
        self.sent.push(word).expect("sent log full");
    }

    fn take_done(&mut self) -> Option<u32> {
        self.done.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_is_previous_word() {
        let mut engine = MockEngine::new();

        engine.start(0xAA);
        engine.tick();
        // First transfer returns power-on residue
        assert_eq!(engine.take_done(), Some(0));

        engine.start(0xBB);
        engine.tick();
        assert_eq!(engine.take_done(), Some(0xAA));

        engine.start(0xCC);
        engine.tick();
        assert_eq!(engine.take_done(), Some(0xBB));
    }

    #[test]
    fn test_latency_delays_completion() {
        let mut engine = MockEngine::new();
        engine.set_latency(2);

        engine.start(0x11);
        engine.tick();
        assert!(engine.busy());
        assert_eq!(engine.take_done(), None);
        engine.tick();
        assert!(engine.busy());
        engine.tick();
        assert!(!engine.busy());
        assert_eq!(engine.take_done(), Some(0));
    }

    #[test]
    fn test_done_consumed_once() {
        let mut engine = MockEngine::new();
        engine.start(0x22);
        engine.tick();
        assert!(engine.take_done().is_some());
        assert_eq!(engine.take_done(), None);
    }

    #[test]
    fn test_corruption_script() {
        let mut engine = MockEngine::new();
        engine.corrupt_rx_of(1);

        engine.start(0xA0);
        engine.tick();
        assert_eq!(engine.take_done(), Some(0));

        engine.start(0xB0);
        engine.tick();
        // Echo of 0xA0, corrupted
        assert_eq!(engine.take_done(), Some(0xA0 ^ 1));

        engine.start(0xC0);
        engine.tick();
        // Clean again
        assert_eq!(engine.take_done(), Some(0xB0));
    }

    #[test]
    fn test_sent_log() {
        let mut engine = MockEngine::new();
        engine.start(1);
        engine.tick();
        engine.take_done();
        engine.start(2);
        engine.tick();
        assert_eq!(engine.sent(), &[1, 2]);
        assert_eq!(engine.completed(), 2);
    }
}
