//! Signal-level contract of the external transfer engine.
//!
//! This trait abstracts the serializer that physically shifts frames in
//! and out of the device, enabling:
//! - Testability through mock implementations
//! - Flexibility to back the controller with SPI peripherals, bit-bang
//!   loops, or simulation models
//!
//! ## Contract
//!
//! - `start(word)` is a one-tick pulse; it must only be asserted while the
//!   engine is not busy, and the controller guarantees that.
//! - `busy()` is a level: true from the start pulse until completion.
//! - `take_done()` is the completion pulse: it yields the received word
//!   exactly once per transfer, on the tick the transfer completes.
//!
//! At most one transfer is ever in flight. There is no timeout on the
//! busy/done signals: an engine that never completes hangs the controller.
//! That risk is accepted and documented rather than mitigated here.

/// Polled transfer engine: start/busy/done with tx and rx words.
pub trait TransferEngine {
    /// Whether a transfer is in progress.
    fn busy(&self) -> bool;

    /// Begin shifting `word` out. Only called while not busy.
    fn start(&mut self, word: u32);

    /// Take the completion event, if a transfer finished since the last
    /// call. Yields the word received during that transfer.
    fn take_done(&mut self) -> Option<u32>;
}
