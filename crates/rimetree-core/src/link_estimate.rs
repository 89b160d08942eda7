//! ETX link estimation
//!
//! Each neighbor carries a [`LinkEstimate`]: a circular window of the last
//! [`ETX_HISTORY_WINDOW`] per-packet transmission costs. The ETX is derived
//! from the window on every read and is never stored.
//!
//! A moving window bounds the influence of one bad sample to `1/N` of the
//! estimate and forgets transient interference after `N` transmissions.

use serde::{Deserialize, Serialize};

/// Fixed-point scale of ETX values and route metrics
pub const LINK_ESTIMATE_UNIT: u16 = 8;

/// Number of transmissions remembered per link
pub const ETX_HISTORY_WINDOW: usize = 16;

/// Cost seeded into every slot of a new link
pub const INITIAL_LINK_ESTIMATE: u8 = 4;

/// Per-link transmission history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEstimate {
    history: [u8; ETX_HISTORY_WINDOW],
    cursor: usize,
}

impl LinkEstimate {
    /// Create a pessimistically seeded estimate
    pub fn new() -> Self {
        Self {
            history: [INITIAL_LINK_ESTIMATE; ETX_HISTORY_WINDOW],
            cursor: 0,
        }
    }

    /// Refill the history with the pessimistic seed and rewind the cursor
    pub fn reset(&mut self) {
        self.history = [INITIAL_LINK_ESTIMATE; ETX_HISTORY_WINDOW];
        self.cursor = 0;
    }

    /// Record an acknowledged packet that needed `attempts` transmissions
    pub fn record_success(&mut self, attempts: u8) {
        tracing::trace!(attempts, "link estimate: tx ok");
        self.push(attempts);
    }

    /// Record a packet that was never acknowledged after `attempts` transmissions
    ///
    /// Failures count double.
    pub fn record_failure(&mut self, attempts: u8) {
        tracing::trace!(attempts, "link estimate: tx failed");
        self.push(attempts.saturating_mul(2));
    }

    fn push(&mut self, cost: u8) {
        self.history[self.cursor] = cost;
        self.cursor = (self.cursor + 1) % ETX_HISTORY_WINDOW;
    }

    /// Scaled ETX: `UNIT * sum(history) / N`
    pub fn etx(&self) -> u16 {
        let sum: u32 = self.history.iter().map(|&c| c as u32).sum();
        let etx = (LINK_ESTIMATE_UNIT as u32 * sum) / ETX_HISTORY_WINDOW as u32;
        etx.min(u16::MAX as u32) as u16
    }

    /// ETX in transmissions (unscaled, for display)
    pub fn etx_f32(&self) -> f32 {
        self.etx() as f32 / LINK_ESTIMATE_UNIT as f32
    }

    /// Raw history window, oldest slot first from the cursor
    pub fn history(&self) -> impl Iterator<Item = u8> + '_ {
        self.history[self.cursor..]
            .iter()
            .chain(self.history[..self.cursor].iter())
            .copied()
    }
}

impl Default for LinkEstimate {
    fn default() -> Self {
        Self::new()
    }
}
