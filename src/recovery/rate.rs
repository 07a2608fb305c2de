// Copyright (C) 2018-2019, Cloudflare, Inc.
// All rights reserved.
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are
// met:
//
//     * Redistributions of source code must retain the above copyright notice,
//       this list of conditions and the following disclaimer.
//
//     * Redistributions in binary form must reproduce the above copyright
//       notice, this list of conditions and the following disclaimer in the
//       documentation and/or other materials provided with the distribution.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS
// IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO,
// THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR
// PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR
// CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL,
// EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO,
// PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE, DATA, OR
// PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF
// LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING
// NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE OF THIS
// SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

use super::constants::{RATE_MEAN_SMOOTH, RATE_VAR_SMOOTH, TICK_MS};
use super::Mode;

/// The outcome of a tick that actually measured something (the zero-duration
/// case is skipped entirely, see [`RateEstimator::maybe_tick`]).
#[derive(Debug, Clone, Copy)]
pub struct TickOutcome {
    /// Instantaneous delivered rate over the interval, in datagrams/ms.
    pub cur_rate: f64,
}

/// EWMA estimator of delivered rate (datagrams/ms) and its variance.
///
/// The "tick" is logical: it advances on ack arrival rather than on a
/// background timer, so the estimator is a pure function of the ack stream.
#[derive(Debug, Clone, Copy)]
pub struct RateEstimator {
    tick_seq: u64,
    tick_time_ms: u64,
    seq_high: u64,
    rate_mean: f64,
    rate_var: f64,
}

impl Default for RateEstimator {
    fn default() -> Self {
        RateEstimator {
            tick_seq: 0,
            tick_time_ms: 0,
            seq_high: 0,
            rate_mean: 0.0,
            rate_var: 0.0,
        }
    }
}

impl RateEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rate_mean(&self) -> f64 {
        self.rate_mean
    }

    pub fn rate_var(&self) -> f64 {
        self.rate_var
    }

    /// Record that `ack_seq` was observed, without necessarily ticking.
    /// Must be called once per ack before (or as part of) `maybe_tick`.
    fn observe(&mut self, ack_seq: u64) {
        self.seq_high = self.seq_high.max(ack_seq);
    }

    /// Fire a tick if either (i) enough wall-clock time has passed since the
    /// last tick, or (ii) this is the very first ack (`ack_seq == 0`).
    ///
    /// On a firing tick whose interval has nonzero duration, updates
    /// `rate_mean`/`rate_var` (probing in `SlowStart`, EWMA-smoothing in
    /// `Steady`) and resets the tick cursor, returning the measured rate. A
    /// firing tick with zero duration (the interval hasn't actually elapsed
    /// yet, e.g. the very first ack arrives before any time has passed) is
    /// skipped per the division-by-zero clamping rule: no state changes and
    /// no [`TickOutcome`], so the next eligible ack will retry against the
    /// same baseline.
    pub fn maybe_tick(&mut self, ack_seq: u64, recv_ts_ms: u64, mode: Mode) -> Option<TickOutcome> {
        self.observe(ack_seq);

        let should_tick = recv_ts_ms > self.tick_time_ms + TICK_MS || ack_seq == 0;
        if !should_tick {
            return None;
        }

        let elapsed_ms = recv_ts_ms.saturating_sub(self.tick_time_ms);
        if elapsed_ms == 0 {
            return None;
        }

        let delivered = self.seq_high.saturating_sub(self.tick_seq);
        let cur_rate = delivered as f64 / elapsed_ms as f64;

        match mode {
            Mode::SlowStart => {
                // A probe: treat the single sample as ground truth, with a
                // deliberately wide initial dispersion.
                self.rate_mean = cur_rate;
                self.rate_var = cur_rate.max(0.0).sqrt();
            },
            Mode::Steady => {
                self.rate_mean =
                    RATE_MEAN_SMOOTH * cur_rate + (1.0 - RATE_MEAN_SMOOTH) * self.rate_mean;
                let sqdev = (cur_rate - self.rate_mean).powi(2);
                self.rate_var = RATE_VAR_SMOOTH * sqdev + (1.0 - RATE_VAR_SMOOTH) * self.rate_var;
            },
        }

        self.tick_seq = self.seq_high;
        self.tick_time_ms = recv_ts_ms;

        Some(TickOutcome { cur_rate })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_ack_with_no_elapsed_time_skips_the_tick() {
        let mut rate = RateEstimator::new();
        let outcome = rate.maybe_tick(0, 0, Mode::SlowStart);
        assert!(outcome.is_none());
        assert_eq!(rate.rate_mean(), 0.0);
    }

    #[test]
    fn slow_start_tick_is_a_probe_with_wide_dispersion() {
        let mut rate = RateEstimator::new();
        rate.maybe_tick(0, 0, Mode::SlowStart); // skipped, elapsed == 0
        for seq in 1..=4u64 {
            rate.maybe_tick(seq, seq * 10, Mode::SlowStart);
        }
        // tick fires once recv_ts_ms > tick_time_ms + TICK_MS (20ms): at
        // seq=3 (ts=30) nothing yet (tick_time=0, 30 <= 20? no 30>20 fires)
        assert!(rate.rate_mean() > 0.0);
        assert_eq!(rate.rate_var(), rate.rate_mean().sqrt());
    }

    #[test]
    fn steady_tick_smooths_mean_and_variance() {
        let mut rate = RateEstimator::new();
        rate.maybe_tick(0, 0, Mode::Steady);
        let out = rate.maybe_tick(5, 25, Mode::Steady).unwrap();
        assert!((out.cur_rate - 5.0 / 25.0).abs() < 1e-9);
        assert!((rate.rate_mean() - 0.3 * out.cur_rate).abs() < 1e-9);
    }

    #[test]
    fn reordered_ack_seq_does_not_regress_seq_high() {
        let mut rate = RateEstimator::new();
        rate.observe(10);
        rate.observe(3); // reordered, arrives after a later seq
        assert_eq!(rate.seq_high, 10);
    }
}
