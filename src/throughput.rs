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

//! Receiver-side throughput tracking: an EWMA of delivered bits/sec over a
//! rolling measurement window, grounded in
//! `original_source/datagrump/receiver.cc`'s `ThroughputTracker`. Entirely
//! outside the congestion-control core's scope (spec.md §1).

const DEFAULT_ALPHA: f64 = 0.5;
const DEFAULT_MIN_TIME_DELTA_MS: u64 = 100;

/// EWMA of delivered bits/sec, updated once per measurement window.
#[derive(Debug, Clone, Copy)]
pub struct ThroughputTracker {
    alpha: f64,
    min_time_delta_ms: u64,

    bits_in_interval: u64,
    last_timestamp_ms: u64,

    ewma_throughput_bps: f64,
}

impl ThroughputTracker {
    pub fn new(start_timestamp_ms: u64) -> Self {
        Self::with_params(start_timestamp_ms, DEFAULT_ALPHA, DEFAULT_MIN_TIME_DELTA_MS)
    }

    pub fn with_params(start_timestamp_ms: u64, alpha: f64, min_time_delta_ms: u64) -> Self {
        ThroughputTracker {
            alpha,
            min_time_delta_ms,
            bits_in_interval: 0,
            last_timestamp_ms: start_timestamp_ms,
            ewma_throughput_bps: 0.0,
        }
    }

    pub fn throughput_bps(&self) -> f64 {
        self.ewma_throughput_bps
    }

    /// Fold in one delivered datagram's bits. Returns `Some` with the
    /// updated EWMA whenever a full measurement window elapses, `None`
    /// otherwise (the caller need not log every call).
    pub fn update(&mut self, bits_received: u64, timestamp_ms: u64) -> Option<f64> {
        self.bits_in_interval += bits_received;

        if timestamp_ms <= self.last_timestamp_ms + self.min_time_delta_ms {
            return None;
        }

        let elapsed_s =
            (timestamp_ms - self.last_timestamp_ms) as f64 / 1000.0;
        let cur_throughput_bps = self.bits_in_interval as f64 / elapsed_s;

        if self.ewma_throughput_bps == 0.0 {
            self.ewma_throughput_bps = cur_throughput_bps;
        } else {
            self.ewma_throughput_bps =
                self.alpha * cur_throughput_bps + (1.0 - self.alpha) * self.ewma_throughput_bps;
        }

        self.bits_in_interval = 0;
        self.last_timestamp_ms = timestamp_ms;

        Some(self.ewma_throughput_bps)
    }
}

pub fn bps_to_mbps(bps: f64) -> f64 {
    (bps / 1024.0) / 1024.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_update_within_the_measurement_window() {
        let mut tracker = ThroughputTracker::new(0);
        assert!(tracker.update(11392, 50).is_none());
        assert_eq!(tracker.throughput_bps(), 0.0);
    }

    #[test]
    fn first_window_initializes_the_ewma_directly() {
        let mut tracker = ThroughputTracker::new(0);
        // 11392 bits (1424-byte payload) over 150ms -> window fires.
        let throughput = tracker.update(11392, 150).unwrap();
        let expected = 11392.0 / 0.150;
        assert!((throughput - expected).abs() < 1e-6);
    }

    #[test]
    fn later_windows_are_ewma_smoothed() {
        let mut tracker = ThroughputTracker::new(0);
        tracker.update(11392, 150).unwrap();
        let first = tracker.throughput_bps();

        let second = tracker.update(11392, 300).unwrap();
        let cur = 11392.0 / 0.150;
        let expected = 0.5 * cur + 0.5 * first;
        assert!((second - expected).abs() < 1e-6);
    }

    #[test]
    fn bits_accumulate_across_sub_window_updates() {
        let mut tracker = ThroughputTracker::new(0);
        assert!(tracker.update(11392, 40).is_none());
        assert!(tracker.update(11392, 80).is_none());
        let throughput = tracker.update(11392, 150).unwrap();
        let expected = (11392.0 * 3.0) / 0.150;
        assert!((throughput - expected).abs() < 1e-6);
    }
}
