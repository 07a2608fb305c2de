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

use super::constants::RTT_ALPHA;

/// Smoothed and minimum round-trip time, derived from per-ack timestamps.
///
/// Every sample is folded in regardless of arrival order; the controller
/// does not assume acks arrive in sequence-number order, so this estimator
/// never rejects a sample.
#[derive(Debug, Clone, Copy)]
pub struct RttEstimator {
    smoothed_ms: u64,
    min_ms: u64,
}

impl Default for RttEstimator {
    fn default() -> Self {
        RttEstimator {
            smoothed_ms: 0,
            min_ms: u64::MAX,
        }
    }
}

impl RttEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Smoothed round-trip time in milliseconds, 0 before the first sample.
    pub fn smoothed_ms(&self) -> u64 {
        self.smoothed_ms
    }

    /// Minimum observed round-trip time in milliseconds, `u64::MAX` before
    /// the first sample.
    pub fn min_ms(&self) -> u64 {
        self.min_ms
    }

    /// Fold in one RTT sample: `ack_arrival_ts_ms - send_ts_ms`, saturating
    /// at zero if the clock appears to run backwards.
    pub fn on_sample(&mut self, send_ts_ms: u64, ack_arrival_ts_ms: u64) -> u64 {
        let sample = ack_arrival_ts_ms.saturating_sub(send_ts_ms);

        if self.smoothed_ms == 0 {
            self.smoothed_ms = sample;
        } else {
            let smoothed = RTT_ALPHA * sample as f64 + (1.0 - RTT_ALPHA) * self.smoothed_ms as f64;
            self.smoothed_ms = smoothed.round() as u64;
        }

        self.min_ms = self.min_ms.min(sample);

        sample
    }
}
