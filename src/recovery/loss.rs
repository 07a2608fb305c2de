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

use super::constants::{DELAY_THRESHOLD_MS, LOSS_REFRACTORY_MS};

/// The classification of a single ack.
///
/// `Suppressed` is distinct from `Clean`: a sequence gap or delay-excess was
/// observed, but the refractory window swallowed it, so it counts toward
/// neither the slow-start/AIMD growth rule nor a loss-triggered halving. It
/// is a deliberate no-op for window-sizing purposes — only its bookkeeping
/// (`next_expected_seq`, RTT/rate sampling upstream) still applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckClass {
    Clean,
    Suppressed,
    Loss,
}

impl AckClass {
    pub fn is_loss(self) -> bool {
        matches!(self, AckClass::Loss)
    }

    pub fn is_clean(self) -> bool {
        matches!(self, AckClass::Clean)
    }
}

/// Classifies acks as lossy or clean from sequence gaps and excessive
/// one-way delay, debounced by a refractory window so a single round trip's
/// worth of delayed acks cannot each independently declare a loss.
#[derive(Debug, Clone, Copy, Default)]
pub struct LossDetector {
    next_expected_seq: u64,
    last_loss_time_ms: u64,
}

impl LossDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_expected_seq(&self) -> u64 {
        self.next_expected_seq
    }

    pub fn last_loss_time_ms(&self) -> u64 {
        self.last_loss_time_ms
    }

    /// Classify one ack and update sequence tracking.
    ///
    /// The sequence-gap check runs against the *pre-update* expected
    /// sequence number; `next_expected_seq` itself always advances
    /// afterwards, regardless of the classification.
    pub fn on_ack(&mut self, ack_seq: u64, send_ts_ms: u64, ack_arrival_ts_ms: u64) -> AckClass {
        let stochastic_loss = ack_seq != self.next_expected_seq;
        let owd = ack_arrival_ts_ms.saturating_sub(send_ts_ms);
        let queue_full = owd > DELAY_THRESHOLD_MS;

        let raw_signal = stochastic_loss || queue_full;
        let refractory_elapsed =
            ack_arrival_ts_ms >= self.last_loss_time_ms.saturating_add(LOSS_REFRACTORY_MS);

        let class = if !raw_signal {
            AckClass::Clean
        } else if refractory_elapsed {
            AckClass::Loss
        } else {
            AckClass::Suppressed
        };

        if class.is_loss() {
            self.last_loss_time_ms = ack_arrival_ts_ms;
        }

        self.next_expected_seq = self.next_expected_seq.max(ack_seq + 1);

        class
    }
}
