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

//! The congestion-control core: a single [`Controller`] driven by a sender's
//! event loop on every ack and idle timeout.
//!
//! The controller composes four leaf subcomponents — [`rtt::RttEstimator`],
//! [`rate::RateEstimator`], [`loss::LossDetector`], and the slow-start /
//! steady-state machine implemented directly on [`Controller`] — rather than
//! expressing the two steady-state strategies as trait objects. `Variant` is
//! a plain sum type dispatched once per ack; the two variants' state is a
//! disjoint subset of [`Controller`]'s fields, and the unused half simply
//! stays at its initial value.

pub mod congestion;
pub mod constants;
pub mod loss;
pub mod rate;
pub mod rtt;

use std::fmt;
use std::str::FromStr;

use self::constants::MIN_CWND;
use self::constants::SLOWSTART_RTT_MS;
use self::constants::TIMEOUT_MS;
use self::loss::AckClass;
use self::loss::LossDetector;
use self::rate::RateEstimator;
use self::rtt::RttEstimator;

/// Slow-start probes for capacity with an additive +1 per clean ack; steady
/// state hands sizing over to the configured [`Variant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    SlowStart,
    Steady,
}

/// Which steady-state sizing rule governs the window once slow start exits.
///
/// Selected once at construction and never changed for the controller's
/// lifetime — see the host sender's `tcp` CLI flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Sizes the window from a smoothed delivered-rate estimate, §4.3.
    EwmaForecast,
    /// Combines a loss-responsive `cwnd` with a delay-responsive `dwnd`,
    /// AIMD-style, §4.5–§4.6.
    CompoundTcp,
}

impl FromStr for Variant {
    type Err = ParseVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Mirrors the host CLI: a fifth positional argument starting with
        // `t` selects EwmaForecast/AIMD without a delay window; anything
        // else (including its absence) selects CompoundTcp.
        if s.starts_with('t') {
            Ok(Variant::EwmaForecast)
        } else {
            Ok(Variant::CompoundTcp)
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ParseVariantError;

impl fmt::Display for ParseVariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognised congestion-control variant")
    }
}

impl std::error::Error for ParseVariantError {}

/// The congestion-control core: consumes ack and timeout events, produces a
/// window size and a poll timeout. Single-owner, single-threaded, no I/O.
///
/// See the module-level docs for why `variant` is a sum type rather than a
/// trait object.
#[derive(Debug, Clone)]
pub struct Controller {
    debug: bool,
    variant: Variant,

    mode: Mode,

    cwnd_int: u32,
    dwnd_int: u32,
    cwnd_real: f64,
    dwnd_real: f64,

    /// Instantaneous delivered rate from the most recent rate-estimator
    /// tick, distinct from the EWMA `rate_mean` it feeds — see
    /// `congestion::forecast_window`.
    last_cur_rate: f64,

    rtt: RttEstimator,
    rate: RateEstimator,
    loss: LossDetector,
}

impl Controller {
    pub fn new(debug: bool, variant: Variant) -> Self {
        Controller {
            debug,
            variant,
            mode: Mode::SlowStart,
            cwnd_int: MIN_CWND,
            dwnd_int: 0,
            cwnd_real: 1.0,
            dwnd_real: 0.0,
            last_cur_rate: 0.0,
            rtt: RttEstimator::new(),
            rate: RateEstimator::new(),
            loss: LossDetector::new(),
        }
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn cwnd_real(&self) -> f64 {
        self.cwnd_real
    }

    pub fn dwnd_real(&self) -> f64 {
        self.dwnd_real
    }

    pub fn rtt_smooth_ms(&self) -> u64 {
        self.rtt.smoothed_ms()
    }

    pub fn rtt_min_ms(&self) -> u64 {
        self.rtt.min_ms()
    }

    pub fn rate_mean(&self) -> f64 {
        self.rate.rate_mean()
    }

    pub fn rate_var(&self) -> f64 {
        self.rate.rate_var()
    }

    pub fn next_expected_seq(&self) -> u64 {
        self.loss.next_expected_seq()
    }

    /// `cwnd_int + dwnd_int`. Pure; never mutates. Always ≥ 1.
    pub fn window_size(&self) -> u32 {
        self.cwnd_int + self.dwnd_int
    }

    /// Caller-side poll budget in milliseconds. Constant in this
    /// implementation, but callers must not assume it always will be.
    pub fn timeout_ms(&self) -> u32 {
        TIMEOUT_MS
    }

    /// Advisory, except that `after_timeout` forces a SlowStart re-init —
    /// the poller's way of probing after a silent period.
    pub fn datagram_was_sent(&mut self, seq: u64, _send_ts_ms: u64, after_timeout: bool) {
        if after_timeout {
            if self.debug {
                log::debug!("seq={} after_timeout, forcing slow-start re-init", seq);
            }
            self.reset_to_slow_start();
        }
    }

    /// The main entry point: folds one ack into RTT, rate, and loss state,
    /// then runs the slow-start / steady-state machine and, in Steady
    /// CompoundTcp, the delay-window update.
    ///
    /// Operation order matters and is fixed by §4 of the controlling
    /// specification: RTT sample, then loss classification against the
    /// *pre-update* `next_expected_seq`, then the rate-estimator tick (which
    /// needs `self.mode` as it stood before this ack's transition), then the
    /// state-machine transition, then — for CompoundTcp in Steady — the dwnd
    /// update, which for a loss event must see the *already-halved* `cwnd_int`.
    pub fn ack_received(
        &mut self,
        ack_seq: u64,
        send_ts_ms: u64,
        recv_ts_ms: u64,
        ack_arrival_ts_ms: u64,
    ) {
        self.rtt.on_sample(send_ts_ms, ack_arrival_ts_ms);

        let pre_transition_mode = self.mode;
        let class = self.loss.on_ack(ack_seq, send_ts_ms, ack_arrival_ts_ms);

        if let Some(outcome) = self.rate.maybe_tick(ack_seq, recv_ts_ms, pre_transition_mode) {
            self.last_cur_rate = outcome.cur_rate;
            if self.debug {
                log::trace!(
                    "rate tick cur_rate={:.4} mean={:.4} var={:.4}",
                    outcome.cur_rate,
                    self.rate.rate_mean(),
                    self.rate.rate_var()
                );
            }
        }

        match self.mode {
            Mode::SlowStart => self.advance_slow_start(class),
            Mode::Steady => self.advance_steady(class),
        }

        if self.debug {
            log::debug!(
                "ack_seq={} class={:?} mode={:?} window={}",
                ack_seq,
                class,
                self.mode,
                self.window_size()
            );
        }
    }

    fn advance_slow_start(&mut self, class: AckClass) {
        match class {
            AckClass::Loss => {
                self.reset_to_slow_start();
            },
            // A debounced anomaly: neither grows nor resets the window.
            AckClass::Suppressed => {},
            AckClass::Clean => {
                let exits = match self.variant {
                    Variant::CompoundTcp => self.rtt.smoothed_ms() > SLOWSTART_RTT_MS,
                    Variant::EwmaForecast => {
                        self.rate.rate_mean() > 0.0 && self.rtt.smoothed_ms() > SLOWSTART_RTT_MS
                    },
                };

                if exits {
                    // The transitioning ack freezes the real-valued shadows
                    // at the window slow start had already reached; it does
                    // not also apply the ordinary +1 growth step.
                    self.mode = Mode::Steady;
                    self.cwnd_real = self.cwnd_int as f64;
                    self.dwnd_real = 0.0;
                    self.dwnd_int = 0;
                } else {
                    self.cwnd_int += 1;
                    self.cwnd_real = self.cwnd_int as f64;
                }
            },
        }
    }

    fn advance_steady(&mut self, class: AckClass) {
        match self.variant {
            Variant::CompoundTcp => self.advance_steady_compound_tcp(class),
            Variant::EwmaForecast => self.advance_steady_ewma_forecast(),
        }
    }

    /// Per-ack AIMD on `cwnd_real`, then the CompoundTcp dwnd update. The
    /// halving below must run before [`congestion::update_dwnd`] — see the
    /// module's open-question note on loss-branch ordering. A `Suppressed`
    /// ack mutates neither window: it is a debounced anomaly, not a clean
    /// ack eligible for growth.
    fn advance_steady_compound_tcp(&mut self, class: AckClass) {
        if class == AckClass::Suppressed {
            return;
        }

        let loss = class.is_loss();

        if loss {
            self.cwnd_real /= 2.0;
        } else {
            self.cwnd_real += 1.0 / (self.cwnd_real + self.dwnd_real);
        }

        if self.cwnd_real <= 1.0 {
            self.reset_to_slow_start();
            return;
        }

        self.cwnd_int = self.cwnd_real.floor() as u32;

        self.dwnd_real = congestion::update_dwnd(
            self.cwnd_real,
            self.dwnd_real,
            self.cwnd_int,
            self.rtt.min_ms(),
            self.rtt.smoothed_ms(),
            loss,
        );
        self.dwnd_int = self.dwnd_real.floor() as u32;
    }

    /// EwmaForecast has no per-ack AIMD in Steady: the window is entirely a
    /// function of the rate estimator's latest tick, recomputed here so it
    /// reflects whatever the tick just folded in.
    fn advance_steady_ewma_forecast(&mut self) {
        let window = congestion::forecast_window(
            self.rate.rate_mean(),
            self.rate.rate_var(),
            self.rtt.smoothed_ms(),
            self.last_cur_rate,
        );
        self.cwnd_int = window;
        self.cwnd_real = window as f64;
    }

    fn reset_to_slow_start(&mut self) {
        self.mode = Mode::SlowStart;
        self.cwnd_int = MIN_CWND;
        self.cwnd_real = 1.0;
        self.dwnd_int = 0;
        self.dwnd_real = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_size_is_never_below_one() {
        let ctrl = Controller::new(false, Variant::CompoundTcp);
        assert_eq!(ctrl.window_size(), 1);
    }

    #[test]
    fn variant_from_str_matches_cli_convention() {
        assert_eq!("tcp".parse::<Variant>().unwrap(), Variant::EwmaForecast);
        assert_eq!("".parse::<Variant>().unwrap(), Variant::CompoundTcp);
    }

    // S1: slow-start probe. Acks 0..9 at send=recv=arrival=k*10ms; window
    // grows by exactly 1 per ack since rtt_smooth_ms stays 0 (never exceeds
    // SLOWSTART_RTT).
    #[test]
    fn s1_slow_start_probe_grows_by_one_per_ack() {
        let mut ctrl = Controller::new(false, Variant::CompoundTcp);
        let mut expected = 2u32;
        for seq in 0..10u64 {
            let ts = seq * 10;
            ctrl.ack_received(seq, ts, ts, ts);
            assert_eq!(ctrl.window_size(), expected);
            expected += 1;
        }
    }

    // S2: slow-start exit. Ack #5 carries a 130ms RTT, pushing
    // rtt_smooth_ms past SLOWSTART_RTT (125ms) and flipping to Steady with
    // cwnd_int == 6.
    #[test]
    fn s2_slow_start_exits_to_steady_on_rtt_threshold() {
        let mut ctrl = Controller::new(false, Variant::CompoundTcp);
        for seq in 0..5u64 {
            let ts = seq * 10;
            ctrl.ack_received(seq, ts, ts, ts);
        }
        assert_eq!(ctrl.mode(), Mode::SlowStart);

        // ack #5: send_ts=50, arrival_ts = 50 + 130 = 180.
        ctrl.ack_received(5, 50, 180, 180);
        assert_eq!(ctrl.mode(), Mode::Steady);
        assert_eq!(ctrl.cwnd_int, 6);
    }

    // S3/S4: stochastic loss in Steady CompoundTcp, then a refractory-window
    // gap that must not mutate the window at all (Suppressed, not Clean).
    #[test]
    fn s3_s4_steady_loss_then_refractory_suppression() {
        let mut ctrl = Controller::new(false, Variant::CompoundTcp);
        for seq in 0..5u64 {
            let ts = seq * 10;
            ctrl.ack_received(seq, ts, ts, ts);
        }
        ctrl.ack_received(5, 50, 180, 180); // exits to Steady, cwnd_int=6
        assert_eq!(ctrl.next_expected_seq(), 6);

        // S3: gap at ack_seq=7 when next_expected_seq=6, arrival_ts=200.
        ctrl.ack_received(7, 190, 200, 200);
        assert!((ctrl.cwnd_real() - 3.0).abs() < 1e-9);

        // S4: another gap at arrival_ts=250 (< 200+80): suppressed by the
        // refractory window, so cwnd_real is untouched.
        ctrl.ack_received(20, 240, 250, 250);
        assert!((ctrl.cwnd_real() - 3.0).abs() < 1e-9);
    }

    // S6: after_timeout forces a SlowStart re-init from anywhere.
    #[test]
    fn s6_after_timeout_forces_slow_start() {
        let mut ctrl = Controller::new(false, Variant::CompoundTcp);
        for seq in 0..5u64 {
            let ts = seq * 10;
            ctrl.ack_received(seq, ts, ts, ts);
        }
        ctrl.ack_received(5, 50, 180, 180);
        assert_eq!(ctrl.mode(), Mode::Steady);

        ctrl.datagram_was_sent(99, 1000, true);
        assert_eq!(ctrl.mode(), Mode::SlowStart);
        assert_eq!(ctrl.window_size(), 1);
        assert_eq!(ctrl.dwnd_int, 0);
    }

    #[test]
    fn slow_start_loss_resets_window_to_one() {
        let mut ctrl = Controller::new(false, Variant::CompoundTcp);
        ctrl.ack_received(0, 0, 0, 0);
        assert_eq!(ctrl.window_size(), 2);
        // gap: next_expected_seq is 1, ack_seq=5 arrives at t=100 (past the
        // initial refractory window so this actually registers as a loss).
        ctrl.ack_received(5, 90, 100, 100);
        assert_eq!(ctrl.window_size(), 1);
        assert_eq!(ctrl.mode(), Mode::SlowStart);
    }

    #[test]
    fn ewma_forecast_steady_mode_never_sets_a_dwnd() {
        let mut ctrl = Controller::new(false, Variant::EwmaForecast);
        for seq in 0..5u64 {
            let ts = seq * 10;
            ctrl.ack_received(seq, ts, ts, ts);
        }
        // drive rtt_smooth_ms above SLOWSTART_RTT and rate_mean > 0, then
        // exercise at least one Steady-mode tick.
        ctrl.ack_received(5, 50, 180, 180);
        ctrl.ack_received(6, 200, 210, 210);
        assert_eq!(ctrl.dwnd_int, 0);
        assert_eq!(ctrl.dwnd_real(), 0.0);
    }

    #[test]
    fn window_size_is_idempotent_between_mutations() {
        let mut ctrl = Controller::new(false, Variant::CompoundTcp);
        ctrl.ack_received(0, 0, 0, 0);
        let a = ctrl.window_size();
        let b = ctrl.window_size();
        assert_eq!(a, b);
    }

    #[test]
    fn timeout_ms_is_never_zero() {
        let ctrl = Controller::new(false, Variant::CompoundTcp);
        assert_ne!(ctrl.timeout_ms(), 0);
    }
}
