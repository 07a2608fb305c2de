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

//! Tunable constants for the congestion controller. All defaults are pinned
//! to the reference implementation's values; nothing here is surfaced as
//! runtime configuration.

/// Smallest window, in datagrams, that `window_size()` may ever report.
pub const MIN_CWND: u32 = 1;

/// EWMA-forecast variant's floor on a freshly recomputed steady-state window,
/// and the ceiling used by the BDP cap below it.
pub const MIN_WINDOW: f64 = 5.0;

/// RTT smoothing factor.
pub const RTT_ALPHA: f64 = 0.05;

/// Length of a rate-estimator measurement interval.
pub const TICK_MS: u64 = 20;

/// RTT, in milliseconds, above which slow start hands off to steady state.
pub const SLOWSTART_RTT_MS: u64 = 125;

/// One-way-delay threshold above which the bottleneck queue is presumed full.
pub const DELAY_THRESHOLD_MS: u64 = 155;

/// Minimum spacing between two declared loss events.
pub const LOSS_REFRACTORY_MS: u64 = 80;

/// Retransmit-idle poll timeout returned by `timeout_ms()`.
pub const TIMEOUT_MS: u32 = 400;

// --- EWMA-forecast rate estimator ---

/// Smoothing factor for the rate mean in steady state.
pub const RATE_MEAN_SMOOTH: f64 = 0.3;

/// Smoothing factor for the rate variance in steady state.
pub const RATE_VAR_SMOOTH: f64 = 0.5;

/// Confidence multiplier subtracted from the rate mean to get a cautious
/// estimate of deliverable rate.
pub const CAUTION_MULT: f64 = 0.75;

/// Base forecast horizon, in milliseconds, used to size the steady-state
/// window from the cautious rate.
pub const BASE_FORECAST_MS: f64 = 100.0;

/// Coefficient applied to `sqrt(rate_var)` when shrinking the forecast
/// horizon. Zero in the reference implementation (the horizon is fixed).
pub const FORECAST_VAR_COEFF: f64 = 0.0;

/// Multiplier applied to the bandwidth-delay product to get the window cap.
pub const BDP_MULT: f64 = 2.0;

// --- Compound TCP ---

/// Additive growth coefficient for the delay window.
pub const CTCP_ALPHA: f64 = 1.0;

/// Multiplicative-decrease fraction kept on a CTCP loss event.
pub const CTCP_BETA: f64 = 0.3;

/// Exponent on the combined window in the delay-window growth term.
pub const CTCP_K: f64 = 0.1;

/// Queueing-delay threshold, in datagrams, below which the delay window is
/// still allowed to grow.
pub const CTCP_GAMMA: f64 = 30.0;

/// Backoff coefficient applied to queueing delay when above `CTCP_GAMMA`.
pub const CTCP_ZETA: f64 = 0.02;
