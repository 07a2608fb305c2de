//! The per-variant Steady-mode sizing rules: CompoundTcp's delay-window
//! update (§4.6) and EwmaForecast's window formula (§4.3). Split out of
//! `mod.rs` because both are pure functions of a handful of scalars, with no
//! need to touch the rest of [`super::Controller`]'s state directly.

use super::constants::BASE_FORECAST_MS;
use super::constants::BDP_MULT;
use super::constants::CAUTION_MULT;
use super::constants::CTCP_ALPHA;
use super::constants::CTCP_BETA;
use super::constants::CTCP_GAMMA;
use super::constants::CTCP_K;
use super::constants::CTCP_ZETA;
use super::constants::FORECAST_VAR_COEFF;
use super::constants::MIN_CWND;
use super::constants::MIN_WINDOW;

/// CompoundTcp's delay-window (`dwnd`) update, §4.6.
///
/// `cwnd_int` must already reflect this ack's Steady-mode AIMD update (the
/// halving on loss, or the additive growth on a clean ack) — the loss branch
/// here relies on seeing the *post*-halving value, per the controlling
/// specification's open question on loss-branch ordering.
pub fn update_dwnd(
    cwnd_real: f64,
    dwnd_real: f64,
    cwnd_int: u32,
    rtt_min_ms: u64,
    rtt_smooth_ms: u64,
    loss: bool,
) -> f64 {
    let win = cwnd_real + dwnd_real;

    if loss {
        return (win * (1.0 - CTCP_BETA) - cwnd_int as f64 / 2.0).max(0.0);
    }

    // A zero RTT only occurs synthetically (e.g. a test driving send_ts ==
    // ack_arrival_ts_ms); treat it as "no queueing signal yet" rather than
    // dividing by zero.
    let diff = if rtt_min_ms == 0 || rtt_smooth_ms == 0 {
        0.0
    } else {
        let expected = win / rtt_min_ms as f64;
        let actual = win / rtt_smooth_ms as f64;
        (expected - actual) * rtt_min_ms as f64
    };

    if diff < CTCP_GAMMA {
        dwnd_real + (CTCP_ALPHA * win.powf(CTCP_K) - 1.0).max(0.0)
    } else {
        (dwnd_real - CTCP_ZETA * diff).max(0.0)
    }
}

/// EwmaForecast's Steady-mode window formula, §4.3.
///
/// `cur_rate` is the instantaneous delivered rate from the tick that just
/// fired, distinct from `rate_mean` (the EWMA the tick folded `cur_rate`
/// into) — the bandwidth-delay-product cap is deliberately based on the
/// instantaneous figure, not the smoothed one.
pub fn forecast_window(rate_mean: f64, rate_var: f64, rtt_smooth_ms: u64, cur_rate: f64) -> u32 {
    let std_dev = rate_var.max(0.0).sqrt();
    let cautious_rate = rate_mean - CAUTION_MULT * std_dev;
    let forecast_ms = BASE_FORECAST_MS - FORECAST_VAR_COEFF * std_dev;
    let bdp = cur_rate * rtt_smooth_ms as f64;

    let mut window = (cautious_rate * forecast_ms).max(MIN_WINDOW);

    let cap = BDP_MULT * bdp;
    if window > cap {
        window = cap.max(MIN_WINDOW);
    }

    window.floor().max(MIN_CWND as f64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    // S5: rate_mean=4, rate_var=1 (std=1), rtt_smooth_ms=50, cur_rate=4.
    // cautious_rate = 3.25, forecast_ms = 100, desired = 325; bdp = 200,
    // cap = 400 — desired is under the cap, so cwnd_int == 325.
    #[test]
    fn s5_ewma_forecast_tick_sizes_window_below_bdp_cap() {
        let window = forecast_window(4.0, 1.0, 50, 4.0);
        assert_eq!(window, 325);
    }

    #[test]
    fn forecast_window_is_capped_by_bdp() {
        // A huge mean with tiny variance would otherwise dwarf the BDP.
        let window = forecast_window(1000.0, 0.0, 1, 1000.0);
        let bdp_cap = (BDP_MULT * 1000.0 * 1.0) as u32;
        assert_eq!(window, bdp_cap);
    }

    #[test]
    fn forecast_window_never_drops_below_min_window() {
        let window = forecast_window(0.01, 0.0, 10, 0.01);
        assert_eq!(window, MIN_WINDOW as u32);
    }

    #[test]
    fn dwnd_loss_branch_uses_post_halving_cwnd_int() {
        // win = cwnd_real + dwnd_real = 3.0 + 2.0 = 5.0.
        let dwnd = update_dwnd(3.0, 2.0, 3, 50, 50, true);
        // 5.0 * 0.7 - 3/2 = 3.5 - 1.5 = 2.0.
        assert!((dwnd - 2.0).abs() < 1e-9);
    }

    #[test]
    fn dwnd_grows_aggressively_when_pipe_is_not_queued() {
        let dwnd = update_dwnd(6.0, 0.0, 6, 50, 50, false);
        assert!(dwnd >= 0.0);
    }

    #[test]
    fn dwnd_backs_off_when_queue_builds() {
        // win=50, rtt_min_ms=10, rtt_smooth_ms=200: diff = 47.5 >= gamma (30).
        let dwnd = update_dwnd(40.0, 10.0, 40, 10, 200, false);
        assert!(dwnd < 10.0);
    }

    #[test]
    fn dwnd_with_zero_min_rtt_does_not_divide_by_zero() {
        let dwnd = update_dwnd(6.0, 1.0, 6, 0, 50, false);
        assert!(dwnd.is_finite());
    }
}
