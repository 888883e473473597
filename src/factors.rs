//! C2: the twenty-factor compute kernel and its lag state.
//!
//! Referentially transparent given `(SnapshotRow, LagState)`; the caller
//! (the worker, C5) is responsible for updating `LagState` afterwards via
//! [`LagState::advance`].

use crate::parser::{LEVELS, SnapshotRow};

/// Number of factors computed per emitted row.
pub const NUM_FACTORS: usize = 20;

/// Epsilon used to guard every division against a zero denominator.
pub const EPSILON: f64 = 1e-7;

/// Per-instrument-stream lag state, threaded through the row loop by the
/// caller. A plain record of primitives — no per-row heap object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LagState {
    pub has_prev: bool,
    pub prev_ap1: f64,
    pub prev_bp1: f64,
    pub prev_sum_bid_volumes: f64,
    pub prev_sum_ask_volumes: f64,
    pub prev_trade_time: i64,
}

impl LagState {
    /// Fresh state at the start of a new instrument file: no prior row.
    pub const fn reset() -> LagState {
        LagState {
            has_prev: false,
            prev_ap1: 0.0,
            prev_bp1: 0.0,
            prev_sum_bid_volumes: 0.0,
            prev_sum_ask_volumes: 0.0,
            prev_trade_time: i64::MIN,
        }
    }

    /// Whether `sec_of_day` signals a rewind relative to the last row seen
    /// (invariant I2: a decrease means a file boundary was missed upstream
    /// and must be treated as one here).
    pub fn is_rewind(&self, sec_of_day: u32) -> bool {
        (sec_of_day as i64) < self.prev_trade_time
    }

    fn advance(&mut self, ap1: f64, bp1: f64, sum_bid: f64, sum_ask: f64, sec_of_day: u32) {
        self.prev_ap1 = ap1;
        self.prev_bp1 = bp1;
        self.prev_sum_bid_volumes = sum_bid;
        self.prev_sum_ask_volumes = sum_ask;
        self.prev_trade_time = sec_of_day as i64;
        self.has_prev = true;
    }
}

/// Emit window: 09:30:00-11:30:00 and 13:00:00-15:00:00 inclusive.
pub fn in_emit_window(sec_of_day: u32) -> bool {
    (34200..=41400).contains(&sec_of_day) || (46800..=54000).contains(&sec_of_day)
}

/// Compute the 20-wide factor vector for one emitted row, then advance
/// `lag` with the current row's values. Only call this for rows inside
/// the emit window; non-emit rows should call [`LagState::advance`]-style
/// updates directly via [`update_lag_only`] instead.
pub fn compute_factors(row: &SnapshotRow, lag: &mut LagState) -> [f64; NUM_FACTORS] {
    let bp: [f64; LEVELS] = row.bp.map(|v| v as f64);
    let bv: [f64; LEVELS] = row.bv.map(|v| v as f64);
    let ap: [f64; LEVELS] = row.ap.map(|v| v as f64);
    let av: [f64; LEVELS] = row.av.map(|v| v as f64);
    let t_bid_vol = row.t_bid_vol as f64;
    let t_ask_vol = row.t_ask_vol as f64;

    let sum_bid_volumes: f64 = bv.iter().sum();
    let sum_ask_volumes: f64 = av.iter().sum();
    let sum_bid_weighted_price: f64 = (0..LEVELS).map(|i| bp[i] * bv[i]).sum();
    let sum_ask_weighted_price: f64 = (0..LEVELS).map(|i| ap[i] * av[i]).sum();

    const LEVEL_WEIGHTS: [f64; 5] = [1.0, 0.5, 0.333_333_33, 0.25, 0.2];
    let weighted_bid_depth: f64 = (0..LEVELS).map(|i| bv[i] * LEVEL_WEIGHTS[i]).sum();
    let weighted_ask_depth: f64 = (0..LEVELS).map(|i| av[i] * LEVEL_WEIGHTS[i]).sum();

    let spread = ap[0] - bp[0];
    let mid_price = 0.5 * (ap[0] + bp[0]);
    let depth_diff = sum_bid_volumes - sum_ask_volumes;

    let inv_mid_price = 1.0 / (mid_price + EPSILON);
    let inv_bv1_av1 = 1.0 / (bv[0] + av[0] + EPSILON);
    let inv_sum_volumes = 1.0 / (sum_bid_volumes + sum_ask_volumes + EPSILON);
    let inv_sum_ask_volumes = 1.0 / (sum_ask_volumes + EPSILON);
    let inv_t_volumes = 1.0 / (t_bid_vol + t_ask_vol + EPSILON);
    let inv_sum_bid_volumes = 1.0 / (sum_bid_volumes + EPSILON);
    let inv_weighted_depths = 1.0 / (weighted_bid_depth + weighted_ask_depth + EPSILON);

    let alpha11 = sum_bid_weighted_price * inv_sum_bid_volumes;
    let alpha12 = sum_ask_weighted_price * inv_sum_ask_volumes;

    let (alpha17, alpha18, alpha19) = if lag.has_prev {
        let a17 = ap[0] - lag.prev_ap1;
        let a18 = 0.5 * ((ap[0] + bp[0]) - (lag.prev_ap1 + lag.prev_bp1));
        let curr_ratio = sum_bid_volumes * inv_sum_ask_volumes;
        let prev_ratio = lag.prev_sum_bid_volumes / (lag.prev_sum_ask_volumes + EPSILON);
        let a19 = curr_ratio - prev_ratio;
        (a17, a18, a19)
    } else {
        (0.0, 0.0, 0.0)
    };

    let factors = [
        spread,
        spread * inv_mid_price,
        mid_price,
        (bv[0] - av[0]) * inv_bv1_av1,
        depth_diff * inv_sum_volumes,
        sum_bid_volumes,
        sum_ask_volumes,
        depth_diff,
        sum_bid_volumes * inv_sum_ask_volumes,
        (t_bid_vol - t_ask_vol) * inv_t_volumes,
        alpha11,
        alpha12,
        (sum_bid_weighted_price + sum_ask_weighted_price) * inv_sum_volumes,
        alpha12 - alpha11,
        depth_diff / 5.0,
        (weighted_bid_depth - weighted_ask_depth) * inv_weighted_depths,
        alpha17,
        alpha18,
        alpha19,
        spread * inv_sum_volumes,
    ];

    lag.advance(ap[0], bp[0], sum_bid_volumes, sum_ask_volumes, row.sec_of_day);
    factors
}

/// For a non-emit row: update lag state from the row's levels without
/// computing any factors (lag state still needs the current `ap1`/`bp1`/
/// volume sums to feed a later emitted row).
pub fn update_lag_only(row: &SnapshotRow, lag: &mut LagState) {
    let bv_sum: f64 = row.bv.iter().map(|&v| v as f64).sum();
    let av_sum: f64 = row.av.iter().map(|&v| v as f64).sum();
    lag.advance(
        row.ap[0] as f64,
        row.bp[0] as f64,
        bv_sum,
        av_sum,
        row.sec_of_day,
    );
}
