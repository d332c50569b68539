//! Score Trend Forecasting
//!
//! Ordinary least squares of score against attempt index, extrapolated one
//! step past the last observation and clamped to the 0-100 score range.

use crate::sanitize::finite_values;
use crate::types::{MAX_SCORE, MIN_SCORE};

/// Fitted line `y = slope * x + intercept` over indices `0..n`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Least-squares fit; `None` with fewer than two points
pub fn fit(history: &[f64]) -> Option<LinearFit> {
    let n = history.len();
    if n < 2 {
        return None;
    }

    let nf = n as f64;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_xx = 0.0;
    for (i, &y) in history.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_xx += x * x;
    }

    // n >= 2 with distinct integer x values, so the denominator is positive
    let slope = (nf * sum_xy - sum_x * sum_y) / (nf * sum_xx - sum_x * sum_x);
    let intercept = (sum_y - slope * sum_x) / nf;

    Some(LinearFit { slope, intercept })
}

/// Predict the next score of a history.
///
/// - empty history: 0
/// - one point: that point
/// - otherwise: the fitted line evaluated at index `n`
///
/// Non-finite points are dropped before fitting. The result is clamped to [0, 100].
pub fn predict_next(history: &[f64]) -> f64 {
    let points = finite_values(history);

    let prediction = match points.len() {
        0 => return 0.0,
        1 => points[0],
        n => match fit(&points) {
            Some(line) => line.at(n as f64),
            None => 0.0,
        },
    };

    prediction.clamp(MIN_SCORE, MAX_SCORE)
}
