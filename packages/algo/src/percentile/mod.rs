//! Percentile Estimation
//!
//! Places a raw score inside an assumed normal population using the
//! Zelen-Severo rational approximation of the standard normal CDF
//! (absolute error below 7.5e-8).

use crate::types::{DEFAULT_POPULATION_MEAN, DEFAULT_POPULATION_STD_DEV};

const P: f64 = 0.231_641_9;
const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;
const B1: f64 = 0.319_381_53;
const B2: f64 = -0.356_563_782;
const B3: f64 = 1.781_477_937;
const B4: f64 = -1.821_255_978;
const B5: f64 = 1.330_274_429;

/// Standard normal cumulative distribution function
pub fn normal_cdf(z: f64) -> f64 {
    let t = 1.0 / (1.0 + P * z.abs());
    let d = INV_SQRT_2PI * (-z * z / 2.0).exp();
    let tail = d * t * (B1 + t * (B2 + t * (B3 + t * (B4 + t * B5))));
    if z > 0.0 {
        1.0 - tail
    } else {
        tail
    }
}

/// Percentile of `score` in a normal population with the given mean and
/// standard deviation, rounded to an integer in [0, 100].
///
/// A non-positive or non-finite `std_dev` describes a point mass at `mean`:
/// scores above it map to 100, below to 0, equal to 50.
pub fn percentile(score: f64, mean: f64, std_dev: f64) -> u8 {
    if !(std_dev.is_finite() && std_dev > 0.0) {
        return match score.partial_cmp(&mean) {
            Some(std::cmp::Ordering::Greater) => 100,
            Some(std::cmp::Ordering::Less) => 0,
            _ => 50,
        };
    }

    let z = (score - mean) / std_dev;
    if z.is_nan() {
        return 50;
    }
    let prob = normal_cdf(z);
    (prob * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Percentile against the default population (mean 60, standard deviation 15)
pub fn percentile_default(score: f64) -> u8 {
    percentile(score, DEFAULT_POPULATION_MEAN, DEFAULT_POPULATION_STD_DEV)
}
