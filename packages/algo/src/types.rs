//! Common Types and Constants
//!
//! Shared data structures used across all algorithm modules.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ==================== Constants ====================

/// Lower bound for `p_known`; mastery is never certain
pub const MIN_P_KNOWN: f64 = 0.01;

/// Upper bound for `p_known`
pub const MAX_P_KNOWN: f64 = 0.99;

/// Default per-step learning transition probability
pub const DEFAULT_P_LEARN: f64 = 0.1;

/// Default slip probability
pub const DEFAULT_P_SLIP: f64 = 0.1;

/// Default guess probability
pub const DEFAULT_P_GUESS: f64 = 0.2;

/// Default prior mastery for a topic seen for the first time
pub const DEFAULT_P_KNOWN: f64 = 0.3;

/// Lower bound of a forecasted score
pub const MIN_SCORE: f64 = 0.0;

/// Upper bound of a forecasted score
pub const MAX_SCORE: f64 = 100.0;

/// Default population mean for percentile estimation
pub const DEFAULT_POPULATION_MEAN: f64 = 60.0;

/// Default population standard deviation for percentile estimation
pub const DEFAULT_POPULATION_STD_DEV: f64 = 15.0;

// ==================== BKT Types ====================

/// Bayesian Knowledge Tracing parameters for one topic
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BktParams {
    /// Probability of learning the topic during one step
    pub p_learn: f64,
    /// Probability of answering wrong despite mastery
    pub p_slip: f64,
    /// Probability of answering right without mastery
    pub p_guess: f64,
    /// Current probability that the topic is mastered, kept in [0.01, 0.99]
    pub p_known: f64,
}

impl Default for BktParams {
    fn default() -> Self {
        Self {
            p_learn: DEFAULT_P_LEARN,
            p_slip: DEFAULT_P_SLIP,
            p_guess: DEFAULT_P_GUESS,
            p_known: DEFAULT_P_KNOWN,
        }
    }
}

impl BktParams {
    /// Mastery expressed as a 0-100 integer score
    pub fn mastery_score(&self) -> u32 {
        (self.p_known * 100.0).round() as u32
    }
}

// ==================== Trend Types ====================

/// Direction of a topic's mastery between two observations
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl Trend {
    /// Compare a current score with a previous one
    pub fn between(previous: u32, current: u32) -> Self {
        match current.cmp(&previous) {
            std::cmp::Ordering::Greater => Trend::Up,
            std::cmp::Ordering::Less => Trend::Down,
            std::cmp::Ordering::Equal => Trend::Stable,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Up => "UP",
            Trend::Down => "DOWN",
            Trend::Stable => "STABLE",
        }
    }
}

impl FromStr for Trend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "UP" => Ok(Trend::Up),
            "DOWN" => Ok(Trend::Down),
            "STABLE" => Ok(Trend::Stable),
            _ => Err(()),
        }
    }
}
