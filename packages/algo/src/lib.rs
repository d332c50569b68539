//! # prep-algo - exam preparation analytics core algorithms
//!
//! Pure Rust learning-analytics algorithms with no I/O:
//!
//! - **Bayesian Knowledge Tracing** - per-topic mastery probability updates
//! - **Trend Forecasting** - least-squares extrapolation of a score history
//! - **Percentile Estimation** - rank of a score in a normal population
//!
//! ## Module structure
//!
//! - [`bkt`] - BKT observation + transition step
//! - [`forecast`] - linear trend forecaster
//! - [`percentile`] - normal CDF approximation and percentile mapping
//! - [`sanitize`] - parameter validation and numeric hygiene
//! - [`types`] - shared types and constants
//!
//! ## Example
//!
//! ```rust
//! use prep_algo::{bkt, forecast, percentile, BktParams};
//!
//! let params = bkt::update(BktParams::default(), true);
//! assert!(params.p_known > 0.3);
//!
//! assert_eq!(forecast::predict_next(&[50.0, 60.0, 70.0]).round(), 80.0);
//! assert!(percentile::percentile(90.0, 60.0, 15.0) > 95);
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod bkt;
pub mod forecast;
pub mod percentile;
pub mod sanitize;
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

pub use types::*;

pub use sanitize::{validate_params, ParamError};

pub use forecast::{predict_next, LinearFit};

pub use percentile::{normal_cdf, percentile_default};
