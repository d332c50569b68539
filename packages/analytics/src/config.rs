use std::path::PathBuf;
use std::str::FromStr;

use prep_algo::{BktParams, DEFAULT_POPULATION_MEAN, DEFAULT_POPULATION_STD_DEV};

/// Subjective scores strictly above this value (0-10 scale) count as correct
pub const DEFAULT_CORRECTNESS_THRESHOLD: f64 = 7.0;

/// Upper bound of the subjective score scale
pub const MAX_ATTEMPT_SCORE: f64 = 10.0;

pub const DEFAULT_TOPIC_LIMIT: usize = 3;

const DEFAULT_DB_PATH: &str = "./data/prep-analytics.db";

/// Settings the aggregator needs
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatorConfig {
    pub correctness_threshold: f64,
    /// Parameters given to a topic the first time it is seen
    pub prior: BktParams,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            correctness_threshold: DEFAULT_CORRECTNESS_THRESHOLD,
            prior: BktParams::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    pub log_level: String,
    pub db_path: PathBuf,
    pub aggregator: AggregatorConfig,
    pub percentile_mean: f64,
    pub percentile_std_dev: f64,
    pub topic_limit: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            aggregator: AggregatorConfig::default(),
            percentile_mean: DEFAULT_POPULATION_MEAN,
            percentile_std_dev: DEFAULT_POPULATION_STD_DEV,
            topic_limit: DEFAULT_TOPIC_LIMIT,
        }
    }
}

impl AnalyticsConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let log_level = std::env::var("RUST_LOG").unwrap_or(defaults.log_level);

        let db_path = std::env::var("PREP_DB_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let correctness_threshold = env_parse(
            "PREP_CORRECTNESS_THRESHOLD",
            defaults.aggregator.correctness_threshold,
            |v: &f64| v.is_finite() && (0.0..=MAX_ATTEMPT_SCORE).contains(v),
        );

        let percentile_mean = env_parse("PREP_PERCENTILE_MEAN", defaults.percentile_mean, |v: &f64| {
            v.is_finite()
        });

        let percentile_std_dev = env_parse(
            "PREP_PERCENTILE_STD_DEV",
            defaults.percentile_std_dev,
            |v: &f64| v.is_finite() && *v > 0.0,
        );

        let topic_limit = env_parse("PREP_TOPIC_LIMIT", defaults.topic_limit, |v: &usize| *v > 0);

        Self {
            log_level,
            db_path,
            aggregator: AggregatorConfig {
                correctness_threshold,
                prior: defaults.aggregator.prior,
            },
            percentile_mean,
            percentile_std_dev,
            topic_limit,
        }
    }
}

fn env_parse<T, F>(key: &str, default: T, valid: F) -> T
where
    T: FromStr + Copy + std::fmt::Debug,
    F: Fn(&T) -> bool,
{
    let Ok(raw) = std::env::var(key) else {
        return default;
    };

    match raw.trim().parse::<T>() {
        Ok(value) if valid(&value) => value,
        _ => {
            tracing::warn!(key, value = %raw, ?default, "ignoring invalid config value");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_model_constants() {
        let config = AnalyticsConfig::default();
        assert_eq!(config.aggregator.correctness_threshold, 7.0);
        assert_eq!(config.aggregator.prior, BktParams::default());
        assert_eq!(config.percentile_mean, 60.0);
        assert_eq!(config.percentile_std_dev, 15.0);
        assert_eq!(config.topic_limit, 3);
    }

    // Single test touching the environment so parallel tests don't race on it
    #[test]
    fn test_from_env_parses_and_falls_back() {
        std::env::set_var("PREP_CORRECTNESS_THRESHOLD", "6.5");
        std::env::set_var("PREP_PERCENTILE_STD_DEV", "-4");
        std::env::set_var("PREP_TOPIC_LIMIT", "five");
        std::env::set_var("PREP_DB_PATH", "/tmp/prep-test.db");

        let config = AnalyticsConfig::from_env();
        assert_eq!(config.aggregator.correctness_threshold, 6.5);
        assert_eq!(config.percentile_std_dev, DEFAULT_POPULATION_STD_DEV);
        assert_eq!(config.topic_limit, DEFAULT_TOPIC_LIMIT);
        assert_eq!(config.db_path, PathBuf::from("/tmp/prep-test.db"));

        for key in [
            "PREP_CORRECTNESS_THRESHOLD",
            "PREP_PERCENTILE_STD_DEV",
            "PREP_TOPIC_LIMIT",
            "PREP_DB_PATH",
        ] {
            std::env::remove_var(key);
        }
    }
}
