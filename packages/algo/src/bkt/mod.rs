//! Bayesian Knowledge Tracing
//!
//! One observation + transition step of the standard BKT model:
//! - Observation: Bayes' rule over {mastered, not mastered} given a correct or
//!   incorrect response, using slip and guess as emission probabilities
//! - Transition: a not-yet-mastered learner may learn the topic with `p_learn`
//!
//! `p_known` is clamped to [0.01, 0.99] after every step, which keeps both
//! posterior denominators strictly positive for any valid parameter set.

use crate::sanitize::clamp_p_known;
use crate::types::BktParams;

/// Posterior probability of mastery after observing one response.
///
/// With `p_known` inside (0, 1) the denominator is zero only when the
/// observation itself has zero likelihood (slip = 0 and guess = 1 for a wrong
/// answer, or slip = 1 and guess = 0 for a right one). Such an observation
/// carries no usable evidence, so the prior is returned unchanged.
pub fn posterior(params: &BktParams, correct: bool) -> f64 {
    let p = params.p_known;
    let (num, den) = if correct {
        let num = p * (1.0 - params.p_slip);
        (num, num + (1.0 - p) * params.p_guess)
    } else {
        let num = p * params.p_slip;
        (num, num + (1.0 - p) * (1.0 - params.p_guess))
    };

    if den > 0.0 {
        num / den
    } else {
        p
    }
}

/// Apply one BKT step. Only `p_known` changes.
pub fn update(params: BktParams, correct: bool) -> BktParams {
    let post = posterior(&params, correct);
    let next = post + (1.0 - post) * params.p_learn;

    BktParams {
        p_known: clamp_p_known(next),
        ..params
    }
}

/// Fold a sequence of observations in order
pub fn update_sequence<I>(params: BktParams, observations: I) -> BktParams
where
    I: IntoIterator<Item = bool>,
{
    observations.into_iter().fold(params, update)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MAX_P_KNOWN, MIN_P_KNOWN};

    #[test]
    fn test_correct_from_defaults() {
        let next = update(BktParams::default(), true);
        // 0.27 / 0.41 = 0.65854, then + 0.34146 * 0.1
        assert!((next.p_known - 0.692_683).abs() < 1e-4, "got {}", next.p_known);
    }

    #[test]
    fn test_incorrect_from_defaults() {
        let next = update(BktParams::default(), false);
        // 0.03 / 0.59 = 0.05085, then + 0.94915 * 0.1
        assert!((next.p_known - 0.145_763).abs() < 1e-4, "got {}", next.p_known);
    }

    #[test]
    fn test_other_params_pass_through() {
        let params = BktParams {
            p_learn: 0.25,
            p_slip: 0.05,
            p_guess: 0.3,
            p_known: 0.5,
        };
        let next = update(params, false);
        assert_eq!(next.p_learn, 0.25);
        assert_eq!(next.p_slip, 0.05);
        assert_eq!(next.p_guess, 0.3);
    }

    #[test]
    fn test_sequential_correct_is_monotonic() {
        let mut params = BktParams::default();
        for _ in 0..3 {
            let next = update(params, true);
            assert!(next.p_known > params.p_known);
            params = next;
        }
    }

    #[test]
    fn test_order_matters() {
        let a = update_sequence(BktParams::default(), [true, false]);
        let b = update_sequence(BktParams::default(), [false, true]);
        assert!((a.p_known - b.p_known).abs() > 1e-6);
    }

    #[test]
    fn test_clamped_at_extremes() {
        let high = update_sequence(BktParams::default(), std::iter::repeat(true).take(50));
        assert_eq!(high.p_known, MAX_P_KNOWN);

        let stubborn = BktParams {
            p_learn: 0.0,
            p_slip: 0.0,
            p_guess: 0.2,
            p_known: 0.5,
        };
        let low = update(stubborn, false);
        assert_eq!(low.p_known, MIN_P_KNOWN);
    }

    #[test]
    fn test_degenerate_params_stay_finite() {
        // slip = 0 and guess = 1 zero out one term of each denominator
        let params = BktParams {
            p_learn: 0.0,
            p_slip: 0.0,
            p_guess: 1.0,
            p_known: MIN_P_KNOWN,
        };
        for correct in [true, false] {
            let next = update(params, correct);
            assert!(next.p_known.is_finite());
            assert!((MIN_P_KNOWN..=MAX_P_KNOWN).contains(&next.p_known));
        }
        // impossible observation leaves mastery where it was
        assert_eq!(posterior(&params, false), MIN_P_KNOWN);
    }

    #[test]
    fn test_output_always_in_bounds() {
        let grid = [0.0, 0.1, 0.5, 0.9, 1.0];
        for &p_learn in &grid {
            for &p_slip in &grid {
                for &p_guess in &grid {
                    for &p_known in &[MIN_P_KNOWN, 0.3, MAX_P_KNOWN] {
                        let params = BktParams { p_learn, p_slip, p_guess, p_known };
                        for correct in [true, false] {
                            let next = update(params, correct);
                            assert!(
                                (MIN_P_KNOWN..=MAX_P_KNOWN).contains(&next.p_known),
                                "{:?} correct={} -> {}",
                                params,
                                correct,
                                next.p_known
                            );
                        }
                    }
                }
            }
        }
    }
}
