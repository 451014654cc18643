//! Right-truncated log-normal maximum-likelihood fit.
//!
//! Observations at or above the truncation point `T` never make it into the
//! sample, so the plain moments of `ln(x)` underestimate both location and
//! spread. With `y = ln(x)` and `c = ln(T)`, the retained sample follows a
//! normal distribution truncated on the right at `c`.
//!
//! The truncated normal with a fixed bound is an exponential family in
//! `(y, y^2)`, so its MLE matches the first two sample moments:
//!
//! ```text
//! alpha  = (c - mu) / sigma
//! lambda = phi(alpha) / Phi(alpha)
//! E[y]   = mu - sigma * lambda
//! Var[y] = sigma^2 * (1 - alpha * lambda - lambda^2)
//! ```
//!
//! Eliminating `mu` and `sigma` leaves one equation in `alpha`, solved by
//! bisection:
//!
//! ```text
//! g(alpha) = d * sqrt(1 - alpha * lambda - lambda^2) - lambda - alpha = 0
//! d        = (c - mean) / std_dev
//! ```
//!
//! `g` is negative for large `alpha` and tends to `(d - 1) / |alpha|` as
//! `alpha -> -inf`, so a root exists exactly when `d > 1`. Otherwise the
//! likelihood keeps increasing towards the exponential limit and no finite
//! estimate exists.

use std::f64::consts::FRAC_1_SQRT_2;

use statrs::{
    distribution::{Continuous as _, Normal},
    function::erf::erfc,
};

use crate::lognormal::LogNormalParams;

const ALPHA_BRACKET: (f64, f64) = (-25.0, 25.0);
const MAX_ITERATIONS: usize = 200;
const TOLERANCE: f64 = 1e-12;

/// How the parameters of a [`TruncatedFit`] were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitMethod {
    /// Nothing was truncated, or the truncation point is far enough in the
    /// tail that the correction vanishes. Parameters are the sample moments.
    Moments,
    /// Maximum-likelihood estimate under right truncation.
    MaximumLikelihood,
    /// The likelihood has no finite maximum (or the retained sample has no
    /// spread). Parameters are the sample moments of the retained values.
    MomentsFallback,
}

/// Result of [`TruncatedLogNormal::fit`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruncatedFit {
    /// Fitted parameters. `sample_size` counts the retained observations.
    pub params: LogNormalParams,
    /// Number of observations at or above the truncation point.
    pub excluded: usize,
    pub method: FitMethod,
}

/// Log-normal fit for samples right-truncated at a fixed point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruncatedLogNormal {
    truncation: f64,
}

impl TruncatedLogNormal {
    /// Creates a fitter that discards observations `>= truncation`.
    #[must_use]
    pub fn new(truncation: f64) -> Self {
        Self { truncation }
    }

    #[must_use]
    pub fn truncation(&self) -> f64 {
        self.truncation
    }

    /// Fits the retained observations (strictly below the truncation point).
    ///
    /// # Returns
    ///
    /// * `Some(TruncatedFit)` - if at least one positive value is retained
    /// * `None` - if every value is excluded, or a retained value is `<= 0`
    ///
    /// When no observation is excluded the result equals the plain moment
    /// estimate of [`LogNormalParams::from_values`].
    ///
    /// # Examples
    ///
    /// ```
    /// # use deathlog_stats::{lognormal::LogNormalParams, truncated::{FitMethod, TruncatedLogNormal}};
    /// let levels = [10.0, 20.0, 30.0];
    /// let fit = TruncatedLogNormal::new(60.0).fit(levels).unwrap();
    /// assert_eq!(fit.method, FitMethod::Moments);
    /// assert_eq!(Some(fit.params), LogNormalParams::from_values(levels));
    /// ```
    #[must_use]
    pub fn fit<I>(&self, values: I) -> Option<TruncatedFit>
    where
        I: IntoIterator<Item = f64>,
    {
        let (retained, excluded): (Vec<f64>, Vec<f64>) =
            values.into_iter().partition(|v| *v < self.truncation);
        let logs = retained
            .into_iter()
            .map(|v| (v > 0.0).then(|| v.ln()))
            .collect::<Option<Vec<_>>>()?;
        let moments = LogNormalParams::from_logs(&logs)?;
        let excluded = excluded.len();

        let fit = |params: LogNormalParams, method: FitMethod| TruncatedFit {
            params,
            excluded,
            method,
        };

        if excluded == 0 {
            return Some(fit(moments, FitMethod::Moments));
        }
        if moments.log_variance <= 0.0 {
            return Some(fit(moments, FitMethod::MomentsFallback));
        }

        let bound = self.truncation.ln();
        let std_dev = moments.log_std_dev();
        let d = (bound - moments.log_mean) / std_dev;
        let g = |alpha: f64| d * variance_ratio(alpha).sqrt() - mills_ratio(alpha) - alpha;

        let (mut lo, mut hi) = ALPHA_BRACKET;
        if g(hi) >= 0.0 {
            return Some(fit(moments, FitMethod::Moments));
        }
        if g(lo) <= 0.0 {
            return Some(fit(moments, FitMethod::MomentsFallback));
        }
        for _ in 0..MAX_ITERATIONS {
            let mid = 0.5 * (lo + hi);
            if g(mid) > 0.0 {
                lo = mid;
            } else {
                hi = mid;
            }
            if hi - lo < TOLERANCE {
                break;
            }
        }

        let alpha = 0.5 * (lo + hi);
        let sigma = std_dev / variance_ratio(alpha).sqrt();
        let mu = moments.log_mean + sigma * mills_ratio(alpha);
        let params = LogNormalParams {
            log_mean: mu,
            log_variance: sigma * sigma,
            sample_size: moments.sample_size,
        };
        Some(fit(params, FitMethod::MaximumLikelihood))
    }
}

/// `phi(alpha) / Phi(alpha)` for the standard normal.
fn mills_ratio(alpha: f64) -> f64 {
    let pdf = Normal::standard().pdf(alpha);
    // Phi via `erfc` stays accurate in the left tail.
    let cdf = 0.5 * erfc(-alpha * FRAC_1_SQRT_2);
    pdf / cdf
}

/// Variance of the standard normal truncated above `alpha`.
fn variance_ratio(alpha: f64) -> f64 {
    let lambda = mills_ratio(alpha);
    (1.0 - alpha * lambda - lambda * lambda).max(0.0)
}
