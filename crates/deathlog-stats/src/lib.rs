//! Statistical kernels for death log precomputation.
//!
//! This crate provides the numeric side of the pipeline, free of any
//! domain types:
//!
//! - **Descriptive statistics**: min, max, mean, median, and population variance
//! - **Log-normal moments**: mean and population variance of `ln(x)`
//! - **Truncated log-normal fit**: maximum-likelihood parameters for samples
//!   that are only observed below a right truncation point
//!
//! # Modules
//!
//! - [`descriptive`]: Descriptive statistics for summarizing datasets
//! - [`lognormal`]: Log-normal parameters estimated from sample moments
//! - [`truncated`]: Right-truncated log-normal maximum-likelihood fit
//!
//! # Examples
//!
//! ## Estimating log-normal parameters
//!
//! ```
//! use deathlog_stats::lognormal::LogNormalParams;
//!
//! let e = std::f64::consts::E;
//! let params = LogNormalParams::from_values([e, e * e]).unwrap();
//! assert!((params.log_mean - 1.5).abs() < 1e-12);
//! assert!((params.log_variance - 0.25).abs() < 1e-12);
//! assert_eq!(params.sample_size, 2);
//! ```
//!
//! ## Fitting a right-truncated sample
//!
//! ```
//! use deathlog_stats::truncated::TruncatedLogNormal;
//!
//! let levels = [12.0, 25.0, 33.0, 41.0, 58.0, 60.0, 60.0];
//! let fit = TruncatedLogNormal::new(60.0).fit(levels).unwrap();
//! assert_eq!(fit.excluded, 2);
//! assert_eq!(fit.params.sample_size, 5);
//! ```

pub mod descriptive;
pub mod lognormal;
pub mod truncated;
