/// Parameters of a log-normal distribution.
///
/// `log_mean` and `log_variance` are the mean and variance of `ln(x)`, i.e.
/// the parameters of the underlying normal distribution. `sample_size` is the
/// number of observations the parameters were estimated from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogNormalParams {
    /// Mean of `ln(x)`.
    pub log_mean: f64,
    /// Population variance of `ln(x)` (divisor = sample size).
    pub log_variance: f64,
    /// Number of observations used for the estimate.
    pub sample_size: usize,
}

impl LogNormalParams {
    /// Estimates log-normal parameters from the sample moments of `ln(x)`.
    ///
    /// # Returns
    ///
    /// * `Some(LogNormalParams)` - if the sample is non-empty and every value is positive
    /// * `None` - if the sample is empty or contains a value `<= 0`
    ///
    /// A single observation yields `log_variance == 0.0`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use deathlog_stats::lognormal::LogNormalParams;
    /// let params = LogNormalParams::from_values([1.0, 1.0, 1.0]).unwrap();
    /// assert_eq!(params.log_mean, 0.0);
    /// assert_eq!(params.log_variance, 0.0);
    /// assert_eq!(params.sample_size, 3);
    ///
    /// assert!(LogNormalParams::from_values(Vec::<f64>::new()).is_none());
    /// ```
    #[must_use]
    pub fn from_values<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let logs = values
            .into_iter()
            .map(|v| (v > 0.0).then(|| v.ln()))
            .collect::<Option<Vec<_>>>()?;
        Self::from_logs(&logs)
    }

    /// Estimates parameters from values that are already log-transformed.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_logs(logs: &[f64]) -> Option<Self> {
        if logs.is_empty() {
            return None;
        }
        let n = logs.len() as f64;
        let log_mean = logs.iter().sum::<f64>() / n;
        let log_variance = logs.iter().map(|y| (y - log_mean).powi(2)).sum::<f64>() / n;
        Some(Self {
            log_mean,
            log_variance,
            sample_size: logs.len(),
        })
    }

    /// Standard deviation of `ln(x)`.
    #[must_use]
    pub fn log_std_dev(&self) -> f64 {
        self.log_variance.sqrt()
    }

    /// Median of the distribution on the original scale, `exp(log_mean)`.
    #[must_use]
    pub fn median(&self) -> f64 {
        self.log_mean.exp()
    }
}
