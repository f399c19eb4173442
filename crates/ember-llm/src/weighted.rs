//! Probability-weighted choice among a fixed set of options

use crate::error::ConfigError;

/// A value paired with its relative weight
#[derive(Debug, Clone)]
pub struct WeightedOption<T> {
    pub value: T,
    pub weight: f64,
}

impl<T> WeightedOption<T> {
    pub const fn new(value: T, weight: f64) -> Self {
        Self { value, weight }
    }
}

/// Options whose weights sum to one, in configuration order
#[derive(Debug, Clone)]
pub struct Weighted<T> {
    options: Vec<WeightedOption<T>>,
}

impl<T> Weighted<T> {
    /// Validate and rescale `options` so their weights sum to one
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidWeights` if `options` is empty or any
    /// weight is not a finite number greater than zero
    pub fn normalize(options: Vec<WeightedOption<T>>) -> Result<Self, ConfigError> {
        if options.is_empty() {
            return Err(ConfigError::InvalidWeights("at least one option is required".to_owned()));
        }

        if let Some(bad) = options.iter().find(|o| !o.weight.is_finite() || o.weight <= 0.0) {
            return Err(ConfigError::InvalidWeights(format!(
                "weight {} is not a positive finite number",
                bad.weight
            )));
        }

        let total: f64 = options.iter().map(|o| o.weight).sum();
        if !total.is_finite() {
            return Err(ConfigError::InvalidWeights("weights overflow when summed".to_owned()));
        }

        let options = options
            .into_iter()
            .map(|o| WeightedOption::new(o.value, o.weight / total))
            .collect();

        Ok(Self { options })
    }

    /// Draw one option using the thread-local RNG
    pub fn select(&self) -> &T {
        self.select_with(rand::random::<f64>())
    }

    /// Pick the first option whose cumulative weight reaches `r`
    ///
    /// Falls back to the last option when rounding leaves `r` unmatched.
    pub fn select_with(&self, r: f64) -> &T {
        let mut cumulative = 0.0;
        let index = self
            .options
            .iter()
            .position(|o| {
                cumulative += o.weight;
                cumulative >= r
            })
            .unwrap_or(self.options.len() - 1);

        &self.options[index].value
    }

    /// Normalized options in order
    pub fn options(&self) -> &[WeightedOption<T>] {
        &self.options
    }

    /// Option values in order
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.options.iter().map(|o| &o.value)
    }
}
