use serde::{Deserialize, Serialize};

use crate::{Result, ScorerError};

pub const DEFAULT_SMOOTHING: f64 = 1.0;
pub const DEFAULT_N_FOLDS: usize = 4;
pub const DEFAULT_RANDOM_SEED: u64 = 216;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedParams")]
pub struct ScorerParams {
    /// Laplace smoothing constant added to both class counts. Must be positive.
    smoothing: f64,
    /// Number of cross-validation folds used by fold-safe scoring. At least 2.
    n_folds: usize,
    /// Seed for the stratified fold shuffle.
    random_seed: u64,
}

impl ScorerParams {
    pub fn new(smoothing: f64, n_folds: usize, random_seed: u64) -> Result<Self> {
        if !(smoothing.is_finite() && smoothing > 0.0) {
            return Err(ScorerError::InvalidInput(format!(
                "smoothing must be a positive finite number, got {smoothing}"
            )));
        }
        if n_folds < 2 {
            return Err(ScorerError::InvalidInput(format!(
                "n_folds must be at least 2, got {n_folds}"
            )));
        }
        Ok(Self {
            smoothing,
            n_folds,
            random_seed,
        })
    }

    #[must_use]
    pub fn smoothing(&self) -> f64 {
        self.smoothing
    }

    #[must_use]
    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    #[must_use]
    pub fn random_seed(&self) -> u64 {
        self.random_seed
    }
}

impl Default for ScorerParams {
    fn default() -> Self {
        Self {
            smoothing: DEFAULT_SMOOTHING,
            n_folds: DEFAULT_N_FOLDS,
            random_seed: DEFAULT_RANDOM_SEED,
        }
    }
}

impl TryFrom<(f64, usize, u64)> for ScorerParams {
    type Error = ScorerError;

    fn try_from(value: (f64, usize, u64)) -> Result<Self> {
        Self::new(value.0, value.1, value.2)
    }
}

#[derive(Deserialize)]
struct UncheckedParams {
    #[serde(default = "default_smoothing")]
    smoothing: f64,
    #[serde(default = "default_n_folds")]
    n_folds: usize,
    #[serde(default = "default_random_seed")]
    random_seed: u64,
}

fn default_smoothing() -> f64 {
    DEFAULT_SMOOTHING
}

fn default_n_folds() -> usize {
    DEFAULT_N_FOLDS
}

fn default_random_seed() -> u64 {
    DEFAULT_RANDOM_SEED
}

impl TryFrom<UncheckedParams> for ScorerParams {
    type Error = ScorerError;

    fn try_from(value: UncheckedParams) -> Result<Self> {
        Self::new(value.smoothing, value.n_folds, value.random_seed)
    }
}
