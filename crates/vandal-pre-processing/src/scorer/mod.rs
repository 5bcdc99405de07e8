//! Word-level vandalism likelihood model with fold-safe scoring.

pub mod folds;
mod params;
mod statistics;
mod vandalism_scorer;

pub use folds::{FoldAssignment, FoldPartitioner, StratifiedKFold};
pub use params::{DEFAULT_N_FOLDS, DEFAULT_RANDOM_SEED, DEFAULT_SMOOTHING, ScorerParams};
pub use statistics::WordStatistics;
pub use vandalism_scorer::{EMPTY_EDIT_SCORE, VandalismScorer};
