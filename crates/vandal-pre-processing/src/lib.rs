//! Feature engineering for edit vandalism detection.
//!
//! Turns a table of [`EditRecord`]s into a [`FeatureTable`]: per-row metadata
//! features plus a word-level vandalism score that is computed fold-safely, so
//! no edit is ever scored with counts that include its own label.

mod error;
pub mod features;
pub mod preprocessor;
mod record;
pub mod scorer;
pub mod text;

pub use error::{Result, ScorerError};
pub use preprocessor::{FeatureRow, FeatureTable, Preprocessor};
pub use record::{BAD_REQUEST, EditRecord, RawTimestamp};
pub use scorer::{ScorerParams, VandalismScorer};
pub use text::{Vocabulary, words_added};
