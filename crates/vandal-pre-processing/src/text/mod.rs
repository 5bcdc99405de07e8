//! Text normalization, diff tokenization and the fixed counting vocabulary.

pub mod tokenizer;
mod vocabulary;

pub use tokenizer::{normalize, set_progress_visible, tokens, words_added, words_added_batch};
pub use vocabulary::Vocabulary;
