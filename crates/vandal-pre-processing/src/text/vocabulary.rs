use std::collections::BTreeSet;

use ahash::HashMap;
use dashmap::DashMap;
use indicatif::ParallelProgressIterator;
use rayon::prelude::*;
use sprs::CsMat;
use tracing::debug;

use super::tokenizer;

/// Fixed token space for counting, built once from a training corpus.
///
/// Indices are dense and assigned in sorted token order, so the same corpus
/// always produces the same indices. The value is immutable once built.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Vocabulary {
    index: HashMap<String, usize>,
    tokens: Vec<String>,
}

impl Vocabulary {
    /// Collect every normalized token appearing in `texts`.
    pub fn build<T: AsRef<str> + Sync>(texts: &[T]) -> Self {
        debug!(num_texts = texts.len(), "Building vocabulary");
        let seen = DashMap::with_hasher(ahash::RandomState::default());

        let pb = tokenizer::progress_bar_setup(texts.len(), "Building vocabulary");
        texts.par_iter().progress_with(pb.clone()).for_each(|text| {
            for token in tokenizer::tokens(Some(text.as_ref())) {
                seen.entry(token).or_insert(());
            }
        });
        pb.finish_with_message("Vocabulary complete");

        let mut tokens = seen.into_iter().map(|(token, ())| token).collect::<Vec<_>>();
        tokens.sort_unstable();
        let index = tokens
            .iter()
            .enumerate()
            .map(|(idx, token)| (token.clone(), idx))
            .collect::<HashMap<String, usize>>();

        debug!(vocab_size = tokens.len(), "Vocabulary built");
        Self { index, tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Index of `token`, or `None` if it is out of vocabulary.
    pub fn get(&self, token: &str) -> Option<usize> {
        self.index.get(token).copied()
    }

    pub fn token(&self, idx: usize) -> Option<&str> {
        self.tokens.get(idx).map(String::as_str)
    }

    /// Tokens in index order.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Vocabulary indices of `words`, ascending. Out-of-vocabulary words are dropped.
    pub fn indices<'a>(&self, words: impl IntoIterator<Item = &'a String>) -> Vec<usize> {
        let mut indices = words
            .into_iter()
            .filter_map(|word| self.get(word))
            .collect::<Vec<_>>();
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// Binary presence matrix: one row per word set, one column per token.
    pub fn encode(&self, word_sets: &[BTreeSet<String>]) -> CsMat<f64> {
        let mut indptr = Vec::with_capacity(word_sets.len() + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();

        indptr.push(0);
        for words in word_sets {
            for col_idx in self.indices(words) {
                indices.push(col_idx);
                data.push(1.0);
            }
            indptr.push(indices.len());
        }

        debug!(
            num_rows = word_sets.len(),
            non_zero_entries = data.len(),
            "Encoded word sets against vocabulary"
        );
        CsMat::new((word_sets.len(), self.len()), indptr, indices, data)
    }
}
