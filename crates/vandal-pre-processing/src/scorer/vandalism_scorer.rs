use std::{collections::BTreeSet, sync::Arc};

use rayon::prelude::*;
use sprs::CsMat;
use tracing::debug;

use super::{
    folds::{FoldPartitioner, StratifiedKFold, check_fold_count},
    params::ScorerParams,
    statistics::WordStatistics,
};
use crate::{EditRecord, Result, ScorerError, text::Vocabulary, text::tokenizer};

/// Score given to an edit with no in-vocabulary added words.
///
/// This is the neutral value the combination rule yields for an empty
/// product, so an edit that adds nothing recognisable neither raises nor
/// lowers suspicion.
pub const EMPTY_EDIT_SCORE: f64 = 0.5;

#[derive(Clone, Debug)]
struct FittedModel {
    vocabulary: Vocabulary,
    /// Counts over the whole training set, used for held-out edits only.
    training_statistics: WordStatistics,
}

/// Naive-Bayes estimate of `P(vandalism | words added)`.
///
/// [`fit`](Self::fit) fixes the vocabulary. [`score`](Self::score) then
/// scores labeled rows fold-safely: each row's token likelihoods come only
/// from rows in other folds. [`score_held_out`](Self::score_held_out) scores
/// new edits against the whole training set.
#[derive(Clone, Debug)]
pub struct VandalismScorer {
    params: ScorerParams,
    partitioner: Arc<dyn FoldPartitioner>,
    model: Option<FittedModel>,
}

fn diff_words(rows: &[EditRecord]) -> Vec<BTreeSet<String>> {
    let diffs = rows
        .iter()
        .map(|row| {
            (
                row.added_text().unwrap_or_default(),
                row.deleted_text().unwrap_or_default(),
            )
        })
        .collect::<Vec<_>>();
    tokenizer::words_added_batch(&diffs)
}

/// Vocabulary indices present in `row`, ascending.
fn row_features(presence: &CsMat<f64>, row: usize) -> Vec<usize> {
    presence
        .outer_view(row)
        .map(|row_vec| row_vec.indices().to_vec())
        .unwrap_or_default()
}

/// Combine token likelihoods into one edit score.
///
/// Equivalent to `Π p / (Π p + Π (1 - p))`, summed as log-odds in ascending
/// feature order so the result is reproducible and never `0 / 0`.
fn combine(statistics: &WordStatistics, features: &[usize], smoothing: f64) -> f64 {
    if features.is_empty() {
        return EMPTY_EDIT_SCORE;
    }
    let log_odds: f64 = features
        .iter()
        .map(|&idx| statistics.log_odds(idx, smoothing))
        .sum();
    1.0 / (1.0 + (-log_odds).exp())
}

impl VandalismScorer {
    /// An unfitted scorer using seeded stratified folds.
    #[must_use]
    pub fn new(params: ScorerParams) -> Self {
        Self::with_partitioner(params, StratifiedKFold::new(params.random_seed()))
    }

    /// An unfitted scorer with a custom fold strategy.
    #[must_use]
    pub fn with_partitioner(params: ScorerParams, partitioner: impl FoldPartitioner + 'static) -> Self {
        Self {
            params,
            partitioner: Arc::new(partitioner),
            model: None,
        }
    }

    #[must_use]
    pub fn params(&self) -> &ScorerParams {
        &self.params
    }

    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.model.is_some()
    }

    /// The fitted vocabulary, if any.
    #[must_use]
    pub fn vocabulary(&self) -> Option<&Vocabulary> {
        self.model.as_ref().map(|model| &model.vocabulary)
    }

    fn model(&self) -> Result<&FittedModel> {
        self.model.as_ref().ok_or(ScorerError::NotFitted)
    }

    /// Build the vocabulary from every added and deleted text in `rows`.
    ///
    /// Fails if there are fewer rows than folds. On error the scorer keeps
    /// whatever state it had before the call.
    pub fn fit(&mut self, rows: &[EditRecord], labels: &[bool]) -> Result<()> {
        if rows.len() != labels.len() {
            return Err(ScorerError::InvalidInput(format!(
                "{} training rows but {} labels",
                rows.len(),
                labels.len()
            )));
        }
        if rows.is_empty() {
            return Err(ScorerError::InvalidInput("training set is empty".to_owned()));
        }
        check_fold_count(rows.len(), self.params.n_folds())?;
        debug!(num_rows = rows.len(), "Fitting VandalismScorer");

        let texts = rows
            .iter()
            .flat_map(|row| [row.added_text(), row.deleted_text()])
            .map(Option::unwrap_or_default)
            .collect::<Vec<_>>();
        let vocabulary = Vocabulary::build(&texts);

        let presence = vocabulary.encode(&diff_words(rows));
        let training_statistics = WordStatistics::from_rows(&presence, labels, 0..rows.len());

        debug!(
            vocab_size = vocabulary.len(),
            num_vandalism = labels.iter().filter(|&&label| label).count(),
            "VandalismScorer fitting complete"
        );
        self.model = Some(FittedModel {
            vocabulary,
            training_statistics,
        });
        Ok(())
    }

    /// Fold-safe scores for labeled `rows`, in input order.
    ///
    /// Rows are split into folds by the partitioner; each fold is scored with
    /// counts from all the other folds. Every row needs `isvandalism`.
    pub fn score(&self, rows: &[EditRecord]) -> Result<Vec<f64>> {
        let model = self.model()?;
        let labels = rows
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                row.isvandalism.ok_or_else(|| {
                    ScorerError::InvalidInput(format!("row {idx} has no isvandalism label"))
                })
            })
            .collect::<Result<Vec<bool>>>()?;

        let n_folds = self.params.n_folds();
        let assignment = self.partitioner.assign(&labels, n_folds)?;
        if assignment.len() != rows.len() || assignment.n_folds() != n_folds {
            return Err(ScorerError::InvalidInput(format!(
                "partitioner assigned {} rows to {} folds, expected {} rows to {n_folds} folds",
                assignment.len(),
                assignment.n_folds(),
                rows.len(),
            )));
        }
        debug!(num_rows = rows.len(), n_folds, "Scoring with fold-safe counts");

        let presence = model.vocabulary.encode(&diff_words(rows));
        let total = WordStatistics::from_rows(&presence, &labels, 0..rows.len());
        let smoothing = self.params.smoothing();

        let fold_scores = (0..n_folds)
            .into_par_iter()
            .map(|fold| {
                let members = assignment.members(fold);
                let held_in = WordStatistics::from_rows(&presence, &labels, members.iter().copied());
                let others = total.without(&held_in);
                debug!(fold, num_rows = members.len(), "Scoring fold");
                members
                    .into_iter()
                    .map(|row| (row, combine(&others, &row_features(&presence, row), smoothing)))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        let mut scores = vec![EMPTY_EDIT_SCORE; rows.len()];
        for (row, score) in fold_scores.into_iter().flatten() {
            scores[row] = score;
        }
        debug!(num_rows = scores.len(), "Fold-safe scoring complete");
        Ok(scores)
    }

    /// Scores for edits outside the training set, using all training counts.
    ///
    /// Labels on `rows` are ignored.
    pub fn score_held_out(&self, rows: &[EditRecord]) -> Result<Vec<f64>> {
        let model = self.model()?;
        debug!(num_rows = rows.len(), "Scoring held-out rows");

        let presence = model.vocabulary.encode(&diff_words(rows));
        let smoothing = self.params.smoothing();
        Ok((0..rows.len())
            .map(|row| {
                combine(
                    &model.training_statistics,
                    &row_features(&presence, row),
                    smoothing,
                )
            })
            .collect())
    }
}

impl Default for VandalismScorer {
    fn default() -> Self {
        Self::new(ScorerParams::default())
    }
}
