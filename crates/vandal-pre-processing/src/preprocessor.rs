use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::{EditRecord, Result, ScorerError, ScorerParams, VandalismScorer, features};

/// Columns written by [`FeatureRow`]; stale copies in the input are replaced.
const DERIVED_COLUMNS: [&str; 6] = [
    "vandalism_score",
    "account_age",
    "is_IP",
    "comment_empty",
    "word_count_added",
    "word_count_deleted",
];

/// An edit with every engineered column attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    #[serde(flatten)]
    pub record: EditRecord,
    pub vandalism_score: f64,
    pub account_age: i64,
    #[serde(rename = "is_IP")]
    pub is_ip: bool,
    pub comment_empty: bool,
    pub word_count_added: usize,
    pub word_count_deleted: usize,
}

impl FeatureRow {
    fn new(mut record: EditRecord, vandalism_score: f64) -> Self {
        for column in DERIVED_COLUMNS {
            record.extra.remove(column);
        }
        let (word_count_added, word_count_deleted) = features::word_count(&record);
        Self {
            vandalism_score,
            account_age: features::account_age(&record),
            is_ip: features::is_anonymous(&record),
            comment_empty: features::comment_empty(&record),
            word_count_added,
            word_count_deleted,
            record,
        }
    }
}

/// Output of [`Preprocessor::run`].
#[derive(Debug, Clone)]
pub struct FeatureTable {
    pub rows: Vec<FeatureRow>,
    /// Scorer fitted on the usable rows, for scoring a held-out split later.
    pub scorer: VandalismScorer,
    /// Rows removed because their diff could not be retrieved.
    pub dropped: usize,
}

/// Drops unusable rows, computes row features and fold-safe vandalism scores.
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    params: ScorerParams,
}

fn usable_rows(records: &[EditRecord]) -> Vec<EditRecord> {
    let usable = records
        .iter()
        .filter(|record| !record.is_bad_request())
        .cloned()
        .collect::<Vec<_>>();
    let dropped = records.len() - usable.len();
    if dropped > 0 {
        info!(dropped, remaining = usable.len(), "Dropped rows with BAD REQUEST diffs");
    }
    usable
}

fn attach(records: Vec<EditRecord>, scores: Vec<f64>) -> Vec<FeatureRow> {
    debug!(num_rows = records.len(), "Computing row features");
    records
        .into_par_iter()
        .zip(scores)
        .map(|(record, score)| FeatureRow::new(record, score))
        .collect()
}

impl Preprocessor {
    #[must_use]
    pub fn new(params: ScorerParams) -> Self {
        Self { params }
    }

    #[must_use]
    pub fn params(&self) -> &ScorerParams {
        &self.params
    }

    /// Build the feature table for a labeled dataset.
    ///
    /// `BAD REQUEST` rows are removed first, so they take no part in the
    /// vocabulary, the fold assignment, or any counts. `records` is not
    /// modified.
    pub fn run(&self, records: &[EditRecord]) -> Result<FeatureTable> {
        let usable = usable_rows(records);
        let labels = usable
            .iter()
            .enumerate()
            .map(|(idx, record)| {
                record.isvandalism.ok_or_else(|| {
                    ScorerError::InvalidInput(format!("usable row {idx} has no isvandalism label"))
                })
            })
            .collect::<Result<Vec<bool>>>()?;

        let mut scorer = VandalismScorer::new(self.params);
        scorer.fit(&usable, &labels)?;
        let scores = scorer.score(&usable)?;

        let dropped = records.len() - usable.len();
        let rows = attach(usable, scores);
        info!(
            num_rows = rows.len(),
            dropped,
            vocab_size = scorer.vocabulary().map_or(0, |vocab| vocab.len()),
            "Feature table complete"
        );
        Ok(FeatureTable {
            rows,
            scorer,
            dropped,
        })
    }

    /// Build feature rows for edits outside the training set.
    ///
    /// Scores come from [`VandalismScorer::score_held_out`]; labels, if any,
    /// are carried through but not used.
    pub fn run_held_out(scorer: &VandalismScorer, records: &[EditRecord]) -> Result<Vec<FeatureRow>> {
        let usable = usable_rows(records);
        let scores = scorer.score_held_out(&usable)?;
        Ok(attach(usable, scores))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BAD_REQUEST;

    fn edit(user: &str, added: &str, isvandalism: bool) -> EditRecord {
        EditRecord {
            title: "Example".to_owned(),
            user: user.to_owned(),
            user_reg_time: Some(1_000_000_000_i64.into()),
            current_timestamp: 1_000_000_000 + 3 * 86_400,
            comment: (!isvandalism).then(|| "copyedit".to_owned()),
            ..EditRecord::from_diff(added, "old text")
        }
        .with_label(isvandalism)
    }

    fn dataset() -> Vec<EditRecord> {
        vec![
            edit("10.0.0.1", "poop lol", true),
            edit("Alice", "fixed citation", false),
            edit("10.0.0.2", "poop", true),
            edit("Bob", "fixed typo", false),
            edit("::1", "poop poop", true),
            edit("Carol", "fixed", false),
        ]
    }

    fn params(n_folds: usize) -> ScorerParams {
        ScorerParams::new(1.0, n_folds, 216).unwrap()
    }

    #[test]
    fn test_run_attaches_all_columns() {
        let table = Preprocessor::new(params(2)).run(&dataset()).unwrap();
        assert_eq!(table.rows.len(), 6);
        assert_eq!(table.dropped, 0);

        let first = &table.rows[0];
        assert!(first.is_ip);
        assert!(first.comment_empty);
        assert_eq!(first.account_age, 3);
        assert_eq!((first.word_count_added, first.word_count_deleted), (2, 2));
        assert!(first.vandalism_score > 0.5);

        let second = &table.rows[1];
        assert!(!second.is_ip);
        assert!(!second.comment_empty);
        assert!(second.vandalism_score < 0.5);
    }

    #[test]
    fn test_bad_requests_dropped_before_fit() {
        let mut records = dataset();
        records.insert(1, EditRecord::from_diff(BAD_REQUEST, "").with_label(true));
        records.push(EditRecord::from_diff("bad request spam", BAD_REQUEST).with_label(false));

        let table = Preprocessor::new(params(2)).run(&records).unwrap();
        assert_eq!(table.dropped, 2);
        assert_eq!(table.rows.len(), 6);
        assert_eq!(records.len(), 8);

        let vocab = table.scorer.vocabulary().unwrap();
        assert_eq!(vocab.get("bad"), None);
        assert_eq!(vocab.get("spam"), None);
        assert!(vocab.get("poop").is_some());
    }

    #[test]
    fn test_run_requires_labels() {
        let mut records = dataset();
        records[3].isvandalism = None;
        assert!(matches!(
            Preprocessor::default().run(&records),
            Err(ScorerError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_run_rejects_too_few_rows_for_folds() {
        let records = dataset();
        assert!(matches!(
            Preprocessor::new(params(4)).run(&records[..3]),
            Err(ScorerError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_run_is_deterministic() {
        let records = dataset();
        let a = Preprocessor::new(params(3)).run(&records).unwrap();
        let b = Preprocessor::new(params(3)).run(&records).unwrap();
        assert_eq!(a.rows, b.rows);
    }

    #[test]
    fn test_held_out_rows() {
        let table = Preprocessor::new(params(2)).run(&dataset()).unwrap();
        let held_out = vec![
            EditRecord::from_diff("poop", ""),
            EditRecord::from_diff(BAD_REQUEST, ""),
            EditRecord::from_diff("fixed", ""),
        ];
        let rows = Preprocessor::run_held_out(&table.scorer, &held_out).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].vandalism_score > 0.5);
        assert!(rows[1].vandalism_score < 0.5);
        assert_eq!(rows[0].account_age, features::DEFAULT_ACCOUNT_AGE);
    }

    #[test]
    fn test_held_out_needs_fitted_scorer() {
        let scorer = VandalismScorer::default();
        assert_eq!(
            Preprocessor::run_held_out(&scorer, &dataset()),
            Err(ScorerError::NotFitted)
        );
    }

    #[test]
    fn test_feature_row_column_names() {
        let table = Preprocessor::new(params(2)).run(&dataset()).unwrap();
        let value = serde_json::to_value(&table.rows[0]).unwrap();
        for column in [
            "title",
            "user",
            "added_lines",
            "isvandalism",
            "vandalism_score",
            "account_age",
            "is_IP",
            "comment_empty",
            "word_count_added",
            "word_count_deleted",
        ] {
            assert!(value.get(column).is_some(), "missing column {column}");
        }
    }

    #[test]
    fn test_rerun_overwrites_derived_columns() {
        let first = Preprocessor::new(params(2)).run(&dataset()).unwrap();
        let json = serde_json::to_string(&first.rows).unwrap();
        let records: Vec<EditRecord> = serde_json::from_str(&json).unwrap();
        assert!(records[0].extra.contains_key("vandalism_score"));

        let second = Preprocessor::new(params(2)).run(&records).unwrap();
        assert_eq!(second.rows[0].record.extra.len(), 0);
        let out = serde_json::to_string(&second.rows[0]).unwrap();
        for column in DERIVED_COLUMNS {
            assert_eq!(out.matches(&format!("\"{column}\"")).count(), 1, "{column}");
        }
        assert_eq!(first.rows, second.rows);
    }
}
