use std::{
    borrow::Cow,
    collections::BTreeSet,
    sync::{
        LazyLock,
        atomic::{AtomicBool, Ordering},
    },
};

use indicatif::{
    ParallelProgressIterator, ProgressBar, ProgressDrawTarget, ProgressIterator, ProgressStyle,
};
use rayon::prelude::*;
use regex::Regex;
use tracing::debug;

/// Minimum number of rows to consider parallelization
const MIN_ROWS_FOR_PARALLEL: usize = 100;

/// Minimum total character count to consider parallelization
const MIN_CHARS_FOR_PARALLEL: usize = 10_000;

/// Anything that is not a word character or whitespace becomes a separator.
static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("punctuation pattern is valid"));

static SHOW_PROGRESS: AtomicBool = AtomicBool::new(true);

/// Enable or disable the progress bars drawn by batch tokenization and
/// vocabulary building. Bars are shown by default.
pub fn set_progress_visible(visible: bool) {
    SHOW_PROGRESS.store(visible, Ordering::Relaxed);
}

pub(crate) fn progress_bar_setup(len: usize, message: impl Into<Cow<'static, str>>) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if !SHOW_PROGRESS.load(Ordering::Relaxed) {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }
    pb.set_style(
        ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb.set_message(message);
    pb
}

/// Lowercase `text` with punctuation replaced by spaces.
#[must_use]
pub fn normalize(text: &str) -> String {
    PUNCTUATION.replace_all(text, " ").to_lowercase()
}

/// Normalized tokens of `text` in order, duplicates kept. `None` yields nothing.
#[must_use]
pub fn tokens(text: Option<&str>) -> Vec<String> {
    text.map(normalize)
        .map(|normalized| normalized.split_whitespace().map(str::to_owned).collect())
        .unwrap_or_default()
}

fn token_set(text: Option<&str>) -> BTreeSet<String> {
    tokens(text).into_iter().collect()
}

/// Distinct tokens present in `added` but not in `deleted`.
///
/// ```
/// use vandal_pre_processing::words_added;
///
/// let words = words_added(Some("a b"), Some("a"));
/// assert_eq!(words.into_iter().collect::<Vec<_>>(), vec!["b"]);
/// ```
#[must_use]
pub fn words_added(added: Option<&str>, deleted: Option<&str>) -> BTreeSet<String> {
    let mut words = token_set(added);
    if words.is_empty() {
        return words;
    }
    for token in token_set(deleted) {
        words.remove(&token);
    }
    words
}

fn words_added_par<A, D>(diffs: &[(A, D)]) -> Vec<BTreeSet<String>>
where
    A: AsRef<str> + Sync,
    D: AsRef<str> + Sync,
{
    debug!(num_rows = diffs.len(), "Using parallel diff tokenization");
    let pb = progress_bar_setup(diffs.len(), "Tokenizing diffs in parallel");
    let result = diffs
        .par_iter()
        .progress_with(pb.clone())
        .map(|(added, deleted)| words_added(Some(added.as_ref()), Some(deleted.as_ref())))
        .collect();
    pb.finish_with_message("Parallel diff tokenization complete");
    result
}

fn words_added_seq<A, D>(diffs: &[(A, D)]) -> Vec<BTreeSet<String>>
where
    A: AsRef<str>,
    D: AsRef<str>,
{
    debug!(num_rows = diffs.len(), "Using sequential diff tokenization");
    let pb = progress_bar_setup(diffs.len(), "Tokenizing diffs");
    let result = diffs
        .iter()
        .progress_with(pb.clone())
        .map(|(added, deleted)| words_added(Some(added.as_ref()), Some(deleted.as_ref())))
        .collect();
    pb.finish_with_message("Diff tokenization complete");
    result
}

/// Determine if parallel processing should be used based on workload characteristics.
///
/// Parallelization is beneficial when there are many rows, or when the total
/// character count is large.
#[inline]
fn should_use_parallel<A: AsRef<str>, D: AsRef<str>>(diffs: &[(A, D)]) -> bool {
    let num_rows = diffs.len();

    if num_rows >= MIN_ROWS_FOR_PARALLEL {
        return true;
    }

    let total_chars: usize = diffs
        .iter()
        .map(|(added, deleted)| added.as_ref().len() + deleted.as_ref().len())
        .sum();

    total_chars >= MIN_CHARS_FOR_PARALLEL
}

/// [`words_added`] for every `(added, deleted)` pair, in input order.
pub fn words_added_batch<A, D>(diffs: &[(A, D)]) -> Vec<BTreeSet<String>>
where
    A: AsRef<str> + Sync,
    D: AsRef<str> + Sync,
{
    if should_use_parallel(diffs) {
        words_added_par(diffs)
    } else {
        words_added_seq(diffs)
    }
}
