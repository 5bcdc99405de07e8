use std::fmt::Debug;

use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use tracing::debug;

use crate::{Result, ScorerError};

/// Fold index of every row, in row order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FoldAssignment {
    folds: Vec<usize>,
    n_folds: usize,
}

impl FoldAssignment {
    /// Wrap an explicit assignment. Every fold must be non-empty.
    pub fn new(folds: Vec<usize>, n_folds: usize) -> Result<Self> {
        let mut sizes = vec![0usize; n_folds];
        for &fold in &folds {
            let Some(size) = sizes.get_mut(fold) else {
                return Err(ScorerError::InvalidInput(format!(
                    "fold index {fold} out of range for {n_folds} folds"
                )));
            };
            *size += 1;
        }
        if let Some(empty) = sizes.iter().position(|&size| size == 0) {
            return Err(ScorerError::InvalidInput(format!("fold {empty} has no rows")));
        }
        Ok(Self { folds, n_folds })
    }

    #[must_use]
    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.folds.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.folds.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[usize] {
        &self.folds
    }

    /// Rows in `fold`, ascending.
    #[must_use]
    pub fn members(&self, fold: usize) -> Vec<usize> {
        self.folds
            .iter()
            .enumerate()
            .filter_map(|(row, &f)| (f == fold).then_some(row))
            .collect()
    }
}

/// Splits labeled rows into disjoint folds for fold-safe scoring.
pub trait FoldPartitioner: Debug + Send + Sync {
    fn assign(&self, labels: &[bool], n_folds: usize) -> Result<FoldAssignment>;
}

pub(crate) fn check_fold_count(n_rows: usize, n_folds: usize) -> Result<()> {
    if n_folds < 2 {
        return Err(ScorerError::InvalidInput(format!(
            "n_folds must be at least 2, got {n_folds}"
        )));
    }
    if n_folds > n_rows {
        return Err(ScorerError::InvalidInput(format!(
            "n_folds ({n_folds}) exceeds the number of rows ({n_rows})"
        )));
    }
    Ok(())
}

/// Seeded, label-stratified k-fold split.
///
/// Each class is shuffled on its own, then the vandalism rows followed by the
/// constructive rows are dealt round-robin over the folds. Per fold, class
/// counts and total sizes differ by at most one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StratifiedKFold {
    seed: u64,
}

impl StratifiedKFold {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl FoldPartitioner for StratifiedKFold {
    fn assign(&self, labels: &[bool], n_folds: usize) -> Result<FoldAssignment> {
        check_fold_count(labels.len(), n_folds)?;

        let mut rng = StdRng::seed_from_u64(self.seed);
        let (mut vandalism, mut constructive): (Vec<usize>, Vec<usize>) =
            (0..labels.len()).partition(|&row| labels[row]);
        vandalism.shuffle(&mut rng);
        constructive.shuffle(&mut rng);

        let mut folds = vec![0; labels.len()];
        for (position, &row) in vandalism.iter().chain(&constructive).enumerate() {
            folds[row] = position % n_folds;
        }

        debug!(
            n_folds,
            num_vandalism = vandalism.len(),
            num_constructive = constructive.len(),
            seed = self.seed,
            "Assigned stratified folds"
        );
        FoldAssignment::new(folds, n_folds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(vandalism: usize, constructive: usize) -> Vec<bool> {
        // Interleave so class order in the input is not trivially sorted.
        let mut labels = vec![true; vandalism];
        labels.extend(std::iter::repeat_n(false, constructive));
        labels.rotate_left(vandalism / 2);
        labels
    }

    fn class_counts(assignment: &FoldAssignment, labels: &[bool]) -> Vec<(usize, usize)> {
        (0..assignment.n_folds())
            .map(|fold| {
                let members = assignment.members(fold);
                let vandalism = members.iter().filter(|&&row| labels[row]).count();
                (vandalism, members.len() - vandalism)
            })
            .collect()
    }

    #[test]
    fn test_same_seed_same_assignment() {
        let labels = labels(17, 43);
        let a = StratifiedKFold::new(216).assign(&labels, 5).unwrap();
        let b = StratifiedKFold::new(216).assign(&labels, 5).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_stratification_within_one() {
        let labels = labels(17, 43);
        let assignment = StratifiedKFold::new(7).assign(&labels, 4).unwrap();
        assert_eq!(assignment.len(), labels.len());

        let counts = class_counts(&assignment, &labels);
        let spread = |values: Vec<usize>| {
            values.iter().max().unwrap() - values.iter().min().unwrap()
        };
        assert!(spread(counts.iter().map(|c| c.0).collect()) <= 1);
        assert!(spread(counts.iter().map(|c| c.1).collect()) <= 1);
        assert!(spread(counts.iter().map(|c| c.0 + c.1).collect()) <= 1);
        assert_eq!(counts.iter().map(|c| c.0).sum::<usize>(), 17);
    }

    #[test]
    fn test_folds_cover_every_row_once() {
        let labels = labels(3, 3);
        let assignment = StratifiedKFold::new(1).assign(&labels, 2).unwrap();
        let mut rows = assignment.members(0);
        rows.extend(assignment.members(1));
        rows.sort_unstable();
        assert_eq!(rows, (0..6).collect::<Vec<_>>());
        assert!(assignment.as_slice().iter().all(|&fold| fold < 2));
    }

    #[test]
    fn test_single_class_still_splits() {
        let assignment = StratifiedKFold::new(0).assign(&[false; 5], 5).unwrap();
        for fold in 0..5 {
            assert_eq!(assignment.members(fold).len(), 1);
        }
    }

    #[test]
    fn test_rejects_bad_fold_counts() {
        let partitioner = StratifiedKFold::new(0);
        assert!(matches!(
            partitioner.assign(&[true, false, true], 1),
            Err(ScorerError::InvalidInput(_))
        ));
        assert!(matches!(
            partitioner.assign(&[true, false, true], 4),
            Err(ScorerError::InvalidInput(_))
        ));
        assert!(matches!(partitioner.assign(&[], 2), Err(ScorerError::InvalidInput(_))));
    }

    #[test]
    fn test_explicit_assignment_validation() {
        assert!(FoldAssignment::new(vec![0, 1, 0], 2).is_ok());
        assert!(FoldAssignment::new(vec![0, 0, 0], 2).is_err());
        assert!(FoldAssignment::new(vec![0, 2], 2).is_err());
    }
}
