use sprs::CsMat;

/// Per-token row counts split by label, indexed by vocabulary index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WordStatistics {
    vandalism: Vec<u64>,
    constructive: Vec<u64>,
}

impl WordStatistics {
    #[must_use]
    pub fn zeros(num_features: usize) -> Self {
        Self {
            vandalism: vec![0; num_features],
            constructive: vec![0; num_features],
        }
    }

    /// Count the given `rows` of a presence matrix.
    ///
    /// A token contributes at most once per row because the matrix stores
    /// presence, not frequency.
    pub fn from_rows(
        presence: &CsMat<f64>,
        labels: &[bool],
        rows: impl IntoIterator<Item = usize>,
    ) -> Self {
        let mut stats = Self::zeros(presence.cols());
        for row in rows {
            let Some(row_vec) = presence.outer_view(row) else {
                continue;
            };
            let counts = if labels[row] {
                &mut stats.vandalism
            } else {
                &mut stats.constructive
            };
            for (col_idx, _) in row_vec.iter() {
                counts[col_idx] += 1;
            }
        }
        stats
    }

    /// Counts of `self` with `other` taken out. `other` must be a subset.
    #[must_use]
    pub fn without(&self, other: &Self) -> Self {
        let subtract = |a: &[u64], b: &[u64]| -> Vec<u64> {
            a.iter()
                .zip(b)
                .map(|(total, part)| total.saturating_sub(*part))
                .collect()
        };
        Self {
            vandalism: subtract(&self.vandalism, &other.vandalism),
            constructive: subtract(&self.constructive, &other.constructive),
        }
    }

    #[must_use]
    pub fn num_features(&self) -> usize {
        self.vandalism.len()
    }

    #[must_use]
    pub fn counts(&self, idx: usize) -> (u64, u64) {
        (self.vandalism[idx], self.constructive[idx])
    }

    /// Smoothed `P(vandalism | token)`: `(v + α) / (v + c + 2α)`.
    #[must_use]
    pub fn probability(&self, idx: usize, smoothing: f64) -> f64 {
        let (v, c) = self.counts(idx);
        (v as f64 + smoothing) / ((v + c) as f64 + 2.0 * smoothing)
    }

    /// `ln(p / (1 - p))` of [`Self::probability`], exactly zero for unseen tokens.
    #[must_use]
    pub fn log_odds(&self, idx: usize, smoothing: f64) -> f64 {
        let (v, c) = self.counts(idx);
        if v == c {
            return 0.0;
        }
        (v as f64 + smoothing).ln() - (c as f64 + smoothing).ln()
    }
}
