use super::{DatasetError, RawRecord};
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Records paired with their regression targets, held in memory.
#[derive(Clone, Debug, Default)]
pub struct TabularDataset {
    records: Vec<RawRecord>,
    targets: Vec<f64>,
}

impl TabularDataset {
    pub fn new(records: Vec<RawRecord>, targets: Vec<f64>) -> Result<Self, DatasetError> {
        if records.len() != targets.len() {
            return Err(DatasetError::LengthMismatch {
                records: records.len(),
                targets: targets.len(),
            });
        }
        Ok(Self { records, targets })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }

    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    pub fn targets_array(&self) -> Array1<f64> {
        Array1::from(self.targets.clone())
    }

    /// Shuffled holdout split.
    ///
    /// The test part holds `ceil(n * test_fraction)` rows. The shuffle is driven
    /// by `seed`, so the same dataset and seed always give the same partition.
    pub fn train_test_split(
        &self,
        test_fraction: f64,
        seed: u64,
    ) -> Result<(TabularDataset, TabularDataset), DatasetError> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(DatasetError::InvalidFraction(test_fraction));
        }
        let n = self.len();
        let n_test = (n as f64 * test_fraction).ceil() as usize;
        if n_test == 0 || n_test >= n {
            return Err(DatasetError::TooSmall {
                n_rows: n,
                test_fraction,
            });
        }

        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let (test_idx, train_idx) = indices.split_at(n_test);
        Ok((self.select(train_idx), self.select(test_idx)))
    }

    fn select(&self, indices: &[usize]) -> TabularDataset {
        TabularDataset {
            records: indices.iter().map(|&i| self.records[i].clone()).collect(),
            targets: indices.iter().map(|&i| self.targets[i]).collect(),
        }
    }
}
