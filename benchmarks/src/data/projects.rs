use ndarray::{Array1, Array2};
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use siteml::dataset::{RawRecord, TabularDataset, Value};
use siteml::preprocessing::{
    FeaturePreprocessor, FeatureSchema, FittedFeaturePreprocessor, FittedTransformer, Transformer,
};

const LABELS: [&str; 5] = ["Alpha", "Beta", "Gamma", "Delta", "Epsilon"];

/// Seeded generator of project rows for a schema.
///
/// The target is a fixed linear mix of the numeric columns plus a per-label
/// offset for each categorical column, with uniform noise. About 5% of the
/// numeric cells are missing.
pub struct SyntheticProjects {
    schema: FeatureSchema,
    seed: u64,
    missing_rate: f64,
}

impl SyntheticProjects {
    pub fn new(schema: FeatureSchema, seed: u64) -> Self {
        Self {
            schema,
            seed,
            missing_rate: 0.05,
        }
    }

    /// The carbon emission schema, the widest preset.
    pub fn carbon_emission(seed: u64) -> Self {
        Self::new(FeatureSchema::carbon_emission(), seed)
    }

    pub fn with_missing_rate(mut self, missing_rate: f64) -> Self {
        self.missing_rate = missing_rate;
        self
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn generate(&self, n_rows: usize) -> TabularDataset {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let value = Uniform::new(0.0, 100.0);
        let noise = Uniform::new(-1.0, 1.0);
        let weights: Vec<f64> = (0..self.schema.numeric().len())
            .map(|i| 0.5 + (i % 4) as f64 * 0.25)
            .collect();

        let mut records = Vec::with_capacity(n_rows);
        let mut targets = Vec::with_capacity(n_rows);
        for _ in 0..n_rows {
            let mut record = RawRecord::new();
            let mut target = 0.0;
            for (name, w) in self.schema.numeric().iter().zip(&weights) {
                let v = value.sample(&mut rng);
                target += w * v;
                if rng.gen_bool(self.missing_rate) {
                    record.insert(name.clone(), Value::Missing);
                } else {
                    record.insert(name.clone(), v);
                }
            }
            for (j, name) in self.schema.categorical().iter().enumerate() {
                let k = rng.gen_range(0..LABELS.len());
                target += ((k + j) % LABELS.len()) as f64 * 10.0;
                record.insert(name.clone(), LABELS[k]);
            }
            records.push(record);
            targets.push(target + noise.sample(&mut rng));
        }

        TabularDataset::new(records, targets).expect("records and targets have equal length")
    }

    /// Generate, split, and preprocess in one go.
    pub fn prepare(&self, n_rows: usize, test_fraction: f64) -> PreparedSplit {
        let dataset = self.generate(n_rows);
        let (train, test) = dataset
            .train_test_split(test_fraction, self.seed)
            .expect("synthetic dataset is large enough to split");
        let preprocessor = FeaturePreprocessor::new(self.schema.clone())
            .fit(train.records())
            .expect("synthetic rows match their schema");
        let x_train = preprocessor
            .transform(train.records())
            .expect("transform training rows");
        let x_test = preprocessor
            .transform(test.records())
            .expect("transform test rows");
        PreparedSplit {
            y_train: train.targets_array(),
            y_test: test.targets_array(),
            x_train,
            x_test,
            preprocessor,
        }
    }
}

/// Preprocessed matrices plus the preprocessor that produced them.
pub struct PreparedSplit {
    pub preprocessor: FittedFeaturePreprocessor,
    pub x_train: Array2<f64>,
    pub y_train: Array1<f64>,
    pub x_test: Array2<f64>,
    pub y_test: Array1<f64>,
}
