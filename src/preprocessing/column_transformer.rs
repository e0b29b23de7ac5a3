//! Schema-driven column transformer.
//!
//! Routes numeric columns through median imputation and standard scaling, and
//! categorical columns through most-frequent imputation and one-hot encoding,
//! then concatenates the two blocks as `[numeric | one-hot]`.

use crate::dataset::{RawRecord, Value};
use crate::preprocessing::encoding::{
    FittedOneHotEncoder, HandleUnknown, OneHotEncoder, OneHotEncoderParams,
};
use crate::preprocessing::error::PreprocessingError;
use crate::preprocessing::imputation::{
    CategoricalImputer, CategoricalImputerParams, FittedCategoricalImputer, FittedSimpleImputer,
    ImputeStrategy, SimpleImputer, SimpleImputerParams,
};
use crate::preprocessing::scaling::{FittedStandardScaler, StandardScaler, StandardScalerParams};
use crate::preprocessing::schema::FeatureSchema;
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use crate::preprocessing::CategoricalMatrix;
use ndarray::{concatenate, Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Tunable parts of the preprocessing recipe.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessorConfig {
    pub numeric_strategy: ImputeStrategy,
    pub handle_unknown: HandleUnknown,
}

impl Default for PreprocessorConfig {
    fn default() -> Self {
        Self {
            numeric_strategy: ImputeStrategy::Median,
            handle_unknown: HandleUnknown::Ignore,
        }
    }
}

/// Unfitted preprocessor bound to a feature schema.
///
/// # Example
/// ```ignore
/// use siteml::preprocessing::{FeaturePreprocessor, FeatureSchema, Transformer, FittedTransformer};
///
/// let preprocessor = FeaturePreprocessor::new(FeatureSchema::carbon_emission());
/// let fitted = preprocessor.fit(train.records())?;
/// let x_train = fitted.transform(train.records())?;
/// let x_test = fitted.transform(test.records())?;
/// ```
#[derive(Clone, Debug)]
pub struct FeaturePreprocessor {
    schema: FeatureSchema,
    config: PreprocessorConfig,
}

impl FeaturePreprocessor {
    pub fn new(schema: FeatureSchema) -> Self {
        Self::with_config(schema, PreprocessorConfig::default())
    }

    pub fn with_config(schema: FeatureSchema, config: PreprocessorConfig) -> Self {
        Self { schema, config }
    }

    pub fn with_numeric_strategy(mut self, strategy: ImputeStrategy) -> Self {
        self.config.numeric_strategy = strategy;
        self
    }

    pub fn with_handle_unknown(mut self, handle_unknown: HandleUnknown) -> Self {
        self.config.handle_unknown = handle_unknown;
        self
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }
}

/// How a row lacking a declared column is treated.
#[derive(Clone, Copy, PartialEq)]
enum AbsentColumn {
    Missing,
    Reject,
}

fn numeric_matrix(
    schema: &FeatureSchema,
    rows: &[RawRecord],
    absent: AbsentColumn,
) -> Result<Array2<f64>, PreprocessingError> {
    let cols = schema.numeric();
    let mut out = Array2::from_elem((rows.len(), cols.len()), f64::NAN);
    for (i, row) in rows.iter().enumerate() {
        for (j, name) in cols.iter().enumerate() {
            out[[i, j]] = match row.get(name) {
                None if absent == AbsentColumn::Missing => f64::NAN,
                None => {
                    return Err(PreprocessingError::schema(
                        name.as_str(),
                        format!("missing from row {i}"),
                    ))
                }
                Some(Value::Missing) => f64::NAN,
                Some(value) => match value.as_number() {
                    Some(v) if v.is_finite() => v,
                    Some(v) => {
                        return Err(PreprocessingError::schema(
                            name.as_str(),
                            format!("non-finite value {v} in row {i}"),
                        ))
                    }
                    None => {
                        return Err(PreprocessingError::schema(
                            name.as_str(),
                            format!("non-numeric value {value:?} in row {i}"),
                        ))
                    }
                },
            };
        }
    }
    Ok(out)
}

fn categorical_matrix(
    schema: &FeatureSchema,
    rows: &[RawRecord],
    absent: AbsentColumn,
) -> Result<CategoricalMatrix, PreprocessingError> {
    let cols = schema.categorical();
    let mut out = Array2::from_elem((rows.len(), cols.len()), None);
    for (i, row) in rows.iter().enumerate() {
        for (j, name) in cols.iter().enumerate() {
            out[[i, j]] = match row.get(name) {
                None if absent == AbsentColumn::Missing => None,
                None => {
                    return Err(PreprocessingError::schema(
                        name.as_str(),
                        format!("missing from row {i}"),
                    ))
                }
                Some(value) => value.as_category(),
            };
        }
    }
    Ok(out)
}

impl Transformer for FeaturePreprocessor {
    type Input = [RawRecord];
    type Output = Array2<f64>;
    type Params = PreprocessorParams;
    type Fitted = FittedFeaturePreprocessor;

    fn fit(&self, rows: &[RawRecord]) -> Result<FittedFeaturePreprocessor, PreprocessingError> {
        self.schema.validate()?;
        if rows.is_empty() {
            return Err(PreprocessingError::EmptyData(
                "Cannot fit FeaturePreprocessor on zero rows".to_string(),
            ));
        }
        for name in self.schema.columns() {
            if !rows.iter().any(|row| row.contains(name)) {
                return Err(PreprocessingError::schema(
                    name.as_str(),
                    "declared column is absent from every training row",
                ));
            }
        }

        let numeric = numeric_matrix(&self.schema, rows, AbsentColumn::Missing)?;
        let numeric_imputer =
            SimpleImputer::new(self.config.numeric_strategy.clone()).fit(&numeric)?;
        // scaling statistics are computed on the imputed values
        let imputed = numeric_imputer.transform(&numeric)?;
        let scaler = StandardScaler::new().fit(&imputed)?;

        let categorical = categorical_matrix(&self.schema, rows, AbsentColumn::Missing)?;
        let categorical_imputer = CategoricalImputer::new().fit(&categorical)?;
        let encoder = OneHotEncoder::new()
            .with_handle_unknown(self.config.handle_unknown)
            .with_feature_names(self.schema.categorical().to_vec())
            .fit(&categorical_imputer.transform(&categorical)?)?;

        let fitted = FittedFeaturePreprocessor {
            schema: self.schema.clone(),
            numeric_imputer,
            scaler,
            categorical_imputer,
            encoder,
        };
        debug!(
            rows = rows.len(),
            features_out = fitted.n_features_out(),
            "fitted feature preprocessor"
        );
        Ok(fitted)
    }
}

/// Serializable parameters for a fitted FeaturePreprocessor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreprocessorParams {
    pub schema: FeatureSchema,
    pub numeric_imputer: SimpleImputerParams,
    pub scaler: StandardScalerParams,
    pub categorical_imputer: CategoricalImputerParams,
    pub encoder: OneHotEncoderParams,
}

/// Fitted preprocessor; immutable once built.
#[derive(Clone, Debug)]
pub struct FittedFeaturePreprocessor {
    schema: FeatureSchema,
    numeric_imputer: FittedSimpleImputer,
    scaler: FittedStandardScaler,
    categorical_imputer: FittedCategoricalImputer,
    encoder: FittedOneHotEncoder,
}

impl FittedFeaturePreprocessor {
    /// The schema this preprocessor was fitted with.
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Fails unless `expected` is exactly the fit-time schema.
    pub fn check_schema(&self, expected: &FeatureSchema) -> Result<(), PreprocessingError> {
        self.schema.ensure_matches(expected)
    }

    pub fn numeric_imputer(&self) -> &FittedSimpleImputer {
        &self.numeric_imputer
    }

    pub fn scaler(&self) -> &FittedStandardScaler {
        &self.scaler
    }

    pub fn encoder(&self) -> &FittedOneHotEncoder {
        &self.encoder
    }

    /// Width of the transformed matrix.
    pub fn n_features_out(&self) -> usize {
        self.schema.numeric().len() + self.encoder.n_features_out()
    }

    /// Output column names in matrix order.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = self.schema.numeric().to_vec();
        names.extend(self.encoder.feature_names_out());
        names
    }

    /// Transform a single record into one feature row.
    pub fn transform_one(&self, record: &RawRecord) -> Result<Array1<f64>, PreprocessingError> {
        let matrix = self.transform(std::slice::from_ref(record))?;
        Ok(matrix.row(0).to_owned())
    }
}

impl FittedTransformer for FittedFeaturePreprocessor {
    type Input = [RawRecord];
    type Output = Array2<f64>;
    type Params = PreprocessorParams;

    fn transform(&self, rows: &[RawRecord]) -> Result<Array2<f64>, PreprocessingError> {
        let numeric = numeric_matrix(&self.schema, rows, AbsentColumn::Reject)?;
        let numeric = self.scaler.transform(&self.numeric_imputer.transform(&numeric)?)?;

        let categorical = categorical_matrix(&self.schema, rows, AbsentColumn::Reject)?;
        let encoded = self
            .encoder
            .transform(&self.categorical_imputer.transform(&categorical)?)?;

        concatenate(Axis(1), &[numeric.view(), encoded.view()])
            .map_err(|e| PreprocessingError::InvalidParameter(e.to_string()))
    }

    fn extract_params(&self) -> PreprocessorParams {
        PreprocessorParams {
            schema: self.schema.clone(),
            numeric_imputer: self.numeric_imputer.extract_params(),
            scaler: self.scaler.extract_params(),
            categorical_imputer: self.categorical_imputer.extract_params(),
            encoder: self.encoder.extract_params(),
        }
    }

    fn from_params(params: PreprocessorParams) -> Result<Self, PreprocessingError> {
        params.schema.validate()?;
        let n_numeric = params.schema.numeric().len();
        let n_categorical = params.schema.categorical().len();

        let numeric_imputer = FittedSimpleImputer::from_params(params.numeric_imputer)?;
        let scaler = FittedStandardScaler::from_params(params.scaler)?;
        let categorical_imputer =
            FittedCategoricalImputer::from_params(params.categorical_imputer)?;
        let encoder = FittedOneHotEncoder::from_params(params.encoder)?;

        let widths = [
            (numeric_imputer.n_features_in(), n_numeric),
            (scaler.n_features_in(), n_numeric),
            (categorical_imputer.n_features_in(), n_categorical),
            (encoder.n_features_in(), n_categorical),
        ];
        if let Some(&(got, expected)) = widths.iter().find(|(got, expected)| got != expected) {
            return Err(PreprocessingError::FeatureMismatch {
                expected_features: expected,
                got_features: got,
            });
        }

        Ok(Self {
            schema: params.schema,
            numeric_imputer,
            scaler,
            categorical_imputer,
            encoder,
        })
    }

    fn n_features_in(&self) -> usize {
        self.schema.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::SerializableParams;

    fn schema() -> FeatureSchema {
        FeatureSchema::new(
            vec!["Duration(days)".into(), "Rainfall(mm)".into()],
            vec!["WeatherCondition".into()],
        )
    }

    fn rows() -> Vec<RawRecord> {
        vec![
            RawRecord::new()
                .with("Duration(days)", 30.0)
                .with("Rainfall(mm)", 2.0)
                .with("WeatherCondition", "Sunny"),
            RawRecord::new()
                .with("Duration(days)", Value::Missing)
                .with("Rainfall(mm)", 4.0)
                .with("WeatherCondition", "Rainy"),
            RawRecord::new()
                .with("Duration(days)", 60.0)
                .with("Rainfall(mm)", 6.0)
                .with("WeatherCondition", Value::Missing),
        ]
    }

    #[test]
    fn test_duration_median_imputation_scales_to_zero() {
        let schema = FeatureSchema::new(vec!["Duration".into()], vec![]);
        let train = vec![
            RawRecord::new().with("Duration", 30.0),
            RawRecord::new().with("Duration", Value::Missing),
        ];
        let fitted = FeaturePreprocessor::new(schema).fit(&train).unwrap();
        assert_eq!(fitted.numeric_imputer().statistics()[0], 30.0);
        assert_eq!(fitted.scaler().mean()[0], 30.0);

        let out = fitted
            .transform(&[RawRecord::new().with("Duration", Value::Missing)])
            .unwrap();
        assert_eq!(out.shape(), &[1, 1]);
        assert_eq!(out[[0, 0]], 0.0);
    }

    #[test]
    fn test_output_layout_and_determinism() {
        let fitted = FeaturePreprocessor::new(schema()).fit(&rows()).unwrap();
        assert_eq!(
            fitted.feature_names(),
            vec![
                "Duration(days)",
                "Rainfall(mm)",
                "WeatherCondition=Rainy",
                "WeatherCondition=Sunny"
            ]
        );

        let first = fitted.transform(&rows()).unwrap();
        let second = fitted.transform(&rows()).unwrap();
        assert_eq!(first.shape(), &[3, 4]);
        assert_eq!(first, second);
        assert!(first.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_missing_values_take_fit_time_statistics() {
        let fitted = FeaturePreprocessor::new(schema()).fit(&rows()).unwrap();
        let out = fitted.transform(&rows()).unwrap();

        // median(30, 60) = 45, imputed column [30, 45, 60] has mean 45
        assert_eq!(fitted.numeric_imputer().statistics()[0], 45.0);
        assert!(out[[1, 0]].abs() < 1e-12);

        // categorical tie between Rainy and Sunny resolves to Rainy
        assert_eq!(out.row(2).to_vec()[2..], [1.0, 0.0]);
    }

    #[test]
    fn test_unknown_category_encodes_as_zeros() {
        let fitted = FeaturePreprocessor::new(schema()).fit(&rows()).unwrap();
        let record = RawRecord::new()
            .with("Duration(days)", 45.0)
            .with("Rainfall(mm)", 4.0)
            .with("WeatherCondition", "Snowy");
        let row = fitted.transform_one(&record).unwrap();
        assert_eq!(row.len(), 4);
        assert_eq!(row.to_vec()[2..], [0.0, 0.0]);
    }

    #[test]
    fn test_unknown_category_bucket() {
        let fitted = FeaturePreprocessor::new(schema())
            .with_handle_unknown(HandleUnknown::Bucket)
            .fit(&rows())
            .unwrap();
        assert_eq!(fitted.n_features_out(), 5);
        let record = RawRecord::new()
            .with("Duration(days)", 45.0)
            .with("Rainfall(mm)", 4.0)
            .with("WeatherCondition", "Snowy");
        let row = fitted.transform_one(&record).unwrap();
        assert_eq!(row.to_vec()[2..], [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_column_absent_from_every_row() {
        let records: Vec<RawRecord> = rows()
            .into_iter()
            .map(|r| {
                r.iter()
                    .filter(|(k, _)| k.as_str() != "Rainfall(mm)")
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .collect();
        match FeaturePreprocessor::new(schema()).fit(&records).unwrap_err() {
            PreprocessingError::Schema { column, .. } => assert_eq!(column, "Rainfall(mm)"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_transform_rejects_absent_column() {
        let fitted = FeaturePreprocessor::new(schema()).fit(&rows()).unwrap();
        let record = RawRecord::new()
            .with("Duration(days)", 45.0)
            .with("WeatherCondition", "Sunny");
        match fitted.transform_one(&record).unwrap_err() {
            PreprocessingError::Schema { column, .. } => assert_eq!(column, "Rainfall(mm)"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_numeric_text_is_schema_error() {
        let mut records = rows();
        records[0].insert("Rainfall(mm)", "heavy");
        assert!(matches!(
            FeaturePreprocessor::new(schema()).fit(&records),
            Err(PreprocessingError::Schema { .. })
        ));
    }

    #[test]
    fn test_empty_rows() {
        assert!(matches!(
            FeaturePreprocessor::new(schema()).fit(&[]),
            Err(PreprocessingError::EmptyData(_))
        ));
    }

    #[test]
    fn test_fit_only_uses_training_rows() {
        let train = rows();
        let test = vec![RawRecord::new()
            .with("Duration(days)", 1000.0)
            .with("Rainfall(mm)", 1000.0)
            .with("WeatherCondition", "Stormy")];
        let fitted = FeaturePreprocessor::new(schema()).fit(&train).unwrap();
        let before = fitted.extract_params();
        fitted.transform(&test).unwrap();
        assert_eq!(fitted.extract_params(), before);
        assert_eq!(fitted.scaler().mean()[0], 45.0);
    }

    #[test]
    fn test_params_bytes_round_trip() {
        let fitted = FeaturePreprocessor::new(schema()).fit(&rows()).unwrap();
        let bytes = fitted.extract_params().to_bytes().unwrap();
        let restored =
            FittedFeaturePreprocessor::from_params(PreprocessorParams::from_bytes(&bytes).unwrap())
                .unwrap();
        assert_eq!(
            fitted.transform(&rows()).unwrap(),
            restored.transform(&rows()).unwrap()
        );
        assert_eq!(restored.schema(), &schema());
    }

    #[test]
    fn test_from_params_detects_width_mismatch() {
        let fitted = FeaturePreprocessor::new(schema()).fit(&rows()).unwrap();
        let mut params = fitted.extract_params();
        params.schema = FeatureSchema::new(
            vec!["Duration(days)".into()],
            vec!["WeatherCondition".into()],
        );
        assert!(matches!(
            FittedFeaturePreprocessor::from_params(params),
            Err(PreprocessingError::FeatureMismatch { .. })
        ));
    }

    #[test]
    fn test_check_schema() {
        let fitted = FeaturePreprocessor::new(schema()).fit(&rows()).unwrap();
        assert!(fitted.check_schema(&schema()).is_ok());
        assert!(fitted
            .check_schema(&FeatureSchema::carbon_emission())
            .is_err());
    }
}
