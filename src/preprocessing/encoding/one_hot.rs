//! One-hot encoding for categorical features.
//!
//! Each input column is treated as a categorical feature. The encoder learns
//! the sorted set of distinct labels per column during fitting and emits one
//! indicator column per label, blocks laid out in input column order.

use crate::preprocessing::encoding::HandleUnknown;
use crate::preprocessing::error::PreprocessingError;
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use crate::preprocessing::CategoricalMatrix;
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Suffix used for the reserved unknown column in feature names.
pub const UNKNOWN_LABEL: &str = "<unknown>";

/// One-hot encoder for string categories.
///
/// # Example
/// ```ignore
/// use siteml::preprocessing::{OneHotEncoder, HandleUnknown, Transformer, FittedTransformer};
///
/// let encoder = OneHotEncoder::new()
///     .with_handle_unknown(HandleUnknown::Ignore)
///     .with_feature_names(vec!["MaterialType".to_string()]);
/// let fitted = encoder.fit(&categories)?;
/// let encoded = fitted.transform(&categories)?;
/// ```
#[derive(Clone, Debug, Default)]
pub struct OneHotEncoder {
    /// How to handle unknown categories during transform.
    handle_unknown: HandleUnknown,
    feature_names: Option<Vec<String>>,
}

impl OneHotEncoder {
    /// Create a new OneHotEncoder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the strategy for handling unknown categories.
    pub fn with_handle_unknown(mut self, strategy: HandleUnknown) -> Self {
        self.handle_unknown = strategy;
        self
    }

    /// Name the input columns; used in errors and output feature names.
    pub fn with_feature_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = Some(names);
        self
    }
}

/// Serializable parameters for a fitted OneHotEncoder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoderParams {
    /// Categories (sorted unique labels) for each input column.
    pub categories: Vec<Vec<String>>,
    /// Input column names.
    pub feature_names_in: Vec<String>,
    /// Handle unknown strategy.
    pub handle_unknown: HandleUnknown,
}

/// Fitted OneHotEncoder ready for inference.
#[derive(Clone, Debug)]
pub struct FittedOneHotEncoder {
    categories: Vec<Vec<String>>,
    feature_names_in: Vec<String>,
    handle_unknown: HandleUnknown,
    /// Output width of each input column's block.
    block_widths: Vec<usize>,
    n_features_out: usize,
}

impl FittedOneHotEncoder {
    fn build(
        categories: Vec<Vec<String>>,
        feature_names_in: Vec<String>,
        handle_unknown: HandleUnknown,
    ) -> Self {
        let extra = usize::from(handle_unknown == HandleUnknown::Bucket);
        let block_widths: Vec<usize> = categories.iter().map(|c| c.len() + extra).collect();
        let n_features_out = block_widths.iter().sum();
        Self {
            categories,
            feature_names_in,
            handle_unknown,
            block_widths,
            n_features_out,
        }
    }

    /// Get the categories learned for each feature.
    pub fn categories(&self) -> &[Vec<String>] {
        &self.categories
    }

    /// Get the number of output features.
    pub fn n_features_out(&self) -> usize {
        self.n_features_out
    }

    pub fn handle_unknown(&self) -> HandleUnknown {
        self.handle_unknown
    }

    /// Output column names, `<feature>=<label>`.
    pub fn feature_names_out(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.n_features_out);
        for (feature, cats) in self.feature_names_in.iter().zip(&self.categories) {
            names.extend(cats.iter().map(|c| format!("{feature}={c}")));
            if self.handle_unknown == HandleUnknown::Bucket {
                names.push(format!("{feature}={UNKNOWN_LABEL}"));
            }
        }
        names
    }
}

impl Transformer for OneHotEncoder {
    type Input = CategoricalMatrix;
    type Output = Array2<f64>;
    type Params = OneHotEncoderParams;
    type Fitted = FittedOneHotEncoder;

    fn fit(&self, data: &Self::Input) -> Result<Self::Fitted, PreprocessingError> {
        let cols = data.ncols();
        if data.nrows() == 0 {
            return Err(PreprocessingError::EmptyData(
                "Cannot fit OneHotEncoder on empty data".to_string(),
            ));
        }

        let feature_names_in = match &self.feature_names {
            Some(names) if names.len() != cols => {
                return Err(PreprocessingError::InvalidParameter(format!(
                    "OneHotEncoder got {} feature names for {} columns",
                    names.len(),
                    cols
                )))
            }
            Some(names) => names.clone(),
            None => (0..cols).map(|i| format!("x{i}")).collect(),
        };

        let categories = data
            .axis_iter(Axis(1))
            .map(|column| {
                column
                    .iter()
                    .flatten()
                    .cloned()
                    .collect::<BTreeSet<String>>()
                    .into_iter()
                    .collect()
            })
            .collect();

        Ok(FittedOneHotEncoder::build(
            categories,
            feature_names_in,
            self.handle_unknown,
        ))
    }
}

impl FittedTransformer for FittedOneHotEncoder {
    type Input = CategoricalMatrix;
    type Output = Array2<f64>;
    type Params = OneHotEncoderParams;

    fn transform(&self, data: &Self::Input) -> Result<Self::Output, PreprocessingError> {
        if data.ncols() != self.categories.len() {
            return Err(PreprocessingError::FeatureMismatch {
                expected_features: self.categories.len(),
                got_features: data.ncols(),
            });
        }

        let mut result = Array2::zeros((data.nrows(), self.n_features_out));

        for (row_idx, row) in data.axis_iter(Axis(0)).enumerate() {
            let mut offset = 0;
            for (col, cell) in row.iter().enumerate() {
                let cats = &self.categories[col];
                let position = cell
                    .as_deref()
                    .and_then(|label| cats.binary_search_by(|c| c.as_str().cmp(label)).ok());

                match (position, self.handle_unknown) {
                    (Some(idx), _) => result[[row_idx, offset + idx]] = 1.0,
                    (None, HandleUnknown::Ignore) => {}
                    (None, HandleUnknown::Bucket) => result[[row_idx, offset + cats.len()]] = 1.0,
                    (None, HandleUnknown::Error) => {
                        return Err(PreprocessingError::UnknownCategory {
                            column: self.feature_names_in[col].clone(),
                            value: cell.clone().unwrap_or_else(|| "<missing>".to_string()),
                        })
                    }
                }

                offset += self.block_widths[col];
            }
        }

        Ok(result)
    }

    fn extract_params(&self) -> Self::Params {
        OneHotEncoderParams {
            categories: self.categories.clone(),
            feature_names_in: self.feature_names_in.clone(),
            handle_unknown: self.handle_unknown,
        }
    }

    fn from_params(params: Self::Params) -> Result<Self, PreprocessingError> {
        if params.categories.len() != params.feature_names_in.len() {
            return Err(PreprocessingError::InvalidParameter(format!(
                "OneHotEncoder params disagree: {} category lists, {} names",
                params.categories.len(),
                params.feature_names_in.len()
            )));
        }
        if params
            .categories
            .iter()
            .any(|cats| cats.windows(2).any(|w| w[0] >= w[1]))
        {
            return Err(PreprocessingError::InvalidParameter(
                "OneHotEncoder categories must be sorted and unique".to_string(),
            ));
        }
        Ok(FittedOneHotEncoder::build(
            params.categories,
            params.feature_names_in,
            params.handle_unknown,
        ))
    }

    fn n_features_in(&self) -> usize {
        self.categories.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(values: &[Option<&str>]) -> CategoricalMatrix {
        Array2::from_shape_vec(
            (values.len(), 1),
            values.iter().map(|v| v.map(str::to_string)).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_one_hot_single_column() {
        let data = column(&[Some("Wood"), Some("Steel"), Some("Wood")]);
        let fitted = OneHotEncoder::new().fit(&data).unwrap();

        assert_eq!(fitted.n_features_in(), 1);
        assert_eq!(fitted.n_features_out(), 2);
        assert_eq!(fitted.categories()[0], vec!["Steel", "Wood"]);

        let encoded = fitted.transform(&data).unwrap();
        assert_eq!(encoded.row(0).to_vec(), vec![0.0, 1.0]);
        assert_eq!(encoded.row(1).to_vec(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_one_hot_unknown_ignore_is_all_zero() {
        let fitted = OneHotEncoder::new()
            .fit(&column(&[Some("A"), Some("B")]))
            .unwrap();
        let encoded = fitted.transform(&column(&[Some("C")])).unwrap();
        assert_eq!(encoded.row(0).to_vec(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_one_hot_unknown_bucket() {
        let fitted = OneHotEncoder::new()
            .with_handle_unknown(HandleUnknown::Bucket)
            .with_feature_names(vec!["Weather".to_string()])
            .fit(&column(&[Some("A"), Some("B")]))
            .unwrap();
        assert_eq!(fitted.n_features_out(), 3);
        let encoded = fitted.transform(&column(&[Some("C"), Some("B")])).unwrap();
        assert_eq!(encoded.row(0).to_vec(), vec![0.0, 0.0, 1.0]);
        assert_eq!(encoded.row(1).to_vec(), vec![0.0, 1.0, 0.0]);
        assert_eq!(
            fitted.feature_names_out(),
            vec!["Weather=A", "Weather=B", "Weather=<unknown>"]
        );
    }

    #[test]
    fn test_one_hot_unknown_error() {
        let fitted = OneHotEncoder::new()
            .with_handle_unknown(HandleUnknown::Error)
            .with_feature_names(vec!["MaterialType".to_string()])
            .fit(&column(&[Some("A")]))
            .unwrap();
        match fitted.transform(&column(&[Some("Z")])).unwrap_err() {
            PreprocessingError::UnknownCategory { column, value } => {
                assert_eq!(column, "MaterialType");
                assert_eq!(value, "Z");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_one_hot_multi_column_blocks() {
        let data = Array2::from_shape_vec(
            (2, 2),
            vec![
                Some("x".to_string()),
                Some("p".to_string()),
                Some("y".to_string()),
                Some("q".to_string()),
            ],
        )
        .unwrap();
        let fitted = OneHotEncoder::new().fit(&data).unwrap();
        let encoded = fitted.transform(&data).unwrap();
        assert_eq!(encoded.row(0).to_vec(), vec![1.0, 0.0, 1.0, 0.0]);
        assert_eq!(encoded.row(1).to_vec(), vec![0.0, 1.0, 0.0, 1.0]);
        assert_eq!(fitted.feature_names_out(), vec!["x0=x", "x0=y", "x1=p", "x1=q"]);
    }

    #[test]
    fn test_feature_name_count_checked() {
        let err = OneHotEncoder::new()
            .with_feature_names(vec!["a".into(), "b".into()])
            .fit(&column(&[Some("A")]))
            .unwrap_err();
        assert!(matches!(err, PreprocessingError::InvalidParameter(_)));
    }

    #[test]
    fn test_params_round_trip() {
        let data = column(&[Some("A"), Some("B"), None]);
        let fitted = OneHotEncoder::new().fit(&data).unwrap();
        let restored = FittedOneHotEncoder::from_params(fitted.extract_params()).unwrap();
        assert_eq!(
            fitted.transform(&data).unwrap(),
            restored.transform(&data).unwrap()
        );
    }
}
