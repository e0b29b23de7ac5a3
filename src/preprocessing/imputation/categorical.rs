//! Most-frequent imputation for string-valued columns.

use crate::preprocessing::error::PreprocessingError;
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use crate::preprocessing::CategoricalMatrix;
use ndarray::{ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Serializable parameters for a fitted CategoricalImputer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoricalImputerParams {
    /// Fill label per column; `None` when the column had no observed values.
    pub fill_values: Vec<Option<String>>,
}

/// Fills `None` cells with the most frequent label of their column.
///
/// Ties resolve to the lexicographically smallest label so the result does not
/// depend on row order.
#[derive(Clone, Debug, Default)]
pub struct CategoricalImputer;

impl CategoricalImputer {
    pub fn new() -> Self {
        Self
    }
}

fn most_frequent(column: ArrayView1<'_, Option<String>>) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for label in column.iter().flatten() {
        *counts.entry(label.as_str()).or_insert(0) += 1;
    }
    let mut best: Option<(&str, usize)> = None;
    for (label, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((label, count));
        }
    }
    best.map(|(label, _)| label.to_string())
}

impl Transformer for CategoricalImputer {
    type Input = CategoricalMatrix;
    type Output = CategoricalMatrix;
    type Params = CategoricalImputerParams;
    type Fitted = FittedCategoricalImputer;

    fn fit(&self, data: &Self::Input) -> Result<Self::Fitted, PreprocessingError> {
        if data.nrows() == 0 {
            return Err(PreprocessingError::EmptyData(
                "Cannot fit CategoricalImputer on empty data".to_string(),
            ));
        }
        let fill_values = data.axis_iter(Axis(1)).map(most_frequent).collect();
        Ok(FittedCategoricalImputer { fill_values })
    }
}

/// Fitted CategoricalImputer ready for inference.
#[derive(Clone, Debug)]
pub struct FittedCategoricalImputer {
    fill_values: Vec<Option<String>>,
}

impl FittedCategoricalImputer {
    pub fn fill_values(&self) -> &[Option<String>] {
        &self.fill_values
    }
}

impl FittedTransformer for FittedCategoricalImputer {
    type Input = CategoricalMatrix;
    type Output = CategoricalMatrix;
    type Params = CategoricalImputerParams;

    fn transform(&self, data: &Self::Input) -> Result<Self::Output, PreprocessingError> {
        if data.ncols() != self.fill_values.len() {
            return Err(PreprocessingError::FeatureMismatch {
                expected_features: self.fill_values.len(),
                got_features: data.ncols(),
            });
        }

        let mut result = data.clone();
        for (mut column, fill) in result.axis_iter_mut(Axis(1)).zip(&self.fill_values) {
            for cell in column.iter_mut().filter(|c| c.is_none()) {
                cell.clone_from(fill);
            }
        }
        Ok(result)
    }

    fn extract_params(&self) -> Self::Params {
        CategoricalImputerParams {
            fill_values: self.fill_values.clone(),
        }
    }

    fn from_params(params: Self::Params) -> Result<Self, PreprocessingError> {
        Ok(Self {
            fill_values: params.fill_values,
        })
    }

    fn n_features_in(&self) -> usize {
        self.fill_values.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn matrix(rows: &[&[Option<&str>]]) -> CategoricalMatrix {
        let cols = rows.first().map_or(0, |r| r.len());
        let flat = rows
            .iter()
            .flat_map(|r| r.iter().map(|c| c.map(str::to_string)))
            .collect();
        Array2::from_shape_vec((rows.len(), cols), flat).unwrap()
    }

    #[test]
    fn test_most_frequent_fill() {
        let data = matrix(&[
            &[Some("Steel"), Some("Sunny")],
            &[Some("Wood"), None],
            &[Some("Steel"), Some("Rainy")],
            &[None, Some("Rainy")],
        ]);
        let fitted = CategoricalImputer::new().fit(&data).unwrap();
        assert_eq!(
            fitted.fill_values(),
            &[Some("Steel".to_string()), Some("Rainy".to_string())]
        );

        let out = fitted.transform(&data).unwrap();
        assert_eq!(out[[3, 0]].as_deref(), Some("Steel"));
        assert_eq!(out[[1, 1]].as_deref(), Some("Rainy"));
        assert_eq!(out[[1, 0]].as_deref(), Some("Wood"));
    }

    #[test]
    fn test_tie_resolves_lexicographically() {
        let data = matrix(&[&[Some("b")], &[Some("a")], &[Some("b")], &[Some("a")]]);
        let fitted = CategoricalImputer::new().fit(&data).unwrap();
        assert_eq!(fitted.fill_values(), &[Some("a".to_string())]);
    }

    #[test]
    fn test_all_missing_column_stays_missing() {
        let data = matrix(&[&[None], &[None]]);
        let fitted = CategoricalImputer::new().fit(&data).unwrap();
        assert_eq!(fitted.fill_values(), &[None]);
        assert_eq!(fitted.transform(&data).unwrap()[[0, 0]], None);
    }

    #[test]
    fn test_width_mismatch() {
        let fitted = CategoricalImputer::new()
            .fit(&matrix(&[&[Some("a"), Some("b")]]))
            .unwrap();
        assert!(fitted.transform(&matrix(&[&[Some("a")]])).is_err());
    }
}
