//! Feature schemas.

use crate::preprocessing::error::PreprocessingError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Ordered numeric and categorical column names.
///
/// The order fixes the layout of the transformed matrix. A fitted preprocessor
/// only accepts data described by the exact schema it was fitted with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    numeric: Vec<String>,
    #[serde(default)]
    categorical: Vec<String>,
}

impl FeatureSchema {
    pub fn new(numeric: Vec<String>, categorical: Vec<String>) -> Self {
        Self {
            numeric,
            categorical,
        }
    }

    /// Carbon-emission dataset: 13 quantities and 4 categories.
    pub fn carbon_emission() -> Self {
        Self::from_strs(
            &[
                "ProjectSize(sqm)",
                "Duration(days)",
                "Temperature(C)",
                "Rainfall(mm)",
                "WindSpeed(km/h)",
                "MaterialQuantity(tons)",
                "EquipmentHours",
                "LaborHoursPlanned",
                "SupplyLeadTime(days)",
                "SeasonalFactor",
                "LaborHoursActual",
                "MaterialCarbonEmission",
                "EquipmentCarbonEmission",
            ],
            &[
                "ProjectType",
                "WeatherCondition",
                "MaterialType",
                "EquipmentType",
            ],
        )
    }

    /// Resource-allocation dataset: 11 quantities, no categories.
    pub fn resource_allocation() -> Self {
        Self::from_strs(
            &[
                "Labor Requirements",
                "Equipment Usage",
                "Material Quantities",
                "Project Duration (days)",
                "Schedule Optimization",
                "Computation Time (CT)",
                "Best Cost (BC)",
                "Evaluation Metric (Nfe)",
                "Mean Resource Demand",
                "SD of Resource Demand",
                "Risk Level",
            ],
            &[],
        )
    }

    fn from_strs(numeric: &[&str], categorical: &[&str]) -> Self {
        Self::new(
            numeric.iter().map(|s| s.to_string()).collect(),
            categorical.iter().map(|s| s.to_string()).collect(),
        )
    }

    pub fn numeric(&self) -> &[String] {
        &self.numeric
    }

    pub fn categorical(&self) -> &[String] {
        &self.categorical
    }

    /// All columns, numeric first.
    pub fn columns(&self) -> impl Iterator<Item = &String> {
        self.numeric.iter().chain(&self.categorical)
    }

    pub fn len(&self) -> usize {
        self.numeric.len() + self.categorical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rejects empty schemas and duplicate column names.
    pub fn validate(&self) -> Result<(), PreprocessingError> {
        if self.is_empty() {
            return Err(PreprocessingError::InvalidParameter(
                "feature schema declares no columns".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for name in self.columns() {
            if !seen.insert(name.as_str()) {
                return Err(PreprocessingError::schema(name.as_str(), "declared more than once"));
            }
        }
        Ok(())
    }

    /// Exact comparison against another schema, naming the first difference.
    pub fn ensure_matches(&self, other: &FeatureSchema) -> Result<(), PreprocessingError> {
        if self == other {
            return Ok(());
        }
        let first_diff = |ours: &[String], theirs: &[String], kind: &str| {
            let idx = ours
                .iter()
                .zip(theirs)
                .position(|(a, b)| a != b)
                .unwrap_or_else(|| ours.len().min(theirs.len()));
            let column = ours
                .get(idx)
                .or_else(|| theirs.get(idx))
                .cloned()
                .unwrap_or_default();
            PreprocessingError::schema(
                column,
                format!("{kind} columns differ from the fitted schema at position {idx}"),
            )
        };
        if self.numeric != other.numeric {
            return Err(first_diff(self.numeric.as_slice(), other.numeric.as_slice(), "numeric"));
        }
        Err(first_diff(
            self.categorical.as_slice(),
            other.categorical.as_slice(),
            "categorical",
        ))
    }
}

/// Named schema presets with their target column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaPreset {
    CarbonEmission,
    ResourceAllocation,
}

impl SchemaPreset {
    pub fn schema(self) -> FeatureSchema {
        match self {
            SchemaPreset::CarbonEmission => FeatureSchema::carbon_emission(),
            SchemaPreset::ResourceAllocation => FeatureSchema::resource_allocation(),
        }
    }

    pub fn target(self) -> &'static str {
        match self {
            SchemaPreset::CarbonEmission => "TotalCarbonEmission",
            SchemaPreset::ResourceAllocation => "Resource Allocation Efficiency",
        }
    }
}
