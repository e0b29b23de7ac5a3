use super::grid::{FamilyGrid, ParamGrid};
use crate::model::{ModelConfig, ModelFamily};
use serde::{Deserialize, Serialize};

/// Ordered list of family grids the search runs over.
///
/// Declaration order matters: it is the tie-break order for selection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    grids: Vec<FamilyGrid>,
}

impl Default for Catalog {
    /// Every family with its default grid.
    fn default() -> Self {
        Self {
            grids: ModelFamily::ALL
                .into_iter()
                .map(FamilyGrid::default_for)
                .collect(),
        }
    }
}

impl Catalog {
    pub fn new(grids: Vec<FamilyGrid>) -> Self {
        Self { grids }
    }

    /// A catalog restricted to `families`, in the given order, with default grids.
    pub fn with_families(families: &[ModelFamily]) -> Self {
        Self::new(families.iter().copied().map(FamilyGrid::default_for).collect())
    }

    pub fn push(&mut self, grid: FamilyGrid) {
        self.grids.push(grid);
    }

    pub fn grids(&self) -> &[FamilyGrid] {
        &self.grids
    }

    /// All configurations, family by family.
    pub fn candidates(&self, seed: u64) -> Vec<ModelConfig> {
        self.grids.iter().flat_map(|g| g.configs(seed)).collect()
    }

    /// Total number of configurations across all grids.
    pub fn len(&self) -> usize {
        self.grids.iter().map(ParamGrid::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
