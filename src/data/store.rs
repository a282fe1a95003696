//! The immutable sample store.
//!
//! `SampleStore` owns, per cell, the ordered sample sequence exactly as it
//! appeared in the recording (insertion order = recording order), including
//! the NaN boundary markers. It is built once from ingest (or the synthetic
//! generator) and never mutated afterwards; segmentation and fitting read
//! from it through shared references.

use std::collections::HashMap;

use crate::domain::Sample;
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct SampleStore {
    /// Cell names in column order.
    names: Vec<String>,
    cells: HashMap<String, Vec<Sample>>,
}

impl SampleStore {
    /// Build a store from `(cell name, samples)` pairs in column order.
    ///
    /// Rejects duplicate cell names and cells with zero samples. A cell whose
    /// samples are all boundary markers is accepted here — it simply yields no
    /// train buckets downstream.
    pub fn new(cells: Vec<(String, Vec<Sample>)>) -> Result<Self, AppError> {
        if cells.is_empty() {
            return Err(AppError::schema("Input contains no cells."));
        }

        let mut names = Vec::with_capacity(cells.len());
        let mut map = HashMap::with_capacity(cells.len());

        for (name, samples) in cells {
            if samples.is_empty() {
                return Err(AppError::schema(format!(
                    "Cell '{name}' has zero samples."
                )));
            }
            if map.insert(name.clone(), samples).is_some() {
                return Err(AppError::schema(format!("Duplicate cell name '{name}'.")));
            }
            names.push(name);
        }

        Ok(Self { names, cells: map })
    }

    /// Cell names in recording column order.
    pub fn cell_names(&self) -> &[String] {
        &self.names
    }

    pub fn n_cells(&self) -> usize {
        self.names.len()
    }

    pub fn contains(&self, cell: &str) -> bool {
        self.cells.contains_key(cell)
    }

    /// The ordered sample sequence for one cell.
    pub fn samples(&self, cell: &str) -> Result<&[Sample], AppError> {
        self.cells
            .get(cell)
            .map(Vec::as_slice)
            .ok_or_else(|| AppError::not_found(format!("Unknown cell '{cell}'.")))
    }
}
