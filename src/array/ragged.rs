//! Contiguous ragged arrays
//!
//! Each feature (a station's time series, say) occupies a contiguous run of
//! rows in the compressed data, and a [`Count`] gives the run lengths. The
//! logical array has one row per feature, padded with missing values to the
//! longest run.

use super::{ArrayValue, Compression, DType, Indexer, LazyArray};
use crate::constructs::{Count, Reconstruct};
use crate::data::Data;
use crate::errors::{CfError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A ragged array stored contiguously, uncompressed by count
#[derive(Debug, Clone)]
pub struct RaggedContiguousArray {
    compressed: Data,
    count: Count,
    shape: Vec<usize>,
    counts: Vec<usize>,
    offsets: Vec<usize>,
}

impl RaggedContiguousArray {
    /// Build from the compressed data (sample dimension first) and the
    /// per-feature counts.
    ///
    /// The logical shape is `[features, max(count)]` followed by any
    /// trailing dimensions of the compressed data.
    pub fn new(compressed: Data, count: Count) -> Result<Self> {
        let counts = count.counts()?;
        let physical = compressed.shape()?.to_vec();

        let Some((&rows, trailing)) = physical.split_first() else {
            return Err(CfError::shape_mismatch(
                "compressed ragged data must have a sample dimension",
            ));
        };

        let total: usize = counts.iter().sum();
        if total != rows {
            return Err(CfError::compression(format!(
                "counts sum to {total} but the sample dimension has {rows} elements"
            )));
        }

        let offsets = counts
            .iter()
            .scan(0, |next, &n| {
                let start = *next;
                *next += n;
                Some(start)
            })
            .collect();

        let width = counts.iter().copied().max().unwrap_or(0);
        let mut shape = vec![counts.len(), width];
        shape.extend_from_slice(trailing);

        Ok(Self {
            compressed,
            count,
            shape,
            counts,
            offsets,
        })
    }

    /// Build with an explicit uncompressed shape, which must agree with the
    /// shape implied by the counts.
    pub fn with_shape(compressed: Data, count: Count, shape: &[usize]) -> Result<Self> {
        let array = Self::new(compressed, count)?;
        if array.shape != shape {
            return Err(CfError::shape_mismatch(format!(
                "uncompressed shape {shape:?} does not match {:?} implied by the counts",
                array.shape
            )));
        }
        Ok(array)
    }

    pub fn compressed_array(&self) -> &Data {
        &self.compressed
    }

    pub fn count(&self) -> &Count {
        &self.count
    }

    /// Number of elements of each feature
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Physical row of element `element` of feature `feature`, if it exists
    fn physical_row(&self, feature: usize, element: usize) -> Option<usize> {
        (element < self.counts[feature]).then(|| self.offsets[feature] + element)
    }
}

impl LazyArray for RaggedContiguousArray {
    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn dtype(&self) -> Option<DType> {
        self.compressed.dtype()
    }

    fn fetch(&self, index: &Indexer) -> Result<ArrayValue> {
        let resolved = index.resolve(&self.shape)?;
        let features = &resolved.positions[0];
        let elements = &resolved.positions[1];

        // Physical row -> position in the fetched block
        let mut rows: BTreeMap<usize, usize> = features
            .iter()
            .flat_map(|&f| elements.iter().filter_map(move |&e| self.physical_row(f, e)))
            .map(|row| (row, 0))
            .collect();
        for (i, local) in rows.values_mut().enumerate() {
            *local = i;
        }

        let text = self.dtype().is_some_and(DType::is_text);
        let shape = resolved.selection_shape();

        let block = if rows.is_empty() {
            None
        } else {
            let mut positions = vec![rows.keys().copied().collect::<Vec<_>>()];
            positions.extend(resolved.positions[2..].iter().cloned());
            Some(self.compressed.get(&Indexer::from_positions(&positions))?)
        };

        let locate = |at: &[usize]| {
            let row = self.physical_row(features[at[0]], elements[at[1]])?;
            let mut from = vec![*rows.get(&row)?];
            from.extend_from_slice(&at[2..]);
            Some(from)
        };

        tracing::debug!(
            features = features.len(),
            rows = rows.len(),
            "Uncompressing ragged array"
        );
        Ok(ArrayValue::scatter(block.as_ref(), text, &shape, &locate)
            .remove_axes(&resolved.dropped))
    }

    fn duplicate(&self) -> Arc<dyn LazyArray> {
        Arc::new(Self {
            compressed: self.compressed.copy(true),
            count: self.count.copy(),
            shape: self.shape.clone(),
            counts: self.counts.clone(),
            offsets: self.offsets.clone(),
        })
    }

    fn compression(&self) -> Option<Compression<'_>> {
        Some(Compression::RaggedContiguous {
            compressed: &self.compressed,
            count: &self.count,
        })
    }
}
