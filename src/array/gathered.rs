//! Gathered (compression by list) arrays
//!
//! Gathering removes missing values from one or more adjacent logical
//! dimensions by keeping only the points listed in a [`List`]. Each list
//! entry is the row-major flat index, over the gathered dimensions, of one
//! stored point. The compressed data stores those points along a single
//! compressed dimension.

use super::{ArrayValue, Compression, DType, Indexer, LazyArray};
use crate::constructs::{List, Reconstruct};
use crate::data::Data;
use crate::errors::{CfError, Result};
use ndarray::Dimension;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// A gathered array, uncompressed by list
#[derive(Debug, Clone)]
pub struct GatheredArray {
    compressed: Data,
    list: List,
    shape: Vec<usize>,
    compressed_dimension: usize,
    compressed_axes: Vec<usize>,
    /// Flat index over the gathered axes -> physical position
    destinations: HashMap<usize, usize>,
}

impl GatheredArray {
    /// Describe a gathered array.
    ///
    /// * `compressed` - compressed data
    /// * `shape` - uncompressed shape
    /// * `compressed_dimension` - the dimension of `compressed` holding the
    ///   gathered points
    /// * `compressed_axes` - the adjacent logical axes that were gathered,
    ///   starting at `compressed_dimension`
    /// * `list` - flat indices of the stored points
    pub fn new(
        compressed: Data,
        shape: Vec<usize>,
        compressed_dimension: usize,
        compressed_axes: Vec<usize>,
        list: List,
    ) -> Result<Self> {
        let physical = compressed.shape()?.to_vec();
        check_axes(&physical, &shape, compressed_dimension, &compressed_axes)?;

        let indices = list.indices()?;
        let stored = physical[compressed_dimension];
        if indices.len() != stored {
            return Err(CfError::compression(format!(
                "list has {} entries but compressed dimension {compressed_dimension} has size {stored}",
                indices.len()
            )));
        }

        let gathered_size: usize = compressed_axes.iter().map(|&a| shape[a]).product();
        let mut destinations = HashMap::with_capacity(indices.len());
        for (position, &flat) in indices.iter().enumerate() {
            if flat >= gathered_size {
                return Err(CfError::compression(format!(
                    "list index {flat} is out of range for gathered size {gathered_size}"
                )));
            }
            if destinations.insert(flat, position).is_some() {
                return Err(CfError::compression(format!("duplicate list index {flat}")));
            }
        }

        Ok(Self {
            compressed,
            list,
            shape,
            compressed_dimension,
            compressed_axes,
            destinations,
        })
    }

    pub fn compressed_array(&self) -> &Data {
        &self.compressed
    }

    pub fn list(&self) -> &List {
        &self.list
    }

    pub fn compressed_dimension(&self) -> usize {
        self.compressed_dimension
    }

    pub fn compressed_axes(&self) -> &[usize] {
        &self.compressed_axes
    }

    /// Row-major flat index over the gathered axes of a logical position
    fn flat_index(&self, logical: impl Iterator<Item = usize>) -> usize {
        self.compressed_axes
            .iter()
            .zip(logical)
            .fold(0, |flat, (&axis, i)| flat * self.shape[axis] + i)
    }
}

fn check_axes(
    physical: &[usize],
    shape: &[usize],
    compressed_dimension: usize,
    axes: &[usize],
) -> Result<()> {
    let contiguous = axes
        .iter()
        .enumerate()
        .all(|(k, &a)| a == compressed_dimension + k);
    if axes.is_empty() || !contiguous {
        return Err(CfError::shape_mismatch(format!(
            "compressed axes {axes:?} must be adjacent and start at dimension {compressed_dimension}"
        )));
    }
    if compressed_dimension >= physical.len()
        || physical.len() + axes.len() != shape.len() + 1
    {
        return Err(CfError::shape_mismatch(format!(
            "compressed shape {physical:?} cannot gather axes {axes:?} of shape {shape:?}"
        )));
    }

    let cd = compressed_dimension;
    let leading = physical[..cd] == shape[..cd];
    let trailing = physical[cd + 1..] == shape[cd + axes.len()..];
    if !(leading && trailing) {
        return Err(CfError::shape_mismatch(format!(
            "compressed shape {physical:?} does not match uncompressed shape {shape:?} outside the gathered axes"
        )));
    }
    Ok(())
}

impl LazyArray for GatheredArray {
    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn dtype(&self) -> Option<DType> {
        self.compressed.dtype()
    }

    fn fetch(&self, index: &Indexer) -> Result<ArrayValue> {
        let resolved = index.resolve(&self.shape)?;
        let cd = self.compressed_dimension;
        let after = cd + self.compressed_axes.len();
        let gathered: Vec<&Vec<usize>> = resolved.positions[cd..after].iter().collect();

        // Physical position -> position in the fetched block
        let gathered_shape: Vec<usize> = gathered.iter().map(|p| p.len()).collect();
        let mut wanted: BTreeMap<usize, usize> = ndarray::indices(gathered_shape)
            .into_iter()
            .filter_map(|at| {
                let logical = at.slice().iter().enumerate().map(|(k, &i)| gathered[k][i]);
                self.destinations.get(&self.flat_index(logical)).copied()
            })
            .map(|p| (p, 0))
            .collect();
        for (i, local) in wanted.values_mut().enumerate() {
            *local = i;
        }

        let text = self.dtype().is_some_and(DType::is_text);
        let shape = resolved.selection_shape();

        let block = if wanted.is_empty() {
            None
        } else {
            let mut positions: Vec<Vec<usize>> = resolved.positions[..cd].to_vec();
            positions.push(wanted.keys().copied().collect());
            positions.extend(resolved.positions[after..].iter().cloned());
            Some(self.compressed.get(&Indexer::from_positions(&positions))?)
        };

        let locate = |at: &[usize]| {
            let logical = (cd..after).map(|axis| resolved.positions[axis][at[axis]]);
            let physical = self.destinations.get(&self.flat_index(logical))?;
            let mut from = at[..cd].to_vec();
            from.push(*wanted.get(physical)?);
            from.extend_from_slice(&at[after..]);
            Some(from)
        };

        tracing::debug!(points = wanted.len(), "Uncompressing gathered array");
        Ok(ArrayValue::scatter(block.as_ref(), text, &shape, &locate)
            .remove_axes(&resolved.dropped))
    }

    fn duplicate(&self) -> Arc<dyn LazyArray> {
        Arc::new(Self {
            compressed: self.compressed.copy(true),
            list: self.list.copy(),
            shape: self.shape.clone(),
            compressed_dimension: self.compressed_dimension,
            compressed_axes: self.compressed_axes.clone(),
            destinations: self.destinations.clone(),
        })
    }

    fn compression(&self) -> Option<Compression<'_>> {
        Some(Compression::Gathered {
            compressed: &self.compressed,
            list: &self.list,
            compressed_dimension: self.compressed_dimension,
        })
    }
}
