//! Index expressions over lazy arrays
//!
//! An [`Indexer`] is either "everything" or one [`Selector`] per dimension.
//! Selectors act independently along each dimension (orthogonal indexing):
//! two list selectors pick the outer product of their positions rather than
//! being broadcast together.

use crate::errors::{CfError, Result};
use ndarray::{ArrayD, Axis, Slice};

/// Selection along a single dimension
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// A single position; negative values count from the end. The dimension
    /// is removed from the result.
    Index(isize),
    /// A strided range with Python slice semantics
    Slice {
        start: Option<isize>,
        stop: Option<isize>,
        step: isize,
    },
    /// Arbitrary positions, in the given order
    List(Vec<isize>),
}

impl Selector {
    /// The whole dimension
    pub fn full() -> Self {
        Self::Slice {
            start: None,
            stop: None,
            step: 1,
        }
    }

    /// `start..stop` with unit step
    pub fn range(start: isize, stop: isize) -> Self {
        Self::Slice {
            start: Some(start),
            stop: Some(stop),
            step: 1,
        }
    }

    pub fn list<I: IntoIterator<Item = usize>>(positions: I) -> Self {
        Self::List(positions.into_iter().map(|p| p as isize).collect())
    }

    fn keeps_axis(&self) -> bool {
        !matches!(self, Self::Index(_))
    }

    /// Concrete positions selected along a dimension of length `len`
    pub fn resolve(&self, len: usize, axis: usize) -> Result<Vec<usize>> {
        match self {
            Self::Index(i) => Ok(vec![normalize(*i, len, axis)?]),
            Self::List(items) => items.iter().map(|&i| normalize(i, len, axis)).collect(),
            Self::Slice { start, stop, step } => slice_positions(*start, *stop, *step, len, axis),
        }
    }
}

fn normalize(i: isize, len: usize, axis: usize) -> Result<usize> {
    let n = len as isize;
    let j = if i < 0 { i + n } else { i };
    if (0..n).contains(&j) {
        Ok(j as usize)
    } else {
        Err(CfError::index(format!(
            "index {i} is out of bounds for axis {axis} with size {len}"
        )))
    }
}

fn slice_positions(
    start: Option<isize>,
    stop: Option<isize>,
    step: isize,
    len: usize,
    axis: usize,
) -> Result<Vec<usize>> {
    if step == 0 {
        return Err(CfError::index(format!("slice step cannot be zero (axis {axis})")));
    }

    let n = len as isize;
    let clamp = |v: isize, lo: isize, hi: isize| v.max(lo).min(hi);
    let wrap = |v: isize| if v < 0 { v + n } else { v };

    let positions = if step > 0 {
        let lo = start.map_or(0, |s| clamp(wrap(s), 0, n));
        let hi = stop.map_or(n, |s| clamp(wrap(s), 0, n));
        (lo..hi).step_by(step as usize).map(|i| i as usize).collect()
    } else {
        let hi = start.map_or(n - 1, |s| clamp(wrap(s), -1, n - 1));
        let lo = stop.map_or(-1, |s| clamp(wrap(s), -1, n - 1));
        let mut out = Vec::new();
        let mut i = hi;
        while i > lo {
            out.push(i as usize);
            i += step;
        }
        out
    };

    Ok(positions)
}

/// An index expression over every dimension of an array
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Indexer {
    #[default]
    All,
    Select(Vec<Selector>),
}

impl From<Vec<Selector>> for Indexer {
    fn from(selectors: Vec<Selector>) -> Self {
        Self::Select(selectors)
    }
}

impl Indexer {
    /// Select exactly the given positions along every dimension
    pub fn from_positions(positions: &[Vec<usize>]) -> Self {
        Self::Select(
            positions
                .iter()
                .map(|p| Selector::list(p.iter().copied()))
                .collect(),
        )
    }

    /// Resolve against `shape`. Missing trailing selectors select the whole
    /// dimension.
    pub fn resolve(&self, shape: &[usize]) -> Result<ResolvedIndex> {
        let selectors = match self {
            Self::All => return Ok(ResolvedIndex::full(shape)),
            Self::Select(s) => s,
        };

        if selectors.len() > shape.len() {
            return Err(CfError::index(format!(
                "too many indices: array is {}-dimensional, but {} were indexed",
                shape.len(),
                selectors.len()
            )));
        }

        let mut positions = Vec::with_capacity(shape.len());
        let mut dropped = Vec::new();
        for (axis, &len) in shape.iter().enumerate() {
            match selectors.get(axis) {
                Some(selector) => {
                    positions.push(selector.resolve(len, axis)?);
                    if !selector.keeps_axis() {
                        dropped.push(axis);
                    }
                }
                None => positions.push((0..len).collect()),
            }
        }

        Ok(ResolvedIndex { positions, dropped })
    }
}

/// Per-dimension positions of a resolved [`Indexer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIndex {
    /// Selected positions along each dimension
    pub positions: Vec<Vec<usize>>,
    /// Dimensions selected by a single index, removed from the final result
    pub dropped: Vec<usize>,
}

impl ResolvedIndex {
    pub fn full(shape: &[usize]) -> Self {
        Self {
            positions: shape.iter().map(|&n| (0..n).collect()).collect(),
            dropped: Vec::new(),
        }
    }

    /// Shape of the selection before dropped dimensions are removed
    pub fn selection_shape(&self) -> Vec<usize> {
        self.positions.iter().map(Vec::len).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.iter().any(Vec::is_empty)
    }
}

/// Orthogonal selection of `positions` from an in-memory array
pub fn select_orthogonal<T: Clone>(array: &ArrayD<T>, positions: &[Vec<usize>]) -> ArrayD<T> {
    let mut out = array.to_owned();
    for (axis, selected) in positions.iter().enumerate() {
        let len = out.len_of(Axis(axis));
        if selected.is_empty() {
            out = out.slice_axis(Axis(axis), Slice::new(0, Some(0), 1)).to_owned();
            continue;
        }
        let identity = selected.len() == len && selected.iter().enumerate().all(|(i, &p)| i == p);
        if !identity {
            out = out.select(Axis(axis), selected);
        }
    }
    out
}

/// Remove length-one `axes` (ascending) from an array
pub fn remove_axes<T>(mut array: ArrayD<T>, axes: &[usize]) -> ArrayD<T> {
    for &axis in axes.iter().rev() {
        array = array.index_axis_move(Axis(axis), 0);
    }
    array
}
