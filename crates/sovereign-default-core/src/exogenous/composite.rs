//! Composite exogenous-state index.
//!
//! Maps a tuple of per-shock grid indices `(i_0, i_1, ..., i_k)` to a single
//! flat index and back. The first dimension varies fastest:
//!
//!   flat = i_0 + n_0 * (i_1 + n_1 * (i_2 + ...))
//!
//! Every table over exogenous states in this crate (joint transition rows,
//! value functions, price schedules, policies) is laid out with this index.

use serde::Serialize;

use crate::error::SovereignDefaultError;
use crate::SovereignDefaultResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompositeIndex {
    dims: Vec<usize>,
    strides: Vec<usize>,
    len: usize,
}

impl CompositeIndex {
    pub fn new(dims: &[usize]) -> SovereignDefaultResult<Self> {
        if dims.is_empty() {
            return Err(SovereignDefaultError::config(
                "exogenous_dims",
                "at least one shock dimension is required",
            ));
        }
        if let Some(pos) = dims.iter().position(|&n| n == 0) {
            return Err(SovereignDefaultError::config(
                "exogenous_dims",
                format!("dimension {pos} has zero grid points"),
            ));
        }

        let mut strides = Vec::with_capacity(dims.len());
        let mut stride = 1usize;
        for &n in dims {
            strides.push(stride);
            stride *= n;
        }

        Ok(Self {
            dims: dims.to_vec(),
            strides,
            len: stride,
        })
    }

    /// Number of composite states.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Flat index of a coordinate tuple. `coords` must have one entry per
    /// dimension, each within bounds.
    #[inline]
    pub fn flatten(&self, coords: &[usize]) -> usize {
        debug_assert_eq!(coords.len(), self.dims.len());
        coords
            .iter()
            .zip(&self.strides)
            .zip(&self.dims)
            .map(|((&c, &s), &n)| {
                debug_assert!(c < n);
                c * s
            })
            .sum()
    }

    /// Grid index along dimension `dim` of the composite state `flat`.
    #[inline]
    pub fn coordinate(&self, flat: usize, dim: usize) -> usize {
        (flat / self.strides[dim]) % self.dims[dim]
    }

    /// Coordinate tuple of the composite state `flat`.
    pub fn unflatten(&self, flat: usize) -> Vec<usize> {
        (0..self.dims.len())
            .map(|d| self.coordinate(flat, d))
            .collect()
    }
}
