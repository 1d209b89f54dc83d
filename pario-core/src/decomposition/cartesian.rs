//! Cartesian decomposition over a virtual process grid
//!
//! Grid axis `d` splits domain axis `d`, outermost axes first. Each axis is
//! an independent slab split of that one extent, so a worker's brick is the
//! product of its per-axis ranges. Domain axes beyond the grid rank are kept
//! whole.

use alloc::vec;
use alloc::vec::Vec;

use super::{validate_domain, Decomposition};
use crate::{split_work, CartesianTopology, ParioError, Result, Topology};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartesianDecomposition {
    topology: CartesianTopology,
}

impl CartesianDecomposition {
    /// Build from a topology that must carry a process grid
    pub fn new(topology: &Topology) -> Result<Self> {
        let topology = topology
            .as_cartesian()
            .cloned()
            .ok_or(ParioError::NotCartesian)?;
        Ok(Self { topology })
    }

    pub fn dims(&self) -> &[usize] {
        self.topology.dims()
    }

    pub fn coords(&self) -> &[usize] {
        self.topology.coords()
    }

    /// Decompose using this worker's own grid coordinates
    pub fn decompose(&self, domain: &[usize]) -> Result<Decomposition> {
        validate_domain(domain)?;
        let dims = self.topology.dims();
        if dims.len() > domain.len() {
            return Err(ParioError::GridRankMismatch {
                grid: dims.len(),
                domain: domain.len(),
            });
        }

        let mut subsizes: Vec<usize> = domain.to_vec();
        let mut starts = vec![0; domain.len()];
        for (axis, (&workers, &id)) in dims.iter().zip(self.topology.coords()).enumerate() {
            let range = split_work(domain[axis], workers, id)?;
            subsizes[axis] = range.len();
            starts[axis] = range.start;
        }

        Ok(Decomposition {
            sizes: domain.to_vec(),
            subsizes,
            starts,
        })
    }
}

impl TryFrom<&Topology> for CartesianDecomposition {
    type Error = ParioError;

    fn try_from(value: &Topology) -> Result<Self> {
        Self::new(value)
    }
}
