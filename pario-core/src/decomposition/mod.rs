//! Domain decomposition over a process group
//!
//! A decomposition answers, for one worker, which hyper-rectangular brick of
//! the global array it owns. Both decomposers are pure: once the topology is
//! known no communication is needed.

pub mod cartesian;
pub mod slab;

use alloc::vec::Vec;

pub use cartesian::CartesianDecomposition;
pub use slab::SlabDecomposition;

use crate::{ParioError, Result, Topology};

/// Global shape, local shape and global offset of one worker's brick
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Decomposition {
    /// Global extent of each axis
    pub sizes: Vec<usize>,
    /// Local extent of each axis
    pub subsizes: Vec<usize>,
    /// Global index of the first local element on each axis
    pub starts: Vec<usize>,
}

impl Decomposition {
    /// Decomposition that gives the whole domain to one worker
    pub fn whole(domain: &[usize]) -> Result<Self> {
        validate_domain(domain)?;
        Ok(Self {
            sizes: domain.to_vec(),
            subsizes: domain.to_vec(),
            starts: alloc::vec![0; domain.len()],
        })
    }

    /// Number of axes
    pub fn rank(&self) -> usize {
        self.sizes.len()
    }

    /// Number of elements in the local brick
    pub fn local_len(&self) -> usize {
        self.subsizes.iter().product()
    }

    /// Number of elements in the global array
    pub fn global_len(&self) -> usize {
        self.sizes.iter().product()
    }

    /// Whether a global multi-index falls inside the local brick
    pub fn contains(&self, index: &[usize]) -> bool {
        index.len() == self.rank()
            && index
                .iter()
                .zip(self.starts.iter().zip(&self.subsizes))
                .all(|(&i, (&start, &len))| i >= start && i < start + len)
    }
}

pub(crate) fn validate_domain(domain: &[usize]) -> Result<()> {
    if domain.is_empty() || domain.iter().any(|&n| n == 0) {
        return Err(ParioError::InvalidDomain);
    }
    domain
        .iter()
        .try_fold(1usize, |acc, &n| acc.checked_mul(n))
        .ok_or(ParioError::SizeOverflow)?;
    Ok(())
}

/// Decomposer matching the topology it was built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decomposer {
    Slab(SlabDecomposition),
    Cartesian(CartesianDecomposition),
}

impl Decomposer {
    /// Cartesian topologies get a multi-axis tiling, linear ones a slab split
    pub fn for_topology(topology: &Topology) -> Result<Self> {
        match topology {
            Topology::Cartesian(_) => {
                CartesianDecomposition::new(topology).map(Decomposer::Cartesian)
            }
            Topology::Linear(_) => Ok(Decomposer::Slab(SlabDecomposition::new(topology))),
        }
    }

    /// Decompose `domain` for the calling worker
    pub fn decompose(&self, domain: &[usize]) -> Result<Decomposition> {
        match self {
            Decomposer::Slab(d) => d.decompose(domain),
            Decomposer::Cartesian(d) => d.decompose(domain),
        }
    }
}
