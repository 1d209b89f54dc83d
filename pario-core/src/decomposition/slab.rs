//! One-dimensional (slab) decomposition of arbitrary-rank domains
//!
//! Only the slowest varying axis is split; every other axis is kept whole.

use alloc::vec;

use super::{validate_domain, Decomposition};
use crate::{split_work, LinearTopology, Result, Topology};

/// Splits axis 0 of a domain across a rank-ordered group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlabDecomposition {
    topology: LinearTopology,
}

impl SlabDecomposition {
    /// Build from a topology; a Cartesian topology is used by rank only
    ///
    /// Every [`Topology`] already holds a validated rank and size, so this
    /// cannot fail.
    pub fn new(topology: &Topology) -> Self {
        Self {
            topology: topology.linear(),
        }
    }

    pub fn workers(&self) -> usize {
        self.topology.size()
    }

    pub fn id(&self) -> usize {
        self.topology.rank()
    }

    /// Decompose for the calling worker
    pub fn decompose(&self, domain: &[usize]) -> Result<Decomposition> {
        self.decompose_as(domain, self.workers(), self.id())
    }

    /// Decompose as if the caller were worker `id` of `workers`
    pub fn decompose_as(&self, domain: &[usize], workers: usize, id: usize) -> Result<Decomposition> {
        decompose_axis0(domain, workers, id)
    }
}

fn decompose_axis0(domain: &[usize], workers: usize, id: usize) -> Result<Decomposition> {
    validate_domain(domain)?;
    let range = split_work(domain[0], workers, id)?;

    let mut subsizes = domain.to_vec();
    let mut starts = vec![0; domain.len()];
    subsizes[0] = range.len();
    starts[0] = range.start;

    Ok(Decomposition {
        sizes: domain.to_vec(),
        subsizes,
        starts,
    })
}

impl From<&Topology> for SlabDecomposition {
    fn from(value: &Topology) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CartesianTopology, ParioError};

    fn slab(size: usize, rank: usize) -> SlabDecomposition {
        SlabDecomposition::new(&LinearTopology::new(size, rank).unwrap().into())
    }

    #[test]
    fn test_even_slab() {
        let d = slab(4, 2).decompose(&[8, 4, 4]).unwrap();
        assert_eq!(d.sizes, [8, 4, 4]);
        assert_eq!(d.subsizes, [2, 4, 4]);
        assert_eq!(d.starts, [4, 0, 0]);
    }

    #[test]
    fn test_remainder_slab() {
        let d = slab(1, 0);
        let locals: std::vec::Vec<usize> = (0..3)
            .map(|id| d.decompose_as(&[7, 4], 3, id).unwrap().subsizes[0])
            .collect();
        assert_eq!(locals, [2, 2, 3]);
        assert_eq!(locals.iter().sum::<usize>(), 7);

        let last = d.decompose_as(&[7, 4], 3, 2).unwrap();
        assert_eq!(last.starts, [4, 0]);
        assert_eq!(last.subsizes, [3, 4]);
    }

    #[test]
    fn test_slab_rejects_bad_domains() {
        let d = slab(4, 0);
        assert_eq!(d.decompose(&[]), Err(ParioError::InvalidDomain));
        assert_eq!(d.decompose(&[8, 0]), Err(ParioError::InvalidDomain));
        assert_eq!(
            d.decompose(&[3, 100]),
            Err(ParioError::LoadBelowWorkers { load: 3, workers: 4 })
        );
    }

    #[test]
    fn test_slab_from_cartesian_uses_rank() {
        let topo: Topology = CartesianTopology::new(4, 3, 2).unwrap().into();
        let d = SlabDecomposition::from(&topo);
        assert_eq!(d.id(), 3);
        assert_eq!(d.decompose(&[8]).unwrap().starts, [6]);
    }
}
