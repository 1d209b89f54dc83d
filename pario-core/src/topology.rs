//! Process topologies
//!
//! A worker is described either by its position in a linear, rank-ordered
//! group or by its coordinates in a virtual N-dimensional process grid. The
//! grid shape is a pure function of group size and grid rank, so every
//! worker derives the same grid without communicating.

use alloc::vec;
use alloc::vec::Vec;

use crate::{ParioError, Result};

/// Rank and size of a worker in a linear process group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearTopology {
    size: usize,
    rank: usize,
}

impl LinearTopology {
    /// Create a linear topology, validating `rank < size`
    pub fn new(size: usize, rank: usize) -> Result<Self> {
        if size == 0 {
            return Err(ParioError::NoWorkers);
        }
        if rank >= size {
            return Err(ParioError::WorkerOutOfRange {
                id: rank,
                workers: size,
            });
        }
        Ok(Self { size, rank })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn rank(&self) -> usize {
        self.rank
    }
}

/// A worker's place in a Cartesian process grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartesianTopology {
    linear: LinearTopology,
    dims: Vec<usize>,
    coords: Vec<usize>,
}

impl CartesianTopology {
    /// Build a grid of rank `ndims` using the most-square factorization
    pub fn new(size: usize, rank: usize, ndims: usize) -> Result<Self> {
        let linear = LinearTopology::new(size, rank)?;
        let dims = dims_create(size, ndims)?;
        Self::from_parts(linear, dims)
    }

    /// Build a grid with an explicit shape whose product must equal `size`
    ///
    /// Zero entries are free and get filled by [`dims_create_constrained`].
    pub fn with_dims(size: usize, rank: usize, dims: Vec<usize>) -> Result<Self> {
        let linear = LinearTopology::new(size, rank)?;
        let dims = if dims.contains(&0) {
            dims_create_constrained(size, &dims)?
        } else {
            dims
        };
        Self::from_parts(linear, dims)
    }

    fn from_parts(linear: LinearTopology, dims: Vec<usize>) -> Result<Self> {
        if dims.is_empty() || dims.iter().any(|&d| d == 0) {
            return Err(ParioError::InvalidGrid);
        }
        let product = dims
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or(ParioError::SizeOverflow)?;
        if product != linear.size {
            return Err(ParioError::InvalidGrid);
        }
        let coords = rank_to_coords(linear.rank, &dims)?;
        Ok(Self {
            linear,
            dims,
            coords,
        })
    }

    pub fn size(&self) -> usize {
        self.linear.size
    }

    pub fn rank(&self) -> usize {
        self.linear.rank
    }

    /// Grid extent along each axis
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// This worker's grid coordinates
    pub fn coords(&self) -> &[usize] {
        &self.coords
    }

    /// Number of grid axes
    pub fn ndims(&self) -> usize {
        self.dims.len()
    }
}

/// Topology of the calling worker, resolved once when the group is built
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topology {
    Linear(LinearTopology),
    Cartesian(CartesianTopology),
}

impl Topology {
    pub fn size(&self) -> usize {
        match self {
            Topology::Linear(t) => t.size(),
            Topology::Cartesian(t) => t.size(),
        }
    }

    pub fn rank(&self) -> usize {
        match self {
            Topology::Linear(t) => t.rank(),
            Topology::Cartesian(t) => t.rank(),
        }
    }

    /// Rank-ordered view of this worker, valid for either variant
    pub fn linear(&self) -> LinearTopology {
        match self {
            Topology::Linear(t) => *t,
            Topology::Cartesian(t) => t.linear,
        }
    }

    pub fn as_cartesian(&self) -> Option<&CartesianTopology> {
        match self {
            Topology::Cartesian(t) => Some(t),
            Topology::Linear(_) => None,
        }
    }
}

impl From<LinearTopology> for Topology {
    fn from(value: LinearTopology) -> Self {
        Topology::Linear(value)
    }
}

impl From<CartesianTopology> for Topology {
    fn from(value: CartesianTopology) -> Self {
        Topology::Cartesian(value)
    }
}

/// Choose a balanced grid shape of rank `ndims` for `nnodes` workers
///
/// Of all factorizations of `nnodes` into `ndims` entries, picks the one with
/// the smallest gap between largest and smallest entry (ties go to the
/// smaller largest entry), sorted in non-increasing order, e.g.
/// `dims_create(12, 2) == [4, 3]` and `dims_create(72, 2) == [9, 8]`.
pub fn dims_create(nnodes: usize, ndims: usize) -> Result<Vec<usize>> {
    dims_create_constrained(nnodes, &vec![0; ndims])
}

/// Like [`dims_create`], keeping every non-zero entry of `dims` fixed
///
/// Only the free (zero) axes are filled in and sorted among themselves.
pub fn dims_create_constrained(nnodes: usize, dims: &[usize]) -> Result<Vec<usize>> {
    if nnodes == 0 {
        return Err(ParioError::NoWorkers);
    }
    if dims.is_empty() {
        return Err(ParioError::InvalidGrid);
    }

    let fixed = dims
        .iter()
        .filter(|&&d| d != 0)
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or(ParioError::SizeOverflow)?;
    if nnodes % fixed != 0 {
        return Err(ParioError::InvalidGrid);
    }

    let free: Vec<usize> = (0..dims.len()).filter(|&i| dims[i] == 0).collect();
    let remaining = nnodes / fixed;
    if free.is_empty() {
        return if remaining == 1 {
            Ok(dims.to_vec())
        } else {
            Err(ParioError::InvalidGrid)
        };
    }

    let shape = balanced_factors(remaining, free.len());

    let mut out = dims.to_vec();
    for (slot, extent) in free.into_iter().zip(shape) {
        out[slot] = extent;
    }
    Ok(out)
}

/// The factorization of `n` into `slots` non-increasing factors whose spread
/// (largest minus smallest, then largest) is smallest
fn balanced_factors(n: usize, slots: usize) -> Vec<usize> {
    let mut divisors = Vec::new();
    let mut d = 1;
    while d * d <= n {
        if n % d == 0 {
            divisors.push(d);
            if d != n / d {
                divisors.push(n / d);
            }
        }
        d += 1;
    }
    divisors.sort_unstable_by(|a, b| b.cmp(a));

    let mut best = None;
    let mut current = Vec::with_capacity(slots);
    search_factors(n, slots, n, &divisors, &mut current, &mut best);
    best.unwrap_or_else(|| vec![1; slots])
}

fn search_factors(
    n: usize,
    slots: usize,
    bound: usize,
    divisors: &[usize],
    current: &mut Vec<usize>,
    best: &mut Option<Vec<usize>>,
) {
    if slots == 1 {
        if n <= bound {
            current.push(n);
            let spread = |f: &[usize]| (f[0] - f[f.len() - 1], f[0]);
            if best.as_deref().map_or(true, |b| spread(&current[..]) < spread(b)) {
                *best = Some(current.clone());
            }
            current.pop();
        }
        return;
    }
    for &d in divisors.iter().filter(|&&d| d <= bound && n % d == 0) {
        // The largest remaining factor is at least the slots-th root of n
        if d.checked_pow(slots as u32).is_some_and(|p| p < n) {
            break;
        }
        current.push(d);
        search_factors(n / d, slots - 1, d, divisors, current, best);
        current.pop();
    }
}

/// Row-major grid coordinates of `rank` (last axis varies fastest)
pub fn rank_to_coords(rank: usize, dims: &[usize]) -> Result<Vec<usize>> {
    let total = dims
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or(ParioError::SizeOverflow)?;
    if rank >= total {
        return Err(ParioError::WorkerOutOfRange {
            id: rank,
            workers: total,
        });
    }
    let mut coords = vec![0; dims.len()];
    let mut rest = rank;
    for axis in (0..dims.len()).rev() {
        coords[axis] = rest % dims[axis];
        rest /= dims[axis];
    }
    Ok(coords)
}

/// Inverse of [`rank_to_coords`]
pub fn coords_to_rank(coords: &[usize], dims: &[usize]) -> Result<usize> {
    if coords.len() != dims.len() {
        return Err(ParioError::InvalidGrid);
    }
    let mut rank = 0usize;
    for (axis, (&c, &d)) in coords.iter().zip(dims).enumerate() {
        if c >= d {
            return Err(ParioError::WorkerOutOfRange {
                id: c,
                workers: dims[axis],
            });
        }
        rank = rank * d + c;
    }
    Ok(rank)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_dims_create_balanced() {
        assert_eq!(dims_create(4, 2).unwrap(), [2, 2]);
        assert_eq!(dims_create(12, 2).unwrap(), [4, 3]);
        assert_eq!(dims_create(6, 2).unwrap(), [3, 2]);
        assert_eq!(dims_create(7, 2).unwrap(), [7, 1]);
        assert_eq!(dims_create(8, 3).unwrap(), [2, 2, 2]);
        assert_eq!(dims_create(24, 3).unwrap(), [4, 3, 2]);
        assert_eq!(dims_create(1, 3).unwrap(), [1, 1, 1]);
        assert_eq!(dims_create(5, 1).unwrap(), [5]);
        assert_eq!(dims_create(72, 2).unwrap(), [9, 8]);
        assert_eq!(dims_create(144, 2).unwrap(), [12, 12]);
        assert_eq!(dims_create(128, 3).unwrap(), [8, 4, 4]);
        assert_eq!(dims_create(12, 3).unwrap(), [3, 2, 2]);
        assert_eq!(dims_create(36, 3).unwrap(), [4, 3, 3]);
    }

    #[test]
    fn test_dims_create_constrained() {
        assert_eq!(dims_create_constrained(12, &[0, 3]).unwrap(), [4, 3]);
        assert_eq!(dims_create_constrained(12, &[2, 0, 0]).unwrap(), [2, 3, 2]);
        assert_eq!(dims_create_constrained(6, &[2, 3]).unwrap(), [2, 3]);
        assert_eq!(
            dims_create_constrained(12, &[5, 0]),
            Err(ParioError::InvalidGrid)
        );
        assert_eq!(
            dims_create_constrained(12, &[2, 3]),
            Err(ParioError::InvalidGrid)
        );
        assert_eq!(dims_create(0, 2), Err(ParioError::NoWorkers));
        assert_eq!(dims_create(4, 0), Err(ParioError::InvalidGrid));
    }

    #[test]
    fn test_coords_round_trip_row_major() {
        let dims = [2, 3];
        assert_eq!(rank_to_coords(0, &dims).unwrap(), [0, 0]);
        assert_eq!(rank_to_coords(1, &dims).unwrap(), [0, 1]);
        assert_eq!(rank_to_coords(3, &dims).unwrap(), [1, 0]);
        assert_eq!(rank_to_coords(5, &dims).unwrap(), [1, 2]);
        for rank in 0..6 {
            let coords = rank_to_coords(rank, &dims).unwrap();
            assert_eq!(coords_to_rank(&coords, &dims).unwrap(), rank);
        }
        assert!(rank_to_coords(6, &dims).is_err());
    }

    #[test]
    fn test_topology_validation() {
        assert_eq!(LinearTopology::new(0, 0), Err(ParioError::NoWorkers));
        assert!(LinearTopology::new(4, 4).is_err());

        let cart = CartesianTopology::new(4, 3, 2).unwrap();
        assert_eq!(cart.dims(), [2, 2]);
        assert_eq!(cart.coords(), [1, 1]);

        assert_eq!(
            CartesianTopology::with_dims(4, 0, vec![3, 1]),
            Err(ParioError::InvalidGrid)
        );
        let fixed = CartesianTopology::with_dims(6, 4, vec![3, 2]).unwrap();
        assert_eq!(fixed.coords(), [2, 0]);
        let filled = CartesianTopology::with_dims(12, 0, vec![0, 2]).unwrap();
        assert_eq!(filled.dims(), [6, 2]);

        let topo: Topology = cart.into();
        assert!(topo.as_cartesian().is_some());
        assert_eq!(topo.linear(), LinearTopology::new(4, 3).unwrap());
    }
}
