//! Subarray region descriptors
//!
//! A [`Subarray`] describes where one worker's brick sits inside the global
//! row-major array. Committing it flattens the description into the list of
//! contiguous byte runs the worker must touch, relative to the start of the
//! array payload. Runs of different workers never overlap, and together they
//! cover the payload exactly.

use alloc::vec;
use alloc::vec::Vec;

use crate::{Decomposition, ElementType, Order, ParioError, Result};

/// A contiguous span of the array payload, in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRun {
    pub offset: u64,
    pub len: u64,
}

impl ByteRun {
    pub fn end(&self) -> u64 {
        self.offset + self.len
    }
}

/// Typed, strided description of a brick inside a global array
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subarray {
    decomposition: Decomposition,
    element: ElementType,
}

impl Subarray {
    /// Validate a decomposition as a subarray of `element` values
    ///
    /// Only row-major layout is supported.
    pub fn new(decomposition: Decomposition, element: ElementType, order: Order) -> Result<Self> {
        order.require_row_major()?;

        let Decomposition {
            sizes,
            subsizes,
            starts,
        } = &decomposition;
        if sizes.is_empty() || sizes.len() != subsizes.len() || sizes.len() != starts.len() {
            return Err(ParioError::InvalidDomain);
        }
        for axis in 0..sizes.len() {
            let end = starts[axis]
                .checked_add(subsizes[axis])
                .ok_or(ParioError::SizeOverflow)?;
            if sizes[axis] == 0 || end > sizes[axis] {
                return Err(ParioError::RegionOutOfBounds { axis });
            }
        }

        sizes
            .iter()
            .try_fold(element.size_bytes(), |acc, &n| acc.checked_mul(n))
            .ok_or(ParioError::SizeOverflow)?;

        Ok(Self {
            decomposition,
            element,
        })
    }

    pub fn decomposition(&self) -> &Decomposition {
        &self.decomposition
    }

    pub fn element(&self) -> ElementType {
        self.element
    }

    /// Flatten into byte runs
    pub fn commit(self) -> CommittedRegion {
        let runs = byte_runs(&self.decomposition, self.element.size_bytes() as u64);
        CommittedRegion::new(self, runs)
    }
}

fn byte_runs(decomposition: &Decomposition, esize: u64) -> Vec<ByteRun> {
    let Decomposition {
        sizes,
        subsizes,
        starts,
    } = decomposition;
    let rank = sizes.len();

    let mut runs = Vec::new();
    if subsizes.iter().any(|&n| n == 0) {
        return runs;
    }

    // Element strides of the global array
    let mut strides = vec![1u64; rank];
    for axis in (0..rank.saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1] * sizes[axis + 1] as u64;
    }

    // Innermost axis that is not kept whole bounds the contiguous run
    let split = (0..rank)
        .rev()
        .find(|&axis| subsizes[axis] != sizes[axis])
        .unwrap_or(0);
    let run_len = subsizes[split] as u64 * strides[split] * esize;

    let mut index = vec![0usize; split];
    'runs: loop {
        let mut offset = starts[split] as u64 * strides[split];
        for axis in 0..split {
            offset += (starts[axis] + index[axis]) as u64 * strides[axis];
        }
        runs.push(ByteRun {
            offset: offset * esize,
            len: run_len,
        });

        // Odometer over the outer axes, last axis fastest
        let mut axis = split;
        loop {
            if axis == 0 {
                break 'runs;
            }
            axis -= 1;
            index[axis] += 1;
            if index[axis] < subsizes[axis] {
                break;
            }
            index[axis] = 0;
        }
    }
    runs
}

/// A subarray flattened into the byte runs a collective transfer touches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedRegion {
    subarray: Subarray,
    runs: Vec<ByteRun>,
}

impl CommittedRegion {
    fn new(subarray: Subarray, runs: Vec<ByteRun>) -> Self {
        Self { subarray, runs }
    }

    pub fn subarray(&self) -> &Subarray {
        &self.subarray
    }

    pub fn element(&self) -> ElementType {
        self.subarray.element
    }

    /// Contiguous runs in increasing offset order
    pub fn runs(&self) -> &[ByteRun] {
        &self.runs
    }

    /// Number of local elements
    pub fn local_len(&self) -> usize {
        self.subarray.decomposition.local_len()
    }

    /// Bytes owned by this worker
    pub fn local_bytes(&self) -> u64 {
        self.runs.iter().map(|r| r.len).sum()
    }

    /// Bytes of the whole global array payload
    pub fn global_bytes(&self) -> u64 {
        self.subarray.decomposition.global_len() as u64 * self.element().size_bytes() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        CartesianDecomposition, CartesianTopology, LinearTopology, SlabDecomposition, Topology,
    };

    fn region(d: Decomposition, element: ElementType) -> CommittedRegion {
        Subarray::new(d, element, Order::C).unwrap().commit()
    }

    #[test]
    fn test_slab_is_one_run() {
        let topo: Topology = LinearTopology::new(4, 2).unwrap().into();
        let d = SlabDecomposition::new(&topo).decompose(&[8, 4, 4]).unwrap();
        let r = region(d, ElementType::F64);
        assert_eq!(r.runs(), [ByteRun { offset: 4 * 16 * 8, len: 2 * 16 * 8 }]);
        assert_eq!(r.local_bytes(), 256);
        assert_eq!(r.global_bytes(), 8 * 16 * 8);
    }

    #[test]
    fn test_inner_split_produces_strided_runs() {
        let d = Decomposition {
            sizes: vec![4, 6],
            subsizes: vec![2, 3],
            starts: vec![1, 3],
        };
        let r = region(d, ElementType::U8);
        assert_eq!(
            r.runs(),
            [
                ByteRun { offset: 9, len: 3 },
                ByteRun { offset: 15, len: 3 }
            ]
        );
    }

    #[test]
    fn test_three_axis_brick() {
        let d = Decomposition {
            sizes: vec![2, 3, 4],
            subsizes: vec![2, 2, 4],
            starts: vec![0, 1, 0],
        };
        let r = region(d, ElementType::I32);
        assert_eq!(
            r.runs(),
            [
                ByteRun { offset: 16, len: 32 },
                ByteRun { offset: 64, len: 32 }
            ]
        );
        assert_eq!(r.local_len(), 16);
    }

    #[test]
    fn test_cartesian_bricks_cover_payload_once() {
        let domain = [6, 5, 3];
        let mut owner = vec![0u8; 6 * 5 * 3 * 2];
        for rank in 0..6 {
            let topo: Topology = CartesianTopology::new(6, rank, 2).unwrap().into();
            let d = CartesianDecomposition::new(&topo).unwrap().decompose(&domain).unwrap();
            for run in region(d, ElementType::U16).runs() {
                for byte in run.offset..run.end() {
                    owner[byte as usize] += 1;
                }
            }
        }
        assert!(owner.iter().all(|&n| n == 1));
    }

    #[test]
    fn test_invalid_subarrays() {
        let d = Decomposition {
            sizes: vec![4, 4],
            subsizes: vec![2, 3],
            starts: vec![0, 2],
        };
        assert_eq!(
            Subarray::new(d.clone(), ElementType::F32, Order::C),
            Err(ParioError::RegionOutOfBounds { axis: 1 })
        );
        assert_eq!(
            Subarray::new(d, ElementType::F32, Order::Fortran),
            Err(ParioError::FortranOrderUnsupported)
        );
        let ragged = Decomposition {
            sizes: vec![4, 4],
            subsizes: vec![2],
            starts: vec![0, 0],
        };
        assert_eq!(
            Subarray::new(ragged, ElementType::F32, Order::C),
            Err(ParioError::InvalidDomain)
        );
    }

    #[test]
    fn test_empty_brick_has_no_runs() {
        let d = Decomposition {
            sizes: vec![4, 4],
            subsizes: vec![0, 4],
            starts: vec![4, 0],
        };
        assert!(region(d, ElementType::F32).runs().is_empty());
    }
}
