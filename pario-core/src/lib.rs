#![no_std]

//! pario Core - Domain Decomposition and Array File Definitions
//!
//! This crate provides the pure, communication-free part of parallel array
//! I/O: how a global array is split among workers, where each worker's brick
//! lives inside the file, and how the array-file header is laid out.

extern crate alloc;

#[cfg(test)]
extern crate std;

pub mod decomposition;
pub mod element;
pub mod error;
pub mod format;
pub mod mode;
pub mod order;
pub mod partition;
pub mod region;
pub mod topology;

pub use decomposition::{CartesianDecomposition, Decomposer, Decomposition, SlabDecomposition};
pub use element::{Element, ElementType};
pub use error::*;
pub use format::NpyHeader;
pub use mode::{AccessMode, OpenMode};
pub use order::Order;
pub use partition::{partition_sizes, split_work};
pub use region::{ByteRun, CommittedRegion, Subarray};
pub use topology::{dims_create, CartesianTopology, LinearTopology, Topology};
