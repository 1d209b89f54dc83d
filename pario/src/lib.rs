//! pario - Collective, Decomposition-Aware Array File I/O
//!
//! This library lets a group of workers read one shared array file so that
//! every worker receives exactly its own brick of the global array.
//!
//! ## Architecture
//!
//! - **pario-core**: decomposition, topology, region and header definitions (no I/O)
//! - **pario**: communicators, process groups, collective files and channels
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pario::{npy, ProcessGroup, ThreadComm};
//!
//! fn example() -> pario::Result<()> {
//!     let sums = ThreadComm::run(4, |comm| -> pario::Result<f64> {
//!         let group = ProcessGroup::cartesian(Arc::new(comm), 2)?;
//!         let brick = npy::load::<f64>("field.npy", &group)?;
//!         Ok(brick.data().iter().sum())
//!     })?;
//!     for sum in sums {
//!         println!("local sum {}", sum?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Slab and Cartesian decomposition**: balanced, deterministic, communication free
//! - **Collective semantics**: a failure on one worker fails the whole group
//! - **Memory-mapped reads**: each worker copies only its own byte runs
//! - **MPI runtime** (feature `mpi`): [`MpiComm`] and `ProcessGroup::from_cartesian`
//!   run the same code across MPI processes

pub use pario_core::{
    // Decomposition
    dims_create, partition_sizes, split_work, CartesianDecomposition, CartesianTopology,
    Decomposer, Decomposition, LinearTopology, SlabDecomposition, Topology,
    // Regions and file format
    AccessMode, ByteRun, CommittedRegion, Element, ElementType, NpyHeader, OpenMode, Order,
    Subarray,
    // Error handling
    ErrorCategory, ParioError,
};

pub mod channel;
pub mod comm;
pub mod config;
pub mod error;
pub mod file;
pub mod group;
#[cfg(feature = "mpi")]
pub mod mpi_comm;
pub mod npy;

pub use channel::{CollectiveFileChannel, DynamicArray, LocalArray};
pub use comm::{Communicator, SelfComm, ThreadComm};
pub use config::ChannelConfig;
pub use error::{Error, ErrorKind, Result};
pub use file::{CollectiveFile, FileView};
pub use group::ProcessGroup;
#[cfg(feature = "mpi")]
pub use mpi_comm::MpiComm;
