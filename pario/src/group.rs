//! Process groups
//!
//! A [`ProcessGroup`] binds a collective runtime handle to the topology the
//! group was arranged in. Whether the group is a Cartesian grid is resolved
//! once here and never re-inspected downstream.

use std::sync::Arc;

#[cfg(feature = "mpi")]
use pario_core::ParioError;
use pario_core::{CartesianTopology, LinearTopology, Topology};

use crate::comm::Communicator;
use crate::Result;

/// A communicator together with its virtual process topology
#[derive(Debug, Clone)]
pub struct ProcessGroup {
    comm: Arc<dyn Communicator>,
    topology: Topology,
}

impl ProcessGroup {
    /// Group with no grid structure
    pub fn linear(comm: Arc<dyn Communicator>) -> Result<Self> {
        let topology = LinearTopology::new(comm.size(), comm.rank())?.into();
        Ok(Self { comm, topology })
    }

    /// Group arranged as a balanced `ndims`-dimensional grid
    pub fn cartesian(comm: Arc<dyn Communicator>, ndims: usize) -> Result<Self> {
        let topology = CartesianTopology::new(comm.size(), comm.rank(), ndims)?.into();
        Ok(Self { comm, topology })
    }

    /// Group arranged as a grid of explicit shape
    ///
    /// Zero entries are filled in the same way as [`pario_core::topology::dims_create_constrained`].
    pub fn cartesian_with_dims(comm: Arc<dyn Communicator>, dims: Vec<usize>) -> Result<Self> {
        let topology = CartesianTopology::with_dims(comm.size(), comm.rank(), dims)?.into();
        Ok(Self { comm, topology })
    }

    /// Group over an MPI Cartesian communicator, keeping its grid layout
    ///
    /// The grid shape and coordinates are taken from the communicator and
    /// must agree with the row-major rank mapping used everywhere else.
    #[cfg(feature = "mpi")]
    pub fn from_cartesian(comm: mpi::topology::CartesianCommunicator) -> Result<Self> {
        use mpi::traits::Communicator as _;

        let layout = comm.get_layout();
        let to_usize = |values: &[i32]| {
            values
                .iter()
                .map(|&v| usize::try_from(v).map_err(|_| ParioError::InvalidGrid))
                .collect::<core::result::Result<Vec<_>, _>>()
        };
        let dims = to_usize(layout.dims.as_slice())?;
        let coords = to_usize(layout.coords.as_slice())?;
        let size = usize::try_from(comm.size()).map_err(|_| ParioError::InvalidGrid)?;
        let rank = usize::try_from(comm.rank()).map_err(|_| ParioError::InvalidGrid)?;

        let cart = CartesianTopology::with_dims(size, rank, dims)?;
        if cart.coords() != coords.as_slice() {
            return Err(ParioError::InvalidGrid.into());
        }
        tracing::debug!(rank, dims = ?cart.dims(), "joined MPI grid");
        Ok(Self {
            comm: Arc::new(crate::mpi_comm::MpiComm::new(comm)),
            topology: cart.into(),
        })
    }

    pub fn comm(&self) -> &Arc<dyn Communicator> {
        &self.comm
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn rank(&self) -> usize {
        self.comm.rank()
    }

    pub fn size(&self) -> usize {
        self.comm.size()
    }
}
