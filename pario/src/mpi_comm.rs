//! MPI-backed communicator
//!
//! Wraps any rsmpi communicator so process groups, files and channels run
//! across real MPI processes. Built with the `mpi` feature.

use std::fmt;

use mpi::collective::SystemOperation;
use mpi::traits::{Communicator as MpiCommunicator, CommunicatorCollectives};

use crate::comm::Communicator;

/// A [`Communicator`] over an rsmpi communicator such as
/// `SimpleCommunicator` or `CartesianCommunicator`
pub struct MpiComm<C> {
    comm: C,
}

impl<C: MpiCommunicator> MpiComm<C> {
    pub fn new(comm: C) -> Self {
        Self { comm }
    }

    pub fn inner(&self) -> &C {
        &self.comm
    }

    pub fn into_inner(self) -> C {
        self.comm
    }
}

impl<C: MpiCommunicator> fmt::Debug for MpiComm<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MpiComm")
            .field("rank", &self.comm.rank())
            .field("size", &self.comm.size())
            .finish()
    }
}

impl<C: MpiCommunicator> Communicator for MpiComm<C> {
    fn rank(&self) -> usize {
        // Members always have a non-negative rank
        self.comm.rank() as usize
    }

    fn size(&self) -> usize {
        self.comm.size() as usize
    }

    fn barrier(&self) {
        self.comm.barrier();
    }

    fn all_true(&self, local: bool) -> bool {
        let mut agreed = 0i32;
        self.comm
            .all_reduce_into(&i32::from(local), &mut agreed, SystemOperation::logical_and());
        agreed != 0
    }
}
