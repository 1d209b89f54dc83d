//! Error type for collective I/O

use pario_core::{ErrorCategory, ParioError};
use thiserror::Error;

/// Errors that can occur during collective file operations
#[derive(Error, Debug)]
pub enum Error {
    /// Rejected by local validation before any I/O or collective call
    #[error(transparent)]
    Core(#[from] ParioError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    /// Call not allowed in the channel's current state
    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),

    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Another worker failed its part of a collective call
    #[error("collective {operation} failed on another worker (local rank {rank} succeeded)")]
    Collective {
        operation: &'static str,
        rank: usize,
    },
}

/// Coarse classification of [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    NotImplemented,
    InvalidOperation,
    /// Malformed array file header
    Format,
    /// Unrecoverable for the whole group
    Fatal,
}

impl Error {
    pub(crate) fn io(context: &'static str) -> impl FnOnce(std::io::Error) -> Error {
        move |source| Error::Io { context, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Core(e) => match e.category() {
                ErrorCategory::InvalidArgument => ErrorKind::InvalidArgument,
                ErrorCategory::NotImplemented => ErrorKind::NotImplemented,
                ErrorCategory::Format => ErrorKind::Format,
            },
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::NotImplemented(_) => ErrorKind::NotImplemented,
            Error::InvalidOperation(_) => ErrorKind::InvalidOperation,
            Error::Io { .. } | Error::Collective { .. } => ErrorKind::Fatal,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
