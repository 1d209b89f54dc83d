//! Channel configuration

use pario_core::{AccessMode, OpenMode};

use crate::{Error, Result};

/// Settings of a [`CollectiveFileChannel`](crate::CollectiveFileChannel)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Mode a channel opens with when `load` finds it closed
    pub read_mode: OpenMode,
    /// Check that the file holds the whole global payload before reading
    pub size_check: bool,
}

impl ChannelConfig {
    /// Use `mode` when a load has to open the file
    ///
    /// The mode must allow reading.
    pub fn with_read_mode(mut self, mode: OpenMode) -> Result<Self> {
        if !mode.is_readable() {
            return Err(Error::InvalidArgument(format!(
                "read mode {mode} does not allow reading"
            )));
        }
        if mode.contains(AccessMode::Create) {
            return Err(Error::InvalidArgument(format!(
                "read mode {mode} must not create the file"
            )));
        }
        self.read_mode = mode;
        Ok(self)
    }

    /// Enable or disable the whole-payload size check
    pub fn with_size_check(mut self, size_check: bool) -> Self {
        self.size_check = size_check;
        self
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            read_mode: OpenMode::READ_ONLY,
            size_check: true,
        }
    }
}
