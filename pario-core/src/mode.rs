//! File access modes
//!
//! Bit values match the common MPI-IO implementation so a mode word coming
//! from elsewhere can be validated as-is.

use crate::{ParioError, Result};

/// Single access-mode flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum AccessMode {
    Create = 1,
    ReadOnly = 2,
    WriteOnly = 4,
    ReadWrite = 8,
    DeleteOnClose = 16,
    UniqueOpen = 32,
    Exclusive = 64,
    Append = 128,
    Sequential = 256,
}

impl AccessMode {
    /// Every recognized flag
    pub const ALL: [AccessMode; 9] = [
        AccessMode::Create,
        AccessMode::ReadOnly,
        AccessMode::WriteOnly,
        AccessMode::ReadWrite,
        AccessMode::DeleteOnClose,
        AccessMode::UniqueOpen,
        AccessMode::Exclusive,
        AccessMode::Append,
        AccessMode::Sequential,
    ];

    pub const fn bits(self) -> u32 {
        self as u32
    }

    pub const fn describe(self) -> &'static str {
        match self {
            AccessMode::Create => "create the file if it does not exist",
            AccessMode::ReadOnly => "read only",
            AccessMode::WriteOnly => "write only",
            AccessMode::ReadWrite => "reading and writing",
            AccessMode::DeleteOnClose => "delete file on close",
            AccessMode::UniqueOpen => "file will not be concurrently opened elsewhere",
            AccessMode::Exclusive => "error if creating file that already exists",
            AccessMode::Append => "set initial position of all file pointers to end of file",
            AccessMode::Sequential => "file will only be accessed sequentially",
        }
    }
}

/// Validated combination of access-mode flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpenMode(u32);

impl OpenMode {
    const KNOWN: u32 = 0x1ff;
    const ACCESS: u32 = AccessMode::ReadOnly.bits()
        | AccessMode::WriteOnly.bits()
        | AccessMode::ReadWrite.bits();

    pub const READ_ONLY: OpenMode = OpenMode(AccessMode::ReadOnly.bits());
    pub const CREATE_WRITE: OpenMode =
        OpenMode(AccessMode::Create.bits() | AccessMode::WriteOnly.bits());

    /// Validate a raw mode word
    ///
    /// Exactly one of read-only, write-only and read-write must be set.
    /// Read-only cannot be combined with create or exclusive, and
    /// read-write cannot be sequential.
    pub const fn from_bits(bits: u32) -> Result<Self> {
        let invalid = Err(ParioError::InvalidAccessMode(bits));
        if bits & !Self::KNOWN != 0 {
            return invalid;
        }
        if (bits & Self::ACCESS).count_ones() != 1 {
            return invalid;
        }
        let mode = OpenMode(bits);
        if mode.contains(AccessMode::ReadOnly)
            && (mode.contains(AccessMode::Create) || mode.contains(AccessMode::Exclusive))
        {
            return invalid;
        }
        if mode.contains(AccessMode::ReadWrite) && mode.contains(AccessMode::Sequential) {
            return invalid;
        }
        Ok(mode)
    }

    /// Combine flags, then validate
    pub fn from_flags(flags: &[AccessMode]) -> Result<Self> {
        Self::from_bits(flags.iter().fold(0, |acc, f| acc | f.bits()))
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, flag: AccessMode) -> bool {
        self.0 & flag.bits() != 0
    }

    pub const fn is_readable(self) -> bool {
        self.contains(AccessMode::ReadOnly) || self.contains(AccessMode::ReadWrite)
    }

    pub const fn is_writable(self) -> bool {
        self.contains(AccessMode::WriteOnly) || self.contains(AccessMode::ReadWrite)
    }

    /// Set flags in declaration order
    pub fn flags(self) -> impl Iterator<Item = AccessMode> {
        AccessMode::ALL.into_iter().filter(move |f| self.contains(*f))
    }
}

impl core::fmt::Display for OpenMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut first = true;
        for flag in self.flags() {
            if !first {
                write!(f, " | ")?;
            }
            write!(f, "{flag:?}")?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_access_flags() {
        assert_eq!(OpenMode::from_bits(2), Ok(OpenMode::READ_ONLY));
        assert!(OpenMode::from_bits(4).is_ok());
        assert!(OpenMode::from_bits(8).is_ok());
        assert_eq!(OpenMode::from_bits(5), Ok(OpenMode::CREATE_WRITE));
        assert!(OpenMode::CREATE_WRITE.is_writable());
        assert!(!OpenMode::CREATE_WRITE.is_readable());
    }

    #[test]
    fn test_combinations() {
        let mode = OpenMode::from_flags(&[
            AccessMode::WriteOnly,
            AccessMode::Create,
            AccessMode::Exclusive,
            AccessMode::Append,
        ])
        .unwrap();
        assert!(mode.contains(AccessMode::Append));
        assert_eq!(mode.flags().count(), 4);

        assert!(OpenMode::from_flags(&[AccessMode::ReadOnly, AccessMode::DeleteOnClose]).is_ok());
        assert!(OpenMode::from_flags(&[AccessMode::ReadOnly, AccessMode::Sequential]).is_ok());
        assert!(OpenMode::from_flags(&[AccessMode::ReadOnly, AccessMode::UniqueOpen]).is_ok());
    }

    #[test]
    fn test_invalid_modes() {
        // Unknown bit, no access flag, two access flags
        for bits in [0x200, 0, 1, 2 | 4, 2 | 8, 4 | 8] {
            assert_eq!(
                OpenMode::from_bits(bits),
                Err(ParioError::InvalidAccessMode(bits))
            );
        }
        assert!(OpenMode::from_flags(&[AccessMode::ReadOnly, AccessMode::Create]).is_err());
        assert!(OpenMode::from_flags(&[AccessMode::ReadOnly, AccessMode::Exclusive]).is_err());
        assert!(OpenMode::from_flags(&[AccessMode::ReadWrite, AccessMode::Sequential]).is_err());
    }

    #[test]
    fn test_every_flag_described() {
        for flag in AccessMode::ALL {
            assert!(!flag.describe().is_empty());
        }
        assert_eq!(
            AccessMode::ALL.iter().fold(0, |acc, f| acc | f.bits()),
            0x1ff
        );
    }
}
