//! Memory layout order

use core::str::FromStr;

use crate::{ParioError, Result};

/// Memory layout of a multi-dimensional array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Order {
    /// Row-major: the last axis varies fastest
    #[default]
    C,
    /// Column-major: the first axis varies fastest
    Fortran,
}

impl Order {
    /// Fail unless this is row-major, the only layout supported for
    /// collective access
    pub const fn require_row_major(self) -> Result<()> {
        match self {
            Order::C => Ok(()),
            Order::Fortran => Err(ParioError::FortranOrderUnsupported),
        }
    }
}

impl FromStr for Order {
    type Err = ParioError;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("c") {
            Ok(Order::C)
        } else if s.eq_ignore_ascii_case("f") {
            Ok(Order::Fortran)
        } else {
            Err(ParioError::InvalidOrder)
        }
    }
}

impl core::fmt::Display for Order {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Order::C => write!(f, "C"),
            Order::Fortran => write!(f, "F"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_order() {
        assert_eq!("C".parse::<Order>(), Ok(Order::C));
        assert_eq!("c".parse::<Order>(), Ok(Order::C));
        assert_eq!("F".parse::<Order>(), Ok(Order::Fortran));
        assert_eq!("A".parse::<Order>(), Err(ParioError::InvalidOrder));
        assert_eq!(
            Order::Fortran.require_row_major(),
            Err(ParioError::FortranOrderUnsupported)
        );
    }
}
