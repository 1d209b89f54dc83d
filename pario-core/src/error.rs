//! Error types for pario core operations

/// Errors that can occur while decomposing domains or describing file regions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParioError {
    /// Worker count of zero
    NoWorkers,
    /// Worker id outside `[0, workers)`
    WorkerOutOfRange { id: usize, workers: usize },
    /// Decomposed extent smaller than the number of workers on that axis
    LoadBelowWorkers { load: usize, workers: usize },
    /// Domain with no axes or a zero-length axis
    InvalidDomain,
    /// Process grid has more axes than the domain
    GridRankMismatch { grid: usize, domain: usize },
    /// Process grid does not multiply out to the group size
    InvalidGrid,
    /// Topology is not a Cartesian process grid
    NotCartesian,
    /// Subarray bounds escape the global array
    RegionOutOfBounds { axis: usize },
    /// Access mode bitmask rejected
    InvalidAccessMode(u32),
    /// Element type cannot be mapped to an I/O primitive
    UnsupportedElementType,
    /// Memory order literal not recognized
    InvalidOrder,
    /// Column-major layout requested
    FortranOrderUnsupported,
    /// Invalid header format
    InvalidHeader,
    /// Unsupported format version
    UnsupportedFormat,
    /// Insufficient buffer space
    InsufficientBuffer,
    /// Size computation overflowed `usize`
    SizeOverflow,
}

/// Broad classification used to decide how a failure propagates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed input, caught before any I/O or collective call
    InvalidArgument,
    /// Recognized input the implementation does not support
    NotImplemented,
    /// Malformed on-disk header
    Format,
}

impl ParioError {
    /// Classify this error
    pub const fn category(&self) -> ErrorCategory {
        match self {
            ParioError::FortranOrderUnsupported => ErrorCategory::NotImplemented,
            ParioError::InvalidHeader
            | ParioError::UnsupportedFormat
            | ParioError::InsufficientBuffer => ErrorCategory::Format,
            _ => ErrorCategory::InvalidArgument,
        }
    }
}

impl core::fmt::Display for ParioError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ParioError::NoWorkers => write!(f, "Worker count must be positive"),
            ParioError::WorkerOutOfRange { id, workers } => {
                write!(f, "Worker id {id} out of range for {workers} workers")
            }
            ParioError::LoadBelowWorkers { load, workers } => write!(
                f,
                "Domain size ({load}) must be larger than the amount of workers ({workers})"
            ),
            ParioError::InvalidDomain => write!(f, "Domain must have at least one non-empty axis"),
            ParioError::GridRankMismatch { grid, domain } => write!(
                f,
                "Process grid rank {grid} exceeds domain rank {domain}"
            ),
            ParioError::InvalidGrid => write!(f, "Process grid does not match group size"),
            ParioError::NotCartesian => write!(f, "Expected a Cartesian process topology"),
            ParioError::RegionOutOfBounds { axis } => {
                write!(f, "Subarray exceeds global array on axis {axis}")
            }
            ParioError::InvalidAccessMode(bits) => {
                write!(f, "File access mode value {bits:#x} is invalid")
            }
            ParioError::UnsupportedElementType => write!(f, "Unsupported element type"),
            ParioError::InvalidOrder => write!(f, "Memory order must be 'C' or 'F'"),
            ParioError::FortranOrderUnsupported => {
                write!(f, "Column-major (Fortran) ordering is not supported")
            }
            ParioError::InvalidHeader => write!(f, "Invalid array file header"),
            ParioError::UnsupportedFormat => write!(f, "Unsupported format version"),
            ParioError::InsufficientBuffer => write!(f, "Insufficient buffer space"),
            ParioError::SizeOverflow => write!(f, "Size computation overflowed"),
        }
    }
}

impl core::error::Error for ParioError {}

/// Result type for pario core operations
pub type Result<T> = core::result::Result<T, ParioError>;
