//! Format constants and magic bytes for the array file format

/// Magic prefix of every array file
pub const MAGIC: [u8; 6] = *b"\x93NUMPY";

/// Magic plus the two version bytes
pub const PREAMBLE_LEN: usize = MAGIC.len() + 2;

/// Header plus preamble is padded to this boundary
pub const ARRAY_ALIGN: usize = 64;

/// Largest header length a version 1.0 header can encode
pub const V1_MAX_HEADER_LEN: usize = u16::MAX as usize;

/// Upper bound accepted when parsing, to avoid unbounded reads
pub const MAX_HEADER_LEN: usize = 1 << 20;
