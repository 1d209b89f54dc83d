//! Array file format definitions
//!
//! Pure header encoding and decoding. No I/O operations - callers hand in
//! the bytes they read and get back the byte offset of the array payload.

pub mod constants;
pub mod npy;

pub use npy::NpyHeader;
