//! Common types for Trellis: spec records, port syntax parsing, and errors

#![deny(missing_docs)]

pub mod error;
pub mod spec;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
