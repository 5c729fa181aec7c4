//! Log sources for logval
//!
//! This crate resolves a `LogSource` into a directory, enumerates the files
//! in it, and reads the bytes appended to a file since a given offset.

mod error;
mod local;
mod mask;
mod resource;

pub use error::{Result, SourceError};
pub use local::LocalResource;
pub use mask::FileMask;
pub use resource::{Delta, FileEntry, Resource, SourceDir};

// Re-export types used in our public API
pub use logval_types::LogSource;
