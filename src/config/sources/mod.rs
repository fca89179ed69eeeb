//! Config sources, applied after the merge policy defaults.

pub mod environment;
pub mod file;
