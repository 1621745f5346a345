//! High-level API
mod tree;

pub use self::tree::*;
