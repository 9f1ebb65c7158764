//! Core module IR and pass infrastructure for replica.
//!
//! This crate provides the foundations the pass crates build on:
//! - Tree-shaped module IR (`Module`, `Operation`, `Region`)
//! - Closed operation kinds and attribute values (`OpKind`, `AttributeValue`)
//! - The `Pass` trait and `Stage` ordering
//! - A `PassRegistry` for assembling pipelines by pass argument

pub mod ir;
pub mod pass;
pub mod registry;
pub mod types;

// Re-export commonly used types
pub use ir::{Module, OpId, Operation, Region, WalkResult};
pub use pass::{Pass, Stage};
pub use registry::PassRegistry;
pub use types::{AttributeValue, OpKind, OtherOpName};

/// Result type using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for replica operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid module structure: {0}")]
    InvalidModule(String),

    #[error("Attribute error: {0}")]
    Attribute(String),

    #[error("Unknown pass: {0}")]
    UnknownPass(String),

    #[error("Module verification failed: {0}")]
    Verification(String),
}
