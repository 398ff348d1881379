//! Core document types for Plotsave
//!
//! This crate provides:
//! - Immutable document snapshots
//! - The set of volatile system keys excluded from persistence
//! - Structural change detection between snapshots
//! - The empty-document template and required-key validation

pub mod compare;
pub mod keys;
pub mod snapshot;
pub mod template;

// Re-exports
pub use compare::StateComparator;
pub use keys::SystemKeys;
pub use snapshot::Snapshot;
pub use template::{empty_document, RequiredKeys};
