//! Metadata model for program indicator expressions
//!
//! The compiler never owns metadata. It resolves data elements, program stages,
//! attributes, constants and relationship types through the read-only
//! [`MetadataProvider`] trait. [`InMemoryMetadata`] is a ready-made implementation
//! backed by JSON documents.

mod provider;
mod registry;
mod value_type;

pub use provider::*;
pub use registry::*;
pub use value_type::*;
