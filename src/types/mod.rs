//! Core types for the entity graph.

pub mod vertex;
pub mod relationship;

pub use vertex::{Vertex, VertexIdx, IncomingRef, NAME_PROPERTY, TYPE_PROPERTY};
pub use relationship::Relationship;
