//! Architecture document loading and batch generation.

pub mod batch;
pub mod document;

pub use batch::{BatchOutput, generate_all};
pub use document::{ArchitectureDocument, ArchitectureInformation, LoadError};
