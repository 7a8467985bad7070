//! Code generator for CPU-instruction semantics.
//!
//! Semantic lines written in a small expression DSL are parsed, lowered into
//! a target-side IR and rendered as C++ statements that build expression trees
//! through the `Expr::Make*` constructor API.

pub mod loader;
pub mod semantics;

pub use semantics::{
    GenerationError, IdentifierTable, OpcodeDescriptor, SemanticBlock, SemanticCompiler,
    SemanticError,
};
