//! Semantic DSL compilation pipeline.
//!
//! The stages mirror the data flow for one opcode: the [`lexer`] and [`parser`]
//! turn a semantic line into an [`ast::Module`], the [`resolver`] maps leaf
//! names onto accessors, [`lower`] walks the tree into [`target::TargetExpr`]
//! nodes, [`flags`] produces the flag preamble and [`assembler`] threads the
//! pieces into a [`SemanticBlock`] which [`render`] serializes as C++.

pub mod assembler;
pub mod ast;
pub mod descriptor;
pub mod error;
pub mod flags;
pub mod lexer;
pub mod lower;
pub mod parser;
pub mod render;
pub mod resolver;
pub mod target;


pub use assembler::{SemanticBlock, SemanticCompiler};
pub use descriptor::{OpcodeDescriptor, SemanticEntry};
pub use error::{GenerationError, SemanticError};
pub use flags::FlagEffects;
pub use parser::parse;
pub use resolver::{IdentifierTable, Resolver};
