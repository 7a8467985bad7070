use thiserror::Error;

/// Failure raised while compiling a single semantic line or flag declaration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticError {
    /// The text does not match the DSL grammar or breaks a shape invariant.
    #[error("parse error: {0}")]
    Parse(String),
    /// No table entry and no built-in rule matches the identifier.
    #[error("unresolved identifier '{0}'")]
    Resolution(String),
    /// The tree is well formed but has no lowering for this shape.
    #[error("lowering error: {0}")]
    Lowering(String),
}

impl SemanticError {
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        SemanticError::Parse(message.into())
    }

    pub(crate) fn lowering(message: impl Into<String>) -> Self {
        SemanticError::Lowering(message.into())
    }
}

/// A [`SemanticError`] tagged with the opcode and the DSL text that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("opcode '{opcode}': {source} (in `{text}`)")]
pub struct GenerationError {
    pub opcode: String,
    pub text: String,
    #[source]
    pub source: SemanticError,
}

impl GenerationError {
    pub fn new(opcode: impl Into<String>, text: impl Into<String>, source: SemanticError) -> Self {
        Self {
            opcode: opcode.into(),
            text: text.into(),
            source,
        }
    }
}
