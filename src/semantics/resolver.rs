//! Identifier resolution for DSL leaf names.
//!
//! The caller's [`IdentifierTable`] always wins; after that come operand
//! references (`op0`, `op1`, ...), the fixed pseudo-identifiers and finally the
//! pseudo-functions.

use ahash::AHashMap;

use super::error::SemanticError;
use super::target::{RegisterRole, TargetExpr};

/// Architecture-specific map from DSL names to accessor text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierTable {
    entries: AHashMap<String, String>,
}

impl IdentifierTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, accessor: impl Into<String>) -> Option<String> {
        self.entries.insert(name.into(), accessor.into())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for IdentifierTable
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let entries = iter
            .into_iter()
            .map(|(name, accessor)| (name.into(), accessor.into()))
            .collect();
        Self { entries }
    }
}

/// Pseudo-functions callable from the DSL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// `id(x)`: wrap a value as an identifier expression.
    Identifier,
    /// `int(width, value)` or `intN(value)`.
    Integer { width: Option<u32> },
    /// `swap(a, b)`
    Exchange,
    /// `sign_extend(value, width)`
    SignExtend,
    /// `expr(source)`: lower a nested semantic list in place.
    Nested,
}

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Identifier => "id",
            Builtin::Integer { .. } => "int",
            Builtin::Exchange => "swap",
            Builtin::SignExtend => "sign_extend",
            Builtin::Nested => "expr",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Builtin::Identifier | Builtin::Nested => 1,
            Builtin::Integer { width: Some(_) } => 1,
            Builtin::Integer { width: None } => 2,
            Builtin::Exchange | Builtin::SignExtend => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Value(TargetExpr),
    Function(Builtin),
}

#[derive(Debug, Clone, Copy)]
pub struct Resolver<'table> {
    table: &'table IdentifierTable,
}

impl<'table> Resolver<'table> {
    pub fn new(table: &'table IdentifierTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &'table IdentifierTable {
        self.table
    }

    pub fn resolve(&self, name: &str) -> Result<Resolved, SemanticError> {
        if let Some(accessor) = self.table.get(name) {
            return Ok(Resolved::Value(TargetExpr::Accessor(accessor.to_string())));
        }

        if let Some(index) = numeric_suffix(name, "op") {
            return Ok(Resolved::Value(TargetExpr::Operand(index)));
        }

        if let Some(resolved) = pseudo_identifier(name) {
            return Ok(resolved);
        }

        if let Some(width) = numeric_suffix(name, "int") {
            return Ok(Resolved::Function(Builtin::Integer { width: Some(width) }));
        }

        match name {
            "swap" => Ok(Resolved::Function(Builtin::Exchange)),
            "sign_extend" => Ok(Resolved::Function(Builtin::SignExtend)),
            "expr" => Ok(Resolved::Function(Builtin::Nested)),
            _ => Err(SemanticError::Resolution(name.to_string())),
        }
    }

    /// Resolves a name that must denote a value (flags, registers, operands).
    pub fn resolve_value(&self, name: &str) -> Result<TargetExpr, SemanticError> {
        match self.resolve(name)? {
            Resolved::Value(value) => Ok(value),
            Resolved::Function(builtin) => Err(SemanticError::lowering(format!(
                "function '{}' used as a value",
                builtin.name()
            ))),
        }
    }
}

fn pseudo_identifier(name: &str) -> Option<Resolved> {
    let register = |role| Some(Resolved::Value(TargetExpr::Register(role)));
    match name {
        "id" => Some(Resolved::Function(Builtin::Identifier)),
        "int" => Some(Resolved::Function(Builtin::Integer { width: None })),
        "stack" => register(RegisterRole::StackPointer),
        "frame" => register(RegisterRole::StackFrame),
        "program" => register(RegisterRole::ProgramPointer),
        "acc" => register(RegisterRole::Accumulator),
        "cnt" => register(RegisterRole::Counter),
        "flag" => register(RegisterRole::Flag),
        "insn" => Some(Resolved::Value(TargetExpr::Instruction)),
        "res" => Some(Resolved::Value(TargetExpr::ResultSlot)),
        _ => None,
    }
}

/// Matches `<prefix><decimal digits>` and returns the number.
fn numeric_suffix(name: &str, prefix: &str) -> Option<u32> {
    let digits = name.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
