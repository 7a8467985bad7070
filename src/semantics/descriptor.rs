//! Opcode descriptor as it appears in an architecture document.

use serde::{Deserialize, Serialize};

pub const ANONYMOUS: &str = "<anonymous>";

/// One entry of a `semantic` list: a single line or a group of lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SemanticEntry {
    Line(String),
    Group(Vec<String>),
}

impl From<&str> for SemanticEntry {
    fn from(line: &str) -> Self {
        SemanticEntry::Line(line.to_string())
    }
}

impl From<String> for SemanticEntry {
    fn from(line: String) -> Self {
        SemanticEntry::Line(line)
    }
}

impl<S: Into<String>> From<Vec<S>> for SemanticEntry {
    fn from(lines: Vec<S>) -> Self {
        SemanticEntry::Group(lines.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpcodeDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mnemonic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_flags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_flags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clear_flags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_flags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic: Option<Vec<SemanticEntry>>,
}

impl OpcodeDescriptor {
    pub fn new(mnemonic: impl Into<String>) -> Self {
        Self {
            mnemonic: Some(mnemonic.into()),
            ..Self::default()
        }
    }

    /// Name used in error reports.
    pub fn identity(&self) -> &str {
        self.mnemonic.as_deref().unwrap_or(ANONYMOUS)
    }

    /// Semantic lines with groups flattened, in document order.
    pub fn semantic_lines(&self) -> impl Iterator<Item = &str> + '_ {
        self.semantic
            .iter()
            .flatten()
            .flat_map(|entry| match entry {
                SemanticEntry::Line(line) => std::slice::from_ref(line),
                SemanticEntry::Group(lines) => lines.as_slice(),
            })
            .map(String::as_str)
    }

    pub fn with_semantic<E: Into<SemanticEntry>>(mut self, entries: impl IntoIterator<Item = E>) -> Self {
        self.semantic = Some(entries.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_test_flags<S: Into<String>>(mut self, flags: impl IntoIterator<Item = S>) -> Self {
        self.test_flags = Some(collect_names(flags));
        self
    }

    pub fn with_update_flags<S: Into<String>>(mut self, flags: impl IntoIterator<Item = S>) -> Self {
        self.update_flags = Some(collect_names(flags));
        self
    }

    pub fn with_clear_flags<S: Into<String>>(mut self, flags: impl IntoIterator<Item = S>) -> Self {
        self.clear_flags = Some(collect_names(flags));
        self
    }

    pub fn with_set_flags<S: Into<String>>(mut self, flags: impl IntoIterator<Item = S>) -> Self {
        self.set_flags = Some(collect_names(flags));
        self
    }
}

fn collect_names<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Vec<String> {
    names.into_iter().map(Into::into).collect()
}
