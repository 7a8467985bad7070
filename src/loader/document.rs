//! JSON architecture document: name, identifier table and opcode list.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::semantics::{IdentifierTable, OpcodeDescriptor};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read architecture document: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed architecture document: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchitectureInformation {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchitectureDocument {
    pub architecture_information: ArchitectureInformation,
    #[serde(default)]
    pub identifiers: BTreeMap<String, String>,
    #[serde(default)]
    pub opcodes: Vec<OpcodeDescriptor>,
}

impl ArchitectureDocument {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let src = fs::read_to_string(path.as_ref())?;
        let doc: Self = src.parse()?;
        log::debug!(
            "loaded '{}' from {}: {} opcode(s), {} identifier(s)",
            doc.architecture_information.name,
            path.as_ref().display(),
            doc.opcodes.len(),
            doc.identifiers.len()
        );
        Ok(doc)
    }

    /// Architecture name with the first letter upper-cased and the rest lower-cased.
    pub fn name(&self) -> String {
        let mut chars = self.architecture_information.name.chars();
        match chars.next() {
            Some(first) => first
                .to_uppercase()
                .chain(chars.flat_map(char::to_lowercase))
                .collect(),
            None => String::new(),
        }
    }

    pub fn identifier_table(&self) -> IdentifierTable {
        self.identifiers
            .iter()
            .map(|(name, accessor)| (name.as_str(), accessor.as_str()))
            .collect()
    }

    pub fn opcode(&self, mnemonic: &str) -> Option<&OpcodeDescriptor> {
        self.opcodes
            .iter()
            .find(|desc| desc.mnemonic.as_deref() == Some(mnemonic))
    }
}

impl FromStr for ArchitectureDocument {
    type Err = LoadError;

    fn from_str(src: &str) -> Result<Self, Self::Err> {
        Ok(serde_json::from_str(src)?)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const DOC: &str = r#"{
        "architecture_information": { "name": "x86" },
        "identifiers": { "zf": "X86_FlZf", "cf": "X86_FlCf" },
        "opcodes": [
            { "mnemonic": "clc", "clear_flags": ["cf"] },
            { "mnemonic": "push", "semantic": [["stack.id -= stack.size", "stack.mem = op0.val"]] }
        ]
    }"#;

    #[test]
    fn parses_document_from_text() {
        let doc: ArchitectureDocument = DOC.parse().expect("parse");
        assert_eq!(doc.name(), "X86");
        assert_eq!(doc.opcodes.len(), 2);
        assert_eq!(doc.identifier_table().get("zf"), Some("X86_FlZf"));
        assert!(doc.opcode("push").is_some());
        assert!(doc.opcode("pop").is_none());
    }

    #[test]
    fn name_is_capitalized_like_a_title() {
        let mut doc = ArchitectureDocument::default();
        doc.architecture_information.name = "aRM".into();
        assert_eq!(doc.name(), "Arm");
        doc.architecture_information.name.clear();
        assert_eq!(doc.name(), "");
    }

    #[test]
    fn loads_document_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(DOC.as_bytes()).expect("write");
        let doc = ArchitectureDocument::load(file.path()).expect("load");
        assert_eq!(doc.architecture_information.name, "x86");
        assert_eq!(doc.identifier_table().len(), 2);
    }

    #[test]
    fn reports_missing_file_and_bad_json() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = ArchitectureDocument::load(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));

        let err = "{ \"opcodes\": 3 }".parse::<ArchitectureDocument>().unwrap_err();
        assert!(matches!(err, LoadError::Json(_)));
    }
}
