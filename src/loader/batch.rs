//! Compiles every opcode of a document, isolating per-opcode failures.

use crate::semantics::{GenerationError, SemanticBlock, SemanticCompiler};

use super::document::ArchitectureDocument;

#[derive(Debug, Default)]
pub struct BatchOutput {
    /// `(mnemonic, block)` in document order.
    pub blocks: Vec<(String, SemanticBlock)>,
    pub failures: Vec<GenerationError>,
}

impl BatchOutput {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn block(&self, mnemonic: &str) -> Option<&SemanticBlock> {
        self.blocks
            .iter()
            .find(|(name, _)| name == mnemonic)
            .map(|(_, block)| block)
    }
}

pub fn generate_all(doc: &ArchitectureDocument) -> BatchOutput {
    let table = doc.identifier_table();
    let compiler = SemanticCompiler::new(&table);
    let mut output = BatchOutput::default();

    for desc in &doc.opcodes {
        match compiler.compile(desc) {
            Ok(block) => output.blocks.push((desc.identity().to_string(), block)),
            Err(err) => {
                log::warn!("skipping opcode: {err}");
                output.failures.push(err);
            }
        }
    }

    log::debug!(
        "{}: {} opcode(s) compiled, {} failed",
        doc.name(),
        output.blocks.len(),
        output.failures.len()
    );
    output
}
