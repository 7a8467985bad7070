//! Threads flag effects, semantic effects and the result binding of one opcode
//! into a single C++ block.

use std::fmt;

use log::{debug, warn};
use sha2::{Digest, Sha256};

use super::descriptor::OpcodeDescriptor;
use super::error::GenerationError;
use super::flags::{FlagEffects, FlagPreamble, FlagStatement, emit_flags};
use super::lower::Lowering;
use super::parser::parse;
use super::render::{indent, render};
use super::resolver::{IdentifierTable, Resolver};
use super::target::TargetExpr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockStatement {
    /// `auto pExprN = ...; AllExpr.push_back(pExprN);`
    Effect { index: usize, expr: TargetExpr },
    /// Statement handing a nested semantic list to the runtime; not numbered.
    Nested(TargetExpr),
    /// `spResExpr = ...;`
    Result(TargetExpr),
}

impl BlockStatement {
    fn render(&self) -> String {
        match self {
            BlockStatement::Effect { index, expr } => format!(
                "auto pExpr{index} = {};\nAllExpr.push_back(pExpr{index});",
                render(expr)
            ),
            BlockStatement::Nested(expr) => format!("{};", render(expr)),
            BlockStatement::Result(expr) => format!("spResExpr = {};", render(expr)),
        }
    }
}

/// Statements produced by one semantic line, preceded by its source comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticLine {
    pub source: String,
    pub statements: Vec<BlockStatement>,
}

/// Compiled semantics of one opcode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SemanticBlock {
    flags: FlagPreamble,
    lines: Vec<SemanticLine>,
}

impl SemanticBlock {
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty() && self.lines.is_empty()
    }

    pub fn flag_effects(&self) -> FlagEffects {
        self.flags.effects
    }

    pub fn flag_statements(&self) -> &[FlagStatement] {
        &self.flags.statements
    }

    pub fn lines(&self) -> &[SemanticLine] {
        &self.lines
    }

    /// Every expression pushed onto `AllExpr`: forced flags, then numbered effects.
    pub fn effects(&self) -> impl Iterator<Item = &TargetExpr> + '_ {
        let numbered = self.statements().filter_map(|stmt| match stmt {
            BlockStatement::Effect { expr, .. } => Some(expr),
            BlockStatement::Nested(_) | BlockStatement::Result(_) => None,
        });
        self.flags.forced().chain(numbered)
    }

    pub fn result(&self) -> Option<&TargetExpr> {
        self.statements().find_map(|stmt| match stmt {
            BlockStatement::Result(expr) => Some(expr),
            BlockStatement::Effect { .. } | BlockStatement::Nested(_) => None,
        })
    }

    fn statements(&self) -> impl Iterator<Item = &BlockStatement> + '_ {
        self.lines.iter().flat_map(|line| line.statements.iter())
    }

    fn uses_result_slot(&self) -> bool {
        self.statements().any(|stmt| match stmt {
            BlockStatement::Result(_) => true,
            BlockStatement::Effect { expr, .. } | BlockStatement::Nested(expr) => {
                expr.uses_result_slot()
            }
        })
    }

    /// Renders the block as C++ source; an empty block renders as `""`.
    pub fn render(&self) -> String {
        if self.is_empty() {
            return String::new();
        }

        let mut body = vec!["Expression::List AllExpr;".to_string()];
        if self.uses_result_slot() {
            body.push("Expression::SPType spResExpr;".to_string());
        }
        body.extend(self.flags.statements.iter().map(FlagStatement::render));
        for line in &self.lines {
            body.push(format!("/* Semantic: {} */", sanitize_comment(&line.source)));
            body.extend(line.statements.iter().map(BlockStatement::render));
        }
        body.push("rInsn.SetSemantic(AllExpr);".to_string());

        let mut out = String::from("{\n");
        for stmt in &body {
            out.push_str(&indent(stmt));
            out.push('\n');
        }
        out.push_str("}\n");
        out
    }

    /// SHA-256 of the rendered text.
    pub fn fingerprint(&self) -> [u8; 32] {
        let digest = Sha256::digest(self.render().as_bytes());
        let mut array = [0u8; 32];
        array.copy_from_slice(&digest);
        array
    }
}

impl fmt::Display for SemanticBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn sanitize_comment(source: &str) -> String {
    source
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(" ")
        .replace("*/", "* /")
}

/// Compiles opcode descriptors against one identifier table.
#[derive(Debug, Clone, Copy)]
pub struct SemanticCompiler<'table> {
    resolver: Resolver<'table>,
}

impl<'table> SemanticCompiler<'table> {
    pub fn new(table: &'table IdentifierTable) -> Self {
        Self {
            resolver: Resolver::new(table),
        }
    }

    pub fn compile(&self, desc: &OpcodeDescriptor) -> Result<SemanticBlock, GenerationError> {
        let opcode = desc.identity();
        let flags = emit_flags(desc, &self.resolver)?;
        let lowering = Lowering::new(self.resolver);

        let mut lines: Vec<SemanticLine> = Vec::new();
        let mut next_index = 0;

        for source in desc.semantic_lines() {
            let fail = |err| GenerationError::new(opcode, source, err);
            let module = parse(source).map_err(fail)?;

            let mut statements = Vec::with_capacity(module.statements.len());
            for stmt in &module.statements {
                if let Some(value) = stmt.result_binding() {
                    let bound = lowering.lower_expr(value).map_err(fail)?;
                    let earlier = drop_result(&mut lines);
                    let before = statements.len();
                    statements.retain(|stmt| !matches!(stmt, BlockStatement::Result(_)));
                    if earlier || statements.len() != before {
                        warn!("opcode '{opcode}': result rebound by `{source}`, earlier binding dropped");
                    }
                    statements.push(BlockStatement::Result(bound));
                    continue;
                }

                let expr = lowering.lower_statement(stmt).map_err(fail)?;
                if expr.contains_nested() {
                    statements.push(BlockStatement::Nested(expr));
                } else {
                    statements.push(BlockStatement::Effect {
                        index: next_index,
                        expr,
                    });
                    next_index += 1;
                }
            }

            debug!(
                "opcode '{opcode}': `{source}` lowered to {} statement(s)",
                statements.len()
            );
            if !statements.is_empty() {
                lines.push(SemanticLine {
                    source: source.to_string(),
                    statements,
                });
            }
        }

        Ok(SemanticBlock { flags, lines })
    }
}

/// Removes an earlier result binding, dropping its line if nothing else remains.
fn drop_result(lines: &mut Vec<SemanticLine>) -> bool {
    let mut dropped = false;
    for line in lines.iter_mut() {
        let before = line.statements.len();
        line.statements
            .retain(|stmt| !matches!(stmt, BlockStatement::Result(_)));
        dropped |= line.statements.len() != before;
    }
    lines.retain(|line| !line.statements.is_empty());
    dropped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantics::error::SemanticError;
    use crate::semantics::target::{OperationTag, force_flag, operation};

    fn table() -> IdentifierTable {
        [("zf", "X86_FlZf"), ("cf", "X86_FlCf"), ("of", "X86_FlOf")]
            .into_iter()
            .collect()
    }

    fn compile(desc: &OpcodeDescriptor) -> Result<SemanticBlock, GenerationError> {
        let table = table();
        SemanticCompiler::new(&table).compile(desc)
    }

    #[test]
    fn empty_descriptor_renders_nothing() {
        let block = compile(&OpcodeDescriptor::new("nop")).unwrap();
        assert!(block.is_empty());
        assert_eq!(block.render(), "");
        assert!(block.result().is_none());
    }

    #[test]
    fn effects_are_numbered_in_source_order() {
        let desc = OpcodeDescriptor::new("xadd")
            .with_semantic(["op0.id = op0.val + op1.val", "op1.id = op0.val"]);
        let block = compile(&desc).unwrap();
        let rendered = block.render();
        let first = rendered.find("auto pExpr0 =").unwrap();
        let second = rendered.find("auto pExpr1 =").unwrap();
        assert!(first < second);
        assert!(rendered.contains("  AllExpr.push_back(pExpr1);\n"));
        assert!(!rendered.contains("pExpr2"));
        assert!(!rendered.contains("spResExpr"));
        assert_eq!(block.effects().count(), 2);
    }

    #[test]
    fn forced_flags_precede_semantic_effects() {
        let desc = OpcodeDescriptor::new("and")
            .with_clear_flags(["cf", "of"])
            .with_semantic(["op0.id = op0.val & op1.val"]);
        let block = compile(&desc).unwrap();
        let effects: Vec<_> = block.effects().cloned().collect();
        assert_eq!(effects.len(), 3);
        assert_eq!(
            effects[0],
            force_flag(TargetExpr::Accessor("X86_FlCf".into()), false)
        );
        assert_eq!(
            effects[1],
            force_flag(TargetExpr::Accessor("X86_FlOf".into()), false)
        );
        assert!(matches!(
            &effects[2],
            TargetExpr::Assignment { value, .. }
                if matches!(**value, TargetExpr::Operation { tag: OperationTag::And, .. })
        ));
        assert_eq!(block.flag_effects(), FlagEffects::CLEARED);
    }

    #[test]
    fn result_binding_is_not_an_effect() {
        let desc = OpcodeDescriptor::new("lea").with_semantic(["res = op0.val"]);
        let block = compile(&desc).unwrap();
        assert_eq!(block.effects().count(), 0);
        assert_eq!(block.result(), Some(&TargetExpr::Operand(0)));
        let rendered = block.render();
        assert!(rendered.contains("  Expression::SPType spResExpr;\n"));
        assert!(rendered.contains("  spResExpr = rInsn.GetOperand(0);\n"));
        assert!(!rendered.contains("pExpr"));
    }

    #[test]
    fn later_result_replaces_earlier() {
        let desc = OpcodeDescriptor::new("twice")
            .with_semantic(["res = op0.val", "op1.id = 0x1", "res = op1.val"]);
        let block = compile(&desc).unwrap();
        assert_eq!(block.result(), Some(&TargetExpr::Operand(1)));
        let rendered = block.render();
        assert_eq!(rendered.matches("spResExpr = ").count(), 1);
        assert!(!rendered.contains("/* Semantic: res = op0.val */"));
        assert!(rendered.contains("/* Semantic: res = op1.val */"));
    }

    #[test]
    fn reading_result_declares_slot() {
        let desc = OpcodeDescriptor::new("use").with_semantic(["op0.id = res + 0x1"]);
        let rendered = compile(&desc).unwrap().render();
        assert!(rendered.contains("Expression::SPType spResExpr;"));
        assert!(rendered.contains("spResExpr->Clone()"));
    }

    #[test]
    fn nested_directives_are_not_numbered() {
        let desc = OpcodeDescriptor::new("call").with_semantic([
            "expr('push(program)')",
            "program.id = op0.val",
        ]);
        let block = compile(&desc).unwrap();
        let rendered = block.render();
        assert!(rendered.contains(
            "  HandleExpression(AllExpr, \"push(program)\", rInsn, spResExpr);\n"
        ));
        assert!(rendered.contains("auto pExpr0 = "));
        assert!(!rendered.contains("pExpr1"));
        assert!(rendered.contains("Expression::SPType spResExpr;"));
        assert_eq!(block.effects().count(), 1);
    }

    #[test]
    fn multi_statement_line_shares_one_comment() {
        let desc = OpcodeDescriptor::new("pair").with_semantic(["op0.id = 0x1; op1.id = 0x2"]);
        let rendered = compile(&desc).unwrap().render();
        assert_eq!(rendered.matches("/* Semantic:").count(), 1);
        assert!(rendered.contains("pExpr0") && rendered.contains("pExpr1"));
    }

    #[test]
    fn flags_alone_still_produce_a_block() {
        let desc = OpcodeDescriptor::new("cmc").with_update_flags(["cf"]);
        let block = compile(&desc).unwrap();
        assert_eq!(
            block.render(),
            "{\n  Expression::List AllExpr;\n  rInsn.SetUpdatedFlags(X86_FlCf);\n  rInsn.SetSemantic(AllExpr);\n}\n"
        );
    }

    #[test]
    fn comment_text_cannot_close_early() {
        assert_eq!(sanitize_comment("a */ b"), "a * / b");
        assert_eq!(sanitize_comment("if a == b:\n    c = d"), "if a == b: c = d");
    }

    #[test]
    fn failing_line_aborts_whole_opcode() {
        let desc = OpcodeDescriptor::new("xchg")
            .with_semantic(["op0.id = op1.val", "swap(op0, op1, op2)"]);
        let err = compile(&desc).unwrap_err();
        assert_eq!(err.opcode, "xchg");
        assert_eq!(err.text, "swap(op0, op1, op2)");
        assert!(matches!(err.source, SemanticError::Lowering(ref msg) if msg.contains("found 3")));
    }

    #[test]
    fn anonymous_descriptor_is_reported_as_such() {
        let desc = OpcodeDescriptor::default().with_semantic(["op0.id = bogus"]);
        let err = compile(&desc).unwrap_err();
        assert_eq!(err.opcode, "<anonymous>");
        assert_eq!(err.source, SemanticError::Resolution("bogus".into()));
    }

    #[test]
    fn compilation_is_deterministic() {
        let desc = OpcodeDescriptor::new("sub")
            .with_update_flags(["zf", "cf"])
            .with_semantic(["op0.id = op0.val - op1.val", "res = op0.val"]);
        let a = compile(&desc).unwrap();
        let b = compile(&desc).unwrap();
        assert_eq!(a.render(), b.render());
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.to_string(), a.render());
    }

    #[test]
    fn operation_effect_is_indented_under_block() {
        let desc = OpcodeDescriptor::new("add").with_semantic(["op0.val + op1.val"]);
        let block = compile(&desc).unwrap();
        assert_eq!(
            block.effects().next(),
            Some(&operation(
                OperationTag::Add,
                TargetExpr::Operand(0),
                TargetExpr::Operand(1)
            ))
        );
        assert!(block.render().contains(
            "  auto pExpr0 = Expr::MakeOperation(\n    OperationExpression::Add,\n    rInsn.GetOperand(0),\n    rInsn.GetOperand(1));\n"
        ));
    }
}
