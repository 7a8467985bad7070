use std::path::PathBuf;

use hex_literal::hex;

use semgen::loader::{ArchitectureDocument, BatchOutput, generate_all};
use semgen::semantics::FlagEffects;
use semgen::semantics::target::TargetExpr;

fn load_x86() -> ArchitectureDocument {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("defs/x86.json");
    ArchitectureDocument::load(path).expect("load x86 document")
}

fn render(output: &BatchOutput, mnemonic: &str) -> String {
    output
        .block(mnemonic)
        .unwrap_or_else(|| panic!("no block for {mnemonic}"))
        .render()
}

#[test]
fn compiles_every_x86_opcode() {
    let doc = load_x86();
    assert_eq!(doc.name(), "X86");

    let output = generate_all(&doc);
    for failure in &output.failures {
        eprintln!("{failure}");
    }
    assert!(output.is_clean());
    assert_eq!(output.blocks.len(), doc.opcodes.len());

    if std::env::var_os("SHOW_SEMANTICS").is_some() {
        for (mnemonic, block) in &output.blocks {
            eprintln!("// {mnemonic}\n{block}");
        }
    }
}

#[test]
fn set_flag_opcode_golden() {
    let output = generate_all(&load_x86());
    let expected = concat!(
        "{\n",
        "  Expression::List AllExpr;\n",
        "  rInsn.SetFixedFlags(X86_FlDf);\n",
        "  AllExpr.push_back(Expr::MakeAssignment(\n",
        "    Expr::MakeIdentifier(X86_FlDf, &m_CpuInfo),\n",
        "    Expr::MakeConstant(ConstantExpression::Const1Bit, 0x1)));\n",
        "  rInsn.SetSemantic(AllExpr);\n",
        "}\n",
    );
    assert_eq!(render(&output, "std"), expected);
    assert_eq!(
        output.block("cld").map(|block| block.flag_effects()),
        Some(FlagEffects::CLEARED)
    );
}

#[test]
fn nop_renders_nothing() {
    let output = generate_all(&load_x86());
    let block = output.block("nop").expect("nop");
    assert_eq!(block.render(), "");
    assert_eq!(
        block.fingerprint(),
        hex!("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
    );
}

#[test]
fn call_hands_nested_list_to_runtime() {
    let output = generate_all(&load_x86());
    let text = render(&output, "call");
    assert!(text.contains("  Expression::SPType spResExpr;\n"));
    assert!(text.contains(
        "  HandleExpression(AllExpr, \"stack.id -= stack.size; stack.mem = program.val + insn.size\", rInsn, spResExpr);\n"
    ));
    assert!(text.contains("  auto pExpr0 = Expr::MakeAssignment(\n"));
    assert!(!text.contains("pExpr1"));
}

#[test]
fn loop_block_comment_is_single_line() {
    let output = generate_all(&load_x86());
    let text = render(&output, "loop");
    assert!(text.contains("  /* Semantic: cnt.id -= 0x1 */\n"));
    assert!(text.contains("  /* Semantic: if cnt.val != 0x0: program.id = op0.val */\n"));
    assert!(text.contains("  auto pExpr1 = Expr::MakeConditional(\n    ConditionExpression::NotEqual,\n"));
}

#[test]
fn lea_binds_address_as_result() {
    let output = generate_all(&load_x86());
    let block = output.block("lea").expect("lea");
    assert_eq!(
        block.result(),
        Some(&TargetExpr::Address(Box::new(TargetExpr::Operand(1))))
    );
    assert!(block.render().contains("  spResExpr = rInsn.GetOperand(1)->ToAddress();\n"));
    assert_eq!(block.effects().count(), 0);
}

#[test]
fn forced_flags_come_first() {
    let output = generate_all(&load_x86());
    let text = render(&output, "and");
    let cleared = text.find("rInsn.SetClearedFlags(X86_FlCf | X86_FlOf);").expect("cleared");
    let forced_cf = text.find("Expr::MakeIdentifier(X86_FlCf, &m_CpuInfo)").expect("cf");
    let forced_of = text.find("Expr::MakeIdentifier(X86_FlOf, &m_CpuInfo)").expect("of");
    let effect = text.find("auto pExpr0").expect("effect");
    assert!(cleared < forced_cf && forced_cf < forced_of && forced_of < effect);
}

#[test]
fn table_register_used_as_tested_flag() {
    let output = generate_all(&load_x86());
    let text = render(&output, "sahf");
    assert!(text.contains("  rInsn.SetTestedFlags(X86_Reg_Ah);\n"));
    assert!(text.contains("  rInsn.SetUpdatedFlags(X86_FlSf | X86_FlZf | X86_FlAf | X86_FlPf | X86_FlCf);\n"));
}

#[test]
fn generation_is_reproducible() {
    let doc = load_x86();
    let first = generate_all(&doc);
    let second = generate_all(&doc);
    let digests = |output: &BatchOutput| -> Vec<[u8; 32]> {
        output.blocks.iter().map(|(_, block)| block.fingerprint()).collect()
    };
    assert_eq!(digests(&first), digests(&second));
}

#[test]
fn broken_opcode_is_isolated() {
    let mut doc = load_x86();
    doc.opcodes.insert(
        1,
        serde_json::from_str(r#"{ "mnemonic": "bogus", "semantic": ["op0.id = op0.val / 0x2"] }"#)
            .expect("descriptor"),
    );
    let output = generate_all(&doc);
    assert_eq!(output.failures.len(), 1);
    assert_eq!(output.failures[0].opcode, "bogus");
    assert_eq!(output.failures[0].text, "op0.id = op0.val / 0x2");
    assert_eq!(output.blocks.len(), doc.opcodes.len() - 1);
}
