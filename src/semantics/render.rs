//! C++ serializer for [`TargetExpr`] trees.
//!
//! Operations, assignments and conditionals are laid out one argument per
//! line, indented under the constructor; every other node renders inline.

use std::fmt;

use super::target::{Condition, TargetExpr};

pub const INDENT: &str = "  ";

const MAKE_OPERATION: &str = "Expr::MakeOperation";
const MAKE_ASSIGNMENT: &str = "Expr::MakeAssignment";
const MAKE_CONDITIONAL: &str = "Expr::MakeConditional";
const MAKE_CONSTANT: &str = "Expr::MakeConstant";
const MAKE_IDENTIFIER: &str = "Expr::MakeIdentifier";
const MAKE_MEMORY: &str = "Expr::MakeMemory";
const NONE: &str = "nullptr";

/// Renders a target expression as C++ source text.
pub fn render(expr: &TargetExpr) -> String {
    match expr {
        TargetExpr::Accessor(text) => text.clone(),
        TargetExpr::Operand(idx) => format!("rInsn.GetOperand({idx})"),
        TargetExpr::Register(role) => format!(
            "m_CpuInfo.GetRegisterByType(CpuInformation::{}, rInsn.GetMode())",
            role.as_str()
        ),
        TargetExpr::Instruction => "rInsn".to_string(),
        TargetExpr::InstructionLength => "rInsn.GetLength()".to_string(),
        TargetExpr::ResultSlot => "spResExpr->Clone()".to_string(),
        TargetExpr::Number(value) => format!("{value:#x}"),
        TargetExpr::Width(bits) => bits.to_string(),
        TargetExpr::OneBit => "ConstantExpression::Const1Bit".to_string(),
        TargetExpr::Str(value) => quote(value),
        TargetExpr::Identifier(value) => {
            format!("{MAKE_IDENTIFIER}({}, &m_CpuInfo)", render(value))
        }
        TargetExpr::Constant { width, value } => {
            format!("{MAKE_CONSTANT}({}, {})", render(width), render(value))
        }
        TargetExpr::Operation { tag, lhs, rhs } => multi_line(
            MAKE_OPERATION,
            &[
                format!("OperationExpression::{}", tag.as_str()),
                render(lhs),
                render(rhs),
            ],
        ),
        TargetExpr::Assignment { target, value } => {
            multi_line(MAKE_ASSIGNMENT, &[render(target), render(value)])
        }
        TargetExpr::Conditional { test, then, orelse } => {
            let mut args = render_condition(test);
            args.push(render(then));
            args.push(orelse.as_deref().map_or_else(|| NONE.to_string(), render));
            multi_line(MAKE_CONDITIONAL, &args)
        }
        TargetExpr::Memory { width, address } => format!(
            "{MAKE_MEMORY}({}, {NONE}, {})",
            render(width),
            render(address)
        ),
        TargetExpr::Address(value) => format!("{}->ToAddress()", render(value)),
        TargetExpr::RegisterBits(register) => {
            format!("m_CpuInfo.GetSizeOfRegisterInBit({})", render(register))
        }
        TargetExpr::OperandBits(operand) => format!("{}->GetSizeInBit()", render(operand)),
        TargetExpr::ByteCount(bits) => format!("({} / 8)", render(bits)),
        TargetExpr::Template { template, args } => {
            let rendered: Vec<String> = args.iter().map(render).collect();
            fill_template(template, &rendered)
        }
        TargetExpr::Nested(source) => format!(
            "HandleExpression(AllExpr, {}, rInsn, spResExpr)",
            render(source)
        ),
    }
}

impl fmt::Display for TargetExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self))
    }
}

fn render_condition(test: &Condition) -> Vec<String> {
    vec![
        format!("ConditionExpression::{}", test.tag.as_str()),
        render(&test.lhs),
        render(&test.rhs),
    ]
}

fn multi_line(ctor: &str, args: &[String]) -> String {
    let body: Vec<String> = args.iter().map(|arg| indent(arg)).collect();
    format!("{ctor}(\n{})", body.join(",\n"))
}

/// Prefixes every line of `text` with one indentation step.
pub fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("{INDENT}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Writes `value` as a C++ string literal holding the same characters the
/// lexer decoded from the source literal.
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// Counts the `%s` placeholders of an accessor template (`%%` is a literal percent sign).
pub fn template_arity(template: &str) -> usize {
    let mut count = 0;
    let mut chars = template.chars();
    while let Some(ch) = chars.next() {
        if ch == '%' {
            match chars.next() {
                Some('s') => count += 1,
                Some(_) | None => {}
            }
        }
    }
    count
}

fn fill_template(template: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut args = args.iter();
    let mut chars = template.chars();
    while let Some(ch) = chars.next() {
        if ch != '%' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('s') => {
                if let Some(arg) = args.next() {
                    out.push_str(arg);
                }
            }
            Some('%') => out.push('%'),
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    out
}
