//! Recursive lowering of DSL trees into [`TargetExpr`] nodes.

use super::ast::{ArithOp, CompareOp, Expr, Stmt};
use super::error::SemanticError;
use super::render::template_arity;
use super::resolver::{Builtin, Resolved, Resolver};
use super::target::{
    self, Condition, ConditionTag, OperationTag, RegisterRole, TargetExpr, TemplateArgs,
};

/// Fixed operator table for arithmetic and bitwise operators.
pub fn operation_tag(op: ArithOp) -> OperationTag {
    match op {
        ArithOp::Add => OperationTag::Add,
        ArithOp::Sub => OperationTag::Sub,
        ArithOp::Or => OperationTag::Or,
        ArithOp::And => OperationTag::And,
        ArithOp::Xor => OperationTag::Xor,
        ArithOp::LeftShift => OperationTag::LeftShift,
        ArithOp::RightShift => OperationTag::RightShift,
        ArithOp::Multiply => OperationTag::Multiply,
    }
}

/// Fixed operator table for comparisons.
pub fn condition_tag(op: CompareOp) -> ConditionTag {
    match op {
        CompareOp::Equal => ConditionTag::Equal,
        CompareOp::NotEqual => ConditionTag::NotEqual,
    }
}

pub struct Lowering<'table> {
    resolver: Resolver<'table>,
}

impl<'table> Lowering<'table> {
    pub fn new(resolver: Resolver<'table>) -> Self {
        Self { resolver }
    }

    pub fn lower_statement(&self, stmt: &Stmt) -> Result<TargetExpr, SemanticError> {
        match stmt {
            Stmt::Assign { target, value } => Ok(target::assignment(
                self.lower_expr(target)?,
                self.lower_expr(value)?,
            )),
            Stmt::AugAssign { op, target, value } => {
                // read-modify-write: the target is lowered once as the destination and once as the operand
                let destination = self.lower_expr(target)?;
                let current = self.lower_expr(target)?;
                let operand = self.lower_expr(value)?;
                Ok(target::assignment(
                    destination,
                    target::operation(operation_tag(*op), current, operand),
                ))
            }
            Stmt::If { test, body, orelse } => {
                let test = self.lower_condition(test)?;
                let then = self.lower_statement(body)?;
                let orelse = match orelse {
                    Some(stmt) => Some(self.lower_statement(stmt)?),
                    None => None,
                };
                Ok(target::conditional(test, then, orelse))
            }
            Stmt::Expr(expr) => self.lower_expr(expr),
        }
    }

    pub fn lower_expr(&self, expr: &Expr) -> Result<TargetExpr, SemanticError> {
        match expr {
            Expr::Compare { .. } => Err(SemanticError::lowering(format!(
                "comparison '{expr}' is only allowed as an if condition"
            ))),
            Expr::BinOp { op, lhs, rhs } => Ok(target::operation(
                operation_tag(*op),
                self.lower_expr(lhs)?,
                self.lower_expr(rhs)?,
            )),
            Expr::Call { callee, args } => self.lower_call(callee, args),
            Expr::Attribute { value, name } => self.lower_attribute(value, name),
            Expr::Name(name) => self.resolver.resolve_value(name),
            Expr::Number(value) => Ok(TargetExpr::Number(*value)),
            Expr::Str(value) => Ok(TargetExpr::Str(value.clone())),
        }
    }

    fn lower_condition(&self, test: &Expr) -> Result<Condition, SemanticError> {
        match test {
            Expr::Compare { op, lhs, rhs } => Ok(target::condition(
                condition_tag(*op),
                self.lower_expr(lhs)?,
                self.lower_expr(rhs)?,
            )),
            other => Err(SemanticError::lowering(format!(
                "if condition '{other}' must be a comparison"
            ))),
        }
    }

    fn lower_call(&self, callee: &Expr, args: &[Expr]) -> Result<TargetExpr, SemanticError> {
        // `value.attr(...)` is sugar for the attribute itself
        if matches!(callee, Expr::Attribute { .. }) {
            return self.lower_expr(callee);
        }

        let Expr::Name(name) = callee else {
            return Err(SemanticError::lowering(format!(
                "'{callee}' is not callable"
            )));
        };

        match self.resolver.resolve(name)? {
            Resolved::Function(builtin) => {
                let mut lowered = self.lower_args(builtin.name(), builtin.arity(), args)?;
                let mut next = || lowered.remove(0);
                Ok(match builtin {
                    Builtin::Identifier => target::identifier(next()),
                    Builtin::Integer { width: Some(bits) } => {
                        target::constant(TargetExpr::Width(bits), next())
                    }
                    Builtin::Integer { width: None } => {
                        let width = next();
                        target::constant(width, next())
                    }
                    Builtin::Exchange => {
                        let lhs = next();
                        target::operation(OperationTag::Exchange, lhs, next())
                    }
                    Builtin::SignExtend => {
                        let lhs = next();
                        target::operation(OperationTag::SignExtend, lhs, next())
                    }
                    Builtin::Nested => target::nested(next()),
                })
            }
            Resolved::Value(TargetExpr::Accessor(template)) if template_arity(&template) > 0 => {
                let args = self.lower_args(name, template_arity(&template), args)?;
                Ok(TargetExpr::Template { template, args })
            }
            Resolved::Value(_) => Err(SemanticError::lowering(format!(
                "'{name}' is not callable"
            ))),
        }
    }

    fn lower_args(
        &self,
        name: &str,
        arity: usize,
        args: &[Expr],
    ) -> Result<TemplateArgs, SemanticError> {
        if args.len() != arity {
            return Err(SemanticError::lowering(format!(
                "'{name}' expects {arity} argument(s), found {}",
                args.len()
            )));
        }
        args.iter().map(|arg| self.lower_expr(arg)).collect()
    }

    fn lower_attribute(&self, value: &Expr, name: &str) -> Result<TargetExpr, SemanticError> {
        let value = self.lower_expr(value)?;
        match name {
            "id" => Ok(target::identifier(value)),
            "val" => Ok(value),
            "addr" => Ok(target::address(value)),
            "size" => Ok(size_of(value)),
            "bit" => bits_of(value),
            "mem" => Ok(target::memory(value)),
            other => Err(SemanticError::lowering(format!(
                "unknown attribute '{other}' on '{value}'"
            ))),
        }
    }
}

/// `(width, bytes)` constant for `.size`; each branch follows a fixed target convention.
fn size_of(value: TargetExpr) -> TargetExpr {
    if value.is_instruction() {
        let program = TargetExpr::Register(RegisterRole::ProgramPointer);
        return target::constant(target::register_bits(program), TargetExpr::InstructionLength);
    }
    if value.is_operand() {
        return target::constant(
            TargetExpr::Width(32),
            target::byte_count(target::operand_bits(value)),
        );
    }
    let bits = target::register_bits(value);
    target::constant(bits.clone(), target::byte_count(bits))
}

fn bits_of(value: TargetExpr) -> Result<TargetExpr, SemanticError> {
    if value.is_instruction() {
        return Err(SemanticError::lowering(
            "attribute 'bit' is not defined for the instruction",
        ));
    }
    if value.is_operand() {
        return Ok(target::operand_bits(value));
    }
    Ok(target::register_bits(value))
}
