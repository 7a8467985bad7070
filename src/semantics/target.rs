//! Target-side IR mirroring the `Expr::Make*` construction API.
//!
//! Lowering produces these nodes; [`super::render`] turns them into C++ text.
//! The free functions below are the only way the rest of the crate builds
//! constructor nodes, which keeps the vocabulary in one place.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationTag {
    Add,
    Sub,
    Or,
    And,
    Xor,
    LeftShift,
    RightShift,
    Multiply,
    Exchange,
    SignExtend,
}

impl OperationTag {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationTag::Add => "Add",
            OperationTag::Sub => "Sub",
            OperationTag::Or => "Or",
            OperationTag::And => "And",
            OperationTag::Xor => "Xor",
            OperationTag::LeftShift => "LeftShift",
            OperationTag::RightShift => "RightShift",
            OperationTag::Multiply => "Multiply",
            OperationTag::Exchange => "Exchange",
            OperationTag::SignExtend => "SignExtend",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionTag {
    Equal,
    NotEqual,
}

impl ConditionTag {
    pub fn as_str(self) -> &'static str {
        match self {
            ConditionTag::Equal => "Equal",
            ConditionTag::NotEqual => "NotEqual",
        }
    }
}

/// CPU register roles addressable without an architecture-specific name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterRole {
    StackPointer,
    StackFrame,
    ProgramPointer,
    Accumulator,
    Counter,
    Flag,
}

impl RegisterRole {
    pub fn as_str(self) -> &'static str {
        match self {
            RegisterRole::StackPointer => "StackPointerRegister",
            RegisterRole::StackFrame => "StackFrameRegister",
            RegisterRole::ProgramPointer => "ProgramPointerRegister",
            RegisterRole::Accumulator => "AccumulatorRegister",
            RegisterRole::Counter => "CounterRegister",
            RegisterRole::Flag => "FlagRegister",
        }
    }
}

/// Comparison consumed by a conditional constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub tag: ConditionTag,
    pub lhs: Box<TargetExpr>,
    pub rhs: Box<TargetExpr>,
}

pub type TemplateArgs = Vec<TargetExpr>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetExpr {
    /// Identifier-table text, emitted verbatim.
    Accessor(String),
    Operand(u32),
    Register(RegisterRole),
    /// The instruction being described.
    Instruction,
    InstructionLength,
    /// Read of the distinguished result expression.
    ResultSlot,
    Number(u64),
    Width(u32),
    OneBit,
    Str(String),
    Identifier(Box<TargetExpr>),
    Constant {
        width: Box<TargetExpr>,
        value: Box<TargetExpr>,
    },
    Operation {
        tag: OperationTag,
        lhs: Box<TargetExpr>,
        rhs: Box<TargetExpr>,
    },
    Assignment {
        target: Box<TargetExpr>,
        value: Box<TargetExpr>,
    },
    Conditional {
        test: Condition,
        then: Box<TargetExpr>,
        orelse: Option<Box<TargetExpr>>,
    },
    Memory {
        width: Box<TargetExpr>,
        address: Box<TargetExpr>,
    },
    Address(Box<TargetExpr>),
    RegisterBits(Box<TargetExpr>),
    OperandBits(Box<TargetExpr>),
    /// Bit width divided down to bytes.
    ByteCount(Box<TargetExpr>),
    Template {
        template: String,
        args: TemplateArgs,
    },
    /// Directive lowering another semantic list into the current one.
    Nested(Box<TargetExpr>),
}

impl TargetExpr {
    pub fn is_instruction(&self) -> bool {
        matches!(self, TargetExpr::Instruction)
    }

    pub fn is_operand(&self) -> bool {
        matches!(self, TargetExpr::Operand(_))
    }

    /// True when the node or any descendant is a nested-list directive.
    pub fn contains_nested(&self) -> bool {
        self.any(&|node| matches!(node, TargetExpr::Nested(_)))
    }

    /// True when the node or any descendant reads the result slot or hands it to a directive.
    pub fn uses_result_slot(&self) -> bool {
        self.any(&|node| matches!(node, TargetExpr::ResultSlot | TargetExpr::Nested(_)))
    }

    fn any(&self, pred: &dyn Fn(&TargetExpr) -> bool) -> bool {
        if pred(self) {
            return true;
        }
        match self {
            TargetExpr::Accessor(_)
            | TargetExpr::Operand(_)
            | TargetExpr::Register(_)
            | TargetExpr::Instruction
            | TargetExpr::InstructionLength
            | TargetExpr::ResultSlot
            | TargetExpr::Number(_)
            | TargetExpr::Width(_)
            | TargetExpr::OneBit
            | TargetExpr::Str(_) => false,
            TargetExpr::Identifier(inner)
            | TargetExpr::Address(inner)
            | TargetExpr::RegisterBits(inner)
            | TargetExpr::OperandBits(inner)
            | TargetExpr::ByteCount(inner)
            | TargetExpr::Nested(inner) => inner.any(pred),
            TargetExpr::Constant { width, value } => width.any(pred) || value.any(pred),
            TargetExpr::Operation { lhs, rhs, .. } => lhs.any(pred) || rhs.any(pred),
            TargetExpr::Assignment { target, value } => target.any(pred) || value.any(pred),
            TargetExpr::Conditional { test, then, orelse } => {
                test.lhs.any(pred)
                    || test.rhs.any(pred)
                    || then.any(pred)
                    || orelse.as_ref().is_some_and(|node| node.any(pred))
            }
            TargetExpr::Memory { width, address } => width.any(pred) || address.any(pred),
            TargetExpr::Template { args, .. } => args.iter().any(|arg| arg.any(pred)),
        }
    }
}

pub fn identifier(value: TargetExpr) -> TargetExpr {
    TargetExpr::Identifier(Box::new(value))
}

pub fn constant(width: TargetExpr, value: TargetExpr) -> TargetExpr {
    TargetExpr::Constant {
        width: Box::new(width),
        value: Box::new(value),
    }
}

pub fn operation(tag: OperationTag, lhs: TargetExpr, rhs: TargetExpr) -> TargetExpr {
    TargetExpr::Operation {
        tag,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

pub fn assignment(target: TargetExpr, value: TargetExpr) -> TargetExpr {
    TargetExpr::Assignment {
        target: Box::new(target),
        value: Box::new(value),
    }
}

pub fn condition(tag: ConditionTag, lhs: TargetExpr, rhs: TargetExpr) -> Condition {
    Condition {
        tag,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

pub fn conditional(test: Condition, then: TargetExpr, orelse: Option<TargetExpr>) -> TargetExpr {
    TargetExpr::Conditional {
        test,
        then: Box::new(then),
        orelse: orelse.map(Box::new),
    }
}

/// Memory dereference through a register, sized by the register width.
pub fn memory(register: TargetExpr) -> TargetExpr {
    TargetExpr::Memory {
        width: Box::new(register_bits(register.clone())),
        address: Box::new(identifier(register)),
    }
}

pub fn address(value: TargetExpr) -> TargetExpr {
    TargetExpr::Address(Box::new(value))
}

pub fn register_bits(register: TargetExpr) -> TargetExpr {
    TargetExpr::RegisterBits(Box::new(register))
}

pub fn operand_bits(operand: TargetExpr) -> TargetExpr {
    TargetExpr::OperandBits(Box::new(operand))
}

pub fn byte_count(bits: TargetExpr) -> TargetExpr {
    TargetExpr::ByteCount(Box::new(bits))
}

pub fn nested(source: TargetExpr) -> TargetExpr {
    TargetExpr::Nested(Box::new(source))
}

/// Forces a one-bit flag to `0` or `1`.
pub fn force_flag(flag: TargetExpr, set: bool) -> TargetExpr {
    assignment(
        identifier(flag),
        constant(TargetExpr::OneBit, TargetExpr::Number(u64::from(set))),
    )
}
