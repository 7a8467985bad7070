//! Syntax tree for one semantic line.

use std::fmt;

/// A parsed semantic line: one or more statements in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub statements: Vec<Stmt>,
}

impl Module {
    pub fn new(statements: Vec<Stmt>) -> Self {
        Self { statements }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Assign {
        target: Expr,
        value: Expr,
    },
    AugAssign {
        op: ArithOp,
        target: Expr,
        value: Expr,
    },
    If {
        test: Expr,
        body: Box<Stmt>,
        orelse: Option<Box<Stmt>>,
    },
    Expr(Expr),
}

impl Stmt {
    /// Returns the right-hand side when the statement binds the result slot (`res = <expr>`).
    pub fn result_binding(&self) -> Option<&Expr> {
        match self {
            Stmt::Assign {
                target: Expr::Name(name),
                value,
            } if name == "res" => Some(value),
            _ => None,
        }
    }
}

/// Call arguments; `Expr` is recursive through this list, so it lives on the heap.
pub type CallArgs = Vec<Expr>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Compare {
        op: CompareOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    BinOp {
        op: ArithOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: CallArgs,
    },
    Attribute {
        value: Box<Expr>,
        name: String,
    },
    Name(String),
    Number(u64),
    Str(String),
}

impl Expr {
    pub fn name(name: impl Into<String>) -> Self {
        Expr::Name(name.into())
    }

    pub fn attribute(value: Expr, name: impl Into<String>) -> Self {
        Expr::Attribute {
            value: Box::new(value),
            name: name.into(),
        }
    }

    pub fn binary(op: ArithOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::BinOp {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn compare(op: CompareOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn call(callee: Expr, args: impl IntoIterator<Item = Expr>) -> Self {
        Expr::Call {
            callee: Box::new(callee),
            args: args.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Or,
    And,
    Xor,
    LeftShift,
    RightShift,
    Multiply,
}

impl ArithOp {
    pub const ALL: [ArithOp; 8] = [
        ArithOp::Add,
        ArithOp::Sub,
        ArithOp::Or,
        ArithOp::And,
        ArithOp::Xor,
        ArithOp::LeftShift,
        ArithOp::RightShift,
        ArithOp::Multiply,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Or => "|",
            ArithOp::And => "&",
            ArithOp::Xor => "^",
            ArithOp::LeftShift => "<<",
            ArithOp::RightShift => ">>",
            ArithOp::Multiply => "*",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.symbol() == symbol)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Equal,
    NotEqual,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Equal => "==",
            CompareOp::NotEqual => "!=",
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Compare { op, lhs, rhs } => write!(f, "{lhs} {} {rhs}", op.symbol()),
            Expr::BinOp { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.symbol()),
            Expr::Call { callee, args } => {
                write!(f, "{callee}(")?;
                for (idx, arg) in args.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            Expr::Attribute { value, name } => write!(f, "{value}.{name}"),
            Expr::Name(name) => f.write_str(name),
            Expr::Number(value) => write!(f, "{value:#x}"),
            Expr::Str(value) => write!(f, "{value:?}"),
        }
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Assign { target, value } => write!(f, "{target} = {value}"),
            Stmt::AugAssign { op, target, value } => {
                write!(f, "{target} {}= {value}", op.symbol())
            }
            Stmt::If { test, body, orelse } => {
                write!(f, "if {test}: {body}")?;
                if let Some(orelse) = orelse {
                    write!(f, " else: {orelse}")?;
                }
                Ok(())
            }
            Stmt::Expr(expr) => write!(f, "{expr}"),
        }
    }
}
