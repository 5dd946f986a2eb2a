//! Lowered, suspension-free expressions
//!
//! The decomposer resolves every name to either a frame slot or a global and
//! removes every `yield` from expressions before they reach a segment, so the
//! host evaluator never sees a suspension point.

use crate::parser::ast::{BinOp, BoolOp, CmpOp, UnOp};
use std::fmt;
use std::rc::Rc;

/// Index into a frame's slot vector
pub type SlotId = usize;

/// Literal values embedded in code
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
}

/// Where a store lands
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Local { slot: SlotId, name: Rc<str> },
    Global(Rc<str>),
}

impl Target {
    pub fn name(&self) -> &str {
        match self {
            Target::Local { name, .. } | Target::Global(name) => name,
        }
    }
}

/// An expression the host can evaluate in one step
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Const(Constant),
    Local {
        slot: SlotId,
        name: Rc<str>,
    },
    Global(Rc<str>),
    List(Vec<Expr>),
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },
    BoolOp {
        op: BoolOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Compare {
        left: Box<Expr>,
        comparisons: Vec<(CmpOp, Expr)>,
    },
    IfExp {
        test: Box<Expr>,
        body: Box<Expr>,
        orelse: Box<Expr>,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
    },
    Attribute {
        object: Box<Expr>,
        attr: Rc<str>,
    },
}

impl Expr {
    pub fn none() -> Self {
        Expr::Const(Constant::None)
    }

    /// Read back whatever a [`Target`] refers to
    pub fn load(target: &Target) -> Self {
        match target {
            Target::Local { slot, name } => Expr::Local {
                slot: *slot,
                name: name.clone(),
            },
            Target::Global(name) => Expr::Global(name.clone()),
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::None => write!(f, "None"),
            Constant::Bool(true) => write!(f, "True"),
            Constant::Bool(false) => write!(f, "False"),
            Constant::Int(n) => write!(f, "{}", n),
            Constant::Float(n) => write!(f, "{:?}", n),
            Constant::Str(s) => write!(f, "'{}'", s),
        }
    }
}

/// Source-like rendering, used by the segment pane
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(c) => write!(f, "{}", c),
            Expr::Local { name, .. } | Expr::Global(name) => write!(f, "{}", name),
            Expr::List(items) => {
                write!(f, "[")?;
                write_joined(f, items)?;
                write!(f, "]")
            }
            Expr::Binary { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            Expr::Unary { op, operand } => match op {
                UnOp::Neg => write!(f, "-{}", operand),
                UnOp::Pos => write!(f, "+{}", operand),
                UnOp::Not => write!(f, "not {}", operand),
            },
            Expr::BoolOp { op, left, right } => {
                let word = match op {
                    BoolOp::And => "and",
                    BoolOp::Or => "or",
                };
                write!(f, "({} {} {})", left, word, right)
            }
            Expr::Compare { left, comparisons } => {
                write!(f, "{}", left)?;
                for (op, right) in comparisons {
                    write!(f, " {} {}", op.symbol(), right)?;
                }
                Ok(())
            }
            Expr::IfExp { test, body, orelse } => {
                write!(f, "({} if {} else {})", body, test, orelse)
            }
            Expr::Call { func, args } => {
                write!(f, "{}(", func)?;
                write_joined(f, args)?;
                write!(f, ")")
            }
            Expr::Attribute { object, attr } => write!(f, "{}.{}", object, attr),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}
