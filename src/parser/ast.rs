// AST (Abstract Syntax Tree) definitions for the generator language

use std::rc::Rc;

/// Source location information for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Arithmetic binary operators (also used by augmented assignment)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg, // -x
    Pos, // +x
    Not, // not x
}

/// Short-circuit operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

/// Comparison operators; a chain `a < b <= c` keeps one per link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    Is,
    IsNot,
}

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::In => "in",
            CmpOp::NotIn => "not in",
            CmpOp::Is => "is",
            CmpOp::IsNot => "is not",
        }
    }
}

/// Expressions
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    IntLiteral(i64, SourceLocation),
    FloatLiteral(f64, SourceLocation),
    StringLiteral(String, SourceLocation),
    BoolLiteral(bool, SourceLocation),
    NoneLiteral(SourceLocation),
    Name(String, SourceLocation),
    List {
        elements: Vec<Expr>,
        location: SourceLocation,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
        location: SourceLocation,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
        location: SourceLocation,
    },
    BoolOp {
        op: BoolOp,
        left: Box<Expr>,
        right: Box<Expr>,
        location: SourceLocation,
    },
    Compare {
        left: Box<Expr>,
        comparisons: Vec<(CmpOp, Expr)>,
        location: SourceLocation,
    },
    IfExp {
        test: Box<Expr>,
        body: Box<Expr>,
        orelse: Box<Expr>,
        location: SourceLocation,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        location: SourceLocation,
    },
    Attribute {
        object: Box<Expr>,
        attr: String,
        location: SourceLocation,
    },
    Yield {
        value: Option<Box<Expr>>,
        location: SourceLocation,
    },
    YieldFrom {
        value: Box<Expr>,
        location: SourceLocation,
    },
}

impl Expr {
    /// Get the source location of this expression
    pub fn location(&self) -> SourceLocation {
        match self {
            Expr::IntLiteral(_, loc)
            | Expr::FloatLiteral(_, loc)
            | Expr::StringLiteral(_, loc)
            | Expr::BoolLiteral(_, loc)
            | Expr::NoneLiteral(loc)
            | Expr::Name(_, loc) => *loc,
            Expr::List { location, .. }
            | Expr::Binary { location, .. }
            | Expr::Unary { location, .. }
            | Expr::BoolOp { location, .. }
            | Expr::Compare { location, .. }
            | Expr::IfExp { location, .. }
            | Expr::Call { location, .. }
            | Expr::Attribute { location, .. }
            | Expr::Yield { location, .. }
            | Expr::YieldFrom { location, .. } => *location,
        }
    }

    /// Whether evaluating this expression can suspend the enclosing frame.
    ///
    /// `yield from` counts: it makes the function a generator even though
    /// delegation itself is unsupported at run time.
    pub fn contains_yield(&self) -> bool {
        match self {
            Expr::Yield { .. } | Expr::YieldFrom { .. } => true,
            Expr::IntLiteral(..)
            | Expr::FloatLiteral(..)
            | Expr::StringLiteral(..)
            | Expr::BoolLiteral(..)
            | Expr::NoneLiteral(_)
            | Expr::Name(..) => false,
            Expr::List { elements, .. } => {
                elements.iter().any(Expr::contains_yield)
            }
            Expr::Binary { left, right, .. }
            | Expr::BoolOp { left, right, .. } => {
                left.contains_yield() || right.contains_yield()
            }
            Expr::Unary { operand, .. } => operand.contains_yield(),
            Expr::Compare {
                left, comparisons, ..
            } => {
                left.contains_yield()
                    || comparisons.iter().any(|(_, e)| e.contains_yield())
            }
            Expr::IfExp {
                test, body, orelse, ..
            } => {
                test.contains_yield()
                    || body.contains_yield()
                    || orelse.contains_yield()
            }
            Expr::Call { func, args, .. } => {
                func.contains_yield() || args.iter().any(Expr::contains_yield)
            }
            Expr::Attribute { object, .. } => object.contains_yield(),
        }
    }
}

/// Which exceptions an `except` clause accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerPattern {
    /// Bare `except:`
    Any,
    /// `except Kind:` or `except (KindA, KindB):`
    Kinds(Vec<String>),
}

/// One `except` clause
#[derive(Debug, Clone, PartialEq)]
pub struct ExceptHandler {
    pub pattern: HandlerPattern,
    pub name: Option<String>,
    pub body: Vec<Stmt>,
    pub location: SourceLocation,
}

/// Function definition, shared between the AST and compiled descriptors
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub location: SourceLocation,
}

impl FunctionDef {
    /// A function is a generator if its own body (not nested `def`s)
    /// contains a suspension point.
    pub fn is_generator(&self) -> bool {
        body_contains_yield(&self.body)
    }
}

/// Whether a statement list suspends, ignoring nested function bodies.
pub fn body_contains_yield(body: &[Stmt]) -> bool {
    body.iter().any(Stmt::contains_yield)
}

/// Statements
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    FunctionDef(Rc<FunctionDef>),
    Assign {
        target: String,
        value: Expr,
        location: SourceLocation,
    },
    AugAssign {
        target: String,
        op: BinOp,
        value: Expr,
        location: SourceLocation,
    },
    Expr {
        expr: Expr,
        location: SourceLocation,
    },
    Return {
        value: Option<Expr>,
        location: SourceLocation,
    },
    If {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
        location: SourceLocation,
    },
    While {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
        location: SourceLocation,
    },
    For {
        target: String,
        iter: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
        location: SourceLocation,
    },
    Try {
        body: Vec<Stmt>,
        handlers: Vec<ExceptHandler>,
        orelse: Vec<Stmt>,
        finalbody: Vec<Stmt>,
        location: SourceLocation,
    },
    Raise {
        exc: Option<Expr>,
        location: SourceLocation,
    },
    Break {
        location: SourceLocation,
    },
    Continue {
        location: SourceLocation,
    },
    Pass {
        location: SourceLocation,
    },
}

impl Stmt {
    /// Get the source location of this statement
    pub fn location(&self) -> SourceLocation {
        match self {
            Stmt::FunctionDef(def) => def.location,
            Stmt::Assign { location, .. }
            | Stmt::AugAssign { location, .. }
            | Stmt::Expr { location, .. }
            | Stmt::Return { location, .. }
            | Stmt::If { location, .. }
            | Stmt::While { location, .. }
            | Stmt::For { location, .. }
            | Stmt::Try { location, .. }
            | Stmt::Raise { location, .. }
            | Stmt::Break { location }
            | Stmt::Continue { location }
            | Stmt::Pass { location } => *location,
        }
    }

    fn contains_yield(&self) -> bool {
        match self {
            Stmt::FunctionDef(_)
            | Stmt::Break { .. }
            | Stmt::Continue { .. }
            | Stmt::Pass { .. } => false,
            Stmt::Assign { value, .. } | Stmt::AugAssign { value, .. } => {
                value.contains_yield()
            }
            Stmt::Expr { expr, .. } => expr.contains_yield(),
            Stmt::Return { value, .. } => {
                value.as_ref().is_some_and(Expr::contains_yield)
            }
            Stmt::Raise { exc, .. } => {
                exc.as_ref().is_some_and(Expr::contains_yield)
            }
            Stmt::If {
                test, body, orelse, ..
            }
            | Stmt::While {
                test, body, orelse, ..
            } => {
                test.contains_yield()
                    || body_contains_yield(body)
                    || body_contains_yield(orelse)
            }
            Stmt::For {
                iter, body, orelse, ..
            } => {
                iter.contains_yield()
                    || body_contains_yield(body)
                    || body_contains_yield(orelse)
            }
            Stmt::Try {
                body,
                handlers,
                orelse,
                finalbody,
                ..
            } => {
                body_contains_yield(body)
                    || handlers.iter().any(|h| body_contains_yield(&h.body))
                    || body_contains_yield(orelse)
                    || body_contains_yield(finalbody)
            }
        }
    }
}

/// Top-level program structure
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub body: Vec<Stmt>, // Module-level statements, run in order
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }
}
