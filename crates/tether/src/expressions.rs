use crate::value::Value;

/// An expression node with the (absolute) source line it started on.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub line: u32,
}

impl Expr {
    pub(crate) fn new(kind: ExprKind, line: u32) -> Self {
        Self { kind, line }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// `nil`, booleans, numbers and strings.
    Literal(Value),
    List(Vec<Expr>),
    /// Map literal; keys must evaluate to strings.
    Map(Vec<(Expr, Expr)>),
    Name(String),
    SelfRef,
    Unary(UnaryOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    /// Short-circuit `&&`.
    And(Box<Expr>, Box<Expr>),
    /// Short-circuit `||`.
    Or(Box<Expr>, Box<Expr>),
    If {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// Applies a callee value: `f(x)`.
    Call { callee: Box<Expr>, args: Vec<Expr> },
    /// `receiver.name(args)`; the parens are optional when there are no arguments.
    Method {
        receiver: Box<Expr>,
        name: String,
        args: Vec<Expr>,
    },
    /// `Scope::NAME` constant lookup.
    Const { scope: Box<Expr>, name: String },
    Index { target: Box<Expr>, index: Box<Expr> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
}

impl BinOp {
    /// Operator spelling, used in error messages.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtE => "<=",
            Self::Gt => ">",
            Self::GtE => ">=",
        }
    }
}

/// A function definition statement, before it is installed in the globals.
#[derive(Debug, Clone, PartialEq)]
pub struct FnDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Expr,
    pub source: String,
    pub doc: Option<String>,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `let name = value` always binds in the innermost scope.
    Let { name: String, value: Expr },
    /// `name = value` rebinds an existing local or global, else creates a local.
    Assign { name: String, value: Expr },
    Fn(FnDef),
    Expr(Expr),
}

impl Stmt {
    #[must_use]
    pub fn line(&self) -> u32 {
        match self {
            Self::Let { value, .. } | Self::Assign { value, .. } | Self::Expr(value) => value.line,
            Self::Fn(def) => def.line,
        }
    }
}

/// A parsed snippet: statements run in order, the last one's value is the result.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub stmts: Vec<Stmt>,
}
