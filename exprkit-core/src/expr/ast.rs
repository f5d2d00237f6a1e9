//! AST definitions for supported expressions

use std::fmt;

use super::functions::Function;
use super::value::format_number;

/// Supported expression AST
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Free variable: x, total_price
    Ident(String),

    /// Literal: 42, 3.14, true, "hello"
    Literal(Literal),

    /// Array: [1, x, "a"]
    Array(Vec<Expr>),

    /// Built-in function call: Concat(a, b)
    Call { function: Function, args: Vec<Expr> },

    /// Binary operation: a + b
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },

    /// Unary operation: -a, !b
    Unary { op: UnaryOp, expr: Box<Expr> },

    /// Parenthesized: (a + b)
    Paren(Box<Expr>),
}

impl Expr {
    /// Nesting depth: brackets, calls and operators each open a level, so
    /// `a + b + c` has depth 2 and `(a)` has depth 1.
    pub fn depth(&self) -> usize {
        match self {
            Expr::Ident(_) | Expr::Literal(_) => 0,
            Expr::Array(items) | Expr::Call { args: items, .. } => {
                1 + items.iter().map(Expr::depth).max().unwrap_or(0)
            }
            Expr::Binary { left, right, .. } => 1 + left.depth().max(right.depth()),
            Expr::Unary { expr, .. } | Expr::Paren(expr) => 1 + expr.depth(),
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Arithmetic
    Add, // +
    Sub, // -
    Mul, // *
    Div, // /
    Rem, // %

    // Comparison
    Eq, // ==
    Ne, // !=
    Lt, // <
    Le, // <=
    Gt, // >
    Ge, // >=

    // Logical
    And, // &&
    Or,  // ||
}

impl BinOp {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg, // -
    Not, // !
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

/// Literal values
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Bool(bool),
    String(String),
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Ident(name) => write!(f, "{}", name),
            Expr::Literal(Literal::Number(n)) => write!(f, "{}", format_number(*n)),
            Expr::Literal(Literal::Bool(b)) => write!(f, "{}", b),
            Expr::Literal(Literal::String(s)) => write!(f, "{:?}", s),
            Expr::Array(items) => {
                write!(f, "[")?;
                write_list(f, items)?;
                write!(f, "]")
            }
            Expr::Call { function, args } => {
                write!(f, "{}(", function.name())?;
                write_list(f, args)?;
                write!(f, ")")
            }
            Expr::Binary { left, op, right } => write!(f, "{} {} {}", left, op.as_str(), right),
            Expr::Unary { op, expr } => write!(f, "{}{}", op.as_str(), expr),
            Expr::Paren(inner) => write!(f, "({})", inner),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}
