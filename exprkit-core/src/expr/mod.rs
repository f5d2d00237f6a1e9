//! Expression parsing and evaluation
//!
//! Text goes through [`parser`] into an [`ast::Expr`], is wrapped with its
//! identifier set in a [`compiled::Expression`], and is evaluated by
//! [`eval::Evaluator`] against caller [`bindings`].

pub mod ast;
pub mod bindings;
pub mod compiled;
pub mod dates;
pub mod error;
pub mod eval;
pub mod functions;
pub mod identifiers;
pub mod parser;
pub mod value;

pub use ast::Expr;
pub use bindings::Bindings;
pub use compiled::{prepare, prepare_with, Expression};
pub use error::{Error, EvalError, ParseError};
pub use eval::Evaluator;
pub use functions::Function;
pub use parser::{parse_expr, parse_expr_with};
pub use value::Value;
