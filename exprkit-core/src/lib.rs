//! exprkit Core Library
//!
//! Prepare textual expressions once and evaluate them many times:
//! - Expression parsing, identifier analysis and evaluation
//! - A handle table for callers that address expressions by id
//! - JSON-RPC protocol types for exprkit-server
//!
//! ```
//! let expr = exprkit_core::prepare("2 * (x + 3)").unwrap();
//! assert_eq!(expr.identifiers().len(), 1);
//! assert_eq!(expr.execute(&[("x", "4")]).unwrap(), "14");
//! ```

pub mod config;
pub mod expr;
pub mod handle;
pub mod protocol;

pub use config::EngineConfig;
pub use expr::{
    prepare, prepare_with, Bindings, Error, EvalError, Expression, ParseError, Value,
};
pub use handle::{Handle, HandleTable};
pub use protocol::{Request, Response};
