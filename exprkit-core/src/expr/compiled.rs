//! Prepared expressions
//!
//! An [`Expression`] is parsed and analysed once, then evaluated any number
//! of times against different bindings. It is immutable after construction
//! and can be shared across threads.

use std::collections::BTreeSet;
use std::str::FromStr;

use super::ast::Expr;
use super::bindings::Bindings;
use super::error::{EvalError, ParseError};
use super::eval::Evaluator;
use super::identifiers::collect_identifiers;
use super::parser::parse_expr_with;
use super::value::Value;
use crate::config::EngineConfig;

/// A successfully parsed expression with its cached identifier set
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    ast: Expr,
    identifiers: BTreeSet<String>,
}

/// Parse `source` with the default configuration
pub fn prepare(source: &str) -> Result<Expression, ParseError> {
    Expression::prepare(source)
}

pub fn prepare_with(source: &str, config: &EngineConfig) -> Result<Expression, ParseError> {
    Expression::prepare_with(source, config)
}

impl Expression {
    pub fn prepare(source: &str) -> Result<Self, ParseError> {
        Self::prepare_with(source, &EngineConfig::default())
    }

    pub fn prepare_with(source: &str, config: &EngineConfig) -> Result<Self, ParseError> {
        let ast = parse_expr_with(source, config).map_err(|e| {
            tracing::debug!(kind = e.kind(), "prepare failed: {}", e);
            e
        })?;
        let identifiers = collect_identifiers(&ast);
        tracing::debug!(
            source,
            identifiers = identifiers.len(),
            "prepared expression"
        );

        Ok(Self {
            source: source.to_string(),
            ast,
            identifiers,
        })
    }

    /// The text this expression was prepared from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Free identifiers, each once, in sorted order
    pub fn identifiers(&self) -> &BTreeSet<String> {
        &self.identifiers
    }

    /// Evaluate against `bindings`.
    ///
    /// Every identifier must be bound to a non-null value before anything is
    /// evaluated; bindings for other names are ignored.
    pub fn evaluate<B: Bindings + ?Sized>(&self, bindings: &B) -> Result<Value, EvalError> {
        let evaluator = Evaluator::bind(&self.identifiers, bindings)?;
        evaluator.eval(&self.ast)
    }

    /// Evaluate and render the result as text
    pub fn execute<B: Bindings + ?Sized>(&self, bindings: &B) -> Result<String, EvalError> {
        self.evaluate(bindings).map(|value| value.to_string())
    }
}

impl FromStr for Expression {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::prepare(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_prepare_and_execute() {
        let expr = prepare("2 * (x + 3)").unwrap();
        assert_eq!(expr.source(), "2 * (x + 3)");
        assert_eq!(expr.execute(&[("x", "4")]).unwrap(), "14");
        assert_eq!(expr.execute(&[("x", "0.5")]).unwrap(), "7");
    }

    #[test]
    fn test_reusable_across_bindings() {
        let expr: Expression = "a - b".parse().unwrap();
        let mut bindings = HashMap::new();
        for (a, b, expected) in [(5, 3, "2"), (3, 5, "-2"), (0, 0, "0")] {
            bindings.insert("a", Value::from(a));
            bindings.insert("b", Value::from(b));
            assert_eq!(expr.execute(&bindings).unwrap(), expected);
        }
    }

    #[test]
    fn test_missing_identifier_checked_before_evaluation() {
        // `y` would only be read on the untaken branch, still required
        let expr = prepare("If(true, x, y)").unwrap();
        assert_eq!(
            expr.execute(&[("x", "1")]),
            Err(EvalError::missing("y"))
        );
    }

    #[test]
    fn test_constant_expression_needs_no_bindings() {
        let expr = prepare("Concat(\"a\", 1, true)").unwrap();
        assert!(expr.identifiers().is_empty());
        assert_eq!(expr.execute(&()).unwrap(), "a1true");
    }

    #[test]
    fn test_failed_prepare_yields_error() {
        assert!(prepare("a + ").is_err());
        assert!("".parse::<Expression>().is_err());
    }
}
