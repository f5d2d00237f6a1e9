//! Expression evaluator
//!
//! Evaluates expressions against a variable context.

use std::collections::{BTreeSet, HashMap};

use super::ast::{BinOp, Expr, Literal, UnaryOp};
use super::bindings::Bindings;
use super::error::EvalError;
use super::value::Value;

/// Expression evaluator
pub struct Evaluator {
    /// Values of the expression's identifiers
    variables: HashMap<String, Value>,
}

impl Evaluator {
    /// Resolve every name of `identifiers` from `bindings`.
    ///
    /// Names are checked in sorted order and the first one without a value
    /// (absent or null) is reported. Bindings outside `identifiers` are
    /// never read.
    pub fn bind<B: Bindings + ?Sized>(
        identifiers: &BTreeSet<String>,
        bindings: &B,
    ) -> Result<Self, EvalError> {
        let mut variables = HashMap::with_capacity(identifiers.len());
        for name in identifiers {
            match bindings.lookup(name) {
                Some(value) if !value.is_null() => {
                    variables.insert(name.clone(), value);
                }
                _ => return Err(EvalError::missing(name.as_str())),
            }
        }
        Ok(Self { variables })
    }

    /// Evaluate an expression
    pub fn eval(&self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Ident(name) => self
                .variables
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::missing(name.as_str())),
            Expr::Literal(lit) => Ok(literal_to_value(lit)),
            Expr::Array(items) => items
                .iter()
                .map(|item| self.eval(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Expr::Call { function, args } => function.call(self, args),
            Expr::Binary { left, op, right } => match op {
                BinOp::And | BinOp::Or => self.apply_logical(left, *op, right),
                _ => {
                    let l = self.eval(left)?;
                    let r = self.eval(right)?;
                    self.apply_binop((left, &l), *op, (right, &r))
                }
            },
            Expr::Unary { op, expr } => {
                let v = self.eval(expr)?;
                self.apply_unary(*op, expr, &v)
            }
            Expr::Paren(inner) => self.eval(inner),
        }
    }

    /// Evaluate and coerce to a number; `what` names the consumer in errors
    pub fn eval_number(&self, expr: &Expr, what: &str) -> Result<f64, EvalError> {
        let value = self.eval(expr)?;
        value
            .to_number()
            .ok_or_else(|| mismatch(what, "a number", expr, &value))
    }

    /// Evaluate and coerce to an integer, truncating toward zero
    pub fn eval_int(&self, expr: &Expr, what: &str) -> Result<i64, EvalError> {
        self.eval_number(expr, what).map(|n| n.trunc() as i64)
    }

    pub fn eval_bool(&self, expr: &Expr, what: &str) -> Result<bool, EvalError> {
        let value = self.eval(expr)?;
        value
            .to_bool()
            .ok_or_else(|| mismatch(what, "a boolean", expr, &value))
    }

    pub fn eval_text(&self, expr: &Expr, what: &str) -> Result<String, EvalError> {
        let value = self.eval(expr)?;
        value
            .to_text()
            .ok_or_else(|| mismatch(what, "text", expr, &value))
    }

    /// Apply binary operator
    fn apply_binop(
        &self,
        left: (&Expr, &Value),
        op: BinOp,
        right: (&Expr, &Value),
    ) -> Result<Value, EvalError> {
        match op {
            // Arithmetic operations
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem => {
                self.apply_arithmetic(left, op, right)
            }
            // Comparison operations
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                self.apply_comparison(left, op, right)
            }
            BinOp::And | BinOp::Or => Err(EvalError::type_mismatch(format!(
                "operator '{}' needs lazy operands",
                op.as_str()
            ))),
        }
    }

    fn apply_arithmetic(
        &self,
        (left, l): (&Expr, &Value),
        op: BinOp,
        (right, r): (&Expr, &Value),
    ) -> Result<Value, EvalError> {
        let what = format!("operator '{}'", op.as_str());
        let a = l
            .to_number()
            .ok_or_else(|| mismatch(&what, "a number", left, l))?;
        let b = r
            .to_number()
            .ok_or_else(|| mismatch(&what, "a number", right, r))?;

        let result = match op {
            BinOp::Add => a + b,
            BinOp::Sub => a - b,
            BinOp::Mul => a * b,
            BinOp::Div => {
                if b == 0.0 {
                    return Err(EvalError::domain(format!("division by zero in {} / {}", a, b)));
                }
                a / b
            }
            BinOp::Rem => {
                if b == 0.0 {
                    return Err(EvalError::domain(format!("remainder by zero in {} % {}", a, b)));
                }
                a % b
            }
            _ => return Err(EvalError::type_mismatch(format!("{} is not arithmetic", what))),
        };

        finite(result, &what).map(Value::Number)
    }

    fn apply_comparison(
        &self,
        (left, l): (&Expr, &Value),
        op: BinOp,
        (right, r): (&Expr, &Value),
    ) -> Result<Value, EvalError> {
        match op {
            BinOp::Eq => return Ok(Value::Bool(l.loose_eq(r))),
            BinOp::Ne => return Ok(Value::Bool(!l.loose_eq(r))),
            _ => {}
        }

        // Numeric ordering
        if let (Some(a), Some(b)) = (l.to_number(), r.to_number()) {
            return Ok(Value::Bool(compare(op, &a, &b)));
        }

        // Text ordering, only between two non-numeric strings
        if let (Value::Str(a), Value::Str(b)) = (l, r) {
            if l.to_number().is_none() && r.to_number().is_none() {
                return Ok(Value::Bool(compare(op, a.as_str(), b.as_str())));
            }
        }

        let what = format!("operator '{}'", op.as_str());
        let (culprit, value) = if l.to_number().is_none() {
            (left, l)
        } else {
            (right, r)
        };
        Err(mismatch(&what, "two numbers or two texts", culprit, value))
    }

    fn apply_logical(&self, left: &Expr, op: BinOp, right: &Expr) -> Result<Value, EvalError> {
        let what = format!("operator '{}'", op.as_str());
        let l = self.eval_bool(left, &what)?;

        let result = match op {
            BinOp::And => l && self.eval_bool(right, &what)?,
            BinOp::Or => l || self.eval_bool(right, &what)?,
            _ => return Err(EvalError::type_mismatch(format!("{} is not logical", what))),
        };

        Ok(Value::Bool(result))
    }

    fn apply_unary(&self, op: UnaryOp, expr: &Expr, value: &Value) -> Result<Value, EvalError> {
        let what = format!("operator '{}'", op.as_str());
        match op {
            UnaryOp::Neg => value
                .to_number()
                .map(|v| Value::Number(-v))
                .ok_or_else(|| mismatch(&what, "a number", expr, value)),
            UnaryOp::Not => value
                .to_bool()
                .map(|v| Value::Bool(!v))
                .ok_or_else(|| mismatch(&what, "a boolean", expr, value)),
        }
    }
}

/// Convert literal to Value
fn literal_to_value(lit: &Literal) -> Value {
    match lit {
        Literal::Number(v) => Value::Number(*v),
        Literal::Bool(v) => Value::Bool(*v),
        Literal::String(v) => Value::Str(v.clone()),
    }
}

fn compare<T: PartialOrd + ?Sized>(op: BinOp, a: &T, b: &T) -> bool {
    match op {
        BinOp::Lt => a < b,
        BinOp::Le => a <= b,
        BinOp::Gt => a > b,
        BinOp::Ge => a >= b,
        BinOp::Eq => a == b,
        _ => a != b,
    }
}

/// Reject infinities and NaN produced by arithmetic
pub(crate) fn finite(n: f64, what: &str) -> Result<f64, EvalError> {
    if n.is_finite() {
        Ok(n)
    } else {
        Err(EvalError::domain(format!("{} produced a result out of range", what)))
    }
}

/// Build a TypeMismatch naming the consumer and, for bare identifiers, the
/// identifier that held the offending value.
pub(crate) fn mismatch(what: &str, expected: &str, expr: &Expr, value: &Value) -> EvalError {
    let shown = match value {
        Value::Str(s) => format!("{:?}", s),
        other => other.to_string(),
    };
    let found = match expr {
        Expr::Ident(name) => format!(
            "identifier '{}' holding {} {}",
            name,
            value.type_name(),
            shown
        ),
        _ => format!("{} {}", value.type_name(), shown),
    };
    EvalError::type_mismatch(format!("{} expects {}, found {}", what, expected, found))
}
