//! Expression parser using syn
//!
//! Converts expression strings to our AST. The accepted language is a subset
//! of Rust expression syntax; anything else `syn` understands is rejected
//! with [`ParseError::Unsupported`].

use proc_macro2::{token_stream, Group, Punct, Spacing, TokenStream, TokenTree};
use quote::ToTokens;
use syn::ext::IdentExt;
use syn::{
    Expr as SynExpr, ExprArray, ExprBinary, ExprCall, ExprLit, ExprParen, ExprPath, ExprUnary,
};

use super::ast::{BinOp, Expr, Literal, UnaryOp};
use super::error::ParseError;
use super::functions::Function;
use crate::config::EngineConfig;

/// Parse an expression string with the default configuration
pub fn parse_expr(input: &str) -> Result<Expr, ParseError> {
    parse_expr_with(input, &EngineConfig::default())
}

/// Parse an expression string into our AST
pub fn parse_expr_with(input: &str, config: &EngineConfig) -> Result<Expr, ParseError> {
    let tokens: TokenStream = input.parse().map_err(syn::Error::from)?;

    // syn recurses per nesting level, so bound it before handing the tokens over
    check_nesting(&tokens, config.max_depth)?;

    let syn_expr: SynExpr = syn::parse2(strip_at_signs(tokens))?;
    let expr = convert_expr(&syn_expr)?;

    if expr.depth() > config.max_depth {
        return Err(ParseError::TooDeep {
            limit: config.max_depth,
        });
    }
    Ok(expr)
}

/// One bracket level of the token tree being measured
struct Level {
    tokens: token_stream::IntoIter,
    /// Cost of the group itself
    base: usize,
    /// Cost of the next operand in this group
    cost: usize,
    prev: Option<Punct>,
}

/// Conservative nesting estimate over the token tree, walked without
/// recursion. Every group opens a level, and every operator nests the rest
/// of its comma-separated item one level deeper.
fn check_nesting(tokens: &TokenStream, limit: usize) -> Result<(), ParseError> {
    let too_deep = || ParseError::TooDeep { limit };
    let mut stack = vec![Level {
        tokens: tokens.clone().into_iter(),
        base: 0,
        cost: 0,
        prev: None,
    }];

    while let Some(level) = stack.last_mut() {
        let Some(token) = level.tokens.next() else {
            stack.pop();
            continue;
        };
        let prev = level.prev.take();

        match token {
            TokenTree::Group(group) => {
                let base = level.cost + 1;
                if base > limit {
                    return Err(too_deep());
                }
                stack.push(Level {
                    tokens: group.stream().into_iter(),
                    base,
                    cost: base,
                    prev: None,
                });
            }
            TokenTree::Punct(punct) => {
                match punct.as_char() {
                    ',' | ';' => level.cost = level.base,
                    '@' => {}
                    _ if continues_operator(prev.as_ref(), &punct) => {}
                    _ => level.cost += 1,
                }
                if level.cost > limit {
                    return Err(too_deep());
                }
                level.prev = Some(punct);
            }
            TokenTree::Ident(ident) => {
                // keywords that wrap the expression before them
                if matches!(ident.to_string().as_str(), "as" | "if" | "else" | "match") {
                    level.cost += 1;
                    if level.cost > limit {
                        return Err(too_deep());
                    }
                }
            }
            TokenTree::Literal(_) => {}
        }
    }
    Ok(())
}

/// Second half of a two-character operator: `==`, `!=`, `<=`, `>=`, `&&`, `||`
fn continues_operator(prev: Option<&Punct>, punct: &Punct) -> bool {
    let Some(prev) = prev else {
        return false;
    };
    if prev.spacing() != Spacing::Joint {
        return false;
    }
    matches!(
        (prev.as_char(), punct.as_char()),
        ('=' | '!' | '<' | '>', '=') | ('&', '&') | ('|', '|')
    )
}

/// `@name` is another spelling of `name`. Only called after
/// [`check_nesting`], so the recursion is bounded.
fn strip_at_signs(tokens: TokenStream) -> TokenStream {
    let mut stripped = Vec::new();
    let mut tokens = tokens.into_iter().peekable();
    while let Some(token) = tokens.next() {
        match token {
            TokenTree::Punct(punct)
                if punct.as_char() == '@' && matches!(tokens.peek(), Some(TokenTree::Ident(_))) => {}
            TokenTree::Group(group) => {
                let mut inner = Group::new(group.delimiter(), strip_at_signs(group.stream()));
                inner.set_span(group.span());
                stripped.push(TokenTree::Group(inner));
            }
            other => stripped.push(other),
        }
    }
    stripped.into_iter().collect()
}

/// Convert syn expression to our AST
fn convert_expr(expr: &SynExpr) -> Result<Expr, ParseError> {
    match expr {
        // Binary operations: a + b
        SynExpr::Binary(ExprBinary {
            left, op, right, ..
        }) => {
            let bin_op = convert_binop(op)?;
            let left = convert_expr(left)?;
            let right = convert_expr(right)?;
            // comparisons do not associate: `a < b < c` needs parentheses
            if bin_op.is_comparison() && (is_comparison(&left) || is_comparison(&right)) {
                return Err(ParseError::unsupported("chained comparison"));
            }
            Ok(Expr::Binary {
                left: Box::new(left),
                op: bin_op,
                right: Box::new(right),
            })
        }

        // Unary operations: -a, !b
        SynExpr::Unary(ExprUnary { op, expr, .. }) => {
            let unary_op = convert_unary_op(op)?;
            Ok(Expr::Unary {
                op: unary_op,
                expr: Box::new(convert_expr(expr)?),
            })
        }

        // Literals: 42, 3.14, true, "text"
        SynExpr::Lit(ExprLit { lit, .. }) => Ok(Expr::Literal(convert_literal(lit)?)),

        // Identifiers: total, r#type
        SynExpr::Path(ExprPath {
            qself: None, path, ..
        }) => match path.get_ident() {
            Some(ident) => Ok(Expr::Ident(ident.unraw().to_string())),
            None => Err(ParseError::unsupported(format!(
                "path `{}`",
                path.to_token_stream()
            ))),
        },

        // Parenthesized: (a + b)
        SynExpr::Paren(ExprParen { expr, .. }) => Ok(Expr::Paren(Box::new(convert_expr(expr)?))),

        // Array: [1, 2, x]
        SynExpr::Array(ExprArray { elems, .. }) => elems
            .iter()
            .map(convert_expr)
            .collect::<Result<Vec<_>, _>>()
            .map(Expr::Array),

        // Built-in call: Concat(a, b)
        SynExpr::Call(call) => convert_call(call),

        SynExpr::MethodCall(_) => Err(ParseError::unsupported("method calls")),
        SynExpr::Field(_) => Err(ParseError::unsupported("field access")),
        SynExpr::Index(_) => Err(ParseError::unsupported("indexing")),
        SynExpr::Cast(_) => Err(ParseError::unsupported("casts")),
        SynExpr::Assign(_) => Err(ParseError::unsupported("assignment")),
        SynExpr::Closure(_) => Err(ParseError::unsupported("closures")),
        SynExpr::Block(_) => Err(ParseError::unsupported("block expressions")),
        SynExpr::If(_) => Err(ParseError::unsupported("if expressions")),
        SynExpr::Match(_) => Err(ParseError::unsupported("match expressions")),

        other => Err(ParseError::unsupported(format!(
            "`{}`",
            other.to_token_stream()
        ))),
    }
}

fn is_comparison(expr: &Expr) -> bool {
    matches!(expr, Expr::Binary { op, .. } if op.is_comparison())
}

fn convert_call(call: &ExprCall) -> Result<Expr, ParseError> {
    let name = match call.func.as_ref() {
        SynExpr::Path(ExprPath {
            qself: None, path, ..
        }) => match path.get_ident() {
            Some(ident) => ident.unraw().to_string(),
            None => {
                return Err(ParseError::unsupported(format!(
                    "call through path `{}`",
                    path.to_token_stream()
                )))
            }
        },
        other => {
            return Err(ParseError::unsupported(format!(
                "call of `{}`",
                other.to_token_stream()
            )))
        }
    };

    let function =
        Function::from_name(&name).ok_or_else(|| ParseError::UnknownFunction { name: name.clone() })?;

    let arity = function.arity();
    if !arity.accepts(call.args.len()) {
        return Err(ParseError::Arity {
            name,
            expected: arity.describe(),
            found: call.args.len(),
        });
    }

    let args = call
        .args
        .iter()
        .map(convert_expr)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Expr::Call { function, args })
}

/// Convert syn binary operator to our BinOp
fn convert_binop(op: &syn::BinOp) -> Result<BinOp, ParseError> {
    match op {
        syn::BinOp::Add(_) => Ok(BinOp::Add),
        syn::BinOp::Sub(_) => Ok(BinOp::Sub),
        syn::BinOp::Mul(_) => Ok(BinOp::Mul),
        syn::BinOp::Div(_) => Ok(BinOp::Div),
        syn::BinOp::Rem(_) => Ok(BinOp::Rem),
        syn::BinOp::Eq(_) => Ok(BinOp::Eq),
        syn::BinOp::Ne(_) => Ok(BinOp::Ne),
        syn::BinOp::Lt(_) => Ok(BinOp::Lt),
        syn::BinOp::Le(_) => Ok(BinOp::Le),
        syn::BinOp::Gt(_) => Ok(BinOp::Gt),
        syn::BinOp::Ge(_) => Ok(BinOp::Ge),
        syn::BinOp::And(_) => Ok(BinOp::And),
        syn::BinOp::Or(_) => Ok(BinOp::Or),
        other => Err(ParseError::unsupported(format!(
            "operator `{}`",
            other.to_token_stream()
        ))),
    }
}

/// Convert syn unary operator to our UnaryOp
fn convert_unary_op(op: &syn::UnOp) -> Result<UnaryOp, ParseError> {
    match op {
        syn::UnOp::Neg(_) => Ok(UnaryOp::Neg),
        syn::UnOp::Not(_) => Ok(UnaryOp::Not),
        other => Err(ParseError::unsupported(format!(
            "operator `{}`",
            other.to_token_stream()
        ))),
    }
}

/// Convert syn literal to our Literal
fn convert_literal(lit: &syn::Lit) -> Result<Literal, ParseError> {
    let invalid = |message: String| ParseError::InvalidLiteral {
        literal: lit.to_token_stream().to_string(),
        message,
    };

    match lit {
        syn::Lit::Int(i) => {
            if !i.suffix().is_empty() {
                return Err(invalid(format!("type suffix `{}` is not allowed", i.suffix())));
            }
            let value = i
                .base10_parse::<f64>()
                .map_err(|e| invalid(e.to_string()))?;
            finite_literal(value).ok_or_else(|| invalid("number out of range".to_string()))
        }
        syn::Lit::Float(f) => {
            if !f.suffix().is_empty() {
                return Err(invalid(format!("type suffix `{}` is not allowed", f.suffix())));
            }
            let value = f
                .base10_parse::<f64>()
                .map_err(|e| invalid(e.to_string()))?;
            finite_literal(value).ok_or_else(|| invalid("number out of range".to_string()))
        }
        syn::Lit::Bool(b) => Ok(Literal::Bool(b.value)),
        syn::Lit::Char(c) => Ok(Literal::String(c.value().to_string())),
        syn::Lit::Str(s) => {
            if !s.suffix().is_empty() {
                return Err(invalid(format!("suffix `{}` is not allowed", s.suffix())));
            }
            Ok(Literal::String(s.value()))
        }
        _ => Err(ParseError::unsupported("byte literals")),
    }
}

fn finite_literal(value: f64) -> Option<Literal> {
    value.is_finite().then_some(Literal::Number(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_identifier() {
        assert_eq!(parse_expr("foo").unwrap(), Expr::Ident("foo".to_string()));
        assert_eq!(parse_expr("r#type").unwrap(), Expr::Ident("type".to_string()));
    }

    #[test]
    fn test_parse_binary_precedence() {
        let expr = parse_expr("2 * (x + 3)").unwrap();
        assert_eq!(expr.to_string(), "2 * (x + 3)");

        let expr = parse_expr("1 + 2 * 3").unwrap();
        match expr {
            Expr::Binary { op, right, .. } => {
                assert_eq!(op, BinOp::Add);
                assert!(matches!(*right, Expr::Binary { op: BinOp::Mul, .. }));
            }
            other => panic!("Expected Binary, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(parse_expr("42").unwrap(), Expr::Literal(Literal::Number(42.0)));
        assert_eq!(parse_expr("0.5").unwrap(), Expr::Literal(Literal::Number(0.5)));
        assert_eq!(parse_expr("1e3").unwrap(), Expr::Literal(Literal::Number(1000.0)));
        assert_eq!(parse_expr("false").unwrap(), Expr::Literal(Literal::Bool(false)));
        assert_eq!(
            parse_expr("'c'").unwrap(),
            Expr::Literal(Literal::String("c".to_string()))
        );
    }

    #[test]
    fn test_parse_call_and_array() {
        let expr = parse_expr("In(x, [1, 2])").unwrap();
        assert_eq!(expr.to_string(), "In(x, [1, 2])");

        // aliases normalize to the canonical name
        let expr = parse_expr("Iif(a, 1, 2)").unwrap();
        assert_eq!(expr.to_string(), "If(a, 1, 2)");
    }

    #[test]
    fn test_incomplete_input_is_a_syntax_error() {
        assert!(matches!(parse_expr("a + "), Err(ParseError::Syntax { .. })));
        assert!(matches!(parse_expr(""), Err(ParseError::Syntax { .. })));
        assert!(matches!(parse_expr("(a"), Err(ParseError::Syntax { .. })));
    }

    #[test]
    fn test_comparison_chains_are_rejected() {
        assert!(parse_expr("a < b < c").is_err());
    }

    #[test]
    fn test_unknown_function() {
        assert_eq!(
            parse_expr("Frobnicate(1)"),
            Err(ParseError::UnknownFunction {
                name: "Frobnicate".to_string()
            })
        );
    }

    #[test]
    fn test_arity_checked_at_parse_time() {
        let err = parse_expr("Left(\"abc\")").unwrap_err();
        assert!(matches!(err, ParseError::Arity { found: 1, .. }), "{:?}", err);

        let err = parse_expr("ReplaceEquals(a, b, c, d, e)").unwrap_err();
        assert_eq!(err.kind(), "arity");
    }

    #[test]
    fn test_unsupported_forms() {
        for input in ["a.len()", "a.b", "a[0]", "a as i64", "a & b", "a << 1", "x::y", "*p", "a = 1"] {
            let err = parse_expr(input).unwrap_err();
            assert!(
                matches!(err, ParseError::Unsupported { .. } | ParseError::Syntax { .. }),
                "{}: {:?}",
                input,
                err
            );
        }
        assert!(matches!(parse_expr("b'a'"), Err(ParseError::Unsupported { .. })));
    }

    #[test]
    fn test_literal_suffix_rejected() {
        assert!(matches!(
            parse_expr("5u8"),
            Err(ParseError::InvalidLiteral { .. })
        ));
        assert!(matches!(
            parse_expr("1e400"),
            Err(ParseError::InvalidLiteral { .. })
        ));
    }

    #[test]
    fn test_nesting_limit() {
        let config = EngineConfig { max_depth: 4 };
        assert!(parse_expr_with("((((x))))", &config).is_ok());
        assert_eq!(
            parse_expr_with("(((((x)))))", &config),
            Err(ParseError::TooDeep { limit: 4 })
        );
        assert_eq!(
            parse_expr_with("-----x", &config),
            Err(ParseError::TooDeep { limit: 4 })
        );

        // brackets inside strings do not count
        assert!(parse_expr_with("Concat(\"((((((\", x)", &config).is_ok());
        assert!(parse_expr_with("Concat('(', '(', '(', '(', '(', x)", &config).is_ok());

        // closing brackets in char literals cannot hide real nesting
        let sneaky = "(')'".repeat(6) + "x" + &")".repeat(6);
        assert_eq!(
            parse_expr_with(&sneaky, &config),
            Err(ParseError::TooDeep { limit: 4 })
        );
    }

    #[test]
    fn test_deep_input_fails_without_overflow() {
        let input = format!("{}x{}", "(".repeat(100_000), ")".repeat(100_000));
        assert!(matches!(parse_expr(&input), Err(ParseError::TooDeep { .. })));
    }

    #[test]
    fn test_comments_and_raw_strings_cannot_hide_nesting() {
        let config = EngineConfig { max_depth: 4 };
        for prefix in ["/* \" */", "// \"\n", "r\"\\\" +", "r#\"\"\"# +"] {
            let input = format!("{} {}x{}", prefix, "(".repeat(6), ")".repeat(6));
            assert_eq!(
                parse_expr_with(&input, &config),
                Err(ParseError::TooDeep { limit: 4 }),
                "{}",
                input
            );

            let input = format!("{} {}x{}", prefix, "(".repeat(100_000), ")".repeat(100_000));
            assert!(
                matches!(parse_expr(&input), Err(ParseError::TooDeep { .. })),
                "{}",
                prefix
            );
        }

        // comments themselves are fine
        assert_eq!(
            parse_expr("/* \" */ x // trailing").unwrap(),
            Expr::Ident("x".to_string())
        );
    }

    #[test]
    fn test_operator_chains_count_towards_nesting() {
        let config = EngineConfig { max_depth: 4 };
        assert!(parse_expr_with("a + b + c + d + e", &config).is_ok());
        assert_eq!(
            parse_expr_with("a + b + c + d + e + f", &config),
            Err(ParseError::TooDeep { limit: 4 })
        );
        // two-character operators count once
        assert!(parse_expr_with("a == b && c != d", &config).is_ok());
        // each argument starts over
        assert!(parse_expr_with("Sum(a + b + c, d + e + f, g + h + i)", &config).is_ok());

        let input = vec!["1"; 60].join(" + ");
        assert_eq!(parse_expr(&input).unwrap().depth(), 59);
        let input = vec!["1"; 200].join(" + ");
        assert_eq!(parse_expr(&input), Err(ParseError::TooDeep { limit: 64 }));
    }

    #[test]
    fn test_long_chains_fail_without_overflow() {
        let input = vec!["1"; 20_000].join(" + ");
        assert!(matches!(parse_expr(&input), Err(ParseError::TooDeep { .. })));

        let input = format!("x{}", ".a".repeat(20_000));
        assert!(matches!(parse_expr(&input), Err(ParseError::TooDeep { .. })));

        let input = format!("x{}", " as f64".repeat(20_000));
        assert!(matches!(parse_expr(&input), Err(ParseError::TooDeep { .. })));
    }

    #[test]
    fn test_at_sign_identifiers() {
        assert_eq!(
            parse_expr("@idarobase").unwrap(),
            Expr::Ident("idarobase".to_string())
        );
        assert_eq!(parse_expr("Len(@name) + @n").unwrap().to_string(), "Len(name) + n");
        assert!(matches!(parse_expr("@"), Err(ParseError::Syntax { .. })));
        assert!(matches!(parse_expr("@1"), Err(ParseError::Syntax { .. })));
    }
}
