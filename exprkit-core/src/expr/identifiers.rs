//! Free identifier collection

use std::collections::BTreeSet;

use super::ast::Expr;

/// Every distinct identifier referenced anywhere in `expr`, sorted.
///
/// Function names are not identifiers, and nothing is skipped for branches
/// that may never be evaluated.
pub fn collect_identifiers(expr: &Expr) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    walk(expr, &mut names);
    names
}

fn walk(expr: &Expr, names: &mut BTreeSet<String>) {
    match expr {
        Expr::Ident(name) => {
            names.insert(name.clone());
        }
        Expr::Literal(_) => {}
        Expr::Array(items) | Expr::Call { args: items, .. } => {
            for item in items {
                walk(item, names);
            }
        }
        Expr::Binary { left, right, .. } => {
            walk(left, names);
            walk(right, names);
        }
        Expr::Unary { expr, .. } | Expr::Paren(expr) => walk(expr, names),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parser::parse_expr;
    use pretty_assertions::assert_eq;

    fn names(input: &str) -> Vec<String> {
        collect_identifiers(&parse_expr(input).unwrap())
            .into_iter()
            .collect()
    }

    #[test]
    fn test_collects_each_name_once() {
        assert_eq!(names("2 * (x + 3)"), vec!["x"]);
        assert_eq!(names("b + a * b - a"), vec!["a", "b"]);
    }

    #[test]
    fn test_literals_have_no_identifiers() {
        assert!(names("1 + 2").is_empty());
        assert!(names("\"x\"").is_empty());
    }

    #[test]
    fn test_function_names_are_not_identifiers() {
        assert_eq!(names("Concat(first, \" \", last)"), vec!["first", "last"]);
    }

    #[test]
    fn test_untaken_branches_still_count() {
        assert_eq!(names("If(flag, [a, b], -c)"), vec!["a", "b", "c", "flag"]);
        assert_eq!(names("x && !y"), vec!["x", "y"]);
    }
}
