//! Built-in function behavior, one test per family

use exprkit_core::{prepare, EvalError, ParseError};
use pretty_assertions::assert_eq;

fn run(source: &str, bindings: &[(&str, &str)]) -> Result<String, EvalError> {
    prepare(source)
        .unwrap_or_else(|e| panic!("{} failed to prepare: {}", source, e))
        .execute(bindings)
}

fn ok(source: &str) -> String {
    run(source, &[]).unwrap_or_else(|e| panic!("{} failed: {}", source, e))
}

#[test]
fn misc() {
    assert_eq!(ok("IsNull()"), "true");
    assert_eq!(ok("IsNull(Split(\"a,b\", \",\", 5))"), "true");
    assert_eq!(ok("IsBlank(\"x\")"), "false");
    assert_eq!(ok("AreEquals(\"3\", 3)"), "true");
    assert_eq!(ok("In(2, 1, [2, 3])"), "true");
    assert_eq!(ok("In(\"c\", \"a\", \"b\")"), "false");
    assert_eq!(ok("InLike(\"ab%\", \"xyz\", \"ABC\")"), "true");
    assert_eq!(ok("IsLike(\"hello\", \"h_llo\")"), "true");
    assert_eq!(ok("Like(\"hello\", \"%z%\")"), "false");
    assert_eq!(
        ok("FirstNotNull(Split(\"a\", \",\", 3), \"fallback\")"),
        "fallback"
    );
}

#[test]
fn strings() {
    assert_eq!(ok("Concat(\"a\", 1, true, Split(\"\", \",\", 4))"), "a1true");
    assert_eq!(ok("Exact(\"Abc\", \"abc\")"), "false");
    assert_eq!(ok("Find(\"B\", \"abcb\")"), "2");
    assert_eq!(ok("Find(\"b\", \"abcb\", 3)"), "4");
    assert_eq!(ok("Find(\"z\", \"abc\")"), "0");
    assert_eq!(ok("Substitute(\"a.b.c\", \".\", \"$1\")"), "a$1b$1c");
    assert_eq!(ok("Fixed(1234.567)"), "1234.57");
    assert_eq!(ok("Fixed(1234.567, 1, false)"), "1,234.6");
    assert_eq!(ok("Fixed(-9876543.21, 0, false)"), "-9,876,543");
    assert_eq!(ok("Fixed(999.5, 0, false)"), "1,000");
    assert_eq!(ok("Left(\"héllo\", 2)"), "hé");
    assert_eq!(ok("Right(\"hello\", 3)"), "llo");
    assert_eq!(ok("Mid(\"hello\", 2, 3)"), "ell");
    assert_eq!(ok("Mid(\"hello\", 0, 2)"), "he");
    assert_eq!(ok("Len(\"héllo\")"), "5");
    assert_eq!(ok("Len([1, 2, 3])"), "3");
    assert_eq!(ok("Lower(\"ABC\")"), "abc");
    assert_eq!(ok("Upper(\"abc\")"), "ABC");
    assert_eq!(ok("Trim(\"  x  \")"), "x");
    assert_eq!(ok("FirstWord(\"Hello, world\")"), "Hello");
    assert_eq!(ok("FirstSentence(\"One. Two.\")"), "One");
    assert_eq!(ok("Capitalize(\"word\")"), "Word");
    assert_eq!(ok("Split(\"a,b,c\", \",\", 1)"), "b");
    assert_eq!(ok("NumberValue(\"3,5\", \",\") * 2"), "7");
    assert_eq!(ok("Text(2.50)"), "2.5");
    assert_eq!(ok("StartsWith(\"Hello\", \"he\")"), "true");
    assert_eq!(ok("EndsWith(\"Hello\", \"LO\")"), "true");
}

#[test]
fn huge_negative_positions_clamp_to_the_start() {
    assert_eq!(ok("Mid(\"abc\", -1e300, 1)"), "a");
    assert_eq!(ok("Find(\"a\", \"abc\", -1e300)"), "1");
    assert_eq!(ok("Find(\"c\", \"abc\", 1e300)"), "0");
    assert_eq!(
        run("Mid(text, start, 2)", &[("text", "abc"), ("start", "-9e18")]).unwrap(),
        "ab"
    );
}

#[test]
fn replace_family() {
    let source = "ReplaceEquals(code, \"other\", \"a\", \"Alpha\", \"b\", \"Beta\")";
    assert_eq!(run(source, &[("code", "B")]).unwrap(), "Beta");
    assert_eq!(run(source, &[("code", "c")]).unwrap(), "other");

    let source = "ReplaceLike(name, \"?\", \"a%\", \"starts with a\", \"%z\", \"ends with z\")";
    assert_eq!(run(source, &[("name", "Adam")]).unwrap(), "starts with a");
    assert_eq!(run(source, &[("name", "fizzy")]).unwrap(), "?");
}

#[test]
fn logical() {
    assert_eq!(ok("And(true, \"TRUE\", 1 < 2)"), "true");
    assert_eq!(ok("And()"), "true");
    assert_eq!(ok("Or(false, false)"), "false");
    assert_eq!(ok("Not(false)"), "true");
    assert_eq!(ok("Xor(true, true)"), "false");
    assert_eq!(ok("Iif(1 == 1, \"yes\", \"no\")"), "yes");
    // untaken branch is never evaluated
    assert_eq!(ok("If(false, 1 / 0, 2)"), "2");
    assert_eq!(ok("Or(true, 1 / 0 > 1)"), "true");
}

#[test]
fn math() {
    assert_eq!(ok("Abs(-4.5)"), "4.5");
    assert_eq!(ok("Product(2, \"3\", 4)"), "24");
    assert_eq!(ok("Sum()"), "0");
    assert_eq!(ok("Sum(1, 2, 3.5)"), "6.5");
    assert_eq!(ok("Divide(7, 2)"), "3.5");
    assert_eq!(ok("Subtract(7, 2)"), "5");
    assert_eq!(ok("Modulo(7, 4)"), "3");
    assert_eq!(ok("Round(2.375, 2)"), "2.38");
    assert_eq!(ok("Round(2.5, 0)"), "3");
    assert_eq!(ok("Gt(3, 2)"), "true");
    assert_eq!(ok("Lt(\"10\", 9)"), "false");
    assert_eq!(ok("Gtoe(2, 2)"), "true");
    assert_eq!(ok("Ltoe(3, 2)"), "false");
}

#[test]
fn function_errors() {
    assert!(matches!(
        run("Divide(x, 0)", &[("x", "1")]),
        Err(EvalError::DomainError { .. })
    ));
    assert!(matches!(
        run("Mod(1, 0)", &[]),
        Err(EvalError::DomainError { .. })
    ));
    assert!(matches!(
        run("Abs(x)", &[("x", "abc")]),
        Err(EvalError::TypeMismatch { .. })
    ));
    assert!(matches!(
        run("Not(\"maybe\")", &[]),
        Err(EvalError::TypeMismatch { .. })
    ));
    assert!(matches!(
        run("Concat([1])", &[]),
        Err(EvalError::TypeMismatch { .. })
    ));
}

#[test]
fn dates() {
    assert_eq!(ok("Date(\"2024-01-31T12:00:00+02:00\")"), "2024-01-31T10:00:00");
    assert_eq!(ok("Date(\"2024-01-31\")"), "2024-01-31T00:00:00");
    assert_eq!(ok("Year(\"2024-03-05\")"), "2024");
    assert_eq!(ok("Month(\"2024-03-05\")"), "3");
    assert_eq!(ok("Day(\"2024-03-05 23:59:59\")"), "5");
    assert_eq!(run("Year(d) + 1", &[("d", "2020-02-02T00:00:00Z")]).unwrap(), "2021");

    assert_eq!(ok("DateDiff(\"2024-01-02\", \"2024-01-01\")"), "86400");
    assert_eq!(ok("DateDiffHours(\"2024-01-01T12:00:00\", \"2024-01-01\")"), "12");
    assert_eq!(ok("DateDiffDays(\"2024-01-01\", \"2024-01-03\")"), "-2");
    assert_eq!(ok("DateDiffMonths(\"2024-03-02\", \"2024-01-01\")"), "2");

    assert_eq!(ok("DateAddHours(\"2024-01-31T23:00:00\", 2)"), "2024-02-01T01:00:00");
    assert_eq!(ok("DateAddDays(\"2024-02-28\", 1.5)"), "2024-02-29T12:00:00");
    assert_eq!(ok("DateAddMonths(\"2024-01-31\", 1)"), "2024-02-29T00:00:00");
    assert_eq!(ok("DateAddMonths(\"2024-01-31\", -2)"), "2023-11-30T00:00:00");
    assert_eq!(ok("DateAddYears(\"2024-02-29\", 1)"), "2025-02-28T00:00:00");

    assert_eq!(ok("LocalDate(\"2024-06-01T12:00:00Z\")"), "2024-06-01T13:00:00");
    assert_eq!(
        ok("LocalDate(\"2024-06-01T20:00:00Z\", \"Tokyo Standard Time\")"),
        "2024-06-02T05:00:00"
    );

    assert_eq!(ok("DateFormat(\"2024-03-05T14:07:09.5\")"), "2024-03-05 14:07:09.500");
    assert_eq!(ok("DateFormat(\"2024-03-05\", \"dd/MM/yyyy\")"), "05/03/2024");
    // results feed back into other date functions
    assert_eq!(
        ok("DateFormat(DateAddDays(\"2024-12-31\", 1), \"yyyy-MM-dd\")"),
        "2025-01-01"
    );
}

#[test]
fn date_comparisons() {
    let a = "\"2024-05-17T10:00:00\"";
    let b = "\"2024-05-18T10:00:00\"";
    assert_eq!(ok(&format!("DateEquals({}, {})", a, a)), "true");
    assert_eq!(ok(&format!("DateNotEquals({}, {})", a, b)), "true");
    assert_eq!(ok(&format!("DateLower({}, {})", a, b)), "true");
    assert_eq!(ok(&format!("DateLowerOrEquals({}, {})", b, a)), "false");
    assert_eq!(ok(&format!("DateGreater({}, {})", b, a)), "true");
    assert_eq!(ok(&format!("DateGreaterOrEquals({}, {})", a, a)), "true");

    // pinning year, month and day leaves only the time of day
    assert_eq!(ok(&format!("DateEquals({}, {}, true, true, true)", a, b)), "true");
    assert_eq!(
        ok("DateEquals(\"2023-05-17\", \"2024-05-17\", true)"),
        "true"
    );
    assert_eq!(
        ok("DateLower(\"2024-01-01T10:30:00\", \"2024-01-01T10:20:00\", false, false, false, false, true)"),
        "false"
    );
}

#[test]
fn date_errors() {
    assert!(matches!(
        run("Year(d)", &[("d", "not a date")]),
        Err(EvalError::TypeMismatch { .. })
    ));
    assert!(matches!(run("Month(12)", &[]), Err(EvalError::TypeMismatch { .. })));
    assert!(matches!(
        run("DateEquals(\"2024-01-01\", \"2024-01-01\", \"maybe\")", &[]),
        Err(EvalError::TypeMismatch { .. })
    ));
    assert!(matches!(
        run("LocalDate(\"2024-01-01\", \"Atlantis Standard Time\")", &[]),
        Err(EvalError::DomainError { .. })
    ));
    assert!(matches!(
        run("DateAddDays(\"2024-01-01\", 1e300)", &[]),
        Err(EvalError::DomainError { .. })
    ));
    assert!(matches!(
        run("DateAddYears(\"2024-01-01\", 1e300)", &[]),
        Err(EvalError::DomainError { .. })
    ));
    assert!(matches!(
        run("DateEquals(\"2024-02-29\", \"2024-02-29\", true)", &[]),
        Err(EvalError::DomainError { .. })
    ));

    // results depend on bindings only, so there is no clock
    for source in ["Now()", "Today()", "Time()", "NowSpecificTimeZone()"] {
        assert!(matches!(
            prepare(source),
            Err(ParseError::UnknownFunction { .. })
        ));
    }
}

#[test]
fn fixed_out_of_grouping_range() {
    assert!(matches!(
        run("Fixed(1e39, 0, false)", &[]),
        Err(EvalError::DomainError { .. })
    ));
    assert_eq!(ok("Fixed(1e20, 0, false)"), "100,000,000,000,000,000,000");
}
