//! Built-in function library
//!
//! Functions receive their arguments unevaluated so that `If`, `And`, `Or`,
//! `FirstNotNull` and the `Replace*` family only evaluate what they need.
//! Names are resolved and argument counts checked when an expression is
//! prepared.
//!
//! The clock-reading functions (`Now`, `Today`, `Time`,
//! `NowSpecificTimeZone`) are not provided: an expression's result depends
//! only on its bindings.

use chrono::{Datelike, NaiveDateTime};
use num_format::{Locale, ToFormattedString};
use regex::{Regex, RegexBuilder};

use super::ast::Expr;
use super::dates::{self, eval_date, format_date};
use super::error::EvalError;
use super::eval::{finite, mismatch, Evaluator};
use super::value::{parse_number, Value};

/// Upper bound for `Fixed` decimals and `Round` digits
const MAX_DECIMALS: i64 = 15;

/// Built-in functions, one variant per implementation (aliases share one)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    // Misc
    IsNull,
    AreEquals,
    In,
    InLike,
    IsLike,
    FirstNotNull,

    // Strings
    Concat,
    Exact,
    Find,
    Substitute,
    Fixed,
    Left,
    Right,
    Mid,
    Len,
    Lower,
    Upper,
    Trim,
    FirstWord,
    FirstSentence,
    Capitalize,
    Split,
    NumberValue,
    Text,
    StartsWith,
    EndsWith,
    ReplaceEquals,
    ReplaceLike,

    // Logical
    And,
    Or,
    Not,
    Xor,
    If,

    // Math
    Abs,
    Product,
    Sum,
    Divide,
    Subtract,
    Mod,
    Round,
    GreaterThan,
    LowerThan,
    GreaterThanOrEqual,
    LowerThanOrEqual,

    // Dates
    Date,
    Year,
    Month,
    Day,
    DateDiff,
    DateDiffHours,
    DateDiffDays,
    DateDiffMonths,
    DateEquals,
    DateNotEquals,
    DateLower,
    DateLowerOrEquals,
    DateGreater,
    DateGreaterOrEquals,
    DateAddHours,
    DateAddDays,
    DateAddMonths,
    DateAddYears,
    LocalDate,
    DateFormat,
}

/// Accepted argument counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Range(usize, usize),
    AtLeast(usize),
    /// An even count of at least the given size
    EvenAtLeast(usize),
    Any,
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exact(n) => count == n,
            Arity::Range(min, max) => (min..=max).contains(&count),
            Arity::AtLeast(min) => count >= min,
            Arity::EvenAtLeast(min) => count >= min && count % 2 == 0,
            Arity::Any => true,
        }
    }

    pub fn describe(&self) -> String {
        match *self {
            Arity::Exact(n) => format!("exactly {}", n),
            Arity::Range(min, max) => format!("between {} and {}", min, max),
            Arity::AtLeast(min) => format!("at least {}", min),
            Arity::EvenAtLeast(min) => format!("an even number (at least {}) of", min),
            Arity::Any => "any number of".to_string(),
        }
    }
}

impl Function {
    /// Resolve a function name, including aliases. Names are case-sensitive.
    pub fn from_name(name: &str) -> Option<Function> {
        let function = match name {
            "IsNull" | "IsBlank" => Function::IsNull,
            "AreEquals" => Function::AreEquals,
            "In" => Function::In,
            "InLike" => Function::InLike,
            "IsLike" | "Like" => Function::IsLike,
            "FirstNotNull" | "FirstNotEmpty" => Function::FirstNotNull,
            "Concatenate" | "Concat" => Function::Concat,
            "Exact" => Function::Exact,
            "Find" => Function::Find,
            "Substitute" => Function::Substitute,
            "Fixed" => Function::Fixed,
            "Left" => Function::Left,
            "Right" => Function::Right,
            "Mid" => Function::Mid,
            "Len" => Function::Len,
            "Lower" => Function::Lower,
            "Upper" => Function::Upper,
            "Trim" => Function::Trim,
            "FirstWord" => Function::FirstWord,
            "FirstSentence" => Function::FirstSentence,
            "Capitalize" => Function::Capitalize,
            "Split" => Function::Split,
            "NumberValue" => Function::NumberValue,
            "Text" => Function::Text,
            "StartsWith" => Function::StartsWith,
            "EndsWith" => Function::EndsWith,
            "ReplaceEquals" => Function::ReplaceEquals,
            "ReplaceLike" => Function::ReplaceLike,
            "And" => Function::And,
            "Or" => Function::Or,
            "Not" => Function::Not,
            "Xor" => Function::Xor,
            "Iif" | "If" => Function::If,
            "Abs" => Function::Abs,
            "Product" => Function::Product,
            "Sum" => Function::Sum,
            "Divide" => Function::Divide,
            "Subtract" => Function::Subtract,
            "Mod" | "Modulo" => Function::Mod,
            "Round" => Function::Round,
            "GreaterThan" | "Gt" => Function::GreaterThan,
            "LowerThan" | "Lt" => Function::LowerThan,
            "GreaterThanOrEqual" | "Gtoe" => Function::GreaterThanOrEqual,
            "LowerThanOrEqual" | "Ltoe" => Function::LowerThanOrEqual,
            "Date" => Function::Date,
            "Year" => Function::Year,
            "Month" => Function::Month,
            "Day" => Function::Day,
            "DateDiff" => Function::DateDiff,
            "DateDiffHours" => Function::DateDiffHours,
            "DateDiffDays" => Function::DateDiffDays,
            "DateDiffMonths" => Function::DateDiffMonths,
            "DateEquals" => Function::DateEquals,
            "DateNotEquals" => Function::DateNotEquals,
            "DateLower" => Function::DateLower,
            "DateLowerOrEquals" => Function::DateLowerOrEquals,
            "DateGreater" => Function::DateGreater,
            "DateGreaterOrEquals" => Function::DateGreaterOrEquals,
            "DateAddHours" => Function::DateAddHours,
            "DateAddDays" => Function::DateAddDays,
            "DateAddMonths" => Function::DateAddMonths,
            "DateAddYears" => Function::DateAddYears,
            "LocalDate" => Function::LocalDate,
            "DateFormat" => Function::DateFormat,
            _ => return None,
        };
        Some(function)
    }

    /// Canonical name
    pub fn name(&self) -> &'static str {
        match self {
            Function::IsNull => "IsNull",
            Function::AreEquals => "AreEquals",
            Function::In => "In",
            Function::InLike => "InLike",
            Function::IsLike => "IsLike",
            Function::FirstNotNull => "FirstNotNull",
            Function::Concat => "Concat",
            Function::Exact => "Exact",
            Function::Find => "Find",
            Function::Substitute => "Substitute",
            Function::Fixed => "Fixed",
            Function::Left => "Left",
            Function::Right => "Right",
            Function::Mid => "Mid",
            Function::Len => "Len",
            Function::Lower => "Lower",
            Function::Upper => "Upper",
            Function::Trim => "Trim",
            Function::FirstWord => "FirstWord",
            Function::FirstSentence => "FirstSentence",
            Function::Capitalize => "Capitalize",
            Function::Split => "Split",
            Function::NumberValue => "NumberValue",
            Function::Text => "Text",
            Function::StartsWith => "StartsWith",
            Function::EndsWith => "EndsWith",
            Function::ReplaceEquals => "ReplaceEquals",
            Function::ReplaceLike => "ReplaceLike",
            Function::And => "And",
            Function::Or => "Or",
            Function::Not => "Not",
            Function::Xor => "Xor",
            Function::If => "If",
            Function::Abs => "Abs",
            Function::Product => "Product",
            Function::Sum => "Sum",
            Function::Divide => "Divide",
            Function::Subtract => "Subtract",
            Function::Mod => "Mod",
            Function::Round => "Round",
            Function::GreaterThan => "GreaterThan",
            Function::LowerThan => "LowerThan",
            Function::GreaterThanOrEqual => "GreaterThanOrEqual",
            Function::LowerThanOrEqual => "LowerThanOrEqual",
            Function::Date => "Date",
            Function::Year => "Year",
            Function::Month => "Month",
            Function::Day => "Day",
            Function::DateDiff => "DateDiff",
            Function::DateDiffHours => "DateDiffHours",
            Function::DateDiffDays => "DateDiffDays",
            Function::DateDiffMonths => "DateDiffMonths",
            Function::DateEquals => "DateEquals",
            Function::DateNotEquals => "DateNotEquals",
            Function::DateLower => "DateLower",
            Function::DateLowerOrEquals => "DateLowerOrEquals",
            Function::DateGreater => "DateGreater",
            Function::DateGreaterOrEquals => "DateGreaterOrEquals",
            Function::DateAddHours => "DateAddHours",
            Function::DateAddDays => "DateAddDays",
            Function::DateAddMonths => "DateAddMonths",
            Function::DateAddYears => "DateAddYears",
            Function::LocalDate => "LocalDate",
            Function::DateFormat => "DateFormat",
        }
    }

    pub fn arity(&self) -> Arity {
        match self {
            Function::IsNull => Arity::Range(0, 1),
            Function::In | Function::InLike => Arity::AtLeast(2),
            Function::FirstNotNull
            | Function::Concat
            | Function::And
            | Function::Or
            | Function::Product
            | Function::Sum => Arity::Any,
            Function::Find => Arity::Range(2, 3),
            Function::Fixed => Arity::Range(1, 3),
            Function::NumberValue | Function::LocalDate | Function::DateFormat => {
                Arity::Range(1, 2)
            }
            // two dates, then up to six flags pinning year .. second
            Function::DateEquals
            | Function::DateNotEquals
            | Function::DateLower
            | Function::DateLowerOrEquals
            | Function::DateGreater
            | Function::DateGreaterOrEquals => Arity::Range(2, 8),
            Function::ReplaceEquals | Function::ReplaceLike => Arity::EvenAtLeast(4),
            Function::Len
            | Function::Lower
            | Function::Upper
            | Function::Trim
            | Function::FirstWord
            | Function::FirstSentence
            | Function::Capitalize
            | Function::Text
            | Function::Not
            | Function::Abs
            | Function::Date
            | Function::Year
            | Function::Month
            | Function::Day => Arity::Exact(1),
            Function::Substitute | Function::Mid | Function::Split | Function::If => {
                Arity::Exact(3)
            }
            Function::AreEquals
            | Function::IsLike
            | Function::Exact
            | Function::Left
            | Function::Right
            | Function::StartsWith
            | Function::EndsWith
            | Function::Xor
            | Function::Divide
            | Function::Subtract
            | Function::Mod
            | Function::Round
            | Function::GreaterThan
            | Function::LowerThan
            | Function::GreaterThanOrEqual
            | Function::LowerThanOrEqual
            | Function::DateDiff
            | Function::DateDiffHours
            | Function::DateDiffDays
            | Function::DateDiffMonths
            | Function::DateAddHours
            | Function::DateAddDays
            | Function::DateAddMonths
            | Function::DateAddYears => Arity::Exact(2),
        }
    }

    /// Evaluate a call with unevaluated `args`
    pub fn call(self, eval: &Evaluator, args: &[Expr]) -> Result<Value, EvalError> {
        let name = self.name();
        if !self.arity().accepts(args.len()) {
            return Err(EvalError::type_mismatch(format!(
                "function '{}' expects {} argument(s), found {}",
                name,
                self.arity().describe(),
                args.len()
            )));
        }

        match (self, args) {
            // Misc
            (Function::IsNull, []) => Ok(Value::Bool(true)),
            (Function::IsNull, [value]) => Ok(Value::Bool(eval.eval(value)?.is_null())),
            (Function::AreEquals, [left, right]) => {
                let l = eval.eval(left)?;
                let r = eval.eval(right)?;
                Ok(Value::Bool(present_and_equal(&l, &r)))
            }
            (Function::In, [search, candidates @ ..]) => {
                let search = eval.eval(search)?;
                for candidate in candidates {
                    let found = match eval.eval(candidate)? {
                        Value::Array(items) => {
                            items.iter().any(|item| present_and_equal(&search, item))
                        }
                        other => present_and_equal(&search, &other),
                    };
                    if found {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            (Function::InLike, [pattern, candidates @ ..]) => {
                let regex = like_regex(&eval.eval_text(pattern, name)?)?;
                for candidate in candidates {
                    let texts = match eval.eval(candidate)? {
                        Value::Array(items) => items,
                        other => vec![other],
                    };
                    if texts
                        .iter()
                        .filter_map(Value::to_text)
                        .any(|text| regex.is_match(&text))
                    {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            (Function::IsLike, [text, pattern]) => {
                let text = eval.eval_text(text, name)?;
                let regex = like_regex(&eval.eval_text(pattern, name)?)?;
                Ok(Value::Bool(regex.is_match(&text)))
            }
            (Function::FirstNotNull, args) => {
                for arg in args {
                    let value = eval.eval(arg)?;
                    if !value.is_null() {
                        return Ok(value);
                    }
                }
                Ok(Value::Null)
            }

            // Strings
            (Function::Concat, args) => {
                let mut result = String::new();
                for arg in args {
                    let value = eval.eval(arg)?;
                    if value.is_null() {
                        continue;
                    }
                    let text = value
                        .to_text()
                        .ok_or_else(|| mismatch(name, "text", arg, &value))?;
                    result.push_str(&text);
                }
                Ok(Value::Str(result))
            }
            (Function::Exact, [left, right]) => {
                let l = eval.eval_text(left, name)?;
                let r = eval.eval_text(right, name)?;
                Ok(Value::Bool(l == r))
            }
            (Function::Find, [find, within, start @ ..]) => {
                let find = eval.eval_text(find, name)?;
                let within = eval.eval_text(within, name)?;
                let start = match start {
                    [start] => eval.eval_int(start, name)?.saturating_sub(1).max(0) as usize,
                    _ => 0,
                };
                let regex = search_regex(&find)?;
                let offset = byte_offset(&within, start);
                let position = match regex.find_at(&within, offset) {
                    // 1-based, 0 when absent
                    Some(m) => within[..m.start()].chars().count() + 1,
                    None => 0,
                };
                Ok(Value::Number(position as f64))
            }
            (Function::Substitute, [within, find, replacement]) => {
                let within = eval.eval_text(within, name)?;
                let find = eval.eval_text(find, name)?;
                let replacement = eval.eval_text(replacement, name)?;
                if find.is_empty() {
                    return Ok(Value::Str(within));
                }
                let regex = search_regex(&find)?;
                let replaced = regex.replace_all(&within, regex::NoExpand(replacement.as_str()));
                Ok(Value::Str(replaced.into_owned()))
            }
            (Function::Fixed, [number, rest @ ..]) => {
                let number = eval.eval_number(number, name)?;
                let decimals = match rest.first() {
                    Some(decimals) => eval.eval_int(decimals, name)?.clamp(0, MAX_DECIMALS),
                    None => 2,
                };
                let no_commas = match rest.get(1) {
                    Some(flag) => eval.eval_bool(flag, name)?,
                    None => true,
                };
                format_fixed(number, decimals as usize, !no_commas)
                    .map(Value::Str)
                    .ok_or_else(|| {
                        EvalError::domain(format!("{}: {} is too large to group", name, number))
                    })
            }
            (Function::Left, [text, count]) => {
                let text = eval.eval_text(text, name)?;
                let count = eval.eval_int(count, name)?.max(0) as usize;
                Ok(Value::Str(text.chars().take(count).collect()))
            }
            (Function::Right, [text, count]) => {
                let text = eval.eval_text(text, name)?;
                let count = eval.eval_int(count, name)?.max(0) as usize;
                let skip = text.chars().count().saturating_sub(count);
                Ok(Value::Str(text.chars().skip(skip).collect()))
            }
            (Function::Mid, [text, start, count]) => {
                let text = eval.eval_text(text, name)?;
                let start = eval.eval_int(start, name)?.saturating_sub(1).max(0) as usize;
                let count = eval.eval_int(count, name)?.max(0) as usize;
                Ok(Value::Str(text.chars().skip(start).take(count).collect()))
            }
            (Function::Len, [value]) => match eval.eval(value)? {
                Value::Array(items) => Ok(Value::Number(items.len() as f64)),
                other => {
                    let text = other
                        .to_text()
                        .ok_or_else(|| mismatch(name, "text", value, &other))?;
                    Ok(Value::Number(text.chars().count() as f64))
                }
            },
            (Function::Lower, [text]) => Ok(Value::Str(eval.eval_text(text, name)?.to_lowercase())),
            (Function::Upper, [text]) => Ok(Value::Str(eval.eval_text(text, name)?.to_uppercase())),
            (Function::Trim, [text]) => {
                Ok(Value::Str(eval.eval_text(text, name)?.trim().to_string()))
            }
            (Function::FirstWord, [text]) => {
                let text = eval.eval_text(text, name)?;
                Ok(Value::Str(prefix_until(&text, |c| {
                    c.is_whitespace() || is_punctuation(c)
                })))
            }
            (Function::FirstSentence, [text]) => {
                let text = eval.eval_text(text, name)?;
                Ok(Value::Str(prefix_until(&text, is_sentence_end)))
            }
            (Function::Capitalize, [text]) => {
                let text = eval.eval_text(text, name)?;
                let mut chars = text.chars();
                let capitalized: String = match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                };
                Ok(Value::Str(capitalized))
            }
            (Function::Split, [text, separator, index]) => {
                let text = eval.eval_text(text, name)?;
                let separator = eval.eval_text(separator, name)?;
                let index = eval.eval_int(index, name)?;
                if index < 0 {
                    return Ok(Value::Null);
                }
                Ok(text
                    .split(separator.as_str())
                    .nth(index as usize)
                    .map_or(Value::Null, Value::from))
            }
            (Function::NumberValue, [text, separator @ ..]) => {
                let value = eval.eval(text)?;
                if let Value::Number(n) = value {
                    return Ok(Value::Number(n));
                }
                let mut raw = value
                    .to_text()
                    .ok_or_else(|| mismatch(name, "text", text, &value))?;
                if let [separator] = separator {
                    if let Some(c) = eval.eval_text(separator, name)?.chars().next() {
                        raw = raw.replace(c, ".");
                    }
                }
                parse_number(&raw)
                    .map(Value::Number)
                    .ok_or_else(|| EvalError::type_mismatch(format!("{}: {:?} is not a number", name, raw)))
            }
            (Function::Text, [value]) => Ok(Value::Str(eval.eval_text(value, name)?)),
            (Function::StartsWith, [text, prefix]) => {
                let text = eval.eval_text(text, name)?.to_lowercase();
                let prefix = eval.eval_text(prefix, name)?.to_lowercase();
                Ok(Value::Bool(text.starts_with(&prefix)))
            }
            (Function::EndsWith, [text, suffix]) => {
                let text = eval.eval_text(text, name)?.to_lowercase();
                let suffix = eval.eval_text(suffix, name)?.to_lowercase();
                Ok(Value::Bool(text.ends_with(&suffix)))
            }
            (Function::ReplaceEquals, [text, default, pairs @ ..]) => {
                let text = eval.eval_text(text, name)?.to_lowercase();
                for pair in pairs.chunks(2) {
                    if let [pattern, replacement] = pair {
                        if eval.eval_text(pattern, name)?.to_lowercase() == text {
                            return eval.eval(replacement);
                        }
                    }
                }
                eval.eval(default)
            }
            (Function::ReplaceLike, [text, default, pairs @ ..]) => {
                let text = eval.eval_text(text, name)?;
                for pair in pairs.chunks(2) {
                    if let [pattern, replacement] = pair {
                        if like_regex(&eval.eval_text(pattern, name)?)?.is_match(&text) {
                            return eval.eval(replacement);
                        }
                    }
                }
                eval.eval(default)
            }

            // Logical
            (Function::And, args) => {
                for arg in args {
                    if !eval.eval_bool(arg, name)? {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            (Function::Or, args) => {
                for arg in args {
                    if eval.eval_bool(arg, name)? {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            (Function::Not, [value]) => Ok(Value::Bool(!eval.eval_bool(value, name)?)),
            (Function::Xor, [left, right]) => {
                let l = eval.eval_bool(left, name)?;
                let r = eval.eval_bool(right, name)?;
                Ok(Value::Bool(l ^ r))
            }
            (Function::If, [condition, then, otherwise]) => {
                if eval.eval_bool(condition, name)? {
                    eval.eval(then)
                } else {
                    eval.eval(otherwise)
                }
            }

            // Math
            (Function::Abs, [value]) => Ok(Value::Number(eval.eval_number(value, name)?.abs())),
            (Function::Product, args) => {
                let mut result = 1.0;
                for arg in args {
                    result = finite(result * eval.eval_number(arg, name)?, name)?;
                }
                Ok(Value::Number(result))
            }
            (Function::Sum, args) => {
                let mut result = 0.0;
                for arg in args {
                    result = finite(result + eval.eval_number(arg, name)?, name)?;
                }
                Ok(Value::Number(result))
            }
            (Function::Divide, [number, divisor]) => {
                let number = eval.eval_number(number, name)?;
                let divisor = eval.eval_number(divisor, name)?;
                if divisor == 0.0 {
                    return Err(EvalError::domain(format!("{}: division of {} by zero", name, number)));
                }
                finite(number / divisor, name).map(Value::Number)
            }
            (Function::Subtract, [number, subtrahend]) => {
                let number = eval.eval_number(number, name)?;
                let subtrahend = eval.eval_number(subtrahend, name)?;
                finite(number - subtrahend, name).map(Value::Number)
            }
            (Function::Mod, [number, divisor]) => {
                let number = eval.eval_number(number, name)?;
                let divisor = eval.eval_number(divisor, name)?;
                if divisor == 0.0 {
                    return Err(EvalError::domain(format!("{}: remainder of {} by zero", name, number)));
                }
                Ok(Value::Number(number % divisor))
            }
            (Function::Round, [number, digits]) => {
                let number = eval.eval_number(number, name)?;
                let digits = eval.eval_int(digits, name)?.clamp(0, MAX_DECIMALS) as i32;
                let scale = 10f64.powi(digits);
                let scaled = finite(number * scale, name)?;
                Ok(Value::Number(scaled.round() / scale))
            }
            (Function::GreaterThan, [a, b]) => numeric_test(eval, name, a, b, |a, b| a > b),
            (Function::LowerThan, [a, b]) => numeric_test(eval, name, a, b, |a, b| a < b),
            (Function::GreaterThanOrEqual, [a, b]) => numeric_test(eval, name, a, b, |a, b| a >= b),
            (Function::LowerThanOrEqual, [a, b]) => numeric_test(eval, name, a, b, |a, b| a <= b),

            // Dates
            (Function::Date, [date]) => Ok(Value::Str(format_date(&eval_date(eval, date, name)?))),
            (Function::Year, [date]) => Ok(Value::Number(eval_date(eval, date, name)?.year() as f64)),
            (Function::Month, [date]) => {
                Ok(Value::Number(eval_date(eval, date, name)?.month() as f64))
            }
            (Function::Day, [date]) => Ok(Value::Number(eval_date(eval, date, name)?.day() as f64)),
            (Function::DateDiff, [a, b]) => date_diff(eval, name, a, b, 1.0),
            (Function::DateDiffHours, [a, b]) => date_diff(eval, name, a, b, dates::SECONDS_PER_HOUR),
            (Function::DateDiffDays, [a, b]) => date_diff(eval, name, a, b, dates::SECONDS_PER_DAY),
            (Function::DateDiffMonths, [a, b]) => {
                date_diff(eval, name, a, b, dates::SECONDS_PER_MONTH)
            }
            (Function::DateEquals, [a, b, pins @ ..]) => date_test(eval, name, a, b, pins, |a, b| a == b),
            (Function::DateNotEquals, [a, b, pins @ ..]) => {
                date_test(eval, name, a, b, pins, |a, b| a != b)
            }
            (Function::DateLower, [a, b, pins @ ..]) => date_test(eval, name, a, b, pins, |a, b| a < b),
            (Function::DateLowerOrEquals, [a, b, pins @ ..]) => {
                date_test(eval, name, a, b, pins, |a, b| a <= b)
            }
            (Function::DateGreater, [a, b, pins @ ..]) => date_test(eval, name, a, b, pins, |a, b| a > b),
            (Function::DateGreaterOrEquals, [a, b, pins @ ..]) => {
                date_test(eval, name, a, b, pins, |a, b| a >= b)
            }
            (Function::DateAddHours, [date, hours]) => {
                let date = eval_date(eval, date, name)?;
                let seconds = eval.eval_number(hours, name)? * dates::SECONDS_PER_HOUR;
                shifted(name, &date, dates::add_seconds(date, seconds))
            }
            (Function::DateAddDays, [date, days]) => {
                let date = eval_date(eval, date, name)?;
                let seconds = eval.eval_number(days, name)? * dates::SECONDS_PER_DAY;
                shifted(name, &date, dates::add_seconds(date, seconds))
            }
            (Function::DateAddMonths, [date, months]) => {
                let date = eval_date(eval, date, name)?;
                let months = eval.eval_int(months, name)?;
                shifted(name, &date, dates::add_months(date, months))
            }
            (Function::DateAddYears, [date, years]) => {
                let date = eval_date(eval, date, name)?;
                let months = eval.eval_int(years, name)?.saturating_mul(12);
                shifted(name, &date, dates::add_months(date, months))
            }
            (Function::LocalDate, [date, zone @ ..]) => {
                let date = eval_date(eval, date, name)?;
                let zone = match zone {
                    [zone] => eval.eval_text(zone, name)?,
                    _ => dates::DEFAULT_TIME_ZONE.to_string(),
                };
                let local = dates::to_local(date, &zone).ok_or_else(|| {
                    EvalError::domain(format!("{}: unknown time zone {:?}", name, zone))
                })?;
                Ok(Value::Str(format_date(&local)))
            }
            (Function::DateFormat, [date, pattern @ ..]) => {
                let date = eval_date(eval, date, name)?;
                let pattern = match pattern {
                    [pattern] => eval.eval_text(pattern, name)?,
                    _ => dates::DEFAULT_FORMAT.to_string(),
                };
                Ok(Value::Str(dates::format_dotnet(&date, &pattern)))
            }

            (function, args) => Err(EvalError::type_mismatch(format!(
                "function '{}' cannot take {} argument(s)",
                function.name(),
                args.len()
            ))),
        }
    }
}

/// Equality where null never matches, not even another null
fn present_and_equal(left: &Value, right: &Value) -> bool {
    !left.is_null() && !right.is_null() && left.loose_eq(right)
}

fn numeric_test(
    eval: &Evaluator,
    name: &str,
    a: &Expr,
    b: &Expr,
    test: impl FnOnce(f64, f64) -> bool,
) -> Result<Value, EvalError> {
    let a = eval.eval_number(a, name)?;
    let b = eval.eval_number(b, name)?;
    Ok(Value::Bool(test(a, b)))
}

/// `left - right` in seconds, divided by `unit`
fn date_diff(
    eval: &Evaluator,
    name: &str,
    left: &Expr,
    right: &Expr,
    unit: f64,
) -> Result<Value, EvalError> {
    let left = eval_date(eval, left, name)?;
    let right = eval_date(eval, right, name)?;
    Ok(Value::Number(dates::seconds_between(left, right) / unit))
}

fn date_test(
    eval: &Evaluator,
    name: &str,
    left: &Expr,
    right: &Expr,
    pins: &[Expr],
    test: impl FnOnce(NaiveDateTime, NaiveDateTime) -> bool,
) -> Result<Value, EvalError> {
    let pins = pins
        .iter()
        .map(|pin| eval.eval_bool(pin, name))
        .collect::<Result<Vec<_>, _>>()?;
    let pinned = |expr: &Expr| -> Result<NaiveDateTime, EvalError> {
        let date = eval_date(eval, expr, name)?;
        dates::pin_fields(date, &pins).ok_or_else(|| {
            EvalError::domain(format!("{}: {} has no counterpart in year 1", name, format_date(&date)))
        })
    };
    let left = pinned(left)?;
    let right = pinned(right)?;
    Ok(Value::Bool(test(left, right)))
}

fn shifted(
    name: &str,
    date: &NaiveDateTime,
    result: Option<NaiveDateTime>,
) -> Result<Value, EvalError> {
    result.map(|shifted| Value::Str(format_date(&shifted))).ok_or_else(|| {
        EvalError::domain(format!("{}: {} leaves the supported date range", name, format_date(date)))
    })
}

fn is_punctuation(c: char) -> bool {
    matches!(c, '.' | ',' | '!' | '?' | '¿')
}

fn is_sentence_end(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

fn prefix_until(text: &str, stop: impl Fn(char) -> bool) -> String {
    text.chars().take_while(|c| !stop(*c)).collect()
}

/// Byte offset of the `index`-th character, or the end of `text`
fn byte_offset(text: &str, index: usize) -> usize {
    text.char_indices()
        .nth(index)
        .map_or(text.len(), |(offset, _)| offset)
}

/// Case-insensitive literal search
fn search_regex(literal: &str) -> Result<Regex, EvalError> {
    build_regex(&regex::escape(literal))
}

/// Translate a like pattern into an anchored, case-insensitive regex.
///
/// `%` matches any run of characters and `_` exactly one; a doubled `%%` or
/// `__` stands for the literal character.
pub fn like_regex(pattern: &str) -> Result<Regex, EvalError> {
    let mut translated = String::from("^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '%' | '_' if chars.peek() == Some(&c) => {
                chars.next();
                translated.push_str(&regex::escape(&c.to_string()));
            }
            '%' => translated.push_str(".*"),
            '_' => translated.push('.'),
            other => translated.push_str(&regex::escape(&other.to_string())),
        }
    }
    translated.push('$');
    build_regex(&translated)
}

fn build_regex(pattern: &str) -> Result<Regex, EvalError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
        .map_err(|e| EvalError::domain(format!("pattern {:?} is not usable: {}", pattern, e)))
}

/// Format with fixed decimals, optionally grouping thousands with commas.
/// `None` when the integer part is too large to group.
fn format_fixed(number: f64, decimals: usize, thousands: bool) -> Option<String> {
    let formatted = format!("{:.*}", decimals, number.abs());
    let sign = if number < 0.0 { "-" } else { "" };
    if !thousands {
        return Some(format!("{}{}", sign, formatted));
    }

    let (int_part, fraction) = match formatted.split_once('.') {
        Some((int_part, fraction)) => (int_part, Some(fraction)),
        None => (formatted.as_str(), None),
    };
    let grouped = int_part.parse::<u128>().ok()?.to_formatted_string(&Locale::en);
    Some(match fraction {
        Some(fraction) => format!("{}{}.{}", sign, grouped, fraction),
        None => format!("{}{}", sign, grouped),
    })
}
