//! Date handling for the `Date*` built-ins
//!
//! Dates travel as text. Inputs may be RFC 3339 timestamps, which are
//! converted to UTC, or zone-less `2024-01-31`, `2024-01-31 10:00:00` and
//! `2024-01-31T10:00:00.250` forms, which are taken as they are. Results
//! render as zone-less ISO 8601 text, so they feed straight back into other
//! date functions.

use std::fmt::Write;

use chrono::{
    DateTime, Datelike, FixedOffset, Months, NaiveDate, NaiveDateTime, TimeDelta, TimeZone,
    Timelike,
};

use super::ast::Expr;
use super::error::EvalError;
use super::eval::{mismatch, Evaluator};

pub const SECONDS_PER_HOUR: f64 = 60.0 * 60.0;
pub const SECONDS_PER_DAY: f64 = SECONDS_PER_HOUR * 24.0;
/// Months are averaged for `DateDiffMonths`
pub const SECONDS_PER_MONTH: f64 = SECONDS_PER_DAY * 30.5;

/// `DateFormat` pattern when none is given
pub const DEFAULT_FORMAT: &str = "yyyy-MM-dd HH:mm:ss.fff";
/// `LocalDate` zone when none is given
pub const DEFAULT_TIME_ZONE: &str = "Romance Standard Time";

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Read a date from text, see the module docs for the accepted forms
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Some(date.naive_utc());
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Canonical rendering: `2024-01-31T10:00:00`, with a fraction only when
/// there is one
pub fn format_date(date: &NaiveDateTime) -> String {
    date.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

/// Evaluate `expr` and read it as a date
pub fn eval_date(eval: &Evaluator, expr: &Expr, what: &str) -> Result<NaiveDateTime, EvalError> {
    let value = eval.eval(expr)?;
    value
        .to_text()
        .as_deref()
        .and_then(parse_date)
        .ok_or_else(|| mismatch(what, "a date", expr, &value))
}

/// Pin components to 1 before a comparison. `pins` flags, in order, the
/// year, month, day, hour, minute and second. `None` when the pinned date
/// does not exist (February 29th of year 1).
pub fn pin_fields(date: NaiveDateTime, pins: &[bool]) -> Option<NaiveDateTime> {
    let setters: [fn(&NaiveDateTime, u32) -> Option<NaiveDateTime>; 6] = [
        |date, value| date.with_year(value as i32),
        |date, value| date.with_month(value),
        |date, value| date.with_day(value),
        |date, value| date.with_hour(value),
        |date, value| date.with_minute(value),
        |date, value| date.with_second(value),
    ];
    pins.iter()
        .zip(setters)
        .try_fold(date, |date, (pin, set)| if *pin { set(&date, 1) } else { Some(date) })
}

/// Shift by a (possibly fractional) number of seconds, truncated to whole
/// seconds
pub fn add_seconds(date: NaiveDateTime, seconds: f64) -> Option<NaiveDateTime> {
    let delta = TimeDelta::try_seconds(seconds.trunc() as i64)?;
    date.checked_add_signed(delta)
}

/// Calendar month arithmetic. Days past the end of the target month clamp
/// to its last day: January 31st plus one month is February 28th or 29th.
pub fn add_months(date: NaiveDateTime, months: i64) -> Option<NaiveDateTime> {
    let count = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months < 0 {
        date.checked_sub_months(count)
    } else {
        date.checked_add_months(count)
    }
}

/// Whole seconds from `to` to `from`
pub fn seconds_between(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    from.signed_duration_since(to).num_seconds() as f64
}

/// Shift a UTC date to the wall clock of a named zone
pub fn to_local(date: NaiveDateTime, zone: &str) -> Option<NaiveDateTime> {
    let offset = utc_offset(zone)?;
    Some(offset.from_utc_datetime(&date).naive_local())
}

/// Render `date` with a .NET-style custom pattern (`yyyy-MM-dd HH:mm`).
///
/// Supported specifiers: `d` to `dddd`, `M` to `MMMM`, `y` to `yyyy`, `h`,
/// `hh`, `H`, `HH`, `m`, `mm`, `s`, `ss`, `t`, `tt` and fractions `f`/`F`
/// up to nine digits. Anything else, quoted text and `\`-escaped characters
/// are copied as they are.
pub fn format_dotnet(date: &NaiveDateTime, pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => out.extend(chars.next()),
            '\'' | '"' => {
                for quoted in chars.by_ref() {
                    if quoted == c {
                        break;
                    }
                    out.push(quoted);
                }
            }
            _ => {
                let mut run = 1;
                while chars.next_if_eq(&c).is_some() {
                    run += 1;
                }
                match render_specifier(date, c, run) {
                    Some(rendered) => out.push_str(&rendered),
                    None => out.extend(std::iter::repeat(c).take(run)),
                }
            }
        }
    }
    out
}

fn render_specifier(date: &NaiveDateTime, c: char, run: usize) -> Option<String> {
    let strftime = match (c, run) {
        ('d', 1) => "%-d",
        ('d', 2) => "%d",
        ('d', 3) => "%a",
        ('d', _) => "%A",
        ('M', 1) => "%-m",
        ('M', 2) => "%m",
        ('M', 3) => "%b",
        ('M', _) => "%B",
        ('y', 1) => return Some((date.year() % 100).to_string()),
        ('y', 2) => "%y",
        ('y', _) => "%Y",
        ('h', 1) => "%-I",
        ('h', _) => "%I",
        ('H', 1) => "%-H",
        ('H', _) => "%H",
        ('m', 1) => "%-M",
        ('m', _) => "%M",
        ('s', 1) => "%-S",
        ('s', _) => "%S",
        ('t', 1) => return date.format("%p").to_string().get(..1).map(str::to_string),
        ('t', _) => "%p",
        ('f', _) => return Some(fraction(date, run)),
        // like `f`, without trailing zeros
        ('F', _) => return Some(fraction(date, run).trim_end_matches('0').to_string()),
        _ => return None,
    };

    let mut rendered = String::new();
    write!(rendered, "{}", date.format(strftime)).ok()?;
    Some(rendered)
}

/// Leading `digits` digits of the fractional second
fn fraction(date: &NaiveDateTime, digits: usize) -> String {
    let nanos = format!("{:09}", date.nanosecond() % 1_000_000_000);
    nanos[..digits.min(9)].to_string()
}

/// Standard (non-daylight) offsets of the Windows time zone names
pub fn utc_offset(zone: &str) -> Option<FixedOffset> {
    let minutes = match zone {
        "Dateline Standard Time" => -12 * 60,
        "UTC-11" => -11 * 60,
        "Aleutian Standard Time" | "Hawaiian Standard Time" => -10 * 60,
        "Marquesas Standard Time" => -9 * 60 - 30,
        "Alaskan Standard Time" | "UTC-09" => -9 * 60,
        "Pacific Standard Time (Mexico)" | "UTC-08" | "Pacific Standard Time" => -8 * 60,
        "US Mountain Standard Time"
        | "Mountain Standard Time (Mexico)"
        | "Mountain Standard Time" => -7 * 60,
        "Central America Standard Time"
        | "Central Standard Time"
        | "Easter Island Standard Time"
        | "Central Standard Time (Mexico)"
        | "Canada Central Standard Time" => -6 * 60,
        "SA Pacific Standard Time"
        | "Eastern Standard Time (Mexico)"
        | "Eastern Standard Time"
        | "Haiti Standard Time"
        | "Cuba Standard Time"
        | "US Eastern Standard Time"
        | "Turks And Caicos Standard Time" => -5 * 60,
        "Paraguay Standard Time"
        | "Atlantic Standard Time"
        | "Venezuela Standard Time"
        | "Central Brazilian Standard Time"
        | "SA Western Standard Time"
        | "Pacific SA Standard Time" => -4 * 60,
        "Newfoundland Standard Time" => -3 * 60 - 30,
        "Tocantins Standard Time"
        | "E. South America Standard Time"
        | "SA Eastern Standard Time"
        | "Argentina Standard Time"
        | "Greenland Standard Time"
        | "Montevideo Standard Time"
        | "Magallanes Standard Time"
        | "Saint Pierre Standard Time"
        | "Bahia Standard Time" => -3 * 60,
        "UTC-02" | "Mid-Atlantic Standard Time" => -2 * 60,
        "Azores Standard Time" | "Cape Verde Standard Time" => -60,
        "UTC"
        | "GMT Standard Time"
        | "Greenwich Standard Time"
        | "Sao Tome Standard Time"
        | "Morocco Standard Time" => 0,
        "W. Europe Standard Time"
        | "Central Europe Standard Time"
        | "Romance Standard Time"
        | "Central European Standard Time"
        | "W. Central Africa Standard Time" => 60,
        "Jordan Standard Time"
        | "GTB Standard Time"
        | "Middle East Standard Time"
        | "Egypt Standard Time"
        | "E. Europe Standard Time"
        | "Syria Standard Time"
        | "West Bank Standard Time"
        | "South Africa Standard Time"
        | "FLE Standard Time"
        | "Israel Standard Time"
        | "Kaliningrad Standard Time"
        | "Sudan Standard Time"
        | "Libya Standard Time"
        | "Namibia Standard Time" => 2 * 60,
        "Arabic Standard Time"
        | "Turkey Standard Time"
        | "Arab Standard Time"
        | "Belarus Standard Time"
        | "Russian Standard Time"
        | "E. Africa Standard Time" => 3 * 60,
        "Iran Standard Time" => 3 * 60 + 30,
        "Arabian Standard Time"
        | "Astrakhan Standard Time"
        | "Azerbaijan Standard Time"
        | "Russia Time Zone 3"
        | "Mauritius Standard Time"
        | "Saratov Standard Time"
        | "Georgian Standard Time"
        | "Volgograd Standard Time"
        | "Caucasus Standard Time" => 4 * 60,
        "Afghanistan Standard Time" => 4 * 60 + 30,
        "West Asia Standard Time"
        | "Ekaterinburg Standard Time"
        | "Pakistan Standard Time"
        | "Qyzylorda Standard Time" => 5 * 60,
        "India Standard Time" | "Sri Lanka Standard Time" => 5 * 60 + 30,
        "Nepal Standard Time" => 5 * 60 + 45,
        "Central Asia Standard Time" | "Bangladesh Standard Time" | "Omsk Standard Time" => 6 * 60,
        "Myanmar Standard Time" => 6 * 60 + 30,
        "SE Asia Standard Time"
        | "Altai Standard Time"
        | "W. Mongolia Standard Time"
        | "North Asia Standard Time"
        | "N. Central Asia Standard Time"
        | "Tomsk Standard Time" => 7 * 60,
        "China Standard Time"
        | "North Asia East Standard Time"
        | "Singapore Standard Time"
        | "W. Australia Standard Time"
        | "Taipei Standard Time"
        | "Ulaanbaatar Standard Time" => 8 * 60,
        "Aus Central W. Standard Time" => 8 * 60 + 45,
        "Transbaikal Standard Time"
        | "Tokyo Standard Time"
        | "North Korea Standard Time"
        | "Korea Standard Time"
        | "Yakutsk Standard Time" => 9 * 60,
        "Cen. Australia Standard Time" | "AUS Central Standard Time" => 9 * 60 + 30,
        "E. Australia Standard Time"
        | "AUS Eastern Standard Time"
        | "West Pacific Standard Time"
        | "Tasmania Standard Time"
        | "Vladivostok Standard Time" => 10 * 60,
        "Lord Howe Standard Time" => 10 * 60 + 30,
        "Bougainville Standard Time"
        | "Russia Time Zone 10"
        | "Magadan Standard Time"
        | "Norfolk Standard Time"
        | "Sakhalin Standard Time"
        | "Central Pacific Standard Time" => 11 * 60,
        "Russia Time Zone 11"
        | "New Zealand Standard Time"
        | "UTC+12"
        | "Fiji Standard Time"
        | "Kamchatka Standard Time" => 12 * 60,
        "Chatham Islands Standard Time" => 12 * 60 + 45,
        "UTC+13" | "Tonga Standard Time" | "Samoa Standard Time" => 13 * 60,
        "Line Islands Standard Time" => 14 * 60,
        _ => return None,
    };
    FixedOffset::east_opt(minutes * 60)
}
