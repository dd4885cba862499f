//! Date handling for the date-family rules.

use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use std::fmt::Write;

/// Format used for synthesized date examples
pub const EXAMPLE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse the reference date of a rule such as `after:2024-01-01`.
///
/// Accepts ISO dates and datetimes plus the relative words `now`, `today`,
/// `tomorrow` and `yesterday`. Anything else (typically the name of another
/// field) yields `None`.
pub fn parse_reference(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    let today = Local::now().date_naive().and_hms_opt(0, 0, 0)?;

    match raw.to_ascii_lowercase().as_str() {
        "now" => return Some(Local::now().naive_local()),
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        "yesterday" => return Some(today - Duration::days(1)),
        _ => {}
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed);
        }
    }

    if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.naive_local());
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Render a date the way examples are shown
pub fn render(date: &NaiveDateTime) -> String {
    date.format(EXAMPLE_FORMAT).to_string()
}

/// Translate a PHP `date()` format string into a chrono format string.
///
/// Characters without an equivalent are copied through; `\` escapes the next
/// character and `!`/`|` (reset markers) are dropped.
pub fn php_format_to_chrono(format: &str) -> String {
    let mut out = String::with_capacity(format.len() * 2);
    let mut chars = format.chars();

    while let Some(c) = chars.next() {
        let mapped = match c {
            'd' => "%d",
            'D' => "%a",
            'j' => "%-d",
            'l' => "%A",
            'N' => "%u",
            'w' => "%w",
            'z' => "%j",
            'W' => "%V",
            'F' => "%B",
            'm' => "%m",
            'M' => "%b",
            'n' => "%-m",
            'o' => "%G",
            'Y' => "%Y",
            'y' => "%y",
            'a' => "%P",
            'A' => "%p",
            'g' => "%-I",
            'G' => "%-H",
            'h' => "%I",
            'H' => "%H",
            'i' => "%M",
            's' => "%S",
            'u' => "%6f",
            'v' => "%3f",
            'e' | 'T' => "%Z",
            'O' => "%z",
            'P' => "%:z",
            'U' => "%s",
            'c' => "%Y-%m-%dT%H:%M:%S%:z",
            '!' | '|' => "",
            '%' => "%%",
            '\\' => {
                if let Some(escaped) = chars.next() {
                    push_literal(&mut out, escaped);
                }
                continue;
            }
            other => {
                push_literal(&mut out, other);
                continue;
            }
        };
        out.push_str(mapped);
    }

    out
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

/// Render the current local time in a PHP-style format
pub fn now_in_php_format(format: &str) -> Option<String> {
    let chrono_format = php_format_to_chrono(format);
    let mut rendered = String::new();
    write!(rendered, "{}", Local::now().format(&chrono_format)).ok()?;
    Some(rendered)
}
