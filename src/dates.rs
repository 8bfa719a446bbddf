//! Lenient calendar-date extraction.
//!
//! Publication dates arrive as `9/1/2004`, `09/01/2004`, `2004-09-01`,
//! `September 1, 2004` or with stray text around them. The parser pulls
//! numeric and month-name tokens out of the cell, ignores everything else,
//! and resolves the order month-first, year-last. Anything it cannot turn
//! into a real calendar date yields `None`.

use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate, Utc};
use regex::Regex;

const MONTH_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Number {
    value: u32,
    digits: usize,
}

impl Number {
    fn is_yearlike(self) -> bool {
        self.digits >= 3 || self.value > 31
    }
}

fn time_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b[0-9]{1,2}:[0-9]{2}(?::[0-9]{2}(?:\.[0-9]+)?)?\b").expect("time pattern compiles")
    })
}

/// ASCII digits only: numeric tokens are sliced by byte offset.
fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)([0-9]+)(?:st|nd|rd|th)?|([a-z]+)").expect("token pattern compiles")
    })
}

/// Parses `value` as a date, returning `None` rather than failing.
pub fn parse_date_lenient(value: &str) -> Option<NaiveDate> {
    parse_date_relative_to(value, Utc::now().year())
}

/// Same as [`parse_date_lenient`] with an explicit reference year, which fills
/// in a missing year and anchors the two-digit year window.
pub fn parse_date_relative_to(value: &str, current_year: i32) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let without_time = time_regex().replace_all(trimmed, " ");

    let mut numbers: Vec<Number> = Vec::new();
    let mut month_name: Option<u32> = None;
    for caps in token_regex().captures_iter(&without_time) {
        if let Some(digits) = caps.get(1) {
            let text = digits.as_str();
            if text.len() == 8 && numbers.is_empty() && month_name.is_none() {
                return compact_date(text);
            }
            if text.len() > 4 {
                return None;
            }
            let value = text.parse::<u32>().ok()?;
            numbers.push(Number {
                value,
                digits: text.len(),
            });
        } else if let Some(word) = caps.get(2) {
            if month_name.is_none() {
                month_name = month_from_word(word.as_str());
            }
        }
    }
    numbers.truncate(3);

    let (year, month, day) = match month_name {
        Some(month) => resolve_with_month_name(&numbers, month, current_year)?,
        None => resolve_numeric(&numbers, current_year)?,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

fn compact_date(text: &str) -> Option<NaiveDate> {
    let year = text[..4].parse().ok()?;
    let month = text[4..6].parse().ok()?;
    let day = text[6..].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn month_from_word(word: &str) -> Option<u32> {
    let lower = word.to_ascii_lowercase();
    if lower.len() < 3 {
        return None;
    }
    // Full names and three-letter abbreviations, plus the common "sept".
    MONTH_NAMES
        .iter()
        .position(|name| name.starts_with(lower.as_str()))
        .filter(|idx| lower.len() == 3 || lower == MONTH_NAMES[*idx] || lower == "sept")
        .map(|idx| idx as u32 + 1)
}

fn resolve_with_month_name(
    numbers: &[Number],
    month: u32,
    current_year: i32,
) -> Option<(i32, u32, u32)> {
    match numbers {
        [] => None,
        [only] if only.is_yearlike() => Some((expand_year(*only, current_year), month, 1)),
        [only] => Some((current_year, month, only.value)),
        [first, second, ..] if first.is_yearlike() => {
            Some((expand_year(*first, current_year), month, second.value))
        }
        [first, second, ..] => Some((expand_year(*second, current_year), month, first.value)),
    }
}

fn resolve_numeric(numbers: &[Number], current_year: i32) -> Option<(i32, u32, u32)> {
    match numbers {
        [only] if only.digits == 4 => Some((only.value as i32, 1, 1)),
        [first, second] if first.is_yearlike() => {
            Some((expand_year(*first, current_year), second.value, 1))
        }
        [first, second] if second.is_yearlike() => {
            Some((expand_year(*second, current_year), first.value, 1))
        }
        [first, second] => Some((current_year, first.value, second.value)),
        [first, second, third] if first.is_yearlike() => {
            let year = expand_year(*first, current_year);
            if second.value > 12 && third.value <= 12 {
                Some((year, third.value, second.value))
            } else {
                Some((year, second.value, third.value))
            }
        }
        [first, second, third] => {
            let year = expand_year(*third, current_year);
            if first.value > 12 && second.value <= 12 {
                Some((year, second.value, first.value))
            } else {
                Some((year, first.value, second.value))
            }
        }
        _ => None,
    }
}

/// Two-digit years land within fifty years of `current_year`.
fn expand_year(number: Number, current_year: i32) -> i32 {
    let value = number.value as i32;
    if number.digits > 2 {
        return value;
    }
    let century = current_year - current_year.rem_euclid(100);
    let mut year = century + value;
    if year >= current_year + 50 {
        year -= 100;
    } else if year < current_year - 50 {
        year += 100;
    }
    year
}
