//! Date, date/time and time-of-day patterns.
//!
//! Candidates are generated once from the token shapes of the sampled values,
//! every candidate is checked against the whole sample, and the survivor is
//! picked by: fewest mismatches, preferred locale order, four-digit year,
//! first generated.

use std::fmt;

use chrono::{NaiveDate, NaiveTime};

use super::Evaluation;
use super::options::{DatePreference, FormatHints};
use super::value_format::{DataType, ValueFormat};

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

/// Characters accepted between date components.
const DATE_SEPARATORS: [char; 4] = ['/', '-', '.', ' '];

/// Two-digit years below this are in the 2000s, others in the 1900s.
const TWO_DIGIT_YEAR_PIVOT: i32 = 50;

/// One element of a date pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateToken {
    /// Day of month, "d" or zero-padded "dd".
    Day { padded: bool },
    /// Month number, "M" or zero-padded "MM".
    Month { padded: bool },
    /// English month name, "MMM" (Jan) or "MMMM" (January).
    MonthName { full: bool },
    /// "yy" or "yyyy".
    Year { digits: u8 },
    Separator(char),
}

impl DateToken {
    /// Same meaning, ignoring zero padding.
    fn same_kind(&self, other: &DateToken) -> bool {
        use DateToken::*;
        match (self, other) {
            (Day { .. }, Day { .. }) | (Month { .. }, Month { .. }) => true,
            _ => self == other,
        }
    }
}

impl fmt::Display for DateToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateToken::Day { padded: true } => write!(f, "dd"),
            DateToken::Day { padded: false } => write!(f, "d"),
            DateToken::Month { padded: true } => write!(f, "MM"),
            DateToken::Month { padded: false } => write!(f, "M"),
            DateToken::MonthName { full: true } => write!(f, "MMMM"),
            DateToken::MonthName { full: false } => write!(f, "MMM"),
            DateToken::Year { digits: 2 } => write!(f, "yy"),
            DateToken::Year { .. } => write!(f, "yyyy"),
            DateToken::Separator(c) => write!(f, "{c}"),
        }
    }
}

/// Time-of-day layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeFormat {
    /// "HH:mm"
    HourMinute,
    /// "HH:mm:ss"
    HourMinuteSecond,
    /// "HH:mm:ss.FFF", any number of fraction digits.
    Fraction,
    /// "hh:mm tt"
    TwelveHour,
    /// "hh:mm:ss tt"
    TwelveHourSeconds,
}

impl TimeFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFormat::HourMinute => "HH:mm",
            TimeFormat::HourMinuteSecond => "HH:mm:ss",
            TimeFormat::Fraction => "HH:mm:ss.FFF",
            TimeFormat::TwelveHour => "hh:mm tt",
            TimeFormat::TwelveHourSeconds => "hh:mm:ss tt",
        }
    }

    /// Parse a time pattern string such as "HH:mm:ss" or "h:mm tt".
    pub fn from_pattern(pattern: &str) -> Option<Self> {
        let format = match pattern.trim() {
            "HH:mm" | "H:mm" => TimeFormat::HourMinute,
            "HH:mm:ss" | "H:mm:ss" => TimeFormat::HourMinuteSecond,
            "HH:mm:ss.FFF" | "HH:mm:ss.fff" | "H:mm:ss.FFF" | "H:mm:ss.fff" => {
                TimeFormat::Fraction
            }
            "hh:mm tt" | "h:mm tt" => TimeFormat::TwelveHour,
            "hh:mm:ss tt" | "h:mm:ss tt" => TimeFormat::TwelveHourSeconds,
            _ => return None,
        };
        Some(format)
    }

    /// The layout of a time-of-day value, if it is a valid time.
    pub fn detect(value: &str) -> Option<Self> {
        let value = value.trim();
        let (clock, meridiem) = match split_meridiem(value) {
            Some((clock, pm)) => (clock, Some(pm)),
            None => (value, None),
        };

        let mut parts = clock.split(':');
        let hour = parse_digits(parts.next()?, 1, 2)?;
        let minute = parse_digits(parts.next()?, 2, 2)?;
        let seconds = parts.next();
        if parts.next().is_some() {
            return None;
        }

        let (second, nanos, fraction) = match seconds {
            None => (0, 0, false),
            Some(s) => match s.split_once('.') {
                Some((whole, frac)) => (parse_digits(whole, 2, 2)?, fraction_nanos(frac)?, true),
                None => (parse_digits(s, 2, 2)?, 0, false),
            },
        };

        let hour = match meridiem {
            Some(pm) => {
                if !(1..=12).contains(&hour) || fraction {
                    return None;
                }
                hour % 12 + if pm { 12 } else { 0 }
            }
            None => hour,
        };
        NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)?;

        Some(match (meridiem.is_some(), seconds.is_some(), fraction) {
            (true, false, _) => TimeFormat::TwelveHour,
            (true, true, _) => TimeFormat::TwelveHourSeconds,
            (false, false, _) => TimeFormat::HourMinute,
            (false, true, false) => TimeFormat::HourMinuteSecond,
            (false, true, true) => TimeFormat::Fraction,
        })
    }

    pub fn matches(&self, value: &str) -> bool {
        TimeFormat::detect(value) == Some(*self)
    }
}

impl fmt::Display for TimeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strip an AM/PM marker; returns the rest and whether it was PM.
fn split_meridiem(value: &str) -> Option<(&str, bool)> {
    let at = value.len().checked_sub(2)?;
    if !value.is_char_boundary(at) {
        return None;
    }
    let (clock, marker) = value.split_at(at);
    let pm = if marker.eq_ignore_ascii_case("pm") {
        true
    } else if marker.eq_ignore_ascii_case("am") {
        false
    } else {
        return None;
    };
    Some((clock.trim_end(), pm))
}

fn parse_digits(s: &str, min: usize, max: usize) -> Option<u32> {
    if !(min..=max).contains(&s.len()) || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn fraction_nanos(frac: &str) -> Option<u32> {
    if frac.is_empty() || frac.len() > 9 || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let digits: u32 = frac.parse().ok()?;
    Some(digits * 10u32.pow(9 - frac.len() as u32))
}

/// Leading digits of `s`, at least `min` and at most `max`.
fn take_digits(s: &str, min: usize, max: usize) -> Option<(u32, &str)> {
    let len = s.bytes().take(max).take_while(u8::is_ascii_digit).count();
    if len < min {
        return None;
    }
    Some((s[..len].parse().ok()?, &s[len..]))
}

/// Month number for an English month name or three-letter abbreviation.
fn month_from_name(name: &str, full: bool) -> Option<u32> {
    let position = if full {
        MONTH_NAMES.iter().position(|m| m.eq_ignore_ascii_case(name))
    } else if name.len() == 3 {
        MONTH_NAMES
            .iter()
            .position(|m| m[..3].eq_ignore_ascii_case(name))
    } else {
        None
    };
    position.map(|i| i as u32 + 1)
}

fn full_year(value: u32, digits: u8) -> i32 {
    let value = value as i32;
    match digits {
        2 if value < TWO_DIGIT_YEAR_PIVOT => 2000 + value,
        2 => 1900 + value,
        _ => value,
    }
}

/// A date pattern with an optional time of day, or a time of day alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatePattern {
    /// Date tokens; empty for time-only patterns.
    pub date: Vec<DateToken>,
    pub time: Option<TimeFormat>,
    /// Character between date and time, ' ' or 'T'.
    pub time_separator: char,
}

impl DatePattern {
    /// Parse a pattern string such as "dd/MM/yyyy", "yyyy-MM-ddTHH:mm:ss",
    /// "d MMM yyyy" or "HH:mm".
    pub fn parse(pattern: &str) -> Option<Self> {
        let pattern = pattern.trim();
        let (date_part, time, time_separator) = match pattern.find(['H', 'h']) {
            Some(0) => ("", Some(TimeFormat::from_pattern(pattern)?), ' '),
            Some(at) => {
                let separator = pattern[..at].chars().next_back()?;
                if separator != ' ' && separator != 'T' {
                    return None;
                }
                let date_part = &pattern[..at - separator.len_utf8()];
                let time = TimeFormat::from_pattern(&pattern[at..])?;
                (date_part, Some(time), separator)
            }
            None => (pattern, None, ' '),
        };

        let mut date = Vec::new();
        let mut chars = date_part.chars().peekable();
        while let Some(c) = chars.next() {
            let mut run = 1;
            while chars.peek() == Some(&c) {
                chars.next();
                run += 1;
            }
            let token = match (c, run) {
                ('d', 1 | 2) => DateToken::Day { padded: run == 2 },
                ('M', 1 | 2) => DateToken::Month { padded: run == 2 },
                ('M', 3 | 4) => DateToken::MonthName { full: run == 4 },
                ('y', 2 | 4) => DateToken::Year { digits: run as u8 },
                (c, _) if c.is_alphanumeric() => return None,
                (c, _) => {
                    date.extend(std::iter::repeat_n(DateToken::Separator(c), run));
                    continue;
                }
            };
            date.push(token);
        }

        let parsed = Self {
            date,
            time,
            time_separator,
        };
        let complete = parsed.date.is_empty() || parsed.positions().is_some();
        (complete && (!parsed.date.is_empty() || parsed.time.is_some())).then_some(parsed)
    }

    /// The date part as a pattern string, `None` for time-only patterns.
    pub fn date_pattern(&self) -> Option<String> {
        if self.date.is_empty() {
            return None;
        }
        Some(self.date.iter().map(ToString::to_string).collect())
    }

    /// The first separator between date components.
    pub fn separator(&self) -> Option<char> {
        self.date.iter().find_map(|token| match token {
            DateToken::Separator(c) => Some(*c),
            _ => None,
        })
    }

    /// Day, month and year order, `None` for time-only patterns.
    pub fn order(&self) -> Option<DatePreference> {
        let (day, month, year) = self.positions()?;
        Some(if year < month && year < day {
            DatePreference::YmdFormat
        } else if day < month {
            DatePreference::DmyFormat
        } else {
            DatePreference::MdyFormat
        })
    }

    fn year_digits(&self) -> Option<u8> {
        self.date.iter().find_map(|token| match token {
            DateToken::Year { digits } => Some(*digits),
            _ => None,
        })
    }

    /// Token indices of day, month and year if each occurs exactly once.
    fn positions(&self) -> Option<(usize, usize, usize)> {
        let find = |pred: fn(&DateToken) -> bool| {
            let mut found = self.date.iter().enumerate().filter(|(_, t)| pred(t));
            match (found.next(), found.next()) {
                (Some((i, _)), None) => Some(i),
                _ => None,
            }
        };
        Some((
            find(|t| matches!(t, DateToken::Day { .. }))?,
            find(|t| matches!(t, DateToken::Month { .. } | DateToken::MonthName { .. }))?,
            find(|t| matches!(t, DateToken::Year { .. }))?,
        ))
    }

    fn same_layout(&self, other: &DatePattern) -> bool {
        self.time == other.time
            && (self.time.is_none() || self.time_separator == other.time_separator)
            && self.date.len() == other.date.len()
            && self.date.iter().zip(&other.date).all(|(a, b)| a.same_kind(b))
    }

    /// Whether `value` is a valid date/time in this pattern.
    pub fn matches(&self, value: &str) -> bool {
        let value = value.trim();
        match self.time {
            None => self.matches_date(value),
            Some(time) if self.date.is_empty() => time.matches(value),
            Some(time) => value
                .match_indices(self.time_separator)
                .any(|(at, sep)| {
                    self.matches_date(&value[..at]) && time.matches(&value[at + sep.len()..])
                }),
        }
    }

    fn matches_date(&self, value: &str) -> bool {
        let mut rest = value;
        let (mut day, mut month, mut year) = (None, None, None);

        for token in &self.date {
            let (number, remaining) = match *token {
                DateToken::Separator(c) => match rest.strip_prefix(c) {
                    Some(remaining) => {
                        rest = remaining;
                        continue;
                    }
                    None => return false,
                },
                DateToken::Day { .. } | DateToken::Month { .. } => match take_digits(rest, 1, 2) {
                    Some(taken) => taken,
                    None => return false,
                },
                DateToken::MonthName { full } => {
                    let len = rest
                        .find(|c: char| !c.is_ascii_alphabetic())
                        .unwrap_or(rest.len());
                    match month_from_name(&rest[..len], full) {
                        Some(number) => (number, &rest[len..]),
                        None => return false,
                    }
                }
                DateToken::Year { digits } => {
                    match take_digits(rest, digits as usize, digits as usize) {
                        Some(taken) => taken,
                        None => return false,
                    }
                }
            };
            match token {
                DateToken::Day { .. } => day = Some(number),
                DateToken::Year { digits } => year = Some(full_year(number, *digits)),
                _ => month = Some(number),
            }
            rest = remaining;
        }

        match (rest.is_empty(), year, month, day) {
            (true, Some(y), Some(m), Some(d)) => NaiveDate::from_ymd_opt(y, m, d).is_some(),
            _ => false,
        }
    }

    pub(crate) fn to_format(&self) -> ValueFormat {
        ValueFormat {
            date_pattern: self.date_pattern(),
            date_separator: self.separator(),
            time_format: self.time.map(|t| t.as_str().to_string()),
            ..ValueFormat::new(DataType::DateTime)
        }
    }
}

impl fmt::Display for DatePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.date {
            write!(f, "{token}")?;
        }
        match self.time {
            Some(time) if self.date.is_empty() => write!(f, "{time}"),
            Some(time) => write!(f, "{}{time}", self.time_separator),
            None => Ok(()),
        }
    }
}

/// Every pattern one value could be written in.
pub(crate) fn candidates_for(value: &str) -> Vec<DatePattern> {
    let value = value.trim();
    if let Some(time) = TimeFormat::detect(value) {
        return vec![DatePattern {
            date: Vec::new(),
            time: Some(time),
            time_separator: ' ',
        }];
    }

    // Split off a trailing time of day.
    let (date_part, time, time_separator) = value
        .match_indices([' ', 'T'])
        .find_map(|(at, sep)| {
            TimeFormat::detect(&value[at + sep.len()..])
                .map(|time| (&value[..at], Some(time), sep.chars().next().unwrap_or(' ')))
        })
        .unwrap_or((value, None, ' '));

    date_candidates(date_part)
        .into_iter()
        .map(|date| DatePattern {
            date,
            time,
            time_separator,
        })
        .collect()
}

/// Token sequences for a three-component date, one per calendar-valid order.
fn date_candidates(value: &str) -> Vec<Vec<DateToken>> {
    let Some(separator) = value.chars().find(|c| !c.is_alphanumeric()) else {
        return Vec::new();
    };
    if !DATE_SEPARATORS.contains(&separator) {
        return Vec::new();
    }
    let parts: Vec<&str> = value.split(separator).collect();
    let &[a, b, c] = parts.as_slice() else {
        return Vec::new();
    };

    let mut candidates = Vec::new();
    let orders = [
        DatePreference::DmyFormat,
        DatePreference::MdyFormat,
        DatePreference::YmdFormat,
    ];
    for order in orders {
        let (day, month, year, layout) = match order {
            DatePreference::DmyFormat => (a, b, c, [0, 1, 2]),
            DatePreference::MdyFormat => (b, a, c, [1, 0, 2]),
            DatePreference::YmdFormat => (c, b, a, [2, 1, 0]),
        };
        if order == DatePreference::YmdFormat && year.len() != 4 {
            continue;
        }
        let Some(tokens) = component_tokens(day, month, year) else {
            continue;
        };

        // `layout[k]` is the token (day, month, year) written at position k.
        let mut sequence = Vec::with_capacity(5);
        for (k, &which) in layout.iter().enumerate() {
            if k > 0 {
                sequence.push(DateToken::Separator(separator));
            }
            sequence.push(tokens[which]);
        }
        candidates.push(sequence);
    }
    candidates
}

/// Tokens for the given day, month and year strings, if they form a real date.
fn component_tokens(day: &str, month: &str, year: &str) -> Option<[DateToken; 3]> {
    let d = parse_digits(day, 1, 2)?;
    let (m, month_token) = match parse_digits(month, 1, 2) {
        Some(m) => (m, DateToken::Month { padded: month.len() == 2 }),
        None => {
            let full = month.len() > 3;
            (month_from_name(month, full)?, DateToken::MonthName { full })
        }
    };
    let digits = match year.len() {
        2 => 2,
        4 => 4,
        _ => return None,
    };
    let y = full_year(parse_digits(year, digits, digits)?, digits as u8);
    NaiveDate::from_ymd_opt(y, m, d)?;

    Some([
        DateToken::Day { padded: day.len() == 2 },
        month_token,
        DateToken::Year { digits: digits as u8 },
    ])
}

/// Evaluate the sample against the hinted pattern and every generated
/// candidate, returning the best.
pub(crate) fn evaluate(values: &[&str], hints: &FormatHints) -> Option<Evaluation> {
    if let Some(hinted) = hints.date_format.as_deref().and_then(DatePattern::parse) {
        let evaluation = Evaluation::count(values, hinted.to_format(), |v| hinted.matches(v));
        if evaluation.mismatches == 0 {
            return Some(Evaluation {
                hinted: true,
                ..evaluation
            });
        }
    }

    let mut candidates: Vec<DatePattern> = Vec::new();
    for value in values {
        for candidate in candidates_for(value) {
            if !candidates.iter().any(|c| c.same_layout(&candidate)) {
                candidates.push(candidate);
            }
        }
    }

    let preference = hints.date_preference;
    candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| {
            let evaluation =
                Evaluation::count(values, candidate.to_format(), |v| candidate.matches(v));
            let key = (
                evaluation.mismatches,
                preference.is_some() && candidate.order() != preference,
                candidate.year_digits().is_some_and(|d| d != 4),
                index,
            );
            (key, evaluation)
        })
        .min_by_key(|(key, _)| *key)
        .map(|(_, evaluation)| evaluation)
}
