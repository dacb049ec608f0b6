//! Locale-aware number, percent, and date formatting for view output.

use std::fmt::Write as _;

use chrono_tz::Tz;
use time::OffsetDateTime;

use crate::{
    application::error::RenderError,
    domain::{locale::Locale, value::Number},
    util::timezone::localized_datetime,
};

const DEFAULT_MAX_FRACTION_DIGITS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberStyle {
    Decimal,
    Percent,
}

/// Formats numbers with a locale's separators.
///
/// Fractions are rounded to `max_fraction_digits` and trailing zeros are dropped down
/// to `min_fraction_digits`. A value that rounds to zero never carries a minus sign.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberFormat {
    locale: Locale,
    style: NumberStyle,
    min_fraction_digits: usize,
    max_fraction_digits: usize,
    grouping: bool,
}

impl NumberFormat {
    /// Plain decimal output with up to three fraction digits and digit grouping.
    pub fn decimal(locale: Locale) -> Self {
        Self {
            locale,
            style: NumberStyle::Decimal,
            min_fraction_digits: 0,
            max_fraction_digits: DEFAULT_MAX_FRACTION_DIGITS,
            grouping: true,
        }
    }

    /// Ratio output: the value is scaled by 100 and shown as a whole percentage.
    pub fn percent(locale: Locale) -> Self {
        Self {
            locale,
            style: NumberStyle::Percent,
            min_fraction_digits: 0,
            max_fraction_digits: 0,
            grouping: true,
        }
    }

    pub fn with_fraction_digits(mut self, min: usize, max: usize) -> Self {
        self.max_fraction_digits = max;
        self.min_fraction_digits = min.min(max);
        self
    }

    pub fn with_grouping(mut self, grouping: bool) -> Self {
        self.grouping = grouping;
        self
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn style(&self) -> NumberStyle {
        self.style
    }

    pub fn format(&self, number: Number) -> String {
        let scale = match self.style {
            NumberStyle::Decimal => 1,
            NumberStyle::Percent => 100,
        };

        let (negative, integer, fraction) = match number {
            Number::Integer(value) => {
                let scaled = i128::from(value) * scale;
                (scaled < 0, scaled.unsigned_abs().to_string(), String::new())
            }
            Number::Float(value) => {
                let value = value * scale as f64;
                if value.is_nan() {
                    return self.decorate(false, "NaN");
                }
                if value.is_infinite() {
                    return self.decorate(value.is_sign_negative(), "∞");
                }
                let rendered = format!("{:.*}", self.max_fraction_digits, value.abs());
                let (integer, fraction) = rendered
                    .split_once('.')
                    .map(|(integer, fraction)| (integer.to_string(), fraction.to_string()))
                    .unwrap_or((rendered.clone(), String::new()));
                (value.is_sign_negative(), integer, fraction)
            }
        };

        let mut fraction = fraction;
        while fraction.len() > self.min_fraction_digits && fraction.ends_with('0') {
            fraction.pop();
        }
        while fraction.len() < self.min_fraction_digits {
            fraction.push('0');
        }

        let is_zero = integer
            .bytes()
            .chain(fraction.bytes())
            .all(|digit| digit == b'0');

        let mut body = if self.grouping {
            group_digits(&integer, self.locale.grouping_separator())
        } else {
            integer
        };
        if !fraction.is_empty() {
            body.push(self.locale.decimal_separator());
            body.push_str(&fraction);
        }

        self.decorate(negative && !is_zero, &body)
    }

    fn decorate(&self, negative: bool, body: &str) -> String {
        let sign = if negative { "-" } else { "" };
        match self.style {
            NumberStyle::Decimal => format!("{sign}{body}"),
            NumberStyle::Percent => format!("{sign}{body}{}", self.locale.percent_suffix()),
        }
    }
}

fn group_digits(digits: &str, separator: char) -> String {
    let len = digits.len();
    let mut grouped = String::with_capacity(len + len / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (len - index) % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(digit);
    }
    grouped
}

/// Formats instants as calendar dates in one time zone.
#[derive(Debug, Clone, PartialEq)]
pub struct DateFormat {
    locale: Locale,
    pattern: String,
    time_zone: Tz,
}

impl DateFormat {
    /// The locale's long form with the weekday spelled out.
    pub fn full(locale: Locale, time_zone: Tz) -> Self {
        Self {
            locale,
            pattern: locale.full_date_pattern().to_string(),
            time_zone,
        }
    }

    /// Replace the pattern. Patterns use `strftime` syntax.
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn time_zone(&self) -> Tz {
        self.time_zone
    }

    pub fn format(&self, instant: OffsetDateTime) -> Result<String, RenderError> {
        let local = localized_datetime(instant, self.time_zone).ok_or(std::fmt::Error)?;
        let mut out = String::new();
        write!(
            out,
            "{}",
            local.format_localized(&self.pattern, self.locale.chrono_locale())
        )?;
        Ok(out)
    }
}

/// Number, percent, and date formatters, each built on first use.
///
/// A setter replaces the memoized formatter for the rest of the context's life.
#[derive(Debug, Clone, Default)]
pub struct Formatters {
    number: Option<NumberFormat>,
    percent: Option<NumberFormat>,
    date: Option<DateFormat>,
}

impl Formatters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn number(&mut self, locale: Locale) -> &NumberFormat {
        self.number
            .get_or_insert_with(|| NumberFormat::decimal(locale))
    }

    pub fn percent(&mut self, locale: Locale) -> &NumberFormat {
        self.percent
            .get_or_insert_with(|| NumberFormat::percent(locale))
    }

    pub fn date(&mut self, locale: Locale, time_zone: Tz) -> &DateFormat {
        self.date
            .get_or_insert_with(|| DateFormat::full(locale, time_zone))
    }

    pub fn set_number(&mut self, format: NumberFormat) {
        self.number = Some(format);
    }

    pub fn set_percent(&mut self, format: NumberFormat) {
        self.percent = Some(format);
    }

    pub fn set_date(&mut self, format: DateFormat) {
        self.date = Some(format);
    }
}

/// Substitute `{}` and `{n}` placeholders with `args`.
///
/// `{}` takes the next argument in order, `{n}` the argument at index `n`. `{{` and
/// `}}` are literal braces. Placeholders without a matching argument are kept as written.
pub fn format_pattern(pattern: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut next_index = 0;
    let mut rest = pattern;

    while let Some(position) = rest.find(['{', '}']) {
        out.push_str(&rest[..position]);
        let tail = &rest[position..];

        if tail.starts_with("{{") {
            out.push('{');
            rest = &tail[2..];
            continue;
        }
        if tail.starts_with("}}") {
            out.push('}');
            rest = &tail[2..];
            continue;
        }
        if tail.starts_with('}') {
            out.push('}');
            rest = &tail[1..];
            continue;
        }

        let Some(close) = tail.find('}') else {
            out.push_str(tail);
            return out;
        };
        let placeholder = &tail[..=close];
        let inner = &tail[1..close];
        let index = if inner.is_empty() {
            let index = next_index;
            next_index += 1;
            Some(index)
        } else {
            inner.parse::<usize>().ok()
        };

        match index.and_then(|index| args.get(index)) {
            Some(arg) => out.push_str(arg),
            None => out.push_str(placeholder),
        }
        rest = &tail[close + 1..];
    }

    out.push_str(rest);
    out
}

/// Escape text for inclusion in XML or HTML content and attributes.
pub fn xml_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
