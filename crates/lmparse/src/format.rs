//! Scalar decoding of a single field's raw digits.
//!
//! A raw value reaches this module as a string of digits: hexadecimal for
//! byte-granularity fields and binary for bit-granularity fields. A format
//! then decides what the value becomes:
//! - **Display formats** ([`DisplayFormat`]) render one line of the report.
//! - **Output formats** ([`OutputFormat`]) produce a [`Value`] for the
//!   structured result.
//!
//! Both share the same scaling arithmetic ([`Scaling`]), so a report value and
//! a structured value decoded from the same raw digits always agree. Fields
//! without a format fall back to the raw digits with a `0x`/`0b` prefix.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use snafu::{OptionExt, ensure};

use crate::{
    errors::{
        DecodeError, SchemaError, TimestampOutOfRangeSnafu,
        UnknownDisplayFormatSnafu, UnknownOutputFormatSnafu, UnknownRawKindSnafu,
        ValueOverflowSnafu, ValueTooWideSnafu,
    },
    value::Value,
};

/// Literal produced for a timestamp whose bits are all set.
pub const TIMESTAMP_NOT_AVAILABLE: &str = "NA";

/// Width of the millisecond counter inside a timestamp field.
const TIMESTAMP_BITS: usize = 48;

/// High-order bits of a hex timestamp that carry attributes, not time.
const TIMESTAMP_HEADER_BITS: usize = 16;

/// Base of the raw digit string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawKind {
    Binary,
    Hexadecimal,
}

impl RawKind {
    pub fn radix(self) -> u32 {
        match self {
            RawKind::Binary => 2,
            RawKind::Hexadecimal => 16,
        }
    }

    /// Prefix used when a value is shown without a format.
    pub fn prefix(self) -> &'static str {
        match self {
            RawKind::Binary => "0b",
            RawKind::Hexadecimal => "0x",
        }
    }

    fn bits_per_digit(self) -> usize {
        match self {
            RawKind::Binary => 1,
            RawKind::Hexadecimal => 4,
        }
    }

    fn name(self) -> &'static str {
        match self {
            RawKind::Binary => "binary",
            RawKind::Hexadecimal => "hexadecimal",
        }
    }
}

impl FromStr for RawKind {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "binary" => Ok(RawKind::Binary),
            "hexadecimal" => Ok(RawKind::Hexadecimal),
            _ => UnknownRawKindSnafu { tag: s }.fail(),
        }
    }
}

/// Integer arithmetic shared by display and output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scaling {
    Identity,
    /// `v * 5`
    Times5,
    /// `v * 5 + 5`
    Times5Plus5,
    /// `v * 100`
    Times100,
}

impl Scaling {
    /// Applies the arithmetic, or `None` on overflow.
    pub fn apply(self, value: u128) -> Option<u128> {
        match self {
            Scaling::Identity => Some(value),
            Scaling::Times5 => value.checked_mul(5),
            Scaling::Times5Plus5 => value.checked_mul(5)?.checked_add(5),
            Scaling::Times100 => value.checked_mul(100),
        }
    }
}

/// How a field is rendered in the human-readable report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayFormat {
    /// 5-minute units, shown in minutes.
    FiveMinutes,
    /// 5 ms units offset by 5 ms, shown in milliseconds.
    FiveMsPlusFive,
    /// 100 ms units, shown in milliseconds.
    HundredMs,
    /// 1 ms units.
    OneMs,
    Decimal,
    /// Raw digits uppercased.
    Uppercase,
    /// Millisecond timestamp, shown as a UTC date.
    Timestamp,
}

impl DisplayFormat {
    /// Tag used in schema documents.
    pub fn tag(self) -> &'static str {
        match self {
            DisplayFormat::FiveMinutes => "5min",
            DisplayFormat::FiveMsPlusFive => "5ms+5",
            DisplayFormat::HundredMs => "100ms",
            DisplayFormat::OneMs => "1ms",
            DisplayFormat::Decimal => "decimal",
            DisplayFormat::Uppercase => "uppercase",
            DisplayFormat::Timestamp => "timestamp",
        }
    }

    /// Scaling and unit suffix for the integer formats.
    fn integer(self) -> Option<(Scaling, &'static str)> {
        match self {
            DisplayFormat::FiveMinutes => Some((Scaling::Times5, " min")),
            DisplayFormat::FiveMsPlusFive => Some((Scaling::Times5Plus5, " ms")),
            DisplayFormat::HundredMs => Some((Scaling::Times100, " ms")),
            DisplayFormat::OneMs => Some((Scaling::Identity, " ms")),
            DisplayFormat::Decimal => Some((Scaling::Identity, "")),
            DisplayFormat::Uppercase | DisplayFormat::Timestamp => None,
        }
    }
}

impl FromStr for DisplayFormat {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "5min" => Ok(DisplayFormat::FiveMinutes),
            "5ms+5" => Ok(DisplayFormat::FiveMsPlusFive),
            "100ms" => Ok(DisplayFormat::HundredMs),
            "1ms" => Ok(DisplayFormat::OneMs),
            "decimal" => Ok(DisplayFormat::Decimal),
            "uppercase" => Ok(DisplayFormat::Uppercase),
            "timestamp" => Ok(DisplayFormat::Timestamp),
            _ => UnknownDisplayFormatSnafu { tag: s }.fail(),
        }
    }
}

/// How a field is represented in the structured result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Decimal,
    DecimalTimes5,
    DecimalTimes5Plus5,
    DecimalTimes100,
    Uppercase,
    Timestamp,
}

impl OutputFormat {
    /// Tag used in schema documents.
    pub fn tag(self) -> &'static str {
        match self {
            OutputFormat::Decimal => "decimal",
            OutputFormat::DecimalTimes5 => "decimal*5",
            OutputFormat::DecimalTimes5Plus5 => "decimal*5+5",
            OutputFormat::DecimalTimes100 => "decimal*100",
            OutputFormat::Uppercase => "uppercase",
            OutputFormat::Timestamp => "timestamp",
        }
    }

    fn scaling(self) -> Option<Scaling> {
        match self {
            OutputFormat::Decimal => Some(Scaling::Identity),
            OutputFormat::DecimalTimes5 => Some(Scaling::Times5),
            OutputFormat::DecimalTimes5Plus5 => Some(Scaling::Times5Plus5),
            OutputFormat::DecimalTimes100 => Some(Scaling::Times100),
            OutputFormat::Uppercase | OutputFormat::Timestamp => None,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "decimal" => Ok(OutputFormat::Decimal),
            "decimal*5" => Ok(OutputFormat::DecimalTimes5),
            "decimal*5+5" => Ok(OutputFormat::DecimalTimes5Plus5),
            "decimal*100" => Ok(OutputFormat::DecimalTimes100),
            "uppercase" => Ok(OutputFormat::Uppercase),
            "timestamp" => Ok(OutputFormat::Timestamp),
            _ => UnknownOutputFormatSnafu { tag: s }.fail(),
        }
    }
}

/// Parses raw digits in the base selected by `kind`.
///
/// Leading zeros do not count towards the 128-bit limit, so a wide field
/// holding a small value still parses.
pub fn parse_integer(label: &str, raw: &str, kind: RawKind) -> Result<u128, DecodeError> {
    let significant = raw.trim_start_matches('0');
    if significant.is_empty() {
        return Ok(0);
    }

    ensure!(
        significant.len() * kind.bits_per_digit() <= u128::BITS as usize,
        ValueTooWideSnafu { label }
    );

    u128::from_str_radix(significant, kind.radix()).map_err(|_| DecodeError::InvalidDigits {
        raw: raw.to_string(),
        kind: kind.name(),
    })
}

/// Decodes a millisecond timestamp into `YYYY-MM-DD HH:MM:SS.mmm GMT`.
///
/// A value with every bit of its declared width set decodes to `NA`. Binary
/// digits are the millisecond count itself. Hex digits cover the whole
/// timestamp structure: the top 16 bits are attributes and are dropped, and at
/// most 48 bits of milliseconds remain.
pub fn decode_timestamp(label: &str, raw: &str, kind: RawKind) -> Result<String, DecodeError> {
    let all_set = match kind {
        RawKind::Binary => raw.chars().all(|c| c == '1'),
        RawKind::Hexadecimal => raw.chars().all(|c| c.eq_ignore_ascii_case(&'f')),
    };
    if all_set && !raw.is_empty() {
        return Ok(TIMESTAMP_NOT_AVAILABLE.to_string());
    }

    let value = parse_integer(label, raw, kind)?;
    let millis = match kind {
        RawKind::Binary => value,
        RawKind::Hexadecimal => {
            let keep = (raw.len() * 4)
                .saturating_sub(TIMESTAMP_HEADER_BITS)
                .min(TIMESTAMP_BITS);
            value & ((1u128 << keep) - 1)
        }
    };

    let datetime = i64::try_from(millis)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .context(TimestampOutOfRangeSnafu { millis })?;

    Ok(format!("{} GMT", datetime.format("%Y-%m-%d %H:%M:%S%.3f")))
}

/// Renders one report line: `"{label}: {value}{suffix}\n"`.
pub fn render_for_report(
    label: &str,
    raw: &str,
    kind: RawKind,
    format: Option<DisplayFormat>,
) -> Result<String, DecodeError> {
    let Some(format) = format else {
        return Ok(format!("{label}: {}{raw}\n", kind.prefix()));
    };

    if let Some((scaling, suffix)) = format.integer() {
        let value = parse_integer(label, raw, kind)?;
        let scaled = scaling.apply(value).context(ValueOverflowSnafu { label })?;
        return Ok(format!("{label}: {scaled}{suffix}\n"));
    }

    match format {
        DisplayFormat::Uppercase => Ok(format!("{label}: {}\n", raw.to_uppercase())),
        _ => Ok(format!("{label}: {}\n", decode_timestamp(label, raw, kind)?)),
    }
}

/// Produces the structured entry for a field: its output key and value.
pub fn render_for_structure(
    key: &str,
    raw: &str,
    kind: RawKind,
    format: Option<OutputFormat>,
) -> Result<(String, Value), DecodeError> {
    let value = match format {
        None => Value::Text(format!("{}{raw}", kind.prefix())),
        Some(OutputFormat::Uppercase) => Value::Text(raw.to_uppercase()),
        Some(OutputFormat::Timestamp) => Value::Text(decode_timestamp(key, raw, kind)?),
        Some(format) => {
            let scaling = format.scaling().unwrap_or(Scaling::Identity);
            let value = parse_integer(key, raw, kind)?;
            Value::Int(
                scaling
                    .apply(value)
                    .context(ValueOverflowSnafu { label: key })?,
            )
        }
    };

    Ok((key.to_string(), value))
}
