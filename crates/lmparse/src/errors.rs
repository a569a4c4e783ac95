//! Error types for schema construction, decoding, input reading and validation.

use std::path::PathBuf;

use snafu::Snafu;

/// Errors produced while building or loading a [crate::field::Layout].
///
/// These are schema-authoring defects: the shipped OCP2 schema never
/// produces them.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SchemaError {
    /// Layout granularity tag is neither `byte` nor `bit`.
    #[snafu(display("unknown layout granularity '{tag}'"))]
    UnknownGranularity { tag: String },
    /// Raw value kind is neither `binary` nor `hexadecimal`.
    #[snafu(display("unknown raw value kind '{tag}'"))]
    UnknownRawKind { tag: String },
    #[snafu(display("unknown display format '{tag}'"))]
    UnknownDisplayFormat { tag: String },
    #[snafu(display("unknown output format '{tag}'"))]
    UnknownOutputFormat { tag: String },
    /// Field has a size of zero.
    #[snafu(display("field '{label}' has zero size"))]
    ZeroSizedField { label: String },
    /// Field extends past the window of its parent layout.
    #[snafu(display("field '{label}' ends at {unit} {end}, beyond its {window}-{unit} window"))]
    FieldOutOfBounds {
        label: String,
        end: usize,
        window: usize,
        unit: &'static str,
    },
    /// A bit-granularity field carries a child layout.
    #[snafu(display("bit field '{label}' cannot carry a child layout"))]
    NestedBitLayout { label: String },
    /// Schema document is not valid JSON or has the wrong shape.
    #[snafu(display("invalid schema document: {message}"))]
    Document { message: String },
}

/// Errors produced by [crate::schema::to_report] and [crate::schema::to_structure].
#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(visibility(pub(crate)))]
pub enum DecodeError {
    /// Input is shorter than the window a field needs.
    #[snafu(display(
        "field '{label}' needs {unit}s up to {needed}, but only {available} are available"
    ))]
    WindowTooShort {
        label: String,
        needed: usize,
        available: usize,
        unit: &'static str,
    },
    /// Raw string contains a digit outside its radix.
    #[snafu(display("'{raw}' is not a valid {kind} string"))]
    InvalidDigits { raw: String, kind: &'static str },
    /// Raw value has more significant bits than an integer result can hold.
    #[snafu(display("value of '{label}' is wider than 128 bits"))]
    ValueTooWide { label: String },
    /// Scaled value does not fit the integer result.
    #[snafu(display("scaled value of '{label}' overflows"))]
    ValueOverflow { label: String },
    /// Millisecond count cannot be represented as a calendar date.
    #[snafu(display("timestamp of {millis} ms is out of range"))]
    TimestampOutOfRange { millis: u128 },
}

/// Errors produced while reading a log capture.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum InputError {
    #[snafu(display("failed to read {}: {source}", path.display()))]
    ReadLog {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A JSON capture that is not a decoded latency monitor log.
    #[snafu(display("invalid JSON log capture: {message}"))]
    JsonLog { message: String },
}

/// Errors produced by [crate::validate].
#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(visibility(pub(crate)))]
pub enum ValidationError {
    /// Unknown validation profile name.
    #[snafu(display("unknown validation profile '{name}'"))]
    UnknownProfile { name: String },
    /// A bucket required by the profile is absent from the decoded log.
    #[snafu(display("[{drive}]: '{key}' is not present in the decoded log"))]
    MissingBucket { drive: String, key: String },
    /// A bucket or counter is not of the expected shape.
    #[snafu(display("[{drive}]: '{key}' does not hold integer counters"))]
    UnexpectedValue { drive: String, key: String },
    /// A block-size token was required but the path has none.
    #[snafu(display("block size should be specified in file name '{path}'"))]
    MissingBlockSize { path: String },
    /// Drives exceeded the latency threshold for four or more block sizes.
    #[snafu(display(
        "drives with latency outliers for four or more block sizes: {}",
        drives.join(", ")
    ))]
    LatencyOutliers { drives: Vec<String> },
}
