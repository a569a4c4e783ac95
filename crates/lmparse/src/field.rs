//! Field descriptors and layouts used to describe a log page.

use std::str::FromStr;

use snafu::{OptionExt, ensure};

use crate::{
    errors::{
        DecodeError, FieldOutOfBoundsSnafu, NestedBitLayoutSnafu, SchemaError,
        UnknownGranularitySnafu, WindowTooShortSnafu, ZeroSizedFieldSnafu,
    },
    format::{DisplayFormat, OutputFormat},
};

/// Unit in which a layout measures the offsets and sizes of its fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Byte,
    Bit,
}

impl Granularity {
    /// Tag used in schema documents and error messages.
    pub fn tag(self) -> &'static str {
        match self {
            Granularity::Byte => "byte",
            Granularity::Bit => "bit",
        }
    }

    /// Number of units in a window of `bytes` bytes.
    pub fn units(self, bytes: usize) -> usize {
        match self {
            Granularity::Byte => bytes,
            Granularity::Bit => bytes.saturating_mul(8),
        }
    }
}

impl FromStr for Granularity {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "byte" => Ok(Granularity::Byte),
            "bit" => Ok(Granularity::Bit),
            _ => UnknownGranularitySnafu { tag: s }.fail(),
        }
    }
}

/// One value within a log page.
///
/// `offset` and `size` are counted in the units of the parent [Layout].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Name shown in the report.
    pub label: String,
    /// Key in the structured result. Fields without one are report-only.
    pub output_key: Option<String>,
    /// Requirement identifier from the log page specification, e.g. `LMDATA-12`.
    pub requirement: Option<String>,
    pub offset: usize,
    pub size: usize,
    pub display_format: Option<DisplayFormat>,
    pub output_format: Option<OutputFormat>,
    /// Reserved or padding field, shown only in verbose reports.
    pub verbose_only: bool,
    /// Finer-grained decomposition of this field's window.
    pub child: Option<Layout>,
}

impl FieldDescriptor {
    pub fn new(label: impl Into<String>, offset: usize, size: usize) -> Self {
        FieldDescriptor {
            label: label.into(),
            output_key: None,
            requirement: None,
            offset,
            size,
            display_format: None,
            output_format: None,
            verbose_only: false,
            child: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.output_key = Some(key.into());
        self
    }

    pub fn with_requirement(mut self, id: impl Into<String>) -> Self {
        self.requirement = Some(id.into());
        self
    }

    pub fn with_display(mut self, format: DisplayFormat) -> Self {
        self.display_format = Some(format);
        self
    }

    pub fn with_output(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn verbose_only(mut self) -> Self {
        self.verbose_only = true;
        self
    }

    pub fn with_child(mut self, layout: Layout) -> Self {
        self.child = Some(layout);
        self
    }

    /// First unit past the end of this field, or `None` if it is not
    /// addressable.
    pub fn end(&self) -> Option<usize> {
        self.offset.checked_add(self.size)
    }

    /// Window length this field needs, saturated for error reports.
    pub(crate) fn needed(&self) -> usize {
        self.offset.saturating_add(self.size)
    }

    /// Slices this field's bytes out of a byte-granularity window.
    pub(crate) fn window<'a>(&self, bytes: &'a [u8]) -> Result<&'a [u8], DecodeError> {
        self.end()
            .and_then(|end| bytes.get(self.offset..end))
            .context(WindowTooShortSnafu {
                label: self.label.as_str(),
                needed: self.needed(),
                available: bytes.len(),
                unit: "byte",
            })
    }
}

/// An ordered set of fields describing a contiguous byte window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub granularity: Granularity,
    pub fields: Vec<FieldDescriptor>,
}

impl Layout {
    pub fn new(granularity: Granularity, fields: Vec<FieldDescriptor>) -> Self {
        Layout {
            granularity,
            fields,
        }
    }

    /// A layout whose offsets and sizes are in bytes.
    pub fn bytes(fields: Vec<FieldDescriptor>) -> Self {
        Layout::new(Granularity::Byte, fields)
    }

    /// A layout whose offsets and sizes are in bits, bit 0 being the least
    /// significant bit of the little-endian window.
    pub fn bits(fields: Vec<FieldDescriptor>) -> Self {
        Layout::new(Granularity::Bit, fields)
    }

    /// Smallest byte window that holds every field, or `None` when a field
    /// end overflows.
    pub fn required_len(&self) -> Option<usize> {
        let mut end = 0;
        for field in &self.fields {
            end = end.max(field.end()?);
        }

        match self.granularity {
            Granularity::Byte => Some(end),
            Granularity::Bit => Some(end.div_ceil(8)),
        }
    }

    /// Whether any field of this layout appears in the structured result.
    ///
    /// Only keyed fields are traversed when building the structured result, so
    /// a keyed descendant is reachable exactly when a direct field is keyed.
    pub fn has_output_key(&self) -> bool {
        self.fields.iter().any(|field| field.output_key.is_some())
    }

    /// Verifies that every field fits a window of `window_len` bytes, and that
    /// every child layout fits the window of the field that carries it.
    pub fn check(&self, window_len: usize) -> Result<(), SchemaError> {
        let window = self.granularity.units(window_len);
        let unit = self.granularity.tag();

        for field in &self.fields {
            ensure!(
                field.size > 0,
                ZeroSizedFieldSnafu {
                    label: field.label.as_str()
                }
            );
            ensure!(
                field.end().is_some_and(|end| end <= window),
                FieldOutOfBoundsSnafu {
                    label: field.label.as_str(),
                    end: field.needed(),
                    window,
                    unit,
                }
            );

            if let Some(child) = &field.child {
                ensure!(
                    self.granularity == Granularity::Byte,
                    NestedBitLayoutSnafu {
                        label: field.label.as_str()
                    }
                );
                child.check(field.size)?;
            }
        }

        Ok(())
    }
}
