//! Schema interpreter: walks a [Layout] over a byte window and builds either
//! the human-readable report or the structured result.
//!
//! Both walks are pure. Byte-granularity layouts slice each field's bytes out
//! of the window and read them little-endian; bit-granularity layouts read the
//! whole window little-endian and address bits from the least significant end.

use snafu::OptionExt;
use tracing::{debug, trace};

use crate::{
    assembly::{ByteOrder, assemble},
    bits::{bit_slice, bit_string},
    errors::{DecodeError, WindowTooShortSnafu},
    field::{FieldDescriptor, Granularity, Layout},
    format::{RawKind, render_for_report, render_for_structure},
    value::{Record, Value},
};

/// Renders `layout` over `bytes` as indented report text, one line per field.
///
/// Verbose-only fields are skipped unless `verbose` is set.
pub fn to_report(layout: &Layout, bytes: &[u8], verbose: bool) -> Result<String, DecodeError> {
    to_report_at_depth(layout, bytes, verbose, 0)
}

/// Same as [to_report], with every line nested `depth` levels deep.
pub fn to_report_at_depth(
    layout: &Layout,
    bytes: &[u8],
    verbose: bool,
    depth: usize,
) -> Result<String, DecodeError> {
    debug!(
        fields = layout.fields.len(),
        len = bytes.len(),
        verbose,
        "rendering report"
    );

    let mut out = String::new();
    report_into(&mut out, layout, bytes, verbose, depth)?;
    Ok(out)
}

/// Decodes the keyed fields of `layout` over `bytes` into a [Record].
pub fn to_structure(layout: &Layout, bytes: &[u8]) -> Result<Record, DecodeError> {
    debug!(
        fields = layout.fields.len(),
        len = bytes.len(),
        "decoding structured result"
    );

    structure_of(layout, bytes)
}

/// Line prefix for a given nesting depth: `""`, `"\t- "`, `"\t\t-- "`, ...
pub fn prefix(depth: usize) -> String {
    if depth == 0 {
        return String::new();
    }

    format!("{}{} ", "\t".repeat(depth), "-".repeat(depth))
}

fn report_into(
    out: &mut String,
    layout: &Layout,
    window: &[u8],
    verbose: bool,
    depth: usize,
) -> Result<(), DecodeError> {
    let shown = layout
        .fields
        .iter()
        .filter(|field| verbose || !field.verbose_only);

    match layout.granularity {
        Granularity::Byte => {
            for field in shown {
                let bytes = field.window(window)?;
                trace!(label = %field.label, offset = field.offset, size = field.size, "byte field");

                match &field.child {
                    Some(child) if !verbose => {
                        report_heading(out, field, depth);
                        report_into(out, child, bytes, verbose, depth + 1)?;
                    }
                    _ => {
                        let hex = assemble(bytes, ByteOrder::LittleEndian);
                        out.push_str(&prefix(depth));
                        out.push_str(&render_for_report(
                            &field.label,
                            &hex,
                            RawKind::Hexadecimal,
                            field.display_format,
                        )?);

                        if let Some(child) = &field.child {
                            report_into(out, child, bytes, verbose, depth + 1)?;
                        }
                    }
                }
            }
        }
        Granularity::Bit => {
            let bits = bit_string(window, ByteOrder::LittleEndian);

            for field in shown {
                let raw = bit_field(&bits, field)?;
                trace!(label = %field.label, offset = field.offset, size = field.size, "bit field");

                out.push_str(&prefix(depth));
                out.push_str(&render_for_report(
                    &field.label,
                    raw,
                    RawKind::Binary,
                    field.display_format,
                )?);
            }
        }
    }

    Ok(())
}

/// Non-verbose line for a field with a child layout: the label alone, its
/// value being left to the child fields below it.
fn report_heading(out: &mut String, field: &FieldDescriptor, depth: usize) {
    out.push_str(&prefix(depth));
    out.push_str(&field.label);
    out.push_str(":\n");
}

fn structure_of(layout: &Layout, window: &[u8]) -> Result<Record, DecodeError> {
    let mut record = Record::new();
    let keyed = layout
        .fields
        .iter()
        .filter_map(|field| field.output_key.as_deref().map(|key| (key, field)));

    match layout.granularity {
        Granularity::Byte => {
            for (key, field) in keyed {
                let bytes = field.window(window)?;

                match &field.child {
                    Some(child) if child.has_output_key() => {
                        record.insert(key.to_string(), Value::Record(structure_of(child, bytes)?));
                    }
                    _ => {
                        let hex = assemble(bytes, ByteOrder::LittleEndian);
                        let (key, value) = render_for_structure(
                            key,
                            &hex,
                            RawKind::Hexadecimal,
                            field.output_format,
                        )?;
                        record.insert(key, value);
                    }
                }
            }
        }
        Granularity::Bit => {
            let bits = bit_string(window, ByteOrder::LittleEndian);

            for (key, field) in keyed {
                let raw = bit_field(&bits, field)?;
                let (key, value) =
                    render_for_structure(key, raw, RawKind::Binary, field.output_format)?;
                record.insert(key, value);
            }
        }
    }

    Ok(record)
}

fn bit_field<'a>(bits: &'a str, field: &FieldDescriptor) -> Result<&'a str, DecodeError> {
    bit_slice(bits, field.offset, field.size).context(WindowTooShortSnafu {
        label: field.label.as_str(),
        needed: field.needed(),
        available: bits.len(),
        unit: "bit",
    })
}
