//! Bit-string helpers for bit-granularity layouts.
//!
//! Bits are addressed from the least significant end: bit 0 is the low bit of
//! the assembled window, which is the last character of its bit string.

use std::fmt::Write;

use crate::assembly::ByteOrder;

/// Expands a byte window into a zero-padded binary string of `8 * bytes.len()`
/// characters, most significant bit first.
pub fn bit_string(bytes: &[u8], order: ByteOrder) -> String {
    let mut out = String::with_capacity(bytes.len() * 8);

    let mut push = |byte: &u8| {
        // Writing into a String cannot fail.
        let _ = write!(out, "{byte:08b}");
    };

    match order {
        ByteOrder::LittleEndian => bytes.iter().rev().for_each(&mut push),
        ByteOrder::BigEndian => bytes.iter().for_each(&mut push),
    }

    out
}

/// Returns the `size` bits starting at bit `offset` (counted from the least
/// significant end), or `None` when they do not fit in `bits`.
pub fn bit_slice(bits: &str, offset: usize, size: usize) -> Option<&str> {
    let end = bits.len().checked_sub(offset)?;
    let start = end.checked_sub(size)?;

    bits.get(start..end)
}
