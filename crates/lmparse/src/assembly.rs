//! Assembly of byte windows into hex strings for numeric conversion.

/// Order in which the bytes of a multi-byte window are stored in the log page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

impl Default for ByteOrder {
    fn default() -> Self {
        ByteOrder::LittleEndian
    }
}

/// Concatenates `bytes` into a lowercase hex string, most significant byte first.
///
/// Little-endian windows are reversed before concatenation, so
/// `[0x07, 0xd7, 0xa2]` becomes `"a2d707"`; big-endian windows are taken as-is
/// and give `"07d7a2"`.
pub fn assemble(bytes: &[u8], order: ByteOrder) -> String {
    match order {
        ByteOrder::LittleEndian => {
            let reversed: Vec<u8> = bytes.iter().rev().copied().collect();
            hex::encode(reversed)
        }
        ByteOrder::BigEndian => hex::encode(bytes),
    }
}
