//! The machine word and its wire representation.
//!
//! The emulated machine is big-endian and two's complement. Values inside
//! the model are host integers; whenever a value crosses into memory bytes
//! or a raw machine word it goes through the conversions here, which are
//! written with explicit shifts and masks so they do not depend on the
//! host's byte order.

/// Bytes per machine word.
pub const WORD_BYTES: u32 = 4;

/// The sign bit of a 32-bit word.
pub const SIGN_BIT: u32 = 0x8000_0000;

// ============================================================================
// Byte order
// ============================================================================

/// Split a word into bytes, most significant first.
#[inline]
pub fn to_be_bytes(word: u32) -> [u8; 4] {
    [
        ((word >> 24) & 0xFF) as u8,
        ((word >> 16) & 0xFF) as u8,
        ((word >> 8) & 0xFF) as u8,
        (word & 0xFF) as u8,
    ]
}

/// Join bytes, most significant first, into a word.
#[inline]
pub fn from_be_bytes(bytes: [u8; 4]) -> u32 {
    (u32::from(bytes[0]) << 24)
        | (u32::from(bytes[1]) << 16)
        | (u32::from(bytes[2]) << 8)
        | u32::from(bytes[3])
}

// ============================================================================
// Sign representation
// ============================================================================

/// Encode a host integer as a two's-complement machine word.
#[inline]
pub fn to_wire(value: i32) -> u32 {
    let magnitude = value.unsigned_abs();
    if value < 0 {
        (!magnitude).wrapping_add(1)
    } else {
        magnitude
    }
}

/// Decode a two's-complement machine word into a host integer.
#[inline]
pub fn from_wire(word: u32) -> i32 {
    if word & SIGN_BIT == 0 {
        word as i32
    } else {
        // i32::MIN has no positive counterpart; wrapping_neg maps it to itself
        let magnitude = (!word).wrapping_add(1);
        (magnitude as i32).wrapping_neg()
    }
}

/// Pack four ASCII characters into a word, first character in the high byte.
pub fn ascii_word(text: [u8; 4]) -> u32 {
    from_be_bytes(text)
}
