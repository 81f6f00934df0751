//! The standard head/tail ABI codec and the non-standard packed codec.
//!
//! Two entry-point families are exposed, mirroring the distinction between
//! encoding/decoding a single value and encoding/decoding a function's
//! parameter list:
//!
//! - `*_single`: treats a lone [`crate::descriptor::Descriptor`] as the sole
//!   item of an implicit one-element sequence. If that descriptor is
//!   dynamic, the output carries a leading offset word pointing at its own
//!   tail, exactly as if it were wrapped in a one-element tuple.
//! - `*_params`: treats a [`crate::descriptor::TupleDescriptor`]'s children as
//!   the top-level sequence directly, with no enclosing offset word. This is
//!   what Solidity function call data and return data use.
//!
//! The two agree exactly when every element of the tuple happens to be
//! non-dynamic, and differ by one offset word whenever the tuple (as a
//! whole) is dynamic but is being encoded as a single value rather than as a
//! parameter list.

mod decoder;
mod encoder;
mod packed;

pub use decoder::{decode_index, decode_params, decode_single};
pub use encoder::{byte_length_params, byte_length_single, encode_params, encode_single, validate};
pub use packed::{byte_length_packed, decode_packed, decode_params_packed, encode_packed, encode_params_packed};

use num_bigint::{BigInt, Sign};

use crate::primitives::round_up;

/// Encodes `v` as a big-endian integer, sign-extended (or zero-extended) on
/// the left to exactly `width` bytes. `signed` must match the descriptor's
/// own signedness: an unsigned value uses its plain magnitude bytes (no
/// two's-complement sign byte), since `to_signed_bytes_be` would otherwise
/// grow by one byte whenever the magnitude's top bit is set, overflowing a
/// width sized only for the declared bit count.
///
/// # Panics
///
/// Panics if `v`'s minimal representation doesn't fit in `width` bytes;
/// callers must validate the value against its descriptor's bit width first.
pub(crate) fn encode_int_fixed_width(v: &BigInt, width: usize, signed: bool) -> Vec<u8> {
    let minimal = if signed { v.to_signed_bytes_be() } else { v.to_bytes_be().1 };
    assert!(minimal.len() <= width, "integer does not fit in {width} bytes");
    let fill = if v.sign() == Sign::Minus { 0xFFu8 } else { 0u8 };
    let mut out = vec![fill; width];
    let start = width - minimal.len();
    out[start..].copy_from_slice(&minimal);
    out
}

/// Writes `v` as a 32-byte head word (the standard ABI scalar encoding).
pub(crate) fn encode_int_word(v: &BigInt, signed: bool) -> [u8; 32] {
    let bytes = encode_int_fixed_width(v, 32, signed);
    let mut word = [0u8; 32];
    word.copy_from_slice(&bytes);
    word
}

/// Decodes a signed two's-complement big-endian integer from exactly `buf.len()` bytes.
pub(crate) fn decode_int_signed(buf: &[u8]) -> BigInt {
    BigInt::from_signed_bytes_be(buf)
}

/// Decodes an unsigned big-endian integer from exactly `buf.len()` bytes.
pub(crate) fn decode_int_unsigned(buf: &[u8]) -> BigInt {
    BigInt::from_bytes_be(Sign::Plus, buf)
}

/// Writes `v` as a 32-byte unsigned big-endian head word.
pub(crate) fn word_from_u64(v: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&v.to_be_bytes());
    word
}

/// The number of bytes needed to hold `bits` bits of a packed (non-standard)
/// integer encoding.
pub(crate) fn packed_int_width(bits: u16) -> usize {
    (bits as usize + 7) / 8
}

/// Rounds `len` up to the next multiple of the ABI word size, for tail padding.
pub(crate) fn padded_len(len: usize) -> usize {
    round_up(len, crate::descriptor::WORD_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_word_with_high_bit_set_does_not_grow_past_width() {
        // 2^255: a valid uint256 whose magnitude's top bit is set, so a
        // signed two's-complement encoding would need a 33rd sign byte.
        let v = BigInt::from(2u8).pow(255);
        let word = encode_int_word(&v, false);
        assert_eq!(word[0], 0x80);
        assert_eq!(decode_int_unsigned(&word), v);
    }

    #[test]
    fn signed_word_with_high_bit_set_still_sign_extends() {
        let v = -BigInt::from(1);
        let word = encode_int_word(&v, true);
        assert_eq!(word, [0xFFu8; 32]);
    }

    #[test]
    fn unsigned_packed_width_at_top_of_range_does_not_panic() {
        // uint8 value 200: its plain magnitude is one byte, but
        // to_signed_bytes_be() would need two since bit 7 is set.
        let bytes = encode_int_fixed_width(&BigInt::from(200u8), 1, false);
        assert_eq!(bytes, vec![200u8]);
    }
}
