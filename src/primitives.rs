//! Integer and byte primitives shared by the ABI codec and the RLP reader.
//!
//! These are small, total functions: they never panic on well-formed input
//! and reject negative lengths rather than wrapping.

use cfg_if::cfg_if;
use num_bigint::{BigInt, Sign};
use std::fmt;

/// A `Debug`-only view of a byte slice that hex-dumps its contents rather
/// than printing it as a `[u8]` array, for use in `tracing` fields over
/// buffers that may be large or partially consumed.
pub struct HexDump<'a>(pub &'a [u8]);

cfg_if! {
    if #[cfg(feature = "hex")] {
        impl fmt::Debug for HexDump<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{} bytes: {}", self.0.len(), hex::encode(self.0))
            }
        }
    } else {
        impl fmt::Debug for HexDump<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{} bytes", self.0.len())
            }
        }
    }
}

/// The position of the most-significant `1` bit in `x`, or `0` if `x == 0`.
///
/// For negative numbers this follows the two's-complement convention used
/// throughout the ABI codec: `bit_len(-x-1) == bit_len(x)`, i.e. the bit
/// length of a negative number is the bit length of the magnitude of its
/// bitwise complement. This matches the number of bits needed, excluding the
/// sign bit, to represent the value in two's complement.
pub fn bit_len(x: &BigInt) -> u32 {
    match x.sign() {
        Sign::NoSign => 0,
        Sign::Plus => x.bits() as u32,
        Sign::Minus => {
            // -x-1 == !x (bitwise complement for two's complement integers).
            let complement = -(x + 1);
            complement.bits() as u32
        }
    }
}

/// `true` if `x` fits in an ABI integer of `bits` width with the given
/// signedness: for signed, `x`'s two's-complement bit length (excluding the
/// sign bit) must not exceed `bits - 1`; for unsigned, `x` must be
/// non-negative and fit in `bits` bits.
pub fn fits_in_bits(x: &BigInt, bits: u16, signed: bool) -> bool {
    if signed {
        bit_len(x) <= (bits - 1) as u32
    } else {
        x.sign() != Sign::Minus && bit_len(x) <= bits as u32
    }
}

/// Writes `v` to `dst` as a variable-length, minimal-byte, big-endian
/// encoding (no leading zero bytes other than a single `0x00` for `v == 0`).
///
/// Returns the number of bytes written.
pub fn put_long(v: u64, dst: &mut Vec<u8>) -> usize {
    if v == 0 {
        dst.push(0);
        return 1;
    }
    let full = v.to_be_bytes();
    let first_nonzero = full.iter().position(|&b| b != 0).unwrap_or(full.len() - 1);
    dst.extend_from_slice(&full[first_nonzero..]);
    full.len() - first_nonzero
}

/// Reads a `len`-byte big-endian unsigned integer from `src` at `off`.
///
/// # Panics
///
/// Panics if `off + len` exceeds `src.len()`; callers are expected to bounds
/// check against a known buffer length before calling, as this primitive has
/// no error type of its own; it is total over well-formed inputs.
pub fn get_long(src: &[u8], off: usize, len: usize) -> u64 {
    let mut v: u64 = 0;
    for &b in &src[off..off + len] {
        v = (v << 8) | u64::from(b);
    }
    v
}

/// Rounds `n` up to the nearest multiple of `unit`. `unit == 0` rounds to `n`
/// unchanged (there is no well-defined multiple of zero).
pub fn round_up(n: usize, unit: usize) -> usize {
    if unit == 0 {
        return n;
    }
    let remainder = n % unit;
    if remainder == 0 {
        n
    } else {
        n + (unit - remainder)
    }
}

/// Returns `true` iff `n` is an exact multiple of `unit`.
pub fn is_multiple(n: usize, unit: usize) -> bool {
    unit != 0 && n % unit == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "hex")]
    #[test]
    fn hex_dump_formats_as_hex() {
        let bytes = [0xde, 0xad, 0xbe, 0xef];
        assert_eq!(format!("{:?}", HexDump(&bytes)), "4 bytes: deadbeef");
    }

    #[test]
    fn bit_len_of_zero_and_positive() {
        assert_eq!(bit_len(&BigInt::from(0)), 0);
        assert_eq!(bit_len(&BigInt::from(1)), 1);
        assert_eq!(bit_len(&BigInt::from(255)), 8);
        assert_eq!(bit_len(&BigInt::from(256)), 9);
    }

    #[test]
    fn bit_len_of_negative_mirrors_complement() {
        // -1 == !0, bit_len(0) == 0
        assert_eq!(bit_len(&BigInt::from(-1)), 0);
        // -128 == !127, bit_len(127) == 7
        assert_eq!(bit_len(&BigInt::from(-128)), 7);
        // -129 == !128, bit_len(128) == 8
        assert_eq!(bit_len(&BigInt::from(-129)), 8);
    }

    #[test]
    fn fits_in_bits_unsigned_boundary() {
        assert!(fits_in_bits(&BigInt::from(255), 8, false));
        assert!(!fits_in_bits(&BigInt::from(256), 8, false));
        assert!(!fits_in_bits(&BigInt::from(-1), 8, false));
    }

    #[test]
    fn fits_in_bits_signed_boundary() {
        assert!(fits_in_bits(&BigInt::from(127), 8, true));
        assert!(!fits_in_bits(&BigInt::from(128), 8, true));
        assert!(fits_in_bits(&BigInt::from(-128), 8, true));
        assert!(!fits_in_bits(&BigInt::from(-129), 8, true));
    }

    #[test]
    fn put_long_is_minimal() {
        let mut buf = Vec::new();
        assert_eq!(put_long(0, &mut buf), 1);
        assert_eq!(buf, vec![0]);

        let mut buf = Vec::new();
        assert_eq!(put_long(0x0102, &mut buf), 2);
        assert_eq!(buf, vec![0x01, 0x02]);
    }

    #[test]
    fn get_long_round_trips_put_long() {
        for v in [0u64, 1, 255, 256, 0xdead_beef, u64::MAX] {
            let mut buf = Vec::new();
            let len = put_long(v, &mut buf);
            assert_eq!(get_long(&buf, 0, len), v);
        }
    }

    #[test]
    fn round_up_rounds_to_next_multiple() {
        assert_eq!(round_up(0, 32), 0);
        assert_eq!(round_up(1, 32), 32);
        assert_eq!(round_up(32, 32), 32);
        assert_eq!(round_up(33, 32), 64);
    }

    #[test]
    fn is_multiple_checks_alignment() {
        assert!(is_multiple(0, 32));
        assert!(is_multiple(64, 32));
        assert!(!is_multiple(33, 32));
    }
}
