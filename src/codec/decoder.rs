use num_bigint::BigInt;

use crate::codec::{decode_int_signed, decode_int_unsigned, encode_params, encode_single, padded_len};
use crate::config::{Config, OffsetMode};
use crate::descriptor::{Descriptor, TupleDescriptor};
use crate::error::{DecodeError, PathFrame, Result, ValidationError, WithFrame};
use crate::primitives::{fits_in_bits, get_long, HexDump};
use crate::value::Value;

const OFFSET_MAX: u64 = 0x7fff_ffff;

/// Decodes `bytes` against `descriptor` as if it were the sole element of a
/// one-item sequence (see [`crate::codec`] module docs).
///
/// If `config.verify_reencoding` is set, re-encodes the decoded value and
/// fails with [`DecodeError::ReencodingMismatch`] unless it reproduces
/// `bytes` exactly.
pub fn decode_single(descriptor: &Descriptor, bytes: &[u8], config: &Config) -> Result<Value> {
    tracing::trace!(remaining = ?HexDump(bytes), "decode_single");
    let (mut values, consumed) = decode_sequence(&[descriptor], bytes, config, PathFrame::TupleIndex)?;
    if consumed != bytes.len() {
        return Err(DecodeError::TrailingBytes(bytes.len() - consumed).into());
    }
    let value = values.remove(0);
    if config.verify_reencoding {
        verify_reencoding(bytes, encode_single(descriptor, &value))?;
    }
    Ok(value)
}

/// Decodes `bytes` against `tuple`'s children as a function parameter list.
///
/// If `config.verify_reencoding` is set, re-encodes the decoded values and
/// fails with [`DecodeError::ReencodingMismatch`] unless it reproduces
/// `bytes` exactly.
pub fn decode_params(tuple: &TupleDescriptor, bytes: &[u8], config: &Config) -> Result<Vec<Value>> {
    tracing::trace!(len = bytes.len(), arity = tuple.arity(), "decode_params");
    let descriptors: Vec<&Descriptor> = tuple.children().iter().collect();
    let (values, consumed) = decode_sequence(&descriptors, bytes, config, PathFrame::TupleIndex)?;
    if consumed != bytes.len() {
        return Err(DecodeError::TrailingBytes(bytes.len() - consumed).into());
    }
    if config.verify_reencoding {
        verify_reencoding(bytes, encode_params(tuple, &values))?;
    }
    Ok(values)
}

fn verify_reencoding(original: &[u8], reencoded: Result<Vec<u8>>) -> Result<()> {
    match reencoded {
        Ok(bytes) if bytes == original => Ok(()),
        _ => {
            tracing::debug!("reencoding mismatch during decode verification");
            Err(DecodeError::ReencodingMismatch.into())
        }
    }
}

/// Decodes only the `index`-th child of `tuple` out of `bytes`, using the
/// tuple's precomputed static head sizes to skip over the other children
/// without decoding them.
pub fn decode_index(tuple: &TupleDescriptor, bytes: &[u8], index: usize, config: &Config) -> Result<Value> {
    if index >= tuple.arity() {
        return Err(ValidationError::LengthMismatch {
            expected: tuple.arity(),
            actual: index + 1,
        }
        .into());
    }
    let head_total: usize = tuple.children().iter().map(Descriptor::head_length).sum();
    if bytes.len() < head_total {
        return Err(DecodeError::Truncated {
            needed: head_total,
            available: bytes.len(),
        }
        .into());
    }
    let cursor: usize = tuple.children()[..index].iter().map(Descriptor::head_length).sum();
    let target = &tuple.children()[index];
    let frame = PathFrame::TupleIndex(index);
    if target.is_dynamic() {
        let offset = read_offset_word(&bytes[cursor..cursor + 32]).with_frame(frame)?;
        let abs = offset as usize;
        if abs > bytes.len() {
            return Err(DecodeError::Truncated {
                needed: abs,
                available: bytes.len(),
            }
            .into())
            .with_frame(frame);
        }
        decode_element(target, &bytes[abs..], config)
            .map(|(v, _)| v)
            .with_frame(frame)
    } else {
        decode_static(target, &bytes[cursor..cursor + target.head_length()])
            .map(|(v, _)| v)
            .with_frame(frame)
    }
}

/// Decodes a top-level sequence of sibling descriptors sharing one offset
/// space. Returns the decoded values and the number of bytes consumed
/// (head length plus the farthest tail byte reached).
fn decode_sequence(
    descriptors: &[&Descriptor],
    buf: &[u8],
    config: &Config,
    frame: impl Fn(usize) -> PathFrame,
) -> Result<(Vec<Value>, usize)> {
    let head_total: usize = descriptors.iter().map(|d| d.head_length()).sum();
    if buf.len() < head_total {
        return Err(DecodeError::Truncated {
            needed: head_total,
            available: buf.len(),
        }
        .into());
    }
    let mut values = Vec::with_capacity(descriptors.len());
    let mut cursor = 0usize;
    let mut tail_cursor = head_total as u64;
    for (i, d) in descriptors.iter().enumerate() {
        if d.is_dynamic() {
            let offset = read_offset_word(&buf[cursor..cursor + 32]).with_frame(frame(i))?;
            if offset < tail_cursor {
                return Err(DecodeError::IllegalBackwardsJump {
                    jump: offset,
                    cursor: tail_cursor,
                }
                .into())
                .with_frame(frame(i));
            }
            if offset > tail_cursor && config.offset_mode == OffsetMode::Strict {
                return Err(DecodeError::IllegalOffsetGap {
                    offset,
                    expected: tail_cursor,
                }
                .into())
                .with_frame(frame(i));
            }
            let abs = offset as usize;
            if abs > buf.len() {
                return Err(DecodeError::Truncated {
                    needed: abs,
                    available: buf.len(),
                }
                .into())
                .with_frame(frame(i));
            }
            let (value, consumed) = decode_element(d, &buf[abs..], config).with_frame(frame(i))?;
            values.push(value);
            tail_cursor = abs as u64 + consumed as u64;
        } else {
            let (value, _) = decode_static(d, &buf[cursor..cursor + d.head_length()]).with_frame(frame(i))?;
            values.push(value);
        }
        cursor += d.head_length();
    }
    Ok((values, tail_cursor.max(head_total as u64) as usize))
}

/// Decodes a single dynamic descriptor's value starting at the beginning of
/// `buf` (its own length/offset space). Returns the value and the number of
/// bytes of `buf` it occupies.
fn decode_element(descriptor: &Descriptor, buf: &[u8], config: &Config) -> Result<(Value, usize)> {
    match descriptor {
        Descriptor::Bytes | Descriptor::Str => {
            if buf.len() < 32 {
                return Err(DecodeError::Truncated {
                    needed: 32,
                    available: buf.len(),
                }
                .into());
            }
            let len = read_length_word(&buf[0..32])?;
            let padded = padded_len(len);
            if buf.len() < 32 + padded {
                return Err(DecodeError::Truncated {
                    needed: 32 + padded,
                    available: buf.len(),
                }
                .into());
            }
            let payload = &buf[32..32 + len];
            if buf[32 + len..32 + padded].iter().any(|&b| b != 0) {
                return Err(DecodeError::NonZeroPadding.into());
            }
            let value = if matches!(descriptor, Descriptor::Str) {
                Value::str_from_bytes(payload.to_vec())?
            } else {
                Value::Bytes(payload.to_vec())
            };
            Ok((value, 32 + padded))
        }
        Descriptor::Array { element, length, .. } => {
            if let Some(k) = length {
                let descriptors: Vec<&Descriptor> = std::iter::repeat(element.as_ref()).take(*k).collect();
                let (values, consumed) = decode_sequence(&descriptors, buf, config, PathFrame::ArrayIndex)?;
                Ok((Value::Array(values), consumed))
            } else {
                if buf.len() < 32 {
                    return Err(DecodeError::Truncated {
                        needed: 32,
                        available: buf.len(),
                    }
                    .into());
                }
                let count = read_length_word(&buf[0..32])?;
                let available = buf.len() - 32;
                // Bound count against available bytes before allocating one descriptor per element.
                let min_head = element.head_length().checked_mul(count);
                if min_head.map_or(true, |needed| needed > available) {
                    return Err(DecodeError::Truncated {
                        needed: min_head.unwrap_or(usize::MAX),
                        available,
                    }
                    .into());
                }
                let descriptors: Vec<&Descriptor> = std::iter::repeat(element.as_ref()).take(count).collect();
                let (values, consumed) = decode_sequence(&descriptors, &buf[32..], config, PathFrame::ArrayIndex)?;
                Ok((Value::Array(values), 32 + consumed))
            }
        }
        Descriptor::Tuple(t) => {
            let descriptors: Vec<&Descriptor> = t.children().iter().collect();
            let (values, consumed) = decode_sequence(&descriptors, buf, config, PathFrame::TupleIndex)?;
            Ok((Value::Tuple(values), consumed))
        }
        _ => unreachable!("scalar descriptors are never dynamic"),
    }
}

/// Decodes a non-dynamic descriptor's value from exactly `descriptor.head_length()` bytes.
fn decode_static(descriptor: &Descriptor, buf: &[u8]) -> Result<(Value, usize)> {
    match descriptor {
        Descriptor::Bool
        | Descriptor::Address
        | Descriptor::Int { .. }
        | Descriptor::Fixed { .. }
        | Descriptor::FixedBytes(_)
        | Descriptor::Function => decode_scalar_word(descriptor, buf).map(|v| (v, 32)),
        Descriptor::Array { element, length, .. } => {
            let k = length.expect("non-dynamic array always has a fixed length");
            let descriptors: Vec<&Descriptor> = std::iter::repeat(element.as_ref()).take(k).collect();
            let (values, consumed) = decode_static_sequence(&descriptors, buf, PathFrame::ArrayIndex)?;
            Ok((Value::Array(values), consumed))
        }
        Descriptor::Tuple(t) => {
            let descriptors: Vec<&Descriptor> = t.children().iter().collect();
            let (values, consumed) = decode_static_sequence(&descriptors, buf, PathFrame::TupleIndex)?;
            Ok((Value::Tuple(values), consumed))
        }
        Descriptor::Bytes | Descriptor::Str => unreachable!("dynamic descriptors are never decoded via decode_static"),
    }
}

fn decode_static_sequence(
    descriptors: &[&Descriptor],
    buf: &[u8],
    frame: impl Fn(usize) -> PathFrame,
) -> Result<(Vec<Value>, usize)> {
    let mut values = Vec::with_capacity(descriptors.len());
    let mut cursor = 0usize;
    for (i, d) in descriptors.iter().enumerate() {
        let len = d
            .static_byte_length()
            .expect("a static sequence contains only non-dynamic descriptors");
        if buf.len() < cursor + len {
            return Err(DecodeError::Truncated {
                needed: cursor + len,
                available: buf.len(),
            }
            .into());
        }
        let (value, _) = decode_static(d, &buf[cursor..cursor + len]).with_frame(frame(i))?;
        values.push(value);
        cursor += len;
    }
    Ok((values, cursor))
}

fn decode_scalar_word(descriptor: &Descriptor, word: &[u8]) -> Result<Value> {
    match descriptor {
        Descriptor::Bool => {
            if word[..31].iter().any(|&b| b != 0) {
                return Err(DecodeError::NonZeroPadding.into());
            }
            match word[31] {
                0 => Ok(Value::Bool(false)),
                1 => Ok(Value::Bool(true)),
                other => Err(DecodeError::IllegalBoolean(other).into()),
            }
        }
        Descriptor::Address => {
            if word[..12].iter().any(|&b| b != 0) {
                return Err(DecodeError::NonZeroPadding.into());
            }
            let mut addr = [0u8; 20];
            addr.copy_from_slice(&word[12..32]);
            Ok(Value::Address(addr))
        }
        Descriptor::Int { bits, signed } => {
            let v = if *signed { decode_int_signed(word) } else { decode_int_unsigned(word) };
            check_word_range(&v, *bits, *signed)?;
            Ok(Value::Int(v))
        }
        Descriptor::Fixed { bits, signed, .. } => {
            let v = if *signed { decode_int_signed(word) } else { decode_int_unsigned(word) };
            check_word_range(&v, *bits, *signed)?;
            Ok(Value::Decimal(v))
        }
        Descriptor::FixedBytes(n) => {
            let n = *n as usize;
            if word[n..].iter().any(|&b| b != 0) {
                return Err(DecodeError::NonZeroPadding.into());
            }
            Ok(Value::Bytes(word[..n].to_vec()))
        }
        Descriptor::Function => {
            if word[24..].iter().any(|&b| b != 0) {
                return Err(DecodeError::NonZeroPadding.into());
            }
            let mut f = [0u8; 24];
            f.copy_from_slice(&word[..24]);
            Ok(Value::Function(f))
        }
        _ => unreachable!("not a scalar descriptor"),
    }
}

fn check_word_range(value: &BigInt, bits: u16, signed: bool) -> Result<()> {
    if fits_in_bits(value, bits, signed) {
        Ok(())
    } else {
        Err(DecodeError::IntegerOutOfRange { bits, signed }.into())
    }
}

fn read_offset_word(word: &[u8]) -> Result<u64> {
    if word[..24].iter().any(|&b| b != 0) {
        return Err(DecodeError::OffsetOutOfRange(get_long(word, 24, 8)).into());
    }
    let value = get_long(word, 24, 8);
    if value > OFFSET_MAX {
        return Err(DecodeError::OffsetOutOfRange(value).into());
    }
    Ok(value)
}

fn read_length_word(word: &[u8]) -> Result<usize> {
    read_offset_word(word).map(|v| v as usize)
}
