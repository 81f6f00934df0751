//! The non-standard "packed" encoding: values are
//! concatenated back-to-back at their natural byte width, with no head/tail
//! layout, no offsets, and no padding between elements. It is one-way by
//! construction (Solidity's `abi.encodePacked` is mainly used for hashing),
//! so decoding is only unambiguous when at most one element in a sequence
//! has a value-dependent width.

use super::encoder::validate_element;
use crate::codec::{decode_int_signed, decode_int_unsigned, encode_int_fixed_width, packed_int_width};
use crate::descriptor::{Descriptor, TupleDescriptor};
use crate::error::{DecodeError, PackedDecodeError, PathFrame, Result, ValidationError, WithFrame};
use crate::value::Value;

/// The packed encoding of `value` against `descriptor` alone.
pub fn encode_packed(descriptor: &Descriptor, value: &Value) -> Result<Vec<u8>> {
    validate_element(descriptor, value)?;
    let mut out = Vec::new();
    encode_packed_element(descriptor, value, &mut out)?;
    Ok(out)
}

/// The packed encoding of `values` against `tuple`'s children, concatenated
/// in order with no separators (matching `abi.encodePacked(a, b, c)`).
pub fn encode_params_packed(tuple: &TupleDescriptor, values: &[Value]) -> Result<Vec<u8>> {
    if values.len() != tuple.arity() {
        return Err(ValidationError::LengthMismatch {
            expected: tuple.arity(),
            actual: values.len(),
        }
        .into());
    }
    for (i, (child, value)) in tuple.children().iter().zip(values).enumerate() {
        validate_element(child, value).with_frame(PathFrame::TupleIndex(i))?;
    }
    let mut out = Vec::new();
    for (child, value) in tuple.children().iter().zip(values) {
        encode_packed_element(child, value, &mut out)?;
    }
    Ok(out)
}

/// The exact packed-encoded length of `value` against `descriptor`, without
/// actually encoding it.
pub fn byte_length_packed(descriptor: &Descriptor, value: &Value) -> Result<usize> {
    validate_element(descriptor, value)?;
    packed_value_length(descriptor, value)
}

fn packed_value_length(descriptor: &Descriptor, value: &Value) -> Result<usize> {
    match descriptor {
        Descriptor::Bool => Ok(1),
        Descriptor::Address => Ok(20),
        Descriptor::Int { bits, .. } | Descriptor::Fixed { bits, .. } => Ok(packed_int_width(*bits)),
        Descriptor::FixedBytes(n) => Ok(*n as usize),
        Descriptor::Function => Ok(24),
        Descriptor::Bytes => Ok(value.as_bytes()?.len()),
        Descriptor::Str => Ok(value.as_str()?.len()),
        Descriptor::Array { element, .. } => {
            let mut total = 0;
            for item in value.as_array()? {
                total += packed_value_length(element, item)?;
            }
            Ok(total)
        }
        Descriptor::Tuple(t) => {
            let mut total = 0;
            for (child, item) in t.children().iter().zip(value.as_tuple()?) {
                total += packed_value_length(child, item)?;
            }
            Ok(total)
        }
    }
}

fn encode_packed_element(descriptor: &Descriptor, value: &Value, out: &mut Vec<u8>) -> Result<()> {
    match descriptor {
        Descriptor::Bool => out.push(value.as_bool()? as u8),
        Descriptor::Address => out.extend_from_slice(value.as_address()?),
        Descriptor::Int { bits, signed } => {
            out.extend_from_slice(&encode_int_fixed_width(value.as_int()?, packed_int_width(*bits), *signed))
        }
        Descriptor::Fixed { bits, signed, .. } => {
            out.extend_from_slice(&encode_int_fixed_width(value.as_decimal()?, packed_int_width(*bits), *signed))
        }
        Descriptor::FixedBytes(n) => out.extend_from_slice(&value.as_bytes()?[..*n as usize]),
        Descriptor::Function => out.extend_from_slice(value.as_function()?),
        Descriptor::Bytes => out.extend_from_slice(value.as_bytes()?),
        Descriptor::Str => out.extend_from_slice(value.as_str()?.as_bytes()),
        Descriptor::Array { element, .. } => {
            for item in value.as_array()? {
                encode_packed_element(element, item, out)?;
            }
        }
        Descriptor::Tuple(t) => {
            for (child, item) in t.children().iter().zip(value.as_tuple()?) {
                encode_packed_element(child, item, out)?;
            }
        }
    }
    Ok(())
}

/// The packed encoding of a single descriptor's width, if it doesn't depend
/// on the runtime value (`None` for `bytes`, `string`, and anything built
/// from them).
fn packed_static_width(descriptor: &Descriptor) -> Option<usize> {
    match descriptor {
        Descriptor::Bool => Some(1),
        Descriptor::Address => Some(20),
        Descriptor::Int { bits, .. } | Descriptor::Fixed { bits, .. } => Some(packed_int_width(*bits)),
        Descriptor::FixedBytes(n) => Some(*n as usize),
        Descriptor::Function => Some(24),
        Descriptor::Bytes | Descriptor::Str => None,
        Descriptor::Array { element, length, .. } => {
            let element_width = packed_static_width(element)?;
            length.map(|k| element_width * k)
        }
        Descriptor::Tuple(t) => {
            let mut total = 0;
            for child in t.children() {
                total += packed_static_width(child)?;
            }
            Some(total)
        }
    }
}

/// Decodes `bytes` against `descriptor` alone.
pub fn decode_packed(descriptor: &Descriptor, bytes: &[u8]) -> Result<Value> {
    let mut values = decode_packed_sequence(&[descriptor], bytes)?;
    Ok(values.remove(0))
}

/// Decodes `bytes` against `tuple`'s children, packed back-to-back.
pub fn decode_params_packed(tuple: &TupleDescriptor, bytes: &[u8]) -> Result<Vec<Value>> {
    let descriptors: Vec<&Descriptor> = tuple.children().iter().collect();
    decode_packed_sequence(&descriptors, bytes)
}

fn decode_packed_sequence(descriptors: &[&Descriptor], buf: &[u8]) -> Result<Vec<Value>> {
    let widths: Vec<Option<usize>> = descriptors.iter().map(|d| packed_static_width(d)).collect();
    let unknown_count = widths.iter().filter(|w| w.is_none()).count();
    if unknown_count > 1 {
        return Err(PackedDecodeError::MultipleDynamicChildren.into());
    }
    let known_total: usize = widths.iter().flatten().sum();
    if known_total > buf.len() {
        return Err(DecodeError::Truncated {
            needed: known_total,
            available: buf.len(),
        }
        .into());
    }
    let remainder = buf.len() - known_total;
    if unknown_count == 0 && remainder != 0 {
        return Err(DecodeError::TrailingBytes(remainder).into());
    }
    let mut values = Vec::with_capacity(descriptors.len());
    let mut cursor = 0usize;
    for (i, (descriptor, width)) in descriptors.iter().zip(&widths).enumerate() {
        let width = width.unwrap_or(remainder);
        let chunk = &buf[cursor..cursor + width];
        values.push(decode_packed_element(descriptor, chunk).with_frame(PathFrame::TupleIndex(i))?);
        cursor += width;
    }
    Ok(values)
}

fn decode_packed_element(descriptor: &Descriptor, buf: &[u8]) -> Result<Value> {
    match descriptor {
        Descriptor::Bool => match buf[0] {
            0 => Ok(Value::Bool(false)),
            1 => Ok(Value::Bool(true)),
            other => Err(DecodeError::IllegalBoolean(other).into()),
        },
        Descriptor::Address => {
            let mut addr = [0u8; 20];
            addr.copy_from_slice(buf);
            Ok(Value::Address(addr))
        }
        Descriptor::Int { signed, .. } => {
            let v = if *signed { decode_int_signed(buf) } else { decode_int_unsigned(buf) };
            Ok(Value::Int(v))
        }
        Descriptor::Fixed { signed, .. } => {
            let v = if *signed { decode_int_signed(buf) } else { decode_int_unsigned(buf) };
            Ok(Value::Decimal(v))
        }
        Descriptor::FixedBytes(_) | Descriptor::Bytes => Ok(Value::Bytes(buf.to_vec())),
        Descriptor::Function => {
            let mut f = [0u8; 24];
            f.copy_from_slice(buf);
            Ok(Value::Function(f))
        }
        Descriptor::Str => Value::str_from_bytes(buf.to_vec()),
        Descriptor::Array { element, length, .. } => decode_packed_array(element, *length, buf),
        Descriptor::Tuple(t) => {
            let descriptors: Vec<&Descriptor> = t.children().iter().collect();
            Ok(Value::Tuple(decode_packed_sequence(&descriptors, buf)?))
        }
    }
}

fn decode_packed_array(element: &Descriptor, length: Option<usize>, buf: &[u8]) -> Result<Value> {
    let element_width = match packed_static_width(element) {
        Some(w) => w,
        None => return Err(PackedDecodeError::DynamicArrayElement.into()),
    };
    if element_width == 0 {
        return Err(PackedDecodeError::ZeroLengthArrayElement.into());
    }
    let count = match length {
        Some(k) => k,
        None => {
            if buf.len() % element_width != 0 {
                return Err(DecodeError::Truncated {
                    needed: element_width,
                    available: buf.len() % element_width,
                }
                .into());
            }
            buf.len() / element_width
        }
    };
    let expected_len = count * element_width;
    if expected_len != buf.len() {
        return Err(DecodeError::Truncated {
            needed: expected_len,
            available: buf.len(),
        }
        .into());
    }
    let mut values = Vec::with_capacity(count);
    for (i, chunk) in buf.chunks_exact(element_width).enumerate() {
        values.push(decode_packed_element(element, chunk).with_frame(PathFrame::ArrayIndex(i))?);
    }
    Ok(Value::Array(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_type;
    use num_bigint::BigInt;

    fn d(s: &str) -> Descriptor {
        parse_type(s, &crate::config::Config::default()).unwrap()
    }

    #[test]
    fn packed_scalar_sequence_matches_solidity_example() {
        // (int16,bytes1,uint16,string) packed as described in the worked
        // examples: -1 as int16, 0x42, 3u16, "Hello, world!".
        let tuple_descriptor = d("(int16,bytes1,uint16,string)");
        let tuple = tuple_descriptor.as_tuple().unwrap();
        let values = vec![
            Value::Int(BigInt::from(-1)),
            Value::Bytes(vec![0x42]),
            Value::Int(BigInt::from(3)),
            Value::Str("Hello, world!".to_string()),
        ];
        let bytes = encode_params_packed(tuple, &values).unwrap();
        let mut expected = vec![0xff, 0xff, 0x42, 0x00, 0x03];
        expected.extend_from_slice(b"Hello, world!");
        assert_eq!(bytes, expected);
    }

    #[test]
    fn packed_function_is_24_bytes() {
        let descriptor = d("function");
        let mut f = [0u8; 24];
        f[23] = 0x01;
        let bytes = encode_packed(&descriptor, &Value::Function(f)).unwrap();
        assert_eq!(bytes.len(), 24);
        assert_eq!(decode_packed(&descriptor, &bytes).unwrap(), Value::Function(f));
    }

    #[test]
    fn packed_negative_int24_and_bools() {
        let tuple_descriptor = d("(int24,bool,bool)");
        let tuple = tuple_descriptor.as_tuple().unwrap();
        let values = vec![Value::Int(BigInt::from(-2)), Value::Bool(true), Value::Bool(false)];
        let bytes = encode_params_packed(tuple, &values).unwrap();
        assert_eq!(bytes, vec![0xff, 0xff, 0xfe, 0x01, 0x00]);
    }

    #[test]
    fn packed_nested_tuple_array() {
        // ((bool)[]) packed as three one-byte tuples concatenated.
        let descriptor = d("((bool)[])");
        let inner = |b: bool| Value::Tuple(vec![Value::Bool(b)]);
        let value = Value::Tuple(vec![Value::Array(vec![inner(true), inner(false), inner(true)])]);
        let bytes = encode_packed(&descriptor, &value).unwrap();
        assert_eq!(bytes, vec![0x01, 0x00, 0x01]);
    }

    #[test]
    fn decode_packed_round_trips_single_dynamic_element() {
        let descriptor = d("(uint8,bytes)");
        let tuple = descriptor.as_tuple().unwrap();
        let values = vec![Value::Int(BigInt::from(7)), Value::Bytes(vec![1, 2, 3])];
        let bytes = encode_params_packed(tuple, &values).unwrap();
        let decoded = decode_params_packed(tuple, &bytes).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn decode_packed_rejects_multiple_dynamic_elements() {
        let descriptor = d("(bytes,string)");
        let tuple = descriptor.as_tuple().unwrap();
        let bytes = vec![1, 2, 3];
        assert!(decode_params_packed(tuple, &bytes).is_err());
    }

    #[test]
    fn decode_packed_rejects_dynamic_array_elements() {
        let descriptor = d("bytes[]");
        assert!(decode_packed(&descriptor, &[1, 2, 3]).is_err());
    }
}
