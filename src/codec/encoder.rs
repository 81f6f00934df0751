use num_bigint::BigInt;

use crate::codec::{encode_int_word, padded_len, word_from_u64};
use crate::descriptor::{Descriptor, TupleDescriptor};
use crate::error::{Error, PathFrame, Result, ValidationError, WithFrame};
use crate::primitives::fits_in_bits;
use crate::value::Value;

/// Checks that `value` has the shape and range required by `descriptor`,
/// without encoding anything. Errors carry a [`crate::error::Path`] locating
/// the offending element within a tuple/array tree.
pub fn validate(descriptor: &Descriptor, value: &Value) -> Result<()> {
    validate_element(descriptor, value)?;
    Ok(())
}

/// Validates `value` against `descriptor` and returns its encoded length as
/// if it were the sole element of a one-item sequence (a static type's
/// `head_length`, or a dynamic type's offset word plus tail) in the same
/// traversal, rather than walking the value tree twice.
pub(crate) fn validate_element(descriptor: &Descriptor, value: &Value) -> Result<usize> {
    if value.class_tag() != descriptor.value_class_tag() {
        return Err(class_mismatch(descriptor, value));
    }
    match descriptor {
        Descriptor::Bool | Descriptor::Address | Descriptor::Function => Ok(descriptor.head_length()),
        Descriptor::FixedBytes(n) => {
            let bytes = value.as_bytes()?;
            let expected = *n as usize;
            if bytes.len() != expected {
                Err(ValidationError::LengthMismatch {
                    expected,
                    actual: bytes.len(),
                }
                .into())
            } else {
                Ok(descriptor.head_length())
            }
        }
        Descriptor::Bytes => Ok(32 + padded_len(value.as_bytes()?.len())),
        Descriptor::Str => Ok(32 + padded_len(value.as_str()?.len())),
        Descriptor::Int { bits, signed } => {
            check_int_range(value.as_int()?, *bits, *signed)?;
            Ok(descriptor.head_length())
        }
        Descriptor::Fixed { bits, signed, .. } => {
            check_int_range(value.as_decimal()?, *bits, *signed)?;
            Ok(descriptor.head_length())
        }
        Descriptor::Array { element, length, .. } => {
            let items = value.as_array()?;
            if let Some(k) = length {
                if items.len() != *k {
                    return Err(ValidationError::LengthMismatch {
                        expected: *k,
                        actual: items.len(),
                    }
                    .into());
                }
            }
            let mut sequence_total = 0usize;
            for (i, item) in items.iter().enumerate() {
                sequence_total += validate_element(element, item).with_frame(PathFrame::ArrayIndex(i))?;
            }
            if descriptor.is_dynamic() {
                let tail = if length.is_none() { sequence_total + 32 } else { sequence_total };
                Ok(32 + tail)
            } else {
                Ok(descriptor.head_length())
            }
        }
        Descriptor::Tuple(t) => {
            let items = value.as_tuple()?;
            check_arity(t, items.len())?;
            let mut sequence_total = 0usize;
            for (i, (child, item)) in t.children().iter().zip(items).enumerate() {
                sequence_total += validate_element(child, item).with_frame(PathFrame::TupleIndex(i))?;
            }
            if descriptor.is_dynamic() {
                Ok(32 + sequence_total)
            } else {
                Ok(descriptor.head_length())
            }
        }
    }
}

fn class_mismatch(descriptor: &Descriptor, value: &Value) -> Error {
    ValidationError::ClassMismatch {
        expected: value_class_name(descriptor),
        actual: value_class_name_of(value),
    }
    .into()
}

fn value_class_name(d: &Descriptor) -> &'static str {
    match d.value_class_tag() {
        crate::descriptor::ValueClass::Bool => "bool",
        crate::descriptor::ValueClass::Address => "address",
        crate::descriptor::ValueClass::Int => "int",
        crate::descriptor::ValueClass::Decimal => "decimal",
        crate::descriptor::ValueClass::Bytes => "bytes",
        crate::descriptor::ValueClass::Function => "function",
        crate::descriptor::ValueClass::Str => "string",
        crate::descriptor::ValueClass::Array => "array",
        crate::descriptor::ValueClass::Tuple => "tuple",
    }
}

fn value_class_name_of(v: &Value) -> &'static str {
    match v {
        Value::Bool(_) => "bool",
        Value::Address(_) => "address",
        Value::Int(_) => "int",
        Value::Decimal(_) => "decimal",
        Value::Bytes(_) => "bytes",
        Value::Function(_) => "function",
        Value::Str(_) => "string",
        Value::Array(_) => "array",
        Value::Tuple(_) => "tuple",
    }
}

fn check_int_range(value: &BigInt, bits: u16, signed: bool) -> Result<()> {
    if fits_in_bits(value, bits, signed) {
        Ok(())
    } else {
        Err(ValidationError::IntegerOutOfRange { bits, signed }.into())
    }
}

fn check_arity(t: &TupleDescriptor, actual: usize) -> Result<()> {
    if actual == t.arity() {
        Ok(())
    } else {
        Err(ValidationError::LengthMismatch {
            expected: t.arity(),
            actual,
        }
        .into())
    }
}

// --- byte_length ----------------------------------------------------------

/// The exact encoded length of `value` under `descriptor`, as if it were the
/// sole element of a one-item sequence (see the module docs for the
/// single/params distinction). Validates and measures in one traversal.
pub fn byte_length_single(descriptor: &Descriptor, value: &Value) -> Result<usize> {
    validate_element(descriptor, value)
}

/// The exact encoded length of `values` as a function parameter list against
/// `tuple`. Validates and measures in one traversal.
pub fn byte_length_params(tuple: &TupleDescriptor, values: &[Value]) -> Result<usize> {
    check_arity(tuple, values.len())?;
    let mut total = 0usize;
    for (i, (child, value)) in tuple.children().iter().zip(values).enumerate() {
        total += validate_element(child, value).with_frame(PathFrame::TupleIndex(i))?;
    }
    Ok(total)
}

// --- encode -----------------------------------------------------------------

/// Encodes `value` against `descriptor` as if it were the sole element of a
/// one-item sequence (see the module docs for the single/params distinction).
pub fn encode_single(descriptor: &Descriptor, value: &Value) -> Result<Vec<u8>> {
    let len = validate_element(descriptor, value)?;
    let mut out = Vec::with_capacity(len);
    encode_sequence_into(&[(descriptor, value)], &mut out)?;
    Ok(out)
}

/// Encodes `values` against `tuple`'s children as a function parameter list:
/// the top-level sequence directly, without an enclosing offset word.
pub fn encode_params(tuple: &TupleDescriptor, values: &[Value]) -> Result<Vec<u8>> {
    let len = byte_length_params(tuple, values)?;
    let pairs: Vec<(&Descriptor, &Value)> = tuple.children().iter().zip(values).collect();
    let mut out = Vec::with_capacity(len);
    encode_sequence_into(&pairs, &mut out)?;
    Ok(out)
}

pub(crate) fn encode_sequence_into(items: &[(&Descriptor, &Value)], out: &mut Vec<u8>) -> Result<()> {
    let head_total: usize = items.iter().map(|(d, _)| d.head_length()).sum();
    let mut heads = Vec::with_capacity(head_total);
    let mut tails = Vec::new();
    let mut tail_offset = head_total;
    for (d, v) in items {
        if d.is_dynamic() {
            heads.extend_from_slice(&word_from_u64(tail_offset as u64));
            let before = tails.len();
            encode_tail(d, v, &mut tails)?;
            tail_offset += tails.len() - before;
        } else {
            encode_static(d, v, &mut heads)?;
        }
    }
    out.extend_from_slice(&heads);
    out.extend_from_slice(&tails);
    Ok(())
}

fn encode_tail(descriptor: &Descriptor, value: &Value, out: &mut Vec<u8>) -> Result<()> {
    match descriptor {
        Descriptor::Bytes => write_length_prefixed(value.as_bytes()?, out),
        Descriptor::Str => write_length_prefixed(value.as_str()?.as_bytes(), out),
        Descriptor::Array { element, length, .. } => {
            let items = value.as_array()?;
            if length.is_none() {
                out.extend_from_slice(&word_from_u64(items.len() as u64));
            }
            let pairs: Vec<(&Descriptor, &Value)> = items.iter().map(|v| (element.as_ref(), v)).collect();
            encode_sequence_into(&pairs, out)?;
        }
        Descriptor::Tuple(t) => {
            let items = value.as_tuple()?;
            let pairs: Vec<(&Descriptor, &Value)> = t.children().iter().zip(items).collect();
            encode_sequence_into(&pairs, out)?;
        }
        _ => unreachable!("scalar descriptors are never dynamic"),
    }
    Ok(())
}

fn write_length_prefixed(data: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(&word_from_u64(data.len() as u64));
    out.extend_from_slice(data);
    out.resize(out.len() + (padded_len(data.len()) - data.len()), 0);
}

pub(crate) fn encode_static(descriptor: &Descriptor, value: &Value, out: &mut Vec<u8>) -> Result<()> {
    match descriptor {
        Descriptor::Bool => {
            let mut word = [0u8; 32];
            word[31] = value.as_bool()? as u8;
            out.extend_from_slice(&word);
        }
        Descriptor::Address => {
            let mut word = [0u8; 32];
            word[12..].copy_from_slice(value.as_address()?);
            out.extend_from_slice(&word);
        }
        Descriptor::Int { signed, .. } => out.extend_from_slice(&encode_int_word(value.as_int()?, *signed)),
        Descriptor::Fixed { signed, .. } => out.extend_from_slice(&encode_int_word(value.as_decimal()?, *signed)),
        Descriptor::FixedBytes(n) => {
            let bytes = value.as_bytes()?;
            let mut word = [0u8; 32];
            word[..*n as usize].copy_from_slice(bytes);
            out.extend_from_slice(&word);
        }
        Descriptor::Function => {
            let mut word = [0u8; 32];
            word[..24].copy_from_slice(value.as_function()?);
            out.extend_from_slice(&word);
        }
        Descriptor::Array { element, .. } => {
            for item in value.as_array()? {
                encode_static(element, item, out)?;
            }
        }
        Descriptor::Tuple(t) => {
            for (child, item) in t.children().iter().zip(value.as_tuple()?) {
                encode_static(child, item, out)?;
            }
        }
        Descriptor::Bytes | Descriptor::Str => {
            unreachable!("dynamic descriptors are never encoded via encode_static")
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_type;

    fn d(s: &str) -> Descriptor {
        parse_type(s, &crate::config::Config::default()).unwrap()
    }

    #[test]
    fn encodes_uint256() {
        let bytes = encode_single(&d("uint256"), &Value::Int(BigInt::from(1))).unwrap();
        assert_eq!(bytes.len(), 32);
        assert_eq!(bytes[31], 1);
    }

    #[test]
    fn encodes_negative_int8() {
        let bytes = encode_single(&d("int8"), &Value::Int(BigInt::from(-1))).unwrap();
        assert_eq!(bytes, vec![0xFFu8; 32]);
    }

    #[test]
    fn encode_single_wraps_dynamic_value_with_offset() {
        let bytes = encode_single(&d("bytes"), &Value::Bytes(vec![0xde, 0xad])).unwrap();
        assert_eq!(bytes.len(), 96); // offset word + length word + one padded word
        assert_eq!(&bytes[0..32], &word_from_u64(32)[..]);
        assert_eq!(&bytes[32..64], &word_from_u64(2)[..]);
        assert_eq!(&bytes[64..66], &[0xde, 0xad]);
    }

    #[test]
    fn encode_params_has_no_leading_offset_for_dynamic_tuple() {
        let tuple = d("(bool,bytes)");
        let t = tuple.as_tuple().unwrap();
        let values = vec![Value::Bool(true), Value::Bytes(vec![1, 2, 3])];
        let single = encode_single(&tuple, &Value::Tuple(values.clone())).unwrap();
        let params = encode_params(t, &values).unwrap();
        assert_eq!(single.len(), params.len() + 32);
        assert_eq!(&single[32..], &params[..]);
    }

    #[test]
    fn rejects_out_of_range_integer() {
        let err = validate(&d("uint8"), &Value::Int(BigInt::from(256)));
        assert!(err.is_err());
    }

    #[test]
    fn rejects_wrong_fixed_bytes_length() {
        let err = validate(&d("bytes4"), &Value::Bytes(vec![1, 2, 3]));
        assert!(err.is_err());
    }

    #[test]
    fn byte_length_single_matches_actual_encoded_length() {
        let descriptor = d("(bool,uint256[],bytes)");
        let value = Value::Tuple(vec![
            Value::Bool(true),
            Value::Array(vec![Value::Int(BigInt::from(1)), Value::Int(BigInt::from(2))]),
            Value::Bytes(vec![1, 2, 3, 4, 5]),
        ]);
        let predicted = byte_length_single(&descriptor, &value).unwrap();
        let actual = encode_single(&descriptor, &value).unwrap();
        assert_eq!(predicted, actual.len());
    }

    #[test]
    fn path_frames_locate_nested_errors() {
        let tuple = d("(bool,uint8[2])");
        let values = Value::Tuple(vec![
            Value::Bool(true),
            Value::Array(vec![Value::Int(BigInt::from(1)), Value::Int(BigInt::from(1000))]),
        ]);
        let err = validate(&tuple, &values).unwrap_err();
        let frames = err.path().frames();
        assert_eq!(frames.len(), 2);
    }
}
