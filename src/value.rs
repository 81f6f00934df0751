//! Decoded/to-be-encoded values.
//!
//! A [`Value`] is the descriptor-free, dynamically typed sibling of
//! [`crate::descriptor::Descriptor`]: encoding always pairs a `Value` with a
//! `Descriptor` via [`crate::codec`]; decoding always produces a `Value` from
//! bytes plus a `Descriptor`. Integers are always represented as arbitrary
//! precision [`BigInt`]s regardless of their declared bit width, so a `Value`
//! never silently truncates.

use num_bigint::BigInt;

use crate::descriptor::ValueClass;
use crate::error::{Result, ValidationError};

/// A dynamically typed ABI value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    Address([u8; 20]),
    /// The value of an `int<N>`/`uint<N>`.
    Int(BigInt),
    /// The *unscaled* value of a `fixed<M>x<D>`/`ufixed<M>x<D>`: the actual
    /// value is `unscaled / 10^D`.
    Decimal(BigInt),
    /// The payload of a `bytes<N>` or dynamic `bytes`.
    Bytes(Vec<u8>),
    /// The value of a `function`: a 20-byte address followed by a 4-byte selector.
    Function([u8; 24]),
    Str(String),
    Array(Vec<Value>),
    Tuple(Vec<Value>),
}

impl Value {
    /// The [`ValueClass`] this value belongs to, for matching against a
    /// descriptor's [`crate::descriptor::Descriptor::value_class_tag`].
    pub fn class_tag(&self) -> ValueClass {
        match self {
            Value::Bool(_) => ValueClass::Bool,
            Value::Address(_) => ValueClass::Address,
            Value::Int(_) => ValueClass::Int,
            Value::Decimal(_) => ValueClass::Decimal,
            Value::Bytes(_) => ValueClass::Bytes,
            Value::Function(_) => ValueClass::Function,
            Value::Str(_) => ValueClass::Str,
            Value::Array(_) => ValueClass::Array,
            Value::Tuple(_) => ValueClass::Tuple,
        }
    }

    fn class_name(&self) -> &'static str {
        match self {
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

    fn mismatch(&self, expected: &'static str) -> crate::error::Error {
        ValidationError::ClassMismatch {
            expected,
            actual: self.class_name(),
        }
        .into()
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(other.mismatch("bool")),
        }
    }

    pub fn as_address(&self) -> Result<&[u8; 20]> {
        match self {
            Value::Address(a) => Ok(a),
            other => Err(other.mismatch("address")),
        }
    }

    pub fn as_int(&self) -> Result<&BigInt> {
        match self {
            Value::Int(i) => Ok(i),
            other => Err(other.mismatch("int")),
        }
    }

    pub fn as_decimal(&self) -> Result<&BigInt> {
        match self {
            Value::Decimal(i) => Ok(i),
            other => Err(other.mismatch("decimal")),
        }
    }

    pub fn as_bytes(&self) -> Result<&[u8]> {
        match self {
            Value::Bytes(b) => Ok(b),
            other => Err(other.mismatch("bytes")),
        }
    }

    pub fn as_function(&self) -> Result<&[u8; 24]> {
        match self {
            Value::Function(f) => Ok(f),
            other => Err(other.mismatch("function")),
        }
    }

    pub fn as_str(&self) -> Result<&str> {
        match self {
            Value::Str(s) => Ok(s),
            other => Err(other.mismatch("string")),
        }
    }

    pub fn as_array(&self) -> Result<&[Value]> {
        match self {
            Value::Array(v) => Ok(v),
            other => Err(other.mismatch("array")),
        }
    }

    pub fn as_tuple(&self) -> Result<&[Value]> {
        match self {
            Value::Tuple(v) => Ok(v),
            other => Err(other.mismatch("tuple")),
        }
    }
}

impl Value {
    /// Builds a [`Value::Str`] from raw bytes, failing with
    /// [`ValidationError::InvalidUtf8`] if they aren't valid UTF-8. Used by
    /// decoders that read a `string`'s payload as bytes off the wire.
    pub fn str_from_bytes(bytes: Vec<u8>) -> Result<Value> {
        String::from_utf8(bytes)
            .map(Value::Str)
            .map_err(|_| ValidationError::InvalidUtf8.into())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<BigInt> for Value {
    fn from(i: BigInt) -> Self {
        Value::Int(i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_round_trip() {
        assert!(Value::Bool(true).as_bool().unwrap());
        assert_eq!(Value::Bytes(vec![1, 2]).as_bytes().unwrap(), &[1, 2]);
        assert_eq!(Value::Str("hi".into()).as_str().unwrap(), "hi");
        assert_eq!(*Value::Int(BigInt::from(42)).as_int().unwrap(), BigInt::from(42));
    }

    #[test]
    fn accessors_report_class_mismatch() {
        let err = Value::Bool(true).as_bytes().unwrap_err();
        assert_matches::assert_matches!(
            err.kind(),
            crate::error::ErrorKind::Validation(ValidationError::ClassMismatch { expected, actual })
                if *expected == "bytes" && *actual == "bool"
        );
    }

    #[test]
    fn class_tag_matches_value_shape() {
        assert_eq!(Value::Address([0u8; 20]).class_tag(), ValueClass::Address);
        assert_eq!(Value::Decimal(BigInt::from(1)).class_tag(), ValueClass::Decimal);
        assert_eq!(Value::Function([0u8; 24]).class_tag(), ValueClass::Function);
        assert_eq!(Value::Tuple(vec![]).class_tag(), ValueClass::Tuple);
    }
}
