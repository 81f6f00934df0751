//! Function call encoding.
//!
//! A [`Function`] pairs a name with its input parameter types and knows how
//! to build its canonical signature and encode a call. It never hashes
//! anything itself: the 4-byte selector is the first four bytes of the
//! Keccak-256 digest of the canonical signature, and Keccak-256 is supplied
//! by the caller as a plain closure (`Fn(&[u8]) -> [u8; 32]`) rather than
//! implemented or depended on here, so this crate stays hash-implementation
//! agnostic.

use crate::codec::{decode_params, encode_params};
use crate::config::Config;
use crate::descriptor::TupleDescriptor;
use crate::error::{DecodeError, Result};
use crate::value::Value;

/// A function's name and parameter list.
#[derive(Clone, Debug)]
pub struct Function {
    name: String,
    inputs: TupleDescriptor,
}

impl Function {
    pub fn new(name: impl Into<String>, inputs: TupleDescriptor) -> Self {
        Self {
            name: name.into(),
            inputs,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inputs(&self) -> &TupleDescriptor {
        &self.inputs
    }

    /// The canonical signature, e.g. `sam(bytes,bool,uint256[])`.
    pub fn signature(&self) -> String {
        format!("{}{}", self.name, self.inputs.canonical_type())
    }

    /// The 4-byte selector: the first four bytes of `keccak256(signature)`.
    pub fn selector(&self, keccak256: impl FnOnce(&[u8]) -> [u8; 32]) -> [u8; 4] {
        let digest = keccak256(self.signature().as_bytes());
        [digest[0], digest[1], digest[2], digest[3]]
    }

    /// Encodes a full call: the 4-byte selector followed by the ABI-encoded
    /// parameter list.
    pub fn encode_call(&self, values: &[Value], keccak256: impl FnOnce(&[u8]) -> [u8; 32]) -> Result<Vec<u8>> {
        let selector = self.selector(keccak256);
        #[cfg(feature = "hex")]
        tracing::debug!(signature = %self.signature(), selector = %hex::encode(selector), "encoding call");
        #[cfg(not(feature = "hex"))]
        tracing::debug!(signature = %self.signature(), "encoding call");
        let mut out = Vec::with_capacity(4);
        out.extend_from_slice(&selector);
        out.extend(encode_params(&self.inputs, values)?);
        Ok(out)
    }

    /// Decodes a call's parameter list, given the selector has already been
    /// validated by the caller (or doesn't need to be, e.g. when dispatching
    /// has already matched it against a known selector table).
    pub fn decode_call_data(&self, data: &[u8], config: &Config) -> Result<Vec<Value>> {
        let (_, body) = strip_selector(data)?;
        decode_params(&self.inputs, body, config)
    }
}

/// Splits `data` into its 4-byte selector and the remaining call body.
pub fn strip_selector(data: &[u8]) -> Result<(&[u8; 4], &[u8])> {
    if data.len() < 4 {
        return Err(DecodeError::Truncated {
            needed: 4,
            available: data.len(),
        }
        .into());
    }
    let (selector, body) = data.split_at(4);
    Ok((selector.try_into().expect("split_at(4) yields a 4-byte slice"), body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_tuple_type;
    use hex_literal::hex;
    use num_bigint::BigInt;
    use sha3::{Digest, Keccak256};

    fn keccak256(msg: &[u8]) -> [u8; 32] {
        let mut hasher = Keccak256::new();
        hasher.update(msg);
        hasher.finalize().into()
    }

    #[test]
    fn sam_selector_and_call_encoding() {
        let inputs = parse_tuple_type("bytes,bool,uint256[]", &Config::default())
            .unwrap()
            .as_tuple()
            .unwrap()
            .clone();
        let function = Function::new("sam", inputs);
        assert_eq!(function.signature(), "sam(bytes,bool,uint256[])");
        assert_eq!(function.selector(keccak256), hex!("a5643bf2"));

        let values = vec![
            Value::Bytes(b"dave".to_vec()),
            Value::Bool(true),
            Value::Array(vec![Value::Int(BigInt::from(1)), Value::Int(BigInt::from(2)), Value::Int(BigInt::from(3))]),
        ];
        let call = function.encode_call(&values, keccak256).unwrap();
        // 3 head words + 2 tail words for `bytes` + 4 tail words for `uint256[]`.
        assert_eq!(call.len(), 4 + 9 * 32);
        assert_eq!(&call[0..4], &hex!("a5643bf2")[..]);

        let decoded = function.decode_call_data(&call, &Config::default()).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn strip_selector_rejects_short_input() {
        assert!(strip_selector(&[1, 2, 3]).is_err());
    }
}
