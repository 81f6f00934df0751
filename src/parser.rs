//! Canonical type-string parsing.
//!
//! Type strings are parsed by a small recursive-descent parser over the
//! input bytes. Recursion depth is bounded implicitly: every nesting level
//! (a tuple's `(`/`)` or an array's `[`/`]`) consumes at least one input
//! byte, so [`Config::max_type_len`] is also a hard bound on nesting depth.

use crate::config::Config;
use crate::descriptor::Descriptor;
use crate::error::{Result, TypeParseError};

/// Parses a single canonical type string, e.g. `uint256`, `bytes32[]`,
/// `(bool,address)[3]`.
///
/// Rejects the input outright if its length exceeds `config.max_type_len`,
/// and rejects any trailing characters left over after a complete type is
/// parsed.
pub fn parse_type(input: &str, config: &Config) -> Result<Descriptor> {
    tracing::trace!(type_str = input, "parsing type string");
    if input.len() > config.max_type_len {
        return Err(TypeParseError::TooLong {
            len: input.len(),
            max: config.max_type_len,
        }
        .into());
    }
    let mut p = Parser::new(input);
    let descriptor = p.parse_type()?;
    p.expect_end()?;
    Ok(descriptor)
}

/// Parses a tuple's inner element list, without the surrounding parens, e.g.
/// `bool,address,uint256[]`. Equivalent to calling [`parse_type`] on
/// `(`+`input`+`)`.
pub fn parse_tuple_type(input: &str, config: &Config) -> Result<Descriptor> {
    let wrapped = format!("({input})");
    parse_type(&wrapped, config)
}

/// Parses a tuple's inner element list alongside a parallel list of element
/// names, attaching them to the resulting `Descriptor::Tuple`. Fails if
/// `names.len()` doesn't match the parsed tuple's arity.
pub fn parse_tuple_type_named(
    input: &str,
    names: Vec<String>,
    config: &Config,
) -> Result<Descriptor> {
    let descriptor = parse_tuple_type(input, config)?;
    let tuple = descriptor
        .as_tuple()
        .expect("parse_tuple_type always returns a Descriptor::Tuple");
    Descriptor::tuple(tuple.children().to_vec(), Some(names))
}

struct Parser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn expect_end(&self) -> Result<()> {
        if self.pos == self.bytes.len() {
            Ok(())
        } else {
            Err(TypeParseError::TrailingInput {
                at: self.pos,
                remainder: self.input[self.pos..].to_string(),
            }
            .into())
        }
    }

    fn parse_type(&mut self) -> Result<Descriptor> {
        let mut descriptor = self.parse_base()?;
        while self.peek() == Some(b'[') {
            descriptor = self.parse_array_suffix(descriptor)?;
        }
        Ok(descriptor)
    }

    fn parse_array_suffix(&mut self, element: Descriptor) -> Result<Descriptor> {
        self.bump(); // '['
        let digits = self.read_digits();
        if self.bump() != Some(b']') {
            return Err(TypeParseError::MalformedArrayLength(self.input.to_string()).into());
        }
        let length = if digits.is_empty() {
            None
        } else {
            Some(
                digits
                    .parse::<usize>()
                    .map_err(|_| TypeParseError::MalformedArrayLength(digits.to_string()))?,
            )
        };
        Ok(Descriptor::array(element, length))
    }

    fn parse_base(&mut self) -> Result<Descriptor> {
        match self.peek() {
            Some(b'(') => self.parse_tuple(),
            Some(_) => self.parse_word_type(),
            None => Err(TypeParseError::EmptyInput.into()),
        }
    }

    fn parse_tuple(&mut self) -> Result<Descriptor> {
        self.bump(); // '('
        let mut children = Vec::new();
        if self.peek() == Some(b')') {
            self.bump();
            return Descriptor::tuple(children, None);
        }
        loop {
            children.push(self.parse_type()?);
            match self.bump() {
                Some(b',') => continue,
                Some(b')') => break,
                _ => return Err(TypeParseError::MalformedTuple(self.input.to_string()).into()),
            }
        }
        Descriptor::tuple(children, None)
    }

    fn read_letters(&mut self) -> &'a str {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_lowercase()) {
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }

    fn read_digits(&mut self) -> &'a str {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }

    fn parse_word_type(&mut self) -> Result<Descriptor> {
        let start = self.pos;
        let word = self.read_letters();
        if word.is_empty() {
            let bad = self.bump().map(|b| (b as char).to_string()).unwrap_or_default();
            return Err(TypeParseError::UnknownToken(bad).into());
        }
        match word {
            "bool" => Ok(Descriptor::Bool),
            "address" => Ok(Descriptor::Address),
            "function" => Ok(Descriptor::Function),
            "string" => Ok(Descriptor::Str),
            "bytes" => {
                let digits = self.read_digits();
                if digits.is_empty() {
                    Ok(Descriptor::Bytes)
                } else {
                    let n: u8 = digits
                        .parse()
                        .map_err(|_| TypeParseError::InvalidBytesLength(format!("bytes{digits}")))?;
                    Descriptor::fixed_bytes(n)
                }
            }
            "int" | "uint" => {
                let signed = word == "int";
                let digits = self.read_digits();
                let bits: u16 = if digits.is_empty() {
                    256
                } else {
                    digits
                        .parse()
                        .map_err(|_| TypeParseError::InvalidIntWidth(format!("{word}{digits}")))?
                };
                if signed {
                    Descriptor::int(bits)
                } else {
                    Descriptor::uint(bits)
                }
            }
            "fixed" | "ufixed" => {
                let signed = word == "fixed";
                let bits_digits = self.read_digits();
                let (bits, scale) = if bits_digits.is_empty() {
                    (128u16, 18u8)
                } else {
                    let bits: u16 = bits_digits.parse().map_err(|_| {
                        TypeParseError::InvalidFixedWidth(format!("{word}{bits_digits}"))
                    })?;
                    if self.bump() != Some(b'x') {
                        return Err(
                            TypeParseError::InvalidFixedWidth(self.input[start..self.pos].to_string())
                                .into(),
                        );
                    }
                    let scale_digits = self.read_digits();
                    let scale: u8 = scale_digits
                        .parse()
                        .map_err(|_| TypeParseError::InvalidFixedScale(scale_digits.to_string()))?;
                    (bits, scale)
                };
                if signed {
                    Descriptor::fixed(bits, scale)
                } else {
                    Descriptor::ufixed(bits, scale)
                }
            }
            other => Err(TypeParseError::UnknownToken(other.to_string()).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ct(s: &str) -> String {
        parse_type(s, &Config::default()).unwrap().canonical_type()
    }

    #[test]
    fn scalar_defaults() {
        assert_eq!(ct("int"), "int256");
        assert_eq!(ct("uint"), "uint256");
        assert_eq!(ct("fixed"), "fixed128x18");
        assert_eq!(ct("ufixed"), "ufixed128x18");
        assert_eq!(ct("bytes"), "bytes");
    }

    #[test]
    fn function_type() {
        assert_eq!(ct("function"), "function");
    }

    #[test]
    fn explicit_widths() {
        assert_eq!(ct("uint8"), "uint8");
        assert_eq!(ct("int24"), "int24");
        assert_eq!(ct("bytes32"), "bytes32");
        assert_eq!(ct("fixed128x18"), "fixed128x18");
        assert_eq!(ct("ufixed16x4"), "ufixed16x4");
    }

    #[test]
    fn nested_arrays_wrap_left_to_right() {
        // `int24[2][]` is a dynamic array of `int24[2]` fixed arrays.
        let d = parse_type("int24[2][]", &Config::default()).unwrap();
        let (outer_elem, outer_len) = d.as_array().unwrap();
        assert_eq!(outer_len, None);
        assert!(!outer_elem.is_dynamic());
        let (inner_elem, inner_len) = outer_elem.as_array().unwrap();
        assert_eq!(inner_len, Some(2));
        assert_eq!(inner_elem.canonical_type(), "int24");
        assert_eq!(d.canonical_type(), "int24[2][]");
    }

    #[test]
    fn tuples_and_nesting() {
        assert_eq!(ct("(bool,bytes)"), "(bool,bytes)");
        assert_eq!(ct("(bool,uint256[])[2]"), "(bool,uint256[])[2]");
        assert_eq!(ct("()"), "()");
    }

    #[test]
    fn parse_tuple_type_wraps_element_list() {
        let d = parse_tuple_type("bool,address", &Config::default()).unwrap();
        assert_eq!(d.canonical_type(), "(bool,address)");
    }

    #[test]
    fn parse_tuple_type_named_attaches_names() {
        let d = parse_tuple_type_named(
            "bool,address",
            vec!["flag".to_string(), "owner".to_string()],
            &Config::default(),
        )
        .unwrap();
        let t = d.as_tuple().unwrap();
        assert_eq!(t.names(), Some(&["flag".to_string(), "owner".to_string()][..]));
    }

    #[test]
    fn parse_tuple_type_named_rejects_arity_mismatch() {
        let err = parse_tuple_type_named("bool,address", vec!["flag".to_string()], &Config::default());
        assert!(err.is_err());
    }

    #[test]
    fn rejects_trailing_input() {
        assert!(parse_type("bool bool", &Config::default()).is_err());
    }

    #[test]
    fn rejects_unknown_token() {
        assert!(parse_type("frobnicate", &Config::default()).is_err());
    }

    #[test]
    fn rejects_invalid_widths() {
        assert!(parse_type("uint7", &Config::default()).is_err());
        assert!(parse_type("uint257", &Config::default()).is_err());
        assert!(parse_type("bytes33", &Config::default()).is_err());
    }

    #[test]
    fn enforces_max_type_len() {
        let config = Config {
            max_type_len: 4,
            ..Config::default()
        };
        assert!(parse_type("uint256", &config).is_err());
        assert!(parse_type("bool", &config).is_ok());
    }
}
