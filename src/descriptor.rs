//! Immutable type descriptor trees.
//!
//! A [`Descriptor`] is built once by [`crate::parser::parse_type`] and is
//! read-only and freely shareable thereafter. It knows its own
//! canonical type string, whether it is dynamically sized, and, for
//! non-dynamic descriptors, its exact encoded byte length, all computed
//! bottom-up at construction so that later codec operations never need to
//! re-derive them.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use num_bigint::BigInt;

use crate::error::{Result, TypeParseError};

/// The word size of the ABI encoding: every head slot is 32 bytes.
pub const WORD_SIZE: usize = 32;

/// A small integer discriminant for each descriptor variant, used for fast
/// dispatch without matching on the full enum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeCode {
    Bool = 0,
    Address = 1,
    Int = 2,
    Fixed = 3,
    FixedBytes = 4,
    Bytes = 5,
    Str = 6,
    Array = 7,
    Tuple = 8,
    Function = 9,
}

/// Which shape of decoded [`crate::value::Value`] a descriptor produces,
/// cached on the descriptor so the codec never has to re-derive it from the
/// type code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueClass {
    Bool,
    Address,
    Int,
    Decimal,
    Bytes,
    Function,
    Str,
    Array,
    Tuple,
}

/// An immutable ABI type descriptor.
///
/// Cloning a `Descriptor` is cheap: composite variants hold their children
/// behind an [`Arc`], so sharing a descriptor tree across threads or across
/// many encode/decode calls never re-allocates the tree.
#[derive(Clone, Debug)]
pub enum Descriptor {
    Bool,
    Address,
    /// `int<N>` / `uint<N>`, `N` in `1..=256`.
    Int { bits: u16, signed: bool },
    /// `fixed<M>x<D>` / `ufixed<M>x<D>`, `M` a multiple of 8 in `8..=256`, `D` in `0..=80`.
    Fixed { bits: u16, signed: bool, scale: u8 },
    /// `bytes<N>`, `N` in `1..=32`.
    FixedBytes(u8),
    /// Dynamic `bytes`.
    Bytes,
    /// `function`: a 20-byte address followed by a 4-byte selector, packed
    /// into a single word like `bytes24`.
    Function,
    /// Dynamic `string`.
    Str,
    /// `T[K]` (`length = Some(K)`) or `T[]` (`length = None`).
    Array {
        element: Arc<Descriptor>,
        length: Option<usize>,
        /// Precomputed: is this array itself dynamic (dynamic length, or a
        /// dynamic element type)?
        dynamic: bool,
        /// Precomputed encoded length when non-dynamic.
        static_len: Option<usize>,
    },
    Tuple(TupleDescriptor),
}

/// A tuple descriptor: an ordered list of child descriptors plus optional
/// parallel element names.
#[derive(Clone, Debug)]
pub struct TupleDescriptor {
    children: Arc<[Descriptor]>,
    names: Option<Arc<[String]>>,
    dynamic: bool,
    static_len: Option<usize>,
}

impl Descriptor {
    /// A signed `int<bits>`. `bits` must be in `1..=256`.
    pub fn int(bits: u16) -> Result<Self> {
        Self::check_int_width(bits)?;
        Ok(Descriptor::Int { bits, signed: true })
    }

    /// An unsigned `uint<bits>`. `bits` must be in `1..=256`.
    pub fn uint(bits: u16) -> Result<Self> {
        Self::check_int_width(bits)?;
        Ok(Descriptor::Int {
            bits,
            signed: false,
        })
    }

    fn check_int_width(bits: u16) -> Result<()> {
        if (1..=256).contains(&bits) {
            Ok(())
        } else {
            Err(TypeParseError::InvalidIntWidth(format!("{bits}-bit integer")).into())
        }
    }

    /// A signed `fixed<bits>x<scale>`. `bits` must be a multiple of 8 in
    /// `8..=256`, `scale` in `0..=80`.
    pub fn fixed(bits: u16, scale: u8) -> Result<Self> {
        Self::check_fixed(bits, scale)?;
        Ok(Descriptor::Fixed {
            bits,
            signed: true,
            scale,
        })
    }

    /// An unsigned `ufixed<bits>x<scale>`.
    pub fn ufixed(bits: u16, scale: u8) -> Result<Self> {
        Self::check_fixed(bits, scale)?;
        Ok(Descriptor::Fixed {
            bits,
            signed: false,
            scale,
        })
    }

    fn check_fixed(bits: u16, scale: u8) -> Result<()> {
        if bits < 8 || bits > 256 || bits % 8 != 0 {
            return Err(TypeParseError::InvalidFixedWidth(format!("{bits}-bit fixed")).into());
        }
        if scale > 80 {
            return Err(TypeParseError::InvalidFixedScale(format!("scale {scale}")).into());
        }
        Ok(())
    }

    /// `bytes<n>`, `n` in `1..=32`.
    pub fn fixed_bytes(n: u8) -> Result<Self> {
        if (1..=32).contains(&n) {
            Ok(Descriptor::FixedBytes(n))
        } else {
            Err(TypeParseError::InvalidBytesLength(format!("bytes{n}")).into())
        }
    }

    /// `T[length]` if `length` is `Some`, else the dynamic array `T[]`.
    pub fn array(element: Descriptor, length: Option<usize>) -> Self {
        let element_dynamic = element.is_dynamic();
        let dynamic = length.is_none() || element_dynamic;
        let static_len = if dynamic {
            None
        } else {
            // length.unwrap() is static here; element is non-dynamic too.
            element
                .static_byte_length()
                .map(|elem_len| elem_len * length.unwrap())
        };
        Descriptor::Array {
            element: Arc::new(element),
            length,
            dynamic,
            static_len,
        }
    }

    /// A tuple `(T1,...,Tn)`, optionally with parallel element names.
    ///
    /// Fails if `names` is `Some` and its length doesn't match `children`.
    pub fn tuple(children: Vec<Descriptor>, names: Option<Vec<String>>) -> Result<Self> {
        Ok(Descriptor::Tuple(TupleDescriptor::new(children, names)?))
    }

    /// The small integer discriminant for this descriptor's variant.
    pub fn type_code(&self) -> TypeCode {
        match self {
            Descriptor::Bool => TypeCode::Bool,
            Descriptor::Address => TypeCode::Address,
            Descriptor::Int { .. } => TypeCode::Int,
            Descriptor::Fixed { .. } => TypeCode::Fixed,
            Descriptor::FixedBytes(_) => TypeCode::FixedBytes,
            Descriptor::Bytes => TypeCode::Bytes,
            Descriptor::Function => TypeCode::Function,
            Descriptor::Str => TypeCode::Str,
            Descriptor::Array { .. } => TypeCode::Array,
            Descriptor::Tuple(_) => TypeCode::Tuple,
        }
    }

    /// Which [`crate::value::Value`] shape this descriptor decodes to.
    pub fn value_class_tag(&self) -> ValueClass {
        match self {
            Descriptor::Bool => ValueClass::Bool,
            Descriptor::Address => ValueClass::Address,
            Descriptor::Int { .. } => ValueClass::Int,
            Descriptor::Fixed { .. } => ValueClass::Decimal,
            Descriptor::FixedBytes(_) | Descriptor::Bytes => ValueClass::Bytes,
            Descriptor::Function => ValueClass::Function,
            Descriptor::Str => ValueClass::Str,
            Descriptor::Array { .. } => ValueClass::Array,
            Descriptor::Tuple(_) => ValueClass::Tuple,
        }
    }

    /// `true` iff any descendant is dynamic or a dynamic-length array
    pub fn is_dynamic(&self) -> bool {
        match self {
            Descriptor::Bool
            | Descriptor::Address
            | Descriptor::Int { .. }
            | Descriptor::Fixed { .. }
            | Descriptor::FixedBytes(_)
            | Descriptor::Function => false,
            Descriptor::Bytes | Descriptor::Str => true,
            Descriptor::Array { dynamic, .. } => *dynamic,
            Descriptor::Tuple(t) => t.is_dynamic(),
        }
    }

    /// The exact encoded length of this descriptor, if it is not dynamic.
    /// `None` for dynamic descriptors, whose length depends on the value.
    pub fn static_byte_length(&self) -> Option<usize> {
        match self {
            Descriptor::Bool
            | Descriptor::Address
            | Descriptor::Int { .. }
            | Descriptor::Fixed { .. }
            | Descriptor::FixedBytes(_)
            | Descriptor::Function => Some(WORD_SIZE),
            Descriptor::Bytes | Descriptor::Str => None,
            Descriptor::Array { static_len, .. } => *static_len,
            Descriptor::Tuple(t) => t.static_byte_length(),
        }
    }

    /// The size of this descriptor's slot in its enclosing head: its full
    /// static length if non-dynamic, or exactly one word (an offset slot) if
    /// dynamic.
    pub fn head_length(&self) -> usize {
        self.static_byte_length().unwrap_or(WORD_SIZE)
    }

    /// The canonical type string, e.g. `uint256`, `int24[2][]`, `(bool,bytes)`.
    pub fn canonical_type(&self) -> String {
        let mut s = String::new();
        self.write_canonical_type(&mut s);
        s
    }

    fn write_canonical_type(&self, out: &mut String) {
        match self {
            Descriptor::Bool => out.push_str("bool"),
            Descriptor::Address => out.push_str("address"),
            Descriptor::Int { bits, signed } => {
                if !signed {
                    out.push('u');
                }
                out.push_str("int");
                out.push_str(&bits.to_string());
            }
            Descriptor::Fixed { bits, signed, scale } => {
                if !signed {
                    out.push('u');
                }
                out.push_str("fixed");
                out.push_str(&bits.to_string());
                out.push('x');
                out.push_str(&scale.to_string());
            }
            Descriptor::FixedBytes(n) => {
                out.push_str("bytes");
                out.push_str(&n.to_string());
            }
            Descriptor::Bytes => out.push_str("bytes"),
            Descriptor::Function => out.push_str("function"),
            Descriptor::Str => out.push_str("string"),
            Descriptor::Array { element, length, .. } => {
                element.write_canonical_type(out);
                out.push('[');
                if let Some(k) = length {
                    out.push_str(&k.to_string());
                }
                out.push(']');
            }
            Descriptor::Tuple(t) => t.write_canonical_type(out),
        }
    }

    /// The element descriptor and fixed length (if any) of an array descriptor.
    pub fn as_array(&self) -> Option<(&Descriptor, Option<usize>)> {
        match self {
            Descriptor::Array { element, length, .. } => Some((element, *length)),
            _ => None,
        }
    }

    /// The tuple descriptor, if this is a tuple.
    pub fn as_tuple(&self) -> Option<&TupleDescriptor> {
        match self {
            Descriptor::Tuple(t) => Some(t),
            _ => None,
        }
    }

    /// Inclusive `[min, max]` bounds for an integer of this width/signedness.
    /// Only meaningful for `Descriptor::Int`.
    pub fn int_bounds(bits: u16, signed: bool) -> (BigInt, BigInt) {
        if signed {
            let max = (BigInt::from(1) << (bits - 1)) - 1;
            let min = -(BigInt::from(1) << (bits - 1));
            (min, max)
        } else {
            let max = (BigInt::from(1) << bits) - 1;
            (BigInt::from(0), max)
        }
    }
}

impl TupleDescriptor {
    pub fn new(children: Vec<Descriptor>, names: Option<Vec<String>>) -> Result<Self> {
        if let Some(names) = &names {
            if names.len() != children.len() {
                return Err(TypeParseError::NameCountMismatch {
                    expected: children.len(),
                    actual: names.len(),
                }
                .into());
            }
        }
        let dynamic = children.iter().any(Descriptor::is_dynamic);
        let static_len = if dynamic {
            None
        } else {
            let mut total = 0usize;
            for c in &children {
                total += c.static_byte_length().expect("non-dynamic child has a static length");
            }
            Some(total)
        };
        Ok(TupleDescriptor {
            children: children.into(),
            names: names.map(|n| n.into()),
            dynamic,
            static_len,
        })
    }

    pub fn arity(&self) -> usize {
        self.children.len()
    }

    pub fn children(&self) -> &[Descriptor] {
        &self.children
    }

    pub fn names(&self) -> Option<&[String]> {
        self.names.as_deref()
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    pub fn static_byte_length(&self) -> Option<usize> {
        self.static_len
    }

    pub fn head_length(&self) -> usize {
        self.static_byte_length().unwrap_or(WORD_SIZE)
    }

    fn write_canonical_type(&self, out: &mut String) {
        out.push('(');
        for (i, c) in self.children.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            c.write_canonical_type(out);
        }
        out.push(')');
    }

    pub fn canonical_type(&self) -> String {
        let mut s = String::new();
        self.write_canonical_type(&mut s);
        s
    }

    /// A new [`TupleDescriptor`] keeping only the children for which `mask[i]`
    /// is `true`. `mask.len()` must equal [`Self::arity`].
    pub fn select(&self, mask: &[bool]) -> Result<TupleDescriptor> {
        self.project(mask, true)
    }

    /// A new [`TupleDescriptor`] dropping the children for which `mask[i]` is
    /// `true`; the complement of [`Self::select`].
    pub fn exclude(&self, mask: &[bool]) -> Result<TupleDescriptor> {
        self.project(mask, false)
    }

    fn project(&self, mask: &[bool], keep_on_true: bool) -> Result<TupleDescriptor> {
        if mask.len() != self.arity() {
            return Err(TypeParseError::NameCountMismatch {
                expected: self.arity(),
                actual: mask.len(),
            }
            .into());
        }
        let mut children = Vec::new();
        let mut names = self.names.is_some().then(Vec::new);
        for (i, keep) in mask.iter().enumerate() {
            if *keep == keep_on_true {
                children.push(self.children[i].clone());
                if let (Some(names), Some(all_names)) = (&mut names, &self.names) {
                    names.push(all_names[i].clone());
                }
            }
        }
        TupleDescriptor::new(children, names)
    }
}

impl PartialEq for Descriptor {
    fn eq(&self, other: &Self) -> bool {
        self.canonical_type() == other.canonical_type()
    }
}
impl Eq for Descriptor {}

impl Hash for Descriptor {
    /// `31 * hash(canonical_type) + is_dynamic`.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical_type().hash(state);
        31u64.wrapping_mul(self.is_dynamic() as u64).hash(state);
    }
}

impl PartialEq for TupleDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.canonical_type() == other.canonical_type()
    }
}
impl Eq for TupleDescriptor {}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_type())
    }
}

impl fmt::Display for TupleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_type())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_types_are_never_dynamic_and_occupy_one_word() {
        for d in [
            Descriptor::Bool,
            Descriptor::Address,
            Descriptor::uint(256).unwrap(),
            Descriptor::int(8).unwrap(),
            Descriptor::fixed_bytes(32).unwrap(),
            Descriptor::fixed(128, 18).unwrap(),
            Descriptor::Function,
        ] {
            assert!(!d.is_dynamic());
            assert_eq!(d.static_byte_length(), Some(WORD_SIZE));
            assert_eq!(d.head_length(), WORD_SIZE);
        }
    }

    #[test]
    fn bytes_and_string_are_dynamic() {
        assert!(Descriptor::Bytes.is_dynamic());
        assert!(Descriptor::Str.is_dynamic());
        assert_eq!(Descriptor::Bytes.static_byte_length(), None);
        assert_eq!(Descriptor::Bytes.head_length(), WORD_SIZE);
    }

    #[test]
    fn fixed_array_of_static_element_is_static() {
        let d = Descriptor::array(Descriptor::uint(256).unwrap(), Some(3));
        assert!(!d.is_dynamic());
        assert_eq!(d.static_byte_length(), Some(3 * WORD_SIZE));
    }

    #[test]
    fn dynamic_length_array_is_dynamic() {
        let d = Descriptor::array(Descriptor::uint(256).unwrap(), None);
        assert!(d.is_dynamic());
        assert_eq!(d.static_byte_length(), None);
        assert_eq!(d.head_length(), WORD_SIZE);
    }

    #[test]
    fn fixed_array_of_dynamic_element_is_dynamic() {
        let d = Descriptor::array(Descriptor::Bytes, Some(3));
        assert!(d.is_dynamic());
    }

    #[test]
    fn function_canonical_type() {
        assert_eq!(Descriptor::Function.canonical_type(), "function");
        assert_eq!(Descriptor::Function.value_class_tag(), ValueClass::Function);
    }

    #[test]
    fn canonical_type_strings() {
        assert_eq!(Descriptor::uint(256).unwrap().canonical_type(), "uint256");
        assert_eq!(Descriptor::int(24).unwrap().canonical_type(), "int24");
        let nested = Descriptor::array(Descriptor::array(Descriptor::int(24).unwrap(), Some(2)), None);
        assert_eq!(nested.canonical_type(), "int24[2][]");
        let t = Descriptor::tuple(vec![Descriptor::Bytes, Descriptor::Bool], None).unwrap();
        assert_eq!(t.canonical_type(), "(bytes,bool)");
    }

    #[test]
    fn empty_tuple_canonical_type_and_staticness() {
        let t = Descriptor::tuple(vec![], None).unwrap();
        assert_eq!(t.canonical_type(), "()");
        assert!(!t.is_dynamic());
        assert_eq!(t.static_byte_length(), Some(0));
    }

    #[test]
    fn named_tuple_rejects_arity_mismatch() {
        let err = Descriptor::tuple(
            vec![Descriptor::Bool],
            Some(vec!["a".to_string(), "b".to_string()]),
        );
        assert!(err.is_err());
    }

    #[test]
    fn invalid_widths_are_rejected() {
        assert!(Descriptor::uint(0).is_err());
        assert!(Descriptor::uint(257).is_err());
        assert!(Descriptor::fixed_bytes(0).is_err());
        assert!(Descriptor::fixed_bytes(33).is_err());
        assert!(Descriptor::fixed(7, 18).is_err());
        assert!(Descriptor::fixed(128, 81).is_err());
    }

    #[test]
    fn select_and_exclude_are_complements() {
        let t = Descriptor::tuple(
            vec![Descriptor::Bool, Descriptor::Bytes, Descriptor::uint(8).unwrap()],
            None,
        )
        .unwrap()
        .as_tuple()
        .unwrap()
        .clone();
        let mask = [true, false, true];
        let selected = t.select(&mask).unwrap();
        let excluded = t.exclude(&mask).unwrap();
        assert_eq!(selected.canonical_type(), "(bool,uint8)");
        assert_eq!(excluded.canonical_type(), "(bytes)");
    }
}
