//! The error taxonomy and the location context attached to every failure.
//!
//! An [`Error`] is always a `(kind, path)` pair: [`ErrorKind`] says *what* went
//! wrong, [`Path`] says *where* in the value/type tree it went wrong. Callers
//! that only care about the kind of failure can match on [`Error::kind`];
//! callers building diagnostics can render the whole [`Error`] via `Display`,
//! which interleaves both.

use std::fmt::{self, Display};

pub type Result<T> = std::result::Result<T, Error>;

// --- Error ------------------------------------------------------------------------------------------------------

/// A (de)serialization or validation failure, with the path to the offending
/// element.
#[derive(Debug)]
#[non_exhaustive]
pub struct Error {
    kind: ErrorKind,
    path: Path,
}

impl Error {
    pub(crate) fn new<K: Into<ErrorKind>>(kind: K) -> Self {
        Self {
            kind: kind.into(),
            path: Path::default(),
        }
    }

    /// Prepend a path frame, e.g. while unwinding out of a tuple or array
    /// traversal. The innermost (first) call wins.
    pub(crate) fn push_frame(mut self, frame: PathFrame) -> Self {
        self.path.frames.insert(0, frame);
        self
    }

    /// The kind of error that occurred.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// The path to the value or type that the error occurred at.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::error::Error for Error {}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            Display::fmt(&self.kind, f)
        } else {
            write!(f, "{}: {}", self.path, self.kind)
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error::new(kind)
    }
}

// --- ErrorKind ----------------------------------------------------------------------------------------------------

/// The taxonomy of failures this crate can report.
///
/// Roughly in pipeline order: a [`TypeParseError`] can only occur while
/// turning a type string into a [`crate::descriptor::Descriptor`]; a
/// [`ValidationError`] or [`DecodeError`] occurs while validating/encoding or
/// decoding a value against an already-parsed descriptor; a
/// [`PackedDecodeError`] is specific to the non-standard packed encoding.
#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    TypeParse(TypeParseError),
    Validation(ValidationError),
    Decode(DecodeError),
    PackedDecode(PackedDecodeError),
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::TypeParse(e) => write!(f, "malformed type string: {e}"),
            ErrorKind::Validation(e) => write!(f, "invalid argument: {e}"),
            ErrorKind::Decode(e) => write!(f, "decode error: {e}"),
            ErrorKind::PackedDecode(e) => write!(f, "cannot decode packed encoding: {e}"),
        }
    }
}

impl From<TypeParseError> for ErrorKind {
    fn from(e: TypeParseError) -> Self {
        ErrorKind::TypeParse(e)
    }
}

impl From<ValidationError> for ErrorKind {
    fn from(e: ValidationError) -> Self {
        ErrorKind::Validation(e)
    }
}

impl From<DecodeError> for ErrorKind {
    fn from(e: DecodeError) -> Self {
        ErrorKind::Decode(e)
    }
}

impl From<PackedDecodeError> for ErrorKind {
    fn from(e: PackedDecodeError) -> Self {
        ErrorKind::PackedDecode(e)
    }
}

impl From<TypeParseError> for Error {
    fn from(e: TypeParseError) -> Self {
        Error::new(ErrorKind::TypeParse(e))
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Error::new(ErrorKind::Validation(e))
    }
}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Self {
        Error::new(ErrorKind::Decode(e))
    }
}

impl From<PackedDecodeError> for Error {
    fn from(e: PackedDecodeError) -> Self {
        Error::new(ErrorKind::PackedDecode(e))
    }
}

// --- TypeParseError -------------------------------------------------------------------------------------------------

/// Failures turning a canonical (or near-canonical) type string into a
/// descriptor tree.
#[derive(Debug)]
#[non_exhaustive]
pub enum TypeParseError {
    /// The type string is longer than the configured maximum.
    TooLong { len: usize, max: usize },
    /// Characters remained after a complete type was parsed.
    TrailingInput { at: usize, remainder: String },
    /// A bare identifier that isn't one of the recognized type tokens.
    UnknownToken(String),
    /// An `int<N>`/`uint<N>` width outside `1..=256`.
    InvalidIntWidth(String),
    /// A `bytes<N>` length outside `1..=32`.
    InvalidBytesLength(String),
    /// A `fixed<M>x<D>`/`ufixed<M>x<D>` whose `M` isn't a multiple of 8 in `8..=256`.
    InvalidFixedWidth(String),
    /// A `fixed<M>x<D>`/`ufixed<M>x<D>` whose `D` is outside `0..=80`.
    InvalidFixedScale(String),
    /// An array suffix (`[K]` or `[]`) that isn't a valid non-negative integer.
    MalformedArrayLength(String),
    /// A tuple that isn't a properly balanced, comma-separated parenthesized list.
    MalformedTuple(String),
    /// The number of element names supplied doesn't match the tuple arity.
    NameCountMismatch { expected: usize, actual: usize },
    /// The type string was empty where a type was expected.
    EmptyInput,
}

impl Display for TypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLong { len, max } => {
                write!(f, "type string length {len} exceeds maximum {max}")
            }
            Self::TrailingInput { at, remainder } => {
                write!(f, "trailing input at byte {at}: {remainder:?}")
            }
            Self::UnknownToken(tok) => write!(f, "unknown type token {tok:?}"),
            Self::InvalidIntWidth(tok) => write!(f, "invalid int/uint width in {tok:?}"),
            Self::InvalidBytesLength(tok) => write!(f, "invalid bytes<N> length in {tok:?}"),
            Self::InvalidFixedWidth(tok) => write!(f, "invalid fixed/ufixed width in {tok:?}"),
            Self::InvalidFixedScale(tok) => write!(f, "invalid fixed/ufixed scale in {tok:?}"),
            Self::MalformedArrayLength(tok) => write!(f, "malformed array suffix {tok:?}"),
            Self::MalformedTuple(tok) => write!(f, "malformed tuple {tok:?}"),
            Self::NameCountMismatch { expected, actual } => write!(
                f,
                "expected {expected} element names for tuple arity, got {actual}"
            ),
            Self::EmptyInput => write!(f, "empty type string"),
        }
    }
}

// --- ValidationError ------------------------------------------------------------------------------------------------

/// Failures validating a value against a descriptor.
#[derive(Debug)]
#[non_exhaustive]
pub enum ValidationError {
    /// A value was required but absent (e.g. a `null` element).
    NullValue,
    /// The runtime shape of the value doesn't match the descriptor.
    ClassMismatch {
        expected: &'static str,
        actual: &'static str,
    },
    /// A fixed-length array's element count doesn't match its descriptor.
    LengthMismatch { expected: usize, actual: usize },
    /// An integer value doesn't fit the descriptor's bit width/signedness.
    IntegerOutOfRange { bits: u16, signed: bool },
    /// A string value isn't representable in UTF-8. Can only occur when a
    /// value is constructed from raw bytes rather than from `Value::Str`.
    InvalidUtf8,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NullValue => write!(f, "missing value"),
            Self::ClassMismatch { expected, actual } => {
                write!(f, "expected a {expected} value, found a {actual} value")
            }
            Self::LengthMismatch { expected, actual } => {
                write!(f, "expected {expected} elements, found {actual}")
            }
            Self::IntegerOutOfRange { bits, signed } => {
                let kind = if *signed { "int" } else { "uint" };
                write!(f, "integer out of range for {kind}{bits}")
            }
            Self::InvalidUtf8 => write!(f, "string is not valid UTF-8"),
        }
    }
}

// --- DecodeError ----------------------------------------------------------------------------------------------------

/// Failures decoding ABI-encoded bytes or RLP bytes.
#[derive(Debug)]
#[non_exhaustive]
pub enum DecodeError {
    /// Fewer bytes remained than the value being decoded requires.
    Truncated { needed: usize, available: usize },
    /// A `bytes<N>`/dynamic byte payload's padding bytes weren't all zero.
    NonZeroPadding,
    /// A `bool` slot held a value other than 0 or 1.
    IllegalBoolean(u8),
    /// A dynamic child's offset pointed earlier than the current tail cursor.
    IllegalBackwardsJump { jump: u64, cursor: u64 },
    /// A dynamic child's offset skipped forward past the current tail cursor
    /// while decoding under [`crate::config::OffsetMode::Strict`].
    IllegalOffsetGap { offset: u64, expected: u64 },
    /// A dynamic child's offset exceeded the 31-bit bound.
    OffsetOutOfRange(u64),
    /// A decoded integer word's value doesn't fit the descriptor's declared
    /// bit width/signedness (e.g. a sign-extended negative value decoded
    /// against a `uint<N>` descriptor).
    IntegerOutOfRange { bits: u16, signed: bool },
    /// Bytes remained after a complete top-level value was decoded.
    TrailingBytes(usize),
    /// The RLP header at the current position isn't in canonical (minimal) form.
    NonCanonicalRlp(RlpHeaderError),
    /// Decoded data, when re-encoded, didn't match the original bytes (only
    /// produced when [`crate::config::Config::verify_reencoding`] is set).
    ReencodingMismatch,
    /// The underlying byte source of a [`crate::rlp::RlpStream`] failed.
    Io(String),
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { needed, available } => {
                write!(f, "truncated input: needed {needed} bytes, had {available}")
            }
            Self::NonZeroPadding => write!(f, "non-zero padding bytes"),
            Self::IllegalBoolean(b) => write!(f, "illegal boolean byte 0x{b:02x}"),
            Self::IllegalBackwardsJump { jump, cursor } => write!(
                f,
                "illegal backwards offset jump to {jump}, cursor was at {cursor}"
            ),
            Self::IllegalOffsetGap { offset, expected } => write!(
                f,
                "offset {offset} skips ahead of the expected cursor {expected} under strict offset mode"
            ),
            Self::OffsetOutOfRange(off) => write!(f, "offset {off} exceeds the 31-bit bound"),
            Self::IntegerOutOfRange { bits, signed } => {
                let kind = if *signed { "int" } else { "uint" };
                write!(f, "decoded integer out of range for {kind}{bits}")
            }
            Self::TrailingBytes(n) => write!(f, "{n} unconsumed trailing bytes"),
            Self::NonCanonicalRlp(e) => write!(f, "non-canonical RLP header: {e}"),
            Self::ReencodingMismatch => {
                write!(f, "decoded value did not re-encode to the original bytes")
            }
            Self::Io(msg) => write!(f, "byte source error: {msg}"),
        }
    }
}

/// The specific way an RLP header failed strict-mode canonical-encoding checks.
#[derive(Debug)]
#[non_exhaustive]
pub enum RlpHeaderError {
    /// A long-string header (`0xB8..`) whose length was < 56.
    LongStringTooShort,
    /// A long-list header (`0xF8..`) whose length was < 56.
    LongListTooShort,
    /// A length-of-length field had a leading zero byte.
    LeadingZeroInLengthOfLength,
    /// A single byte `< 0x80` was wrapped in a one-byte string header instead
    /// of being encoded bare.
    NonMinimalSingleByte,
    /// An item's encoded range extended past the end of its enclosing region.
    Overrun,
    /// `elements()` was called on an item whose header encoded a string, not a list.
    NotAList,
}

impl Display for RlpHeaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LongStringTooShort => write!(f, "long string header used for length < 56"),
            Self::LongListTooShort => write!(f, "long list header used for length < 56"),
            Self::LeadingZeroInLengthOfLength => {
                write!(f, "length-of-length has a leading zero byte")
            }
            Self::NonMinimalSingleByte => {
                write!(f, "single byte 0x00-0x7f wrapped in a string header")
            }
            Self::Overrun => write!(f, "item extends past the enclosing region"),
            Self::NotAList => write!(f, "elements() called on a string item"),
        }
    }
}

// --- PackedDecodeError -----------------------------------------------------------------------------------------------

/// Failures specific to decoding the non-standard packed encoding.
#[derive(Debug)]
#[non_exhaustive]
pub enum PackedDecodeError {
    /// The tuple has more than one dynamically-sized element, which makes
    /// packed decoding ambiguous.
    MultipleDynamicChildren,
    /// Packed decoding of arrays of dynamically-sized elements is not supported.
    DynamicArrayElement,
    /// Packed decoding refuses arrays whose element type packs to zero bytes.
    ZeroLengthArrayElement,
}

impl Display for PackedDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MultipleDynamicChildren => {
                write!(f, "more than one dynamic element, packed decoding is ambiguous")
            }
            Self::DynamicArrayElement => {
                write!(f, "cannot packed-decode arrays of dynamic elements")
            }
            Self::ZeroLengthArrayElement => {
                write!(f, "cannot packed-decode arrays of zero-length elements")
            }
        }
    }
}

// --- Path -------------------------------------------------------------------------------------------------------

/// A path to an element within a value tree, accumulated as errors unwind
/// through tuple and array traversals.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Path {
    frames: Vec<PathFrame>,
}

impl Path {
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[PathFrame] {
        &self.frames
    }
}

impl Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, frame) in self.frames.iter().enumerate() {
            if i > 0 {
                f.write_str(": ")?;
            }
            Display::fmt(frame, f)?;
        }
        Ok(())
    }
}

/// One frame of a [`Path`]: either a tuple child index or an array element index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathFrame {
    TupleIndex(usize),
    ArrayIndex(usize),
}

impl Display for PathFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TupleIndex(i) => write!(f, "tuple index {i}"),
            Self::ArrayIndex(i) => write!(f, "array index {i}"),
        }
    }
}

/// Composes path context onto an `Err(Error)` as it propagates out of a
/// tuple/array traversal.
pub(crate) trait WithFrame<T> {
    fn with_frame(self, frame: PathFrame) -> Result<T>;
}

impl<T> WithFrame<T> for Result<T> {
    fn with_frame(self, frame: PathFrame) -> Result<T> {
        self.map_err(|e| e.push_frame(frame))
    }
}
