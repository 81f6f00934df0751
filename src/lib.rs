//! A crate for encoding and decoding Ethereum-style contract ABI values and
//! Recursive Length Prefix (RLP) data.
//!
//! This is the detailed API documentation. For a higher level introduction see the [README].
//!
//! [README]: https://crates.io/crates/abi-rlp-codec/
//!
//! # Usage
//!
//! Add the following to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! abi-rlp-codec = "0.1"
//! ```
//!
//! ## Type strings and descriptors
//!
//! Contract ABI types are described by [`descriptor::Descriptor`], built
//! either directly or by parsing a canonical Solidity type string with
//! [`parser::parse_type`]:
//!
//! ```
//! use abi_rlp_codec::{parser::parse_type, config::Config};
//!
//! let descriptor = parse_type("uint256[]", &Config::default()).unwrap();
//! assert_eq!(descriptor.canonical_type(), "uint256[]");
//! ```
//!
//! ## Encoding and decoding values
//!
//! [`value::Value`] holds a runtime ABI value; [`codec`] encodes and decodes
//! it against a [`descriptor::Descriptor`] or [`descriptor::TupleDescriptor`]:
//!
//! ```
//! use abi_rlp_codec::{codec, config::Config, parser::parse_type, value::Value};
//! use num_bigint::BigInt;
//!
//! let descriptor = parse_type("uint256", &Config::default()).unwrap();
//! let value = Value::Int(BigInt::from(42));
//! let bytes = codec::encode_single(&descriptor, &value).unwrap();
//! let decoded = codec::decode_single(&descriptor, &bytes, &Config::default()).unwrap();
//! assert_eq!(decoded, value);
//! ```
//!
//! The [`codec`] module distinguishes `*_single` (a lone value as an implicit
//! one-element sequence) from `*_params` (a tuple's children as a function's
//! literal top-level parameter list); see the module documentation for why
//! that distinction matters. A third family, `*_packed`, implements
//! Solidity's non-standard, offset-free packed encoding.
//!
//! ## Function calls
//!
//! [`function::Function`] builds canonical signatures, 4-byte selectors, and
//! full call data, given an externally supplied Keccak-256 implementation:
//!
//! ```
//! use abi_rlp_codec::{config::Config, function::Function, parser::parse_tuple_type, value::Value};
//!
//! fn keccak256(_msg: &[u8]) -> [u8; 32] { [0u8; 32] } // stand-in for a real hasher
//!
//! let inputs = parse_tuple_type("uint256,bool", &Config::default())
//!     .unwrap()
//!     .as_tuple()
//!     .unwrap()
//!     .clone();
//! let function = Function::new("transfer", inputs);
//! assert_eq!(function.signature(), "transfer(uint256,bool)");
//! ```
//!
//! ## RLP
//!
//! [`rlp::RlpItem`] parses a single RLP item as a zero-copy view into its
//! backing buffer; [`rlp::RlpReader`] streams consecutive top-level items
//! out of an already-materialized slice. [`rlp::RlpStream`] does the same
//! over an arbitrary [`std::io::Read`] source, buffering only as much as
//! the next item needs and erroring if the source ends mid-item:
//!
//! ```
//! use abi_rlp_codec::rlp::{RlpItem, RlpStream};
//!
//! let buf = [0x83, b'd', b'o', b'g'];
//! let item = RlpItem::wrap(&buf, 0, true).unwrap();
//! assert_eq!(item.payload(), b"dog");
//!
//! let mut stream = RlpStream::new(&buf[..], true);
//! let first = stream.next_item().unwrap().unwrap();
//! assert_eq!(first.payload(), b"dog");
//! assert!(stream.next_item().unwrap().is_none());
//! ```
//!
//! # ABI encoding
//!
//! Each ABI value occupies one or more 32-byte words. Static types (fixed
//! width integers, `bool`, `address`, `bytesN`, and arrays/tuples composed
//! entirely of static types) are written inline. Dynamic types (`bytes`,
//! `string`, dynamic-length arrays, and any array/tuple containing a dynamic
//! element) are written as a 32-byte offset in the head, pointing at their
//! payload in the tail, which follows the same offset/length encoding
//! recursively.
//!
//! Offsets are always relative to the start of the *enclosing sequence's own
//! head*, never to the start of the whole buffer. [`config::OffsetMode`]
//! controls how strictly the decoder checks that those offsets walk forward
//! without skipping bytes.
//!
//! # RLP encoding
//!
//! RLP items are either byte strings or lists of other RLP items, prefixed
//! by a header byte (and, for long items, a length-of-length field) that
//! encodes the item's kind and the length of its payload. [`rlp`] implements
//! both strict (canonical-only) and lenient parsing.
//!
//! # Error handling
//!
//! Every fallible entry point returns [`error::Result`]. A [`error::Error`]
//! carries both a typed [`error::ErrorKind`] and an optional [`error::Path`]
//! locating the offending element within a nested tuple/array tree, so that
//! a decode failure three levels deep in a struct points at exactly which
//! field went wrong rather than just "decoding failed".
//!
//! This crate does not try to be allocation-free. Memory is allocated to
//! decode into. When decoding untrusted input, configure
//! [`config::Config::max_type_len`] and bound the size of buffers you pass
//! to the decoder yourself; [`error::DecodeError::OffsetOutOfRange`] and the
//! various `Truncated` variants exist to fail fast on malformed or hostile
//! input rather than allocate unboundedly.
//!
//! For diagnostics, entry points in [`parser`], [`codec`], and [`function`]
//! emit `tracing` events at `trace`/`debug` level; enable a `tracing`
//! subscriber in your application to see them.

pub mod codec;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod function;
pub mod parser;
pub mod primitives;
pub mod rlp;
pub mod value;

#[doc(inline)]
pub use config::Config;
#[doc(inline)]
pub use descriptor::{Descriptor, TupleDescriptor};
#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use function::Function;
#[doc(inline)]
pub use value::Value;
