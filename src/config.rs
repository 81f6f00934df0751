//! Runtime-configurable knobs.
//!
//! The codec is otherwise unconfigurable: every other behavior is fixed by
//! the wire format. Only the type-string length bound and the offset-jump
//! mode vary.

/// The default maximum length, in bytes, of a type string accepted by the
/// parser.
pub const DEFAULT_MAX_TYPE_LEN: usize = 2000;

/// Whether the decoder permits forward-skipping dynamic offsets.
///
/// Both modes reject backwards jumps; they differ only on offsets that skip
/// over intervening bytes without inspecting them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OffsetMode {
    /// Forward-skipping offsets are accepted and the skipped bytes are not
    /// inspected. This matches the lenient behavior of Solidity's reference
    /// encoder (see Solidity commit 3d1ca07) and is required to decode some
    /// real-world call data.
    Lenient,
    /// A dynamic child's offset must equal the current tail cursor; any gap
    /// is rejected.
    Strict,
}

/// Decoding/validation configuration.
///
/// `Config::default()` is strict-offset decoding with the default type
/// string length bound and no re-encoding verification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// The maximum accepted length of a type string.
    pub max_type_len: usize,
    /// The dynamic-offset jump discipline used while decoding.
    pub offset_mode: OffsetMode,
    /// If set, `decode` re-encodes the decoded value and fails with
    /// [`crate::error::DecodeError::ReencodingMismatch`] if it doesn't match
    /// the input exactly. Roughly doubles decode cost; off by default.
    pub verify_reencoding: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_type_len: DEFAULT_MAX_TYPE_LEN,
            offset_mode: OffsetMode::Strict,
            verify_reencoding: false,
        }
    }
}

impl Config {
    /// A config using [`OffsetMode::Lenient`], otherwise default.
    pub fn lenient() -> Self {
        Self {
            offset_mode: OffsetMode::Lenient,
            ..Self::default()
        }
    }
}
