use std::fmt;

use thiserror::Error;

/// The four bencode types, used to give context to decoding errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Integer,
    ByteString,
    List,
    Dictionary,
}

impl Kind {
    /// The byte that opens a value of this kind. Byte strings open with
    /// their length, so any ASCII digit is accepted, `0` is returned here.
    pub fn prefix(&self) -> u8 {
        match self {
            Kind::Integer => b'i',
            Kind::ByteString => b'0',
            Kind::List => b'l',
            Kind::Dictionary => b'd',
        }
    }

    /// The byte that closes a value of this kind. For byte strings this is
    /// the separator between the length and the bytes.
    pub fn suffix(&self) -> u8 {
        match self {
            Kind::ByteString => b':',
            Kind::Integer | Kind::List | Kind::Dictionary => b'e',
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Integer => "integer",
            Kind::ByteString => "byte string",
            Kind::List => "list",
            Kind::Dictionary => "dictionary",
        };
        f.write_str(name)
    }
}

/// Everything that can go wrong while decoding a bencoded buffer.
///
/// A decode that fails never returns a partially decoded value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Unexpected end of input")]
    UnexpectedEndOfInput,

    #[error("Malformed input, a value cannot start with the byte {0:#04x}")]
    MalformedInput(u8),

    #[error("Missing prefix '{}' for type {0}", char::from(.0.prefix()))]
    MissingPrefix(Kind),

    #[error("Missing suffix '{}' for type {0}", char::from(.0.suffix()))]
    MissingSuffix(Kind),

    #[error("Invalid format for type {0}")]
    InvalidFormat(Kind),

    #[error(
        "Byte string out of bounds, declared {declared} bytes but only \
         {available} are available"
    )]
    OutOfBounds { declared: usize, available: usize },

    #[error("{0} bytes of trailing data after the value")]
    TrailingData(usize),
}
