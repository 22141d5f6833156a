//! Errors surfaced when reading prefixes and addresses from text.
//!
//! Every trie operation on an already-built [`BitKey`](crate::BitKey) is
//! infallible; only the text boundary can fail.

use thiserror::Error;

use crate::key::Family;

/// Malformed address or prefix-length text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The address part is not a valid address of the expected family
    #[error("invalid {family} address: {input:?}")]
    InvalidAddress {
        /// The rejected text
        input: String,
        /// Family the text was parsed as
        family: Family,
    },

    /// A `/` with nothing after it
    #[error("missing prefix length after '/': {input:?}")]
    MissingPrefixLength {
        /// The rejected text
        input: String,
    },

    /// Prefix length that is not a decimal number
    #[error("invalid prefix length: {input:?}")]
    InvalidPrefixLength {
        /// The rejected text
        input: String,
    },

    /// Prefix length larger than the family width
    #[error("prefix length {len} out of range (max {max})")]
    PrefixLengthOutOfRange {
        /// Requested length
        len: u32,
        /// Width of the family
        max: u8,
    },
}

/// Result alias for text-boundary operations.
pub type Result<T> = std::result::Result<T, FormatError>;
