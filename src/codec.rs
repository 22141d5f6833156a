//! Text conversion for prefixes and addresses.
//!
//! Accepted forms are `address` (a host prefix) and `address/len`. Host bits
//! past `len` are dropped, so `193.168.9.1/8` reads as `193.0.0.0/8`. Output
//! is always the canonical `address/len` form, which reads back unchanged.

use std::fmt;
use std::str::FromStr;

use crate::error::{FormatError, Result};
use crate::key::{AddressBits, BitKey};

/// Parse `address` or `address/len` for the family of `B`.
pub fn parse_prefix<B: AddressBits>(text: &str) -> Result<BitKey<B>> {
    let (addr_text, len_text) = match text.split_once('/') {
        Some((addr, len)) => (addr, Some(len)),
        None => (text, None),
    };

    let bits = parse_bits::<B>(addr_text, text)?;
    let len = match len_text {
        None => B::WIDTH,
        Some(len) => parse_len::<B>(len, text)?,
    };

    Ok(BitKey::new(bits, len))
}

/// Parse a bare address as a host key. A `/len` suffix is rejected.
pub fn parse_addr<B: AddressBits>(text: &str) -> Result<BitKey<B>> {
    parse_bits::<B>(text, text).map(BitKey::host)
}

/// Canonical `address/len` text.
pub fn format<B: AddressBits>(key: &BitKey<B>) -> String {
    key.to_string()
}

fn parse_bits<B: AddressBits>(addr: &str, input: &str) -> Result<B> {
    addr.parse::<B::Addr>()
        .map(B::from_addr)
        .map_err(|_| FormatError::InvalidAddress {
            input: input.to_owned(),
            family: B::FAMILY,
        })
}

fn parse_len<B: AddressBits>(len: &str, input: &str) -> Result<u8> {
    if len.is_empty() {
        return Err(FormatError::MissingPrefixLength {
            input: input.to_owned(),
        });
    }
    // `u32::from_str` accepts a leading '+'.
    if !len.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FormatError::InvalidPrefixLength {
            input: input.to_owned(),
        });
    }
    let len: u32 = len.parse().map_err(|_| FormatError::InvalidPrefixLength {
        input: input.to_owned(),
    })?;
    if len > u32::from(B::WIDTH) {
        return Err(FormatError::PrefixLengthOutOfRange {
            len,
            max: B::WIDTH,
        });
    }
    Ok(len as u8)
}

impl<B: AddressBits> fmt::Display for BitKey<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bits().to_addr(), self.prefix_len())
    }
}

impl<B: AddressBits> FromStr for BitKey<B> {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self> {
        parse_prefix(s)
    }
}
