//! Fixed-width bit keys for IPv4 and IPv6 prefixes.
//!
//! A key is the address integer (MSB first, `u32` for IPv4 and `u128` for
//! IPv6) plus the number of significant leading bits. Bits past the prefix
//! length are always zero, so the derived `Eq`/`Hash`/`Ord` compare prefixes
//! and never look at host bits.

use std::fmt;
use std::hash::Hash;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use crate::error::FormatError;

/// Address family of a key space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// 32-bit keys.
    V4,
    /// 128-bit keys.
    V6,
}

impl Family {
    /// Maximum prefix length (and trie depth) of the family.
    #[inline]
    pub const fn max_bits(self) -> u8 {
        match self {
            Family::V4 => 32,
            Family::V6 => 128,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::V4 => f.write_str("IPv4"),
            Family::V6 => f.write_str("IPv6"),
        }
    }
}

// =============================================================================
// Bit primitives
// =============================================================================

/// Integer storage for one address family.
///
/// Bit `0` is the most significant bit of the address.
pub trait AddressBits: Copy + Eq + Ord + Hash + fmt::Debug + Send + Sync + 'static {
    /// Width of the key space in bits.
    const WIDTH: u8;
    /// Family this storage encodes.
    const FAMILY: Family;
    /// All bits clear.
    const ZERO: Self;

    /// Address type used for text conversion.
    type Addr: Copy + fmt::Display + FromStr;

    /// Keep the leading `len` bits, clear the rest.
    fn masked(self, len: u8) -> Self;

    /// Value (0 or 1) of bit `index`, counted from the MSB.
    fn bit(self, index: u8) -> usize;

    /// Number of leading bits shared with `other` (`WIDTH` when equal).
    fn leading_common(self, other: Self) -> u8;

    fn to_addr(self) -> Self::Addr;

    fn from_addr(addr: Self::Addr) -> Self;
}

macro_rules! impl_address_bits {
    ($ty:ty, $family:expr, $addr:ty) => {
        impl AddressBits for $ty {
            const WIDTH: u8 = <$ty>::BITS as u8;
            const FAMILY: Family = $family;
            const ZERO: Self = 0;

            type Addr = $addr;

            #[inline]
            fn masked(self, len: u8) -> Self {
                debug_assert!(len <= Self::WIDTH);
                if len == 0 {
                    0
                } else {
                    self & (<$ty>::MAX << (Self::WIDTH - len))
                }
            }

            #[inline]
            fn bit(self, index: u8) -> usize {
                debug_assert!(index < Self::WIDTH);
                ((self >> (Self::WIDTH - 1 - index)) & 1) as usize
            }

            #[inline]
            fn leading_common(self, other: Self) -> u8 {
                (self ^ other).leading_zeros() as u8
            }

            #[inline]
            fn to_addr(self) -> $addr {
                <$addr>::from(self)
            }

            #[inline]
            fn from_addr(addr: $addr) -> Self {
                <$ty>::from(addr)
            }
        }
    };
}

impl_address_bits!(u32, Family::V4, Ipv4Addr);
impl_address_bits!(u128, Family::V6, Ipv6Addr);

// =============================================================================
// BitKey
// =============================================================================

/// A CIDR prefix: address bits plus prefix length.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BitKey<B> {
    bits: B,
    len: u8,
}

impl<B: AddressBits> BitKey<B> {
    /// Build a prefix, clearing any bits past `len`.
    ///
    /// # Panics
    /// Panics if `len` exceeds the family width.
    #[inline]
    pub fn new(bits: B, len: u8) -> Self {
        assert!(
            len <= B::WIDTH,
            "prefix length {len} exceeds {} bits",
            B::WIDTH
        );
        Self {
            bits: bits.masked(len),
            len,
        }
    }

    /// Fallible form of [`BitKey::new`].
    pub fn try_new(bits: B, len: u8) -> Result<Self, FormatError> {
        if len > B::WIDTH {
            return Err(FormatError::PrefixLengthOutOfRange {
                len: u32::from(len),
                max: B::WIDTH,
            });
        }
        Ok(Self::new(bits, len))
    }

    /// Full-length key for a single address.
    #[inline]
    pub fn host(bits: B) -> Self {
        Self {
            bits,
            len: B::WIDTH,
        }
    }

    /// The zero-length prefix, which contains every address.
    #[inline]
    pub fn default_route() -> Self {
        Self {
            bits: B::ZERO,
            len: 0,
        }
    }

    #[inline]
    pub fn bits(&self) -> B {
        self.bits
    }

    #[inline]
    pub fn prefix_len(&self) -> u8 {
        self.len
    }

    #[inline]
    pub fn family(&self) -> Family {
        B::FAMILY
    }

    #[inline]
    pub fn is_host(&self) -> bool {
        self.len == B::WIDTH
    }

    /// Bit at `index` (which must be below the width).
    #[inline]
    pub fn bit(&self, index: u8) -> usize {
        self.bits.bit(index)
    }

    /// Length of the longest prefix shared by both keys.
    #[inline]
    pub fn common_prefix_len(&self, other: &Self) -> u8 {
        self.bits
            .leading_common(other.bits)
            .min(self.len)
            .min(other.len)
    }

    /// Whether `self` is a bit-prefix of `other` (no longer than it).
    #[inline]
    pub fn contains(&self, other: &Self) -> bool {
        self.len <= other.len && other.bits.masked(self.len) == self.bits
    }

    /// Shorten to `len` bits.
    #[inline]
    pub fn truncate(&self, len: u8) -> Self {
        debug_assert!(len <= self.len);
        Self {
            bits: self.bits.masked(len),
            len,
        }
    }
}

impl<B: AddressBits> fmt::Debug for BitKey<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl From<Ipv4Addr> for BitKey<u32> {
    fn from(addr: Ipv4Addr) -> Self {
        Self::host(u32::from(addr))
    }
}

impl From<Ipv6Addr> for BitKey<u128> {
    fn from(addr: Ipv6Addr) -> Self {
        Self::host(u128::from(addr))
    }
}
