//! Address keys for the LC-trie
//!
//! The trie is generic over a fixed-width address scalar through
//! [`PrefixKey`], which captures the handful of bit operations the build and
//! search algorithms need: extracting a right-aligned bit field, clearing a
//! leading prefix, masking to a prefix length, and text parsing. Implemented
//! for `u32` (IPv4 dotted-quad) and `u128` (IPv6 colon-hex).
//!
//! Bit positions count from the most significant bit, matching the order in
//! which a prefix constrains an address.

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::error::{NetforgeError, Result};
use crate::io::{DataInput, DataOutput};

/// Fixed-width address scalar usable as an LC-trie key
pub trait PrefixKey: Copy + Eq + Ord + std::fmt::Debug + Send + Sync + 'static {
    /// Width of the key in bits (32 or 128)
    const BITS: u32;

    /// Extract `len` bits starting at bit `pos` (from the most significant
    /// end), right-aligned in the result. `len == 0` yields zero;
    /// `pos + len` must not exceed [`BITS`](Self::BITS).
    fn extract(self, pos: u32, len: u32) -> Self;

    /// Clear the first `prefix` bits, keeping the rest in place
    fn remove(self, prefix: u32) -> Self;

    /// Keep the first `len` bits, clearing the rest
    fn mask_to(self, len: u32) -> Self;

    /// Bitwise exclusive or
    fn xor(self, other: Self) -> Self;

    /// The low 32 bits, used to turn an extracted branch pattern into an
    /// array index (branch widths never exceed 31 bits)
    fn low_u32(self) -> u32;

    /// Whether every bit is zero
    fn is_zero(self) -> bool;

    /// Parse an address in its standard textual form
    fn parse_addr(text: &str) -> Result<Self>;

    /// Format the key in its standard textual form
    fn format_addr(self) -> String;

    /// Serialize the key
    fn write_key<O: DataOutput + ?Sized>(self, out: &mut O) -> Result<()>;

    /// Deserialize a key
    fn read_key<I: DataInput + ?Sized>(input: &mut I) -> Result<Self>;
}

/// IPv4 address key
pub type Ipv4Key = u32;

/// IPv6 address key
pub type Ipv6Key = u128;

impl PrefixKey for u32 {
    const BITS: u32 = 32;

    #[inline]
    fn extract(self, pos: u32, len: u32) -> Self {
        debug_assert!(pos + len <= Self::BITS);
        if len == 0 {
            return 0;
        }
        (self << pos) >> (Self::BITS - len)
    }

    #[inline]
    fn remove(self, prefix: u32) -> Self {
        if prefix == 0 {
            self
        } else if prefix >= Self::BITS {
            0
        } else {
            (self << prefix) >> prefix
        }
    }

    #[inline]
    fn mask_to(self, len: u32) -> Self {
        if len == 0 {
            0
        } else if len >= Self::BITS {
            self
        } else {
            self & (u32::MAX << (Self::BITS - len))
        }
    }

    #[inline]
    fn xor(self, other: Self) -> Self {
        self ^ other
    }

    #[inline]
    fn low_u32(self) -> u32 {
        self
    }

    #[inline]
    fn is_zero(self) -> bool {
        self == 0
    }

    fn parse_addr(text: &str) -> Result<Self> {
        let addr: Ipv4Addr = text
            .parse()
            .map_err(|_| NetforgeError::invalid_data(format!("bad IPv4 address: {:?}", text)))?;
        Ok(u32::from(addr))
    }

    fn format_addr(self) -> String {
        Ipv4Addr::from(self).to_string()
    }

    fn write_key<O: DataOutput + ?Sized>(self, out: &mut O) -> Result<()> {
        out.write_u32(self)
    }

    fn read_key<I: DataInput + ?Sized>(input: &mut I) -> Result<Self> {
        input.read_u32()
    }
}

impl PrefixKey for u128 {
    const BITS: u32 = 128;

    #[inline]
    fn extract(self, pos: u32, len: u32) -> Self {
        debug_assert!(pos + len <= Self::BITS);
        if len == 0 {
            return 0;
        }
        (self << pos) >> (Self::BITS - len)
    }

    #[inline]
    fn remove(self, prefix: u32) -> Self {
        if prefix == 0 {
            self
        } else if prefix >= Self::BITS {
            0
        } else {
            (self << prefix) >> prefix
        }
    }

    #[inline]
    fn mask_to(self, len: u32) -> Self {
        if len == 0 {
            0
        } else if len >= Self::BITS {
            self
        } else {
            self & (u128::MAX << (Self::BITS - len))
        }
    }

    #[inline]
    fn xor(self, other: Self) -> Self {
        self ^ other
    }

    #[inline]
    fn low_u32(self) -> u32 {
        self as u32
    }

    #[inline]
    fn is_zero(self) -> bool {
        self == 0
    }

    fn parse_addr(text: &str) -> Result<Self> {
        let addr: Ipv6Addr = text
            .parse()
            .map_err(|_| NetforgeError::invalid_data(format!("bad IPv6 address: {:?}", text)))?;
        Ok(u128::from(addr))
    }

    fn format_addr(self) -> String {
        Ipv6Addr::from(self).to_string()
    }

    fn write_key<O: DataOutput + ?Sized>(self, out: &mut O) -> Result<()> {
        out.write_u64((self >> 64) as u64)?;
        out.write_u64(self as u64)
    }

    fn read_key<I: DataInput + ?Sized>(input: &mut I) -> Result<Self> {
        let hi = input.read_u64()?;
        let lo = input.read_u64()?;
        Ok((u128::from(hi) << 64) | u128::from(lo))
    }
}
