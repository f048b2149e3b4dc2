//! Bit-level writer primitives.

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::Zero;

use crate::address::StdAddr;
use crate::error::Error;

/// A writable bit buffer of fixed capacity.
///
/// Bits are numbered most-significant first: bit `i` lives in byte `i / 8`
/// under the mask `1 << (7 - i % 8)`. Bits below the cursor are defined,
/// bits at or above it are zero until written. The buffer is never resized.
#[derive(Clone)]
pub struct BitString {
    data: Vec<u8>,
    bit_len: usize,
    capacity: usize,
}

impl BitString {
    /// Creates an empty bit string with the specified capacity in bits.
    pub fn with_capacity(bits: usize) -> Self {
        Self {
            data: vec![0; (bits + 7) / 8],
            bit_len: 0,
            capacity: bits,
        }
    }

    /// Interprets the specified bytes as bit content.
    ///
    /// When `fully_filled` is set (or the content is empty) the whole
    /// buffer is data. Otherwise the last byte carries a completion tag:
    /// the lowest set bit is the sentinel, everything above it is data.
    /// Fails when no sentinel is found within the trailing 7 bits.
    pub fn from_bytes_with_completion_tag(
        data: Vec<u8>,
        fully_filled: bool,
    ) -> Result<Self, Error> {
        let capacity = data.len() * 8;
        let mut res = Self {
            data,
            bit_len: capacity,
            capacity,
        };
        if !fully_filled && capacity > 0 {
            let mut found_tag = false;
            for _ in 0..7 {
                res.bit_len -= 1;
                let mask = 1 << (7 - res.bit_len % 8);
                if res.data[res.bit_len / 8] & mask != 0 {
                    res.data[res.bit_len / 8] &= !mask;
                    found_tag = true;
                    break;
                }
            }
            if !found_tag {
                return Err(Error::InvalidData);
            }
        }
        Ok(res)
    }

    /// Returns the number of written bits.
    #[inline]
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Returns the buffer capacity in bits.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns remaining capacity in bits.
    #[inline]
    pub fn spare_capacity(&self) -> usize {
        self.capacity - self.bit_len
    }

    /// Returns whether no bits were written yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bit_len == 0
    }

    /// Returns the underlying bytes occupied by written bits.
    ///
    /// Unused trailing bits of the last byte are guaranteed to be zero.
    #[inline]
    pub fn as_raw_slice(&self) -> &[u8] {
        &self.data[..(self.bit_len + 7) / 8]
    }

    /// Reads the bit at the specified index. Only written bits are visible.
    pub fn get(&self, index: usize) -> Option<bool> {
        if index < self.bit_len {
            Some(self.data[index / 8] & (1 << (7 - index % 8)) != 0)
        } else {
            None
        }
    }

    /// Overwrites a single already-written bit in place. Does not move the cursor.
    pub fn set(&mut self, index: usize, value: bool) -> Result<(), Error> {
        if index >= self.bit_len {
            return Err(Error::CellOverflow);
        }
        let mask = 1 << (7 - index % 8);
        if value {
            self.data[index / 8] |= mask;
        } else {
            self.data[index / 8] &= !mask;
        }
        Ok(())
    }

    /// Writes one bit at the cursor.
    pub fn store_bit(&mut self, value: bool) -> Result<(), Error> {
        if self.bit_len < self.capacity {
            self.push_bit(value);
            Ok(())
        } else {
            Err(Error::CellOverflow)
        }
    }

    /// Writes the specified number of zero bits.
    pub fn store_zeros(&mut self, bits: usize) -> Result<(), Error> {
        if self.bit_len + bits <= self.capacity {
            // Bits above the cursor are zero by the struct invariant
            self.bit_len += bits;
            Ok(())
        } else {
            Err(Error::CellOverflow)
        }
    }

    /// Writes the `bits` low bits of `value` big-endian (`bits` must be 0..=8).
    pub fn store_small_uint(&mut self, value: u8, bits: usize) -> Result<(), Error> {
        debug_assert!(bits <= 8);

        if bits < 8 && value >> bits != 0 {
            return Err(Error::IntOutOfRange);
        }
        if self.bit_len + bits > self.capacity {
            return Err(Error::CellOverflow);
        }
        for i in (0..bits).rev() {
            self.push_bit(value & (1 << i) != 0);
        }
        Ok(())
    }

    /// Writes `u8` as 8 bits.
    #[inline]
    pub fn store_u8(&mut self, value: u8) -> Result<(), Error> {
        self.store_small_uint(value, 8)
    }

    /// Writes `u16` as 16 bits big-endian.
    #[inline]
    pub fn store_u16(&mut self, value: u16) -> Result<(), Error> {
        self.store_bytes(&value.to_be_bytes())
    }

    /// Writes `u32` as 32 bits big-endian.
    #[inline]
    pub fn store_u32(&mut self, value: u32) -> Result<(), Error> {
        self.store_bytes(&value.to_be_bytes())
    }

    /// Writes the `bits`-wide big-endian representation of a non-negative integer.
    ///
    /// Fails with [`Error::IntOutOfRange`] when the value needs more than
    /// `bits` bits. A zero-width write of zero is a no-op.
    pub fn store_uint(&mut self, value: &BigUint, bits: usize) -> Result<(), Error> {
        if value.bits() as usize > bits {
            return Err(Error::IntOutOfRange);
        }
        if self.bit_len + bits > self.capacity {
            return Err(Error::CellOverflow);
        }
        for i in (0..bits).rev() {
            self.push_bit(value.bit(i as u64));
        }
        Ok(())
    }

    /// Writes a signed integer as a sign bit followed by `bits - 1` magnitude bits
    /// (two's complement for negative values).
    ///
    /// A one-bit write only supports `-1` and `0`.
    pub fn store_int(&mut self, value: &BigInt, bits: usize) -> Result<(), Error> {
        match bits {
            0 => {
                if value.is_zero() {
                    Ok(())
                } else {
                    Err(Error::IntOutOfRange)
                }
            }
            1 => {
                if value.is_zero() {
                    self.store_bit(false)
                } else if value.magnitude().bits() == 1 && value.sign() == Sign::Minus {
                    self.store_bit(true)
                } else {
                    Err(Error::IntOutOfRange)
                }
            }
            _ => {
                let unsigned = if value.sign() == Sign::Minus {
                    // Negative values are stored as `2^(bits - 1) + value`
                    (BigInt::from(1u8) << (bits - 1)) + value
                } else {
                    value.clone()
                };
                let unsigned = match unsigned.to_biguint() {
                    Some(value) => value,
                    None => return Err(Error::IntOutOfRange),
                };
                if unsigned.bits() as usize > bits - 1 {
                    return Err(Error::IntOutOfRange);
                }
                if self.bit_len + bits > self.capacity {
                    return Err(Error::CellOverflow);
                }
                self.push_bit(value.sign() == Sign::Minus);
                for i in (0..bits - 1).rev() {
                    self.push_bit(unsigned.bit(i as u64));
                }
                Ok(())
            }
        }
    }

    /// Writes each byte as an 8-bit unsigned integer.
    pub fn store_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        if self.bit_len + bytes.len() * 8 > self.capacity {
            return Err(Error::CellOverflow);
        }
        let r = self.bit_len % 8;
        let mut q = self.bit_len / 8;
        if r == 0 {
            self.data[q..q + bytes.len()].copy_from_slice(bytes);
        } else {
            for &byte in bytes {
                self.data[q] |= byte >> r;
                self.data[q + 1] = byte << (8 - r);
                q += 1;
            }
        }
        self.bit_len += bytes.len() * 8;
        Ok(())
    }

    /// Writes a string as its UTF-8 bytes.
    #[inline]
    pub fn store_str(&mut self, value: &str) -> Result<(), Error> {
        self.store_bytes(value.as_bytes())
    }

    /// Writes a `VarUInteger size` value: a `floor(log2(size))`-bit byte-length
    /// prefix followed by that many bytes of big-endian magnitude.
    pub fn store_var_uint(&mut self, value: &BigUint, size: usize) -> Result<(), Error> {
        debug_assert!(size > 1);

        let prefix_bits = (usize::BITS - 1 - size.leading_zeros()) as usize;
        if value.is_zero() {
            return self.store_uint(value, prefix_bits);
        }
        let byte_len = (value.bits() as usize + 7) / 8;
        if byte_len >= size || byte_len >> prefix_bits != 0 {
            return Err(Error::IntOutOfRange);
        }
        if self.bit_len + prefix_bits + byte_len * 8 > self.capacity {
            return Err(Error::CellOverflow);
        }
        ok!(self.store_uint(&BigUint::from(byte_len), prefix_bits));
        self.store_uint(value, byte_len * 8)
    }

    /// Writes a currency amount (`VarUInteger 16`): a 4-bit byte-length prefix
    /// and the big-endian magnitude. Zero is encoded as 4 zero bits.
    #[inline]
    pub fn store_coins(&mut self, value: &BigUint) -> Result<(), Error> {
        self.store_var_uint(value, 16)
    }

    /// Writes an optional standard internal address.
    ///
    /// `None` is `addr_none$00`; an address is `addr_std$10` with no anycast,
    /// a signed 8-bit workchain and a 256-bit account id.
    pub fn store_address(&mut self, address: Option<&StdAddr>) -> Result<(), Error> {
        match address {
            None => self.store_small_uint(0b00, 2),
            Some(addr) => {
                if self.bit_len + StdAddr::BIT_LEN > self.capacity {
                    return Err(Error::CellOverflow);
                }
                ok!(self.store_small_uint(0b10, 2));
                ok!(self.store_bit(false));
                ok!(self.store_int(&BigInt::from(addr.workchain), 8));
                self.store_bytes(&addr.address)
            }
        }
    }

    /// Appends all written bits of another bit string.
    pub fn store_bit_string(&mut self, other: &BitString) -> Result<(), Error> {
        if self.bit_len + other.bit_len > self.capacity {
            return Err(Error::CellOverflow);
        }
        for i in 0..other.bit_len {
            self.push_bit(other.data[i / 8] & (1 << (7 - i % 8)) != 0);
        }
        Ok(())
    }

    /// Returns the written bits as bytes, byte-aligned with a completion tag.
    ///
    /// When the cursor is not byte-aligned a single `1` bit followed by
    /// zeros pads the last byte, so the original bit length can be recovered
    /// by scanning back for the lowest set bit.
    pub fn to_bytes_with_completion_tag(&self) -> Vec<u8> {
        let mut res = self.as_raw_slice().to_vec();
        if self.bit_len % 8 != 0 {
            res[self.bit_len / 8] |= 1 << (7 - self.bit_len % 8);
        }
        res
    }

    /// Encodes the content in the Fift hex convention: upper-case digits,
    /// with a trailing `_` when a completion tag was needed to reach a
    /// nibble boundary.
    pub fn to_fift_hex(&self) -> String {
        const HEX_CHARS: &[u8; 16] = b"0123456789ABCDEF";

        let mut data = self.as_raw_slice().to_vec();
        let mut bit_len = self.bit_len;
        let tagged = bit_len % 4 != 0;
        if tagged {
            data[bit_len / 8] |= 1 << (7 - bit_len % 8);
            bit_len += 4 - bit_len % 4;
        }

        let mut res = String::with_capacity(bit_len / 4 + 1);
        for i in 0..bit_len / 4 {
            let byte = data[i / 2];
            let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0xf };
            res.push(HEX_CHARS[nibble as usize] as char);
        }
        if tagged {
            res.push('_');
        }
        res
    }

    #[inline]
    fn push_bit(&mut self, value: bool) {
        debug_assert!(self.bit_len < self.capacity);

        if value {
            self.data[self.bit_len / 8] |= 1 << (7 - self.bit_len % 8);
        }
        self.bit_len += 1;
    }
}

impl PartialEq for BitString {
    fn eq(&self, other: &Self) -> bool {
        self.bit_len == other.bit_len && self.as_raw_slice() == other.as_raw_slice()
    }
}

impl Eq for BitString {}

impl std::fmt::Display for BitString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_fift_hex())
    }
}

impl std::fmt::Debug for BitString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitString")
            .field("bit_len", &self.bit_len)
            .field("data", &self.to_fift_hex())
            .finish()
    }
}
