use std::rc::Rc;

use num_bigint::{BigInt, BigUint};

use crate::address::StdAddr;
use crate::bits::BitString;
use crate::error::Error;

use super::Cell;

/// A read-only view over a cell with a bit cursor and a ref cursor.
///
/// Cursors only advance; reads past the end fail with
/// [`Error::CellUnderflow`].
#[derive(Clone, Copy)]
pub struct CellSlice<'a> {
    cell: &'a Cell,
    bit_cursor: usize,
    ref_cursor: usize,
}

impl<'a> CellSlice<'a> {
    /// Constructs a new cell slice from the specified cell.
    pub fn new(cell: &'a Cell) -> Self {
        Self {
            cell,
            bit_cursor: 0,
            ref_cursor: 0,
        }
    }

    /// Returns the underlying cell.
    #[inline]
    pub fn cell(&self) -> &'a Cell {
        self.cell
    }

    /// Returns the number of remaining bits of data in the slice.
    pub fn remaining_bits(&self) -> usize {
        self.cell.bits().bit_len() - self.bit_cursor
    }

    /// Returns the number of remaining references in the slice.
    pub fn remaining_refs(&self) -> usize {
        self.cell.references().len() - self.ref_cursor
    }

    /// Returns whether there are no bits of data left.
    pub fn is_data_empty(&self) -> bool {
        self.remaining_bits() == 0
    }

    /// Returns whether there are no references left.
    pub fn is_refs_empty(&self) -> bool {
        self.remaining_refs() == 0
    }

    /// Reads the next bit.
    pub fn load_bit(&mut self) -> Result<bool, Error> {
        match self.cell.bits().get(self.bit_cursor) {
            Some(bit) => {
                self.bit_cursor += 1;
                Ok(bit)
            }
            None => Err(Error::CellUnderflow),
        }
    }

    /// Reads the next `bits` (0..=8) as a small unsigned integer.
    pub fn load_small_uint(&mut self, bits: usize) -> Result<u8, Error> {
        debug_assert!(bits <= 8);

        if self.remaining_bits() < bits {
            return Err(Error::CellUnderflow);
        }
        let mut res = 0u8;
        for _ in 0..bits {
            res = (res << 1) | ok!(self.load_bit()) as u8;
        }
        Ok(res)
    }

    /// Reads the next `bits` into a new bit container.
    pub fn load_bits(&mut self, bits: usize) -> Result<BitString, Error> {
        if self.remaining_bits() < bits {
            return Err(Error::CellUnderflow);
        }
        let mut res = BitString::with_capacity(bits);
        for _ in 0..bits {
            let bit = ok!(self.load_bit());
            ok!(res.store_bit(bit));
        }
        Ok(res)
    }

    /// Reads the next `bits` as a big-endian unsigned integer.
    pub fn load_uint(&mut self, bits: usize) -> Result<BigUint, Error> {
        if self.remaining_bits() < bits {
            return Err(Error::CellUnderflow);
        }
        let mut res = BigUint::default();
        for i in (0..bits).rev() {
            if ok!(self.load_bit()) {
                res.set_bit(i as u64, true);
            }
        }
        Ok(res)
    }

    /// Reads the next `bits` as a signed integer, the inverse of
    /// [`BitString::store_int`].
    pub fn load_int(&mut self, bits: usize) -> Result<BigInt, Error> {
        match bits {
            0 => Ok(BigInt::default()),
            1 => Ok(if ok!(self.load_bit()) {
                BigInt::from(-1)
            } else {
                BigInt::default()
            }),
            _ => {
                if self.remaining_bits() < bits {
                    return Err(Error::CellUnderflow);
                }
                let negative = ok!(self.load_bit());
                let magnitude = BigInt::from(ok!(self.load_uint(bits - 1)));
                Ok(if negative {
                    magnitude - (BigInt::from(1u8) << (bits - 1))
                } else {
                    magnitude
                })
            }
        }
    }

    /// Reads a `VarUInteger size` value: a `floor(log2(size))`-bit
    /// byte-length prefix followed by that many bytes of magnitude.
    pub fn load_var_uint(&mut self, size: usize) -> Result<BigUint, Error> {
        debug_assert!(size > 1);

        let prefix_bits = (usize::BITS - 1 - size.leading_zeros()) as usize;
        let byte_len = ok!(self.load_small_uint(prefix_bits)) as usize;
        self.load_uint(byte_len * 8)
    }

    /// Reads a currency amount (`VarUInteger 16`).
    #[inline]
    pub fn load_coins(&mut self) -> Result<BigUint, Error> {
        self.load_var_uint(16)
    }

    /// Reads an optional standard internal address.
    ///
    /// Only `addr_none$00` and `addr_std$10` without anycast are
    /// supported; other tags fail with [`Error::InvalidData`].
    pub fn load_address(&mut self) -> Result<Option<StdAddr>, Error> {
        match ok!(self.load_small_uint(2)) {
            0b00 => Ok(None),
            0b10 => {
                if ok!(self.load_bit()) {
                    return Err(Error::InvalidData);
                }
                let workchain = ok!(self.load_small_uint(8)) as i8;
                let mut address = [0u8; 32];
                for byte in &mut address {
                    *byte = ok!(self.load_small_uint(8));
                }
                Ok(Some(StdAddr::new(workchain, address)))
            }
            _ => Err(Error::InvalidData),
        }
    }

    /// Returns the next unread child as a slice, advancing the ref cursor.
    pub fn load_ref(&mut self) -> Result<CellSlice<'a>, Error> {
        match self.cell.reference(self.ref_cursor) {
            Some(child) => {
                self.ref_cursor += 1;
                Ok(CellSlice::new(child))
            }
            None => Err(Error::CellUnderflow),
        }
    }

    /// Returns the next unread child cell, advancing the ref cursor.
    pub fn load_reference_cell(&mut self) -> Result<Rc<Cell>, Error> {
        match self.cell.reference(self.ref_cursor) {
            Some(child) => {
                self.ref_cursor += 1;
                Ok(child.clone())
            }
            None => Err(Error::CellUnderflow),
        }
    }
}

impl std::fmt::Debug for CellSlice<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellSlice")
            .field("bit_cursor", &self.bit_cursor)
            .field("ref_cursor", &self.ref_cursor)
            .field("cell", self.cell)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(f: impl FnOnce(&mut BitString)) -> Cell {
        let mut cell = Cell::new();
        f(cell.bits_mut());
        cell
    }

    #[test]
    fn unsigned_round_trip() {
        for bits in [1usize, 2, 7, 8, 9, 31, 32, 64, 100, 256] {
            let max = (BigUint::from(1u8) << bits) - 1u8;
            for value in [BigUint::default(), max.clone() >> 1, max] {
                let cell = build(|b| b.store_uint(&value, bits).unwrap());
                let mut slice = cell.as_slice();
                assert_eq!(slice.load_uint(bits).unwrap(), value);
                assert!(slice.is_data_empty());
            }
        }
    }

    #[test]
    fn signed_round_trip() {
        for bits in [2usize, 3, 8, 16, 33, 100] {
            let min = -(BigInt::from(1u8) << (bits - 1));
            let max = (BigInt::from(1u8) << (bits - 1)) - 1;
            for value in [min.clone(), BigInt::from(-1), BigInt::default(), max] {
                let cell = build(|b| b.store_int(&value, bits).unwrap());
                let mut slice = cell.as_slice();
                assert_eq!(slice.load_int(bits).unwrap(), value);
            }
        }
    }

    #[test]
    fn one_bit_int_round_trip() {
        for value in [BigInt::from(-1), BigInt::default()] {
            let cell = build(|b| b.store_int(&value, 1).unwrap());
            assert_eq!(cell.as_slice().load_int(1).unwrap(), value);
        }
    }

    #[test]
    fn var_uint_round_trip() {
        for value in [0u64, 1, 255, 256, 0xdead_beef, u64::MAX] {
            let value = BigUint::from(value);
            let cell = build(|b| b.store_var_uint(&value, 16).unwrap());
            assert_eq!(cell.as_slice().load_var_uint(16).unwrap(), value);
        }
    }

    #[test]
    fn coins_round_trip() {
        let value = BigUint::from(1_000_000_000u64);
        let cell = build(|b| b.store_coins(&value).unwrap());
        let mut slice = cell.as_slice();
        assert_eq!(slice.load_coins().unwrap(), value);
        assert!(slice.is_data_empty());
    }

    #[test]
    fn address_round_trip() {
        let cell = build(|b| b.store_address(None).unwrap());
        assert_eq!(cell.as_slice().load_address().unwrap(), None);

        let addr = StdAddr::new(0, [0x12; 32]);
        let cell = build(|b| b.store_address(Some(&addr)).unwrap());
        assert_eq!(cell.as_slice().load_address().unwrap(), Some(addr));
    }

    #[test]
    fn address_unsupported_tags() {
        // addr_extern$01
        let cell = build(|b| b.store_small_uint(0b01, 2).unwrap());
        assert!(matches!(
            cell.as_slice().load_address(),
            Err(Error::InvalidData)
        ));

        // addr_var$11
        let cell = build(|b| b.store_small_uint(0b11, 2).unwrap());
        assert!(matches!(
            cell.as_slice().load_address(),
            Err(Error::InvalidData)
        ));

        // addr_std$10 with anycast
        let cell = build(|b| b.store_small_uint(0b101, 3).unwrap());
        assert!(matches!(
            cell.as_slice().load_address(),
            Err(Error::InvalidData)
        ));
    }

    #[test]
    fn load_bits_returns_container() {
        let cell = build(|b| b.store_small_uint(0b1011, 4).unwrap());
        let mut slice = cell.as_slice();
        let bits = slice.load_bits(3).unwrap();
        assert_eq!(bits.bit_len(), 3);
        assert_eq!(bits.as_raw_slice(), [0b1010_0000]);
        assert_eq!(slice.remaining_bits(), 1);
        assert!(slice.load_bits(2).is_err());
    }

    #[test]
    fn refs_advance() {
        let mut child = Cell::new();
        child.bits_mut().store_u8(0x42).unwrap();

        let mut root = Cell::new();
        root.push_reference(Rc::new(child)).unwrap();

        let mut slice = root.as_slice();
        assert_eq!(slice.remaining_refs(), 1);
        let mut child_slice = slice.load_ref().unwrap();
        assert_eq!(child_slice.load_small_uint(8).unwrap(), 0x42);
        assert!(slice.load_ref().is_err());
    }

    #[test]
    fn string_content() {
        let cell = build(|b| b.store_str("hello").unwrap());
        let mut slice = cell.as_slice();
        assert_eq!(slice.remaining_bits(), 40);
        let bits = slice.load_bits(40).unwrap();
        assert_eq!(bits.as_raw_slice(), b"hello");
    }
}
