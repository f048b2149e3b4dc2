//! BOC (Bag Of Cells) implementation.

use std::rc::Rc;

use crate::cell::Cell;
use crate::error::Error;

/// BOC decoder implementation.
pub mod de;
/// BOC encoder implementation.
pub mod ser;

#[cfg(test)]
mod tests;

/// BOC magic bytes.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BocTag {
    /// Lean envelope with a mandatory offset index.
    Indexed,
    /// Lean envelope with a mandatory offset index and a CRC trailer.
    IndexedCrc32,
    /// Canonical envelope with a flags byte.
    Generic,
}

impl BocTag {
    const BOC_INDEXED_TAG: [u8; 4] = [0x68, 0xff, 0x65, 0xf3];
    const BOC_INDEXED_CRC32_TAG: [u8; 4] = [0xac, 0xc3, 0xa7, 0x28];
    const BOC_GENERIC_TAG: [u8; 4] = [0xb5, 0xee, 0x9c, 0x72];

    /// Tries to match bytes with BOC tag.
    pub const fn from_bytes(data: [u8; 4]) -> Option<Self> {
        match data {
            Self::BOC_INDEXED_TAG => Some(Self::Indexed),
            Self::BOC_INDEXED_CRC32_TAG => Some(Self::IndexedCrc32),
            Self::BOC_GENERIC_TAG => Some(Self::Generic),
            _ => None,
        }
    }

    /// Converts BOC tag to bytes.
    pub const fn to_bytes(self) -> [u8; 4] {
        match self {
            Self::Indexed => Self::BOC_INDEXED_TAG,
            Self::IndexedCrc32 => Self::BOC_INDEXED_CRC32_TAG,
            Self::Generic => Self::BOC_GENERIC_TAG,
        }
    }
}

/// BOC encoder/decoder.
pub struct Boc;

impl Boc {
    /// Encodes the specified cell tree as a minimal envelope
    /// (no offset index, no checksum).
    pub fn encode(cell: &Cell) -> Result<Vec<u8>, Error> {
        ser::BocHeader::with_root(cell).encode()
    }

    /// Encodes the specified cell tree as a minimal envelope in base64.
    pub fn encode_base64(cell: &Cell) -> Result<String, Error> {
        Ok(base64::encode(ok!(Self::encode(cell))))
    }

    /// Decodes an envelope that declares exactly one root cell.
    pub fn decode<T>(data: T) -> Result<Rc<Cell>, de::Error>
    where
        T: AsRef<[u8]>,
    {
        fn decode_impl(data: &[u8]) -> Result<Rc<Cell>, de::Error> {
            let header = ok!(de::BocHeader::decode(data, &de::Options::exact(1)));
            let cells = ok!(header.finalize());
            match cells.get(header.roots()[0]) {
                Some(cell) => Ok(cell),
                None => Err(de::Error::RootOutOfBounds),
            }
        }
        decode_impl(data.as_ref())
    }

    /// Decodes an envelope returning all declared root cells.
    pub fn decode_roots<T>(data: T) -> Result<Vec<Rc<Cell>>, de::Error>
    where
        T: AsRef<[u8]>,
    {
        fn decode_impl(data: &[u8]) -> Result<Vec<Rc<Cell>>, de::Error> {
            let header = ok!(de::BocHeader::decode(data, &de::Options::default()));
            let cells = ok!(header.finalize());

            let mut roots = Vec::with_capacity(header.roots().len());
            for &root in header.roots() {
                match cells.get(root) {
                    Some(cell) => roots.push(cell),
                    None => return Err(de::Error::RootOutOfBounds),
                }
            }
            Ok(roots)
        }
        decode_impl(data.as_ref())
    }

    /// Decodes a base64-encoded envelope with exactly one root cell.
    pub fn decode_base64<T>(data: T) -> Result<Rc<Cell>, de::Error>
    where
        T: AsRef<[u8]>,
    {
        match base64::decode(data) {
            Ok(data) => Self::decode(data),
            Err(_) => Err(de::Error::InvalidBase64),
        }
    }
}
