use std::rc::Rc;

use smallvec::SmallVec;

use super::BocTag;
use crate::bits::BitString;
use crate::cell::{Cell, CellDescriptor, MAX_REF_COUNT};

/// BOC deserialization options.
#[derive(Debug, Default, Clone)]
pub struct Options {
    /// The minimum allowed root count.
    pub min_roots: Option<usize>,
    /// The maximum allowed root count.
    pub max_roots: Option<usize>,
}

impl Options {
    /// Constructs decoder options to expect exactly the specified number of roots.
    pub const fn exact(number: usize) -> Self {
        Self {
            min_roots: Some(number),
            max_roots: Some(number),
        }
    }
}

/// Parsed BOC header.
pub struct BocHeader<'a> {
    cells: SmallVec<[RawCell<'a>; CELLS_ON_STACK]>,
    roots: SmallVec<[u32; ROOTS_ON_STACK]>,
}

/// Unresolved cell parts: descriptor, tagged data and child indices.
struct RawCell<'a> {
    descriptor: CellDescriptor,
    data: &'a [u8],
    references: SmallVec<[u32; MAX_REF_COUNT]>,
}

impl<'a> BocHeader<'a> {
    /// Decodes the envelope from the specified bytes.
    pub fn decode(data: &'a [u8], options: &Options) -> Result<Self, Error> {
        let mut reader = BocReader::new(data.len());

        // 4 bytes - tag
        // 1 byte - flags (or ref size for the lean tags)
        // 1 byte - offset size
        if !reader.require(6) {
            return Err(Error::UnexpectedEof);
        }

        let mut magic = [0u8; 4];
        magic.copy_from_slice(&data[..4]);
        let [flags, offset_size] = [data[4], data[5]];

        let has_index;
        let has_crc;
        let has_cache_bits;
        let ref_size;
        match BocTag::from_bytes(magic) {
            Some(BocTag::Indexed) => {
                has_index = true;
                has_crc = false;
                has_cache_bits = false;
                ref_size = flags as usize;
            }
            Some(BocTag::IndexedCrc32) => {
                has_index = true;
                has_crc = true;
                has_cache_bits = false;
                ref_size = flags as usize;
            }
            Some(BocTag::Generic) => {
                has_index = flags & 0b1000_0000 != 0;
                has_crc = flags & 0b0100_0000 != 0;
                has_cache_bits = flags & 0b0010_0000 != 0;
                ref_size = (flags & 0b0000_0111) as usize;
            }
            None => return Err(Error::UnknownBocTag),
        }

        if has_cache_bits && !has_index {
            return Err(Error::InvalidHeader);
        }
        if ref_size == 0 || ref_size > std::mem::size_of::<u32>() {
            return Err(Error::InvalidRefSize);
        }
        let offset_size = offset_size as usize;
        if offset_size == 0 || offset_size > std::mem::size_of::<u64>() {
            return Err(Error::InvalidOffsetSize);
        }
        reader.advance(6);

        // {ref_size} bytes - cell count
        // {ref_size} bytes - root count
        // {ref_size} bytes - absent cell count
        // {offset_size} bytes - total cells size
        if !reader.require(ref_size * 3 + offset_size) {
            return Err(Error::InvalidHeader);
        }
        let cell_count = reader.read_be_uint(data, ref_size) as usize;
        let root_count = reader.read_be_uint(data, ref_size) as usize;
        let absent_count = reader.read_be_uint(data, ref_size) as usize;
        let total_cells_size = reader.read_be_uint(data, offset_size);

        if root_count == 0 {
            return Err(Error::RootCellNotFound);
        }
        if root_count.saturating_add(absent_count) > cell_count {
            return Err(Error::TooManyRootCells);
        }
        if absent_count > 0 {
            return Err(Error::AbsentCellsNotSupported);
        }
        if let Some(min_roots) = options.min_roots {
            if root_count < min_roots {
                return Err(Error::TooFewRootCells);
            }
        }
        if root_count > options.max_roots.unwrap_or(MAX_ROOTS) {
            return Err(Error::TooManyRootCells);
        }

        if !reader.require(root_count * ref_size) {
            return Err(Error::UnexpectedEof);
        }
        let mut roots = SmallVec::with_capacity(root_count);
        for _ in 0..root_count {
            let root_index = reader.read_be_uint(data, ref_size);
            if root_index >= cell_count as u64 {
                return Err(Error::RootOutOfBounds);
            }
            roots.push(root_index as u32);
        }

        const MIN_CELL_SIZE: u64 = 2; // [d1, d2]

        if total_cells_size < (cell_count as u64) * MIN_CELL_SIZE {
            return Err(Error::InvalidTotalSize);
        }
        // 2 bytes - descriptor
        // 128 - max data length
        // 4 * {ref_size} - max references
        let max_cell_size = 2 + 128 + (MAX_REF_COUNT as u64) * ref_size as u64;
        if total_cells_size > (cell_count as u64) * max_cell_size {
            return Err(Error::InvalidTotalSize);
        }

        let index_size = has_index as u64 * cell_count as u64 * offset_size as u64;
        if !reader.require((index_size + total_cells_size + has_crc as u64 * 4) as usize) {
            return Err(Error::UnexpectedEof);
        }

        // Not required for parsing, since bodies are self-delimited
        // by their descriptors
        if has_index {
            reader.advance(cell_count * offset_size);
        }

        let cells_start_offset = reader.offset;

        let mut cells = SmallVec::with_capacity(cell_count);
        for _ in 0..cell_count {
            if !reader.require(2) {
                return Err(Error::UnexpectedEof);
            }
            let descriptor = CellDescriptor::new([data[reader.offset], data[reader.offset + 1]]);
            if descriptor.store_hashes() {
                return Err(Error::StoredHashesNotSupported);
            }
            let ref_count = descriptor.reference_count();
            if ref_count > MAX_REF_COUNT {
                return Err(Error::InvalidRef);
            }
            let data_len = descriptor.byte_len() as usize;
            if !reader.require(2 + data_len + ref_count * ref_size) {
                return Err(Error::UnexpectedEof);
            }
            reader.advance(2);

            let cell_data = &data[reader.offset..reader.offset + data_len];
            if !descriptor.is_aligned() {
                // A partially used last byte must carry a completion tag
                match cell_data.last() {
                    Some(0) | None => return Err(Error::UnnormalizedCell),
                    _ => {}
                }
            }
            reader.advance(data_len);

            let mut references = SmallVec::with_capacity(ref_count);
            for _ in 0..ref_count {
                let child_index = reader.read_be_uint(data, ref_size);
                if child_index >= cell_count as u64 {
                    return Err(Error::InvalidRef);
                }
                references.push(child_index as u32);
            }

            cells.push(RawCell {
                descriptor,
                data: cell_data,
                references,
            });
        }

        if (reader.offset - cells_start_offset) as u64 != total_cells_size {
            return Err(Error::InvalidTotalSize);
        }

        if has_crc {
            if !reader.require(4) {
                return Err(Error::UnexpectedEof);
            }
            let parsed_crc = u32::from_le_bytes([
                data[reader.offset],
                data[reader.offset + 1],
                data[reader.offset + 2],
                data[reader.offset + 3],
            ]);
            let real_crc = crc32c::crc32c(&data[..reader.offset]);
            if parsed_crc != real_crc {
                return Err(Error::InvalidChecksum);
            }
            reader.advance(4);
        }

        if reader.offset != data.len() {
            return Err(Error::UnexpectedTrailingBytes);
        }

        Ok(Self { cells, roots })
    }

    /// Resolves reference indices into owned cells, in reverse order so
    /// that every child is built before its parents. A reference that
    /// does not point strictly forward cannot be resolved and fails.
    pub fn finalize(&self) -> Result<ProcessedCells, Error> {
        let cell_count = self.cells.len();

        let mut res: Vec<Rc<Cell>> = Vec::with_capacity(cell_count);
        for cell in self.cells.iter().rev() {
            let bits = match BitString::from_bytes_with_completion_tag(
                cell.data.to_vec(),
                cell.descriptor.is_aligned(),
            ) {
                Ok(bits) => bits,
                Err(_) => return Err(Error::UnnormalizedCell),
            };

            let mut references = Vec::with_capacity(cell.references.len());
            for &child_index in &cell.references {
                let child = match res.get(cell_count - child_index as usize - 1) {
                    Some(child) => Rc::clone(child),
                    None => return Err(Error::InvalidRefOrder),
                };
                references.push(child);
            }

            res.push(Rc::new(Cell::from_parts(
                bits,
                references,
                cell.descriptor.is_exotic(),
            )));
        }

        Ok(ProcessedCells(res))
    }

    /// Root indices.
    pub fn roots(&self) -> &[u32] {
        &self.roots
    }

    /// The number of unique cells in the envelope.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

/// Array of processed cells.
pub struct ProcessedCells(Vec<Rc<Cell>>);

impl ProcessedCells {
    /// Returns a processed cell by index.
    pub fn get(&self, index: u32) -> Option<Rc<Cell>> {
        let index = self.0.len().checked_sub(index as usize + 1)?;
        self.0.get(index).cloned()
    }
}

/// Wrapper around indexed bytes slice access.
struct BocReader {
    len: usize,
    offset: usize,
}

impl BocReader {
    #[inline]
    const fn new(len: usize) -> Self {
        Self { len, offset: 0 }
    }

    #[inline]
    const fn require(&self, len: usize) -> bool {
        self.offset + len <= self.len
    }

    #[inline]
    fn advance(&mut self, bytes: usize) {
        self.offset += bytes;
    }

    /// Reads the next big-endian integer of 1..=8 bytes.
    fn read_be_uint(&mut self, data: &[u8], size: usize) -> u64 {
        debug_assert!((1..=8).contains(&size));

        let mut res = 0u64;
        for &byte in &data[self.offset..self.offset + size] {
            res = (res << 8) | byte as u64;
        }
        self.advance(size);
        res
    }
}

const CELLS_ON_STACK: usize = 16;
const ROOTS_ON_STACK: usize = 2;

const MAX_ROOTS: usize = 32;

/// Error type for BOC decoding related errors.
#[derive(Debug, Copy, Clone, thiserror::Error)]
pub enum Error {
    /// EOF encountered during another operation.
    #[error("unexpected EOF")]
    UnexpectedEof,
    /// Invalid magic bytes.
    #[error("unknown BOC tag")]
    UnknownBocTag,
    /// Invalid BOC header.
    #[error("invalid header")]
    InvalidHeader,
    /// References size is greater than 4.
    #[error("ref index does not fit in `u32` type")]
    InvalidRefSize,
    /// Offset size is greater than 8.
    #[error("cell offset does not fit in `u64` type")]
    InvalidOffsetSize,
    /// Root cell not found.
    #[error("root cell not found")]
    RootCellNotFound,
    /// The number of roots in BOC is greater than expected.
    #[error("too many root cells")]
    TooManyRootCells,
    /// The number of roots in BOC is less than expected.
    #[error("too few root cells")]
    TooFewRootCells,
    /// Absent cells are legacy therefore not supported.
    #[error("absent cells are not supported")]
    AbsentCellsNotSupported,
    /// Cells with explicitly stored hashes are not supported.
    #[error("explicitly stored hashes are not supported")]
    StoredHashesNotSupported,
    /// Total cells size mismatch.
    #[error("invalid total cells size")]
    InvalidTotalSize,
    /// Invalid root cell index.
    #[error("root index out of bounds")]
    RootOutOfBounds,
    /// Invalid child reference.
    #[error("invalid cell reference")]
    InvalidRef,
    /// Non-aligned cell without a completion tag.
    #[error("unnormalized cell")]
    UnnormalizedCell,
    /// A reference that does not point strictly forward.
    #[error("invalid children order")]
    InvalidRefOrder,
    /// Crc mismatch.
    #[error("invalid checksum")]
    InvalidChecksum,
    /// Leftover bytes after the envelope.
    #[error("unexpected trailing bytes")]
    UnexpectedTrailingBytes,
    /// Failed to decode base64 before parsing.
    #[error("invalid base64 string")]
    InvalidBase64,
}
