use num_bigint::BigUint;
use rustc_hash::FxHashMap;
use sha2::Digest;
use smallvec::SmallVec;

use super::BocTag;
use crate::bits::BitString;
use crate::cell::{Cell, CellHash};
use crate::error::Error;

/// Assembles a BOC envelope for a single root cell.
pub struct BocHeader<'a> {
    root: &'a Cell,
    include_index: bool,
    include_crc: bool,
    include_cache_bits: bool,
    flags: u8,
}

impl<'a> BocHeader<'a> {
    /// Creates an envelope builder with no offset index and no checksum.
    pub fn with_root(root: &'a Cell) -> Self {
        Self {
            root,
            include_index: false,
            include_crc: false,
            include_cache_bits: false,
            flags: 0,
        }
    }

    /// Whether to include the per-cell offset index.
    #[inline]
    pub fn with_index(mut self, include_index: bool) -> Self {
        self.include_index = include_index;
        self
    }

    /// Whether to append a CRC32-C trailer.
    #[inline]
    pub fn with_crc(mut self, include_crc: bool) -> Self {
        self.include_crc = include_crc;
        self
    }

    /// Whether to set the cache-bits flag. Only the flag is carried;
    /// cached offsets are never produced.
    #[inline]
    pub fn with_cache_bits(mut self, include_cache_bits: bool) -> Self {
        self.include_cache_bits = include_cache_bits;
        self
    }

    /// Sets the two reserved flag bits, written to the header as-is.
    #[inline]
    pub fn with_flags(mut self, flags: u8) -> Self {
        self.flags = flags & 0b11;
        self
    }

    /// Encodes the cell tree into bytes.
    ///
    /// Cells are laid out in a depth-first order where every reference
    /// points strictly forward and duplicates are merged by content hash.
    pub fn encode(self) -> Result<Vec<u8>, Error> {
        let mut walk = TreeWalk::default();
        walk.fill(self.root, None);

        let cells_num = walk.order.len();
        // NOTE: clamped to a single byte; graphs with more than 255
        // unique cells fail below when a reference index does not fit
        let ref_size = std::cmp::min(number_of_bytes_to_fit(cells_num as u64), 1);

        let mut bodies = Vec::with_capacity(cells_num);
        let mut size_index = Vec::with_capacity(cells_num);
        let mut full_size = 0u64;
        for (_, cell) in &walk.order {
            let body = ok!(serialize_for_boc(
                cell,
                &walk.indices,
                &mut walk.hashes,
                ref_size
            ));
            size_index.push(full_size);
            full_size += body.len() as u64;
            bodies.push(body);
        }

        let offset_size = std::cmp::max(number_of_bytes_to_fit(full_size), 1);

        // 4 bytes - BOC tag
        // 1 byte - flags
        // 1 byte - offset size
        // {ref_size} * 3 - cell count, root count, absent cell count
        // {offset_size} - total cells size
        // {ref_size} - root index
        // include_index * cells * {offset_size} - cell offsets
        // {full_size} - cells
        let total_size = 4
            + 2
            + (ref_size as u64) * 4
            + (offset_size as u64) * (1 + self.include_index as u64 * cells_num as u64)
            + full_size;

        let mut serialization = BitString::with_capacity(total_size as usize * 8);
        ok!(serialization.store_bytes(&BocTag::Generic.to_bytes()));
        ok!(serialization.store_bit(self.include_index));
        ok!(serialization.store_bit(self.include_crc));
        ok!(serialization.store_bit(self.include_cache_bits));
        ok!(serialization.store_small_uint(self.flags, 2));
        ok!(serialization.store_small_uint(ref_size as u8, 3));
        ok!(serialization.store_small_uint(offset_size as u8, 8));
        ok!(serialization.store_uint(&BigUint::from(cells_num), ref_size * 8));
        ok!(serialization.store_uint(&BigUint::from(1u8), ref_size * 8));
        ok!(serialization.store_uint(&BigUint::from(0u8), ref_size * 8));
        ok!(serialization.store_uint(&BigUint::from(full_size), offset_size * 8));
        // Root is always the first cell of the walk
        ok!(serialization.store_uint(&BigUint::from(0u8), ref_size * 8));
        if self.include_index {
            for offset in size_index {
                ok!(serialization.store_uint(&BigUint::from(offset), offset_size * 8));
            }
        }
        for body in &bodies {
            ok!(serialization.store_bytes(body));
        }

        let mut res = serialization.to_bytes_with_completion_tag();
        if self.include_crc {
            res.extend_from_slice(&crc32c::crc32c(&res).to_le_bytes());
        }
        Ok(res)
    }
}

/// Depth-first cell order keyed by content hash.
///
/// When a cell is reached again from a parent that comes later in the
/// order than the previously recorded copy, the copy (and its whole
/// subtree) is relocated to the end, so every reference in the final
/// order points strictly forward.
#[derive(Default)]
struct TreeWalk<'a> {
    order: Vec<(CellHash, &'a Cell)>,
    indices: FxHashMap<CellHash, usize>,
    hashes: HashMemo,
}

impl<'a> TreeWalk<'a> {
    fn fill(&mut self, cell: &'a Cell, parent_hash: Option<CellHash>) {
        let hash = self.hashes.repr_hash(cell);
        if let Some(&index) = self.indices.get(&hash) {
            if let Some(parent_hash) = parent_hash {
                if self.indices[&parent_hash] > index {
                    self.move_to_end(hash);
                }
            }
            return;
        }

        self.indices.insert(hash, self.order.len());
        self.order.push((hash, cell));
        for child in cell.references() {
            self.fill(child, Some(hash));
        }
    }

    fn move_to_end(&mut self, hash: CellHash) {
        let index = match self.indices.get(&hash) {
            Some(index) => *index,
            None => {
                debug_assert!(false, "relocated cell not found");
                return;
            }
        };
        for value in self.indices.values_mut() {
            if *value > index {
                *value -= 1;
            }
        }
        let item = self.order.remove(index);
        self.indices.insert(hash, self.order.len());
        self.order.push(item);

        for child in item.1.references() {
            let child_hash = self.hashes.repr_hash(child);
            self.move_to_end(child_hash);
        }
    }
}

/// Per-invocation hash cache keyed by cell identity.
#[derive(Default)]
struct HashMemo {
    cache: FxHashMap<*const Cell, CellHash>,
}

impl HashMemo {
    fn repr_hash(&mut self, cell: &Cell) -> CellHash {
        let key = cell as *const Cell;
        if let Some(hash) = self.cache.get(&key) {
            return *hash;
        }

        let mut child_hashes = SmallVec::<[CellHash; 4]>::new();
        for child in cell.references() {
            child_hashes.push(self.repr_hash(child));
        }
        let hash: CellHash =
            sha2::Sha256::digest(cell.repr_with_child_hashes(&child_hashes)).into();
        self.cache.insert(key, hash);
        hash
    }
}

fn serialize_for_boc(
    cell: &Cell,
    indices: &FxHashMap<CellHash, usize>,
    hashes: &mut HashMemo,
    ref_size: usize,
) -> Result<Vec<u8>, Error> {
    let descriptor = cell.descriptor();
    let mut res =
        Vec::with_capacity(2 + descriptor.byte_len() as usize + cell.references().len() * ref_size);
    res.push(descriptor.d1);
    res.push(descriptor.d2);
    res.extend_from_slice(&cell.bits().to_bytes_with_completion_tag());
    for child in cell.references() {
        let child_hash = hashes.repr_hash(child);
        let index = match indices.get(&child_hash) {
            Some(index) => *index,
            None => return Err(Error::InvalidData),
        };
        if index >> (ref_size * 8) != 0 {
            return Err(Error::IntOutOfRange);
        }
        res.extend_from_slice(&index.to_be_bytes()[std::mem::size_of::<usize>() - ref_size..]);
    }
    Ok(res)
}

fn number_of_bytes_to_fit(l: u64) -> usize {
    (8 - l.leading_zeros() / 8) as usize
}
