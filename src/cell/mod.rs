//! Cell tree implementation.

use std::rc::Rc;

use sha2::Digest;

use crate::bits::BitString;
use crate::error::Error;
use crate::util::DisplayHash;

pub use self::descriptor::CellDescriptor;
pub use self::slice::CellSlice;

/// Cell descriptor bytes.
mod descriptor;

/// Cell view utils.
mod slice;

/// SHA-256 based cell identity.
pub type CellHash = [u8; 32];

/// Max cell data capacity in bits.
pub const MAX_BIT_LEN: usize = 1023;
/// Maximum number of child cells.
pub const MAX_REF_COUNT: usize = 4;

/// Representation hash of the cell without data and refs.
pub const EMPTY_CELL_HASH: CellHash = [
    0x96, 0xa2, 0x96, 0xd2, 0x24, 0xf2, 0x85, 0xc6, 0x7b, 0xee, 0x93, 0xc3, 0x0f, 0x8a, 0x30,
    0x91, 0x57, 0xf0, 0xda, 0xa3, 0x5d, 0xc5, 0xb8, 0x7e, 0x41, 0x0b, 0x78, 0x63, 0x0a, 0x09,
    0xcf, 0xc7,
];

/// A node in a cell tree: up to 1023 bits of data, up to 4 child cells
/// and an exotic marker.
///
/// Children may be shared between multiple parents; the graph rooted at
/// a cell is always acyclic because children are attached after they are
/// fully built.
#[derive(Clone)]
pub struct Cell {
    bits: BitString,
    references: Vec<Rc<Cell>>,
    is_exotic: bool,
}

impl Default for Cell {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Cell {
    /// Creates an empty ordinary cell.
    pub fn new() -> Self {
        Self {
            bits: BitString::with_capacity(MAX_BIT_LEN),
            references: Vec::new(),
            is_exotic: false,
        }
    }

    pub(crate) fn from_parts(bits: BitString, references: Vec<Rc<Cell>>, is_exotic: bool) -> Self {
        Self {
            bits,
            references,
            is_exotic,
        }
    }

    /// Returns the cell data.
    #[inline]
    pub fn bits(&self) -> &BitString {
        &self.bits
    }

    /// Returns the cell data for writing.
    #[inline]
    pub fn bits_mut(&mut self) -> &mut BitString {
        &mut self.bits
    }

    /// Returns whether the cell is marked as exotic.
    #[inline]
    pub fn is_exotic(&self) -> bool {
        self.is_exotic
    }

    /// Marks the cell as exotic. Only the flag is interpreted; exotic
    /// body semantics are not.
    #[inline]
    pub fn set_exotic(&mut self, is_exotic: bool) {
        self.is_exotic = is_exotic;
    }

    /// Returns child cells.
    #[inline]
    pub fn references(&self) -> &[Rc<Cell>] {
        &self.references
    }

    /// Returns a reference to the Nth child cell.
    #[inline]
    pub fn reference(&self, index: usize) -> Option<&Rc<Cell>> {
        self.references.get(index)
    }

    /// Attaches a child cell.
    pub fn push_reference(&mut self, child: Rc<Cell>) -> Result<(), Error> {
        if self.references.len() < MAX_REF_COUNT {
            self.references.push(child);
            Ok(())
        } else {
            Err(Error::CellOverflow)
        }
    }

    /// Appends the data and children of another cell to this one.
    ///
    /// The writer is responsible for keeping the result within cell
    /// limits; only the bit append is checked (against data capacity).
    pub fn store_cell(&mut self, other: &Cell) -> Result<(), Error> {
        ok!(self.bits.store_bit_string(&other.bits));
        self.references.extend(other.references.iter().cloned());
        Ok(())
    }

    /// Returns the depth of the deepest subtree, serialized as 16-bit
    /// big-endian in the representation pre-image.
    pub fn max_depth(&self) -> u16 {
        let mut depth = 0;
        for child in &self.references {
            depth = std::cmp::max(depth, child.max_depth());
        }
        if self.references.is_empty() {
            depth
        } else {
            depth.saturating_add(1)
        }
    }

    /// Returns the maximum level across the subtree. Always zero for
    /// graphs of ordinary cells.
    pub fn max_level(&self) -> u8 {
        let mut level = 0;
        for child in &self.references {
            level = std::cmp::max(level, child.max_level());
        }
        level
    }

    /// Computes the descriptor bytes for the current cell content.
    pub fn descriptor(&self) -> CellDescriptor {
        CellDescriptor::compute(
            self.references.len() as u8,
            self.is_exotic,
            self.max_level(),
            self.bits.bit_len(),
        )
    }

    /// Builds the canonical representation pre-image: descriptor bytes,
    /// tagged data, child depths, child hashes.
    pub fn repr(&self) -> Vec<u8> {
        let mut child_hashes = Vec::with_capacity(self.references.len());
        for child in &self.references {
            child_hashes.push(child.repr_hash());
        }
        self.repr_with_child_hashes(&child_hashes)
    }

    pub(crate) fn repr_with_child_hashes(&self, child_hashes: &[CellHash]) -> Vec<u8> {
        debug_assert_eq!(child_hashes.len(), self.references.len());

        let descriptor = self.descriptor();
        let mut res = Vec::with_capacity(
            2 + (self.bits.bit_len() + 7) / 8 + self.references.len() * (2 + 32),
        );
        res.push(descriptor.d1);
        res.push(descriptor.d2);
        res.extend_from_slice(&self.bits.to_bytes_with_completion_tag());
        for child in &self.references {
            res.extend_from_slice(&child.max_depth().to_be_bytes());
        }
        for hash in child_hashes {
            res.extend_from_slice(hash);
        }
        res
    }

    /// Computes the representation hash: SHA-256 over [`repr`].
    ///
    /// The hash is a pure function of the cell content and is recomputed
    /// on each call; the BOC serializer memoizes it per invocation.
    ///
    /// [`repr`]: Cell::repr
    pub fn repr_hash(&self) -> CellHash {
        sha2::Sha256::digest(self.repr()).into()
    }

    /// Returns true if the cell is empty (no bits, no refs).
    pub fn is_empty(&self) -> bool {
        self.repr_hash() == EMPTY_CELL_HASH
    }

    /// Returns this cell as a cell slice.
    #[inline]
    pub fn as_slice(&self) -> CellSlice<'_> {
        CellSlice::new(self)
    }

    /// Returns an object that implements [`Display`] for printing only
    /// the root cell of the cell tree.
    ///
    /// [`Display`]: std::fmt::Display
    #[inline]
    pub fn display_root(&self) -> DisplayCellRoot<'_> {
        DisplayCellRoot {
            cell: self,
            level: 0,
        }
    }

    /// Returns an object that implements [`Display`] for printing all
    /// cells in the cell tree.
    ///
    /// [`Display`]: std::fmt::Display
    #[inline]
    pub fn display_tree(&self) -> DisplayCellTree<'_> {
        DisplayCellTree(self)
    }
}

impl Eq for Cell {}

impl PartialEq for Cell {
    #[inline]
    fn eq(&self, other: &Cell) -> bool {
        self.repr_hash() == other.repr_hash()
    }
}

impl std::fmt::Debug for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cell")
            .field("bit_len", &self.bits.bit_len())
            .field("references", &self.references.len())
            .field("hash", &DisplayHash(&self.repr_hash()))
            .finish()
    }
}

/// Helper struct to print only the root cell in the cell tree.
#[derive(Clone, Copy)]
pub struct DisplayCellRoot<'a> {
    cell: &'a Cell,
    level: usize,
}

impl std::fmt::Display for DisplayCellRoot<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let indent = self.level * 2;
        f.write_fmt(format_args!(
            "{:indent$}x{{{}}}\n",
            "",
            self.cell.bits.to_fift_hex()
        ))
    }
}

/// Helper struct to print all cells in the cell tree.
#[derive(Clone, Copy)]
pub struct DisplayCellTree<'a>(&'a Cell);

impl std::fmt::Display for DisplayCellTree<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut stack = vec![(0, self.0)];

        while let Some((level, cell)) = stack.pop() {
            ok!(std::fmt::Display::fmt(&DisplayCellRoot { cell, level }, f));
            for child in cell.references.iter().rev() {
                stack.push((level + 1, child.as_ref()));
            }
        }

        Ok(())
    }
}
