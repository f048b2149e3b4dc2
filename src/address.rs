//! Standard internal address.

use crate::util::DisplayHash;

/// Standard internal address: a workchain and a 256-bit account id.
///
/// This is the only address form the codec writes and reads
/// (`addr_std$10` without anycast); see [`BitString::store_address`]
/// and [`CellSlice::load_address`].
///
/// [`BitString::store_address`]: crate::BitString::store_address
/// [`CellSlice::load_address`]: crate::CellSlice::load_address
#[derive(Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct StdAddr {
    /// Workchain id (one-byte range).
    pub workchain: i8,
    /// Account id.
    pub address: [u8; 32],
}

impl StdAddr {
    /// The number of data bits that the serialized address occupies.
    ///
    /// - 2 bits id (`0b10`)
    /// - 1 bit Maybe None
    /// - 8 bits workchain
    /// - 256 bits address
    pub const BIT_LEN: usize = 2 + 1 + 8 + 256;

    /// Constructs an address from parts.
    #[inline]
    pub const fn new(workchain: i8, address: [u8; 32]) -> Self {
        Self { workchain, address }
    }
}

impl std::fmt::Debug for StdAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdAddr")
            .field("workchain", &self.workchain)
            .field("address", &DisplayHash(&self.address))
            .finish()
    }
}

impl std::fmt::Display for StdAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "{}:{}",
            self.workchain,
            DisplayHash(&self.address)
        ))
    }
}
