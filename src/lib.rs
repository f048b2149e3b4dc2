//! Bag-of-Cells codec and cell data model for the TON blockchain.
//!
//! Cells are the native on-chain data primitive: up to 1023 bits of data
//! and up to 4 references to other cells, forming a DAG with shared
//! subtrees. This crate implements the bit-exact wire format used to
//! exchange such graphs (the "Bag of Cells" envelope) together with the
//! writer/reader primitives needed to build and parse cell payloads.

macro_rules! ok {
    ($e:expr $(,)?) => {
        match $e {
            core::result::Result::Ok(val) => val,
            core::result::Result::Err(err) => return core::result::Result::Err(err),
        }
    };
}

pub use self::address::StdAddr;
pub use self::bits::BitString;
pub use self::boc::Boc;
pub use self::cell::{
    Cell, CellDescriptor, CellHash, CellSlice, EMPTY_CELL_HASH, MAX_BIT_LEN, MAX_REF_COUNT,
};
pub use self::error::Error;

pub mod address;
pub mod bits;
pub mod boc;
pub mod cell;
pub mod error;
pub mod util;

#[cfg(feature = "serde")]
mod serde;
