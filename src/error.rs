/// Error type for cell related errors.
#[derive(Debug, Copy, Clone, thiserror::Error)]
pub enum Error {
    /// There were not enough bits or refs in the cell slice.
    #[error("cell underflow")]
    CellUnderflow,
    /// There were not enough bits or refs capacity in the cell.
    #[error("cell overflow")]
    CellOverflow,
    /// Integer does not fit into the requested bit width.
    #[error("int does not fit into the target bit width")]
    IntOutOfRange,
    /// Malformed content (bad completion tag, unsupported address tag, etc).
    #[error("invalid data")]
    InvalidData,
}
