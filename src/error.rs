use derive_more::Display;

pub type Result<T> = core::result::Result<T, TriplexError>;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
#[display("{self:?}")]
pub enum TriplexError {
    /// Granularity was negative, fractional or not finite.
    InvalidGranularity,
    /// `(granularity + 1)^3` points cannot be allocated.
    GridTooLarge,
}

impl std::error::Error for TriplexError {}
