use thiserror::Error;

/// Failure reported by an [`Arena`](crate::Arena) when it cannot extend itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GrowthError {
  /// The host refused to move the boundary (e.g. `sbrk` returned `-1`).
  #[error("host refused to grow the arena by {increment} bytes")]
  Refused { increment: usize },
  /// Growing would push the arena past its configured limit.
  #[error("growing the arena by {increment} bytes exceeds its {limit} byte limit")]
  LimitExceeded { increment: usize, limit: usize },
}

/// Errors returned by [`FreeListAllocator::allocate`](crate::FreeListAllocator::allocate).
///
/// A failed allocation leaves the free list exactly as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
  /// No free block fits and the arena could not grow.
  #[error("out of memory: no room for a {requested} byte block")]
  Exhausted {
    requested: usize,
    #[source]
    source: GrowthError,
  },
  /// `size + HEADER_SIZE` does not fit in a `usize`.
  #[error("requested size {size} overflows the block length")]
  SizeOverflow { size: usize },
  /// Payloads are only word aligned.
  #[error("alignment {align} is larger than the supported word alignment")]
  UnsupportedAlignment { align: usize },
}

/// A free list invariant that does not hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvariantError {
  #[error("free block {address:#x} does not follow its predecessor {previous:#x}")]
  Unordered { previous: usize, address: usize },
  #[error("free block {previous:#x} overlaps free block {address:#x}")]
  Overlapping { previous: usize, address: usize },
  #[error("free blocks {previous:#x} and {address:#x} are adjacent but not coalesced")]
  Adjacent { previous: usize, address: usize },
  #[error("free block {address:#x} has prev link {found:?}, expected {expected:?}")]
  BrokenLink {
    address: usize,
    expected: Option<usize>,
    found: Option<usize>,
  },
  #[error("free block {address:#x} has length {length}, shorter than a header")]
  UndersizedBlock { address: usize, length: usize },
  #[error("free list records {recorded} blocks but {walked} are reachable")]
  LengthMismatch { recorded: usize, walked: usize },
}

/// A placement name that is neither first-fit nor best-fit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown placement strategy `{0}`, expected `first-fit` or `best-fit`")]
pub struct UnknownStrategy(pub String);

pub type Result<T, E = AllocError> = core::result::Result<T, E>;
