use crate::{block::WORD, error::GrowthError};

/// A one-way growable region of memory that the allocator carves blocks from.
///
/// `grow(n)` extends the region by exactly `n` bytes and returns the address
/// where the new bytes start; `grow(0)` only reports the current boundary,
/// which is also what `boundary` returns. The region never shrinks.
///
/// # Safety
///
/// `read_word` and `write_word` are safe to call with any address, so they
/// must be sound for every address: words inside a region previously returned
/// by `grow` are read and written, anything else panics. `grow` must only hand
/// out regions the arena owns exclusively.
pub unsafe trait Arena {
  fn grow(
    &mut self,
    increment: usize,
  ) -> Result<usize, GrowthError>;

  /// Address one past the last byte of the region.
  fn boundary(&self) -> usize;

  fn read_word(
    &self,
    address: usize,
  ) -> usize;

  fn write_word(
    &mut self,
    address: usize,
    value: usize,
  );
}

/// An arena backed by a `Vec<u8>`, addressed by offset from its first byte.
///
/// Every access is bounds checked, which makes it the provider of choice for
/// tests and for running several independent heaps side by side. A byte limit
/// simulates exhaustion of the host.
#[derive(Debug, Default, Clone)]
pub struct VecArena {
  bytes: Vec<u8>,
  limit: Option<usize>,
}

impl VecArena {
  pub fn new() -> Self {
    Self::default()
  }

  /// An arena that refuses to grow beyond `limit` bytes.
  pub fn with_limit(limit: usize) -> Self {
    Self {
      bytes: Vec::new(),
      limit: Some(limit),
    }
  }

  pub fn bytes(&self) -> &[u8] {
    &self.bytes
  }

  pub fn bytes_mut(&mut self) -> &mut [u8] {
    &mut self.bytes
  }
}

unsafe impl Arena for VecArena {
  fn grow(
    &mut self,
    increment: usize,
  ) -> Result<usize, GrowthError> {
    let start = self.bytes.len();
    let end = start
      .checked_add(increment)
      .ok_or(GrowthError::Refused { increment })?;

    if let Some(limit) = self.limit
      && end > limit
    {
      return Err(GrowthError::LimitExceeded { increment, limit });
    }

    self
      .bytes
      .try_reserve(increment)
      .map_err(|_| GrowthError::Refused { increment })?;
    self.bytes.resize(end, 0);
    Ok(start)
  }

  fn boundary(&self) -> usize {
    self.bytes.len()
  }

  fn read_word(
    &self,
    address: usize,
  ) -> usize {
    let mut word = [0; WORD];
    word.copy_from_slice(&self.bytes[address..address + WORD]);
    usize::from_ne_bytes(word)
  }

  fn write_word(
    &mut self,
    address: usize,
    value: usize,
  ) {
    self.bytes[address..address + WORD].copy_from_slice(&value.to_ne_bytes());
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn grow_returns_old_boundary() {
    let mut arena = VecArena::new();

    assert_eq!(arena.grow(0), Ok(0));
    assert_eq!(arena.grow(32), Ok(0));
    assert_eq!(arena.grow(8), Ok(32));
    assert_eq!(arena.grow(0), Ok(40));
    assert_eq!(arena.boundary(), 40);
  }

  #[test]
  fn limit_refuses_growth_without_moving_boundary() {
    let mut arena = VecArena::with_limit(64);

    assert_eq!(arena.grow(48), Ok(0));
    assert_eq!(
      arena.grow(17),
      Err(GrowthError::LimitExceeded {
        increment: 17,
        limit: 64
      })
    );
    assert_eq!(arena.grow(16), Ok(48));
    assert_eq!(arena.grow(0), Ok(64));
  }

  #[test]
  fn words_are_stored_at_unaligned_offsets() {
    let mut arena = VecArena::new();
    arena.grow(3 * WORD).unwrap();

    arena.write_word(3, usize::MAX - 1);
    assert_eq!(arena.read_word(3), usize::MAX - 1);
  }

  #[test]
  fn oversized_growth_is_refused_without_panicking() {
    let mut arena = VecArena::new();
    arena.grow(WORD).unwrap();

    let increment = isize::MAX as usize;
    assert_eq!(arena.grow(increment), Err(GrowthError::Refused { increment }));
    assert_eq!(arena.boundary(), WORD);
  }

  #[test]
  #[should_panic]
  fn reading_past_the_boundary_panics() {
    let mut arena = VecArena::new();
    arena.grow(WORD).unwrap();

    arena.read_word(1);
  }
}
