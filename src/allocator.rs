use core::cell::Cell;

use log::{debug, trace, warn};

use crate::{
  arena::Arena,
  block::{self, HEADER_SIZE, Header},
  error::{AllocError, InvariantError, Result},
  free_list::{FreeBlock, FreeList},
  placement::{BestFit, FirstFit, Placement, Strategy},
};

/// Heap that reuses released blocks before growing its arena.
///
/// Each instance owns its arena and its free list, so independent heaps can
/// live side by side. The placement policy is fixed for the lifetime of the
/// instance.
#[derive(Debug)]
pub struct FreeListAllocator<A, P = Strategy> {
  arena: A,
  placement: P,
  free_list: FreeList,
  start: Cell<Option<usize>>,
}

pub type FirstFitAllocator<A> = FreeListAllocator<A, FirstFit>;
pub type BestFitAllocator<A> = FreeListAllocator<A, BestFit>;

impl<A: Arena + Default, P: Placement + Default> Default for FreeListAllocator<A, P> {
  fn default() -> Self {
    Self::new(A::default(), P::default())
  }
}

impl<A: Arena, P: Placement> FreeListAllocator<A, P> {
  pub fn new(
    arena: A,
    placement: P,
  ) -> Self {
    Self {
      arena,
      placement,
      free_list: FreeList::new(),
      start: Cell::new(None),
    }
  }

  pub fn placement(&self) -> &P {
    &self.placement
  }

  pub fn arena(&self) -> &A {
    &self.arena
  }

  /// Mutable access to the arena, e.g. to fill an allocated payload.
  ///
  /// Writing outside a live payload corrupts the heap.
  pub fn arena_mut(&mut self) -> &mut A {
    &mut self.arena
  }

  pub fn into_arena(self) -> A {
    self.arena
  }

  /// Reserves `size` usable bytes and returns the address of the first one.
  ///
  /// A free block is reused when the placement policy finds one, otherwise
  /// the arena grows by exactly `size + HEADER_SIZE` bytes. A request for zero
  /// bytes still consumes a header.
  ///
  /// # Errors
  ///
  /// - [`AllocError::SizeOverflow`] if `size + HEADER_SIZE` overflows.
  /// - [`AllocError::Exhausted`] if nothing fits and the arena cannot grow.
  ///   The free list is left untouched.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<usize> {
    let needed = size
      .checked_add(HEADER_SIZE)
      .ok_or(AllocError::SizeOverflow { size })?;

    let address = match self.placement.select(&self.free_list, &self.arena, needed) {
      Some(free) => {
        self.carve(free, needed);
        free.address
      }
      None => self.grow(needed)?,
    };

    let payload = block::payload(address);
    trace!("allocate({size}) -> {payload:#x}");
    Ok(payload)
  }

  /// Hands a block back to the free list, coalescing it with free neighbours.
  ///
  /// # Safety
  ///
  /// `payload` must have been returned by [`allocate`](Self::allocate) on this
  /// same instance and must not have been released since. Nothing checks this.
  pub unsafe fn release(
    &mut self,
    payload: usize,
  ) {
    let address = block::from_payload(payload);
    trace!(
      "release({payload:#x}): block {address:#x}, length {}",
      block::length(&self.arena, address)
    );

    self.free_list.insert_ordered(&mut self.arena, address);
    self.free_list.merge(&mut self.arena, address);
  }

  /// Bytes the arena has grown by since this heap first looked at it.
  pub fn arena_size(&self) -> usize {
    let start = self.start_boundary();
    self.arena.boundary() - start
  }

  /// Total length, headers included, of every block on the free list.
  pub fn free_space_size(&self) -> usize {
    self.free_list.free_bytes(&self.arena)
  }

  /// Snapshot of the free list in address order.
  pub fn free_blocks(&self) -> Vec<FreeBlock> {
    self.free_list.iter(&self.arena).collect()
  }

  pub fn check_free_list(&self) -> core::result::Result<(), InvariantError> {
    self.free_list.check(&self.arena)
  }

  fn start_boundary(&self) -> usize {
    match self.start.get() {
      Some(start) => start,
      None => {
        let start = self.arena.boundary();
        self.start.set(Some(start));
        start
      }
    }
  }

  /// Takes `needed` bytes from the front of `free`, leaving the rest on the
  /// list when it can hold a header and at least one byte.
  fn carve(
    &mut self,
    free: FreeBlock,
    needed: usize,
  ) {
    if free.length - needed > HEADER_SIZE {
      let remainder = free.address + needed;
      trace!(
        "splitting {:#x}: {needed} allocated, {} left at {remainder:#x}",
        free.address,
        free.length - needed
      );

      block::set_length(&mut self.arena, remainder, free.length - needed);
      self.free_list.replace(&mut self.arena, free.address, remainder);
      Header::detached(needed).store(&mut self.arena, free.address);
    } else {
      trace!("taking whole block {:#x} of {} bytes", free.address, free.length);
      self.free_list.unlink(&mut self.arena, free.address);
      Header::detached(free.length).store(&mut self.arena, free.address);
    }
  }

  fn grow(
    &mut self,
    needed: usize,
  ) -> Result<usize> {
    self.start_boundary();

    let address = self.arena.grow(needed).map_err(|source| {
      warn!("cannot grow arena by {needed} bytes: {source}");
      AllocError::Exhausted {
        requested: needed,
        source,
      }
    })?;
    debug!("arena grew by {needed} bytes at {address:#x}");

    Header::detached(needed).store(&mut self.arena, address);
    Ok(address)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{arena::VecArena, error::GrowthError};

  fn first_fit() -> FirstFitAllocator<VecArena> {
    FreeListAllocator::new(VecArena::new(), FirstFit)
  }

  #[test]
  fn fresh_block_comes_from_arena() {
    let mut heap = first_fit();

    let payload = heap.allocate(100).unwrap();

    assert_eq!(payload, HEADER_SIZE);
    assert_eq!(heap.arena_size(), 100 + HEADER_SIZE);
    assert_eq!(heap.free_space_size(), 0);
    assert_eq!(block::length(heap.arena(), 0), 100 + HEADER_SIZE);
  }

  #[test]
  fn zero_sized_request_reserves_a_header() {
    let mut heap = first_fit();

    let first = heap.allocate(0).unwrap();
    let second = heap.allocate(0).unwrap();

    assert_eq!(second - first, HEADER_SIZE);
    assert_eq!(heap.arena_size(), 2 * HEADER_SIZE);
  }

  #[test]
  fn split_leaves_remainder_in_place() {
    let mut heap = first_fit();
    let big = heap.allocate(200).unwrap();
    let fence = heap.allocate(8).unwrap();
    unsafe { heap.release(big) };

    let small = heap.allocate(40).unwrap();

    assert_eq!(small, big);
    assert_eq!(
      heap.free_blocks(),
      vec![FreeBlock {
        address: block::from_payload(big) + 40 + HEADER_SIZE,
        length: 200 - 40,
      }]
    );
    assert!(fence > big);
    heap.check_free_list().unwrap();
  }

  #[test]
  fn split_needs_room_for_header_and_a_byte() {
    // A remainder of exactly one header is not worth keeping.
    let mut heap = first_fit();
    let block = heap.allocate(40 + HEADER_SIZE).unwrap();
    unsafe { heap.release(block) };

    assert_eq!(heap.allocate(40).unwrap(), block);
    assert!(heap.free_blocks().is_empty());
    assert_eq!(
      block::length(heap.arena(), block::from_payload(block)),
      40 + 2 * HEADER_SIZE
    );

    // One more byte and it is.
    let mut heap = first_fit();
    let block = heap.allocate(41 + HEADER_SIZE).unwrap();
    unsafe { heap.release(block) };

    assert_eq!(heap.allocate(40).unwrap(), block);
    assert_eq!(heap.free_space_size(), HEADER_SIZE + 1);
  }

  #[test]
  fn exact_fit_reuses_without_growth() {
    let mut heap = first_fit();
    let block = heap.allocate(64).unwrap();
    unsafe { heap.release(block) };
    let size = heap.arena_size();

    assert_eq!(heap.allocate(64).unwrap(), block);
    assert_eq!(heap.arena_size(), size);
    assert_eq!(heap.free_space_size(), 0);
  }

  #[test]
  fn exhaustion_leaves_free_list_untouched() {
    let mut heap = FreeListAllocator::new(VecArena::with_limit(256), BestFit);
    let first = heap.allocate(64).unwrap();
    let _second = heap.allocate(64).unwrap();
    unsafe { heap.release(first) };
    let before = heap.free_blocks();

    let err = heap.allocate(128).unwrap_err();

    assert_eq!(
      err,
      AllocError::Exhausted {
        requested: 128 + HEADER_SIZE,
        source: GrowthError::LimitExceeded {
          increment: 128 + HEADER_SIZE,
          limit: 256,
        },
      }
    );
    assert_eq!(heap.free_blocks(), before);
    assert_eq!(heap.arena_size(), 2 * (64 + HEADER_SIZE));
  }

  #[test]
  fn huge_request_reports_exhaustion() {
    let mut heap = first_fit();
    let kept = heap.allocate(32).unwrap();
    unsafe { heap.release(kept) };
    let before = heap.free_blocks();
    let requested = isize::MAX as usize + HEADER_SIZE;

    assert_eq!(
      heap.allocate(isize::MAX as usize),
      Err(AllocError::Exhausted {
        requested,
        source: GrowthError::Refused {
          increment: requested,
        },
      })
    );
    assert_eq!(heap.free_blocks(), before);
    assert_eq!(heap.arena_size(), 32 + HEADER_SIZE);
  }

  #[test]
  fn overflowing_size_is_rejected() {
    let mut heap = first_fit();

    assert_eq!(
      heap.allocate(usize::MAX),
      Err(AllocError::SizeOverflow { size: usize::MAX })
    );
    assert_eq!(heap.arena_size(), 0);
  }

  #[test]
  fn arena_size_counts_from_first_observation() {
    let mut arena = VecArena::new();
    arena.grow(512).unwrap();
    let mut heap = FreeListAllocator::new(arena, Strategy::BestFit);

    assert_eq!(heap.arena_size(), 0);
    heap.allocate(8).unwrap();
    assert_eq!(heap.arena_size(), 8 + HEADER_SIZE);
  }

  #[test]
  fn release_into_empty_list_becomes_head() {
    let mut heap = first_fit();
    let block = heap.allocate(16).unwrap();

    unsafe { heap.release(block) };

    assert_eq!(
      Header::load(heap.arena(), block::from_payload(block)),
      Header::detached(16 + HEADER_SIZE)
    );
    assert_eq!(heap.free_blocks().len(), 1);
  }
}
