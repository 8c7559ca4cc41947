use std::{alloc, marker::PhantomData, ops::Range, ptr};

use libc::{c_void, intptr_t, sbrk};

use crate::{
  align,
  allocator::FreeListAllocator,
  arena::Arena,
  block::{HEADER_SIZE, WORD},
  error::{AllocError, GrowthError, InvariantError, Result},
  free_list::FreeBlock,
  placement::{Placement, Strategy},
};

/// Prints where `layout` landed and where the program break is now.
pub fn print_alloc(
  layout: alloc::Layout,
  addr: *mut u8,
) {
  println!(
    "Allocated {} bytes ({} with header), address = {:?}, program break = {:?}",
    layout.size(),
    align!(layout.size()) + HEADER_SIZE,
    addr,
    unsafe { sbrk(0) }
  );
}

/// The process data segment, grown with `sbrk(2)`.
///
/// The program break is process wide state, so this type is neither `Send`
/// nor `Sync`, and only one heap should drive it at a time. Other code may move
/// the break between two of our calls, so the arena remembers every region it
/// was given and refuses word access anywhere else.
#[derive(Debug, Default)]
pub(crate) struct SbrkArena {
  /// Granted regions in ascending order; touching regions are merged.
  regions: Vec<Range<usize>>,
  _not_send: PhantomData<*mut u8>,
}

impl SbrkArena {
  pub fn new() -> Self {
    Self::default()
  }

  fn owns_word(
    &self,
    address: usize,
  ) -> bool {
    let index = self.regions.partition_point(|region| region.end <= address);

    self.regions.get(index).is_some_and(|region| {
      region.start <= address && address.checked_add(WORD).is_some_and(|end| end <= region.end)
    })
  }

  fn record(
    &mut self,
    region: Range<usize>,
  ) {
    match self.regions.last_mut() {
      Some(last) if last.end == region.start => last.end = region.end,
      _ => self.regions.push(region),
    }
  }
}

unsafe impl Arena for SbrkArena {
  fn grow(
    &mut self,
    increment: usize,
  ) -> std::result::Result<usize, GrowthError> {
    let delta = intptr_t::try_from(increment).map_err(|_| GrowthError::Refused { increment })?;
    self
      .regions
      .try_reserve(1)
      .map_err(|_| GrowthError::Refused { increment })?;
    let address = unsafe { sbrk(delta) };

    if address == usize::MAX as *mut c_void {
      return Err(GrowthError::Refused { increment });
    }

    let start = address as usize;
    if increment > 0 {
      self.record(start..start + increment);
    }
    Ok(start)
  }

  fn boundary(&self) -> usize {
    unsafe { sbrk(0) as usize }
  }

  fn read_word(
    &self,
    address: usize,
  ) -> usize {
    assert!(self.owns_word(address), "read outside the program break arena at {address:#x}");
    // SAFETY: the word lies inside a region `sbrk` handed to this arena.
    unsafe { ptr::read_unaligned(address as *const usize) }
  }

  fn write_word(
    &mut self,
    address: usize,
    value: usize,
  ) {
    assert!(self.owns_word(address), "write outside the program break arena at {address:#x}");
    // SAFETY: as in `read_word`.
    unsafe { ptr::write_unaligned(address as *mut usize, value) }
  }
}

/// `malloc`/`free` style front end over the program break.
///
/// Sizes are rounded up to whole machine words, so headers and payloads stay
/// word aligned as long as the program break starts out word aligned.
pub struct BreakAllocator<P = Strategy> {
  heap: FreeListAllocator<SbrkArena, P>,
}

impl<P: Placement> BreakAllocator<P> {
  pub fn new(placement: P) -> Self {
    Self {
      heap: FreeListAllocator::new(SbrkArena::new(), placement),
    }
  }

  /// Reserves memory for `layout`.
  ///
  /// # Errors
  ///
  /// - [`AllocError::UnsupportedAlignment`] if `layout` needs more than word
  ///   alignment.
  /// - Whatever [`FreeListAllocator::allocate`] reports.
  pub fn try_allocate(
    &mut self,
    layout: alloc::Layout,
  ) -> Result<ptr::NonNull<u8>> {
    if layout.align() > WORD {
      return Err(AllocError::UnsupportedAlignment {
        align: layout.align(),
      });
    }

    let size = layout.size();
    if size > usize::MAX - WORD {
      return Err(AllocError::SizeOverflow { size });
    }

    let address = self.heap.allocate(align!(size))?;
    // SAFETY: a payload sits `HEADER_SIZE` bytes past its block, so it is never 0.
    Ok(unsafe { ptr::NonNull::new_unchecked(address as *mut u8) })
  }

  /// Like [`try_allocate`](Self::try_allocate) but returns null on failure.
  pub fn allocate(
    &mut self,
    layout: alloc::Layout,
  ) -> *mut u8 {
    self
      .try_allocate(layout)
      .map_or(ptr::null_mut(), ptr::NonNull::as_ptr)
  }

  /// Returns a block to the free list. Null is ignored.
  ///
  /// # Safety
  ///
  /// `address` must be null or come from this allocator and not have been
  /// deallocated since.
  pub unsafe fn deallocate(
    &mut self,
    address: *mut u8,
  ) {
    if address.is_null() {
      return;
    }

    unsafe { self.heap.release(address as usize) }
  }

  /// Growth of the program break since this allocator first looked at it.
  pub fn data_segment_size(&self) -> usize {
    self.heap.arena_size()
  }

  pub fn data_segment_free_space_size(&self) -> usize {
    self.heap.free_space_size()
  }

  pub fn free_blocks(&self) -> Vec<FreeBlock> {
    self.heap.free_blocks()
  }

  pub fn check_free_list(&self) -> std::result::Result<(), InvariantError> {
    self.heap.check_free_list()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::placement::FirstFit;

  // Everything below moves the real program break, so it stays in one test.
  #[test]
  fn reuses_released_blocks_on_the_program_break() {
    let mut allocator = BreakAllocator::new(FirstFit);

    unsafe {
      let first_addr = allocator.allocate(alloc::Layout::new::<u64>()) as *mut u64;
      assert!(!first_addr.is_null());

      *first_addr = 3u64;
      assert_eq!(*first_addr, 3);

      let size: usize = 6;
      let second_addr = allocator.allocate(alloc::Layout::array::<u16>(size).unwrap()) as *mut u16;

      for i in 0..size {
        *(second_addr.add(i)) = (i + 1) as u16;
      }

      assert_eq!(*first_addr, 3);
      for i in 0..size {
        assert_eq!((i + 1) as u16, *(second_addr.add(i)))
      }

      allocator.deallocate(first_addr as *mut u8);
      assert_eq!(allocator.data_segment_free_space_size(), 8 + HEADER_SIZE);

      let third_addr = allocator.allocate(alloc::Layout::new::<u32>()) as *mut u32;
      assert_eq!(first_addr as *mut u32, third_addr);
      assert_eq!(allocator.data_segment_free_space_size(), 0);

      allocator.deallocate(second_addr as *mut u8);
      allocator.deallocate(third_addr as *mut u8);
      allocator.deallocate(ptr::null_mut());
      allocator.check_free_list().unwrap();
    }

    let mut best = BreakAllocator::new(Strategy::BestFit);
    assert_eq!(
      best.try_allocate(alloc::Layout::from_size_align(8, 4 * WORD).unwrap()),
      Err(AllocError::UnsupportedAlignment { align: 4 * WORD })
    );
  }

  #[test]
  fn word_access_is_limited_to_granted_regions() {
    let mut arena = SbrkArena::new();
    arena.record(0x1000..0x1040);
    arena.record(0x1040..0x1080);
    arena.record(0x2000..0x2020);

    assert_eq!(arena.regions, vec![0x1000..0x1080, 0x2000..0x2020]);
    assert!(arena.owns_word(0x1000));
    assert!(arena.owns_word(0x1080 - WORD));
    assert!(arena.owns_word(0x1040 - 1));
    assert!(!arena.owns_word(0x1080 - WORD + 1));
    assert!(!arena.owns_word(0x0ff8));
    assert!(!arena.owns_word(0x1800));
    assert!(arena.owns_word(0x2000));
    assert!(!arena.owns_word(usize::MAX - 1));
  }

  #[test]
  #[should_panic(expected = "outside the program break arena")]
  fn foreign_addresses_panic_instead_of_writing() {
    let victim = 0usize;
    let mut arena = SbrkArena::new();

    arena.write_word(&victim as *const usize as usize, 1);
  }
}
