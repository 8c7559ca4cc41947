use log::trace;

use crate::{
  arena::Arena,
  block::{self, HEADER_SIZE, Header},
  error::InvariantError,
};

/// A free block as seen from outside the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeBlock {
  pub address: usize,
  pub length: usize,
}

impl FreeBlock {
  pub const fn end(&self) -> usize {
    self.address + self.length
  }
}

/// Intrusive, address ordered, doubly linked list of free blocks.
///
/// The links live in the block headers inside the arena, so every operation
/// takes the arena it indexes into. The list itself only remembers its head.
#[derive(Debug, Default)]
pub struct FreeList {
  head: Option<usize>,
  len: usize,
}

impl FreeList {
  pub const fn new() -> Self {
    Self { head: None, len: 0 }
  }

  pub const fn head(&self) -> Option<usize> {
    self.head
  }

  pub const fn len(&self) -> usize {
    self.len
  }

  pub const fn is_empty(&self) -> bool {
    self.head.is_none()
  }

  pub fn iter<'a, A: Arena + ?Sized>(
    &self,
    arena: &'a A,
  ) -> Iter<'a, A> {
    Iter {
      arena,
      cursor: self.head,
    }
  }

  /// Sum of the lengths of every free block.
  pub fn free_bytes<A: Arena + ?Sized>(
    &self,
    arena: &A,
  ) -> usize {
    self.iter(arena).map(|free| free.length).sum()
  }

  /// Removes the block at `address`, patching both neighbours and the head.
  pub fn unlink<A: Arena + ?Sized>(
    &mut self,
    arena: &mut A,
    address: usize,
  ) {
    let header = Header::load(arena, address);

    match header.prev {
      Some(prev) => block::set_next(arena, prev, header.next),
      None => self.head = header.next,
    }
    if let Some(next) = header.next {
      block::set_prev(arena, next, header.prev);
    }

    self.len -= 1;
  }

  /// Puts the block at `new` where the block at `old` was.
  ///
  /// `old` leaves the list; `new` takes over its links and its length is left
  /// as the caller wrote it.
  pub fn replace<A: Arena + ?Sized>(
    &mut self,
    arena: &mut A,
    old: usize,
    new: usize,
  ) {
    let header = Header::load(arena, old);

    block::set_prev(arena, new, header.prev);
    block::set_next(arena, new, header.next);

    match header.prev {
      Some(prev) => block::set_next(arena, prev, Some(new)),
      None => self.head = Some(new),
    }
    if let Some(next) = header.next {
      block::set_prev(arena, next, Some(new));
    }
  }

  /// Links the block at `address` in front of the first free block with a
  /// greater address, or at the tail if there is none.
  pub fn insert_ordered<A: Arena + ?Sized>(
    &mut self,
    arena: &mut A,
    address: usize,
  ) {
    self.len += 1;

    let Some(head) = self.head else {
      block::set_prev(arena, address, None);
      block::set_next(arena, address, None);
      self.head = Some(address);
      return;
    };

    let mut last = head;
    let mut cursor = Some(head);

    while let Some(current) = cursor {
      if current > address {
        let prev = Header::load(arena, current).prev;

        block::set_prev(arena, address, prev);
        block::set_next(arena, address, Some(current));
        match prev {
          Some(prev) => block::set_next(arena, prev, Some(address)),
          None => self.head = Some(address),
        }
        block::set_prev(arena, current, Some(address));
        return;
      }

      last = current;
      cursor = Header::load(arena, current).next;
    }

    block::set_next(arena, last, Some(address));
    block::set_prev(arena, address, Some(last));
    block::set_next(arena, address, None);
  }

  /// Coalesces a freshly inserted block with its successor, then with its
  /// predecessor, whenever they touch.
  pub fn merge<A: Arena + ?Sized>(
    &mut self,
    arena: &mut A,
    address: usize,
  ) {
    let header = Header::load(arena, address);

    if let Some(next) = header.next
      && address + header.length == next
    {
      let absorbed = block::length(arena, next);
      trace!("merging {address:#x} with next {next:#x}");

      self.unlink(arena, next);
      block::set_length(arena, address, header.length + absorbed);
    }

    let header = Header::load(arena, address);

    if let Some(prev) = header.prev
      && prev + block::length(arena, prev) == address
    {
      let prev_length = block::length(arena, prev);
      trace!("merging {address:#x} into previous {prev:#x}");

      self.unlink(arena, address);
      block::set_length(arena, prev, prev_length + header.length);
    }
  }

  /// Walks the list and verifies ordering, disjointness, coalescing and
  /// link consistency.
  pub fn check<A: Arena + ?Sized>(
    &self,
    arena: &A,
  ) -> Result<(), InvariantError> {
    let mut previous: Option<FreeBlock> = None;
    let mut walked = 0;
    let mut cursor = self.head;

    while let Some(address) = cursor {
      let header = Header::load(arena, address);

      if header.length < HEADER_SIZE {
        return Err(InvariantError::UndersizedBlock {
          address,
          length: header.length,
        });
      }

      let expected = previous.map(|free| free.address);
      if header.prev != expected {
        return Err(InvariantError::BrokenLink {
          address,
          expected,
          found: header.prev,
        });
      }

      if let Some(previous) = previous {
        if address <= previous.address {
          return Err(InvariantError::Unordered {
            previous: previous.address,
            address,
          });
        }
        if previous.end() > address {
          return Err(InvariantError::Overlapping {
            previous: previous.address,
            address,
          });
        }
        if previous.end() == address {
          return Err(InvariantError::Adjacent {
            previous: previous.address,
            address,
          });
        }
      }

      previous = Some(FreeBlock {
        address,
        length: header.length,
      });
      walked += 1;
      cursor = header.next;
    }

    if walked != self.len {
      return Err(InvariantError::LengthMismatch {
        recorded: self.len,
        walked,
      });
    }

    Ok(())
  }
}

pub struct Iter<'a, A: Arena + ?Sized> {
  arena: &'a A,
  cursor: Option<usize>,
}

impl<A: Arena + ?Sized> Iterator for Iter<'_, A> {
  type Item = FreeBlock;

  fn next(&mut self) -> Option<Self::Item> {
    let address = self.cursor?;
    let header = Header::load(self.arena, address);
    self.cursor = header.next;

    Some(FreeBlock {
      address,
      length: header.length,
    })
  }
}
