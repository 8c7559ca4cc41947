use crate::arena::Arena;

/// Size of a machine word, the unit every header field is stored in.
pub const WORD: usize = core::mem::size_of::<usize>();

/// Bytes reserved in front of every block: `length`, `prev` and `next`.
pub const HEADER_SIZE: usize = 3 * WORD;

/// Encoding of a missing link inside the arena.
const NIL: usize = usize::MAX;

const LENGTH: usize = 0;
const PREV: usize = WORD;
const NEXT: usize = 2 * WORD;

/// Metadata stored at the start of every block, free or allocated.
///
/// `length` counts the whole block, header included. The links are only
/// meaningful while the block sits on the free list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
  pub length: usize,
  pub prev: Option<usize>,
  pub next: Option<usize>,
}

impl Header {
  /// A header that is not linked to anything.
  pub fn detached(length: usize) -> Self {
    Self {
      length,
      prev: None,
      next: None,
    }
  }

  pub fn load<A: Arena + ?Sized>(
    arena: &A,
    address: usize,
  ) -> Self {
    Self {
      length: arena.read_word(address + LENGTH),
      prev: decode(arena.read_word(address + PREV)),
      next: decode(arena.read_word(address + NEXT)),
    }
  }

  pub fn store<A: Arena + ?Sized>(
    &self,
    arena: &mut A,
    address: usize,
  ) {
    arena.write_word(address + LENGTH, self.length);
    arena.write_word(address + PREV, encode(self.prev));
    arena.write_word(address + NEXT, encode(self.next));
  }
}

pub fn length<A: Arena + ?Sized>(
  arena: &A,
  address: usize,
) -> usize {
  arena.read_word(address + LENGTH)
}

pub fn set_length<A: Arena + ?Sized>(
  arena: &mut A,
  address: usize,
  length: usize,
) {
  arena.write_word(address + LENGTH, length);
}

pub fn set_prev<A: Arena + ?Sized>(
  arena: &mut A,
  address: usize,
  prev: Option<usize>,
) {
  arena.write_word(address + PREV, encode(prev));
}

pub fn set_next<A: Arena + ?Sized>(
  arena: &mut A,
  address: usize,
  next: Option<usize>,
) {
  arena.write_word(address + NEXT, encode(next));
}

/// Address handed to the caller for the block at `address`.
pub const fn payload(address: usize) -> usize {
  address + HEADER_SIZE
}

/// Block address recovered from a payload address. Not validated.
pub const fn from_payload(payload: usize) -> usize {
  payload - HEADER_SIZE
}

fn encode(link: Option<usize>) -> usize {
  link.unwrap_or(NIL)
}

fn decode(word: usize) -> Option<usize> {
  (word != NIL).then_some(word)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::arena::VecArena;

  #[test]
  fn header_round_trips_through_arena() {
    let mut arena = VecArena::new();
    let address = arena.grow(2 * HEADER_SIZE).unwrap();

    let header = Header {
      length: 2 * HEADER_SIZE,
      prev: None,
      next: Some(0x40),
    };
    header.store(&mut arena, address);

    assert_eq!(Header::load(&arena, address), header);

    set_prev(&mut arena, address, Some(0));
    set_next(&mut arena, address, None);
    set_length(&mut arena, address, HEADER_SIZE);

    assert_eq!(
      Header::load(&arena, address),
      Header {
        length: HEADER_SIZE,
        prev: Some(0),
        next: None,
      }
    );
    assert_eq!(length(&arena, address), HEADER_SIZE);
  }

  #[test]
  fn payload_sits_right_after_header() {
    assert_eq!(payload(0x100), 0x100 + HEADER_SIZE);
    assert_eq!(from_payload(payload(0x100)), 0x100);
  }
}
