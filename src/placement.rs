use core::{fmt, str::FromStr};

use crate::{
  arena::Arena,
  error::UnknownStrategy,
  free_list::{FreeBlock, FreeList},
};

mod sealed {
  pub trait Sealed {}

  impl Sealed for super::FirstFit {}
  impl Sealed for super::BestFit {}
  impl Sealed for super::Strategy {}
}

/// Chooses which free block serves a request. Selection never mutates the list.
///
/// The allocator carves whatever block comes back, so the trait is sealed:
/// only [`FirstFit`], [`BestFit`] and [`Strategy`] implement it.
///
/// ```compile_fail
/// use freelist_alloc::{Arena, FreeBlock, FreeList, Placement};
///
/// struct Anywhere(usize);
///
/// impl Placement for Anywhere {
///     fn select<A: Arena + ?Sized>(
///         &self,
///         _list: &FreeList,
///         _arena: &A,
///         needed: usize,
///     ) -> Option<FreeBlock> {
///         Some(FreeBlock { address: self.0, length: needed })
///     }
/// }
/// ```
pub trait Placement: sealed::Sealed {
  /// Picks a free block whose length is at least `needed` (header included).
  fn select<A: Arena + ?Sized>(
    &self,
    list: &FreeList,
    arena: &A,
    needed: usize,
  ) -> Option<FreeBlock>;
}

/// The first block in address order that is large enough.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FirstFit;

/// The smallest block that is large enough; ties go to the lowest address.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BestFit;

impl Placement for FirstFit {
  fn select<A: Arena + ?Sized>(
    &self,
    list: &FreeList,
    arena: &A,
    needed: usize,
  ) -> Option<FreeBlock> {
    list.iter(arena).find(|free| free.length >= needed)
  }
}

impl Placement for BestFit {
  fn select<A: Arena + ?Sized>(
    &self,
    list: &FreeList,
    arena: &A,
    needed: usize,
  ) -> Option<FreeBlock> {
    let mut best: Option<FreeBlock> = None;

    for free in list.iter(arena) {
      if free.length < needed {
        continue;
      }
      if free.length == needed {
        return Some(free);
      }
      if best.is_none_or(|best| free.length < best.length) {
        best = Some(free);
      }
    }

    best
  }
}

/// Placement picked at runtime, e.g. from configuration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
  #[default]
  FirstFit,
  BestFit,
}

impl Placement for Strategy {
  fn select<A: Arena + ?Sized>(
    &self,
    list: &FreeList,
    arena: &A,
    needed: usize,
  ) -> Option<FreeBlock> {
    match self {
      Self::FirstFit => FirstFit.select(list, arena, needed),
      Self::BestFit => BestFit.select(list, arena, needed),
    }
  }
}

impl fmt::Display for Strategy {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      Self::FirstFit => f.write_str("first-fit"),
      Self::BestFit => f.write_str("best-fit"),
    }
  }
}

impl FromStr for Strategy {
  type Err = UnknownStrategy;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "first-fit" | "first_fit" | "firstfit" | "ff" => Ok(Self::FirstFit),
      "best-fit" | "best_fit" | "bestfit" | "bf" => Ok(Self::BestFit),
      _ => Err(UnknownStrategy(s.to_owned())),
    }
  }
}
