//! # freelist-alloc - A Free-List Heap Allocator
//!
//! This crate provides a single-arena heap allocator that keeps released
//! blocks on an **address ordered free list**, splits them to serve smaller
//! requests and coalesces neighbours when they come back. The arena only grows;
//! memory is reused, never handed back to the host.
//!
//! ## Overview
//!
//! ```text
//!   Arena after a few allocations and releases:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │ ┌──────┬──────────┬────────┬──────────────┬──────┬───────────────┐   │
//!   │ │  A1  │   free   │   A2   │     free     │  A3  │     free      │   │
//!   │ └──────┴──────────┴────────┴──────────────┴──────┴───────────────┘   │
//!   │            ▲    │                ▲     │                 ▲           │
//!   │   head ────┘    └────────────────┘     └─────────────────┘           │
//!   │                  next links, ascending addresses                     │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   Free blocks never touch: a released block is merged with any free
//!   neighbour on the spot.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   freelist_alloc
//!   ├── align      - align! macro (word rounding)
//!   ├── arena      - Arena trait, VecArena
//!   ├── block      - Header layout and addressing
//!   ├── free_list  - FreeList: ordered insert, unlink, merge, checks
//!   ├── placement  - FirstFit, BestFit, Strategy
//!   ├── allocator  - FreeListAllocator: allocate, release, instrumentation
//!   ├── sbrk       - BreakAllocator over the program break (unix)
//!   └── error      - AllocError, GrowthError, InvariantError
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use freelist_alloc::{FreeListAllocator, HEADER_SIZE, Strategy, VecArena};
//!
//! let mut heap = FreeListAllocator::new(VecArena::new(), Strategy::BestFit);
//!
//! let a = heap.allocate(100).unwrap();
//! assert_eq!(heap.arena_size(), 100 + HEADER_SIZE);
//! assert_eq!(heap.free_space_size(), 0);
//!
//! unsafe { heap.release(a) };
//! assert_eq!(heap.free_space_size(), 100 + HEADER_SIZE);
//!
//! // Served from the released block, the arena does not grow.
//! let b = heap.allocate(40).unwrap();
//! assert_eq!(a, b);
//! assert_eq!(heap.arena_size(), 100 + HEADER_SIZE);
//! ```
//!
//! ## How It Works
//!
//! Every block, free or allocated, starts with a header of three machine
//! words. The caller gets the address right after it:
//!
//! ```text
//!   ┌───────────────────────┬────────────────────────────────┐
//!   │    Block Header       │         User Data              │
//!   │  ┌─────────────────┐  │                                │
//!   │  │ length: N + 24  │  │  ┌──────────────────────────┐  │
//!   │  │ prev: free link │  │  │                          │  │
//!   │  │ next: free link │  │  │     N bytes usable       │  │
//!   │  └─────────────────┘  │  │                          │  │
//!   │      24 bytes         │  └──────────────────────────┘  │
//!   └───────────────────────┴────────────────────────────────┘
//!                           ▲
//!                           └── Address returned to the caller
//! ```
//!
//! `allocate(n)` asks the placement policy for a free block of at least
//! `n + HEADER_SIZE` bytes. If the block is bigger than that plus one more
//! header, the tail is split off and stays on the list in the same position;
//! otherwise the whole block is handed out. When nothing fits, the arena grows
//! by exactly `n + HEADER_SIZE` bytes.
//!
//! `release(p)` finds the header at `p - HEADER_SIZE`, links the block in
//! address order and merges it with its successor and predecessor if they
//! are adjacent.
//!
//! Addresses are plain `usize` values interpreted by the [`Arena`]:
//! offsets into a vector for [`VecArena`], real pointers for `BreakAllocator`.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: no synchronization primitives
//! - **No return to the host**: the arena never shrinks
//! - **No validation on release**: double frees and foreign pointers are
//!   undefined behaviour, which is why `release` is `unsafe`
//! - **Word alignment at most**

pub mod align;
mod allocator;
mod arena;
mod block;
mod error;
mod free_list;
mod placement;
#[cfg(unix)]
mod sbrk;

pub use allocator::{BestFitAllocator, FirstFitAllocator, FreeListAllocator};
pub use arena::{Arena, VecArena};
pub use block::{HEADER_SIZE, Header, WORD};
pub use error::{AllocError, GrowthError, InvariantError, Result, UnknownStrategy};
pub use free_list::{FreeBlock, FreeList};
pub use placement::{BestFit, FirstFit, Placement, Strategy};
#[cfg(unix)]
pub use sbrk::{BreakAllocator, print_alloc};
