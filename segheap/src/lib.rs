//! # segheap
//!
//! A segregated free-list, boundary-tag arena allocator, generic over a
//! pluggable `sbrk`-style [`HeapProvider`].
//!
//! ## Layout
//!
//! The arena occupies one contiguous region handed out by a
//! [`HeapProvider`]: an 11-slot class table, an alignment pad, a prologue
//! sentinel, a chain of boundary-tagged blocks, and an epilogue sentinel.
//! Eleven size classes (see [`class`](crate) internals) each own a
//! doubly linked, insert-at-root free list threaded through the payload of
//! their own free blocks, so freeing and reusing memory costs no more than
//! a handful of pointer writes.
//!
//! ## Usage
//!
//! ```
//! use segheap::{Arena, FixedRegionProvider};
//!
//! let mut backing = vec![0u8; 1 << 16];
//! let provider = FixedRegionProvider::new(&mut backing);
//! let mut arena = Arena::new(provider).expect("arena should initialize");
//!
//! unsafe {
//!     let p = arena.allocate(128);
//!     assert!(!p.is_null());
//!     arena.free(p);
//! }
//! ```
//!
//! ## What this crate does not do
//!
//! No thread safety in the core `Arena` (see the optional `global`
//! feature), no defragmentation beyond immediate-neighbor coalescing, no
//! returning memory back to the provider, no alignment above 8 bytes, no
//! NUMA awareness.

#![cfg_attr(not(any(test, doctest)), no_std)]

mod block;
mod class;
mod coalesce;
mod error;
mod fit;
mod free_list;
mod layout;
mod place;
mod provider;

mod arena;

#[cfg(feature = "global")]
mod global;

pub use arena::Arena;
pub use error::InitError;
pub use provider::{FixedRegionProvider, HeapProvider};

#[cfg(feature = "global")]
pub use global::StaticArenaAllocator;
