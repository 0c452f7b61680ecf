//! Errors raised by the crate's own setup. Runtime allocation outcomes
//! (out of memory, zero-size requests) stay within the null-return
//! contract described on [`crate::Arena`]'s methods — that split mirrors
//! `kernel-alloc`'s own `VmmError`, which is reserved for setup/mapping
//! failures rather than the steady-state allocation path.

/// Failure constructing an [`crate::Arena`].
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    /// The [`crate::HeapProvider`] could not supply the initial class
    /// table, sentinels, and seed chunk.
    #[error("heap provider refused to grow the arena")]
    HeapProviderRefused,
}
