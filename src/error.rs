//! Error taxonomy for the alignment engine.
//!
//! Errors are layered per component, the way the rest of this crate layers
//! its error enums: a small leaf error per data structure, wrapped by the
//! umbrella [`AlignError`] returned from the public [`crate::align`] entry
//! point.

use thiserror::Error;

/// Errors raised while building the lightweight query BWT.
#[derive(Debug, Error)]
pub enum QueryBwtError {
    /// The query was empty; there is nothing to align.
    #[error("query sequence must be non-empty")]
    EmptyQuery,
}

/// Errors raised while constructing the DAWG from a query BWT.
#[derive(Debug, Error)]
pub enum DawgError {
    /// The in-degree and topological-emit passes disagreed on node count.
    ///
    /// This can only happen if the two traversals over the query BWT took
    /// different paths, which indicates a bug in the traversal itself
    /// rather than anything a caller could trigger.
    #[error("DAWG construction invariant violated: emitted {emitted} nodes, expected {expected}")]
    NodeCountMismatch {
        /// Nodes actually emitted by the topological pass.
        emitted: usize,
        /// Nodes counted by the in-degree pass.
        expected: usize,
    },
}

/// Errors raised by a [`crate::fm_index::ReferenceIndex`] implementation.
#[derive(Debug, Error)]
pub enum ReferenceIndexError {
    /// The reference text was empty.
    #[error("reference sequence must be non-empty")]
    EmptyReference,

    /// A byte in the reference could not be mapped to the nt6 alphabet.
    #[error("unsupported character '{ch}' at position {position}")]
    UnsupportedCharacter {
        /// The offending character.
        ch: char,
        /// Its offset in the reference.
        position: usize,
    },
}

/// Umbrella error returned from [`crate::align`].
#[derive(Debug, Error)]
pub enum AlignError {
    /// The query contained a byte outside `{A,C,G,T}` (case-insensitive).
    ///
    /// The C core this engine is modeled on never validates this and relies
    /// on the caller to guarantee it; a safe Rust core cannot make the same
    /// assumption without risking silently wrapping the 2-bit BWT packing,
    /// so `align()` checks once at the boundary and rejects explicitly.
    #[error("unsupported base '{ch}' at query offset {offset}: only A/C/G/T are accepted")]
    InvalidQuery {
        /// The offending character.
        ch: char,
        /// Its offset in the query.
        offset: usize,
    },

    /// The query was empty.
    #[error("query sequence must be non-empty")]
    EmptyQuery,

    /// Propagated from [`QueryBwtError`].
    #[error(transparent)]
    QueryBwt(#[from] QueryBwtError),

    /// Propagated from [`DawgError`].
    #[error(transparent)]
    Dawg(#[from] DawgError),
}
