//! # bwasw-core: BWA-SW–style local alignment against an FM-indexed reference
//!
//! Aligns a single query sequence against the *set of all substrings* of a
//! reference text, rather than one linear reference position at a time. The
//! query is turned into a directed acyclic word graph (DAWG) over its own
//! lightweight BWT, one node per distinct substring; a beam dynamic program
//! then walks that DAWG in topological order while simultaneously descending
//! the reference's FM-index, carrying affine-gap `E`/`F` layers and a
//! bounded top-*N* beam per node. A final backtrace reconstructs a CIGAR and
//! the reference suffix-array interval of the best-scoring alignment.
//!
//! ## Core algorithm
//!
//! 1. **Lightweight query BWT** ([`query_bwt`]) — small, in-memory, exact-rank.
//! 2. **DAWG construction** ([`dawg`]) — one node per distinct query substring.
//! 3. **Dual-index beam DP** ([`sw_engine`]) — the dynamic-programming core.
//! 4. **Backtrace** ([`backtrace`]) — CIGAR and reference interval recovery.
//!
//! ## Usage example
//!
//! ```ignore
//! use bumpalo::Bump;
//! use bwasw_core::{align, AlignOutcome, NaiveReferenceIndex, SwOptions};
//!
//! let reference = NaiveReferenceIndex::build(b"ACGTACGTACGT").unwrap();
//! let arena = Bump::new();
//! let opts = SwOptions::default();
//! match align(&arena, &opts, &reference, b"ACGTACGT").unwrap() {
//!     AlignOutcome::Aligned(result) => println!("score {}", result.score),
//!     AlignOutcome::NoAlignment => println!("no alignment above min_sc"),
//! }
//! ```

#![warn(missing_docs, missing_debug_implementations)]

pub mod align;
pub mod backtrace;
pub mod dawg;
pub mod error;
pub mod fm_index;
pub mod nt6;
pub mod options;
pub mod query_bwt;
pub mod rank_cache;
pub mod suffix_array;
pub mod sw_engine;

pub use align::{align, AlignOutcome, AlignmentResult};
pub use dawg::{Dawg, DawgNode};
pub use error::{AlignError, DawgError, QueryBwtError, ReferenceIndexError};
pub use fm_index::{NaiveReferenceIndex, ReferenceIndex};
pub use options::SwOptions;
pub use query_bwt::QueryBwt;
pub use suffix_array::{NaiveSuffixArrayBuilder, SuffixArrayBuilder};
