//! The public entry point: one call, one query, one alignment attempt.

use bumpalo::Bump;

use crate::backtrace::{self, BacktraceResult};
use crate::dawg::Dawg;
use crate::error::AlignError;
use crate::fm_index::ReferenceIndex;
use crate::nt6;
use crate::options::SwOptions;
use crate::query_bwt::QueryBwt;
use crate::rank_cache::RankCache;
use crate::suffix_array::NaiveSuffixArrayBuilder;
use crate::sw_engine;

/// The result of a successful alignment.
#[derive(Debug, Clone)]
pub struct AlignmentResult {
    pub score: i32,
    /// Packed CIGAR entries, `len << 4 | op` (1=ins, 2=del, 7=match, 8=mismatch).
    pub cigar: Vec<u32>,
    /// Reference bases spanned by the alignment, in nt6 encoding.
    pub rseq: Vec<u8>,
    /// Number of matching bases.
    pub mlen: usize,
    /// Total alignment length (matches + mismatches + indels).
    pub blen: usize,
    /// Reference FM-index interval of the alignment's most-specific end.
    pub lo: i64,
    pub hi: i64,
    /// Candidate query-side start offsets for the alignment.
    pub qoff: Vec<i32>,
}

/// What one [`align`] call produced.
#[derive(Debug, Clone)]
pub enum AlignOutcome {
    Aligned(AlignmentResult),
    NoAlignment,
}

/// Validate that `query` is non-empty and entirely `{A,C,G,T}` (case
/// insensitive), translating it to nt6 codes `1..=4` in the same pass.
///
/// The core beneath this boundary trusts its input, the way the original
/// engine does; this is the one place non-ACGT bytes are rejected.
fn translate_query(query: &[u8]) -> Result<Vec<u8>, AlignError> {
    if query.is_empty() {
        return Err(AlignError::EmptyQuery);
    }
    query
        .iter()
        .enumerate()
        .map(|(offset, &byte)| match nt6::encode(byte) {
            Some(code) if code <= 4 => Ok(code),
            _ => Err(AlignError::InvalidQuery { ch: byte as char, offset }),
        })
        .collect()
}

/// Align `query` against the reference FM-index `fmi`, returning the
/// best-scoring alignment (if any clears `opts.min_sc`).
///
/// All scratch memory for the call — the query BWT, the DAWG, the beam rows,
/// the rank cache — is taken from `arena`. The returned result is owned
/// independently of `arena` and survives resetting it.
pub fn align(
    arena: &Bump,
    opts: &SwOptions,
    fmi: &impl ReferenceIndex,
    query: &[u8],
) -> Result<AlignOutcome, AlignError> {
    let symbols = translate_query(query)?;

    let bwt = QueryBwt::build(&symbols, &NaiveSuffixArrayBuilder)?;
    let dawg = Dawg::build(arena, &bwt)?;

    let mut cache = RankCache::new(opts.r2cache_size);
    let beam = sw_engine::run(arena, opts, fmi, &dawg, &mut cache);

    if beam.best_h <= 0 || beam.best_h < opts.min_sc {
        return Ok(AlignOutcome::NoAlignment);
    }

    let acc = *fmi.acc();
    let BacktraceResult {
        cigar,
        rseq,
        mlen,
        blen,
        lo,
        hi,
        qoff,
    } = backtrace::backtrace(&bwt, &dawg, &beam, &acc, opts.n_best)
        .expect("beam.best_h > 0 implies a non-root best cell, so backtrace always succeeds");

    Ok(AlignOutcome::Aligned(AlignmentResult {
        score: beam.best_h,
        cigar,
        rseq,
        mlen,
        blen,
        lo,
        hi,
        qoff,
    }))
}
