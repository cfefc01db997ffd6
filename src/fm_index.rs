//! The reference FM-index contract (C6): the trait the DP core consumes,
//! plus one reference implementation for tests and the CLI demo.
//!
//! Production deployments are expected to supply their own, typically
//! memory-mapped, FM-index by implementing [`ReferenceIndex`] — the engine
//! never constructs or owns the index, only borrows it for one [`crate::align`]
//! call.

use crate::error::ReferenceIndexError;
use crate::nt6;

/// Number of checkpointed positions between rank snapshots.
const CHECKPOINT_STRIDE: usize = 64;

/// The FM-index surface the alignment engine consumes.
///
/// Alphabet is nt6: `0=$, 1=A, 2=C, 3=G, 4=T, 5=N`.
pub trait ReferenceIndex {
    /// Cumulative symbol frequencies. `acc[0] == 0`, `acc[6] == len + 1`
    /// (reference length including the sentinel).
    fn acc(&self) -> &[u32; 7];

    /// Rank vectors for positions `lo` and `hi`: for each symbol `c`, the
    /// count of `c` in the BWT prefix of that length. Backward extension of
    /// `[lo, hi)` by symbol `c` yields `[acc[c] + clo[c], acc[c] + chi[c])`.
    fn rank2a(&self, lo: i64, hi: i64) -> ([u32; 6], [u32; 6]);
}

/// A single-block, checkpointed in-memory FM-index over a reference string,
/// built from a naive suffix array. Intended for tests and the CLI demo;
/// production callers should bring a faster/larger implementation.
#[derive(Debug, Clone)]
pub struct NaiveReferenceIndex {
    /// One nt6 code (`0..=5`) per BWT row.
    bwt: Vec<u8>,
    /// Cumulative per-symbol counts, snapshotted every [`CHECKPOINT_STRIDE`] rows.
    checkpoints: Vec<[u32; 6]>,
    acc: [u32; 7],
}

impl NaiveReferenceIndex {
    /// Build the index from a reference string (any mix of case; `N` is
    /// accepted as an ambiguous base).
    pub fn build(reference: &[u8]) -> Result<Self, ReferenceIndexError> {
        if reference.is_empty() {
            return Err(ReferenceIndexError::EmptyReference);
        }
        let mut codes = Vec::with_capacity(reference.len());
        for (idx, &byte) in reference.iter().enumerate() {
            let code = nt6::encode(byte).ok_or(ReferenceIndexError::UnsupportedCharacter {
                ch: byte as char,
                position: idx,
            })?;
            codes.push(code);
        }

        let n = codes.len();
        let mut sa: Vec<usize> = (0..=n).collect();
        sa.sort_unstable_by(|&a, &b| {
            let sa = if a == n { &[][..] } else { &codes[a..] };
            let sb = if b == n { &[][..] } else { &codes[b..] };
            sa.cmp(sb)
        });

        let mut bwt = Vec::with_capacity(n + 1);
        for &start in &sa {
            bwt.push(if start == 0 { 0 } else { codes[start - 1] });
        }

        let mut checkpoints = Vec::with_capacity(bwt.len() / CHECKPOINT_STRIDE + 2);
        let mut counts = [0u32; 6];
        for (i, &symbol) in bwt.iter().enumerate() {
            if i % CHECKPOINT_STRIDE == 0 {
                checkpoints.push(counts);
            }
            counts[symbol as usize] += 1;
        }
        checkpoints.push(counts);

        let mut acc = [0u32; 7];
        for c in 0..6 {
            acc[c + 1] = acc[c] + counts[c];
        }

        Ok(Self {
            bwt,
            checkpoints,
            acc,
        })
    }

    fn rank_all(&self, pos: i64) -> [u32; 6] {
        let pos = pos.clamp(0, self.bwt.len() as i64) as usize;
        let checkpoint_idx = pos / CHECKPOINT_STRIDE;
        let base = checkpoint_idx * CHECKPOINT_STRIDE;
        let mut counts = self.checkpoints[checkpoint_idx];
        for &symbol in &self.bwt[base..pos] {
            counts[symbol as usize] += 1;
        }
        counts
    }

    /// Total length of the BWT string (reference length + 1 sentinel).
    pub fn len(&self) -> usize {
        self.bwt.len()
    }

    /// Returns `true` if the underlying reference was empty (never the case
    /// for a successfully built index, since construction rejects that).
    pub fn is_empty(&self) -> bool {
        self.bwt.is_empty()
    }
}

impl ReferenceIndex for NaiveReferenceIndex {
    fn acc(&self) -> &[u32; 7] {
        &self.acc
    }

    fn rank2a(&self, lo: i64, hi: i64) -> ([u32; 6], [u32; 6]) {
        (self.rank_all(lo), self.rank_all(hi))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acc_totals_match_reference_composition() {
        let index = NaiveReferenceIndex::build(b"ACGTACGT").unwrap();
        assert_eq!(index.acc()[0], 0);
        assert_eq!(index.acc()[1], 1); // sentinel
        assert_eq!(index.acc()[6], index.len() as u32);
    }

    #[test]
    fn rank_matches_naive_count() {
        let reference = b"ACGTNACGT";
        let index = NaiveReferenceIndex::build(reference).unwrap();
        for pos in 0..=index.len() as i64 {
            let (counts, _) = index.rank2a(pos, pos);
            for symbol in 0..6u8 {
                let naive = naive_rank(reference, symbol, pos as usize);
                assert_eq!(counts[symbol as usize], naive, "symbol {symbol} pos {pos}");
            }
        }
    }

    fn naive_rank(reference: &[u8], symbol: u8, pos: usize) -> u32 {
        let n = reference.len();
        let codes: Vec<u8> = reference.iter().map(|&b| nt6::encode(b).unwrap()).collect();
        let mut sa: Vec<usize> = (0..=n).collect();
        sa.sort_unstable_by(|&a, &b| {
            let sa = if a == n { &[][..] } else { &codes[a..] };
            let sb = if b == n { &[][..] } else { &codes[b..] };
            sa.cmp(sb)
        });
        let bwt: Vec<u8> = sa
            .iter()
            .map(|&start| if start == 0 { 0 } else { codes[start - 1] })
            .collect();
        bwt[..pos.min(bwt.len())]
            .iter()
            .filter(|&&c| c == symbol)
            .count() as u32
    }

    #[test]
    fn empty_reference_is_rejected() {
        assert!(matches!(
            NaiveReferenceIndex::build(b""),
            Err(ReferenceIndexError::EmptyReference)
        ));
    }

    #[test]
    fn unsupported_character_is_rejected() {
        assert!(matches!(
            NaiveReferenceIndex::build(b"ACGTX"),
            Err(ReferenceIndexError::UnsupportedCharacter { ch: 'X', position: 4 })
        ));
    }
}
