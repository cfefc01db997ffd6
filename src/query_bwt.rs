//! The lightweight query BWT (C1): a small, in-memory, exact-rank index
//! built once per query and consumed only by the DAWG builder.

use std::sync::OnceLock;

use crate::error::QueryBwtError;
use crate::suffix_array::SuffixArrayBuilder;

/// Positions are checkpointed every 16 symbols, matching the packing density
/// (16 two-bit symbols per 32-bit word).
const CHECKPOINT_STRIDE: i32 = 16;

static CNT_TABLE: OnceLock<[u32; 256]> = OnceLock::new();

/// The 256-entry byte counter table: `table[b]` packs, one byte per symbol,
/// the count of each 2-bit symbol `0..=3` among the four symbols encoded in
/// byte `b`. Built once and shared read-only afterwards.
fn cnt_table() -> &'static [u32; 256] {
    CNT_TABLE.get_or_init(|| {
        let mut table = [0u32; 256];
        for (byte, slot) in table.iter_mut().enumerate() {
            let byte = byte as u32;
            let mut x = 0u32;
            for c in 0..4u32 {
                let count = (byte & 3 == c) as u32
                    + (byte >> 2 & 3 == c) as u32
                    + (byte >> 4 & 3 == c) as u32
                    + (byte >> 6 == c) as u32;
                x |= count << (c * 8);
            }
            *slot = x;
        }
        table
    })
}

/// The lightweight BWT of a query sequence over `{A,C,G,T}`.
#[derive(Debug, Clone)]
pub struct QueryBwt {
    seq_len: i32,
    /// 2-bit symbols, 16 per 32-bit word, high-order bits first.
    bwt: Vec<u32>,
    /// Row at which the virtual sentinel `$` would appear; excluded from `bwt`.
    primary: i32,
    /// Cumulative symbol counts, one checkpoint every 16 positions.
    occ: Vec<[u32; 4]>,
    /// Suffix array of length `seq_len + 1`, `sa[primary] == 0`.
    sa: Vec<i32>,
    /// Cumulative row-start offset per symbol, `l2[0] == 1` for the sentinel.
    l2: [i32; 5],
}

impl QueryBwt {
    /// Build the query BWT from a translated query (values `1..=4`, see
    /// [`crate::nt6`]) using the given suffix-array collaborator.
    ///
    /// Mirrors the C core: this does not re-validate that `symbols` only
    /// contains `1..=4` (non-ACGT rejection happens once, at the
    /// [`crate::align`] boundary).
    pub fn build(
        symbols: &[u8],
        sa_builder: &impl SuffixArrayBuilder,
    ) -> Result<Self, QueryBwtError> {
        if symbols.is_empty() {
            return Err(QueryBwtError::EmptyQuery);
        }
        let len = symbols.len();
        // Translate nt6 codes 1..=4 to packed-BWT symbols 0..=3.
        let zero_based: Vec<u8> = symbols.iter().map(|&c| c - 1).collect();
        let sa = sa_builder.build(&zero_based);
        debug_assert_eq!(sa.len(), len + 1);

        let mut primary = 0i32;
        let mut preceding = vec![0u8; len + 1];
        for (row, &start) in sa.iter().enumerate() {
            if start == 0 {
                primary = row as i32;
            } else {
                preceding[row] = zero_based[(start - 1) as usize];
            }
        }
        // Remove the primary row's slot by shifting everything after it left.
        for row in (primary as usize)..len {
            preceding[row] = preceding[row + 1];
        }
        preceding.truncate(len);

        let bwt_size = (len + 15) / 16;
        let mut bwt = vec![0u32; bwt_size];
        for (i, &sym) in preceding.iter().enumerate() {
            let word = i >> 4;
            let shift = (15 - (i & 15)) * 2;
            bwt[word] |= (sym as u32) << shift;
        }

        let mut occ = Vec::with_capacity(len / 16 + 2);
        let mut counts = [0u32; 4];
        for (i, &sym) in preceding.iter().enumerate() {
            if i % 16 == 0 {
                occ.push(counts);
            }
            counts[sym as usize] += 1;
        }
        if len % 16 == 0 {
            occ.push(counts);
        }

        let mut l2 = [0i32; 5];
        l2[0] = 1;
        for c in 0..4 {
            l2[c + 1] = l2[c] + counts[c] as i32;
        }

        Ok(Self {
            seq_len: len as i32,
            bwt,
            primary,
            occ,
            sa,
            l2,
        })
    }

    /// Number of bases in the query.
    pub fn seq_len(&self) -> i32 {
        self.seq_len
    }

    /// Cumulative row-start offsets, `l2[0..=4]`.
    pub fn l2(&self) -> &[i32; 5] {
        &self.l2
    }

    /// The suffix array, `sa[primary] == 0`.
    pub fn sa(&self) -> &[i32] {
        &self.sa
    }

    /// Row at which the virtual sentinel would appear.
    pub fn primary(&self) -> i32 {
        self.primary
    }

    /// Count of each symbol `0..=3` in the BWT prefix of length `k`.
    fn rank1a(&self, k: i32) -> [u32; 4] {
        let k = if k > self.primary { k - 1 } else { k };
        let checkpoint_idx = (k >> 4) as usize;
        let mut cnt = self.occ[checkpoint_idx];
        if k % CHECKPOINT_STRIDE == 0 {
            return cnt;
        }
        let k = k - 1;
        let word = self.bwt[(k >> 4) as usize];
        let r = k & 15;
        let keep_bits = (r + 1) * 2; // top `keep_bits` bits of the word survive
        let mask = !((1u32 << (32 - keep_bits)) - 1);
        let b = word & mask;
        let table = cnt_table();
        let mut x = table[(b & 0xff) as usize]
            .wrapping_add(table[(b >> 8 & 0xff) as usize])
            .wrapping_add(table[(b >> 16 & 0xff) as usize])
            .wrapping_add(table[(b >> 24) as usize]);
        // The masked-out low positions (there are `15 - r` of them) decode as
        // symbol 0 and were counted as such; undo that over-count.
        x = x.wrapping_sub((15 - r) as u32);
        cnt[0] = cnt[0].wrapping_add(x & 0xff);
        cnt[1] = cnt[1].wrapping_add(x >> 8 & 0xff);
        cnt[2] = cnt[2].wrapping_add(x >> 16 & 0xff);
        cnt[3] = cnt[3].wrapping_add(x >> 24);
        cnt
    }

    /// Count of each symbol `0..=3` in the BWT prefixes of length `k` and `l`.
    pub fn rank2a(&self, k: i32, l: i32) -> ([u32; 4], [u32; 4]) {
        (self.rank1a(k), self.rank1a(l))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suffix_array::NaiveSuffixArrayBuilder;

    fn build(seq: &[u8]) -> QueryBwt {
        let symbols: Vec<u8> = seq.iter().map(|&b| crate::nt6::encode(b).unwrap()).collect();
        QueryBwt::build(&symbols, &NaiveSuffixArrayBuilder).unwrap()
    }

    #[test]
    fn rejects_empty_query() {
        let err = QueryBwt::build(&[], &NaiveSuffixArrayBuilder).unwrap_err();
        assert!(matches!(err, QueryBwtError::EmptyQuery));
    }

    #[test]
    fn rank_matches_naive_count() {
        let seq = b"ACGTACGT";
        let bwt = build(seq);
        // Naive: rebuild the row->preceding-symbol array independently and
        // brute-force count, then compare against rank1a for every k.
        let symbols: Vec<u8> = seq
            .iter()
            .map(|&b| crate::nt6::encode(b).unwrap() - 1)
            .collect();
        let sa = NaiveSuffixArrayBuilder.build(&symbols);
        let mut naive = vec![0u8; seq.len()];
        let mut primary = 0usize;
        let mut tmp = vec![0u8; seq.len() + 1];
        for (row, &start) in sa.iter().enumerate() {
            if start == 0 {
                primary = row;
            } else {
                tmp[row] = symbols[(start - 1) as usize];
            }
        }
        for row in primary..seq.len() {
            tmp[row] = tmp[row + 1];
        }
        naive.copy_from_slice(&tmp[..seq.len()]);

        for k in 0..=seq.len() as i32 {
            let (cnt, _) = bwt.rank2a(k, k);
            let mut expect = [0u32; 4];
            for &sym in &naive[..k as usize] {
                expect[sym as usize] += 1;
            }
            assert_eq!(cnt, expect, "mismatch at k={k}");
        }
    }

    #[test]
    fn l2_sentinel_offset() {
        let bwt = build(b"ACGT");
        assert_eq!(bwt.l2()[0], 1);
        assert_eq!(bwt.sa()[bwt.primary() as usize], 0);
    }
}
