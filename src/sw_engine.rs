//! The beam dynamic-programming core (C4): one row per DAWG node, each row
//! holding up to `n_best` cells with affine-gap `E`/`F` layers, walked in the
//! DAWG's topological order while descending the reference FM-index.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use bumpalo::collections::Vec as BumpVec;
use bumpalo::Bump;
use tracing::{debug, trace};

use crate::dawg::Dawg;
use crate::fm_index::ReferenceIndex;
use crate::options::SwOptions;
use crate::rank_cache::RankCache;

/// `H_from_pos`/`E_from_pos` sentinel meaning "no predecessor cell".
pub const NONE_POS: u32 = u32::MAX;
/// `F_from_off` sentinel meaning "not yet resolved" (28-bit all-ones, matching
/// the original core's bitfield width).
pub const F_UNSET: u32 = 0x0FFF_FFFF;

/// Which score layer a cell's `H` was copied from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HFrom {
    H,
    E,
    F,
}

/// Whether a gap layer was just opened or is being extended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapFrom {
    Open,
    Ext,
}

/// One beam cell: best-known alignment ending at a given reference interval
/// for the DAWG node this row belongs to.
#[derive(Debug, Clone, Copy)]
pub struct Cell {
    /// Reference FM-index interval reached by backward extension.
    pub lo: i64,
    pub hi: i64,
    pub h: i32,
    pub e: i32,
    pub f: i32,
    pub h_from: HFrom,
    pub e_from: GapFrom,
    pub f_from: GapFrom,
    /// Predecessor cell, encoded as `node_index * n_best + slot`, or [`NONE_POS`].
    pub h_from_pos: u32,
    /// See [`Cell::h_from_pos`]; tracks the cell `E` was extended from.
    pub e_from_pos: u32,
    /// Slot within this same row that justified `F`, or [`F_UNSET`].
    pub f_from_off: u32,
}

impl Cell {
    fn root(acc6: i64) -> Self {
        Self {
            lo: 0,
            hi: acc6,
            h: 0,
            e: 0,
            f: 0,
            h_from: HFrom::H,
            e_from: GapFrom::Open,
            f_from: GapFrom::Open,
            h_from_pos: NONE_POS,
            e_from_pos: NONE_POS,
            f_from_off: F_UNSET,
        }
    }
}

/// Encode a predecessor position for `h_from_pos`/`e_from_pos`.
fn encode_pos(node: usize, slot: usize, n_best: usize) -> u32 {
    (node * n_best + slot) as u32
}

/// The filled beam: one row per DAWG node that was actually reached before
/// any early termination, plus the best cell seen overall.
pub struct Beam<'a> {
    pub rows: BumpVec<'a, BumpVec<'a, Cell>>,
    pub best_node: usize,
    pub best_h: i32,
}

fn cached_rank2a(
    cache: &mut RankCache,
    fmi: &impl ReferenceIndex,
    lo: i64,
    hi: i64,
) -> ([u32; 6], [u32; 6]) {
    if let Some(hit) = cache.get(lo, hi) {
        return hit;
    }
    let ranks = fmi.rank2a(lo, hi);
    cache.insert(lo, hi, ranks);
    ranks
}

/// Merge `incoming` into the candidate already keyed at `(lo,hi)`, or insert
/// it fresh. Returns the cell's state after merging.
///
/// Preserves the original engine's documented quirk verbatim: `h_from_pos` is
/// only copied across when the winning `h_from` is `H` itself, never when a
/// merge raises `H` via an `E`- or `F`-sourced candidate. A later merge that
/// *does* come from `H` will still overwrite it correctly; what's preserved
/// is the possibility of a stale `h_from_pos` surviving alongside an
/// `h_from` of `E` or `F`, which the backtrace never reads in that case.
fn merge_candidate(candidates: &mut HashMap<(i64, i64), Cell>, key: (i64, i64), incoming: Cell) -> Cell {
    match candidates.entry(key) {
        Entry::Vacant(slot) => {
            slot.insert(incoming);
            incoming
        }
        Entry::Occupied(mut slot) => {
            let existing = slot.get_mut();
            if incoming.e > existing.e {
                existing.e = incoming.e;
                existing.e_from = incoming.e_from;
                existing.e_from_pos = incoming.e_from_pos;
            }
            if incoming.f > existing.f {
                existing.f = incoming.f;
                existing.f_from = incoming.f_from;
            }
            if incoming.h > existing.h {
                existing.h = incoming.h;
                existing.h_from = incoming.h_from;
                if incoming.h_from == HFrom::H {
                    existing.h_from_pos = incoming.h_from_pos;
                }
            }
            *existing
        }
    }
}

fn top_n_by_h(mut cells: Vec<Cell>, n: usize) -> Vec<Cell> {
    cells.sort_unstable_by(|a, b| b.h.cmp(&a.h));
    cells.truncate(n);
    cells
}

fn nth_best_h(candidates: &HashMap<(i64, i64), Cell>, n: usize) -> i32 {
    if candidates.len() < n {
        return 0;
    }
    let mut values: Vec<i32> = candidates.values().map(|c| c.h).collect();
    values.sort_unstable_by(|a, b| b.cmp(a));
    values[n - 1]
}

/// Gather and merge every candidate reachable from node `i`'s predecessors
/// (step A): `E`-layer continuation and `H`-layer match/mismatch extension.
fn gather_candidates(
    rows: &[BumpVec<Cell>],
    predecessors: &[u32],
    node_c: u8,
    acc: &[u32; 7],
    opts: &SwOptions,
    cache: &mut RankCache,
    fmi: &impl ReferenceIndex,
) -> HashMap<(i64, i64), Cell> {
    let mut candidates = HashMap::new();
    for &pid in predecessors {
        let pid = pid as usize;
        for (slot, &p) in rows[pid].iter().enumerate() {
            let e_prime = (p.h - opts.gap_open).max(p.e) - opts.gap_ext;
            if e_prime > 0 {
                let e_from = if p.h - opts.gap_open > p.e {
                    GapFrom::Open
                } else {
                    GapFrom::Ext
                };
                let candidate = Cell {
                    lo: p.lo,
                    hi: p.hi,
                    h: e_prime,
                    e: e_prime,
                    f: 0,
                    h_from: HFrom::E,
                    e_from,
                    f_from: GapFrom::Open,
                    h_from_pos: NONE_POS,
                    e_from_pos: encode_pos(pid, slot, opts.n_best),
                    f_from_off: F_UNSET,
                };
                merge_candidate(&mut candidates, (p.lo, p.hi), candidate);
            }

            let (rlo, rhi) = cached_rank2a(cache, fmi, p.lo, p.hi);
            for c in 1..=5u8 {
                let lo2 = acc[c as usize] as i64 + rlo[c as usize] as i64;
                let hi2 = acc[c as usize] as i64 + rhi[c as usize] as i64;
                if lo2 == hi2 {
                    continue;
                }
                let sc = if c == node_c { opts.match_score } else { -opts.mismatch };
                let new_h = p.h + sc;
                if new_h > 0 {
                    let candidate = Cell {
                        lo: lo2,
                        hi: hi2,
                        h: new_h,
                        e: 0,
                        f: 0,
                        h_from: HFrom::H,
                        e_from: GapFrom::Open,
                        f_from: GapFrom::Open,
                        h_from_pos: encode_pos(pid, slot, opts.n_best),
                        e_from_pos: NONE_POS,
                        f_from_off: F_UNSET,
                    };
                    merge_candidate(&mut candidates, (lo2, hi2), candidate);
                }
            }
        }
    }
    candidates
}

/// Expand the reference-side (vertical) gap layer from the pruned row (step
/// C): repeatedly extend `F` over the reference alphabet while the result
/// still beats the live N-best threshold.
fn expand_f_layer(
    row: &[Cell],
    acc: &[u32; 7],
    opts: &SwOptions,
    cache: &mut RankCache,
    fmi: &impl ReferenceIndex,
    candidates: &mut HashMap<(i64, i64), Cell>,
) {
    let seed_threshold = opts.gap_open + opts.gap_ext;
    let mut fstack: Vec<Cell> = row.iter().copied().filter(|c| c.h > seed_threshold).collect();

    while let Some(z) = fstack.pop() {
        let min = nth_best_h(candidates, opts.n_best);
        let f_prime = (z.h - opts.gap_open).max(z.f) - opts.gap_ext;
        if f_prime <= min {
            continue;
        }
        let f_from = if z.h - opts.gap_open > z.f {
            GapFrom::Open
        } else {
            GapFrom::Ext
        };
        let (rlo, rhi) = cached_rank2a(cache, fmi, z.lo, z.hi);
        for c in 1..=5u8 {
            let lo2 = acc[c as usize] as i64 + rlo[c as usize] as i64;
            let hi2 = acc[c as usize] as i64 + rhi[c as usize] as i64;
            if lo2 == hi2 {
                continue;
            }
            let candidate = Cell {
                lo: lo2,
                hi: hi2,
                h: f_prime,
                e: 0,
                f: f_prime,
                h_from: HFrom::F,
                e_from: GapFrom::Open,
                f_from,
                h_from_pos: NONE_POS,
                e_from_pos: NONE_POS,
                f_from_off: F_UNSET,
            };
            let merged = merge_candidate(candidates, (lo2, hi2), candidate);
            if f_prime - opts.gap_ext > min {
                fstack.push(merged);
            }
        }
    }
}

/// Step E: for every in-row cell with `F > 0`, find the slot in the same row
/// whose backward extension produced it, recording that slot in
/// `f_from_off`. Cells whose `F` cannot be justified this way have `F`
/// zeroed; such a cell can never have been the source of its own `H` (step
/// C never lets `F` win `H` without a same-row justification surviving the
/// prune), which the `debug_assert!` below pins.
fn resolve_f_from_off(row: &mut [Cell], acc: &[u32; 7], cache: &mut RankCache, fmi: &impl ReferenceIndex) {
    let index_by_interval: HashMap<(i64, i64), usize> =
        row.iter().enumerate().map(|(idx, c)| ((c.lo, c.hi), idx)).collect();

    for j in 0..row.len() {
        let (lo, hi) = (row[j].lo, row[j].hi);
        let (rlo, rhi) = cached_rank2a(cache, fmi, lo, hi);
        for c in 1..=5u8 {
            let lo2 = acc[c as usize] as i64 + rlo[c as usize] as i64;
            let hi2 = acc[c as usize] as i64 + rhi[c as usize] as i64;
            if lo2 == hi2 {
                continue;
            }
            if let Some(&k) = index_by_interval.get(&(lo2, hi2)) {
                if row[k].f > 0 {
                    row[k].f_from_off = j as u32;
                }
            }
        }
    }

    for cell in row.iter_mut() {
        if cell.f > 0 && cell.f_from_off == F_UNSET {
            debug_assert!(
                cell.h_from != HFrom::F,
                "F-layer cell won H but has no in-row justification for F"
            );
            cell.f = 0;
        }
    }
}

/// Fill the beam for every DAWG node in topological order, terminating early
/// the first time a row comes out empty.
pub fn run<'a>(
    arena: &'a Bump,
    opts: &SwOptions,
    fmi: &impl ReferenceIndex,
    dawg: &Dawg<'a>,
    cache: &mut RankCache,
) -> Beam<'a> {
    let acc = *fmi.acc();
    let mut rows: BumpVec<BumpVec<Cell>> = BumpVec::with_capacity_in(dawg.nodes().len(), arena);

    let root = Cell::root(acc[6] as i64);
    let mut root_row = BumpVec::with_capacity_in(1, arena);
    root_row.push(root);
    rows.push(root_row);

    let mut best_node = 0usize;
    let mut best_h = root.h;

    for (i, node) in dawg.nodes().iter().enumerate().skip(1) {
        let mut candidates = gather_candidates(&rows, dawg.predecessors(i), node.c, &acc, opts, cache, fmi);
        let pool: Vec<Cell> = candidates.values().copied().collect();
        let pruned = top_n_by_h(pool, opts.n_best);

        expand_f_layer(&pruned, &acc, opts, cache, fmi, &mut candidates);

        let pool: Vec<Cell> = candidates.values().copied().collect();
        let mut row_vec = top_n_by_h(pool, opts.n_best);

        if row_vec.is_empty() {
            debug!(target: "bwasw_core::sw", node = i, "row empty, terminating beam early");
            break;
        }

        resolve_f_from_off(&mut row_vec, &acc, cache, fmi);
        trace!(target: "bwasw_core::sw", node = i, cells = row_vec.len(), top_h = row_vec[0].h, "row filled");

        if row_vec[0].h > best_h {
            best_h = row_vec[0].h;
            best_node = i;
        }

        let mut row = BumpVec::with_capacity_in(row_vec.len(), arena);
        row.extend(row_vec);
        rows.push(row);
    }

    Beam { rows, best_node, best_h }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fm_index::NaiveReferenceIndex;
    use crate::query_bwt::QueryBwt;
    use crate::suffix_array::NaiveSuffixArrayBuilder;

    fn build_dawg<'a>(arena: &'a Bump, query: &[u8]) -> (Dawg<'a>, QueryBwt) {
        let symbols: Vec<u8> = query.iter().map(|&b| crate::nt6::encode(b).unwrap()).collect();
        let bwt = QueryBwt::build(&symbols, &NaiveSuffixArrayBuilder).unwrap();
        let g = Dawg::build(arena, &bwt).unwrap();
        (g, bwt)
    }

    #[test]
    fn exact_match_reaches_full_query_score() {
        let arena = Bump::new();
        let (dawg, _bwt) = build_dawg(&arena, b"ACGT");
        let reference = NaiveReferenceIndex::build(b"TTTTACGTTTTT").unwrap();
        let opts = SwOptions::default().with_min_sc(0);
        let mut cache = RankCache::new(opts.r2cache_size);
        let beam = run(&arena, &opts, &reference, &dawg, &mut cache);
        assert_eq!(beam.best_h, 4); // 4 matches at +1 each
    }

    #[test]
    fn unrelated_reference_scores_at_most_root() {
        let arena = Bump::new();
        let (dawg, _bwt) = build_dawg(&arena, b"ACGT");
        let reference = NaiveReferenceIndex::build(b"GGGGGGGG").unwrap();
        let opts = SwOptions::default().with_min_sc(0);
        let mut cache = RankCache::new(opts.r2cache_size);
        let beam = run(&arena, &opts, &reference, &dawg, &mut cache);
        assert!(beam.best_h <= 1);
    }

    /// Pins the documented quirk: an `E`- or `F`-sourced merge that raises a
    /// cell's `H` must NOT drag along its own `h_from_pos`, leaving the
    /// previous `H`-sourced `h_from_pos` in place even though `h_from` itself
    /// moves off `H`.
    #[test]
    fn merge_candidate_preserves_stale_h_from_pos_on_non_h_merge() {
        let mut candidates = HashMap::new();
        let key = (10i64, 20i64);

        let first = Cell {
            lo: 10,
            hi: 20,
            h: 5,
            e: 0,
            f: 0,
            h_from: HFrom::H,
            e_from: GapFrom::Open,
            f_from: GapFrom::Open,
            h_from_pos: encode_pos(3, 1, 25),
            e_from_pos: NONE_POS,
            f_from_off: F_UNSET,
        };
        merge_candidate(&mut candidates, key, first);

        let second = Cell {
            lo: 10,
            hi: 20,
            h: 9,
            e: 0,
            f: 9,
            h_from: HFrom::F,
            e_from: GapFrom::Open,
            f_from: GapFrom::Open,
            h_from_pos: encode_pos(7, 2, 25),
            e_from_pos: NONE_POS,
            f_from_off: F_UNSET,
        };
        let merged = merge_candidate(&mut candidates, key, second);

        assert_eq!(merged.h, 9);
        assert_eq!(merged.h_from, HFrom::F);
        assert_eq!(merged.h_from_pos, encode_pos(3, 1, 25));
    }
}
