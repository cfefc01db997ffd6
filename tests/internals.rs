//! Tests that reach into the engine's internal modules (all `pub`, just not
//! re-exported from the crate root) to check properties [`align`] alone
//! can't observe directly: row invariants, beam pruning, and back-pointer
//! shapes.

use bumpalo::Bump;

use bwasw_core::dawg::Dawg;
use bwasw_core::fm_index::NaiveReferenceIndex;
use bwasw_core::query_bwt::QueryBwt;
use bwasw_core::rank_cache::RankCache;
use bwasw_core::suffix_array::NaiveSuffixArrayBuilder;
use bwasw_core::sw_engine::{self, HFrom, NONE_POS};
use bwasw_core::{nt6, SwOptions};

fn setup<'a>(arena: &'a Bump, query: &[u8]) -> (Dawg<'a>, QueryBwt) {
    let symbols: Vec<u8> = query.iter().map(|&b| nt6::encode(b).unwrap()).collect();
    let bwt = QueryBwt::build(&symbols, &NaiveSuffixArrayBuilder).unwrap();
    let dawg = Dawg::build(arena, &bwt).unwrap();
    (dawg, bwt)
}

#[test]
fn s5_root_row_has_exactly_one_cell_at_zero() {
    let arena = Bump::new();
    let (dawg, _bwt) = setup(&arena, b"ACGT");
    let reference = NaiveReferenceIndex::build(b"ACGTACGT").unwrap();
    let opts = SwOptions::default();
    let mut cache = RankCache::new(opts.r2cache_size);
    let beam = sw_engine::run(&arena, &opts, &reference, &dawg, &mut cache);

    assert_eq!(beam.rows[0].len(), 1);
    let root = beam.rows[0][0];
    assert_eq!(root.lo, 0);
    assert_eq!(root.hi, *reference.acc().last().unwrap() as i64);
    assert_eq!(root.h, 0);
    assert_eq!(root.h_from, HFrom::H);
    assert_eq!(root.h_from_pos, NONE_POS);
}

#[test]
fn rows_never_exceed_the_beam_width() {
    let arena = Bump::new();
    let (dawg, _bwt) = setup(&arena, b"ACGTACGTACGTACGT");
    let reference = NaiveReferenceIndex::build(b"ACGTACGTACGTACGTACGTACGTACGTACGT").unwrap();
    let opts = SwOptions::default().with_n_best(4);
    let mut cache = RankCache::new(opts.r2cache_size);
    let beam = sw_engine::run(&arena, &opts, &reference, &dawg, &mut cache);

    for row in beam.rows.iter() {
        assert!(row.len() <= opts.n_best);
    }
}

#[test]
fn rows_are_sorted_by_h_descending() {
    let arena = Bump::new();
    let (dawg, _bwt) = setup(&arena, b"ACGTACGTACGT");
    let reference = NaiveReferenceIndex::build(b"TTACGTACGTACGTGGACGTACGGTTT").unwrap();
    let opts = SwOptions::default();
    let mut cache = RankCache::new(opts.r2cache_size);
    let beam = sw_engine::run(&arena, &opts, &reference, &dawg, &mut cache);

    for row in beam.rows.iter() {
        for pair in row.windows(2) {
            assert!(pair[0].h >= pair[1].h);
        }
    }
}

#[test]
fn every_cell_interval_is_well_formed() {
    let arena = Bump::new();
    let (dawg, _bwt) = setup(&arena, b"ACGTACGT");
    let reference = NaiveReferenceIndex::build(b"GGACGTACGTTTACGTACGTCC").unwrap();
    let opts = SwOptions::default();
    let mut cache = RankCache::new(opts.r2cache_size);
    let beam = sw_engine::run(&arena, &opts, &reference, &dawg, &mut cache);
    let total = *reference.acc().last().unwrap() as i64;

    for row in beam.rows.iter() {
        for cell in row.iter() {
            assert!(cell.hi > cell.lo);
            assert!(cell.lo >= 0 && cell.hi <= total);
        }
    }
}
