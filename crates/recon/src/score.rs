//! Weighted similarity scoring between candidate record pairs.
//!
//! Scoring only discriminates among records that already share a bucket key;
//! it never replaces key-based candidate lookup.

use crate::config::MatchWeights;
use crate::model::CardRecord;
use crate::normalize::{extract_year, normalize_text};

/// Similarity score, monotonically larger for stronger matches. Pure and
/// reproducible for any given pair.
pub fn score(old: &CardRecord, new: &CardRecord, weights: &MatchWeights) -> f64 {
    let mut total = 0.0;

    total += exact(&old.player, &new.player) * weights.player;
    total += exact_or_partial(&old.set, &new.set) * weights.set;
    total += exact(&old.card_number, &new.card_number) * weights.card_number;

    let old_year = extract_year(&old.year);
    let new_year = extract_year(&new.year);
    if !old_year.is_empty() && old_year == new_year {
        total += weights.year;
    }

    total += exact_or_partial(&old.team, &new.team) * weights.team;
    total += exact(&old.league, &new.league) * weights.league;

    total
}

/// 1.0 for an exact folded match, else 0.0. Blank fields never match.
fn exact(a: &str, b: &str) -> f64 {
    let a = normalize_text(a);
    let b = normalize_text(b);
    if !a.is_empty() && a == b {
        1.0
    } else {
        0.0
    }
}

/// Exact folded match earns full weight; a one-sided substring ("Prizm" vs
/// "Panini Prizm") earns half.
fn exact_or_partial(a: &str, b: &str) -> f64 {
    let a = normalize_text(a);
    let b = normalize_text(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        1.0
    } else if a.contains(&b) || b.contains(&a) {
        0.5
    } else {
        0.0
    }
}

/// Candidate indexes ranked by score, best first. Sorting is stable, so
/// equal scores keep input order and "first in input order wins" holds.
pub fn rank_candidates(
    old: &CardRecord,
    candidates: &[&CardRecord],
    weights: &MatchWeights,
) -> Vec<(usize, f64)> {
    let mut ranked: Vec<(usize, f64)> = candidates
        .iter()
        .enumerate()
        .map(|(i, candidate)| (i, score(old, candidate, weights)))
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked
}
