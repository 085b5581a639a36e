//! The reconciliation orchestrator.
//!
//! Drives one pass: index the reference dataset by bucket key, walk the
//! authoritative dataset classifying every row as matched, unmatched, or
//! ambiguous, merge the matches, and report what happened. Reference records
//! never consumed by a match are reported as new-only, never auto-inserted.

use std::collections::HashMap;

use crate::config::ReconConfig;
use crate::ingest::Ingested;
use crate::key::bucket_key;
use crate::merge::merge;
use crate::model::{CardRecord, RowOutcome};
use crate::report::{row_sample, AmbiguousSample, ReconReport, SAMPLE_LIMIT};
use crate::score::rank_candidates;

/// Merged output plus the audit report. Row order follows the authoritative
/// input; header order follows the authoritative file with new columns
/// appended.
#[derive(Debug)]
pub struct ReconOutcome {
    pub headers: Vec<String>,
    pub rows: Vec<HashMap<String, String>>,
    pub report: ReconReport,
}

pub fn reconcile(old: &Ingested, new: &Ingested, config: &ReconConfig) -> ReconOutcome {
    // Candidate index over the reference dataset, built fresh per run.
    let mut index: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, record) in new.records.iter().enumerate() {
        index.entry(bucket_key(record)).or_default().push(i);
    }

    let mut used = vec![false; new.records.len()];
    let mut output: Vec<CardRecord> = Vec::with_capacity(old.records.len());
    let mut report = ReconReport::default();
    report.inputs.old_rows = old.records.len();
    report.inputs.new_rows = new.records.len();
    report.inputs.fill_blanks = config.policy.fill_blanks;
    report.inputs.merge_values = config.policy.merge_values.to_string();

    let floor = config.thresholds.floor;
    let gap = config.thresholds.gap;

    for (row_idx, old_record) in old.records.iter().enumerate() {
        let key = bucket_key(old_record);
        let candidate_idxs: &[usize] = index.get(&key).map(Vec::as_slice).unwrap_or(&[]);
        let candidates: Vec<&CardRecord> =
            candidate_idxs.iter().map(|&i| &new.records[i]).collect();

        let outcome = classify(old_record, &candidates, &config.weights, floor, gap);

        match outcome {
            Classified::Matched { candidate } => {
                let reference_idx = candidate_idxs[candidate];
                used[reference_idx] = true;
                output.push(merge(old_record, &new.records[reference_idx], &config.policy));
                report.results.matched += 1;
            }
            Classified::Unmatched => {
                output.push(old_record.clone());
                report.results.unmatched += 1;
                if report.samples.unmatched_rows.len() < SAMPLE_LIMIT {
                    report
                        .samples
                        .unmatched_rows
                        .push(row_sample(row_idx, &key, old_record));
                }
            }
            Classified::Ambiguous { top, runner_up } => {
                output.push(old_record.clone());
                report.results.ambiguous += 1;
                if report.samples.ambiguous_rows.len() < SAMPLE_LIMIT {
                    report.samples.ambiguous_rows.push(AmbiguousSample {
                        row: row_sample(row_idx, &key, old_record),
                        top: row_sample(candidate_idxs[top.0], &key, candidates[top.0]),
                        top_score: top.1,
                        runner_up: row_sample(
                            candidate_idxs[runner_up.0],
                            &key,
                            candidates[runner_up.0],
                        ),
                        runner_up_score: runner_up.1,
                    });
                }
            }
        }
    }

    for (i, record) in new.records.iter().enumerate() {
        if used[i] {
            continue;
        }
        report.results.unused_reference += 1;
        if report.samples.unused_reference_rows.len() < SAMPLE_LIMIT {
            report
                .samples
                .unused_reference_rows
                .push(row_sample(i, &bucket_key(record), record));
        }
    }

    let rows: Vec<HashMap<String, String>> = output.iter().map(CardRecord::to_row).collect();
    let headers = output_headers(&old.headers, &rows);
    report.results.output_rows = rows.len();
    report.results.output_columns = headers.len();

    ReconOutcome { headers, rows, report }
}

enum Classified {
    Matched { candidate: usize },
    Unmatched,
    Ambiguous { top: (usize, f64), runner_up: (usize, f64) },
}

/// The per-row state machine. Terminal states only; no row is ever forced.
fn classify(
    old_record: &CardRecord,
    candidates: &[&CardRecord],
    weights: &crate::config::MatchWeights,
    floor: f64,
    gap: f64,
) -> Classified {
    if candidates.is_empty() {
        return Classified::Unmatched;
    }

    let ranked = rank_candidates(old_record, candidates, weights);
    let top = ranked[0];

    if candidates.len() == 1 {
        // A single low-confidence candidate is not forced into a match.
        if top.1 >= floor {
            return Classified::Matched { candidate: top.0 };
        }
        return Classified::Unmatched;
    }

    let runner_up = ranked[1];
    if top.1 >= floor && top.1 - runner_up.1 >= gap {
        Classified::Matched { candidate: top.0 }
    } else {
        Classified::Ambiguous { top, runner_up }
    }
}

/// Authoritative header order first, then any new columns the merge
/// introduced, in stable sorted order.
pub fn output_headers(base: &[String], rows: &[HashMap<String, String>]) -> Vec<String> {
    let mut headers = base.to_vec();
    let mut appended: Vec<String> = rows
        .iter()
        .flat_map(|row| row.keys())
        .filter(|k| !headers.contains(k))
        .cloned()
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect();
    headers.append(&mut appended);
    headers
}

impl ReconOutcome {
    /// Pretty status map for tests and debugging.
    pub fn outcome_counts(&self) -> HashMap<RowOutcome, usize> {
        let mut counts = HashMap::new();
        counts.insert(RowOutcome::Matched, self.report.results.matched);
        counts.insert(RowOutcome::Unmatched, self.report.results.unmatched);
        counts.insert(RowOutcome::Ambiguous, self.report.results.ambiguous);
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReconConfig;

    fn ingested(records: Vec<CardRecord>) -> Ingested {
        Ingested {
            headers: vec!["player".into(), "set".into(), "card_number".into(), "year".into()],
            records,
        }
    }

    fn record(player: &str, set: &str, number: &str, year: &str) -> CardRecord {
        CardRecord {
            player: player.into(),
            set: set.into(),
            card_number: number.into(),
            year: year.into(),
            ..Default::default()
        }
    }

    #[test]
    fn no_candidates_passes_through_unmatched() {
        let old = ingested(vec![record("Messi", "Topps", "7", "2024")]);
        let new = ingested(vec![record("Haaland", "Prizm", "221", "2023")]);

        let outcome = reconcile(&old, &new, &ReconConfig::default());
        assert_eq!(outcome.report.results.unmatched, 1);
        assert_eq!(outcome.report.results.matched, 0);
        assert_eq!(outcome.report.results.unused_reference, 1);
        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rows[0]["player"], "Messi");
    }

    #[test]
    fn single_strong_candidate_merges() {
        let old = ingested(vec![record("Messi", "Topps", "7", "2024")]);
        let mut reference = record("Messi", "Topps", "7", "2024");
        reference.team = "Inter Miami".into();
        let new = ingested(vec![reference]);

        let outcome = reconcile(&old, &new, &ReconConfig::default());
        assert_eq!(outcome.report.results.matched, 1);
        assert_eq!(outcome.report.results.unused_reference, 0);
        // team was blank on the old side and fill_blanks is off
        assert_eq!(outcome.rows[0]["team"], "");
        assert_eq!(outcome.rows[0]["norm_team"], "Inter Miami");
    }

    #[test]
    fn fill_blanks_promotes_reference_fields() {
        let old = ingested(vec![record("Messi", "Topps", "7", "2024")]);
        let mut reference = record("Messi", "Topps", "7", "2024");
        reference.team = "Inter Miami".into();
        let new = ingested(vec![reference]);

        let mut config = ReconConfig::default();
        config.policy.fill_blanks = true;
        let outcome = reconcile(&old, &new, &config);
        assert_eq!(outcome.rows[0]["team"], "Inter Miami");
    }

    #[test]
    fn near_tied_candidates_are_ambiguous() {
        // Two parallels of the same card share the identity key; neither
        // clears the gap, so nothing merges silently.
        let old = ingested(vec![record("Messi", "Topps", "7", "2024")]);
        let mut a = record("Messi", "Topps", "7", "2024");
        a.parallel = "Refractor".into();
        let mut b = record("Messi", "Topps", "7", "2024");
        b.parallel = "Gold".into();
        let new = ingested(vec![a, b]);

        let outcome = reconcile(&old, &new, &ReconConfig::default());
        assert_eq!(outcome.report.results.ambiguous, 1);
        assert_eq!(outcome.report.results.matched, 0);
        assert_eq!(outcome.report.samples.ambiguous_rows.len(), 1);
        let sample = &outcome.report.samples.ambiguous_rows[0];
        assert_eq!(sample.top_score, sample.runner_up_score);
        // Pass-through untouched
        assert_eq!(outcome.rows[0]["parallel"], "");
    }

    #[test]
    fn winner_inside_the_gap_is_still_ambiguous() {
        // Three candidates: two tied, one ahead by only team agreement
        // (0.75 < 1.0 gap). Close calls go to manual review.
        let mut old_record = record("Messi", "Topps Chrome", "7", "2024");
        old_record.team = "Inter Miami".into();
        let old = ingested(vec![old_record]);

        let tied_a = record("Messi", "Topps Chrome", "7", "2024");
        let tied_b = record("Messi", "Topps Chrome", "7", "2024");
        let mut close = record("Messi", "Topps Chrome", "7", "2024");
        close.team = "Inter Miami".into();
        let new = ingested(vec![tied_a, tied_b, close]);

        let outcome = reconcile(&old, &new, &ReconConfig::default());
        assert_eq!(outcome.report.results.ambiguous, 1);
        assert_eq!(outcome.report.results.matched, 0);
        let sample = &outcome.report.samples.ambiguous_rows[0];
        assert!(sample.top_score >= 8.0);
        assert!(sample.top_score - sample.runner_up_score < 1.0);
    }

    #[test]
    fn clear_winner_beats_the_gap() {
        // Both candidates share the identity key; team + league agreement
        // (0.75 + 0.5) pushes the right one past the 1.0 gap.
        let mut old_record = record("Messi", "Topps Chrome", "7", "2024");
        old_record.team = "Inter Miami".into();
        old_record.league = "MLS".into();
        let old = ingested(vec![old_record]);

        let mut strong = record("Messi", "Topps Chrome", "7", "2024");
        strong.team = "Inter Miami".into();
        strong.league = "MLS".into();
        let weak = record("Messi", "Topps Chrome", "7", "2024");
        let new = ingested(vec![weak, strong]);

        let outcome = reconcile(&old, &new, &ReconConfig::default());
        assert_eq!(outcome.report.results.matched, 1);
        assert_eq!(outcome.report.results.unused_reference, 1);
        assert_eq!(outcome.rows[0]["team"], "Inter Miami");
    }

    #[test]
    fn weak_single_candidate_is_not_forced() {
        // Same bucket via weak-key fallback, but the score cannot reach the
        // floor with only two populated fields.
        let mut sparse_old = CardRecord::default();
        sparse_old.title = "mystery lot".into();
        let mut sparse_new = CardRecord::default();
        sparse_new.title = "mystery lot".into();

        let old = ingested(vec![sparse_old]);
        let new = ingested(vec![sparse_new]);

        let outcome = reconcile(&old, &new, &ReconConfig::default());
        assert_eq!(outcome.report.results.unmatched, 1);
    }

    #[test]
    fn output_headers_append_new_columns() {
        let base = vec!["player".to_string(), "set".to_string()];
        let mut row = HashMap::new();
        row.insert("player".to_string(), "x".to_string());
        row.insert("norm_set".to_string(), "y".to_string());
        row.insert("grade".to_string(), "z".to_string());

        let headers = output_headers(&base, &[row]);
        assert_eq!(headers[..2], ["player".to_string(), "set".to_string()]);
        assert!(headers[2..].contains(&"norm_set".to_string()));
        assert!(headers[2..].contains(&"grade".to_string()));
    }
}
