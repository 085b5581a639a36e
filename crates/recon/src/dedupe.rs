//! Exact-duplicate collapse over a single dataset.
//!
//! Same pipeline as reconciliation minus fuzzy scoring: rows sharing a
//! strict duplicate key are the same physical inventory line recorded more
//! than once, so they merge by summation. The survivor of each group is the
//! most complete row, and quantity is conserved.

use std::collections::HashMap;

use crate::config::MergePolicy;
use crate::ingest::Ingested;
use crate::key::strict_bucket_key;
use crate::merge::merge_duplicate;
use crate::model::CardRecord;
use crate::report::{CollapsedSample, DedupeReport, SAMPLE_LIMIT};

/// Fields counted toward the completeness score used to pick a duplicate
/// group's surviving row.
const COMPLETENESS_FIELDS: &[&str] = &[
    "player",
    "set",
    "card_number",
    "year",
    "parallel",
    "insert",
    "serial_number",
    "grade",
    "image",
    "value",
    "purchase_price",
    "notes",
];

#[derive(Debug)]
pub struct DedupeOutcome {
    pub headers: Vec<String>,
    pub rows: Vec<HashMap<String, String>>,
    pub report: DedupeReport,
}

/// Heuristic count of populated high-value fields; ties resolve to input
/// order.
pub fn completeness(record: &CardRecord) -> usize {
    COMPLETENESS_FIELDS
        .iter()
        .filter(|&&field| !record.is_blank(field))
        .count()
}

pub fn dedupe(input: &Ingested, policy: &MergePolicy) -> DedupeOutcome {
    // Group rows by strict key, preserving first-appearance order.
    let mut group_of: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
    for (i, record) in input.records.iter().enumerate() {
        let key = strict_bucket_key(record);
        match group_of.get(&key) {
            Some(&g) => groups[g].1.push(i),
            None => {
                group_of.insert(key.clone(), groups.len());
                groups.push((key, vec![i]));
            }
        }
    }

    let mut report = DedupeReport::default();
    report.inputs.rows = input.records.len();
    report.results.input_rows = input.records.len();

    let mut output: Vec<CardRecord> = Vec::with_capacity(groups.len());
    for (key, members) in &groups {
        if members.len() == 1 {
            output.push(input.records[members[0]].clone());
            continue;
        }

        // First row wins completeness ties.
        let mut survivor = members[0];
        let mut best = completeness(&input.records[survivor]);
        for &i in &members[1..] {
            let score = completeness(&input.records[i]);
            if score > best {
                best = score;
                survivor = i;
            }
        }

        let mut merged = input.records[survivor].clone();
        for &i in members {
            if i != survivor {
                merged = merge_duplicate(&merged, &input.records[i], policy);
            }
        }

        report.results.duplicate_groups += 1;
        if report.samples.collapsed_groups.len() < SAMPLE_LIMIT {
            report.samples.collapsed_groups.push(CollapsedSample {
                key: key.clone(),
                rows: members.len(),
                quantity: merged.quantity,
                player: merged.player.clone(),
                set: merged.set.clone(),
                card_number: merged.card_number.clone(),
            });
        }
        output.push(merged);
    }

    let rows: Vec<HashMap<String, String>> = output.iter().map(CardRecord::to_row).collect();
    let headers = crate::engine::output_headers(&input.headers, &rows);
    report.results.output_rows = rows.len();

    DedupeOutcome { headers, rows, report }
}
