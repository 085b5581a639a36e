//! Run reports: counts plus bounded samples, written alongside the merged
//! output for human audit. Derived, disposable artifacts, never a source of
//! truth.

use serde::Serialize;

use crate::model::CardRecord;

/// Cap on every sample array, to keep reports small at any input scale.
pub const SAMPLE_LIMIT: usize = 25;

// ---------------------------------------------------------------------------
// Reconciliation report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconReport {
    pub inputs: ReconInputs,
    pub results: ReconResults,
    pub samples: ReconSamples,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconInputs {
    pub old_path: String,
    pub new_path: String,
    pub old_rows: usize,
    pub new_rows: usize,
    pub fill_blanks: bool,
    pub merge_values: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconResults {
    pub matched: usize,
    pub unmatched: usize,
    pub ambiguous: usize,
    pub unused_reference: usize,
    pub output_rows: usize,
    pub output_columns: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconSamples {
    pub unmatched_rows: Vec<RowSample>,
    pub ambiguous_rows: Vec<AmbiguousSample>,
    pub unused_reference_rows: Vec<RowSample>,
}

/// Just enough of a record to find it again by hand.
#[derive(Debug, Clone, Serialize)]
pub struct RowSample {
    pub row: usize,
    pub key: String,
    pub player: String,
    pub set: String,
    pub card_number: String,
    pub year: String,
}

/// An ambiguous row with its top two candidates, for manual review.
#[derive(Debug, Clone, Serialize)]
pub struct AmbiguousSample {
    pub row: RowSample,
    pub top: RowSample,
    pub top_score: f64,
    pub runner_up: RowSample,
    pub runner_up_score: f64,
}

pub fn row_sample(index: usize, key: &str, record: &CardRecord) -> RowSample {
    RowSample {
        row: index,
        key: key.to_string(),
        player: record.player.clone(),
        set: record.set.clone(),
        card_number: record.card_number.clone(),
        year: record.year.clone(),
    }
}

// ---------------------------------------------------------------------------
// Dedupe report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct DedupeReport {
    pub inputs: DedupeInputs,
    pub results: DedupeResults,
    pub samples: DedupeSamples,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DedupeInputs {
    pub path: String,
    pub rows: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DedupeResults {
    pub input_rows: usize,
    pub output_rows: usize,
    pub duplicate_groups: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DedupeSamples {
    pub collapsed_groups: Vec<CollapsedSample>,
}

/// One collapsed duplicate group: how many lines folded in and the summed
/// quantity they ended up with.
#[derive(Debug, Clone, Serialize)]
pub struct CollapsedSample {
    pub key: String,
    pub rows: usize,
    pub quantity: u32,
    pub player: String,
    pub set: String,
    pub card_number: String,
}
