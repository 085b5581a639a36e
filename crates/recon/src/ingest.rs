//! Raw parsed tables → canonical [`CardRecord`]s.
//!
//! All alias resolution happens here, once. Downstream code only ever sees
//! the fixed-shape record.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use crate::header;
use crate::key::strict_key;
use crate::model::{CardRecord, CANONICAL_HEADERS};
use crate::normalize::{
    extract_card_number_from_title, extract_set_from_title, extract_year, parse_boolean,
    parse_image_list, parse_money, parse_quantity, parse_timestamp,
};

/// One canonicalized dataset: resolved header order (as the file presented
/// it) plus the coerced records.
#[derive(Debug, Clone)]
pub struct Ingested {
    pub headers: Vec<String>,
    pub records: Vec<CardRecord>,
}

/// Canonicalize and coerce one parsed table. `source` names the dataset
/// (typically the file stem) and fills the `source` field when the export
/// carries none. Malformed cells degrade to defaults; this never fails.
pub fn ingest(headers: &[String], rows: &[HashMap<String, String>], source: &str) -> Ingested {
    // Resolve each raw label once per table.
    let resolved: Vec<(String, String)> = headers
        .iter()
        .map(|raw| (raw.clone(), header::resolve(raw)))
        .filter(|(_, canonical)| !canonical.is_empty())
        .collect();

    let mut out_headers: Vec<String> = Vec::new();
    for (_, canonical) in &resolved {
        if !out_headers.contains(canonical) {
            out_headers.push(canonical.clone());
        }
    }

    let records = rows
        .iter()
        .map(|row| ingest_row(&resolved, row, source))
        .collect();

    Ingested {
        headers: out_headers,
        records,
    }
}

fn ingest_row(
    resolved: &[(String, String)],
    row: &HashMap<String, String>,
    source: &str,
) -> CardRecord {
    // Collect cell text per canonical field; when several raw columns map to
    // the same field, the first non-empty cell wins.
    let mut cells: HashMap<&str, &str> = HashMap::new();
    let mut extras: Vec<(&str, &str)> = Vec::new();
    for (raw, canonical) in resolved {
        let value = row.get(raw).map(String::as_str).unwrap_or("").trim();
        if CANONICAL_HEADERS.contains(&canonical.as_str()) {
            let slot = cells.entry(canonical.as_str()).or_default();
            if slot.is_empty() {
                *slot = value;
            }
        } else {
            extras.push((canonical.as_str(), value));
        }
    }

    let cell = |field: &str| cells.get(field).copied().unwrap_or("").to_string();

    let mut record = CardRecord {
        sport: cell("sport"),
        year: extract_year(&cell("year")),
        set: cell("set"),
        subset: cell("subset"),
        card_number: cell("card_number"),
        player: cell("player"),
        team: cell("team"),
        league: cell("league"),
        parallel: cell("parallel"),
        insert: cell("insert"),
        rookie: parse_boolean(&cell("rookie")),
        autograph: parse_boolean(&cell("autograph")),
        serial_number: cell("serial_number"),
        grade: cell("grade"),
        condition: cell("condition"),
        quantity: parse_quantity(&cell("quantity")),
        purchase_price: parse_money(&cell("purchase_price")),
        value: parse_money(&cell("value")),
        currency: cell("currency"),
        image: String::new(),
        image_back: String::new(),
        id: cell("id"),
        title: cell("title"),
        notes: cell("notes"),
        source: cell("source"),
        timestamp: parse_timestamp(&cell("timestamp")),
        extra: Default::default(),
    };

    // An images cell may hold a list; the first entry is the front, and the
    // second fills the back slot when no dedicated back column is present.
    let front_list = parse_image_list(&cell("image"));
    let back_list = parse_image_list(&cell("image_back"));
    record.image = front_list.first().cloned().unwrap_or_default();
    record.image_back = back_list
        .first()
        .cloned()
        .or_else(|| front_list.get(1).cloned())
        .unwrap_or_default();

    // Title-mined fallbacks, only where the structured column came up blank.
    if record.card_number.is_empty() {
        record.card_number = extract_card_number_from_title(&record.title);
    }
    if record.set.is_empty() {
        record.set = extract_set_from_title(&record.title);
    }
    if record.year.is_empty() {
        record.year = extract_year(&record.title);
    }

    if record.source.is_empty() {
        record.source = source.to_string();
    }

    for (canonical, value) in extras {
        if !value.is_empty() {
            record.extra.insert(canonical.to_string(), value.to_string());
        }
    }

    if record.id.is_empty() {
        record.id = derive_id(&record);
    }

    record
}

/// Deterministic id from the strict duplicate key, so re-normalizing
/// unchanged input reproduces the same id.
pub fn derive_id(record: &CardRecord) -> String {
    let digest = Sha256::digest(strict_key(record).as_bytes());
    let hex: String = digest[..8].iter().map(|b| format!("{b:02x}")).collect();
    format!("tl-{hex}")
}
