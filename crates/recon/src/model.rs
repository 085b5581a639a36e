use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};

// ---------------------------------------------------------------------------
// Canonical schema
// ---------------------------------------------------------------------------

/// Canonical column order for normalized exports. Merged outputs instead keep
/// the authoritative file's header order and append new columns.
pub const CANONICAL_HEADERS: &[&str] = &[
    "sport",
    "year",
    "set",
    "subset",
    "card_number",
    "player",
    "team",
    "league",
    "parallel",
    "insert",
    "rookie",
    "autograph",
    "serial_number",
    "grade",
    "condition",
    "quantity",
    "purchase_price",
    "value",
    "currency",
    "image",
    "image_back",
    "id",
    "title",
    "notes",
    "source",
    "timestamp",
];

/// One card inventory line, all alias resolution already done.
///
/// String fields hold the canonicalized cell text ("" when absent). Typed
/// fields carry their invariants: `quantity` is a non-negative integer
/// defaulting to 1, money fields are `None` when absent or unparsable
/// (distinct from zero).
#[derive(Debug, Clone, PartialEq)]
pub struct CardRecord {
    // Identity
    pub sport: String,
    pub year: String,
    pub set: String,
    pub subset: String,
    pub card_number: String,
    pub player: String,
    pub team: String,
    pub league: String,

    // Variant / parallel identity
    pub parallel: String,
    pub insert: String,
    pub rookie: String,
    pub autograph: String,
    pub serial_number: String,

    // Physical state
    pub grade: String,
    pub condition: String,

    // Commercial
    pub quantity: u32,
    pub purchase_price: Option<f64>,
    pub value: Option<f64>,
    pub currency: String,

    // Media
    pub image: String,
    pub image_back: String,

    // Bookkeeping
    pub id: String,
    pub title: String,
    pub notes: String,
    pub source: String,
    pub timestamp: Option<DateTime<Utc>>,

    /// Columns outside the canonical schema, slugified at ingestion. Carried
    /// through to output, excluded from matching and merge precedence.
    pub extra: BTreeMap<String, String>,
}

impl Default for CardRecord {
    fn default() -> Self {
        Self {
            sport: String::new(),
            year: String::new(),
            set: String::new(),
            subset: String::new(),
            card_number: String::new(),
            player: String::new(),
            team: String::new(),
            league: String::new(),
            parallel: String::new(),
            insert: String::new(),
            rookie: String::new(),
            autograph: String::new(),
            serial_number: String::new(),
            grade: String::new(),
            condition: String::new(),
            quantity: 1,
            purchase_price: None,
            value: None,
            currency: String::new(),
            image: String::new(),
            image_back: String::new(),
            id: String::new(),
            title: String::new(),
            notes: String::new(),
            source: String::new(),
            timestamp: None,
            extra: BTreeMap::new(),
        }
    }
}

impl CardRecord {
    /// Cell text for a canonical field name, or an extra column.
    pub fn get(&self, field: &str) -> String {
        match field {
            "sport" => self.sport.clone(),
            "year" => self.year.clone(),
            "set" => self.set.clone(),
            "subset" => self.subset.clone(),
            "card_number" => self.card_number.clone(),
            "player" => self.player.clone(),
            "team" => self.team.clone(),
            "league" => self.league.clone(),
            "parallel" => self.parallel.clone(),
            "insert" => self.insert.clone(),
            "rookie" => self.rookie.clone(),
            "autograph" => self.autograph.clone(),
            "serial_number" => self.serial_number.clone(),
            "grade" => self.grade.clone(),
            "condition" => self.condition.clone(),
            "quantity" => self.quantity.to_string(),
            "purchase_price" => format_money(self.purchase_price),
            "value" => format_money(self.value),
            "currency" => self.currency.clone(),
            "image" => self.image.clone(),
            "image_back" => self.image_back.clone(),
            "id" => self.id.clone(),
            "title" => self.title.clone(),
            "notes" => self.notes.clone(),
            "source" => self.source.clone(),
            "timestamp" => format_timestamp(self.timestamp),
            other => self.extra.get(other).cloned().unwrap_or_default(),
        }
    }

    /// Assign canonical field text, coercing the typed fields. Unknown
    /// field names land in `extra`.
    pub fn set(&mut self, field: &str, value: &str) {
        match field {
            "sport" => self.sport = value.to_string(),
            "year" => self.year = value.to_string(),
            "set" => self.set = value.to_string(),
            "subset" => self.subset = value.to_string(),
            "card_number" => self.card_number = value.to_string(),
            "player" => self.player = value.to_string(),
            "team" => self.team = value.to_string(),
            "league" => self.league = value.to_string(),
            "parallel" => self.parallel = value.to_string(),
            "insert" => self.insert = value.to_string(),
            "rookie" => self.rookie = value.to_string(),
            "autograph" => self.autograph = value.to_string(),
            "serial_number" => self.serial_number = value.to_string(),
            "grade" => self.grade = value.to_string(),
            "condition" => self.condition = value.to_string(),
            "quantity" => self.quantity = crate::normalize::parse_quantity(value),
            "purchase_price" => self.purchase_price = crate::normalize::parse_money(value),
            "value" => self.value = crate::normalize::parse_money(value),
            "currency" => self.currency = value.to_string(),
            "image" => self.image = value.to_string(),
            "image_back" => self.image_back = value.to_string(),
            "id" => self.id = value.to_string(),
            "title" => self.title = value.to_string(),
            "notes" => self.notes = value.to_string(),
            "source" => self.source = value.to_string(),
            "timestamp" => self.timestamp = crate::normalize::parse_timestamp(value),
            other => {
                self.extra.insert(other.to_string(), value.to_string());
            }
        }
    }

    pub fn is_blank(&self, field: &str) -> bool {
        self.get(field).trim().is_empty()
    }

    /// Materialize as an output row covering every canonical header plus all
    /// extra columns.
    pub fn to_row(&self) -> std::collections::HashMap<String, String> {
        let mut row = std::collections::HashMap::new();
        for &field in CANONICAL_HEADERS {
            row.insert(field.to_string(), self.get(field));
        }
        for (k, v) in &self.extra {
            row.insert(k.clone(), v.clone());
        }
        row
    }
}

pub fn format_money(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2}"),
        None => String::new(),
    }
}

pub fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    match ts {
        Some(t) => t.to_rfc3339_opts(SecondsFormat::Secs, true),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Row classification
// ---------------------------------------------------------------------------

/// Terminal state of one authoritative row after the matching pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowOutcome {
    Matched,
    Unmatched,
    Ambiguous,
}

impl std::fmt::Display for RowOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Matched => write!(f, "matched"),
            Self::Unmatched => write!(f, "unmatched"),
            Self::Ambiguous => write!(f, "ambiguous"),
        }
    }
}
