//! Field-by-field merge of a matched record pair.
//!
//! The old/authoritative record wins; the new record fills blanks only when
//! the policy asks for it. A losing value is never silently dropped: it is
//! retained under a `norm_<field>` shadow column.

use crate::config::{MergePolicy, ValueStrategy};
use crate::ingest::derive_id;
use crate::model::CardRecord;

/// Fields merged by plain precedence. The typed commercial fields, notes,
/// id, and timestamp have their own rules below.
const PRECEDENCE_FIELDS: &[&str] = &[
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
    "currency",
    "image",
    "image_back",
    "title",
    "source",
];

/// Merge a fuzzy-matched pair. Quantity keeps the authoritative count.
pub fn merge(old: &CardRecord, new: &CardRecord, policy: &MergePolicy) -> CardRecord {
    merge_fields(old, new, policy, false)
}

/// Merge two records sharing a strict duplicate key (the literal same
/// inventory line recorded twice), so quantities are summed, never
/// overwritten.
pub fn merge_duplicate(old: &CardRecord, new: &CardRecord, policy: &MergePolicy) -> CardRecord {
    merge_fields(old, new, policy, true)
}

fn merge_fields(
    old: &CardRecord,
    new: &CardRecord,
    policy: &MergePolicy,
    sum_quantity: bool,
) -> CardRecord {
    let mut merged = old.clone();

    for &field in PRECEDENCE_FIELDS {
        let old_value = old.get(field);
        let new_value = new.get(field);
        if new_value.is_empty() || old_value == new_value {
            continue;
        }
        if old_value.is_empty() && policy.fill_blanks {
            merged.set(field, &new_value);
        } else {
            merged
                .extra
                .insert(format!("norm_{field}"), new_value);
        }
    }

    merged.quantity = if sum_quantity {
        old.quantity + new.quantity
    } else {
        old.quantity
    };

    let new_is_newer = match (old.timestamp, new.timestamp) {
        (Some(a), Some(b)) => b > a,
        (None, Some(_)) => true,
        _ => false,
    };
    merged.value = merge_money(
        "value",
        old.value,
        new.value,
        new_is_newer,
        policy,
        &mut merged.extra,
    );
    merged.purchase_price = merge_money(
        "purchase_price",
        old.purchase_price,
        new.purchase_price,
        new_is_newer,
        policy,
        &mut merged.extra,
    );

    merged.notes = merge_notes(&old.notes, &new.notes, policy, &mut merged.extra);

    merged.timestamp = match (old.timestamp, new.timestamp) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    };

    // New-only extra columns are appended; colliding ones shadow.
    for (key, value) in &new.extra {
        match merged.extra.get(key) {
            None => {
                merged.extra.insert(key.clone(), value.clone());
            }
            Some(existing) if existing != value && !key.starts_with("norm_") => {
                merged.extra.insert(format!("norm_{key}"), value.clone());
            }
            Some(_) => {}
        }
    }

    merged.id = if !old.id.is_empty() {
        old.id.clone()
    } else if !new.id.is_empty() {
        new.id.clone()
    } else {
        derive_id(&merged)
    };

    merged
}

fn merge_money(
    field: &str,
    old_value: Option<f64>,
    new_value: Option<f64>,
    new_is_newer: bool,
    policy: &MergePolicy,
    shadows: &mut std::collections::BTreeMap<String, String>,
) -> Option<f64> {
    let chosen = match policy.merge_values {
        ValueStrategy::KeepOld => match (old_value, new_value) {
            (None, Some(n)) if policy.fill_blanks => Some(n),
            (o, _) => o,
        },
        ValueStrategy::Max => pick(old_value, new_value, f64::max),
        ValueStrategy::Min => pick(old_value, new_value, f64::min),
        ValueStrategy::Newest => {
            if new_is_newer {
                new_value.or(old_value)
            } else {
                old_value.or(new_value)
            }
        }
    };

    if let Some(n) = new_value {
        if chosen != new_value {
            shadows.insert(format!("norm_{field}"), crate::model::format_money(Some(n)));
        }
    }

    chosen
}

fn pick(a: Option<f64>, b: Option<f64>, f: fn(f64, f64) -> f64) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(f(a, b)),
        (x, y) => x.or(y),
    }
}

fn merge_notes(
    old: &str,
    new: &str,
    policy: &MergePolicy,
    shadows: &mut std::collections::BTreeMap<String, String>,
) -> String {
    if new.is_empty() || old == new {
        return old.to_string();
    }
    if old.is_empty() {
        if policy.fill_blanks {
            return new.to_string();
        }
        shadows.insert("norm_notes".to_string(), new.to_string());
        return String::new();
    }
    format!("{old} | {new}")
}
