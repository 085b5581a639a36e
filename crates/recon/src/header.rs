//! Header canonicalization: map arbitrary export column labels onto the
//! fixed canonical schema.
//!
//! Pure and stateless, applied independently to every header of every input
//! file, never renegotiated downstream.

use crate::model::CANONICAL_HEADERS;

/// Alias → canonical field. Labels are matched after [`normalize_label`].
/// Collected from the export variants seen in the wild: hand-edited research
/// sheets, "normalized" schema dumps, and eBay-style marketplace bulk files.
static ALIASES: &[(&str, &str)] = &[
    // identity
    ("card #", "card_number"),
    ("card no", "card_number"),
    ("card no.", "card_number"),
    ("card num", "card_number"),
    ("card number", "card_number"),
    ("cardnumber", "card_number"),
    ("number", "card_number"),
    ("no", "card_number"),
    ("no.", "card_number"),
    ("#", "card_number"),
    ("player", "player"),
    ("player name", "player"),
    ("athlete", "player"),
    ("subject", "player"),
    ("name", "player"),
    ("set", "set"),
    ("set name", "set"),
    ("product", "set"),
    ("brand", "set"),
    ("series", "set"),
    ("subset", "subset"),
    ("sub set", "subset"),
    ("year", "year"),
    ("season", "year"),
    ("release year", "year"),
    ("sport", "sport"),
    ("category", "sport"),
    ("team", "team"),
    ("team name", "team"),
    ("club", "team"),
    ("league", "league"),
    // variant
    ("parallel", "parallel"),
    ("parallel type", "parallel"),
    ("variation", "parallel"),
    ("insert", "insert"),
    ("insert set", "insert"),
    ("rookie", "rookie"),
    ("rc", "rookie"),
    ("rookie card", "rookie"),
    ("is rookie", "rookie"),
    ("autograph", "autograph"),
    ("auto", "autograph"),
    ("autographed", "autograph"),
    ("signed", "autograph"),
    ("serial number", "serial_number"),
    ("serial", "serial_number"),
    ("serial #", "serial_number"),
    ("serial numbered", "serial_number"),
    ("numbered", "serial_number"),
    ("print run", "serial_number"),
    // physical
    ("grade", "grade"),
    ("grading", "grade"),
    ("psa grade", "grade"),
    ("condition", "condition"),
    ("cond", "condition"),
    ("item condition", "condition"),
    // commercial
    ("qty", "quantity"),
    ("quantity", "quantity"),
    ("count", "quantity"),
    ("qty available", "quantity"),
    ("available quantity", "quantity"),
    ("price", "purchase_price"),
    ("purchase price", "purchase_price"),
    ("price paid", "purchase_price"),
    ("paid", "purchase_price"),
    ("cost", "purchase_price"),
    ("buy price", "purchase_price"),
    ("value", "value"),
    ("market value", "value"),
    ("estimated value", "value"),
    ("est value", "value"),
    ("current value", "value"),
    ("asking price", "value"),
    ("start price", "value"),
    ("currency", "currency"),
    ("curr", "currency"),
    // media
    ("image", "image"),
    ("images", "image"),
    ("img", "image"),
    ("photo", "image"),
    ("photos", "image"),
    ("front", "image"),
    ("front image", "image"),
    ("image url", "image"),
    ("picture", "image"),
    ("picture url", "image"),
    ("pic url", "image"),
    ("photo url", "image"),
    ("image back", "image_back"),
    ("back", "image_back"),
    ("back image", "image_back"),
    ("back photo", "image_back"),
    ("photo back", "image_back"),
    ("rear", "image_back"),
    // bookkeeping
    ("sku", "id"),
    ("custom label", "id"),
    ("custom label (sku)", "id"),
    ("item id", "id"),
    ("item number", "id"),
    ("listing id", "id"),
    ("title", "title"),
    ("item title", "title"),
    ("listing title", "title"),
    ("notes", "notes"),
    ("note", "notes"),
    ("comment", "notes"),
    ("comments", "notes"),
    ("description", "notes"),
    ("remarks", "notes"),
    ("source", "source"),
    ("origin", "source"),
    ("marketplace", "source"),
    ("timestamp", "timestamp"),
    ("updated", "timestamp"),
    ("updated at", "timestamp"),
    ("last updated", "timestamp"),
    ("created", "timestamp"),
    ("created at", "timestamp"),
    ("date added", "timestamp"),
];

/// Trim, collapse internal whitespace, lower-case.
pub fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Non-alphanumeric → underscore, runs collapsed, ends trimmed.
pub fn slugify(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    for ch in label.to_lowercase().chars() {
        if ch.is_alphanumeric() {
            slug.push(ch);
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    slug.trim_matches('_').to_string()
}

/// Map a raw header label to its canonical field name, or `None` when it is
/// not part of the canonical schema.
pub fn canonical_field(label: &str) -> Option<&'static str> {
    let normalized = normalize_label(label);
    if let Some(&(_, field)) = ALIASES.iter().find(|(alias, _)| *alias == normalized) {
        return Some(field);
    }
    CANONICAL_HEADERS.iter().find(|&&f| f == normalized).copied()
}

/// Canonical field name if known, else a slugified best-effort column name
/// preserved additively in the output.
pub fn resolve(label: &str) -> String {
    match canonical_field(label) {
        Some(field) => field.to_string(),
        None => slugify(label),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve() {
        assert_eq!(canonical_field("Card #"), Some("card_number"));
        assert_eq!(canonical_field("QTY"), Some("quantity"));
        assert_eq!(canonical_field("SKU"), Some("id"));
        assert_eq!(canonical_field("Custom label (SKU)"), Some("id"));
        assert_eq!(canonical_field("Photo URL"), Some("image"));
        assert_eq!(canonical_field("Back Image"), Some("image_back"));
    }

    #[test]
    fn canonical_names_accepted_as_is() {
        assert_eq!(canonical_field("serial_number"), Some("serial_number"));
        assert_eq!(canonical_field("purchase_price"), Some("purchase_price"));
    }

    #[test]
    fn whitespace_and_case_folded() {
        assert_eq!(canonical_field("  Item   Title "), Some("title"));
    }

    #[test]
    fn unknown_labels_slugify() {
        assert_eq!(resolve("Shipping Profile"), "shipping_profile");
        assert_eq!(resolve("  %% Weird--Label %% "), "weird_label");
    }

    #[test]
    fn every_alias_targets_a_canonical_field() {
        for (alias, field) in ALIASES {
            assert!(
                CANONICAL_HEADERS.contains(field),
                "alias {alias:?} maps to unknown field {field:?}"
            );
        }
    }
}
