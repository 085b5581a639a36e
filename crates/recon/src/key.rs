//! Identity key derivation.
//!
//! The identity key (`player|set|card_number|year`, folded) is the join key
//! across datasets. The strict duplicate key folds in the variant and
//! physical fields: two records sharing it are the literal same inventory
//! line and safe to merge by summation. Sharing only the identity key means
//! "same logical card, possibly a different parallel": candidates for
//! scoring, never for blind merging.

use crate::model::CardRecord;
use crate::normalize::{
    extract_card_number_from_title, extract_set_from_title, extract_year, normalize_text,
};

pub const KEY_SEPARATOR: &str = "|";

/// The four primary key parts, structured columns preferred, title-mined
/// fallbacks before empty.
fn primary_parts(record: &CardRecord) -> [String; 4] {
    let player = normalize_text(&record.player);

    let mut set = normalize_text(&record.set);
    if set.is_empty() {
        set = normalize_text(&extract_set_from_title(&record.title));
    }

    let mut card_number = normalize_text(&record.card_number);
    if card_number.is_empty() {
        card_number = normalize_text(&extract_card_number_from_title(&record.title));
    }

    let mut year = extract_year(&record.year);
    if year.is_empty() {
        year = extract_year(&record.title);
    }

    [player, set, card_number, year]
}

pub fn identity_key(record: &CardRecord) -> String {
    primary_parts(record).join(KEY_SEPARATOR)
}

/// Identity key plus variant/physical fields in a fixed, stable order.
pub fn strict_key(record: &CardRecord) -> String {
    let mut parts = primary_parts(record).to_vec();
    for field in [
        &record.parallel,
        &record.insert,
        &record.rookie,
        &record.autograph,
        &record.serial_number,
        &record.grade,
        &record.condition,
    ] {
        parts.push(normalize_text(field));
    }
    parts.join(KEY_SEPARATOR)
}

/// A key built from fewer than 2 populated primary parts would make
/// largely-blank rows collide spuriously.
pub fn is_weak(record: &CardRecord) -> bool {
    primary_parts(record)
        .iter()
        .filter(|p| !p.is_empty())
        .count()
        < 2
}

/// Last-resort key for weak rows: folded title plus first image URL.
pub fn fallback_key(record: &CardRecord) -> String {
    format!(
        "{}{KEY_SEPARATOR}{}",
        normalize_text(&record.title),
        record.image
    )
}

/// The key to bucket candidates under: identity key, unless the row is too
/// blank to trust it.
pub fn bucket_key(record: &CardRecord) -> String {
    if is_weak(record) {
        fallback_key(record)
    } else {
        identity_key(record)
    }
}

/// Bucket key for the exact-duplicate pass.
pub fn strict_bucket_key(record: &CardRecord) -> String {
    if is_weak(record) {
        fallback_key(record)
    } else {
        strict_key(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn key_is_case_whitespace_and_diacritic_invariant() {
        let a = record("José Ramírez", "Topps  Chrome", "#27", "2022");
        let b = record("jose ramirez", "topps chrome", "27", "2022");
        assert_eq!(identity_key(&a), identity_key(&b));
    }

    #[test]
    fn key_mines_title_when_structured_fields_blank() {
        let mut r = record("Haaland", "", "", "");
        r.title = "2023-24 Panini Prizm #221 Haaland".into();
        assert_eq!(identity_key(&r), "haaland|panini prizm|221|2023");
    }

    #[test]
    fn strict_key_separates_parallels() {
        let base = record("Messi", "Topps", "7", "2024");
        let mut refractor = base.clone();
        refractor.parallel = "Refractor".into();
        assert_eq!(identity_key(&base), identity_key(&refractor));
        assert_ne!(strict_key(&base), strict_key(&refractor));
    }

    #[test]
    fn graded_copy_is_a_distinct_line() {
        let raw = record("Messi", "Topps", "7", "2024");
        let mut graded = raw.clone();
        graded.grade = "PSA 9".into();
        assert_ne!(strict_key(&raw), strict_key(&graded));
    }

    #[test]
    fn mostly_blank_rows_are_weak() {
        let r = record("Messi", "", "", "");
        assert!(is_weak(&r));
        assert!(!is_weak(&record("Messi", "Topps", "", "")));
    }

    #[test]
    fn weak_rows_bucket_by_fallback() {
        let mut r = record("", "", "", "");
        r.title = "mystery lot".into();
        r.image = "https://img.toploader.cards/lot.jpg".into();
        assert_eq!(
            bucket_key(&r),
            "mystery lot|https://img.toploader.cards/lot.jpg"
        );
    }
}
