//! Key relationships
//!
//! Related keys widen a candidate pool when too few tunes share the primary
//! tune's key: first the modal variants of the same tonic, then a small
//! hand-curated table of relatives for the common session tonics.

/// Modes tried on the same tonic, in priority order ("major" has no suffix)
const MODAL_SHIFTS: [&str; 4] = ["major", "mixolydian", "dorian", "minor"];

/// Curated relatives, keyed by tonic
const RELATIVES: &[(&str, &[&str])] = &[
    ("G", &["D", "C", "E minor", "A dorian"]),
    ("D", &["A", "G", "B minor", "E dorian"]),
    ("A", &["E", "D", "F# minor", "B dorian"]),
    ("C", &["G", "F", "A minor", "D dorian"]),
    ("E", &["A", "B", "G major", "D major"]),
];

/// Keys related to `key`, ordered modal variants first, deduplicated, never
/// including `key` itself. Empty for empty input.
pub fn related_keys(key: &str) -> Vec<String> {
    let mut parts = key.split_whitespace();
    let tonic = match parts.next() {
        Some(t) => t,
        None => return Vec::new(),
    };

    let modal = MODAL_SHIFTS.iter().map(|mode| {
        if *mode == "major" {
            tonic.to_string()
        } else {
            format!("{} {}", tonic, mode)
        }
    });

    let relatives = RELATIVES
        .iter()
        .find(|(t, _)| *t == tonic)
        .map(|(_, keys)| *keys)
        .unwrap_or(&[])
        .iter()
        .map(|k| k.to_string());

    let mut related: Vec<String> = Vec::new();
    for candidate in modal.chain(relatives) {
        if candidate != key && !related.contains(&candidate) {
            related.push(candidate);
        }
    }
    related
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_g_major_relatives() {
        let related = related_keys("G");
        assert!(!related.contains(&"G".to_string()));
        for expected in ["G mixolydian", "G dorian", "G minor", "D", "C", "E minor", "A dorian"] {
            assert!(related.contains(&expected.to_string()), "missing {}", expected);
        }
    }

    #[test]
    fn test_modal_shifts_come_first() {
        let related = related_keys("D");
        assert_eq!(&related[..3], &["D mixolydian", "D dorian", "D minor"]);
        assert_eq!(&related[3..], &["A", "G", "B minor", "E dorian"]);
    }

    #[test]
    fn test_minor_key_includes_plain_tonic() {
        let related = related_keys("A minor");
        assert_eq!(related[0], "A");
        assert!(!related.contains(&"A minor".to_string()));
        assert!(related.contains(&"F# minor".to_string()));
    }

    #[test]
    fn test_unlisted_tonic_gets_modal_shifts_only() {
        let related = related_keys("Bb");
        assert_eq!(related, vec!["Bb mixolydian", "Bb dorian", "Bb minor"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(related_keys("").is_empty());
        assert!(related_keys("   ").is_empty());
    }
}
