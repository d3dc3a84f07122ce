use regex::Regex;

/// Literal noise substrings stripped from raw unit identifiers before they are
/// used as search keys. All occurrences are removed, order independent.
const UNIT_ID_NOISE: [&str; 6] = ["DNA-", "TIS-", "DNA Prep.", "Tissue", "DNA_Moll_", "DSM "];

pub fn clean_unit_id(raw: &str) -> String {
    let mut value = raw.to_string();
    for noise in UNIT_ID_NOISE {
        value = value.replace(noise, "");
    }
    value.trim().to_string()
}

/// Removes a leading institution code plus any run of whitespace, hyphens, or
/// underscores from a voucher identifier. An empty institution code is a
/// no-op rather than an empty-prefix match.
pub fn strip_institution_prefix(voucher_id: &str, institution_code: &str) -> String {
    if institution_code.is_empty() {
        return voucher_id.to_string();
    }
    // escaped literal plus a fixed tail, cannot fail to compile
    let pattern = format!(r"^{}[\s\-_]*", regex::escape(institution_code));
    let re = Regex::new(&pattern).unwrap();
    re.replace(voucher_id, "").into_owned()
}

/// True for `institution:unit` and `institution:collection:unit` shapes.
pub fn is_triplet_shaped(value: &str) -> bool {
    let re = Regex::new(r"^\w+:\w+(:\w+)?$").unwrap();
    re.is_match(value)
}

/// Joins the triplet segments, or returns an empty string when either the
/// institution or the unit segment is missing (no partial triplets). The
/// collection segment is used only when present and requested.
pub fn assemble_triplet(
    institution: &str,
    collection: &str,
    unit: &str,
    delimiter: &str,
    include_collection: bool,
) -> String {
    if institution.is_empty() || unit.is_empty() {
        return String::new();
    }
    if include_collection && !collection.is_empty() {
        format!("{institution}{delimiter}{collection}{delimiter}{unit}")
    } else {
        format!("{institution}{delimiter}{unit}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_unit_id_strips_noise() {
        assert_eq!(clean_unit_id("DNA-ABC123"), "ABC123");
        assert_eq!(clean_unit_id("TIS-XY 9"), "XY 9");
        assert_eq!(clean_unit_id("DSM 1337"), "1337");
        assert_eq!(clean_unit_id("  plain  "), "plain");
    }

    #[test]
    fn clean_unit_id_is_idempotent() {
        for raw in ["DNA-ABC123", "DNA Prep. 44", "DNA_Moll_77", "Tissue X", "NHMUK_2018"] {
            let once = clean_unit_id(raw);
            assert_eq!(clean_unit_id(&once), once);
        }
    }

    #[test]
    fn strip_prefix_handles_separators() {
        assert_eq!(strip_institution_prefix("NHMUK_2018", "NHMUK"), "2018");
        assert_eq!(strip_institution_prefix("NHMUK-2018", "NHMUK"), "2018");
        assert_eq!(strip_institution_prefix("NHMUK 2018", "NHMUK"), "2018");
        assert_eq!(strip_institution_prefix("RMNH.5077", "NHMUK"), "RMNH.5077");
    }

    #[test]
    fn strip_prefix_empty_institution_is_noop() {
        assert_eq!(strip_institution_prefix("X", ""), "X");
    }

    #[test]
    fn strip_prefix_escapes_metacharacters() {
        assert_eq!(strip_institution_prefix("A.B-77", "A.B"), "77");
        assert_eq!(strip_institution_prefix("AXB-77", "A.B"), "AXB-77");
    }

    #[test]
    fn triplet_shapes() {
        assert!(is_triplet_shaped("NHMUK:Mamm:2018"));
        assert!(is_triplet_shaped("NHMUK:2018"));
        assert!(!is_triplet_shaped("no-colon-here"));
        assert!(!is_triplet_shaped("a:b:c:d"));
        assert!(!is_triplet_shaped("NHMUK:"));
    }

    #[test]
    fn assemble_triplet_variants() {
        assert_eq!(assemble_triplet("NHMUK", "Mamm", "2018", ":", true), "NHMUK:Mamm:2018");
        assert_eq!(assemble_triplet("NHMUK", "Mamm", "2018", " ", true), "NHMUK Mamm 2018");
        assert_eq!(assemble_triplet("NHMUK", "Mamm", "2018", ":", false), "NHMUK:2018");
        assert_eq!(assemble_triplet("NHMUK", "", "2018", ":", true), "NHMUK:2018");
        assert_eq!(assemble_triplet("", "Mamm", "2018", ":", true), "");
        assert_eq!(assemble_triplet("NHMUK", "Mamm", "", ":", true), "");
    }
}
