use std::fmt;

/// Canonical join identity for a county.
///
/// Only [`normalize`] builds one, so two keys compare equal exactly when
/// their source names refer to the same county.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionKey(String);

impl RegionKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RegionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

const PREFIX: &str = "county ";

// Pre-1922 names. GADM already uses the modern ones.
const ALIASES: &[(&str, &str)] = &[
    ("kings county", "offaly"),
    ("king's county", "offaly"),
    ("queens county", "laois"),
    ("queen's county", "laois"),
];

pub fn normalize(raw: &str) -> RegionKey {
    let folded: String = raw.chars().map(fold_char).collect();
    let lowered = folded.to_lowercase();

    let mut name = lowered.trim();
    while let Some(rest) = name.strip_prefix(PREFIX) {
        name = rest.trim();
    }

    let canonical = ALIASES
        .iter()
        .find(|(old, _)| *old == name)
        .map(|(_, new)| *new)
        .unwrap_or(name);

    RegionKey(canonical.to_string())
}

/// Absent names map to the empty key.
pub fn normalize_opt(raw: Option<&str>) -> RegionKey {
    raw.map(normalize).unwrap_or_else(|| RegionKey(String::new()))
}

fn fold_char(c: char) -> char {
    match c {
        '\u{2018}' | '\u{2019}' | '\u{201B}' | '\u{2032}' | '\u{02BC}' => '\'',
        '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2212}' => '-',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn strips_prefix_and_case() {
        assert_eq!(normalize("County Offaly").as_str(), "offaly");
        assert_eq!(normalize("  COUNTY   Cork ").as_str(), "cork");
        assert_eq!(normalize("Offaly"), normalize("county offaly"));
    }

    #[test]
    fn folds_typographic_punctuation() {
        assert_eq!(normalize("King\u{2019}s County").as_str(), "offaly");
        assert_eq!(normalize("Dún Laoghaire\u{2013}Rathdown").as_str(), "dún laoghaire-rathdown");
    }

    #[test]
    fn historical_names_resolve_to_modern() {
        assert_eq!(normalize("Kings County"), normalize("Offaly"));
        assert_eq!(normalize("Queens County"), normalize("Laois"));
        assert_eq!(normalize("County Laois"), normalize("Queen's County"));
    }

    #[test]
    fn absent_name_is_empty_key() {
        assert!(normalize_opt(None).is_empty());
        assert!(normalize("   ").is_empty());
    }

    #[test]
    fn repeated_prefix_is_stable() {
        let once = normalize("County County Cork");
        assert_eq!(once.as_str(), "cork");
        assert_eq!(normalize(once.as_str()), once);
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(raw in "\\PC{0,40}") {
            let key = normalize(&raw);
            prop_assert_eq!(normalize(key.as_str()), key);
        }

        #[test]
        fn prefixed_names_match_bare(name in "[A-Za-z]{1,12}") {
            prop_assert_eq!(normalize(&format!("County {name}")), normalize(&name));
        }
    }
}
