//! Helpers for comma-separated site lists as stored on job records.
//!
//! Entries are separated by commas and/or whitespace; empty entries are
//! ignored. Comparisons are exact (case-sensitive).

/// Iterates the non-empty entries of a site list.
pub fn split(list: &str) -> impl Iterator<Item = &str> {
    list.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
}

/// Joins entries with a bare comma.
pub fn join<I, S>(sites: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for site in sites {
        if !out.is_empty() {
            out.push(',');
        }
        out.push_str(site.as_ref());
    }
    out
}

/// Returns true if `site` is an entry of `list`.
pub fn contains(list: &str, site: &str) -> bool {
    split(list).any(|s| s == site)
}

/// Sorts and deduplicates the entries of a list.
pub fn sort_set(list: &str) -> String {
    let mut entries: Vec<&str> = split(list).collect();
    entries.sort_unstable();
    entries.dedup();
    join(entries)
}

/// Removes every entry equal to `site`, preserving the order of the rest.
pub fn remove(list: &str, site: &str) -> String {
    join(split(list).filter(|s| *s != site))
}

/// Expands a whitelist with the destinations each entry maps to.
///
/// The original entries come first, in order; mapped destinations are
/// appended in lookup order. Duplicates are dropped.
pub fn expand<F>(list: &str, mut lookup: F) -> String
where
    F: FnMut(&str) -> Vec<String>,
{
    let mut out: Vec<String> = Vec::new();
    for site in split(list) {
        if !out.iter().any(|s| s == site) {
            out.push(site.to_string());
        }
    }

    let originals = out.clone();
    for site in &originals {
        for dest in lookup(site) {
            if !out.contains(&dest) {
                out.push(dest);
            }
        }
    }

    join(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_tolerates_spacing() {
        let entries: Vec<_> = split(" T1_US_FNAL, T2_CH_CERN,,T2_DE_DESY ").collect();
        assert_eq!(entries, vec!["T1_US_FNAL", "T2_CH_CERN", "T2_DE_DESY"]);
        assert_eq!(split("").count(), 0);
    }

    #[test]
    fn test_sort_set() {
        assert_eq!(
            sort_set("T2_CH_CERN,T1_US_FNAL,T2_CH_CERN"),
            "T1_US_FNAL,T2_CH_CERN"
        );
        assert_eq!(sort_set(""), "");
    }

    #[test]
    fn test_remove_is_exact() {
        assert_eq!(
            remove("T2_CH_CERN,T2_CH_CERN_HLT,T1_US_FNAL", "T2_CH_CERN"),
            "T2_CH_CERN_HLT,T1_US_FNAL"
        );
        assert_eq!(remove("T2_CH_CERN", "T2_CH_CERN"), "");
    }

    #[test]
    fn test_contains() {
        assert!(contains("T1_US_FNAL,T2_CH_CERN", "T2_CH_CERN"));
        assert!(!contains("T1_US_FNAL,T2_CH_CERN_HLT", "T2_CH_CERN"));
    }

    #[test]
    fn test_expand_appends_mapped_destinations() {
        let expanded = expand("T1_US_FNAL,T2_US_MIT", |site| match site {
            "T1_US_FNAL" => vec!["T2_US_Purdue".to_string(), "T2_US_MIT".to_string()],
            _ => vec![],
        });
        assert_eq!(expanded, "T1_US_FNAL,T2_US_MIT,T2_US_Purdue");
    }
}
