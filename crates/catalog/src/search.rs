//! Search predicates shared by catalog listings.

/// Trim, drop empties, and split comma-separated terms (`?tags=a,b&tags=c`).
pub fn normalize_terms<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .flat_map(|term| {
            term.as_ref()
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Case-insensitive substring match of any keyword against `text`.
///
/// No keywords means no constraint.
pub fn matches_any_keyword(text: &str, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return true;
    }
    let haystack = text.to_lowercase();
    keywords.iter().any(|k| haystack.contains(&k.to_lowercase()))
}

/// Exact any-of match between item tags and requested tags.
///
/// No requested tags means no constraint.
pub fn matches_any_tag(item_tags: &[String], requested: &[String]) -> bool {
    requested.is_empty() || requested.iter().any(|t| item_tags.contains(t))
}
