use unidecode::unidecode;

pub fn clean_str(input: &str) -> String {
    unidecode(input) // Convert Unicode to ASCII
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
}

/// Drops a leading "the " so "The Weeknd" and "Weeknd" compare equal.
pub fn strip_leading_article(cleaned: &str) -> &str {
    cleaned.strip_prefix("the ").unwrap_or(cleaned)
}

/// Loose name filter used on catalogue search results, which can include related artists.
pub fn name_matches_query(name: &str, query: &str) -> bool {
    let name = clean_str(name);
    let query = clean_str(query);

    strip_leading_article(&name).contains(strip_leading_article(&query)) || name.contains(&query)
}
