//! Label normalization for node types, relationship types and property keys
//!
//! All three functions are idempotent: feeding an already-normalized label
//! back in returns it unchanged.

/// Title-case a node type: every whitespace-separated word starts with an
/// upper-case letter followed by lower-case letters.
///
/// ```
/// use graphbuilder_domain::label::format_node_type;
///
/// assert_eq!(format_node_type("person"), "Person");
/// assert_eq!(format_node_type("  software   company "), "Software Company");
/// ```
pub fn format_node_type(raw: &str) -> String {
    raw.split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Upper-case a relationship type and join its words with underscores.
///
/// ```
/// use graphbuilder_domain::label::format_relationship_type;
///
/// assert_eq!(format_relationship_type("has award"), "HAS_AWARD");
/// ```
pub fn format_relationship_type(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| word.to_uppercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Camel-case a property key: first word lower-cased, later words capitalized,
/// no separators.
///
/// ```
/// use graphbuilder_domain::label::format_property_key;
///
/// assert_eq!(format_property_key("founded year"), "foundedYear");
/// assert_eq!(format_property_key("foundedYear"), "foundedYear");
/// assert_eq!(format_property_key("FOUNDED"), "founded");
/// ```
pub fn format_property_key(raw: &str) -> String {
    let words: Vec<&str> = raw.split_whitespace().collect();
    match words.as_slice() {
        [] => String::new(),
        // A single word may already be camel-cased; only its head is lowered.
        // All-caps words have no camel humps to keep.
        [single] if !single.chars().any(char::is_lowercase) => single.to_lowercase(),
        [single] => lower_first(single),
        [first, rest @ ..] => {
            let mut key = first.to_lowercase();
            for word in rest {
                key.push_str(&capitalize(word));
            }
            key
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

fn lower_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
