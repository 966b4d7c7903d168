//! Naming helpers consulted by both the code emitter and the differ (spec §9
//! design note: "Name pluralisation must match the emitter and the differ;
//! keep it as one function consulted by both.") No crate in the dependency
//! stack provides English pluralisation, so this is hand-written rather than
//! reached for via a crate the way case-conversion uses `heck` elsewhere in
//! the workspace — see DESIGN.md.

/// Convert `PascalCase` / `camelCase` / `kebab-case` identifiers to
/// `snake_case`, used for default column/table names.
pub fn to_snake_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 4);
    let mut prev_lower_or_digit = false;
    for (i, ch) in input.char_indices() {
        if ch == '-' || ch == ' ' {
            out.push('_');
            prev_lower_or_digit = false;
            continue;
        }
        if ch.is_uppercase() {
            if i > 0 && (prev_lower_or_digit || out.ends_with(|c: char| c.is_uppercase()) && peek_lowercase_next(input, i)) {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
            prev_lower_or_digit = false;
        } else {
            out.push(ch);
            prev_lower_or_digit = ch.is_lowercase() || ch.is_ascii_digit();
        }
    }
    out
}

fn peek_lowercase_next(input: &str, byte_idx: usize) -> bool {
    input[byte_idx..]
        .chars()
        .nth(1)
        .map(|c| c.is_lowercase())
        .unwrap_or(false)
}

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("tooth", "teeth"),
    ("foot", "feet"),
    ("mouse", "mice"),
    ("goose", "geese"),
];

const UNCOUNTABLE: &[&str] = &["equipment", "information", "series", "species", "data", "fish"];

/// Naive English pluralisation, sufficient for default table/join-table
/// names derived from entity names. Irregulars and a handful of suffix
/// rules; anything else gets a trailing `s`.
pub fn pluralize(word: &str) -> String {
    let lower = word.to_lowercase();
    if UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }
    for (singular, plural) in IRREGULAR {
        if lower == *singular {
            return match_case(word, plural);
        }
    }
    if lower.ends_with('y') && !ends_with_vowel_before_last(&lower) {
        return format!("{}ies", &word[..word.len() - 1]);
    }
    if lower.ends_with('s')
        || lower.ends_with('x')
        || lower.ends_with('z')
        || lower.ends_with("ch")
        || lower.ends_with("sh")
    {
        return format!("{word}es");
    }
    if lower.ends_with('f') {
        return format!("{}ves", &word[..word.len() - 1]);
    }
    if lower.ends_with("fe") {
        return format!("{}ves", &word[..word.len() - 2]);
    }
    format!("{word}s")
}

/// Inverse of [`pluralize`] for the handful of cases the generator needs
/// (deriving a singular FK-style name from a plural entity/table name).
pub fn singularize(word: &str) -> String {
    let lower = word.to_lowercase();
    if UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }
    for (singular, plural) in IRREGULAR {
        if lower == *plural {
            return match_case(word, singular);
        }
    }
    if lower.ends_with("ies") {
        return format!("{}y", &word[..word.len() - 3]);
    }
    if lower.ends_with("ves") {
        return format!("{}f", &word[..word.len() - 3]);
    }
    if lower.ends_with("es")
        && (lower.ends_with("ches") || lower.ends_with("shes") || lower.ends_with("xes") || lower.ends_with("zes") || lower.ends_with("ses"))
    {
        return word[..word.len() - 2].to_string();
    }
    if lower.ends_with('s') && !lower.ends_with("ss") {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

fn ends_with_vowel_before_last(lower: &str) -> bool {
    let bytes = lower.as_bytes();
    if bytes.len() < 2 {
        return false;
    }
    matches!(bytes[bytes.len() - 2], b'a' | b'e' | b'i' | b'o' | b'u')
}

fn match_case(original: &str, replacement: &str) -> String {
    if original.chars().next().map(|c| c.is_uppercase()).unwrap_or(false) {
        let mut chars = replacement.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => replacement.to_string(),
        }
    } else {
        replacement.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_conversion() {
        assert_eq!(to_snake_case("UserProfile"), "user_profile");
        assert_eq!(to_snake_case("createdAt"), "created_at");
        assert_eq!(to_snake_case("id"), "id");
        assert_eq!(to_snake_case("URLPath"), "url_path");
    }

    #[test]
    fn pluralize_regular() {
        assert_eq!(pluralize("user"), "users");
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("wolf"), "wolves");
    }

    #[test]
    fn pluralize_irregular() {
        assert_eq!(pluralize("person"), "people");
        assert_eq!(pluralize("child"), "children");
    }

    #[test]
    fn pluralize_uncountable() {
        assert_eq!(pluralize("data"), "data");
    }

    #[test]
    fn through_table_name_is_deterministic() {
        // canonical m2m table name: `<target_plural>_<source_plural>` sorted lexicographically
        let mut names = vec![pluralize("tag"), pluralize("post")];
        names.sort();
        assert_eq!(names.join("_"), "posts_tags");
    }

    #[test]
    fn singularize_round_trips_regulars() {
        assert_eq!(singularize(&pluralize("user")), "user");
        assert_eq!(singularize(&pluralize("category")), "category");
        assert_eq!(singularize(&pluralize("box")), "box");
    }
}
