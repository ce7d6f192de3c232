//! Author identifier normalization.
//!
//! OpenAlex accepts author ids either as native ids (`A1234567890`) or as
//! ORCID URLs. Users hand us bare native ids, bare ORCIDs or ORCID URLs;
//! everything is folded into one comparable form here.

/// Prefix of full OpenAlex entity URLs
pub const OPENALEX_URL_PREFIX: &str = "https://openalex.org/";

/// Prefix of canonical ORCID URLs
pub const ORCID_URL_PREFIX: &str = "https://orcid.org/";

/// True for a native OpenAlex id: one uppercase letter followed by digits.
pub fn is_native_id(id: &str) -> bool {
    let mut chars = id.chars();
    match chars.next() {
        Some(prefix) if prefix.is_ascii_uppercase() => {
            let rest = chars.as_str();
            !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit())
        }
        _ => false,
    }
}

fn is_bare_orcid(id: &str) -> bool {
    let compact: Vec<char> = id.chars().filter(|c| *c != '-').collect();
    compact.len() == 16
        && compact[..15].iter().all(|c| c.is_ascii_digit())
        && (compact[15].is_ascii_digit() || compact[15] == 'X')
}

/// Normalize an author identifier.
///
/// Native ids are returned trimmed, ORCIDs (bare or URL) become
/// `https://orcid.org/<orcid>`, anything else is returned trimmed. Applying
/// the function twice gives the same result as applying it once.
pub fn normalize_author_id(id: &str) -> String {
    let id = id.trim();

    if is_native_id(id) {
        return id.to_string();
    }

    if id.contains("orcid.org") {
        let orcid = id.trim_end_matches('/').rsplit('/').next().unwrap_or(id);
        return format!("{}{}", ORCID_URL_PREFIX, orcid);
    }

    if is_bare_orcid(id) {
        return format!("{}{}", ORCID_URL_PREFIX, id);
    }

    id.to_string()
}

/// Normalize and expand native ids into the URL form used in API filters
/// and in `authorships[].author.id`.
pub fn to_filter_form(id: &str) -> String {
    let normalized = normalize_author_id(id);
    if is_native_id(&normalized) {
        format!("{}{}", OPENALEX_URL_PREFIX, normalized)
    } else {
        normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_id() {
        assert_eq!(normalize_author_id("A1234567890"), "A1234567890");
        assert_eq!(normalize_author_id("  A1234567890  "), "A1234567890");
        assert!(!is_native_id("A"));
        assert!(!is_native_id("a123"));
        assert!(!is_native_id("AB123"));
    }

    #[test]
    fn test_orcid_forms() {
        let expected = "https://orcid.org/0000-0002-1825-0097";
        assert_eq!(normalize_author_id("0000-0002-1825-0097"), expected);
        assert_eq!(normalize_author_id("https://orcid.org/0000-0002-1825-0097"), expected);
        assert_eq!(normalize_author_id("orcid.org/0000-0002-1825-0097"), expected);
        assert_eq!(
            normalize_author_id("0000-0001-5109-370X"),
            "https://orcid.org/0000-0001-5109-370X"
        );
    }

    #[test]
    fn test_passthrough_unknown() {
        assert_eq!(normalize_author_id("something_else"), "something_else");
        assert_eq!(
            normalize_author_id("https://openalex.org/A123"),
            "https://openalex.org/A123"
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for input in [
            "A1234567890",
            " A42 ",
            "0000-0002-1825-0097",
            "https://orcid.org/0000-0002-1825-0097",
            "http://orcid.org/0000-0002-1825-0097/",
            "https://openalex.org/A5023888391",
            "whatever",
        ] {
            let once = normalize_author_id(input);
            assert_eq!(normalize_author_id(&once), once, "input: {}", input);
        }
    }

    #[test]
    fn test_filter_form() {
        assert_eq!(to_filter_form("A123"), "https://openalex.org/A123");
        assert_eq!(to_filter_form("https://openalex.org/A123"), "https://openalex.org/A123");
        assert_eq!(
            to_filter_form("0000-0002-1825-0097"),
            "https://orcid.org/0000-0002-1825-0097"
        );
    }
}
