//! Output field catalogue: default and extended fields plus user-facing aliases.

use crate::error::{OpenAlexError, Result};

/// Fields included when the user selects none
pub const CORE_FIELDS: &[&str] = &[
    "id",
    "title",
    "abstract",
    "authors",
    "publication_date",
    "doi",
    "type",
];

/// Additional selectable fields
pub const EXTENDED_FIELDS: &[&str] = &[
    "concepts",
    "keywords",
    "cited_by_count",
    "institutions",
    "sources",
    "publisher",
    "language",
    "is_oa",
    "open_access",
    "primary_location",
    "locations",
    "referenced_works",
    "related_works",
    "year",
    "created_date",
    "updated_date",
    "publication_year",
    "cited_by_api_url",
    "related_works_api_url",
];

/// User-friendly alias -> canonical field
pub const FIELD_ALIASES: &[(&str, &str)] = &[
    ("author", "authors"),
    ("date", "publication_date"),
    ("pub_date", "publication_date"),
    ("citation_count", "cited_by_count"),
    ("citations", "cited_by_count"),
    ("institution", "institutions"),
    ("source", "sources"),
    ("journal", "sources"),
    ("venue", "sources"),
    ("open_access", "is_oa"),
    ("oa", "is_oa"),
];

fn is_known(field: &str) -> bool {
    CORE_FIELDS.contains(&field) || EXTENDED_FIELDS.contains(&field)
}

/// Resolve a user-supplied field name (case-insensitive, aliases allowed).
pub fn resolve_field_name(name: &str) -> Result<String> {
    let lowered = name.trim().to_lowercase();
    let field = FIELD_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lowered)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(lowered);

    if is_known(&field) {
        Ok(field)
    } else {
        Err(OpenAlexError::Validation(format!("Unknown field: {}", field)))
    }
}

/// Split a comma-separated list, dropping blanks
pub fn parse_field_list(list: Option<&str>) -> Vec<String> {
    list.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Fields to output: `include` (or the core defaults) minus `exclude`.
pub fn fields_to_select(include: &[String], exclude: &[String]) -> Result<Vec<String>> {
    let fields: Vec<String> = if include.is_empty() {
        CORE_FIELDS.iter().map(|f| f.to_string()).collect()
    } else {
        include.iter().map(|f| resolve_field_name(f)).collect::<Result<_>>()?
    };

    let excluded = exclude
        .iter()
        .map(|f| resolve_field_name(f))
        .collect::<Result<Vec<_>>>()?;

    Ok(fields.into_iter().filter(|f| !excluded.contains(f)).collect())
}
