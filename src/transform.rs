//! Work transformer.
//!
//! Reshapes raw OpenAlex work objects into the simplified output records.
//! Nested fields (authors, institutions, concepts, ...) cannot be selected
//! server-side, so the full record is fetched and shaped here.

use crate::ids::to_filter_form;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// One author of a work
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorSummary {
    pub id: String,
    pub name: String,
    /// Upstream value as given (`null` stays `null`), `""` when absent
    pub orcid: Value,
    /// Present whenever the authorship carries `author_position`, even as `null`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Value>,
}

/// One concept tag of a work
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConceptSummary {
    pub id: String,
    pub name: String,
    pub score: f64,
}

/// Primary-location source (journal, repository, ...)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSummary {
    pub id: String,
    pub name: String,
    /// Linking ISSN when present, else the plain ISSN value
    pub issn: Value,
    #[serde(rename = "type")]
    pub source_type: String,
}

fn str_field(obj: &Value, key: &str) -> String {
    obj.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn list<'a>(work: &'a Value, key: &str) -> &'a [Value] {
    work.get(key).and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[])
}

fn summarize_author(authorship: &Value, author: &Value) -> AuthorSummary {
    AuthorSummary {
        id: str_field(author, "id"),
        name: str_field(author, "display_name"),
        orcid: author
            .get("orcid")
            .cloned()
            .unwrap_or_else(|| Value::String(String::new())),
        position: authorship.get("author_position").cloned(),
    }
}

/// Extract at most one author.
///
/// With searched ids, the first authorship whose author id is among them;
/// otherwise the first listed author. Ids are compared in canonical form.
pub fn extract_authors(authorships: &[Value], searched_author_ids: Option<&[String]>) -> Vec<AuthorSummary> {
    let searched: Option<HashSet<String>> = searched_author_ids
        .filter(|ids| !ids.is_empty())
        .map(|ids| ids.iter().map(|id| to_filter_form(id)).collect());

    for authorship in authorships {
        let author = match authorship.get("author") {
            Some(a) if a.as_object().is_some_and(|o| !o.is_empty()) => a,
            _ => continue,
        };

        match &searched {
            Some(wanted) => {
                let id = str_field(author, "id");
                if !id.is_empty() && wanted.contains(&to_filter_form(&id)) {
                    return vec![summarize_author(authorship, author)];
                }
            }
            None => return vec![summarize_author(authorship, author)],
        }
    }

    Vec::new()
}

/// Institution display names across all authorships, first-seen order, no duplicates.
pub fn extract_institutions(authorships: &[Value]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();

    for authorship in authorships {
        for institution in list(authorship, "institutions") {
            let name = str_field(institution, "display_name");
            if !name.is_empty() && seen.insert(name.clone()) {
                names.push(name);
            }
        }
    }

    names
}

pub fn extract_concepts(concepts: &[Value]) -> Vec<ConceptSummary> {
    concepts
        .iter()
        .map(|c| ConceptSummary {
            id: str_field(c, "id"),
            name: str_field(c, "display_name"),
            score: c.get("score").and_then(Value::as_f64).unwrap_or(0.0),
        })
        .collect()
}

pub fn extract_keywords(keywords: &[Value]) -> Vec<String> {
    keywords
        .iter()
        .map(|k| str_field(k, "display_name"))
        .filter(|name| !name.is_empty())
        .collect()
}

/// Source of the primary location, `None` when location or source is absent.
pub fn extract_source(primary_location: Option<&Value>) -> Option<SourceSummary> {
    let source = primary_location?
        .get("source")
        .filter(|s| s.as_object().is_some_and(|o| !o.is_empty()))?;

    let issn = match source.get("issn_l") {
        Some(Value::String(s)) if !s.is_empty() => Value::String(s.clone()),
        _ => source
            .get("issn")
            .filter(|v| !v.is_null())
            .cloned()
            .unwrap_or_else(|| Value::String(String::new())),
    };

    Some(SourceSummary {
        id: str_field(source, "id"),
        name: str_field(source, "display_name"),
        issn,
        source_type: str_field(source, "type"),
    })
}

/// Reconstruct abstract text from an inverted index.
///
/// OpenAlex provides abstracts as `{word: [positions]}` for legal reasons.
/// Every (position, word) pair is emitted, so a word listed at several
/// positions appears once per position.
pub fn reconstruct_abstract(inverted_index: &Value) -> String {
    let Some(obj) = inverted_index.as_object() else {
        return String::new();
    };

    let mut words: Vec<(u64, &str)> = Vec::new();
    for (word, positions) in obj {
        if let Some(pos_array) = positions.as_array() {
            for pos in pos_array {
                if let Some(p) = pos.as_u64() {
                    words.push((p, word.as_str()));
                }
            }
        }
    }

    words.sort_by_key(|(pos, _)| *pos);
    words.iter().map(|(_, w)| *w).collect::<Vec<_>>().join(" ")
}

/// Literal abstract when present, else the reconstructed inverted index.
pub fn extract_abstract(work: &Value) -> String {
    match work.get("abstract").and_then(Value::as_str) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => work
            .get("abstract_inverted_index")
            .map(reconstruct_abstract)
            .unwrap_or_default(),
    }
}

/// Transform one raw work into the output record.
///
/// # Arguments
///
/// * `work` - Raw work object from the API
/// * `selected_fields` - Resolved field names, in output order
/// * `searched_author_ids` - Author ids the query targeted, if any
///
/// Fields the work does not carry map to `null`.
pub fn format_work(
    work: &Value,
    selected_fields: &[String],
    searched_author_ids: Option<&[String]>,
) -> Map<String, Value> {
    let authorships = list(work, "authorships");
    let mut formatted = Map::new();

    for field in selected_fields {
        let value = match field.as_str() {
            "authors" => {
                serde_json::to_value(extract_authors(authorships, searched_author_ids)).unwrap_or_default()
            }
            "institutions" => serde_json::to_value(extract_institutions(authorships)).unwrap_or_default(),
            "concepts" => serde_json::to_value(extract_concepts(list(work, "concepts"))).unwrap_or_default(),
            "keywords" => serde_json::to_value(extract_keywords(list(work, "keywords"))).unwrap_or_default(),
            "sources" => extract_source(work.get("primary_location"))
                .and_then(|s| serde_json::to_value(s).ok())
                .unwrap_or(Value::Null),
            "publisher" => extract_source(work.get("primary_location"))
                .map(|s| Value::String(s.name))
                .unwrap_or(Value::Null),
            "abstract" => Value::String(extract_abstract(work)),
            other => work.get(other).cloned().unwrap_or(Value::Null),
        };
        formatted.insert(field.clone(), value);
    }

    formatted
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn authorship(id: &str, name: &str, position: &str) -> Value {
        json!({
            "author": {"id": id, "display_name": name, "orcid": null},
            "author_position": position,
            "institutions": []
        })
    }

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_reconstruct_simple() {
        assert_eq!(reconstruct_abstract(&json!({"Hello": [0], "world": [1]})), "Hello world");
    }

    #[test]
    fn test_reconstruct_repeated_word() {
        let index = json!({"the": [0, 2], "cat": [1], "dog": [3]});
        assert_eq!(reconstruct_abstract(&index), "the cat the dog");
    }

    #[test]
    fn test_reconstruct_empty_or_null() {
        assert_eq!(reconstruct_abstract(&json!({})), "");
        assert_eq!(reconstruct_abstract(&Value::Null), "");
    }

    #[test]
    fn test_abstract_prefers_literal() {
        let work = json!({"abstract": "Plain text", "abstract_inverted_index": {"Other": [0]}});
        assert_eq!(extract_abstract(&work), "Plain text");

        let work = json!({"abstract": "", "abstract_inverted_index": {"Other": [0]}});
        assert_eq!(extract_abstract(&work), "Other");

        assert_eq!(extract_abstract(&json!({"abstract_inverted_index": null})), "");
    }

    #[test]
    fn test_first_author_only() {
        let authorships = vec![
            authorship("https://openalex.org/A1", "Alice", "first"),
            authorship("https://openalex.org/A2", "Bob", "middle"),
        ];
        let authors = extract_authors(&authorships, None);
        assert_eq!(authors.len(), 1);
        assert_eq!(authors[0].name, "Alice");
        assert_eq!(authors[0].position, Some(json!("first")));
        assert_eq!(authors[0].orcid, Value::Null);
    }

    #[test]
    fn test_searched_author_regardless_of_position() {
        let authorships = vec![
            authorship("https://openalex.org/A1", "Alice", "first"),
            authorship("https://openalex.org/A2", "Bob", "middle"),
        ];
        let searched = vec!["A2".to_string()];
        let authors = extract_authors(&authorships, Some(searched.as_slice()));
        assert_eq!(authors.len(), 1);
        assert_eq!(authors[0].id, "https://openalex.org/A2");
        assert_eq!(authors[0].name, "Bob");
    }

    #[test]
    fn test_searched_author_absent() {
        let authorships = vec![authorship("https://openalex.org/A1", "Alice", "first")];
        let searched = vec!["https://openalex.org/A999".to_string()];
        assert!(extract_authors(&authorships, Some(searched.as_slice())).is_empty());
        assert!(extract_authors(&[], None).is_empty());
    }

    #[test]
    fn test_empty_searched_list_means_first_author() {
        let authorships = vec![authorship("https://openalex.org/A1", "Alice", "first")];
        let authors = extract_authors(&authorships, Some(&[]));
        assert_eq!(authors[0].name, "Alice");
    }

    #[test]
    fn test_position_omitted_when_missing() {
        let authorships = vec![json!({"author": {"id": "A1", "display_name": "Alice"}})];
        let value = serde_json::to_value(extract_authors(&authorships, None)).unwrap();
        assert!(value[0].get("position").is_none());
        assert_eq!(value[0]["orcid"], "");
    }

    #[test]
    fn test_null_orcid_and_position_kept_as_null() {
        let authorships = vec![json!({
            "author": {"id": "https://openalex.org/A1", "display_name": "X", "orcid": null},
            "author_position": null
        })];
        let work = json!({"authorships": authorships});
        let out = format_work(&work, &fields(&["authors"]), None);
        assert_eq!(
            out["authors"],
            json!([{"id": "https://openalex.org/A1", "name": "X", "orcid": null, "position": null}])
        );
    }

    #[test]
    fn test_institutions_dedup_first_seen() {
        let authorships = vec![
            json!({"institutions": [{"display_name": "MIT"}, {"display_name": "Stanford"}]}),
            json!({"institutions": [{"display_name": "MIT"}, {"id": "I1"}, {"display_name": "ETH"}]}),
        ];
        assert_eq!(extract_institutions(&authorships), vec!["MIT", "Stanford", "ETH"]);
    }

    #[test]
    fn test_concepts_and_keywords() {
        let concepts = vec![
            json!({"id": "C1", "display_name": "Biology", "score": 0.9}),
            json!({"id": "C1", "display_name": "Biology"}),
        ];
        let out = extract_concepts(&concepts);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].score, 0.9);
        assert_eq!(out[1].score, 0.0);

        let keywords = vec![json!({"display_name": "soil"}), json!({"display_name": ""}), json!({})];
        assert_eq!(extract_keywords(&keywords), vec!["soil"]);
    }

    #[test]
    fn test_source_issn_preference() {
        let loc = json!({"source": {"id": "S1", "display_name": "Nature", "issn_l": "0028-0836", "issn": ["0028-0836", "1476-4687"], "type": "journal"}});
        let source = extract_source(Some(&loc)).unwrap();
        assert_eq!(source.issn, json!("0028-0836"));
        assert_eq!(source.source_type, "journal");

        let loc = json!({"source": {"id": "S2", "display_name": "Repo", "issn_l": null, "issn": ["1234-5678"]}});
        assert_eq!(extract_source(Some(&loc)).unwrap().issn, json!(["1234-5678"]));

        assert!(extract_source(Some(&json!({"source": null}))).is_none());
        assert!(extract_source(None).is_none());
    }

    #[test]
    fn test_format_work_null_for_missing() {
        let work = json!({"id": "W1", "title": "T", "primary_location": null});
        let out = format_work(&work, &fields(&["id", "title", "doi", "sources", "publisher"]), None);
        assert_eq!(out["id"], "W1");
        assert_eq!(out["title"], "T");
        assert_eq!(out["doi"], Value::Null);
        assert_eq!(out["sources"], Value::Null);
        assert_eq!(out["publisher"], Value::Null);
    }

    #[test]
    fn test_format_work_field_order_and_publisher() {
        let work = json!({
            "id": "W1",
            "primary_location": {"source": {"id": "S1", "display_name": "Nature", "type": "journal"}},
            "abstract_inverted_index": {"Hi": [0]}
        });
        let out = format_work(&work, &fields(&["publisher", "abstract", "id"]), None);
        let keys: Vec<&String> = out.keys().collect();
        assert_eq!(keys, vec!["publisher", "abstract", "id"]);
        assert_eq!(out["publisher"], "Nature");
        assert_eq!(out["abstract"], "Hi");
    }
}
