//! Author list files: plain text (one name per line) or TSV with a header row.

use crate::error::{OpenAlexError, Result};
use std::path::Path;

/// One author to look up, with optional departmental context
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorEntry {
    pub name: String,
    pub last_name: Option<String>,
    pub first_initial: Option<String>,
    pub department: Option<String>,
    pub college: Option<String>,
}

impl AuthorEntry {
    /// Entry built from an initial and last name, e.g. `"E. Kelly"`
    pub fn from_initial(
        first_initial: Option<&str>,
        last_name: &str,
        department: Option<&str>,
        college: Option<&str>,
    ) -> Self {
        let non_empty = |s: Option<&str>| s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
        let first_initial = non_empty(first_initial);

        let name = match &first_initial {
            Some(initial) => format!("{}. {}", initial.trim_end_matches('.'), last_name),
            None => last_name.to_string(),
        };

        Self {
            name,
            last_name: Some(last_name.to_string()),
            first_initial,
            department: non_empty(department),
            college: non_empty(college),
        }
    }
}

/// Header columns when `first_line` is a TSV header naming a last-name column
pub fn detect_file_format(first_line: &str) -> Option<Vec<String>> {
    if !first_line.contains('\t') {
        return None;
    }

    let columns: Vec<String> = first_line.split('\t').map(|c| c.trim().to_string()).collect();
    let has_last_name = columns
        .iter()
        .any(|c| c.eq_ignore_ascii_case("lastname") || c.eq_ignore_ascii_case("last_name"));

    has_last_name.then_some(columns)
}

/// Parse one line; `None` for blank lines and TSV rows without a last name
pub fn parse_author_line(line: &str, headers: Option<&[String]>) -> Option<AuthorEntry> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }

    let Some(headers) = headers else {
        return Some(AuthorEntry {
            name: line.trim().to_string(),
            ..Default::default()
        });
    };

    let values: Vec<&str> = line.split('\t').collect();
    let get = |key: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(key))
            .and_then(|idx| values.get(idx))
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    };

    let last_name = get("lastname").or_else(|| get("last_name"))?;
    let first_initial = get("firstinitial")
        .or_else(|| get("first_initial"))
        .or_else(|| get("firstname"))
        .or_else(|| get("first_name"));

    Some(AuthorEntry::from_initial(
        first_initial,
        last_name,
        get("department"),
        get("college"),
    ))
}

/// Load every author entry from `path`
pub fn load_author_file(path: &Path) -> Result<Vec<AuthorEntry>> {
    let content = std::fs::read_to_string(path)?;
    let mut lines = content.lines();

    let first_line = lines.next().ok_or_else(|| {
        OpenAlexError::Validation(format!("Author file '{}' is empty", path.display()))
    })?;

    let entries: Vec<AuthorEntry> = match detect_file_format(first_line) {
        Some(headers) => lines
            .filter_map(|line| parse_author_line(line, Some(headers.as_slice())))
            .collect(),
        None => std::iter::once(first_line)
            .chain(lines)
            .filter_map(|line| parse_author_line(line, None))
            .collect(),
    };

    if entries.is_empty() {
        return Err(OpenAlexError::Validation(format!(
            "Author file '{}' contains no authors",
            path.display()
        )));
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn headers(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_detect_format() {
        assert!(detect_file_format("Eugene Kelly").is_none());
        assert!(detect_file_format("a\tb").is_none());
        assert_eq!(
            detect_file_format("LastName\tFirstInitial\n").unwrap(),
            headers(&["LastName", "FirstInitial"])
        );
    }

    #[test]
    fn test_parse_tsv_row() {
        let h = headers(&["LastName", "FirstInitial", "Department", "College"]);
        let entry = parse_author_line("Kelly\tE.\tSoil Science\tAgriculture", Some(h.as_slice())).unwrap();
        assert_eq!(entry.name, "E. Kelly");
        assert_eq!(entry.last_name.as_deref(), Some("Kelly"));
        assert_eq!(entry.first_initial.as_deref(), Some("E."));
        assert_eq!(entry.department.as_deref(), Some("Soil Science"));
        assert_eq!(entry.college.as_deref(), Some("Agriculture"));
    }

    #[test]
    fn test_parse_tsv_row_without_initial_or_last_name() {
        let h = headers(&["first_name", "last_name"]);
        assert_eq!(parse_author_line("\tKelly", Some(h.as_slice())).unwrap().name, "Kelly");
        assert!(parse_author_line("E\t", Some(h.as_slice())).is_none());
    }

    #[test]
    fn test_plain_text_file() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "Eugene Kelly\n\n  J. Smith  ")?;

        let entries = load_author_file(file.path())?;
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Eugene Kelly", "J. Smith"]);
        Ok(())
    }

    #[test]
    fn test_empty_file_rejected() -> Result<()> {
        let file = NamedTempFile::new()?;
        assert!(load_author_file(file.path()).is_err());
        Ok(())
    }
}
