//! JSON output document with provenance metadata.

use crate::error::Result;
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Which criteria produced a result set
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct QueryInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comp_report: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csu_only: Option<bool>,
}

#[derive(Debug, Serialize)]
struct Metadata<'a> {
    total: usize,
    timestamp: String,
    query: &'a QueryInfo,
}

#[derive(Debug, Serialize)]
struct OutputDocument<'a> {
    works: &'a [Map<String, Value>],
    metadata: Metadata<'a>,
}

/// UTC timestamp in ISO-8601 with a trailing `Z`
pub fn utc_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Render the output document as pretty JSON
pub fn render_json(works: &[Map<String, Value>], query: &QueryInfo) -> Result<String> {
    let document = OutputDocument {
        works,
        metadata: Metadata {
            total: works.len(),
            timestamp: utc_timestamp(),
            query,
        },
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Write `{works, metadata}` to `path`
pub fn write_json(works: &[Map<String, Value>], path: &Path, query: &QueryInfo) -> Result<()> {
    let rendered = render_json(works, query)?;
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(rendered.as_bytes())?;
    writer.flush()?;
    info!(count = works.len(), path = %path.display(), "Saved works");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::NamedTempFile;

    #[test]
    fn test_timestamp_format() {
        let ts = utc_timestamp();
        assert!(ts.ends_with('Z'));
        assert!(chrono::NaiveDateTime::parse_from_str(ts.trim_end_matches('Z'), "%Y-%m-%dT%H:%M:%S%.f").is_ok());
    }

    #[test]
    fn test_write_and_read_back() -> Result<()> {
        let temp = NamedTempFile::new()?;
        let mut work = Map::new();
        work.insert("title".to_string(), json!("Über Böden"));

        let query = QueryInfo {
            search: Some("soil".to_string()),
            csu_only: Some(true),
            ..Default::default()
        };
        write_json(&[work], temp.path(), &query)?;

        let raw = std::fs::read_to_string(temp.path())?;
        assert!(raw.contains("Über Böden"));
        let doc: Value = serde_json::from_str(&raw)?;
        assert_eq!(doc["metadata"]["total"], 1);
        assert_eq!(doc["metadata"]["query"], json!({"search": "soil", "csu_only": true}));
        assert_eq!(doc["works"][0]["title"], "Über Böden");
        Ok(())
    }
}
