//! Compensation report CSV ingestion with department / job title filtering.

use crate::author_file::AuthorEntry;
use crate::error::{OpenAlexError, Result};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::io::{BufRead, Write};
use std::path::Path;
use tracing::info;

pub const LAST_NAME: &str = "Last Name";
pub const FIRST_INITIAL: &str = "First Initial";
pub const DEPARTMENT: &str = "Department";
pub const JOB_TITLE: &str = "Job Title";
pub const UNIT_NAME: &str = "Unit Name";

const REQUIRED_COLUMNS: [&str; 4] = [DEPARTMENT, FIRST_INITIAL, JOB_TITLE, LAST_NAME];

/// A report row keyed by canonical column name
pub type ReportRow = HashMap<String, String>;

fn canonical_header(header: &str) -> String {
    let trimmed = header.trim().trim_start_matches('\u{feff}').trim();
    match trimmed.to_lowercase().as_str() {
        "lastname" | "last name" => LAST_NAME.to_string(),
        "firstinitial" | "first initial" => FIRST_INITIAL.to_string(),
        "jobtitle" | "job title" => JOB_TITLE.to_string(),
        "department" => DEPARTMENT.to_string(),
        "unitname" | "unit name" | "college" => UNIT_NAME.to_string(),
        _ => trimmed.to_string(),
    }
}

fn column<'a>(row: &'a ReportRow, name: &str) -> &'a str {
    row.get(name).map(|v| v.trim()).unwrap_or("")
}

/// Parse a report, normalising header names
pub fn parse_comp_report(path: &Path) -> Result<Vec<ReportRow>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;

    let headers: Vec<String> = reader.headers()?.iter().map(canonical_header).collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(OpenAlexError::Validation(format!(
            "CSV file '{}' is empty",
            path.display()
        )));
    }

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|required| !headers.iter().any(|h| h == required))
        .collect();
    if !missing.is_empty() {
        return Err(OpenAlexError::Validation(format!(
            "CSV file missing required columns: {}",
            missing.join(", ")
        )));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: ReportRow = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.clone(), v.to_string()))
            .collect();
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(OpenAlexError::Validation(format!(
            "CSV file '{}' contains no data rows",
            path.display()
        )));
    }
    Ok(rows)
}

/// Sorted distinct non-empty values of `name`
pub fn unique_values(rows: &[ReportRow], name: &str) -> Vec<String> {
    rows.iter()
        .map(|row| column(row, name))
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Case-insensitive substring filters; both must match when both are given
pub fn filter_rows(rows: &[ReportRow], department: Option<&str>, job_title: Option<&str>) -> Vec<ReportRow> {
    let matches = |row: &ReportRow, name: &str, needle: Option<&str>| match needle.filter(|n| !n.is_empty()) {
        Some(needle) => column(row, name).to_lowercase().contains(&needle.to_lowercase()),
        None => true,
    };

    rows.iter()
        .filter(|row| matches(row, DEPARTMENT, department) && matches(row, JOB_TITLE, job_title))
        .cloned()
        .collect()
}

/// Numbered prompt; `None` when the user just presses Enter
pub fn interactive_select<R: BufRead, W: Write>(
    values: &[String],
    label: &str,
    input: &mut R,
    output: &mut W,
) -> Result<Option<String>> {
    writeln!(output, "\nAvailable {}s:", label)?;
    for (i, value) in values.iter().enumerate() {
        writeln!(output, "  {}. {}", i + 1, value)?;
    }

    loop {
        write!(output, "\nSelect a {} (number), or press Enter to skip: ", label)?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let choice = line.trim();
        if choice.is_empty() {
            return Ok(None);
        }

        match choice.parse::<usize>() {
            Ok(idx) if (1..=values.len()).contains(&idx) => return Ok(Some(values[idx - 1].clone())),
            Ok(_) => writeln!(output, "Please enter a number between 1 and {}.", values.len())?,
            Err(_) => writeln!(output, "Please enter a valid number.")?,
        }
    }
}

/// Rows to author entries, one per (last name, initial, department)
pub fn rows_to_author_entries(rows: &[ReportRow]) -> Vec<AuthorEntry> {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for row in rows {
        let last_name = column(row, LAST_NAME);
        let first_initial = column(row, FIRST_INITIAL);
        let department = column(row, DEPARTMENT);
        if last_name.is_empty() || first_initial.is_empty() {
            continue;
        }

        let key = (
            last_name.to_lowercase(),
            first_initial.to_lowercase(),
            department.to_lowercase(),
        );
        if !seen.insert(key) {
            continue;
        }

        entries.push(AuthorEntry::from_initial(
            Some(first_initial),
            last_name,
            Some(department),
            Some(column(row, UNIT_NAME)),
        ));
    }
    entries
}

/// Load a report, filter it (prompting on stdin when no filter is given), and
/// return the surviving authors
pub fn load_and_filter(path: &Path, department: Option<&str>, job_title: Option<&str>) -> Result<Vec<AuthorEntry>> {
    let rows = parse_comp_report(path)?;

    let (department, job_title) = if department.is_none() && job_title.is_none() {
        let stdin = std::io::stdin();
        let mut input = stdin.lock();
        let mut output = std::io::stdout();
        let department = interactive_select(&unique_values(&rows, DEPARTMENT), DEPARTMENT, &mut input, &mut output)?;
        let job_title = interactive_select(&unique_values(&rows, JOB_TITLE), JOB_TITLE, &mut input, &mut output)?;
        (department, job_title)
    } else {
        (department.map(str::to_string), job_title.map(str::to_string))
    };

    let filtered = filter_rows(&rows, department.as_deref(), job_title.as_deref());
    if filtered.is_empty() {
        return Err(OpenAlexError::Validation("No rows match the specified filters".to_string()));
    }

    let entries = rows_to_author_entries(&filtered);
    if entries.is_empty() {
        return Err(OpenAlexError::Validation("No valid author entries after filtering".to_string()));
    }

    info!(authors = entries.len(), rows = filtered.len(), "Filtered compensation report");
    Ok(entries)
}
