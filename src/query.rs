//! Search criteria and query parameter construction for the works endpoint.

use crate::error::{OpenAlexError, Result};
use crate::http::Params;
use crate::ids::to_filter_form;
use clap::ValueEnum;

/// Maximum results per page (OpenAlex limit)
pub const MAX_PER_PAGE: usize = 200;

/// Default results per page
pub const DEFAULT_PER_PAGE: usize = 25;

/// Default cap on returned works
pub const DEFAULT_MAX_RESULTS: usize = 100;

/// Result ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortOrder {
    /// Most recent first
    #[value(name = "year-desc", alias = "year")]
    YearDesc,
    /// Oldest first
    #[value(name = "year-asc")]
    YearAsc,
    /// Most cited first
    #[value(name = "citations-desc", alias = "citations")]
    CitationsDesc,
    /// Least cited first
    #[value(name = "citations-asc")]
    CitationsAsc,
}

impl SortOrder {
    /// Value of the `sort` API parameter
    pub fn as_param(self) -> &'static str {
        match self {
            SortOrder::YearDesc => "publication_year:desc",
            SortOrder::YearAsc => "publication_year:asc",
            SortOrder::CitationsDesc => "cited_by_count:desc",
            SortOrder::CitationsAsc => "cited_by_count:asc",
        }
    }
}

/// What to search for. Built once per invocation.
#[derive(Debug, Clone)]
pub struct SearchCriteria {
    /// Free-text search
    pub search: Option<String>,
    /// Single author id (native id or ORCID)
    pub author_id: Option<String>,
    /// Pre-resolved author ids
    pub author_ids: Vec<String>,
    /// Institution display name
    pub institution: Option<String>,
    /// Restrict to authors whose last known institution is the home institution
    pub restrict_to_home_institution: bool,
    /// Result ordering
    pub sort: Option<SortOrder>,
    /// Cap on returned works (0 = unbounded)
    pub max_results: usize,
    /// Page size, clamped to [`MAX_PER_PAGE`]
    pub per_page: usize,
}

impl Default for SearchCriteria {
    fn default() -> Self {
        Self {
            search: None,
            author_id: None,
            author_ids: Vec::new(),
            institution: None,
            restrict_to_home_institution: false,
            sort: None,
            max_results: DEFAULT_MAX_RESULTS,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl SearchCriteria {
    /// Reject criteria that name nothing to search for.
    pub fn validate(&self) -> Result<()> {
        let has_text = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());

        if has_text(&self.search)
            || has_text(&self.author_id)
            || !self.author_ids.is_empty()
            || has_text(&self.institution)
            || self.restrict_to_home_institution
        {
            Ok(())
        } else {
            Err(OpenAlexError::Validation(
                "At least one search parameter (search, author id, author ids, institution or home-institution restriction) must be provided"
                    .to_string(),
            ))
        }
    }

    /// Page size actually sent to the API
    pub fn effective_per_page(&self) -> usize {
        self.per_page.clamp(1, MAX_PER_PAGE)
    }

    /// Result cap, `None` when unbounded
    pub fn limit(&self) -> Option<usize> {
        (self.max_results > 0).then_some(self.max_results)
    }

    /// Every author id the criteria carry, in filter form, without duplicates.
    pub fn explicit_author_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for id in self.author_id.iter().chain(self.author_ids.iter()) {
            if id.trim().is_empty() {
                continue;
            }
            let id = to_filter_form(id);
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    /// Copy of these criteria scoped to one batch of author ids
    pub fn for_author_batch(&self, batch: &[String]) -> Self {
        Self {
            author_id: None,
            author_ids: batch.to_vec(),
            restrict_to_home_institution: false,
            ..self.clone()
        }
    }
}

/// Build query parameters for one works page.
///
/// # Arguments
///
/// * `criteria` - What to search for
/// * `institution_id` - Resolved id for `criteria.institution`
/// * `page` - Page number (1-indexed)
/// * `email` - Email for the polite pool
///
/// The home-institution restriction adds no clause here; the pagination
/// driver turns it into an author id list before the first works request.
pub fn build_query_params(
    criteria: &SearchCriteria,
    institution_id: Option<&str>,
    page: usize,
    email: Option<&str>,
) -> Result<Params> {
    let mut params: Params = Vec::new();

    if let Some(email) = email.filter(|e| !e.is_empty()) {
        params.push(("mailto".to_string(), email.to_string()));
    }

    if let Some(search) = criteria.search.as_deref().filter(|s| !s.is_empty()) {
        params.push(("search".to_string(), search.to_string()));
    }

    let mut filters = Vec::new();

    let author_ids = criteria.explicit_author_ids();
    if !author_ids.is_empty() {
        filters.push(format!("authorships.author.id:{}", author_ids.join("|")));
    }

    if let Some(name) = criteria.institution.as_deref().filter(|n| !n.trim().is_empty()) {
        match institution_id {
            Some(id) => filters.push(format!("authorships.institutions.id:{}", id)),
            None => return Err(OpenAlexError::InstitutionNotFound(name.to_string())),
        }
    }

    if !filters.is_empty() {
        params.push(("filter".to_string(), filters.join(",")));
    }

    if let Some(sort) = criteria.sort {
        params.push(("sort".to_string(), sort.as_param().to_string()));
    }

    params.push(("per_page".to_string(), criteria.effective_per_page().to_string()));
    params.push(("page".to_string(), page.to_string()));

    Ok(params)
}
