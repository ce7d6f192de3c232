//! OpenAlex works client: pagination, author batching and the
//! home-institution pre-pass.
//!
//! Requests are issued strictly one after another. The only waits are the
//! polite inter-page delay and retry backoff, both routed through
//! [`Pacing`](crate::http::Pacing).

use crate::error::{OpenAlexError, Result};
use crate::http::{HttpExecutor, Pacing, Params, DEFAULT_MAX_RETRIES};
use crate::ids::to_filter_form;
use crate::query::{build_query_params, SearchCriteria, MAX_PER_PAGE};
use crate::resolver::{Resolver, DEFAULT_HOME_INSTITUTION};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// OpenAlex API base URL
pub const OPENALEX_API_BASE: &str = "https://api.openalex.org";

/// Author ids per works filter; longer lists are split into batches
pub const MAX_AUTHORS_PER_FILTER: usize = 25;

/// Cap on authors collected by the home-institution pre-pass
pub const MAX_HOME_INSTITUTION_AUTHORS: usize = 5000;

/// Endpoint URLs derived from one base URL
#[derive(Debug, Clone)]
pub struct Endpoints {
    /// `/works` list endpoint
    pub works: String,
    /// `/institutions` list endpoint
    pub institutions: String,
    /// `/authors` list endpoint
    pub authors: String,
}

impl Endpoints {
    /// Endpoints under `base_url`; a trailing slash is ignored
    pub fn new(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            works: format!("{}/works", base),
            institutions: format!("{}/institutions", base),
            authors: format!("{}/authors", base),
        }
    }
}

/// `{results: [...], meta: {count, ...}}` envelope shared by all list endpoints
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiPage {
    #[serde(default)]
    pub results: Vec<Value>,
    #[serde(default)]
    pub meta: ApiMeta,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiMeta {
    #[serde(default)]
    pub count: Option<u64>,
}

/// Client construction options
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// API base URL (overridden by tests with a mock server)
    pub base_url: String,
    /// Email for polite pool access
    pub email: Option<String>,
    /// Retries after the first attempt of each request
    pub max_retries: u32,
    /// Sleep policy for page delays and backoff
    pub pacing: Pacing,
    /// Institution used by the home-institution restriction
    pub home_institution: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: OPENALEX_API_BASE.to_string(),
            email: None,
            max_retries: DEFAULT_MAX_RETRIES,
            pacing: Pacing::default(),
            home_institution: DEFAULT_HOME_INSTITUTION.to_string(),
        }
    }
}

/// Ordered, id-deduplicated collection of works with an optional cap.
#[derive(Debug)]
struct Accumulator {
    works: Vec<Value>,
    seen: HashSet<String>,
    limit: Option<usize>,
}

impl Accumulator {
    fn new(limit: Option<usize>) -> Self {
        Self {
            works: Vec::new(),
            seen: HashSet::new(),
            limit,
        }
    }

    /// Add a work unless its id was already collected. Works without an id
    /// are always kept.
    fn push(&mut self, work: Value) -> bool {
        if let Some(id) = work.get("id").and_then(Value::as_str) {
            if !self.seen.insert(id.to_string()) {
                return false;
            }
        }
        self.works.push(work);
        true
    }

    fn is_full(&self) -> bool {
        self.limit.is_some_and(|limit| self.works.len() >= limit)
    }

    fn len(&self) -> usize {
        self.works.len()
    }

    fn into_works(self) -> Vec<Value> {
        self.works
    }
}

/// OpenAlex API client
#[derive(Debug)]
pub struct OpenAlexClient {
    http: HttpExecutor,
    endpoints: Endpoints,
    email: Option<String>,
    resolver: Resolver,
}

impl OpenAlexClient {
    /// Create a new OpenAlexClient
    pub fn new(options: ClientOptions) -> Result<Self> {
        let user_agent = match options.email.as_deref() {
            Some(email) if !email.is_empty() => format!("openalex-works/0.1 (mailto:{})", email),
            _ => "openalex-works/0.1".to_string(),
        };
        let http = HttpExecutor::new(&user_agent, options.max_retries, options.pacing)?;
        let endpoints = Endpoints::new(&options.base_url);
        let resolver = Resolver::new(
            http.clone(),
            endpoints.clone(),
            options.email.clone(),
            options.home_institution,
        );

        Ok(Self {
            http,
            endpoints,
            email: options.email,
            resolver,
        })
    }

    /// Name/institution resolver sharing this client's executor
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Fetch every work matching `criteria`, up to `criteria.max_results`.
    ///
    /// Criteria are validated and the institution filter resolved before any
    /// works request is made. Author id sets larger than
    /// [`MAX_AUTHORS_PER_FILTER`] are fetched batch by batch; works seen in an
    /// earlier batch are dropped and the first occurrence keeps its place.
    pub async fn fetch_all(&self, criteria: &SearchCriteria) -> Result<Vec<Value>> {
        criteria.validate()?;

        let mut author_ids = criteria.explicit_author_ids();

        if criteria.restrict_to_home_institution {
            info!(institution = %self.resolver.home_institution(), "Collecting home institution authors");
            let home_ids = self.home_institution_author_ids().await;
            if home_ids.is_empty() {
                warn!(
                    institution = %self.resolver.home_institution(),
                    "No authors found with this last known institution"
                );
                return Ok(Vec::new());
            }
            info!(authors = home_ids.len(), "Using home institution authors to filter works");

            if author_ids.is_empty() {
                author_ids = home_ids;
            } else {
                let home: HashSet<String> = home_ids.iter().map(|id| to_filter_form(id)).collect();
                author_ids.retain(|id| home.contains(id));
                if author_ids.is_empty() {
                    warn!("Specified authors are not home institution authors");
                    return Ok(Vec::new());
                }
            }
        }

        let institution_id = match criteria.institution.as_deref().filter(|n| !n.trim().is_empty()) {
            Some(name) => Some(
                self.resolver
                    .resolve_institution(name)
                    .await
                    .map_err(|_| OpenAlexError::InstitutionNotFound(name.to_string()))?,
            ),
            None => None,
        };

        let mut acc = Accumulator::new(criteria.limit());

        if author_ids.len() > MAX_AUTHORS_PER_FILTER {
            let batches = author_ids.len().div_ceil(MAX_AUTHORS_PER_FILTER);
            info!(authors = author_ids.len(), batches, "Batching author ids");

            for (idx, chunk) in author_ids.chunks(MAX_AUTHORS_PER_FILTER).enumerate() {
                if acc.is_full() {
                    break;
                }
                info!(batch = idx + 1, total_batches = batches, authors = chunk.len(), "Processing batch");
                let batch = criteria.for_author_batch(chunk);
                self.paginate(&batch, institution_id.as_deref(), &mut acc).await?;
            }
        } else {
            let scoped = criteria.for_author_batch(&author_ids);
            self.paginate(&scoped, institution_id.as_deref(), &mut acc).await?;
        }

        info!(total = acc.len(), "OpenAlex query complete");
        Ok(acc.into_works())
    }

    /// Page through one works query until it is exhausted or `acc` is full.
    async fn paginate(
        &self,
        criteria: &SearchCriteria,
        institution_id: Option<&str>,
        acc: &mut Accumulator,
    ) -> Result<()> {
        let per_page = criteria.effective_per_page();
        let mut page = 1;
        let mut fetched: u64 = 0;

        loop {
            let params = build_query_params(criteria, institution_id, page, self.email.as_deref())?;
            let body = self.http.execute(&self.endpoints.works, &params).await?;
            let ApiPage { results, meta } = serde_json::from_value(body)?;

            let returned = results.len();
            if returned == 0 {
                debug!(page, "Empty page, stopping");
                break;
            }
            fetched += returned as u64;

            for work in results {
                if acc.is_full() {
                    break;
                }
                acc.push(work);
            }
            debug!(page, returned, collected = acc.len(), "Fetched works page");

            if acc.is_full() || returned < per_page {
                break;
            }
            if meta.count.is_some_and(|count| count > 0 && fetched >= count) {
                break;
            }

            page += 1;
            self.http.pacing().between_pages().await;
        }

        Ok(())
    }

    async fn home_institution_author_ids(&self) -> Vec<String> {
        match self.resolver.home_institution_id().await {
            Ok(id) => self.institution_author_ids(&id, MAX_HOME_INSTITUTION_AUTHORS).await,
            Err(e) => {
                warn!(error = %e, "Home institution lookup failed");
                Vec::new()
            }
        }
    }

    /// Ids of authors whose last known institution is `institution_id`, at most `cap`.
    ///
    /// Best-effort: a failed page ends the scan with whatever was collected.
    pub async fn institution_author_ids(&self, institution_id: &str, cap: usize) -> Vec<String> {
        let mut ids = Vec::new();
        let mut page = 1;

        while ids.len() < cap {
            let mut params: Params = vec![
                ("filter".to_string(), format!("last_known_institutions.id:{}", institution_id)),
                ("per_page".to_string(), MAX_PER_PAGE.to_string()),
                ("page".to_string(), page.to_string()),
                ("select".to_string(), "id".to_string()),
            ];
            if let Some(email) = self.email.as_deref().filter(|e| !e.is_empty()) {
                params.push(("mailto".to_string(), email.to_string()));
            }

            let page_body = match self.http.execute(&self.endpoints.authors, &params).await {
                Ok(body) => serde_json::from_value::<ApiPage>(body),
                Err(e) => {
                    warn!(page, error = %e, "Error fetching institution authors");
                    break;
                }
            };
            let ApiPage { results, meta } = match page_body {
                Ok(p) => p,
                Err(e) => {
                    warn!(page, error = %e, "Malformed institution authors page");
                    break;
                }
            };
            if results.is_empty() {
                break;
            }

            ids.extend(
                results
                    .iter()
                    .filter_map(|author| author.get("id").and_then(Value::as_str))
                    .map(str::to_string),
            );
            debug!(page, collected = ids.len(), "Fetched institution authors page");

            let count = meta.count.unwrap_or(0);
            if results.len() < MAX_PER_PAGE || ids.len() as u64 >= count || ids.len() >= cap {
                break;
            }

            page += 1;
            self.http.pacing().between_pages().await;
        }

        ids.truncate(cap);
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoints_trim_slash() {
        let endpoints = Endpoints::new("http://localhost:9000/");
        assert_eq!(endpoints.works, "http://localhost:9000/works");
        assert_eq!(endpoints.institutions, "http://localhost:9000/institutions");
        assert_eq!(endpoints.authors, "http://localhost:9000/authors");
    }

    #[test]
    fn test_accumulator_dedup_keeps_first() {
        let mut acc = Accumulator::new(None);
        assert!(acc.push(json!({"id": "W1", "batch": 1})));
        assert!(acc.push(json!({"id": "W2", "batch": 1})));
        assert!(!acc.push(json!({"id": "W1", "batch": 2})));
        assert!(acc.push(json!({"id": "W3", "batch": 2})));

        let works = acc.into_works();
        let ids: Vec<&str> = works.iter().filter_map(|w| w["id"].as_str()).collect();
        assert_eq!(ids, vec!["W1", "W2", "W3"]);
        assert_eq!(works[0]["batch"], 1);
    }

    #[test]
    fn test_accumulator_keeps_works_without_id() {
        let mut acc = Accumulator::new(None);
        assert!(acc.push(json!({"title": "a"})));
        assert!(acc.push(json!({"title": "a"})));
        assert_eq!(acc.len(), 2);
    }

    #[test]
    fn test_accumulator_limit() {
        let mut acc = Accumulator::new(Some(2));
        acc.push(json!({"id": "W1"}));
        assert!(!acc.is_full());
        acc.push(json!({"id": "W2"}));
        assert!(acc.is_full());

        let unbounded = Accumulator::new(None);
        assert!(!unbounded.is_full());
    }

    #[test]
    fn test_api_page_tolerates_missing_fields() {
        let page: ApiPage = serde_json::from_value(json!({})).unwrap();
        assert!(page.results.is_empty());
        assert_eq!(page.meta.count, None);

        let page: ApiPage =
            serde_json::from_value(json!({"results": [{"id": "W1"}], "meta": {"count": 7, "page": 1}}))
                .unwrap();
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.meta.count, Some(7));
    }
}
