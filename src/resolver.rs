//! Institution and author name resolution.
//!
//! Resolution is best-effort: a failed request and an empty result both come
//! back as [`NotFound`], so one bad lookup never aborts a broader search.

use crate::client::{ApiPage, Endpoints};
use crate::error::{Lookup, NotFound};
use crate::http::{HttpExecutor, Params};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Institution whose id is cached for the lifetime of the resolver
pub const DEFAULT_HOME_INSTITUTION: &str = "Colorado State University";

/// Looks up canonical OpenAlex ids for free-text names.
#[derive(Debug)]
pub struct Resolver {
    http: HttpExecutor,
    endpoints: Endpoints,
    email: Option<String>,
    home_institution: String,
    home_institution_id: OnceCell<String>,
}

impl Resolver {
    /// Create a new Resolver
    pub fn new(
        http: HttpExecutor,
        endpoints: Endpoints,
        email: Option<String>,
        home_institution: impl Into<String>,
    ) -> Self {
        Self {
            http,
            endpoints,
            email,
            home_institution: home_institution.into(),
            home_institution_id: OnceCell::new(),
        }
    }

    /// Display name of the home institution
    pub fn home_institution(&self) -> &str {
        &self.home_institution
    }

    /// Resolve an institution display name to its OpenAlex id
    pub async fn resolve_institution(&self, name: &str) -> Lookup {
        let filter = format!("display_name.search:{}", search_term(name));
        self.first_id(&self.endpoints.institutions, filter, name).await
    }

    /// Resolve an author display name to its OpenAlex id.
    ///
    /// With `institution_id`, the lookup is first scoped to authors last seen
    /// at that institution; when that finds nothing it is repeated unscoped.
    pub async fn resolve_author(&self, name: &str, institution_id: Option<&str>) -> Lookup {
        let base = format!("display_name.search:{}", search_term(name));

        if let Some(inst) = institution_id {
            let scoped = format!("{},last_known_institutions.id:{}", base, inst);
            match self.first_id(&self.endpoints.authors, scoped, name).await {
                Ok(id) => return Ok(id),
                Err(_) => {
                    debug!(name, institution = inst, "Scoped author lookup empty, retrying unscoped");
                }
            }
        }

        self.first_id(&self.endpoints.authors, base, name).await
    }

    /// Id of the home institution, looked up on first use and reused afterwards.
    ///
    /// Only a successful lookup is cached; a miss is retried on the next call.
    pub async fn home_institution_id(&self) -> Lookup {
        self.home_institution_id
            .get_or_try_init(|| async {
                let id = self.resolve_institution(&self.home_institution).await?;
                info!(institution = %self.home_institution, id = %id, "Cached home institution id");
                Ok::<String, NotFound>(id)
            })
            .await
            .cloned()
    }

    async fn first_id(&self, url: &str, filter: String, name: &str) -> Lookup {
        let mut params: Params = vec![
            ("filter".to_string(), filter),
            ("per_page".to_string(), "1".to_string()),
        ];
        if let Some(email) = self.email.as_deref().filter(|e| !e.is_empty()) {
            params.push(("mailto".to_string(), email.to_string()));
        }

        let body = match self.http.execute(url, &params).await {
            Ok(body) => body,
            Err(e) => {
                warn!(name, error = %e, "Lookup request failed");
                return Err(NotFound(name.to_string()));
            }
        };

        serde_json::from_value::<ApiPage>(body)
            .ok()
            .and_then(|page| page.results.into_iter().next())
            .and_then(|first| first.get("id").and_then(|v| v.as_str()).map(str::to_string))
            .ok_or_else(|| NotFound(name.to_string()))
    }
}

/// Commas separate filter clauses, so they cannot appear inside a search term.
fn search_term(name: &str) -> String {
    name.replace(',', " ").split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_term_strips_commas() {
        assert_eq!(search_term("Smith, John"), "Smith John");
        assert_eq!(search_term("  MIT "), "MIT");
    }
}
