//! Expands abbreviated author names ("E. Kelly") to full names via Tavily web search.

use crate::error::{OpenAlexError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tavily search endpoint
pub const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";

const MAX_SEARCH_RESULTS: u32 = 5;

/// True when every token except the last is a single letter, optionally
/// followed by a period
pub fn is_abbreviated_name(name: &str) -> bool {
    let parts: Vec<&str> = name.split_whitespace().collect();
    if parts.len() < 2 {
        return false;
    }

    parts[..parts.len() - 1].iter().all(|p| {
        let mut chars = p.trim_end_matches('.').chars();
        matches!((chars.next(), chars.next()), (Some(c), None) if c.is_alphabetic())
    })
}

/// Web domain searched first for a known institution
pub fn institution_domain(institution: Option<&str>) -> Option<&'static str> {
    institution
        .filter(|i| i.to_lowercase().contains("colorado state"))
        .map(|_| "colostate.edu")
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    include_answer: &'a str,
    max_results: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    include_domains: Option<Vec<&'a str>>,
}

/// Search response body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub url: String,
}

/// Tavily API client
#[derive(Debug, Clone)]
pub struct TavilyClient {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl TavilyClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_endpoint(api_key, TAVILY_SEARCH_URL)
    }

    /// Client posting to a custom endpoint
    pub fn with_endpoint(api_key: impl Into<String>, endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| OpenAlexError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            endpoint: endpoint.into(),
        })
    }

    /// Run one search, optionally restricted to `include_domains`
    pub async fn search(&self, query: &str, include_domains: Option<&[&str]>) -> Result<SearchResponse> {
        let request = SearchRequest {
            api_key: &self.api_key,
            query,
            include_answer: "advanced",
            max_results: MAX_SEARCH_RESULTS,
            include_domains: include_domains.map(<[&str]>::to_vec),
        };

        let response = self.client.post(&self.endpoint).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(OpenAlexError::Api(format!("Tavily search returned HTTP {}", status)));
        }
        Ok(response.json::<SearchResponse>().await?)
    }
}

/// Find "First [M.] <last_name>" in a search response.
///
/// The answer is checked first, then results hosted on the institution's
/// domain, then everything else (title before content).
pub fn extract_full_name(response: &SearchResponse, last_name: &str, institution: Option<&str>) -> Option<String> {
    let pattern = format!(r"\b([A-Z][a-z]+(?:\s+[A-Z]\.?\s*)?)\s+{}\b", regex::escape(last_name));
    let re = Regex::new(&pattern).ok()?;

    let find = |text: &str| {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .map(|first| format!("{} {}", first.as_str().trim(), last_name))
    };

    if let Some(name) = response.answer.as_deref().and_then(find) {
        return Some(name);
    }

    let domain = institution_domain(institution);
    let on_domain = |r: &&SearchResult| domain.is_some_and(|d| r.url.contains(d));
    let ordered = response
        .results
        .iter()
        .filter(on_domain)
        .chain(response.results.iter().filter(|r| !on_domain(r)));

    for result in ordered {
        for text in [&result.title, &result.content] {
            if let Some(name) = text.as_deref().and_then(find) {
                return Some(name);
            }
        }
    }
    None
}

/// Where an author works, used to sharpen the search
#[derive(Debug, Clone, Copy, Default)]
pub struct NameContext<'a> {
    pub institution: Option<&'a str>,
    pub department: Option<&'a str>,
    pub college: Option<&'a str>,
}

fn build_search_query(name: &str, context: &NameContext<'_>) -> String {
    let mut parts = vec![name];
    parts.extend(
        [context.college, context.department, context.institution]
            .into_iter()
            .flatten()
            .filter(|p| !p.is_empty()),
    );
    parts.push("professor");
    parts.join(" ")
}

/// Expand an abbreviated name; returns the name and whether it changed.
///
/// Full names pass through untouched. Any failure leaves the name as is.
pub async fn resolve_abbreviated_name(
    name: &str,
    context: &NameContext<'_>,
    client: Option<&TavilyClient>,
) -> (String, bool) {
    if !is_abbreviated_name(name) {
        return (name.to_string(), false);
    }
    let Some(client) = client else {
        warn!("No Tavily API key configured. Set with `config set-tavily-key` or TAVILY_API_KEY.");
        return (name.to_string(), false);
    };
    let Some(last_name) = name.split_whitespace().last() else {
        return (name.to_string(), false);
    };

    let query = build_search_query(name, context);
    let domain = institution_domain(context.institution);
    debug!(%query, ?domain, "Searching for full author name");

    let result = async {
        let restricted = domain.map(|d| vec![d]);
        let response = client.search(&query, restricted.as_deref()).await?;
        let mut full_name = extract_full_name(&response, last_name, context.institution);

        if full_name.is_none() && domain.is_some() {
            let response = client.search(&query, None).await?;
            full_name = extract_full_name(&response, last_name, context.institution);
        }
        Ok::<_, OpenAlexError>(full_name)
    }
    .await;

    match result {
        Ok(Some(full_name)) => {
            info!(from = %name, to = %full_name, "Resolved abbreviated name");
            (full_name, true)
        }
        Ok(None) => (name.to_string(), false),
        Err(e) => {
            warn!(name = %name, error = %e, "Tavily search failed");
            (name.to_string(), false)
        }
    }
}
