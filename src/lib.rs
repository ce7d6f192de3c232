//! # openalex-works
//!
//! Query the OpenAlex works API and export selected fields as JSON.
//!
//! ## Modules
//!
//! - [`client`] - Paginated, batched works retrieval
//! - [`query`] - Search criteria and request parameters
//! - [`http`] - GET executor with retry, backoff and `Retry-After` handling
//! - [`resolver`] - Institution and author name lookups
//! - [`ids`] - Author identifier normalisation
//! - [`transform`] - Raw work records to output records
//! - [`fields`] - Output field catalogue
//! - [`author_file`], [`comp_report`] - Author list inputs
//! - [`name_resolver`] - Abbreviated name expansion via web search
//! - [`output`] - JSON export
//! - [`config`] - Persisted user settings
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use openalex_works::{ClientOptions, OpenAlexClient, SearchCriteria};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = OpenAlexClient::new(ClientOptions::default())?;
//!     let criteria = SearchCriteria {
//!         search: Some("climate change".to_string()),
//!         ..Default::default()
//!     };
//!     let works = client.fetch_all(&criteria).await?;
//!     println!("Found {} works", works.len());
//!     Ok(())
//! }
//! ```

pub mod author_file;
pub mod client;
pub mod comp_report;
pub mod config;
pub mod error;
pub mod fields;
pub mod http;
pub mod ids;
pub mod name_resolver;
pub mod output;
pub mod query;
pub mod resolver;
pub mod transform;

pub use client::{ClientOptions, OpenAlexClient};
pub use error::{OpenAlexError, Result};
pub use query::{SearchCriteria, SortOrder};
