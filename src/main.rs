//! openalex-works - OpenAlex works query tool
//!
//! Fetches scholarly works from OpenAlex by keyword, author, institution or
//! author list and writes the selected fields to a JSON file.
//!
//! ## Usage
//!
//! ```bash
//! openalex-works search --search "machine learning" --output results.json
//! openalex-works search --author-id A2208157607 --fields title,abstract,authors
//! openalex-works search --author-file authors.tsv --csu-only
//! openalex-works config set-email me@example.edu
//! ```

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use openalex_works::author_file::{load_author_file, AuthorEntry};
use openalex_works::comp_report;
use openalex_works::config::ConfigManager;
use openalex_works::fields::{self, fields_to_select, parse_field_list};
use openalex_works::ids::to_filter_form;
use openalex_works::name_resolver::{is_abbreviated_name, resolve_abbreviated_name, NameContext, TavilyClient};
use openalex_works::output::{write_json, QueryInfo};
use openalex_works::query::{DEFAULT_MAX_RESULTS, DEFAULT_PER_PAGE};
use openalex_works::transform::format_work;
use openalex_works::{ClientOptions, OpenAlexClient, SearchCriteria, SortOrder};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Query the OpenAlex API for scholarly works and export them as JSON
#[derive(Parser)]
#[command(name = "openalex-works")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search OpenAlex works and write them to a JSON file
    Search(SearchArgs),

    /// List available output fields and aliases
    Fields,

    /// Manage saved configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args)]
struct SearchArgs {
    // === Search Parameters ===
    /// Text search query
    #[arg(short, long)]
    search: Option<String>,

    /// Author OpenAlex ID (e.g., A2208157607) or ORCID (e.g., 0000-0002-1825-0097)
    #[arg(short, long)]
    author_id: Option<String>,

    /// Institution name (e.g., "Colorado State University")
    #[arg(short, long)]
    institution: Option<String>,

    /// File of author names, one per line, or TSV with a LastName column
    #[arg(long, conflicts_with = "comp_report")]
    author_file: Option<PathBuf>,

    /// Compensation report CSV to take authors from
    #[arg(long)]
    comp_report: Option<PathBuf>,

    /// Department filter for --comp-report (case-insensitive substring)
    #[arg(long, requires = "comp_report")]
    department: Option<String>,

    /// Job title filter for --comp-report (case-insensitive substring)
    #[arg(long, requires = "comp_report")]
    job_title: Option<String>,

    /// Restrict results to authors whose last known institution is Colorado State University
    #[arg(long)]
    csu_only: bool,

    // === Output Configuration ===
    /// Comma-separated list of fields to include (default: core fields)
    #[arg(short, long)]
    fields: Option<String>,

    /// Comma-separated list of fields to exclude
    #[arg(short, long)]
    exclude_fields: Option<String>,

    /// Output file path
    #[arg(short, long, default_value = "openalex_results.json")]
    output: PathBuf,

    // === Pagination ===
    /// Maximum number of results to fetch (0 = all)
    #[arg(short, long, default_value_t = DEFAULT_MAX_RESULTS)]
    max_results: usize,

    /// Results per page (max 200)
    #[arg(long, default_value_t = DEFAULT_PER_PAGE)]
    per_page: usize,

    /// Sort order
    #[arg(long, value_enum)]
    sort: Option<SortOrder>,

    // === API Configuration ===
    /// Email address for the polite pool (overrides saved config)
    #[arg(long)]
    email: Option<String>,

    /// Tavily API key for name resolution (overrides env and saved config)
    #[arg(long)]
    tavily_api_key: Option<String>,

    /// Disable Tavily name resolution for abbreviated author names
    #[arg(long)]
    no_tavily: bool,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Save the email address used for the polite pool
    SetEmail { email: String },
    /// Save the Tavily API key used for name resolution
    SetTavilyKey { key: String },
    /// Show current configuration
    Show,
    /// Show config file path
    Path,
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .init();

    let outcome = match cli.command {
        Commands::Search(args) => run_search(args).await,
        Commands::Fields => {
            list_fields();
            Ok(())
        }
        Commands::Config { action } => handle_config(action),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Search
// ============================================================================

async fn run_search(args: SearchArgs) -> Result<()> {
    let config = ConfigManager::new()?;
    let email = args.email.clone().or_else(|| config.email());

    // Validate fields before any network traffic
    let include = parse_field_list(args.fields.as_deref());
    let exclude = parse_field_list(args.exclude_fields.as_deref());
    let selected_fields = fields_to_select(&include, &exclude)?;

    let client = OpenAlexClient::new(ClientOptions {
        email,
        ..Default::default()
    })?;

    // Author list inputs
    let (entries, source_label) = if let Some(path) = &args.author_file {
        let entries = load_author_file(path)
            .with_context(|| format!("Failed to read author file '{}'", path.display()))?;
        (entries, "file")
    } else if let Some(path) = &args.comp_report {
        let entries = comp_report::load_and_filter(path, args.department.as_deref(), args.job_title.as_deref())?;
        (entries, "compensation report")
    } else {
        (Vec::new(), "")
    };

    let resolved_ids = if entries.is_empty() {
        Vec::new()
    } else {
        let ids = lookup_authors(&client, &config, &args, &entries).await?;
        if ids.is_empty() {
            bail!("No authors found from {}", source_label);
        }
        println!("Successfully looked up {} of {} author(s)", ids.len(), entries.len());
        ids
    };

    let criteria = SearchCriteria {
        search: args.search.clone(),
        author_id: args.author_id.clone(),
        author_ids: resolved_ids.clone(),
        institution: args.institution.clone(),
        restrict_to_home_institution: args.csu_only,
        sort: args.sort,
        max_results: args.max_results,
        per_page: args.per_page,
    };

    println!("Searching OpenAlex API...");
    let works = client.fetch_all(&criteria).await?;

    if works.is_empty() {
        println!("No works found matching your criteria.");
        return Ok(());
    }
    println!("Found {} works. Formatting output...", works.len());

    let mut searched_ids: Vec<String> = args.author_id.iter().map(|id| to_filter_form(id)).collect();
    searched_ids.extend(resolved_ids.iter().cloned());
    let searched = (!searched_ids.is_empty()).then_some(searched_ids.as_slice());

    let formatted: Vec<_> = works
        .iter()
        .map(|work| format_work(work, &selected_fields, searched))
        .collect();

    let query_info = QueryInfo {
        search: args.search.clone(),
        author_id: args.author_id.clone(),
        author_ids: (!resolved_ids.is_empty()).then(|| resolved_ids.clone()),
        author_file: args.author_file.as_ref().map(|p| p.display().to_string()),
        comp_report: args.comp_report.as_ref().map(|p| p.display().to_string()),
        institution: args.institution.clone(),
        csu_only: args.csu_only.then_some(true),
    };

    write_json(&formatted, &args.output, &query_info)
        .with_context(|| format!("Failed to write output file '{}'", args.output.display()))?;
    println!("Saved {} works to {}", formatted.len(), args.output.display());

    Ok(())
}

/// Resolve each author entry to an OpenAlex author id.
///
/// Abbreviated names are expanded first when a Tavily key is available; the
/// institution (home institution under `--csu-only`) scopes the lookups.
async fn lookup_authors(
    client: &OpenAlexClient,
    config: &ConfigManager,
    args: &SearchArgs,
    entries: &[AuthorEntry],
) -> Result<Vec<String>> {
    let resolver = client.resolver();

    let institution_name = if args.csu_only {
        Some(resolver.home_institution().to_string())
    } else {
        args.institution.clone()
    };
    let institution_id = match institution_name.as_deref() {
        Some(_) if args.csu_only => resolver.home_institution_id().await.ok(),
        Some(name) => resolver.resolve_institution(name).await.ok(),
        None => None,
    };
    debug!(?institution_name, ?institution_id, "Author lookup context");

    let tavily = if args.no_tavily {
        None
    } else {
        config
            .resolve_tavily_api_key(args.tavily_api_key.as_deref())
            .map(TavilyClient::new)
            .transpose()?
    };
    if tavily.is_none() && !args.no_tavily && entries.iter().any(|e| is_abbreviated_name(&e.name)) {
        warn!("Abbreviated names found but no Tavily API key is configured; looking them up as written");
    }

    println!("Looking up {} author(s)...", entries.len());
    let mut ids = Vec::new();

    for entry in entries {
        let mut name = entry.name.clone();

        if let Some(tavily) = &tavily {
            let context = NameContext {
                institution: institution_name.as_deref(),
                department: entry.department.as_deref(),
                college: entry.college.as_deref(),
            };
            let (resolved, changed) = resolve_abbreviated_name(&name, &context, Some(tavily)).await;
            if changed {
                println!("  Resolved: {} -> {}", name, resolved);
                name = resolved;
            }
        }

        match resolver.resolve_author(&name, institution_id.as_deref()).await {
            Ok(id) => {
                println!("  Found: {} -> {}", name, id);
                ids.push(id);
            }
            Err(_) => eprintln!("  Not found: {}", name),
        }
    }

    Ok(ids)
}

// ============================================================================
// Fields & Config
// ============================================================================

fn list_fields() {
    println!("Available fields:");
    println!("\nCore fields (included by default):");
    for field in fields::CORE_FIELDS {
        println!("  - {}", field);
    }

    println!("\nExtended fields:");
    for field in fields::EXTENDED_FIELDS {
        println!("  - {}", field);
    }

    println!("\nField aliases:");
    let mut aliases = fields::FIELD_ALIASES.to_vec();
    aliases.sort_unstable();
    for (alias, field) in aliases {
        println!("  - {} → {}", alias, field);
    }
}

fn handle_config(action: ConfigAction) -> Result<()> {
    let manager = ConfigManager::new()?;

    match action {
        ConfigAction::SetEmail { email } => {
            manager.set_email(&email)?;
            println!("Email configured: {}", email);
        }
        ConfigAction::SetTavilyKey { key } => {
            manager.set_tavily_api_key(&key)?;
            println!("Tavily API key configured.");
        }
        ConfigAction::Show => {
            let config = manager.load();
            println!("Configuration file: {}", manager.path().display());
            println!("Email: {}", config.email.as_deref().unwrap_or("not set"));
            println!(
                "Tavily API key: {}",
                if config.tavily_api_key.is_some() { "configured" } else { "not set" }
            );
        }
        ConfigAction::Path => {
            println!("Config file: {}", manager.path().display());
        }
    }

    Ok(())
}
