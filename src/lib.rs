//! # Longbox
//!
//! A comic pull-list tracker for the weekly release cycle.
//!
//! ## Architecture
//!
//! Longbox follows a modular pipeline architecture:
//!
//! ```text
//! Fetcher → Parser → Merger → Enricher → Store → Rules
//! ```
//!
//! - [`fetcher`]: HTTP access to the release list export and detail pages
//! - [`parser`]: Weekly feed text to typed comic records, variants merged
//! - [`enricher`]: Per-issue detail pages fill creators/description/cover
//! - [`store`]: SQLite persistence layer
//! - [`rules`]: User-defined rule tree auto-marking comics pulled/watched
//! - [`collection`]: Orchestrates load → refresh → persist → classify
//!
//! ## Quick Start
//!
//! ```bash
//! # Fetch this week's releases and classify them
//! longbox refresh
//!
//! # See what matched
//! longbox list --pulled
//!
//! # Pull something by hand
//! longbox pull "SPIDER-MAN 5"
//! ```
//!
//! ## Modules
//!
//! - [`app`]: Application context and error types
//! - [`cli`]: Command-line interface definitions
//! - [`collection`]: The tracked release list and its refresh pipeline
//! - [`config`]: Configuration file handling
//! - [`domain`]: Core domain model (Comic, variant merging)
//! - [`enricher`]: Batched detail-page enrichment
//! - [`fetcher`]: Feed source trait and reqwest implementation
//! - [`parser`]: Release list text parsing
//! - [`rules`]: Rule model and evaluator
//! - [`store`]: Database persistence

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all
/// components: store, feed source, rule set.
pub mod app;

/// Command-line interface using clap.
///
/// Defines the CLI structure and subcommands:
/// - `refresh` - Fetch and classify this week's list
/// - `list [--publisher] [--pulled] [--watched]` - List comics
/// - `publishers` - List publishers
/// - `pull <title>` / `watch <title>` - Toggle flags
/// - `dates` - List stored release dates
pub mod cli;

/// The tracked release collection.
///
/// [`ComicCollection`](collection::ComicCollection) owns the weekly
/// snapshot and drives parse → merge → enrich → persist → classify.
pub mod collection;

/// Configuration management.
///
/// Loads from `~/.config/longbox/config.toml`, supporting feed URLs,
/// file locations, and enrichment parallelism.
pub mod config;

/// Core domain model.
///
/// - [`Comic`](domain::Comic): One issue or variant listing
/// - [`merge_variants`](domain::merge_variants): Variant grouping
pub mod domain;

/// Batched detail-page enrichment.
///
/// [`DetailEnricher`](enricher::DetailEnricher) fetches one detail page
/// per record under a worker semaphore and joins the whole batch.
pub mod enricher;

/// Feed access.
///
/// - [`FeedSource`](fetcher::FeedSource): Async trait over the catalog
/// - [`HttpFeedSource`](fetcher::HttpFeedSource): reqwest implementation
pub mod fetcher;

/// Release list parsing.
///
/// [`ReleaseParser`](parser::ReleaseParser) turns the weekly text export
/// into merged records grouped by issue key.
pub mod parser;

/// Rule model and evaluator.
///
/// - [`Rule`](rules::Rule) / [`RuleGroup`](rules::RuleGroup): the tree
/// - [`RuleSet`](rules::RuleSet): the user's JSON rule file
pub mod rules;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
/// - [`ticks`](store::ticks): Legacy tick-epoch date conversion
pub mod store;
