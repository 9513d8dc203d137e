//! # Missioni
//!
//! A resilient acquisition pipeline for international-mission documents.
//!
//! Missioni discovers document links on institutional sites (sitemaps and
//! index pages), fetches them with retry and archival-snapshot fallback,
//! stores the artifacts content-addressed, extracts structured mission
//! records with per-language pattern sets, normalizes and de-duplicates
//! them, classifies each mission, and reconciles the result into a curated
//! master dataset.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌─────────┐   ┌───────────────┐   ┌───────────┐
//! │  Discovery │──▶│  Fetch  │──▶│ Extract+Norm. │──▶│   Merge   │
//! │ sitemap/idx│   │ + store │   │  per language │   │ +classify │
//! └────────────┘   └─────────┘   └───────────────┘   └─────┬─────┘
//!                                                          │
//!                                        ┌─────────────────┤
//!                                        ▼                 ▼
//!                                  ┌──────────┐      ┌───────────┐
//!                                  │ dataset  │      │  master   │
//!                                  │   CSV    │      │ reconcile │
//!                                  └──────────┘      └───────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`models`] | Core data types |
//! | [`discover`] | Sitemap and index-page link discovery |
//! | [`fetch`] | Retry, backoff, and archive-fallback retrieval |
//! | [`store`] | Content-addressed artifact storage |
//! | [`document`] | PDF and Word text extraction |
//! | [`extract`] | Regex pattern sets and field extraction |
//! | [`normalize`] | Dates, personnel, costs, text cleanup |
//! | [`merge`] | Identity de-duplication and master linking |
//! | [`classify`] | Rule-cascade mission categorization |
//! | [`export`] | CSV exports and master round-trip |
//! | [`pipeline`] | Per-source orchestration |

pub mod classify;
pub mod config;
pub mod discover;
pub mod document;
pub mod export;
pub mod extract;
pub mod fetch;
pub mod merge;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod sources;
pub mod store;
pub mod tabular;
