//! Library entry point that wires together the sync and aggregation subsystems.
//!
//! Each module is intentionally kept lightweight so that the boundaries
//! between responsibilities remain obvious when exploring the codebase:
//! - [`config`] reads credentials, fixture toggles, and paths from the environment.
//! - [`errors`] keeps the central error catalogue with human friendly metadata.
//! - [`auth`] manages the OAuth2 refresh-token exchange and access-token cache.
//! - [`fetcher`] drives the paginated, time-windowed activity fetch.
//! - [`store`] persists the activity checkpoint and reconciles incoming records.
//! - [`models`] holds the typed activity record shared across layers.
//! - [`feed`] provides minimal RSS item extraction used by the feed sources.
//! - [`sources`] implements one adapter per upstream (Letterboxd, Goodreads, Strava).
//! - [`stats`] derives rolling-window workout statistics from the merged set.
//! - [`aggregator`] fans out over the sources and assembles the output document.

pub mod aggregator;
pub mod auth;
pub mod config;
pub mod errors;
pub mod feed;
pub mod fetcher;
pub mod models;
pub mod sources;
pub mod stats;
pub mod store;
