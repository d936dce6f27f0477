//! Strava workout adapter.
//!
//! This is the one source backed by the incremental sync engine: it loads
//! the checkpoint, picks the fetch policy from it, exchanges a token, drains
//! the paginated endpoint, merges by id, saves the checkpoint, and only then
//! derives the presentation block from the full merged set.
//!
//! A checkpoint save failure is returned as-is so the run treats it as
//! fatal; everything else is wrapped as a source failure for the aggregator
//! to degrade.

use std::path::PathBuf;

use async_trait::async_trait;
use log::{info, warn};
use reqwest::Client;
use serde_json::{json, Value};
use time::OffsetDateTime;

use crate::auth::{HttpTokenExchange, TokenManager};
use crate::config::Credentials;
use crate::errors::SyncError;
use crate::fetcher::{fetch_all, FetchPolicy, StravaPages};
use crate::models::Activity;
use crate::sources::SourceAdapter;
use crate::stats::{
    self, by_sport, newest, record_stats, totals, year_to_date, RECENT_WINDOW_DAYS,
};
use crate::store::ActivityStore;

const SOURCE: &str = "strava";
const RECENT_LIMIT: usize = 8;

pub struct StravaSource {
    credentials: Option<Credentials>,
    client: Client,
    token_url: String,
    api_base: String,
    checkpoint_path: PathBuf,
    per_page: u32,
    max_pages: u32,
}

impl StravaSource {
    pub fn new(
        credentials: Option<Credentials>,
        client: Client,
        token_url: String,
        api_base: String,
        checkpoint_path: PathBuf,
        per_page: u32,
        max_pages: u32,
    ) -> Self {
        Self {
            credentials,
            client,
            token_url,
            api_base,
            checkpoint_path,
            per_page,
            max_pages,
        }
    }

    async fn sync(&self) -> Result<ActivityStore, SyncError> {
        let credentials = self
            .credentials
            .clone()
            .ok_or_else(|| SyncError::source_failure(SOURCE, "credentials not configured"))?;

        let mut store = ActivityStore::load(&self.checkpoint_path);
        let policy = FetchPolicy::for_checkpoint(
            store.is_empty(),
            self.per_page,
            self.max_pages,
            OffsetDateTime::now_utc(),
        );
        if policy.after.is_none() {
            info!("empty checkpoint, fetching full activity history");
        } else {
            info!("fetching activities for the trailing window");
        }

        let manager = TokenManager::new(
            credentials,
            Box::new(HttpTokenExchange::new(
                self.client.clone(),
                self.token_url.clone(),
            )),
        );
        let token = manager
            .access_token()
            .await
            .map_err(|err| SyncError::source_failure(SOURCE, err))?;

        let pages = StravaPages::new(self.client.clone(), self.api_base.clone(), token.token);
        let outcome = fetch_all(&pages, &policy).await;

        let merge = store.merge(outcome.records);
        info!(
            "merged activities: {} updated, {} new, {} total",
            merge.updated,
            merge.added,
            store.len()
        );
        // Persist partial progress even when a page failed; the next run's
        // window refetch is safe because merge is idempotent.
        store.save(&self.checkpoint_path)?;

        if let Some(err) = outcome.failure {
            warn!("activity fetch stopped early: {err}");
            return Err(SyncError::source_failure(SOURCE, err));
        }
        Ok(store)
    }
}

#[async_trait]
impl SourceAdapter for StravaSource {
    fn name(&self) -> &'static str {
        SOURCE
    }

    fn empty_block(&self) -> Value {
        json!({
            "recent_runs": [],
            "recent_bikes": [],
            "recent_hikes": [],
            "stats": {},
        })
    }

    async fn produce(&self) -> Result<Value, SyncError> {
        let store = self.sync().await?;
        Ok(build_block(store.records(), OffsetDateTime::now_utc()))
    }
}

/// Assemble the workouts block from the merged activity set.
pub fn build_block(records: &[Activity], now: OffsetDateTime) -> Value {
    let runs = by_sport(records, "Run");
    let rides = by_sport(records, "Ride");
    let hikes = by_sport(records, "Hike");
    let swims = by_sport(records, "Swim");

    json!({
        "recent_runs": recent_list(&runs),
        "recent_bikes": recent_list(&rides),
        "recent_hikes": recent_list(&hikes),
        "stats": {
            "running": sport_windows(&runs, now),
            "biking": sport_windows(&rides, now),
            "swimming": sport_windows(&swims, now),
            "records": record_stats(records),
        },
    })
}

fn recent_list(activities: &[&Activity]) -> Vec<Value> {
    newest(activities.to_vec(), RECENT_LIMIT)
        .into_iter()
        .map(stats::format_activity)
        .collect()
}

fn sport_windows(activities: &[&Activity], now: OffsetDateTime) -> Value {
    json!({
        "ytd": totals(&year_to_date(activities, now)),
        "all_time": totals(activities),
        "recent": totals(&stats::within_days(activities, RECENT_WINDOW_DAYS, now)),
    })
}
