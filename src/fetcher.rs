//! Paginated, time-windowed activity fetch.
//!
//! Pages are requested strictly sequentially from page 1. The loop stops on
//! the first empty page or once the page cap is exceeded. A non-success page
//! response is a hard stop, but everything collected from earlier pages is
//! handed back to the caller so partial progress survives the failure.

use async_trait::async_trait;
use log::info;
use reqwest::Client;
use time::{Duration, OffsetDateTime};

use crate::errors::SyncError;
use crate::models::Activity;

/// Steady-state runs only look back far enough to catch edits to recent
/// records plus new records.
pub const INCREMENTAL_WINDOW_DAYS: i64 = 30;

/// Page/window parameters for one fetch session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPolicy {
    pub per_page: u32,
    /// `None` means unbounded.
    pub max_pages: Option<u32>,
    /// Epoch-seconds lower bound on activity start time; `None` fetches
    /// full history.
    pub after: Option<i64>,
}

impl FetchPolicy {
    /// One-time unbounded historical backfill.
    pub fn bootstrap(per_page: u32) -> Self {
        Self {
            per_page,
            max_pages: None,
            after: None,
        }
    }

    /// Bounded pull over the trailing window.
    pub fn incremental(per_page: u32, max_pages: u32, now: OffsetDateTime) -> Self {
        let after = (now - Duration::days(INCREMENTAL_WINDOW_DAYS)).unix_timestamp();
        Self {
            per_page,
            max_pages: Some(max_pages),
            after: Some(after),
        }
    }

    /// The core incremental-sync decision: an empty checkpoint gets the
    /// bootstrap backfill, every later run a cheap bounded pull.
    pub fn for_checkpoint(
        checkpoint_empty: bool,
        per_page: u32,
        max_pages: u32,
        now: OffsetDateTime,
    ) -> Self {
        if checkpoint_empty {
            Self::bootstrap(per_page)
        } else {
            Self::incremental(per_page, max_pages, now)
        }
    }
}

#[async_trait]
pub trait ActivityPages: Send + Sync {
    async fn page(
        &self,
        page: u32,
        per_page: u32,
        after: Option<i64>,
    ) -> Result<Vec<Activity>, SyncError>;
}

/// Bearer-authenticated page requests against the athlete activities endpoint.
pub struct StravaPages {
    client: Client,
    api_base: String,
    token: String,
}

impl StravaPages {
    pub fn new(client: Client, api_base: String, token: String) -> Self {
        Self {
            client,
            api_base,
            token,
        }
    }
}

#[async_trait]
impl ActivityPages for StravaPages {
    async fn page(
        &self,
        page: u32,
        per_page: u32,
        after: Option<i64>,
    ) -> Result<Vec<Activity>, SyncError> {
        let url = format!(
            "{}/athlete/activities",
            self.api_base.trim_end_matches('/')
        );
        let mut query = vec![("page", page.to_string()), ("per_page", per_page.to_string())];
        if let Some(after) = after {
            query.push(("after", after.to_string()));
        }
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .query(&query)
            .send()
            .await
            .map_err(|err| SyncError::Fetch {
                page,
                reason: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Fetch {
                page,
                reason: format!("status {status}"),
            });
        }

        response.json().await.map_err(|err| SyncError::Fetch {
            page,
            reason: format!("unparsable payload: {err}"),
        })
    }
}

/// Result of draining all pages; `failure` is set when a page hard-stopped
/// the session after `records` were already collected.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub records: Vec<Activity>,
    pub failure: Option<SyncError>,
}

pub async fn fetch_all(source: &dyn ActivityPages, policy: &FetchPolicy) -> FetchOutcome {
    let mut records = Vec::new();
    let mut page = 1u32;
    loop {
        if let Some(cap) = policy.max_pages {
            if page > cap {
                info!("page cap {cap} reached, stopping");
                break;
            }
        }
        let batch = match source.page(page, policy.per_page, policy.after).await {
            Ok(batch) => batch,
            Err(err) => {
                return FetchOutcome {
                    records,
                    failure: Some(err),
                };
            }
        };
        if batch.is_empty() {
            info!("no more activities after page {page}");
            break;
        }
        info!("fetched {} activities from page {page}", batch.len());
        records.extend(batch);
        page += 1;
    }
    FetchOutcome {
        records,
        failure: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use time::macros::datetime;

    fn activity(id: u64) -> Activity {
        serde_json::from_value(serde_json::json!({ "id": id })).unwrap()
    }

    struct ScriptedPages {
        // Entry per page: Some(count) yields that many records, None errors.
        pages: Vec<Option<usize>>,
        requests: AtomicUsize,
    }

    impl ScriptedPages {
        fn new(pages: Vec<Option<usize>>) -> Self {
            Self {
                pages,
                requests: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ActivityPages for ScriptedPages {
        async fn page(
            &self,
            page: u32,
            _per_page: u32,
            _after: Option<i64>,
        ) -> Result<Vec<Activity>, SyncError> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            match self.pages.get(page as usize - 1).copied().flatten() {
                Some(count) => Ok((0..count)
                    .map(|i| activity(u64::from(page) * 1000 + i as u64))
                    .collect()),
                None if page as usize > self.pages.len() => Ok(Vec::new()),
                None => Err(SyncError::Fetch {
                    page,
                    reason: "status 500".into(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn stops_on_first_empty_page() {
        let source = ScriptedPages::new(vec![Some(10), Some(10), Some(0)]);
        let policy = FetchPolicy {
            per_page: 10,
            max_pages: Some(50),
            after: None,
        };
        let outcome = fetch_all(&source, &policy).await;
        assert!(outcome.failure.is_none());
        assert_eq!(outcome.records.len(), 20);
        assert_eq!(source.requests.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn respects_the_page_cap() {
        let source = ScriptedPages::new(vec![Some(5), Some(5), Some(5)]);
        let policy = FetchPolicy {
            per_page: 5,
            max_pages: Some(2),
            after: None,
        };
        let outcome = fetch_all(&source, &policy).await;
        assert!(outcome.failure.is_none());
        assert_eq!(outcome.records.len(), 10);
        assert_eq!(source.requests.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn page_error_hard_stops_but_keeps_prior_records() {
        let source = ScriptedPages::new(vec![Some(10), None]);
        let policy = FetchPolicy {
            per_page: 10,
            max_pages: None,
            after: None,
        };
        let outcome = fetch_all(&source, &policy).await;
        assert_eq!(outcome.records.len(), 10);
        match outcome.failure {
            Some(SyncError::Fetch { page, .. }) => assert_eq!(page, 2),
            other => panic!("expected fetch failure, got {other:?}"),
        }
    }

    #[test]
    fn empty_checkpoint_selects_bootstrap() {
        let now = datetime!(2024-06-15 12:00:00 UTC);
        let policy = FetchPolicy::for_checkpoint(true, 100, 10, now);
        assert_eq!(policy.after, None);
        assert_eq!(policy.max_pages, None);
    }

    #[test]
    fn populated_checkpoint_selects_bounded_window() {
        let now = datetime!(2024-06-15 12:00:00 UTC);
        let policy = FetchPolicy::for_checkpoint(false, 100, 10, now);
        assert_eq!(policy.max_pages, Some(10));
        assert_eq!(
            policy.after,
            Some((now - Duration::days(30)).unix_timestamp())
        );
    }
}
