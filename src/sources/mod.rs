//! One adapter per upstream source.
//!
//! Every adapter produces a normalized, serializable block for the
//! aggregator and defines the empty value the aggregator substitutes when
//! the adapter fails. Source-specific parsing stays inside each variant.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::SyncError;

pub mod goodreads;
pub mod letterboxd;
pub mod strava;

pub use goodreads::GoodreadsSource;
pub use letterboxd::LetterboxdSource;
pub use strava::StravaSource;

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Key under which this source's block appears in the output document.
    fn name(&self) -> &'static str;

    /// The degraded value used when `produce` fails; always a valid block.
    fn empty_block(&self) -> Value;

    async fn produce(&self) -> Result<Value, SyncError>;
}
