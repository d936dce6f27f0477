//! Fan-out over the configured sources and assembly of the output document.
//!
//! Sources run one at a time in declared order. A failing source is logged
//! and replaced by its empty block so the document always carries an entry
//! per configured source; the two exceptions are checkpoint-save and
//! output-write failures, which have no partial-success meaning and abort
//! the run.

use std::fs;
use std::path::Path;

use log::{info, warn};
use serde_json::{Map, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::errors::SyncError;
use crate::sources::SourceAdapter;

/// Invoke every source and assemble the combined document.
///
/// Only `SyncError::Persistence` escapes; any other source failure becomes
/// that source's empty block.
pub async fn aggregate(sources: &[Box<dyn SourceAdapter>]) -> Result<Value, SyncError> {
    let mut document = Map::new();
    for source in sources {
        match source.produce().await {
            Ok(block) => {
                info!("source '{}' produced its block", source.name());
                document.insert(source.name().to_string(), block);
            }
            Err(err @ SyncError::Persistence(_)) => return Err(err),
            Err(err) => {
                warn!(
                    "source '{}' failed ({}): {} — {}",
                    source.name(),
                    err.code(),
                    err,
                    err.explain()
                );
                document.insert(source.name().to_string(), source.empty_block());
            }
        }
    }
    let generated_at = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    document.insert("generated_at".to_string(), Value::String(generated_at));
    Ok(Value::Object(document))
}

/// Replace the output file wholesale; failure here is fatal for the run.
pub fn write_document(path: &Path, document: &Value) -> Result<(), SyncError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| SyncError::Write(err.to_string()))?;
    }
    let body =
        serde_json::to_vec_pretty(document).map_err(|err| SyncError::Write(err.to_string()))?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, body).map_err(|err| SyncError::Write(err.to_string()))?;
    fs::rename(&tmp, path).map_err(|err| SyncError::Write(err.to_string()))?;
    info!("wrote aggregate document to {}", path.display());
    Ok(())
}
