use anyhow::Result;
use tracing::{info, warn};

use crate::config::Config;
use crate::fetcher::{self, Transport};
use crate::models::log::{DownloadLog, Status};
use crate::models::record;

/// Per-record outcomes of one retry pass.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RetrySummary {
    pub fixed: usize,
    pub still_failing: usize,
    pub missing_source: usize,
}

/// Re-attempts every entry currently marked failed, exactly once each, and
/// updates the matching log rows in place.
///
/// Each entry's coordinates are re-resolved from its originating split's
/// source table, re-read from disk per entry. An entry whose id no longer
/// appears in the source table is skipped and left unchanged.
pub async fn retry_failed<T: Transport>(config: &Config, transport: &T) -> Result<RetrySummary> {
    let mut log = DownloadLog::load(&config.log_file)?;
    let failed = log.failed_entries();

    if failed.is_empty() {
        info!("no failed downloads to retry");
        return Ok(RetrySummary::default());
    }

    info!(count = failed.len(), "retrying failed downloads");
    let mut summary = RetrySummary::default();

    for entry in failed {
        let source = config.source_csv(entry.split);
        let record = match record::find_by_id(source, &entry.id)? {
            Some(record) => record,
            None => {
                warn!(id = %entry.id, split = %entry.split, "no source row for entry, skipping");
                summary.missing_source += 1;
                continue;
            }
        };

        let url = config.mapbox.image_url(record.lat, record.long);
        let image_path = config.image_path(entry.split, &entry.id);

        match fetcher::fetch_image(transport, &url, &image_path).await {
            Ok(()) => {
                log.update(&entry.id, Status::Success, "")?;
                info!(id = %entry.id, "fixed");
                summary.fixed += 1;
            }
            Err(err) => {
                log.update(&entry.id, Status::Failed, &err.to_string())?;
                warn!(id = %entry.id, error = %err, "still failing");
                summary.still_failing += 1;
            }
        }
    }

    info!(
        fixed = summary.fixed,
        still_failing = summary.still_failing,
        "retry complete"
    );
    Ok(summary)
}
