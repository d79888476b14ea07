use anyhow::Result;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::Config;
use crate::fetcher::{self, Transport};
use crate::models::log::{DownloadLog, LogEntry, Status};
use crate::models::{record, Split};

/// Running counts for one split.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ProcessSummary {
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Downloads imagery for every record in the split's source table that does
/// not already have a log entry, appending one entry per attempt.
///
/// Records are visited in table order. A fixed delay follows each attempted
/// download to pace requests against the remote API.
pub async fn process_dataset<T: Transport>(
    config: &Config,
    transport: &T,
    split: Split,
) -> Result<ProcessSummary> {
    info!(%split, "downloading images");

    let records = record::load(config.source_csv(split))?;
    let mut log = DownloadLog::load(&config.log_file)?;
    let done = log.processed_ids();

    let total = records.len();
    let mut summary = ProcessSummary::default();

    for (position, record) in records.iter().enumerate() {
        if position % 100 == 0 {
            info!(%split, "{}/{} processed", position, total);
        }

        if done.contains(&record.id) {
            summary.skipped += 1;
            continue;
        }

        let url = config.mapbox.image_url(record.lat, record.long);
        let image_path = config.image_path(split, &record.id);

        let (status, error) = match fetcher::fetch_image(transport, &url, &image_path).await {
            Ok(()) => (Status::Success, String::new()),
            Err(err) => {
                warn!(id = %record.id, error = %err, "download failed");
                (Status::Failed, err.to_string())
            }
        };

        log.append(LogEntry {
            id: record.id.clone(),
            split,
            status,
            filename: format!("{}.png", record.id),
            error,
        })?;

        match status {
            Status::Success => summary.success += 1,
            Status::Failed => summary.failed += 1,
        }

        sleep(config.request_delay).await;
    }

    info!(
        %split,
        success = summary.success,
        failed = summary.failed,
        skipped = summary.skipped,
        "split done"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::mock::MockTransport;
    use crate::fetcher::FetchError;
    use std::io::Write;

    fn test_config(dir: &std::path::Path) -> Config {
        let config = Config::new("pk.test", dir);
        config.ensure_directories().unwrap();
        config
    }

    fn write_train_csv(config: &Config, contents: &str) {
        let mut file = std::fs::File::create(&config.train_csv).unwrap();
        write!(file, "{}", contents).unwrap();
    }

    #[tokio::test]
    async fn test_records_failed_attempt_without_creating_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        write_train_csv(&config, "id,lat,long\n1,40.0,-73.0\n");

        let transport = MockTransport::new();
        transport.push_response(Err(FetchError::HttpStatus(404)));

        let summary = process_dataset(&config, &transport, Split::Train)
            .await
            .unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.success, 0);

        let log = DownloadLog::load(&config.log_file).unwrap();
        assert_eq!(log.entries().len(), 1);
        let entry = &log.entries()[0];
        assert_eq!(entry.id, "1");
        assert_eq!(entry.split, Split::Train);
        assert_eq!(entry.status, Status::Failed);
        assert_eq!(entry.filename, "1.png");
        assert_eq!(entry.error, "HTTP 404");
        assert!(!config.image_path(Split::Train, "1").exists());
    }

    #[tokio::test]
    async fn test_successful_attempt_writes_image_and_log() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        write_train_csv(&config, "id,lat,long\n1,40.0,-73.0\n");

        let transport = MockTransport::new();
        transport.push_response(Ok(b"png bytes".to_vec()));

        let summary = process_dataset(&config, &transport, Split::Train)
            .await
            .unwrap();
        assert_eq!(summary.success, 1);

        let log = DownloadLog::load(&config.log_file).unwrap();
        assert_eq!(log.entries()[0].status, Status::Success);
        assert_eq!(log.entries()[0].error, "");
        assert_eq!(
            std::fs::read(config.image_path(Split::Train, "1")).unwrap(),
            b"png bytes"
        );
    }

    #[tokio::test]
    async fn test_logged_ids_are_never_refetched() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        write_train_csv(&config, "id,lat,long\n1,40.0,-73.0\n2,41.0,-74.0\n");

        let mut log = DownloadLog::load(&config.log_file).unwrap();
        log.append(LogEntry {
            id: "1".to_string(),
            split: Split::Train,
            status: Status::Success,
            filename: "1.png".to_string(),
            error: String::new(),
        })
        .unwrap();

        let transport = MockTransport::new();
        transport.push_response(Ok(b"png bytes".to_vec()));

        let summary = process_dataset(&config, &transport, Split::Train)
            .await
            .unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.success, 1);

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].contains("-74,41"));
    }

    #[tokio::test]
    async fn test_failed_ids_are_not_retried_here() {
        // A failed entry still counts as processed; only the retry pass
        // attempts it again.
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        write_train_csv(&config, "id,lat,long\n1,40.0,-73.0\n");

        let mut log = DownloadLog::load(&config.log_file).unwrap();
        log.append(LogEntry {
            id: "1".to_string(),
            split: Split::Train,
            status: Status::Failed,
            filename: "1.png".to_string(),
            error: "HTTP 500".to_string(),
        })
        .unwrap();

        let transport = MockTransport::new();
        let summary = process_dataset(&config, &transport, Split::Train)
            .await
            .unwrap();
        assert_eq!(summary.skipped, 1);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_missing_required_column_is_fatal_for_the_split() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        write_train_csv(&config, "id,lat\n1,40.0\n");

        let transport = MockTransport::new();
        let result = process_dataset(&config, &transport, Split::Train).await;
        assert!(result.is_err());
        assert!(transport.requests().is_empty());
    }
}
