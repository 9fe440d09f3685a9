use std::path::PathBuf;
use std::time::{Duration, Instant};

use common_redis::Client;
use tracing::{debug, info};

use crate::channel::{bounded_channel, RecordSender};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::metrics_consts::RECORDS_READ;
use crate::source::LineSource;
use crate::writer::BatchWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub records_read: u64,
    pub records_pushed: u64,
    pub batches_pushed: u64,
    pub elapsed: Duration,
}

/// Stream every line of the configured file into the configured redis list.
///
/// The file is read on the blocking pool and handed to the batch writer through a
/// bounded channel. Returns once the final batch is pushed and the reader has exited,
/// or at the first error from either side.
pub async fn run<C>(config: &PipelineConfig, client: C) -> Result<RunSummary, PipelineError>
where
    C: Client + Send + Sync,
{
    let start = Instant::now();
    let (tx, rx) = bounded_channel(config.buffer_capacity.get());

    let producer = tokio::task::spawn_blocking({
        let path = config.source_path.clone();
        let is_compressed = config.is_compressed;
        move || produce(path, is_compressed, tx)
    });

    let writer = BatchWriter::new(client, config.queue_name.clone(), config.batch_size);
    // The receiver is dropped when the writer returns, which unblocks a producer
    // stuck on a full channel after a write failure.
    let written = writer.run(rx).await;
    let produced = producer.await;

    let stats = written?;
    let records_read = produced?;

    let summary = RunSummary {
        records_read,
        records_pushed: stats.records_pushed,
        batches_pushed: stats.batches_pushed,
        elapsed: start.elapsed(),
    };
    info!(
        source = %config.source_path.display(),
        queue = %config.queue_name,
        records = summary.records_pushed,
        batches = summary.batches_pushed,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "run complete"
    );
    Ok(summary)
}

// Producer side: owns the file for its whole life and closes the channel exactly once,
// either by dropping the sender at EOF or through `blocking_fail`.
fn produce(path: PathBuf, is_compressed: bool, tx: RecordSender) -> u64 {
    let source = match LineSource::open(&path, is_compressed) {
        Ok(source) => source,
        Err(err) => {
            tx.blocking_fail(err);
            return 0;
        }
    };
    debug!(
        path = %source.path().display(),
        is_compressed,
        capacity = tx.capacity(),
        "reading source"
    );

    let mut read = 0u64;
    for item in source {
        match item {
            Ok(record) => {
                read += 1;
                if tx.blocking_send(record).is_err() {
                    debug!(read, "writer stopped, abandoning source");
                    break;
                }
            }
            Err(err) => {
                metrics::counter!(RECORDS_READ).increment(read);
                tx.blocking_fail(err);
                return read;
            }
        }
    }

    metrics::counter!(RECORDS_READ).increment(read);
    tx.close();
    read
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueueEndpoint;
    use common_redis::MockRedisClient;
    use std::num::NonZeroUsize;
    use tempfile::TempDir;

    fn config_for(path: PathBuf, batch_size: usize) -> PipelineConfig {
        PipelineConfig {
            source_path: path,
            is_compressed: false,
            batch_size: NonZeroUsize::new(batch_size).unwrap(),
            buffer_capacity: NonZeroUsize::new(4).unwrap(),
            queue_name: "q".to_string(),
            endpoint: QueueEndpoint {
                host: "localhost".to_string(),
                port: 6379,
                db: 0,
                connect_timeout: Duration::from_secs(1),
                response_timeout: Duration::from_secs(1),
            },
        }
    }

    #[tokio::test]
    async fn test_summary_counts_match() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("in.txt");
        std::fs::write(&path, "a\nb\nc\n").unwrap();
        let client = MockRedisClient::new();

        let summary = run(&config_for(path, 2), client.clone()).await.unwrap();

        assert_eq!(summary.records_read, 3);
        assert_eq!(summary.records_pushed, 3);
        assert_eq!(summary.batches_pushed, 2);
        assert_eq!(client.list("q").len(), 3);
    }

    #[tokio::test]
    async fn test_missing_file_fails_without_pushing() {
        let dir = TempDir::new().unwrap();
        let client = MockRedisClient::new();

        let err = run(&config_for(dir.path().join("missing.txt"), 2), client.clone())
            .await
            .unwrap_err();

        assert_eq!(err.stage(), "source");
        assert!(client.get_calls().is_empty());
    }
}
