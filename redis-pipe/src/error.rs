use std::io;
use std::path::PathBuf;

use common_redis::CustomRedisError;
use thiserror::Error;

/// Errors raised while reading records out of the source file.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to decompress {}: {source}", path.display())]
    Decompression {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Every way a run can fail. None of these are retried; the run stops at the first one.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("failed to connect to redis at {endpoint}: {source}")]
    Connection {
        endpoint: String,
        #[source]
        source: CustomRedisError,
    },
    // A timeout after the pipeline was sent lands here too; whether the items
    // reached the list is unknown.
    #[error("failed to push batch of {batch_len} records to list {queue}: {source}")]
    Write {
        queue: String,
        batch_len: usize,
        #[source]
        source: CustomRedisError,
    },
    #[error("producer task failed: {0}")]
    Producer(#[from] tokio::task::JoinError),
}

impl From<envconfig::Error> for PipelineError {
    fn from(err: envconfig::Error) -> Self {
        PipelineError::Config(err.to_string())
    }
}

impl PipelineError {
    /// Short name of the pipeline stage that failed, for diagnostics.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Config(_) => "config",
            PipelineError::Source(SourceError::Io { .. }) => "source",
            PipelineError::Source(SourceError::Decompression { .. }) => "decompress",
            PipelineError::Connection { .. } => "connect",
            PipelineError::Write { .. } => "write",
            PipelineError::Producer(_) => "producer",
        }
    }

    pub fn redis_cause(&self) -> Option<&CustomRedisError> {
        match self {
            PipelineError::Connection { source, .. } | PipelineError::Write { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        let io = PipelineError::from(SourceError::Io {
            path: PathBuf::from("in.txt"),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        });
        assert_eq!(io.stage(), "source");
        assert!(io.to_string().contains("in.txt"));

        let gz = PipelineError::from(SourceError::Decompression {
            path: PathBuf::from("in.gz"),
            source: io::Error::new(io::ErrorKind::InvalidInput, "invalid gzip header"),
        });
        assert_eq!(gz.stage(), "decompress");

        let write = PipelineError::Write {
            queue: "q".to_string(),
            batch_len: 3,
            source: CustomRedisError::Timeout,
        };
        assert_eq!(write.stage(), "write");
        assert_eq!(
            write.to_string(),
            "failed to push batch of 3 records to list q: Timeout error"
        );
        assert!(matches!(
            write.redis_cause(),
            Some(CustomRedisError::Timeout)
        ));
    }
}
