use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use envconfig::Envconfig;

use crate::error::PipelineError;

#[derive(Envconfig, Clone, Debug)]
pub struct Config {
    #[envconfig(default = "test.txt.gz")]
    pub source_path: String,

    #[envconfig(default = "true")]
    pub is_compressed: bool,

    #[envconfig(default = "test")]
    pub queue_name: String,

    #[envconfig(from = "REDIS_HOST", default = "localhost")]
    pub redis_host: String,

    #[envconfig(from = "REDIS_PORT", default = "6379")]
    pub redis_port: u16,

    #[envconfig(from = "REDIS_DB", default = "0")]
    pub redis_db: u32,

    // Records per pipelined RPUSH round trip
    #[envconfig(default = "1000")]
    pub batch_size: usize,

    // Records buffered between the file reader and the redis writer
    #[envconfig(default = "1000")]
    pub buffer_capacity: usize,

    // Seconds, must be non-zero
    #[envconfig(from = "REDIS_CONNECT_TIMEOUT_SECS", default = "600")]
    pub redis_connect_timeout_secs: u64,

    #[envconfig(from = "REDIS_RESPONSE_TIMEOUT_SECS", default = "600")]
    pub redis_response_timeout_secs: u64,
}

/// Where the destination list lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEndpoint {
    pub host: String,
    pub port: u16,
    pub db: u32,
    pub connect_timeout: Duration,
    pub response_timeout: Duration,
}

impl QueueEndpoint {
    pub fn url(&self) -> String {
        if self.host.contains(':') {
            format!("redis://[{}]:{}/{}", self.host, self.port, self.db)
        } else {
            format!("redis://{}:{}/{}", self.host, self.port, self.db)
        }
    }
}

/// Validated, immutable settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub source_path: PathBuf,
    pub is_compressed: bool,
    pub batch_size: NonZeroUsize,
    pub buffer_capacity: NonZeroUsize,
    pub queue_name: String,
    pub endpoint: QueueEndpoint,
}

impl Config {
    /// Read settings from the process environment and validate them.
    pub fn pipeline_config_from_env() -> Result<PipelineConfig, PipelineError> {
        Self::init_from_env()?.pipeline_config()
    }

    pub fn pipeline_config(&self) -> Result<PipelineConfig, PipelineError> {
        let batch_size = NonZeroUsize::new(self.batch_size)
            .ok_or_else(|| PipelineError::Config("BATCH_SIZE must be at least 1".to_string()))?;
        let buffer_capacity = NonZeroUsize::new(self.buffer_capacity).ok_or_else(|| {
            PipelineError::Config("BUFFER_CAPACITY must be at least 1".to_string())
        })?;

        if self.queue_name.is_empty() {
            return Err(PipelineError::Config(
                "QUEUE_NAME must not be empty".to_string(),
            ));
        }
        if self.redis_connect_timeout_secs == 0 || self.redis_response_timeout_secs == 0 {
            return Err(PipelineError::Config(
                "redis timeouts must be at least 1 second".to_string(),
            ));
        }

        Ok(PipelineConfig {
            source_path: PathBuf::from(&self.source_path),
            is_compressed: self.is_compressed,
            batch_size,
            buffer_capacity,
            queue_name: self.queue_name.clone(),
            endpoint: QueueEndpoint {
                host: self.redis_host.clone(),
                port: self.redis_port,
                db: self.redis_db,
                connect_timeout: Duration::from_secs(self.redis_connect_timeout_secs),
                response_timeout: Duration::from_secs(self.redis_response_timeout_secs),
            },
        })
    }
}
