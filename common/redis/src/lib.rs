use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

// Re-export ErrorKind so consumers can construct CustomRedisError in tests
pub use redis::ErrorKind as RedisErrorKind;

#[derive(Error, Debug, Clone)]
pub enum CustomRedisError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Timeout error")]
    Timeout,
    #[error(transparent)]
    Redis(#[from] Arc<redis::RedisError>),
}

impl From<redis::RedisError> for CustomRedisError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() {
            CustomRedisError::Timeout
        } else {
            CustomRedisError::Redis(Arc::new(err))
        }
    }
}

impl CustomRedisError {
    /// Create a Redis error from an ErrorKind (primarily for testing)
    pub fn from_redis_kind(kind: redis::ErrorKind, description: &'static str) -> Self {
        CustomRedisError::Redis(Arc::new(redis::RedisError::from((kind, description))))
    }

    /// Whether re-running the same operation could ever succeed.
    ///
    /// Returns `true` for configuration errors and permanent failures, `false` for
    /// transient network issues. Nothing in this crate retries; callers that wrap a whole
    /// run in retries use this to decide whether another attempt is worth it.
    pub fn is_unrecoverable_error(&self) -> bool {
        match self {
            CustomRedisError::Timeout => false,
            CustomRedisError::InvalidConfiguration(_) => true,
            CustomRedisError::Redis(err) => {
                Self::is_config_error(err) || err.is_unrecoverable_error()
            }
        }
    }

    fn is_config_error(err: &redis::RedisError) -> bool {
        matches!(
            err.kind(),
            redis::ErrorKind::InvalidClientConfig | redis::ErrorKind::AuthenticationFailed
        )
    }
}

/// The list-queue operations the pipeline needs from Redis.
#[async_trait]
pub trait Client {
    async fn ping(&self) -> Result<(), CustomRedisError>;

    /// Append `items` to the tail of list `k` in a single pipelined round trip.
    ///
    /// Items land in the order given. The pipeline is not transactional: if the
    /// round trip fails part way, some items may already have been appended.
    async fn rpush_batch(&self, k: String, items: Vec<Vec<u8>>) -> Result<(), CustomRedisError>;
}

mod client;
mod mock;

pub use client::RedisClient;
pub use mock::{MockRedisCall, MockRedisClient, MockRedisValue};
