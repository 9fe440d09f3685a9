use common_redis::{Client, RedisClient};
use tracing::info;

use crate::config::QueueEndpoint;
use crate::error::PipelineError;

/// Open a connection to the destination redis and make sure it answers.
///
/// Called before the source is opened.
pub async fn connect(endpoint: &QueueEndpoint) -> Result<RedisClient, PipelineError> {
    let url = endpoint.url();

    let client = RedisClient::with_config(
        url.clone(),
        Some(endpoint.response_timeout),
        Some(endpoint.connect_timeout),
    )
    .await
    .map_err(|source| PipelineError::Connection {
        endpoint: url.clone(),
        source,
    })?;
    verify(&client, &url).await?;

    info!(endpoint = %url, "connected to redis");
    Ok(client)
}

/// Ping the queue, reporting failure as a connection error against `endpoint`.
pub async fn verify<C: Client + Sync>(client: &C, endpoint: &str) -> Result<(), PipelineError> {
    client
        .ping()
        .await
        .map_err(|source| PipelineError::Connection {
            endpoint: endpoint.to_string(),
            source,
        })
}
