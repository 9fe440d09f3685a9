//! Exercises `RedisClient` against a live Redis on localhost:6379.
//!
//! Run with `cargo test -p common-redis -- --ignored` while a local Redis is up.

use common_redis::{Client, RedisClient};
use std::time::Duration;

const REDIS_URL: &str = "redis://localhost:6379/0";

async fn raw_connection() -> redis::aio::MultiplexedConnection {
    redis::Client::open(REDIS_URL)
        .unwrap()
        .get_multiplexed_async_connection()
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "requires a local redis"]
async fn test_rpush_batch_appends_to_tail_in_order() {
    let key = "common_redis_test_rpush_batch".to_string();
    let mut raw = raw_connection().await;
    redis::cmd("DEL")
        .arg(&key)
        .query_async::<()>(&mut raw)
        .await
        .unwrap();

    let client = RedisClient::with_config(
        REDIS_URL.to_string(),
        Some(Duration::from_secs(5)),
        Some(Duration::from_secs(5)),
    )
    .await
    .unwrap();
    client.ping().await.unwrap();

    client
        .rpush_batch(key.clone(), vec![b"a".to_vec(), b"b".to_vec()])
        .await
        .unwrap();
    client
        .rpush_batch(key.clone(), vec![b"".to_vec(), b"c".to_vec()])
        .await
        .unwrap();
    client.rpush_batch(key.clone(), vec![]).await.unwrap();

    let stored: Vec<Vec<u8>> = redis::cmd("LRANGE")
        .arg(&key)
        .arg(0)
        .arg(-1)
        .query_async(&mut raw)
        .await
        .unwrap();

    assert_eq!(
        stored,
        vec![b"a".to_vec(), b"b".to_vec(), b"".to_vec(), b"c".to_vec()]
    );
}
