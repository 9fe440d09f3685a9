use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::{Client, CustomRedisError};

/// In-memory stand-in for a Redis list store.
///
/// Clones share call history and list contents, so a test can hand one clone to the
/// code under test and inspect another afterwards.
#[derive(Clone, Default)]
pub struct MockRedisClient {
    ping_ret: Option<Result<(), CustomRedisError>>,
    // Number of rpush_batch calls that succeed before `rpush_batch_error` is returned
    rpush_batch_fail_after: Option<usize>,
    rpush_batch_error: Option<CustomRedisError>,
    calls: Arc<Mutex<Vec<MockRedisCall>>>,
    lists: Arc<Mutex<HashMap<String, Vec<Vec<u8>>>>>,
}

impl MockRedisClient {
    pub fn new() -> Self {
        Self::default()
    }

    // Helper method to safely lock the calls mutex
    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<MockRedisCall>> {
        match self.calls.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock_lists(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<Vec<u8>>>> {
        match self.lists.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn ping_ret(&mut self, ret: Result<(), CustomRedisError>) -> Self {
        self.ping_ret = Some(ret);
        self.clone()
    }

    /// Fail every rpush_batch call from the `successes + 1`th one onwards.
    pub fn rpush_batch_fail_after(&mut self, successes: usize, err: CustomRedisError) -> Self {
        self.rpush_batch_fail_after = Some(successes);
        self.rpush_batch_error = Some(err);
        self.clone()
    }

    pub fn get_calls(&self) -> Vec<MockRedisCall> {
        self.lock_calls().clone()
    }

    /// The batches passed to rpush_batch, in call order, including failed ones.
    pub fn pushed_batches(&self) -> Vec<Vec<Vec<u8>>> {
        self.lock_calls()
            .iter()
            .filter_map(|call| match &call.value {
                MockRedisValue::Items(items) if call.op == "rpush_batch" => Some(items.clone()),
                _ => None,
            })
            .collect()
    }

    /// Contents of a list, as appended by successful rpush_batch calls.
    pub fn list(&self, key: &str) -> Vec<Vec<u8>> {
        self.lock_lists().get(key).cloned().unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub enum MockRedisValue {
    None,
    Items(Vec<Vec<u8>>),
}

#[derive(Debug, Clone)]
pub struct MockRedisCall {
    pub op: String,
    pub key: String,
    pub value: MockRedisValue,
}

#[async_trait]
impl Client for MockRedisClient {
    async fn ping(&self) -> Result<(), CustomRedisError> {
        self.lock_calls().push(MockRedisCall {
            op: "ping".to_string(),
            key: String::new(),
            value: MockRedisValue::None,
        });

        match &self.ping_ret {
            Some(ret) => ret.clone(),
            None => Ok(()),
        }
    }

    async fn rpush_batch(&self, key: String, items: Vec<Vec<u8>>) -> Result<(), CustomRedisError> {
        let previous_pushes = {
            let mut calls = self.lock_calls();
            let previous = calls.iter().filter(|c| c.op == "rpush_batch").count();
            calls.push(MockRedisCall {
                op: "rpush_batch".to_string(),
                key: key.clone(),
                value: MockRedisValue::Items(items.clone()),
            });
            previous
        };

        if let (Some(limit), Some(err)) = (self.rpush_batch_fail_after, &self.rpush_batch_error) {
            if previous_pushes >= limit {
                return Err(err.clone());
            }
        }

        self.lock_lists().entry(key).or_default().extend(items);
        Ok(())
    }
}
