use std::num::NonZeroUsize;
use std::time::Instant;

use common_redis::Client;
use tracing::{debug, warn};

use crate::channel::{Received, RecordReceiver};
use crate::error::PipelineError;
use crate::metrics_consts::{
    BATCHES_PUSHED, BATCH_PUSH_FAILED, BATCH_PUSH_TIME, CHANNEL_MESSAGES_IN_FLIGHT,
    RECORDS_PUSHED,
};
use crate::types::{Batch, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    /// Collecting records into the current batch.
    Accumulating,
    /// A full batch is being pushed. A writer left in this state had its push fail.
    Flushing,
    /// The stream ended and the final partial batch is being pushed.
    DrainingFinal,
    Done,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub records_pushed: u64,
    pub batches_pushed: u64,
}

/// Groups records into batches of `batch_size` and pushes each one to a Redis list in a
/// single pipelined call. Owns the queue client for the length of the run.
pub struct BatchWriter<C> {
    client: C,
    queue: String,
    batch_size: NonZeroUsize,
    batch: Batch,
    state: WriterState,
    stats: WriterStats,
}

impl<C> BatchWriter<C>
where
    C: Client + Send + Sync,
{
    pub fn new(client: C, queue: String, batch_size: NonZeroUsize) -> Self {
        Self {
            client,
            queue,
            batch_size,
            batch: Vec::new(),
            state: WriterState::Accumulating,
            stats: WriterStats::default(),
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    /// Records accepted but not yet pushed.
    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    pub fn stats(&self) -> WriterStats {
        self.stats
    }

    /// Add a record to the current batch, pushing the batch once it is full.
    pub async fn accept(&mut self, record: Record) -> Result<(), PipelineError> {
        debug_assert_eq!(self.state, WriterState::Accumulating);

        self.batch.push(record);
        if self.batch.len() >= self.batch_size.get() {
            self.state = WriterState::Flushing;
            self.flush().await?;
            self.state = WriterState::Accumulating;
        }
        Ok(())
    }

    /// Push whatever is left in the batch and stop. Only issues a call if the batch is
    /// non-empty; calling it again is a no-op.
    pub async fn finish(&mut self) -> Result<WriterStats, PipelineError> {
        if !self.batch.is_empty() {
            self.state = WriterState::DrainingFinal;
            self.flush().await?;
        }
        self.state = WriterState::Done;
        Ok(self.stats)
    }

    /// Drain `records` until the producer closes the channel, then flush the final batch.
    ///
    /// If the producer reports a failure the pending batch is discarded, not flushed.
    pub async fn run(mut self, mut records: RecordReceiver) -> Result<WriterStats, PipelineError> {
        loop {
            match records.recv().await {
                Received::Record(record) => {
                    self.accept(record).await?;
                    if self.batch.is_empty() {
                        metrics::gauge!(CHANNEL_MESSAGES_IN_FLIGHT).set(records.in_flight() as f64);
                    }
                }
                Received::Failed(err) => {
                    warn!(
                        pending = self.pending(),
                        pushed = self.stats.records_pushed,
                        "source failed, discarding unflushed batch"
                    );
                    return Err(err.into());
                }
                Received::Closed => return self.finish().await,
            }
        }
    }

    async fn flush(&mut self) -> Result<(), PipelineError> {
        let batch = std::mem::take(&mut self.batch);
        let batch_len = batch.len();
        let items = batch.into_iter().map(Record::into_bytes).collect();

        let start = Instant::now();
        match self.client.rpush_batch(self.queue.clone(), items).await {
            Ok(()) => {
                let elapsed = start.elapsed();
                self.stats.records_pushed += batch_len as u64;
                self.stats.batches_pushed += 1;
                metrics::counter!(RECORDS_PUSHED).increment(batch_len as u64);
                metrics::counter!(BATCHES_PUSHED).increment(1);
                metrics::histogram!(BATCH_PUSH_TIME).record(elapsed.as_millis() as f64);
                debug!(
                    queue = %self.queue,
                    batch_len,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "pushed batch"
                );
                Ok(())
            }
            Err(source) => {
                metrics::counter!(BATCH_PUSH_FAILED).increment(1);
                Err(PipelineError::Write {
                    queue: self.queue.clone(),
                    batch_len,
                    source,
                })
            }
        }
    }
}
