use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::error::SourceError;
use crate::metrics_consts::PRODUCER_BLOCKED;
use crate::types::Record;

#[derive(Debug)]
enum Message {
    Record(Record),
    Failed(SourceError),
}

/// What the consumer gets out of the channel.
#[derive(Debug)]
pub enum Received {
    Record(Record),
    /// The producer hit an unrecoverable error. Nothing follows it.
    Failed(SourceError),
    /// The producer finished and everything it sent has been received.
    Closed,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("record receiver has been dropped")]
pub struct ChannelClosed;

/// Producer half. Dropping it (or calling `close`) ends the stream.
#[derive(Debug)]
pub struct RecordSender {
    sender: mpsc::Sender<Message>,
    in_flight: Arc<AtomicUsize>,
}

/// Consumer half.
#[derive(Debug)]
pub struct RecordReceiver {
    receiver: mpsc::Receiver<Message>,
    in_flight: Arc<AtomicUsize>,
}

/// A FIFO hand-off of at most `capacity` records between one producer and one consumer.
///
/// Panics if `capacity` is zero.
pub fn bounded_channel(capacity: usize) -> (RecordSender, RecordReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    let counter = Arc::new(AtomicUsize::new(0));
    (
        RecordSender {
            sender: tx,
            in_flight: Arc::clone(&counter),
        },
        RecordReceiver {
            receiver: rx,
            in_flight: counter,
        },
    )
}

impl RecordSender {
    /// Send a record, blocking the current thread while the channel is full.
    ///
    /// Must not be called from an async context; the producer runs on the blocking pool.
    pub fn blocking_send(&self, record: Record) -> Result<(), ChannelClosed> {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        let message = match self.sender.try_send(Message::Record(record)) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Closed(_)) => return Err(self.undo_in_flight()),
            Err(TrySendError::Full(message)) => message,
        };

        metrics::counter!(PRODUCER_BLOCKED).increment(1);
        self.sender
            .blocking_send(message)
            .map_err(|_| self.undo_in_flight())
    }

    /// Async counterpart of `blocking_send`.
    pub async fn send(&self, record: Record) -> Result<(), ChannelClosed> {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        self.sender
            .send(Message::Record(record))
            .await
            .map_err(|_| self.undo_in_flight())
    }

    // Counted before sending so the receiver never decrements below zero
    fn undo_in_flight(&self) -> ChannelClosed {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
        ChannelClosed
    }

    /// Queue a terminal error behind any buffered records and close the channel.
    ///
    /// If the receiver is already gone the error is dropped; the consumer has
    /// stopped for its own reason.
    pub fn blocking_fail(self, err: SourceError) {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        if self.sender.blocking_send(Message::Failed(err)).is_err() {
            self.undo_in_flight();
        }
    }

    /// Signal that no more records will be sent.
    pub fn close(self) {
        drop(self);
    }

    pub fn capacity(&self) -> usize {
        self.sender.max_capacity()
    }
}

impl RecordReceiver {
    /// Wait for the next record. Buffered records are always drained before
    /// `Failed` or `Closed` is reported.
    pub async fn recv(&mut self) -> Received {
        match self.receiver.recv().await {
            Some(message) => {
                self.in_flight.fetch_sub(1, Ordering::Relaxed);
                match message {
                    Message::Record(record) => Received::Record(record),
                    Message::Failed(err) => Received::Failed(err),
                }
            }
            None => Received::Closed,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fifo_and_drain_after_close() {
        let (tx, mut rx) = bounded_channel(4);

        for line in ["a", "b", "c"] {
            tx.send(Record::from(line)).await.unwrap();
        }
        tx.close();

        assert_eq!(rx.in_flight(), 3);
        for expected in ["a", "b", "c"] {
            match rx.recv().await {
                Received::Record(r) => assert_eq!(r, Record::from(expected)),
                other => panic!("expected record, got {other:?}"),
            }
        }
        assert!(matches!(rx.recv().await, Received::Closed));
        assert!(matches!(rx.recv().await, Received::Closed));
        assert_eq!(rx.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_failure_is_delivered_after_buffered_records() {
        let (tx, mut rx) = bounded_channel(4);

        let producer = tokio::task::spawn_blocking(move || {
            tx.blocking_send(Record::from("ok")).unwrap();
            tx.blocking_fail(SourceError::Io {
                path: PathBuf::from("in.txt"),
                source: io::Error::new(io::ErrorKind::Other, "disk on fire"),
            });
        });

        assert!(matches!(rx.recv().await, Received::Record(_)));
        assert!(matches!(
            rx.recv().await,
            Received::Failed(SourceError::Io { .. })
        ));
        assert!(matches!(rx.recv().await, Received::Closed));
        producer.await.unwrap();
    }

    #[tokio::test]
    async fn test_full_channel_blocks_producer_until_consumer_reads() {
        let (tx, mut rx) = bounded_channel(1);
        assert_eq!(tx.capacity(), 1);

        let producer = tokio::task::spawn_blocking(move || {
            for i in 0..50 {
                tx.blocking_send(Record::from(i.to_string().as_str()))
                    .unwrap();
            }
        });

        // Give the producer time to fill the single slot and block
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!producer.is_finished());

        let mut seen = Vec::new();
        loop {
            match rx.recv().await {
                Received::Record(r) => seen.push(String::from_utf8(r.into_bytes()).unwrap()),
                Received::Closed => break,
                Received::Failed(err) => panic!("unexpected failure {err}"),
            }
        }
        producer.await.unwrap();

        let expected: Vec<String> = (0..50).map(|i| i.to_string()).collect();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn test_send_after_receiver_dropped_fails() {
        let (tx, rx) = bounded_channel(2);
        drop(rx);

        let result = tokio::task::spawn_blocking(move || tx.blocking_send(Record::from("x")))
            .await
            .unwrap();

        assert_eq!(result, Err(ChannelClosed));
    }
}
