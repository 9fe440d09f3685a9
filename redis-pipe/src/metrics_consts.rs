pub const RECORDS_READ: &str = "redis_pipe_records_read";
pub const RECORDS_PUSHED: &str = "redis_pipe_records_pushed";
pub const BATCHES_PUSHED: &str = "redis_pipe_batches_pushed";
pub const BATCH_PUSH_FAILED: &str = "redis_pipe_batch_push_failed";
pub const BATCH_PUSH_TIME: &str = "redis_pipe_batch_push_time_ms";
pub const PRODUCER_BLOCKED: &str = "redis_pipe_producer_blocked";
pub const CHANNEL_MESSAGES_IN_FLIGHT: &str = "redis_pipe_channel_messages_in_flight";
