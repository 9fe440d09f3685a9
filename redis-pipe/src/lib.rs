pub mod channel;
pub mod config;
pub mod error;
pub mod metrics_consts;
pub mod pipeline;
pub mod queue;
pub mod source;
pub mod types;
pub mod writer;
