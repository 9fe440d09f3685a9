use anyhow::Error;
use redis_pipe::{config::Config, error::PipelineError, pipeline, queue};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

fn setup_tracing() {
    let log_layer: tracing_subscriber::filter::Filtered<
        tracing_subscriber::fmt::Layer<tracing_subscriber::Registry>,
        EnvFilter,
        tracing_subscriber::Registry,
    > = tracing_subscriber::fmt::layer().with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(log_layer).init();
}

fn exit_with(err: PipelineError) -> ! {
    error!(
        stage = err.stage(),
        unrecoverable = err.redis_cause().map(|cause| cause.is_unrecoverable_error()),
        "{err}"
    );
    std::process::exit(1);
}

#[tokio::main]
pub async fn main() -> Result<(), Error> {
    setup_tracing();
    info!("Starting up...");

    let pipeline_config = Config::pipeline_config_from_env().unwrap_or_else(|e| exit_with(e));

    info!(
        source = %pipeline_config.source_path.display(),
        is_compressed = pipeline_config.is_compressed,
        queue = %pipeline_config.queue_name,
        batch_size = pipeline_config.batch_size.get(),
        buffer_capacity = pipeline_config.buffer_capacity.get(),
        "Configuration loaded"
    );

    let client = queue::connect(&pipeline_config.endpoint)
        .await
        .unwrap_or_else(|e| exit_with(e));

    match pipeline::run(&pipeline_config, client).await {
        Ok(summary) => {
            info!(
                records = summary.records_pushed,
                batches = summary.batches_pushed,
                "Shutting down"
            );
            Ok(())
        }
        Err(e) => exit_with(e),
    }
}
