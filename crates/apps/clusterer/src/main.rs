mod context;
mod ingress;
mod sink;
mod worker;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use external_clients::{InMemoryKvStore, InMemoryObjectStore, InMemoryQueue, KvStore, MessageQueue, ObjectStore, PostgresKvStore, S3ObjectStore, SqsQueue};
use tracing::info;

use context::ClustererContext;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Run against in-process fakes instead of SQS/S3/Postgres. Useful for
    /// local smoke-testing without standing up real infrastructure.
    #[clap(long, default_value_t = false, action)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    color_eyre::install()?;

    let args = Args::parse();
    let settings = app_state::load_app_settings()?;
    info!(embedding_dim = settings.embedding_dim, "loaded settings");

    let (queue, object_store, kv_store): (Arc<dyn MessageQueue>, Arc<dyn ObjectStore>, Arc<dyn KvStore>) = if args.in_memory {
        info!("running against in-memory fakes");
        (
            Arc::new(InMemoryQueue::new()),
            Arc::new(InMemoryObjectStore::new()),
            Arc::new(InMemoryKvStore::new()),
        )
    } else {
        let sqs = SqsQueue::from_env(settings.store.queue_url.clone()).await;
        let s3 = S3ObjectStore::from_env(settings.store.object_store_bucket.clone()).await;
        let pg_pool = external_clients::postgres_kv::get_db_pool(&settings.secrets.database_url, true).await?;
        let pg = PostgresKvStore::new(pg_pool, settings.store.kv_table.clone());
        (Arc::new(sqs), Arc::new(s3), Arc::new(pg))
    };

    let context = Arc::new(ClustererContext::new(settings, queue, object_store, kv_store));

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_writer = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install ctrl_c handler");
            return;
        }
        info!("shutdown signal received, finishing in-flight step");
        shutdown_writer.store(true, Ordering::Relaxed);
    });

    worker::run(context, shutdown).await
}
