use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cluster_core::{checkpoint, Clusterer, PoolStore};
use color_eyre::eyre::{Result, WrapErr};
use tracing::{info, info_span, warn};

use crate::context::ClustererContext;
use crate::ingress;
use crate::sink;

/// How long to back off before re-polling when a fan-out round came back
/// completely empty, to avoid busy-spinning against an idle queue.
const EMPTY_QUEUE_BACKOFF: Duration = Duration::from_millis(200);

/// Runs until `shutdown` is flipped, finishing the in-flight step before
/// exiting. Mirrors the fan-out-ingest, step, sink, ack, periodic-checkpoint
/// cycle.
pub async fn run(context: Arc<ClustererContext>, shutdown: Arc<AtomicBool>) -> Result<()> {
    let mut pool = load_or_init_pool(&context).await?;
    let mut clusterer = Clusterer::new(context.settings.clusterer.clone());
    let mut steps_since_checkpoint: u64 = 0;

    loop {
        if shutdown.load(Ordering::Relaxed) {
            info!("graceful shutdown requested, finishing in-flight work");
        }

        let batch = ingress::fetch_batch(&context).await;
        if batch.docs.is_empty() && batch.deletable_receipts.is_empty() {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }
            tokio::time::sleep(EMPTY_QUEUE_BACKOFF).await;
            continue;
        }

        let step_span = info_span!("worker_step", batch_len = batch.docs.len());
        let _enter = step_span.enter();

        let result = clusterer
            .step(&mut pool, &batch.docs)
            .wrap_err("clustering step failed; pool invariants may be violated")?;

        if let Err(e) = sink::apply(&context, &batch.docs, &result).await {
            warn!(error = %e, "sink failed, leaving messages on the queue for retry");
            drop(_enter);
            if shutdown.load(Ordering::Relaxed) {
                break;
            }
            continue;
        }

        for chunk in batch.deletable_receipts.chunks(10) {
            if let Err(e) = context.queue.delete_batch(chunk).await {
                warn!(error = %e, "failed to delete consumed messages");
            }
        }

        steps_since_checkpoint += 1;
        if steps_since_checkpoint >= context.settings.checkpoint.checkpoint_every {
            steps_since_checkpoint = 0;
            if let Err(e) = save_checkpoint(&context, &pool).await {
                warn!(error = %e, "checkpoint save failed");
            }
        }

        drop(_enter);

        if shutdown.load(Ordering::Relaxed) {
            break;
        }
    }

    info!("running final checkpoint before exit");
    save_checkpoint(&context, &pool).await?;
    Ok(())
}

async fn load_or_init_pool(context: &ClustererContext) -> Result<PoolStore> {
    let key = &context.settings.checkpoint.checkpoint_key;
    match context
        .object_store
        .get(key)
        .await
        .wrap_err("failed to read checkpoint from object store")?
    {
        Some(bytes) => checkpoint::load(&bytes).wrap_err("checkpoint is corrupt, aborting before accepting messages"),
        None => {
            info!(dim = context.settings.embedding_dim, "no checkpoint found, starting with an empty pool");
            Ok(PoolStore::new(context.settings.embedding_dim))
        }
    }
}

async fn save_checkpoint(context: &ClustererContext, pool: &PoolStore) -> Result<()> {
    let bytes = checkpoint::save(pool).wrap_err("failed to serialize checkpoint")?;
    context
        .object_store
        .put(&context.settings.checkpoint.checkpoint_key, bytes)
        .await
        .wrap_err("failed to write checkpoint to object store")?;
    Ok(())
}
