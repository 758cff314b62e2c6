use crate::context::ClustererContext;
use common_types::{Doc, QueueMessageBody};
use std::collections::HashSet;
use std::sync::Mutex;
use tracing::warn;

/// One batch's worth of parsed, deduped documents plus the receipts of
/// every successfully-parsed raw message that contributed to it (including
/// in-batch duplicates, which still need to be deleted from the queue).
/// Malformed messages are deliberately excluded: they're left on the queue
/// to dead-letter per the queue's own policy rather than deleted here.
#[derive(Debug, Default)]
pub struct IngressBatch {
    pub docs: Vec<Doc>,
    pub deletable_receipts: Vec<String>,
}

/// Fans out `receiver_threads` concurrent short-polling receivers until
/// `batch_size` raw messages have accumulated (or the queue runs dry),
/// then parses and dedupes at the batch boundary.
pub async fn fetch_batch(context: &ClustererContext) -> IngressBatch {
    let target = context.settings.ingress.batch_size;
    let per_poll = context.settings.ingress.per_receiver_batch;
    let raw_bodies: Mutex<Vec<(String, String)>> = Mutex::new(Vec::new());

    loop {
        if raw_bodies.lock().unwrap().len() >= target {
            break;
        }

        let handles: Vec<_> = (0..context.settings.ingress.receiver_threads)
            .map(|_| {
                let queue = context.queue.clone();
                async move { queue.receive(per_poll).await }
            })
            .collect();

        let results = futures_util::future::join_all(handles).await;
        let mut got_anything = false;
        for result in results {
            match result {
                Ok(messages) => {
                    if messages.is_empty() {
                        continue;
                    }
                    got_anything = true;
                    let mut raw = raw_bodies.lock().unwrap();
                    for m in messages {
                        raw.push((m.body, m.receipt));
                    }
                }
                Err(e) => warn!(error = %e, "transient queue receive error"),
            }
        }

        if !got_anything {
            // Queue is empty right now; work with whatever we've got.
            break;
        }
    }

    let raw_bodies = raw_bodies.into_inner().unwrap();
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut docs = Vec::new();
    let mut deletable_receipts = Vec::with_capacity(raw_bodies.len());

    for (body, receipt) in raw_bodies {
        match QueueMessageBody::parse(&body).and_then(QueueMessageBody::into_doc) {
            Ok(doc) => {
                deletable_receipts.push(receipt);
                if seen_ids.insert(doc.id.clone()) {
                    docs.push(doc);
                }
            }
            Err(e) => warn!(error = %e, "skipping malformed queue message, leaving it on the queue"),
        }
    }

    IngressBatch { docs, deletable_receipts }
}
