use crate::retry::default_strategy;
use crate::traits::{MessageQueue, QueueError, RawMessage};
use async_trait::async_trait;
use aws_sdk_sqs::Client;
use tokio_retry::Retry;
use tracing::warn;

pub struct SqsQueue {
    client: Client,
    queue_url: String,
}

impl SqsQueue {
    pub fn new(client: Client, queue_url: String) -> Self {
        Self { client, queue_url }
    }

    pub async fn from_env(queue_url: String) -> Self {
        let config = aws_config::load_from_env().await;
        Self::new(Client::new(&config), queue_url)
    }
}

#[async_trait]
impl MessageQueue for SqsQueue {
    async fn receive(&self, max_messages: u32) -> Result<Vec<RawMessage>, QueueError> {
        // SQS caps a single receive at 10 messages; short-poll (WaitTimeSeconds
        // unset) so idle receivers return promptly instead of blocking.
        let capped = max_messages.min(10);
        let response = Retry::spawn(default_strategy(), || async {
            self.client
                .receive_message()
                .queue_url(&self.queue_url)
                .max_number_of_messages(capped as i32)
                .send()
                .await
                .inspect_err(|e| warn!(error = %e, "transient error receiving from queue, retrying"))
        })
        .await
        .map_err(|e| QueueError::Transient(e.to_string()))?;

        Ok(response
            .messages()
            .iter()
            .filter_map(|m| {
                let body = m.body()?.to_string();
                let receipt = m.receipt_handle()?.to_string();
                Some(RawMessage { body, receipt })
            })
            .collect())
    }

    async fn delete_batch(&self, receipts: &[String]) -> Result<(), QueueError> {
        for chunk in receipts.chunks(10) {
            let entries: Vec<aws_sdk_sqs::types::DeleteMessageBatchRequestEntry> = chunk
                .iter()
                .enumerate()
                .map(|(i, receipt)| {
                    aws_sdk_sqs::types::DeleteMessageBatchRequestEntry::builder()
                        .id(i.to_string())
                        .receipt_handle(receipt)
                        .build()
                        .map_err(|e| QueueError::Transient(e.to_string()))
                })
                .collect::<Result<_, _>>()?;

            let result = Retry::spawn(default_strategy(), || async {
                self.client
                    .delete_message_batch()
                    .queue_url(&self.queue_url)
                    .set_entries(Some(entries.clone()))
                    .send()
                    .await
                    .inspect_err(|e| warn!(error = %e, "transient error deleting from queue, retrying"))
            })
            .await
            .map_err(|e| QueueError::Transient(e.to_string()))?;

            for failed in result.failed() {
                warn!(id = failed.id(), "failed to delete queue message");
            }
        }
        Ok(())
    }
}
