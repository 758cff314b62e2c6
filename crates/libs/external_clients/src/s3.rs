use crate::retry::default_strategy;
use crate::traits::{ObjectStore, ObjectStoreError};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tokio_retry::Retry;
use tracing::warn;

pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    pub async fn from_env(bucket: String) -> Self {
        let config = aws_config::load_from_env().await;
        Self::new(Client::new(&config), bucket)
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ObjectStoreError> {
        let output = Retry::spawn(default_strategy(), || async {
            match self.client.get_object().bucket(&self.bucket).key(key).send().await {
                Ok(output) => Ok(Some(output)),
                Err(err) if is_not_found(&err) => Ok(None),
                Err(err) => {
                    warn!(error = %err, "transient error reading from object store, retrying");
                    Err(err)
                }
            }
        })
        .await
        .map_err(|e| ObjectStoreError::Transient(e.to_string()))?;

        match output {
            Some(output) => {
                let bytes = output
                    .body
                    .collect()
                    .await
                    .map_err(|e| ObjectStoreError::Transient(e.to_string()))?;
                Ok(Some(bytes.into_bytes().to_vec()))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), ObjectStoreError> {
        Retry::spawn(default_strategy(), || async {
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .body(ByteStream::from(bytes.clone()))
                .send()
                .await
                .inspect_err(|e| warn!(error = %e, "transient error writing to object store, retrying"))
        })
        .await
        .map_err(|e| ObjectStoreError::Transient(e.to_string()))?;
        Ok(())
    }
}

fn is_not_found(err: &aws_sdk_s3::error::SdkError<aws_sdk_s3::operation::get_object::GetObjectError>) -> bool {
    matches!(
        err.as_service_error(),
        Some(e) if e.is_no_such_key()
    )
}
