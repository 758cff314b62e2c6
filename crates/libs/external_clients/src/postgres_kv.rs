use crate::retry::default_strategy;
use crate::traits::{KvStore, KvStoreError};
use async_trait::async_trait;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tokio_retry::Retry;
use tracing::{info, warn};

pub struct PostgresKvStore {
    pool: PgPool,
    table: String,
}

impl PostgresKvStore {
    pub fn new(pool: PgPool, table: String) -> Self {
        Self { pool, table }
    }
}

#[async_trait]
impl KvStore for PostgresKvStore {
    async fn batch_get(&self, keys: &[(String, String)]) -> Result<Vec<(String, String, serde_json::Value)>, KvStoreError> {
        let mut out = Vec::with_capacity(keys.len());
        // 100 keys at a time, matching the sink's read chunking.
        for chunk in keys.chunks(100) {
            let pks: Vec<String> = chunk.iter().map(|(pk, _)| pk.clone()).collect();
            let sks: Vec<String> = chunk.iter().map(|(_, sk)| sk.clone()).collect();
            let query = format!(
                "SELECT t.pk, t.sk, t.attributes FROM {} t \
                 JOIN (SELECT unnest($1::text[]) AS pk, unnest($2::text[]) AS sk) keys \
                 ON t.pk = keys.pk AND t.sk = keys.sk",
                self.table
            );
            let rows = Retry::spawn(default_strategy(), || async {
                sqlx::query(&query)
                    .bind(&pks)
                    .bind(&sks)
                    .fetch_all(&self.pool)
                    .await
                    .inspect_err(|e| warn!(error = %e, "transient error reading from key-value store, retrying"))
            })
            .await
            .map_err(|e| KvStoreError::Transient(e.to_string()))?;
            for row in rows {
                let pk: String = row.try_get("pk").map_err(|e| KvStoreError::Transient(e.to_string()))?;
                let sk: String = row.try_get("sk").map_err(|e| KvStoreError::Transient(e.to_string()))?;
                let attrs: serde_json::Value = row.try_get("attributes").map_err(|e| KvStoreError::Transient(e.to_string()))?;
                out.push((pk, sk, attrs));
            }
        }
        Ok(out)
    }

    async fn batch_write(&self, rows: Vec<(String, String, serde_json::Value)>) -> Result<(), KvStoreError> {
        let query = format!(
            "INSERT INTO {} (pk, sk, attributes) VALUES ($1, $2, $3) \
             ON CONFLICT (pk, sk) DO UPDATE SET attributes = EXCLUDED.attributes",
            self.table
        );

        // Retried as a whole: a transient failure mid-transaction leaves
        // nothing committed, so the entire batch is safe to replay from
        // the start rather than resuming mid-way.
        Retry::spawn(default_strategy(), || async {
            let attempt = async {
                let mut tx = self.pool.begin().await?;
                for (pk, sk, attrs) in &rows {
                    sqlx::query(&query)
                        .bind(pk)
                        .bind(sk)
                        .bind(attrs)
                        .execute(&mut *tx)
                        .await?;
                }
                tx.commit().await
            };
            attempt
                .await
                .inspect_err(|e| warn!(error = %e, "transient error writing to key-value store, retrying"))
        })
        .await
        .map_err(|e| KvStoreError::Transient(e.to_string()))?;
        Ok(())
    }
}

pub fn find_migrations_dir() -> color_eyre::Result<PathBuf> {
    let mut current_dir = env::current_exe()?
        .parent()
        .ok_or_else(|| color_eyre::eyre::eyre!("executable has no parent directory"))?
        .to_path_buf();

    loop {
        let migrations_path = current_dir.join("migrations");
        if migrations_path.is_dir() {
            return Ok(migrations_path);
        }
        if !current_dir.pop() {
            return Err(color_eyre::eyre::eyre!(
                "could not find a 'migrations' directory in any parent path"
            ));
        }
    }
}

/// Connects to Postgres and optionally runs migrations, mirroring the
/// worker's own startup sequence.
pub async fn get_db_pool(database_url: &str, run_migrations: bool) -> color_eyre::Result<PgPool> {
    info!(
        "connecting to key-value store: {}",
        database_url.split('/').next_back().unwrap_or("unknown")
    );
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .max_lifetime(Duration::from_secs(30 * 60))
        .idle_timeout(Duration::from_secs(10 * 60))
        .acquire_timeout(Duration::from_secs(10))
        .test_before_acquire(true)
        .connect(database_url)
        .await?;

    if run_migrations {
        let migrations_folder = find_migrations_dir()?;
        let migrator = Migrator::new(migrations_folder).await?;
        match migrator.run(&pool).await {
            Ok(()) => info!("key-value store migrations completed"),
            Err(e) => warn!("key-value store did not migrate cleanly: {e:?}"),
        }
    }

    Ok(pool)
}
