// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};
use std::time::Duration;

use almanac_ical::{Component, ComponentKind, Environment, parse_string};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tokio::runtime::Runtime;

use crate::set::SetBackend;
use crate::{SetKind, StoreConfig, StoreError};

const MEMORY: &str = ":memory:";

/// SQLite result codes reported while another connection holds the
/// database: BUSY, LOCKED, BUSY_SNAPSHOT and LOCKED_SHAREDCACHE.
const BUSY_CODES: [&str; 4] = ["5", "6", "517", "262"];

/// Components as rows of a SQLite database.
///
/// A commit replaces every row in one transaction, so storage holds either
/// the old or the new cluster. A busy database is retried a bounded number
/// of times.
#[derive(Debug)]
pub struct TransactionalBackend {
    path: PathBuf,
    runtime: Runtime,
    pool: Option<SqlitePool>,
    max_retries: u32,
    retry_backoff: Duration,
}

impl TransactionalBackend {
    /// Connects to the database at `config.path`, creating it and its
    /// schema if missing. The path `:memory:` opens a private in-memory
    /// database.
    ///
    /// # Errors
    ///
    /// Fails if the database cannot be opened or migrated.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StoreError::io(&config.path, e))?;

        let options = if config.path.as_os_str() == MEMORY {
            tracing::info!("connecting to in-memory SQLite database");
            SqliteConnectOptions::new().in_memory(true)
        } else {
            tracing::info!(path = %config.path.display(), "connecting to SQLite database");
            SqliteConnectOptions::new()
                .filename(&config.path)
                .create_if_missing(true)
                .read_only(config.read_only)
        };
        // SQLite waits one backoff on its own before reporting a busy database
        let options = options.busy_timeout(config.retry_backoff.0);

        let pool = runtime.block_on(async {
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?;

            sqlx::migrate!("src/set/migrations") // relative path from the crate root
                .run(&pool)
                .await?;
            Ok::<_, StoreError>(pool)
        })?;

        Ok(Self {
            path: config.path.clone(),
            runtime,
            pool: Some(pool),
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff.0,
        })
    }

    fn pool(&self) -> Result<&SqlitePool, StoreError> {
        self.pool
            .as_ref()
            .ok_or_else(|| StoreError::BadArgument(format!("{} is closed", self.path.display())))
    }

    /// Runs `op` until it succeeds, fails for another reason than a busy
    /// database, or the retries are spent.
    fn with_retries<T>(
        &self,
        mut op: impl FnMut() -> Result<T, sqlx::Error>,
    ) -> Result<T, StoreError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if is_busy(&err) && attempts <= self.max_retries => {
                    tracing::warn!(attempts, %err, "database is busy, retrying");
                    std::thread::sleep(self.retry_backoff);
                }
                Err(err) if is_busy(&err) => {
                    tracing::error!(attempts, %err, "database stayed busy");
                    return Err(StoreError::Deadlock {
                        attempts,
                        source: err,
                    });
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

impl SetBackend for TransactionalBackend {
    fn kind(&self) -> SetKind {
        SetKind::Transactional
    }

    fn location(&self) -> &Path {
        &self.path
    }

    fn cluster_keys(&mut self) -> Result<Vec<String>, StoreError> {
        Ok(vec![String::new()])
    }

    fn cluster_key(&self, _component: &Component) -> Result<String, StoreError> {
        Ok(String::new())
    }

    fn load(&mut self, _key: &str, env: &Environment) -> Result<Vec<Component>, StoreError> {
        const SQL: &str = "\
SELECT data
FROM components
ORDER BY position ASC;
";

        let pool = self.pool()?;
        let rows: Vec<String> = self.with_retries(|| {
            self.runtime
                .block_on(sqlx::query_scalar(SQL).fetch_all(pool))
        })?;
        tracing::debug!(path = %self.path.display(), rows = rows.len(), "loaded components");

        let mut components = Vec::with_capacity(rows.len());
        for data in rows {
            components.push(parse_string(&data, env)?);
        }
        Ok(components)
    }

    fn store(&mut self, _key: &str, root: &Component) -> Result<(), StoreError> {
        const DELETE: &str = "DELETE FROM components;";
        const INSERT: &str = "\
INSERT INTO components (key, kind, data)
VALUES (?, ?, ?);
";

        let mut rows = Vec::with_capacity(root.components().len());
        for component in root.components() {
            let key = match component.get_inner().map(Component::kind) {
                Some(ComponentKind::VAgenda) => component.relcalid(),
                _ => component.uid(),
            };
            let data = almanac_ical::formatter::format(component)
                .map_err(|e| StoreError::io(&self.path, e))?;
            rows.push((
                key.unwrap_or_default().to_string(),
                component.name().to_string(),
                data,
            ));
        }

        let pool = self.pool()?;
        self.with_retries(|| {
            self.runtime.block_on(async {
                let mut tx = pool.begin().await?;
                sqlx::query(DELETE).execute(&mut *tx).await?;
                for (key, kind, data) in &rows {
                    sqlx::query(INSERT)
                        .bind(key)
                        .bind(kind)
                        .bind(data)
                        .execute(&mut *tx)
                        .await?;
                }
                tx.commit().await
            })
        })?;
        tracing::debug!(path = %self.path.display(), rows = rows.len(), "replaced components");
        Ok(())
    }

    fn close(&mut self) -> Result<(), StoreError> {
        if let Some(pool) = self.pool.take() {
            tracing::debug!("closing database connection");
            self.runtime.block_on(pool.close());
        }
        Ok(())
    }
}

fn is_busy(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().is_some_and(|code| BUSY_CODES.contains(&&*code)),
        _ => false,
    }
}
