//! Persistence seam for the chunked writer.
//!
//! [`ContentStore`] is everything the writer needs from storage: write one
//! chunk atomically, and discard parents created by earlier chunks.
//! [`PgContentStore`] is the PostgreSQL implementation used in production.

use crate::import::data_structures::{PreparedChildren, PreparedSet};
use crate::import::database_operations;
use crate::import::error::ChunkError;
use crate::import::payload::{ContentKind, ImportOptions};
use crate::import::stats::ImportStats;
use crate::models::AcademicContext;
use rocket_db_pools::sqlx::{self, PgConnection, PgPool};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use uuid::Uuid;

/// Batch-wide values bound onto every parent row.
#[derive(Debug, Clone)]
pub struct WriteScope {
    pub context: AcademicContext,
    pub options: ImportOptions,
}

/// A parent row committed by a chunk, with the children written under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedSet {
    /// 0-based position of the set in the submitted batch.
    pub index: usize,
    pub id: Uuid,
    pub stats: ImportStats,
}

#[rocket::async_trait]
pub trait ContentStore: Send + Sync {
    /// Write every set of `chunk` in one transaction. Either all sets are
    /// created or none are.
    async fn write_chunk(
        &self,
        chunk: &[PreparedSet],
        scope: &WriteScope,
    ) -> Result<Vec<CreatedSet>, ChunkError>;

    /// Delete previously created parents of `kind`; their children cascade.
    async fn discard(&self, kind: ContentKind, ids: &[Uuid]) -> Result<u64, ChunkError>;
}

/// Time limits applied to each chunk transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionBudget {
    /// Longest wait for a pooled connection before the chunk fails.
    pub acquire_timeout: Duration,
    /// Longest a chunk may run, enforced both server-side and client-side.
    pub transaction_timeout: Duration,
}

impl Default for TransactionBudget {
    fn default() -> Self {
        Self {
            acquire_timeout: Duration::from_secs(5),
            transaction_timeout: Duration::from_secs(20),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgContentStore {
    pool: PgPool,
    budget: TransactionBudget,
}

impl PgContentStore {
    pub fn new(pool: PgPool, budget: TransactionBudget) -> Self {
        Self { pool, budget }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[rocket::async_trait]
impl ContentStore for PgContentStore {
    async fn write_chunk(
        &self,
        chunk: &[PreparedSet],
        scope: &WriteScope,
    ) -> Result<Vec<CreatedSet>, ChunkError> {
        let started = Instant::now();
        let budget = self.budget;

        let mut transaction = match timeout(budget.acquire_timeout, self.pool.begin()).await {
            Ok(result) => result.map_err(ChunkError::Connect)?,
            Err(_) => return Err(ChunkError::AcquireTimeout(budget.acquire_timeout)),
        };

        let work = async {
            // Postgres cancels any statement that outlives the chunk budget.
            let statement_timeout = format!(
                "SET LOCAL statement_timeout = {}",
                budget.transaction_timeout.as_millis()
            );
            sqlx::query(&statement_timeout)
                .execute(&mut *transaction)
                .await?;

            let mut created = Vec::with_capacity(chunk.len());
            for set in chunk {
                created.push(write_set(&mut transaction, set, scope).await?);
            }
            Ok::<_, sqlx::Error>(created)
        };

        // Dropping the transaction on any early return rolls the chunk back.
        let created = match timeout(budget.transaction_timeout, work).await {
            Ok(result) => result?,
            Err(_) => return Err(ChunkError::TransactionTimeout(budget.transaction_timeout)),
        };

        transaction.commit().await?;

        log::debug!(
            "committed chunk of {} sets in {:.2}ms",
            created.len(),
            started.elapsed().as_secs_f64() * 1000.0
        );
        Ok(created)
    }

    async fn discard(&self, kind: ContentKind, ids: &[Uuid]) -> Result<u64, ChunkError> {
        let mut transaction = match timeout(self.budget.acquire_timeout, self.pool.begin()).await {
            Ok(result) => result.map_err(ChunkError::Connect)?,
            Err(_) => return Err(ChunkError::AcquireTimeout(self.budget.acquire_timeout)),
        };

        let deleted = match kind {
            ContentKind::Quiz => database_operations::delete_quizzes(&mut transaction, ids).await?,
            ContentKind::Flashcard => {
                database_operations::delete_flashcard_sets(&mut transaction, ids).await?
            }
        };

        transaction.commit().await?;
        Ok(deleted)
    }
}

async fn write_set(
    conn: &mut PgConnection,
    set: &PreparedSet,
    scope: &WriteScope,
) -> Result<CreatedSet, sqlx::Error> {
    let mut stats = ImportStats {
        sets: 1,
        ..Default::default()
    };

    match &set.children {
        PreparedChildren::Quiz { questions, options } => {
            database_operations::insert_quiz(conn, &set.parent, &scope.context, &scope.options)
                .await?;
            stats.questions = database_operations::insert_questions_batch(conn, questions).await?;
            stats.options = database_operations::insert_options_batch(conn, options).await?;
        }
        PreparedChildren::Flashcard { cards } => {
            database_operations::insert_flashcard_set(
                conn,
                &set.parent,
                &scope.context,
                &scope.options,
            )
            .await?;
            stats.cards = database_operations::insert_cards_batch(conn, cards).await?;
        }
    }

    Ok(CreatedSet {
        index: set.label.index,
        id: set.parent.id,
        stats,
    })
}
