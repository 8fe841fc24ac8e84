use apalis_sql::postgres::PostgresStorage;
use sqlx::PgPool;

use crate::error::{BrokerError, Result};
use crate::tasks::{QUEUE_CPU_TASKS, QUEUE_GPU_TASKS, TaskEnvelope};

/// `gpu_tasks` / `cpu_tasks`, spec.md §6 — two durable queues over the same
/// Postgres database `confab-store` already owns, via `apalis-sql`'s
/// Postgres storage backend (see DESIGN.md: `apalis`/`apalis-cron` are
/// already teacher workspace dependencies with no shipped storage backend).
#[derive(Clone)]
pub struct TaskQueues {
    gpu: PostgresStorage<TaskEnvelope>,
    cpu: PostgresStorage<TaskEnvelope>,
}

impl TaskQueues {
    /// Connects to both queue tables, creating them if absent. `gpu_tasks`
    /// workers are run with a consumer concurrency of 1 (spec.md §5: "model
    /// serialization on a single device") — that constraint lives in the
    /// worker's `WorkerBuilder`, not here.
    pub async fn connect(pool: PgPool) -> Result<Self> {
        PostgresStorage::setup(&pool)
            .await
            .map_err(|e| BrokerError::Database(sqlx::Error::Configuration(Box::new(e))))?;

        let gpu = PostgresStorage::new_with_config(
            pool.clone(),
            apalis_sql::Config::new(QUEUE_GPU_TASKS),
        );
        let cpu = PostgresStorage::new_with_config(pool, apalis_sql::Config::new(QUEUE_CPU_TASKS));

        Ok(Self { gpu, cpu })
    }

    /// A clone of the `gpu_tasks` storage, handed to `apps/worker`'s
    /// `WorkerBuilder` for consumption.
    pub fn gpu_storage(&self) -> PostgresStorage<TaskEnvelope> {
        self.gpu.clone()
    }

    pub fn cpu_storage(&self) -> PostgresStorage<TaskEnvelope> {
        self.cpu.clone()
    }

    /// Routes `task` to its named queue (spec.md §6 routing rule) and
    /// enqueues it. The Controller calls this only after writing the
    /// matching status (spec.md §5 ordering guarantee), never before.
    pub async fn enqueue(&mut self, task: TaskEnvelope) -> Result<()> {
        use apalis::prelude::Storage;

        let queue_name = task.queue_name();
        let storage = if queue_name == QUEUE_GPU_TASKS {
            &mut self.gpu
        } else {
            &mut self.cpu
        };

        storage
            .push(task)
            .await
            .map_err(|e| BrokerError::Enqueue(e.to_string()))?;
        Ok(())
    }
}
