use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use sqlx::postgres::PgListener;

use crate::error::{BrokerError, Result};
use crate::tasks::TOPIC_JOB_UPDATES;

/// `job_updates` pub/sub message, spec.md §6: `{"request_id": "...", "data": <status envelope or partial>}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobUpdateMessage {
    pub request_id: String,
    pub data: serde_json::Value,
}

/// Publishes on `job_updates` via Postgres `NOTIFY`, independent of which
/// process produced the update (Controller or any worker) — spec.md §4.7.
#[derive(Clone)]
pub struct Publisher {
    pool: PgPool,
}

impl Publisher {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn publish(&self, message: &JobUpdateMessage) -> Result<()> {
        let payload = serde_json::to_string(message)
            .map_err(|e| BrokerError::Publish(e.to_string()))?;
        sqlx::query("SELECT pg_notify($1, $2)")
            .bind(TOPIC_JOB_UPDATES)
            .bind(payload)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// The single long-running subscriber on `job_updates` (spec.md §4.7, §9:
/// "keep a single listener... per front-end process; do not create a
/// subscriber per client"). `confab-bus` drives this to fan out to
/// registered client handles.
pub struct Subscriber {
    listener: PgListener,
}

impl Subscriber {
    pub async fn connect(pool: &PgPool) -> Result<Self> {
        let mut listener = PgListener::connect_with(pool).await?;
        listener.listen(TOPIC_JOB_UPDATES).await?;
        Ok(Self { listener })
    }

    /// Blocks until the next message arrives. Malformed payloads are
    /// skipped with a log line rather than killing the subscriber loop —
    /// one bad publish must not stop fan-out for every other job.
    pub async fn recv(&mut self) -> Result<JobUpdateMessage> {
        loop {
            let notification = self.listener.recv().await?;
            match serde_json::from_str::<JobUpdateMessage>(notification.payload()) {
                Ok(message) => return Ok(message),
                Err(e) => {
                    tracing::warn!(error = %e, "dropping_malformed_job_update_notification");
                    continue;
                }
            }
        }
    }
}
