//! Stale-Job Reaper (spec.md §4.8): on a fixed period, marks every Job stuck
//! in a non-terminal status past a staleness threshold as `failed`. Publishes
//! no updates (spec.md §4.8 note) — clients only learn of the failure the
//! next time they poll or reconnect.

mod env;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use apalis::prelude::*;
use apalis_cron::{CronStream, Schedule};
use chrono::{DateTime, Utc};
use confab_store::Store;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::prelude::*;

use env::env;

/// One scheduled tick, per `apalis-cron`'s `From<DateTime<Utc>>` job idiom.
#[derive(Clone)]
struct ReaperTick(#[allow(dead_code)] DateTime<Utc>);

impl From<DateTime<Utc>> for ReaperTick {
    fn from(at: DateTime<Utc>) -> Self {
        ReaperTick(at)
    }
}

struct ReaperContext {
    store: Store,
    stale_threshold_days: u64,
}

async fn sweep(_tick: ReaperTick, ctx: Data<Arc<ReaperContext>>) -> Result<(), Error> {
    let threshold = chrono::Duration::days(ctx.stale_threshold_days as i64);
    let failed = ctx
        .store
        .reap_stale_jobs(threshold, "stale job reaped by background sweep")
        .await
        .map_err(|e| Error::Failed(Arc::new(Box::new(e))))?;

    if failed.is_empty() {
        tracing::debug!("reaper_sweep_found_nothing_stale");
    } else {
        tracing::info!(count = failed.len(), request_ids = ?failed, "reaper_sweep_marked_jobs_failed");
    }
    Ok(())
}

/// Builds a 6-field (sec min hour day month dow) cron expression firing every
/// `period_hours` hours, on the hour. Only exact divisors of 24 produce an
/// evenly spaced schedule; any other value still runs, just not evenly.
fn cron_expression(period_hours: u64) -> String {
    format!("0 0 */{} * * *", period_hours.max(1))
}

fn main() -> anyhow::Result<()> {
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .expect("failed to install rustls crypto provider");

    let cfg = env();

    let _guard = sentry::init(sentry::ClientOptions {
        dsn: cfg.sentry_dsn.as_ref().and_then(|s| s.parse().ok()),
        release: option_env!("APP_VERSION").map(|v| format!("confab-reaper@{}", v).into()),
        environment: Some(
            if cfg!(debug_assertions) {
                "development"
            } else {
                "production"
            }
            .into(),
        ),
        traces_sample_rate: 1.0,
        sample_rate: 1.0,
        send_default_pii: true,
        auto_session_tracking: true,
        attach_stacktrace: true,
        max_breadcrumbs: 100,
        ..Default::default()
    });

    sentry::configure_scope(|scope| {
        scope.set_tag("service", "confab-reaper");
    });

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(sentry::integrations::tracing::layer())
        .init();

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?
        .block_on(run())?;

    if let Some(client) = sentry::Hub::current().client() {
        client.close(Some(Duration::from_secs(2)));
    }

    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let cfg = env();

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&cfg.database.database_url)
        .await
        .expect("failed to connect to database");

    let store = Store::new(pool);
    let ctx = Arc::new(ReaperContext {
        store,
        stale_threshold_days: cfg.reaper_stale_threshold_days,
    });

    let expression = cron_expression(cfg.reaper_period_hours);
    tracing::info!(
        period_hours = cfg.reaper_period_hours,
        stale_threshold_days = cfg.reaper_stale_threshold_days,
        cron = %expression,
        "reaper_starting"
    );

    let schedule = Schedule::from_str(&expression).expect("invalid reaper cron expression");

    let worker = WorkerBuilder::new("confab-reaper")
        .data(ctx)
        .backend(CronStream::new(schedule))
        .build_fn(sweep);

    Monitor::new()
        .register(worker)
        .shutdown_timeout(Duration::from_secs(10))
        .run_with_signal(async {
            tokio::signal::ctrl_c().await?;
            tracing::info!("shutdown_signal_received");
            Ok(())
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cron_expression_uses_configured_period() {
        assert_eq!(cron_expression(6), "0 0 */6 * * *");
    }

    #[test]
    fn cron_expression_floors_zero_to_one() {
        assert_eq!(cron_expression(0), "0 0 */1 * * *");
    }
}
