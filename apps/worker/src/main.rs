mod assemble;
mod audio;
mod context;
mod diarize;
mod env;
mod envelope;
mod transcribe;

use std::sync::Arc;
use std::time::Duration;

use apalis::prelude::*;
use clap::{Parser, ValueEnum};
use confab_broker::{Publisher, TaskEnvelope, TaskQueues};
use confab_external::{Asr, DiarizationParams, Diarizer, SpeakerStore};
use confab_store::{ObjectStore, Store};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::prelude::*;

use env::env;

/// Which of the three task kinds this process instance handles, spec.md §4
/// "one binary, selectable task family": dedicated pools of Assembler,
/// Transcription, and Diarization workers all draw from the same physical
/// `gpu_tasks` queue (spec.md §6 routing rule), each process only acting on
/// the family it was started with and putting everything else straight back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TaskFamily {
    Assemble,
    Transcribe,
    Diarize,
}

impl TaskFamily {
    fn matches(self, task: &TaskEnvelope) -> bool {
        matches!(
            (self, task),
            (TaskFamily::Assemble, TaskEnvelope::Assemble { .. })
                | (TaskFamily::Transcribe, TaskEnvelope::Transcribe { .. })
                | (TaskFamily::Diarize, TaskEnvelope::Diarize { .. })
        )
    }
}

#[derive(Debug, Parser)]
#[command(name = "confab-worker")]
struct Cli {
    /// Task family this process consumes from `gpu_tasks`.
    #[arg(long, value_enum)]
    family: TaskFamily,

    /// Number of tasks this process runs concurrently. spec.md §5: GPU work
    /// is serialized on a single device, so this should stay at 1 unless the
    /// deployment genuinely has multiple GPUs behind one worker process.
    #[arg(long, default_value_t = 1)]
    concurrency: usize,
}

struct WorkerContext {
    store: Store,
    objects: ObjectStore,
    queues: tokio::sync::Mutex<TaskQueues>,
    publisher: Publisher,
    asr: Arc<dyn Asr>,
    diarizer: Arc<dyn Diarizer>,
    speaker_store: Arc<dyn SpeakerStore>,
    diarization_params: DiarizationParams,
    family: TaskFamily,
}

async fn handle_task(task: TaskEnvelope, ctx: Data<Arc<WorkerContext>>) -> Result<(), Error> {
    if !ctx.family.matches(&task) {
        // Not this process's family: put it back for a differently-family'd
        // worker process to pick up.
        ctx.queues.lock().await.enqueue(task).await.map_err(|e| Error::Failed(Arc::new(Box::new(e))))?;
        return Ok(());
    }

    let result = match &task {
        TaskEnvelope::Assemble { request_id } => {
            assemble::run(
                &ctx.store,
                &ctx.objects,
                &mut *ctx.queues.lock().await,
                &ctx.publisher,
                request_id,
            )
            .await
        }
        TaskEnvelope::Transcribe { request_id, language } => {
            transcribe::run(
                &ctx.store,
                &ctx.objects,
                &ctx.publisher,
                ctx.asr.as_ref(),
                request_id,
                language,
            )
            .await
        }
        TaskEnvelope::Diarize { request_id } => {
            diarize::run(
                &ctx.store,
                &ctx.objects,
                &ctx.publisher,
                ctx.diarizer.as_ref(),
                ctx.speaker_store.as_ref(),
                ctx.diarization_params,
                request_id,
            )
            .await
        }
    };

    result.map_err(|e| Error::Failed(Arc::new(e.into())))
}

fn main() -> anyhow::Result<()> {
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .expect("failed to install rustls crypto provider");

    let cli = Cli::parse();
    let cfg = env();

    let _guard = sentry::init(sentry::ClientOptions {
        dsn: cfg.sentry_dsn.as_ref().and_then(|s| s.parse().ok()),
        release: option_env!("APP_VERSION").map(|v| format!("confab-worker@{}", v).into()),
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
        scope.set_tag("service", "confab-worker");
        scope.set_tag("task_family", format!("{:?}", cli.family));
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
        .worker_threads(cli.concurrency.max(1))
        .enable_all()
        .build()?
        .block_on(run(cli))?;

    if let Some(client) = sentry::Hub::current().client() {
        client.close(Some(Duration::from_secs(2)));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_matches_only_its_own_task_kind() {
        assert!(TaskFamily::Assemble.matches(&TaskEnvelope::Assemble {
            request_id: "r1".into()
        }));
        assert!(!TaskFamily::Assemble.matches(&TaskEnvelope::Diarize {
            request_id: "r1".into()
        }));
        assert!(TaskFamily::Transcribe.matches(&TaskEnvelope::Transcribe {
            request_id: "r1".into(),
            language: "en".into(),
        }));
        assert!(!TaskFamily::Diarize.matches(&TaskEnvelope::Transcribe {
            request_id: "r1".into(),
            language: "en".into(),
        }));
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = env();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&cfg.database.database_url)
        .await
        .expect("failed to connect to database");

    let store = Store::new(pool.clone());
    let objects = ObjectStore::new(cfg.objects.shared_audio_path.clone());
    let queues = TaskQueues::connect(pool.clone())
        .await
        .expect("failed to connect task queues");
    let publisher = Publisher::new(pool.clone());

    let worker_ctx = Arc::new(WorkerContext {
        store,
        objects,
        queues: tokio::sync::Mutex::new(queues.clone()),
        publisher,
        asr: context::asr(cfg),
        diarizer: context::diarizer(cfg),
        speaker_store: context::speaker_store(cfg),
        diarization_params: context::diarization_params(cfg),
        family: cli.family,
    });

    tracing::info!(family = ?cli.family, concurrency = cli.concurrency, "worker_starting");

    let gpu_storage = queues.gpu_storage();

    let worker = WorkerBuilder::new(format!("confab-worker-{:?}", cli.family))
        .concurrency(cli.concurrency)
        .data(worker_ctx)
        .backend(gpu_storage)
        .build_fn(handle_task);

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
