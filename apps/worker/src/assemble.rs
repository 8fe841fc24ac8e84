//! Assembler Worker (spec.md §4.2): concatenates uploaded chunks into one
//! normalized WAV, then hands the Job to the Transcription Worker.

use confab_broker::{Publisher, TaskEnvelope, TaskQueues};
use confab_domain::JobStatus;
use confab_store::{ObjectStore, Store, StoreError};

use crate::audio;
use crate::envelope::publish_update;

pub async fn run(
    store: &Store,
    objects: &ObjectStore,
    queues: &mut TaskQueues,
    publisher: &Publisher,
    request_id: &str,
) -> anyhow::Result<()> {
    let job = match store.get_job(request_id).await {
        Ok(job) => job,
        // Job was cancelled/deleted before the task was picked up: abort silently
        // (spec.md §8 "a worker observing a deleted Job aborts without error").
        Err(StoreError::NotFound) => {
            tracing::info!(request_id, "assemble_task_skipped_job_missing");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if job.status != JobStatus::Assembling {
        // Re-delivered task for a Job that already advanced: no-op.
        tracing::info!(request_id, status = %job.status, "assemble_task_skipped_wrong_status");
        return Ok(());
    }

    let chunks = objects.list_chunks_sorted(request_id).await?;

    if chunks.is_empty() {
        store
            .mark_failed(request_id, "no uploaded chunks to assemble")
            .await?;
        // A concurrent cancel (permitted while `Assembling`) may have deleted
        // the row between the checks above and here; that race is a no-op,
        // not a task failure (spec.md §5: "aborts silently").
        match store.get_job(request_id).await {
            Ok(job) => publish_update(publisher, store, &job).await,
            Err(StoreError::NotFound) => {
                tracing::info!(request_id, "assemble_task_job_cancelled_during_failure");
            }
            Err(e) => return Err(e.into()),
        }
        return Ok(());
    }

    let output_path = objects.assembled_audio_path(request_id, &job.original_filename);
    if let Err(e) = audio::assemble_to_wav(&chunks, &output_path) {
        tracing::error!(request_id, error = %e, "assemble_to_wav_failed");
        store.mark_failed(request_id, &e.to_string()).await?;
        match store.get_job(request_id).await {
            Ok(job) => publish_update(publisher, store, &job).await,
            Err(StoreError::NotFound) => {
                tracing::info!(request_id, "assemble_task_job_cancelled_during_failure");
            }
            Err(e) => return Err(e.into()),
        }
        return Ok(());
    }

    objects.delete_chunks(&chunks).await?;
    store.set_status(request_id, JobStatus::Transcribing).await?;

    let job = store.get_job(request_id).await?;
    publish_update(publisher, store, &job).await;

    queues
        .enqueue(TaskEnvelope::Transcribe {
            request_id: request_id.to_string(),
            language: job.active_language.clone(),
        })
        .await?;

    Ok(())
}
