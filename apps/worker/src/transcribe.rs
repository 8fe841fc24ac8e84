//! Transcription Worker (spec.md §4.3): calls the out-of-scope ASR model
//! over the assembled audio and persists the word-level Transcript.

use confab_broker::Publisher;
use confab_domain::JobStatus;
use confab_store::{ObjectStore, Store, StoreError};
use confab_external::Asr;

use crate::envelope::{SentenceView, build_envelope, publish_envelope, publish_update};

pub async fn run(
    store: &Store,
    objects: &ObjectStore,
    publisher: &Publisher,
    asr: &dyn Asr,
    request_id: &str,
    language: &str,
) -> anyhow::Result<()> {
    let job = match store.get_job(request_id).await {
        Ok(job) => job,
        Err(StoreError::NotFound) => {
            tracing::info!(request_id, "transcribe_task_skipped_job_missing");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if job.status != JobStatus::Transcribing || job.active_language != language {
        tracing::info!(request_id, status = %job.status, "transcribe_task_skipped_wrong_status");
        return Ok(());
    }

    let audio_path = objects.assembled_audio_path(request_id, &job.original_filename);
    let audio_path_str = audio_path.to_string_lossy().to_string();

    let output = match asr.transcribe(&audio_path_str, language).await {
        Ok(output) => output,
        Err(e) => {
            tracing::error!(request_id, error = %e, "asr_transcribe_failed");
            store.mark_failed(request_id, &e.to_string()).await?;
            let job = store.get_job(request_id).await?;
            publish_update(publisher, store, &job).await;
            return Ok(());
        }
    };

    let sentences: Vec<SentenceView> = output.sentences.iter().map(SentenceView::from).collect();

    store
        .upsert_transcript(job.id, language, output.words)
        .await?;
    store
        .set_status(request_id, JobStatus::TranscriptionComplete)
        .await?;

    let job = store.get_job(request_id).await?;
    let mut envelope = match build_envelope(store, &job).await {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::error!(request_id, error = %e, "build_envelope_failed");
            return Ok(());
        }
    };
    envelope.sentence_transcript = Some(sentences);
    publish_envelope(publisher, request_id, &envelope).await;

    Ok(())
}
