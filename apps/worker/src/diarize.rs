//! Diarization Worker (spec.md §4.4/§4.5): runs the out-of-scope VAD +
//! embedding + clustering stack over the assembled audio, then maps its
//! speaker timeline onto the active-language Transcript's word timeline.

use confab_broker::Publisher;
use confab_domain::JobStatus;
use confab_store::{ObjectStore, Store, StoreError};
use confab_external::{DiarizationParams, Diarizer, SpeakerStore};

use crate::envelope::publish_update;

pub async fn run(
    store: &Store,
    objects: &ObjectStore,
    publisher: &Publisher,
    diarizer: &dyn Diarizer,
    speaker_store: &dyn SpeakerStore,
    params: DiarizationParams,
    request_id: &str,
) -> anyhow::Result<()> {
    let job = match store.get_job(request_id).await {
        Ok(job) => job,
        Err(StoreError::NotFound) => {
            tracing::info!(request_id, "diarize_task_skipped_job_missing");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if job.status != JobStatus::Diarizing {
        tracing::info!(request_id, status = %job.status, "diarize_task_skipped_wrong_status");
        return Ok(());
    }

    let transcript = store
        .get_transcript(job.id, &job.active_language)
        .await?
        .ok_or(StoreError::NotFound)?;

    let audio_path = objects.assembled_audio_path(request_id, &job.original_filename);
    let audio_path_str = audio_path.to_string_lossy().to_string();

    let known_profiles = speaker_store.enrolled_profiles(job.owner_id).await?;

    let regions = match diarizer
        .diarize(&audio_path_str, &known_profiles, params)
        .await
    {
        Ok(regions) => regions,
        Err(e) => {
            tracing::error!(request_id, error = %e, "diarizer_failed");
            store.mark_failed(request_id, &e.to_string()).await?;
            let job = store.get_job(request_id).await?;
            publish_update(publisher, store, &job).await;
            return Ok(());
        }
    };

    let segments = confab_mapper::map_speakers_to_words(&regions, &transcript.word_segments);

    store.replace_diarized_transcript(job.id, segments).await?;
    store.set_status(request_id, JobStatus::Completed).await?;

    let job = store.get_job(request_id).await?;
    publish_update(publisher, store, &job).await;

    Ok(())
}
