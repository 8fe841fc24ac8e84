//! Mirrors `apps/api/src/routes/meeting.rs`'s `StatusEnvelope`/`publish_update`
//! shape so clients subscribed to `job_updates` see the same JSON regardless
//! of whether the Controller or a worker produced it (spec.md §4.7). The
//! worker has no axum dependency, so this is a plain struct rather than an
//! `axum::Json`-returning handler helper.

use confab_broker::{JobUpdateMessage, Publisher};
use confab_domain::{DiarizedSegmentView, Job, PlainSegmentView, WordSegment};
use confab_external::SentenceSegment;
use confab_store::Store;
use serde::Serialize;

/// Sentence-level live-UI view (spec.md §4.3): kept in seconds, not
/// `HH:MM:SS`, matching the ASR collaborator's own `SentenceSegment` shape.
/// Transient — never persisted, only ever set on the one envelope the
/// Transcription Worker publishes right after a successful ASR call.
#[derive(Debug, Serialize)]
pub struct SentenceView {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

impl From<&SentenceSegment> for SentenceView {
    fn from(s: &SentenceSegment) -> Self {
        SentenceView {
            text: s.text.clone(),
            start: s.start,
            end: s.end,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusEnvelope {
    pub request_id: String,
    pub status: String,
    pub bbh_name: Option<String>,
    pub meeting_type: Option<String>,
    pub meeting_host: Option<String>,
    pub language: String,
    pub plain_transcript: Option<Vec<PlainSegmentView>>,
    pub diarized_transcript: Option<Vec<DiarizedSegmentView>>,
    pub sentence_transcript: Option<Vec<SentenceView>>,
    pub error_message: Option<String>,
}

pub async fn build_envelope(store: &Store, job: &Job) -> confab_store::Result<StatusEnvelope> {
    let transcript = store.get_transcript(job.id, &job.active_language).await?;
    let diarized = store.get_diarized_transcript(job.id).await?;

    Ok(StatusEnvelope {
        request_id: job.request_id.clone(),
        status: job.status.as_str().to_string(),
        bbh_name: job.metadata.bbh_name.clone(),
        meeting_type: job.metadata.meeting_type.clone(),
        meeting_host: job.metadata.meeting_host.clone(),
        language: job.active_language.clone(),
        plain_transcript: transcript.map(|t| t.word_segments.iter().map(WordSegment::to_view).collect()),
        diarized_transcript: diarized
            .map(|d| d.speaker_segments.iter().map(|s| s.to_view(None)).collect()),
        sentence_transcript: None,
        error_message: job.error_message.clone(),
    })
}

pub async fn publish_update(publisher: &Publisher, store: &Store, job: &Job) {
    match build_envelope(store, job).await {
        Ok(envelope) => publish_envelope(publisher, &job.request_id, &envelope).await,
        Err(e) => {
            tracing::error!(error = %e, request_id = %job.request_id, "build_envelope_failed");
        }
    }
}

pub async fn publish_envelope(publisher: &Publisher, request_id: &str, envelope: &StatusEnvelope) {
    let message = JobUpdateMessage {
        request_id: request_id.to_string(),
        data: serde_json::to_value(envelope).unwrap_or(serde_json::Value::Null),
    };
    if let Err(e) = publisher.publish(&message).await {
        tracing::error!(error = %e, request_id, "publish_job_update_failed");
    }
}
