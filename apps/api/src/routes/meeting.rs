use axum::Json;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use confab_broker::{JobUpdateMessage, TaskEnvelope};
use confab_domain::{
    DiarizedSegmentView, Job, MeetingContextHeader, MeetingMetadata, PlainSegmentView, SummaryType,
    WordSegment,
};
use confab_store::LanguageChangeOutcome;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{ensure_owner, resolve_user};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// HTTP-facing status envelope (spec.md §6). One struct shared by every
/// route that returns the current state of a Job.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct StatusEnvelope {
    pub request_id: String,
    pub status: String,
    pub bbh_name: Option<String>,
    pub meeting_type: Option<String>,
    pub meeting_host: Option<String>,
    pub language: String,
    pub plain_transcript: Option<Vec<PlainSegmentView>>,
    pub diarized_transcript: Option<Vec<DiarizedSegmentView>>,
    pub error_message: Option<String>,
}

pub(crate) async fn build_envelope(state: &AppState, job: &Job) -> ApiResult<StatusEnvelope> {
    let transcript = state
        .store
        .get_transcript(job.id, &job.active_language)
        .await?;
    let diarized = state.store.get_diarized_transcript(job.id).await?;

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
        error_message: job.error_message.clone(),
    })
}

async fn publish_update(state: &AppState, request_id: &str, envelope: &StatusEnvelope) {
    let message = JobUpdateMessage {
        request_id: request_id.to_string(),
        data: serde_json::to_value(envelope).unwrap_or(serde_json::Value::Null),
    };
    if let Err(e) = state.publisher.publish(&message).await {
        tracing::error!(error = %e, request_id, "publish_job_update_failed");
    }
}

// ---- start-bbh ----------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct StartForm {
    #[serde(rename = "requestId")]
    pub request_id: String,
    pub username: String,
    pub language: String,
    pub filename: String,
    #[serde(rename = "bbhName")]
    pub bbh_name: Option<String>,
    #[serde(rename = "Type")]
    pub meeting_type: Option<String>,
    #[serde(rename = "Host")]
    pub meeting_host: Option<String>,
    #[serde(rename = "meetingMembers")]
    pub meeting_members: String,
}

pub async fn start(
    State(state): State<AppState>,
    axum::Form(form): axum::Form<StartForm>,
) -> ApiResult<impl IntoResponse> {
    let members: Vec<String> = serde_json::from_str(&form.meeting_members)
        .map_err(|e| ApiError::InvalidInput(format!("meetingMembers: {e}")))?;

    let owner_id = resolve_user(&state, &form.username).await?;
    let metadata = MeetingMetadata {
        bbh_name: form.bbh_name,
        meeting_type: form.meeting_type,
        meeting_host: form.meeting_host,
        meeting_members: members,
    };

    let job = state
        .store
        .start(
            &form.request_id,
            owner_id,
            &form.language,
            &form.filename,
            &metadata,
        )
        .await?;
    state.objects.ensure_job_dir(&job.request_id).await.map_err(anyhow_from_store)?;

    let envelope = build_envelope(&state, &job).await?;
    Ok((StatusCode::CREATED, Json(envelope)))
}

fn anyhow_from_store(e: confab_store::StoreError) -> ApiError {
    e.into()
}

// ---- upload-file-chunk ---------------------------------------------------

pub async fn upload_chunk(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut request_id: Option<String> = None;
    let mut is_last = false;
    let mut chunk_filename: Option<String> = None;
    let mut bytes: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidInput(e.to_string()))?
    {
        match field.name().unwrap_or_default() {
            "requestId" => {
                request_id = Some(field.text().await.map_err(|e| ApiError::InvalidInput(e.to_string()))?);
            }
            "isLastChunk" => {
                let text = field.text().await.map_err(|e| ApiError::InvalidInput(e.to_string()))?;
                is_last = text.eq_ignore_ascii_case("true") || text == "1";
            }
            "FileData" => {
                chunk_filename = field.file_name().map(str::to_string);
                bytes = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::InvalidInput(e.to_string()))?
                        .to_vec(),
                );
            }
            _ => {}
        }
    }

    let request_id = request_id.ok_or_else(|| ApiError::InvalidInput("missing requestId".into()))?;
    let chunk_filename =
        chunk_filename.ok_or_else(|| ApiError::InvalidInput("missing FileData filename".into()))?;
    let bytes = bytes.ok_or_else(|| ApiError::InvalidInput("missing FileData".into()))?;

    // Existence check only; the `uploading` precondition is enforced by
    // `record_chunk`'s transactional read-check-write below (spec.md §9:
    // "state checks are the gate, not the API path").
    state.store.get_job(&request_id).await?;

    state
        .objects
        .write_chunk(&request_id, &chunk_filename, &bytes)
        .await
        .map_err(anyhow_from_store)?;

    // `is_first` is passed unconditionally true: the underlying COALESCE
    // only sets `upload_started_at` once, so a non-first call with this
    // flag is a no-op for that column (confab-store's `record_chunk`).
    let job = state.store.record_chunk(&request_id, true, is_last).await?;

    if is_last {
        let mut queues = state.queues.lock().await;
        queues
            .enqueue(TaskEnvelope::Assemble {
                request_id: request_id.clone(),
            })
            .await
            .map_err(ApiError::from)?;
        drop(queues);

        let envelope = build_envelope(&state, &job).await?;
        publish_update(&state, &request_id, &envelope).await;
    }

    Ok(StatusCode::ACCEPTED)
}

// ---- diarize --------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct UsernameQuery {
    pub username: String,
}

pub async fn trigger_diarize(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Query(q): Query<UsernameQuery>,
) -> ApiResult<impl IntoResponse> {
    let caller = resolve_user(&state, &q.username).await?;
    let job = state.store.get_job(&request_id).await?;
    ensure_owner(&job, caller)?;

    if !state
        .objects
        .assembled_audio_exists(&request_id, &job.original_filename)
        .await
    {
        return Err(ApiError::InvalidState("assembled audio not found".into()));
    }

    let job = state.store.begin_diarize(&request_id).await?;

    let mut queues = state.queues.lock().await;
    queues
        .enqueue(TaskEnvelope::Diarize {
            request_id: request_id.clone(),
        })
        .await
        .map_err(ApiError::from)?;
    drop(queues);

    let envelope = build_envelope(&state, &job).await?;
    publish_update(&state, &request_id, &envelope).await;

    Ok(StatusCode::ACCEPTED)
}

// ---- status ---------------------------------------------------------------

pub async fn get_status(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Query(q): Query<UsernameQuery>,
) -> ApiResult<impl IntoResponse> {
    let caller = resolve_user(&state, &q.username).await?;
    let job = state.store.get_job(&request_id).await?;
    ensure_owner(&job, caller)?;

    let envelope = build_envelope(&state, &job).await?;
    Ok(Json(envelope))
}

// ---- info -------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct UpdateInfoBody {
    pub bbh_name: Option<String>,
    pub meeting_type: Option<String>,
    pub meeting_host: Option<String>,
}

pub async fn update_info(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Json(body): Json<UpdateInfoBody>,
) -> ApiResult<impl IntoResponse> {
    let job = state
        .store
        .update_info(&request_id, body.bbh_name, body.meeting_type, body.meeting_host)
        .await?;

    let envelope = build_envelope(&state, &job).await?;
    publish_update(&state, &request_id, &envelope).await;
    Ok(Json(envelope))
}

// ---- language ---------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ChangeLanguageBody {
    pub language: String,
}

pub async fn change_language(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Json(body): Json<ChangeLanguageBody>,
) -> ApiResult<impl IntoResponse> {
    let (job, outcome) = state.store.change_language(&request_id, &body.language).await?;

    if outcome == LanguageChangeOutcome::NeedsTranscription {
        let mut queues = state.queues.lock().await;
        queues
            .enqueue(TaskEnvelope::Transcribe {
                request_id: request_id.clone(),
                language: body.language.clone(),
            })
            .await
            .map_err(ApiError::from)?;
    }

    let envelope = build_envelope(&state, &job).await?;
    if outcome != LanguageChangeOutcome::Unchanged {
        publish_update(&state, &request_id, &envelope).await;
    }
    Ok(Json(envelope))
}

// ---- transcript/plain ---------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct EditSegment {
    pub id: Option<Uuid>,
    pub text: String,
    pub start_time: f64,
    pub end_time: f64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTranscriptBody {
    pub segments: Vec<EditSegment>,
}

pub async fn update_transcript(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Json(body): Json<UpdateTranscriptBody>,
) -> ApiResult<impl IntoResponse> {
    let segments = body
        .segments
        .into_iter()
        .map(|s| WordSegment {
            id: s.id,
            text: s.text,
            start: s.start_time,
            end: s.end_time,
        })
        .collect();

    let job = state.store.update_plain_transcript(&request_id, segments).await?;

    let envelope = build_envelope(&state, &job).await?;
    publish_update(&state, &request_id, &envelope).await;
    Ok(Json(envelope))
}

// ---- cancel -----------------------------------------------------------

pub async fn cancel(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Query(q): Query<UsernameQuery>,
) -> ApiResult<impl IntoResponse> {
    let caller = resolve_user(&state, &q.username).await?;
    let job = state.store.get_job(&request_id).await?;
    ensure_owner(&job, caller)?;

    state.store.cancel(&request_id).await?;
    state
        .objects
        .delete_job_dir(&request_id)
        .await
        .map_err(anyhow_from_store)?;

    let message = JobUpdateMessage {
        request_id: request_id.clone(),
        data: serde_json::json!({"request_id": request_id, "status": "cancelled"}),
    };
    if let Err(e) = state.publisher.publish(&message).await {
        tracing::error!(error = %e, request_id, "publish_cancel_failed");
    }

    Ok(StatusCode::OK)
}

// ---- summary ------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SummaryRequestBody {
    pub summary_type: SummaryType,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SummaryResponse {
    pub request_id: String,
    pub summary_type: SummaryType,
    pub summary_content: String,
}

pub async fn summary(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Json(body): Json<SummaryRequestBody>,
) -> ApiResult<impl IntoResponse> {
    let job = state.store.get_job(&request_id).await?;
    let summary_type = body.summary_type;

    if let Some(existing) = state.store.get_summary(job.id, summary_type).await? {
        return Ok(Json(SummaryResponse {
            request_id,
            summary_type,
            summary_content: existing.content,
        }));
    }

    let content = generate_summary(&state, &job, summary_type).await?;
    state.store.put_summary(job.id, summary_type, &content).await?;

    Ok(Json(SummaryResponse {
        request_id,
        summary_type,
        summary_content: content,
    }))
}

async fn generate_summary(state: &AppState, job: &Job, summary_type: SummaryType) -> ApiResult<String> {
    let source_text = if summary_type == SummaryType::Speaker {
        let diarized = state
            .store
            .get_diarized_transcript(job.id)
            .await?
            .ok_or_else(|| ApiError::InvalidState("no diarized transcript".into()))?;
        diarized
            .speaker_segments
            .iter()
            .map(|s| format!("{}: {}", s.speaker, s.text))
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        let transcript = state
            .store
            .get_transcript(job.id, &job.active_language)
            .await?
            .ok_or_else(|| ApiError::InvalidState("no transcript for active language".into()))?;
        transcript
            .word_segments
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    };

    if summary_type.is_templated() {
        let at = job.upload_started_at.unwrap_or(job.created_at);
        let header = MeetingContextHeader::build(at);
        let prefixed = format!("{}{}", header.as_prefix(), source_text);
        let structured = state
            .llm
            .summarize_templated(summary_type, &prefixed, &job.metadata, &header)
            .await?;
        Ok(structured.to_string())
    } else {
        Ok(state
            .llm
            .summarize(summary_type, &source_text, &job.metadata)
            .await?)
    }
}

// ---- chat ---------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    #[serde(rename = "requestId")]
    pub request_id: String,
    pub username: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

pub async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatBody>,
) -> ApiResult<impl IntoResponse> {
    let caller = resolve_user(&state, &body.username).await?;
    let job = state.store.get_job(&body.request_id).await?;
    ensure_owner(&job, caller)?;

    let response = state.chat.chat(&job, &body.message).await?;
    Ok(Json(ChatResponse { response }))
}

// ---- downloads ------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct DownloadDocumentQuery {
    pub username: String,
    pub summary_type: SummaryType,
}

pub async fn download_audio(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Query(q): Query<UsernameQuery>,
) -> ApiResult<impl IntoResponse> {
    let caller = resolve_user(&state, &q.username).await?;
    let job = state.store.get_job(&request_id).await?;
    ensure_owner(&job, caller)?;

    let path = state
        .objects
        .assembled_audio_path(&request_id, &job.original_filename);
    let bytes = tokio::fs::read(&path).await.map_err(|_| ApiError::NotFound)?;

    Ok(([(header::CONTENT_TYPE, "audio/wav")], bytes))
}

pub async fn download_document(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Query(q): Query<DownloadDocumentQuery>,
) -> ApiResult<impl IntoResponse> {
    let caller = resolve_user(&state, &q.username).await?;
    let job = state.store.get_job(&request_id).await?;
    ensure_owner(&job, caller)?;

    let summary_type = q.summary_type;
    let summary = state
        .store
        .get_summary(job.id, summary_type)
        .await?
        .ok_or(ApiError::NotFound)?;

    let bytes = if summary_type.is_templated() {
        let structured: serde_json::Value = serde_json::from_str(&summary.content)
            .map_err(|e| ApiError::InvalidInput(format!("stored summary is not valid json: {e}")))?;
        state.docx.render_templated(summary_type, &structured).await?
    } else {
        state
            .docx
            .render_markdown(summary_type.as_str(), &summary.content)
            .await?
    };

    Ok((
        [(
            header::CONTENT_TYPE,
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        )],
        bytes,
    ))
}
