use utoipa::OpenApi;

use crate::routes::health;
use crate::routes::meeting::{StatusEnvelope, SummaryResponse};

/// Aggregated OpenAPI document for the meeting-processing HTTP surface
/// (spec.md §6). Most routes here take multipart/urlencoded bodies utoipa
/// cannot derive automatically (teacher idiom: `hypr-transcribe-proxy`'s
/// `openapi()` has the same gap for its upload routes) — this document
/// exists mainly so `/openapi.json` always returns the shared domain
/// schemas, not a route-by-route contract test.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Confab Meeting API",
        version = "0.1.0",
        description = "Meeting-processing job orchestration: upload, transcription, diarization, summaries and chat"
    ),
    paths(health::health),
    components(schemas(
        StatusEnvelope,
        SummaryResponse,
        confab_domain::MeetingMetadata,
        confab_domain::JobStatus,
        confab_domain::SummaryType,
        confab_domain::WordSegment,
        confab_domain::SpeakerSegment,
        confab_domain::PlainSegmentView,
        confab_domain::DiarizedSegmentView,
        confab_domain::MeetingContextHeader,
        confab_domain::ChatRole,
    )),
    tags((name = "meeting", description = "Meeting job lifecycle, transcripts, summaries and chat"))
)]
pub struct ApiDoc;

pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
