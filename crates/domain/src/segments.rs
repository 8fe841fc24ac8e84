use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One word of a language-scoped [`crate::Transcript`], seconds-based to
/// match the external ASR collaborator's output
/// (`original_source/app/processing/mapper.py` works in `start`/`end`
/// seconds, not milliseconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct WordSegment {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub text: String,
    pub start: f64,
    pub end: f64,
}

/// One contiguous speaker segment of a [`crate::DiarizedTranscript`],
/// produced by the Mapper (spec.md §4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SpeakerSegment {
    pub speaker: String,
    pub text: String,
    pub start: f64,
    pub end: f64,
}

/// A raw diarizer region, before mapping: `{start, end, speaker_label}` per
/// spec.md §4.4.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerRegion {
    pub start: f64,
    pub end: f64,
    pub speaker_label: String,
}

/// HTTP-facing word view with `HH:MM:SS` formatted times (status envelope,
/// spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PlainSegmentView {
    pub id: Option<Uuid>,
    pub text: String,
    pub start_time: String,
    pub end_time: String,
}

/// HTTP-facing speaker segment view with `HH:MM:SS` formatted times.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DiarizedSegmentView {
    pub id: Option<Uuid>,
    pub speaker: String,
    pub text: String,
    pub start_time: String,
    pub end_time: String,
}

impl WordSegment {
    pub fn to_view(&self) -> PlainSegmentView {
        PlainSegmentView {
            id: self.id,
            text: self.text.clone(),
            start_time: crate::timestamp::format_hhmmss(self.start),
            end_time: crate::timestamp::format_hhmmss(self.end),
        }
    }
}

impl SpeakerSegment {
    pub fn to_view(&self, id: Option<Uuid>) -> DiarizedSegmentView {
        DiarizedSegmentView {
            id,
            speaker: self.speaker.clone(),
            text: self.text.clone(),
            start_time: crate::timestamp::format_hhmmss(self.start),
            end_time: crate::timestamp::format_hhmmss(self.end),
        }
    }
}
