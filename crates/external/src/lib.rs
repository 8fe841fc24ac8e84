//! Trait boundaries for every out-of-scope collaborator (spec.md §1 "Out of
//! scope... specified only at their interface"): the ASR model, the speaker
//! embedding/diarization stack, the vector store of speaker profiles, the
//! LLM, and DOCX rendering.
//!
//! Grounded on `crates/transcribe-proxy/src/routes/mod.rs` and
//! `crates/llm-proxy/src/provider/openrouter.rs`'s proxy-crate shape
//! (`*Config` built from env, thin client, trait/route methods returning the
//! proxied result), generalized to a trait so callers never depend on a
//! concrete vendor. Parameter names for the diarizer come from
//! `original_source/app/processing/diarization.py`; the document-render
//! split from `original_source/app/services/document_generator.py`.

pub mod error;
pub mod stub;

use async_trait::async_trait;
use confab_domain::{MeetingMetadata, SpeakerRegion, SummaryType, WordSegment};

pub use error::{Result, UpstreamError};

/// One grouped segment of the ASR's sentence-level view, used only for live
/// UI payloads (spec.md §4.3) — never persisted.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SentenceSegment {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

/// Output of a transcription call: the word-level sequence that becomes the
/// persisted Transcript, plus the sentence-level view for the live UI
/// payload (spec.md §4.3).
#[derive(Debug, Clone)]
pub struct TranscriptionOutput {
    pub words: Vec<WordSegment>,
    pub sentences: Vec<SentenceSegment>,
}

/// The out-of-scope speech-to-text model (spec.md §1).
#[async_trait]
pub trait Asr: Send + Sync {
    async fn transcribe(&self, audio_path: &str, language: &str) -> Result<TranscriptionOutput>;
}

/// One enrolled speaker profile read from the vector store (spec.md §5
/// "Vector store: read-only from the Diarization Worker").
#[derive(Debug, Clone)]
pub struct SpeakerProfile {
    pub speaker_id: String,
    pub label: String,
    pub embedding: Vec<f32>,
}

/// The out-of-scope vector database of enrolled speaker profiles.
#[async_trait]
pub trait SpeakerStore: Send + Sync {
    async fn enrolled_profiles(&self, owner_id: uuid::Uuid) -> Result<Vec<SpeakerProfile>>;
}

/// Numeric parameters read from configuration (spec.md §4.4, §6).
#[derive(Debug, Clone, Copy)]
pub struct DiarizationParams {
    pub window_secs: f64,
    pub overlap_secs: f64,
    pub known_threshold: f64,
    pub distance_threshold: f64,
    pub merge_max_pause: f64,
    pub vad_enabled: bool,
}

/// The out-of-scope VAD + speaker-embedding + clustering stack (spec.md
/// §4.4): voice-activity detection, fixed overlapping windows, embedding per
/// window, cosine comparison against known profiles, HAC clustering of the
/// remainder, and merging of adjacent same-speaker segments.
#[async_trait]
pub trait Diarizer: Send + Sync {
    async fn diarize(
        &self,
        audio_path: &str,
        known_profiles: &[SpeakerProfile],
        params: DiarizationParams,
    ) -> Result<Vec<SpeakerRegion>>;
}

/// One structured intent-classification result (spec.md §4.6 stage 1).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatIntent {
    EditSummary,
    AskQuestion,
    GeneralChitChat,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct IntentDecision {
    pub intent: ChatIntent,
    pub entity: Option<SummaryType>,
    pub confidence: f32,
    pub edit_instruction: Option<String>,
}

/// One turn of conversational history handed to the chat completion call.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: confab_domain::ChatRole,
    pub message: String,
}

/// The out-of-scope LLM client (spec.md §1, §4.6). `prompt_for` resolves the
/// literal prompt text for a given kind — excluded from this system per
/// spec.md §1 ("Prompt text... excluded") and supplied by the binary's
/// configuration/deployment, not by this trait's implementers in-tree.
#[async_trait]
pub trait Llm: Send + Sync {
    /// Stage 1 of the chat sub-engine: classify `message` against the fixed
    /// intent-analysis system prompt.
    async fn classify_intent(&self, message: &str) -> Result<IntentDecision>;

    /// A single free-form chat completion call, given history and a final
    /// user message, under the chat system prompt.
    async fn chat(&self, history: &[ChatTurn], message: &str) -> Result<String>;

    /// Generates the content of a non-templated Markdown summary
    /// (`topic`, `speaker`, `action_items`, `decision_log`) from source text.
    async fn summarize(
        &self,
        summary_type: SummaryType,
        source_text: &str,
        metadata: &MeetingMetadata,
    ) -> Result<String>;

    /// Generates the structured JSON object for a templated summary
    /// (`summary_bbh_hdqt`, `summary_nghi_quyet`), given the source text
    /// (already prefixed with the context header) and the structured
    /// context object (spec.md §4.1 "Context header building").
    async fn summarize_templated(
        &self,
        summary_type: SummaryType,
        source_text: &str,
        metadata: &MeetingMetadata,
        context: &confab_domain::MeetingContextHeader,
    ) -> Result<serde_json::Value>;
}

/// The two document-export paths (spec.md §4.1 `downloadDocument`,
/// `document_generator.py`'s templated-vs-generic split).
#[async_trait]
pub trait DocxRenderer: Send + Sync {
    /// Renders a templated summary's structured JSON object into the
    /// matching Vietnamese meeting-minutes `.docx` template.
    async fn render_templated(
        &self,
        summary_type: SummaryType,
        structured: &serde_json::Value,
    ) -> Result<Vec<u8>>;

    /// Renders a generic Markdown summary into a plain `.docx`.
    async fn render_markdown(&self, title: &str, markdown: &str) -> Result<Vec<u8>>;
}
