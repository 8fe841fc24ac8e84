//! Concrete adapters for the trait boundaries in [`crate`]. These are
//! "thin client" implementations in the teacher's proxy-crate idiom
//! (`crates/transcribe-proxy`, `crates/llm-proxy`): a `Config` built from env
//! fragments, a `reqwest::Client`, and one method per trait operation that
//! posts to the configured upstream and parses its JSON response. The
//! upstream services themselves (ASR model, embedding/clustering stack,
//! vector store, LLM) are genuinely out of scope (spec.md §1); callers swap
//! this module's deterministic test doubles in for integration tests
//! against `wiremock`.

use async_trait::async_trait;
use confab_domain::{MeetingMetadata, SpeakerRegion, SummaryType, WordSegment};
use serde::Deserialize;

use crate::{
    ChatIntent, ChatTurn, DiarizationParams, Diarizer, DocxRenderer, IntentDecision, Llm, Result,
    SentenceSegment, SpeakerProfile, SpeakerStore, TranscriptionOutput, UpstreamError,
};

/// Shared shape for every HTTP-backed adapter: one base URL, one bearer
/// token, one `reqwest::Client` (teacher idiom: `crates/llm-proxy/src/provider/openrouter.rs`).
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    pub base_url: String,
    pub api_key: String,
    client: reqwest::Client,
}

impl HttpUpstream {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    async fn post_json<B: serde::Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        dependency: &'static str,
        path: &str,
        body: &B,
    ) -> Result<R> {
        let resp = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| UpstreamError::new(dependency, e.to_string()))?;

        if !resp.status().is_success() {
            return Err(UpstreamError::new(
                dependency,
                format!("upstream returned {}", resp.status()),
            ));
        }

        resp.json::<R>()
            .await
            .map_err(|e| UpstreamError::new(dependency, e.to_string()))
    }
}

/// HTTP-backed [`Asr`](crate::Asr) adapter.
pub struct HttpAsr(pub HttpUpstream);

#[derive(Deserialize)]
struct AsrResponse {
    words: Vec<WordSegment>,
    sentences: Vec<SentenceSegment>,
}

#[async_trait]
impl crate::Asr for HttpAsr {
    async fn transcribe(&self, audio_path: &str, language: &str) -> Result<TranscriptionOutput> {
        #[derive(serde::Serialize)]
        struct Req<'a> {
            audio_path: &'a str,
            language: &'a str,
        }
        let resp: AsrResponse = self
            .0
            .post_json(
                "asr",
                "/transcribe",
                &Req {
                    audio_path,
                    language,
                },
            )
            .await?;
        Ok(TranscriptionOutput {
            words: resp.words,
            sentences: resp.sentences,
        })
    }
}

/// HTTP-backed [`SpeakerStore`](crate::SpeakerStore) adapter — the vector
/// database holding enrolled speaker profiles (spec.md §5: read-only here).
pub struct HttpSpeakerStore(pub HttpUpstream);

#[derive(Deserialize)]
struct ProfileResponse {
    speaker_id: String,
    label: String,
    embedding: Vec<f32>,
}

#[async_trait]
impl SpeakerStore for HttpSpeakerStore {
    async fn enrolled_profiles(&self, owner_id: uuid::Uuid) -> Result<Vec<SpeakerProfile>> {
        #[derive(serde::Serialize)]
        struct Req {
            owner_id: uuid::Uuid,
        }
        let resp: Vec<ProfileResponse> = self
            .0
            .post_json("vector_store", "/speakers/search", &Req { owner_id })
            .await?;
        Ok(resp
            .into_iter()
            .map(|p| SpeakerProfile {
                speaker_id: p.speaker_id,
                label: p.label,
                embedding: p.embedding,
            })
            .collect())
    }
}

/// HTTP-backed [`Diarizer`](crate::Diarizer) adapter: the request carries
/// the numeric parameters configured per spec.md §4.4/§6 so the upstream
/// diarizer (VAD + embedding + clustering) behaves deterministically for a
/// given configuration.
pub struct HttpDiarizer(pub HttpUpstream);

#[derive(serde::Serialize)]
struct DiarizeRequest<'a> {
    audio_path: &'a str,
    known_profiles: &'a [KnownProfileRef<'a>],
    window_secs: f64,
    overlap_secs: f64,
    known_threshold: f64,
    distance_threshold: f64,
    merge_max_pause: f64,
    vad_enabled: bool,
}

#[derive(serde::Serialize)]
struct KnownProfileRef<'a> {
    speaker_id: &'a str,
    label: &'a str,
    embedding: &'a [f32],
}

#[async_trait]
impl Diarizer for HttpDiarizer {
    async fn diarize(
        &self,
        audio_path: &str,
        known_profiles: &[SpeakerProfile],
        params: DiarizationParams,
    ) -> Result<Vec<SpeakerRegion>> {
        let refs: Vec<KnownProfileRef> = known_profiles
            .iter()
            .map(|p| KnownProfileRef {
                speaker_id: &p.speaker_id,
                label: &p.label,
                embedding: &p.embedding,
            })
            .collect();

        self.0
            .post_json(
                "diarizer",
                "/diarize",
                &DiarizeRequest {
                    audio_path,
                    known_profiles: &refs,
                    window_secs: params.window_secs,
                    overlap_secs: params.overlap_secs,
                    known_threshold: params.known_threshold,
                    distance_threshold: params.distance_threshold,
                    merge_max_pause: params.merge_max_pause,
                    vad_enabled: params.vad_enabled,
                },
            )
            .await
    }
}

/// What kind of prompt a chat/summary call is being made under. Literal
/// prompt text is excluded from this system (spec.md §1); the HTTP upstream
/// resolves `kind` to the matching system prompt on its side.
#[derive(Debug, Clone, Copy, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    IntentAnalysis,
    Chat,
    Summary(SummaryKind),
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryKind {
    Topic,
    Speaker,
    ActionItems,
    DecisionLog,
    SummaryBbhHdqt,
    SummaryNghiQuyet,
}

fn summary_kind(t: SummaryType) -> SummaryKind {
    match t {
        SummaryType::Topic => SummaryKind::Topic,
        SummaryType::Speaker => SummaryKind::Speaker,
        SummaryType::ActionItems => SummaryKind::ActionItems,
        SummaryType::DecisionLog => SummaryKind::DecisionLog,
        SummaryType::SummaryBbhHdqt => SummaryKind::SummaryBbhHdqt,
        SummaryType::SummaryNghiQuyet => SummaryKind::SummaryNghiQuyet,
    }
}

/// HTTP-backed [`Llm`](crate::Llm) adapter.
pub struct HttpLlm(pub HttpUpstream);

#[async_trait]
impl Llm for HttpLlm {
    async fn classify_intent(&self, message: &str) -> Result<IntentDecision> {
        #[derive(serde::Serialize)]
        struct Req<'a> {
            prompt: PromptKind,
            message: &'a str,
        }

        #[derive(Deserialize)]
        struct Raw {
            intent: String,
            entity: Option<String>,
            confidence: f32,
            edit_instruction: Option<String>,
        }

        let raw: Raw = self
            .0
            .post_json(
                "llm",
                "/complete",
                &Req {
                    prompt: PromptKind::IntentAnalysis,
                    message,
                },
            )
            .await?;

        let intent = match raw.intent.as_str() {
            "edit_summary" => ChatIntent::EditSummary,
            "ask_question" => ChatIntent::AskQuestion,
            "general_chit_chat" => ChatIntent::GeneralChitChat,
            // Malformed classification defaults to ask_question (spec.md §4.6).
            _ => ChatIntent::AskQuestion,
        };
        let entity = raw.entity.and_then(|e| e.parse::<SummaryType>().ok());

        Ok(IntentDecision {
            intent,
            entity,
            confidence: raw.confidence,
            edit_instruction: raw.edit_instruction,
        })
    }

    async fn chat(&self, history: &[ChatTurn], message: &str) -> Result<String> {
        #[derive(serde::Serialize)]
        struct TurnRef<'a> {
            role: &'a str,
            message: &'a str,
        }
        #[derive(serde::Serialize)]
        struct Req<'a> {
            prompt: PromptKind,
            history: Vec<TurnRef<'a>>,
            message: &'a str,
        }
        #[derive(Deserialize)]
        struct Resp {
            reply: String,
        }

        let history = history
            .iter()
            .map(|t| TurnRef {
                role: match t.role {
                    confab_domain::ChatRole::User => "user",
                    confab_domain::ChatRole::Assistant => "assistant",
                },
                message: &t.message,
            })
            .collect();

        let resp: Resp = self
            .0
            .post_json(
                "llm",
                "/complete",
                &Req {
                    prompt: PromptKind::Chat,
                    history,
                    message,
                },
            )
            .await?;
        Ok(resp.reply)
    }

    async fn summarize(
        &self,
        summary_type: SummaryType,
        source_text: &str,
        metadata: &MeetingMetadata,
    ) -> Result<String> {
        #[derive(serde::Serialize)]
        struct Req<'a> {
            prompt: PromptKind,
            source_text: &'a str,
            metadata: &'a MeetingMetadata,
        }
        #[derive(Deserialize)]
        struct Resp {
            content: String,
        }

        let resp: Resp = self
            .0
            .post_json(
                "llm",
                "/complete",
                &Req {
                    prompt: PromptKind::Summary(summary_kind(summary_type)),
                    source_text,
                    metadata,
                },
            )
            .await?;
        Ok(resp.content)
    }

    async fn summarize_templated(
        &self,
        summary_type: SummaryType,
        source_text: &str,
        metadata: &MeetingMetadata,
        context: &confab_domain::MeetingContextHeader,
    ) -> Result<serde_json::Value> {
        #[derive(serde::Serialize)]
        struct Req<'a> {
            prompt: PromptKind,
            source_text: &'a str,
            metadata: &'a MeetingMetadata,
            context: &'a confab_domain::MeetingContextHeader,
        }

        self.0
            .post_json(
                "llm",
                "/complete",
                &Req {
                    prompt: PromptKind::Summary(summary_kind(summary_type)),
                    source_text,
                    metadata,
                    context,
                },
            )
            .await
    }
}

/// `docx-rs`-backed [`DocxRenderer`](crate::DocxRenderer): the one adapter
/// in this module that is real in-tree code rather than a thin HTTP proxy,
/// since document rendering itself is ordinary Rust work (only the
/// Vietnamese template *text* is out of scope, spec.md §1).
#[derive(Debug, Default, Clone, Copy)]
pub struct DocxRsRenderer;

#[async_trait]
impl DocxRenderer for DocxRsRenderer {
    async fn render_templated(
        &self,
        _summary_type: SummaryType,
        structured: &serde_json::Value,
    ) -> Result<Vec<u8>> {
        use docx_rs::{Docx, Paragraph, Run};

        let mut docx = Docx::new();
        if let Some(obj) = structured.as_object() {
            let mut keys: Vec<&String> = obj.keys().collect();
            keys.sort();
            for key in keys {
                let value = &obj[key];
                let rendered = render_structured_value(value);
                docx = docx.add_paragraph(
                    Paragraph::new()
                        .add_run(Run::new().add_text(format!("{key}: {rendered}")).bold()),
                );
            }
        }
        encode(docx)
    }

    async fn render_markdown(&self, title: &str, markdown: &str) -> Result<Vec<u8>> {
        use docx_rs::{Docx, Paragraph, Run};

        let mut docx =
            Docx::new().add_paragraph(Paragraph::new().add_run(Run::new().add_text(title).bold().size(28)));
        for line in markdown.lines() {
            docx = docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(line)));
        }
        encode(docx)
    }
}

fn render_structured_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(|item| match item.get("content").and_then(|c| c.as_str()) {
                Some(content) => content.to_string(),
                None => item.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}

fn encode(docx: docx_rs::Docx) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    docx.build()
        .pack(&mut std::io::Cursor::new(&mut buf))
        .map_err(|e| UpstreamError::new("docx_renderer", e.to_string()))?;
    Ok(buf)
}
