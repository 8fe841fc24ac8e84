//! Per-binary `Env` structs loaded via `envy` + `dotenvy`, mirroring
//! `apps/api/src/env.rs`'s `OnceLock` + `#[serde(flatten)]` pattern.

use std::path::Path;

use serde::Deserialize;

fn default_port() -> u16 {
    3001
}

fn default_reaper_period_hours() -> u64 {
    6
}

fn default_stale_threshold_days() -> u64 {
    2
}

fn default_chat_history_limit() -> usize {
    10
}

fn default_timezone() -> String {
    "Asia/Ho_Chi_Minh".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseEnv {
    pub database_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ObjectStoreEnv {
    pub shared_audio_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmEnv {
    pub llm_endpoint: String,
    pub llm_api_key: String,
    pub llm_model: String,
}

/// The out-of-scope ASR model's HTTP endpoint (spec.md §1: the model itself
/// is external; this is just the address the Transcription Worker dials).
#[derive(Debug, Deserialize, Clone)]
pub struct AsrEnv {
    pub asr_endpoint: String,
    #[serde(default)]
    pub asr_api_key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VectorStoreEnv {
    pub vector_store_host: String,
    pub vector_store_port: u16,
    pub vector_store_collection: String,
}

/// Diarizer endpoint and numeric parameters, spec.md §4.4. Endpoint is a
/// sibling of [`AsrEnv`] and [`LlmEnv`]: the VAD/embedding/clustering stack
/// is its own out-of-scope service, not the LLM.
#[derive(Debug, Deserialize, Clone)]
pub struct DiarizationEnv {
    pub diarizer_endpoint: String,
    #[serde(default)]
    pub diarizer_api_key: String,
    pub diarization_window_secs: f64,
    pub diarization_overlap_secs: f64,
    pub diarization_known_threshold: f64,
    pub diarization_distance_threshold: f64,
    pub diarization_merge_max_pause: f64,
    #[serde(default)]
    pub diarization_vad_enabled: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatEnv {
    #[serde(default = "default_chat_history_limit")]
    pub chat_history_limit: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TimezoneEnv {
    #[serde(default = "default_timezone")]
    pub local_timezone: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrokerEnv {
    #[serde(flatten)]
    pub database: DatabaseEnv,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiEnv {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub sentry_dsn: Option<String>,

    #[serde(flatten)]
    pub database: DatabaseEnv,
    #[serde(flatten)]
    pub broker: BrokerEnv,
    #[serde(flatten)]
    pub objects: ObjectStoreEnv,
    #[serde(flatten)]
    pub llm: LlmEnv,
    #[serde(flatten)]
    pub vector_store: VectorStoreEnv,
    #[serde(flatten)]
    pub chat: ChatEnv,
    #[serde(flatten)]
    pub timezone: TimezoneEnv,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkerEnv {
    #[serde(default)]
    pub sentry_dsn: Option<String>,

    #[serde(flatten)]
    pub database: DatabaseEnv,
    #[serde(flatten)]
    pub broker: BrokerEnv,
    #[serde(flatten)]
    pub objects: ObjectStoreEnv,
    #[serde(flatten)]
    pub llm: LlmEnv,
    #[serde(flatten)]
    pub asr: AsrEnv,
    #[serde(flatten)]
    pub vector_store: VectorStoreEnv,
    #[serde(flatten)]
    pub diarization: DiarizationEnv,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReaperEnv {
    #[serde(default)]
    pub sentry_dsn: Option<String>,
    #[serde(default = "default_reaper_period_hours")]
    pub reaper_period_hours: u64,
    #[serde(default = "default_stale_threshold_days")]
    pub reaper_stale_threshold_days: u64,

    #[serde(flatten)]
    pub database: DatabaseEnv,
}

/// Loads `T` from process env, after best-effort `.env` loading from the
/// repo root and the caller's crate-local `.env` — same two-step lookup as
/// `apps/api/src/env.rs::env()`.
pub fn load<T: serde::de::DeserializeOwned>(manifest_dir: &Path) -> Result<T, envy::Error> {
    let repo_root = manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .unwrap_or(manifest_dir);

    let _ = dotenvy::from_path(repo_root.join(".env"));
    let _ = dotenvy::from_path(manifest_dir.join(".env"));
    envy::from_env()
}
