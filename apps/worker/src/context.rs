//! spec.md §9 "Global service singletons in workers": ASR, diarizer, and
//! speaker-store handles are constructed once per worker process, on first
//! use, not once per task. `OnceLock` mirrors `apps/api/src/env.rs`'s
//! process-lifetime cache idiom.

use std::sync::{Arc, OnceLock};

use confab_config::WorkerEnv;
use confab_external::stub::{HttpAsr, HttpDiarizer, HttpSpeakerStore, HttpUpstream};
use confab_external::{Asr, Diarizer, DiarizationParams, SpeakerStore};

static ASR: OnceLock<Arc<dyn Asr>> = OnceLock::new();
static DIARIZER: OnceLock<Arc<dyn Diarizer>> = OnceLock::new();
static SPEAKER_STORE: OnceLock<Arc<dyn SpeakerStore>> = OnceLock::new();

pub fn asr(cfg: &WorkerEnv) -> Arc<dyn Asr> {
    ASR.get_or_init(|| {
        let upstream = HttpUpstream::new(cfg.asr.asr_endpoint.clone(), cfg.asr.asr_api_key.clone());
        Arc::new(HttpAsr(upstream)) as Arc<dyn Asr>
    })
    .clone()
}

pub fn diarizer(cfg: &WorkerEnv) -> Arc<dyn Diarizer> {
    DIARIZER
        .get_or_init(|| {
            let upstream = HttpUpstream::new(
                cfg.diarization.diarizer_endpoint.clone(),
                cfg.diarization.diarizer_api_key.clone(),
            );
            Arc::new(HttpDiarizer(upstream)) as Arc<dyn Diarizer>
        })
        .clone()
}

pub fn speaker_store(cfg: &WorkerEnv) -> Arc<dyn SpeakerStore> {
    SPEAKER_STORE
        .get_or_init(|| {
            let upstream = HttpUpstream::new(
                format!("http://{}:{}", cfg.vector_store.vector_store_host, cfg.vector_store.vector_store_port),
                String::new(),
            );
            Arc::new(HttpSpeakerStore(upstream)) as Arc<dyn SpeakerStore>
        })
        .clone()
}

/// Diarizer numeric parameters read from configuration, spec.md §4.4/§6.
pub fn diarization_params(cfg: &WorkerEnv) -> DiarizationParams {
    DiarizationParams {
        window_secs: cfg.diarization.diarization_window_secs,
        overlap_secs: cfg.diarization.diarization_overlap_secs,
        known_threshold: cfg.diarization.diarization_known_threshold,
        distance_threshold: cfg.diarization.diarization_distance_threshold,
        merge_max_pause: cfg.diarization.diarization_merge_max_pause,
        vad_enabled: cfg.diarization.diarization_vad_enabled,
    }
}
