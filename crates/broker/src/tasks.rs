use serde::{Deserialize, Serialize};

/// One unit of background work, spec.md §4 workers. Routing follows spec.md
/// §6: "assemble/transcribe/diarize/embedding -> gpu_tasks" — every task
/// this system dispatches is GPU work; `cpu_tasks` exists for symmetry with
/// the broker contract but has no current producer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TaskEnvelope {
    Assemble {
        request_id: String,
    },
    Transcribe {
        request_id: String,
        language: String,
    },
    Diarize {
        request_id: String,
    },
}

impl TaskEnvelope {
    pub fn queue_name(&self) -> &'static str {
        match self {
            TaskEnvelope::Assemble { .. }
            | TaskEnvelope::Transcribe { .. }
            | TaskEnvelope::Diarize { .. } => QUEUE_GPU_TASKS,
        }
    }

    pub fn request_id(&self) -> &str {
        match self {
            TaskEnvelope::Assemble { request_id } => request_id,
            TaskEnvelope::Transcribe { request_id, .. } => request_id,
            TaskEnvelope::Diarize { request_id } => request_id,
        }
    }
}

pub const QUEUE_GPU_TASKS: &str = "gpu_tasks";
pub const QUEUE_CPU_TASKS: &str = "cpu_tasks";
pub const TOPIC_JOB_UPDATES: &str = "job_updates";
