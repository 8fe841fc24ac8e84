use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// `Job.status`, §3/§4.1. Transitions are gated by each `confab_store::Store`
/// method's own read-check-write transaction (spec.md §9: "state checks are
/// the gate, not the API path"); the Controller never trusts a
/// caller-supplied status, only reads the current row and decides the next
/// one itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Uploading,
    Assembling,
    Transcribing,
    TranscriptionComplete,
    Diarizing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Uploading => "uploading",
            JobStatus::Assembling => "assembling",
            JobStatus::Transcribing => "transcribing",
            JobStatus::TranscriptionComplete => "transcription_complete",
            JobStatus::Diarizing => "diarizing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown job status: {0}")]
pub struct ParseJobStatusError(String);

impl FromStr for JobStatus {
    type Err = ParseJobStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "uploading" => JobStatus::Uploading,
            "assembling" => JobStatus::Assembling,
            "transcribing" => JobStatus::Transcribing,
            "transcription_complete" => JobStatus::TranscriptionComplete,
            "diarizing" => JobStatus::Diarizing,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            other => return Err(ParseJobStatusError(other.to_string())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Uploading.is_terminal());
        assert!(!JobStatus::Diarizing.is_terminal());
    }

    #[test]
    fn round_trips_through_str() {
        for s in [
            JobStatus::Uploading,
            JobStatus::Assembling,
            JobStatus::Transcribing,
            JobStatus::TranscriptionComplete,
            JobStatus::Diarizing,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(s.as_str().parse::<JobStatus>().unwrap(), s);
        }
    }
}
