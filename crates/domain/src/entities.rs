use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::segments::{SpeakerSegment, WordSegment};
use crate::status::JobStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
}

/// Meeting metadata carried on a [`Job`] (spec.md §3: "name/type/host/members").
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MeetingMetadata {
    pub bbh_name: Option<String>,
    pub meeting_type: Option<String>,
    pub meeting_host: Option<String>,
    #[serde(default)]
    pub meeting_members: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub request_id: String,
    pub owner_id: Uuid,
    pub original_filename: String,
    pub active_language: String,
    pub metadata: MeetingMetadata,
    pub status: JobStatus,
    pub upload_started_at: Option<DateTime<Utc>>,
    pub upload_finished_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub id: Uuid,
    pub job_id: Uuid,
    pub language: String,
    pub word_segments: Vec<WordSegment>,
    pub edited_flag: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiarizedTranscript {
    pub id: Uuid,
    pub job_id: Uuid,
    pub speaker_segments: Vec<SpeakerSegment>,
    pub edited_flag: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SummaryType {
    Topic,
    Speaker,
    ActionItems,
    DecisionLog,
    SummaryBbhHdqt,
    SummaryNghiQuyet,
}

impl SummaryType {
    /// Templated document paths per spec.md §4.1 / `document_generator.py`.
    pub fn is_templated(self) -> bool {
        matches!(
            self,
            SummaryType::SummaryBbhHdqt | SummaryType::SummaryNghiQuyet
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SummaryType::Topic => "topic",
            SummaryType::Speaker => "speaker",
            SummaryType::ActionItems => "action_items",
            SummaryType::DecisionLog => "decision_log",
            SummaryType::SummaryBbhHdqt => "summary_bbh_hdqt",
            SummaryType::SummaryNghiQuyet => "summary_nghi_quyet",
        }
    }
}

impl std::str::FromStr for SummaryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "topic" => SummaryType::Topic,
            "speaker" => SummaryType::Speaker,
            "action_items" => SummaryType::ActionItems,
            "decision_log" => SummaryType::DecisionLog,
            "summary_bbh_hdqt" => SummaryType::SummaryBbhHdqt,
            "summary_nghi_quyet" => SummaryType::SummaryNghiQuyet,
            other => return Err(format!("unknown summary_type: {other}")),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub id: Uuid,
    pub job_id: Uuid,
    pub summary_type: SummaryType,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatEntry {
    pub id: Uuid,
    pub job_id: Uuid,
    pub role: ChatRole,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
