use chrono::{DateTime, Utc};
use confab_domain::{
    ChatEntry, ChatRole, DiarizedTranscript, Job, JobStatus, MeetingMetadata, Summary,
    SummaryType, Transcript, WordSegment,
};
use sqlx::types::Json;
use uuid::Uuid;

use crate::error::{Result, StoreError};

#[derive(Debug, sqlx::FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub request_id: String,
    pub owner_id: Uuid,
    pub original_filename: String,
    pub active_language: String,
    pub bbh_name: Option<String>,
    pub meeting_type: Option<String>,
    pub meeting_host: Option<String>,
    pub meeting_members: Json<Vec<String>>,
    pub status: String,
    pub upload_started_at: Option<DateTime<Utc>>,
    pub upload_finished_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRow {
    pub fn into_domain(self) -> Result<Job> {
        let status = self
            .status
            .parse::<JobStatus>()
            .map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))?;
        Ok(Job {
            id: self.id,
            request_id: self.request_id,
            owner_id: self.owner_id,
            original_filename: self.original_filename,
            active_language: self.active_language,
            metadata: MeetingMetadata {
                bbh_name: self.bbh_name,
                meeting_type: self.meeting_type,
                meeting_host: self.meeting_host,
                meeting_members: self.meeting_members.0,
            },
            status,
            upload_started_at: self.upload_started_at,
            upload_finished_at: self.upload_finished_at,
            error_message: self.error_message,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct TranscriptRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub language: String,
    pub word_segments: Json<Vec<WordSegment>>,
    pub edited_flag: bool,
}

impl From<TranscriptRow> for Transcript {
    fn from(row: TranscriptRow) -> Self {
        Transcript {
            id: row.id,
            job_id: row.job_id,
            language: row.language,
            word_segments: row.word_segments.0,
            edited_flag: row.edited_flag,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct DiarizedTranscriptRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub speaker_segments: Json<Vec<confab_domain::SpeakerSegment>>,
    pub edited_flag: bool,
}

impl From<DiarizedTranscriptRow> for DiarizedTranscript {
    fn from(row: DiarizedTranscriptRow) -> Self {
        DiarizedTranscript {
            id: row.id,
            job_id: row.job_id,
            speaker_segments: row.speaker_segments.0,
            edited_flag: row.edited_flag,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct SummaryRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub summary_type: String,
    pub content: String,
}

impl SummaryRow {
    pub fn into_domain(self) -> Result<Summary> {
        let summary_type = self
            .summary_type
            .parse::<SummaryType>()
            .map_err(StoreError::InvalidInput)?;
        Ok(Summary {
            id: self.id,
            job_id: self.job_id,
            summary_type,
            content: self.content,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct ChatEntryRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub role: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl ChatEntryRow {
    pub fn into_domain(self) -> Result<ChatEntry> {
        let role = match self.role.as_str() {
            "user" => ChatRole::User,
            "assistant" => ChatRole::Assistant,
            other => return Err(StoreError::InvalidInput(format!("bad chat role: {other}"))),
        };
        Ok(ChatEntry {
            id: self.id,
            job_id: self.job_id,
            role,
            message: self.message,
            created_at: self.created_at,
        })
    }
}

pub fn role_str(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
    }
}
