use chrono::Utc;
use confab_domain::{
    ChatEntry, ChatRole, DiarizedTranscript, Job, JobStatus, MeetingMetadata, Summary,
    SummaryType, Transcript, WordSegment,
};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::rows::{ChatEntryRow, DiarizedTranscriptRow, JobRow, SummaryRow, TranscriptRow, role_str};

/// Owns the whole Job ↔ {Transcript, DiarizedTranscript, Summary, ChatEntry}
/// tree (spec.md §9: "strict tree rooted at Job; cascading delete rules
/// belong at the storage layer"). Every operation is one transaction
/// performing the read-check-write the spec calls for (spec.md §5: "every
/// status transition is a single transaction with a predicate on the
/// current status").
#[derive(Debug, Clone)]
pub struct Store {
    pool: PgPool,
}

/// Outcome of [`Store::change_language`]: tells the caller (the Controller)
/// whether it must enqueue a transcription task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LanguageChangeOutcome {
    /// `new_language == active_language`: no-op, nothing enqueued (spec.md §8
    /// boundary behavior).
    Unchanged,
    /// A Transcript already existed for `new_language`: status reverted to
    /// `transcription_complete` immediately, no task enqueued.
    CachedTranscript,
    /// No Transcript existed: status set to `transcribing`, caller must
    /// enqueue a transcription task.
    NeedsTranscription,
}

impl Store {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn get_or_create_user(&self, username: &str, display_name: Option<&str>) -> Result<Uuid> {
        if let Some(row) = sqlx::query_as::<_, (Uuid,)>("SELECT id FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
        {
            return Ok(row.0);
        }
        let row: (Uuid,) = sqlx::query_as(
            "INSERT INTO users (username, display_name) VALUES ($1, $2) RETURNING id",
        )
        .bind(username)
        .bind(display_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0)
    }

    /// spec.md §4.1 `start`.
    pub async fn start(
        &self,
        request_id: &str,
        owner_id: Uuid,
        language: &str,
        filename: &str,
        metadata: &MeetingMetadata,
    ) -> Result<Job> {
        let exists = sqlx::query_as::<_, (i64,)>("SELECT count(*) FROM jobs WHERE request_id = $1")
            .bind(request_id)
            .fetch_one(&self.pool)
            .await?
            .0;
        if exists > 0 {
            return Err(StoreError::Conflict(format!(
                "request_id {request_id} already exists"
            )));
        }

        let row: JobRow = sqlx::query_as(
            r#"
            INSERT INTO jobs (
                request_id, owner_id, original_filename, active_language,
                bbh_name, meeting_type, meeting_host, meeting_members, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(request_id)
        .bind(owner_id)
        .bind(filename)
        .bind(language)
        .bind(&metadata.bbh_name)
        .bind(&metadata.meeting_type)
        .bind(&metadata.meeting_host)
        .bind(Json(&metadata.meeting_members))
        .bind(JobStatus::Uploading.as_str())
        .fetch_one(&self.pool)
        .await?;

        row.into_domain()
    }

    async fn load_for_update<'a>(
        &self,
        tx: &mut Transaction<'a, Postgres>,
        request_id: &str,
    ) -> Result<JobRow> {
        sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE request_id = $1 FOR UPDATE")
            .bind(request_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or(StoreError::NotFound)
    }

    pub async fn get_job(&self, request_id: &str) -> Result<Job> {
        sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE request_id = $1")
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?
            .into_domain()
    }

    /// spec.md §4.1 `uploadChunk`: records the timestamps and, on the last
    /// chunk, the `assembling` transition. The chunk bytes themselves are the
    /// caller's (object store) concern; this only gates and records the
    /// state transition under the "only one caller observes `uploading`
    /// followed by a write to `assembling`" guarantee (spec.md §5).
    pub async fn record_chunk(&self, request_id: &str, is_first: bool, is_last: bool) -> Result<Job> {
        let mut tx = self.pool.begin().await?;
        let row = self.load_for_update(&mut tx, request_id).await?;
        let status = row.status.parse::<JobStatus>().unwrap_or(JobStatus::Failed);

        if status != JobStatus::Uploading {
            return Err(StoreError::InvalidState(format!(
                "expected uploading, got {status}"
            )));
        }

        let now = Utc::now();
        let new_status = if is_last {
            JobStatus::Assembling
        } else {
            JobStatus::Uploading
        };

        let row: JobRow = sqlx::query_as(
            r#"
            UPDATE jobs SET
                status = $1,
                upload_started_at = COALESCE(upload_started_at, CASE WHEN $2 THEN $4 ELSE upload_started_at END),
                upload_finished_at = CASE WHEN $3 THEN $4 ELSE upload_finished_at END,
                updated_at = $4
            WHERE request_id = $5
            RETURNING *
            "#,
        )
        .bind(new_status.as_str())
        .bind(is_first)
        .bind(is_last)
        .bind(now)
        .bind(request_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.into_domain()
    }

    /// spec.md §4.1 `triggerDiarize`.
    pub async fn begin_diarize(&self, request_id: &str) -> Result<Job> {
        let mut tx = self.pool.begin().await?;
        let row = self.load_for_update(&mut tx, request_id).await?;
        let status = row.status.parse::<JobStatus>().unwrap_or(JobStatus::Failed);

        if status != JobStatus::TranscriptionComplete {
            return Err(StoreError::InvalidState(format!(
                "expected transcription_complete, got {status}"
            )));
        }

        let row: JobRow = sqlx::query_as(
            "UPDATE jobs SET status = $1, updated_at = $2 WHERE request_id = $3 RETURNING *",
        )
        .bind(JobStatus::Diarizing.as_str())
        .bind(Utc::now())
        .bind(request_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.into_domain()
    }

    /// spec.md §4.1 `changeLanguage`. Summaries/ChatEntries are left intact
    /// (DESIGN.md Open Question 1).
    pub async fn change_language(
        &self,
        request_id: &str,
        new_language: &str,
    ) -> Result<(Job, LanguageChangeOutcome)> {
        let mut tx = self.pool.begin().await?;
        let row = self.load_for_update(&mut tx, request_id).await?;

        if row.active_language == new_language {
            tx.commit().await?;
            return Ok((row.into_domain()?, LanguageChangeOutcome::Unchanged));
        }

        let existing: Option<TranscriptRow> = sqlx::query_as(
            "SELECT * FROM transcripts WHERE job_id = $1 AND language = $2",
        )
        .bind(row.id)
        .bind(new_language)
        .fetch_optional(&mut *tx)
        .await?;

        let (new_status, outcome) = if existing.is_some() {
            sqlx::query("DELETE FROM diarized_transcripts WHERE job_id = $1")
                .bind(row.id)
                .execute(&mut *tx)
                .await?;
            (JobStatus::TranscriptionComplete, LanguageChangeOutcome::CachedTranscript)
        } else {
            (JobStatus::Transcribing, LanguageChangeOutcome::NeedsTranscription)
        };

        let row: JobRow = sqlx::query_as(
            r#"
            UPDATE jobs SET active_language = $1, status = $2, updated_at = $3
            WHERE request_id = $4
            RETURNING *
            "#,
        )
        .bind(new_language)
        .bind(new_status.as_str())
        .bind(Utc::now())
        .bind(request_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((row.into_domain()?, outcome))
    }

    /// spec.md §4.1 `updatePlainTranscript`: replace segments, cascade-clear
    /// derived data, revert status.
    pub async fn update_plain_transcript(
        &self,
        request_id: &str,
        segments: Vec<WordSegment>,
    ) -> Result<Job> {
        let mut tx = self.pool.begin().await?;
        let row = self.load_for_update(&mut tx, request_id).await?;

        let updated = sqlx::query(
            r#"
            UPDATE transcripts SET word_segments = $1, edited_flag = true
            WHERE job_id = $2 AND language = $3
            "#,
        )
        .bind(Json(&segments))
        .bind(row.id)
        .bind(&row.active_language)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        sqlx::query("DELETE FROM diarized_transcripts WHERE job_id = $1")
            .bind(row.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM summaries WHERE job_id = $1")
            .bind(row.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM chat_entries WHERE job_id = $1")
            .bind(row.id)
            .execute(&mut *tx)
            .await?;

        let row: JobRow = sqlx::query_as(
            "UPDATE jobs SET status = $1, updated_at = $2 WHERE request_id = $3 RETURNING *",
        )
        .bind(JobStatus::TranscriptionComplete.as_str())
        .bind(Utc::now())
        .bind(request_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.into_domain()
    }

    /// spec.md §4.1 `cancel`. Deletes the Job row (fs cleanup is the
    /// caller's job, since the object store is a different collaborator).
    pub async fn cancel(&self, request_id: &str) -> Result<Job> {
        let mut tx = self.pool.begin().await?;
        let row = self.load_for_update(&mut tx, request_id).await?;
        let status = row.status.parse::<JobStatus>().unwrap_or(JobStatus::Failed);

        if !matches!(status, JobStatus::Uploading | JobStatus::Assembling) {
            return Err(StoreError::InvalidState(format!(
                "cannot cancel a job in status {status}"
            )));
        }

        sqlx::query("DELETE FROM jobs WHERE request_id = $1")
            .bind(request_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        row.into_domain()
    }

    /// spec.md §4.1 `updateInfo`: partial update, any status.
    pub async fn update_info(
        &self,
        request_id: &str,
        bbh_name: Option<String>,
        meeting_type: Option<String>,
        meeting_host: Option<String>,
    ) -> Result<Job> {
        let row: Option<JobRow> = sqlx::query_as(
            r#"
            UPDATE jobs SET
                bbh_name = COALESCE($1, bbh_name),
                meeting_type = COALESCE($2, meeting_type),
                meeting_host = COALESCE($3, meeting_host),
                updated_at = $4
            WHERE request_id = $5
            RETURNING *
            "#,
        )
        .bind(bbh_name)
        .bind(meeting_type)
        .bind(meeting_host)
        .bind(Utc::now())
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(StoreError::NotFound)?.into_domain()
    }

    pub async fn mark_failed(&self, request_id: &str, error_message: &str) -> Result<()> {
        sqlx::query(
            "UPDATE jobs SET status = $1, error_message = $2, updated_at = $3 WHERE request_id = $4",
        )
        .bind(JobStatus::Failed.as_str())
        .bind(error_message)
        .bind(Utc::now())
        .bind(request_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_status(&self, request_id: &str, status: JobStatus) -> Result<()> {
        sqlx::query("UPDATE jobs SET status = $1, updated_at = $2 WHERE request_id = $3")
            .bind(status.as_str())
            .bind(Utc::now())
            .bind(request_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Upsert, idempotent on `(job_id, language)` — spec.md §4.3, §9
    /// "never blindly append derived artifacts; upsert".
    pub async fn upsert_transcript(
        &self,
        job_id: Uuid,
        language: &str,
        segments: Vec<WordSegment>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO transcripts (job_id, language, word_segments, edited_flag)
            VALUES ($1, $2, $3, false)
            ON CONFLICT (job_id, language)
            DO UPDATE SET word_segments = EXCLUDED.word_segments, edited_flag = false
            "#,
        )
        .bind(job_id)
        .bind(language)
        .bind(Json(&segments))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_transcript(&self, job_id: Uuid, language: &str) -> Result<Option<Transcript>> {
        let row: Option<TranscriptRow> =
            sqlx::query_as("SELECT * FROM transcripts WHERE job_id = $1 AND language = $2")
                .bind(job_id)
                .bind(language)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Into::into))
    }

    /// Deletes any prior row first, per spec.md §4.4 ("Writes one
    /// DiarizedTranscript (deleting any prior)").
    pub async fn replace_diarized_transcript(
        &self,
        job_id: Uuid,
        segments: Vec<confab_domain::SpeakerSegment>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO diarized_transcripts (job_id, speaker_segments, edited_flag)
            VALUES ($1, $2, false)
            ON CONFLICT (job_id)
            DO UPDATE SET speaker_segments = EXCLUDED.speaker_segments, edited_flag = false
            "#,
        )
        .bind(job_id)
        .bind(Json(&segments))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_diarized_transcript(&self, job_id: Uuid) -> Result<Option<DiarizedTranscript>> {
        let row: Option<DiarizedTranscriptRow> =
            sqlx::query_as("SELECT * FROM diarized_transcripts WHERE job_id = $1")
                .bind(job_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Into::into))
    }

    /// Create-if-absent-update-otherwise on `(job, summary_type)` — spec.md
    /// §3, §4.6 idempotence note.
    pub async fn put_summary(
        &self,
        job_id: Uuid,
        summary_type: SummaryType,
        content: &str,
    ) -> Result<Summary> {
        let row: SummaryRow = sqlx::query_as(
            r#"
            INSERT INTO summaries (job_id, summary_type, content)
            VALUES ($1, $2, $3)
            ON CONFLICT (job_id, summary_type)
            DO UPDATE SET content = EXCLUDED.content
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(summary_type.as_str())
        .bind(content)
        .fetch_one(&self.pool)
        .await?;
        row.into_domain()
    }

    pub async fn get_summary(&self, job_id: Uuid, summary_type: SummaryType) -> Result<Option<Summary>> {
        let row: Option<SummaryRow> =
            sqlx::query_as("SELECT * FROM summaries WHERE job_id = $1 AND summary_type = $2")
                .bind(job_id)
                .bind(summary_type.as_str())
                .fetch_optional(&self.pool)
                .await?;
        row.map(SummaryRow::into_domain).transpose()
    }

    pub async fn list_summaries(&self, job_id: Uuid) -> Result<Vec<Summary>> {
        let rows: Vec<SummaryRow> = sqlx::query_as("SELECT * FROM summaries WHERE job_id = $1")
            .bind(job_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(SummaryRow::into_domain).collect()
    }

    pub async fn append_chat_entry(&self, job_id: Uuid, role: ChatRole, message: &str) -> Result<ChatEntry> {
        let row: ChatEntryRow = sqlx::query_as(
            "INSERT INTO chat_entries (job_id, role, message) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(job_id)
        .bind(role_str(role))
        .bind(message)
        .fetch_one(&self.pool)
        .await?;
        row.into_domain()
    }

    /// Last `limit * 2` entries in chronological order, spec.md §4.6
    /// `ask_question` context assembly.
    pub async fn recent_chat_history(&self, job_id: Uuid, turn_limit: usize) -> Result<Vec<ChatEntry>> {
        let limit = (turn_limit as i64) * 2;
        let rows: Vec<ChatEntryRow> = sqlx::query_as(
            "SELECT * FROM chat_entries WHERE job_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(job_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        let mut entries = rows
            .into_iter()
            .map(ChatEntryRow::into_domain)
            .collect::<Result<Vec<_>>>()?;
        entries.reverse();
        Ok(entries)
    }

    /// Stale-Job Reaper (spec.md §4.8): every Job in a non-terminal status
    /// older than `threshold` gets marked `failed`. Returns the affected
    /// request ids (the reaper publishes no updates, so the caller only
    /// needs these for logging).
    pub async fn reap_stale_jobs(
        &self,
        threshold: chrono::Duration,
        message: &str,
    ) -> Result<Vec<String>> {
        let cutoff = Utc::now() - threshold;
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            UPDATE jobs SET status = $1, error_message = $2, updated_at = $3
            WHERE status = ANY($4) AND created_at < $5
            RETURNING request_id
            "#,
        )
        .bind(JobStatus::Failed.as_str())
        .bind(message)
        .bind(Utc::now())
        .bind(&[
            JobStatus::Uploading.as_str(),
            JobStatus::Assembling.as_str(),
            JobStatus::Transcribing.as_str(),
            JobStatus::Diarizing.as_str(),
        ][..])
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
