//! Chat Sub-engine (spec.md §4.6): intent classification, per-intent
//! execution, `[UPDATE:<type>]` tag parsing, and history assembly/append.
//!
//! Grounded on `original_source/app/services/ai_service.py` (two-stage
//! orchestration: classify then execute) and `original_source/app/core/ai_prompts.py`
//! (one system prompt per stage/summary type — literal text excluded per
//! spec.md §1, replaced by [`confab_external::Llm`]'s `PromptKind`-shaped
//! interface).

use std::sync::Arc;

use confab_domain::{ChatEntry, ChatRole, Job, SummaryType};
use confab_external::{ChatIntent, ChatTurn, IntentDecision, Llm};
use confab_store::Store;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Store(#[from] confab_store::StoreError),
    #[error(transparent)]
    Upstream(#[from] confab_external::UpstreamError),
}

pub type Result<T> = std::result::Result<T, ChatError>;

/// Fixed reply for `general_chit_chat`, not delegated to the LLM (spec.md
/// §4.6 step 2).
const CHIT_CHAT_REPLY: &str =
    "Rất vui được trò chuyện cùng bạn! Nếu cần hỗ trợ về biên bản họp, cứ hỏi tôi nhé.";

fn clarification_reply() -> String {
    "Bạn muốn chỉnh sửa tóm tắt nào? Các loại hiện có: topic, speaker, action_items, \
     decision_log, summary_bbh_hdqt, summary_nghi_quyet."
        .to_string()
}

fn generate_first_reply(entity: SummaryType) -> String {
    format!(
        "Chưa có tóm tắt loại \"{}\" cho cuộc họp này. Hãy tạo tóm tắt đó trước khi chỉnh sửa.",
        entity.as_str()
    )
}

/// `^[UPDATE:<type>]\s*(.*)`, `(?s)` so `.` also matches the summary body's
/// newlines (spec.md §4.6, Open Question 3: both presence and absence of
/// this tag are handled).
fn update_tag_re() -> Regex {
    Regex::new(r"(?s)^\[UPDATE:[A-Za-z_]+\]\s*(.*)$").expect("static regex")
}

pub struct ChatEngine {
    store: Store,
    llm: Arc<dyn Llm>,
    chat_history_limit: usize,
}

impl ChatEngine {
    pub fn new(store: Store, llm: Arc<dyn Llm>, chat_history_limit: usize) -> Self {
        Self {
            store,
            llm,
            chat_history_limit,
        }
    }

    /// spec.md §4.6: classify, execute by intent, append both turns, return
    /// the assistant reply.
    pub async fn chat(&self, job: &Job, user_message: &str) -> Result<String> {
        let decision = self.llm.classify_intent(user_message).await?;

        let reply = match decision.intent {
            ChatIntent::EditSummary => self.handle_edit_summary(job, &decision).await?,
            ChatIntent::AskQuestion => self.handle_ask_question(job, user_message).await?,
            ChatIntent::GeneralChitChat => CHIT_CHAT_REPLY.to_string(),
        };

        self.store
            .append_chat_entry(job.id, ChatRole::User, user_message)
            .await?;
        self.store
            .append_chat_entry(job.id, ChatRole::Assistant, &reply)
            .await?;

        Ok(reply)
    }

    async fn handle_edit_summary(&self, job: &Job, decision: &IntentDecision) -> Result<String> {
        let Some(entity) = decision.entity else {
            return Ok(clarification_reply());
        };

        let Some(existing) = self.store.get_summary(job.id, entity).await? else {
            return Ok(generate_first_reply(entity));
        };

        let instruction = decision.edit_instruction.as_deref().unwrap_or("");
        let prompt = format!(
            "Nội dung tóm tắt hiện tại ({}):\n{}\n\nYêu cầu chỉnh sửa: {}",
            entity.as_str(),
            existing.content,
            instruction
        );

        let raw_reply = self.llm.chat(&[], &prompt).await?;
        let content = match update_tag_re().captures(&raw_reply) {
            Some(caps) => caps[1].to_string(),
            None => raw_reply,
        };

        self.store.put_summary(job.id, entity, &content).await?;
        Ok(content)
    }

    async fn handle_ask_question(&self, job: &Job, user_message: &str) -> Result<String> {
        let transcript = self
            .store
            .get_transcript(job.id, &job.active_language)
            .await?;
        let transcript_text = transcript
            .map(|t| {
                t.word_segments
                    .iter()
                    .map(|w| w.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default();

        let summaries = self.store.list_summaries(job.id).await?;
        let summaries_text = summaries
            .iter()
            .map(|s| format!("## {}\n{}", s.summary_type.as_str(), s.content))
            .collect::<Vec<_>>()
            .join("\n\n");

        let context = format!(
            "Bản ghi cuộc họp:\n{transcript_text}\n\nCác tóm tắt đã có:\n{summaries_text}"
        );

        let history_entries = self
            .store
            .recent_chat_history(job.id, self.chat_history_limit)
            .await?;
        let mut history: Vec<ChatTurn> = Vec::with_capacity(history_entries.len() + 1);
        history.push(ChatTurn {
            role: ChatRole::User,
            message: context,
        });
        history.extend(history_entries.iter().map(entry_to_turn));

        self.llm.chat(&history, user_message).await.map_err(Into::into)
    }
}

fn entry_to_turn(entry: &ChatEntry) -> ChatTurn {
    ChatTurn {
        role: entry.role,
        message: entry.message.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use confab_domain::{MeetingContextHeader, MeetingMetadata};
    use confab_external::TranscriptionOutput;
    use std::sync::Mutex;

    struct FakeLlm {
        intent: IntentDecision,
        chat_reply: Mutex<String>,
    }

    #[async_trait]
    impl confab_external::Asr for FakeLlm {
        async fn transcribe(
            &self,
            _audio_path: &str,
            _language: &str,
        ) -> confab_external::Result<TranscriptionOutput> {
            Ok(TranscriptionOutput {
                words: Vec::new(),
                sentences: Vec::new(),
            })
        }
    }

    #[async_trait]
    impl Llm for FakeLlm {
        async fn classify_intent(&self, _message: &str) -> confab_external::Result<IntentDecision> {
            Ok(self.intent.clone())
        }

        async fn chat(&self, _history: &[ChatTurn], _message: &str) -> confab_external::Result<String> {
            Ok(self.chat_reply.lock().unwrap().clone())
        }

        async fn summarize(
            &self,
            _summary_type: SummaryType,
            _source_text: &str,
            _metadata: &MeetingMetadata,
        ) -> confab_external::Result<String> {
            Ok(self.chat_reply.lock().unwrap().clone())
        }

        async fn summarize_templated(
            &self,
            _summary_type: SummaryType,
            _source_text: &str,
            _metadata: &MeetingMetadata,
            _context: &MeetingContextHeader,
        ) -> confab_external::Result<serde_json::Value> {
            Ok(serde_json::json!({ "content": self.chat_reply.lock().unwrap().clone() }))
        }
    }

    #[test]
    fn update_tag_extracts_capture_group() {
        let re = update_tag_re();
        let caps = re.captures("[UPDATE:topic] X + budget section").unwrap();
        assert_eq!(&caps[1], "X + budget section");
    }

    #[test]
    fn update_tag_is_multiline() {
        let re = update_tag_re();
        let caps = re.captures("[UPDATE:topic] line one\nline two").unwrap();
        assert_eq!(&caps[1], "line one\nline two");
    }

    #[test]
    fn reply_without_tag_does_not_match() {
        let re = update_tag_re();
        assert!(re.captures("just the raw reply").is_none());
    }

    #[test]
    fn clarification_lists_summary_kinds() {
        let reply = clarification_reply();
        assert!(reply.contains("topic"));
        assert!(reply.contains("summary_nghi_quyet"));
    }

    #[test]
    fn fake_llm_compiles_against_the_trait() {
        let fake = FakeLlm {
            intent: IntentDecision {
                intent: ChatIntent::GeneralChitChat,
                entity: None,
                confidence: 1.0,
                edit_instruction: None,
            },
            chat_reply: Mutex::new(String::new()),
        };
        let _: &dyn Llm = &fake;
    }
}
