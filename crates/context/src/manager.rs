use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use live_transcripts_protocol::{Insight, KnowledgeItem};
use live_transcripts_transcript::TranscriptSnapshot;

use crate::client::{AiError, GenerativeAiClient};
use crate::limits::assemble_knowledge_block;
use crate::parser::parse_insights;

#[derive(Debug, Clone)]
pub struct ContextManagerConfig {
    pub knowledge_byte_budget: usize,
    pub answer_max_tokens: u32,
    pub answer_temperature: f32,
    pub insight_max_tokens: u32,
    pub insight_temperature: f32,
    pub question_max_tokens: u32,
    pub question_temperature: f32,
}

impl Default for ContextManagerConfig {
    fn default() -> Self {
        Self {
            knowledge_byte_budget: crate::limits::DEFAULT_KNOWLEDGE_BYTE_BUDGET,
            answer_max_tokens: 512,
            answer_temperature: 0.2,
            insight_max_tokens: 512,
            insight_temperature: 0.3,
            question_max_tokens: 128,
            question_temperature: 0.7,
        }
    }
}

/// Result of `answer_question`: the text, how long the AI call took, and
/// the transcript version it was generated against.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub latency: Duration,
    pub covers_up_to_version: u64,
}

/// Owns no mutable session state of its own; `answer_question`,
/// `generate_insights`, and `suggest_questions` are each a pure function of
/// `(transcript snapshot, focus, knowledge, now)` plus one AI round trip.
/// `suggest_questions` returns only the freshly generated question text —
/// rotating a `QuestionRotation`'s cursor is the caller's job, since doing
/// it here would mean holding the rotation lock across the AI call.
pub struct ContextManager {
    ai_client: Arc<dyn GenerativeAiClient>,
    config: ContextManagerConfig,
}

impl ContextManager {
    pub fn new(ai_client: Arc<dyn GenerativeAiClient>, config: ContextManagerConfig) -> Self {
        Self { ai_client, config }
    }

    fn preamble(&self, focus: &str, knowledge: &[KnowledgeItem]) -> String {
        let mut preamble = String::new();
        if !focus.is_empty() {
            preamble.push_str("Session focus: ");
            preamble.push_str(focus);
            preamble.push('\n');
        }
        if !knowledge.is_empty() {
            let (block, truncated) = assemble_knowledge_block(knowledge, self.config.knowledge_byte_budget);
            preamble.push_str("Known context:\n");
            preamble.push_str(&block);
            if truncated {
                preamble.push_str("(additional knowledge items omitted for length)\n");
            }
        }
        preamble
    }

    /// Answers a free-form question against the entire transcript. No
    /// rolling window is applied — the full text is always sent.
    pub async fn answer_question(
        &self,
        snapshot: &TranscriptSnapshot,
        focus: &str,
        knowledge: &[KnowledgeItem],
        question: &str,
    ) -> Result<Answer, AiError> {
        let prompt = format!(
            "{preamble}Transcript so far:\n{transcript}\n\nQuestion: {question}\nAnswer concisely based only on the transcript and known context above.",
            preamble = self.preamble(focus, knowledge),
            transcript = snapshot.text,
            question = question,
        );

        let started = Instant::now();
        let text = self
            .ai_client
            .generate(&prompt, self.config.answer_max_tokens, self.config.answer_temperature)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "answer_question AI call failed"))?;

        Ok(Answer {
            text,
            latency: started.elapsed(),
            covers_up_to_version: snapshot.version,
        })
    }

    /// Produces a mixed-kind batch of Insights: a short summary, bulletized
    /// action items, and follow-up questions, all parsed from one AI call
    /// over the full transcript.
    pub async fn generate_insights(
        &self,
        snapshot: &TranscriptSnapshot,
        focus: &str,
        knowledge: &[KnowledgeItem],
    ) -> Result<Vec<Insight>, AiError> {
        let prompt = format!(
            "{preamble}Transcript so far:\n{transcript}\n\n\
             Produce, one item per line: a short summary, any action items \
             (prefixed `Action:`), and any open follow-up questions (ending in `?`).",
            preamble = self.preamble(focus, knowledge),
            transcript = snapshot.text,
        );

        let raw = self
            .ai_client
            .generate(&prompt, self.config.insight_max_tokens, self.config.insight_temperature)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "generate_insights AI call failed"))?;

        let now = Utc::now();
        Ok(parse_insights(&raw)
            .into_iter()
            .map(|(kind, text)| Insight {
                kind,
                text,
                generated_at: now,
                covers_up_to_version: snapshot.version,
            })
            .collect())
    }

    /// Generates one rotating question's replacement text. Deliberately
    /// takes no `QuestionRotation` — rotating the slot and reading the
    /// current K+1 list are synchronous and belong to the caller, which
    /// otherwise would need to hold the rotation lock across this AI call.
    pub async fn suggest_questions(&self, snapshot: &TranscriptSnapshot, focus: &str) -> Result<String, AiError> {
        let prompt = format!(
            "{preamble}Transcript so far:\n{transcript}\n\n\
             Suggest one short, specific follow-up question a listener might ask next. Reply with only the question.",
            preamble = self.preamble(focus, &[]),
            transcript = snapshot.text,
        );

        let question = self
            .ai_client
            .generate(&prompt, self.config.question_max_tokens, self.config.question_temperature)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "suggest_questions AI call failed"))?
            .trim()
            .to_string();

        Ok(question)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use live_transcripts_protocol::InsightKind;

    struct StubClient {
        response: String,
    }

    #[async_trait]
    impl GenerativeAiClient for StubClient {
        async fn generate(&self, _prompt: &str, _max_tokens: u32, _temperature: f32) -> Result<String, AiError> {
            Ok(self.response.clone())
        }
    }

    fn snapshot(version: u64, text: &str) -> TranscriptSnapshot {
        TranscriptSnapshot { version, text: text.to_string() }
    }

    #[tokio::test]
    async fn answer_question_reports_the_snapshot_version() {
        let manager = ContextManager::new(
            Arc::new(StubClient { response: "42".to_string() }),
            ContextManagerConfig::default(),
        );
        let answer = manager
            .answer_question(&snapshot(7, "we discussed the roadmap"), "", &[], "what did we discuss?")
            .await
            .unwrap();

        assert_eq!(answer.text, "42");
        assert_eq!(answer.covers_up_to_version, 7);
    }

    #[tokio::test]
    async fn generate_insights_parses_mixed_kinds() {
        let manager = ContextManager::new(
            Arc::new(StubClient {
                response: "Covered Q3 planning.\nAction: send recap email\nWill we revisit next week?".to_string(),
            }),
            ContextManagerConfig::default(),
        );
        let insights = manager
            .generate_insights(&snapshot(3, "some transcript text"), "", &[])
            .await
            .unwrap();

        assert_eq!(insights.len(), 3);
        assert_eq!(insights[0].kind, InsightKind::Summary);
        assert_eq!(insights[1].kind, InsightKind::ActionItem);
        assert_eq!(insights[2].kind, InsightKind::Question);
        assert!(insights.iter().all(|i| i.covers_up_to_version == 3));
    }

    #[tokio::test]
    async fn suggest_questions_rotates_exactly_one_slot() {
        let manager = ContextManager::new(
            Arc::new(StubClient { response: "What's the rollout date?".to_string() }),
            ContextManagerConfig::default(),
        );
        let mut rotation = crate::questions::QuestionRotation::new(3);
        let before = rotation.all();

        let question = manager.suggest_questions(&snapshot(1, "some text"), "").await.unwrap();
        rotation.rotate(question);
        let after = rotation.all();

        assert_eq!(after.len(), 4);
        assert_eq!(after[0], crate::questions::SUMMARIZE_RECENT_DISCUSSION);
        let changed = before.iter().zip(after.iter()).filter(|(a, b)| a != b).count();
        assert_eq!(changed, 1);
    }
}
