/// First slot of every `SuggestedQuestions` list, fixed per spec.
pub const SUMMARIZE_RECENT_DISCUSSION: &str = "Summarize recent discussion";

/// Filled into rotating slots before the first AI-generated question ever
/// lands in them, so a fresh session always has something non-empty to
/// show.
const DEFAULT_QUESTION_POOL: &[&str] = &[
    "What decisions have been made so far?",
    "What are the open action items?",
    "Who is responsible for the next steps?",
    "What risks were raised?",
    "What questions remain unanswered?",
];

/// K rotating question slots plus an implicit fixed first slot
/// (`SUMMARIZE_RECENT_DISCUSSION`). Exactly one slot regenerates per tick,
/// round-robin; the cursor is session state, not global.
#[derive(Debug, Clone)]
pub struct QuestionRotation {
    slots: Vec<String>,
    cursor: usize,
}

impl QuestionRotation {
    /// `k` must be at least 1; a session with `k == 0` would have no
    /// rotating slots at all, which the spec's `K+1` framing doesn't
    /// anticipate.
    pub fn new(k: usize) -> Self {
        let k = k.max(1);
        let slots = (0..k)
            .map(|i| DEFAULT_QUESTION_POOL[i % DEFAULT_QUESTION_POOL.len()].to_string())
            .collect();
        Self { slots, cursor: 0 }
    }

    /// The full K+1 list, fixed slot first.
    pub fn all(&self) -> Vec<String> {
        std::iter::once(SUMMARIZE_RECENT_DISCUSSION.to_string())
            .chain(self.slots.iter().cloned())
            .collect()
    }

    /// Replace the current cursor slot with `question` and advance the
    /// cursor. Returns the index (into the K rotating slots, 0-based) that
    /// was just replaced.
    pub fn rotate(&mut self, question: String) -> usize {
        let idx = self.cursor;
        self.slots[idx] = question;
        self.cursor = (self.cursor + 1) % self.slots.len();
        idx
    }
}
