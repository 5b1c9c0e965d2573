//! Prompt assembly limits.
//!
//! Centralizes the byte budgets applied when assembling AI prompts, so the
//! knowledge block and (if ever required) the transcript truncation path
//! share one source of truth.

/// Default ceiling on the serialized knowledge-item block, in bytes.
pub const DEFAULT_KNOWLEDGE_BYTE_BUDGET: usize = 4096;

/// Join knowledge item texts (as `name: text` lines) up to `budget_bytes`,
/// dropping whole items from the end once the budget would be exceeded.
/// Returns the assembled block and whether anything was dropped.
pub fn assemble_knowledge_block(
    items: &[live_transcripts_protocol::KnowledgeItem],
    budget_bytes: usize,
) -> (String, bool) {
    let mut block = String::new();
    let mut truncated = false;

    for item in items {
        let line = format!("{}: {}\n", item.name, item.text);
        if block.len() + line.len() > budget_bytes {
            truncated = true;
            break;
        }
        block.push_str(&line);
    }

    (block, truncated)
}

/// Truncate `text` to at most `budget_bytes`, dropping from the *front* so
/// the most recent content (the end of a growing transcript) survives.
/// Only used when an AI backend imposes a hard prompt size bound; the
/// default path sends the full transcript untruncated.
pub fn truncate_front_to_budget(text: &str, budget_bytes: usize) -> (String, bool) {
    if text.len() <= budget_bytes {
        return (text.to_string(), false);
    }
    let start = text.len() - budget_bytes;
    // Avoid splitting a UTF-8 code point.
    let boundary = (start..text.len())
        .find(|&i| text.is_char_boundary(i))
        .unwrap_or(text.len());
    (text[boundary..].to_string(), true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use live_transcripts_protocol::KnowledgeItem;

    #[test]
    fn knowledge_block_includes_all_items_under_budget() {
        let items = vec![
            KnowledgeItem { id: "1".into(), name: "roadmap".into(), text: "ship v2".into() },
            KnowledgeItem { id: "2".into(), name: "owner".into(), text: "alex".into() },
        ];
        let (block, truncated) = assemble_knowledge_block(&items, 4096);
        assert!(!truncated);
        assert!(block.contains("roadmap: ship v2"));
        assert!(block.contains("owner: alex"));
    }

    #[test]
    fn knowledge_block_drops_items_once_budget_exceeded() {
        let items = vec![
            KnowledgeItem { id: "1".into(), name: "a".into(), text: "x".repeat(20) },
            KnowledgeItem { id: "2".into(), name: "b".into(), text: "y".repeat(20) },
        ];
        let (block, truncated) = assemble_knowledge_block(&items, 25);
        assert!(truncated);
        assert!(block.contains("a:"));
        assert!(!block.contains("b:"));
    }

    #[test]
    fn front_truncation_keeps_the_tail() {
        let text = "0123456789";
        let (kept, truncated) = truncate_front_to_budget(text, 4);
        assert!(truncated);
        assert_eq!(kept, "6789");
    }

    #[test]
    fn front_truncation_is_a_no_op_under_budget() {
        let (kept, truncated) = truncate_front_to_budget("short", 100);
        assert!(!truncated);
        assert_eq!(kept, "short");
    }
}
