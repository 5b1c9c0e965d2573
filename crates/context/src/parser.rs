use live_transcripts_protocol::InsightKind;

/// Classify one line of a generated insights response by its leading
/// marker. Unclassified lines default to `Summary`, per the lenient,
/// line-oriented parsing the model's output requires — the prompt asks
/// for a summary, action items, and follow-up questions, but a model
/// rarely labels every line consistently.
fn classify_line(line: &str) -> InsightKind {
    let trimmed = line.trim_start();
    let lower = trimmed.to_lowercase();

    if lower.starts_with("action:")
        || lower.starts_with("action item:")
        || lower.starts_with("todo:")
        || trimmed.starts_with("- [ ]")
        || trimmed.starts_with("[ ]")
    {
        InsightKind::ActionItem
    } else if trimmed.ends_with('?') || lower.starts_with("question:") {
        InsightKind::Question
    } else {
        InsightKind::Summary
    }
}

/// Strip a recognized leading marker (`- `, `* `, `Action:`, etc.) once the
/// line's kind is known, so the surfaced text doesn't repeat it.
fn strip_marker(line: &str, kind: InsightKind) -> String {
    let trimmed = line.trim();
    let without_bullet = trimmed
        .strip_prefix("- [ ]")
        .or_else(|| trimmed.strip_prefix("[ ]"))
        .or_else(|| trimmed.strip_prefix("- "))
        .or_else(|| trimmed.strip_prefix("* "))
        .unwrap_or(trimmed)
        .trim();

    match kind {
        InsightKind::ActionItem => strip_ci_prefix(without_bullet, &["action item:", "action:", "todo:"]),
        InsightKind::Question => strip_ci_prefix(without_bullet, &["question:"]),
        InsightKind::Summary => without_bullet.to_string(),
    }
}

fn strip_ci_prefix(s: &str, prefixes: &[&str]) -> String {
    let lower = s.to_lowercase();
    for prefix in prefixes {
        if lower.starts_with(prefix) {
            return s[prefix.len()..].trim().to_string();
        }
    }
    s.to_string()
}

/// Parse a raw generated-insights response into `(kind, text)` pairs, one
/// per non-empty line. Blank lines are dropped.
pub fn parse_insights(raw: &str) -> Vec<(InsightKind, String)> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let kind = classify_line(line);
            (kind, strip_marker(line, kind))
        })
        .filter(|(_, text)| !text.is_empty())
        .collect()
}
