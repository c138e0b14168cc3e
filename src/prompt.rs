//! Grounding prompt assembly.

use crate::models::ConversationTurn;

/// Fixed system message sent with every completion.
pub const SYSTEM_MESSAGE: &str = "You are a helpful assistant answering questions about a person's \
professional background on their portfolio website. Stay factual and grounded in the provided context.";

const PREAMBLE: &str = "You are answering questions on behalf of the person described below, \
speaking in the first person as them.
- Answer only from the context provided. Do not invent employers, dates, projects or skills.
- Keep answers concise: a few sentences unless more detail is asked for.
- If the context does not cover the question, say so plainly and suggest getting in touch directly.";

/// Number of history turns included when the caller does not configure it.
pub const DEFAULT_HISTORY_TURNS: usize = 6;

/// Build the user message for one query.
///
/// Layout: preamble, `Context:` block (passages separated by blank lines),
/// optional `Previous conversation:` block holding the last
/// `history_turns` turns as `role: content` lines, then the question.
pub fn compose(
    question: &str,
    context: &[String],
    history: &[ConversationTurn],
    history_turns: usize,
) -> String {
    let mut prompt = String::with_capacity(
        PREAMBLE.len() + question.len() + context.iter().map(String::len).sum::<usize>() + 64,
    );
    prompt.push_str(PREAMBLE);
    prompt.push_str("\n\nContext:\n");
    prompt.push_str(&context.join("\n\n"));

    let start = history.len().saturating_sub(history_turns);
    let recent = &history[start..];
    if !recent.is_empty() {
        prompt.push_str("\n\nPrevious conversation:\n");
        let lines: Vec<String> = recent
            .iter()
            .map(|turn| format!("{}: {}", turn.role.as_str(), turn.content))
            .collect();
        prompt.push_str(&lines.join("\n"));
    }

    prompt.push_str("\n\nQuestion: ");
    prompt.push_str(question);
    prompt
}
