//! Fixed instruction templates for the retrieval chain.
//!
//! Templates use `{name}` slots filled by [`render`]. They are compiled
//! into the binary; callers cannot change them per request.

use crate::models::{ChatTurn, ScoredPassage};

/// Reply the model must give when the context does not contain the answer.
pub const NOT_CONFIDENT_PHRASE: &str = "Hmm, I'm not sure.";

/// Rewrites a follow-up into a standalone question.
pub const CONDENSE_TEMPLATE: &str = "Given the following conversation and a follow up question, \
rephrase the follow up question to be a standalone question. \
Replace pronouns and references with the names they refer to in the conversation.

Chat History:
{chat_history}
Follow Up Input: {question}
Standalone question:";

/// Answers from retrieved context only.
pub const QA_TEMPLATE: &str = "You are a helpful AI assistant. You are given the following extracted parts of a long document and a question. \
Provide a conversational answer based on the context provided.
You should only provide hyperlinks that reference the context below. Do NOT make up hyperlinks.
If you can't find the answer in the context below, just say \"Hmm, I'm not sure.\" Don't try to make up an answer.
If the question is not related to the context, politely respond that you are tuned to only answer questions that are related to the context.

{context}

Question: {question}
Helpful answer in markdown:";

/// Fill `{name}` slots in `template` in a single pass, so substituted
/// values are never re-expanded. Unknown slots are left untouched.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let slot = after
            .find('}')
            .and_then(|close| {
                let name = &after[..close];
                vars.iter()
                    .find(|(n, _)| *n == name)
                    .map(|(_, value)| (close, *value))
            });
        match slot {
            Some((close, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// `Human:` / `Assistant:` transcript of the prior turns.
pub fn format_chat_history(history: &[ChatTurn]) -> String {
    history
        .iter()
        .map(|turn| format!("Human: {}\nAssistant: {}", turn.question, turn.answer))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Passage texts separated by blank lines, in rank order.
pub fn format_context(passages: &[ScoredPassage]) -> String {
    passages
        .iter()
        .map(|p| p.page_content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn condense_prompt(question: &str, history: &[ChatTurn]) -> String {
    let chat_history = format_chat_history(history);
    render(
        CONDENSE_TEMPLATE,
        &[("chat_history", &chat_history), ("question", question)],
    )
}

pub fn qa_prompt(question: &str, passages: &[ScoredPassage]) -> String {
    let context = format_context(passages);
    render(QA_TEMPLATE, &[("context", &context), ("question", question)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PassageMetadata;

    fn passage(text: &str) -> ScoredPassage {
        ScoredPassage {
            id: text.to_string(),
            score: 1.0,
            page_content: text.to_string(),
            metadata: PassageMetadata {
                source: "a.pdf".to_string(),
                page_number: 1,
                total_pages: 1,
                chunk_index: 0,
            },
        }
    }

    #[test]
    fn qa_template_carries_grounding_rules() {
        assert!(QA_TEMPLATE.contains(NOT_CONFIDENT_PHRASE));
        assert!(QA_TEMPLATE.contains("Do NOT make up hyperlinks"));
        assert!(QA_TEMPLATE.contains("markdown"));
        assert!(QA_TEMPLATE.contains("{context}"));
        assert!(QA_TEMPLATE.contains("{question}"));
    }

    #[test]
    fn condense_prompt_includes_history_and_question() {
        let history = vec![ChatTurn::new("What is Rust?", "Rust is a language.")];
        let prompt = condense_prompt("Who maintains it?", &history);
        assert!(prompt.contains("Human: What is Rust?\nAssistant: Rust is a language."));
        assert!(prompt.contains("Follow Up Input: Who maintains it?"));
        assert!(!prompt.contains("{chat_history}"));
    }

    #[test]
    fn qa_prompt_joins_passages() {
        let prompt = qa_prompt("q?", &[passage("first"), passage("second")]);
        assert!(prompt.contains("first\n\nsecond"));
        assert!(prompt.contains("Question: q?"));
    }

    #[test]
    fn render_leaves_unknown_slots() {
        assert_eq!(render("{a} {b}", &[("a", "x")]), "x {b}");
    }

    #[test]
    fn render_does_not_reexpand_values() {
        let out = render(
            "{context} / {question}",
            &[("context", "mentions {question}"), ("question", "q")],
        );
        assert_eq!(out, "mentions {question} / q");
    }
}
