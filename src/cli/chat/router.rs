//! Picks the backend endpoint and payload for a user turn.
//!
//! The choice is an ordered table of rules; the first rule that applies wins.

use serde::Serialize;
use tracing::debug;

use super::context::ContextState;
use super::locator::is_locator;

pub const DOCUMENT_SUMMARY_PROMPT: &str = "Summarize the contents of the document.";
pub const ARTICLE_SUMMARY_PROMPT: &str = "Summarize the contents of the article.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Chat,
    AskDocument,
    AskArticle,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Chat => "chat",
            Endpoint::AskDocument => "ask_pdf",
            Endpoint::AskArticle => "ask_article",
        }
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self, Endpoint::Chat)
    }
}

/// JSON body sent to an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Prompt { prompt: String },
    Query { query: String },
    Question { question: String },
}

impl Payload {
    pub fn text(&self) -> &str {
        match self {
            Payload::Prompt { prompt } => prompt,
            Payload::Query { query } => query,
            Payload::Question { question } => question,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    pub endpoint: Endpoint,
    pub payload: Payload,
    /// Article to load before the request is dispatched.
    pub preload_article: Option<String>,
    /// Text to record as the user turn, if any.
    pub user_turn: Option<String>,
    /// Name of the rule that produced this decision.
    pub rule: &'static str,
}

struct RouteInput<'a> {
    text: &'a str,
    is_locator: bool,
    has_attached_document: bool,
    document_ready: bool,
    article_ready: bool,
}

struct Rule {
    name: &'static str,
    applies: fn(&RouteInput) -> bool,
    build: fn(&RouteInput) -> (Endpoint, Payload, Option<String>),
}

fn or_default(text: &str, fallback: &str) -> String {
    if text.is_empty() {
        fallback.to_string()
    } else {
        text.to_string()
    }
}

const RULES: &[Rule] = &[
    Rule {
        name: "attached-document",
        applies: |input| input.has_attached_document,
        build: |input| {
            let query = or_default(input.text, DOCUMENT_SUMMARY_PROMPT);
            (Endpoint::AskDocument, Payload::Query { query }, None)
        },
    },
    Rule {
        name: "article-locator",
        applies: |input| input.is_locator,
        build: |input| {
            let question = or_default(input.text, ARTICLE_SUMMARY_PROMPT);
            let preload = Some(input.text.to_string());
            (Endpoint::AskArticle, Payload::Question { question }, preload)
        },
    },
    Rule {
        name: "article-context",
        applies: |input| input.article_ready,
        build: |input| {
            let question = input.text.to_string();
            (Endpoint::AskArticle, Payload::Question { question }, None)
        },
    },
    Rule {
        name: "document-context",
        applies: |input| input.document_ready,
        build: |input| {
            let query = input.text.to_string();
            (Endpoint::AskDocument, Payload::Query { query }, None)
        },
    },
    Rule {
        name: "chat",
        applies: |_| true,
        build: |input| {
            let prompt = input.text.to_string();
            (Endpoint::Chat, Payload::Prompt { prompt }, None)
        },
    },
];

/// Route one user turn.
///
/// Returns `None` when the turn should be ignored: the text is blank and
/// no document is attached.
pub fn route(
    text: &str,
    context: &ContextState,
    has_attached_document: bool,
) -> Option<RoutingDecision> {
    let text = text.trim();
    let locator = is_locator(text);

    if text.is_empty() && !has_attached_document && !locator {
        debug!("Ignoring empty turn");
        return None;
    }

    let input = RouteInput {
        text,
        is_locator: locator,
        has_attached_document,
        document_ready: context.document_ready(),
        article_ready: context.article_ready(),
    };

    let rule = RULES.iter().find(|rule| (rule.applies)(&input))?;
    let (endpoint, payload, preload_article) = (rule.build)(&input);
    let user_turn = (!text.is_empty() || locator).then(|| text.to_string());

    debug!("Routing via rule {} to /{}", rule.name, endpoint.path());

    Some(RoutingDecision {
        endpoint,
        payload,
        preload_article,
        user_turn,
        rule: rule.name,
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::cli::chat::context::DocumentHandle;

    fn with_document() -> ContextState {
        let mut context = ContextState::new();
        context.attach_document(DocumentHandle::new(PathBuf::from("paper.pdf")));
        context
    }

    #[test]
    fn attached_document_wins_over_everything() {
        let mut context = with_document();
        context.mark_article_ready();

        for text in ["what is this?", "https://example.com/a"] {
            let decision = route(text, &context, true).unwrap();
            assert_eq!(decision.endpoint, Endpoint::AskDocument);
            assert_eq!(decision.payload, Payload::Query { query: text.to_string() });
            assert!(decision.preload_article.is_none());
        }
    }

    #[test]
    fn attached_document_with_empty_text_summarizes_without_user_turn() {
        let context = with_document();
        let decision = route("   ", &context, true).unwrap();
        assert_eq!(decision.endpoint, Endpoint::AskDocument);
        assert_eq!(decision.payload.text(), DOCUMENT_SUMMARY_PROMPT);
        assert!(decision.user_turn.is_none());
    }

    #[test]
    fn locator_preloads_article() {
        let context = ContextState::new();
        let decision = route(" https://example.com ", &context, false).unwrap();
        assert_eq!(decision.endpoint, Endpoint::AskArticle);
        assert_eq!(decision.preload_article.as_deref(), Some("https://example.com"));
        assert_eq!(decision.payload.text(), "https://example.com");
        assert_eq!(decision.user_turn.as_deref(), Some("https://example.com"));
        assert_eq!(decision.rule, "article-locator");
    }

    #[test]
    fn ready_article_gets_raw_question() {
        let mut context = ContextState::new();
        context.mark_article_ready();
        context.mark_document_ready();
        let decision = route("who wrote it?", &context, false).unwrap();
        assert_eq!(decision.endpoint, Endpoint::AskArticle);
        assert_eq!(
            decision.payload,
            Payload::Question { question: "who wrote it?".to_string() }
        );
        assert!(decision.preload_article.is_none());
    }

    #[test]
    fn ready_document_without_attachment_gets_query() {
        let mut context = ContextState::new();
        context.mark_document_ready();
        let decision = route("page count?", &context, false).unwrap();
        assert_eq!(decision.endpoint, Endpoint::AskDocument);
        assert_eq!(decision.payload, Payload::Query { query: "page count?".to_string() });
    }

    #[test]
    fn falls_back_to_chat() {
        let context = ContextState::new();
        let decision = route("  tell me a joke ", &context, false).unwrap();
        assert_eq!(decision.endpoint, Endpoint::Chat);
        assert_eq!(decision.payload, Payload::Prompt { prompt: "tell me a joke".to_string() });
        assert_eq!(decision.user_turn.as_deref(), Some("tell me a joke"));
    }

    #[test]
    fn empty_text_without_document_is_ignored() {
        let context = ContextState::new();
        assert!(route("", &context, false).is_none());
        assert!(route(" \n ", &context, false).is_none());
    }

    #[test]
    fn detached_document_falls_through() {
        let mut context = with_document();
        context.mark_document_ready();
        context.detach_document();
        let decision = route("hello", &context, context.document_attached()).unwrap();
        assert_eq!(decision.endpoint, Endpoint::Chat);
    }

    #[test]
    fn payload_serializes_as_flat_object() {
        let body = serde_json::to_value(Payload::Question { question: "q".into() }).unwrap();
        assert_eq!(body, serde_json::json!({ "question": "q" }));
        let body = serde_json::to_value(Payload::Prompt { prompt: "p".into() }).unwrap();
        assert_eq!(body, serde_json::json!({ "prompt": "p" }));
    }

    #[test]
    fn endpoint_paths() {
        assert_eq!(Endpoint::Chat.path(), "chat");
        assert_eq!(Endpoint::AskDocument.path(), "ask_pdf");
        assert_eq!(Endpoint::AskArticle.path(), "ask_article");
        assert!(Endpoint::Chat.is_streaming());
        assert!(!Endpoint::AskArticle.is_streaming());
    }
}
