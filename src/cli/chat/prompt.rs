use rustyline::{Config, Editor, Result};

use super::context::ContextState;

/// Prompt text showing which context the next turn will use.
pub fn generate_prompt(context: &ContextState) -> String {
    if context.document_attached() {
        "pdf> ".to_string()
    } else if context.article_ready() {
        "article> ".to_string()
    } else {
        "> ".to_string()
    }
}

pub fn rl() -> Result<Editor<()>> {
    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(false)
        .build();
    Editor::with_config(config)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::cli::chat::context::DocumentHandle;

    #[test]
    fn prompt_follows_context() {
        let mut context = ContextState::new();
        assert_eq!(generate_prompt(&context), "> ");

        context.mark_article_ready();
        assert_eq!(generate_prompt(&context), "article> ");

        context.attach_document(DocumentHandle::new(PathBuf::from("a.pdf")));
        assert_eq!(generate_prompt(&context), "pdf> ");
    }
}
