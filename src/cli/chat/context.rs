use std::path::PathBuf;

use tracing::info;

/// A document the user picked for question answering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHandle {
    pub path: PathBuf,
    pub name: String,
}

impl DocumentHandle {
    pub fn new(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "document.pdf".to_string());
        Self { path, name }
    }
}

/// Tracks which backend context is available for the next turn.
///
/// Every operation is a total state transition.
#[derive(Debug, Default, Clone)]
pub struct ContextState {
    document: Option<DocumentHandle>,
    document_ready: bool,
    article_ready: bool,
}

impl ContextState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaching always starts unprocessed; readiness needs `mark_document_ready`.
    pub fn attach_document(&mut self, handle: DocumentHandle) {
        info!("Document attached: {}", handle.name);
        self.document = Some(handle);
        self.document_ready = false;
    }

    pub fn mark_document_ready(&mut self) {
        self.document_ready = true;
    }

    /// Forgets the handle and clears both document flags together.
    /// Article readiness is left alone.
    pub fn detach_document(&mut self) {
        if let Some(handle) = self.document.take() {
            info!("Document detached: {}", handle.name);
        }
        self.document_ready = false;
    }

    pub fn mark_article_ready(&mut self) {
        self.article_ready = true;
    }

    pub fn mark_article_failed(&mut self) {
        self.article_ready = false;
    }

    pub fn forget_article(&mut self) {
        self.article_ready = false;
    }

    pub fn document(&self) -> Option<&DocumentHandle> {
        self.document.as_ref()
    }

    pub fn document_attached(&self) -> bool {
        self.document.is_some()
    }

    pub fn document_ready(&self) -> bool {
        self.document_ready
    }

    pub fn article_ready(&self) -> bool {
        self.article_ready
    }

    pub fn describe(&self) -> String {
        let document = match self.document() {
            Some(handle) if self.document_ready => format!("{} (ready)", handle.name),
            Some(handle) => format!("{} (processing)", handle.name),
            None => "none".to_string(),
        };
        let article = if self.article_ready { "loaded" } else { "none" };
        format!("Document: {}\nArticle: {}", document, article)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> DocumentHandle {
        DocumentHandle::new(PathBuf::from("/tmp/report.pdf"))
    }

    #[test]
    fn starts_empty() {
        let state = ContextState::new();
        assert!(!state.document_attached());
        assert!(!state.document_ready());
        assert!(!state.article_ready());
    }

    #[test]
    fn attach_is_not_ready_until_marked() {
        let mut state = ContextState::new();
        state.attach_document(handle());
        assert!(state.document_attached());
        assert!(!state.document_ready());
        assert_eq!(state.document().unwrap().name, "report.pdf");

        state.mark_document_ready();
        assert!(state.document_ready());
    }

    #[test]
    fn reattach_resets_readiness() {
        let mut state = ContextState::new();
        state.attach_document(handle());
        state.mark_document_ready();
        state.attach_document(DocumentHandle::new(PathBuf::from("other.pdf")));
        assert!(!state.document_ready());
    }

    #[test]
    fn detach_clears_both_document_flags_but_not_article() {
        let mut state = ContextState::new();
        state.attach_document(handle());
        state.mark_document_ready();
        state.mark_article_ready();

        state.detach_document();
        assert!(!state.document_attached());
        assert!(!state.document_ready());
        assert!(state.document().is_none());
        assert!(state.article_ready());
    }

    #[test]
    fn detach_without_document_is_harmless() {
        let mut state = ContextState::new();
        state.detach_document();
        assert!(!state.document_attached());
    }

    #[test]
    fn article_flag_transitions() {
        let mut state = ContextState::new();
        state.mark_article_ready();
        assert!(state.article_ready());
        state.mark_article_failed();
        assert!(!state.article_ready());
        state.mark_article_ready();
        state.forget_article();
        assert!(!state.article_ready());
    }

    #[test]
    fn describe_reports_progress() {
        let mut state = ContextState::new();
        state.attach_document(handle());
        assert!(state.describe().contains("report.pdf (processing)"));
        state.mark_document_ready();
        assert!(state.describe().contains("report.pdf (ready)"));
        assert!(state.describe().contains("Article: none"));
    }
}
