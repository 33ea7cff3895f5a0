use url::Url;

/// Returns true when `text` is an absolute URL with a scheme and an authority.
///
/// Parse failures are a plain `false`.
pub fn is_locator(text: &str) -> bool {
    match Url::parse(text) {
        Ok(url) => url.has_host(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_absolute_urls() {
        assert!(is_locator("https://example.com/a"));
        assert!(is_locator("https://example.com"));
        assert!(is_locator("http://127.0.0.1:8000/news?id=4"));
    }

    #[test]
    fn rejects_plain_text() {
        assert!(!is_locator("hello"));
        assert!(!is_locator(""));
        assert!(!is_locator("   "));
        assert!(!is_locator("example.com/a"));
        assert!(!is_locator("what is https://example.com about?"));
    }

    #[test]
    fn rejects_urls_without_authority() {
        assert!(!is_locator("mailto:someone@example.com"));
        assert!(!is_locator("data:text/plain,hi"));
    }

    #[test]
    fn is_stable_across_calls() {
        for text in ["hello", "https://example.com/a", ""] {
            assert_eq!(is_locator(text), is_locator(text));
        }
    }
}
