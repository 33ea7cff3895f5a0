use std::env;

use eyre::{Result, WrapErr};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/";

const BASE_URL_VAR: &str = "CHAT_BACKEND_URL";
const PROCEED_VAR: &str = "CHAT_PROCEED_ON_ARTICLE_FAILURE";

/// Runtime settings for the chat client.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address of the backend; endpoint names are joined onto it.
    pub base_url: Url,
    /// Still ask the article question when loading the article failed.
    pub proceed_on_article_failure: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let base_url = env::var(BASE_URL_VAR).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let proceed = env::var(PROCEED_VAR).ok();

        Ok(Self {
            base_url: parse_base_url(&base_url)?,
            proceed_on_article_failure: proceed.as_deref().map(parse_flag).unwrap_or(false),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        self.base_url = parse_base_url(base_url)?;
        Ok(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url is valid"),
            proceed_on_article_failure: false,
        }
    }
}

/// Parse a base URL, making sure it ends with `/` so that `Url::join`
/// appends endpoint names instead of replacing the last path segment.
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let mut raw = raw.trim().to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }
    Url::parse(&raw).wrap_err_with(|| format!("invalid backend url: {}", raw))
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let url = parse_base_url("http://localhost:9000/api").unwrap();
        assert_eq!(url.as_str(), "http://localhost:9000/api/");
        assert_eq!(url.join("chat").unwrap().as_str(), "http://localhost:9000/api/chat");
    }

    #[test]
    fn invalid_base_url_is_an_error() {
        assert!(parse_base_url("not a url").is_err());
    }

    #[test]
    fn flags() {
        assert!(parse_flag("1"));
        assert!(parse_flag(" TRUE "));
        assert!(!parse_flag("0"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn default_points_at_localhost() {
        let config = Config::default();
        assert_eq!(config.base_url.as_str(), DEFAULT_BASE_URL);
        assert!(!config.proceed_on_article_failure);
    }
}
