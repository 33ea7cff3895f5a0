use thiserror::Error;

/// Failures produced while talking to the chat backend.
///
/// None of these are fatal to a session: the session turns them into a
/// failure turn or a status line.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Document upload failed: {0}")]
    Upload(String),

    #[error("Article load failed: {0}")]
    ArticleLoad(String),

    #[error("Could not decode streamed answer: {0}")]
    StreamDecode(String),

    #[error("Could not parse answer: {0}")]
    AnswerParse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Backend returned {status} for /{endpoint}: {body}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    #[error("Invalid endpoint url: {0}")]
    Url(#[from] url::ParseError),

    #[error("Could not read document {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Another request is still in progress")]
    Busy,
}
