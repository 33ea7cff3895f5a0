use std::sync::Mutex;

use serde::Deserialize;
use tracing::{debug, warn};

use super::conversation_state::{ConversationState, LiveTurn};
use super::lock;
use crate::backend_client::ResponseHandle;
use crate::error::ClientError;

pub const FAILURE_MESSAGE: &str = "An error occurred while generating a response.";

#[derive(Debug, Deserialize)]
struct AnswerPayload {
    answer: String,
}

/// Pull the `answer` field out of a QA response body.
pub fn parse_answer(body: &str) -> Result<String, ClientError> {
    serde_json::from_str::<AnswerPayload>(body)
        .map(|payload| payload.answer)
        .map_err(|e| ClientError::AnswerParse(e.to_string()))
}

/// How a response ended up in the log.
#[derive(Debug)]
pub enum Consumed {
    /// Streamed to completion; holds the full text.
    Streamed(String),
    /// A single answer was appended.
    Answered(String),
    /// The failure turn was appended.
    Failed(ClientError),
}

/// Folds streamed chunks into a single assistant turn.
///
/// The first chunk creates the turn, every later one rewrites it.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    text: String,
    live: Option<LiveTurn>,
}

impl StreamAccumulator {
    pub fn apply(&mut self, log: &mut ConversationState, chunk: &str) {
        self.text.push_str(chunk);
        match &self.live {
            Some(live) => log.update_live_message(live, &self.text),
            None => self.live = Some(log.begin_live_message(&self.text)),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// Write the outcome of one request into the log.
///
/// Every failure becomes exactly one failure turn. Chunks that were already
/// streamed stay in place.
pub async fn consume(
    response: Result<ResponseHandle, ClientError>,
    log: &Mutex<ConversationState>,
    on_chunk: &mut (dyn FnMut(&str) + Send),
) -> Consumed {
    let result = match response {
        Ok(ResponseHandle::Stream(mut rx)) => {
            let mut accumulator = StreamAccumulator::default();
            let mut failure = None;

            while let Some(chunk) = rx.recv().await {
                match chunk {
                    Ok(chunk) => {
                        accumulator.apply(&mut lock(log), &chunk);
                        on_chunk(&chunk);
                    }
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
            }

            debug!("Stream finished after {} bytes", accumulator.text().len());
            match failure {
                Some(e) => Err(e),
                None => Ok(Consumed::Streamed(accumulator.into_text())),
            }
        }
        Ok(ResponseHandle::Body(body)) => parse_answer(&body).map(|answer| {
            lock(log).add_assistant_message(&answer);
            Consumed::Answered(answer)
        }),
        Err(e) => Err(e),
    };

    result.unwrap_or_else(|e| {
        warn!("Response failed: {}", e);
        lock(log).add_assistant_message(FAILURE_MESSAGE);
        Consumed::Failed(e)
    })
}
