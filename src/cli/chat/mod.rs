pub mod command;
pub mod consumer;
pub mod context;
pub mod conversation_state;
pub mod locator;
pub mod prompt;
pub mod router;
pub mod session;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use color_print::cformat;
use command::Command;
use eyre::Result;
use prompt::generate_prompt;
use session::{SendOutcome, Session, SessionEvent, SessionOptions};
use tracing::debug;

use crate::backend_client::BackendClient;
use crate::cli::chat::consumer::FAILURE_MESSAGE;
use crate::config::Config;

const WELCOME_TEXT: &str = "
Hi, I'm your assistant. Ask me anything.

Things to try
• Paste a link to an article and ask questions about it.
• Attach a PDF with /attach and ask about its contents.
• Just chat.

/help         Show the help dialogue
/quit         Quit the application
";

const HELP_TEXT: &str = "
Context Chat CLI

/attach PATH      Upload a PDF; questions go to it while attached
/detach           Detach the current PDF
/forget-article   Stop answering from the loaded article
/status           Show the current document and article context
/history          Show the conversation so far
/clear            Clear the conversation history
/help             Show this help dialogue
/quit             Quit the application

A line that is a URL loads that article and asks about it.
An empty line with a PDF attached asks for a summary.
Start a line with // to send text that begins with /.
";

/// Lock a shared value, ignoring poisoning.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Resolve a user-supplied path, expanding `~` and making it absolute.
pub fn sanitize_path(path: &str) -> PathBuf {
    let path = path.trim();

    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }

    let path_buf = Path::new(path);
    if path_buf.is_relative() {
        if let Ok(current_dir) = std::env::current_dir() {
            return current_dir.join(path_buf);
        }
    }

    path_buf.to_path_buf()
}

pub struct ChatContext {
    output: Box<dyn Write + Send>,
    input: Option<String>,
    document: Option<String>,
    interactive: bool,
    session: Session,
}

impl ChatContext {
    pub fn new(
        output: Box<dyn Write + Send>,
        config: &Config,
        input: Option<String>,
        document: Option<String>,
        interactive: bool,
    ) -> Self {
        let backend = Arc::new(BackendClient::new(config.base_url.clone()));
        let options = SessionOptions {
            proceed_on_article_failure: config.proceed_on_article_failure,
        };

        Self {
            output,
            input,
            document,
            interactive,
            session: Session::new(backend, options),
        }
    }

    pub async fn run(&mut self) -> Result<ExitCode> {
        if self.interactive {
            self.print_welcome()?;
        }

        if let Some(document) = self.document.take() {
            if !self.attach(&document).await? && !self.interactive {
                return Ok(ExitCode::FAILURE);
            }
        }

        // Non-interactive mode (single turn)
        if let Some(input) = self.input.take() {
            self.process_chat_input(&input).await?;
            return Ok(ExitCode::SUCCESS);
        }

        if self.interactive {
            self.run_interactive().await?;
        }

        Ok(ExitCode::SUCCESS)
    }

    fn print_welcome(&mut self) -> Result<()> {
        writeln!(self.output, "{}", WELCOME_TEXT)?;
        Ok(())
    }

    async fn run_interactive(&mut self) -> Result<()> {
        let mut rl = prompt::rl()?;

        loop {
            let prompt_text = generate_prompt(&self.session.context());
            let readline = rl.readline(&prompt_text);

            match readline {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str());
                    }

                    if Command::parse(&line) == Command::Quit {
                        break;
                    }

                    if let Err(e) = self.handle_input(&line).await {
                        writeln!(self.output, "Error: {}", e)?;
                    }
                }
                Err(rustyline::error::ReadlineError::Interrupted) => continue,
                Err(rustyline::error::ReadlineError::Eof) => break,
                Err(e) => {
                    writeln!(self.output, "Error: {}", e)?;
                    break;
                }
            }
        }

        Ok(())
    }

    async fn handle_input(&mut self, input: &str) -> Result<()> {
        match Command::parse(input) {
            Command::Help => {
                writeln!(self.output, "{}", HELP_TEXT)?;
            }
            Command::Quit => {}
            Command::Clear => {
                self.session.clear_log();
                writeln!(self.output, "Conversation cleared.")?;
            }
            Command::Status => {
                writeln!(self.output, "{}", self.session.context().describe())?;
                if let Some(status) = self.session.status() {
                    writeln!(self.output, "Last status: {}", status)?;
                }
            }
            Command::History => self.print_history()?,
            Command::Attach(None) => {
                writeln!(self.output, "Usage: /attach PATH")?;
            }
            Command::Attach(Some(path)) => {
                self.attach(&path).await?;
            }
            Command::Detach => {
                self.session.detach_document();
                writeln!(self.output, "Document detached.")?;
            }
            Command::ForgetArticle => {
                self.session.forget_article();
                writeln!(self.output, "Article context cleared.")?;
            }
            Command::Send(text) => self.process_chat_input(&text).await?,
        }

        Ok(())
    }

    /// Returns whether the document is ready.
    async fn attach(&mut self, path: &str) -> Result<bool> {
        let path = sanitize_path(path);
        writeln!(self.output, "{}", cformat!("<dim>Uploading {}...</>", path.display()))?;

        match self.session.attach_document(path).await {
            Ok(()) => match self.session.status() {
                Some(status) => {
                    writeln!(self.output, "{}", cformat!("<green>✔ {}</>", status))?;
                    Ok(true)
                }
                None => {
                    writeln!(self.output, "{}", cformat!("<dim>Document was detached</>"))?;
                    Ok(false)
                }
            },
            Err(e) => {
                let status = self.session.status().unwrap_or_default();
                writeln!(self.output, "{}", cformat!("<red>✘ {}: {}</>", status, e))?;
                Ok(false)
            }
        }
    }

    fn print_history(&mut self) -> Result<()> {
        let turns = self.session.turns();
        if turns.is_empty() {
            writeln!(self.output, "No messages yet.")?;
        }
        for turn in turns {
            writeln!(
                self.output,
                "[{}] {}: {}",
                turn.at.format("%H:%M:%S"),
                turn.role,
                turn.content
            )?;
        }
        Ok(())
    }

    async fn process_chat_input(&mut self, input: &str) -> Result<()> {
        let output = &mut self.output;
        let mut streamed = false;

        let outcome = self
            .session
            .send(input, &mut |event: SessionEvent| {
                // A broken stdout shows up again on the next write below.
                let _ = match event {
                    SessionEvent::ArticleLoading(url) => {
                        writeln!(output, "{}", cformat!("<dim>Loading article {}...</>", url))
                    }
                    SessionEvent::Status(status) => {
                        writeln!(output, "{}", cformat!("<cyan>{}</>", status))
                    }
                    SessionEvent::Chunk(chunk) => {
                        streamed = true;
                        write!(output, "{}", chunk).and_then(|_| output.flush())
                    }
                };
            })
            .await?;

        if streamed {
            writeln!(output)?;
        }

        match outcome {
            SendOutcome::Skipped => debug!("Nothing to send"),
            SendOutcome::Streamed(_) => {}
            SendOutcome::Answered(answer) => writeln!(output, "{}", answer)?,
            SendOutcome::Failed(e) => {
                debug!("Turn failed: {}", e);
                writeln!(output, "{}", cformat!("<red>{}</>", FAILURE_MESSAGE))?;
            }
        }

        Ok(())
    }
}
