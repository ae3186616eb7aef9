use std::io::Write;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use super::input::LineSource;
use super::models::{FailurePolicy, Transcript};
use crate::core::AppConfig;
use crate::openai::{CompletionClient, CompletionError, Message, Role};

pub const PROMPT: &str = "You: ";
pub const EXIT_COMMAND: &str = "exit";
pub const FAREWELL: &str = "Exiting chat. Goodbye!";

/// A line of user input interpreted as an instruction to the loop.
#[derive(Debug, PartialEq, Eq)]
pub enum Command<'a> {
    Exit,
    Send(&'a str),
}

impl<'a> Command<'a> {
    /// Only the exact, case-sensitive `exit` ends the session. Any
    /// other line, including an empty one, is sent as-is.
    pub fn parse(line: &'a str) -> Self {
        if line == EXIT_COMMAND {
            Command::Exit
        } else {
            Command::Send(line)
        }
    }
}

/// The result of one turn. The transcript is handed back to the
/// caller whether or not the request succeeded.
#[derive(Debug)]
pub struct Turn {
    pub transcript: Transcript,
    pub outcome: Result<Message, CompletionError>,
}

/// A chat against a single deployment.
///
/// The session itself holds no conversation state. The transcript is
/// owned by whoever drives the session and is threaded through each
/// call to `turn`.
pub struct ChatSession {
    client: CompletionClient,
    failure_policy: FailurePolicy,
    shutdown: CancellationToken,
}

impl ChatSession {
    pub fn new(client: CompletionClient, failure_policy: FailurePolicy) -> Self {
        Self {
            client,
            failure_policy,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(CompletionClient::new(config), config.failure_policy)
    }

    /// Cancelling `shutdown` abandons any in-flight request and ends
    /// the loop before the next prompt.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Runs the next turn in chat: appends the user message, sends
    /// the full transcript and appends the reply if there is one.
    pub async fn turn(&self, mut transcript: Transcript, input: &str) -> Turn {
        let checkpoint = transcript.len();
        transcript.push(Message::new(Role::User, input));

        let outcome = self
            .client
            .complete(transcript.messages(), &self.shutdown)
            .await;

        match &outcome {
            Ok(reply) => transcript.push(reply.clone()),
            Err(err) => {
                tracing::debug!(error = ?err, "Chat turn failed");
                if self.failure_policy == FailurePolicy::Rollback {
                    transcript.rollback_to(checkpoint);
                }
            }
        }

        Turn {
            transcript,
            outcome,
        }
    }

    /// Reads lines from `source` until the user exits, printing each
    /// reply or error to `out`. Returns the final transcript.
    pub async fn run<S, W>(
        &self,
        mut transcript: Transcript,
        source: &mut S,
        out: &mut W,
    ) -> Result<Transcript>
    where
        S: LineSource,
        W: Write,
    {
        tracing::info!(model = self.client.model(), "Chat session started");
        writeln!(
            out,
            "Start chatting with the {} model (type '{}' to quit):",
            self.client.model(),
            EXIT_COMMAND
        )?;
        out.flush()?;

        while !self.shutdown.is_cancelled() {
            if !source.renders_prompt() {
                write!(out, "{}", PROMPT)?;
                out.flush()?;
            }
            let Some(line) = source.read_line(PROMPT)? else {
                break;
            };

            let input = match Command::parse(&line) {
                Command::Exit => break,
                Command::Send(input) => input,
            };

            let turn = self.turn(transcript, input).await;
            transcript = turn.transcript;

            match turn.outcome {
                Ok(reply) => writeln!(out, "Assistant: {}", reply.content())?,
                Err(err) => writeln!(out, "{}", err)?,
            }
            out.flush()?;
        }

        writeln!(out, "{}", FAREWELL)?;
        out.flush()?;
        tracing::info!(messages = transcript.len(), "Chat session ended");

        Ok(transcript)
    }
}
