use std::io::{self, BufReader, IsTerminal, Write};

use anyhow::Result;
use rustyline::DefaultEditor;
use tokio_util::sync::CancellationToken;

use crate::chat::{BufReadSource, ChatSession, LineSource, Transcript};
use crate::core::{AppConfig, ConfigError};

pub async fn run() -> Result<()> {
    let mut stdout = io::stdout();
    run_with(AppConfig::from_env(), open_stdin, &mut stdout).await
}

// Only a terminal gets line editing. Piped input is read as plain
// lines and the session prints the prompt itself.
fn open_stdin() -> Result<Box<dyn LineSource>> {
    if io::stdin().is_terminal() {
        Ok(Box::new(DefaultEditor::new()?))
    } else {
        Ok(Box::new(BufReadSource::new(BufReader::new(io::stdin()))))
    }
}

/// Runs a chat session if the config is usable. A config error is
/// printed to `out` and ends the program normally before the input
/// source is opened or anything is sent.
pub async fn run_with<S, F, W>(
    config: Result<AppConfig, ConfigError>,
    open_source: F,
    out: &mut W,
) -> Result<()>
where
    S: LineSource,
    F: FnOnce() -> Result<S>,
    W: Write,
{
    let config = match config {
        Ok(config) => config,
        Err(err) => {
            tracing::debug!(error = ?err, "Invalid configuration");
            writeln!(out, "{}", err)?;
            out.flush()?;
            return Ok(());
        }
    };

    let mut source = open_source()?;

    let shutdown = CancellationToken::new();
    listen_for_interrupt(shutdown.clone());

    let session = ChatSession::from_config(&config).with_shutdown(shutdown);
    session
        .run(Transcript::new(&config.system_message), &mut source, out)
        .await?;

    Ok(())
}

// The first Ctrl-C abandons whatever request is in flight and ends
// the session. A second one kills the process in case we are stuck
// waiting on input that isn't coming.
fn listen_for_interrupt(shutdown: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("Interrupt received, shutting down chat session");
            shutdown.cancel();
        }
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use mockito::Matcher;

    fn lookup_with_empty_key(url: String) -> impl Fn(&str) -> Option<String> {
        move |key| match key {
            "ENDPOINT_URL" => Some(url.clone()),
            "API_KEY" => Some(String::new()),
            "MODEL_NAME" => Some("gpt-4".to_string()),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_missing_config_makes_no_requests() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let config = AppConfig::from_lookup(lookup_with_empty_key(server.url()));

        let mut out = Vec::new();
        run_with(
            config,
            || Ok(BufReadSource::new(Cursor::new("Hello\n"))),
            &mut out,
        )
        .await
        .unwrap();

        mock.assert_async().await;
        let out = String::from_utf8(out).unwrap();
        assert_eq!(
            out,
            "Please set ENDPOINT_URL, API_KEY, and MODEL_NAME environment variables (missing: API_KEY)\n"
        );
    }

    /// The diagnostic must print even when opening the input would
    /// fail, so the source isn't opened until the config checks out
    #[tokio::test]
    async fn test_missing_config_never_opens_input() {
        let config = AppConfig::from_lookup(lookup_with_empty_key(
            "http://127.0.0.1:9".to_string(),
        ));

        let mut out = Vec::new();
        let result = run_with(
            config,
            || -> Result<BufReadSource<Cursor<&str>>> { anyhow::bail!("no terminal") },
            &mut out,
        )
        .await;

        assert!(result.is_ok());
        assert!(
            String::from_utf8(out)
                .unwrap()
                .starts_with("Please set ENDPOINT_URL, API_KEY, and MODEL_NAME")
        );
    }

    #[tokio::test]
    async fn test_input_error_surfaces_with_valid_config() {
        let config = AppConfig::from_lookup(|key| match key {
            "ENDPOINT_URL" => Some("http://127.0.0.1:9".to_string()),
            "API_KEY" => Some("key".to_string()),
            "MODEL_NAME" => Some("gpt-4".to_string()),
            _ => None,
        });

        let mut out = Vec::new();
        let result = run_with(
            config,
            || -> Result<BufReadSource<Cursor<&str>>> { anyhow::bail!("no terminal") },
            &mut out,
        )
        .await;

        assert_eq!(result.unwrap_err().to_string(), "no terminal");
        assert!(out.is_empty());
    }
}
