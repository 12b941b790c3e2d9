// Operator commands read line by line from stdin
use crate::application::dashboard_session::SessionCommand;
use crate::application::ingestion_coordinator::PredictionSource;
use crate::domain::viewport::Breakpoint;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedSender;
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;

pub const USAGE: &str = "commands: <enter>|ok, predict [batch], viewport small|medium|large, quit";

pub fn parse_command(line: &str) -> Option<SessionCommand> {
    let mut words = line.split_whitespace();
    let command = match words.next() {
        None => SessionCommand::Acknowledge,
        Some(word) => match word.to_ascii_lowercase().as_str() {
            "ok" => SessionCommand::Acknowledge,
            "predict" => match words.next() {
                None => SessionCommand::Predict(PredictionSource::LatestReadout),
                Some("batch") => SessionCommand::Predict(PredictionSource::LatestBatch),
                Some(_) => return None,
            },
            "viewport" => SessionCommand::Viewport(words.next()?.parse::<Breakpoint>().ok()?),
            "quit" | "exit" | "logoff" => SessionCommand::Logoff,
            _ => return None,
        },
    };

    if words.next().is_some() {
        return None;
    }
    Some(command)
}

/// Forwards stdin commands to the session until stdin closes or the session ends
pub fn spawn_console_commands(commands: UnboundedSender<SessionCommand>) {
    tokio::spawn(async move {
        let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());

        while let Some(line) = lines.next().await {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!("Failed to read console input: {}", e);
                    break;
                }
            };

            match parse_command(&line) {
                Some(command) => {
                    if commands.send(command).is_err() {
                        break;
                    }
                }
                None => tracing::info!("Unknown command \"{}\", {}", line.trim(), USAGE),
            }
        }

        tracing::debug!("Console input closed");
    });
}
