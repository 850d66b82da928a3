//! Console input
//!
//! Stands in for the start button: reads commands from stdin and turns them
//! into session events.

use crate::domain::models::{Adapter, SessionEvent};
use std::io::BufRead;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Event(SessionEvent),
    Quit,
}

pub const HELP: &str = "commands: start | stop | enable | disable | quit";

pub fn parse_command(line: &str, adapter_name: &str) -> Option<Command> {
    let command = match line.trim().to_lowercase().as_str() {
        "start" | "advertise" => Command::Event(SessionEvent::StartRequested),
        "stop" => Command::Event(SessionEvent::SessionStopped),
        "enable" => Command::Event(SessionEvent::AdapterStateChanged(Adapter::enabled(
            adapter_name,
        ))),
        "disable" => Command::Event(SessionEvent::AdapterStateChanged(Adapter::disabled(
            adapter_name,
        ))),
        "quit" | "exit" => Command::Quit,
        _ => return None,
    };
    Some(command)
}

/// Forward commands from `input` on a dedicated thread.
///
/// Blocking reads cannot be cancelled, so they stay off the async runtime;
/// shutting down never waits on the reader. The returned receiver fires on
/// `quit`.
pub fn spawn_command_reader<R>(
    input: R,
    events: mpsc::UnboundedSender<SessionEvent>,
    adapter_name: String,
) -> anyhow::Result<oneshot::Receiver<()>>
where
    R: BufRead + Send + 'static,
{
    let (quit_tx, quit_rx) = oneshot::channel();

    std::thread::Builder::new()
        .name("console-input".to_string())
        .spawn(move || {
            for line in input.lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!("Failed to read console input: {}", e);
                        return;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }

                match parse_command(&line, &adapter_name) {
                    Some(Command::Event(event)) => {
                        if events.send(event).is_err() {
                            return;
                        }
                    }
                    Some(Command::Quit) => {
                        info!("Quit requested from console");
                        let _ = quit_tx.send(());
                        return;
                    }
                    None => println!("unknown command '{}'; {}", line.trim(), HELP),
                }
            }
            info!("Console input closed, press Ctrl+C to exit");
        })?;

    Ok(quit_rx)
}

/// Resolves on `quit`; stays pending if the input closed without one
pub async fn quit_requested(quit: oneshot::Receiver<()>) {
    if quit.await.is_err() {
        std::future::pending::<()>().await
    }
}
