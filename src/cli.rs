//! Interactive REPL feeding controller events from a terminal

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::sync::mpsc;
use tracing::warn;

use crate::devices::DeviceRegistry;
use crate::input::{parse_line, Action, ControllerEvent};

const PROMPT: &str = "knob> ";

/// Result of interpreting one REPL line
#[derive(Debug, PartialEq)]
enum Command {
    Event(ControllerEvent),
    Help,
    Devices,
    Quit,
    Nothing,
}

fn interpret(line: &str) -> Result<Command> {
    match line.trim() {
        "exit" | "quit" => Ok(Command::Quit),
        "help" | "?" => Ok(Command::Help),
        "devices" | "ls" => Ok(Command::Devices),
        other => Ok(match parse_line(other)? {
            Some(event) => Command::Event(event),
            None => Command::Nothing,
        }),
    }
}

fn print_help() {
    println!("Usage:");
    println!("  <device> <action>        e.g. livingroom_tv volume up");
    println!(
        "  {{\"device\": ..., \"channel\": ..., \"fields\": {{...}}}}   continuous update"
    );
    println!("  devices | help | quit");
    let actions: Vec<&str> = Action::ALL.iter().map(|a| a.as_str()).collect();
    println!("Actions: {}", actions.join(", "));
}

fn print_devices(devices: &DeviceRegistry) {
    for d in devices.iter() {
        println!("  {:<20} {:<12} {}", d.id, d.class.to_string(), d.entity);
    }
}

/// Run the REPL on a blocking thread until `quit`, EOF or Ctrl+C
///
/// Parsed events are sent to `tx`; the returned future resolves once the
/// user leaves the prompt.
pub async fn run_repl(devices: std::sync::Arc<DeviceRegistry>, tx: mpsc::Sender<ControllerEvent>) -> Result<()> {
    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut rl = DefaultEditor::new()?;

        loop {
            let line = match rl.readline(PROMPT) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e.into()),
            };

            if !line.trim().is_empty() {
                let _ = rl.add_history_entry(line.as_str());
            }

            match interpret(&line) {
                Ok(Command::Quit) => break,
                Ok(Command::Help) => print_help(),
                Ok(Command::Devices) => print_devices(&devices),
                Ok(Command::Nothing) => {}
                Ok(Command::Event(event)) => {
                    if tx.blocking_send(event).is_err() {
                        break;
                    }
                }
                Err(e) => warn!("{}", e),
            }
        }

        Ok(())
    })
    .await?
}
