//! Interactive line shell standing in for the window's buttons.

use std::io::{BufRead, Write};

use anyhow::Context;
use crossbeam_channel::Sender;
use tracing::debug;

use kinect_engine::Previews;
use kinect_ipc::{EngineCommand, EngineEvent, EngineState};

const HELP: &str = "\
commands:
  connect     open the sensor and start every stream
  disconnect  stop recording and release the sensor
  record      start recording every stream
  stop        stop recording
  state       print the engine state
  preview     print the latest preview frames
  quit        shut down and exit";

/// One parsed shell line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellInput {
    Command(EngineCommand),
    Preview,
    Help,
    Empty,
    Unknown(String),
}

/// Parse a line typed at the prompt. Case and surrounding whitespace are ignored.
pub fn parse_line(line: &str) -> ShellInput {
    let word = line.trim().to_ascii_lowercase();
    match word.as_str() {
        "" => ShellInput::Empty,
        "connect" => ShellInput::Command(EngineCommand::Connect),
        "disconnect" => ShellInput::Command(EngineCommand::Disconnect),
        "record" | "start" => ShellInput::Command(EngineCommand::StartRecording),
        "stop" => ShellInput::Command(EngineCommand::StopRecording),
        "state" | "status" => ShellInput::Command(EngineCommand::GetState),
        "quit" | "exit" => ShellInput::Command(EngineCommand::Shutdown),
        "preview" => ShellInput::Preview,
        "help" | "?" => ShellInput::Help,
        _ => ShellInput::Unknown(word),
    }
}

/// Read commands until `quit` or end of input, forwarding them to the engine.
///
/// End of input shuts the engine down as if `quit` had been typed.
pub fn run_shell<R, W>(
    input: R,
    out: &mut W,
    command_tx: &Sender<EngineCommand>,
    previews: &Previews,
) -> anyhow::Result<()>
where
    R: BufRead,
    W: Write,
{
    for line in input.lines() {
        let line = line.context("reading shell input")?;
        match parse_line(&line) {
            ShellInput::Command(command) => {
                let shutdown = command == EngineCommand::Shutdown;
                debug!(?command, "Shell command");
                command_tx
                    .send(command)
                    .context("engine is no longer running")?;
                if shutdown {
                    return Ok(());
                }
            }
            ShellInput::Preview => writeln!(out, "{}", describe_previews(previews))?,
            ShellInput::Help => writeln!(out, "{}", HELP)?,
            ShellInput::Empty => {}
            ShellInput::Unknown(word) => {
                writeln!(out, "unknown command '{}', type 'help'", word)?
            }
        }
    }

    debug!("Shell input closed");
    if command_tx.send(EngineCommand::Shutdown).is_err() {
        debug!("Engine already stopped");
    }
    Ok(())
}

/// Render an engine event as one line of shell output.
pub fn describe_event(event: &EngineEvent) -> Option<String> {
    let line = match event {
        EngineEvent::StateChanged { previous, current } if previous == current => {
            format!("state: {}", describe_state(current))
        }
        EngineEvent::StateChanged { previous, current } => format!(
            "state: {} -> {}",
            describe_state(previous),
            describe_state(current)
        ),
        EngineEvent::Notice(message) => message.clone(),
        EngineEvent::Error {
            modality: Some(modality),
            message,
        } => format!("error [{}]: {}", modality, message),
        EngineEvent::Error {
            modality: None,
            message,
        } => format!("error: {}", message),
        EngineEvent::RecordingStarted { modality, path } => {
            format!("recording {} to {}", modality, path.display())
        }
        EngineEvent::RecordingStopped { modality } => format!("{} recording closed", modality),
        EngineEvent::Ready => "ready, type 'help' for commands".to_string(),
        EngineEvent::Shutdown => return None,
    };
    Some(line)
}

fn describe_state(state: &EngineState) -> String {
    match state {
        EngineState::Recording { modalities } => {
            let names: Vec<&str> = modalities.iter().map(|m| m.name()).collect();
            format!("{} ({})", state.name(), names.join(", "))
        }
        _ => state.name().to_string(),
    }
}

fn describe_previews(previews: &Previews) -> String {
    let video = match previews.video.latest() {
        Some(frame) => format!(
            "video frame #{} {}x{}",
            frame.sequence, frame.width, frame.height
        ),
        None => "no video frame".to_string(),
    };
    let skeleton = match previews.skeleton.latest() {
        Some(drawing) => format!(
            "skeleton {}x{} with {} primitives",
            drawing.width,
            drawing.height,
            drawing.commands.len()
        ),
        None => "no skeleton drawing".to_string(),
    };
    format!("{}; {}", video, skeleton)
}
