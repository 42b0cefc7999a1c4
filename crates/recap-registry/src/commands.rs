//! Command-log surface: the assembled corpus as a replayable JSONL stream.
//!
//! `recap.command.v1` wraps one record per line:
//! - written after assembly (`recap commands`)
//! - replayed into a registry in order (`recap replay`)

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::record::Record;
use crate::registry::{Registration, Registry, RegistryError, Rejection};

pub const COMMAND_SCHEMA: &str = "recap.command.v1";

fn default_command_schema() -> String {
    COMMAND_SCHEMA.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryCommand {
    #[serde(default = "default_command_schema")]
    pub schema: String,
    pub command_id: String,
    #[serde(flatten)]
    pub record: Record,
}

impl RegistryCommand {
    pub fn register(record: Record) -> Self {
        Self {
            schema: COMMAND_SCHEMA.to_string(),
            command_id: command_id_for(&record),
            record,
        }
    }
}

/// Deterministic command id: `register.<kind>:<name>`.
pub fn command_id_for(record: &Record) -> String {
    format!("register.{}:{}", record.kind(), record.name())
}

pub fn commands_for(records: Vec<Record>) -> Vec<RegistryCommand> {
    records.into_iter().map(RegistryCommand::register).collect()
}

pub fn read_commands(reader: impl BufRead) -> Result<Vec<RegistryCommand>, CommandLogError> {
    let mut commands = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| CommandLogError::Io(line_no + 1, e.to_string()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let command: RegistryCommand = serde_json::from_str(trimmed)
            .map_err(|e| CommandLogError::Parse(line_no + 1, e.to_string()))?;
        commands.push(command);
    }
    Ok(commands)
}

pub fn write_commands(
    writer: &mut impl Write,
    commands: &[RegistryCommand],
) -> Result<(), CommandLogError> {
    for command in commands {
        let line =
            serde_json::to_string(command).map_err(|e| CommandLogError::Serialize(e.to_string()))?;
        writeln!(writer, "{line}").map_err(|e| CommandLogError::Io(0, e.to_string()))?;
    }
    Ok(())
}

pub fn read_commands_from_path(
    path: impl AsRef<Path>,
) -> Result<Vec<RegistryCommand>, CommandLogError> {
    let file = File::open(path.as_ref())
        .map_err(|e| CommandLogError::Io(0, format!("{}: {e}", path.as_ref().display())))?;
    read_commands(BufReader::new(file))
}

pub fn write_commands_to_path(
    path: impl AsRef<Path>,
    commands: &[RegistryCommand],
) -> Result<(), CommandLogError> {
    let mut file = File::create(path.as_ref())
        .map_err(|e| CommandLogError::Io(0, format!("{}: {e}", path.as_ref().display())))?;
    write_commands(&mut file, commands)
}

/// Tally of one replay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    pub inserted: usize,
    pub confirmed: usize,
    pub rejections: Vec<Rejection>,
}

impl ReplayReport {
    pub fn record(&mut self, outcome: Registration) {
        match outcome {
            Registration::Inserted => self.inserted += 1,
            Registration::Confirmed => self.confirmed += 1,
            Registration::Rejected(rejection) => self.rejections.push(rejection),
        }
    }

    pub fn total(&self) -> usize {
        self.inserted + self.confirmed + self.rejections.len()
    }
}

/// Register every command in order. Rejections are tallied; only storage
/// failures and malformed envelopes stop the replay.
pub fn replay_commands(
    registry: &mut Registry,
    commands: &[RegistryCommand],
) -> Result<ReplayReport, CommandLogError> {
    let mut report = ReplayReport::default();
    for command in commands {
        if command.schema != COMMAND_SCHEMA {
            return Err(CommandLogError::UnsupportedSchema(command.schema.clone()));
        }
        let expected = command_id_for(&command.record);
        if command.command_id != expected {
            return Err(CommandLogError::MismatchedCommandId {
                command_id: command.command_id.clone(),
                expected,
            });
        }
        report.record(registry.register(command.record.clone())?);
    }
    Ok(report)
}

#[derive(Debug, thiserror::Error)]
pub enum CommandLogError {
    #[error("line {0}: I/O error: {1}")]
    Io(usize, String),

    #[error("line {0}: parse error: {1}")]
    Parse(usize, String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("unsupported command schema: {0}")]
    UnsupportedSchema(String),

    #[error("command id {command_id} does not match its payload (expected {expected})")]
    MismatchedCommandId {
        command_id: String,
        expected: String,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
