//! LED bridge shared types
//!
//! Command payloads, command sequences and the JSON envelope every HTTP
//! response uses. No I/O happens here.

pub mod ble;

use std::fmt;
use std::str::FromStr;

/// One opaque device instruction.
///
/// The bytes are never interpreted; they are written to the characteristic
/// exactly as configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command(Vec<u8>);

impl Command {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_hex(&self) -> String {
        data_encoding::HEXLOWER.encode(&self.0)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("command payload is empty")]
    Empty,
    #[error("invalid hex payload {input:?}: {reason}")]
    InvalidHex { input: String, reason: String },
}

impl FromStr for Command {
    type Err = CommandParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CommandParseError::Empty);
        }
        data_encoding::HEXLOWER_PERMISSIVE
            .decode(s.as_bytes())
            .map(Command)
            .map_err(|e| CommandParseError::InvalidHex {
                input: s.to_string(),
                reason: e.to_string(),
            })
    }
}

impl serde::Serialize for Command {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Command {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SequenceError {
    #[error("a command sequence needs at least one command")]
    Empty,
}

/// Ordered, non-empty list of commands forming one logical operation.
///
/// The order is the activation order the firmware expects and is never
/// changed once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSequence {
    commands: Vec<Command>,
}

impl CommandSequence {
    pub fn new(commands: Vec<Command>) -> Result<Self, SequenceError> {
        if commands.is_empty() {
            return Err(SequenceError::Empty);
        }
        Ok(Self { commands })
    }

    pub fn single(command: Command) -> Self {
        Self {
            commands: vec![command],
        }
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Command> {
        self.commands.iter()
    }
}

impl<'a> IntoIterator for &'a CommandSequence {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}

/// Payloads the bridge knows how to send
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CommandTable {
    #[serde(default = "default_turn_on")]
    pub turn_on: Command,
    #[serde(default = "default_turn_off")]
    pub turn_off: Command,
    #[serde(default = "default_brightness_100")]
    pub brightness_100: Command,
}

fn default_turn_on() -> Command {
    Command::new(ble::commands::TURN_ON)
}

fn default_turn_off() -> Command {
    Command::new(ble::commands::TURN_OFF)
}

fn default_brightness_100() -> Command {
    Command::new(ble::commands::BRIGHTNESS_100)
}

impl Default for CommandTable {
    fn default() -> Self {
        Self {
            turn_on: default_turn_on(),
            turn_off: default_turn_off(),
            brightness_100: default_brightness_100(),
        }
    }
}

impl CommandTable {
    /// Switch on, then full brightness
    pub fn activate(&self) -> CommandSequence {
        CommandSequence {
            commands: vec![self.turn_on.clone(), self.brightness_100.clone()],
        }
    }

    pub fn deactivate(&self) -> CommandSequence {
        CommandSequence::single(self.turn_off.clone())
    }

    /// Reject payloads that would write nothing
    pub fn validate(&self) -> Result<(), CommandParseError> {
        for command in [&self.turn_on, &self.turn_off, &self.brightness_100] {
            if command.is_empty() {
                return Err(CommandParseError::Empty);
            }
        }
        Ok(())
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Success,
    Error,
}

/// JSON body of every bridge response
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub status: Status,
    pub message: String,
}

impl Envelope {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: Status::Ok,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: Status::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == Status::Error
    }
}
