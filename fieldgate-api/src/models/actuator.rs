use serde::{Deserialize, Serialize};

use super::{DeviceType, RecordHeader};

/// Actuator command code carried as an integer on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum CommandCode {
    #[default]
    Off,
    On,
    /// Device specific code passed through untouched
    Other(i32),
}

impl From<i32> for CommandCode {
    fn from(code: i32) -> Self {
        match code {
            0 => CommandCode::Off,
            1 => CommandCode::On,
            other => CommandCode::Other(other),
        }
    }
}

impl From<CommandCode> for i32 {
    fn from(code: CommandCode) -> Self {
        match code {
            CommandCode::Off => 0,
            CommandCode::On => 1,
            CommandCode::Other(other) => other,
        }
    }
}

/// A command for an actuator, or a device's report of having executed one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActuatorCommand {
    #[serde(flatten)]
    pub header: RecordHeader,
    #[serde(default)]
    pub command: CommandCode,
    /// Target value, e.g. the humidity setpoint to drive towards
    #[serde(default)]
    pub value: f32,
    /// `false` when issued by the gateway, `true` when echoed back by the device
    #[serde(default)]
    pub is_response: bool,
    #[serde(default)]
    pub state_data: String,
}

impl ActuatorCommand {
    pub fn new(name: impl Into<String>, type_id: DeviceType, location_id: impl Into<String>) -> Self {
        Self {
            header: RecordHeader::new(name, type_id, location_id),
            command: CommandCode::Off,
            value: 0.0,
            is_response: false,
            state_data: String::new(),
        }
    }

    pub fn with_command(mut self, command: CommandCode) -> Self {
        self.header.touch();
        self.command = command;
        self
    }

    pub fn with_value(mut self, value: f32) -> Self {
        self.header.touch();
        self.value = value;
        self
    }

    pub fn with_state_data(mut self, state_data: impl Into<String>) -> Self {
        self.header.touch();
        self.state_data = state_data.into();
        self
    }

    /// Build the acknowledgment a device sends after executing this command.
    pub fn as_response(&self) -> Self {
        let mut response = self.clone();
        response.header.touch();
        response.is_response = true;
        response
    }

    pub fn location_id(&self) -> &str {
        &self.header.location_id
    }

    pub fn has_error(&self) -> bool {
        self.header.has_error
    }
}
