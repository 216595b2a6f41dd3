mod actuator;
mod performance;
mod sensor;
mod state;

pub use actuator::*;
pub use performance::*;
pub use sensor::*;
pub use state::*;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub const NOT_SET: &str = "Not Set";

/// Device class carried on the wire as the integer `typeID`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum DeviceType {
    #[default]
    Unset,
    /// Heating, ventilation and air conditioning actuator
    Hvac,
    /// Humidifier actuator
    Humidifier,
    /// Relative humidity sensor
    Humidity,
    /// Barometric pressure sensor
    Pressure,
    /// Temperature sensor
    Temperature,
    /// Host utilisation sampler
    SystemPerformance,
    /// Any id this build does not know about, preserved verbatim
    Other(i32),
}

impl DeviceType {
    pub fn id(&self) -> i32 {
        match self {
            DeviceType::Unset => 0,
            DeviceType::Hvac => 1001,
            DeviceType::Humidifier => 1002,
            DeviceType::Humidity => 1010,
            DeviceType::Pressure => 1012,
            DeviceType::Temperature => 1013,
            DeviceType::SystemPerformance => 9001,
            DeviceType::Other(id) => *id,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DeviceType::Unset => "unset",
            DeviceType::Hvac => "hvac",
            DeviceType::Humidifier => "humidifier",
            DeviceType::Humidity => "humidity",
            DeviceType::Pressure => "pressure",
            DeviceType::Temperature => "temperature",
            DeviceType::SystemPerformance => "system-performance",
            DeviceType::Other(_) => "other",
        }
    }
}

impl From<i32> for DeviceType {
    fn from(id: i32) -> Self {
        match id {
            0 => DeviceType::Unset,
            1001 => DeviceType::Hvac,
            1002 => DeviceType::Humidifier,
            1010 => DeviceType::Humidity,
            1012 => DeviceType::Pressure,
            1013 => DeviceType::Temperature,
            9001 => DeviceType::SystemPerformance,
            other => DeviceType::Other(other),
        }
    }
}

impl From<DeviceType> for i32 {
    fn from(device_type: DeviceType) -> Self {
        device_type.id()
    }
}

/// Fields shared by every telemetry record, flattened into the record on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecordHeader {
    /// Human readable source name
    pub name: String,
    /// Device class of the producer
    #[serde(rename = "typeID")]
    pub type_id: DeviceType,
    /// Producer specific status code
    pub status_code: i32,
    /// Set by the producer when the value is known to be bad
    pub has_error: bool,
    /// Location identifier of the producer
    #[serde(rename = "locationID")]
    pub location_id: String,
    pub latitude: f32,
    pub longitude: f32,
    pub elevation: f32,
    /// Creation or last update time, RFC 3339
    pub time_stamp: String,
}

impl RecordHeader {
    pub fn new(name: impl Into<String>, type_id: DeviceType, location_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_id,
            location_id: location_id.into(),
            time_stamp: format_timestamp(OffsetDateTime::now_utc()),
            ..Default::default()
        }
    }

    pub fn touch(&mut self) {
        self.time_stamp = format_timestamp(OffsetDateTime::now_utc());
    }

    /// Parse the record timestamp, falling back to the local clock when it is missing or malformed.
    pub fn reading_time(&self) -> ReadingTime {
        match OffsetDateTime::parse(&self.time_stamp, &Rfc3339) {
            Ok(at) => ReadingTime::Exact(at),
            Err(_) => ReadingTime::Approximate(OffsetDateTime::now_utc()),
        }
    }
}

impl Default for RecordHeader {
    fn default() -> Self {
        Self {
            name: NOT_SET.to_string(),
            type_id: DeviceType::Unset,
            status_code: 0,
            has_error: false,
            location_id: NOT_SET.to_string(),
            latitude: 0.0,
            longitude: 0.0,
            elevation: 0.0,
            // Absent on the wire means unknown, which parses as approximate
            time_stamp: String::new(),
        }
    }
}

/// When a record claims to have been produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingTime {
    /// Parsed from the record itself
    Exact(OffsetDateTime),
    /// Substituted local time because the record timestamp was unusable
    Approximate(OffsetDateTime),
}

impl ReadingTime {
    pub fn at(&self) -> OffsetDateTime {
        match self {
            ReadingTime::Exact(at) | ReadingTime::Approximate(at) => *at,
        }
    }

    pub fn is_approximate(&self) -> bool {
        matches!(self, ReadingTime::Approximate(_))
    }
}

pub fn format_timestamp(at: OffsetDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_default()
}
