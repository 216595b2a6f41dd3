use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{DeviceType, ReadingTime, RecordHeader, format_timestamp};

/// A single value reported by a sensor at a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    #[serde(flatten)]
    pub header: RecordHeader,
    /// Measured value in the unit of the device class
    #[serde(default)]
    pub value: f32,
}

impl SensorReading {
    pub fn new(name: impl Into<String>, type_id: DeviceType, location_id: impl Into<String>) -> Self {
        Self {
            header: RecordHeader::new(name, type_id, location_id),
            value: 0.0,
        }
    }

    pub fn with_value(mut self, value: f32) -> Self {
        self.header.touch();
        self.value = value;
        self
    }

    /// Override the production time, used by replayed or simulated readings.
    pub fn with_time_stamp(mut self, at: OffsetDateTime) -> Self {
        self.header.time_stamp = format_timestamp(at);
        self
    }

    pub fn type_id(&self) -> DeviceType {
        self.header.type_id
    }

    pub fn location_id(&self) -> &str {
        &self.header.location_id
    }

    pub fn has_error(&self) -> bool {
        self.header.has_error
    }

    pub fn reading_time(&self) -> ReadingTime {
        self.header.reading_time()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_flat_payload() {
        let payload = r#"{
            "name": "HumiditySensor",
            "typeID": 1010,
            "statusCode": 0,
            "hasError": false,
            "locationID": "constraineddevice001",
            "latitude": 0.0,
            "longitude": 0.0,
            "elevation": 0.0,
            "timeStamp": "2024-03-01T10:15:30Z",
            "value": 27.5
        }"#;

        let reading: SensorReading = serde_json::from_str(payload).unwrap();

        assert_eq!(reading.type_id(), DeviceType::Humidity);
        assert_eq!(reading.location_id(), "constraineddevice001");
        assert_eq!(reading.value, 27.5);
        assert!(!reading.reading_time().is_approximate());
    }

    #[test]
    fn test_decode_substitutes_defaults_for_absent_fields() {
        let reading: SensorReading = serde_json::from_str(r#"{"typeID": 1013, "value": 21.0}"#).unwrap();

        assert_eq!(reading.type_id(), DeviceType::Temperature);
        assert_eq!(reading.location_id(), "Not Set");
        assert!(!reading.has_error());
        assert!(reading.reading_time().is_approximate());
    }

    #[test]
    fn test_encode_keeps_wire_names() {
        let reading = SensorReading::new("HumiditySensor", DeviceType::Humidity, "cda001").with_value(41.0);

        let value = serde_json::to_value(&reading).unwrap();

        assert_eq!(value["typeID"], 1010);
        assert_eq!(value["locationID"], "cda001");
        assert_eq!(value["hasError"], false);
        assert_eq!(value["value"], 41.0);
        assert!(value.get("header").is_none());
    }
}
