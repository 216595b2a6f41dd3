use serde::{Deserialize, Serialize};

use super::{CommandCode, PerformanceSample, RecordHeader, SensorReading};

/// Aggregate snapshot of a device: its latest readings and utilisation samples.
///
/// Wire format only; no gateway handler consumes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemState {
    #[serde(flatten)]
    pub header: RecordHeader,
    #[serde(default)]
    pub command: CommandCode,
    #[serde(default, rename = "sensorDataList")]
    pub sensor_readings: Vec<SensorReading>,
    #[serde(default, rename = "sysPerfDataList")]
    pub performance_samples: Vec<PerformanceSample>,
}
