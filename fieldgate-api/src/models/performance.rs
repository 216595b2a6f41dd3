use serde::{Deserialize, Serialize};

use super::{DeviceType, RecordHeader};

pub const SYSTEM_PERFORMANCE_NAME: &str = "SystemPerfMsg";

/// Host utilisation percentages sampled at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSample {
    #[serde(flatten)]
    pub header: RecordHeader,
    #[serde(default, rename = "cpuUtil")]
    pub cpu_utilization: f32,
    #[serde(default, rename = "memUtil")]
    pub memory_utilization: f32,
    #[serde(default, rename = "diskUtil")]
    pub disk_utilization: f32,
}

impl PerformanceSample {
    pub fn new(location_id: impl Into<String>) -> Self {
        Self {
            header: RecordHeader::new(SYSTEM_PERFORMANCE_NAME, DeviceType::SystemPerformance, location_id),
            cpu_utilization: 0.0,
            memory_utilization: 0.0,
            disk_utilization: 0.0,
        }
    }

    pub fn with_utilization(mut self, cpu: f32, memory: f32, disk: f32) -> Self {
        self.header.touch();
        self.cpu_utilization = cpu;
        self.memory_utilization = memory;
        self.disk_utilization = disk;
        self
    }

    pub fn has_error(&self) -> bool {
        self.header.has_error
    }
}
