use fieldgate_api::DeviceType;

use crate::excursion::Side;

pub const MIN_DWELL_SECS: u64 = 10;
pub const MAX_DWELL_SECS: u64 = 7200;
pub const DEFAULT_DWELL_SECS: u64 = 300;

pub const DEFAULT_HUMIDITY_FLOOR: f32 = 30.0;
pub const DEFAULT_HUMIDITY_CEILING: f32 = 50.0;
pub const DEFAULT_HUMIDITY_NOMINAL: f32 = 40.0;

/// Floor / ceiling / nominal band plus dwell time for one sensor class, and the actuator it drives.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdPolicy {
    floor: f32,
    ceiling: f32,
    nominal: f32,
    dwell_secs: u64,
    actuator: DeviceType,
    actuator_name: String,
}

impl ThresholdPolicy {
    /// Out-of-range dwell times and inconsistent bands are replaced with defaults, never rejected.
    pub fn new(floor: f32, ceiling: f32, nominal: f32, dwell_secs: u64) -> Self {
        let (floor, ceiling, nominal) = if floor <= nominal && nominal <= ceiling {
            (floor, ceiling, nominal)
        } else {
            tracing::warn!(
                "invalid band floor={} ceiling={} nominal={}, using {}/{}/{}",
                floor,
                ceiling,
                nominal,
                DEFAULT_HUMIDITY_FLOOR,
                DEFAULT_HUMIDITY_CEILING,
                DEFAULT_HUMIDITY_NOMINAL
            );
            (DEFAULT_HUMIDITY_FLOOR, DEFAULT_HUMIDITY_CEILING, DEFAULT_HUMIDITY_NOMINAL)
        };

        Self {
            floor,
            ceiling,
            nominal,
            dwell_secs: Self::clamp_dwell(dwell_secs),
            actuator: DeviceType::Humidifier,
            actuator_name: "HumidifierActuator".to_string(),
        }
    }

    /// Humidity band driving a humidifier.
    pub fn humidity() -> Self {
        Self::new(
            DEFAULT_HUMIDITY_FLOOR,
            DEFAULT_HUMIDITY_CEILING,
            DEFAULT_HUMIDITY_NOMINAL,
            DEFAULT_DWELL_SECS,
        )
    }

    pub fn with_actuator(mut self, actuator: DeviceType, name: impl Into<String>) -> Self {
        self.actuator = actuator;
        self.actuator_name = name.into();
        self
    }

    pub fn clamp_dwell(dwell_secs: u64) -> u64 {
        if (MIN_DWELL_SECS..=MAX_DWELL_SECS).contains(&dwell_secs) {
            dwell_secs
        } else {
            tracing::warn!(
                "dwell time {}s outside [{}s, {}s], using {}s",
                dwell_secs,
                MIN_DWELL_SECS,
                MAX_DWELL_SECS,
                DEFAULT_DWELL_SECS
            );
            DEFAULT_DWELL_SECS
        }
    }

    pub fn side(&self, value: f32) -> Side {
        if value < self.floor {
            Side::Low
        } else if value > self.ceiling {
            Side::High
        } else {
            Side::InBand
        }
    }

    pub fn floor(&self) -> f32 {
        self.floor
    }

    pub fn ceiling(&self) -> f32 {
        self.ceiling
    }

    pub fn nominal(&self) -> f32 {
        self.nominal
    }

    pub fn dwell(&self) -> time::Duration {
        time::Duration::seconds(self.dwell_secs as i64)
    }

    pub fn dwell_secs(&self) -> u64 {
        self.dwell_secs
    }

    pub fn actuator(&self) -> DeviceType {
        self.actuator
    }

    pub fn actuator_name(&self) -> &str {
        &self.actuator_name
    }
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self::humidity()
    }
}
