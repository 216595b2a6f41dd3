use fieldgate_api::{ActuatorCommand, CommandCode, DeviceType, SensorReading};
use rand::Rng;

use crate::simulate::{simulated_humidity, with_noise};

/// A constrained device with one humidity sensor and one humidifier.
pub struct SimulatedDevice {
    location_id: String,
    humidifier_step: f64,
    humidifier_on: bool,
    boost: f64,
}

impl SimulatedDevice {
    pub fn new(location_id: impl Into<String>, humidifier_step: f64) -> Self {
        Self {
            location_id: location_id.into(),
            humidifier_step,
            humidifier_on: false,
            boost: 0.0,
        }
    }

    pub fn humidifier_on(&self) -> bool {
        self.humidifier_on
    }

    pub fn reading<R: Rng>(&mut self, day_fraction: f64, rng: &mut R) -> SensorReading {
        if self.humidifier_on {
            self.boost += self.humidifier_step;
        } else {
            // Moisture added by the humidifier dissipates once it stops
            self.boost = (self.boost - self.humidifier_step).max(0.0);
        }

        let value = with_noise(simulated_humidity(day_fraction) + self.boost, rng);

        SensorReading::new("HumiditySensor", DeviceType::Humidity, self.location_id.as_str()).with_value(value as f32)
    }

    /// Execute a command addressed to this device and build the acknowledgment.
    pub fn apply(&mut self, command: &ActuatorCommand) -> Option<ActuatorCommand> {
        if command.is_response || command.location_id() != self.location_id {
            return None;
        }

        match (command.header.type_id, command.command) {
            (DeviceType::Humidifier, CommandCode::On) => self.humidifier_on = true,
            (DeviceType::Humidifier, CommandCode::Off) => self.humidifier_on = false,
            (type_id, code) => {
                tracing::warn!("unsupported command {:?} for {:?}", code, type_id);
                let mut response = command.as_response();
                response.header.has_error = true;
                return Some(response);
            }
        }

        tracing::info!("humidifier {}", if self.humidifier_on { "on" } else { "off" });

        Some(command.as_response())
    }
}
