use std::sync::{Arc, Mutex};

use fieldgate_api::{ActuatorCommand, DeviceType, SensorReading};
use fieldgate_gateway::configs::Settings;
use fieldgate_gateway::services::{ActuatorSink, DeviceDataManager};
use time::{Duration, OffsetDateTime};

pub const LOCATION: &str = "constraineddevice001";

#[derive(Default)]
pub struct RecordingSink {
    commands: Mutex<Vec<ActuatorCommand>>,
}

impl RecordingSink {
    pub fn commands(&self) -> Vec<ActuatorCommand> {
        self.commands.lock().unwrap().clone()
    }
}

impl ActuatorSink for RecordingSink {
    fn on_actuator_command(&self, command: &ActuatorCommand) -> bool {
        self.commands.lock().unwrap().push(command.clone());
        true
    }
}

/// Manager with the sampler disabled and a 10s dwell time.
pub struct MockApp {
    pub manager: DeviceDataManager,
    pub sink: Arc<RecordingSink>,
    pub origin: OffsetDateTime,
}

impl MockApp {
    /// No broker connection.
    pub fn new() -> Self {
        let mut settings = Self::settings();
        settings.gateway.enable_mqtt_client = false;

        Self::from_settings(settings)
    }

    /// Connected to a broker on localhost.
    pub fn connected(port: u16) -> Self {
        let mut settings = Self::settings();
        settings.mqtt.host = "127.0.0.1".to_string();
        settings.mqtt.port = port;
        settings.mqtt.reconnect_delay = 1;

        Self::from_settings(settings)
    }

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.gateway.enable_system_perf = false;
        settings.humidity.max_time_past_threshold = 10;
        settings
    }

    fn from_settings(settings: Settings) -> Self {
        let manager = DeviceDataManager::new(&Arc::new(settings));
        let sink = Arc::new(RecordingSink::default());
        manager.set_actuator_sink(sink.clone());

        Self {
            manager,
            sink,
            origin: OffsetDateTime::now_utc(),
        }
    }

    pub fn humidity(&self, value: f32, secs: i64) -> SensorReading {
        SensorReading::new("HumiditySensor", DeviceType::Humidity, LOCATION)
            .with_value(value)
            .with_time_stamp(self.origin + Duration::seconds(secs))
    }
}
