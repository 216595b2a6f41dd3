use std::env;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use fieldgate_analyser::ThresholdPolicy;
use rumqttc::QoS;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logger {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gateway {
    pub location_id: String,
    pub enable_mqtt_client: bool,
    pub enable_system_perf: bool,
    pub enable_actuation: bool,
    /// Seconds between local performance samples
    pub poll_cycles: u64,
    pub run_forever: bool,
    /// Seconds to run before stopping when `run_forever` is off
    pub test_runtime: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mqtt {
    pub host: String,
    pub port: u16,
    pub secure_port: u16,
    pub enable_crypt: bool,
    pub cert_file: Option<String>,
    /// Keep-alive interval in seconds
    pub keep_alive: u64,
    /// Generated when empty
    pub client_id: String,
    /// Seconds to wait for CONNACK
    pub connect_timeout: u64,
    /// Seconds between reconnect attempts
    pub reconnect_delay: u64,
    pub default_qos: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Humidity {
    pub floor: f32,
    pub ceiling: f32,
    pub nominal: f32,
    /// Dwell time in seconds
    pub max_time_past_threshold: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub logger: Logger,
    pub gateway: Gateway,
    pub mqtt: Mqtt,
    pub humidity: Humidity,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Layer `configs/default`, `configs/{RUN_MODE}`, an optional explicit file, then `FIELDGATE__*` variables.
    pub fn load(override_path: Option<&Path>) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or("development".into());
        let config_dir = Self::project_root()
            .map_err(|e| ConfigError::Message(e.to_string()))?
            .join("configs");

        let mut builder = Config::builder()
            .add_source(File::from(config_dir.join("default")))
            .add_source(File::from(config_dir.join(&run_mode)).required(false));

        if let Some(path) = override_path {
            builder = builder.add_source(File::from(path));
        }

        let mut settings: Settings = builder
            .add_source(Environment::with_prefix("FIELDGATE").separator("__").try_parsing(true))
            .build()?
            .try_deserialize()?;

        if let Some(cert_file) = &settings.mqtt.cert_file {
            settings.mqtt.cert_file = Some(Self::normalize_path(cert_file)?);
        }

        Ok(settings)
    }

    pub fn humidity_policy(&self) -> ThresholdPolicy {
        ThresholdPolicy::new(
            self.humidity.floor,
            self.humidity.ceiling,
            self.humidity.nominal,
            self.humidity.max_time_past_threshold,
        )
    }

    fn project_root() -> Result<PathBuf, std::io::Error> {
        if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
            // development and testing environments
            Ok(PathBuf::from(manifest_dir))
        } else {
            // runtime root relative path `folder/executable` -> `folder/`
            let exe = env::current_exe()?;
            Ok(exe.parent().map(Path::to_path_buf).unwrap_or_default())
        }
    }

    fn normalize_path(path: &str) -> Result<String, ConfigError> {
        Ok(match path.strip_prefix("~/") {
            Some(relative) => Self::project_root()
                .map_err(|e| ConfigError::Message(e.to_string()))?
                .join(relative)
                .to_string_lossy()
                .into_owned(),
            None => path.to_string(),
        })
    }
}

impl Mqtt {
    pub fn qos(&self) -> QoS {
        qos_from_level(self.default_qos).unwrap_or_else(|| {
            tracing::warn!("invalid qos level {}, using 1", self.default_qos);
            QoS::AtLeastOnce
        })
    }
}

pub fn qos_from_level(level: u8) -> Option<QoS> {
    match level {
        0 => Some(QoS::AtMostOnce),
        1 => Some(QoS::AtLeastOnce),
        2 => Some(QoS::ExactlyOnce),
        _ => None,
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            logger: Logger {
                level: "info".to_string(),
            },
            gateway: Gateway {
                location_id: "gatewaydevice001".to_string(),
                enable_mqtt_client: true,
                enable_system_perf: true,
                enable_actuation: true,
                poll_cycles: 60,
                run_forever: true,
                test_runtime: 60,
            },
            mqtt: Mqtt {
                host: "localhost".to_string(),
                port: 1883,
                secure_port: 8883,
                enable_crypt: false,
                cert_file: None,
                keep_alive: 30,
                client_id: String::new(),
                connect_timeout: 5,
                reconnect_delay: 2,
                default_qos: 1,
            },
            humidity: Humidity {
                floor: 30.0,
                ceiling: 50.0,
                nominal: 40.0,
                max_time_past_threshold: 300,
            },
        }
    }
}
