mod settings;

pub use settings::{Gateway, Humidity, Logger, Mqtt, Settings, qos_from_level};
