mod device_data_manager;
mod listener;
mod mqtt_service;
mod performance_service;

pub use device_data_manager::*;
pub use listener::*;
pub use mqtt_service::*;
pub use performance_service::*;
