use fieldgate_api::{ActuatorCommand, PerformanceSample, ResourceName, SensorReading};

/// Receiver of decoded inbound records. Each handler reports whether the record was accepted.
pub trait DataMessageListener: Send + Sync {
    fn on_sensor_reading(&self, resource: ResourceName, reading: SensorReading) -> bool;

    fn on_actuator_response(&self, resource: ResourceName, response: ActuatorCommand) -> bool;

    fn on_performance_sample(&self, resource: ResourceName, sample: PerformanceSample) -> bool;

    /// Payloads on resources without a typed handler.
    fn on_message(&self, resource: ResourceName, payload: &str) -> bool;
}

/// Second delivery path for actuator commands, independent of the broker.
pub trait ActuatorSink: Send + Sync {
    fn on_actuator_command(&self, command: &ActuatorCommand) -> bool;
}
