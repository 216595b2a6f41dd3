use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use fieldgate_api::{ActuatorCommand, DeviceType, SensorReading};

use crate::excursion::{ExcursionState, Phase};
use crate::policy::ThresholdPolicy;

/// Identity of one monitored quantity: a device class at a location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuantityKey {
    pub device_type: DeviceType,
    pub location_id: String,
}

impl QuantityKey {
    pub fn new(device_type: DeviceType, location_id: impl Into<String>) -> Self {
        Self {
            device_type,
            location_id: location_id.into(),
        }
    }

    pub fn of(reading: &SensorReading) -> Self {
        Self::new(reading.type_id(), reading.location_id())
    }
}

impl fmt::Display for QuantityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.device_type.label(), self.location_id)
    }
}

/// Keyed excursion store. Each quantity has its own lock, so evaluations of
/// different quantities never wait on each other.
#[derive(Debug, Default)]
pub struct ActuationEngine {
    policies: HashMap<DeviceType, ThresholdPolicy>,
    states: RwLock<HashMap<QuantityKey, Arc<Mutex<ExcursionState>>>>,
}

impl ActuationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, sensor: DeviceType, policy: ThresholdPolicy) -> Self {
        self.policies.insert(sensor, policy);
        self
    }

    pub fn policy(&self, sensor: DeviceType) -> Option<&ThresholdPolicy> {
        self.policies.get(&sensor)
    }

    /// Evaluate one reading and return the actuator command to issue, if any.
    ///
    /// A command decided on a reading timed by the local clock says so in its `stateData`.
    pub fn analyse(&self, reading: &SensorReading) -> Option<ActuatorCommand> {
        let Some(policy) = self.policies.get(&reading.type_id()) else {
            tracing::trace!("no threshold policy for {:?}", reading.type_id());
            return None;
        };

        let key = QuantityKey::of(reading);
        let reading_time = reading.reading_time();

        if reading_time.is_approximate() {
            tracing::warn!(
                "{}: unparseable timestamp {:?}, timing against local clock",
                key,
                reading.header.time_stamp
            );
        }

        if reading.has_error() {
            tracing::warn!("{}: reading {} carries the error flag", key, reading.value);
        }

        let state = self.state_for(&key);
        let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
        let before = state.phase();
        let actuation = state.observe(reading, reading_time.at(), policy);
        let after = state.phase();
        drop(state);

        if before != after {
            tracing::debug!("{}: {} -> {} at value {}", key, before, after, reading.value);
        }

        let actuation = actuation?;
        let state_data = if reading_time.is_approximate() {
            format!("{}; approximate timing", actuation.trigger)
        } else {
            actuation.trigger.to_string()
        };

        tracing::info!(
            "{}: issuing {:?} at target {} ({})",
            key,
            actuation.command,
            actuation.target,
            actuation.trigger
        );

        Some(
            ActuatorCommand::new(policy.actuator_name(), policy.actuator(), key.location_id)
                .with_command(actuation.command)
                .with_value(actuation.target)
                .with_state_data(state_data),
        )
    }

    pub fn phase(&self, key: &QuantityKey) -> Option<Phase> {
        let states = self.states.read().unwrap_or_else(PoisonError::into_inner);

        states
            .get(key)
            .map(|state| state.lock().unwrap_or_else(PoisonError::into_inner).phase())
    }

    /// Forget all excursion state.
    pub fn reset(&self) {
        self.states
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn state_for(&self, key: &QuantityKey) -> Arc<Mutex<ExcursionState>> {
        if let Some(state) = self
            .states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return Arc::clone(state);
        }

        let mut states = self.states.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(states.entry(key.clone()).or_default())
    }
}
