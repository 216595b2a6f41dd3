use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use fieldgate_analyser::ActuationEngine;
use fieldgate_api::protocols::JsonProtocol;
use fieldgate_api::{ActuatorCommand, DeviceType, PerformanceSample, ResourceName, SensorReading};
use rumqttc::QoS;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::configs::Settings;
use crate::errors::GatewayError;
use crate::services::{
    ActuatorSink, DataMessageListener, MqttConnector, PerformanceSampler, SysinfoProbe,
};

const OUTBOUND_CAPACITY: usize = 64;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug)]
enum Outbound {
    ActuatorCommand(ActuatorCommand),
    PerformanceSample(PerformanceSample),
}

/// Listener half of the manager: evaluates readings and keeps the latest observations.
struct DataCore {
    enable_actuation: bool,
    engine: ActuationEngine,
    sink: RwLock<Option<Arc<dyn ActuatorSink>>>,
    outbound: RwLock<Option<mpsc::Sender<Outbound>>>,
    responses: RwLock<HashMap<String, ActuatorCommand>>,
    samples: RwLock<HashMap<String, PerformanceSample>>,
}

impl DataCore {
    fn issue(&self, command: ActuatorCommand) {
        let sink = self.sink.read().unwrap_or_else(PoisonError::into_inner).clone();

        if let Some(sink) = sink {
            if !sink.on_actuator_command(&command) {
                tracing::warn!("local actuator sink rejected {:?}", command.command);
            }
        }

        self.enqueue(Outbound::ActuatorCommand(command));
    }

    fn enqueue(&self, message: Outbound) -> bool {
        let outbound = self.outbound.read().unwrap_or_else(PoisonError::into_inner);

        let Some(sender) = outbound.as_ref() else {
            tracing::debug!("manager not started, not forwarding {:?}", message);
            return false;
        };

        match sender.try_send(message) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(message)) => {
                tracing::warn!("outbound queue full, dropping {:?}", message);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!("{}", GatewayError::QueueClosed);
                false
            }
        }
    }

    fn set_outbound(&self, sender: Option<mpsc::Sender<Outbound>>) {
        *self.outbound.write().unwrap_or_else(PoisonError::into_inner) = sender;
    }
}

impl DataMessageListener for DataCore {
    fn on_sensor_reading(&self, resource: ResourceName, reading: SensorReading) -> bool {
        tracing::debug!(
            "sensor reading {} from {} on {}: {}",
            reading.header.name,
            reading.location_id(),
            resource,
            reading.value
        );

        if !self.enable_actuation {
            return true;
        }

        if let Some(command) = self.engine.analyse(&reading) {
            self.issue(command);
        }

        true
    }

    fn on_actuator_response(&self, resource: ResourceName, response: ActuatorCommand) -> bool {
        if !response.is_response {
            tracing::warn!("command on {} is not flagged as a response", resource);
        }

        tracing::info!(
            "actuator response from {}: {:?} value {} ({})",
            response.location_id(),
            response.command,
            response.value,
            response.state_data
        );

        self.responses
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(response.location_id().to_string(), response);

        true
    }

    fn on_performance_sample(&self, resource: ResourceName, sample: PerformanceSample) -> bool {
        if sample.has_error() {
            tracing::warn!("performance sample from {} carries the error flag", sample.header.location_id);
        }

        tracing::debug!(
            "performance from {} on {}: cpu {} memory {} disk {}",
            sample.header.location_id,
            resource,
            sample.cpu_utilization,
            sample.memory_utilization,
            sample.disk_utilization
        );

        self.samples
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(sample.header.location_id.clone(), sample.clone());

        if resource == ResourceName::GdaSystemPerfMsg {
            self.enqueue(Outbound::PerformanceSample(sample));
        }

        true
    }

    fn on_message(&self, resource: ResourceName, payload: &str) -> bool {
        tracing::info!("message on {}: {}", resource, payload);
        true
    }
}

#[derive(Default)]
struct Runtime {
    started: bool,
    dispatcher: Option<JoinHandle<()>>,
    sampler: Option<JoinHandle<()>>,
}

/// Owns the broker connector, the actuation engine and the local performance sampler.
pub struct DeviceDataManager {
    settings: Arc<Settings>,
    core: Arc<DataCore>,
    connector: Option<Arc<MqttConnector>>,
    runtime: Mutex<Runtime>,
}

impl DeviceDataManager {
    pub fn new(settings: &Arc<Settings>) -> Self {
        let engine = ActuationEngine::new().with_policy(DeviceType::Humidity, settings.humidity_policy());

        let connector = settings
            .gateway
            .enable_mqtt_client
            .then(|| Arc::new(MqttConnector::new(&settings.mqtt)));

        Self {
            settings: Arc::clone(settings),
            core: Arc::new(DataCore {
                enable_actuation: settings.gateway.enable_actuation,
                engine,
                sink: RwLock::new(None),
                outbound: RwLock::new(None),
                responses: RwLock::new(HashMap::new()),
                samples: RwLock::new(HashMap::new()),
            }),
            connector,
            runtime: Mutex::new(Runtime::default()),
        }
    }

    pub fn set_actuator_sink(&self, sink: Arc<dyn ActuatorSink>) {
        *self.core.sink.write().unwrap_or_else(PoisonError::into_inner) = Some(sink);
    }

    pub fn engine(&self) -> &ActuationEngine {
        &self.core.engine
    }

    pub fn connector(&self) -> Option<&Arc<MqttConnector>> {
        self.connector.as_ref()
    }

    pub fn latest_actuator_response(&self, location_id: &str) -> Option<ActuatorCommand> {
        self.core
            .responses
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(location_id)
            .cloned()
    }

    pub fn latest_performance_sample(&self, location_id: &str) -> Option<PerformanceSample> {
        self.core
            .samples
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(location_id)
            .cloned()
    }

    pub async fn is_started(&self) -> bool {
        self.runtime.lock().await.started
    }

    /// Start every enabled component. A component that fails to come up does not stop the others.
    pub async fn start(&self) -> bool {
        let mut runtime = self.runtime.lock().await;

        if runtime.started {
            tracing::warn!("device data manager already started");
            return false;
        }

        tracing::info!("starting device data manager");

        let (sender, receiver) = mpsc::channel(OUTBOUND_CAPACITY);
        self.core.set_outbound(Some(sender));
        runtime.dispatcher = Some(tokio::spawn(dispatch(
            receiver,
            self.connector.clone(),
            self.settings.mqtt.qos(),
        )));

        if let Some(connector) = &self.connector {
            connector.set_data_message_listener(self.core.clone());

            if !connector.connect().await {
                tracing::warn!("MQTT client unavailable, continuing without broker");
            }
        }

        if self.settings.gateway.enable_system_perf {
            let sampler = PerformanceSampler::new(
                SysinfoProbe::new(),
                self.settings.gateway.location_id.as_str(),
                self.settings.gateway.poll_cycles,
            );

            runtime.sampler = Some(sampler.spawn(self.core.clone()));
        }

        runtime.started = true;

        true
    }

    /// Stop everything `start` brought up. Safe to call at any time.
    pub async fn stop(&self) -> bool {
        let mut runtime = self.runtime.lock().await;

        if !runtime.started {
            tracing::info!("device data manager not running");
            return false;
        }

        tracing::info!("stopping device data manager");

        if let Some(sampler) = runtime.sampler.take() {
            sampler.abort();
        }

        // Closing the queue lets the dispatcher flush what is left, then exit
        self.core.set_outbound(None);

        if let Some(mut dispatcher) = runtime.dispatcher.take() {
            if tokio::time::timeout(DRAIN_TIMEOUT, &mut dispatcher).await.is_err() {
                tracing::warn!("outbound queue not drained in time");
                dispatcher.abort();
            }
        }

        if let Some(connector) = &self.connector {
            connector.disconnect().await;
        }

        runtime.started = false;

        true
    }
}

impl DataMessageListener for DeviceDataManager {
    fn on_sensor_reading(&self, resource: ResourceName, reading: SensorReading) -> bool {
        self.core.on_sensor_reading(resource, reading)
    }

    fn on_actuator_response(&self, resource: ResourceName, response: ActuatorCommand) -> bool {
        self.core.on_actuator_response(resource, response)
    }

    fn on_performance_sample(&self, resource: ResourceName, sample: PerformanceSample) -> bool {
        self.core.on_performance_sample(resource, sample)
    }

    fn on_message(&self, resource: ResourceName, payload: &str) -> bool {
        self.core.on_message(resource, payload)
    }
}

async fn dispatch(mut outbound: mpsc::Receiver<Outbound>, connector: Option<Arc<MqttConnector>>, qos: QoS) {
    let protocol = JsonProtocol;

    while let Some(message) = outbound.recv().await {
        let Some(connector) = &connector else {
            tracing::trace!("MQTT client disabled, not publishing {:?}", message);
            continue;
        };

        let (resource, payload) = match &message {
            Outbound::ActuatorCommand(command) => (ResourceName::CdaActuatorCmd, protocol.encode(command)),
            Outbound::PerformanceSample(sample) => (ResourceName::GdaSystemPerfMsg, protocol.encode(sample)),
        };

        match payload {
            Ok(payload) => {
                if !connector.publish(resource, &payload, qos).await {
                    tracing::warn!("unable to publish to {}", resource);
                }
            }
            Err(e) => tracing::error!("{}", GatewayError::from(e)),
        }
    }
}
