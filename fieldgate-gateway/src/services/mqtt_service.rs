use std::fs;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use fieldgate_api::protocols::JsonProtocol;
use fieldgate_api::{ActuatorCommand, PerformanceSample, ResourceName, SensorReading};
use rumqttc::{
    AsyncClient, ConnectionError, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS, TlsConfiguration,
    Transport,
};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use crate::configs::Mqtt;
use crate::errors::GatewayError;
use crate::services::DataMessageListener;

/// Resources re-subscribed on every CONNACK.
pub const REQUIRED_SUBSCRIPTIONS: [ResourceName; 3] = [
    ResourceName::CdaActuatorResponse,
    ResourceName::CdaSensorMsg,
    ResourceName::CdaSystemPerfMsg,
];

const REQUEST_CAPACITY: usize = 10;

struct Session {
    client: AsyncClient,
    task: JoinHandle<()>,
}

/// State shared between the connector handle and its event loop task.
struct Shared {
    listener: RwLock<Option<Arc<dyn DataMessageListener>>>,
    protocol: JsonProtocol,
    link: watch::Sender<bool>,
}

/// One logical broker connection delivering decoded records to a single listener.
pub struct MqttConnector {
    settings: Mqtt,
    client_id: String,
    shared: Arc<Shared>,
    session: Mutex<Option<Session>>,
}

impl MqttConnector {
    pub fn new(settings: &Mqtt) -> Self {
        let client_id = if settings.client_id.trim().is_empty() {
            format!("fieldgate-{}", uuid::Uuid::new_v4())
        } else {
            settings.client_id.clone()
        };

        let (link, _) = watch::channel(false);

        Self {
            settings: settings.clone(),
            client_id,
            shared: Arc::new(Shared {
                listener: RwLock::new(None),
                protocol: JsonProtocol,
                link,
            }),
            session: Mutex::new(None),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn required_subscriptions() -> &'static [ResourceName] {
        &REQUIRED_SUBSCRIPTIONS
    }

    pub fn set_data_message_listener(&self, listener: Arc<dyn DataMessageListener>) -> bool {
        *self.shared.listener.write().unwrap_or_else(PoisonError::into_inner) = Some(listener);
        true
    }

    pub fn is_connected(&self) -> bool {
        *self.shared.link.borrow()
    }

    /// Open the session and wait for the broker to acknowledge it.
    pub async fn connect(&self) -> bool {
        let mut session = self.session.lock().await;

        if session.is_some() {
            tracing::warn!("MQTT client {} already connected, ignoring connect", self.client_id);
            return false;
        }

        let options = self.options();
        tracing::info!(
            "connecting to MQTT broker {}:{} as {}",
            options.broker_address().0,
            options.broker_address().1,
            self.client_id
        );

        self.shared.link.send_replace(false);
        let mut link = self.shared.link.subscribe();

        let (client, event_loop) = AsyncClient::new(options, REQUEST_CAPACITY);
        let task = tokio::spawn(drive(
            event_loop,
            client.clone(),
            Arc::clone(&self.shared),
            Duration::from_secs(self.settings.reconnect_delay),
        ));

        let acknowledged = tokio::time::timeout(self.connect_timeout(), link.wait_for(|up| *up))
            .await
            .is_ok_and(|result| result.is_ok());

        if !acknowledged {
            task.abort();
            self.shared.link.send_replace(false);
            tracing::error!(
                "{}",
                GatewayError::ConnectTimeout(self.connect_timeout().as_secs())
            );
            return false;
        }

        *session = Some(Session { client, task });

        true
    }

    pub async fn disconnect(&self) -> bool {
        let Some(Session { client, mut task }) = self.session.lock().await.take() else {
            tracing::warn!("MQTT client {} not connected, ignoring disconnect", self.client_id);
            return false;
        };

        if let Err(e) = client.disconnect().await {
            tracing::warn!("MQTT disconnect request failed: {}", e);
        }

        // Give the event loop a moment to flush the DISCONNECT packet
        if tokio::time::timeout(Duration::from_secs(1), &mut task).await.is_err() {
            task.abort();
        }

        self.shared.link.send_replace(false);
        tracing::info!("disconnected from MQTT broker");

        true
    }

    pub async fn publish(&self, resource: ResourceName, payload: &str, qos: QoS) -> bool {
        let Some(client) = self.client().await else {
            tracing::warn!("{}, dropping publish to {}", GatewayError::NotConnected, resource);
            return false;
        };

        match client.publish(resource.topic(), qos, false, payload.as_bytes().to_vec()).await {
            Ok(()) => {
                tracing::debug!("published {} bytes to {} at {:?}", payload.len(), resource, qos);
                true
            }
            Err(e) => {
                tracing::error!("publish to {} failed: {}", resource, GatewayError::from(e));
                false
            }
        }
    }

    pub async fn subscribe(&self, resource: ResourceName, qos: QoS) -> bool {
        let Some(client) = self.client().await else {
            tracing::warn!("{}, cannot subscribe to {}", GatewayError::NotConnected, resource);
            return false;
        };

        match client.subscribe(resource.topic(), qos).await {
            Ok(()) => {
                tracing::debug!("subscribe topic {}", resource);
                true
            }
            Err(e) => {
                tracing::error!("subscribe to {} failed: {}", resource, GatewayError::from(e));
                false
            }
        }
    }

    pub async fn unsubscribe(&self, resource: ResourceName) -> bool {
        let Some(client) = self.client().await else {
            tracing::warn!("{}, cannot unsubscribe from {}", GatewayError::NotConnected, resource);
            return false;
        };

        match client.unsubscribe(resource.topic()).await {
            Ok(()) => {
                tracing::debug!("unsubscribe topic {}", resource);
                true
            }
            Err(e) => {
                tracing::error!("unsubscribe from {} failed: {}", resource, GatewayError::from(e));
                false
            }
        }
    }

    /// Route one inbound payload to the listener handler for its resource.
    pub fn on_message(&self, topic: &str, payload: &[u8]) -> bool {
        self.shared.on_message(topic, payload)
    }

    async fn client(&self) -> Option<AsyncClient> {
        if !self.is_connected() {
            return None;
        }

        self.session
            .lock()
            .await
            .as_ref()
            .map(|session| session.client.clone())
    }

    fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.connect_timeout.max(1))
    }

    fn options(&self) -> MqttOptions {
        let (transport, port) = self.transport();

        let mut options = MqttOptions::new(&self.client_id, &self.settings.host, port);
        options.set_keep_alive(Duration::from_secs(self.settings.keep_alive.max(1)));
        options.set_clean_session(false);
        options.set_transport(transport);

        options
    }

    fn transport(&self) -> (Transport, u16) {
        if !self.settings.enable_crypt {
            return (Transport::Tcp, self.settings.port);
        }

        match self.load_certificate() {
            Ok(ca) => {
                let transport = Transport::Tls(TlsConfiguration::Simple {
                    ca,
                    alpn: None,
                    client_auth: None,
                });

                (transport, self.settings.secure_port)
            }
            Err(e) => {
                tracing::error!("{}, falling back to plaintext", e);
                (Transport::Tcp, self.settings.port)
            }
        }
    }

    fn load_certificate(&self) -> Result<Vec<u8>, GatewayError> {
        let path = self.settings.cert_file.clone().unwrap_or_default();

        fs::read(&path).map_err(|source| GatewayError::Certificate { path, source })
    }
}

impl Shared {
    fn listener(&self) -> Option<Arc<dyn DataMessageListener>> {
        self.listener
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Runs on every CONNACK. Returns how many subscriptions were queued.
    fn on_connected(&self, client: &AsyncClient, is_reconnect: bool) -> usize {
        self.link.send_replace(true);

        if is_reconnect {
            tracing::info!("reconnected to MQTT broker, restoring subscriptions");
        } else {
            tracing::info!("connected to MQTT broker");
        }

        // Queued without awaiting: the event loop that drains this queue is the caller
        REQUIRED_SUBSCRIPTIONS
            .iter()
            .filter(|resource| match client.try_subscribe(resource.topic(), QoS::AtLeastOnce) {
                Ok(()) => {
                    tracing::debug!("subscribe topic {}", resource);
                    true
                }
                Err(e) => {
                    tracing::error!("subscribe to {} failed: {}", resource, e);
                    false
                }
            })
            .count()
    }

    fn on_connection_lost(&self, cause: &ConnectionError) {
        if self.link.send_replace(false) {
            tracing::warn!("MQTT connection lost: {}", cause);
        } else {
            tracing::debug!("MQTT broker unreachable: {}", cause);
        }
    }

    fn on_message(&self, topic: &str, payload: &[u8]) -> bool {
        let Some(resource) = ResourceName::from_topic(topic) else {
            tracing::warn!("message on unknown topic {}", topic);
            return false;
        };

        let Some(listener) = self.listener() else {
            tracing::warn!("no listener registered, dropping message on {}", resource);
            return false;
        };

        let Ok(text) = std::str::from_utf8(payload) else {
            tracing::warn!("non UTF-8 payload on {}", resource);
            return false;
        };

        tracing::trace!("receive on {}: {}", resource, text);

        match resource {
            ResourceName::CdaSensorMsg => match self.protocol.decode::<SensorReading>(text) {
                Ok(reading) => listener.on_sensor_reading(resource, reading),
                Err(e) => self.drop_malformed(resource, e),
            },
            ResourceName::CdaActuatorResponse => match self.protocol.decode::<ActuatorCommand>(text) {
                Ok(response) => listener.on_actuator_response(resource, response),
                Err(e) => self.drop_malformed(resource, e),
            },
            ResourceName::CdaSystemPerfMsg | ResourceName::GdaSystemPerfMsg => {
                match self.protocol.decode::<PerformanceSample>(text) {
                    Ok(sample) => listener.on_performance_sample(resource, sample),
                    Err(e) => self.drop_malformed(resource, e),
                }
            }
            _ => listener.on_message(resource, text),
        }
    }

    fn drop_malformed(&self, resource: ResourceName, error: fieldgate_api::protocols::Error) -> bool {
        tracing::warn!("dropping malformed payload on {}: {}", resource, error);
        false
    }
}

async fn drive(mut event_loop: EventLoop, client: AsyncClient, shared: Arc<Shared>, reconnect_delay: Duration) {
    let mut sessions = 0usize;

    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                shared.on_connected(&client, sessions > 0);
                sessions += 1;
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                shared.on_message(&publish.topic, &publish.payload);
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                shared.link.send_replace(false);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                shared.on_connection_lost(&e);
                // The next poll reconnects
                tokio::time::sleep(reconnect_delay).await;
            }
        }
    }
}
