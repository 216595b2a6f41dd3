use std::sync::Arc;
use std::time::Duration;

use fieldgate_api::protocols::{JsonProtocol, Protocol};
use fieldgate_api::{ActuatorCommand, ResourceName};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::time;

use crate::device::SimulatedDevice;
use crate::settings::Settings;

pub mod device;
pub mod settings;
pub mod simulate;

pub async fn run(settings: &Arc<Settings>) {
    let broker = &settings.broker;
    let mut options = MqttOptions::new(&broker.client_id, &broker.host, broker.port);
    options.set_keep_alive(Duration::from_secs(broker.keep_alive.max(1)));

    let (client, mut event_loop) = AsyncClient::new(options, 10);
    let protocol = JsonProtocol;
    let mut device = SimulatedDevice::new(settings.device.location_id.as_str(), settings.device.humidifier_step);
    let mut rng = rand::rng();

    let day_length = settings.device.day_length.max(1);
    let mut interval = time::interval(Duration::from_secs(settings.device.interval.max(1)));
    let mut mock_index: u32 = 0;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("interrupted, shutting down");
                break;
            }
            _ = interval.tick() => {
                let day_fraction = (mock_index % day_length) as f64 / day_length as f64;
                let reading = device.reading(day_fraction, &mut rng);

                match protocol.encode(&reading) {
                    // try_publish: the event loop draining this queue runs in this task
                    Ok(payload) => match client.try_publish(ResourceName::CdaSensorMsg.topic(), QoS::AtLeastOnce, false, payload) {
                        Ok(()) => tracing::debug!("Send: humidity {}", reading.value),
                        Err(e) => tracing::error!("Error publishing reading: {}", e),
                    },
                    Err(e) => tracing::error!("Error encoding reading: {}", e),
                }

                mock_index += 1;
            }
            event = event_loop.poll() => match event {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    tracing::info!("connected to {}:{}", broker.host, broker.port);

                    if let Err(e) = client.try_subscribe(ResourceName::CdaActuatorCmd.topic(), QoS::AtLeastOnce) {
                        tracing::error!("Error subscribing: {}", e);
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let Ok(command) = protocol.deserialize::<ActuatorCommand>(&publish.payload) else {
                        tracing::warn!("Ignoring malformed command on {}", publish.topic);
                        continue;
                    };

                    if let Some(response) = device.apply(&command) {
                        match protocol.encode(&response) {
                            Ok(payload) => {
                                if let Err(e) = client.try_publish(ResourceName::CdaActuatorResponse.topic(), QoS::AtLeastOnce, false, payload) {
                                    tracing::error!("Error publishing response: {}", e);
                                }
                            }
                            Err(e) => tracing::error!("Error encoding response: {}", e),
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("MQTT error: {}", e);
                    time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }
}
