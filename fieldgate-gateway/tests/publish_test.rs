use std::time::Duration;

use fieldgate_api::protocols::JsonProtocol;
use fieldgate_api::{ActuatorCommand, CommandCode, PerformanceSample, ResourceName};
use fieldgate_gateway::services::DataMessageListener;

mod common;
use common::fake_broker::FakeBroker;
use common::mock_app::{LOCATION, MockApp};

const WAIT: Duration = Duration::from_secs(5);

fn feed(app: &MockApp, steps: &[(i64, f32)]) {
    for (secs, value) in steps {
        assert!(
            app.manager
                .on_sensor_reading(ResourceName::CdaSensorMsg, app.humidity(*value, *secs))
        );
    }
}

fn decode<T: for<'de> serde::Deserialize<'de>>(payload: &[u8]) -> T {
    JsonProtocol.decode(std::str::from_utf8(payload).unwrap()).unwrap()
}

#[tokio::test]
async fn test_low_excursion_publishes_actuator_command() {
    let mut broker = FakeBroker::start().await;
    let app = MockApp::connected(broker.port());

    assert!(app.manager.start().await);
    assert!(app.manager.connector().unwrap().is_connected());

    feed(&app, &[(0, 20.0), (10, 20.0)]);

    let (qos, payload) = broker
        .next_publish(ResourceName::CdaActuatorCmd.topic(), WAIT)
        .await
        .expect("no command published");
    let command: ActuatorCommand = decode(&payload);

    assert_eq!(qos, 1);
    assert_eq!(command.command, CommandCode::On);
    assert_eq!(command.value, 40.0);
    assert_eq!(command.location_id(), LOCATION);
    assert!(!command.is_response);
    assert_eq!(app.sink.commands().len(), 1);

    assert!(app.manager.stop().await);
}

#[tokio::test]
async fn test_gateway_sample_published_upstream() {
    let mut broker = FakeBroker::start().await;
    let app = MockApp::connected(broker.port());
    assert!(app.manager.start().await);

    let sample = PerformanceSample::new("gatewaydevice001").with_utilization(12.5, 40.0, 70.0);
    assert!(
        app.manager
            .on_performance_sample(ResourceName::GdaSystemPerfMsg, sample)
    );

    let (_, payload) = broker
        .next_publish(ResourceName::GdaSystemPerfMsg.topic(), WAIT)
        .await
        .expect("no sample published");
    let published: PerformanceSample = decode(&payload);

    assert_eq!(published.header.location_id, "gatewaydevice001");
    assert_eq!(published.cpu_utilization, 12.5);
    assert_eq!(published.disk_utilization, 70.0);

    assert!(app.manager.stop().await);
}

#[tokio::test]
async fn test_device_sample_not_republished() {
    let mut broker = FakeBroker::start().await;
    let app = MockApp::connected(broker.port());
    assert!(app.manager.start().await);

    let sample = PerformanceSample::new(LOCATION).with_utilization(5.0, 5.0, 5.0);
    assert!(
        app.manager
            .on_performance_sample(ResourceName::CdaSystemPerfMsg, sample)
    );
    assert!(app.manager.stop().await);

    assert!(
        broker
            .next_publish(ResourceName::GdaSystemPerfMsg.topic(), Duration::from_millis(500))
            .await
            .is_none()
    );
    assert!(app.manager.latest_performance_sample(LOCATION).is_some());
}

#[tokio::test]
async fn test_stop_drains_queued_commands() {
    let mut broker = FakeBroker::start().await;
    let app = MockApp::connected(broker.port());
    assert!(app.manager.start().await);

    // Stop right away: both commands are still queued
    feed(&app, &[(0, 20.0), (10, 20.0), (11, 40.0)]);
    assert!(app.manager.stop().await);

    let mut published = Vec::new();
    while let Some((_, payload)) = broker
        .next_publish(ResourceName::CdaActuatorCmd.topic(), Duration::from_secs(1))
        .await
    {
        published.push(decode::<ActuatorCommand>(&payload).command);
    }

    assert_eq!(published, vec![CommandCode::On, CommandCode::Off]);
    assert!(!app.manager.connector().unwrap().is_connected());
}
