use std::sync::Arc;
use std::time::Duration;

use crate::configs::Settings;
use crate::services::DeviceDataManager;

pub mod configs;
pub mod errors;
pub mod services;

/// Run the gateway until interrupted, or for `test_runtime` seconds when `run_forever` is off.
pub async fn run(settings: &Arc<Settings>) {
    let manager = DeviceDataManager::new(settings);

    manager.start().await;

    let runtime = async {
        if settings.gateway.run_forever {
            std::future::pending::<()>().await
        } else {
            tracing::info!("running for {}s", settings.gateway.test_runtime);
            tokio::time::sleep(Duration::from_secs(settings.gateway.test_runtime)).await
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => tracing::info!("interrupted, shutting down"),
            Err(e) => tracing::error!("unable to listen for shutdown signal: {}", e),
        },
        _ = runtime => tracing::info!("test runtime elapsed, shutting down"),
    }

    manager.stop().await;
}
